// src/handlers/items.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        response::ApiResponse,
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{RequireRole, StaffOnly},
    },
    models::item::{Item, ItemCondition, ItemFilter, ItemUpdate, NewItem},
    services::verification_service::ScanResult,
};

// ---
// Payload: CreateItem
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemPayload {
    #[validate(length(min = 1, message = "O código é obrigatório."))]
    #[schema(example = "LAB-001")]
    pub code: String,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,

    #[validate(length(min = 1, message = "A categoria é obrigatória."))]
    pub category: String,

    pub condition: ItemCondition,

    #[validate(length(min = 1, message = "A localização é obrigatória."))]
    pub location: String,

    #[validate(range(min = 0, message = "O estoque não pode ser negativo."))]
    #[serde(default)] // Se o JSON não tiver esse campo, assume 0
    pub stock: i32,

    pub description: Option<String>,
}

// ---
// Payload: UpdateItem (sem estoque)
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemPayload {
    #[validate(length(min = 1, message = "O código é obrigatório."))]
    pub code: String,
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(length(min = 1, message = "A categoria é obrigatória."))]
    pub category: String,
    pub condition: ItemCondition,
    #[validate(length(min = 1, message = "A localização é obrigatória."))]
    pub location: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyScanQuery {
    pub notes: Option<String>,
}

// POST /api/items
#[utoipa::path(
    post,
    path = "/api/items",
    tag = "Items",
    request_body = CreateItemPayload,
    responses(
        (status = 201, description = "Item cadastrado", body = ApiResponse<Item>),
        (status = 400, description = "Campos inválidos"),
        (status = 403, description = "Apenas técnicos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffOnly>,
    Json(payload): Json<CreateItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let item = app_state
        .item_service
        .create_item(NewItem {
            code: payload.code.trim().to_string(),
            name: payload.name,
            category: payload.category,
            condition: payload.condition,
            location: payload.location,
            stock: payload.stock,
            description: payload.description,
        })
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Item cadastrado", "Item created");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(message, item))))
}

// GET /api/items
#[utoipa::path(
    get,
    path = "/api/items",
    tag = "Items",
    params(
        ("category" = Option<String>, Query, description = "Filtra pela categoria"),
        ("condition" = Option<ItemCondition>, Query, description = "Filtra pela condição")
    ),
    responses(
        (status = 200, description = "Itens, do mais novo ao mais antigo", body = ApiResponse<Vec<Item>>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Query(filter): Query<ItemFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let items = app_state
        .item_service
        .list_items(&filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Itens encontrados", "Items found");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, items))))
}

// GET /api/items/{id}
#[utoipa::path(
    get,
    path = "/api/items/{id}",
    tag = "Items",
    params(("id" = Uuid, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Item", body = ApiResponse<Item>),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .item_service
        .get_item(item_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Item encontrado", "Item found");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, item))))
}

// GET /api/items/code/{code}
#[utoipa::path(
    get,
    path = "/api/items/code/{code}",
    tag = "Items",
    params(("code" = String, Path, description = "Código da etiqueta")),
    responses(
        (status = 200, description = "Item mais recente com esse código", body = ApiResponse<Item>),
        (status = 404, description = "Nenhum item com esse código")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_item_by_code(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .item_service
        .get_item_by_code(&code)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Item encontrado", "Item found");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, item))))
}

// GET /api/items/verify/{code}
// Leitura avulsa do scanner: sempre grava um log, mesmo quando o código é desconhecido.
#[utoipa::path(
    get,
    path = "/api/items/verify/{code}",
    tag = "Items",
    params(
        ("code" = String, Path, description = "Texto lido do QR (id ou código)"),
        ("notes" = Option<String>, Query, description = "Observação da leitura")
    ),
    responses(
        (status = 200, description = "Leitura válida", body = ApiResponse<ScanResult>),
        (status = 404, description = "Leitura registrada como inválida", body = ApiResponse<ScanResult>)
    ),
    security(("api_jwt" = []))
)]
pub async fn verify_item(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(code): Path<String>,
    Query(query): Query<VerifyScanQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let result = app_state
        .verification_service
        .verify_scan(&user, &code, query.notes)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    if result.item.is_some() {
        let message = locale.pick("Item verificado", "Item verified");
        Ok((StatusCode::OK, Json(ApiResponse::ok(message, result))))
    } else {
        let message = locale.pick("Item não encontrado", "Item not found");
        Ok((
            StatusCode::NOT_FOUND,
            Json(ApiResponse {
                success: false,
                message: message.to_string(),
                data: Some(result),
            }),
        ))
    }
}

// PUT /api/items/{id}
#[utoipa::path(
    put,
    path = "/api/items/{id}",
    tag = "Items",
    params(("id" = Uuid, Path, description = "ID do item")),
    request_body = UpdateItemPayload,
    responses(
        (status = 200, description = "Item atualizado", body = ApiResponse<Item>),
        (status = 404, description = "Item não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffOnly>,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateItemPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let item = app_state
        .item_service
        .update_item(
            item_id,
            ItemUpdate {
                code: payload.code.trim().to_string(),
                name: payload.name,
                category: payload.category,
                condition: payload.condition,
                location: payload.location,
                description: payload.description,
            },
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Item atualizado", "Item updated");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, item))))
}

// DELETE /api/items/{id}
#[utoipa::path(
    delete,
    path = "/api/items/{id}",
    tag = "Items",
    params(("id" = Uuid, Path, description = "ID do item")),
    responses(
        (status = 200, description = "Item removido"),
        (status = 404, description = "Item não encontrado"),
        (status = 409, description = "Item com empréstimos em aberto")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_item(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffOnly>,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .item_service
        .delete_item(item_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Item removido", "Item deleted");
    Ok((StatusCode::OK, Json(ApiResponse::empty(message))))
}
