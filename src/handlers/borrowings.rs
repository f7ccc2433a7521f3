// src/handlers/borrowings.rs

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
    models::borrowing::{Borrowing, BorrowingFilter, PendingReturn},
    services::{
        borrowing_service::{BorrowRequest, ReturnSubmission},
        qr_resolver::ResolvedItem,
    },
};

// ---
// Payloads
// ---
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestBorrowPayload {
    pub item_id: Uuid,
    // Opcionais: se ausentes, vêm do cadastro do item
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    #[validate(length(max = 500, message = "Observação muito longa."))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScanPayload {
    #[validate(length(min = 1, message = "O texto lido do QR é obrigatório."))]
    #[schema(example = "LAB-001")]
    pub scanned_code: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReturnPayload {
    #[validate(length(min = 1, message = "O texto lido do QR é obrigatório."))]
    pub scanned_code: String,
    /// Item que a tela de devolução estava esperando (do contexto de devolução).
    pub expected_item_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApproveReturnPayload {
    #[validate(length(min = 1, message = "O item verificado é obrigatório."))]
    pub verified_item_id: String,
}

// Validação padrão do Validator, no idioma do cliente
fn validated<T: Validate>(payload: T, locale: &Locale) -> Result<T, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(locale))?;
    Ok(payload)
}

// POST /api/borrowings
#[utoipa::path(
    post,
    path = "/api/borrowings",
    tag = "Borrowings",
    request_body = RequestBorrowPayload,
    responses(
        (status = 201, description = "Pedido de empréstimo criado", body = ApiResponse<Borrowing>),
        (status = 404, description = "Item não encontrado"),
        (status = 409, description = "Sem estoque")
    ),
    security(("api_jwt" = []))
)]
pub async fn request_borrow(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(payload): Json<RequestBorrowPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = validated(payload, &locale)?;

    let borrowing = app_state
        .borrowing_service
        .request_borrow(BorrowRequest {
            user_id: user.id,
            user_name: user.name,
            item_id: payload.item_id,
            item_code: payload.item_code,
            item_name: payload.item_name,
            notes: payload.notes,
        })
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Pedido de empréstimo enviado", "Borrow request submitted");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(message, borrowing))))
}

// GET /api/borrowings
// Técnico vê tudo; aluno só vê os próprios, independente do filtro.
#[utoipa::path(
    get,
    path = "/api/borrowings",
    tag = "Borrowings",
    params(
        ("userId" = Option<Uuid>, Query, description = "Dono do empréstimo"),
        ("itemId" = Option<Uuid>, Query, description = "Item"),
        ("status" = Option<String>, Query, description = "borrowed | returned"),
        ("approvalStatus" = Option<String>, Query, description = "pending | approved | rejected"),
        ("returnApprovalStatus" = Option<String>, Query, description = "pending | approved | rejected")
    ),
    responses(
        (status = 200, description = "Empréstimos, do mais novo ao mais antigo", body = ApiResponse<Vec<Borrowing>>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_borrowings(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Query(mut filter): Query<BorrowingFilter>,
) -> Result<impl IntoResponse, ApiError> {
    if !user.is_staff() {
        filter.user_id = Some(user.id);
    }

    let borrowings = app_state
        .borrowing_service
        .list_borrowings(&filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Empréstimos encontrados", "Borrowings found");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, borrowings))))
}

// GET /api/borrowings/me
#[utoipa::path(
    get,
    path = "/api/borrowings/me",
    tag = "Borrowings",
    responses(
        (status = 200, description = "Empréstimos do usuário logado", body = ApiResponse<Vec<Borrowing>>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_borrowings(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let filter = BorrowingFilter {
        user_id: Some(user.id),
        ..Default::default()
    };

    let borrowings = app_state
        .borrowing_service
        .list_borrowings(&filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Empréstimos encontrados", "Borrowings found");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, borrowings))))
}

// GET /api/borrowings/{id}
#[utoipa::path(
    get,
    path = "/api/borrowings/{id}",
    tag = "Borrowings",
    params(("id" = Uuid, Path, description = "ID do empréstimo")),
    responses(
        (status = 200, description = "Empréstimo", body = ApiResponse<Borrowing>),
        (status = 403, description = "Empréstimo de outro usuário"),
        (status = 404, description = "Empréstimo não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_borrowing(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(borrowing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let borrowing = app_state
        .borrowing_service
        .get_borrowing_for(&user, borrowing_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Empréstimo encontrado", "Borrowing found");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, borrowing))))
}

// POST /api/borrowings/{id}/approve
#[utoipa::path(
    post,
    path = "/api/borrowings/{id}/approve",
    tag = "Borrowings",
    params(("id" = Uuid, Path, description = "ID do empréstimo")),
    responses(
        (status = 200, description = "Empréstimo aprovado, estoque reservado", body = ApiResponse<Borrowing>),
        (status = 409, description = "Estado inválido ou sem estoque")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_borrow(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffOnly>,
    Path(borrowing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let borrowing = app_state
        .borrowing_service
        .approve_borrow(borrowing_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Empréstimo aprovado", "Borrowing approved");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, borrowing))))
}

// POST /api/borrowings/{id}/reject
#[utoipa::path(
    post,
    path = "/api/borrowings/{id}/reject",
    tag = "Borrowings",
    params(("id" = Uuid, Path, description = "ID do empréstimo")),
    responses(
        (status = 200, description = "Empréstimo rejeitado", body = ApiResponse<Borrowing>),
        (status = 409, description = "Estado inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_borrow(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffOnly>,
    Path(borrowing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let borrowing = app_state
        .borrowing_service
        .reject_borrow(borrowing_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Empréstimo rejeitado", "Borrowing rejected");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, borrowing))))
}

// GET /api/borrowings/{id}/return
// Abre a tela de devolução: devolve qual item o QR precisa ser.
#[utoipa::path(
    get,
    path = "/api/borrowings/{id}/return",
    tag = "Borrowings",
    params(("id" = Uuid, Path, description = "ID do empréstimo")),
    responses(
        (status = 200, description = "Contexto da devolução", body = ApiResponse<PendingReturn>),
        (status = 409, description = "Empréstimo não está emprestado")
    ),
    security(("api_jwt" = []))
)]
pub async fn begin_return(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(borrowing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let pending = app_state
        .borrowing_service
        .begin_return(&user, borrowing_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Aguardando leitura do QR", "Waiting for the QR scan");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, pending))))
}

// POST /api/borrowings/{id}/return/verify
#[utoipa::path(
    post,
    path = "/api/borrowings/{id}/return/verify",
    tag = "Borrowings",
    params(("id" = Uuid, Path, description = "ID do empréstimo")),
    request_body = ScanPayload,
    responses(
        (status = 200, description = "QR confere com o item emprestado", body = ApiResponse<ResolvedItem>),
        (status = 404, description = "Código desconhecido"),
        (status = 422, description = "QR de outro item")
    ),
    security(("api_jwt" = []))
)]
pub async fn verify_return(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(borrowing_id): Path<Uuid>,
    Json(payload): Json<ScanPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = validated(payload, &locale)?;

    // Só o dono ou um técnico pode conferir
    app_state
        .borrowing_service
        .get_borrowing_for(&user, borrowing_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let resolved = app_state
        .borrowing_service
        .verify_return_identity(borrowing_id, &payload.scanned_code)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Item verificado", "Item verified");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, resolved))))
}

// POST /api/borrowings/{id}/return
#[utoipa::path(
    post,
    path = "/api/borrowings/{id}/return",
    tag = "Borrowings",
    params(("id" = Uuid, Path, description = "ID do empréstimo")),
    request_body = SubmitReturnPayload,
    responses(
        (status = 200, description = "Devolução enviada para aprovação", body = ApiResponse<ReturnSubmission>),
        (status = 409, description = "Estado inválido"),
        (status = 422, description = "QR de outro item")
    ),
    security(("api_jwt" = []))
)]
pub async fn submit_return(
    State(app_state): State<AppState>,
    locale: Locale,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(borrowing_id): Path<Uuid>,
    Json(payload): Json<SubmitReturnPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = validated(payload, &locale)?;
    let service = &app_state.borrowing_service;

    let mut pending = service
        .begin_return(&user, borrowing_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;
    if let Some(expected) = payload.expected_item_id {
        pending.expected_item_id = expected;
    }

    let submission = service
        .submit_return(&user, pending, &payload.scanned_code)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Devolução enviada para aprovação", "Return submitted for approval");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, submission))))
}

// POST /api/borrowings/{id}/return/approve
#[utoipa::path(
    post,
    path = "/api/borrowings/{id}/return/approve",
    tag = "Borrowings",
    params(("id" = Uuid, Path, description = "ID do empréstimo")),
    request_body = ApproveReturnPayload,
    responses(
        (status = 200, description = "Devolução aprovada, estoque devolvido", body = ApiResponse<Borrowing>),
        (status = 409, description = "Estado inválido"),
        (status = 422, description = "Item verificado não é o emprestado")
    ),
    security(("api_jwt" = []))
)]
pub async fn approve_return(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffOnly>,
    Path(borrowing_id): Path<Uuid>,
    Json(payload): Json<ApproveReturnPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = validated(payload, &locale)?;

    let borrowing = app_state
        .borrowing_service
        .approve_return(borrowing_id, &payload.verified_item_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Devolução aprovada", "Return approved");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, borrowing))))
}

// POST /api/borrowings/{id}/return/reject
#[utoipa::path(
    post,
    path = "/api/borrowings/{id}/return/reject",
    tag = "Borrowings",
    params(("id" = Uuid, Path, description = "ID do empréstimo")),
    responses(
        (status = 200, description = "Devolução rejeitada, item continua emprestado", body = ApiResponse<Borrowing>),
        (status = 409, description = "Estado inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn reject_return(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffOnly>,
    Path(borrowing_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let borrowing = app_state
        .borrowing_service
        .reject_return(borrowing_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Devolução rejeitada", "Return rejected");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, borrowing))))
}
