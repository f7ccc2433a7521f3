// src/handlers/auth.rs

use axum::Json;

use crate::{
    common::response::ApiResponse,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::User,
};

// Handler da rota protegida /me
#[utoipa::path(
    get,
    path = "/api/me",
    tag = "Users",
    responses(
        (status = 200, description = "Usuário do token", body = ApiResponse<User>),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_me(locale: Locale, AuthenticatedUser(user): AuthenticatedUser) -> Json<ApiResponse<User>> {
    let message = locale.pick("Usuário autenticado", "Authenticated user");
    Json(ApiResponse::ok(message, user))
}
