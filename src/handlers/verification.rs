// src/handlers/verification.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::{error::ApiError, response::ApiResponse},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{RequireRole, StaffOnly},
    },
    models::verification::{VerificationLog, VerificationLogFilter},
};

// GET /api/verification-logs
#[utoipa::path(
    get,
    path = "/api/verification-logs",
    tag = "Verification",
    params(
        ("userId" = Option<Uuid>, Query, description = "Quem fez a leitura"),
        ("barcode" = Option<String>, Query, description = "Texto lido"),
        ("limit" = Option<i64>, Query, description = "Máximo de registros (padrão 100)")
    ),
    responses(
        (status = 200, description = "Leituras, da mais recente para a mais antiga", body = ApiResponse<Vec<VerificationLog>>),
        (status = 403, description = "Apenas técnicos")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_verification_logs(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffOnly>,
    Query(filter): Query<VerificationLogFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let logs = app_state
        .verification_service
        .list_logs(&filter)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Leituras encontradas", "Scans found");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, logs))))
}
