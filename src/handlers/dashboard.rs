// src/handlers/dashboard.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    common::{error::ApiError, response::ApiResponse},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{RequireRole, StaffOnly},
    },
    models::dashboard::DashboardSummary,
};

// GET /api/dashboard/summary
#[utoipa::path(
    get,
    path = "/api/dashboard/summary",
    tag = "Dashboard",
    responses(
        (status = 200, description = "Resumo do laboratório: itens, filas de aprovação e últimas leituras", body = ApiResponse<DashboardSummary>),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Apenas técnicos")
    ),
    security(
        ("api_jwt" = [])
    )
)]
pub async fn get_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequireRole<StaffOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = app_state
        .dashboard_service
        .get_summary(app_state.recent_scans_limit)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    let message = locale.pick("Resumo do laboratório", "Lab summary");
    Ok((StatusCode::OK, Json(ApiResponse::ok(message, summary))))
}
