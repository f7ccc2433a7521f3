// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Users ---
        handlers::auth::get_me,

        // --- Items ---
        handlers::items::create_item,
        handlers::items::list_items,
        handlers::items::get_item,
        handlers::items::get_item_by_code,
        handlers::items::verify_item,
        handlers::items::update_item,
        handlers::items::delete_item,

        // --- Borrowings ---
        handlers::borrowings::request_borrow,
        handlers::borrowings::list_borrowings,
        handlers::borrowings::list_my_borrowings,
        handlers::borrowings::get_borrowing,
        handlers::borrowings::approve_borrow,
        handlers::borrowings::reject_borrow,
        handlers::borrowings::begin_return,
        handlers::borrowings::verify_return,
        handlers::borrowings::submit_return,
        handlers::borrowings::approve_return,
        handlers::borrowings::reject_return,

        // --- Verification ---
        handlers::verification::list_verification_logs,

        // --- Dashboard ---
        handlers::dashboard::get_summary,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,
            models::auth::User,

            // --- Items ---
            models::item::ItemCondition,
            models::item::Item,
            handlers::items::CreateItemPayload,
            handlers::items::UpdateItemPayload,

            // --- Borrowings ---
            models::borrowing::BorrowStatus,
            models::borrowing::ApprovalStatus,
            models::borrowing::Borrowing,
            models::borrowing::PendingReturn,
            services::borrowing_service::ReturnSubmission,
            services::qr_resolver::MatchedBy,
            services::qr_resolver::ResolvedItem,
            handlers::borrowings::RequestBorrowPayload,
            handlers::borrowings::ScanPayload,
            handlers::borrowings::SubmitReturnPayload,
            handlers::borrowings::ApproveReturnPayload,

            // --- Verification ---
            models::verification::VerificationStatus,
            models::verification::VerificationLog,
            services::verification_service::ScanResult,

            // --- Dashboard ---
            models::dashboard::DashboardSummary,
        )
    ),
    tags(
        (name = "Users", description = "Dados do usuário do token"),
        (name = "Items", description = "Catálogo de itens do laboratório"),
        (name = "Borrowings", description = "Empréstimo e devolução com aprovação"),
        (name = "Verification", description = "Leituras de QR Code"),
        (name = "Dashboard", description = "Indicadores do laboratório")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
