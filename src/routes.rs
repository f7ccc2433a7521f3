// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers, middleware::auth::auth_guard};

pub fn build_router(app_state: AppState) -> Router {
    // Catálogo de itens (escrita só para técnicos, via RequireRole nos handlers)
    let item_routes = Router::new()
        .route("/"
               ,post(handlers::items::create_item)
               .get(handlers::items::list_items)
        )
        .route("/{id}"
               ,get(handlers::items::get_item)
               .put(handlers::items::update_item)
               .delete(handlers::items::delete_item)
        )
        .route("/code/{code}", get(handlers::items::get_item_by_code))
        .route("/verify/{code}", get(handlers::items::verify_item));

    // Workflow de empréstimo e devolução
    let borrowing_routes = Router::new()
        .route("/"
               ,post(handlers::borrowings::request_borrow)
               .get(handlers::borrowings::list_borrowings)
        )
        .route("/me", get(handlers::borrowings::list_my_borrowings))
        .route("/{id}", get(handlers::borrowings::get_borrowing))
        .route("/{id}/approve", post(handlers::borrowings::approve_borrow))
        .route("/{id}/reject", post(handlers::borrowings::reject_borrow))
        .route("/{id}/return"
               ,get(handlers::borrowings::begin_return)
               .post(handlers::borrowings::submit_return)
        )
        .route("/{id}/return/verify", post(handlers::borrowings::verify_return))
        .route("/{id}/return/approve", post(handlers::borrowings::approve_return))
        .route("/{id}/return/reject", post(handlers::borrowings::reject_return));

    // Tudo aqui exige token
    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .nest("/items", item_routes)
        .nest("/borrowings", borrowing_routes)
        .route("/verification-logs", get(handlers::verification::list_verification_logs))
        .route("/dashboard/summary", get(handlers::dashboard::get_summary))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", protected_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
