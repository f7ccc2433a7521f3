pub mod auth;
pub mod workflow;
pub mod qr_resolver;
pub use qr_resolver::QrResolver;
pub mod borrowing_service;
pub use borrowing_service::BorrowingService;
pub mod item_service;
pub use item_service::ItemService;
pub mod verification_service;
pub use verification_service::VerificationService;
pub mod dashboard_service;
pub use dashboard_service::DashboardService;
