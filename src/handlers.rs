pub mod auth;
pub mod borrowings;
pub mod dashboard;
pub mod items;
pub mod verification;
