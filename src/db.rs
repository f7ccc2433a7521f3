pub mod store;
pub use store::{LabStore, StoreError};
pub mod memory_store;
pub use memory_store::MemoryLabStore;
pub mod pg_store;
pub use pg_store::PgLabStore;
