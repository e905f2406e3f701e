pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use memory::MemoryLeadStore;
pub use postgres::PgLeadStore;
pub use store::{scan_all, LeadFilter, LeadStore, Page, ScanCursor, StoreError};
