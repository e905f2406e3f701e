pub mod auth;
pub mod response;

pub use auth::require_identity;
pub use response::{ApiResponse, ApiResult};
