pub mod auth;
pub mod extract;

pub use auth::{AuthUser, Claims};
pub use extract::{ApiJson, ApiPath, ApiQuery};
