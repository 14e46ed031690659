//! Backend gateway.
//!
//! - `api` - HTTP client and its error type
//! - `models` - request/response payloads
//! - `validate` - required-field checks before submit

pub mod api;
pub mod models;
pub mod validate;

pub use api::{ApiClient, GatewayError, ProgressFn, UploadFile};
pub use models::*;
pub use validate::ValidationError;
