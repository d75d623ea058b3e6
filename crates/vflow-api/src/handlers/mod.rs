//! HTTP handlers.

pub mod health;
pub mod pipeline;
pub mod snapshot;
pub mod videos;

pub use health::{health, ready};

use validator::Validate;

use crate::error::{ApiError, ApiResult};

/// Run `validator` rules on a request body.
pub(crate) fn validate<T: Validate>(request: &T) -> ApiResult<()> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))
}
