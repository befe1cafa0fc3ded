//! Authentication error types.

use thiserror::Error;

use shopmart_core::ValidationError;

use super::ResetStep;
use crate::api::ApiError;
use crate::session::SessionError;

/// Shown when the remote API rejects credentials without saying why.
const DEFAULT_INVALID_CREDENTIALS: &str = "Incorrect email or password";

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A form field failed client-side validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Wrong email/password or rejected credential.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The remote API refused the request with a reason for the shopper
    /// ("Account Already Exists", "Reset code is invalid or has expired").
    #[error("{0}")]
    Rejected(String),

    /// The operation needs a signed-in shopper.
    #[error("not signed in")]
    NotSignedIn,

    /// The issued credential could not be read.
    #[error("invalid session: {0}")]
    Session(#[from] SessionError),

    /// A reset wizard action was used out of order.
    #[error("password reset is at step {actual:?}, expected {expected:?}")]
    WrongStep {
        /// Step the action belongs to.
        expected: ResetStep,
        /// Step the wizard is on.
        actual: ResetStep,
    },

    /// Transport, parse or server failure.
    #[error("remote error: {0}")]
    Api(ApiError),
}

impl From<ApiError> for AuthError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Unauthorized(message) if message.is_empty() => {
                Self::InvalidCredentials(DEFAULT_INVALID_CREDENTIALS.to_string())
            }
            ApiError::Unauthorized(message) => Self::InvalidCredentials(message),
            other if !other.is_unexpected() => match other.remote_message() {
                Some(message) => Self::Rejected(message.to_string()),
                None => Self::Api(other),
            },
            other => Self::Api(other),
        }
    }
}
