//! Error types shared by the relay.
//!
//! Only the publish path reports errors to a caller. Subscriber-side delivery
//! problems are logged where they happen and never reach this type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The publish body was refused before the stored state was touched.
    #[error("rejected payload: {message}")]
    RejectedPayload { status: StatusCode, message: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::RejectedPayload { status, .. } => *status,
            RelayError::Config(_) | RelayError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
