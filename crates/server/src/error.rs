use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tlog_backend::BackendError;
use tlog_primitives::ascii::AsciiError;
use tlog_primitives::crypto::SignError;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Sign(#[from] SignError),
    #[error("unknown witness {0}")]
    UnknownWitness(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("duplicate cosignature from {0}")]
    DuplicateSignature(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<AsciiError> for LogError {
    fn from(e: AsciiError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl LogError {
    pub fn status(&self) -> StatusCode {
        match self {
            LogError::Backend(BackendError::NotFound(_)) => StatusCode::NOT_FOUND,
            LogError::Backend(BackendError::OutOfRange(_)) => StatusCode::BAD_REQUEST,
            LogError::Backend(_) | LogError::Sign(_) => StatusCode::INTERNAL_SERVER_ERROR,
            LogError::UnknownWitness(_)
            | LogError::InvalidSignature
            | LogError::DuplicateSignature(_)
            | LogError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for LogError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self);
        }
        (status, format!("error={}\n", self)).into_response()
    }
}
