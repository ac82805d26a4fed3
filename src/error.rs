use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::{composer::ComposeError, normalizer::NormalizeError, session::SessionError};

/// Failures talking to a generation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("provider returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("could not parse provider response: {0}")]
    Parse(String),
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StudioError>;

#[derive(Debug, Error)]
pub enum StudioError {
    #[error(transparent)]
    Validation(#[from] ComposeError),
    #[error(transparent)]
    Image(#[from] NormalizeError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{0}")]
    Provider(#[from] ProviderError),
    #[error("session {0} not found")]
    SessionNotFound(uuid::Uuid),
    #[error("{0}")]
    BadRequest(String),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StudioError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Image(NormalizeError::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Image(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Session(SessionError::AdminOnly(_)) | Self::Session(SessionError::ProviderNotAllowed(_)) => {
                StatusCode::FORBIDDEN
            }
            Self::Session(SessionError::Invalid(_)) | Self::Session(SessionError::Compose(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Session(_) => StatusCode::CONFLICT,
            Self::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Self::Provider(ProviderError::NotConfigured(_)) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Provider(ProviderError::Api { status, .. }) => match *status {
                400 => StatusCode::BAD_REQUEST,
                429 => StatusCode::TOO_MANY_REQUESTS,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::Provider(_) => StatusCode::BAD_GATEWAY,
            Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => "invalid_request_error",
            Self::Image(_) => "image_error",
            Self::Session(_) => "session_error",
            Self::SessionNotFound(_) => "not_found_error",
            Self::Provider(_) => "provider_error",
            Self::Task(_) => "internal_error",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    r#type: &'static str,
    code: u16,
}

impl IntoResponse for StudioError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetails {
                message: self.to_string(),
                r#type: self.error_type(),
                code: status.as_u16(),
            },
        };
        (status, Json(body)).into_response()
    }
}
