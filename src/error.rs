use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("missing webhook signature")]
    MissingSignature,

    #[error("invalid webhook signature")]
    InvalidSignature,

    #[error("webhook secret not configured")]
    SecretNotConfigured,

    #[error("source address not allowed: {0}")]
    ForbiddenSource(String),

    #[error("request body is empty")]
    EmptyBody,

    #[error("malformed request: {0}")]
    MalformedBody(String),

    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl WebhookError {
    pub fn persistence(err: anyhow::Error) -> Self {
        Self::Persistence(format!("{err:#}"))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingSignature | Self::InvalidSignature | Self::SecretNotConfigured => {
                StatusCode::UNAUTHORIZED
            }
            Self::ForbiddenSource(_) => StatusCode::FORBIDDEN,
            Self::EmptyBody | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingSignature => "MISSING_SIGNATURE",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::SecretNotConfigured => "SECRET_NOT_CONFIGURED",
            Self::ForbiddenSource(_) => "FORBIDDEN_SOURCE",
            Self::EmptyBody => "EMPTY_BODY",
            Self::MalformedBody(_) => "MALFORMED_BODY",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorPayload,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error: ErrorPayload {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        (self.status_code(), Json(body)).into_response()
    }
}
