//! Error responses
//!
//! Everything here leaves the request with a non-2xx status and the
//! `{"status":"error","message":...}` envelope. State-machine refusals are
//! not errors at this level: handlers return them in-band with 200.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use oven_core::OvenResponse;
use oven_core::appliance::ValidationError;
use oven_core::catalog::CatalogError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("{0}")]
    NotFound(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("internal failure: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        Self::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(format!("Invalid path: {}", rejection.body_text()))
    }
}

impl From<CatalogError> for ApiError {
    fn from(e: CatalogError) -> Self {
        if e.is_storage() {
            return Self::Storage(e.to_string());
        }
        match e {
            CatalogError::NotFound(_) => Self::NotFound(e.to_string()),
            CatalogError::Invalid(_) | CatalogError::EmptyField(_) | CatalogError::DefaultProgram(_) => {
                Self::BadRequest(e.to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::BadRequest(m) | Self::NotFound(m) => m.clone(),
            Self::Unauthorized(m) => (*m).to_string(),
            Self::Storage(detail) => {
                tracing::error!("Program storage error: {}", detail);
                "Failed to access programs".to_string()
            }
            Self::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
        };

        (self.status_code(), Json(OvenResponse::error(message))).into_response()
    }
}
