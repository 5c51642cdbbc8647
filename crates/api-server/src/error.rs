//! HTTP-facing error type
//!
//! Every handler returns `Result<_, ApiError>`; the error renders as
//! `{ "error": <message>, "code": <code> }` with the matching status.
//! In production, [`mask_internal_errors`] swaps 500 messages for a generic
//! text after the handler has run.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::state::AppState;

const GENERIC_SERVER_ERROR: &str = "Internal server error";

/// Left on responses rendered from [`ApiError::Internal`].
#[derive(Debug, Clone, Copy)]
struct InternalErrorMarker;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let internal = matches!(self, Self::Internal(_));
        if internal {
            tracing::error!("Internal error: {}", self);
        }

        let status = self.status();
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code(),
        };
        let mut response = (status, Json(body)).into_response();
        if internal {
            response.extensions_mut().insert(InternalErrorMarker);
        }
        response
    }
}

/// Replace internal error details with a generic message in production.
pub async fn mask_internal_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !state.config().is_production()
        || response.extensions().get::<InternalErrorMarker>().is_none()
    {
        return response;
    }

    let body = ErrorResponse {
        error: GENERIC_SERVER_ERROR.to_string(),
        code: "internal_error",
    };
    (response.status(), Json(body)).into_response()
}

impl From<taskflow_core::Error> for ApiError {
    fn from(err: taskflow_core::Error) -> Self {
        use taskflow_core::Error;

        match err {
            Error::TaskNotFound(_) | Error::HackathonNotFound(_) | Error::EventNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            Error::InvalidInput(message) => Self::Validation(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidInput(message) => Self::Validation(message),
            AuthError::Unauthorized(message) => Self::Unauthorized(message),
            AuthError::NotFound(message) => Self::NotFound(message),
            AuthError::Conflict(message) => Self::Conflict(message),
            AuthError::Storage(message) => Self::Internal(message),
        }
    }
}
