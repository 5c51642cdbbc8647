//! Request extractors

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// A `Json<T>` that reports malformed bodies as validation failures.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::Validation(e.body_text()))?;
        Ok(ApiJson(value))
    }
}

/// Caller identity from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub organization: Option<Uuid>,
}

impl AuthUser {
    /// The caller's organization, required by every task and hackathon route.
    pub fn organization(&self) -> Result<Uuid, ApiError> {
        self.organization
            .ok_or_else(|| ApiError::NotFound("User not part of any organization".to_string()))
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Unauthorized("Token is not valid".to_string()))?;

        let session = state.auth_store().authorize_bearer(token).await?;
        Ok(AuthUser {
            id: session.user.id,
            organization: session.user.organization,
        })
    }
}
