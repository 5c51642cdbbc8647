//! Route handlers

pub mod auth;
pub mod hackathons;
pub mod health;
pub mod organizations;
pub mod tasks;

use axum::Router;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Path ids that do not parse are reported like missing records.
pub(crate) fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::NotFound(not_found.to_string()))
}

/// Every REST route under `/api`.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(organizations::router())
        .merge(tasks::router())
        .merge(hackathons::router())
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::config::AppConfig;
    use crate::state::AppState;

    pub async fn build_state() -> (AppState, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::with_data_dir(temp_dir.path());
        let state = AppState::new(config).await.unwrap();
        (state, temp_dir)
    }

    /// Register a user and return their bearer token and id.
    pub async fn register(state: &AppState, name: &str) -> (String, Uuid) {
        let session = state
            .auth_store()
            .register(name, &format!("{}@example.com", name.to_lowercase()), "verysecurepw")
            .await
            .unwrap();
        let token = state.auth_store().encode_claims(&session.claims).unwrap();
        (token, session.user.id)
    }

    /// Register a user who owns a fresh organization.
    pub async fn register_with_org(state: &AppState, name: &str) -> (String, Uuid) {
        let (token, user_id) = register(state, name).await;
        let org = state
            .auth_store()
            .create_organization(user_id, &format!("{} Org", name), None)
            .await
            .unwrap();
        (token, org.id)
    }

    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, payload)
    }
}
