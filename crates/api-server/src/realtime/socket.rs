//! Socket.IO event handlers
//!
//! Clients authenticate in the handshake (`auth: { token }`) and then ask to
//! join their organization's channel. A join is only honored when the
//! verified user currently belongs to that organization.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use socketioxide::extract::{SocketRef, State, TryData};
use socketioxide::{SocketIo, TransportType};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthStore;

use super::registry::SessionRegistry;

/// Shared state for Socket.IO handlers
#[derive(Clone)]
pub struct SocketState {
    pub registry: SessionRegistry,
    pub auth_store: AuthStore,
}

#[derive(Debug, Default, Deserialize)]
pub struct HandshakeAuth {
    #[serde(default)]
    pub token: Option<String>,
}

/// `join-organization` accepts a bare id or `{ organizationId }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum JoinPayload {
    Id(String),
    #[serde(rename_all = "camelCase")]
    Object { organization_id: String },
}

impl JoinPayload {
    fn organization_id(&self) -> Option<Uuid> {
        let raw = match self {
            Self::Id(id) => id,
            Self::Object { organization_id } => organization_id,
        };
        Uuid::parse_str(raw.trim()).ok()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedPayload {
    pub organization_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}

/// Handle new socket connection
pub async fn on_connect(
    socket: SocketRef,
    TryData(auth): TryData<HandshakeAuth>,
    State(state): State<SocketState>,
) {
    let user_id = match auth.ok().and_then(|auth| auth.token) {
        Some(token) => match state.auth_store.authorize_bearer(&token).await {
            Ok(session) => Some(session.user.id),
            Err(err) => {
                warn!("Socket {} presented an invalid token: {}", socket.id, err);
                None
            }
        },
        None => None,
    };
    info!("Client connected: {} (user: {:?})", socket.id, user_id);
    state.registry.connect(socket.id.to_string(), user_id).await;

    socket.on(
        "join-organization",
        |socket: SocketRef,
         State(state): State<SocketState>,
         TryData(data): TryData<JoinPayload>| async move {
            let organization = data.ok().and_then(|payload| payload.organization_id());
            handle_join(socket, state, organization).await;
        },
    );

    socket.on(
        "leave-organization",
        |socket: SocketRef, State(state): State<SocketState>| async move {
            if let Some(organization) = state.registry.leave(&socket.id.to_string()).await {
                let _ = socket.leave(organization.to_string());
                info!("Client {} left organization {}", socket.id, organization);
            }
        },
    );

    socket.on_disconnect(
        |socket: SocketRef, State(state): State<SocketState>| async move {
            match state.registry.disconnect(&socket.id.to_string()).await {
                Some(session) => info!(
                    "Client disconnected: {} after {}s",
                    socket.id,
                    (Utc::now() - session.connected_at).num_seconds()
                ),
                None => info!("Client disconnected: {}", socket.id),
            }
        },
    );
}

/// A join the registry has accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinGrant {
    pub organization: Uuid,
    /// Channel the connection was moved out of, if any.
    pub previous: Option<Uuid>,
}

/// Decide a `join-organization` request and record it in the registry.
///
/// The error is the message sent back with `join-error`.
pub async fn authorize_join(
    registry: &SessionRegistry,
    auth_store: &AuthStore,
    socket_id: &str,
    organization: Option<Uuid>,
) -> Result<JoinGrant, &'static str> {
    let organization = organization.ok_or("Invalid organization id")?;
    let user_id = registry
        .user_of(socket_id)
        .await
        .ok_or("Authentication required")?;
    if !auth_store.is_member(user_id, organization).await {
        warn!(
            "User {} tried to join organization {} without membership",
            user_id, organization
        );
        return Err("Not a member of this organization");
    }

    let previous = registry.join(socket_id, organization).await;
    info!("User {} joined organization {}", user_id, organization);
    Ok(JoinGrant {
        organization,
        previous,
    })
}

async fn handle_join(socket: SocketRef, state: SocketState, organization: Option<Uuid>) {
    let socket_id = socket.id.to_string();
    let grant =
        match authorize_join(&state.registry, &state.auth_store, &socket_id, organization).await {
            Ok(grant) => grant,
            Err(message) => {
                emit_join_error(&socket, message);
                return;
            }
        };

    if let Some(previous) = grant.previous {
        let _ = socket.leave(previous.to_string());
    }
    let _ = socket.join(grant.organization.to_string());
    let _ = socket.emit(
        "joined-organization",
        &JoinedPayload {
            organization_id: grant.organization,
        },
    );
}

fn emit_join_error(socket: &SocketRef, message: &str) {
    let _ = socket.emit(
        "join-error",
        &ErrorPayload {
            message: message.to_string(),
        },
    );
}

/// Create and configure Socket.IO layer
pub fn create_socket_layer(state: SocketState) -> (socketioxide::layer::SocketIoLayer, SocketIo) {
    let (layer, io) = SocketIo::builder()
        .with_state(state)
        // Only allow WebSocket transport to avoid CORS issues with polling
        .transports([TransportType::Websocket])
        .build_layer();

    io.ns("/", on_connect);

    (layer, io)
}
