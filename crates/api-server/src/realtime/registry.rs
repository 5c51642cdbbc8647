//! Session registry - tracks realtime connections and their organization
//!
//! A connection is recorded on connect with the user its handshake token
//! names (if any), and belongs to at most one organization channel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Option<Uuid>,
    pub organization: Option<Uuid>,
    pub connected_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new connection. `user_id` is `None` for unauthenticated ones.
    pub async fn connect(&self, socket_id: impl Into<String>, user_id: Option<Uuid>) {
        let socket_id = socket_id.into();
        let mut sessions = self.sessions.write().await;
        debug!("Session {} connected (user: {:?})", socket_id, user_id);
        sessions.insert(
            socket_id,
            Session {
                user_id,
                organization: None,
                connected_at: Utc::now(),
            },
        );
    }

    pub async fn user_of(&self, socket_id: &str) -> Option<Uuid> {
        let sessions = self.sessions.read().await;
        sessions.get(socket_id).and_then(|session| session.user_id)
    }

    /// Move a connection into `organization`'s channel.
    ///
    /// Returns the channel it was in before, if any.
    pub async fn join(&self, socket_id: &str, organization: Uuid) -> Option<Uuid> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(socket_id)?;
        let previous = session.organization.replace(organization);
        info!("Session {} joined organization {}", socket_id, organization);
        previous.filter(|previous| *previous != organization)
    }

    pub async fn leave(&self, socket_id: &str) -> Option<Uuid> {
        let mut sessions = self.sessions.write().await;
        sessions
            .get_mut(socket_id)
            .and_then(|session| session.organization.take())
    }

    pub async fn disconnect(&self, socket_id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(socket_id);
        if removed.is_some() {
            debug!("Session {} removed", socket_id);
        }
        removed
    }

    /// Connection ids currently in `organization`'s channel.
    pub async fn connections_for(&self, organization: Uuid) -> Vec<String> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .filter(|(_, session)| session.organization == Some(organization))
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
