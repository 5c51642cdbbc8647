//! Application state

use std::sync::Arc;

use taskflow_core::hackathon::FileHackathonStore;
use taskflow_core::task::FileTaskStore;

use crate::auth::AuthStore;
use crate::config::AppConfig;
use crate::pipeline::{HackathonPipeline, TaskPipeline};
use crate::realtime::{Broadcaster, SessionRegistry, SocketState};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    auth_store: AuthStore,
    tasks: TaskPipeline,
    hackathons: HackathonPipeline,
    sessions: SessionRegistry,
    broadcaster: Broadcaster,
}

impl AppState {
    /// Open every store under the configured data directory.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let data_dir = config.data_dir.clone();
        let auth_store = AuthStore::new(
            data_dir.join("auth"),
            config.jwt_secret.clone(),
            config.token_ttl_seconds,
        )
        .await?;
        let task_store = FileTaskStore::new(data_dir.join("tasks.json")).await?;
        let hackathon_store = FileHackathonStore::new(data_dir.join("hackathons.json")).await?;

        let broadcaster = Broadcaster::new();
        let users = Arc::new(auth_store.clone());
        let tasks = TaskPipeline::new(Arc::new(task_store), users.clone(), broadcaster.clone());
        let hackathons =
            HackathonPipeline::new(Arc::new(hackathon_store), users, broadcaster.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                auth_store,
                tasks,
                hackathons,
                sessions: SessionRegistry::new(),
                broadcaster,
            }),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn auth_store(&self) -> &AuthStore {
        &self.inner.auth_store
    }

    pub fn tasks(&self) -> &TaskPipeline {
        &self.inner.tasks
    }

    pub fn hackathons(&self) -> &HackathonPipeline {
        &self.inner.hackathons
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.inner.broadcaster
    }

    /// State handed to the Socket.IO handlers.
    pub fn socket_state(&self) -> SocketState {
        SocketState {
            registry: self.inner.sessions.clone(),
            auth_store: self.inner.auth_store.clone(),
        }
    }
}
