//! Broadcast dispatcher - fans committed mutations out to an organization
//!
//! Events go to the Socket.IO room named after the organization id (the
//! originating connection included) and to an in-process channel that tests
//! and diagnostics can subscribe to. Delivery is fire-and-forget.

use std::sync::Arc;

use socketioxide::SocketIo;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};
use uuid::Uuid;

use taskflow_core::sync::SyncEvent;

use super::registry::SessionRegistry;

/// An event together with the organization channel it was sent to
#[derive(Debug, Clone)]
pub struct OrgEvent {
    pub organization: Uuid,
    pub event: SyncEvent,
}

#[derive(Clone)]
pub struct Broadcaster {
    io: Arc<RwLock<Option<SocketIo>>>,
    event_tx: broadcast::Sender<OrgEvent>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(1000);
        Self {
            io: Arc::new(RwLock::new(None)),
            event_tx,
        }
    }

    /// Attach the Socket.IO instance once the layer is built.
    pub async fn set_socket_io(&self, io: SocketIo) {
        *self.io.write().await = Some(io);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrgEvent> {
        self.event_tx.subscribe()
    }

    /// Emit `event` to every connection in `organization`'s channel.
    pub async fn publish(&self, organization: Uuid, event: SyncEvent) {
        let name = event.name();
        debug!("Broadcasting {} to organization {}", name, organization);

        let io = self.io.read().await.clone();
        if let Some(io) = io {
            match event.data() {
                Ok(data) => {
                    if let Err(err) = io.to(organization.to_string()).emit(name, &data) {
                        warn!("Failed to broadcast {}: {}", name, err);
                    }
                }
                Err(err) => error!("Failed to serialize {}: {}", name, err),
            }
        }

        // No receivers is the normal case outside tests.
        let _ = self.event_tx.send(OrgEvent {
            organization,
            event,
        });
    }

    /// Log every published event with the number of connections it reached.
    pub fn spawn_delivery_log(&self, registry: SessionRegistry) -> JoinHandle<()> {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(sent) => {
                        let recipients = registry.connections_for(sent.organization).await.len();
                        debug!(
                            "Delivered {} to {} connection(s) in organization {}",
                            sent.event.name(),
                            recipients,
                            sent.organization
                        );
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Delivery log lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
