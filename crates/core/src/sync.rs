//! Realtime sync events
//!
//! The server emits one of these on an organization channel after every
//! successful mutation. On the wire an event is a Socket.IO event name plus a
//! JSON payload; `name()` / `data()` split it apart and `from_wire` joins it
//! back together on the client side.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::hackathon::{HackathonEvent, HackathonView};
use crate::task::TaskView;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum SyncEvent {
    TaskCreated(TaskView),
    TaskUpdated(TaskView),
    TaskDeleted {
        #[serde(rename = "taskId")]
        task_id: Uuid,
    },
    /// Full post-reorder list of the organization in canonical order
    TasksReordered { tasks: Vec<TaskView> },
    HackathonCreated(HackathonView),
    HackathonUpdated(HackathonView),
    HackathonDeleted {
        #[serde(rename = "hackathonId")]
        hackathon_id: Uuid,
    },
    HackathonEventAdded {
        #[serde(rename = "hackathonId")]
        hackathon_id: Uuid,
        event: HackathonEvent,
    },
    HackathonEventUpdated {
        #[serde(rename = "hackathonId")]
        hackathon_id: Uuid,
        event: HackathonEvent,
    },
    HackathonEventDeleted {
        #[serde(rename = "hackathonId")]
        hackathon_id: Uuid,
        #[serde(rename = "eventId")]
        event_id: Uuid,
    },
}

impl SyncEvent {
    /// Every event name a client should listen for.
    pub const NAMES: [&'static str; 10] = [
        "task-created",
        "task-updated",
        "task-deleted",
        "tasks-reordered",
        "hackathon-created",
        "hackathon-updated",
        "hackathon-deleted",
        "hackathon-event-added",
        "hackathon-event-updated",
        "hackathon-event-deleted",
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskCreated(_) => "task-created",
            Self::TaskUpdated(_) => "task-updated",
            Self::TaskDeleted { .. } => "task-deleted",
            Self::TasksReordered { .. } => "tasks-reordered",
            Self::HackathonCreated(_) => "hackathon-created",
            Self::HackathonUpdated(_) => "hackathon-updated",
            Self::HackathonDeleted { .. } => "hackathon-deleted",
            Self::HackathonEventAdded { .. } => "hackathon-event-added",
            Self::HackathonEventUpdated { .. } => "hackathon-event-updated",
            Self::HackathonEventDeleted { .. } => "hackathon-event-deleted",
        }
    }

    /// The payload half of the wire form.
    pub fn data(&self) -> Result<Value> {
        let mut envelope = serde_json::to_value(self)?;
        Ok(envelope
            .get_mut("data")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Rebuild an event from its name and payload.
    pub fn from_wire(name: &str, data: Value) -> Result<Self> {
        let envelope = serde_json::json!({ "event": name, "data": data });
        Ok(serde_json::from_value(envelope)?)
    }
}
