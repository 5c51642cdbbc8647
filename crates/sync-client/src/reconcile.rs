//! Applying server broadcasts to the local caches
//!
//! Broadcasts carry canonical values, so every rule here is an upsert or a
//! delete by id. Replaying an event, or receiving the echo of a mutation
//! whose response was already applied, leaves the cache unchanged.

use std::cmp::Ordering;

use tracing::debug;
use uuid::Uuid;

use taskflow_core::hackathon::HackathonView;
use taskflow_core::sync::SyncEvent;
use taskflow_core::task::TaskView;

use crate::cache::{Cached, EntityCache};

/// Local copy of the organization's task list, in display order.
#[derive(Debug, Clone, Default)]
pub struct TaskBoard {
    cache: EntityCache<TaskView>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &EntityCache<TaskView> {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut EntityCache<TaskView> {
        &mut self.cache
    }

    pub fn tasks(&self) -> Vec<TaskView> {
        self.cache.values()
    }

    pub fn get(&self, id: Uuid) -> Option<&Cached<TaskView>> {
        self.cache.get(id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Take a full server listing as-is.
    pub fn replace_all(&mut self, tasks: Vec<TaskView>) {
        self.cache.replace_all(tasks);
    }

    pub fn confirm(&mut self, task: TaskView) {
        self.cache.upsert_confirmed(task);
        self.sort();
    }

    /// Apply a task event. Returns false for events about other entities.
    pub fn apply(&mut self, event: &SyncEvent) -> bool {
        match event {
            SyncEvent::TaskCreated(task) | SyncEvent::TaskUpdated(task) => {
                self.confirm(task.clone());
            }
            SyncEvent::TaskDeleted { task_id } => {
                self.cache.remove(*task_id);
            }
            SyncEvent::TasksReordered { tasks } => {
                self.cache.replace_all(tasks.clone());
            }
            _ => return false,
        }
        true
    }

    /// Position after every current task.
    pub(crate) fn next_order(&self) -> i64 {
        self.cache
            .entries()
            .iter()
            .map(|entry| entry.value.order + 1)
            .max()
            .unwrap_or(0)
    }

    pub(crate) fn sort(&mut self) {
        self.cache.sort_by(compare_tasks);
    }
}

/// `order` ascending, then newest first.
fn compare_tasks(a: &TaskView, b: &TaskView) -> Ordering {
    a.order
        .cmp(&b.order)
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Local copy of the organization's hackathons, newest first.
#[derive(Debug, Clone, Default)]
pub struct HackathonLog {
    cache: EntityCache<HackathonView>,
}

impl HackathonLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &EntityCache<HackathonView> {
        &self.cache
    }

    pub(crate) fn cache_mut(&mut self) -> &mut EntityCache<HackathonView> {
        &mut self.cache
    }

    pub fn hackathons(&self) -> Vec<HackathonView> {
        self.cache.values()
    }

    pub fn get(&self, id: Uuid) -> Option<&Cached<HackathonView>> {
        self.cache.get(id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn replace_all(&mut self, hackathons: Vec<HackathonView>) {
        self.cache.replace_all(hackathons);
    }

    pub fn confirm(&mut self, hackathon: HackathonView) {
        self.cache.upsert_confirmed(hackathon);
        self.cache.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    }

    /// Apply a hackathon event. Returns false for events about other entities.
    ///
    /// Nested event changes for a hackathon that is not cached are dropped;
    /// the next full listing brings the parent in.
    pub fn apply(&mut self, event: &SyncEvent) -> bool {
        match event {
            SyncEvent::HackathonCreated(hackathon) | SyncEvent::HackathonUpdated(hackathon) => {
                self.confirm(hackathon.clone());
            }
            SyncEvent::HackathonDeleted { hackathon_id } => {
                self.cache.remove(*hackathon_id);
            }
            SyncEvent::HackathonEventAdded {
                hackathon_id,
                event,
            }
            | SyncEvent::HackathonEventUpdated {
                hackathon_id,
                event,
            } => {
                let found = self
                    .cache
                    .update(*hackathon_id, |parent| parent.upsert_event(event.clone()));
                if !found {
                    debug!("Ignoring event {} for unknown hackathon {}", event.id, hackathon_id);
                }
            }
            SyncEvent::HackathonEventDeleted {
                hackathon_id,
                event_id,
            } => {
                let found = self.cache.update(*hackathon_id, |parent| {
                    parent.remove_event(*event_id);
                });
                if !found {
                    debug!("Ignoring event deletion for unknown hackathon {}", hackathon_id);
                }
            }
            _ => return false,
        }
        true
    }
}
