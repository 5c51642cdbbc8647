//! Optimistic client over a [`SyncBackend`]
//!
//! Every mutation follows the same shape: change the local cache right away,
//! send the request, then either confirm the entry with the server's
//! canonical value or roll the local change back and return the error.
//! Nothing is retried. Broadcasts from the organization channel are fed in
//! through [`SyncClient::apply_event`] and may arrive before or after the
//! response to the client's own request.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use taskflow_core::hackathon::{EventPatch, HackathonPatch, HackathonView, NewEvent, NewHackathon};
use taskflow_core::sync::SyncEvent;
use taskflow_core::task::{NewTask, ReorderEntry, TaskPatch, TaskView};
use taskflow_core::user::UserRef;

use crate::api::{SyncBackend, DEFAULT_TIMEOUT};
use crate::cache::Cached;
use crate::error::{ClientError, Result};
use crate::reconcile::{HackathonLog, TaskBoard};

pub struct SyncClient<B> {
    backend: B,
    me: UserRef,
    organization: Uuid,
    timeout: Duration,
    tasks: RwLock<TaskBoard>,
    hackathons: RwLock<HackathonLog>,
}

impl<B: SyncBackend> SyncClient<B> {
    /// `me` and `organization` fill in the placeholders of optimistic creates.
    pub fn new(backend: B, me: UserRef, organization: Uuid) -> Self {
        Self {
            backend,
            me,
            organization,
            timeout: DEFAULT_TIMEOUT,
            tasks: RwLock::new(TaskBoard::new()),
            hackathons: RwLock::new(HackathonLog::new()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub async fn tasks(&self) -> Vec<TaskView> {
        self.tasks.read().await.tasks()
    }

    pub async fn task(&self, id: Uuid) -> Option<Cached<TaskView>> {
        self.tasks.read().await.get(id).cloned()
    }

    pub async fn hackathons(&self) -> Vec<HackathonView> {
        self.hackathons.read().await.hackathons()
    }

    pub async fn hackathon(&self, id: Uuid) -> Option<Cached<HackathonView>> {
        self.hackathons.read().await.get(id).cloned()
    }

    /// Replace both caches with the server's current listings.
    pub async fn refresh(&self) -> Result<()> {
        let (tasks, hackathons) = tokio::try_join!(
            self.guarded(self.backend.list_tasks()),
            self.guarded(self.backend.list_hackathons()),
        )?;
        debug!(
            "Refreshed {} tasks and {} hackathons",
            tasks.len(),
            hackathons.len()
        );
        self.tasks.write().await.replace_all(tasks);
        self.hackathons.write().await.replace_all(hackathons);
        Ok(())
    }

    /// Merge one broadcast. Returns false when no cache handles the event.
    pub async fn apply_event(&self, event: &SyncEvent) -> bool {
        if self.tasks.write().await.apply(event) {
            return true;
        }
        self.hackathons.write().await.apply(event)
    }

    /// Merge a broadcast as received from the socket: event name plus payload.
    pub async fn apply_wire(&self, name: &str, data: Value) -> Result<bool> {
        let event =
            SyncEvent::from_wire(name, data).map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(self.apply_event(&event).await)
    }

    pub async fn create_task(&self, new_task: NewTask) -> Result<TaskView> {
        let placeholder_id = {
            let mut board = self.tasks.write().await;
            let placeholder = self.placeholder_task(&new_task, board.next_order());
            let id = placeholder.id;
            board.cache_mut().upsert(Cached::optimistic(placeholder));
            board.sort();
            id
        };

        match self.guarded(self.backend.create_task(new_task)).await {
            Ok(task) => {
                let mut board = self.tasks.write().await;
                board.cache_mut().confirm_placeholder(placeholder_id, task.clone());
                board.sort();
                Ok(task)
            }
            Err(err) => {
                warn!("Create task failed, dropping placeholder: {}", err);
                self.tasks.write().await.cache_mut().remove(placeholder_id);
                Err(err)
            }
        }
    }

    pub async fn update_task(&self, id: Uuid, patch: TaskPatch) -> Result<TaskView> {
        let previous = {
            let mut board = self.tasks.write().await;
            let previous = board
                .cache_mut()
                .modify(id, |task| patch_task(task, &patch))
                .ok_or_else(task_not_found)?;
            board.sort();
            previous
        };
        let result = self.guarded(self.backend.update_task(id, patch)).await;
        self.settle_task(previous, result).await
    }

    pub async fn toggle_task(&self, id: Uuid) -> Result<TaskView> {
        let previous = self
            .tasks
            .write()
            .await
            .cache_mut()
            .modify(id, |task| {
                let next = !task.completed;
                set_completed(task, next);
            })
            .ok_or_else(task_not_found)?;
        let result = self.guarded(self.backend.toggle_task(id)).await;
        self.settle_task(previous, result).await
    }

    pub async fn delete_task(&self, id: Uuid) -> Result<()> {
        let removed = self
            .tasks
            .write()
            .await
            .cache_mut()
            .remove(id)
            .ok_or_else(task_not_found)?;

        if let Err(err) = self.guarded(self.backend.delete_task(id)).await {
            if err.is_gone() {
                debug!("Task {} was already deleted on the server", id);
                return Err(err);
            }
            warn!("Delete of task {} failed, restoring: {}", id, err);
            self.tasks.write().await.cache_mut().restore(removed);
            return Err(err);
        }
        Ok(())
    }

    /// Move tasks into the given order; ids not in the cache are sent as-is.
    pub async fn reorder_tasks(&self, ordered_ids: Vec<Uuid>) -> Result<Vec<TaskView>> {
        let previous: Vec<Cached<TaskView>> = {
            let mut board = self.tasks.write().await;
            let previous = ordered_ids
                .iter()
                .enumerate()
                .filter_map(|(index, id)| {
                    board
                        .cache_mut()
                        .modify(*id, |task| task.order = index as i64)
                })
                .collect();
            board.sort();
            previous
        };
        let entries = ordered_ids
            .iter()
            .enumerate()
            .map(|(index, id)| ReorderEntry {
                id: id.to_string(),
                order: Some(index as i64),
            })
            .collect();

        match self.guarded(self.backend.reorder_tasks(entries)).await {
            Ok(tasks) => {
                self.tasks.write().await.replace_all(tasks.clone());
                Ok(tasks)
            }
            Err(err) => {
                warn!("Reorder failed, restoring previous order: {}", err);
                let mut board = self.tasks.write().await;
                for entry in previous {
                    board.cache_mut().revert(entry);
                }
                board.sort();
                Err(err)
            }
        }
    }

    pub async fn create_hackathon(&self, new_hackathon: NewHackathon) -> Result<HackathonView> {
        let hackathon = self
            .guarded(self.backend.create_hackathon(new_hackathon))
            .await?;
        self.hackathons.write().await.confirm(hackathon.clone());
        Ok(hackathon)
    }

    pub async fn update_hackathon(&self, id: Uuid, patch: HackathonPatch) -> Result<HackathonView> {
        let hackathon = self
            .guarded(self.backend.update_hackathon(id, patch))
            .await?;
        self.hackathons.write().await.confirm(hackathon.clone());
        Ok(hackathon)
    }

    pub async fn delete_hackathon(&self, id: Uuid) -> Result<()> {
        let removed = self
            .hackathons
            .write()
            .await
            .cache_mut()
            .remove(id)
            .ok_or_else(hackathon_not_found)?;

        if let Err(err) = self.guarded(self.backend.delete_hackathon(id)).await {
            if err.is_gone() {
                debug!("Hackathon {} was already deleted on the server", id);
                return Err(err);
            }
            warn!("Delete of hackathon {} failed, restoring: {}", id, err);
            self.hackathons.write().await.cache_mut().restore(removed);
            return Err(err);
        }
        Ok(())
    }

    pub async fn add_event(&self, hackathon_id: Uuid, new_event: NewEvent) -> Result<HackathonView> {
        let hackathon = self
            .guarded(self.backend.add_event(hackathon_id, new_event))
            .await?;
        self.hackathons.write().await.confirm(hackathon.clone());
        Ok(hackathon)
    }

    /// Flip an embedded event's completion flag.
    pub async fn toggle_event(&self, hackathon_id: Uuid, event_id: Uuid) -> Result<HackathonView> {
        let (previous, completed) = {
            let mut log = self.hackathons.write().await;
            let parent = log.get(hackathon_id).ok_or_else(hackathon_not_found)?;
            let completed = !parent
                .value
                .events
                .iter()
                .find(|event| event.id == event_id)
                .ok_or_else(event_not_found)?
                .completed;
            let previous = log
                .cache_mut()
                .modify(hackathon_id, |parent| {
                    if let Some(event) = parent.events.iter_mut().find(|e| e.id == event_id) {
                        event.completed = completed;
                    }
                })
                .ok_or_else(hackathon_not_found)?;
            (previous, completed)
        };

        let patch = EventPatch {
            completed: Some(completed),
            ..EventPatch::default()
        };
        let result = self
            .guarded(self.backend.update_event(hackathon_id, event_id, patch))
            .await;
        self.settle_hackathon(previous, result).await
    }

    pub async fn delete_event(&self, hackathon_id: Uuid, event_id: Uuid) -> Result<HackathonView> {
        let previous = {
            let mut log = self.hackathons.write().await;
            let parent = log.get(hackathon_id).ok_or_else(hackathon_not_found)?;
            if !parent.value.events.iter().any(|event| event.id == event_id) {
                return Err(event_not_found());
            }
            log.cache_mut()
                .modify(hackathon_id, |parent| {
                    parent.remove_event(event_id);
                })
                .ok_or_else(hackathon_not_found)?
        };
        match self
            .guarded(self.backend.delete_event(hackathon_id, event_id))
            .await
        {
            // Already absent on the server, so the local removal stands.
            Err(err) if err.is_gone() => {
                debug!("Event {} was already deleted on the server", event_id);
                Err(err)
            }
            result => self.settle_hackathon(previous, result).await,
        }
    }

    async fn settle_task(
        &self,
        previous: Cached<TaskView>,
        result: Result<TaskView>,
    ) -> Result<TaskView> {
        let mut board = self.tasks.write().await;
        match result {
            Ok(task) => {
                board.confirm(task.clone());
                Ok(task)
            }
            Err(err) => {
                warn!("Task {} update failed, reverting: {}", previous.value.id, err);
                board.cache_mut().revert(previous);
                board.sort();
                Err(err)
            }
        }
    }

    async fn settle_hackathon(
        &self,
        previous: Cached<HackathonView>,
        result: Result<HackathonView>,
    ) -> Result<HackathonView> {
        let mut log = self.hackathons.write().await;
        match result {
            Ok(hackathon) => {
                log.confirm(hackathon.clone());
                Ok(hackathon)
            }
            Err(err) => {
                warn!(
                    "Hackathon {} update failed, reverting: {}",
                    previous.value.id, err
                );
                log.cache_mut().revert(previous);
                Err(err)
            }
        }
    }

    async fn guarded<T, F>(&self, request: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| ClientError::Timeout)?
    }

    fn placeholder_task(&self, new_task: &NewTask, next_order: i64) -> TaskView {
        let now = Utc::now();
        let completed = new_task.completed.unwrap_or(false);
        TaskView {
            id: Uuid::new_v4(),
            organization: self.organization,
            created_by: self.me.clone(),
            text: new_task.text.as_deref().unwrap_or_default().trim().to_string(),
            completed,
            completed_at: completed.then_some(now),
            priority: new_task.priority.unwrap_or_default(),
            category: new_task.category.clone(),
            tags: new_task.tags.clone(),
            due_date: new_task.due_date,
            recurrence: new_task.recurring.unwrap_or_default(),
            subtasks: new_task.subtasks.clone(),
            // Names are resolved by the server.
            assigned_to: Vec::new(),
            order: new_task.order.unwrap_or(next_order),
            created_at: now,
            updated_at: now,
        }
    }
}

fn task_not_found() -> ClientError {
    ClientError::NotFound("Task not found".to_string())
}

fn hackathon_not_found() -> ClientError {
    ClientError::NotFound("Hackathon not found".to_string())
}

fn event_not_found() -> ClientError {
    ClientError::NotFound("Event not found".to_string())
}

fn set_completed(task: &mut TaskView, completed: bool) {
    if task.completed != completed {
        task.completed = completed;
        task.completed_at = completed.then(Utc::now);
    }
}

/// Local guess at the server's merge; assignees wait for the response.
fn patch_task(task: &mut TaskView, patch: &TaskPatch) {
    if let Some(text) = &patch.text {
        task.text = text.trim().to_string();
    }
    if let Some(completed) = patch.completed {
        set_completed(task, completed);
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(category) = &patch.category {
        task.category = category.clone();
    }
    if let Some(tags) = &patch.tags {
        task.tags = tags.clone();
    }
    if let Some(due_date) = patch.due_date {
        task.due_date = due_date;
    }
    if let Some(recurring) = patch.recurring {
        task.recurrence = recurring;
    }
    if let Some(subtasks) = &patch.subtasks {
        task.subtasks = subtasks.clone();
    }
    if let Some(order) = patch.order {
        task.order = order;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EntryState;
    use crate::test_support::{MockBackend, MockFailure};
    use taskflow_core::hackathon::HackathonStatus;

    fn me() -> UserRef {
        UserRef {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
        }
    }

    fn client() -> SyncClient<MockBackend> {
        SyncClient::new(MockBackend::default(), me(), Uuid::new_v4())
            .with_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_create_replaces_placeholder_with_server_task() {
        let client = client();
        let task = client.create_task(NewTask::with_text("Write docs")).await.unwrap();

        let tasks = client.tasks().await;
        assert_eq!(tasks, vec![task.clone()]);
        assert_eq!(
            client.task(task.id).await.unwrap().state,
            EntryState::Confirmed
        );

        assert!(client.apply_event(&SyncEvent::TaskCreated(task.clone())).await);
        assert_eq!(client.tasks().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_create_drops_placeholder() {
        let client = client();
        client
            .backend()
            .fail_with(MockFailure::Status(400, "Task text is required"));

        let err = client.create_task(NewTask::with_text("x")).await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 400, .. }));
        assert!(client.tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_echo_after_own_update_leaves_one_canonical_entry() {
        let client = client();
        let task = client.create_task(NewTask::with_text("Draft")).await.unwrap();

        let patch = TaskPatch {
            text: Some("Final".to_string()),
            ..TaskPatch::default()
        };
        let canonical = client.update_task(task.id, patch).await.unwrap();
        client
            .apply_event(&SyncEvent::TaskUpdated(canonical.clone()))
            .await;

        let tasks = client.tasks().await;
        assert_eq!(tasks, vec![canonical]);
    }

    #[tokio::test]
    async fn test_toggle_echo_does_not_double_toggle() {
        let client = client();
        let task = client.create_task(NewTask::with_text("Flip")).await.unwrap();

        let toggled = client.toggle_task(task.id).await.unwrap();
        assert!(toggled.completed);
        client
            .apply_event(&SyncEvent::TaskUpdated(toggled.clone()))
            .await;
        client.apply_event(&SyncEvent::TaskUpdated(toggled)).await;

        let cached = client.task(task.id).await.unwrap();
        assert!(cached.value.completed);
        assert_eq!(cached.state, EntryState::Confirmed);
    }

    #[tokio::test]
    async fn test_failed_toggle_reverts() {
        let client = client();
        let task = client.create_task(NewTask::with_text("Flip")).await.unwrap();
        client
            .backend()
            .fail_with(MockFailure::Status(500, "Internal server error"));

        assert!(client.toggle_task(task.id).await.is_err());
        let cached = client.task(task.id).await.unwrap();
        assert!(!cached.value.completed);
        assert!(cached.value.completed_at.is_none());
        assert_eq!(cached.state, EntryState::Confirmed);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let client = client();
        let task = client.create_task(NewTask::with_text("Slow")).await.unwrap();
        client.backend().fail_with(MockFailure::Hang);

        let err = client.delete_task(task.id).await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout));
        assert_eq!(client.tasks().await, vec![task]);
    }

    #[tokio::test]
    async fn test_delete_and_echo() {
        let client = client();
        let task = client.create_task(NewTask::with_text("Gone")).await.unwrap();
        client.delete_task(task.id).await.unwrap();
        client
            .apply_event(&SyncEvent::TaskDeleted { task_id: task.id })
            .await;
        assert!(client.tasks().await.is_empty());

        let err = client.delete_task(task.id).await.unwrap_err();
        assert!(matches!(err, ClientError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_reorder_applies_server_list() {
        let client = client();
        let a = client.create_task(NewTask::with_text("A")).await.unwrap();
        let b = client.create_task(NewTask::with_text("B")).await.unwrap();
        let c = client.create_task(NewTask::with_text("C")).await.unwrap();

        let tasks = client.reorder_tasks(vec![c.id, a.id, b.id]).await.unwrap();
        let texts: Vec<&str> = tasks.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["C", "A", "B"]);
        assert_eq!(client.tasks().await, tasks);
    }

    #[tokio::test]
    async fn test_failed_reorder_restores_order() {
        let client = client();
        let a = client.create_task(NewTask::with_text("A")).await.unwrap();
        let b = client.create_task(NewTask::with_text("B")).await.unwrap();
        client
            .backend()
            .fail_with(MockFailure::Status(500, "Internal server error"));

        assert!(client.reorder_tasks(vec![b.id, a.id]).await.is_err());
        assert_eq!(client.tasks().await, vec![a, b]);
    }

    #[tokio::test]
    async fn test_refresh_replaces_caches() {
        let client = client();
        client.create_task(NewTask::with_text("Server side")).await.unwrap();
        client
            .apply_event(&SyncEvent::TaskDeleted {
                task_id: client.tasks().await[0].id,
            })
            .await;
        assert!(client.tasks().await.is_empty());

        client.refresh().await.unwrap();
        assert_eq!(client.tasks().await.len(), 1);
        assert!(client.hackathons().await.is_empty());
    }

    #[tokio::test]
    async fn test_apply_wire_decodes_events() {
        let client = client();
        let task = crate::test_support::task("From socket", 0);
        let handled = client
            .apply_wire("task-created", serde_json::to_value(&task).unwrap())
            .await
            .unwrap();
        assert!(handled);
        assert_eq!(client.tasks().await, vec![task]);

        let err = client
            .apply_wire("no-such-event", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[tokio::test]
    async fn test_event_toggle_and_delete() {
        let client = client();
        let start = Utc::now();
        let hackathon = client
            .create_hackathon(NewHackathon {
                name: Some("HackMIT".to_string()),
                start_date: Some(start),
                end_date: Some(start + chrono::Duration::days(2)),
                ..NewHackathon::default()
            })
            .await
            .unwrap();
        let parent = client
            .add_event(
                hackathon.id,
                NewEvent {
                    title: Some("Kickoff".to_string()),
                    date: Some(start),
                    ..NewEvent::default()
                },
            )
            .await
            .unwrap();
        let event_id = parent.events[0].id;

        let toggled = client.toggle_event(hackathon.id, event_id).await.unwrap();
        assert!(toggled.events[0].completed);

        client
            .backend()
            .fail_with(MockFailure::Status(500, "Internal server error"));
        assert!(client.delete_event(hackathon.id, event_id).await.is_err());
        let cached = client.hackathon(hackathon.id).await.unwrap();
        assert_eq!(cached.value.events.len(), 1);
        assert!(cached.value.events[0].completed);

        client.backend().recover();
        let parent = client.delete_event(hackathon.id, event_id).await.unwrap();
        assert!(parent.events.is_empty());

        let updated = client
            .update_hackathon(
                hackathon.id,
                HackathonPatch {
                    status: Some(HackathonStatus::Submitted),
                    ..HackathonPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(client.hackathons().await, vec![updated]);

        client.delete_hackathon(hackathon.id).await.unwrap();
        assert!(client.hackathons().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_of_task_gone_on_server_stays_removed() {
        let client = client();
        let task = client.create_task(NewTask::with_text("x")).await.unwrap();
        client
            .backend()
            .fail_with(MockFailure::Status(404, "Task not found"));

        let err = client.delete_task(task.id).await.unwrap_err();
        assert!(err.is_gone());
        assert!(client.task(task.id).await.is_none());

        // A broadcast for the same delete finds nothing left to remove.
        client
            .apply_event(&SyncEvent::TaskDeleted { task_id: task.id })
            .await;
        assert!(client.tasks().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_of_hackathon_gone_on_server_stays_removed() {
        let client = client();
        let hackathon = client
            .create_hackathon(NewHackathon {
                name: Some("HackMIT".to_string()),
                ..NewHackathon::default()
            })
            .await
            .unwrap();
        client
            .backend()
            .fail_with(MockFailure::Status(404, "Hackathon not found"));

        let err = client.delete_hackathon(hackathon.id).await.unwrap_err();
        assert!(err.is_gone());
        assert!(client.hackathon(hackathon.id).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_of_event_gone_on_server_stays_removed() {
        let client = client();
        let hackathon = client
            .create_hackathon(NewHackathon {
                name: Some("HackMIT".to_string()),
                ..NewHackathon::default()
            })
            .await
            .unwrap();
        let parent = client
            .add_event(
                hackathon.id,
                NewEvent {
                    title: Some("Kickoff".to_string()),
                    ..NewEvent::default()
                },
            )
            .await
            .unwrap();
        let event_id = parent.events[0].id;
        client
            .backend()
            .fail_with(MockFailure::Status(404, "Event not found"));

        let err = client.delete_event(hackathon.id, event_id).await.unwrap_err();
        assert!(err.is_gone());
        let cached = client.hackathon(hackathon.id).await.unwrap();
        assert!(cached.value.events.is_empty());
    }
}
