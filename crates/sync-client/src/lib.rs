//! Sync client for TaskFlow
//!
//! Keeps a local, optimistically updated copy of an organization's tasks and
//! hackathons and reconciles it with the server:
//! - `ApiClient` talks to the REST API over reqwest
//! - `SyncClient` applies local mutations and settles them on response
//! - `TaskBoard` / `HackathonLog` merge realtime broadcasts by id

mod api;
mod cache;
mod client;
mod error;
mod reconcile;

pub use api::{Account, ApiClient, BackendFuture, ClientConfig, SyncBackend, DEFAULT_TIMEOUT};
pub use cache::{Cached, EntityCache, EntryState, Identified, Removed};
pub use client::SyncClient;
pub use error::{ClientError, Result};
pub use reconcile::{HackathonLog, TaskBoard};

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::Utc;
    use uuid::Uuid;

    use taskflow_core::hackathon::{
        EventKind, EventPatch, HackathonEvent, HackathonPatch, HackathonStatus, HackathonView,
        NewEvent, NewHackathon,
    };
    use taskflow_core::task::{
        NewTask, Recurrence, ReorderEntry, TaskPatch, TaskPriority, TaskView,
    };
    use taskflow_core::user::UserRef;

    use crate::api::{BackendFuture, SyncBackend};
    use crate::error::{ClientError, Result};

    pub fn task(text: &str, order: i64) -> TaskView {
        let now = Utc::now();
        TaskView {
            id: Uuid::new_v4(),
            organization: Uuid::nil(),
            created_by: UserRef::unknown(Uuid::nil()),
            text: text.to_string(),
            completed: false,
            completed_at: None,
            priority: TaskPriority::Medium,
            category: None,
            tags: Vec::new(),
            due_date: None,
            recurrence: Recurrence::None,
            subtasks: Vec::new(),
            assigned_to: Vec::new(),
            order,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn hackathon(name: &str) -> HackathonView {
        let now = Utc::now();
        HackathonView {
            id: Uuid::new_v4(),
            organization: Uuid::nil(),
            created_by: UserRef::unknown(Uuid::nil()),
            name: name.to_string(),
            start_date: now,
            end_date: now + chrono::Duration::days(2),
            team_name: None,
            team_members: Vec::new(),
            project_idea: None,
            status: HackathonStatus::Registered,
            events: Vec::new(),
            collaborators: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn event(title: &str) -> HackathonEvent {
        let now = Utc::now();
        HackathonEvent {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            date: now,
            time: None,
            kind: EventKind::Milestone,
            completed: false,
            created_at: now,
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub enum MockFailure {
        Status(u16, &'static str),
        Hang,
    }

    /// In-memory stand-in for the server.
    #[derive(Default)]
    pub struct MockBackend {
        tasks: Mutex<Vec<TaskView>>,
        hackathons: Mutex<Vec<HackathonView>>,
        failure: Mutex<Option<MockFailure>>,
    }

    impl MockBackend {
        pub fn fail_with(&self, failure: MockFailure) {
            *self.failure.lock().unwrap() = Some(failure);
        }

        pub fn recover(&self) {
            *self.failure.lock().unwrap() = None;
        }

        async fn gate(&self) -> Result<()> {
            let failure = *self.failure.lock().unwrap();
            match failure {
                Some(MockFailure::Status(status, message)) => {
                    Err(ClientError::status(status, message))
                }
                Some(MockFailure::Hang) => {
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    Err(ClientError::Timeout)
                }
                None => Ok(()),
            }
        }

        fn with_task(&self, id: Uuid, f: impl FnOnce(&mut TaskView)) -> Result<TaskView> {
            let mut tasks = self.tasks.lock().unwrap();
            let task = tasks
                .iter_mut()
                .find(|task| task.id == id)
                .ok_or_else(|| ClientError::status(404, "Task not found"))?;
            f(task);
            task.updated_at = Utc::now();
            Ok(task.clone())
        }

        fn with_hackathon(
            &self,
            id: Uuid,
            f: impl FnOnce(&mut HackathonView) -> Result<()>,
        ) -> Result<HackathonView> {
            let mut hackathons = self.hackathons.lock().unwrap();
            let hackathon = hackathons
                .iter_mut()
                .find(|hackathon| hackathon.id == id)
                .ok_or_else(|| ClientError::status(404, "Hackathon not found"))?;
            f(hackathon)?;
            hackathon.updated_at = Utc::now();
            Ok(hackathon.clone())
        }

        fn sorted_tasks(&self) -> Vec<TaskView> {
            let mut tasks = self.tasks.lock().unwrap().clone();
            tasks.sort_by(|a, b| a.order.cmp(&b.order).then(b.created_at.cmp(&a.created_at)));
            tasks
        }
    }

    impl SyncBackend for MockBackend {
        fn list_tasks(&self) -> BackendFuture<'_, Vec<TaskView>> {
            Box::pin(async move {
                self.gate().await?;
                Ok(self.sorted_tasks())
            })
        }

        fn create_task(&self, new_task: NewTask) -> BackendFuture<'_, TaskView> {
            Box::pin(async move {
                self.gate().await?;
                let mut tasks = self.tasks.lock().unwrap();
                let order = new_task.order.unwrap_or(tasks.len() as i64);
                let mut created = task(new_task.text.as_deref().unwrap_or_default(), order);
                created.priority = new_task.priority.unwrap_or_default();
                tasks.push(created.clone());
                Ok(created)
            })
        }

        fn update_task(&self, id: Uuid, patch: TaskPatch) -> BackendFuture<'_, TaskView> {
            Box::pin(async move {
                self.gate().await?;
                self.with_task(id, |task| {
                    if let Some(text) = patch.text {
                        task.text = text;
                    }
                    if let Some(priority) = patch.priority {
                        task.priority = priority;
                    }
                })
            })
        }

        fn toggle_task(&self, id: Uuid) -> BackendFuture<'_, TaskView> {
            Box::pin(async move {
                self.gate().await?;
                self.with_task(id, |task| {
                    task.completed = !task.completed;
                    task.completed_at = task.completed.then(Utc::now);
                })
            })
        }

        fn delete_task(&self, id: Uuid) -> BackendFuture<'_, ()> {
            Box::pin(async move {
                self.gate().await?;
                let mut tasks = self.tasks.lock().unwrap();
                let before = tasks.len();
                tasks.retain(|task| task.id != id);
                if tasks.len() == before {
                    return Err(ClientError::status(404, "Task not found"));
                }
                Ok(())
            })
        }

        fn reorder_tasks(&self, entries: Vec<ReorderEntry>) -> BackendFuture<'_, Vec<TaskView>> {
            Box::pin(async move {
                self.gate().await?;
                for (index, entry) in entries.into_iter().enumerate() {
                    if let Ok(id) = Uuid::parse_str(&entry.id) {
                        let order = entry.order.unwrap_or(index as i64);
                        let _ = self.with_task(id, |task| task.order = order);
                    }
                }
                Ok(self.sorted_tasks())
            })
        }

        fn list_hackathons(&self) -> BackendFuture<'_, Vec<HackathonView>> {
            Box::pin(async move {
                self.gate().await?;
                Ok(self.hackathons.lock().unwrap().clone())
            })
        }

        fn create_hackathon(&self, new_hackathon: NewHackathon) -> BackendFuture<'_, HackathonView> {
            Box::pin(async move {
                self.gate().await?;
                let created = hackathon(new_hackathon.name.as_deref().unwrap_or_default());
                self.hackathons.lock().unwrap().insert(0, created.clone());
                Ok(created)
            })
        }

        fn update_hackathon(
            &self,
            id: Uuid,
            patch: HackathonPatch,
        ) -> BackendFuture<'_, HackathonView> {
            Box::pin(async move {
                self.gate().await?;
                self.with_hackathon(id, |hackathon| {
                    if let Some(status) = patch.status {
                        hackathon.status = status;
                    }
                    Ok(())
                })
            })
        }

        fn delete_hackathon(&self, id: Uuid) -> BackendFuture<'_, ()> {
            Box::pin(async move {
                self.gate().await?;
                self.hackathons.lock().unwrap().retain(|h| h.id != id);
                Ok(())
            })
        }

        fn add_event(&self, hackathon_id: Uuid, new_event: NewEvent) -> BackendFuture<'_, HackathonView> {
            Box::pin(async move {
                self.gate().await?;
                self.with_hackathon(hackathon_id, |hackathon| {
                    hackathon
                        .events
                        .push(event(new_event.title.as_deref().unwrap_or_default()));
                    Ok(())
                })
            })
        }

        fn update_event(
            &self,
            hackathon_id: Uuid,
            event_id: Uuid,
            patch: EventPatch,
        ) -> BackendFuture<'_, HackathonView> {
            Box::pin(async move {
                self.gate().await?;
                self.with_hackathon(hackathon_id, |hackathon| {
                    let event = hackathon
                        .events
                        .iter_mut()
                        .find(|event| event.id == event_id)
                        .ok_or_else(|| ClientError::status(404, "Event not found"))?;
                    if let Some(completed) = patch.completed {
                        event.completed = completed;
                    }
                    Ok(())
                })
            })
        }

        fn delete_event(&self, hackathon_id: Uuid, event_id: Uuid) -> BackendFuture<'_, HackathonView> {
            Box::pin(async move {
                self.gate().await?;
                self.with_hackathon(hackathon_id, |hackathon| {
                    hackathon
                        .remove_event(event_id)
                        .map(|_| ())
                        .ok_or_else(|| ClientError::status(404, "Event not found"))
                })
            })
        }
    }
}
