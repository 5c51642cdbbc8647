//! Task mutations
//!
//! Each operation commits to the store first and only then broadcasts the
//! canonical result to the caller's organization. A failed operation returns
//! before anything is published.

use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;
use uuid::Uuid;

use taskflow_core::sync::SyncEvent;
use taskflow_core::task::{
    sort_tasks, NewTask, ReorderEntry, Task, TaskPatch, TaskRepository, TaskView,
};
use taskflow_core::user::UserDirectory;
use taskflow_core::Result;

use crate::realtime::Broadcaster;

#[derive(Clone)]
pub struct TaskPipeline {
    tasks: Arc<dyn TaskRepository>,
    users: Arc<dyn UserDirectory>,
    broadcaster: Broadcaster,
}

impl TaskPipeline {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        users: Arc<dyn UserDirectory>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            tasks,
            users,
            broadcaster,
        }
    }

    pub async fn list(&self, organization: Uuid) -> Result<Vec<TaskView>> {
        let tasks = self.tasks.list(organization).await?;
        Ok(self.resolve_all(tasks).await)
    }

    pub async fn create(
        &self,
        organization: Uuid,
        created_by: Uuid,
        new_task: NewTask,
    ) -> Result<TaskView> {
        let next_order = match new_task.order {
            Some(order) => order,
            None => self.tasks.next_order(organization).await?,
        };
        let task = new_task.into_task(organization, created_by, next_order)?;
        let created = self.tasks.create(task).await?;
        let view = self.resolve(created).await;
        self.broadcaster
            .publish(organization, SyncEvent::TaskCreated(view.clone()))
            .await;
        Ok(view)
    }

    pub async fn update(&self, organization: Uuid, id: Uuid, patch: TaskPatch) -> Result<TaskView> {
        let updated = self.tasks.update(organization, id, patch).await?;
        self.publish_updated(organization, updated).await
    }

    pub async fn toggle(&self, organization: Uuid, id: Uuid) -> Result<TaskView> {
        let toggled = self.tasks.toggle(organization, id).await?;
        self.publish_updated(organization, toggled).await
    }

    pub async fn delete(&self, organization: Uuid, id: Uuid) -> Result<()> {
        self.tasks.delete(organization, id).await?;
        self.broadcaster
            .publish(organization, SyncEvent::TaskDeleted { task_id: id })
            .await;
        Ok(())
    }

    /// Assign absolute positions and return the organization's new ordering.
    ///
    /// Every entry is an independent write, issued concurrently. Entries with
    /// a malformed id or an id outside the organization are skipped.
    pub async fn reorder(
        &self,
        organization: Uuid,
        entries: Vec<ReorderEntry>,
    ) -> Result<Vec<TaskView>> {
        let writes = entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match Uuid::parse_str(entry.id.trim()) {
                Ok(id) => Some((id, entry.order.unwrap_or(index as i64))),
                Err(_) => {
                    debug!("Skipping reorder entry with malformed id '{}'", entry.id);
                    None
                }
            })
            .map(|(id, order)| {
                let tasks = Arc::clone(&self.tasks);
                async move { (id, tasks.set_order(organization, id, order).await) }
            });

        for (id, result) in join_all(writes).await {
            if let Err(err) = result {
                debug!("Skipping reorder of task {}: {}", id, err);
            }
        }

        let tasks = self.list(organization).await?;
        self.broadcaster
            .publish(
                organization,
                SyncEvent::TasksReordered {
                    tasks: tasks.clone(),
                },
            )
            .await;
        Ok(tasks)
    }

    async fn publish_updated(&self, organization: Uuid, task: Task) -> Result<TaskView> {
        let view = self.resolve(task).await;
        self.broadcaster
            .publish(organization, SyncEvent::TaskUpdated(view.clone()))
            .await;
        Ok(view)
    }

    async fn resolve(&self, task: Task) -> TaskView {
        let users = self.users.resolve_users(&task.user_ids()).await;
        TaskView::resolve(task, &users)
    }

    async fn resolve_all(&self, mut tasks: Vec<Task>) -> Vec<TaskView> {
        sort_tasks(&mut tasks, |t| (t.order, t.created_at));
        let mut ids: Vec<Uuid> = tasks.iter().flat_map(Task::user_ids).collect();
        ids.sort_unstable();
        ids.dedup();
        let users = self.users.resolve_users(&ids).await;
        tasks
            .into_iter()
            .map(|task| TaskView::resolve(task, &users))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::StaticDirectory;
    use crate::realtime::OrgEvent;
    use taskflow_core::task::FileTaskStore;
    use taskflow_core::Error;
    use tempfile::TempDir;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::sync::broadcast::Receiver;

    struct Fixture {
        pipeline: TaskPipeline,
        events: Receiver<OrgEvent>,
        org: Uuid,
        user: Uuid,
        _temp: TempDir,
    }

    async fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let store = FileTaskStore::new(temp.path().join("tasks.json")).await.unwrap();
        let user = Uuid::new_v4();
        let broadcaster = Broadcaster::new();
        let events = broadcaster.subscribe();
        let pipeline = TaskPipeline::new(
            Arc::new(store),
            Arc::new(StaticDirectory::with_user(user, "Ada")),
            broadcaster,
        );
        Fixture {
            pipeline,
            events,
            org: Uuid::new_v4(),
            user,
            _temp: temp,
        }
    }

    #[tokio::test]
    async fn test_create_broadcasts_resolved_task() {
        let mut f = fixture().await;
        let view = f
            .pipeline
            .create(f.org, f.user, NewTask::with_text("Write docs"))
            .await
            .unwrap();
        assert_eq!(view.created_by.name, "Ada");
        assert_eq!(view.order, 0);

        let sent = f.events.try_recv().unwrap();
        assert_eq!(sent.organization, f.org);
        assert_eq!(sent.event, SyncEvent::TaskCreated(view));
    }

    #[tokio::test]
    async fn test_new_tasks_append_to_the_end() {
        let f = fixture().await;
        f.pipeline
            .create(f.org, f.user, NewTask::with_text("first"))
            .await
            .unwrap();
        let second = f
            .pipeline
            .create(f.org, f.user, NewTask::with_text("second"))
            .await
            .unwrap();
        assert_eq!(second.order, 1);

        let texts: Vec<String> = f
            .pipeline
            .list(f.org)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_failed_mutations_do_not_broadcast() {
        let mut f = fixture().await;

        let invalid = f
            .pipeline
            .create(f.org, f.user, NewTask::with_text("   "))
            .await;
        assert!(matches!(invalid, Err(Error::InvalidInput(_))));

        let missing = f.pipeline.toggle(f.org, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(Error::TaskNotFound(_))));

        let foreign = f
            .pipeline
            .create(Uuid::new_v4(), f.user, NewTask::with_text("elsewhere"))
            .await
            .unwrap();
        f.events.try_recv().unwrap();
        assert!(f.pipeline.delete(f.org, foreign.id).await.is_err());

        assert!(matches!(f.events.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_reorder_skips_foreign_and_malformed_entries() {
        let mut f = fixture().await;
        let a = f.pipeline.create(f.org, f.user, NewTask::with_text("A")).await.unwrap();
        let b = f.pipeline.create(f.org, f.user, NewTask::with_text("B")).await.unwrap();
        let c = f.pipeline.create(f.org, f.user, NewTask::with_text("C")).await.unwrap();
        let other_org = Uuid::new_v4();
        let foreign = f
            .pipeline
            .create(other_org, f.user, NewTask::with_text("foreign"))
            .await
            .unwrap();
        while f.events.try_recv().is_ok() {}

        let entries = vec![
            ReorderEntry { id: c.id.to_string(), order: None },
            ReorderEntry { id: "not-a-uuid".to_string(), order: None },
            ReorderEntry { id: foreign.id.to_string(), order: Some(9) },
            ReorderEntry { id: a.id.to_string(), order: Some(5) },
            ReorderEntry { id: b.id.to_string(), order: Some(3) },
        ];
        let reordered = f.pipeline.reorder(f.org, entries).await.unwrap();
        let texts: Vec<&str> = reordered.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["C", "B", "A"]);

        let untouched = f.pipeline.list(other_org).await.unwrap();
        assert_eq!(untouched[0].order, foreign.order);

        let sent = f.events.try_recv().unwrap();
        assert_eq!(sent.event, SyncEvent::TasksReordered { tasks: reordered });
    }

    #[tokio::test]
    async fn test_update_completed_sets_timestamp() {
        let f = fixture().await;
        let task = f
            .pipeline
            .create(f.org, f.user, NewTask::with_text("Finish"))
            .await
            .unwrap();
        let updated = f
            .pipeline
            .update(
                f.org,
                task.id,
                TaskPatch {
                    completed: Some(true),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.completed);
        assert!(updated.completed_at.is_some());
    }
}
