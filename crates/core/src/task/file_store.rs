//! File-based task storage implementation
//!
//! Stores tasks as JSON in a file on disk.

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use super::model::{sort_tasks, Task, TaskPatch};
use super::repository::TaskRepository;
use crate::store::DocumentStore;
use crate::{Error, Result};

/// File-based task store using JSON
pub struct FileTaskStore {
    docs: DocumentStore<Task>,
}

impl FileTaskStore {
    /// Create a new FileTaskStore
    ///
    /// If the file doesn't exist, it will be created on first write.
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            docs: DocumentStore::open(path).await?,
        })
    }
}

#[async_trait]
impl TaskRepository for FileTaskStore {
    async fn create(&self, task: Task) -> Result<Task> {
        self.docs.insert(task).await
    }

    async fn get(&self, organization: Uuid, id: Uuid) -> Result<Option<Task>> {
        Ok(self.docs.get(organization, id).await)
    }

    async fn list(&self, organization: Uuid) -> Result<Vec<Task>> {
        let mut tasks = self.docs.list(organization).await;
        sort_tasks(&mut tasks, |t| (t.order, t.created_at));
        Ok(tasks)
    }

    async fn update(&self, organization: Uuid, id: Uuid, patch: TaskPatch) -> Result<Task> {
        self.docs
            .modify(organization, id, |task| task.apply(patch))
            .await?
            .ok_or(Error::TaskNotFound(id))
    }

    async fn toggle(&self, organization: Uuid, id: Uuid) -> Result<Task> {
        self.docs
            .modify(organization, id, |task| {
                task.toggle();
                Ok(())
            })
            .await?
            .ok_or(Error::TaskNotFound(id))
    }

    async fn set_order(&self, organization: Uuid, id: Uuid, order: i64) -> Result<Task> {
        self.docs
            .modify(organization, id, |task| {
                task.order = order;
                Ok(())
            })
            .await?
            .ok_or(Error::TaskNotFound(id))
    }

    async fn delete(&self, organization: Uuid, id: Uuid) -> Result<Task> {
        self.docs
            .remove(organization, id)
            .await?
            .ok_or(Error::TaskNotFound(id))
    }

    async fn next_order(&self, organization: Uuid) -> Result<i64> {
        let tasks = self.docs.list(organization).await;
        Ok(tasks.iter().map(|t| t.order + 1).max().unwrap_or(0))
    }
}
