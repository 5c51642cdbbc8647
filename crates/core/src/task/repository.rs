//! Task repository trait
//!
//! Every operation is scoped by organization: a task id that exists under a
//! different organization behaves exactly like a missing one.

use async_trait::async_trait;
use uuid::Uuid;

use super::model::{Task, TaskPatch};
use crate::Result;

/// Repository interface for task operations
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Persist a new task
    async fn create(&self, task: Task) -> Result<Task>;

    /// Get a task by organization and ID
    async fn get(&self, organization: Uuid, id: Uuid) -> Result<Option<Task>>;

    /// All tasks of an organization, order ascending then newest first
    async fn list(&self, organization: Uuid) -> Result<Vec<Task>>;

    /// Merge `patch` over an existing task
    async fn update(&self, organization: Uuid, id: Uuid, patch: TaskPatch) -> Result<Task>;

    /// Flip completion and derive the completion timestamp
    async fn toggle(&self, organization: Uuid, id: Uuid) -> Result<Task>;

    /// Set an absolute display position
    async fn set_order(&self, organization: Uuid, id: Uuid, order: i64) -> Result<Task>;

    /// Delete a task, returning what was removed
    async fn delete(&self, organization: Uuid, id: Uuid) -> Result<Task>;

    /// Position for a task appended to the end of the list
    async fn next_order(&self, organization: Uuid) -> Result<i64>;
}
