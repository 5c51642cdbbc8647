//! Task model definitions

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::serde_helpers::{flexible_date, nullable, nullable_date};
use crate::store::Document;
use crate::user::{resolve_many, resolve_one, UserRef};
use crate::{Error, Result};

/// Task priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// How often a task comes back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Default for Recurrence {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    /// Client-chosen identifier; assigned by the server when blank.
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

/// A task on an organization's shared list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub organization: Uuid,
    pub created_by: Uuid,
    pub text: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(rename = "recurring")]
    pub recurrence: Recurrence,
    pub subtasks: Vec<Subtask>,
    pub assigned_to: Vec<Uuid>,
    /// Display position within the organization's list
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task owned by `organization`
    pub fn new(organization: Uuid, created_by: Uuid, text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization,
            created_by,
            text: text.into(),
            completed: false,
            completed_at: None,
            priority: TaskPriority::default(),
            category: None,
            tags: Vec::new(),
            due_date: None,
            recurrence: Recurrence::default(),
            subtasks: Vec::new(),
            assigned_to: Vec::new(),
            order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the display order
    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    /// Set completion, deriving `completed_at`.
    ///
    /// Re-asserting the current state keeps the original timestamp.
    pub fn set_completed(&mut self, completed: bool) {
        if completed == self.completed {
            return;
        }
        self.completed = completed;
        self.completed_at = completed.then(Utc::now);
    }

    pub fn toggle(&mut self) {
        self.set_completed(!self.completed);
    }

    /// Shallow-merge the provided fields over this task.
    pub fn apply(&mut self, patch: TaskPatch) -> Result<()> {
        if let Some(text) = patch.text {
            self.text = validate_text(&text)?;
        }
        if let Some(completed) = patch.completed {
            self.set_completed(completed);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = patch.category {
            self.category = clean_optional(category);
        }
        if let Some(tags) = patch.tags {
            self.tags = clean_tags(tags);
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(recurrence) = patch.recurring {
            self.recurrence = recurrence;
        }
        if let Some(subtasks) = patch.subtasks {
            self.subtasks = clean_subtasks(subtasks)?;
        }
        if let Some(assigned_to) = patch.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(order) = patch.order {
            self.order = order;
        }
        Ok(())
    }

    /// Every user id this task references.
    pub fn user_ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(1 + self.assigned_to.len());
        ids.push(self.created_by);
        ids.extend(self.assigned_to.iter().copied());
        ids
    }
}

impl Document for Task {
    fn id(&self) -> Uuid {
        self.id
    }

    fn organization(&self) -> Uuid {
        self.organization
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

/// Body of a create request.
///
/// Ownership fields (`organization`, `createdBy`) and derived fields are not
/// accepted here; they come from the caller's identity.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "flexible_date", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Subtask>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_to: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl NewTask {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Validate and build the stored task.
    ///
    /// `next_order` is used when the request does not pick a position.
    pub fn into_task(self, organization: Uuid, created_by: Uuid, next_order: i64) -> Result<Task> {
        let text = validate_text(self.text.as_deref().unwrap_or_default())?;
        let mut task = Task::new(organization, created_by, text)
            .with_priority(self.priority.unwrap_or_default())
            .with_order(self.order.unwrap_or(next_order));
        task.category = clean_optional(self.category);
        task.tags = clean_tags(self.tags);
        task.due_date = self.due_date;
        task.recurrence = self.recurring.unwrap_or_default();
        task.subtasks = clean_subtasks(self.subtasks)?;
        task.assigned_to = self.assigned_to;
        if self.completed.unwrap_or(false) {
            task.set_completed(true);
        }
        Ok(task)
    }
}

/// Partial update. Absent fields are left alone; `null` clears nullable ones.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable_date", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Vec<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

/// One entry of a reorder request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderEntry {
    /// Kept as a string: malformed ids are skipped, not rejected.
    pub id: String,
    #[serde(default)]
    pub order: Option<i64>,
}

/// Canonical task as returned to clients and broadcast to the organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: Uuid,
    pub organization: Uuid,
    pub created_by: UserRef,
    pub text: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(rename = "recurring")]
    pub recurrence: Recurrence,
    pub subtasks: Vec<Subtask>,
    pub assigned_to: Vec<UserRef>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskView {
    pub fn resolve(task: Task, users: &HashMap<Uuid, UserRef>) -> Self {
        Self {
            id: task.id,
            organization: task.organization,
            created_by: resolve_one(users, task.created_by),
            text: task.text,
            completed: task.completed,
            completed_at: task.completed_at,
            priority: task.priority,
            category: task.category,
            tags: task.tags,
            due_date: task.due_date,
            recurrence: task.recurrence,
            subtasks: task.subtasks,
            assigned_to: resolve_many(users, &task.assigned_to),
            order: task.order,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Canonical list order: `order` ascending, then newest first.
pub fn sort_tasks<T, F>(tasks: &mut [T], key: F)
where
    F: Fn(&T) -> (i64, DateTime<Utc>),
{
    tasks.sort_by(|a, b| {
        let (order_a, created_a) = key(a);
        let (order_b, created_b) = key(b);
        order_a.cmp(&order_b).then(created_b.cmp(&created_a))
    });
}

fn validate_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("Task text is required".to_string()));
    }
    Ok(trimmed.to_string())
}

fn clean_optional(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|existing| existing == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

fn clean_subtasks(subtasks: Vec<Subtask>) -> Result<Vec<Subtask>> {
    subtasks
        .into_iter()
        .map(|mut subtask| {
            subtask.text = subtask.text.trim().to_string();
            if subtask.text.is_empty() {
                return Err(Error::InvalidInput("Subtask text is required".to_string()));
            }
            if subtask.id.trim().is_empty() {
                subtask.id = Uuid::new_v4().to_string();
            }
            Ok(subtask)
        })
        .collect()
}
