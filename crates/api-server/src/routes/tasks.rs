//! Task routes
//!
//! Every route is scoped to the caller's organization. Mutations go through
//! the task pipeline, which broadcasts only after the store accepts them.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use taskflow_core::task::{NewTask, ReorderEntry, TaskPatch, TaskView};

use crate::error::ApiResult;
use crate::extract::{ApiJson, AuthUser};
use crate::state::AppState;

use super::parse_id;

const TASK_NOT_FOUND: &str = "Task not found";

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub message: &'static str,
    pub task: TaskView,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ReorderResponse {
    pub message: &'static str,
    pub tasks: Vec<TaskView>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    #[serde(default)]
    pub tasks: Vec<ReorderEntry>,
}

async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<TaskListResponse>> {
    let org = user.organization()?;
    let tasks = state.tasks().list(org).await?;
    Ok(Json(TaskListResponse { tasks }))
}

async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<NewTask>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let org = user.organization()?;
    let task = state.tasks().create(org, user.id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            message: "Task created successfully",
            task,
        }),
    ))
}

async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<TaskPatch>,
) -> ApiResult<Json<TaskResponse>> {
    let org = user.organization()?;
    let id = parse_id(&id, TASK_NOT_FOUND)?;
    let task = state.tasks().update(org, id, req).await?;
    Ok(Json(TaskResponse {
        message: "Task updated successfully",
        task,
    }))
}

async fn toggle_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskResponse>> {
    let org = user.organization()?;
    let id = parse_id(&id, TASK_NOT_FOUND)?;
    let task = state.tasks().toggle(org, id).await?;
    Ok(Json(TaskResponse {
        message: "Task toggled successfully",
        task,
    }))
}

async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let org = user.organization()?;
    let id = parse_id(&id, TASK_NOT_FOUND)?;
    state.tasks().delete(org, id).await?;
    Ok(Json(MessageResponse {
        message: "Task deleted successfully",
    }))
}

async fn reorder_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<ReorderRequest>,
) -> ApiResult<Json<ReorderResponse>> {
    let org = user.organization()?;
    let tasks = state.tasks().reorder(org, req.tasks).await?;
    Ok(Json(ReorderResponse {
        message: "Tasks reordered successfully",
        tasks,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route("/api/tasks/reorder", put(reorder_tasks))
        .route("/api/tasks/{id}", put(update_task).delete(delete_task))
        .route("/api/tasks/{id}/toggle", patch(toggle_task))
}
