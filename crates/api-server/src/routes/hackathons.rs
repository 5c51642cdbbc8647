//! Hackathon routes, including the embedded event timeline.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;

use taskflow_core::hackathon::{EventPatch, HackathonPatch, HackathonView, NewEvent, NewHackathon};

use crate::error::ApiResult;
use crate::extract::{ApiJson, AuthUser};
use crate::state::AppState;

use super::parse_id;

const HACKATHON_NOT_FOUND: &str = "Hackathon not found";
const EVENT_NOT_FOUND: &str = "Event not found";

#[derive(Debug, Serialize)]
pub struct HackathonListResponse {
    pub hackathons: Vec<HackathonView>,
}

#[derive(Debug, Serialize)]
pub struct HackathonResponse {
    pub message: &'static str,
    pub hackathon: HackathonView,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

async fn list_hackathons(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<HackathonListResponse>> {
    let org = user.organization()?;
    let hackathons = state.hackathons().list(org).await?;
    Ok(Json(HackathonListResponse { hackathons }))
}

async fn create_hackathon(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<NewHackathon>,
) -> ApiResult<(StatusCode, Json<HackathonResponse>)> {
    let org = user.organization()?;
    let hackathon = state.hackathons().create(org, user.id, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(HackathonResponse {
            message: "Hackathon created successfully",
            hackathon,
        }),
    ))
}

async fn update_hackathon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<HackathonPatch>,
) -> ApiResult<Json<HackathonResponse>> {
    let org = user.organization()?;
    let id = parse_id(&id, HACKATHON_NOT_FOUND)?;
    let hackathon = state.hackathons().update(org, id, req).await?;
    Ok(Json(HackathonResponse {
        message: "Hackathon updated successfully",
        hackathon,
    }))
}

async fn delete_hackathon(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let org = user.organization()?;
    let id = parse_id(&id, HACKATHON_NOT_FOUND)?;
    state.hackathons().delete(org, id).await?;
    Ok(Json(MessageResponse {
        message: "Hackathon deleted successfully",
    }))
}

async fn add_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<NewEvent>,
) -> ApiResult<Json<HackathonResponse>> {
    let org = user.organization()?;
    let id = parse_id(&id, HACKATHON_NOT_FOUND)?;
    let hackathon = state.hackathons().add_event(org, id, req).await?;
    Ok(Json(HackathonResponse {
        message: "Event added successfully",
        hackathon,
    }))
}

async fn update_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, event_id)): Path<(String, String)>,
    ApiJson(req): ApiJson<EventPatch>,
) -> ApiResult<Json<HackathonResponse>> {
    let org = user.organization()?;
    let id = parse_id(&id, HACKATHON_NOT_FOUND)?;
    let event_id = parse_id(&event_id, EVENT_NOT_FOUND)?;
    let hackathon = state
        .hackathons()
        .update_event(org, id, event_id, req)
        .await?;
    Ok(Json(HackathonResponse {
        message: "Event updated successfully",
        hackathon,
    }))
}

async fn delete_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, event_id)): Path<(String, String)>,
) -> ApiResult<Json<HackathonResponse>> {
    let org = user.organization()?;
    let id = parse_id(&id, HACKATHON_NOT_FOUND)?;
    let event_id = parse_id(&event_id, EVENT_NOT_FOUND)?;
    let hackathon = state.hackathons().delete_event(org, id, event_id).await?;
    Ok(Json(HackathonResponse {
        message: "Event deleted successfully",
        hackathon,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/hackathons", get(list_hackathons).post(create_hackathon))
        .route(
            "/api/hackathons/{id}",
            put(update_hackathon).delete(delete_hackathon),
        )
        .route("/api/hackathons/{id}/events", post(add_event))
        .route(
            "/api/hackathons/{id}/events/{event_id}",
            put(update_event).delete(delete_event),
        )
}
