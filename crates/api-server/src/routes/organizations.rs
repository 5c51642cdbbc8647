//! Organization routes: create, join by invite code, details and members.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{MemberRecord, OrganizationView};
use crate::error::ApiResult;
use crate::extract::{ApiJson, AuthUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrgRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinOrgRequest {
    #[serde(default)]
    pub invite_code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub organization: OrganizationView,
}

#[derive(Debug, Serialize)]
pub struct MembersResponse {
    pub members: Vec<MemberRecord>,
}

async fn create_org(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateOrgRequest>,
) -> ApiResult<(StatusCode, Json<OrganizationResponse>)> {
    let organization = state
        .auth_store()
        .create_organization(user.id, &req.name, req.description)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(OrganizationResponse {
            message: Some("Organization created successfully"),
            organization,
        }),
    ))
}

async fn join_org(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<JoinOrgRequest>,
) -> ApiResult<Json<OrganizationResponse>> {
    let organization = state
        .auth_store()
        .join_organization(user.id, &req.invite_code)
        .await?;
    Ok(Json(OrganizationResponse {
        message: Some("Successfully joined organization"),
        organization,
    }))
}

async fn get_org(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<OrganizationResponse>> {
    let organization = state.auth_store().organization_for_user(user.id).await?;
    Ok(Json(OrganizationResponse {
        message: None,
        organization,
    }))
}

async fn list_members(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<MembersResponse>> {
    let members = state.auth_store().members_for_user(user.id).await?;
    Ok(Json(MembersResponse { members }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/organizations", get(get_org).post(create_org))
        .route("/api/organizations/join", post(join_org))
        .route("/api/organizations/members", get(list_members))
}
