use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use taskflow_core::user::{UserDirectory, UserRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrgRole {
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthClaims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub organization: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgSettings {
    #[serde(default)]
    pub allow_member_invites: bool,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    pub user: UserRef,
    pub role: OrgRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner: UserRef,
    pub invite_code: String,
    pub members: Vec<MemberRecord>,
    pub settings: OrgSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub claims: AuthClaims,
    pub user: UserSummary,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    organization: Option<Uuid>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Membership {
    user: Uuid,
    role: OrgRole,
    joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Organization {
    id: Uuid,
    name: String,
    description: Option<String>,
    owner: Uuid,
    invite_code: String,
    members: Vec<Membership>,
    #[serde(default)]
    settings: OrgSettings,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct AuthState {
    users: HashMap<Uuid, User>,
    organizations: HashMap<Uuid, Organization>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredAuthState {
    users: Vec<User>,
    organizations: Vec<Organization>,
}

impl From<StoredAuthState> for AuthState {
    fn from(value: StoredAuthState) -> Self {
        Self {
            users: value
                .users
                .into_iter()
                .map(|item| (item.id, item))
                .collect(),
            organizations: value
                .organizations
                .into_iter()
                .map(|item| (item.id, item))
                .collect(),
        }
    }
}

impl From<&AuthState> for StoredAuthState {
    fn from(value: &AuthState) -> Self {
        Self {
            users: value.users.values().cloned().collect(),
            organizations: value.organizations.values().cloned().collect(),
        }
    }
}

/// Users and organizations, persisted together in `state.json`.
#[derive(Clone)]
pub struct AuthStore {
    state: Arc<RwLock<AuthState>>,
    file_path: PathBuf,
    jwt_secret: String,
    token_ttl_seconds: i64,
}

impl AuthStore {
    pub async fn new(
        base_dir: PathBuf,
        jwt_secret: impl Into<String>,
        token_ttl_seconds: i64,
    ) -> Result<Self, AuthError> {
        tokio::fs::create_dir_all(&base_dir).await.map_err(|err| {
            AuthError::Storage(format!("Failed to create auth directory: {}", err))
        })?;

        let file_path = base_dir.join("state.json");
        let state = load_state(&file_path).await?;

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            file_path,
            jwt_secret: jwt_secret.into(),
            token_ttl_seconds,
        })
    }

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AuthError::InvalidInput("Name is required".to_string()));
        }
        let normalized_email = normalize_email(email)?;
        validate_password(password)?;

        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|user| user.email == normalized_email)
        {
            return Err(AuthError::Conflict(
                "User already exists with this email".to_string(),
            ));
        }

        let user = User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: normalized_email,
            password_hash: hash_password(password),
            organization: None,
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        if let Err(err) = persist_state(&self.file_path, &state).await {
            state.users.remove(&user.id);
            return Err(err);
        }
        drop(state);

        info!("Registered user {}", user.id);
        self.build_session(&user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let normalized_email = normalize_email(email)?;
        let state = self.state.read().await;

        let user = state
            .users
            .values()
            .find(|user| user.email == normalized_email)
            .cloned()
            .ok_or_else(|| AuthError::Unauthorized("Invalid credentials".to_string()))?;
        if !verify_password(&user.password_hash, password) {
            return Err(AuthError::Unauthorized("Invalid credentials".to_string()));
        }
        drop(state);
        self.build_session(&user)
    }

    /// Verify a bearer token and load the user it names.
    ///
    /// The organization comes from the store, not the token, so a user who
    /// joins an organization does not need a fresh token.
    pub async fn authorize_bearer(&self, token: &str) -> Result<AuthSession, AuthError> {
        let claims = self.decode_claims(token)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AuthError::Unauthorized("Invalid token subject".to_string()))?;

        let state = self.state.read().await;
        let user = state
            .users
            .get(&user_id)
            .ok_or_else(|| AuthError::Unauthorized("User not found".to_string()))?;

        Ok(AuthSession {
            user: user_to_summary(user),
            claims,
        })
    }

    pub async fn user_summary(&self, user_id: Uuid) -> Result<UserSummary, AuthError> {
        let state = self.state.read().await;
        state
            .users
            .get(&user_id)
            .map(user_to_summary)
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))
    }

    pub async fn create_organization(
        &self,
        user_id: Uuid,
        name: &str,
        description: Option<String>,
    ) -> Result<OrganizationView, AuthError> {
        let normalized_name = name.trim();
        if normalized_name.is_empty() {
            return Err(AuthError::InvalidInput(
                "Organization name is required".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        let user = state
            .users
            .get(&user_id)
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;
        if user.organization.is_some() {
            return Err(AuthError::Conflict(
                "User already belongs to an organization".to_string(),
            ));
        }

        let invite_code = unique_invite_code(&state);
        let now = Utc::now();
        let organization = Organization {
            id: Uuid::new_v4(),
            name: normalized_name.to_string(),
            description: sanitize_optional_string(description),
            owner: user_id,
            invite_code,
            members: vec![Membership {
                user: user_id,
                role: OrgRole::Admin,
                joined_at: now,
            }],
            settings: OrgSettings::default(),
            created_at: now,
            updated_at: now,
        };

        state
            .organizations
            .insert(organization.id, organization.clone());
        set_user_organization(&mut state, user_id, Some(organization.id));
        if let Err(err) = persist_state(&self.file_path, &state).await {
            state.organizations.remove(&organization.id);
            set_user_organization(&mut state, user_id, None);
            return Err(err);
        }

        info!("User {} created organization {}", user_id, organization.id);
        Ok(organization_to_view(&state, &organization))
    }

    pub async fn join_organization(
        &self,
        user_id: Uuid,
        invite_code: &str,
    ) -> Result<OrganizationView, AuthError> {
        let invite_code = invite_code.trim();
        if invite_code.is_empty() {
            return Err(AuthError::InvalidInput("Invite code is required".to_string()));
        }

        let mut state = self.state.write().await;
        let user = state
            .users
            .get(&user_id)
            .ok_or_else(|| AuthError::NotFound("User not found".to_string()))?;
        if user.organization.is_some() {
            return Err(AuthError::Conflict(
                "User already belongs to an organization".to_string(),
            ));
        }

        let org_id = state
            .organizations
            .values()
            .find(|organization| organization.invite_code == invite_code)
            .map(|organization| organization.id)
            .ok_or_else(|| AuthError::NotFound("Invalid invite code".to_string()))?;

        let previous = state.organizations.get(&org_id).cloned();
        if let Some(organization) = state.organizations.get_mut(&org_id) {
            organization.members.push(Membership {
                user: user_id,
                role: OrgRole::Member,
                joined_at: Utc::now(),
            });
            organization.updated_at = Utc::now();
        }
        set_user_organization(&mut state, user_id, Some(org_id));
        if let Err(err) = persist_state(&self.file_path, &state).await {
            if let Some(previous) = previous {
                state.organizations.insert(org_id, previous);
            }
            set_user_organization(&mut state, user_id, None);
            return Err(err);
        }

        info!("User {} joined organization {}", user_id, org_id);
        let organization = state
            .organizations
            .get(&org_id)
            .ok_or_else(|| AuthError::NotFound("Organization not found".to_string()))?;
        Ok(organization_to_view(&state, organization))
    }

    pub async fn organization_for_user(&self, user_id: Uuid) -> Result<OrganizationView, AuthError> {
        let state = self.state.read().await;
        let organization = user_organization(&state, user_id)?;
        Ok(organization_to_view(&state, organization))
    }

    pub async fn members_for_user(&self, user_id: Uuid) -> Result<Vec<MemberRecord>, AuthError> {
        let state = self.state.read().await;
        let organization = user_organization(&state, user_id)?;
        Ok(member_records(&state, organization))
    }

    /// Whether `user_id` currently belongs to `org_id`.
    pub async fn is_member(&self, user_id: Uuid, org_id: Uuid) -> bool {
        let state = self.state.read().await;
        state
            .users
            .get(&user_id)
            .is_some_and(|user| user.organization == Some(org_id))
    }

    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    fn build_session(&self, user: &User) -> Result<AuthSession, AuthError> {
        Ok(AuthSession {
            claims: self.issue_claims(user.id)?,
            user: user_to_summary(user),
        })
    }

    fn issue_claims(&self, user_id: Uuid) -> Result<AuthClaims, AuthError> {
        let exp = (Utc::now() + Duration::seconds(self.token_ttl_seconds)).timestamp();
        let exp = usize::try_from(exp)
            .map_err(|_| AuthError::Storage("Failed to encode token expiration".to_string()))?;

        Ok(AuthClaims {
            sub: user_id.to_string(),
            exp,
        })
    }

    pub fn encode_claims(&self, claims: &AuthClaims) -> Result<String, AuthError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|err| AuthError::Storage(format!("Failed to encode JWT: {}", err)))
    }

    pub fn decode_claims(&self, token: &str) -> Result<AuthClaims, AuthError> {
        let decoded = decode::<AuthClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|err| AuthError::Unauthorized(format!("Invalid token: {}", err)))?;
        Ok(decoded.claims)
    }
}

#[async_trait]
impl UserDirectory for AuthStore {
    async fn resolve_users(&self, ids: &[Uuid]) -> HashMap<Uuid, UserRef> {
        let state = self.state.read().await;
        ids.iter()
            .filter_map(|id| state.users.get(id).map(|user| (*id, user_to_ref(user))))
            .collect()
    }
}

fn user_to_summary(user: &User) -> UserSummary {
    UserSummary {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        organization: user.organization,
        created_at: user.created_at,
    }
}

fn user_to_ref(user: &User) -> UserRef {
    UserRef {
        id: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
    }
}

fn lookup_ref(state: &AuthState, user_id: Uuid) -> UserRef {
    state
        .users
        .get(&user_id)
        .map(user_to_ref)
        .unwrap_or_else(|| UserRef::unknown(user_id))
}

fn member_records(state: &AuthState, organization: &Organization) -> Vec<MemberRecord> {
    organization
        .members
        .iter()
        .filter_map(|membership| {
            state.users.get(&membership.user).map(|user| MemberRecord {
                user: user_to_ref(user),
                role: membership.role,
                joined_at: membership.joined_at,
            })
        })
        .collect()
}

fn organization_to_view(state: &AuthState, organization: &Organization) -> OrganizationView {
    OrganizationView {
        id: organization.id,
        name: organization.name.clone(),
        description: organization.description.clone(),
        owner: lookup_ref(state, organization.owner),
        invite_code: organization.invite_code.clone(),
        members: member_records(state, organization),
        settings: organization.settings,
        created_at: organization.created_at,
        updated_at: organization.updated_at,
    }
}

fn user_organization(state: &AuthState, user_id: Uuid) -> Result<&Organization, AuthError> {
    let not_member = || AuthError::NotFound("User not part of any organization".to_string());
    let org_id = state
        .users
        .get(&user_id)
        .and_then(|user| user.organization)
        .ok_or_else(not_member)?;
    state.organizations.get(&org_id).ok_or_else(not_member)
}

fn set_user_organization(state: &mut AuthState, user_id: Uuid, org_id: Option<Uuid>) {
    if let Some(user) = state.users.get_mut(&user_id) {
        user.organization = org_id;
    }
}

fn unique_invite_code(state: &AuthState) -> String {
    loop {
        let code = generate_invite_code();
        if !state
            .organizations
            .values()
            .any(|organization| organization.invite_code == code)
        {
            return code;
        }
    }
}

async fn load_state(path: &Path) -> Result<AuthState, AuthError> {
    if !path.exists() {
        return Ok(AuthState::default());
    }
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|err| AuthError::Storage(format!("Failed to read auth state: {}", err)))?;
    if content.trim().is_empty() {
        return Ok(AuthState::default());
    }
    let stored: StoredAuthState = serde_json::from_str(&content)
        .map_err(|err| AuthError::Storage(format!("Failed to parse auth state: {}", err)))?;
    Ok(stored.into())
}

async fn persist_state(path: &Path, state: &AuthState) -> Result<(), AuthError> {
    let content = serde_json::to_string_pretty(&StoredAuthState::from(state))
        .map_err(|err| AuthError::Storage(format!("Failed to serialize auth state: {}", err)))?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|err| {
            AuthError::Storage(format!("Failed to create auth parent dir: {}", err))
        })?;
    }
    tokio::fs::write(path, content)
        .await
        .map_err(|err| AuthError::Storage(format!("Failed to write auth state: {}", err)))?;
    Ok(())
}

fn sanitize_optional_string(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return Err(AuthError::InvalidInput("Invalid email".to_string()));
    }
    Ok(normalized)
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < 8 {
        return Err(AuthError::InvalidInput(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> String {
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();

    format!(
        "v1${}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(digest)
    )
}

fn verify_password(stored_hash: &str, password: &str) -> bool {
    let mut parts = stored_hash.split('$');
    let (Some("v1"), Some(encoded_salt), Some(encoded_digest)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let Ok(salt) = URL_SAFE_NO_PAD.decode(encoded_salt) else {
        return false;
    };
    let Ok(expected_digest) = URL_SAFE_NO_PAD.decode(encoded_digest) else {
        return false;
    };

    let mut hasher = Sha256::new();
    hasher.update(&salt);
    hasher.update(password.as_bytes());
    let actual_digest = hasher.finalize();
    expected_digest == actual_digest.as_slice()
}

/// Short URL-safe code, 12 characters.
fn generate_invite_code() -> String {
    let mut bytes = [0_u8; 9];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
