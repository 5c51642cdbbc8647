use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use taskflow_core::hackathon::{EventPatch, HackathonPatch, HackathonView, NewEvent, NewHackathon};
use taskflow_core::task::{NewTask, ReorderEntry, TaskPatch, TaskView};
use taskflow_core::user::UserRef;

use crate::error::{ClientError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// The server operations the reconciliation engine depends on.
pub trait SyncBackend: Send + Sync {
    fn list_tasks(&self) -> BackendFuture<'_, Vec<TaskView>>;

    fn create_task(&self, task: NewTask) -> BackendFuture<'_, TaskView>;

    fn update_task(&self, id: Uuid, patch: TaskPatch) -> BackendFuture<'_, TaskView>;

    fn toggle_task(&self, id: Uuid) -> BackendFuture<'_, TaskView>;

    fn delete_task(&self, id: Uuid) -> BackendFuture<'_, ()>;

    fn reorder_tasks(&self, entries: Vec<ReorderEntry>) -> BackendFuture<'_, Vec<TaskView>>;

    fn list_hackathons(&self) -> BackendFuture<'_, Vec<HackathonView>>;

    fn create_hackathon(&self, hackathon: NewHackathon) -> BackendFuture<'_, HackathonView>;

    fn update_hackathon(
        &self,
        id: Uuid,
        patch: HackathonPatch,
    ) -> BackendFuture<'_, HackathonView>;

    fn delete_hackathon(&self, id: Uuid) -> BackendFuture<'_, ()>;

    fn add_event(&self, hackathon_id: Uuid, event: NewEvent) -> BackendFuture<'_, HackathonView>;

    fn update_event(
        &self,
        hackathon_id: Uuid,
        event_id: Uuid,
        patch: EventPatch,
    ) -> BackendFuture<'_, HackathonView>;

    fn delete_event(&self, hackathon_id: Uuid, event_id: Uuid) -> BackendFuture<'_, HackathonView>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// The signed-in user as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub organization: Option<Uuid>,
}

impl Account {
    pub fn user_ref(&self) -> UserRef {
        UserRef {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ReorderRequest {
    tasks: Vec<ReorderEntry>,
}

#[derive(Deserialize)]
struct AuthResponse {
    token: String,
    user: Account,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: Account,
}

#[derive(Deserialize)]
struct TaskEnvelope {
    task: TaskView,
}

#[derive(Deserialize)]
struct TasksEnvelope {
    tasks: Vec<TaskView>,
}

#[derive(Deserialize)]
struct HackathonEnvelope {
    hackathon: HackathonView,
}

#[derive(Deserialize)]
struct HackathonsEnvelope {
    hackathons: Vec<HackathonView>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// reqwest-backed client for the TaskFlow REST API.
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Create an account and keep its bearer token for later calls.
    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> Result<Account> {
        let body = RegisterRequest {
            name,
            email,
            password,
        };
        let response: AuthResponse = self
            .execute(self.request(Method::POST, "/api/auth/register").json(&body))
            .await?;
        self.token = Some(response.token);
        Ok(response.user)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<Account> {
        let body = LoginRequest { email, password };
        let response: AuthResponse = self
            .execute(self.request(Method::POST, "/api/auth/login").json(&body))
            .await?;
        self.token = Some(response.token);
        Ok(response.user)
    }

    pub async fn me(&self) -> Result<Account> {
        let response: UserEnvelope = self
            .execute(self.request(Method::GET, "/api/auth/me"))
            .await?;
        Ok(response.user)
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskView>> {
        let response: TasksEnvelope = self.execute(self.request(Method::GET, "/api/tasks")).await?;
        Ok(response.tasks)
    }

    pub async fn create_task(&self, task: NewTask) -> Result<TaskView> {
        let response: TaskEnvelope = self
            .execute(self.request(Method::POST, "/api/tasks").json(&task))
            .await?;
        Ok(response.task)
    }

    pub async fn update_task(&self, id: Uuid, patch: TaskPatch) -> Result<TaskView> {
        let path = format!("/api/tasks/{}", id);
        let response: TaskEnvelope = self
            .execute(self.request(Method::PUT, &path).json(&patch))
            .await?;
        Ok(response.task)
    }

    pub async fn toggle_task(&self, id: Uuid) -> Result<TaskView> {
        let path = format!("/api/tasks/{}/toggle", id);
        let response: TaskEnvelope = self.execute(self.request(Method::PATCH, &path)).await?;
        Ok(response.task)
    }

    pub async fn delete_task(&self, id: Uuid) -> Result<()> {
        let path = format!("/api/tasks/{}", id);
        let _: IgnoredAny = self.execute(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    pub async fn reorder_tasks(&self, entries: Vec<ReorderEntry>) -> Result<Vec<TaskView>> {
        let body = ReorderRequest { tasks: entries };
        let response: TasksEnvelope = self
            .execute(self.request(Method::PUT, "/api/tasks/reorder").json(&body))
            .await?;
        Ok(response.tasks)
    }

    pub async fn list_hackathons(&self) -> Result<Vec<HackathonView>> {
        let response: HackathonsEnvelope = self
            .execute(self.request(Method::GET, "/api/hackathons"))
            .await?;
        Ok(response.hackathons)
    }

    pub async fn create_hackathon(&self, hackathon: NewHackathon) -> Result<HackathonView> {
        let response: HackathonEnvelope = self
            .execute(self.request(Method::POST, "/api/hackathons").json(&hackathon))
            .await?;
        Ok(response.hackathon)
    }

    pub async fn update_hackathon(&self, id: Uuid, patch: HackathonPatch) -> Result<HackathonView> {
        let path = format!("/api/hackathons/{}", id);
        let response: HackathonEnvelope = self
            .execute(self.request(Method::PUT, &path).json(&patch))
            .await?;
        Ok(response.hackathon)
    }

    pub async fn delete_hackathon(&self, id: Uuid) -> Result<()> {
        let path = format!("/api/hackathons/{}", id);
        let _: IgnoredAny = self.execute(self.request(Method::DELETE, &path)).await?;
        Ok(())
    }

    pub async fn add_event(&self, hackathon_id: Uuid, event: NewEvent) -> Result<HackathonView> {
        let path = format!("/api/hackathons/{}/events", hackathon_id);
        let response: HackathonEnvelope = self
            .execute(self.request(Method::POST, &path).json(&event))
            .await?;
        Ok(response.hackathon)
    }

    pub async fn update_event(
        &self,
        hackathon_id: Uuid,
        event_id: Uuid,
        patch: EventPatch,
    ) -> Result<HackathonView> {
        let path = format!("/api/hackathons/{}/events/{}", hackathon_id, event_id);
        let response: HackathonEnvelope = self
            .execute(self.request(Method::PUT, &path).json(&patch))
            .await?;
        Ok(response.hackathon)
    }

    pub async fn delete_event(&self, hackathon_id: Uuid, event_id: Uuid) -> Result<HackathonView> {
        let path = format!("/api/hackathons/{}/events/{}", hackathon_id, event_id);
        let response: HackathonEnvelope = self.execute(self.request(Method::DELETE, &path)).await?;
        Ok(response.hackathon)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
            };
            debug!("Request failed with {}: {}", status, message);
            return Err(ClientError::status(status.as_u16(), message));
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

impl SyncBackend for ApiClient {
    fn list_tasks(&self) -> BackendFuture<'_, Vec<TaskView>> {
        Box::pin(self.list_tasks())
    }

    fn create_task(&self, task: NewTask) -> BackendFuture<'_, TaskView> {
        Box::pin(self.create_task(task))
    }

    fn update_task(&self, id: Uuid, patch: TaskPatch) -> BackendFuture<'_, TaskView> {
        Box::pin(self.update_task(id, patch))
    }

    fn toggle_task(&self, id: Uuid) -> BackendFuture<'_, TaskView> {
        Box::pin(self.toggle_task(id))
    }

    fn delete_task(&self, id: Uuid) -> BackendFuture<'_, ()> {
        Box::pin(self.delete_task(id))
    }

    fn reorder_tasks(&self, entries: Vec<ReorderEntry>) -> BackendFuture<'_, Vec<TaskView>> {
        Box::pin(self.reorder_tasks(entries))
    }

    fn list_hackathons(&self) -> BackendFuture<'_, Vec<HackathonView>> {
        Box::pin(self.list_hackathons())
    }

    fn create_hackathon(&self, hackathon: NewHackathon) -> BackendFuture<'_, HackathonView> {
        Box::pin(self.create_hackathon(hackathon))
    }

    fn update_hackathon(
        &self,
        id: Uuid,
        patch: HackathonPatch,
    ) -> BackendFuture<'_, HackathonView> {
        Box::pin(self.update_hackathon(id, patch))
    }

    fn delete_hackathon(&self, id: Uuid) -> BackendFuture<'_, ()> {
        Box::pin(self.delete_hackathon(id))
    }

    fn add_event(&self, hackathon_id: Uuid, event: NewEvent) -> BackendFuture<'_, HackathonView> {
        Box::pin(self.add_event(hackathon_id, event))
    }

    fn update_event(
        &self,
        hackathon_id: Uuid,
        event_id: Uuid,
        patch: EventPatch,
    ) -> BackendFuture<'_, HackathonView> {
        Box::pin(self.update_event(hackathon_id, event_id, patch))
    }

    fn delete_event(&self, hackathon_id: Uuid, event_id: Uuid) -> BackendFuture<'_, HackathonView> {
        Box::pin(self.delete_event(hackathon_id, event_id))
    }
}
