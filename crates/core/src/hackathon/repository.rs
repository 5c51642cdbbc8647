//! Hackathon repository trait

use async_trait::async_trait;
use uuid::Uuid;

use super::model::{EventPatch, Hackathon, HackathonEvent, HackathonPatch, NewEvent};
use crate::Result;

#[async_trait]
pub trait HackathonRepository: Send + Sync {
    async fn create(&self, hackathon: Hackathon) -> Result<Hackathon>;

    async fn get(&self, organization: Uuid, id: Uuid) -> Result<Option<Hackathon>>;

    /// All hackathons of an organization, newest first
    async fn list(&self, organization: Uuid) -> Result<Vec<Hackathon>>;

    async fn update(&self, organization: Uuid, id: Uuid, patch: HackathonPatch)
        -> Result<Hackathon>;

    async fn delete(&self, organization: Uuid, id: Uuid) -> Result<Hackathon>;

    /// Append an event; returns the parent after the write and the new event
    async fn add_event(
        &self,
        organization: Uuid,
        id: Uuid,
        event: NewEvent,
    ) -> Result<(Hackathon, HackathonEvent)>;

    async fn update_event(
        &self,
        organization: Uuid,
        id: Uuid,
        event_id: Uuid,
        patch: EventPatch,
    ) -> Result<(Hackathon, HackathonEvent)>;

    async fn delete_event(&self, organization: Uuid, id: Uuid, event_id: Uuid)
        -> Result<Hackathon>;
}
