//! Hackathon and embedded event mutations

use std::sync::Arc;

use uuid::Uuid;

use taskflow_core::hackathon::{
    EventPatch, Hackathon, HackathonPatch, HackathonRepository, HackathonView, NewEvent,
    NewHackathon,
};
use taskflow_core::sync::SyncEvent;
use taskflow_core::user::UserDirectory;
use taskflow_core::Result;

use crate::realtime::Broadcaster;

#[derive(Clone)]
pub struct HackathonPipeline {
    hackathons: Arc<dyn HackathonRepository>,
    users: Arc<dyn UserDirectory>,
    broadcaster: Broadcaster,
}

impl HackathonPipeline {
    pub fn new(
        hackathons: Arc<dyn HackathonRepository>,
        users: Arc<dyn UserDirectory>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            hackathons,
            users,
            broadcaster,
        }
    }

    pub async fn list(&self, organization: Uuid) -> Result<Vec<HackathonView>> {
        let hackathons = self.hackathons.list(organization).await?;
        let mut ids: Vec<Uuid> = hackathons.iter().flat_map(Hackathon::user_ids).collect();
        ids.sort_unstable();
        ids.dedup();
        let users = self.users.resolve_users(&ids).await;
        Ok(hackathons
            .into_iter()
            .map(|hackathon| HackathonView::resolve(hackathon, &users))
            .collect())
    }

    pub async fn create(
        &self,
        organization: Uuid,
        created_by: Uuid,
        new_hackathon: NewHackathon,
    ) -> Result<HackathonView> {
        let hackathon = new_hackathon.into_hackathon(organization, created_by)?;
        let created = self.hackathons.create(hackathon).await?;
        let view = self.resolve(created).await;
        self.broadcaster
            .publish(organization, SyncEvent::HackathonCreated(view.clone()))
            .await;
        Ok(view)
    }

    pub async fn update(
        &self,
        organization: Uuid,
        id: Uuid,
        patch: HackathonPatch,
    ) -> Result<HackathonView> {
        let updated = self.hackathons.update(organization, id, patch).await?;
        let view = self.resolve(updated).await;
        self.broadcaster
            .publish(organization, SyncEvent::HackathonUpdated(view.clone()))
            .await;
        Ok(view)
    }

    pub async fn delete(&self, organization: Uuid, id: Uuid) -> Result<()> {
        self.hackathons.delete(organization, id).await?;
        self.broadcaster
            .publish(organization, SyncEvent::HackathonDeleted { hackathon_id: id })
            .await;
        Ok(())
    }

    /// Append an event; returns the parent hackathon.
    pub async fn add_event(
        &self,
        organization: Uuid,
        id: Uuid,
        new_event: NewEvent,
    ) -> Result<HackathonView> {
        let (parent, event) = self.hackathons.add_event(organization, id, new_event).await?;
        self.broadcaster
            .publish(
                organization,
                SyncEvent::HackathonEventAdded {
                    hackathon_id: id,
                    event,
                },
            )
            .await;
        Ok(self.resolve(parent).await)
    }

    pub async fn update_event(
        &self,
        organization: Uuid,
        id: Uuid,
        event_id: Uuid,
        patch: EventPatch,
    ) -> Result<HackathonView> {
        let (parent, event) = self
            .hackathons
            .update_event(organization, id, event_id, patch)
            .await?;
        self.broadcaster
            .publish(
                organization,
                SyncEvent::HackathonEventUpdated {
                    hackathon_id: id,
                    event,
                },
            )
            .await;
        Ok(self.resolve(parent).await)
    }

    pub async fn delete_event(
        &self,
        organization: Uuid,
        id: Uuid,
        event_id: Uuid,
    ) -> Result<HackathonView> {
        let parent = self
            .hackathons
            .delete_event(organization, id, event_id)
            .await?;
        self.broadcaster
            .publish(
                organization,
                SyncEvent::HackathonEventDeleted {
                    hackathon_id: id,
                    event_id,
                },
            )
            .await;
        Ok(self.resolve(parent).await)
    }

    async fn resolve(&self, hackathon: Hackathon) -> HackathonView {
        let users = self.users.resolve_users(&hackathon.user_ids()).await;
        HackathonView::resolve(hackathon, &users)
    }
}
