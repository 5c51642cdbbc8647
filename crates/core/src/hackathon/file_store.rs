//! File-based hackathon storage
//!
//! Event operations rewrite the parent document under the collection's write
//! guard, so concurrent edits to different events of one hackathon never
//! overwrite each other.

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use super::model::{EventPatch, Hackathon, HackathonEvent, HackathonPatch, NewEvent};
use super::repository::HackathonRepository;
use crate::store::DocumentStore;
use crate::{Error, Result};

pub struct FileHackathonStore {
    docs: DocumentStore<Hackathon>,
}

impl FileHackathonStore {
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            docs: DocumentStore::open(path).await?,
        })
    }
}

#[async_trait]
impl HackathonRepository for FileHackathonStore {
    async fn create(&self, hackathon: Hackathon) -> Result<Hackathon> {
        self.docs.insert(hackathon).await
    }

    async fn get(&self, organization: Uuid, id: Uuid) -> Result<Option<Hackathon>> {
        Ok(self.docs.get(organization, id).await)
    }

    async fn list(&self, organization: Uuid) -> Result<Vec<Hackathon>> {
        let mut hackathons = self.docs.list(organization).await;
        hackathons.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(hackathons)
    }

    async fn update(
        &self,
        organization: Uuid,
        id: Uuid,
        patch: HackathonPatch,
    ) -> Result<Hackathon> {
        self.docs
            .modify(organization, id, |hackathon| hackathon.apply(patch))
            .await?
            .ok_or(Error::HackathonNotFound(id))
    }

    async fn delete(&self, organization: Uuid, id: Uuid) -> Result<Hackathon> {
        self.docs
            .remove(organization, id)
            .await?
            .ok_or(Error::HackathonNotFound(id))
    }

    async fn add_event(
        &self,
        organization: Uuid,
        id: Uuid,
        event: NewEvent,
    ) -> Result<(Hackathon, HackathonEvent)> {
        let mut added = None;
        let hackathon = self
            .docs
            .modify(organization, id, |hackathon| {
                added = Some(hackathon.add_event(event)?);
                Ok(())
            })
            .await?
            .ok_or(Error::HackathonNotFound(id))?;
        let event = added.ok_or_else(|| Error::Storage("event was not recorded".to_string()))?;
        Ok((hackathon, event))
    }

    async fn update_event(
        &self,
        organization: Uuid,
        id: Uuid,
        event_id: Uuid,
        patch: EventPatch,
    ) -> Result<(Hackathon, HackathonEvent)> {
        let mut updated = None;
        let hackathon = self
            .docs
            .modify(organization, id, |hackathon| {
                updated = Some(hackathon.update_event(event_id, patch)?);
                Ok(())
            })
            .await?
            .ok_or(Error::HackathonNotFound(id))?;
        let event = updated.ok_or(Error::EventNotFound(event_id))?;
        Ok((hackathon, event))
    }

    async fn delete_event(
        &self,
        organization: Uuid,
        id: Uuid,
        event_id: Uuid,
    ) -> Result<Hackathon> {
        self.docs
            .modify(organization, id, |hackathon| {
                hackathon.remove_event(event_id).map(|_| ())
            })
            .await?
            .ok_or(Error::HackathonNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn create_test_store() -> (FileHackathonStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileHackathonStore::new(temp_dir.path().join("hackathons.json"))
            .await
            .unwrap();
        (store, temp_dir)
    }

    fn hackathon(org: Uuid, name: &str) -> Hackathon {
        let start = Utc::now();
        Hackathon::new(org, Uuid::new_v4(), name, start, start + Duration::days(1))
    }

    fn new_event(title: &str) -> NewEvent {
        NewEvent {
            title: Some(title.to_string()),
            date: Some(Utc::now()),
            ..NewEvent::default()
        }
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_org_scoped() {
        let (store, _temp) = create_test_store().await;
        let org = Uuid::new_v4();

        let mut older = hackathon(org, "Older");
        older.created_at = Utc::now() - Duration::hours(1);
        store.create(older).await.unwrap();
        store.create(hackathon(org, "Newer")).await.unwrap();
        store.create(hackathon(Uuid::new_v4(), "Elsewhere")).await.unwrap();

        let names: Vec<String> = store
            .list(org)
            .await
            .unwrap()
            .into_iter()
            .map(|h| h.name)
            .collect();
        assert_eq!(names, vec!["Newer", "Older"]);
    }

    #[tokio::test]
    async fn test_event_operations_return_parent() {
        let (store, _temp) = create_test_store().await;
        let org = Uuid::new_v4();
        let created = store.create(hackathon(org, "Hack")).await.unwrap();

        let (parent, event) = store
            .add_event(org, created.id, new_event("Kickoff"))
            .await
            .unwrap();
        assert_eq!(parent.events.len(), 1);
        assert_eq!(parent.events[0].id, event.id);

        let (parent, event) = store
            .update_event(
                org,
                created.id,
                event.id,
                EventPatch {
                    completed: Some(true),
                    ..EventPatch::default()
                },
            )
            .await
            .unwrap();
        assert!(event.completed);
        assert!(parent.events[0].completed);

        let parent = store.delete_event(org, created.id, event.id).await.unwrap();
        assert!(parent.events.is_empty());

        assert!(matches!(
            store.delete_event(org, created.id, event.id).await,
            Err(Error::EventNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_event_on_foreign_hackathon_is_not_found() {
        let (store, _temp) = create_test_store().await;
        let owner = Uuid::new_v4();
        let created = store.create(hackathon(owner, "Private")).await.unwrap();

        let result = store
            .add_event(Uuid::new_v4(), created.id, new_event("Intrusion"))
            .await;
        assert!(matches!(result, Err(Error::HackathonNotFound(id)) if id == created.id));
        assert!(store
            .get(owner, created.id)
            .await
            .unwrap()
            .unwrap()
            .events
            .is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_event_adds_are_all_kept() {
        let (store, _temp) = create_test_store().await;
        let store = Arc::new(store);
        let org = Uuid::new_v4();
        let created = store.create(hackathon(org, "Busy")).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let id = created.id;
                tokio::spawn(async move {
                    store
                        .add_event(org, id, new_event(&format!("Event {i}")))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store.get(org, created.id).await.unwrap().unwrap();
        assert_eq!(stored.events.len(), 8);
    }

    #[tokio::test]
    async fn test_delete_removes_embedded_events() {
        let (store, _temp) = create_test_store().await;
        let org = Uuid::new_v4();
        let created = store.create(hackathon(org, "Gone")).await.unwrap();
        store
            .add_event(org, created.id, new_event("Kickoff"))
            .await
            .unwrap();

        let removed = store.delete(org, created.id).await.unwrap();
        assert_eq!(removed.events.len(), 1);
        assert!(store.get(org, created.id).await.unwrap().is_none());
        assert!(matches!(
            store.delete(org, created.id).await,
            Err(Error::HackathonNotFound(_))
        ));
    }
}
