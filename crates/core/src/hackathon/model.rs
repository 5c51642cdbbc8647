//! Hackathon and embedded event models
//!
//! Events live inside their parent hackathon's ordered `events` list and are
//! addressed by an id that is only meaningful within that parent.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::serde_helpers::{flexible_date, nullable};
use crate::store::Document;
use crate::user::{resolve_many, resolve_one, UserRef};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HackathonStatus {
    Registered,
    InProgress,
    Submitted,
    Completed,
}

impl Default for HackathonStatus {
    fn default() -> Self {
        Self::Registered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Milestone,
    Event,
    Deadline,
}

impl Default for EventKind {
    fn default() -> Self {
        Self::Milestone
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HackathonEvent {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    /// Free-form time of day, e.g. "14:00"
    pub time: Option<String>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hackathon {
    pub id: Uuid,
    pub organization: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub team_name: Option<String>,
    pub team_members: Vec<String>,
    pub project_idea: Option<String>,
    pub status: HackathonStatus,
    pub events: Vec<HackathonEvent>,
    pub collaborators: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Hackathon {
    pub fn new(
        organization: Uuid,
        created_by: Uuid,
        name: impl Into<String>,
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization,
            created_by,
            name: name.into(),
            start_date,
            end_date,
            team_name: None,
            team_members: Vec::new(),
            project_idea: None,
            status: HackathonStatus::default(),
            events: Vec::new(),
            collaborators: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Shallow-merge the provided fields. Events are not touched here.
    pub fn apply(&mut self, patch: HackathonPatch) -> Result<()> {
        if let Some(name) = patch.name {
            self.name = required_text(&name, "Hackathon name is required")?;
        }
        let start_date = patch.start_date.unwrap_or(self.start_date);
        let end_date = patch.end_date.unwrap_or(self.end_date);
        validate_range(start_date, end_date)?;
        self.start_date = start_date;
        self.end_date = end_date;

        if let Some(team_name) = patch.team_name {
            self.team_name = clean_optional(team_name);
        }
        if let Some(team_members) = patch.team_members {
            self.team_members = clean_names(team_members);
        }
        if let Some(project_idea) = patch.project_idea {
            self.project_idea = clean_optional(project_idea);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(collaborators) = patch.collaborators {
            self.collaborators = collaborators;
        }
        Ok(())
    }

    /// Append an event to the end of the list.
    pub fn add_event(&mut self, new_event: NewEvent) -> Result<HackathonEvent> {
        let event = new_event.into_event()?;
        self.events.push(event.clone());
        Ok(event)
    }

    pub fn event(&self, event_id: Uuid) -> Option<&HackathonEvent> {
        self.events.iter().find(|event| event.id == event_id)
    }

    /// Merge `patch` over the event with `event_id`, keeping its position.
    pub fn update_event(&mut self, event_id: Uuid, patch: EventPatch) -> Result<HackathonEvent> {
        let event = self
            .events
            .iter_mut()
            .find(|event| event.id == event_id)
            .ok_or(Error::EventNotFound(event_id))?;
        event.apply(patch)?;
        Ok(event.clone())
    }

    /// Splice the event out of the list.
    pub fn remove_event(&mut self, event_id: Uuid) -> Result<HackathonEvent> {
        let index = self
            .events
            .iter()
            .position(|event| event.id == event_id)
            .ok_or(Error::EventNotFound(event_id))?;
        Ok(self.events.remove(index))
    }

    pub fn user_ids(&self) -> Vec<Uuid> {
        let mut ids = Vec::with_capacity(1 + self.collaborators.len());
        ids.push(self.created_by);
        ids.extend(self.collaborators.iter().copied());
        ids
    }
}

impl Document for Hackathon {
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

impl HackathonEvent {
    fn apply(&mut self, patch: EventPatch) -> Result<()> {
        if let Some(title) = patch.title {
            self.title = required_text(&title, "Event title is required")?;
        }
        if let Some(description) = patch.description {
            self.description = clean_optional(description);
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(time) = patch.time {
            self.time = clean_optional(time);
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        Ok(())
    }
}

/// Body of a hackathon create request
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHackathon {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "flexible_date", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub team_members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_idea: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<HackathonStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collaborators: Vec<Uuid>,
}

impl NewHackathon {
    pub fn into_hackathon(self, organization: Uuid, created_by: Uuid) -> Result<Hackathon> {
        let name = required_text(
            self.name.as_deref().unwrap_or_default(),
            "Hackathon name is required",
        )?;
        let start_date = self
            .start_date
            .ok_or_else(|| Error::InvalidInput("Start date is required".to_string()))?;
        let end_date = self
            .end_date
            .ok_or_else(|| Error::InvalidInput("End date is required".to_string()))?;
        validate_range(start_date, end_date)?;

        let mut hackathon = Hackathon::new(organization, created_by, name, start_date, end_date);
        hackathon.team_name = clean_optional(self.team_name);
        hackathon.team_members = clean_names(self.team_members);
        hackathon.project_idea = clean_optional(self.project_idea);
        hackathon.status = self.status.unwrap_or_default();
        hackathon.collaborators = self.collaborators;
        Ok(hackathon)
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HackathonPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "flexible_date", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub team_name: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_members: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub project_idea: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<HackathonStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collaborators: Option<Vec<Uuid>>,
}

/// Body of an add-event request
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "flexible_date", skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl NewEvent {
    fn into_event(self) -> Result<HackathonEvent> {
        let title = required_text(
            self.title.as_deref().unwrap_or_default(),
            "Event title is required",
        )?;
        let date = self
            .date
            .ok_or_else(|| Error::InvalidInput("Event date is required".to_string()))?;
        Ok(HackathonEvent {
            id: Uuid::new_v4(),
            title,
            description: clean_optional(self.description),
            date,
            time: clean_optional(self.time),
            kind: self.kind.unwrap_or_default(),
            completed: self.completed.unwrap_or(false),
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "flexible_date", skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable", skip_serializing_if = "Option::is_none")]
    pub time: Option<Option<String>>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Canonical hackathon as returned to clients and broadcast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HackathonView {
    pub id: Uuid,
    pub organization: Uuid,
    pub created_by: UserRef,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub team_name: Option<String>,
    pub team_members: Vec<String>,
    pub project_idea: Option<String>,
    pub status: HackathonStatus,
    pub events: Vec<HackathonEvent>,
    pub collaborators: Vec<UserRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HackathonView {
    pub fn resolve(hackathon: Hackathon, users: &HashMap<Uuid, UserRef>) -> Self {
        Self {
            id: hackathon.id,
            organization: hackathon.organization,
            created_by: resolve_one(users, hackathon.created_by),
            name: hackathon.name,
            start_date: hackathon.start_date,
            end_date: hackathon.end_date,
            team_name: hackathon.team_name,
            team_members: hackathon.team_members,
            project_idea: hackathon.project_idea,
            status: hackathon.status,
            events: hackathon.events,
            collaborators: resolve_many(users, &hackathon.collaborators),
            created_at: hackathon.created_at,
            updated_at: hackathon.updated_at,
        }
    }

    /// Insert or replace an event by id, keeping existing positions.
    pub fn upsert_event(&mut self, event: HackathonEvent) {
        match self.events.iter_mut().find(|existing| existing.id == event.id) {
            Some(existing) => *existing = event,
            None => self.events.push(event),
        }
    }

    pub fn remove_event(&mut self, event_id: Uuid) -> Option<HackathonEvent> {
        let index = self.events.iter().position(|event| event.id == event_id)?;
        Some(self.events.remove(index))
    }
}

fn required_text(value: &str, message: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(message.to_string()));
    }
    Ok(trimmed.to_string())
}

fn validate_range(start_date: DateTime<Utc>, end_date: DateTime<Utc>) -> Result<()> {
    if end_date < start_date {
        return Err(Error::InvalidInput(
            "End date cannot be before start date".to_string(),
        ));
    }
    Ok(())
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

fn clean_names(names: Vec<String>) -> Vec<String> {
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn hackathon() -> Hackathon {
        let start = Utc::now();
        Hackathon::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "HackMIT",
            start,
            start + Duration::days(2),
        )
    }

    fn new_event(title: &str) -> NewEvent {
        NewEvent {
            title: Some(title.to_string()),
            date: Some(Utc::now()),
            ..NewEvent::default()
        }
    }

    #[test]
    fn create_requires_name_and_dates() {
        let org = Uuid::new_v4();
        let user = Uuid::new_v4();

        let missing_name: NewHackathon =
            serde_json::from_value(json!({"startDate": "2024-01-01", "endDate": "2024-01-02"}))
                .unwrap();
        assert!(missing_name.into_hackathon(org, user).is_err());

        let missing_end: NewHackathon =
            serde_json::from_value(json!({"name": "Hack", "startDate": "2024-01-01"})).unwrap();
        assert!(missing_end.into_hackathon(org, user).is_err());

        let inverted: NewHackathon = serde_json::from_value(
            json!({"name": "Hack", "startDate": "2024-01-03", "endDate": "2024-01-01"}),
        )
        .unwrap();
        assert!(inverted.into_hackathon(org, user).is_err());

        let ok: NewHackathon = serde_json::from_value(json!({
            "name": "Hack",
            "startDate": "2024-01-01",
            "endDate": "2024-01-03",
            "teamMembers": ["Ada", " ", "Grace "],
            "status": "in-progress"
        }))
        .unwrap();
        let hackathon = ok.into_hackathon(org, user).unwrap();
        assert_eq!(hackathon.team_members, vec!["Ada", "Grace"]);
        assert_eq!(hackathon.status, HackathonStatus::InProgress);
        assert!(hackathon.events.is_empty());
    }

    #[test]
    fn event_lifecycle_within_parent() {
        let mut hackathon = hackathon();
        let first = hackathon.add_event(new_event("Kickoff")).unwrap();
        let second = hackathon.add_event(new_event("Demo")).unwrap();
        assert_eq!(first.kind, EventKind::Milestone);

        let updated = hackathon
            .update_event(
                first.id,
                EventPatch {
                    completed: Some(true),
                    ..EventPatch::default()
                },
            )
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.title, "Kickoff");
        assert_eq!(hackathon.events[0].id, first.id);

        hackathon.remove_event(first.id).unwrap();
        assert_eq!(hackathon.events.len(), 1);
        assert_eq!(hackathon.events[0].id, second.id);

        hackathon.remove_event(second.id).unwrap();
        assert!(hackathon.events.is_empty());
        assert_eq!(serde_json::to_value(&hackathon).unwrap()["events"], json!([]));
    }

    #[test]
    fn unknown_event_is_not_found() {
        let mut hackathon = hackathon();
        let missing = Uuid::new_v4();
        assert!(matches!(
            hackathon.remove_event(missing),
            Err(Error::EventNotFound(id)) if id == missing
        ));
        assert!(matches!(
            hackathon.update_event(missing, EventPatch::default()),
            Err(Error::EventNotFound(_))
        ));
    }

    #[test]
    fn event_requires_title_and_date() {
        let mut hackathon = hackathon();
        assert!(hackathon.add_event(NewEvent::default()).is_err());
        assert!(hackathon
            .add_event(NewEvent {
                title: Some("No date".to_string()),
                ..NewEvent::default()
            })
            .is_err());
        assert!(hackathon.events.is_empty());
    }

    #[test]
    fn patch_keeps_events_and_validates_range() {
        let mut hackathon = hackathon();
        hackathon.add_event(new_event("Kickoff")).unwrap();

        let patch: HackathonPatch =
            serde_json::from_value(json!({"status": "submitted", "teamName": null})).unwrap();
        hackathon.apply(patch).unwrap();
        assert_eq!(hackathon.status, HackathonStatus::Submitted);
        assert_eq!(hackathon.events.len(), 1);

        let bad = HackathonPatch {
            end_date: Some(hackathon.start_date - Duration::days(1)),
            ..HackathonPatch::default()
        };
        assert!(hackathon.apply(bad).is_err());
    }

    #[test]
    fn view_upserts_events_by_id() {
        let mut hackathon = hackathon();
        let event = hackathon.add_event(new_event("Kickoff")).unwrap();
        let mut view = HackathonView::resolve(hackathon, &HashMap::new());

        let mut changed = event.clone();
        changed.completed = true;
        view.upsert_event(changed.clone());
        view.upsert_event(changed);
        assert_eq!(view.events.len(), 1);
        assert!(view.events[0].completed);

        assert!(view.remove_event(event.id).is_some());
        assert!(view.remove_event(event.id).is_none());
        assert!(view.events.is_empty());
    }
}
