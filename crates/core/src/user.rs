//! Display-ready user references
//!
//! Canonical entities carry `UserRef` records instead of bare identifiers so
//! clients can render creator and assignee names without a second lookup.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

impl UserRef {
    /// Placeholder for a user that no longer exists in the directory.
    pub fn unknown(id: Uuid) -> Self {
        Self {
            id,
            name: String::new(),
            email: String::new(),
        }
    }
}

/// Lookup of user display records by id.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve the given ids; unknown ids are simply absent from the result.
    async fn resolve_users(&self, ids: &[Uuid]) -> HashMap<Uuid, UserRef>;
}

/// Resolve a single reference, falling back to a placeholder.
pub fn resolve_one(users: &HashMap<Uuid, UserRef>, id: Uuid) -> UserRef {
    users
        .get(&id)
        .cloned()
        .unwrap_or_else(|| UserRef::unknown(id))
}

/// Resolve a list of references, dropping unknown users.
pub fn resolve_many(users: &HashMap<Uuid, UserRef>, ids: &[Uuid]) -> Vec<UserRef> {
    ids.iter().filter_map(|id| users.get(id).cloned()).collect()
}
