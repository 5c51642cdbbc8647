//! File-backed document collection
//!
//! Every document belongs to exactly one organization. All lookups take the
//! organization id together with the document id, so a document outside the
//! caller's organization is indistinguishable from a missing one.
//!
//! A mutation locates the document, applies the change to a copy, swaps it in
//! and rewrites the JSON file while holding the collection's write guard. A
//! failed change or a failed write leaves both memory and disk untouched.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use crate::{Error, Result};

/// A persisted, organization-owned record.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> Uuid;
    fn organization(&self) -> Uuid;
    /// Stamp the modification time.
    fn touch(&mut self, now: DateTime<Utc>);
}

pub struct DocumentStore<T> {
    /// Path to the JSON file
    path: PathBuf,
    docs: RwLock<HashMap<Uuid, T>>,
}

impl<T: Document> DocumentStore<T> {
    /// Open a collection, loading the file if it exists.
    ///
    /// A missing or empty file yields an empty collection.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let docs = if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                let items: Vec<T> = serde_json::from_str(&content)?;
                items.into_iter().map(|doc| (doc.id(), doc)).collect()
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            docs: RwLock::new(docs),
        })
    }

    pub async fn insert(&self, doc: T) -> Result<T> {
        let mut docs = self.docs.write().await;
        if docs.contains_key(&doc.id()) {
            return Err(Error::InvalidInput(format!(
                "Document with ID {} already exists",
                doc.id()
            )));
        }
        docs.insert(doc.id(), doc.clone());
        if let Err(err) = self.persist(&docs).await {
            docs.remove(&doc.id());
            return Err(err);
        }
        Ok(doc)
    }

    pub async fn get(&self, organization: Uuid, id: Uuid) -> Option<T> {
        let docs = self.docs.read().await;
        docs.get(&id)
            .filter(|doc| doc.organization() == organization)
            .cloned()
    }

    /// All documents owned by `organization`, unordered.
    pub async fn list(&self, organization: Uuid) -> Vec<T> {
        let docs = self.docs.read().await;
        docs.values()
            .filter(|doc| doc.organization() == organization)
            .cloned()
            .collect()
    }

    /// Atomically apply `change` to one document.
    ///
    /// Returns `Ok(None)` when the document does not exist in `organization`.
    pub async fn modify<F>(&self, organization: Uuid, id: Uuid, change: F) -> Result<Option<T>>
    where
        F: FnOnce(&mut T) -> Result<()>,
    {
        let mut docs = self.docs.write().await;
        let Some(current) = docs.get(&id).filter(|doc| doc.organization() == organization) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        change(&mut updated)?;
        updated.touch(Utc::now());

        let previous = docs.insert(id, updated.clone());
        if let Err(err) = self.persist(&docs).await {
            if let Some(previous) = previous {
                docs.insert(id, previous);
            }
            return Err(err);
        }
        Ok(Some(updated))
    }

    /// Remove one document, returning it if it existed in `organization`.
    pub async fn remove(&self, organization: Uuid, id: Uuid) -> Result<Option<T>> {
        let mut docs = self.docs.write().await;
        let owned = docs
            .get(&id)
            .is_some_and(|doc| doc.organization() == organization);
        if !owned {
            return Ok(None);
        }

        let removed = docs.remove(&id);
        if let Err(err) = self.persist(&docs).await {
            if let Some(doc) = removed {
                docs.insert(id, doc);
            }
            return Err(err);
        }
        Ok(removed)
    }

    /// Number of documents across all organizations.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }

    /// Rewrite the file. Callers hold the write guard.
    async fn persist(&self, docs: &HashMap<Uuid, T>) -> Result<()> {
        let items: Vec<&T> = docs.values().collect();
        let content = serde_json::to_string_pretty(&items)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, content).await.map_err(|err| {
            warn!("Failed to write {:?}: {}", self.path, err);
            Error::Storage(format!("Failed to write {}: {}", self.path.display(), err))
        })
    }
}
