//! Error types for the core library

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Task not found")]
    TaskNotFound(Uuid),

    #[error("Hackathon not found")]
    HackathonNotFound(Uuid),

    #[error("Event not found")]
    EventNotFound(Uuid),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// True for the "absent or outside the caller's organization" family.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TaskNotFound(_) | Self::HackathonNotFound(_) | Self::EventNotFound(_)
        )
    }
}
