//! Core library for TaskFlow
//!
//! This crate contains the domain and persistence layer shared by the
//! server and the sync client:
//! - Task and hackathon models with their org-scoped stores
//! - Display-ready user references
//! - Realtime sync event wire format

pub mod error;
pub mod hackathon;
pub mod serde_helpers;
pub mod store;
pub mod sync;
pub mod task;
pub mod user;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
