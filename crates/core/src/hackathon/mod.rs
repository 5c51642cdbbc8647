//! Hackathon module
//!
//! Hackathons with their embedded timeline events and the org-scoped store.

mod file_store;
mod model;
mod repository;

pub use file_store::FileHackathonStore;
pub use model::*;
pub use repository::HackathonRepository;
