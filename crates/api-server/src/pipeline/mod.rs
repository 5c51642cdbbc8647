//! Mutation pipeline: validate, commit, then broadcast.

mod hackathons;
mod tasks;

pub use hackathons::HackathonPipeline;
pub use tasks::TaskPipeline;
