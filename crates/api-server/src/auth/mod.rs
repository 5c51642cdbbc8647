//! Users, organizations and bearer tokens.

mod store;

pub use store::{AuthError, AuthSession, AuthStore, MemberRecord, OrganizationView, UserSummary};
