//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Permission caching and access guard evaluation."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use thiserror::Error;

/// Errors surfaced by permission resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    /// The backend rejected the credential; the session has been torn down.
    #[error("session rejected by backend")]
    Unauthorized,
    /// The cache was invalidated while the fetch was in flight.
    #[error("permission data superseded during fetch")]
    Superseded,
    /// A capability string could not be parsed.
    #[error("invalid capability '{0}'")]
    InvalidCapability(String),
}
