//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Session state, identity context and session events."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Session primitives: who is logged in, which viewpoint override is active, where the
//! bearer credential lives, and the event bus other layers subscribe to.

pub mod credentials;
pub mod events;
pub mod identity;
pub mod session;

pub use credentials::{CredentialStore, MemoryCredentialStore};
pub use events::{
    InvalidationReason, ListenerId, SessionEvent, SessionEvents, SessionListener,
};
pub use identity::{IdentityContext, UserId, UserProfile, Vision};
pub use session::{Session, SessionError, SessionSnapshot};
