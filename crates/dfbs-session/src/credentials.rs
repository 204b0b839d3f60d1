//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Session state, identity context and session events."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use parking_lot::RwLock;

/// Storage for the bearer credential attached to backend requests.
pub trait CredentialStore: Send + Sync + 'static {
    /// Current token, if any.
    fn token(&self) -> Option<String>;
    /// Replace the stored token.
    fn set_token(&self, token: &str);
    /// Forget the stored token.
    fn clear(&self);
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    fn set_token(&self, token: &str) {
        *self.token.write() = Some(token.to_owned());
    }

    fn clear(&self) {
        self.token.write().take();
    }
}
