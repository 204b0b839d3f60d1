//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Session state, identity context and session events."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{info, warn};

use crate::credentials::CredentialStore;
use crate::events::{SessionEvent, SessionEvents, SessionListener};
use crate::identity::{IdentityContext, UserProfile, Vision};

/// Errors returned when mutating the session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Login attempted with a blank token.
    #[error("login token cannot be empty")]
    EmptyToken,
    /// Login attempted with a profile lacking an identifier.
    #[error("login profile is missing a user id")]
    MissingUserId,
}

/// Point-in-time view of the session used by guard evaluation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Logged-in user, if any.
    pub user: Option<UserProfile>,
    /// Active viewpoint override.
    pub vision: Vision,
    /// Incremented on every vision change.
    pub vision_version: u64,
}

impl SessionSnapshot {
    /// Snapshot for an anonymous visitor.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Snapshot for a logged-in user without a viewpoint override.
    pub fn authenticated(user: UserProfile) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    /// Replace the vision state.
    pub fn with_vision(mut self, vision: Vision) -> Self {
        self.vision = vision;
        self
    }

    /// Whether a user is logged in.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Identity context permission data is keyed under; `None` when anonymous.
    pub fn identity_context(&self) -> Option<IdentityContext> {
        self.user
            .as_ref()
            .map(|user| IdentityContext::new(user.id.clone(), &self.vision))
    }

    /// Role names held by the logged-in user.
    pub fn roles(&self) -> &[String] {
        self.user
            .as_ref()
            .map(|user| user.roles.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct SessionState {
    user: Option<UserProfile>,
    vision: Vision,
    vision_version: u64,
}

/// Resets local session state when the backend rejects the credential.
struct SessionReset {
    state: Arc<RwLock<SessionState>>,
    credentials: Arc<dyn CredentialStore>,
}

impl SessionListener for SessionReset {
    fn on_event(&self, event: &SessionEvent) {
        if let SessionEvent::Invalidated { reason } = event {
            self.credentials.clear();
            let mut state = self.state.write();
            let user = state.user.take().map(|u| u.id);
            state.vision = Vision::Off;
            warn!(?reason, user = ?user, "session invalidated; credential cleared");
        }
    }
}

/// Logged-in user, vision override and stored credential.
#[derive(Clone)]
pub struct Session {
    state: Arc<RwLock<SessionState>>,
    credentials: Arc<dyn CredentialStore>,
    events: SessionEvents,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &*self.state.read())
            .field("events", &self.events)
            .finish()
    }
}

impl Session {
    /// Create a session bound to a credential store and event bus.
    ///
    /// The session registers itself on the bus so that an `Invalidated` event clears the
    /// stored credential and the user profile.
    pub fn new(credentials: Arc<dyn CredentialStore>, events: SessionEvents) -> Self {
        let state = Arc::new(RwLock::new(SessionState::default()));
        events.register(Arc::new(SessionReset {
            state: state.clone(),
            credentials: credentials.clone(),
        }));
        Self {
            state,
            credentials,
            events,
        }
    }

    /// Event bus the session publishes on.
    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    /// Store the credential and profile returned by a successful login.
    pub fn login(&self, token: &str, user: UserProfile) -> Result<(), SessionError> {
        if token.trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }
        if user.id.trim().is_empty() {
            return Err(SessionError::MissingUserId);
        }
        let user_id = user.id.clone();
        self.credentials.set_token(token);
        {
            let mut state = self.state.write();
            state.user = Some(user);
            state.vision = Vision::Off;
        }
        info!(user = %user_id, "session established");
        self.events.emit(SessionEvent::LoggedIn { user_id });
        Ok(())
    }

    /// Forget the credential and profile.
    pub fn logout(&self) {
        self.credentials.clear();
        {
            let mut state = self.state.write();
            state.user = None;
            state.vision = Vision::Off;
        }
        info!("session closed");
        self.events.emit(SessionEvent::LoggedOut);
    }

    /// Switch the viewpoint override.
    pub fn set_vision(&self, vision: Vision) {
        {
            let mut state = self.state.write();
            state.vision = vision.clone();
            state.vision_version += 1;
        }
        info!(vision = ?vision.key(), "vision changed");
        self.events.emit(SessionEvent::VisionChanged { vision });
    }

    /// Current state of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        SessionSnapshot {
            user: state.user.clone(),
            vision: state.vision.clone(),
            vision_version: state.vision_version,
        }
    }

    /// Identity context of the current session.
    pub fn identity_context(&self) -> Option<IdentityContext> {
        self.snapshot().identity_context()
    }

    /// Stored bearer credential.
    pub fn token(&self) -> Option<String> {
        self.credentials.token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::events::InvalidationReason;

    fn session() -> Session {
        Session::new(
            Arc::new(MemoryCredentialStore::new()),
            SessionEvents::default(),
        )
    }

    #[test]
    fn login_and_logout_manage_credential() {
        let session = session();
        session
            .login("token-1", UserProfile::new("7", "alice", vec!["ADMIN".into()]))
            .unwrap();
        assert_eq!(session.token().as_deref(), Some("token-1"));
        assert_eq!(session.identity_context(), Some(IdentityContext::user("7")));
        assert_eq!(session.snapshot().roles(), &["ADMIN".to_string()]);

        session.logout();
        assert_eq!(session.token(), None);
        assert_eq!(session.identity_context(), None);
    }

    #[test]
    fn login_rejects_blank_input() {
        let session = session();
        assert_eq!(
            session.login(" ", UserProfile::new("7", "alice", vec![])),
            Err(SessionError::EmptyToken)
        );
        assert_eq!(
            session.login("t", UserProfile::new("", "alice", vec![])),
            Err(SessionError::MissingUserId)
        );
        assert_eq!(session.token(), None);
    }

    #[test]
    fn vision_changes_identity_context() {
        let session = session();
        session
            .login("t", UserProfile::new("7", "alice", vec![]))
            .unwrap();
        session.set_vision(Vision::user("12"));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.vision_version, 1);
        assert_eq!(
            snapshot.identity_context(),
            Some(IdentityContext::new("7", &Vision::user("12")))
        );
    }

    #[tokio::test]
    async fn invalidation_clears_credential_and_profile() {
        let session = session();
        let mut rx = session.events().subscribe();
        session
            .login("t", UserProfile::new("7", "alice", vec![]))
            .unwrap();
        session.events().emit(SessionEvent::Invalidated {
            reason: InvalidationReason::Unauthorized,
        });
        assert_eq!(session.token(), None);
        assert!(!session.snapshot().is_authenticated());

        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::LoggedIn {
                user_id: "7".into()
            }
        );
        assert!(matches!(
            rx.recv().await.unwrap(),
            SessionEvent::Invalidated { .. }
        ));
    }
}
