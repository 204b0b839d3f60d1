//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Permission caching and access guard evaluation."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Client-side permission gating for DFBS views.
//!
//! [`AccessControl`] wires a [`PermissionResolver`] to the session event bus and hands
//! out [`AccessGuard`]s that share its caches.

pub mod cache;
pub mod capability;
pub mod error;
pub mod guard;
pub mod metrics;
pub mod mount;
pub mod resolver;
pub mod teardown;

use std::sync::Arc;

use dfbs_client::PermissionsApi;
use dfbs_session::{SessionEvents, SessionSnapshot};

pub use cache::{AllowFlagCache, FetchTicket, PermissionCache, PermissionSet, SnapshotCache};
pub use capability::{Capability, ADMIN_ROLE, SUPER_ADMIN_ROLE};
pub use error::AccessError;
pub use guard::{AccessGuard, DenyReason, GuardRoutes, GuardState, Redirect};
pub use metrics::AccessMetrics;
pub use mount::MountedGuard;
pub use resolver::PermissionResolver;
pub use teardown::CacheTeardown;

/// Shared permission state for one signed-in client.
#[derive(Debug, Clone)]
pub struct AccessControl {
    resolver: PermissionResolver,
    routes: GuardRoutes,
}

impl AccessControl {
    /// Create access control over `api` with empty caches.
    pub fn new(api: Arc<dyn PermissionsApi>, routes: GuardRoutes) -> Self {
        Self {
            resolver: PermissionResolver::new(api),
            routes,
        }
    }

    /// Attach Prometheus counters.
    pub fn with_metrics(mut self, metrics: AccessMetrics) -> Self {
        self.resolver = self.resolver.with_metrics(metrics);
        self
    }

    /// Clear the caches on every session change published on `events`.
    pub fn attach(&self, events: &SessionEvents) {
        events.register(Arc::new(CacheTeardown::new(
            self.resolver.permissions().clone(),
            self.resolver.allow_flags().clone(),
            self.resolver.metrics().cloned(),
        )));
    }

    /// Guard for `capability` backed by the shared caches.
    pub fn guard(&self, capability: Capability) -> Arc<AccessGuard> {
        Arc::new(AccessGuard::new(
            capability,
            self.resolver.clone(),
            self.routes.clone(),
        ))
    }

    /// One-shot synchronous evaluation.
    pub fn evaluate(
        &self,
        capability: Capability,
        session: &SessionSnapshot,
        path: &str,
    ) -> GuardState {
        AccessGuard::new(capability, self.resolver.clone(), self.routes.clone())
            .evaluate(session, path)
    }

    /// Clear both caches.
    pub fn invalidate_all(&self) {
        self.resolver.invalidate_all();
    }

    /// Resolver shared by all guards.
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::tests::ScriptedApi;
    use dfbs_session::{
        InvalidationReason, MemoryCredentialStore, Session, SessionEvent, UserProfile, Vision,
    };

    fn wired(api: Arc<ScriptedApi>) -> (AccessControl, Session) {
        let events = SessionEvents::default();
        let session = Session::new(Arc::new(MemoryCredentialStore::new()), events.clone());
        let access = AccessControl::new(api, GuardRoutes::default());
        access.attach(&events);
        (access, session)
    }

    #[tokio::test]
    async fn guards_share_one_cache() {
        let api = ScriptedApi::granting(&["work_order:VIEW"]);
        let (access, session) = wired(api.clone());
        session
            .login("good", UserProfile::new("7", "alice", vec![]))
            .unwrap();
        let snapshot = session.snapshot();

        let view = access.guard(Capability::permission("work_order:VIEW"));
        assert_eq!(view.resolve(&snapshot, "/wo").await, GuardState::Allowed);
        let edit = access.evaluate(Capability::permission("billing:EDIT"), &snapshot, "/billing");
        assert_eq!(edit.redirect().unwrap().reason, DenyReason::Forbidden);
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test]
    async fn session_events_clear_caches() {
        let api = ScriptedApi::granting(&["work_order:VIEW"]);
        let (access, session) = wired(api);
        session
            .login("good", UserProfile::new("7", "alice", vec![]))
            .unwrap();
        let context = session.identity_context().unwrap();
        access.resolver().effective_keys(&context).await.unwrap();
        access.resolver().allow_flag("7").await.unwrap();

        session.set_vision(Vision::user("12"));
        assert!(access.resolver().permissions().is_empty());
        assert!(!access.resolver().allow_flags().is_empty());

        session.events().emit(SessionEvent::Invalidated {
            reason: InvalidationReason::Unauthorized,
        });
        assert!(access.resolver().allow_flags().is_empty());
        assert_eq!(session.token(), None);
        assert!(!session.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn cleared_after_data_returns_to_loading() {
        let (access, session) = wired(ScriptedApi::granting(&["work_order:VIEW"]));
        session
            .login("good", UserProfile::new("7", "alice", vec![]))
            .unwrap();
        let guard = access.guard(Capability::permission("work_order:VIEW"));
        let snapshot = session.snapshot();
        assert_eq!(guard.resolve(&snapshot, "/wo").await, GuardState::Allowed);

        access.invalidate_all();
        assert_eq!(guard.evaluate(&snapshot, "/wo"), GuardState::Loading);
    }

    #[test]
    fn denials_are_counted() {
        let registry = Arc::new(prometheus::Registry::new());
        let metrics = AccessMetrics::new(registry).unwrap();
        let access = AccessControl::new(ScriptedApi::granting(&[]), GuardRoutes::default())
            .with_metrics(metrics.clone());
        access.evaluate(
            Capability::permission("work_order:VIEW"),
            &SessionSnapshot::anonymous(),
            "/wo",
        );
        assert_eq!(metrics.guard_denials(), 1);
    }
}
