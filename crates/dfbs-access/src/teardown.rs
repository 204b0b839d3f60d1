//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Permission caching and access guard evaluation."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use dfbs_session::{SessionEvent, SessionListener};
use tracing::info;

use crate::cache::{AllowFlagCache, PermissionCache};
use crate::metrics::AccessMetrics;

/// Clears cached permission data when the session changes.
///
/// Login, logout and backend rejection clear both caches. A vision switch only clears
/// effective permissions: the allow-flag belongs to the real user.
pub struct CacheTeardown {
    permissions: PermissionCache,
    allow_flags: AllowFlagCache,
    metrics: Option<AccessMetrics>,
}

impl CacheTeardown {
    /// Tear down the given caches.
    pub fn new(
        permissions: PermissionCache,
        allow_flags: AllowFlagCache,
        metrics: Option<AccessMetrics>,
    ) -> Self {
        Self {
            permissions,
            allow_flags,
            metrics,
        }
    }
}

impl SessionListener for CacheTeardown {
    fn on_event(&self, event: &SessionEvent) {
        let scope = match event {
            SessionEvent::VisionChanged { .. } => {
                self.permissions.clear();
                "permissions"
            }
            SessionEvent::LoggedIn { .. }
            | SessionEvent::LoggedOut
            | SessionEvent::Invalidated { .. } => {
                self.permissions.clear();
                self.allow_flags.clear();
                "all"
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.inc_session_teardown();
        }
        info!(?event, scope, "permission caches cleared");
    }
}
