//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Permission caching and access guard evaluation."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use std::sync::Arc;

use dfbs_client::{ClientError, PermissionsApi};
use dfbs_logging::{gate_debug, gate_warn, LogContext};
use dfbs_session::IdentityContext;
use tracing::info;

use crate::cache::{AllowFlagCache, PermissionCache, PermissionSet};
use crate::error::AccessError;
use crate::metrics::AccessMetrics;

/// Fetches permission data on cache misses and stores the result.
///
/// Failures other than `401` resolve to an empty set or `false` and are cached like a
/// successful answer, so a guard never stays in `Loading` because the backend is down.
#[derive(Clone)]
pub struct PermissionResolver {
    api: Arc<dyn PermissionsApi>,
    permissions: PermissionCache,
    allow_flags: AllowFlagCache,
    metrics: Option<AccessMetrics>,
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver")
            .field("permissions", &self.permissions)
            .field("allow_flags", &self.allow_flags)
            .finish()
    }
}

impl PermissionResolver {
    /// Create a resolver with fresh, empty caches.
    pub fn new(api: Arc<dyn PermissionsApi>) -> Self {
        Self::with_caches(api, PermissionCache::new(), AllowFlagCache::new())
    }

    /// Create a resolver over existing caches.
    pub fn with_caches(
        api: Arc<dyn PermissionsApi>,
        permissions: PermissionCache,
        allow_flags: AllowFlagCache,
    ) -> Self {
        Self {
            api,
            permissions,
            allow_flags,
            metrics: None,
        }
    }

    /// Attach Prometheus counters.
    pub fn with_metrics(mut self, metrics: AccessMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Effective-permission cache.
    pub fn permissions(&self) -> &PermissionCache {
        &self.permissions
    }

    /// Allow-flag cache.
    pub fn allow_flags(&self) -> &AllowFlagCache {
        &self.allow_flags
    }

    /// Attached metrics, if any.
    pub fn metrics(&self) -> Option<&AccessMetrics> {
        self.metrics.as_ref()
    }

    /// Effective permissions for `context`, fetching on a miss.
    pub async fn effective_keys(
        &self,
        context: &IdentityContext,
    ) -> Result<PermissionSet, AccessError> {
        if let Some(keys) = self.permissions.get(context) {
            self.record_hit();
            return Ok(keys);
        }
        self.record_miss();

        let ticket = self.permissions.begin_fetch(context.clone());
        let user = context.to_string();
        let ctx = LogContext::new().with_user(&user);
        let keys = match self.api.effective_keys(context).await {
            Ok(keys) => keys.into_iter().collect::<PermissionSet>(),
            Err(ClientError::Unauthorized) => return Err(AccessError::Unauthorized),
            Err(err) => {
                self.record_failure();
                gate_warn!(context = ctx, "effective key fetch failed; denying: {}", err);
                PermissionSet::new()
            }
        };

        if self.permissions.complete(ticket, keys.clone()) {
            info!(context = %context, keys = keys.len(), "effective permissions cached");
            return Ok(keys);
        }
        gate_debug!(context = ctx, "effective key fetch superseded");
        self.permissions
            .get(context)
            .ok_or(AccessError::Superseded)
    }

    /// Allowlist membership of `user_id`, fetching on a miss.
    pub async fn allow_flag(&self, user_id: &str) -> Result<bool, AccessError> {
        let key = user_id.to_owned();
        if let Some(allowed) = self.allow_flags.get(&key) {
            self.record_hit();
            return Ok(allowed);
        }
        self.record_miss();

        let ticket = self.allow_flags.begin_fetch(key.clone());
        let ctx = LogContext::new().with_user(user_id);
        let allowed = match self.api.allowlisted().await {
            Ok(allowed) => allowed,
            Err(ClientError::Unauthorized) => return Err(AccessError::Unauthorized),
            Err(err) => {
                self.record_failure();
                gate_warn!(context = ctx, "allowlist fetch failed; denying: {}", err);
                false
            }
        };

        if self.allow_flags.complete(ticket, allowed) {
            info!(user = user_id, allowed, "allowlist flag cached");
            return Ok(allowed);
        }
        gate_debug!(context = ctx, "allowlist fetch superseded");
        self.allow_flags.get(&key).ok_or(AccessError::Superseded)
    }

    /// Clear both caches.
    pub fn invalidate_all(&self) {
        self.permissions.clear();
        self.allow_flags.clear();
        info!("permission caches invalidated");
    }

    fn record_hit(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_cache_hit();
        }
    }

    fn record_miss(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_cache_miss();
        }
    }

    fn record_failure(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_fetch_failure();
        }
    }
}
