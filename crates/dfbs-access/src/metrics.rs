//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Permission caching and access guard evaluation."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use prometheus::{IntCounter, Registry};
use std::sync::Arc;

/// Access metrics exported via Prometheus.
#[derive(Clone)]
pub struct AccessMetrics {
    registry: Arc<Registry>,
    cache_hits_total: IntCounter,
    cache_misses_total: IntCounter,
    fetch_failures_total: IntCounter,
    guard_denials_total: IntCounter,
    session_teardowns_total: IntCounter,
}

impl std::fmt::Debug for AccessMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessMetrics").finish_non_exhaustive()
    }
}

impl AccessMetrics {
    /// Register metrics with the provided registry.
    pub fn new(registry: Arc<Registry>) -> anyhow::Result<Self> {
        let cache_hits_total =
            IntCounter::new("access_cache_hits_total", "Permission lookups served from cache")?;
        let cache_misses_total = IntCounter::new(
            "access_cache_misses_total",
            "Permission lookups that required a backend fetch",
        )?;
        let fetch_failures_total = IntCounter::new(
            "access_fetch_failures_total",
            "Permission fetches that failed and resolved to deny",
        )?;
        let guard_denials_total =
            IntCounter::new("access_guard_denials_total", "Guard evaluations that denied access")?;
        let session_teardowns_total = IntCounter::new(
            "access_session_teardowns_total",
            "Cache teardowns triggered by session events",
        )?;

        registry.register(Box::new(cache_hits_total.clone()))?;
        registry.register(Box::new(cache_misses_total.clone()))?;
        registry.register(Box::new(fetch_failures_total.clone()))?;
        registry.register(Box::new(guard_denials_total.clone()))?;
        registry.register(Box::new(session_teardowns_total.clone()))?;

        Ok(Self {
            registry,
            cache_hits_total,
            cache_misses_total,
            fetch_failures_total,
            guard_denials_total,
            session_teardowns_total,
        })
    }

    /// Access the underlying registry.
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    /// Increment cache hits.
    pub fn inc_cache_hit(&self) {
        self.cache_hits_total.inc();
    }

    /// Increment cache misses.
    pub fn inc_cache_miss(&self) {
        self.cache_misses_total.inc();
    }

    /// Increment failed fetches.
    pub fn inc_fetch_failure(&self) {
        self.fetch_failures_total.inc();
    }

    /// Increment guard denials.
    pub fn inc_guard_denial(&self) {
        self.guard_denials_total.inc();
    }

    /// Increment session-driven teardowns.
    pub fn inc_session_teardown(&self) {
        self.session_teardowns_total.inc();
    }

    /// Current denial count.
    pub fn guard_denials(&self) -> u64 {
        self.guard_denials_total.get()
    }

    /// Current fetch failure count.
    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures_total.get()
    }
}
