//! ---
//! dfbs_section: "05-networking-external-interfaces"
//! dfbs_subsection: "binary"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Control CLI evaluating DFBS permission guards."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use dfbs_access::{AccessControl, AccessMetrics, Capability, GuardRoutes};
use dfbs_client::{ApiClient, HttpPermissionsApi};
use dfbs_common::config::AppConfig;
use dfbs_common::session_span;
use dfbs_session::{MemoryCredentialStore, Session, SessionEvents, UserProfile, Vision};
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use tracing::Instrument;

#[derive(Debug, Args)]
pub struct CheckCommand {
    /// Requirement to evaluate: `perm:KEY`, `role:A,B` or `allowlist`.
    #[arg(long, value_name = "CAPABILITY")]
    capability: Capability,

    /// Id of the logged-in user.
    #[arg(long, value_name = "ID")]
    user: String,

    /// Bearer token sent to the backend.
    #[arg(long, env = "DFBS_TOKEN", hide_env_values = true)]
    token: String,

    /// Roles held by the user, comma separated.
    #[arg(long, value_delimiter = ',')]
    roles: Vec<String>,

    /// View the application as another user.
    #[arg(long, value_name = "ID")]
    vision: Option<String>,

    /// Route the guard protects.
    #[arg(long, default_value = "/")]
    path: String,

    /// Write logs through the configured daily log files.
    #[arg(long)]
    pub persist_logs: bool,

    /// Print Prometheus counters after the check.
    #[arg(long)]
    metrics: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport<'a> {
    capability: String,
    identity: Option<String>,
    #[serde(flatten)]
    state: &'a dfbs_access::GuardState,
}

impl CheckCommand {
    pub async fn execute(self, config: &AppConfig) -> Result<()> {
        let events = SessionEvents::default();
        let credentials = Arc::new(MemoryCredentialStore::new());
        let session = Session::new(credentials.clone(), events.clone());
        let client = ApiClient::new(&config.api, credentials, events.clone())
            .context("unable to build backend client")?;
        let api = Arc::new(HttpPermissionsApi::new(client, &config.api));

        let mut access = AccessControl::new(api, GuardRoutes::from(&config.access));
        if config.metrics.enabled {
            access = access.with_metrics(AccessMetrics::new(Arc::new(Registry::new()))?);
        }
        access.attach(&events);

        session
            .login(&self.token, UserProfile::new(self.user, "accessctl", self.roles))
            .context("unable to establish session")?;
        if let Some(target) = self.vision {
            session.set_vision(Vision::user(target));
        }

        let identity = session.identity_context();
        let span = session_span(
            identity.as_ref().map(|ctx| ctx.user_id()),
            identity.as_ref().and_then(|ctx| ctx.vision_key()).as_deref(),
        );
        let guard = access.guard(self.capability);
        let snapshot = session.snapshot();
        let state = guard.resolve(&snapshot, &self.path).instrument(span).await;
        let report = CheckReport {
            capability: guard.capability().to_string(),
            identity: identity.map(|ctx| ctx.to_string()),
            state: &state,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);

        if self.metrics {
            let Some(metrics) = access.resolver().metrics() else {
                anyhow::bail!("--metrics requires metrics.enabled in the configuration");
            };
            let mut buffer = Vec::new();
            TextEncoder::new().encode(&metrics.registry().gather(), &mut buffer)?;
            print!("{}", String::from_utf8(buffer)?);
        }
        Ok(())
    }
}
