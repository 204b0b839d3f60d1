//! ---
//! dfbs_section: "03-logging"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Structured logging context and access event helpers."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
#![warn(missing_docs)]

use tracing::Level;
use tracing_subscriber::{fmt as subscriber_fmt, prelude::*, EnvFilter, Registry};

pub mod macros;

/// Initialize a baseline tracing subscriber suitable for development and tests.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(subscriber_fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Structured logging context propagated by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Logged-in user the event relates to.
    pub user: Option<&'a str>,
    /// Vision key when a viewpoint override is active.
    pub vision: Option<&'a str>,
    /// Route the user attempted to reach.
    pub route: Option<&'a str>,
    /// Capability under evaluation.
    pub capability: Option<&'a str>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a user identifier.
    pub fn with_user(mut self, user: &'a str) -> Self {
        self.user = Some(user);
        self
    }

    /// Attach a vision key.
    pub fn with_vision(mut self, vision: &'a str) -> Self {
        self.vision = Some(vision);
        self
    }

    /// Attach the attempted route.
    pub fn with_route(mut self, route: &'a str) -> Self {
        self.route = Some(route);
        self
    }

    /// Attach the capability being checked.
    pub fn with_capability(mut self, capability: &'a str) -> Self {
        self.capability = Some(capability);
        self
    }
}

/// Outcome recorded when emitting access decision events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOutcome {
    /// Protected content may render.
    Allowed,
    /// The guard redirected away from the protected content.
    Denied,
    /// Evaluation is waiting on permission data.
    Pending,
}

impl AccessOutcome {
    /// Stable lowercase label used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessOutcome::Allowed => "allowed",
            AccessOutcome::Denied => "denied",
            AccessOutcome::Pending => "pending",
        }
    }
}

/// Emit a standardized access event. Denials are logged at `WARN`, grants at `INFO`
/// and pending evaluations at `DEBUG`.
pub fn log_access_event(
    context: Option<&LogContext>,
    event: &str,
    message: &str,
    outcome: AccessOutcome,
) {
    let ctx = context.cloned().unwrap_or_default();
    macro_rules! emit {
        ($level:expr) => {
            tracing::event!(
                $level,
                event,
                outcome = outcome.as_str(),
                user = ctx.user.unwrap_or(""),
                vision = ctx.vision.unwrap_or(""),
                route = ctx.route.unwrap_or(""),
                capability = ctx.capability.unwrap_or(""),
                message = %message
            )
        };
    }
    match outcome {
        AccessOutcome::Allowed => emit!(Level::INFO),
        AccessOutcome::Denied => emit!(Level::WARN),
        AccessOutcome::Pending => emit!(Level::DEBUG),
    }
}
