//! ---
//! dfbs_section: "01-core-functionality"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Shared primitives for the access gate."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
//! Shared primitives for the DFBS access gate workspace.
//! This crate exposes configuration loading and tracing initialisation
//! consumed by the CLI and the integration suites.

pub mod config;
pub mod logging;

pub use config::{
    AccessConfig, ApiConfig, AppConfig, LoadedAppConfig, LoggingConfig, MetricsConfig,
};
pub use logging::{access_filter, init_tracing, session_span, LogFormat};
