//! ---
//! dfbs_section: "01-core-functionality"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Tracing subscriber initialisation."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
//! Subscriber set-up for access gate processes.
//!
//! Console output goes to stderr: stdout is reserved for command results such as the
//! JSON guard report of `dfbs-accessctl check`. Every event is also appended to a daily
//! rolling JSON file, carrying the fields of the enclosing [`session_span`].
use anyhow::Result;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Filter override consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "DFBS_LOG";

/// Access gate crates at `info`, third-party HTTP plumbing at `warn`.
pub const DEFAULT_DIRECTIVES: &str =
    "warn,dfbs_access=info,dfbs_client=info,dfbs_session=info,dfbs_accessctl=info";

static GUARDS: OnceCell<(WorkerGuard, WorkerGuard)> = OnceCell::new();

/// Available log formats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Build the event filter from an explicit directive string.
///
/// `None` or an unparsable directive yields [`DEFAULT_DIRECTIVES`].
pub fn access_filter(directive: Option<&str>) -> EnvFilter {
    let Some(directive) = directive.map(str::trim).filter(|d| !d.is_empty()) else {
        return EnvFilter::new(DEFAULT_DIRECTIVES);
    };
    EnvFilter::try_new(directive).unwrap_or_else(|err| {
        eprintln!("ignoring log directive '{directive}' ({err}); using defaults");
        EnvFilter::new(DEFAULT_DIRECTIVES)
    })
}

fn filter_from_env() -> EnvFilter {
    let directive = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .ok();
    access_filter(directive.as_deref())
}

/// Span scoping the events of one signed-in identity.
///
/// `vision` is the `vision:<id>` key when a viewpoint override is active.
pub fn session_span(user: Option<&str>, vision: Option<&str>) -> Span {
    info_span!(
        "session",
        user = user.unwrap_or("anonymous"),
        vision = vision.unwrap_or("")
    )
}

/// Install the global subscriber for `service`.
///
/// The filter comes from `DFBS_LOG`, then `RUST_LOG`, then [`DEFAULT_DIRECTIVES`].
/// Installing twice is harmless; the first subscriber stays active.
pub fn init_tracing(service: &str, config: &LoggingConfig) -> Result<()> {
    std::fs::create_dir_all(&config.directory)?;
    let prefix = config.file_prefix.as_deref().unwrap_or(service);

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
    let (console_writer, console_guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = GUARDS.set((file_guard, console_guard));

    let console = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(console_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_target(false)
            .with_writer(console_writer)
            .boxed(),
    };
    let file = fmt::layer()
        .json()
        .with_current_span(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(file_writer);

    let installed = tracing_subscriber::registry()
        .with(filter_from_env())
        .with(console)
        .with(file)
        .try_init()
        .is_ok();

    info!(
        service,
        installed,
        log_dir = %config.directory.display(),
        format = ?config.format,
        "tracing initialised"
    );
    Ok(())
}
