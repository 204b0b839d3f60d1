//! ---
//! dfbs_section: "01-core-functionality"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Shared configuration model and loader."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::debug;
use url::Url;

use crate::logging::LogFormat;

fn default_base_url() -> String {
    "http://127.0.0.1:8080/api".to_owned()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_effective_keys_path() -> String {
    "/permissions/effective-keys".to_owned()
}

fn default_allowlist_path() -> String {
    "/allowlist/me".to_owned()
}

fn default_landing_route() -> String {
    "/dashboard".to_owned()
}

fn default_login_route() -> String {
    "/login".to_owned()
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_metrics_enabled() -> bool {
    true
}

/// Primary configuration object for the access gate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub access: AccessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "DFBS_CONFIG";

    /// Load configuration from disk, respecting the `DFBS_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path.to_path_buf(),
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.api.validate()?;
        self.access.validate()?;
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Backend endpoints consumed by the permission core.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub timeout: Duration,
    #[serde(default = "default_effective_keys_path")]
    pub effective_keys_path: String,
    #[serde(default = "default_allowlist_path")]
    pub allowlist_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout: default_timeout(),
            effective_keys_path: default_effective_keys_path(),
            allowlist_path: default_allowlist_path(),
        }
    }
}

impl ApiConfig {
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url)
            .with_context(|| format!("api base_url '{}' is not a valid url", self.base_url))?;
        if self.timeout.is_zero() {
            return Err(anyhow!("api timeout must be greater than zero"));
        }
        for (name, path) in [
            ("effective_keys_path", &self.effective_keys_path),
            ("allowlist_path", &self.allowlist_path),
        ] {
            if path.trim().is_empty() {
                return Err(anyhow!("api {} cannot be empty", name));
            }
        }
        Ok(())
    }
}

/// Routes used when a guard redirects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default = "default_landing_route")]
    pub landing_route: String,
    #[serde(default = "default_login_route")]
    pub login_route: String,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            landing_route: default_landing_route(),
            login_route: default_login_route(),
        }
    }
}

impl AccessConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, route) in [
            ("landing_route", &self.landing_route),
            ("login_route", &self.login_route),
        ] {
            if !route.starts_with('/') {
                return Err(anyhow!(
                    "access {} '{}' must be an absolute route",
                    name,
                    route
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.api.timeout, Duration::from_secs(30));
        assert_eq!(config.api.effective_keys_path, "/permissions/effective-keys");
        assert_eq!(config.api.allowlist_path, "/allowlist/me");
        assert_eq!(config.access.landing_route, "/dashboard");
        assert_eq!(config.access.login_route, "/login");
        assert!(config.metrics.enabled);
    }

    #[test]
    fn overrides_are_parsed() {
        let config: AppConfig = r#"
            [api]
            base_url = "https://dfbs.example.invalid/api"
            timeout = 5

            [access]
            landing_route = "/home"

            [logging]
            format = "pretty"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.api.base_url, "https://dfbs.example.invalid/api");
        assert_eq!(config.api.timeout, Duration::from_secs(5));
        assert_eq!(config.access.landing_route, "/home");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn relative_routes_are_rejected() {
        let err = "[access]\nlogin_route = \"login\"\n"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("login_route"));
    }

    #[test]
    fn invalid_base_url_and_zero_timeout_are_rejected() {
        assert!("[api]\nbase_url = \"not a url\"\n"
            .parse::<AppConfig>()
            .is_err());
        assert!("[api]\ntimeout = 0\n".parse::<AppConfig>().is_err());
        assert!("[api]\nallowlist_path = \"  \"\n"
            .parse::<AppConfig>()
            .is_err());
    }

    #[test]
    fn load_picks_first_existing_candidate() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let present = dir.path().join("gate.toml");
        fs::write(&present, "[access]\nlanding_route = \"/welcome\"\n").unwrap();

        let loaded = AppConfig::load_with_source(&[&missing, &present]).unwrap();
        assert_eq!(loaded.source, present);
        assert_eq!(loaded.config.access.landing_route, "/welcome");
    }

    #[test]
    fn load_reports_inspected_candidates() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        let err = AppConfig::load(&[&missing]).unwrap_err();
        assert!(err.to_string().contains("missing.toml"));
    }
}
