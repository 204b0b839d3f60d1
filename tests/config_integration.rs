//! ---
//! dfbs_section: "15-testing-qa-runbook"
//! dfbs_subsection: "integration-tests"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Configuration driven guard wiring."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use dfbs_access::{AccessControl, Capability, DenyReason, GuardRoutes};
use dfbs_client::{ApiClient, HttpPermissionsApi};
use dfbs_common::config::AppConfig;
use dfbs_session::{MemoryCredentialStore, Session, SessionEvents, SessionSnapshot, UserProfile};
use tempfile::tempdir;

#[test]
fn configured_routes_drive_redirects() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dfbs.toml");
    fs::write(
        &path,
        r#"
[api]
base_url = "http://127.0.0.1:9/api"
timeout = 2

[access]
landing_route = "/home"
login_route = "/auth/sign-in"

[metrics]
enabled = false
"#,
    )
    .unwrap();

    let config = AppConfig::load(&[&path]).unwrap();
    assert_eq!(config.api.timeout, Duration::from_secs(2));
    assert!(!config.metrics.enabled);

    let events = SessionEvents::default();
    let credentials = Arc::new(MemoryCredentialStore::new());
    let session = Session::new(credentials.clone(), events.clone());
    let client = ApiClient::new(&config.api, credentials, events.clone()).unwrap();
    let api = Arc::new(HttpPermissionsApi::new(client, &config.api));
    let access = AccessControl::new(api, GuardRoutes::from(&config.access));
    access.attach(&events);

    let anonymous = access.evaluate(
        Capability::admin_or_super_admin(),
        &SessionSnapshot::anonymous(),
        "/admin",
    );
    assert_eq!(anonymous.redirect().unwrap().to, "/auth/sign-in");

    session
        .login("token", UserProfile::new("7", "bob", vec!["OPERATOR".into()]))
        .unwrap();
    let forbidden = access.evaluate(
        Capability::admin_or_super_admin(),
        &session.snapshot(),
        "/admin",
    );
    let redirect = forbidden.redirect().unwrap();
    assert_eq!(redirect.to, "/home");
    assert_eq!(redirect.from, "/admin");
    assert_eq!(redirect.reason, DenyReason::Forbidden);
}

#[test]
fn rendered_config_parses_back() {
    let config = AppConfig::default();
    let rendered = toml::to_string_pretty(&config).unwrap();
    let parsed: AppConfig = rendered.parse().unwrap();
    assert_eq!(parsed.api.base_url, config.api.base_url);
    assert_eq!(parsed.access.login_route, "/login");
}
