//! ---
//! dfbs_section: "05-networking-external-interfaces"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Backend REST client and permission endpoints."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use async_trait::async_trait;
use dfbs_common::config::ApiConfig;
use dfbs_session::IdentityContext;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::http::ApiClient;

/// Body of the effective-keys endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveKeysResponse {
    /// Effective permission keys; absent means none.
    #[serde(default)]
    pub effective_keys: Option<Vec<String>>,
}

/// Body of the allowlist endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowlistResponse {
    /// Allowlist membership; absent means not allowed.
    #[serde(default)]
    pub allowed: Option<bool>,
}

/// Backend endpoints the permission core depends on.
#[async_trait]
pub trait PermissionsApi: Send + Sync + 'static {
    /// Effective permission keys for the context. With a vision override the keys of the
    /// viewed user are returned.
    async fn effective_keys(&self, context: &IdentityContext) -> Result<Vec<String>, ClientError>;

    /// Whether the logged-in user is on the super-admin allowlist.
    async fn allowlisted(&self) -> Result<bool, ClientError>;
}

/// [`PermissionsApi`] backed by the REST backend.
#[derive(Debug, Clone)]
pub struct HttpPermissionsApi {
    client: ApiClient,
    effective_keys_path: String,
    allowlist_path: String,
}

impl HttpPermissionsApi {
    /// Bind the endpoints configured in `config` to `client`.
    pub fn new(client: ApiClient, config: &ApiConfig) -> Self {
        Self {
            client,
            effective_keys_path: config.effective_keys_path.clone(),
            allowlist_path: config.allowlist_path.clone(),
        }
    }
}

#[async_trait]
impl PermissionsApi for HttpPermissionsApi {
    async fn effective_keys(&self, context: &IdentityContext) -> Result<Vec<String>, ClientError> {
        let query = context
            .vision_target()
            .map(|target| vec![("as", target.to_owned())])
            .unwrap_or_default();
        let body: Option<EffectiveKeysResponse> = self
            .client
            .get_json(&self.effective_keys_path, &query)
            .await?;
        Ok(body
            .and_then(|body| body.effective_keys)
            .unwrap_or_default())
    }

    async fn allowlisted(&self) -> Result<bool, ClientError> {
        let body: Option<AllowlistResponse> =
            self.client.get_json(&self.allowlist_path, &[]).await?;
        Ok(body.and_then(|body| body.allowed).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use dfbs_session::{CredentialStore, MemoryCredentialStore, SessionEvents, Vision};
    use serde_json::json;
    use tokio::net::TcpListener;

    async fn effective_keys(
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> axum::response::Response {
        let authorised = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            == Some("Bearer good");
        if !authorised {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        match params.get("as").map(String::as_str) {
            Some("12") => Json(json!({ "effectiveKeys": ["billing:EDIT"] })).into_response(),
            Some(_) => Json(json!({})).into_response(),
            None => Json(json!({ "effectiveKeys": ["work_order:VIEW"] })).into_response(),
        }
    }

    async fn spawn_backend() -> SocketAddr {
        let router = Router::new()
            .route("/api/permissions/effective-keys", get(effective_keys))
            .route(
                "/api/allowlist/me",
                get(|| async { Json(json!({ "allowed": true })) }),
            );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn api(addr: SocketAddr, token: Option<&str>) -> HttpPermissionsApi {
        let config = ApiConfig {
            base_url: format!("http://{addr}/api"),
            ..ApiConfig::default()
        };
        let credentials = Arc::new(MemoryCredentialStore::new());
        if let Some(token) = token {
            credentials.set_token(token);
        }
        let client = ApiClient::new(&config, credentials, SessionEvents::default()).unwrap();
        HttpPermissionsApi::new(client, &config)
    }

    #[tokio::test]
    async fn fetches_keys_for_plain_and_vision_contexts() {
        let addr = spawn_backend().await;
        let api = api(addr, Some("good"));

        let keys = api
            .effective_keys(&IdentityContext::user("7"))
            .await
            .unwrap();
        assert_eq!(keys, vec!["work_order:VIEW".to_string()]);

        let viewed = api
            .effective_keys(&IdentityContext::new("7", &Vision::user("12")))
            .await
            .unwrap();
        assert_eq!(viewed, vec!["billing:EDIT".to_string()]);

        let absent = api
            .effective_keys(&IdentityContext::new("7", &Vision::user("99")))
            .await
            .unwrap();
        assert!(absent.is_empty());

        assert!(api.allowlisted().await.unwrap());
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let addr = spawn_backend().await;
        let api = api(addr, None);
        let err = api
            .effective_keys(&IdentityContext::user("7"))
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }
}
