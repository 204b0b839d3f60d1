//! ---
//! dfbs_section: "05-networking-external-interfaces"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Backend REST client and permission endpoints."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use std::sync::Arc;

use dfbs_common::config::ApiConfig;
use dfbs_session::{CredentialStore, SessionEvents};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::ClientError;
use crate::interceptor::SessionInterceptor;
use crate::page::{PageRequest, SpringPage, TablePage};

/// Authenticated JSON client for the backend REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<dyn CredentialStore>,
    interceptor: SessionInterceptor,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ApiClient {
    /// Build a client from configuration. The bearer token is read from `credentials` on
    /// every request; `401` responses are published on `events`.
    pub fn new(
        config: &ApiConfig,
        credentials: Arc<dyn CredentialStore>,
        events: SessionEvents,
    ) -> Result<Self, ClientError> {
        Url::parse(&config.base_url).map_err(|err| {
            ClientError::InvalidUrl(format!("{} ({})", config.base_url, err))
        })?;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            credentials,
            interceptor: SessionInterceptor::new(events),
        })
    }

    /// Resolve a path relative to the base URL, keeping any base path prefix such as `/api`.
    pub fn url(&self, path: &str) -> Result<Url, ClientError> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };
        Url::parse(&joined).map_err(|err| ClientError::InvalidUrl(format!("{joined} ({err})")))
    }

    /// Issue a `GET` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let url = self.url(path)?;
        let mut request = self.http.get(url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = self.credentials.token() {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        self.interceptor.inspect(path, response.status())?;
        let body = response.bytes().await?;
        debug!(path, bytes = body.len(), "response received");
        serde_json::from_slice(&body).map_err(|err| ClientError::Decode(err.to_string()))
    }

    /// Fetch one page of a paginated listing and adapt it for table rendering.
    ///
    /// An empty or `null` body yields an empty page rather than an error.
    pub async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        page: PageRequest,
        filters: &[(&str, String)],
    ) -> Result<TablePage<T>, ClientError> {
        let mut query = page.to_query();
        query.extend(filters.iter().cloned());
        let body: Option<SpringPage<T>> = match self.get_json(path, &query).await {
            Ok(body) => body,
            Err(ClientError::Decode(reason)) => {
                debug!(path, %reason, "page body unreadable; treating as empty");
                None
            }
            Err(err) => return Err(err),
        };
        Ok(body
            .unwrap_or_else(|| SpringPage::empty(page.size))
            .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dfbs_session::MemoryCredentialStore;

    fn client(base: &str) -> ApiClient {
        let config = ApiConfig {
            base_url: base.into(),
            ..ApiConfig::default()
        };
        ApiClient::new(
            &config,
            Arc::new(MemoryCredentialStore::new()),
            SessionEvents::default(),
        )
        .unwrap()
    }

    #[test]
    fn url_keeps_base_prefix() {
        let client = client("http://localhost:8080/api/");
        assert_eq!(
            client.url("/permissions/effective-keys").unwrap().as_str(),
            "http://localhost:8080/api/permissions/effective-keys"
        );
        assert_eq!(
            client.url("allowlist/me").unwrap().as_str(),
            "http://localhost:8080/api/allowlist/me"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let config = ApiConfig {
            base_url: "::nope::".into(),
            ..ApiConfig::default()
        };
        let result = ApiClient::new(
            &config,
            Arc::new(MemoryCredentialStore::new()),
            SessionEvents::default(),
        );
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }
}
