//! ---
//! dfbs_section: "05-networking-external-interfaces"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Backend REST client and permission endpoints."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use thiserror::Error;

/// Errors returned by [`crate::ApiClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// Base URL or request path did not form a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    /// The backend rejected the credential. The session has already been invalidated.
    #[error("request unauthorized")]
    Unauthorized,
    /// Any other non-success status.
    #[error("unexpected status {status} from {path}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request path.
        path: String,
    },
    /// Connection, timeout or protocol failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Body could not be decoded into the expected shape.
    #[error("malformed response body: {0}")]
    Decode(String),
}

impl ClientError {
    /// Whether this error represents an authentication rejection.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}
