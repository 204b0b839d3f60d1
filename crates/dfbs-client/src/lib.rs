//! ---
//! dfbs_section: "05-networking-external-interfaces"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Backend REST client and permission endpoints."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Thin client for the DFBS REST backend. Every response passes through the
//! [`SessionInterceptor`], which turns a `401` into a session invalidation event.

pub mod error;
pub mod http;
pub mod interceptor;
pub mod page;
pub mod permissions;

pub use error::ClientError;
pub use http::ApiClient;
pub use interceptor::SessionInterceptor;
pub use page::{PageRequest, SpringPage, TablePage};
pub use permissions::{AllowlistResponse, EffectiveKeysResponse, HttpPermissionsApi, PermissionsApi};
