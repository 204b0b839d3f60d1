//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Permission caching and access guard evaluation."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::PermissionSet;
use crate::error::AccessError;

/// Role held by administrators.
pub const ADMIN_ROLE: &str = "ADMIN";
/// Role held by super administrators.
pub const SUPER_ADMIN_ROLE: &str = "SUPER_ADMIN";

/// Requirement a guard enforces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Capability {
    /// Any of the listed roles.
    RoleMembership(Vec<String>),
    /// A single effective permission key.
    PermissionKey(String),
    /// Membership in the super-admin allowlist.
    AllowlistFlag,
}

impl Capability {
    /// Require any of `roles`.
    pub fn any_role<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Capability::RoleMembership(roles.into_iter().map(Into::into).collect())
    }

    /// Require `ADMIN` or `SUPER_ADMIN`.
    pub fn admin_or_super_admin() -> Self {
        Self::any_role([ADMIN_ROLE, SUPER_ADMIN_ROLE])
    }

    /// Require the effective permission `key`.
    pub fn permission(key: impl Into<String>) -> Self {
        Capability::PermissionKey(key.into())
    }

    /// Require allowlist membership.
    pub fn allowlist() -> Self {
        Capability::AllowlistFlag
    }

    /// A blank key or a role list without a usable entry can never be satisfied.
    pub fn is_misconfigured(&self) -> bool {
        match self {
            Capability::RoleMembership(roles) => {
                roles.iter().all(|role| role.trim().is_empty())
            }
            Capability::PermissionKey(key) => key.trim().is_empty(),
            Capability::AllowlistFlag => false,
        }
    }

    /// Role check against the client-held role list; roles compare exactly after trimming.
    pub fn matches_roles(&self, held: &[String]) -> bool {
        let Capability::RoleMembership(required) = self else {
            return false;
        };
        required
            .iter()
            .map(|role| role.trim())
            .filter(|role| !role.is_empty())
            .any(|role| held.iter().any(|h| h.trim() == role))
    }

    /// Permission check against fetched effective keys.
    pub fn matches_keys(&self, keys: &PermissionSet) -> bool {
        match self {
            Capability::PermissionKey(key) => keys.contains(key),
            _ => false,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::RoleMembership(roles) => write!(f, "role:{}", roles.join(",")),
            Capability::PermissionKey(key) => write!(f, "perm:{}", key.trim()),
            Capability::AllowlistFlag => f.write_str("allowlist"),
        }
    }
}

impl FromStr for Capability {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("allowlist") {
            return Ok(Capability::AllowlistFlag);
        }
        if let Some(key) = s.strip_prefix("perm:") {
            return Ok(Capability::permission(key.trim()));
        }
        if let Some(roles) = s.strip_prefix("role:") {
            return Ok(Capability::any_role(
                roles
                    .split(',')
                    .map(str::trim)
                    .filter(|role| !role.is_empty()),
            ));
        }
        Err(AccessError::InvalidCapability(s.to_owned()))
    }
}
