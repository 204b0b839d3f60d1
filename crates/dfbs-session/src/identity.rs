//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Session state, identity context and session events."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for a user account.
pub type UserId = String;

const VISION_KEY_PREFIX: &str = "vision:";

/// Viewpoint override letting an administrator browse with another user's permissions.
///
/// Serialised the way the backend reports it: `{"mode":"OFF"}` or
/// `{"mode":"USER","userId":"12"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "UPPERCASE")]
pub enum Vision {
    /// Permissions of the logged-in user apply.
    #[default]
    Off,
    /// Permissions of `user_id` apply to menus and guards.
    User {
        /// User whose permissions are being viewed.
        #[serde(rename = "userId")]
        user_id: UserId,
    },
}

impl Vision {
    /// Construct a vision override for the given user.
    pub fn user(user_id: impl Into<UserId>) -> Self {
        Vision::User {
            user_id: user_id.into(),
        }
    }

    /// User whose permissions are viewed, if an override is active.
    pub fn target(&self) -> Option<&str> {
        match self {
            Vision::Off => None,
            Vision::User { user_id } => Some(user_id.as_str()),
        }
    }

    /// Cache key dimension for the override (`vision:<id>`).
    pub fn key(&self) -> Option<String> {
        self.target().map(|id| format!("{VISION_KEY_PREFIX}{id}"))
    }
}

/// The (user, optional viewpoint override) pair permission data is cached against.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityContext {
    user_id: UserId,
    vision: Option<UserId>,
}

impl IdentityContext {
    /// Build a context for `user_id` under the supplied vision state.
    pub fn new(user_id: impl Into<UserId>, vision: &Vision) -> Self {
        Self {
            user_id: user_id.into(),
            vision: vision.target().map(str::to_owned),
        }
    }

    /// Context without any viewpoint override.
    pub fn user(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, &Vision::Off)
    }

    /// Logged-in user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// User whose permissions are viewed through the override.
    pub fn vision_target(&self) -> Option<&str> {
        self.vision.as_deref()
    }

    /// Secondary key dimension (`vision:<id>`).
    pub fn vision_key(&self) -> Option<String> {
        self.vision
            .as_ref()
            .map(|id| format!("{VISION_KEY_PREFIX}{id}"))
    }
}

impl fmt::Display for IdentityContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.vision {
            Some(target) => write!(f, "{}@{}{}", self.user_id, VISION_KEY_PREFIX, target),
            None => f.write_str(&self.user_id),
        }
    }
}

/// User details returned by the login endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Stable identifier.
    pub id: UserId,
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Role names exactly as the backend reports them.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Permission keys reported at login; informational only, guards use effective keys.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl UserProfile {
    /// Short helper for constructing a profile.
    pub fn new(id: impl Into<UserId>, username: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            roles,
            permissions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vision_dimension_distinguishes_contexts() {
        let plain = IdentityContext::user("7");
        let viewed = IdentityContext::new("7", &Vision::user("12"));
        assert_ne!(plain, viewed);
        assert_eq!(viewed.vision_key().as_deref(), Some("vision:12"));
        assert_eq!(plain.vision_key(), None);
        assert_eq!(viewed.to_string(), "7@vision:12");
        assert_eq!(plain.to_string(), "7");
    }

    #[test]
    fn vision_uses_backend_wire_shape() {
        let off: Vision = serde_json::from_str(r#"{"mode":"OFF"}"#).unwrap();
        assert_eq!(off, Vision::Off);
        let user: Vision = serde_json::from_str(r#"{"mode":"USER","userId":"12"}"#).unwrap();
        assert_eq!(user, Vision::user("12"));
        assert_eq!(user.key().as_deref(), Some("vision:12"));
    }

    #[test]
    fn profile_tolerates_missing_lists() {
        let profile: UserProfile = serde_json::from_str(r#"{"id":"7"}"#).unwrap();
        assert_eq!(profile.id, "7");
        assert!(profile.roles.is_empty());
        assert!(profile.permissions.is_empty());
    }
}
