//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Permission caching and access guard evaluation."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use dfbs_common::config::AccessConfig;
use dfbs_logging::{gate_warn, log_access_event, AccessOutcome, LogContext};
use dfbs_session::SessionSnapshot;
use serde::{Deserialize, Serialize};

use crate::capability::Capability;
use crate::error::AccessError;
use crate::resolver::PermissionResolver;

/// Why a guard redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DenyReason {
    /// Logged in but lacking the capability.
    Forbidden,
    /// No session, or the backend rejected it.
    Unauthenticated,
}

/// Redirect emitted by a denying guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    /// Destination route.
    pub to: String,
    /// Route the user attempted to open.
    pub from: String,
    /// Reason code for the destination page.
    pub reason: DenyReason,
}

/// Render outcome of a guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum GuardState {
    /// Waiting for permission data; render a neutral placeholder.
    Loading,
    /// Render the protected content.
    Allowed,
    /// Navigate away.
    Denied(Redirect),
}

impl GuardState {
    /// Whether the guard is still waiting.
    pub fn is_loading(&self) -> bool {
        matches!(self, GuardState::Loading)
    }

    /// Whether the protected content may render.
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardState::Allowed)
    }

    /// Redirect of a denied guard.
    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            GuardState::Denied(redirect) => Some(redirect),
            _ => None,
        }
    }

    fn outcome(&self) -> AccessOutcome {
        match self {
            GuardState::Loading => AccessOutcome::Pending,
            GuardState::Allowed => AccessOutcome::Allowed,
            GuardState::Denied(_) => AccessOutcome::Denied,
        }
    }
}

/// Routes a guard redirects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardRoutes {
    /// Destination for forbidden access.
    pub landing: String,
    /// Destination when there is no valid session.
    pub login: String,
}

impl Default for GuardRoutes {
    fn default() -> Self {
        Self::from(&AccessConfig::default())
    }
}

impl From<&AccessConfig> for GuardRoutes {
    fn from(config: &AccessConfig) -> Self {
        Self {
            landing: config.landing_route.clone(),
            login: config.login_route.clone(),
        }
    }
}

/// Policy evaluator deciding whether a protected view renders.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    capability: Capability,
    resolver: PermissionResolver,
    routes: GuardRoutes,
}

impl AccessGuard {
    /// Guard `capability` using `resolver` for permission data.
    pub fn new(capability: Capability, resolver: PermissionResolver, routes: GuardRoutes) -> Self {
        Self {
            capability,
            resolver,
            routes,
        }
    }

    /// The enforced requirement.
    pub fn capability(&self) -> &Capability {
        &self.capability
    }

    /// Resolver backing the guard.
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Decide from the current session and cache contents without fetching.
    pub fn evaluate(&self, session: &SessionSnapshot, path: &str) -> GuardState {
        let state = self.decide(session, path);
        self.record(session, path, &state);
        state
    }

    /// Decide, fetching missing permission data first.
    pub async fn resolve(&self, session: &SessionSnapshot, path: &str) -> GuardState {
        let state = self.decide(session, path);
        let Some(context) = session.identity_context().filter(|_| state.is_loading()) else {
            self.record(session, path, &state);
            return state;
        };

        let fetched = match &self.capability {
            Capability::PermissionKey(_) => self
                .resolver
                .effective_keys(&context)
                .await
                .map(|keys| self.capability.matches_keys(&keys)),
            Capability::AllowlistFlag => self.resolver.allow_flag(context.user_id()).await,
            Capability::RoleMembership(_) => Ok(self.capability.matches_roles(session.roles())),
        };

        let state = match fetched {
            Ok(true) => GuardState::Allowed,
            Ok(false) => self.deny(path, DenyReason::Forbidden),
            Err(AccessError::Unauthorized) => self.deny(path, DenyReason::Unauthenticated),
            Err(_) => self.decide(session, path),
        };
        self.record(session, path, &state);
        state
    }

    fn decide(&self, session: &SessionSnapshot, path: &str) -> GuardState {
        let Some(context) = session.identity_context() else {
            return self.deny(path, DenyReason::Unauthenticated);
        };
        if self.capability.is_misconfigured() {
            let capability = self.capability.to_string();
            gate_warn!(
                context = LogContext::new().with_route(path).with_capability(&capability),
                "guard configured with an empty requirement; denying"
            );
            return self.deny(path, DenyReason::Forbidden);
        }

        let granted = match &self.capability {
            Capability::RoleMembership(_) => Some(self.capability.matches_roles(session.roles())),
            Capability::PermissionKey(_) => self
                .resolver
                .permissions()
                .get(&context)
                .map(|keys| self.capability.matches_keys(&keys)),
            Capability::AllowlistFlag => self
                .resolver
                .allow_flags()
                .get(&context.user_id().to_owned()),
        };
        match granted {
            None => GuardState::Loading,
            Some(true) => GuardState::Allowed,
            Some(false) => self.deny(path, DenyReason::Forbidden),
        }
    }

    fn deny(&self, path: &str, reason: DenyReason) -> GuardState {
        let to = match reason {
            DenyReason::Forbidden => self.routes.landing.clone(),
            DenyReason::Unauthenticated => self.routes.login.clone(),
        };
        GuardState::Denied(Redirect {
            to,
            from: path.to_owned(),
            reason,
        })
    }

    fn record(&self, session: &SessionSnapshot, path: &str, state: &GuardState) {
        if let (GuardState::Denied(_), Some(metrics)) = (state, self.resolver.metrics()) {
            metrics.inc_guard_denial();
        }
        let capability = self.capability.to_string();
        let identity = session.identity_context();
        let vision = identity.as_ref().and_then(|ctx| ctx.vision_key());
        let mut ctx = LogContext::new().with_route(path).with_capability(&capability);
        if let Some(identity) = identity.as_ref() {
            ctx = ctx.with_user(identity.user_id());
        }
        if let Some(vision) = vision.as_deref() {
            ctx = ctx.with_vision(vision);
        }
        log_access_event(Some(&ctx), "guard.decision", "guard evaluated", state.outcome());
    }
}
