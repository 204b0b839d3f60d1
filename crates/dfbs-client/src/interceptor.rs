//! ---
//! dfbs_section: "05-networking-external-interfaces"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Backend REST client and permission endpoints."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
use dfbs_session::{InvalidationReason, SessionEvent, SessionEvents};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::error::ClientError;

/// Response stage shared by every request issued through [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct SessionInterceptor {
    events: SessionEvents,
}

impl SessionInterceptor {
    /// Create an interceptor publishing on the given bus.
    pub fn new(events: SessionEvents) -> Self {
        Self { events }
    }

    /// Classify a response status. `401` emits [`SessionEvent::Invalidated`] before returning.
    pub fn inspect(&self, path: &str, status: StatusCode) -> Result<(), ClientError> {
        if status == StatusCode::UNAUTHORIZED {
            warn!(path, "backend rejected credential; invalidating session");
            self.events.emit(SessionEvent::Invalidated {
                reason: InvalidationReason::Unauthorized,
            });
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            debug!(path, status = status.as_u16(), "request failed");
            return Err(ClientError::Status {
                status: status.as_u16(),
                path: path.to_owned(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unauthorized_emits_invalidation() {
        let events = SessionEvents::default();
        let mut rx = events.subscribe();
        let interceptor = SessionInterceptor::new(events);

        let err = interceptor
            .inspect("/permissions/effective-keys", StatusCode::UNAUTHORIZED)
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(
            rx.recv().await.unwrap(),
            SessionEvent::Invalidated {
                reason: InvalidationReason::Unauthorized
            }
        );
    }

    #[tokio::test]
    async fn other_failures_do_not_touch_the_session() {
        let events = SessionEvents::default();
        let mut rx = events.subscribe();
        let interceptor = SessionInterceptor::new(events);

        assert!(interceptor.inspect("/x", StatusCode::OK).is_ok());
        let err = interceptor
            .inspect("/x", StatusCode::SERVICE_UNAVAILABLE)
            .unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 503, .. }));
        assert!(rx.try_recv().is_err());
    }
}
