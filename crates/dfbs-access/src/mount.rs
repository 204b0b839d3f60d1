//! ---
//! dfbs_section: "06-security-access-control"
//! dfbs_subsection: "module"
//! dfbs_type: "source"
//! dfbs_scope: "code"
//! dfbs_description: "Permission caching and access guard evaluation."
//! dfbs_version: "v0.0.0-prealpha"
//! dfbs_owner: "tbd"
//! ---
//! Live guard bound to a session.
//!
//! A mounted guard publishes its state on a watch channel. A session listener re-evaluates
//! inside [`SessionEvents::emit`], so the published state never lags a logout or vision
//! switch; a background task then fetches whatever the new identity is missing.
//! Dropping the handle removes the listener and aborts the task.
use std::sync::Arc;

use dfbs_session::{ListenerId, Session, SessionEvent, SessionEvents, SessionListener};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::guard::{AccessGuard, GuardState};

/// Handle to a guard mounted on a route.
#[derive(Debug)]
pub struct MountedGuard {
    state: watch::Receiver<GuardState>,
    task: JoinHandle<()>,
    events: SessionEvents,
    listener: ListenerId,
}

impl MountedGuard {
    /// Latest published state.
    pub fn state(&self) -> GuardState {
        self.state.borrow().clone()
    }

    /// Wait until the guard leaves `Loading`.
    pub async fn settled(&mut self) -> GuardState {
        if let Ok(state) = self.state.wait_for(|state| !state.is_loading()).await {
            return state.clone();
        }
        self.state.borrow().clone()
    }

    /// Independent receiver for the published state.
    pub fn watch(&self) -> watch::Receiver<GuardState> {
        self.state.clone()
    }
}

impl Drop for MountedGuard {
    fn drop(&mut self) {
        self.events.unregister(self.listener);
        self.task.abort();
    }
}

fn publish(tx: &watch::Sender<GuardState>, state: GuardState) {
    tx.send_if_modified(|current| {
        if *current == state {
            return false;
        }
        *current = state;
        true
    });
}

/// Re-evaluates synchronously while the session event is being emitted.
struct SyncPublisher {
    guard: Arc<AccessGuard>,
    session: Session,
    path: String,
    tx: Arc<watch::Sender<GuardState>>,
}

impl SessionListener for SyncPublisher {
    fn on_event(&self, _event: &SessionEvent) {
        let snapshot = self.session.snapshot();
        publish(&self.tx, self.guard.evaluate(&snapshot, &self.path));
    }
}

impl AccessGuard {
    /// Evaluate for `path` and keep re-evaluating on every session change.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn mount(self: &Arc<Self>, session: Session, path: impl Into<String>) -> MountedGuard {
        let path = path.into();
        let events = session.events().clone();
        let mut subscription = events.subscribe();
        let (tx, state) = watch::channel(self.evaluate(&session.snapshot(), &path));
        let tx = Arc::new(tx);

        let listener = events.register(Arc::new(SyncPublisher {
            guard: Arc::clone(self),
            session: session.clone(),
            path: path.clone(),
            tx: tx.clone(),
        }));

        let guard = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                let snapshot = session.snapshot();
                publish(&tx, guard.evaluate(&snapshot, &path));
                let resolved = guard.resolve(&snapshot, &path).await;
                if tx.is_closed() {
                    break;
                }
                // Checked under the channel lock so a concurrent session change wins.
                tx.send_if_modified(|current| {
                    if session.snapshot() != snapshot || *current == resolved {
                        return false;
                    }
                    *current = resolved;
                    true
                });

                match subscription.recv().await {
                    Ok(event) => debug!(?event, route = %path, "guard re-evaluating"),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, route = %path, "guard lagged behind session events")
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        MountedGuard {
            state,
            task,
            events,
            listener,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::{DenyReason, GuardRoutes};
    use crate::resolver::tests::ScriptedApi;
    use crate::resolver::PermissionResolver;
    use crate::teardown::CacheTeardown;
    use crate::Capability;
    use dfbs_session::{MemoryCredentialStore, SessionEvents, UserProfile, Vision};

    fn setup(api: Arc<ScriptedApi>, capability: Capability) -> (Session, Arc<AccessGuard>) {
        let events = SessionEvents::default();
        let session = Session::new(Arc::new(MemoryCredentialStore::new()), events.clone());
        let resolver = PermissionResolver::new(api);
        events.register(Arc::new(CacheTeardown::new(
            resolver.permissions().clone(),
            resolver.allow_flags().clone(),
            None,
        )));
        let guard = Arc::new(AccessGuard::new(
            capability,
            resolver,
            GuardRoutes::default(),
        ));
        (session, guard)
    }

    fn alice() -> UserProfile {
        UserProfile::new("7", "alice", vec![])
    }

    #[tokio::test]
    async fn settles_to_allowed_after_fetch() {
        let (session, guard) = setup(
            ScriptedApi::granting(&["work_order:VIEW"]),
            Capability::permission("work_order:VIEW"),
        );
        session.login("good", alice()).unwrap();
        let mut mounted = guard.mount(session, "/work-orders");
        assert_eq!(mounted.settled().await, GuardState::Allowed);
    }

    #[tokio::test]
    async fn logout_flips_to_login_redirect() {
        let (session, guard) = setup(
            ScriptedApi::granting(&["work_order:VIEW"]),
            Capability::permission("work_order:VIEW"),
        );
        session.login("good", alice()).unwrap();
        let mut mounted = guard.mount(session.clone(), "/work-orders");
        assert_eq!(mounted.settled().await, GuardState::Allowed);

        session.logout();
        let state = mounted
            .watch()
            .wait_for(|state| !state.is_allowed())
            .await
            .unwrap()
            .clone();
        assert_eq!(state.redirect().unwrap().reason, DenyReason::Unauthenticated);
    }

    #[tokio::test]
    async fn state_follows_logout_before_the_task_runs() {
        let (session, guard) = setup(
            ScriptedApi::granting(&["work_order:VIEW"]),
            Capability::permission("work_order:VIEW"),
        );
        session.login("good", alice()).unwrap();
        let mut mounted = guard.mount(session.clone(), "/work-orders");
        assert_eq!(mounted.settled().await, GuardState::Allowed);

        session.logout();
        let state = mounted.state();
        assert_eq!(state.redirect().unwrap().to, "/login");
        assert_eq!(state.redirect().unwrap().reason, DenyReason::Unauthenticated);
    }

    #[tokio::test]
    async fn state_is_loading_right_after_vision_switch() {
        let (session, guard) = setup(
            ScriptedApi::granting(&["work_order:VIEW"]),
            Capability::permission("work_order:VIEW"),
        );
        session.login("good", alice()).unwrap();
        let mut mounted = guard.mount(session.clone(), "/work-orders");
        assert_eq!(mounted.settled().await, GuardState::Allowed);

        session.set_vision(Vision::user("12"));
        assert_eq!(mounted.state(), GuardState::Loading);
    }

    #[tokio::test]
    async fn vision_switch_refetches() {
        let api = ScriptedApi::granting(&["work_order:VIEW"]);
        let (session, guard) = setup(api.clone(), Capability::permission("work_order:VIEW"));
        session.login("good", alice()).unwrap();
        let mut mounted = guard.mount(session.clone(), "/work-orders");
        assert_eq!(mounted.settled().await, GuardState::Allowed);

        *api.keys.lock() = Ok(vec![]);
        session.set_vision(Vision::user("12"));
        let state = mounted
            .watch()
            .wait_for(|state| !state.is_allowed() && !state.is_loading())
            .await
            .unwrap()
            .clone();
        assert_eq!(state.redirect().unwrap().reason, DenyReason::Forbidden);
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn dropped_guard_stops_publishing() {
        let (session, guard) = setup(
            ScriptedApi::granting(&["work_order:VIEW"]),
            Capability::permission("work_order:VIEW"),
        );
        session.login("good", alice()).unwrap();
        let mounted = guard.mount(session.clone(), "/work-orders");
        let mut rx = mounted.watch();
        drop(mounted);

        // Drain whatever was published before the abort took effect.
        tokio::task::yield_now().await;
        while rx.has_changed().unwrap_or(false) {
            rx.borrow_and_update();
        }
        session.logout();
        let outcome = tokio::time::timeout(std::time::Duration::from_millis(50), rx.changed()).await;
        // Either the sender is gone or nothing new arrives.
        assert!(!matches!(outcome, Ok(Ok(()))));
    }
}
