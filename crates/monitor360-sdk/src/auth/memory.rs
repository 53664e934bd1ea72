//! In-process session source
//!
//! Holds the current session and fans transitions out to observers in
//! publish order. Used to bridge an identity provider's own callback into the
//! SDK, and as the fake source in tests.

use super::source::{SessionObserver, SessionSource, Subscription};
use super::types::{AuthChange, AuthResult, Session, SessionEvent};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

type Observers = Vec<(Uuid, Arc<dyn SessionObserver>)>;

struct Inner {
    session: RwLock<Option<Session>>,
    observers: RwLock<Observers>,
    // Serialises delivery so observers see transitions in publish order
    delivery: Mutex<()>,
    pull_delay: Option<Duration>,
    pulls: AtomicUsize,
}

/// Session source backed by process memory
#[derive(Clone)]
pub struct InMemorySessionSource {
    inner: Arc<Inner>,
}

impl Default for InMemorySessionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionSource {
    pub fn new() -> Self {
        Self::build(None, None)
    }

    /// Start with an already signed-in session
    pub fn with_session(session: Session) -> Self {
        Self::build(Some(session), None)
    }

    /// Delay every pull by `delay`, emulating a slow provider round trip
    pub fn with_pull_delay(self, delay: Duration) -> Self {
        let session = self.inner.session.read().clone();
        Self::build(session, Some(delay))
    }

    fn build(session: Option<Session>, pull_delay: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(Inner {
                session: RwLock::new(session),
                observers: RwLock::new(Vec::new()),
                delivery: Mutex::new(()),
                pull_delay,
                pulls: AtomicUsize::new(0),
            }),
        }
    }

    /// Record a transition and notify every observer.
    ///
    /// Observers run on the caller's thread before this returns. An observer
    /// must not publish back into the same source.
    pub fn publish(&self, change: AuthChange, session: Option<Session>) {
        let _delivery = self.inner.delivery.lock();
        *self.inner.session.write() = session.clone();

        let observers: Vec<Arc<dyn SessionObserver>> = self
            .inner
            .observers
            .read()
            .iter()
            .map(|(_, observer)| observer.clone())
            .collect();

        let event = SessionEvent::new(change, session);
        debug!(
            change = %event.change,
            observers = observers.len(),
            "Publishing session transition"
        );
        for observer in observers {
            observer.on_session_event(&event);
        }
    }

    pub fn sign_in(&self, session: Session) {
        self.publish(AuthChange::SignedIn, Some(session));
    }

    pub fn refresh(&self, session: Session) {
        self.publish(AuthChange::TokenRefreshed, Some(session));
    }

    pub fn sign_out(&self) {
        self.publish(AuthChange::SignedOut, None);
    }

    pub fn observer_count(&self) -> usize {
        self.inner.observers.read().len()
    }

    /// Number of `current_session` pulls served so far
    pub fn pull_count(&self) -> usize {
        self.inner.pulls.load(Ordering::SeqCst)
    }

    fn remove_observer(inner: &Weak<Inner>, id: Uuid) {
        if let Some(inner) = inner.upgrade() {
            inner.observers.write().retain(|(observer_id, _)| *observer_id != id);
            debug!(%id, "Session observer removed");
        }
    }
}

#[async_trait]
impl SessionSource for InMemorySessionSource {
    async fn current_session(&self) -> AuthResult<Option<Session>> {
        self.inner.pulls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.inner.pull_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.inner.session.read().clone())
    }

    fn subscribe(&self, observer: Arc<dyn SessionObserver>) -> Subscription {
        let id = Uuid::new_v4();
        {
            let _delivery = self.inner.delivery.lock();
            self.inner.observers.write().push((id, observer.clone()));

            let initial = SessionEvent::new(
                AuthChange::InitialSession,
                self.inner.session.read().clone(),
            );
            observer.on_session_event(&initial);
        }
        debug!(%id, "Session observer registered");

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(id, move || Self::remove_observer(&inner, id))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<SessionEvent>>,
    }

    impl SessionObserver for Recorder {
        fn on_session_event(&self, event: &SessionEvent) {
            self.events.lock().push(event.clone());
        }
    }

    #[tokio::test]
    async fn test_subscribe_delivers_initial_session() {
        let source = InMemorySessionSource::with_session(Session::new("t0"));
        let recorder = Arc::new(Recorder::default());
        let _subscription = source.subscribe(recorder.clone());

        let events = recorder.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].change, AuthChange::InitialSession);
        assert_eq!(events[0].token(), Some("t0"));
    }

    #[tokio::test]
    async fn test_transitions_arrive_in_order() {
        let source = InMemorySessionSource::new();
        let recorder = Arc::new(Recorder::default());
        let _subscription = source.subscribe(recorder.clone());

        source.sign_in(Session::new("a"));
        source.refresh(Session::new("b"));
        source.sign_out();

        let changes: Vec<AuthChange> = recorder.events.lock().iter().map(|e| e.change).collect();
        assert_eq!(
            changes,
            vec![
                AuthChange::InitialSession,
                AuthChange::SignedIn,
                AuthChange::TokenRefreshed,
                AuthChange::SignedOut,
            ]
        );
        assert_eq!(source.current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let source = InMemorySessionSource::new();
        let recorder = Arc::new(Recorder::default());
        let subscription = source.subscribe(recorder.clone());
        assert_eq!(source.observer_count(), 1);

        subscription.unsubscribe();
        assert_eq!(source.observer_count(), 0);

        source.sign_in(Session::new("late"));
        assert_eq!(recorder.events.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_pull_counts() {
        let source = InMemorySessionSource::with_session(Session::new("x"));
        assert_eq!(source.pull_count(), 0);
        let session = source.current_session().await.unwrap();
        assert_eq!(session.map(|s| s.access_token), Some("x".to_string()));
        assert_eq!(source.pull_count(), 1);
    }
}
