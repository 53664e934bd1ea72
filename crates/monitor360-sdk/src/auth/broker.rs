//! Bearer-token cache kept in step with a session source
//!
//! The TokenBroker subscribes once to its [`SessionSource`] and projects every
//! transition into a single cached token. Request paths read that token
//! synchronously through [`TokenBroker::peek_token`]; callers that need a token
//! before one has been delivered use [`TokenBroker::await_token`], which polls
//! the cache on a fixed interval until a deadline.

use super::source::{SessionObserver, SessionSource, Subscription};
use super::types::{
    AuthError, AuthResult, Session, SessionEvent, WaitOptions, DEFAULT_POLL_INTERVAL,
};
use crate::config::WaitConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Cached projection of the session
#[derive(Debug, Default)]
struct CachedToken {
    token: Option<Arc<str>>,
    /// Bumped by every `start`; pull snapshots carry the value they began under
    generation: u64,
    /// Set once a push event has been applied since the last `start`
    pushed: bool,
}

/// The only writer of the cache. Owned by the broker and handed to the
/// source as its observer.
struct TokenWriter {
    slot: watch::Sender<CachedToken>,
}

impl TokenWriter {
    /// Open a new generation and forget push history ahead of a new subscription
    fn begin(&self) -> u64 {
        let mut generation = 0;
        self.slot.send_if_modified(|cached| {
            cached.generation += 1;
            cached.pushed = false;
            generation = cached.generation;
            false
        });
        generation
    }

    /// Seed the cache from a pull snapshot taken under `generation`, unless a
    /// push already landed or a later `start` has since begun
    fn hydrate(&self, generation: u64, session: Option<&Session>) {
        let token = session.and_then(Session::bearer);
        let applied = self.slot.send_if_modified(|cached| {
            if cached.generation != generation {
                debug!(
                    stale = generation,
                    current = cached.generation,
                    "Dropping session pull from an earlier start"
                );
                return false;
            }
            if cached.pushed || cached.token.as_deref() == token {
                return false;
            }
            cached.token = token.map(Arc::from);
            true
        });
        if applied {
            debug!(present = token.is_some(), "Token cache hydrated from session pull");
        }
    }
}

impl SessionObserver for TokenWriter {
    fn on_session_event(&self, event: &SessionEvent) {
        let token = event.token();
        let changed = self.slot.send_if_modified(|cached| {
            cached.pushed = true;
            if cached.token.as_deref() == token {
                return false;
            }
            cached.token = token.map(Arc::from);
            true
        });

        if changed {
            info!(
                change = %event.change,
                authenticated = token.is_some(),
                "Session transition applied to token cache"
            );
        } else {
            debug!(change = %event.change, "Session transition left token unchanged");
        }
    }
}

/// Holds the freshest known bearer token for outgoing requests
pub struct TokenBroker {
    source: Arc<dyn SessionSource>,
    writer: Arc<TokenWriter>,
    tokens: watch::Receiver<CachedToken>,
    subscription: Mutex<Option<Subscription>>,
    poll_interval: Duration,
}

impl TokenBroker {
    /// Create a broker over `source`. Nothing is subscribed until [`start`](Self::start).
    pub fn new(source: Arc<dyn SessionSource>) -> Self {
        let (slot, tokens) = watch::channel(CachedToken::default());
        Self {
            source,
            writer: Arc::new(TokenWriter { slot }),
            tokens,
            subscription: Mutex::new(None),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Create a broker using the poll interval from configuration
    pub fn from_config(source: Arc<dyn SessionSource>, config: &WaitConfig) -> Self {
        Self::new(source).with_poll_interval(config.poll_interval())
    }

    /// Override the interval between cache checks in [`await_token`](Self::await_token)
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Subscribe to the session source and hydrate the cache.
    ///
    /// Calling this on an already started broker is a no-op, so at most one
    /// subscription ever writes the cache. After subscribing, the current
    /// session is pulled once; the snapshot is discarded if a push event
    /// arrived in the meantime or if the broker was shut down and started
    /// again before the pull returned.
    pub async fn start(&self) {
        let generation = {
            let mut subscription = self.subscription.lock();
            if subscription.is_some() {
                debug!("Token broker already started");
                return;
            }
            let generation = self.writer.begin();
            let observer: Arc<dyn SessionObserver> = self.writer.clone();
            *subscription = Some(self.source.subscribe(observer));
            generation
        };
        info!(
            source = self.source.name(),
            generation, "Token broker subscribed to session source"
        );

        match self.source.current_session().await {
            Ok(session) => self.writer.hydrate(generation, session.as_ref()),
            Err(e) => warn!("Initial session pull failed, relying on push events: {}", e),
        }
    }

    pub fn is_started(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// Drop the subscription. The last cached token stays readable; a later
    /// [`start`](Self::start) subscribes again.
    pub fn shutdown(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            let id = subscription.id();
            subscription.unsubscribe();
            info!(%id, "Token broker unsubscribed from session source");
        }
    }

    /// Current token, without waiting and without touching the source
    pub fn peek_token(&self) -> Option<String> {
        self.tokens.borrow().token.as_deref().map(str::to_owned)
    }

    pub fn has_token(&self) -> bool {
        self.tokens.borrow().token.is_some()
    }

    /// Wait for a token to be cached, checking every poll interval.
    ///
    /// The deadline runs from the start of the call. A token already cached
    /// is returned by the first check; a zero timeout performs exactly one
    /// check. On expiry returns `Ok(None)`, or [`AuthError::AuthTimeout`] when
    /// `require_auth` is set. Only the cache is read; the source is never
    /// pulled from here.
    pub async fn await_token(&self, options: WaitOptions) -> AuthResult<Option<String>> {
        self.wait_for_token(options, None).await
    }

    /// Like [`await_token`](Self::await_token), but stops promptly with
    /// [`AuthError::Cancelled`] once `cancel` fires.
    pub async fn await_token_with_cancel(
        &self,
        options: WaitOptions,
        cancel: &CancellationToken,
    ) -> AuthResult<Option<String>> {
        self.wait_for_token(options, Some(cancel)).await
    }

    async fn wait_for_token(
        &self,
        options: WaitOptions,
        cancel: Option<&CancellationToken>,
    ) -> AuthResult<Option<String>> {
        let started = Instant::now();
        let deadline = started + options.timeout;

        loop {
            if let Some(token) = self.peek_token() {
                trace!(waited = ?started.elapsed(), "Token available");
                return Ok(Some(token));
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }

            let nap = self.poll_interval.min(deadline - now);
            let cancelled = async {
                match cancel {
                    Some(cancel) => cancel.cancelled().await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                _ = cancelled => {
                    debug!(waited = ?started.elapsed(), "Token wait cancelled");
                    return Err(AuthError::Cancelled);
                }
                _ = tokio::time::sleep(nap) => {}
            }
        }

        let waited = started.elapsed();
        if options.require_auth {
            warn!(?waited, "No session available before deadline");
            Err(AuthError::AuthTimeout { waited })
        } else {
            debug!(?waited, "No session available before deadline");
            Ok(None)
        }
    }

    /// Full session snapshot, pulled from the source
    pub async fn current_session(&self) -> AuthResult<Option<Session>> {
        self.source.current_session().await
    }
}

impl std::fmt::Debug for TokenBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenBroker")
            .field("source", &self.source.name())
            .field("started", &self.is_started())
            .field("has_token", &self.has_token())
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::InMemorySessionSource;
    use crate::auth::types::AuthChange;
    use async_trait::async_trait;

    fn broker_over(source: &InMemorySessionSource) -> TokenBroker {
        TokenBroker::new(Arc::new(source.clone()))
    }

    #[tokio::test]
    async fn test_peek_tracks_latest_event() {
        let source = InMemorySessionSource::new();
        let broker = broker_over(&source);
        broker.start().await;
        assert_eq!(broker.peek_token(), None);

        source.sign_in(Session::new("first"));
        assert_eq!(broker.peek_token().as_deref(), Some("first"));

        source.refresh(Session::new("second"));
        source.publish(AuthChange::UserUpdated, Some(Session::new("third")));
        assert_eq!(broker.peek_token().as_deref(), Some("third"));
    }

    #[tokio::test]
    async fn test_sign_out_clears_token() {
        let source = InMemorySessionSource::with_session(Session::new("abc"));
        let broker = broker_over(&source);
        broker.start().await;
        assert!(broker.has_token());

        source.sign_out();
        assert_eq!(broker.peek_token(), None);
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let source = InMemorySessionSource::new();
        let broker = broker_over(&source);
        broker.start().await;
        broker.start().await;
        assert_eq!(source.observer_count(), 1);

        let mut changes = broker.tokens.clone();
        changes.mark_unchanged();
        source.refresh(Session::new("same"));
        assert!(changes.has_changed().unwrap());
        changes.mark_unchanged();
        source.refresh(Session::new("same"));
        assert!(!changes.has_changed().unwrap());
        assert_eq!(broker.peek_token().as_deref(), Some("same"));
    }

    #[tokio::test]
    async fn test_shutdown_and_restart() {
        let source = InMemorySessionSource::new();
        let broker = broker_over(&source);
        broker.start().await;
        source.sign_in(Session::new("kept"));

        broker.shutdown();
        assert!(!broker.is_started());
        assert_eq!(source.observer_count(), 0);

        source.sign_in(Session::new("missed"));
        assert_eq!(broker.peek_token().as_deref(), Some("kept"));

        broker.start().await;
        assert_eq!(source.observer_count(), 1);
        assert_eq!(broker.peek_token().as_deref(), Some("missed"));
    }

    #[tokio::test]
    async fn test_blank_token_is_treated_as_signed_out() {
        let source = InMemorySessionSource::with_session(Session::new("abc"));
        let broker = broker_over(&source);
        broker.start().await;

        source.refresh(Session::new(""));
        assert_eq!(broker.peek_token(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_returns_cached_token_immediately() {
        let source = InMemorySessionSource::with_session(Session::new("ready"));
        let broker = broker_over(&source);
        broker.start().await;

        let started = Instant::now();
        let token = broker.await_token(WaitOptions::default()).await.unwrap();
        assert_eq!(token.as_deref(), Some("ready"));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_checks_once() {
        let source = InMemorySessionSource::new();
        let broker = broker_over(&source);
        broker.start().await;

        let started = Instant::now();
        let token = broker
            .await_token(WaitOptions::default().timeout_ms(0))
            .await
            .unwrap();
        assert_eq!(token, None);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_picks_up_late_sign_in() {
        let source = InMemorySessionSource::new();
        let broker = broker_over(&source);
        broker.start().await;

        let publisher = source.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            publisher.sign_in(Session::new("late"));
        });

        let started = Instant::now();
        let token = broker
            .await_token(WaitOptions::default().timeout_ms(8000))
            .await
            .unwrap();
        assert_eq!(token.as_deref(), Some("late"));
        assert!(started.elapsed() <= Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_required_wait_times_out() {
        let source = InMemorySessionSource::new();
        let broker = broker_over(&source);
        broker.start().await;

        let started = Instant::now();
        let err = broker
            .await_token(WaitOptions::default().timeout_ms(300).require_auth(true))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::AuthTimeout { .. }));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed <= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_optional_wait_times_out_with_none() {
        let source = InMemorySessionSource::new();
        let broker = broker_over(&source);
        broker.start().await;

        let token = broker
            .await_token(WaitOptions::default().timeout_ms(300))
            .await
            .unwrap();
        assert_eq!(token, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_distinct_from_timeout() {
        let source = InMemorySessionSource::new();
        let broker = broker_over(&source);
        broker.start().await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = broker
            .await_token_with_cancel(WaitOptions::default().require_auth(true), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Cancelled));
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waiters_are_independent() {
        let source = InMemorySessionSource::new();
        let broker = Arc::new(broker_over(&source));
        broker.start().await;

        let first = tokio::spawn({
            let broker = broker.clone();
            async move { broker.await_token(WaitOptions::default()).await }
        });
        let second = tokio::spawn({
            let broker = broker.clone();
            async move { broker.await_token(WaitOptions::default().timeout_ms(100)).await }
        });

        tokio::time::sleep(Duration::from_millis(250)).await;
        source.sign_in(Session::new("shared"));

        assert_eq!(first.await.unwrap().unwrap().as_deref(), Some("shared"));
        assert_eq!(second.await.unwrap().unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_never_pulls_from_source() {
        let source = InMemorySessionSource::new();
        let broker = broker_over(&source);
        broker.start().await;
        let pulls = source.pull_count();

        let _ = broker.await_token(WaitOptions::default().timeout_ms(1000)).await;
        assert_eq!(source.pull_count(), pulls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_peek_ignores_slow_source() {
        let source = InMemorySessionSource::with_session(Session::new("fast"))
            .with_pull_delay(Duration::from_secs(30));
        let broker = Arc::new(broker_over(&source));

        let starter = tokio::spawn({
            let broker = broker.clone();
            async move { broker.start().await }
        });
        tokio::task::yield_now().await;

        // start is still parked on the slow pull, yet the cache is readable
        assert!(!starter.is_finished());
        assert_eq!(broker.peek_token().as_deref(), Some("fast"));
        starter.await.unwrap();
    }

    /// Source that never sends an initial event and answers pulls slowly
    struct PullOnlySource {
        snapshot: Option<Session>,
        observer: Mutex<Option<Arc<dyn SessionObserver>>>,
    }

    #[async_trait]
    impl SessionSource for PullOnlySource {
        async fn current_session(&self) -> AuthResult<Option<Session>> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(self.snapshot.clone())
        }

        fn subscribe(&self, observer: Arc<dyn SessionObserver>) -> Subscription {
            *self.observer.lock() = Some(observer);
            Subscription::new(uuid::Uuid::new_v4(), || {})
        }
    }

    impl PullOnlySource {
        fn push(&self, event: SessionEvent) {
            if let Some(observer) = self.observer.lock().as_ref() {
                observer.on_session_event(&event);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_hydrates_from_pull() {
        let source = Arc::new(PullOnlySource {
            snapshot: Some(Session::new("pulled")),
            observer: Mutex::new(None),
        });
        let broker = TokenBroker::new(source);
        broker.start().await;
        assert_eq!(broker.peek_token().as_deref(), Some("pulled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_wins_over_stale_pull() {
        let source = Arc::new(PullOnlySource {
            snapshot: Some(Session::new("stale")),
            observer: Mutex::new(None),
        });
        let broker = Arc::new(TokenBroker::new(source.clone()));

        let starter = tokio::spawn({
            let broker = broker.clone();
            async move { broker.start().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        source.push(SessionEvent::signed_out());
        starter.await.unwrap();

        assert_eq!(broker.peek_token(), None);
    }

    /// Source that answers each pull from a script of (delay, snapshot) pairs
    struct ScriptedPullSource {
        pulls: Mutex<std::collections::VecDeque<(Duration, Option<Session>)>>,
    }

    #[async_trait]
    impl SessionSource for ScriptedPullSource {
        async fn current_session(&self) -> AuthResult<Option<Session>> {
            let (delay, snapshot) = self.pulls.lock().pop_front().unwrap_or_default();
            tokio::time::sleep(delay).await;
            Ok(snapshot)
        }

        fn subscribe(&self, _observer: Arc<dyn SessionObserver>) -> Subscription {
            Subscription::new(uuid::Uuid::new_v4(), || {})
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_pull_from_earlier_start_is_dropped_after_restart() {
        let source = Arc::new(ScriptedPullSource {
            pulls: Mutex::new(
                [
                    (Duration::from_millis(500), Some(Session::new("old"))),
                    (Duration::from_millis(100), Some(Session::new("new"))),
                ]
                .into_iter()
                .collect(),
            ),
        });
        let broker = Arc::new(TokenBroker::new(source));

        let first = tokio::spawn({
            let broker = broker.clone();
            async move { broker.start().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(broker.is_started());

        broker.shutdown();
        broker.start().await;
        assert_eq!(broker.peek_token().as_deref(), Some("new"));

        first.await.unwrap();
        assert_eq!(broker.peek_token().as_deref(), Some("new"));
    }

    #[test]
    fn test_poll_interval_from_config() {
        let source = InMemorySessionSource::new();
        let config = WaitConfig {
            poll_interval_ms: 50,
            ..WaitConfig::default()
        };
        let broker = TokenBroker::from_config(Arc::new(source), &config);
        assert_eq!(broker.poll_interval(), Duration::from_millis(50));
    }
}
