//! Identity-provider seam
//!
//! The SDK consumes exactly two capabilities from the identity provider: a
//! pull of the current session and a push subscription to transitions.

use super::types::{AuthResult, Session, SessionEvent};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Receiver of auth-state transitions.
///
/// Called on the source's own delivery context, once per transition and in
/// transition order. Implementations must not block.
pub trait SessionObserver: Send + Sync {
    fn on_session_event(&self, event: &SessionEvent);
}

/// Client of an external identity provider
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Snapshot of the current session, if any
    async fn current_session(&self) -> AuthResult<Option<Session>>;

    /// Register an observer for every future transition.
    ///
    /// The observer stays registered until the returned handle is
    /// unsubscribed or dropped.
    fn subscribe(&self, observer: Arc<dyn SessionObserver>) -> Subscription;

    /// Source name for logging
    fn name(&self) -> &str {
        "session-source"
    }
}

type Unsubscribe = Box<dyn FnOnce() + Send + Sync>;

/// Handle for an active observer registration
pub struct Subscription {
    id: Uuid,
    unsubscribe: Option<Unsubscribe>,
}

impl Subscription {
    pub fn new(id: Uuid, unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            id,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Remove the observer from its source
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
