//! Session-change fan-out.
//!
//! DESIGN
//! ======
//! A `ChangeHub` keeps one unbounded sender per live subscription, keyed by
//! a monotonically increasing id. `Subscription` owns the receiving end and
//! a `SubscriptionGuard`; dropping the guard (or calling `unsubscribe`)
//! removes the sender, which closes the receiver. Release happens at most
//! once per guard.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::mpsc;

use crate::identity::SessionChange;

type Subscribers = Mutex<HashMap<u64, mpsc::UnboundedSender<SessionChange>>>;

// =============================================================================
// HUB
// =============================================================================

#[derive(Clone, Default)]
pub struct ChangeHub {
    subscribers: Arc<Subscribers>,
    next_id: Arc<AtomicU64>,
}

impl ChangeHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).insert(id, tx);
        tracing::debug!(subscription = id, "session change subscriber added");
        Subscription {
            guard: SubscriptionGuard { id, subscribers: Arc::downgrade(&self.subscribers), released: false },
            events: rx,
        }
    }

    /// Deliver a change to every live subscriber. Returns how many received it.
    pub fn emit(&self, change: &SessionChange) -> usize {
        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|_, tx| tx.send(change.clone()).is_ok());
        tracing::debug!(event = ?change.event, delivered = subscribers.len(), "session change emitted");
        subscribers.len()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

fn lock(subscribers: &Subscribers) -> std::sync::MutexGuard<'_, HashMap<u64, mpsc::UnboundedSender<SessionChange>>> {
    subscribers
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Live registration with a [`ChangeHub`].
pub struct Subscription {
    guard: SubscriptionGuard,
    events: mpsc::UnboundedReceiver<SessionChange>,
}

impl Subscription {
    /// Next change, or `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<SessionChange> {
        self.events.recv().await
    }

    /// Split into the release handle and the event stream so they can be
    /// owned by different tasks.
    #[must_use]
    pub fn into_parts(self) -> (SubscriptionGuard, mpsc::UnboundedReceiver<SessionChange>) {
        (self.guard, self.events)
    }
}

/// Releases the subscription when dropped.
pub struct SubscriptionGuard {
    id: u64,
    subscribers: Weak<Subscribers>,
    released: bool,
}

impl SubscriptionGuard {
    /// Remove the subscription from its hub. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Some(subscribers) = self.subscribers.upgrade() {
            lock(&subscribers).remove(&self.id);
            tracing::debug!(subscription = self.id, "session change subscriber released");
        }
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
