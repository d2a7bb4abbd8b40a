//! Priority-ordered push notifications for datastore events
//!
//! Subscribers are called synchronously on the posting thread, in ascending
//! priority order (ties in registration order). The storage backing a
//! datastore registers at [`STORAGE_PRIORITY`], ahead of every other
//! subscriber, so it has ingested an update before anyone reacting to the
//! same event reads from it.

use crate::coords::Coords;
use crate::metadata::SummaryMetadata;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Priority reserved for the storage of a datastore
pub const STORAGE_PRIORITY: i32 = 0;

/// Default priority for other subscribers
pub const DEFAULT_PRIORITY: i32 = 100;

/// Events posted by a datastore
#[derive(Debug, Clone, PartialEq)]
pub enum DataEvent {
    /// Summary metadata was replaced
    NewSummaryMetadata(Arc<SummaryMetadata>),
    /// An image was stored and can be read back
    NewImage { coords: Coords },
    /// An image was removed
    ImageDeleted { coords: Coords },
    /// The datastore stopped accepting writes
    Frozen,
    /// The datastore was closed
    Closed,
}

/// Receiver of [`DataEvent`]s
pub trait DataEventListener: Send + Sync {
    fn on_event(&self, event: &DataEvent);
}

impl<F> DataEventListener for F
where
    F: Fn(&DataEvent) + Send + Sync,
{
    fn on_event(&self, event: &DataEvent) {
        self(event)
    }
}

/// Handle returned by [`EventBus::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    priority: i32,
    listener: Arc<dyn DataEventListener>,
}

/// Synchronous event bus with priority-ordered subscribers
#[derive(Default)]
pub struct EventBus {
    subscriptions: RwLock<Vec<Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Lower priorities are notified first.
    pub fn register(&self, listener: Arc<dyn DataEventListener>, priority: i32) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subscriptions = self.subscriptions.write();
        // Insert after every subscription with priority <= ours to keep ties in registration order
        let position = subscriptions.partition_point(|s| s.priority <= priority);
        subscriptions.insert(
            position,
            Subscription {
                id,
                priority,
                listener,
            },
        );
        debug!(subscription = id.0, priority, "Registered event listener");
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unregister(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        let removed = subscriptions.len() != before;
        if removed {
            debug!(subscription = id.0, "Unregistered event listener");
        }
        removed
    }

    /// Deliver `event` to every listener in priority order.
    ///
    /// The subscriber list is snapshotted first, so listeners may register,
    /// unregister or post from inside their callback.
    pub fn post(&self, event: &DataEvent) {
        let listeners: Vec<Arc<dyn DataEventListener>> = self
            .subscriptions
            .read()
            .iter()
            .map(|s| Arc::clone(&s.listener))
            .collect();

        for listener in listeners {
            listener.on_event(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.read().len()
    }
}
