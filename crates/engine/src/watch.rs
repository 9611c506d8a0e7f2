//! Topic-filtered broadcast bus
//!
//! The publisher fans committed events out to any number of subscribers,
//! each registered with a predicate and a bounded channel. Delivery is
//! best-effort by design: a subscriber whose buffer stays full past the
//! send timeout loses that event while every other subscriber still
//! receives it. The bus is a notification channel, not a durable queue -
//! consumers that must not miss state re-read through a view after they
//! are notified.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use berth_core::{Event, EventRef};
use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::debug;

/// Delivery policy for the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchConfig {
    /// Per-subscriber channel capacity.
    pub buffer: usize,
    /// How long `publish` waits on a full subscriber buffer before
    /// dropping the event for that subscriber.
    pub send_timeout: Duration,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            buffer: 10,
            send_timeout: Duration::from_millis(100),
        }
    }
}

/// Predicate deciding whether a subscriber receives a published event.
pub type Filter = Box<dyn Fn(&dyn Event) -> bool + Send + Sync>;

struct Subscriber {
    id: u64,
    filter: Filter,
    tx: Sender<EventRef>,
}

struct Inner {
    config: WatchConfig,
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Inner {
    fn evict(&self, id: u64) {
        self.subscribers.lock().retain(|sub| sub.id != id);
    }
}

/// Broadcast bus handing each subscriber the events its predicate accepts.
pub struct Publisher {
    inner: Arc<Inner>,
}

impl Publisher {
    /// Create a bus with the given delivery policy.
    pub fn new(config: WatchConfig) -> Self {
        Publisher {
            inner: Arc::new(Inner {
                config,
                subscribers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Register a subscriber with the default buffer.
    pub fn subscribe(&self, filter: Filter) -> Subscription {
        self.subscribe_with_buffer(self.inner.config.buffer, filter)
    }

    /// Register a subscriber with an explicit channel capacity.
    ///
    /// After [`Publisher::close`] the returned subscription's channel is
    /// already disconnected.
    pub fn subscribe_with_buffer(&self, buffer: usize, filter: Filter) -> Subscription {
        let (tx, rx) = bounded(buffer.max(1));
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut subscribers = self.inner.subscribers.lock();
            if !self.inner.closed.load(Ordering::Acquire) {
                subscribers.push(Subscriber { id, filter, tx });
            }
            // A closed bus drops `tx` here, so the receiver observes
            // disconnection on first recv.
        }
        Subscription {
            id,
            rx,
            publisher: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every subscriber whose predicate accepts it.
    ///
    /// Never returns an error: a subscriber that cannot keep up within the
    /// send timeout misses this event, and a disconnected subscriber is
    /// dropped from the set.
    pub fn publish(&self, event: EventRef) {
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        let timeout = self.inner.config.send_timeout;
        let mut subscribers = self.inner.subscribers.lock();
        subscribers.retain(|sub| {
            if !(sub.filter)(event.as_ref()) {
                return true;
            }
            match sub.tx.send_timeout(Arc::clone(&event), timeout) {
                Ok(()) => true,
                Err(SendTimeoutError::Timeout(_)) => {
                    debug!(subscriber = sub.id, "event dropped for slow subscriber");
                    true
                }
                Err(SendTimeoutError::Disconnected(_)) => false,
            }
        });
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    /// Close every subscriber channel. Subsequent publishes are no-ops and
    /// subsequent subscriptions receive an already-closed channel.
    pub fn close(&self) {
        let mut subscribers = self.inner.subscribers.lock();
        self.inner.closed.store(true, Ordering::Release);
        subscribers.clear();
    }
}

/// A registered subscriber: the receiving end of the event channel plus
/// the registration handle. Dropping the subscription evicts it from the
/// bus.
pub struct Subscription {
    id: u64,
    rx: Receiver<EventRef>,
    publisher: Weak<Inner>,
}

impl Subscription {
    /// The channel carrying matched events.
    pub fn receiver(&self) -> &Receiver<EventRef> {
        &self.rx
    }

    /// Blocking receive of the next matched event. Returns `None` once the
    /// bus is closed and the buffer drained.
    pub fn recv(&self) -> Option<EventRef> {
        self.rx.recv().ok()
    }

    /// Receive with a deadline. Returns `None` on timeout or once the bus
    /// is closed and the buffer drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<EventRef> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Deregister from the bus. Equivalent to dropping the subscription.
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.publisher.upgrade() {
            inner.evict(self.id);
        }
    }
}
