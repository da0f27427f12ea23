//! Event channel adapter.
//!
//! Subscribes typed handlers to backend-originated named notification
//! topics. Handlers for one topic execute in delivery order; a panicking
//! handler does not deregister or starve the others; unsubscribing is
//! idempotent. Raw payloads are decoded exactly once, here, before any
//! handler sees them.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};

use ss_core::events::Notification;

/// Identifies one registered handler, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(usize);

type Handler = Arc<dyn Fn(&Notification) + Send + Sync>;

#[derive(Default)]
struct ChannelInner {
    listeners: RwLock<HashMap<String, Vec<(ListenerId, Handler)>>>,
    next_listener_id: Mutex<usize>,
    closed: AtomicBool,
}

impl ChannelInner {
    fn remove(&self, topic: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write().unwrap();
        let Some(topic_listeners) = listeners.get_mut(topic) else {
            return false;
        };
        let before = topic_listeners.len();
        topic_listeners.retain(|(listener_id, _)| *listener_id != id);
        topic_listeners.len() < before
    }
}

/// Named-topic notification channel between the backend adapter and the
/// orchestration core.
#[derive(Default)]
pub struct EventChannel {
    inner: Arc<ChannelInner>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `topic`. The returned handle unsubscribes on
    /// drop or via [`Subscription::unsubscribe`].
    pub fn subscribe<F>(&self, topic: &str, handler: F) -> Subscription
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = {
            let mut guard = self.inner.next_listener_id.lock().unwrap();
            let id = ListenerId(*guard);
            *guard += 1;
            id
        };

        let mut listeners = self.inner.listeners.write().unwrap();
        listeners
            .entry(topic.to_string())
            .or_default()
            .push((id, Arc::new(handler)));

        Subscription {
            id,
            topic: topic.to_string(),
            channel: Arc::downgrade(&self.inner),
            active: AtomicBool::new(true),
        }
    }

    /// Deliver an already-decoded notification to its topic's handlers, in
    /// registration order.
    pub fn publish(&self, notification: Notification) {
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }

        // Snapshot the handler list so a handler may (un)subscribe without
        // deadlocking the channel.
        let handlers: Vec<Handler> = {
            let listeners = self.inner.listeners.read().unwrap();
            match listeners.get(notification.topic()) {
                Some(topic_listeners) => {
                    topic_listeners.iter().map(|(_, h)| Arc::clone(h)).collect()
                }
                None => return,
            }
        };

        for handler in handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&notification))).is_err() {
                tracing::error!(
                    topic = notification.topic(),
                    "notification handler panicked; remaining handlers still run"
                );
            }
        }
    }

    /// Decode a raw backend payload and deliver it. Undecodable payloads are
    /// logged and dropped — the backend shape never leaks past this point.
    pub fn publish_raw(&self, topic: &str, payload: serde_json::Value) {
        match Notification::decode(topic, payload) {
            Ok(notification) => self.publish(notification),
            Err(err) => {
                tracing::warn!(topic, error = %err, "dropping undecodable notification");
            }
        }
    }

    /// Tear the channel down: all handlers are dropped and later publishes
    /// are no-ops. Models the backend notification stream closing.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.listeners.write().unwrap().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of handlers currently registered for `topic`.
    pub fn listener_count(&self, topic: &str) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap()
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

/// Unsubscribe handle returned by [`EventChannel::subscribe`].
pub struct Subscription {
    id: ListenerId,
    topic: String,
    channel: Weak<ChannelInner>,
    active: AtomicBool,
}

impl Subscription {
    /// Remove the handler. Safe to call any number of times; returns whether
    /// this call actually removed it.
    pub fn unsubscribe(&self) -> bool {
        if self.active.swap(false, Ordering::SeqCst) {
            if let Some(channel) = self.channel.upgrade() {
                return channel.remove(&self.topic, self.id);
            }
        }
        false
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
