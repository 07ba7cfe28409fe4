//! Refresh event bus
//!
//! Maps refresh events to sets of subscribers. `emit` runs every subscriber
//! registered at the moment of emission concurrently and waits for all of
//! them. Emission works on a snapshot, so subscribers may subscribe or
//! unsubscribe (themselves or others) from inside `on_refresh`.

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

/// Data domains whose views must reload after a mutation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RefreshEvent {
    Today,
    Meals,
    Weight,
    Goals,
    Profile,
}

impl RefreshEvent {
    pub fn all() -> &'static [RefreshEvent] {
        &[
            RefreshEvent::Today,
            RefreshEvent::Meals,
            RefreshEvent::Weight,
            RefreshEvent::Goals,
            RefreshEvent::Profile,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshEvent::Today => "today",
            RefreshEvent::Meals => "meals",
            RefreshEvent::Weight => "weight",
            RefreshEvent::Goals => "goals",
            RefreshEvent::Profile => "profile",
        }
    }

    /// WebSocket topic, e.g. `refresh.meals`
    pub fn topic(&self) -> String {
        format!("refresh.{}", self.as_str())
    }
}

impl fmt::Display for RefreshEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RefreshEvent::all()
            .iter()
            .copied()
            .find(|e| e.as_str() == s)
            .ok_or_else(|| format!("unknown refresh event '{}'", s))
    }
}

/// Something that reacts to refresh events
#[async_trait]
pub trait RefreshSubscriber: Send + Sync {
    async fn on_refresh(&self, event: RefreshEvent, user_id: &str);
}

/// Shared subscriber handle
pub type SubscriberRef = Arc<dyn RefreshSubscriber>;

/// Subscriber identity is the allocation, not the value
fn same_subscriber(a: &SubscriberRef, b: &SubscriberRef) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Event → subscriber set
#[derive(Default)]
pub struct RefreshBus {
    listeners: RwLock<HashMap<RefreshEvent, Vec<SubscriberRef>>>,
}

impl RefreshBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber` for `event`; registering twice stores it once.
    /// The returned handle is what `unsubscribe` expects.
    pub fn subscribe(&self, event: RefreshEvent, subscriber: SubscriberRef) -> SubscriberRef {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        let set = listeners.entry(event).or_default();
        if !set.iter().any(|s| same_subscriber(s, &subscriber)) {
            set.push(subscriber.clone());
        }
        subscriber
    }

    /// Remove `subscriber` from `event`; empty events are dropped
    pub fn unsubscribe(&self, event: RefreshEvent, subscriber: &SubscriberRef) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        if let Some(set) = listeners.get_mut(&event) {
            set.retain(|s| !same_subscriber(s, subscriber));
            if set.is_empty() {
                listeners.remove(&event);
            }
        }
    }

    /// Invoke every current subscriber of `event` and wait for all of them
    pub async fn emit(&self, event: RefreshEvent, user_id: &str) {
        let snapshot: Vec<SubscriberRef> = {
            let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
            listeners.get(&event).cloned().unwrap_or_default()
        };

        tracing::debug!(
            event = %event,
            user_id,
            subscribers = snapshot.len(),
            "Emitting refresh event"
        );

        join_all(snapshot.iter().map(|s| s.on_refresh(event, user_id))).await;
    }

    /// Emit several events in order
    pub async fn emit_all(&self, events: &[RefreshEvent], user_id: &str) {
        for event in events {
            self.emit(*event, user_id).await;
        }
    }

    pub fn subscriber_count(&self, event: RefreshEvent) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&event)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Events with at least one subscriber
    pub fn event_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl fmt::Debug for RefreshBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshBus")
            .field("events", &self.event_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Weak;

    #[derive(Default)]
    struct Counter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RefreshSubscriber for Counter {
        async fn on_refresh(&self, _event: RefreshEvent, _user_id: &str) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Unsubscribes itself the first time it runs
    struct OneShot {
        bus: Arc<RefreshBus>,
        me: Weak<OneShot>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RefreshSubscriber for OneShot {
        async fn on_refresh(&self, event: RefreshEvent, _user_id: &str) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(me) = self.me.upgrade() {
                let me: SubscriberRef = me;
                self.bus.unsubscribe(event, &me);
            }
        }
    }

    #[test]
    fn test_event_topics() {
        assert_eq!(RefreshEvent::Meals.topic(), "refresh.meals");
        assert_eq!("weight".parse::<RefreshEvent>().unwrap(), RefreshEvent::Weight);
        assert!("lunch".parse::<RefreshEvent>().is_err());
        assert_eq!(serde_json::to_string(&RefreshEvent::Today).unwrap(), "\"today\"");
    }

    #[tokio::test]
    async fn test_each_subscriber_called_once() {
        let bus = RefreshBus::new();
        let a = Arc::new(Counter::default());
        let b = Arc::new(Counter::default());
        let other = Arc::new(Counter::default());

        bus.subscribe(RefreshEvent::Meals, a.clone());
        bus.subscribe(RefreshEvent::Meals, b.clone());
        bus.subscribe(RefreshEvent::Weight, other.clone());

        bus.emit(RefreshEvent::Meals, "u1").await;

        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);
        assert_eq!(other.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let bus = RefreshBus::new();
        let a = Arc::new(Counter::default());
        let handle: SubscriberRef = a.clone();

        bus.subscribe(RefreshEvent::Today, handle.clone());
        bus.subscribe(RefreshEvent::Today, handle.clone());
        assert_eq!(bus.subscriber_count(RefreshEvent::Today), 1);

        bus.emit(RefreshEvent::Today, "u1").await;
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsubscribe_drops_empty_event() {
        let bus = RefreshBus::new();
        let handle: SubscriberRef = Arc::new(Counter::default());

        bus.subscribe(RefreshEvent::Goals, handle.clone());
        assert_eq!(bus.event_count(), 1);

        bus.unsubscribe(RefreshEvent::Goals, &handle);
        bus.unsubscribe(RefreshEvent::Goals, &handle);
        assert_eq!(bus.event_count(), 0);

        // no subscribers is a no-op
        bus.emit(RefreshEvent::Goals, "u1").await;
    }

    #[tokio::test]
    async fn test_unsubscribe_during_emit() {
        let bus = Arc::new(RefreshBus::new());
        let one_shot = Arc::new_cyclic(|me| OneShot {
            bus: bus.clone(),
            me: me.clone(),
            calls: AtomicUsize::new(0),
        });
        let counter = Arc::new(Counter::default());

        bus.subscribe(RefreshEvent::Profile, one_shot.clone());
        bus.subscribe(RefreshEvent::Profile, counter.clone());

        bus.emit(RefreshEvent::Profile, "u1").await;
        bus.emit(RefreshEvent::Profile, "u1").await;

        assert_eq!(one_shot.calls.load(Ordering::SeqCst), 1);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(bus.subscriber_count(RefreshEvent::Profile), 1);
    }
}
