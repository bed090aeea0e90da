//! Event bus with typed pub/sub
//!
//! The host consumes bridge events (button presses, state changes) through
//! this bus. Components subscribe by event type; the bridge fires events as
//! they arrive from the controller.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use crate::{Context, Event, EventData, EventType};

/// Default channel capacity for event subscriptions
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// The event bus for publishing and subscribing to bridge events
pub struct EventBus {
    /// Map of event types to their broadcast senders
    listeners: DashMap<EventType, broadcast::Sender<Event<serde_json::Value>>>,
    /// Sender for match-all subscribers
    match_all_sender: broadcast::Sender<Event<serde_json::Value>>,
    /// Channel capacity
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (match_all_sender, _) = broadcast::channel(capacity);
        Self {
            listeners: DashMap::new(),
            match_all_sender,
            capacity,
        }
    }

    /// Subscribe to events of a specific type
    pub fn subscribe(
        &self,
        event_type: impl Into<EventType>,
    ) -> broadcast::Receiver<Event<serde_json::Value>> {
        let event_type = event_type.into();
        trace!(event_type = %event_type, "Subscribing to event type");

        if event_type.is_match_all() {
            return self.match_all_sender.subscribe();
        }

        self.listeners
            .entry(event_type)
            .or_insert_with(|| {
                let (tx, _) = broadcast::channel(self.capacity);
                tx
            })
            .subscribe()
    }

    /// Subscribe to a typed event, receiving parsed payloads
    pub fn subscribe_typed<T: EventData + serde::de::DeserializeOwned>(
        &self,
    ) -> TypedEventReceiver<T> {
        TypedEventReceiver::new(self.subscribe(T::event_type()))
    }

    /// Subscribe to all events
    pub fn subscribe_all(&self) -> broadcast::Receiver<Event<serde_json::Value>> {
        self.match_all_sender.subscribe()
    }

    /// Fire an event to all subscribers of its type and to match-all
    /// subscribers. Send errors only mean there are no active receivers.
    pub fn fire(&self, event: Event<serde_json::Value>) {
        debug!(event_type = %event.event_type, "Firing event");

        if let Some(sender) = self.listeners.get(&event.event_type) {
            let _ = sender.send(event.clone());
        }
        let _ = self.match_all_sender.send(event);
    }

    /// Fire a typed event
    pub fn fire_typed<T: EventData + serde::Serialize>(&self, data: T, context: Context) {
        let json_data = serde_json::to_value(&data).unwrap_or_default();
        self.fire(Event::new(T::event_type(), json_data, context));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A receiver yielding parsed payloads for a typed event
pub struct TypedEventReceiver<T> {
    rx: broadcast::Receiver<Event<serde_json::Value>>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: EventData + serde::de::DeserializeOwned> TypedEventReceiver<T> {
    fn new(rx: broadcast::Receiver<Event<serde_json::Value>>) -> Self {
        Self {
            rx,
            _phantom: std::marker::PhantomData,
        }
    }

    /// Receive the next typed event, skipping payloads that fail to parse
    pub async fn recv(&mut self) -> Result<Event<T>, broadcast::error::RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if let Ok(data) = serde_json::from_value::<T>(event.data.clone()) {
                return Ok(Event {
                    event_type: event.event_type,
                    data,
                    time_fired: event.time_fired,
                    context: event.context,
                });
            }
        }
    }
}

/// Thread-safe wrapper for EventBus
pub type SharedEventBus = Arc<EventBus>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct ButtonPressed {
        id: String,
    }

    impl EventData for ButtonPressed {
        fn event_type() -> &'static str {
            "button_pressed"
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_fire() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe("radiora2_event");

        bus.fire(Event::new(
            "radiora2_event",
            json!({"action": "press"}),
            Context::new(),
        ));

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type.as_str(), "radiora2_event");
        assert_eq!(received.data["action"], "press");
    }

    #[tokio::test]
    async fn test_typed_subscription() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_typed::<ButtonPressed>();

        bus.fire_typed(
            ButtonPressed {
                id: "kitchen_keypad_1".to_string(),
            },
            Context::new(),
        );

        let received = rx.recv().await.unwrap();
        assert_eq!(received.data.id, "kitchen_keypad_1");
    }

    #[tokio::test]
    async fn test_match_all_subscription() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_all();

        bus.fire(Event::new("event_a", json!({}), Context::new()));
        bus.fire(Event::new("event_b", json!({}), Context::new()));

        assert_eq!(rx.recv().await.unwrap().event_type.as_str(), "event_a");
        assert_eq!(rx.recv().await.unwrap().event_type.as_str(), "event_b");
    }

    #[tokio::test]
    async fn test_no_cross_event_pollution() {
        let bus = EventBus::new();
        let mut rx_a = bus.subscribe("event_a");
        let mut rx_b = bus.subscribe("event_b");

        bus.fire(Event::new("event_a", json!({"t": "a"}), Context::new()));

        let received = rx_a.recv().await.unwrap();
        assert_eq!(received.data["t"], "a");
        assert!(rx_b.try_recv().is_err());
    }
}
