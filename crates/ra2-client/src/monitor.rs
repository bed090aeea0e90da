//! Push-subscription hub for device state changes
//!
//! The transport's receive loop dispatches decoded device events here;
//! entities subscribe per device. Lifetime contract: subscribe on entity
//! attach, unsubscribe on detach, exactly once each. Dispatch after
//! unsubscribe never reaches the removed callback.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A state-change or interaction event for a single device
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    /// Output level changed (0.0-100.0)
    LevelChanged(f64),
    /// Variable value changed
    StateChanged(i64),
    /// Keypad LED turned on or off
    LedChanged(bool),
    /// Keypad button interaction
    ButtonAction(ButtonAction),
    /// Occupancy group became occupied or vacant
    OccupancyChanged(bool),
}

/// Button interactions reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    Press,
    Release,
    Hold,
    HoldRelease,
    DoubleTap,
}

/// Callback invoked for every event of the subscribed device
pub type SubscriberCallback = Box<dyn Fn(&DeviceEvent) + Send + Sync>;

/// Handle identifying one subscription, required to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Fan-out of device events to subscribed entities
///
/// Keyed by the device's `legacy_uuid`, which is unique per controller
/// object and always present.
pub struct MonitorHub {
    subscribers: DashMap<String, Vec<(SubscriptionId, Arc<SubscriberCallback>)>>,
    next_id: AtomicU64,
}

impl MonitorHub {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback for a device key
    pub fn subscribe(&self, key: impl Into<String>, callback: SubscriberCallback) -> SubscriptionId {
        let key = key.into();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        trace!(device = %key, subscription = id.0, "Subscribing");
        self.subscribers
            .entry(key)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Remove a previously registered callback
    ///
    /// Returns false when the subscription was already removed.
    pub fn unsubscribe(&self, key: &str, id: SubscriptionId) -> bool {
        let Some(mut entry) = self.subscribers.get_mut(key) else {
            warn!(device = %key, "Unsubscribe for unknown device");
            return false;
        };
        let before = entry.len();
        entry.retain(|(sub_id, _)| *sub_id != id);
        before != entry.len()
    }

    /// Deliver an event to every subscriber of a device key
    ///
    /// Returns the number of callbacks invoked. Callbacks run outside the
    /// map lock so they may subscribe or unsubscribe re-entrantly.
    pub fn dispatch(&self, key: &str, event: &DeviceEvent) -> usize {
        let callbacks: Vec<Arc<SubscriberCallback>> = match self.subscribers.get(key) {
            Some(entry) => entry.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            None => return 0,
        };

        debug!(device = %key, subscribers = callbacks.len(), ?event, "Dispatching device event");
        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    /// Number of active subscriptions for a device key
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.subscribers.get(key).map(|e| e.len()).unwrap_or(0)
    }
}

impl Default for MonitorHub {
    fn default() -> Self {
        Self::new()
    }
}
