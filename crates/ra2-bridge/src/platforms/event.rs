//! Keypad button events
//!
//! Raw button interactions are not state; they surface on the event bus
//! as `radiora2_event` payloads, one entity per typed button.

use std::sync::{Arc, Mutex};

use ra2_client::{Button, ButtonAction, Client, ClientError, DeviceEvent, Keypad, SubscriptionId};
use ra2_core::{slugify, Context, EventData, SharedEventBus};
use serde::{Deserialize, Serialize};

use crate::classify::PLACEHOLDER_BUTTON_NAME;
use crate::entity::BridgeEntity;

/// Interaction kinds carried in the event payload
///
/// `SinglePress` stays in the legacy tag table but no controller
/// interaction maps to it; presses always surface as `Press`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEventType {
    SinglePress,
    Press,
    Release,
    Hold,
    HoldRelease,
    DoubleTap,
}

impl ButtonEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SinglePress => "single_press",
            Self::Press => "press",
            Self::Release => "release",
            Self::Hold => "hold",
            Self::HoldRelease => "hold_release",
            Self::DoubleTap => "double_tap",
        }
    }

    /// Action tag used in bus payloads; the legacy table names a single
    /// press `single`
    pub fn bus_tag(&self) -> &'static str {
        match self {
            Self::SinglePress => "single",
            _ => self.as_str(),
        }
    }
}

/// Display name for a button; placeholder names get the slot number
/// appended to stay distinguishable on multi-button keypads
pub fn button_display_name(button: &Button) -> String {
    if button.name == PLACEHOLDER_BUTTON_NAME {
        format!("{} {}", button.name, button.number)
    } else {
        button.name.clone()
    }
}

/// Bus payload for one button interaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ButtonEventData {
    /// Slug of the keypad and button names
    pub id: String,
    pub action: String,
    /// Slug including the area name, unique across the controller
    pub full_id: String,
    pub uuid: String,
}

impl EventData for ButtonEventData {
    fn event_type() -> &'static str {
        "radiora2_event"
    }
}

/// Map a controller interaction onto the payload action, regardless of
/// the button's interaction style
fn event_type_for(action: ButtonAction) -> ButtonEventType {
    match action {
        ButtonAction::Press => ButtonEventType::Press,
        ButtonAction::Release => ButtonEventType::Release,
        ButtonAction::Hold => ButtonEventType::Hold,
        ButtonAction::HoldRelease => ButtonEventType::HoldRelease,
        ButtonAction::DoubleTap => ButtonEventType::DoubleTap,
    }
}

/// One typed keypad button, firing bus events on interaction
pub struct ButtonEvent {
    entity_id: String,
    client: Arc<Client>,
    keypad: Arc<Keypad>,
    button: Arc<Button>,
    bus: SharedEventBus,
    id: String,
    full_id: String,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl ButtonEvent {
    pub fn new(
        entity_id: impl Into<String>,
        client: Arc<Client>,
        area_name: &str,
        keypad: Arc<Keypad>,
        button: Arc<Button>,
        bus: SharedEventBus,
    ) -> Self {
        let name = button_display_name(&button);
        let id = slugify(&format!("{}: {}", keypad.name, name));
        let full_id = slugify(&format!("{} {}: {}", area_name, keypad.name, name));
        Self {
            entity_id: entity_id.into(),
            client,
            keypad,
            button,
            bus,
            id,
            full_id,
            subscription: Mutex::new(None),
        }
    }

    pub fn full_id(&self) -> &str {
        &self.full_id
    }
}

impl BridgeEntity for ButtonEvent {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn attach(&self) -> Result<(), ClientError> {
        let bus = Arc::clone(&self.bus);
        let id = self.id.clone();
        let full_id = self.full_id.clone();
        let uuid = if self.button.uuid.is_empty() {
            self.button.legacy_uuid.clone()
        } else {
            self.button.uuid.clone()
        };
        let subscription = self.client.monitor().subscribe(
            self.button.legacy_uuid.clone(),
            Box::new(move |event| {
                let DeviceEvent::ButtonAction(action) = event else {
                    return;
                };
                let event_type = event_type_for(*action);
                bus.fire_typed(
                    ButtonEventData {
                        id: id.clone(),
                        action: event_type.bus_tag().to_string(),
                        full_id: full_id.clone(),
                        uuid: uuid.clone(),
                    },
                    Context::new(),
                );
            }),
        );
        if let Ok(mut slot) = self.subscription.lock() {
            *slot = Some(subscription);
        }
        Ok(())
    }

    fn detach(&self) {
        if let Some(id) = self.subscription.lock().ok().and_then(|mut s| s.take()) {
            self.client
                .monitor()
                .unsubscribe(&self.button.legacy_uuid, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::testing::{bus, client, keypad_with_button, RecordingTransport};

    fn entity(
        client: &Arc<Client>,
        bus: &SharedEventBus,
        button_type: &str,
    ) -> ButtonEvent {
        let (keypad, button, _led) = keypad_with_button(button_type);
        ButtonEvent::new(
            "event.entry_keypad_dinner",
            Arc::clone(client),
            "Kitchen",
            keypad,
            button,
            Arc::clone(bus),
        )
    }

    #[test]
    fn test_slug_ids() {
        let transport = RecordingTransport::new();
        let entity = entity(&client(transport), &bus(), "SingleAction");
        assert_eq!(entity.id, "entry_keypad_dinner");
        assert_eq!(entity.full_id(), "kitchen_entry_keypad_dinner");
    }

    #[test]
    fn test_placeholder_button_gets_numbered_name() {
        let named = Button {
            name: "Dinner".to_string(),
            number: 1,
            uuid: String::new(),
            legacy_uuid: "16-1".to_string(),
            button_type: Some("SingleAction".to_string()),
            led_logic: None,
        };
        assert_eq!(button_display_name(&named), "Dinner");

        let placeholder = Button {
            name: PLACEHOLDER_BUTTON_NAME.to_string(),
            number: 4,
            ..named
        };
        assert_eq!(button_display_name(&placeholder), "Unknown Button 4");
    }

    #[test]
    fn test_legacy_tags() {
        assert_eq!(ButtonEventType::SinglePress.bus_tag(), "single");
        assert_eq!(ButtonEventType::Press.bus_tag(), "press");
        assert_eq!(ButtonEventType::HoldRelease.bus_tag(), "hold_release");
    }

    #[tokio::test]
    async fn test_press_and_release_fire_for_every_button_type() {
        let transport = RecordingTransport::new();
        let client = client(transport);
        let bus = bus();
        // Single-action buttons report press and release like any other
        let entity = entity(&client, &bus, "SingleAction");
        let mut rx = bus.subscribe_typed::<ButtonEventData>();

        entity.attach().unwrap();
        client
            .monitor()
            .dispatch("16-1", &DeviceEvent::ButtonAction(ButtonAction::Press));
        client
            .monitor()
            .dispatch("16-1", &DeviceEvent::ButtonAction(ButtonAction::Release));
        client
            .monitor()
            .dispatch("16-1", &DeviceEvent::ButtonAction(ButtonAction::DoubleTap));

        let press = rx.recv().await.unwrap();
        assert_eq!(press.data.action, "press");
        assert_eq!(press.data.id, "entry_keypad_dinner");
        assert_eq!(press.data.uuid, "16-1");

        let release = rx.recv().await.unwrap();
        assert_eq!(release.data.action, "release");

        let tap = rx.recv().await.unwrap();
        assert_eq!(tap.data.action, "double_tap");
    }

    #[test]
    fn test_detach_unsubscribes() {
        let transport = RecordingTransport::new();
        let client = client(transport);
        let bus = bus();
        let entity = entity(&client, &bus, "SingleAction");

        entity.attach().unwrap();
        entity.detach();
        assert_eq!(client.monitor().subscriber_count("16-1"), 0);
    }
}
