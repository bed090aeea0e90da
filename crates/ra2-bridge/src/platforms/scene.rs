//! Keypad scene buttons

use std::sync::{Arc, Mutex};

use ra2_client::{Button, ButtonAction, Client, ClientError, DeviceEvent, Keypad, SubscriptionId};
use ra2_core::SharedEventBus;
use serde_json::json;

use crate::entity::BridgeEntity;
use crate::platforms::fire_state_changed;

/// A programmed keypad button exposed as an activatable scene
pub struct Scene {
    entity_id: String,
    client: Arc<Client>,
    keypad: Arc<Keypad>,
    button: Arc<Button>,
    bus: SharedEventBus,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl Scene {
    pub fn new(
        entity_id: impl Into<String>,
        client: Arc<Client>,
        keypad: Arc<Keypad>,
        button: Arc<Button>,
        bus: SharedEventBus,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            client,
            keypad,
            button,
            bus,
            subscription: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.button.name
    }

    /// Activate by pressing the underlying keypad button
    pub fn activate(&self) -> Result<(), ClientError> {
        self.client.press_button(&self.keypad, &self.button)
    }
}

impl BridgeEntity for Scene {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn attach(&self) -> Result<(), ClientError> {
        let bus = Arc::clone(&self.bus);
        let entity_id = self.entity_id.clone();
        let id = self.client.monitor().subscribe(
            self.button.legacy_uuid.clone(),
            Box::new(move |event| {
                // Presses at the physical keypad surface as activations too
                if let DeviceEvent::ButtonAction(ButtonAction::Press) = event {
                    fire_state_changed(&bus, &entity_id, json!({"activated": true}));
                }
            }),
        );
        if let Ok(mut slot) = self.subscription.lock() {
            *slot = Some(id);
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
    use ra2_client::Command;

    #[test]
    fn test_activate_presses_the_button() {
        let transport = RecordingTransport::new();
        let (keypad, button, _led) = keypad_with_button("SingleAction");
        let scene = Scene::new(
            "scene.entry_keypad_dinner",
            client(Arc::clone(&transport)),
            keypad,
            button,
            bus(),
        );

        scene.activate().unwrap();

        assert_eq!(
            transport.sent()[0],
            Command::PressButton {
                keypad_id: 16,
                component: 1,
            }
        );
    }

    #[test]
    fn test_attach_detach_subscription_lifecycle() {
        let transport = RecordingTransport::new();
        let client = client(Arc::clone(&transport));
        let (keypad, button, _led) = keypad_with_button("SingleAction");
        let scene = Scene::new(
            "scene.entry_keypad_dinner",
            Arc::clone(&client),
            keypad,
            button,
            bus(),
        );

        scene.attach().unwrap();
        assert_eq!(client.monitor().subscriber_count("16-1"), 1);

        scene.detach();
        assert_eq!(client.monitor().subscriber_count("16-1"), 0);
    }
}
