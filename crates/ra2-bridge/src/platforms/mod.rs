//! Platform entities
//!
//! One module per host platform. Entities hold `Arc` handles into the
//! vendor topology plus a client handle for commands; state updates
//! arrive through the monitor hub and are mirrored onto the event bus
//! as `state_changed` events.

pub mod binary_sensor;
pub mod cover;
pub mod event;
pub mod fan;
pub mod light;
pub mod scene;
pub mod sensor;
pub mod switch;

use ra2_core::{Context, SharedEventBus};

use crate::entity::StateChangedData;

pub(crate) fn fire_state_changed(
    bus: &SharedEventBus,
    entity_id: &str,
    new_state: serde_json::Value,
) {
    bus.fire_typed(
        StateChangedData {
            entity_id: entity_id.to_string(),
            new_state,
        },
        Context::new(),
    );
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use ra2_client::{
        Button, Client, ClientError, Command, Keypad, Led, Output, Topology, TopologyLoader,
        Transport,
    };
    use ra2_core::{EventBus, SharedEventBus};

    pub(crate) struct RecordingTransport {
        sent: Mutex<Vec<Command>>,
    }

    impl RecordingTransport {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                sent: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn sent(&self) -> Vec<Command> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn connect(&self) -> Result<(), ClientError> {
            Ok(())
        }

        fn send(&self, command: &Command) -> Result<(), ClientError> {
            self.sent.lock().unwrap().push(command.clone());
            Ok(())
        }
    }

    struct StaticLoader;

    impl TopologyLoader for StaticLoader {
        fn load(
            &self,
            _cache_file: &Path,
            _refresh: bool,
            _variable_ids: &[u32],
        ) -> Result<Topology, ClientError> {
            Ok(Topology {
                guid: "guid".to_string(),
                areas: Vec::new(),
                variables: Vec::new(),
            })
        }
    }

    pub(crate) fn client(transport: Arc<RecordingTransport>) -> Arc<Client> {
        Arc::new(Client::new(
            transport as Arc<dyn Transport>,
            Arc::new(StaticLoader),
        ))
    }

    pub(crate) fn bus() -> SharedEventBus {
        Arc::new(EventBus::new())
    }

    pub(crate) fn dimmer(id: u32) -> Arc<Output> {
        Arc::new(Output {
            name: "Sconce".to_string(),
            id,
            uuid: String::new(),
            legacy_uuid: format!("{id}-0"),
            output_type: "INC".to_string(),
            is_light: true,
            is_dimmable: true,
        })
    }

    pub(crate) fn shade(id: u32) -> Arc<Output> {
        Arc::new(Output {
            name: "Shade".to_string(),
            id,
            uuid: String::new(),
            legacy_uuid: format!("{id}-0"),
            output_type: "SYSTEM_SHADE".to_string(),
            is_light: false,
            is_dimmable: false,
        })
    }

    pub(crate) fn keypad_with_button(button_type: &str) -> (Arc<Keypad>, Arc<Button>, Arc<Led>) {
        let button = Arc::new(Button {
            name: "Dinner".to_string(),
            number: 1,
            uuid: String::new(),
            legacy_uuid: "16-1".to_string(),
            button_type: Some(button_type.to_string()),
            led_logic: Some(5),
        });
        let led = Arc::new(Led {
            name: "LED 1".to_string(),
            id: 81,
            number: 1,
            uuid: String::new(),
            legacy_uuid: "16-led-1".to_string(),
        });
        let keypad = Arc::new(Keypad {
            name: "Entry Keypad".to_string(),
            id: 16,
            uuid: String::new(),
            legacy_uuid: "16".to_string(),
            buttons: vec![Arc::clone(&button)],
            leds: vec![Arc::clone(&led)],
        });
        (keypad, button, led)
    }
}
