//! Ceiling fan outputs

use std::sync::{Arc, Mutex};

use ra2_client::{Client, ClientError, DeviceEvent, Output, SubscriptionId};
use ra2_core::SharedEventBus;
use serde_json::json;

use crate::entity::BridgeEntity;
use crate::platforms::fire_state_changed;

#[derive(Debug, Default)]
struct FanState {
    percentage: u8,
    prev_percentage: Option<u8>,
}

/// A ceiling fan output, controlled as a 0-100 percentage
pub struct Fan {
    entity_id: String,
    client: Arc<Client>,
    output: Arc<Output>,
    bus: SharedEventBus,
    state: Arc<Mutex<FanState>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl Fan {
    pub fn new(
        entity_id: impl Into<String>,
        client: Arc<Client>,
        output: Arc<Output>,
        bus: SharedEventBus,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            client,
            output,
            bus,
            state: Arc::new(Mutex::new(FanState::default())),
            subscription: Mutex::new(None),
        }
    }

    pub fn percentage(&self) -> u8 {
        self.state.lock().map(|s| s.percentage).unwrap_or(0)
    }

    pub fn is_on(&self) -> bool {
        self.percentage() > 0
    }

    /// Turn on at the last seen speed, full speed when none was seen
    pub fn turn_on(&self, percentage: Option<u8>) -> Result<(), ClientError> {
        let percentage = match percentage {
            Some(value) => value,
            None => match self.state.lock().ok().and_then(|s| s.prev_percentage) {
                Some(value) if value > 0 => value,
                _ => 100,
            },
        };
        self.set_percentage(percentage)
    }

    pub fn turn_off(&self) -> Result<(), ClientError> {
        self.set_percentage(0)
    }

    pub fn set_percentage(&self, percentage: u8) -> Result<(), ClientError> {
        let percentage = percentage.min(100);
        if let Ok(mut state) = self.state.lock() {
            if percentage > 0 {
                state.prev_percentage = Some(percentage);
            }
        }
        self.client
            .set_level(&self.output, f64::from(percentage), None)
    }
}

impl BridgeEntity for Fan {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn attach(&self) -> Result<(), ClientError> {
        let state = Arc::clone(&self.state);
        let bus = Arc::clone(&self.bus);
        let entity_id = self.entity_id.clone();
        let id = self.client.monitor().subscribe(
            self.output.legacy_uuid.clone(),
            Box::new(move |event| {
                if let DeviceEvent::LevelChanged(level) = event {
                    let percentage = level.clamp(0.0, 100.0) as u8;
                    if let Ok(mut state) = state.lock() {
                        if state.percentage > 0 {
                            state.prev_percentage = Some(state.percentage);
                        }
                        state.percentage = percentage;
                    }
                    fire_state_changed(
                        &bus,
                        &entity_id,
                        json!({"on": percentage > 0, "percentage": percentage}),
                    );
                }
            }),
        );
        if let Ok(mut slot) = self.subscription.lock() {
            *slot = Some(id);
        }
        self.client.query_output(&self.output)
    }

    fn detach(&self) {
        if let Some(id) = self.subscription.lock().ok().and_then(|mut s| s.take()) {
            self.client
                .monitor()
                .unsubscribe(&self.output.legacy_uuid, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::testing::{bus, client, RecordingTransport};
    use ra2_client::Command;

    fn ceiling_fan() -> Arc<Output> {
        Arc::new(Output {
            name: "Fan".to_string(),
            id: 21,
            uuid: String::new(),
            legacy_uuid: "21-0".to_string(),
            output_type: "CEILING_FAN_TYPE".to_string(),
            is_light: false,
            is_dimmable: true,
        })
    }

    #[test]
    fn test_percentage_commands() {
        let transport = RecordingTransport::new();
        let fan = Fan::new(
            "fan.porch_fan",
            client(Arc::clone(&transport)),
            ceiling_fan(),
            bus(),
        );

        fan.set_percentage(25).unwrap();
        fan.turn_off().unwrap();
        // Last nonzero speed is restored
        fan.turn_on(None).unwrap();

        let sent = transport.sent();
        assert_eq!(
            sent[0],
            Command::SetLevel {
                output_id: 21,
                level: 25.0,
                fade_time: None,
            }
        );
        assert_eq!(
            sent[1],
            Command::SetLevel {
                output_id: 21,
                level: 0.0,
                fade_time: None,
            }
        );
        assert_eq!(
            sent[2],
            Command::SetLevel {
                output_id: 21,
                level: 25.0,
                fade_time: None,
            }
        );
    }

    #[test]
    fn test_turn_on_without_history_is_full_speed() {
        let transport = RecordingTransport::new();
        let fan = Fan::new(
            "fan.porch_fan",
            client(Arc::clone(&transport)),
            ceiling_fan(),
            bus(),
        );

        fan.turn_on(None).unwrap();

        assert_eq!(
            transport.sent()[0],
            Command::SetLevel {
                output_id: 21,
                level: 100.0,
                fade_time: None,
            }
        );
    }

    #[test]
    fn test_state_follows_pushes() {
        let transport = RecordingTransport::new();
        let client = client(Arc::clone(&transport));
        let fan = Fan::new("fan.porch_fan", Arc::clone(&client), ceiling_fan(), bus());

        fan.attach().unwrap();
        client.monitor().dispatch("21-0", &DeviceEvent::LevelChanged(75.0));

        assert!(fan.is_on());
        assert_eq!(fan.percentage(), 75);
    }
}
