//! Controller variable sensors

use std::sync::{Arc, Mutex};

use ra2_client::{Client, ClientError, DeviceEvent, SubscriptionId, Variable};
use ra2_core::SharedEventBus;
use serde_json::json;

use crate::entity::BridgeEntity;
use crate::platforms::fire_state_changed;

/// A controller-global variable exposed as a numeric sensor
pub struct VariableSensor {
    entity_id: String,
    client: Arc<Client>,
    variable: Arc<Variable>,
    bus: SharedEventBus,
    /// None until the first value arrives
    value: Arc<Mutex<Option<i64>>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl VariableSensor {
    pub fn new(
        entity_id: impl Into<String>,
        client: Arc<Client>,
        variable: Arc<Variable>,
        bus: SharedEventBus,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            client,
            variable,
            bus,
            value: Arc::new(Mutex::new(None)),
            subscription: Mutex::new(None),
        }
    }

    pub fn value(&self) -> Option<i64> {
        self.value.lock().ok().and_then(|v| *v)
    }
}

impl BridgeEntity for VariableSensor {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn attach(&self) -> Result<(), ClientError> {
        let value = Arc::clone(&self.value);
        let bus = Arc::clone(&self.bus);
        let entity_id = self.entity_id.clone();
        let id = self.client.monitor().subscribe(
            self.variable.legacy_uuid.clone(),
            Box::new(move |event| {
                if let DeviceEvent::StateChanged(state) = event {
                    if let Ok(mut slot) = value.lock() {
                        *slot = Some(*state);
                    }
                    fire_state_changed(&bus, &entity_id, json!({"value": state}));
                }
            }),
        );
        if let Ok(mut slot) = self.subscription.lock() {
            *slot = Some(id);
        }
        self.client.query_variable(&self.variable)
    }

    fn detach(&self) {
        if let Some(id) = self.subscription.lock().ok().and_then(|mut s| s.take()) {
            self.client
                .monitor()
                .unsubscribe(&self.variable.legacy_uuid, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::testing::{bus, client, RecordingTransport};
    use ra2_client::Command;

    fn variable() -> Arc<Variable> {
        Arc::new(Variable {
            name: "Vacation Mode".to_string(),
            id: 155,
            uuid: String::new(),
            legacy_uuid: "var-155".to_string(),
        })
    }

    #[test]
    fn test_value_is_unknown_until_first_push() {
        let transport = RecordingTransport::new();
        let client = client(Arc::clone(&transport));
        let sensor = VariableSensor::new(
            "sensor.vacation_mode",
            Arc::clone(&client),
            variable(),
            bus(),
        );

        sensor.attach().unwrap();
        assert_eq!(sensor.value(), None);
        assert_eq!(
            transport.sent()[0],
            Command::QueryVariable { variable_id: 155 }
        );

        client
            .monitor()
            .dispatch("var-155", &DeviceEvent::StateChanged(2));
        assert_eq!(sensor.value(), Some(2));
    }

    #[test]
    fn test_detach_unsubscribes() {
        let transport = RecordingTransport::new();
        let client = client(transport);
        let sensor = VariableSensor::new(
            "sensor.vacation_mode",
            Arc::clone(&client),
            variable(),
            bus(),
        );

        sensor.attach().unwrap();
        sensor.detach();
        assert_eq!(client.monitor().subscriber_count("var-155"), 0);
    }
}
