//! Area occupancy sensors

use std::sync::{Arc, Mutex};

use ra2_client::{Client, ClientError, DeviceEvent, OccupancyGroup, SubscriptionId};
use ra2_core::SharedEventBus;
use serde_json::json;

use crate::entity::BridgeEntity;
use crate::platforms::fire_state_changed;

/// One area's occupancy group, exposed as an occupancy binary sensor
///
/// The controller only pushes transitions; there is no query command, so
/// the state is unknown-as-vacant until the first push arrives.
pub struct OccupancySensor {
    entity_id: String,
    client: Arc<Client>,
    group: Arc<OccupancyGroup>,
    bus: SharedEventBus,
    occupied: Arc<Mutex<bool>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl OccupancySensor {
    pub fn new(
        entity_id: impl Into<String>,
        client: Arc<Client>,
        group: Arc<OccupancyGroup>,
        bus: SharedEventBus,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            client,
            group,
            bus,
            occupied: Arc::new(Mutex::new(false)),
            subscription: Mutex::new(None),
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied.lock().map(|o| *o).unwrap_or(false)
    }
}

impl BridgeEntity for OccupancySensor {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn attach(&self) -> Result<(), ClientError> {
        let occupied = Arc::clone(&self.occupied);
        let bus = Arc::clone(&self.bus);
        let entity_id = self.entity_id.clone();
        let id = self.client.monitor().subscribe(
            self.group.legacy_uuid.clone(),
            Box::new(move |event| {
                if let DeviceEvent::OccupancyChanged(state) = event {
                    if let Ok(mut slot) = occupied.lock() {
                        *slot = *state;
                    }
                    fire_state_changed(&bus, &entity_id, json!({"occupied": state}));
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
                .unsubscribe(&self.group.legacy_uuid, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::testing::{bus, client, RecordingTransport};

    fn group() -> Arc<OccupancyGroup> {
        Arc::new(OccupancyGroup {
            name: "Den Occupancy".to_string(),
            id: 5,
            uuid: String::new(),
            legacy_uuid: "occ-5".to_string(),
        })
    }

    #[test]
    fn test_occupancy_transitions() {
        let transport = RecordingTransport::new();
        let client = client(Arc::clone(&transport));
        let sensor = OccupancySensor::new(
            "binary_sensor.den_occupancy",
            Arc::clone(&client),
            group(),
            bus(),
        );

        sensor.attach().unwrap();
        assert!(!sensor.is_occupied());
        // Occupancy has no query command
        assert!(transport.sent().is_empty());

        client
            .monitor()
            .dispatch("occ-5", &DeviceEvent::OccupancyChanged(true));
        assert!(sensor.is_occupied());

        client
            .monitor()
            .dispatch("occ-5", &DeviceEvent::OccupancyChanged(false));
        assert!(!sensor.is_occupied());
    }

    #[test]
    fn test_detach_unsubscribes() {
        let transport = RecordingTransport::new();
        let client = client(transport);
        let sensor = OccupancySensor::new(
            "binary_sensor.den_occupancy",
            Arc::clone(&client),
            group(),
            bus(),
        );

        sensor.attach().unwrap();
        sensor.detach();
        assert_eq!(client.monitor().subscriber_count("occ-5"), 0);
    }
}
