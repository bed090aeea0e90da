//! Switched, non-light outputs

use std::sync::{Arc, Mutex};

use ra2_client::{Client, ClientError, DeviceEvent, Output, SubscriptionId};
use ra2_core::SharedEventBus;
use serde_json::json;

use crate::entity::BridgeEntity;
use crate::platforms::fire_state_changed;

/// A switched, non-light output
pub struct Switch {
    entity_id: String,
    client: Arc<Client>,
    output: Arc<Output>,
    bus: SharedEventBus,
    on: Arc<Mutex<bool>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl Switch {
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
            on: Arc::new(Mutex::new(false)),
            subscription: Mutex::new(None),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on.lock().map(|on| *on).unwrap_or(false)
    }

    pub fn turn_on(&self) -> Result<(), ClientError> {
        self.client.set_level(&self.output, 100.0, None)
    }

    pub fn turn_off(&self) -> Result<(), ClientError> {
        self.client.set_level(&self.output, 0.0, None)
    }
}

impl BridgeEntity for Switch {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn attach(&self) -> Result<(), ClientError> {
        let on = Arc::clone(&self.on);
        let bus = Arc::clone(&self.bus);
        let entity_id = self.entity_id.clone();
        let id = self.client.monitor().subscribe(
            self.output.legacy_uuid.clone(),
            Box::new(move |event| {
                if let DeviceEvent::LevelChanged(level) = event {
                    let is_on = *level > 0.0;
                    if let Ok(mut slot) = on.lock() {
                        *slot = is_on;
                    }
                    fire_state_changed(&bus, &entity_id, json!({"on": is_on}));
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
