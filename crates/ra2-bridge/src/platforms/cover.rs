//! Shade and motor outputs

use std::sync::{Arc, Mutex};

use ra2_client::{Client, ClientError, DeviceEvent, Output, SubscriptionId};
use ra2_core::SharedEventBus;
use serde_json::json;

use crate::entity::BridgeEntity;
use crate::platforms::fire_state_changed;

/// A shade or motorized output, positionable 0-100
pub struct Cover {
    entity_id: String,
    client: Arc<Client>,
    output: Arc<Output>,
    bus: SharedEventBus,
    position: Arc<Mutex<u8>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl Cover {
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
            position: Arc::new(Mutex::new(0)),
            subscription: Mutex::new(None),
        }
    }

    /// Current position, 0 closed to 100 open
    pub fn position(&self) -> u8 {
        self.position.lock().map(|p| *p).unwrap_or(0)
    }

    /// Closed means fully down; anything under one percent counts
    pub fn is_closed(&self) -> bool {
        self.position() < 1
    }

    pub fn open(&self) -> Result<(), ClientError> {
        self.client.set_level(&self.output, 100.0, None)
    }

    pub fn close(&self) -> Result<(), ClientError> {
        self.client.set_level(&self.output, 0.0, None)
    }

    pub fn set_position(&self, position: u8) -> Result<(), ClientError> {
        self.client
            .set_level(&self.output, f64::from(position.min(100)), None)
    }
}

impl BridgeEntity for Cover {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn attach(&self) -> Result<(), ClientError> {
        let position = Arc::clone(&self.position);
        let bus = Arc::clone(&self.bus);
        let entity_id = self.entity_id.clone();
        let id = self.client.monitor().subscribe(
            self.output.legacy_uuid.clone(),
            Box::new(move |event| {
                if let DeviceEvent::LevelChanged(level) = event {
                    let new_position = level.clamp(0.0, 100.0) as u8;
                    if let Ok(mut slot) = position.lock() {
                        *slot = new_position;
                    }
                    fire_state_changed(
                        &bus,
                        &entity_id,
                        json!({"position": new_position, "closed": new_position < 1}),
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
