//! Dimmer and switched-load lights, plus integration-driven keypad LEDs

use std::sync::{Arc, Mutex};

use ra2_client::{Client, ClientError, DeviceEvent, Keypad, Led, Output, SubscriptionId};
use ra2_core::SharedEventBus;
use serde_json::json;

use crate::entity::BridgeEntity;
use crate::level::{to_controller_level, to_host_level};
use crate::platforms::fire_state_changed;

/// Flash periods offered by the host light model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLength {
    Short,
    Long,
}

impl FlashLength {
    /// Flash period in seconds
    pub fn period(&self) -> f64 {
        match self {
            Self::Short => 0.5,
            Self::Long => 1.5,
        }
    }
}

#[derive(Debug, Default)]
struct LightState {
    brightness: u8,
    /// Brightness to restore when turned on without an explicit level
    prev_brightness: Option<u8>,
}

/// A dimmable or switched lighting output
pub struct Light {
    entity_id: String,
    client: Arc<Client>,
    output: Arc<Output>,
    bus: SharedEventBus,
    state: Arc<Mutex<LightState>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl Light {
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
            state: Arc::new(Mutex::new(LightState::default())),
            subscription: Mutex::new(None),
        }
    }

    pub fn output(&self) -> &Arc<Output> {
        &self.output
    }

    pub fn is_dimmable(&self) -> bool {
        self.output.is_dimmable
    }

    pub fn brightness(&self) -> u8 {
        self.state.lock().map(|s| s.brightness).unwrap_or(0)
    }

    pub fn is_on(&self) -> bool {
        self.brightness() > 0
    }

    /// Turn on, restoring the previous brightness when none is given.
    /// A light last seen off (or never seen at all) comes up at full
    /// brightness.
    pub fn turn_on(
        &self,
        brightness: Option<u8>,
        transition: Option<f64>,
    ) -> Result<(), ClientError> {
        let brightness = match brightness {
            Some(level) if self.output.is_dimmable => level,
            _ => match self.state.lock().ok().and_then(|s| s.prev_brightness) {
                Some(level) if level > 0 => level,
                _ => u8::MAX,
            },
        };
        if let Ok(mut state) = self.state.lock() {
            state.prev_brightness = Some(brightness);
        }
        self.client
            .set_level(&self.output, to_controller_level(brightness), transition)
    }

    pub fn turn_off(&self, transition: Option<f64>) -> Result<(), ClientError> {
        self.client.set_level(&self.output, 0.0, transition)
    }

    pub fn flash(&self, length: FlashLength) -> Result<(), ClientError> {
        self.client.flash(&self.output, length.period())
    }
}

impl BridgeEntity for Light {
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
                    let brightness = to_host_level(*level);
                    if let Ok(mut state) = state.lock() {
                        if state.brightness > 0 {
                            state.prev_brightness = Some(state.brightness);
                        }
                        state.brightness = brightness;
                    }
                    fire_state_changed(
                        &bus,
                        &entity_id,
                        json!({"on": brightness > 0, "brightness": brightness}),
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

/// A keypad LED driven by the integration rather than by the device,
/// exposed as an on/off light
pub struct LedLight {
    entity_id: String,
    client: Arc<Client>,
    keypad: Arc<Keypad>,
    led: Arc<Led>,
    bus: SharedEventBus,
    on: Arc<Mutex<bool>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl LedLight {
    pub fn new(
        entity_id: impl Into<String>,
        client: Arc<Client>,
        keypad: Arc<Keypad>,
        led: Arc<Led>,
        bus: SharedEventBus,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            client,
            keypad,
            led,
            bus,
            on: Arc::new(Mutex::new(false)),
            subscription: Mutex::new(None),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on.lock().map(|on| *on).unwrap_or(false)
    }

    pub fn turn_on(&self) -> Result<(), ClientError> {
        self.client.set_led_state(&self.keypad, &self.led, true)
    }

    pub fn turn_off(&self) -> Result<(), ClientError> {
        self.client.set_led_state(&self.keypad, &self.led, false)
    }
}

impl BridgeEntity for LedLight {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn attach(&self) -> Result<(), ClientError> {
        let on = Arc::clone(&self.on);
        let bus = Arc::clone(&self.bus);
        let entity_id = self.entity_id.clone();
        let id = self.client.monitor().subscribe(
            self.led.legacy_uuid.clone(),
            Box::new(move |event| {
                if let DeviceEvent::LedChanged(is_on) = event {
                    if let Ok(mut slot) = on.lock() {
                        *slot = *is_on;
                    }
                    fire_state_changed(&bus, &entity_id, json!({"on": is_on}));
                }
            }),
        );
        if let Ok(mut slot) = self.subscription.lock() {
            *slot = Some(id);
        }
        self.client.query_led(&self.keypad, &self.led)
    }

    fn detach(&self) {
        if let Some(id) = self.subscription.lock().ok().and_then(|mut s| s.take()) {
            self.client.monitor().unsubscribe(&self.led.legacy_uuid, id);
        }
    }
}
