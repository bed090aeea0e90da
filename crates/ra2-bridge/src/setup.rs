//! Controller setup and teardown
//!
//! One call per configured controller: load the registries, pull the
//! topology (off the async scheduler, the client may block), migrate
//! stored identifiers, then register and attach every entity. The
//! returned handle owns the attached entities until unload.

use std::path::Path;
use std::sync::Arc;

use ra2_client::{Client, ClientError};
use ra2_core::{Platform, SharedEventBus, DOMAIN};
use ra2_registries::{DeviceIdentifier, Registries, StorageError};
use thiserror::Error;
use tracing::{info, warn};

use crate::classify::{classify, ControllerData};
use crate::config::{BridgeConfig, DATA_FILE};
use crate::entity::{composite_unique_id, BridgeEntity};
use crate::migrate::run_pre_setup_migrations;
use crate::platforms::{
    binary_sensor::OccupancySensor,
    cover::Cover,
    event::{button_display_name, ButtonEvent},
    fan::Fan,
    light::{LedLight, Light},
    scene::Scene,
    sensor::VariableSensor,
    switch::Switch,
};
use ra2_client::output_type;
use ra2_core::slugify;

/// Errors surfaced by setup and unload
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("controller error: {0}")]
    Client(#[from] ClientError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("task error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// A running controller bridge; dropping it without `unload` leaks
/// monitor subscriptions
pub struct BridgeHandle {
    entry_id: String,
    client: Arc<Client>,
    registries: Arc<Registries>,
    entities: Vec<Box<dyn BridgeEntity>>,
}

impl BridgeHandle {
    pub fn entry_id(&self) -> &str {
        &self.entry_id
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entity_ids(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.entity_id()).collect()
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    /// Detach every entity and persist the registries
    pub async fn unload(self) -> Result<(), SetupError> {
        for entity in &self.entities {
            entity.detach();
        }
        info!(entry_id = %self.entry_id, "Unloaded controller bridge");
        self.registries.save_all().await?;
        Ok(())
    }
}

/// Set up one controller from its config entry
pub async fn setup_entry(
    entry_id: &str,
    config: &BridgeConfig,
    client: Arc<Client>,
    registries: Arc<Registries>,
    bus: SharedEventBus,
    config_dir: &Path,
) -> Result<BridgeHandle, SetupError> {
    registries.load_all().await?;

    let blocking_client = Arc::clone(&client);
    let cache_file = config_dir.join(DATA_FILE);
    let refresh = config.refresh_data;
    let variable_ids = config.variable_ids.clone();
    tokio::task::spawn_blocking(move || -> Result<(), ClientError> {
        blocking_client.load_topology(&cache_file, refresh, &variable_ids)?;
        blocking_client.connect()
    })
    .await??;

    let topology = client.topology()?;
    let guid = topology.guid.clone();
    let data = classify(&topology, config);
    info!(
        guid = %guid,
        lights = data.lights.len(),
        switches = data.switches.len(),
        covers = data.covers.len(),
        fans = data.fans.len(),
        scenes = data.scenes.len(),
        buttons = data.buttons.len(),
        "Classified controller topology"
    );

    run_pre_setup_migrations(&data, &registries.entities, &registries.devices, &guid);
    if !config.fan_compat_lights {
        remove_compat_light_registrations(&data, &registries, &guid);
    }

    let repeater = registries.devices.get_or_create(
        &[DeviceIdentifier::new(DOMAIN, &guid)],
        Some(entry_id),
        "Main repeater",
        Some("Lutron"),
    );

    let factory = EntityFactory {
        entry_id,
        registries: &registries,
        guid: &guid,
    };

    let mut entities: Vec<Box<dyn BridgeEntity>> = Vec::new();

    for binding in &data.lights {
        if binding.output.output_type == output_type::CEILING_FAN_TYPE {
            warn!(
                output = %binding.output.name,
                "Registering ceiling fan as a light for compatibility; \
                 prefer the fan entity and disable fan_compat_lights"
            );
        }
        let (entity_id, _) = factory.output_entity(Platform::Light, binding);
        entities.push(Box::new(Light::new(
            entity_id,
            Arc::clone(&client),
            Arc::clone(&binding.output),
            Arc::clone(&bus),
        )));
    }

    for binding in &data.switches {
        let (entity_id, _) = factory.output_entity(Platform::Switch, binding);
        entities.push(Box::new(Switch::new(
            entity_id,
            Arc::clone(&client),
            Arc::clone(&binding.output),
            Arc::clone(&bus),
        )));
    }

    for binding in &data.covers {
        let (entity_id, _) = factory.output_entity(Platform::Cover, binding);
        entities.push(Box::new(Cover::new(
            entity_id,
            Arc::clone(&client),
            Arc::clone(&binding.output),
            Arc::clone(&bus),
        )));
    }

    for binding in &data.fans {
        let (entity_id, _) = factory.output_entity(Platform::Fan, binding);
        entities.push(Box::new(Fan::new(
            entity_id,
            Arc::clone(&client),
            Arc::clone(&binding.output),
            Arc::clone(&bus),
        )));
    }

    for binding in &data.scenes {
        let entity_id = factory.entity(
            Platform::Scene,
            &slugify(&format!(
                "{} {}: {}",
                binding.area_name, binding.keypad.name, binding.button.name
            )),
            &composite_unique_id(&guid, &binding.button.uuid, &binding.button.legacy_uuid),
            None,
        );
        entities.push(Box::new(Scene::new(
            entity_id,
            Arc::clone(&client),
            Arc::clone(&binding.keypad),
            Arc::clone(&binding.button),
            Arc::clone(&bus),
        )));
    }

    for binding in &data.leds {
        let entity_id = factory.entity(
            Platform::Light,
            &slugify(&format!(
                "{} {}: {}",
                binding.area_name, binding.keypad.name, binding.led.name
            )),
            &composite_unique_id(&guid, &binding.led.uuid, &binding.led.legacy_uuid),
            None,
        );
        entities.push(Box::new(LedLight::new(
            entity_id,
            Arc::clone(&client),
            Arc::clone(&binding.keypad),
            Arc::clone(&binding.led),
            Arc::clone(&bus),
        )));
    }

    for binding in &data.buttons {
        let entity_id = factory.entity(
            Platform::Event,
            &slugify(&format!(
                "{} {}: {}",
                binding.area_name,
                binding.keypad.name,
                button_display_name(&binding.button)
            )),
            &composite_unique_id(&guid, &binding.button.uuid, &binding.button.legacy_uuid),
            None,
        );
        entities.push(Box::new(ButtonEvent::new(
            entity_id,
            Arc::clone(&client),
            &binding.area_name,
            Arc::clone(&binding.keypad),
            Arc::clone(&binding.button),
            Arc::clone(&bus),
        )));
    }

    for binding in &data.binary_sensors {
        let unique_id =
            composite_unique_id(&guid, &binding.group.uuid, &binding.group.legacy_uuid);
        let device = registries.devices.get_or_create(
            &[DeviceIdentifier::new(DOMAIN, &unique_id)],
            Some(entry_id),
            &format!("{} occupancy", binding.area_name),
            Some("Lutron"),
        );
        let entity_id = factory.entity(
            Platform::BinarySensor,
            &slugify(&format!("{} occupancy", binding.area_name)),
            &unique_id,
            Some(&device.id),
        );
        entities.push(Box::new(OccupancySensor::new(
            entity_id,
            Arc::clone(&client),
            Arc::clone(&binding.group),
            Arc::clone(&bus),
        )));
    }

    for binding in &data.variables {
        let entity_id = factory.entity(
            Platform::Sensor,
            &slugify(&binding.name),
            &composite_unique_id(
                &guid,
                &binding.variable.uuid,
                &binding.variable.legacy_uuid,
            ),
            Some(&repeater.id),
        );
        entities.push(Box::new(VariableSensor::new(
            entity_id,
            Arc::clone(&client),
            Arc::clone(&binding.variable),
            Arc::clone(&bus),
        )));
    }

    for entity in &entities {
        entity.attach()?;
    }
    info!(
        entry_id = %entry_id,
        guid = %guid,
        entities = entities.len(),
        "Controller bridge is up"
    );

    registries.save_all().await?;

    Ok(BridgeHandle {
        entry_id: entry_id.to_string(),
        client,
        registries,
        entities,
    })
}

/// Drop stale fan-as-light registrations once the compat flag is off
fn remove_compat_light_registrations(data: &ControllerData, registries: &Registries, guid: &str) {
    for binding in &data.fans {
        let unique_id =
            composite_unique_id(guid, &binding.output.uuid, &binding.output.legacy_uuid);
        if let Some(entity_id) =
            registries
                .entities
                .get_entity_id(Platform::Light.as_str(), DOMAIN, &unique_id)
        {
            info!(entity_id = %entity_id, "Removing compatibility light for ceiling fan");
            registries.entities.remove(&entity_id);
        }
    }
}

struct EntityFactory<'a> {
    entry_id: &'a str,
    registries: &'a Registries,
    guid: &'a str,
}

impl EntityFactory<'_> {
    /// Register an output entity along with its backing device
    fn output_entity(
        &self,
        platform: Platform,
        binding: &crate::classify::OutputBinding,
    ) -> (String, String) {
        let output = &binding.output;
        let unique_id = composite_unique_id(self.guid, &output.uuid, &output.legacy_uuid);
        let device = self.registries.devices.get_or_create(
            &[DeviceIdentifier::new(DOMAIN, &unique_id)],
            Some(self.entry_id),
            &binding.device_name,
            Some("Lutron"),
        );
        let entity_id = self.entity(
            platform,
            &slugify(&format!("{} {}", binding.area_name, output.name)),
            &unique_id,
            Some(&device.id),
        );
        (entity_id, device.id.clone())
    }

    fn entity(
        &self,
        platform: Platform,
        suggested_object_id: &str,
        unique_id: &str,
        device_id: Option<&str>,
    ) -> String {
        self.registries
            .entities
            .get_or_create(
                DOMAIN,
                platform.as_str(),
                suggested_object_id,
                Some(unique_id),
                device_id,
            )
            .entity_id
            .clone()
    }
}
