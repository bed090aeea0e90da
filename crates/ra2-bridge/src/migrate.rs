//! Unique-id migration
//!
//! Vendor objects carry two generations of stable identifiers: a
//! `legacy_uuid` and, on newer project databases, a preferred `uuid`.
//! Once the `uuid` becomes available, registrations keyed by the legacy
//! scheme are rewritten in place to the uuid scheme. The mapping is 1:1
//! and never reverses; a lookup miss means the registration was already
//! migrated (or never existed) and is a silent no-op, so the whole pass
//! is idempotent.
//!
//! Must run before entities are instantiated so registrations are looked
//! up under post-migration keys.

use ra2_core::{Platform, DOMAIN};
use ra2_registries::{DeviceIdentifier, DeviceRegistry, EntityRegistry};
use tracing::{debug, warn};

use crate::classify::ControllerData;
use ra2_client::output_type;

/// Re-key an entity registration from the legacy scheme to the uuid scheme
///
/// No-op unless `uuid` is non-empty and an entity is still registered
/// under the legacy key.
pub fn migrate_entity_unique_id(
    entities: &EntityRegistry,
    platform: Platform,
    uuid: &str,
    legacy_uuid: &str,
    controller_guid: &str,
) {
    if uuid.is_empty() {
        return;
    }

    let unique_id = format!("{controller_guid}_{legacy_uuid}");
    let Some(entity_id) = entities.get_entity_id(platform.as_str(), DOMAIN, &unique_id) else {
        return;
    };

    let new_unique_id = format!("{controller_guid}_{uuid}");
    debug!("Updating entity id from {} to {}", unique_id, new_unique_id);
    if let Err(err) = entities.update_unique_id(&entity_id, &new_unique_id) {
        warn!("Could not migrate {}: {}", entity_id, err);
    }
}

/// Re-key a device registration from the legacy scheme to the uuid scheme
pub fn migrate_device_identifiers(
    devices: &DeviceRegistry,
    uuid: &str,
    legacy_uuid: &str,
    controller_guid: &str,
) {
    if uuid.is_empty() {
        return;
    }

    let unique_id = format!("{controller_guid}_{legacy_uuid}");
    let identifier = DeviceIdentifier::new(DOMAIN, &unique_id);
    let Some(device) = devices.get_device(std::slice::from_ref(&identifier)) else {
        return;
    };

    let new_unique_id = format!("{controller_guid}_{uuid}");
    debug!("Updating device id from {} to {}", unique_id, new_unique_id);
    if let Err(err) = devices.update_identifiers(
        &device.id,
        vec![DeviceIdentifier::new(DOMAIN, new_unique_id)],
    ) {
        warn!("Could not migrate device {}: {}", device.id, err);
    }
}

/// Apply both migrations across the classified topology
///
/// Platform assignments follow where each record's entity was
/// historically registered: scene LEDs under switch, fan-typed outputs
/// under fan only.
pub fn run_pre_setup_migrations(
    data: &ControllerData,
    entities: &EntityRegistry,
    devices: &DeviceRegistry,
    controller_guid: &str,
) {
    let mut migrate_output = |platform: Platform, binding: &crate::classify::OutputBinding| {
        let output = &binding.output;
        migrate_entity_unique_id(
            entities,
            platform,
            &output.uuid,
            &output.legacy_uuid,
            controller_guid,
        );
        migrate_device_identifiers(devices, &output.uuid, &output.legacy_uuid, controller_guid);
    };

    for binding in &data.covers {
        migrate_output(Platform::Cover, binding);
    }
    for binding in &data.fans {
        migrate_output(Platform::Fan, binding);
    }
    for binding in &data.lights {
        // Fan-typed outputs in the light bucket were registered as fans
        if binding.output.output_type != output_type::CEILING_FAN_TYPE {
            migrate_output(Platform::Light, binding);
        }
    }
    for binding in &data.switches {
        migrate_output(Platform::Switch, binding);
    }

    for binding in &data.scenes {
        migrate_entity_unique_id(
            entities,
            Platform::Scene,
            &binding.button.uuid,
            &binding.button.legacy_uuid,
            controller_guid,
        );
        if let Some(led) = &binding.led {
            migrate_entity_unique_id(
                entities,
                Platform::Switch,
                &led.uuid,
                &led.legacy_uuid,
                controller_guid,
            );
        }
    }

    for binding in &data.binary_sensors {
        migrate_entity_unique_id(
            entities,
            Platform::BinarySensor,
            &binding.group.uuid,
            &binding.group.legacy_uuid,
            controller_guid,
        );
        migrate_device_identifiers(
            devices,
            &binding.group.uuid,
            &binding.group.legacy_uuid,
            controller_guid,
        );
    }

    // Variables never carry a preferred uuid, so these are steady-state
    // no-ops kept for parity with the other record kinds
    for binding in &data.variables {
        migrate_entity_unique_id(
            entities,
            Platform::Sensor,
            &binding.variable.uuid,
            &binding.variable.legacy_uuid,
            controller_guid,
        );
        migrate_device_identifiers(
            devices,
            &binding.variable.uuid,
            &binding.variable.legacy_uuid,
            controller_guid,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::SceneBinding;
    use ra2_client::{Button, Keypad, Led};
    use ra2_registries::Storage;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn registries() -> (TempDir, EntityRegistry, DeviceRegistry) {
        let temp_dir = TempDir::new().unwrap();
        let storage = Arc::new(Storage::new(temp_dir.path()));
        (
            temp_dir,
            EntityRegistry::new(storage.clone()),
            DeviceRegistry::new(storage),
        )
    }

    #[test]
    fn test_empty_uuid_is_a_noop() {
        let (_dir, entities, _devices) = registries();
        entities.get_or_create(DOMAIN, "light", "porch", Some("guid_7-0"), None);

        migrate_entity_unique_id(&entities, Platform::Light, "", "7-0", "guid");

        assert!(entities.get_entity_id("light", DOMAIN, "guid_7-0").is_some());
    }

    #[test]
    fn test_entity_migration_is_idempotent() {
        let (_dir, entities, _devices) = registries();
        let entry = entities.get_or_create(DOMAIN, "light", "porch", Some("guid_7-0"), None);

        migrate_entity_unique_id(&entities, Platform::Light, "abcd-uuid", "7-0", "guid");

        let migrated = entities.get(&entry.entity_id).unwrap();
        assert_eq!(migrated.unique_id.as_deref(), Some("guid_abcd-uuid"));
        assert_eq!(migrated.previous_unique_id.as_deref(), Some("guid_7-0"));

        // Second run: the legacy key no longer resolves, nothing changes
        migrate_entity_unique_id(&entities, Platform::Light, "abcd-uuid", "7-0", "guid");

        let after = entities.get(&entry.entity_id).unwrap();
        assert_eq!(after.unique_id.as_deref(), Some("guid_abcd-uuid"));
        assert_eq!(after.modified_at, migrated.modified_at);
        assert_eq!(entities.len(), 1);
    }

    #[test]
    fn test_migration_is_scoped_to_platform_domain() {
        let (_dir, entities, _devices) = registries();
        entities.get_or_create(DOMAIN, "switch", "porch", Some("guid_7-0"), None);

        // Looking under light must not touch the switch registration
        migrate_entity_unique_id(&entities, Platform::Light, "abcd-uuid", "7-0", "guid");

        assert!(entities
            .get_entity_id("switch", DOMAIN, "guid_7-0")
            .is_some());
    }

    #[test]
    fn test_scene_led_migrates_under_switch() {
        let (_dir, entities, devices) = registries();
        // Scene LEDs were historically registered as switches; a light
        // registration under the same key is not part of that scheme
        entities.get_or_create(
            DOMAIN,
            "switch",
            "entry_keypad_dinner_led",
            Some("guid_16-led-1"),
            None,
        );
        entities.get_or_create(
            DOMAIN,
            "light",
            "porch_entry_keypad_dinner_led",
            Some("guid_16-led-1"),
            None,
        );

        let button = Arc::new(Button {
            name: "Dinner".to_string(),
            number: 1,
            uuid: String::new(),
            legacy_uuid: "16-1".to_string(),
            button_type: Some("SingleAction".to_string()),
            led_logic: Some(5),
        });
        let led = Arc::new(Led {
            name: "Dinner LED".to_string(),
            id: 81,
            number: 1,
            uuid: "led-uuid".to_string(),
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
        let data = ControllerData {
            scenes: vec![SceneBinding {
                area_name: "Porch".to_string(),
                device_name: "Entry Keypad".to_string(),
                keypad,
                button,
                led: Some(led),
            }],
            ..ControllerData::default()
        };

        run_pre_setup_migrations(&data, &entities, &devices, "guid");

        assert_eq!(
            entities
                .get_entity_id("switch", DOMAIN, "guid_led-uuid")
                .as_deref(),
            Some("switch.entry_keypad_dinner_led")
        );
        assert!(entities
            .get_entity_id("switch", DOMAIN, "guid_16-led-1")
            .is_none());
        assert!(entities
            .get_entity_id("light", DOMAIN, "guid_16-led-1")
            .is_some());
    }

    #[test]
    fn test_device_migration_preserves_attributes() {
        let (_dir, _entities, devices) = registries();
        let device = devices.get_or_create(
            &[DeviceIdentifier::new(DOMAIN, "guid_7-0")],
            Some("entry1"),
            "Porch Sconce",
            Some("Lutron"),
        );

        migrate_device_identifiers(&devices, "abcd-uuid", "7-0", "guid");

        let migrated = devices
            .get_device(&[DeviceIdentifier::new(DOMAIN, "guid_abcd-uuid")])
            .unwrap();
        assert_eq!(migrated.id, device.id);
        assert_eq!(migrated.name.as_deref(), Some("Porch Sconce"));
        assert_eq!(migrated.manufacturer.as_deref(), Some("Lutron"));
        assert!(devices
            .get_device(&[DeviceIdentifier::new(DOMAIN, "guid_7-0")])
            .is_none());

        // Idempotent: rerun finds nothing under the legacy key
        migrate_device_identifiers(&devices, "abcd-uuid", "7-0", "guid");
        assert_eq!(devices.len(), 1);
    }
}
