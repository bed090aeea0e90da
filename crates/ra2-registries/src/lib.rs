//! Identity registries for the RadioRA 2 bridge
//!
//! Tracks registered entities and devices so identifiers stay stable
//! across reloads:
//! - Entities (EntityRegistry), keyed by (domain, platform, unique_id)
//! - Devices (DeviceRegistry), keyed by (domain, id) identifier pairs
//!
//! Both persist as versioned JSON in the `.storage/` directory.

pub mod storage;

pub mod device_registry;
pub mod entity_registry;

pub use storage::{Storable, Storage, StorageError, StorageFile, StorageResult};

pub use entity_registry::{EntityEntry, EntityRegistry, EntityRegistryData, EntityRegistryError};

pub use device_registry::{
    DeviceEntry, DeviceIdentifier, DeviceRegistry, DeviceRegistryData, DeviceRegistryError,
};

use std::sync::Arc;

/// Both registries bundled together
pub struct Registries {
    pub storage: Arc<Storage>,
    pub entities: EntityRegistry,
    pub devices: DeviceRegistry,
}

impl Registries {
    /// Create registries persisting under the given config directory
    pub fn new(config_dir: impl AsRef<std::path::Path>) -> Self {
        let storage = Arc::new(Storage::new(config_dir));

        Self {
            entities: EntityRegistry::new(storage.clone()),
            devices: DeviceRegistry::new(storage.clone()),
            storage,
        }
    }

    /// Load both registries from storage
    pub async fn load_all(&self) -> StorageResult<()> {
        self.entities.load().await?;
        self.devices.load().await?;
        Ok(())
    }

    /// Save both registries to storage
    pub async fn save_all(&self) -> StorageResult<()> {
        self.entities.save().await?;
        self.devices.save().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_registries_bundle_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let registries = Registries::new(temp_dir.path());

        let entity = registries.entities.get_or_create(
            "radiora2",
            "light",
            "porch_sconce",
            Some("01234567_7-0"),
            None,
        );
        assert_eq!(entity.entity_id, "light.porch_sconce");

        registries.devices.get_or_create(
            &[DeviceIdentifier::new("radiora2", "01234567")],
            Some("entry1"),
            "Main repeater",
            Some("Lutron"),
        );

        registries.save_all().await.unwrap();

        let registries2 = Registries::new(temp_dir.path());
        registries2.load_all().await.unwrap();

        assert_eq!(registries2.entities.len(), 1);
        assert_eq!(registries2.devices.len(), 1);
        assert_eq!(
            registries2
                .entities
                .get_entity_id("light", "radiora2", "01234567_7-0")
                .as_deref(),
            Some("light.porch_sconce")
        );
    }
}
