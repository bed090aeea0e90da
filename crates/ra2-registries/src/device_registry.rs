//! Device Registry
//!
//! Tracks registered devices with (domain, id) identifier pairs and
//! in-place identifier rewrite for identifier scheme migrations.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::storage::{Storable, Storage, StorageFile, StorageResult};

/// Errors that can occur in the device registry
#[derive(Debug, Error, Clone)]
pub enum DeviceRegistryError {
    /// Device was not found
    #[error("Device not found: {0}")]
    NotFound(String),
}

/// Storage key for the device registry
pub const STORAGE_KEY: &str = "core.device_registry";
/// Current storage version
pub const STORAGE_VERSION: u32 = 1;
/// Current minor version
pub const STORAGE_MINOR_VERSION: u32 = 2;

/// A device identifier (domain, id) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentifier(pub String, pub String);

impl DeviceIdentifier {
    pub fn new(domain: impl Into<String>, id: impl Into<String>) -> Self {
        Self(domain.into(), id.into())
    }

    pub fn domain(&self) -> &str {
        &self.0
    }

    pub fn id(&self) -> &str {
        &self.1
    }

    /// Key for indexing
    pub fn key(&self) -> String {
        format!("{}:{}", self.0, self.1)
    }
}

/// A registered device entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// Internal UUID
    pub id: String,

    /// Unique identifiers by domain (e.g., [["radiora2", "guid_7-0"]])
    #[serde(default)]
    pub identifiers: Vec<DeviceIdentifier>,

    /// Config entry that created this device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_entry_id: Option<String>,

    /// Device name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Manufacturer name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    /// Model name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Parent device (e.g., keypads hang off the main repeater)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via_device_id: Option<String>,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last modified timestamp
    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl DeviceEntry {
    /// Create a new device entry
    pub fn new(name: Option<&str>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            identifiers: Vec::new(),
            config_entry_id: None,
            name: name.map(|s| s.to_string()),
            manufacturer: None,
            model: None,
            via_device_id: None,
            created_at: now,
            modified_at: now,
        }
    }

    /// Add an identifier
    pub fn with_identifier(mut self, domain: impl Into<String>, id: impl Into<String>) -> Self {
        self.identifiers.push(DeviceIdentifier::new(domain, id));
        self
    }
}

/// Device registry data for storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceRegistryData {
    /// All registered devices
    pub devices: Vec<DeviceEntry>,
}

impl Storable for DeviceRegistryData {
    const KEY: &'static str = STORAGE_KEY;
    const VERSION: u32 = STORAGE_VERSION;
    const MINOR_VERSION: u32 = STORAGE_MINOR_VERSION;
}

/// Device Registry
///
/// O(1) lookups by device id (primary) and by identifier pair. Entries are
/// stored as `Arc<DeviceEntry>`; the primary index preserves insertion
/// order for stable persistence.
pub struct DeviceRegistry {
    /// Storage backend
    storage: Arc<Storage>,

    /// Primary index: device_id -> DeviceEntry
    by_id: RwLock<IndexMap<String, Arc<DeviceEntry>>>,

    /// Index: identifier key -> device_id
    by_identifier: DashMap<String, String>,
}

impl DeviceRegistry {
    /// Create a new device registry
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            by_id: RwLock::new(IndexMap::new()),
            by_identifier: DashMap::new(),
        }
    }

    /// Load from storage
    pub async fn load(&self) -> StorageResult<()> {
        if let Some(storage_file) = self.storage.load::<DeviceRegistryData>(STORAGE_KEY).await? {
            info!(
                "Loading {} devices from storage (v{}.{})",
                storage_file.data.devices.len(),
                storage_file.version,
                storage_file.minor_version
            );

            for entry in storage_file.data.devices {
                self.index_entry(Arc::new(entry));
            }
        }
        Ok(())
    }

    /// Save to storage
    pub async fn save(&self) -> StorageResult<()> {
        let devices: Vec<DeviceEntry> = self
            .by_id
            .read()
            .map(|e| e.values().map(|v| (**v).clone()).collect())
            .unwrap_or_default();

        let count = devices.len();
        let data = DeviceRegistryData { devices };
        let storage_file =
            StorageFile::new(STORAGE_KEY, data, STORAGE_VERSION, STORAGE_MINOR_VERSION);

        self.storage.save(&storage_file).await?;
        debug!("Saved {} devices to storage", count);
        Ok(())
    }

    /// Index an entry in all indexes
    fn index_entry(&self, entry: Arc<DeviceEntry>) {
        for identifier in &entry.identifiers {
            self.by_identifier.insert(identifier.key(), entry.id.clone());
        }
        if let Ok(mut idx) = self.by_id.write() {
            idx.insert(entry.id.clone(), entry);
        }
    }

    /// Remove an entry from the identifier index
    fn unindex_entry(&self, entry: &DeviceEntry) {
        for identifier in &entry.identifiers {
            self.by_identifier.remove(&identifier.key());
        }
    }

    /// Get device by internal id
    pub fn get(&self, device_id: &str) -> Option<Arc<DeviceEntry>> {
        self.by_id
            .read()
            .ok()
            .and_then(|idx| idx.get(device_id).cloned())
    }

    /// Get the device registered under any of the given identifiers
    pub fn get_device(&self, identifiers: &[DeviceIdentifier]) -> Option<Arc<DeviceEntry>> {
        identifiers.iter().find_map(|identifier| {
            self.by_identifier
                .get(&identifier.key())
                .and_then(|id| self.get(&id))
        })
    }

    /// Get or create a device entry
    ///
    /// If a device matching any identifier exists, returns it. Otherwise
    /// creates a new entry.
    pub fn get_or_create(
        &self,
        identifiers: &[DeviceIdentifier],
        config_entry_id: Option<&str>,
        name: &str,
        manufacturer: Option<&str>,
    ) -> Arc<DeviceEntry> {
        if let Some(existing) = self.get_device(identifiers) {
            debug!("Found existing device: {}", existing.id);
            return existing;
        }

        let mut entry = DeviceEntry::new(Some(name));
        entry.identifiers = identifiers.to_vec();
        entry.config_entry_id = config_entry_id.map(String::from);
        entry.manufacturer = manufacturer.map(String::from);

        let arc_entry = Arc::new(entry);
        self.index_entry(Arc::clone(&arc_entry));

        info!("Registered new device: {} ({})", name, arc_entry.id);
        arc_entry
    }

    /// Update a device entry
    pub fn update<F>(&self, device_id: &str, f: F) -> Result<Arc<DeviceEntry>, DeviceRegistryError>
    where
        F: FnOnce(&mut DeviceEntry),
    {
        let arc_entry = self
            .by_id
            .write()
            .ok()
            .and_then(|mut idx| idx.shift_remove(device_id));

        let Some(arc_entry) = arc_entry else {
            return Err(DeviceRegistryError::NotFound(device_id.to_string()));
        };

        self.unindex_entry(&arc_entry);

        let mut entry = (*arc_entry).clone();
        f(&mut entry);
        entry.modified_at = Utc::now();

        let new_arc = Arc::new(entry);
        self.index_entry(Arc::clone(&new_arc));

        Ok(new_arc)
    }

    /// Rewrite a device's identifiers in place, preserving everything else
    pub fn update_identifiers(
        &self,
        device_id: &str,
        new_identifiers: Vec<DeviceIdentifier>,
    ) -> Result<Arc<DeviceEntry>, DeviceRegistryError> {
        self.update(device_id, |entry| {
            entry.identifiers = new_identifiers;
        })
    }

    /// Remove a device
    pub fn remove(&self, device_id: &str) -> Option<Arc<DeviceEntry>> {
        let arc_entry = self
            .by_id
            .write()
            .ok()
            .and_then(|mut idx| idx.shift_remove(device_id));

        if let Some(arc_entry) = arc_entry {
            self.unindex_entry(&arc_entry);
            info!("Removed device: {}", device_id);
            Some(arc_entry)
        } else {
            None
        }
    }

    /// Count of registered devices
    pub fn len(&self) -> usize {
        self.by_id.read().map(|idx| idx.len()).unwrap_or(0)
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries, in insertion order
    pub fn iter(&self) -> Vec<Arc<DeviceEntry>> {
        self.by_id
            .read()
            .map(|idx| idx.values().cloned().collect())
            .unwrap_or_default()
    }
}
