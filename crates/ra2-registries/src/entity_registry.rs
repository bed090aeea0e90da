//! Entity Registry
//!
//! Tracks registered entities with unique_id lookups and in-place
//! unique_id rewrite, so entity identity survives reloads and identifier
//! scheme migrations.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::storage::{Storable, Storage, StorageFile, StorageResult};

/// Errors that can occur in the entity registry
#[derive(Debug, Error, Clone)]
pub enum EntityRegistryError {
    /// Entity was not found
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// The target unique_id is already taken by another entity
    #[error("unique_id already registered: {0}")]
    UniqueIdTaken(String),
}

/// Storage key for the entity registry
pub const STORAGE_KEY: &str = "core.entity_registry";
/// Current storage version
pub const STORAGE_VERSION: u32 = 1;
/// Current minor version
pub const STORAGE_MINOR_VERSION: u32 = 2;

/// A registered entity entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityEntry {
    /// Internal ULID
    pub id: String,
    /// Full entity ID (domain.object_id)
    pub entity_id: String,
    /// Platform-scoped unique identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,
    /// Previous unique_id, kept through migrations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_unique_id: Option<String>,

    /// Integration that provides this entity
    pub platform: String,

    /// Parent device ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Whether the entity is disabled
    #[serde(default)]
    pub disabled: bool,

    /// Creation timestamp
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last modified timestamp
    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl EntityEntry {
    /// Create a new entity entry with minimal required fields
    pub fn new(
        entity_id: impl Into<String>,
        platform: impl Into<String>,
        unique_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ulid::Ulid::new().to_string().to_lowercase(),
            entity_id: entity_id.into(),
            unique_id,
            previous_unique_id: None,
            platform: platform.into(),
            device_id: None,
            name: None,
            disabled: false,
            created_at: now,
            modified_at: now,
        }
    }

    /// The domain part of entity_id
    pub fn domain(&self) -> &str {
        self.entity_id.split('.').next().unwrap_or(&self.entity_id)
    }

    /// The object_id part of entity_id
    pub fn object_id(&self) -> &str {
        self.entity_id.split('.').nth(1).unwrap_or(&self.entity_id)
    }
}

/// Entity registry data for storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityRegistryData {
    /// All registered entities
    pub entities: Vec<EntityEntry>,
}

impl Storable for EntityRegistryData {
    const KEY: &'static str = STORAGE_KEY;
    const VERSION: u32 = STORAGE_VERSION;
    const MINOR_VERSION: u32 = STORAGE_MINOR_VERSION;
}

/// Entity Registry
///
/// O(1) lookups by entity_id (primary) and by the composite
/// (domain, platform, unique_id) key integrations register under.
///
/// Entries are stored as `Arc<EntityEntry>`; the primary index preserves
/// insertion order for stable persistence.
pub struct EntityRegistry {
    /// Storage backend
    storage: Arc<Storage>,

    /// Primary index: entity_id -> EntityEntry
    by_entity_id: RwLock<IndexMap<String, Arc<EntityEntry>>>,

    /// Index: (domain, platform, unique_id) -> entity_id
    by_unique_id: DashMap<(String, String, String), String>,
}

impl EntityRegistry {
    /// Create a new entity registry
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            by_entity_id: RwLock::new(IndexMap::new()),
            by_unique_id: DashMap::new(),
        }
    }

    /// Load from storage
    pub async fn load(&self) -> StorageResult<()> {
        if let Some(storage_file) = self.storage.load::<EntityRegistryData>(STORAGE_KEY).await? {
            info!(
                "Loading {} entities from storage (v{}.{})",
                storage_file.data.entities.len(),
                storage_file.version,
                storage_file.minor_version
            );

            for entry in storage_file.data.entities {
                self.index_entry(Arc::new(entry));
            }
        }
        Ok(())
    }

    /// Save to storage
    pub async fn save(&self) -> StorageResult<()> {
        let entities: Vec<EntityEntry> = self
            .by_entity_id
            .read()
            .map(|e| e.values().map(|v| (**v).clone()).collect())
            .unwrap_or_default();

        let count = entities.len();
        let data = EntityRegistryData { entities };
        let storage_file =
            StorageFile::new(STORAGE_KEY, data, STORAGE_VERSION, STORAGE_MINOR_VERSION);

        self.storage.save(&storage_file).await?;
        debug!("Saved {} entities to storage", count);
        Ok(())
    }

    fn unique_key(entry: &EntityEntry) -> Option<(String, String, String)> {
        entry.unique_id.as_ref().map(|uid| {
            (
                entry.domain().to_string(),
                entry.platform.clone(),
                uid.clone(),
            )
        })
    }

    /// Index an entry in all indexes
    fn index_entry(&self, entry: Arc<EntityEntry>) {
        if let Some(key) = Self::unique_key(&entry) {
            self.by_unique_id.insert(key, entry.entity_id.clone());
        }
        if let Ok(mut idx) = self.by_entity_id.write() {
            idx.insert(entry.entity_id.clone(), entry);
        }
    }

    /// Remove an entry from the secondary index
    fn unindex_entry(&self, entry: &EntityEntry) {
        if let Some(key) = Self::unique_key(entry) {
            self.by_unique_id.remove(&key);
        }
    }

    /// Get entity by entity_id
    pub fn get(&self, entity_id: &str) -> Option<Arc<EntityEntry>> {
        self.by_entity_id
            .read()
            .ok()
            .and_then(|idx| idx.get(entity_id).cloned())
    }

    /// Look up the entity_id registered under (domain, platform, unique_id)
    pub fn get_entity_id(&self, domain: &str, platform: &str, unique_id: &str) -> Option<String> {
        self.by_unique_id
            .get(&(
                domain.to_string(),
                platform.to_string(),
                unique_id.to_string(),
            ))
            .map(|e| e.clone())
    }

    /// Get entity by its composite unique key
    pub fn get_by_unique_id(
        &self,
        domain: &str,
        platform: &str,
        unique_id: &str,
    ) -> Option<Arc<EntityEntry>> {
        self.get_entity_id(domain, platform, unique_id)
            .and_then(|entity_id| self.get(&entity_id))
    }

    /// Get or create an entity entry
    ///
    /// If an entity with the same composite unique key exists, returns it.
    /// Otherwise creates a new entry under a non-conflicting entity_id
    /// derived from `suggested_object_id`.
    pub fn get_or_create(
        &self,
        platform: &str,
        domain: &str,
        suggested_object_id: &str,
        unique_id: Option<&str>,
        device_id: Option<&str>,
    ) -> Arc<EntityEntry> {
        if let Some(uid) = unique_id {
            if let Some(existing) = self.get_by_unique_id(domain, platform, uid) {
                debug!("Found existing entity by unique_id: {}", existing.entity_id);
                return existing;
            }
        }

        let entity_id = self.generate_entity_id(domain, suggested_object_id);
        let mut entry = EntityEntry::new(&entity_id, platform, unique_id.map(String::from));
        entry.device_id = device_id.map(String::from);

        let arc_entry = Arc::new(entry);
        self.index_entry(Arc::clone(&arc_entry));

        info!("Registered new entity: {}", entity_id);
        arc_entry
    }

    /// Update an entity entry
    ///
    /// The closure receives a mutable clone of the entry, which is then
    /// re-indexed and stored.
    pub fn update<F>(&self, entity_id: &str, f: F) -> Result<Arc<EntityEntry>, EntityRegistryError>
    where
        F: FnOnce(&mut EntityEntry),
    {
        let arc_entry = self
            .by_entity_id
            .write()
            .ok()
            .and_then(|mut idx| idx.shift_remove(entity_id));

        let Some(arc_entry) = arc_entry else {
            return Err(EntityRegistryError::NotFound(entity_id.to_string()));
        };

        self.unindex_entry(&arc_entry);

        let mut entry = (*arc_entry).clone();
        f(&mut entry);
        entry.modified_at = Utc::now();

        let new_arc = Arc::new(entry);
        self.index_entry(Arc::clone(&new_arc));

        Ok(new_arc)
    }

    /// Rewrite an entity's unique_id in place
    ///
    /// All other stored attributes are preserved; the old unique_id is
    /// recorded as `previous_unique_id`. Fails if the new unique_id is
    /// already registered to a different entity.
    pub fn update_unique_id(
        &self,
        entity_id: &str,
        new_unique_id: &str,
    ) -> Result<Arc<EntityEntry>, EntityRegistryError> {
        let entry = self
            .get(entity_id)
            .ok_or_else(|| EntityRegistryError::NotFound(entity_id.to_string()))?;

        if let Some(existing) =
            self.get_entity_id(entry.domain(), &entry.platform, new_unique_id)
        {
            if existing != entity_id {
                return Err(EntityRegistryError::UniqueIdTaken(
                    new_unique_id.to_string(),
                ));
            }
        }

        self.update(entity_id, |e| {
            e.previous_unique_id = e.unique_id.take();
            e.unique_id = Some(new_unique_id.to_string());
        })
    }

    /// Remove an entity
    pub fn remove(&self, entity_id: &str) -> Option<Arc<EntityEntry>> {
        let arc_entry = self
            .by_entity_id
            .write()
            .ok()
            .and_then(|mut idx| idx.shift_remove(entity_id));

        if let Some(arc_entry) = arc_entry {
            self.unindex_entry(&arc_entry);
            info!("Removed entity: {}", entity_id);
            Some(arc_entry)
        } else {
            None
        }
    }

    /// Check if an entity_id is registered
    pub fn is_registered(&self, entity_id: &str) -> bool {
        self.by_entity_id
            .read()
            .map(|idx| idx.contains_key(entity_id))
            .unwrap_or(false)
    }

    /// Generate an entity_id that doesn't conflict with existing ones
    ///
    /// Appends `_2`, `_3`, ... to the preferred id until one is free.
    pub fn generate_entity_id(&self, domain: &str, suggested_object_id: &str) -> String {
        let preferred = format!("{}.{}", domain, suggested_object_id);

        if !self.is_registered(&preferred) {
            return preferred;
        }

        let mut tries = 1;
        loop {
            tries += 1;
            let test_id = format!("{}_{}", preferred, tries);
            if !self.is_registered(&test_id) {
                return test_id;
            }
        }
    }

    /// Count of registered entities
    pub fn len(&self) -> usize {
        self.by_entity_id.read().map(|idx| idx.len()).unwrap_or(0)
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries, in insertion order
    pub fn iter(&self) -> Vec<Arc<EntityEntry>> {
        self.by_entity_id
            .read()
            .map(|idx| idx.values().cloned().collect())
            .unwrap_or_default()
    }
}
