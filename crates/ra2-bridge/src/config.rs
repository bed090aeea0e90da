//! Bridge configuration
//!
//! The configuration surface consumed at setup: controller address and
//! credentials, the topology refresh flag, and the naming options.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// File name of the topology cache written by the controller client.
/// The format is external; the bridge only supplies the path.
pub const DATA_FILE: &str = "radiora2_data.xml";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Configuration for one controller instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Main repeater address
    pub host: String,
    pub username: String,
    pub password: String,

    /// Refresh the topology cache from the controller at setup
    #[serde(default = "default_true")]
    pub refresh_data: bool,

    /// Prefix area names with their hierarchical location
    #[serde(default)]
    pub use_full_path: bool,

    /// Fold the area name into device display names
    #[serde(default)]
    pub use_area_for_device_name: bool,

    /// Also register ceiling fans as lights. Compatibility window for
    /// installs that predate the fan platform; new installs should turn
    /// this off.
    #[serde(default = "default_true")]
    pub fan_compat_lights: bool,

    /// Variable ids to expose as sensors, forwarded to the topology
    /// loader. Empty by default; installs that used the fixed list
    /// configure `[155, 158]`.
    #[serde(default)]
    pub variable_ids: Vec<u32>,
}

fn default_true() -> bool {
    true
}

impl BridgeConfig {
    /// Create a config with the required fields and the defaults for the rest
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            refresh_data: true,
            use_full_path: false,
            use_area_for_device_name: false,
            fan_compat_lights: true,
            variable_ids: Vec::new(),
        }
    }

    /// Parse a config from YAML
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a config from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
