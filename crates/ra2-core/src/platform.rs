//! Entity platform categories served by the bridge

use serde::{Deserialize, Serialize};
use std::fmt;

/// The entity platforms the bridge registers entities under.
///
/// The `as_str` form doubles as the domain part of an entity id
/// (e.g. `light.living_room_sconce`) and as the platform category
/// component of registry lookup keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    BinarySensor,
    Cover,
    Event,
    Fan,
    Light,
    Scene,
    Sensor,
    Switch,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::BinarySensor => "binary_sensor",
            Platform::Cover => "cover",
            Platform::Event => "event",
            Platform::Fan => "fan",
            Platform::Light => "light",
            Platform::Scene => "scene",
            Platform::Sensor => "sensor",
            Platform::Switch => "switch",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str() {
        assert_eq!(Platform::BinarySensor.as_str(), "binary_sensor");
        assert_eq!(Platform::Light.as_str(), "light");
        assert_eq!(Platform::Scene.to_string(), "scene");
    }

    #[test]
    fn test_serde_snake_case() {
        let json = serde_json::to_string(&Platform::BinarySensor).unwrap();
        assert_eq!(json, "\"binary_sensor\"");
        let parsed: Platform = serde_json::from_str("\"fan\"").unwrap();
        assert_eq!(parsed, Platform::Fan);
    }
}
