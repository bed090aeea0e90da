//! Entity seam between the classified topology and the host
//!
//! Every platform entity implements [`BridgeEntity`]. The lifecycle is
//! strict: `attach` subscribes to device events and requests initial
//! state, `detach` drops the subscription, each exactly once per setup.

use ra2_client::ClientError;
use ra2_core::EventData;
use serde::{Deserialize, Serialize};

/// Composite unique id for a controller object
///
/// The controller guid is the namespace; the object id is the preferred
/// `uuid` when the project database carries one, otherwise the
/// `legacy_uuid`.
pub fn composite_unique_id(controller_guid: &str, uuid: &str, legacy_uuid: &str) -> String {
    if uuid.is_empty() {
        format!("{controller_guid}_{legacy_uuid}")
    } else {
        format!("{controller_guid}_{uuid}")
    }
}

/// One bridged entity, attached at setup and detached at unload
pub trait BridgeEntity: Send + Sync {
    /// Host entity id, e.g. `light.porch_sconce`
    fn entity_id(&self) -> &str;

    /// Subscribe to device events and request initial state
    fn attach(&self) -> Result<(), ClientError>;

    /// Drop the device-event subscription
    fn detach(&self);
}

/// Bus payload fired whenever a bridged entity's state changes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateChangedData {
    pub entity_id: String,
    pub new_state: serde_json::Value,
}

impl EventData for StateChangedData {
    fn event_type() -> &'static str {
        "state_changed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_unique_id_prefers_uuid() {
        assert_eq!(
            composite_unique_id("guid", "abcd-uuid", "7-0"),
            "guid_abcd-uuid"
        );
        assert_eq!(composite_unique_id("guid", "", "7-0"), "guid_7-0");
    }
}
