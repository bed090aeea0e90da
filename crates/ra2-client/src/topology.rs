//! Immutable topology snapshot
//!
//! The controller's project database, loaded once per setup pass and
//! shared read-only. The tree is Controller -> Areas -> {Outputs, Keypads,
//! OccupancyGroup}; Keypad -> {Buttons, LEDs}; Controller -> Variables
//! (global, unscoped).

use std::sync::Arc;

/// Vendor type tags for outputs
pub mod output_type {
    pub const SYSTEM_SHADE: &str = "SYSTEM_SHADE";
    pub const MOTOR: &str = "MOTOR";
    pub const CEILING_FAN_TYPE: &str = "CEILING_FAN_TYPE";
}

/// The full loaded topology for one controller
#[derive(Debug, Clone)]
pub struct Topology {
    /// Controller GUID, stable across reloads
    pub guid: String,
    pub areas: Vec<Arc<Area>>,
    /// Controller-global variables, no area association
    pub variables: Vec<Arc<Variable>>,
}

/// A physical area (room) in the project
#[derive(Debug, Clone)]
pub struct Area {
    pub name: String,
    /// Hierarchical location prefix (e.g. "First Floor")
    pub location: String,
    pub outputs: Vec<Arc<Output>>,
    pub keypads: Vec<Arc<Keypad>>,
    pub occupancy_group: Option<Arc<OccupancyGroup>>,
}

/// A controlled load: light, shade motor, fan, or switched circuit
#[derive(Debug, Clone)]
pub struct Output {
    pub name: String,
    /// Integration id used for commands
    pub id: u32,
    /// Preferred stable identifier; empty on older project databases
    pub uuid: String,
    /// Historical stable identifier, always present
    pub legacy_uuid: String,
    /// Vendor type tag (see [`output_type`])
    pub output_type: String,
    pub is_light: bool,
    pub is_dimmable: bool,
}

/// A physical keypad with buttons and status LEDs
#[derive(Debug, Clone)]
pub struct Keypad {
    pub name: String,
    pub id: u32,
    pub uuid: String,
    pub legacy_uuid: String,
    pub buttons: Vec<Arc<Button>>,
    pub leds: Vec<Arc<Led>>,
}

impl Keypad {
    /// The LED occupying the same slot as a button, if any
    pub fn led_for_slot(&self, number: u32) -> Option<&Arc<Led>> {
        self.leds.iter().find(|led| led.number == number)
    }
}

/// A keypad button
#[derive(Debug, Clone)]
pub struct Button {
    pub name: String,
    /// Slot number on the keypad, shared with the paired LED
    pub number: u32,
    pub uuid: String,
    pub legacy_uuid: String,
    /// Interaction style tag; None when the button has no function
    pub button_type: Option<String>,
    /// LED drive mode; 5 means the LED state is driven by the integration
    pub led_logic: Option<u8>,
}

impl Button {
    /// LED drive mode value meaning "LED driven by the integration"
    pub const LED_LOGIC_INTEGRATION: u8 = 5;
}

/// A keypad status LED
#[derive(Debug, Clone)]
pub struct Led {
    pub name: String,
    /// Component id used for commands
    pub id: u32,
    /// Slot number on the keypad, shared with the paired button
    pub number: u32,
    pub uuid: String,
    pub legacy_uuid: String,
}

/// An area-level presence sensor abstraction
#[derive(Debug, Clone)]
pub struct OccupancyGroup {
    pub name: String,
    /// Group id; 0 means no real occupancy group is attached to the area
    pub id: u32,
    pub uuid: String,
    pub legacy_uuid: String,
}

/// A controller-global named value exposed as read-only state
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub id: u32,
    /// Variables never carry a preferred uuid in the project database
    pub uuid: String,
    pub legacy_uuid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn led(number: u32) -> Arc<Led> {
        Arc::new(Led {
            name: format!("LED {number}"),
            id: 80 + number,
            number,
            uuid: String::new(),
            legacy_uuid: format!("16-{number}"),
        })
    }

    #[test]
    fn test_led_for_slot() {
        let keypad = Keypad {
            name: "Entry Keypad".to_string(),
            id: 16,
            uuid: String::new(),
            legacy_uuid: "16-0".to_string(),
            buttons: Vec::new(),
            leds: vec![led(1), led(3)],
        };

        assert_eq!(keypad.led_for_slot(3).unwrap().number, 3);
        assert!(keypad.led_for_slot(2).is_none());
    }
}
