//! Topology classifier
//!
//! One deterministic pass over the loaded topology, sorting every vendor
//! object into the platform bucket its entity will be created from. The
//! vendor tree is never mutated; records hold `Arc` handles into it.

use std::sync::Arc;

use ra2_client::{output_type, Button, Keypad, Led, OccupancyGroup, Output, Topology, Variable};
use tracing::debug;

use crate::config::BridgeConfig;

/// Button-type tags eligible for scene registration
pub const SCENE_BUTTON_TYPES: [&str; 8] = [
    "SingleAction",
    "Toggle",
    "SingleSceneRaiseLower",
    "MasterRaiseLower",
    "DualAction",
    "AdvancedToggle",
    "AdvancedConditional",
    "SimpleConditional",
];

/// Name the controller assigns to buttons without a programmed function
pub const PLACEHOLDER_BUTTON_NAME: &str = "Unknown Button";

/// An output with its resolved display names
#[derive(Debug, Clone)]
pub struct OutputBinding {
    pub area_name: String,
    pub device_name: String,
    pub output: Arc<Output>,
}

/// A keypad button with its keypad and resolved display names
#[derive(Debug, Clone)]
pub struct ButtonBinding {
    pub area_name: String,
    pub device_name: String,
    pub keypad: Arc<Keypad>,
    pub button: Arc<Button>,
}

/// A scene-eligible button, with its paired LED when one occupies the
/// same keypad slot
#[derive(Debug, Clone)]
pub struct SceneBinding {
    pub area_name: String,
    pub device_name: String,
    pub keypad: Arc<Keypad>,
    pub button: Arc<Button>,
    pub led: Option<Arc<Led>>,
}

/// An integration-driven keypad LED
#[derive(Debug, Clone)]
pub struct LedBinding {
    pub area_name: String,
    pub device_name: String,
    pub keypad: Arc<Keypad>,
    pub led: Arc<Led>,
}

/// An area occupancy group
#[derive(Debug, Clone)]
pub struct OccupancyBinding {
    pub area_name: String,
    pub group: Arc<OccupancyGroup>,
}

/// A controller-global variable
#[derive(Debug, Clone)]
pub struct VariableBinding {
    pub name: String,
    pub variable: Arc<Variable>,
}

/// Classified topology, partitioned into platform buckets
#[derive(Debug, Clone, Default)]
pub struct ControllerData {
    pub binary_sensors: Vec<OccupancyBinding>,
    pub buttons: Vec<ButtonBinding>,
    pub covers: Vec<OutputBinding>,
    pub fans: Vec<OutputBinding>,
    pub lights: Vec<OutputBinding>,
    pub leds: Vec<LedBinding>,
    pub scenes: Vec<SceneBinding>,
    pub switches: Vec<OutputBinding>,
    pub variables: Vec<VariableBinding>,
}

/// Sort the topology into platform buckets
///
/// Pure and single-pass; unknown output type tags fall through to the
/// switch bucket rather than erroring.
pub fn classify(topology: &Topology, config: &BridgeConfig) -> ControllerData {
    let mut data = ControllerData::default();

    for area in &topology.areas {
        let area_name = if config.use_full_path {
            format!("{} {}", area.location, area.name)
        } else {
            area.name.clone()
        };
        debug!("Working on area {}", area.name);

        for output in &area.outputs {
            let device_name = if config.use_area_for_device_name {
                format!("{} {}", area_name, output.name)
            } else {
                output.name.clone()
            };
            let binding = OutputBinding {
                area_name: area_name.clone(),
                device_name,
                output: Arc::clone(output),
            };
            debug!("Working on output {}", output.output_type);

            match output.output_type.as_str() {
                output_type::SYSTEM_SHADE | output_type::MOTOR => data.covers.push(binding),
                output_type::CEILING_FAN_TYPE => {
                    data.fans.push(binding.clone());
                    if config.fan_compat_lights {
                        data.lights.push(binding);
                    }
                }
                _ if output.is_light => data.lights.push(binding),
                _ => data.switches.push(binding),
            }
        }

        for keypad in &area.keypads {
            let device_name = if config.use_area_for_device_name {
                format!("{} {}", area_name, keypad.name)
            } else {
                keypad.name.clone()
            };

            for button in &keypad.buttons {
                let button_type = button.button_type.as_deref();

                // A named button with a function assigned becomes a scene
                if button.name != PLACEHOLDER_BUTTON_NAME
                    && button_type.is_some_and(|t| SCENE_BUTTON_TYPES.contains(&t))
                {
                    let led = keypad.led_for_slot(button.number).cloned();

                    // The LED becomes its own entity when driven by the
                    // integration rather than by the device
                    if let Some(led) = led
                        .as_ref()
                        .filter(|_| button.led_logic == Some(Button::LED_LOGIC_INTEGRATION))
                    {
                        data.leds.push(LedBinding {
                            area_name: area_name.clone(),
                            device_name: device_name.clone(),
                            keypad: Arc::clone(keypad),
                            led: Arc::clone(led),
                        });
                    }

                    data.scenes.push(SceneBinding {
                        area_name: area_name.clone(),
                        device_name: device_name.clone(),
                        keypad: Arc::clone(keypad),
                        button: Arc::clone(button),
                        led,
                    });
                }

                // Every typed button is also a raw button, independent of
                // scene eligibility
                if button_type.is_some_and(|t| !t.is_empty()) {
                    data.buttons.push(ButtonBinding {
                        area_name: area_name.clone(),
                        device_name: device_name.clone(),
                        keypad: Arc::clone(keypad),
                        button: Arc::clone(button),
                    });
                }
            }
        }

        // Exclude occupancy groups not linked to a real group
        if let Some(group) = area.occupancy_group.as_ref().filter(|g| g.id != 0) {
            data.binary_sensors.push(OccupancyBinding {
                area_name: area_name.clone(),
                group: Arc::clone(group),
            });
        }
    }

    for variable in &topology.variables {
        debug!("Working on variable {}", variable.name);
        data.variables.push(VariableBinding {
            name: variable.name.clone(),
            variable: Arc::clone(variable),
        });
    }

    data
}
