//! Imperative operations sent to the controller
//!
//! Commands are handed to the [`Transport`](crate::Transport) as-is; the
//! wire encoding is the transport's concern.

/// A command addressed to a controller object
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Set an output level (0.0-100.0), with an optional fade time in seconds
    SetLevel {
        output_id: u32,
        level: f64,
        fade_time: Option<f64>,
    },
    /// Flash an output with the given period in seconds
    Flash { output_id: u32, duration: f64 },
    /// Press a keypad button
    PressButton { keypad_id: u32, component: u32 },
    /// Drive a keypad LED on or off
    SetLedState {
        keypad_id: u32,
        led_id: u32,
        on: bool,
    },
    /// Request the current level of an output
    QueryOutput { output_id: u32 },
    /// Request the current state of a keypad LED
    QueryLed { keypad_id: u32, led_id: u32 },
    /// Request the current value of a variable
    QueryVariable { variable_id: u32 },
}
