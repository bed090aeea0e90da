//! Controller-communication boundary for a RadioRA 2 main repeater
//!
//! This crate owns the loaded topology snapshot (areas, outputs, keypads,
//! buttons, LEDs, occupancy groups, variables), the imperative command
//! surface, and the push-subscription hub that delivers device state
//! changes to entities.
//!
//! Wire I/O and topology-cache parsing are delegated to the embedder
//! through the [`Transport`] and [`TopologyLoader`] traits; nothing in
//! here speaks the vendor protocol.

mod client;
mod command;
mod error;
mod monitor;
mod topology;

pub use client::{Client, TopologyLoader, Transport};
pub use command::Command;
pub use error::ClientError;
pub use monitor::{ButtonAction, DeviceEvent, MonitorHub, SubscriberCallback, SubscriptionId};
pub use topology::{
    output_type, Area, Button, Keypad, Led, OccupancyGroup, Output, Topology, Variable,
};
