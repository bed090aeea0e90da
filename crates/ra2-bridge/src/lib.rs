//! RadioRA 2 bridge
//!
//! Bridges a RadioRA 2 main repeater into the host entity model. The work
//! happens in one setup pass per controller: walk the vendor topology,
//! sort every device into an entity platform bucket, migrate stored
//! identifiers from the legacy scheme to the uuid scheme when available,
//! and register the resulting entities.

pub mod classify;
pub mod config;
pub mod entity;
pub mod level;
pub mod migrate;
pub mod platforms;
pub mod setup;

pub use classify::{classify, ControllerData};
pub use config::BridgeConfig;
pub use entity::{composite_unique_id, BridgeEntity};
pub use level::{to_controller_level, to_host_level};
pub use setup::{setup_entry, BridgeHandle, SetupError};
