//! Core types for the RadioRA 2 bridge
//!
//! This crate provides the fundamental types shared by the bridge crates:
//! Platform, Context, Event, and the in-process EventBus used to broadcast
//! integration events (button presses, state changes) to the host.

mod bus;
mod context;
mod event;
mod platform;
mod util;

pub use bus::{EventBus, SharedEventBus, TypedEventReceiver};
pub use context::Context;
pub use event::{Event, EventData, EventType};
pub use platform::Platform;
pub use util::slugify;

/// Integration domain used for registry keys and device identifiers
pub const DOMAIN: &str = "radiora2";
