//! Controller client
//!
//! Ties together the loaded topology, the command transport, and the
//! monitor hub. Connection handling and topology parsing live behind
//! traits; calls into them may block and should be issued off the
//! host's cooperative scheduler.

use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::command::Command;
use crate::error::ClientError;
use crate::monitor::MonitorHub;
use crate::topology::{Button, Keypad, Led, Output, Topology, Variable};

/// Wire transport to the main repeater, supplied by the embedder
pub trait Transport: Send + Sync {
    /// Open the connection; may block
    fn connect(&self) -> Result<(), ClientError>;

    /// Encode and send one command; may block
    fn send(&self, command: &Command) -> Result<(), ClientError>;
}

/// Topology-cache loader, supplied by the embedder
///
/// The cache file format is external; this crate only passes the path,
/// the refresh flag, and the variable ids to expose.
pub trait TopologyLoader: Send + Sync {
    fn load(
        &self,
        cache_file: &Path,
        refresh: bool,
        variable_ids: &[u32],
    ) -> Result<Topology, ClientError>;
}

/// Client for one main repeater
pub struct Client {
    transport: Arc<dyn Transport>,
    loader: Arc<dyn TopologyLoader>,
    topology: RwLock<Option<Arc<Topology>>>,
    monitor: MonitorHub,
}

impl Client {
    pub fn new(transport: Arc<dyn Transport>, loader: Arc<dyn TopologyLoader>) -> Self {
        Self {
            transport,
            loader,
            topology: RwLock::new(None),
            monitor: MonitorHub::new(),
        }
    }

    /// Load (or refresh) the topology cache and keep the snapshot
    pub fn load_topology(
        &self,
        cache_file: &Path,
        refresh: bool,
        variable_ids: &[u32],
    ) -> Result<Arc<Topology>, ClientError> {
        let topology = Arc::new(self.loader.load(cache_file, refresh, variable_ids)?);
        info!(
            guid = %topology.guid,
            areas = topology.areas.len(),
            variables = topology.variables.len(),
            "Loaded controller topology"
        );
        if let Ok(mut slot) = self.topology.write() {
            *slot = Some(Arc::clone(&topology));
        }
        Ok(topology)
    }

    /// The loaded snapshot
    pub fn topology(&self) -> Result<Arc<Topology>, ClientError> {
        self.topology
            .read()
            .ok()
            .and_then(|slot| slot.clone())
            .ok_or(ClientError::TopologyNotLoaded)
    }

    /// Controller GUID from the loaded topology
    pub fn guid(&self) -> Result<String, ClientError> {
        Ok(self.topology()?.guid.clone())
    }

    /// Connect to the main repeater
    pub fn connect(&self) -> Result<(), ClientError> {
        self.transport.connect()
    }

    /// The push-subscription hub for device events
    pub fn monitor(&self) -> &MonitorHub {
        &self.monitor
    }

    /// Set an output level (0.0-100.0)
    pub fn set_level(
        &self,
        output: &Output,
        level: f64,
        fade_time: Option<f64>,
    ) -> Result<(), ClientError> {
        self.transport.send(&Command::SetLevel {
            output_id: output.id,
            level,
            fade_time,
        })
    }

    /// Flash an output with the given period in seconds
    pub fn flash(&self, output: &Output, duration: f64) -> Result<(), ClientError> {
        self.transport.send(&Command::Flash {
            output_id: output.id,
            duration,
        })
    }

    /// Press a keypad button
    pub fn press_button(&self, keypad: &Keypad, button: &Button) -> Result<(), ClientError> {
        self.transport.send(&Command::PressButton {
            keypad_id: keypad.id,
            component: button.number,
        })
    }

    /// Drive a keypad LED
    pub fn set_led_state(&self, keypad: &Keypad, led: &Led, on: bool) -> Result<(), ClientError> {
        self.transport.send(&Command::SetLedState {
            keypad_id: keypad.id,
            led_id: led.id,
            on,
        })
    }

    /// Request the current level of an output; the answer arrives as a
    /// [`DeviceEvent::LevelChanged`](crate::DeviceEvent) push
    pub fn query_output(&self, output: &Output) -> Result<(), ClientError> {
        self.transport.send(&Command::QueryOutput {
            output_id: output.id,
        })
    }

    /// Request the current state of a keypad LED
    pub fn query_led(&self, keypad: &Keypad, led: &Led) -> Result<(), ClientError> {
        self.transport.send(&Command::QueryLed {
            keypad_id: keypad.id,
            led_id: led.id,
        })
    }

    /// Request the current value of a variable
    pub fn query_variable(&self, variable: &Variable) -> Result<(), ClientError> {
        self.transport
            .send(&Command::QueryVariable { variable_id: variable.id })
    }
}
