//! midir-based MIDI backend.
//!
//! [`MidirBackend`] drives output through [midir](https://crates.io/crates/midir),
//! which covers ALSA sequencer (Linux), CoreMIDI (macOS) and WinMM (Windows).
//! midir has no process callback of its own, so the backend runs a
//! [`CycleDriver`] and sends each cycle's messages to every connected port.
//!
//! midir sends immediately, so frame offsets inside a cycle only decide the
//! order in which messages go out.
//!
//! A failed send only retires that connection; the cycle keeps running so
//! `reconnect` can restore it. Delivery therefore never reports the transport
//! closed, and the shutdown callback does not run for this backend.

use std::sync::Arc;

use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};
use parking_lot::Mutex;

use crate::backend::{
    ClientConfig, MidiBackend, ProcessCallback, ShutdownCallback, TransportStats,
};
use crate::cycle::CycleBuffer;
use crate::driver::{CycleDriver, Delivery};
use crate::{Error, Result};

/// One live connection from the output port to a remote port.
struct OutputConnection {
    remote: String,
    conn: MidiOutputConnection,
    failed: bool,
}

type ConnectionTable = Arc<Mutex<Vec<OutputConnection>>>;

/// MIDI backend over midir.
pub struct MidirBackend {
    config: ClientConfig,
    connections: ConnectionTable,
    driver: Option<CycleDriver>,
    last_stats: TransportStats,
}

impl MidirBackend {
    /// Opens the client and registers its output port.
    ///
    /// Fails with [`Error::InvalidConfig`] or [`Error::PortRegistration`] for an
    /// unusable configuration and [`Error::ClientOpen`] when the MIDI system is
    /// unreachable.
    pub fn open(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let probe = MidiOutput::new(&config.client_name).map_err(|e| Error::ClientOpen {
            name: config.client_name.clone(),
            reason: e.to_string(),
        })?;
        tracing::info!(
            client = %config.client_name,
            ports = probe.ports().len(),
            "midir client opened"
        );
        Ok(Self {
            config,
            connections: Arc::new(Mutex::new(Vec::new())),
            driver: None,
            last_stats: TransportStats::default(),
        })
    }

    /// Names of the remote output-capable ports currently visible.
    pub fn available_ports(&self) -> Result<Vec<String>> {
        let output = self.new_output()?;
        Ok(output
            .ports()
            .iter()
            .filter_map(|port| output.port_name(port).ok())
            .collect())
    }

    /// The configuration this client was opened with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn new_output(&self) -> Result<MidiOutput> {
        MidiOutput::new(&self.config.client_name).map_err(|e| Error::ClientOpen {
            name: self.config.client_name.clone(),
            reason: e.to_string(),
        })
    }

    /// Finds `remote` by exact name, then by substring.
    fn find_port(output: &MidiOutput, remote: &str) -> Option<(MidiOutputPort, String)> {
        let named: Vec<(MidiOutputPort, String)> = output
            .ports()
            .into_iter()
            .filter_map(|port| output.port_name(&port).ok().map(|name| (port, name)))
            .collect();
        let exact = named.iter().position(|(_, name)| name == remote);
        let index = exact.or_else(|| named.iter().position(|(_, name)| name.contains(remote)))?;
        named.into_iter().nth(index)
    }
}

/// Sends one cycle to every healthy connection.
///
/// Never waits for the table lock: a cycle that finds it taken is skipped.
fn send_cycle(connections: &ConnectionTable, buffer: &CycleBuffer) -> Delivery {
    if buffer.is_empty() {
        return Delivery::Sent;
    }
    let Some(mut table) = connections.try_lock() else {
        return Delivery::Skipped;
    };
    for connection in table.iter_mut().filter(|c| !c.failed) {
        for event in buffer.events() {
            if connection.conn.send(event.as_bytes()).is_err() {
                connection.failed = true;
                break;
            }
        }
    }
    Delivery::Sent
}

impl MidiBackend for MidirBackend {
    fn name(&self) -> &str {
        "midir"
    }

    fn client_name(&self) -> &str {
        &self.config.client_name
    }

    fn output_port_name(&self) -> String {
        self.config.full_port_name()
    }

    fn activate(&mut self, process: ProcessCallback, shutdown: ShutdownCallback) -> Result<()> {
        if self.driver.is_some() {
            return Err(Error::AlreadyActive);
        }
        let connections = Arc::clone(&self.connections);
        let driver = CycleDriver::spawn(&self.config, process, shutdown, move |buffer: &CycleBuffer| {
            send_cycle(&connections, buffer)
        })?;
        self.driver = Some(driver);
        tracing::info!(port = %self.output_port_name(), "client activated");
        Ok(())
    }

    fn connect(&mut self, remote: &str) -> Result<()> {
        let from = self.output_port_name();
        let output = self.new_output()?;
        let (port, name) =
            Self::find_port(&output, remote).ok_or_else(|| Error::PortNotFound(remote.to_string()))?;
        let conn = output
            .connect(&port, &self.config.port_name)
            .map_err(|e| Error::Connect {
                from: from.clone(),
                to: name.clone(),
                reason: e.to_string(),
            })?;

        let mut table = self.connections.lock();
        if let Some(index) = table.iter().position(|c| c.remote == name) {
            let old = table.swap_remove(index);
            old.conn.close();
        }
        table.push(OutputConnection {
            remote: name.clone(),
            conn,
            failed: false,
        });
        tracing::debug!(%from, to = %name, "port connected");
        Ok(())
    }

    fn connections(&self) -> Vec<String> {
        self.connections
            .lock()
            .iter()
            .filter(|c| !c.failed)
            .map(|c| c.remote.clone())
            .collect()
    }

    fn stats(&self) -> TransportStats {
        self.driver
            .as_ref()
            .map_or(self.last_stats, CycleDriver::stats)
    }

    fn deactivate(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            driver.stop();
            self.last_stats = driver.stats();
            tracing::info!(port = %self.output_port_name(), "client deactivated");
        }
    }
}

impl Drop for MidirBackend {
    fn drop(&mut self) {
        self.deactivate();
        for connection in self.connections.lock().drain(..) {
            connection.conn.close();
        }
    }
}
