//! Hand-stepped MIDI backend for tests.
//!
//! [`ManualBackend`] has no thread and no system MIDI. Cycles run only when
//! [`ManualBackend::run_cycle`] is called, everything the process callback
//! writes is recorded, and the set of remote ports is a plain list the test
//! controls. Clones share state, so a test can keep a handle while the code
//! under test owns another.

use std::sync::Arc;

use midicmd_core::{CycleStats, MidiEvent};
use parking_lot::Mutex;

use crate::backend::{
    ClientConfig, MidiBackend, ProcessCallback, ShutdownCallback, TransportStats,
};
use crate::cycle::CycleBuffer;
use crate::{Error, Result};

struct State {
    config: ClientConfig,
    available: Vec<String>,
    connections: Vec<String>,
    process: Option<ProcessCallback>,
    shutdown: Option<ShutdownCallback>,
    buffer: CycleBuffer,
    sent: Vec<MidiEvent>,
    stats: TransportStats,
}

/// Deterministic backend stepped by hand.
#[derive(Clone)]
pub struct ManualBackend {
    client_name: String,
    state: Arc<Mutex<State>>,
}

impl ManualBackend {
    /// Backend with the default configuration and the given remote ports.
    pub fn new<I, S>(available_ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_config(ClientConfig::default(), available_ports)
    }

    /// Backend with an explicit configuration.
    pub fn with_config<I, S>(config: ClientConfig, available_ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let buffer = CycleBuffer::new(config.buffer_size, config.max_events);
        Self {
            client_name: config.client_name.clone(),
            state: Arc::new(Mutex::new(State {
                config,
                available: available_ports.into_iter().map(Into::into).collect(),
                connections: Vec::new(),
                process: None,
                shutdown: None,
                buffer,
                sent: Vec::new(),
                stats: TransportStats::default(),
            })),
        }
    }

    /// Runs one cycle. Returns `None` while the backend is not active.
    pub fn run_cycle(&self) -> Option<CycleStats> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let process = state.process.as_mut()?;
        let stats = process(&mut state.buffer);
        state.sent.extend_from_slice(state.buffer.events());
        state.stats.cycles += 1;
        state.stats.delivered += u64::from(stats.delivered);
        state.stats.dropped += u64::from(stats.dropped);
        Some(stats)
    }

    /// Every message written to the output port so far.
    pub fn sent(&self) -> Vec<MidiEvent> {
        self.state.lock().sent.clone()
    }

    /// Returns `true` between activation and deactivation or shutdown.
    pub fn is_active(&self) -> bool {
        self.state.lock().process.is_some()
    }

    /// Makes a remote port visible.
    pub fn add_port(&self, name: impl Into<String>) {
        self.state.lock().available.push(name.into());
    }

    /// Removes a remote port, dropping any connection to it.
    pub fn remove_port(&self, name: &str) {
        let mut state = self.state.lock();
        state.available.retain(|port| port != name);
        state.connections.retain(|port| port != name);
    }

    /// Simulates the scheduler going away: the shutdown callback runs and
    /// cycles stop.
    pub fn trigger_shutdown(&self) {
        let callback = {
            let mut state = self.state.lock();
            state.process = None;
            state.shutdown.take()
        };
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl MidiBackend for ManualBackend {
    fn name(&self) -> &str {
        "manual"
    }

    fn client_name(&self) -> &str {
        &self.client_name
    }

    fn output_port_name(&self) -> String {
        self.state.lock().config.full_port_name()
    }

    fn activate(&mut self, process: ProcessCallback, shutdown: ShutdownCallback) -> Result<()> {
        let mut state = self.state.lock();
        if state.process.is_some() {
            return Err(Error::AlreadyActive);
        }
        state.config.validate()?;
        state.process = Some(process);
        state.shutdown = Some(shutdown);
        Ok(())
    }

    fn connect(&mut self, remote: &str) -> Result<()> {
        let mut state = self.state.lock();
        let name = state
            .available
            .iter()
            .find(|port| port.as_str() == remote)
            .or_else(|| state.available.iter().find(|port| port.contains(remote)))
            .cloned()
            .ok_or_else(|| Error::PortNotFound(remote.to_string()))?;
        state.connections.retain(|port| *port != name);
        state.connections.push(name);
        Ok(())
    }

    fn connections(&self) -> Vec<String> {
        self.state.lock().connections.clone()
    }

    fn stats(&self) -> TransportStats {
        self.state.lock().stats
    }

    fn deactivate(&mut self) {
        let mut state = self.state.lock();
        state.process = None;
        state.shutdown = None;
    }
}

impl std::fmt::Debug for ManualBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualBackend")
            .field("available", &state.available)
            .field("connections", &state.connections)
            .field("active", &state.process.is_some())
            .field("sent", &state.sent.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use midicmd_core::MidiSink;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn one_clock_per_cycle() -> ProcessCallback {
        Box::new(|buffer: &mut CycleBuffer| {
            buffer.clear();
            buffer.write(0, &[0xF8]).unwrap();
            CycleStats {
                delivered: 1,
                dropped: 0,
            }
        })
    }

    #[test]
    fn cycles_only_run_while_active() {
        let mut backend = ManualBackend::new(["synth:in"]);
        assert!(backend.run_cycle().is_none());

        backend.activate(one_clock_per_cycle(), Box::new(|| {})).unwrap();
        assert!(matches!(
            backend.activate(one_clock_per_cycle(), Box::new(|| {})),
            Err(Error::AlreadyActive)
        ));
        backend.run_cycle();
        backend.run_cycle();
        assert_eq!(backend.sent(), vec![MidiEvent::one(0xF8); 2]);
        assert_eq!(backend.stats().cycles, 2);

        backend.deactivate();
        assert!(backend.run_cycle().is_none());
        assert!(!backend.is_active());
    }

    #[test]
    fn connect_matches_exact_then_substring() {
        let mut backend = ManualBackend::new(["synth:in", "synth:in-2"]);
        backend.connect("synth:in-2").unwrap();
        backend.connect("synth").unwrap();
        backend.connect("synth").unwrap();
        assert_eq!(backend.connections(), vec!["synth:in-2", "synth:in"]);

        assert!(matches!(
            backend.connect("drums"),
            Err(Error::PortNotFound(name)) if name == "drums"
        ));
    }

    #[test]
    fn removed_port_loses_its_connection() {
        let mut backend = ManualBackend::new(["a:in"]);
        backend.connect("a:in").unwrap();
        backend.remove_port("a:in");
        assert!(backend.connections().is_empty());
        assert!(backend.connect("a:in").is_err());

        backend.add_port("a:in");
        backend.connect("a:in").unwrap();
        assert_eq!(backend.connections(), vec!["a:in"]);
    }

    #[test]
    fn shutdown_runs_callback_once() {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let mut backend = ManualBackend::new(Vec::<String>::new());
        backend
            .activate(
                one_clock_per_cycle(),
                Box::new(move || flag.store(true, Ordering::SeqCst)),
            )
            .unwrap();

        let handle = backend.clone();
        handle.trigger_shutdown();
        assert!(fired.load(Ordering::SeqCst));
        assert!(backend.run_cycle().is_none());
        handle.trigger_shutdown();
    }
}
