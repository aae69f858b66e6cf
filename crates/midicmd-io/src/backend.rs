//! Pluggable MIDI backend abstraction.
//!
//! This module defines the [`MidiBackend`] trait, which decouples the command
//! client from any specific MIDI transport. A backend owns three things:
//!
//! - the client and its single local output port
//! - a cycle scheduler that calls the [`ProcessCallback`] once per period with
//!   a fresh [`CycleBuffer`] and delivers whatever the callback wrote
//! - the connections from the output port to remote ports
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │   midicmd control loop (stdin)   │
//! └──────────────┬───────────────────┘
//!                │ connect / reconnect
//!                ▼
//! ┌──────────────────────────────────┐
//! │        MidiBackend trait         │
//! │  activate / connect / deactivate │
//! └──────────────┬───────────────────┘
//!                │ implemented by
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌─────────────┐  ┌──────────────┐
//! │MidirBackend │  │ManualBackend │
//! │ (ALSA, Core │  │ (tests, step │
//! │ MIDI, WinMM)│  │  by hand)    │
//! └─────────────┘  └──────────────┘
//! ```
//!
//! Callbacks are boxed closures so the trait stays object-safe and the client
//! can hold a `Box<dyn MidiBackend>`.

use std::time::Duration;

use midicmd_core::CycleStats;

use crate::cycle::CycleBuffer;
use crate::{Error, Result};

/// Configuration for opening a MIDI client.
///
/// ## Fields
///
/// - `client_name`: Name announced to the MIDI system (default: `midicmd`)
/// - `port_name`: Local output port name (default: `out`)
/// - `sample_rate`: Frame rate of the cycle clock in Hz (default: 48000)
/// - `buffer_size`: Frames per cycle (default: 256)
/// - `max_events`: Messages one cycle buffer can hold (default: 128)
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Client name.
    pub client_name: String,
    /// Local output port name.
    pub port_name: String,
    /// Cycle clock rate in Hz.
    pub sample_rate: u32,
    /// Frames per cycle.
    pub buffer_size: u32,
    /// Per-cycle output capacity in messages.
    pub max_events: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            client_name: "midicmd".to_string(),
            port_name: "out".to_string(),
            sample_rate: 48000,
            buffer_size: 256,
            max_events: 128,
        }
    }
}

impl ClientConfig {
    /// Checks the numeric fields and the port name.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::InvalidConfig("sample rate must be non-zero".into()));
        }
        if self.buffer_size == 0 {
            return Err(Error::InvalidConfig("buffer size must be non-zero".into()));
        }
        if self.max_events == 0 {
            return Err(Error::InvalidConfig(
                "per-cycle event capacity must be non-zero".into(),
            ));
        }
        if self.client_name.trim().is_empty() {
            return Err(Error::InvalidConfig("client name must not be empty".into()));
        }
        if self.cycle_period().is_zero() {
            return Err(Error::InvalidConfig(format!(
                "cycle of {} frames at {} Hz is shorter than a nanosecond",
                self.buffer_size, self.sample_rate
            )));
        }
        if self.port_name.trim().is_empty() || self.port_name.contains(':') {
            return Err(Error::PortRegistration(self.port_name.clone()));
        }
        Ok(())
    }

    /// Wall-clock length of one cycle (`buffer_size / sample_rate`).
    pub fn cycle_period(&self) -> Duration {
        let nanos = u64::from(self.buffer_size) * 1_000_000_000 / u64::from(self.sample_rate.max(1));
        Duration::from_nanos(nanos)
    }

    /// Full name of the local output port, `client:port`.
    pub fn full_port_name(&self) -> String {
        format!("{}:{}", self.client_name, self.port_name)
    }
}

/// Counters accumulated by a backend's scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Cycles run.
    pub cycles: u64,
    /// Messages accepted into cycle buffers.
    pub delivered: u64,
    /// Messages refused by cycle buffers.
    pub dropped: u64,
    /// Cycles whose output was skipped because the connection table was busy.
    pub skipped_cycles: u64,
    /// Cycles that started later than their deadline.
    pub late_cycles: u64,
}

/// Per-cycle callback.
///
/// Called on the scheduler thread with the cycle's output buffer. It must be
/// real-time safe: no allocation, no locks, no I/O.
pub type ProcessCallback = Box<dyn FnMut(&mut CycleBuffer) -> CycleStats + Send>;

/// Called once if the scheduler stops without being asked to.
pub type ShutdownCallback = Box<dyn FnOnce() + Send>;

/// Pluggable MIDI backend trait.
///
/// ## Lifecycle
///
/// 1. open (backend-specific constructor, fatal on failure)
/// 2. [`activate`](Self::activate): starts the cycle scheduler (fatal on failure)
/// 3. [`connect`](Self::connect): any number of times, failures are recoverable
/// 4. [`deactivate`](Self::deactivate): stops the scheduler; also run on drop
pub trait MidiBackend: Send {
    /// Human-readable backend name (e.g. "midir", "manual").
    fn name(&self) -> &str;

    /// Client name actually in use.
    fn client_name(&self) -> &str;

    /// Full name of the local output port.
    fn output_port_name(&self) -> String;

    /// Starts calling `process` once per cycle.
    ///
    /// `shutdown` is invoked if the scheduler later stops on its own. Whether
    /// that can happen depends on the transport: [`MidirBackend`] has no server
    /// that can go away and never reports its output closed, so with it
    /// `shutdown` only runs if the scheduler thread unwinds from a panic, which
    /// builds with `panic = "abort"` never do.
    ///
    /// [`MidirBackend`]: crate::MidirBackend
    fn activate(&mut self, process: ProcessCallback, shutdown: ShutdownCallback) -> Result<()>;

    /// Connects the output port to the remote port named `remote`.
    ///
    /// An existing connection to the same remote port is replaced.
    fn connect(&mut self, remote: &str) -> Result<()>;

    /// Remote ports currently connected.
    fn connections(&self) -> Vec<String>;

    /// Scheduler counters so far.
    fn stats(&self) -> TransportStats;

    /// Stops the scheduler. Idempotent.
    fn deactivate(&mut self);
}
