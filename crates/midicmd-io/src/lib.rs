//! MIDI transport layer for midicmd.
//!
//! This crate provides:
//!
//! - **Backend abstraction**: [`MidiBackend`] for opening a client, running the
//!   per-cycle callback and connecting the output port
//! - **Cycle scheduling**: [`CycleDriver`], a periodic thread that plays the
//!   role of the real-time scheduler, and [`CycleBuffer`], the per-cycle output
//! - **Backends**: [`MidirBackend`] for system MIDI through midir, and
//!   [`ManualBackend`], a deterministic backend stepped by hand in tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use midicmd_core::{EventQueue, MidiEvent, process_cycle};
//! use midicmd_io::{ClientConfig, MidiBackend, MidirBackend};
//!
//! let queue: &'static mut EventQueue = Box::leak(Box::new(EventQueue::new()));
//! let (mut producer, mut consumer) = queue.split();
//!
//! let mut backend = MidirBackend::open(ClientConfig::default())?;
//! backend.activate(
//!     Box::new(move |buffer| process_cycle(&mut consumer, buffer)),
//!     Box::new(|| eprintln!("scheduler went away")),
//! )?;
//! backend.connect("FLUID Synth")?;
//!
//! producer.push(MidiEvent::three(0x90, 60, 100));
//! ```

pub mod backend;
mod cycle;
mod driver;
mod manual_backend;
mod midir_backend;

pub use backend::{ClientConfig, MidiBackend, ProcessCallback, ShutdownCallback, TransportStats};
pub use cycle::CycleBuffer;
pub use driver::{CycleDriver, Deliver, Delivery};
pub use manual_backend::ManualBackend;
pub use midir_backend::MidirBackend;

/// Error types for MIDI transport operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The MIDI client could not be created.
    #[error("cannot open MIDI client '{name}': {reason}")]
    ClientOpen {
        /// Requested client name.
        name: String,
        /// Backend error text.
        reason: String,
    },

    /// The local output port could not be registered.
    #[error("cannot register MIDI output port '{0}'")]
    PortRegistration(String),

    /// The client configuration is unusable.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// The client was activated twice.
    #[error("client is already active")]
    AlreadyActive,

    /// No remote port matched the requested name.
    #[error("no MIDI port matching '{0}'")]
    PortNotFound(String),

    /// Connecting the output port to a remote port failed.
    #[error("cannot connect {from} to {to}: {reason}")]
    Connect {
        /// Local port name.
        from: String,
        /// Remote port name.
        to: String,
        /// Backend error text.
        reason: String,
    },

    /// Standard I/O error (e.g. the scheduler thread could not be spawned).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for MIDI transport operations.
pub type Result<T> = std::result::Result<T, Error>;
