//! midicmd Core - real-time safe MIDI command plumbing
//!
//! This crate is the part of `midicmd` that runs on both sides of the
//! real-time boundary: a text command protocol on the control thread, and a
//! lock-free queue drained once per processing cycle on the scheduler thread.
//!
//! # Data Flow
//!
//! ```text
//!  text line ──▶ parse_command ──▶ Command::Message(MidiEvent)
//!                                        │
//!                         Dispatcher ────┤ Producer::push
//!                                        ▼
//!                                   EventQueue (SPSC, 255 slots)
//!                                        │ Consumer::drain_into
//!                                        ▼
//!                   process_cycle ──▶ MidiSink::write(time, bytes)
//! ```
//!
//! # Core Abstractions
//!
//! - [`MidiEvent`] - Fixed-capacity message record with a frame offset
//! - [`EventQueue`] - Wait-free SPSC ring, split into [`Producer`] / [`Consumer`]
//! - [`parse_command`] / [`Command`] - The line protocol
//! - [`Dispatcher`] - Producer-side command execution
//! - [`process_cycle`] - The real-time callback body
//! - [`MidiSink`] - Per-cycle output buffer supplied by a transport
//! - [`RunState`] - Process-wide run/exit flag
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible. Disable the default `std` feature in
//! your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! midicmd-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use midicmd_core::{Action, Dispatcher, EventQueue, RunState};
//!
//! let state = RunState::new();
//! let mut queue: EventQueue = EventQueue::new();
//! let (producer, mut consumer) = queue.split();
//! let mut dispatcher = Dispatcher::new(producer, &state);
//!
//! assert_eq!(dispatcher.handle_line("CC 7 100"), Action::Continue);
//! assert_eq!(consumer.pop().unwrap().as_bytes(), &[0xB0, 7, 100]);
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: No allocation, locking or logging on the consumer side
//! - **Safe code only**: Queue slots are atomic words, not `UnsafeCell`s
//! - **Drop, don't block**: A full queue or full cycle buffer loses the message

#![cfg_attr(not(feature = "std"), no_std)]

pub mod command;
pub mod dispatch;
pub mod event;
pub mod process;
pub mod queue;
pub mod sink;
pub mod state;

pub use command::{Command, HELP_TEXT, INVALID_MESSAGE, parse_command};
pub use dispatch::{Action, Dispatcher};
pub use event::{MAX_EVENT_SIZE, MidiEvent};
pub use process::{CycleStats, process_cycle};
pub use queue::{Consumer, EventQueue, Producer, QUEUE_CAPACITY};
pub use sink::{MidiSink, WriteError};
pub use state::{ExitReason, Phase, RunState};
