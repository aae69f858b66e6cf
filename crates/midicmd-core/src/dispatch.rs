//! Producer-side command handling.
//!
//! [`Dispatcher`] owns the queue's [`Producer`] and the shared [`RunState`].
//! Each input line is parsed, messages are pushed, and the caller gets back an
//! [`Action`] telling it what to print or do next. A full queue loses the
//! command silently; the loss is only visible through
//! [`Dispatcher::dropped`] (and a `debug` trace with the `tracing` feature).

use crate::command::{Command, HELP_TEXT, INVALID_MESSAGE, parse_command};
use crate::queue::{Producer, QUEUE_CAPACITY};
use crate::state::{ExitReason, RunState};

/// What the control loop should do after a line was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing to report; read the next line.
    Continue,
    /// Print this text, then read the next line.
    Reply(&'static str),
    /// Re-run the startup port connections.
    Reconnect,
    /// Stop reading input. The run state already says why.
    Exit,
}

/// Turns input lines into queued events and control actions.
#[derive(Debug)]
pub struct Dispatcher<'a, const N: usize = QUEUE_CAPACITY> {
    producer: Producer<'a, N>,
    state: &'a RunState,
    queued: u64,
}

impl<'a, const N: usize> Dispatcher<'a, N> {
    /// Wraps the producer half of the queue.
    pub fn new(producer: Producer<'a, N>, state: &'a RunState) -> Self {
        Self {
            producer,
            state,
            queued: 0,
        }
    }

    /// Parses and executes one line.
    pub fn handle_line(&mut self, line: &str) -> Action {
        self.execute(parse_command(line))
    }

    /// Executes an already parsed command.
    pub fn execute(&mut self, command: Command) -> Action {
        match command {
            Command::Terminate => {
                self.state.request_exit(ExitReason::Command);
                Action::Exit
            }
            Command::Reconnect => Action::Reconnect,
            Command::Help => Action::Reply(HELP_TEXT),
            Command::Message(event) => {
                let accepted = self.producer.push(event);
                if accepted {
                    self.queued += 1;
                }
                #[cfg(feature = "tracing")]
                if !accepted {
                    tracing::debug!(bytes = ?event.as_bytes(), "event queue full, message dropped");
                }
                Action::Continue
            }
            Command::Unrecognized => Action::Reply(INVALID_MESSAGE),
        }
    }

    /// Events successfully queued so far.
    pub fn queued(&self) -> u64 {
        self.queued
    }

    /// Events lost to a full queue so far.
    pub fn dropped(&self) -> u64 {
        self.producer.dropped()
    }

    /// The shared run state.
    pub fn state(&self) -> &'a RunState {
        self.state
    }

    /// Read access to the producer half.
    pub fn producer(&self) -> &Producer<'a, N> {
        &self.producer
    }
}
