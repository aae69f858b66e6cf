//! Per-cycle output buffer abstraction.
//!
//! The real-time callback never talks to a MIDI transport directly. Each cycle
//! the scheduler hands it something implementing [`MidiSink`]: a buffer that
//! can be cleared and that accepts timestamped messages until its reserved
//! capacity for the cycle runs out.

use core::fmt;

/// Reasons a sink can refuse a message.
///
/// All of these are dropped silently by [`process_cycle`](crate::process_cycle);
/// they exist so sinks and tests can tell the cases apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteError {
    /// The cycle's reserved event capacity is used up.
    BufferFull,
    /// `time` is not inside `0..frames` for this cycle.
    TimeOutOfRange {
        /// Requested frame offset.
        time: u32,
        /// Frames in the current cycle.
        frames: u32,
    },
    /// `time` is earlier than the previously written message.
    OutOfOrder,
    /// The payload is empty or longer than the sink accepts.
    InvalidSize(usize),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferFull => write!(f, "cycle buffer full"),
            Self::TimeOutOfRange { time, frames } => {
                write!(f, "frame offset {time} outside cycle of {frames} frames")
            }
            Self::OutOfOrder => write!(f, "message earlier than previous message"),
            Self::InvalidSize(len) => write!(f, "invalid message size {len}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for WriteError {}

/// Destination for one cycle's worth of outgoing MIDI.
///
/// Implementations must be real-time safe: `clear` and `write` may not
/// allocate, lock or perform I/O.
pub trait MidiSink {
    /// Frames in the current cycle.
    fn frames(&self) -> u32;

    /// Resets the buffer for a new cycle. Must be idempotent.
    fn clear(&mut self);

    /// Appends `bytes` at frame offset `time`.
    fn write(&mut self, time: u32, bytes: &[u8]) -> Result<(), WriteError>;
}
