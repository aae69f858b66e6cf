//! Fixed-capacity MIDI event record.
//!
//! A [`MidiEvent`] holds one outgoing message together with the frame offset
//! it should be written at inside a processing cycle. The payload lives in an
//! inline 16-byte array so events can be copied through the real-time queue
//! without touching the allocator.
//!
//! ## Usage
//!
//! ```rust
//! use midicmd_core::MidiEvent;
//!
//! let note_on = MidiEvent::three(0x90, 60, 100);
//! assert_eq!(note_on.as_bytes(), &[0x90, 60, 100]);
//! assert_eq!(note_on.time(), 0);
//!
//! // Payloads longer than the inline buffer are rejected.
//! assert!(MidiEvent::new(0, &[0xF0; 17]).is_none());
//! ```

/// Inline payload capacity in bytes.
pub const MAX_EVENT_SIZE: usize = 16;

/// One outgoing MIDI message with a cycle-relative frame offset.
///
/// Invariant: `0 < size <= MAX_EVENT_SIZE`. Bytes past `size` are kept zeroed
/// and are never exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    time: u32,
    size: u8,
    data: [u8; MAX_EVENT_SIZE],
}

impl MidiEvent {
    /// Builds an event from a byte slice.
    ///
    /// Returns `None` when `bytes` is empty or longer than [`MAX_EVENT_SIZE`].
    pub fn new(time: u32, bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > MAX_EVENT_SIZE {
            return None;
        }
        let mut data = [0u8; MAX_EVENT_SIZE];
        data[..bytes.len()].copy_from_slice(bytes);
        Some(Self {
            time,
            size: bytes.len() as u8,
            data,
        })
    }

    /// Single-byte message at frame 0 (realtime/system bytes).
    pub const fn one(b0: u8) -> Self {
        let mut data = [0u8; MAX_EVENT_SIZE];
        data[0] = b0;
        Self {
            time: 0,
            size: 1,
            data,
        }
    }

    /// Two-byte message at frame 0.
    pub const fn two(b0: u8, b1: u8) -> Self {
        let mut data = [0u8; MAX_EVENT_SIZE];
        data[0] = b0;
        data[1] = b1;
        Self {
            time: 0,
            size: 2,
            data,
        }
    }

    /// Three-byte message at frame 0 (note, controller, pitch bend, ...).
    pub const fn three(b0: u8, b1: u8, b2: u8) -> Self {
        let mut data = [0u8; MAX_EVENT_SIZE];
        data[0] = b0;
        data[1] = b1;
        data[2] = b2;
        Self {
            time: 0,
            size: 3,
            data,
        }
    }

    /// Returns a copy of this event scheduled at `time` frames into the cycle.
    pub const fn at(mut self, time: u32) -> Self {
        self.time = time;
        self
    }

    /// Frame offset within the cycle.
    #[inline]
    pub const fn time(&self) -> u32 {
        self.time
    }

    /// Payload length in bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.size as usize
    }

    /// Always `false`; kept for symmetry with [`len`](Self::len).
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The valid payload bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.size as usize]
    }

    /// Rebuilds an event from its raw parts, as stored in a queue slot.
    ///
    /// Out-of-range sizes are clamped into `1..=MAX_EVENT_SIZE`.
    pub(crate) fn from_raw(time: u32, size: u8, data: [u8; MAX_EVENT_SIZE]) -> Self {
        let size = size.clamp(1, MAX_EVENT_SIZE as u8);
        Self { time, size, data }
    }

    /// The full inline buffer, including the zeroed tail.
    pub(crate) fn raw_data(&self) -> &[u8; MAX_EVENT_SIZE] {
        &self.data
    }
}
