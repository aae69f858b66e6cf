//! Per-cycle MIDI output buffer.

use midicmd_core::{MAX_EVENT_SIZE, MidiEvent, MidiSink, WriteError};

/// Output buffer handed to the process callback once per cycle.
///
/// Storage is reserved up front for `capacity` messages; [`write`](MidiSink::write)
/// refuses messages instead of growing, so filling the buffer never allocates.
/// Like a JACK MIDI port buffer, messages must be written in non-decreasing
/// frame order and inside `0..frames`.
#[derive(Debug, Clone)]
pub struct CycleBuffer {
    frames: u32,
    capacity: usize,
    events: Vec<MidiEvent>,
}

impl CycleBuffer {
    /// Reserves a buffer for cycles of `frames` frames holding up to
    /// `capacity` messages.
    pub fn new(frames: u32, capacity: usize) -> Self {
        Self {
            frames,
            capacity,
            events: Vec::with_capacity(capacity),
        }
    }

    /// Messages written this cycle, in write order.
    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    /// Number of messages written this cycle.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing was written this cycle.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Messages one cycle can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl MidiSink for CycleBuffer {
    fn frames(&self) -> u32 {
        self.frames
    }

    fn clear(&mut self) {
        self.events.clear();
    }

    fn write(&mut self, time: u32, bytes: &[u8]) -> Result<(), WriteError> {
        if time >= self.frames {
            return Err(WriteError::TimeOutOfRange {
                time,
                frames: self.frames,
            });
        }
        if self.events.last().is_some_and(|last| time < last.time()) {
            return Err(WriteError::OutOfOrder);
        }
        if self.events.len() >= self.capacity {
            return Err(WriteError::BufferFull);
        }
        let event = MidiEvent::new(time, bytes).ok_or(WriteError::InvalidSize(bytes.len()))?;
        debug_assert!(event.len() <= MAX_EVENT_SIZE);
        self.events.push(event);
        Ok(())
    }
}
