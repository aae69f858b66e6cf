//! The real-time cycle callback.
//!
//! [`process_cycle`] is what a scheduler runs once per processing period: it
//! clears the cycle's output buffer and drains the event queue into it.
//! Nothing here allocates, locks, logs or returns an error; a message the sink
//! refuses is counted and dropped.

use crate::queue::Consumer;
use crate::sink::MidiSink;

/// Counters for one cycle, returned by [`process_cycle`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Events accepted by the sink.
    pub delivered: u32,
    /// Events the sink refused (full buffer, bad offset, ...).
    pub dropped: u32,
}

impl CycleStats {
    /// Total events taken off the queue this cycle.
    pub fn drained(&self) -> u32 {
        self.delivered + self.dropped
    }
}

/// Runs one processing cycle.
///
/// 1. clears `sink`
/// 2. drains every event pending in `consumer` into it, in FIFO order
///
/// Always completes; refused writes are dropped without retry.
#[inline]
pub fn process_cycle<const N: usize, S: MidiSink + ?Sized>(
    consumer: &mut Consumer<'_, N>,
    sink: &mut S,
) -> CycleStats {
    sink.clear();
    let mut stats = CycleStats::default();
    consumer.drain_into(|event| match sink.write(event.time(), event.as_bytes()) {
        Ok(()) => stats.delivered += 1,
        Err(_) => stats.dropped += 1,
    });
    stats
}
