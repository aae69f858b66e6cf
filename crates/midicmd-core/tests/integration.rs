//! Integration tests for midicmd-core.
//!
//! Tests cover the full producer-to-sink path through the public API and a
//! two-thread stress run of the queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use midicmd_core::{
    Action, CycleStats, Dispatcher, EventQueue, ExitReason, INVALID_MESSAGE, MidiSink, RunState,
    WriteError, process_cycle,
};

/// Sink recording every accepted message, with room for `limit` per cycle.
struct RecordingSink {
    frames: u32,
    limit: usize,
    cycle: Vec<(u32, Vec<u8>)>,
    history: Vec<Vec<u8>>,
}

impl RecordingSink {
    fn new(frames: u32, limit: usize) -> Self {
        Self {
            frames,
            limit,
            cycle: Vec::new(),
            history: Vec::new(),
        }
    }
}

impl MidiSink for RecordingSink {
    fn frames(&self) -> u32 {
        self.frames
    }

    fn clear(&mut self) {
        self.cycle.clear();
    }

    fn write(&mut self, time: u32, bytes: &[u8]) -> Result<(), WriteError> {
        if self.cycle.len() == self.limit {
            return Err(WriteError::BufferFull);
        }
        self.cycle.push((time, bytes.to_vec()));
        self.history.push(bytes.to_vec());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Command line to sink
// ---------------------------------------------------------------------------

#[test]
fn session_lines_reach_the_sink_in_order() {
    let state = RunState::new();
    state.start();
    let mut queue: EventQueue = EventQueue::new();
    let (producer, mut consumer) = queue.split();
    let mut dispatcher = Dispatcher::new(producer, &state);
    let mut sink = RecordingSink::new(256, 64);

    let script = [
        "CC 7 100\n",
        "N 60 127\n",
        "help\n",
        "what is this\n",
        ". b0 7b 00\n",
        "n 60 0\n",
        "2 0xC0 5\n",
        "1 0xFE\n",
    ];
    let actions: Vec<Action> = script
        .iter()
        .map(|line| dispatcher.handle_line(line))
        .collect();
    assert_eq!(actions[3], Action::Reply(INVALID_MESSAGE));

    let stats = process_cycle(&mut consumer, &mut sink);
    assert_eq!(
        stats,
        CycleStats {
            delivered: 6,
            dropped: 0
        }
    );
    let expected: Vec<Vec<u8>> = vec![
        vec![0xB0, 7, 100],
        vec![0x90, 60, 127],
        vec![0xB0, 0x7B, 0x00],
        vec![0x80, 60, 0],
        vec![0xC0, 5],
        vec![0xFE],
    ];
    assert_eq!(sink.history, expected);
    assert!(sink.cycle.iter().all(|(time, _)| *time == 0));

    assert_eq!(dispatcher.handle_line("exit"), Action::Exit);
    assert_eq!(state.exit_reason(), Some(ExitReason::Command));

    // Nothing left over for the next cycle.
    assert_eq!(process_cycle(&mut consumer, &mut sink), CycleStats::default());
}

#[test]
fn cycle_capacity_overflow_drops_remainder() {
    let state = RunState::new();
    let mut queue: EventQueue = EventQueue::new();
    let (producer, mut consumer) = queue.split();
    let mut dispatcher = Dispatcher::new(producer, &state);
    let mut sink = RecordingSink::new(256, 4);

    for note in 0..10 {
        dispatcher.handle_line(&format!("N {note} 1"));
    }
    let stats = process_cycle(&mut consumer, &mut sink);
    assert_eq!(stats.delivered, 4);
    assert_eq!(stats.dropped, 6);
    assert_eq!(sink.history.len(), 4);
}

// ---------------------------------------------------------------------------
// Concurrent stress
// ---------------------------------------------------------------------------

#[test]
fn concurrent_push_and_drain_preserves_order() {
    const TOTAL: u32 = 50_000;

    let mut queue: EventQueue<64> = EventQueue::new();
    let (mut producer, mut consumer) = queue.split();
    let done = AtomicBool::new(false);

    let (pushed, received) = std::thread::scope(|scope| {
        let writer = scope.spawn(|| {
            let mut pushed = Vec::new();
            for seq in 0..TOTAL {
                // 14-bit sequence number spread over two data bytes
                let event = midicmd_core::MidiEvent::new(
                    seq,
                    &[0xE0, (seq & 0x7f) as u8, ((seq >> 7) & 0x7f) as u8],
                )
                .unwrap();
                if producer.push(event) {
                    pushed.push(seq);
                }
                if seq % 97 == 0 {
                    std::thread::yield_now();
                }
            }
            done.store(true, Ordering::Release);
            pushed
        });

        let reader = scope.spawn(|| {
            let mut received = Vec::new();
            loop {
                let finished = done.load(Ordering::Acquire);
                consumer.drain_into(|event| received.push(event.time()));
                if finished && consumer.is_empty() {
                    break;
                }
                std::thread::sleep(Duration::from_micros(50));
            }
            received
        });

        (writer.join().unwrap(), reader.join().unwrap())
    });

    assert!(received.len() <= TOTAL as usize);
    assert_eq!(received, pushed, "every accepted event arrives once, in order");
}

#[test]
fn drained_payload_is_never_torn() {
    const ROUNDS: usize = 20_000;

    let mut queue: EventQueue<16> = EventQueue::new();
    let (mut producer, mut consumer) = queue.split();
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..ROUNDS {
                let fill = (i % 251) as u8;
                let event = midicmd_core::MidiEvent::new(0, &[fill; 16]).unwrap();
                while !producer.push(event) {
                    std::thread::yield_now();
                }
            }
            done.store(true, Ordering::Release);
        });

        scope.spawn(|| {
            let mut seen = 0;
            loop {
                let finished = done.load(Ordering::Acquire);
                seen += consumer.drain_into(|event| {
                    let bytes = event.as_bytes();
                    assert_eq!(bytes.len(), 16);
                    assert!(bytes.iter().all(|&b| b == bytes[0]), "torn slot: {bytes:?}");
                });
                if finished && consumer.is_empty() {
                    break;
                }
                std::thread::yield_now();
            }
            assert_eq!(seen, ROUNDS);
        });
    });
}
