//! Integration tests for midicmd-io.
//!
//! Exercises the queue-to-port path through [`ManualBackend`] and the
//! [`CycleBuffer`] write rules.

use midicmd_core::{EventQueue, MidiEvent, MidiSink, WriteError, process_cycle};
use midicmd_io::{ClientConfig, CycleBuffer, Error, ManualBackend, MidiBackend, MidirBackend};
use proptest::prelude::*;

#[test]
fn queued_events_reach_the_port_on_next_cycle() {
    let queue: &'static mut EventQueue = Box::leak(Box::new(EventQueue::new()));
    let (mut producer, mut consumer) = queue.split();

    let mut backend = ManualBackend::new(["synth:in"]);
    let handle = backend.clone();
    backend
        .activate(
            Box::new(move |buffer| process_cycle(&mut consumer, buffer)),
            Box::new(|| {}),
        )
        .unwrap();
    backend.connect("synth").unwrap();

    assert!(producer.push(MidiEvent::three(0x90, 60, 100)));
    assert!(producer.push(MidiEvent::three(0x80, 60, 0)));
    let stats = handle.run_cycle().unwrap();
    assert_eq!(stats.delivered, 2);

    let empty = handle.run_cycle().unwrap();
    assert_eq!(empty.drained(), 0);
    assert_eq!(
        handle.sent(),
        vec![
            MidiEvent::three(0x90, 60, 100),
            MidiEvent::three(0x80, 60, 0)
        ]
    );
    assert_eq!(backend.stats().cycles, 2);
}

#[test]
fn cycle_overflow_is_counted_not_carried() {
    let config = ClientConfig {
        max_events: 2,
        ..ClientConfig::default()
    };
    let queue: &'static mut EventQueue = Box::leak(Box::new(EventQueue::new()));
    let (mut producer, mut consumer) = queue.split();

    let mut backend = ManualBackend::with_config(config, Vec::<String>::new());
    backend
        .activate(
            Box::new(move |buffer| process_cycle(&mut consumer, buffer)),
            Box::new(|| {}),
        )
        .unwrap();

    for program in 0..5 {
        assert!(producer.push(MidiEvent::two(0xC0, program)));
    }
    let stats = backend.run_cycle().unwrap();
    assert_eq!(stats.delivered, 2);
    assert_eq!(stats.dropped, 3);

    backend.run_cycle();
    assert_eq!(backend.sent().len(), 2);
    assert_eq!(backend.stats().dropped, 3);
}

#[test]
fn midir_rejects_bad_config_before_opening() {
    let config = ClientConfig {
        buffer_size: 0,
        ..ClientConfig::default()
    };
    assert!(matches!(
        MidirBackend::open(config),
        Err(Error::InvalidConfig(_))
    ));
}

proptest! {
    /// Writes in non-decreasing order inside the cycle are all kept up to
    /// capacity; everything past capacity is refused.
    #[test]
    fn ordered_writes_fill_to_capacity(
        mut times in prop::collection::vec(0u32..256, 0..40),
        capacity in 1usize..32,
    ) {
        times.sort_unstable();
        let mut buffer = CycleBuffer::new(256, capacity);
        let mut refused = 0;
        for &time in &times {
            match buffer.write(time, &[0xF8]) {
                Ok(()) => {}
                Err(WriteError::BufferFull) => refused += 1,
                Err(other) => prop_assert!(false, "unexpected {other:?}"),
            }
        }
        prop_assert_eq!(buffer.len(), times.len().min(capacity));
        prop_assert_eq!(refused, times.len().saturating_sub(capacity));
        let kept: Vec<u32> = buffer.events().iter().map(MidiEvent::time).collect();
        prop_assert_eq!(kept, times[..buffer.len()].to_vec());
    }
}
