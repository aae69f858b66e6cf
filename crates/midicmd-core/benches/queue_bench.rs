//! Criterion benchmarks for the event queue, the parser and the cycle callback
//!
//! Run with: cargo bench -p midicmd-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use midicmd_core::{EventQueue, MidiEvent, MidiSink, WriteError, parse_command, process_cycle};

const BURST_SIZES: &[usize] = &[1, 16, 64, 255];

/// Sink that accepts everything and keeps nothing.
struct NullSink;

impl MidiSink for NullSink {
    fn frames(&self) -> u32 {
        256
    }

    fn clear(&mut self) {}

    fn write(&mut self, time: u32, bytes: &[u8]) -> Result<(), WriteError> {
        black_box((time, bytes));
        Ok(())
    }
}

fn bench_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("EventQueue");

    for &burst in BURST_SIZES {
        group.bench_with_input(BenchmarkId::new("push_drain", burst), &burst, |b, &burst| {
            let mut queue: EventQueue = EventQueue::new();
            let (mut tx, mut rx) = queue.split();
            let event = MidiEvent::three(0x90, 60, 100);
            b.iter(|| {
                for _ in 0..burst {
                    black_box(tx.push(black_box(event)));
                }
                black_box(rx.drain_into(|ev| {
                    black_box(ev);
                }));
            });
        });
    }

    group.finish();
}

fn bench_process_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("process_cycle");

    for &burst in BURST_SIZES {
        group.bench_with_input(BenchmarkId::new("drain", burst), &burst, |b, &burst| {
            let mut queue: EventQueue = EventQueue::new();
            let (mut tx, mut rx) = queue.split();
            let mut sink = NullSink;
            b.iter(|| {
                for note in 0..burst {
                    tx.push(MidiEvent::three(0x90, note as u8 & 0x7f, 100));
                }
                black_box(process_cycle(&mut rx, &mut sink));
            });
        });
    }

    // Empty cycles are the common case
    group.bench_function("empty", |b| {
        let mut queue: EventQueue = EventQueue::new();
        let (_tx, mut rx) = queue.split();
        let mut sink = NullSink;
        b.iter(|| black_box(process_cycle(&mut rx, &mut sink)));
    });

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_command");

    for line in ["N 60 100\n", ". 90 3c 40\n", "CC 0x07 0177\n", "bogus input\n"] {
        group.bench_function(line.trim(), |b| {
            b.iter(|| black_box(parse_command(black_box(line))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_queue, bench_process_cycle, bench_parse);
criterion_main!(benches);
