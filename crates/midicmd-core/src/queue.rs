//! Wait-free single-producer/single-consumer event queue.
//!
//! [`EventQueue`] is a fixed-size ring of [`MidiEvent`] slots shared between
//! the control thread (producer) and the real-time callback (consumer). Both
//! sides are wait-free: [`Producer::push`] drops the event when the ring is
//! full, and [`Consumer::drain_into`] only visits the events that were
//! published when the drain started.
//!
//! # Index Discipline
//!
//! ```text
//!          tail (consumer writes)        head (producer writes)
//!            │                             │
//!   ┌────┬───▼┬────┬────┬────┬────┬────┬──▼─┬────┐
//!   │    │ e0 │ e1 │ e2 │ e3 │ e4 │ e5 │    │    │
//!   └────┴────┴────┴────┴────┴────┴────┴────┴────┘
//! ```
//!
//! - empty: `head == tail`
//! - full: `head + 1 == tail (mod N)`, so `N - 1` slots are usable
//!
//! The producer publishes a slot with a `Release` store of `head`; the consumer
//! reads `head` with `Acquire` before touching the slot. Symmetrically, the
//! consumer hands a slot back with a `Release` store of `tail`, which the
//! producer reads with `Acquire` before overwriting it.
//!
//! Slots are stored as atomic words rather than `UnsafeCell`s, so the ring is
//! entirely safe code. Word accesses inside a slot are `Relaxed`; the index
//! stores provide the ordering.
//!
//! # Example
//!
//! ```rust
//! use midicmd_core::{EventQueue, MidiEvent};
//!
//! let mut queue: EventQueue<8> = EventQueue::new();
//! let (mut producer, mut consumer) = queue.split();
//!
//! assert!(producer.push(MidiEvent::three(0x90, 60, 100)));
//! assert!(producer.push(MidiEvent::three(0x80, 60, 0)));
//!
//! let mut seen = Vec::new();
//! consumer.drain_into(|ev| seen.push(ev));
//! assert_eq!(seen.len(), 2);
//! assert_eq!(seen[0].as_bytes(), &[0x90, 60, 100]);
//! ```

use core::sync::atomic::{AtomicU8, AtomicU32, AtomicUsize, Ordering};

use crate::event::{MAX_EVENT_SIZE, MidiEvent};

/// Slot count of the queue used by the command client.
pub const QUEUE_CAPACITY: usize = 256;

const WORDS: usize = MAX_EVENT_SIZE / 4;

/// Keeps the producer and consumer indices on separate cache lines.
#[repr(align(64))]
struct CachePadded<T>(T);

/// One ring slot, laid out as atomic words.
struct Slot {
    time: AtomicU32,
    size: AtomicU8,
    words: [AtomicU32; WORDS],
}

impl Slot {
    const fn new() -> Self {
        Self {
            time: AtomicU32::new(0),
            size: AtomicU8::new(0),
            words: [const { AtomicU32::new(0) }; WORDS],
        }
    }

    #[inline]
    fn store(&self, event: &MidiEvent) {
        let data = event.raw_data();
        for (word, chunk) in self.words.iter().zip(data.chunks_exact(4)) {
            word.store(
                u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
                Ordering::Relaxed,
            );
        }
        self.time.store(event.time(), Ordering::Relaxed);
        self.size.store(event.len() as u8, Ordering::Relaxed);
    }

    #[inline]
    fn load(&self) -> MidiEvent {
        let mut data = [0u8; MAX_EVENT_SIZE];
        for (word, chunk) in self.words.iter().zip(data.chunks_exact_mut(4)) {
            chunk.copy_from_slice(&word.load(Ordering::Relaxed).to_le_bytes());
        }
        MidiEvent::from_raw(
            self.time.load(Ordering::Relaxed),
            self.size.load(Ordering::Relaxed),
            data,
        )
    }
}

/// Fixed-capacity SPSC ring of [`MidiEvent`]s.
///
/// `N` is the slot count; one slot is sacrificed to tell full from empty, so
/// at most `N - 1` events can be pending. The queue is created once, split
/// into a [`Producer`] and a [`Consumer`], and never resized.
///
/// For a process-lifetime queue shared with a callback thread, leak a boxed
/// queue and split the `'static` reference:
///
/// ```rust
/// use midicmd_core::EventQueue;
///
/// let queue: &'static mut EventQueue = Box::leak(Box::new(EventQueue::new()));
/// let (producer, consumer) = queue.split();
/// std::thread::spawn(move || drop(consumer)).join().unwrap();
/// drop(producer);
/// ```
pub struct EventQueue<const N: usize = QUEUE_CAPACITY> {
    /// Next slot the producer writes. Written only by [`Producer`].
    head: CachePadded<AtomicUsize>,
    /// Next slot the consumer reads. Written only by [`Consumer`].
    tail: CachePadded<AtomicUsize>,
    slots: [Slot; N],
}

impl<const N: usize> EventQueue<N> {
    /// Creates an empty queue.
    ///
    /// # Panics
    ///
    /// Panics (at compile time in const contexts) if `N < 2`.
    pub const fn new() -> Self {
        assert!(N >= 2, "EventQueue needs at least two slots");
        Self {
            head: CachePadded(AtomicUsize::new(0)),
            tail: CachePadded(AtomicUsize::new(0)),
            slots: [const { Slot::new() }; N],
        }
    }

    /// Splits the queue into its producer and consumer halves.
    ///
    /// The exclusive borrow guarantees there is only ever one of each.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let queue: &Self = self;
        (
            Producer { queue, dropped: 0 },
            Consumer { queue },
        )
    }

    /// Maximum number of pending events (`N - 1`).
    #[inline]
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Snapshot of the number of pending events.
    ///
    /// Exact when called from either side; only an estimate from a third
    /// thread.
    pub fn len(&self) -> usize {
        let head = self.head.0.load(Ordering::Acquire);
        let tail = self.tail.0.load(Ordering::Acquire);
        (head + N - tail) % N
    }

    /// Returns `true` if no events are pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advances an index by one slot, wrapping at `N` without a division.
    #[inline]
    const fn bump(index: usize) -> usize {
        let next = index + 1;
        if next == N { 0 } else { next }
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for EventQueue<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EventQueue")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Writing half of an [`EventQueue`]. Owned by the control thread.
#[derive(Debug)]
pub struct Producer<'a, const N: usize = QUEUE_CAPACITY> {
    queue: &'a EventQueue<N>,
    /// Events rejected because the ring was full.
    dropped: u64,
}

impl<const N: usize> Producer<'_, N> {
    /// Enqueues `event`, or drops it and returns `false` if the queue is full.
    ///
    /// Never blocks and never retries.
    pub fn push(&mut self, event: MidiEvent) -> bool {
        let head = self.queue.head.0.load(Ordering::Relaxed);
        let next = EventQueue::<N>::bump(head);
        if next == self.queue.tail.0.load(Ordering::Acquire) {
            self.dropped += 1;
            return false;
        }
        self.queue.slots[head].store(&event);
        self.queue.head.0.store(next, Ordering::Release);
        true
    }

    /// Number of events dropped by [`push`](Self::push) so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Returns `true` if the next push would be dropped.
    pub fn is_full(&self) -> bool {
        let head = self.queue.head.0.load(Ordering::Relaxed);
        EventQueue::<N>::bump(head) == self.queue.tail.0.load(Ordering::Acquire)
    }

    /// Number of events pending in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if the consumer has nothing left to drain.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Reading half of an [`EventQueue`]. Owned by the real-time callback.
#[derive(Debug)]
pub struct Consumer<'a, const N: usize = QUEUE_CAPACITY> {
    queue: &'a EventQueue<N>,
}

impl<const N: usize> Consumer<'_, N> {
    /// Hands every event pending at call time to `sink`, oldest first.
    ///
    /// `head` is read once, so the pass is bounded by the number of events
    /// queued when it started; events pushed meanwhile wait for the next call.
    /// Returns the number of events drained.
    ///
    /// Real-time safe: no allocation, no locks, no logging.
    #[inline]
    pub fn drain_into<F: FnMut(MidiEvent)>(&mut self, mut sink: F) -> usize {
        let head = self.queue.head.0.load(Ordering::Acquire);
        let mut tail = self.queue.tail.0.load(Ordering::Relaxed);
        let mut drained = 0;
        while tail != head {
            sink(self.queue.slots[tail].load());
            tail = EventQueue::<N>::bump(tail);
            self.queue.tail.0.store(tail, Ordering::Release);
            drained += 1;
        }
        drained
    }

    /// Removes the oldest pending event, if any.
    pub fn pop(&mut self) -> Option<MidiEvent> {
        let tail = self.queue.tail.0.load(Ordering::Relaxed);
        if tail == self.queue.head.0.load(Ordering::Acquire) {
            return None;
        }
        let event = self.queue.slots[tail].load();
        self.queue
            .tail
            .0
            .store(EventQueue::<N>::bump(tail), Ordering::Release);
        Some(event)
    }

    /// Number of events pending in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` if there is nothing to drain.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
