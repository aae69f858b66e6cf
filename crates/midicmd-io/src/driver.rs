//! Periodic cycle scheduler.
//!
//! [`CycleDriver`] owns a dedicated thread that runs the process callback once
//! per cycle period, hands the filled [`CycleBuffer`] to a [`Deliver`]
//! implementation, and keeps running totals. It stands in for the audio
//! server's real-time thread on transports that have none.
//!
//! If the thread ends without [`CycleDriver::stop`] having been called (the
//! transport closed, or the callback panicked), the shutdown callback runs
//! exactly once on that thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::Result;
use crate::backend::{ClientConfig, ProcessCallback, ShutdownCallback, TransportStats};
use crate::cycle::CycleBuffer;

/// Outcome of handing one cycle's output to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The cycle's messages went out.
    Sent,
    /// The transport was busy; this cycle's messages were discarded.
    Skipped,
    /// The transport is gone. The driver stops and runs the shutdown callback.
    Closed,
}

/// Transport side of a cycle: sends what the process callback wrote.
///
/// Runs on the scheduler thread, so it must not block.
pub trait Deliver: Send {
    /// Sends the contents of `buffer`.
    fn deliver(&mut self, buffer: &CycleBuffer) -> Delivery;
}

impl<F> Deliver for F
where
    F: FnMut(&CycleBuffer) -> Delivery + Send,
{
    fn deliver(&mut self, buffer: &CycleBuffer) -> Delivery {
        self(buffer)
    }
}

#[derive(Debug, Default)]
struct Counters {
    cycles: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
    skipped: AtomicU64,
    late: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> TransportStats {
        TransportStats {
            cycles: self.cycles.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            skipped_cycles: self.skipped.load(Ordering::Relaxed),
            late_cycles: self.late.load(Ordering::Relaxed),
        }
    }
}

/// Runs the shutdown callback when dropped, unless disarmed first.
struct ShutdownNotifier {
    callback: Option<ShutdownCallback>,
}

impl ShutdownNotifier {
    fn disarm(&mut self) {
        self.callback = None;
    }
}

impl Drop for ShutdownNotifier {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback();
        }
    }
}

/// Handle to a running scheduler thread.
///
/// Dropping the handle stops the thread.
pub struct CycleDriver {
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    handle: Option<JoinHandle<()>>,
}

impl CycleDriver {
    /// Starts the scheduler thread.
    ///
    /// The cycle buffer is sized from `config` (`buffer_size` frames,
    /// `max_events` messages) and the period is [`ClientConfig::cycle_period`].
    pub fn spawn<D>(
        config: &ClientConfig,
        mut process: ProcessCallback,
        shutdown: ShutdownCallback,
        mut deliver: D,
    ) -> Result<Self>
    where
        D: Deliver + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(Counters::default());
        let period = config.cycle_period();
        let mut buffer = CycleBuffer::new(config.buffer_size, config.max_events);

        let thread_running = Arc::clone(&running);
        let thread_counters = Arc::clone(&counters);
        let handle = thread::Builder::new()
            .name("midicmd-cycle".into())
            .spawn(move || {
                let mut notifier = ShutdownNotifier {
                    callback: Some(shutdown),
                };
                let mut deadline = Instant::now();

                while thread_running.load(Ordering::Acquire) {
                    let stats = process(&mut buffer);
                    thread_counters.cycles.fetch_add(1, Ordering::Relaxed);
                    thread_counters
                        .delivered
                        .fetch_add(u64::from(stats.delivered), Ordering::Relaxed);
                    thread_counters
                        .dropped
                        .fetch_add(u64::from(stats.dropped), Ordering::Relaxed);

                    match deliver.deliver(&buffer) {
                        Delivery::Sent => {}
                        Delivery::Skipped => {
                            thread_counters.skipped.fetch_add(1, Ordering::Relaxed);
                        }
                        Delivery::Closed => return,
                    }

                    deadline += period;
                    let now = Instant::now();
                    if now < deadline {
                        thread::sleep(deadline - now);
                    } else {
                        thread_counters.late.fetch_add(1, Ordering::Relaxed);
                        deadline = now;
                    }
                }
                notifier.disarm();
            })?;

        tracing::debug!(
            ?period,
            frames = config.buffer_size,
            max_events = config.max_events,
            "cycle driver started"
        );

        Ok(Self {
            running,
            counters,
            handle: Some(handle),
        })
    }

    /// Returns `true` until the thread has been stopped or has ended on its own.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Counters so far.
    pub fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }

    /// Stops the thread and waits for it. Idempotent.
    ///
    /// The shutdown callback does not run for a requested stop.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("cycle thread panicked");
            }
            tracing::debug!(cycles = self.stats().cycles, "cycle driver stopped");
        }
    }
}

impl Drop for CycleDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CycleDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleDriver")
            .field("running", &self.is_running())
            .field("stats", &self.stats())
            .finish()
    }
}
