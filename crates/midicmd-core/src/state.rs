//! Process-wide run state shared by the control loop and its shutdown sources.
//!
//! [`RunState`] is a tri-state atomic (`Starting` → `Running` → `Exiting`)
//! plus the reason of the first exit request. Three sources may request an
//! exit: an OS signal, the scheduler's shutdown notification and the `exit`
//! command. Requests are idempotent; only the first one is recorded.

use core::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Phase {
    /// Transport and ports are being set up.
    Starting = 0,
    /// The control loop is accepting commands.
    Running = 1,
    /// An exit was requested; the control loop stops at its next check.
    Exiting = 2,
}

/// Why the client is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitReason {
    /// Interrupt, hangup or terminate signal.
    Signal = 1,
    /// The cycle scheduler stopped underneath us.
    SchedulerShutdown = 2,
    /// The user typed `exit`.
    Command = 3,
    /// The command input reached end of file.
    EndOfInput = 4,
}

impl ExitReason {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Signal),
            2 => Some(Self::SchedulerShutdown),
            3 => Some(Self::Command),
            4 => Some(Self::EndOfInput),
            _ => None,
        }
    }
}

impl core::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Self::Signal => "caught signal",
            Self::SchedulerShutdown => "shutdown request from scheduler",
            Self::Command => "exit command",
            Self::EndOfInput => "end of input",
        };
        f.write_str(text)
    }
}

/// Atomic run/exit flag.
///
/// Safe to touch from signal-handler threads and the scheduler thread: every
/// operation is a single atomic access.
#[derive(Debug)]
pub struct RunState {
    phase: AtomicU8,
    reason: AtomicU8,
}

impl RunState {
    /// New state in [`Phase::Starting`].
    pub const fn new() -> Self {
        Self {
            phase: AtomicU8::new(Phase::Starting as u8),
            reason: AtomicU8::new(0),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        match self.phase.load(Ordering::Acquire) {
            0 => Phase::Starting,
            1 => Phase::Running,
            _ => Phase::Exiting,
        }
    }

    /// Moves `Starting` to `Running`.
    ///
    /// Returns `false` if an exit was already requested during startup.
    pub fn start(&self) -> bool {
        self.phase
            .compare_exchange(
                Phase::Starting as u8,
                Phase::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Requests an exit. Returns `true` only for the first request.
    pub fn request_exit(&self, reason: ExitReason) -> bool {
        let first = self
            .reason
            .compare_exchange(0, reason as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.phase.store(Phase::Exiting as u8, Ordering::Release);
        first
    }

    /// `true` once any exit has been requested.
    #[inline]
    pub fn should_exit(&self) -> bool {
        self.phase() == Phase::Exiting
    }

    /// Reason of the first exit request, if any.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        ExitReason::from_u8(self.reason.load(Ordering::Acquire))
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
