//! Keeps the process resident so the cycle thread does not page-fault.

#[cfg(unix)]
use nix::sys::mman::{MlockAllFlags, mlockall};

/// Current and future pages.
#[cfg(unix)]
fn flags() -> MlockAllFlags {
    MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE
}

/// Locks all process memory. Failure is logged and otherwise ignored.
#[cfg(unix)]
pub fn lock_all() -> bool {
    match mlockall(flags()) {
        Ok(()) => {
            tracing::debug!("process memory locked");
            true
        }
        Err(err) => {
            tracing::warn!("cannot lock memory: {err}");
            false
        }
    }
}

/// Memory locking is not available here.
#[cfg(not(unix))]
pub fn lock_all() -> bool {
    false
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn locks_current_and_future_pages() {
        let flags = flags();
        assert!(flags.contains(MlockAllFlags::MCL_CURRENT));
        assert!(flags.contains(MlockAllFlags::MCL_FUTURE));
    }
}
