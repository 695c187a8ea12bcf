//! # Sweep Overlap Lock
//!
//! Each sweep kind runs under a non-blocking mutex: if a tick fires while
//! the previous run of the same sweep is still processing, the new run
//! returns immediately instead of double-scanning the candidate set.
//! The per-record compare-and-set remains the real safety net — this
//! lock only avoids wasted work within one process.
//!
//! The mutexes are `tokio::sync` (not `parking_lot`) because a sweep
//! holds its guard across `.await` points for its whole run.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Non-blocking guards for the two periodic sweeps.
#[derive(Debug, Clone, Default)]
pub struct SweepLock {
    auto_cancel: Arc<Mutex<()>>,
    reminder: Arc<Mutex<()>>,
}

impl SweepLock {
    /// Create a fresh lock pair.
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to enter the auto-cancellation sweep. `None` means another
    /// run is in flight.
    pub fn try_auto_cancel(&self) -> Option<OwnedMutexGuard<()>> {
        self.auto_cancel.clone().try_lock_owned().ok()
    }

    /// Try to enter the reminder sweep. `None` means another run is in
    /// flight.
    pub fn try_reminder(&self) -> Option<OwnedMutexGuard<()>> {
        self.reminder.clone().try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_held() {
        let lock = SweepLock::new();
        let guard = lock.try_auto_cancel();
        assert!(guard.is_some());
        assert!(lock.try_auto_cancel().is_none());
        drop(guard);
        assert!(lock.try_auto_cancel().is_some());
    }

    #[test]
    fn sweep_kinds_are_independent() {
        let lock = SweepLock::new();
        let _cancel = lock.try_auto_cancel().unwrap();
        assert!(lock.try_reminder().is_some());
    }

    #[test]
    fn clones_share_the_lock() {
        let lock = SweepLock::new();
        let clone = lock.clone();
        let _guard = lock.try_reminder().unwrap();
        assert!(clone.try_reminder().is_none());
    }
}
