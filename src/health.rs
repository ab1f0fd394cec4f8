//! Health monitor.
//!
//! Hardware paths (LED output, thermal source, buttons) report every
//! attempt here.  A path that fails `threshold` times in a row raises its
//! [`HealthFault`] bit; the first success clears it.
//!
//! ## Fault lifecycle
//!
//! 1. A read or write fails; the streak counter for that path grows.
//! 2. On the `threshold`-th consecutive failure the bit is set and the
//!    caller gets [`HealthChange::Raised`] to forward as an event.
//! 3. The control loops keep running; the bit is visible through
//!    [`faults`](HealthMonitor::faults) and the `status` control query.
//! 4. The next success resets the streak and clears the bit
//!    ([`HealthChange::Cleared`]).
//!
//! Several faults can be active at once; the supervisor is degraded while
//! any bit is set.

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use log::{error, info};

use crate::error::HealthFault;

/// Consecutive failures before a path counts as degraded.
pub const DEFAULT_DEGRADED_THRESHOLD: u32 = 3;

/// Edge reported by the monitor when a fault bit flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthChange {
    Raised(HealthFault),
    Cleared(HealthFault),
}

/// Lock-free health bookkeeping, shared behind an `Arc`.
#[derive(Debug)]
pub struct HealthMonitor {
    threshold: u32,
    /// Latched fault bitmask.
    faults: AtomicU8,
    /// Consecutive failures per path, indexed by [`HealthFault::index`].
    streaks: [AtomicU32; 3],
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_DEGRADED_THRESHOLD)
    }
}

impl HealthMonitor {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            faults: AtomicU8::new(0),
            streaks: [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)],
        }
    }

    /// Record a failed attempt on the path guarded by `fault`.
    pub fn record_failure(&self, fault: HealthFault) -> Option<HealthChange> {
        let streak = self.streaks[fault.index()].fetch_add(1, Ordering::AcqRel) + 1;
        if streak < self.threshold {
            return None;
        }
        let prev = self.faults.fetch_or(fault.mask(), Ordering::AcqRel);
        if prev & fault.mask() == 0 {
            error!("HEALTH FAULT SET: {fault} ({streak} consecutive failures)");
            Some(HealthChange::Raised(fault))
        } else {
            None
        }
    }

    /// Record a successful attempt on the path guarded by `fault`.
    pub fn record_success(&self, fault: HealthFault) -> Option<HealthChange> {
        self.streaks[fault.index()].store(0, Ordering::Release);
        let prev = self.faults.fetch_and(!fault.mask(), Ordering::AcqRel);
        if prev & fault.mask() != 0 {
            info!("HEALTH FAULT CLEARED: {fault}");
            Some(HealthChange::Cleared(fault))
        } else {
            None
        }
    }

    /// Current fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults.load(Ordering::Acquire)
    }

    /// True if **any** fault is active.
    pub fn is_degraded(&self) -> bool {
        self.faults() != 0
    }

    /// Check if a specific fault is active.
    pub fn has_fault(&self, fault: HealthFault) -> bool {
        self.faults() & fault.mask() != 0
    }

    /// Current failure streak for a path.
    pub fn streak(&self, fault: HealthFault) -> u32 {
        self.streaks[fault.index()].load(Ordering::Acquire)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
