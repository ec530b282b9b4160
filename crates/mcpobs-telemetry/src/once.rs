// SPDX-License-Identifier: MIT OR Apache-2.0
//! One-shot guard controlling installation of a global provider.

use std::sync::atomic::{AtomicBool, Ordering};

/// A flag that lets exactly one initialization run.
///
/// The guard never un-fires. Resetting a global slot replaces its guard
/// with a fresh `SetOnce` instead of mutating the old one.
#[derive(Debug, Default)]
pub struct SetOnce {
    fired: AtomicBool,
}

impl SetOnce {
    /// Create a guard that has not fired yet.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
        }
    }

    /// Run `init` if and only if this guard has not fired before.
    ///
    /// Returns `true` when `init` ran.
    pub fn do_once(&self, init: impl FnOnce()) -> bool {
        if self
            .fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        init();
        true
    }

    /// Whether the guarded initialization has already run.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}
