// SPDX-License-Identifier: MIT OR Apache-2.0
//! Process-wide tracer and meter provider slots, and the protocol that resets
//! them between tests.
//!
//! Every write to [`opentelemetry::global`] made by this crate goes through
//! this module. A slot holds at most one provider, guarded by a [`SetOnce`]:
//! installation succeeds once, and further installs are refused until the
//! slot is reset, which swaps in a fresh guard.
//!
//! Resetting is delegated to a [`GlobalsReset`] strategy picked once per
//! process. With the `noop-globals` feature the API's own no-op tracer
//! provider is re-installed; without it the crate falls back to installing
//! an empty SDK tracer provider and only touches slots that exist. The API
//! has no public no-op meter provider, so both strategies publish a
//! reader-less SDK meter provider on a metrics reset.

use crate::once::SetOnce;
use opentelemetry::global;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::fmt;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// GlobalSlot
// ---------------------------------------------------------------------------

struct SlotState<P> {
    provider: Option<P>,
    once: SetOnce,
}

/// A process-wide slot holding at most one installed provider.
pub(crate) struct GlobalSlot<P> {
    signal: &'static str,
    state: Mutex<SlotState<P>>,
}

impl<P: Clone> GlobalSlot<P> {
    pub(crate) const fn new(signal: &'static str) -> Self {
        Self {
            signal,
            state: Mutex::new(SlotState {
                provider: None,
                once: SetOnce::new(),
            }),
        }
    }

    // A test that panics while holding the lock must not wedge the slot for
    // the tests that follow it.
    fn lock(&self) -> MutexGuard<'_, SlotState<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Install `provider` unless the guard already fired.
    ///
    /// `publish` mirrors the provider into `opentelemetry::global` and only
    /// runs when the install is accepted.
    pub(crate) fn set(&self, provider: P, publish: impl FnOnce(&P)) -> bool {
        let mut state = self.lock();
        let SlotState { provider: slot, once } = &mut *state;
        let installed = once.do_once(|| {
            publish(&provider);
            *slot = Some(provider);
        });
        if installed {
            debug!(signal = self.signal, "installed global provider");
        } else {
            warn!(
                signal = self.signal,
                "global provider already installed; ignoring override"
            );
        }
        installed
    }

    /// Empty the slot and replace its guard with a fresh one.
    pub(crate) fn reset(&self, unpublish: impl FnOnce()) {
        let mut state = self.lock();
        state.provider = None;
        state.once = SetOnce::new();
        unpublish();
        debug!(signal = self.signal, "reset global provider slot");
    }

    pub(crate) fn get(&self) -> Option<P> {
        self.lock().provider.clone()
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.lock().provider.is_some()
    }
}

static TRACER_SLOT: GlobalSlot<SdkTracerProvider> = GlobalSlot::new("tracer");

// Created lazily on first install, so a reset before any meter provider was
// ever set finds nothing to clear.
static METER_SLOT: OnceLock<GlobalSlot<SdkMeterProvider>> = OnceLock::new();

fn meter_slot() -> &'static GlobalSlot<SdkMeterProvider> {
    METER_SLOT.get_or_init(|| GlobalSlot::new("meter"))
}

// ---------------------------------------------------------------------------
// Install / inspect
// ---------------------------------------------------------------------------

/// Install `provider` as the global tracer provider.
///
/// Returns `false`, leaving the current provider in place, if a tracer
/// provider was already installed since the last [`reset_trace_globals`].
pub fn set_tracer_provider(provider: SdkTracerProvider) -> bool {
    TRACER_SLOT.set(provider, |p| {
        global::set_tracer_provider(p.clone());
    })
}

/// Install `provider` as the global meter provider.
///
/// Returns `false`, leaving the current provider in place, if a meter
/// provider was already installed since the last [`reset_metrics_globals`].
pub fn set_meter_provider(provider: SdkMeterProvider) -> bool {
    meter_slot().set(provider, |p| {
        global::set_meter_provider(p.clone());
    })
}

/// The tracer provider currently installed by this crate, if any.
pub fn installed_tracer_provider() -> Option<SdkTracerProvider> {
    TRACER_SLOT.get()
}

/// The meter provider currently installed by this crate, if any.
pub fn installed_meter_provider() -> Option<SdkMeterProvider> {
    METER_SLOT.get().and_then(GlobalSlot::get)
}

/// Whether a tracer provider is installed.
pub fn tracer_provider_installed() -> bool {
    TRACER_SLOT.is_installed()
}

/// Whether a meter provider is installed.
pub fn meter_provider_installed() -> bool {
    METER_SLOT.get().is_some_and(GlobalSlot::is_installed)
}

// ---------------------------------------------------------------------------
// Reset strategies
// ---------------------------------------------------------------------------

/// A way of returning the global provider slots to their uninitialized state.
///
/// Implementations must be idempotent and must leave each slot accepting a
/// new install.
pub trait GlobalsReset: Send + Sync + fmt::Debug {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Clear the tracer slot and un-publish its provider.
    fn reset_trace(&self);

    /// Clear the meter slot and un-publish its provider.
    fn reset_metrics(&self);
}

/// Resets the tracer through the OpenTelemetry API's no-op tracer provider.
///
/// The meter is reset by publishing a reader-less SDK meter provider, which
/// drops every measurement.
#[cfg(feature = "noop-globals")]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGlobalsReset;

#[cfg(feature = "noop-globals")]
impl GlobalsReset for NoopGlobalsReset {
    fn name(&self) -> &'static str {
        "noop-globals"
    }

    fn reset_trace(&self) {
        TRACER_SLOT.reset(|| {
            global::set_tracer_provider(opentelemetry::trace::noop::NoopTracerProvider::new());
        });
    }

    fn reset_metrics(&self) {
        meter_slot().reset(|| {
            global::set_meter_provider(SdkMeterProvider::builder().build());
        });
    }
}

/// Resets by swapping slot state directly and publishing empty SDK providers.
///
/// Used when the `noop-globals` feature is disabled. The meter slot is only
/// touched if it was ever created.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlotSwapReset;

impl GlobalsReset for SlotSwapReset {
    fn name(&self) -> &'static str {
        "slot-swap"
    }

    fn reset_trace(&self) {
        TRACER_SLOT.reset(|| {
            global::set_tracer_provider(SdkTracerProvider::builder().build());
        });
    }

    fn reset_metrics(&self) {
        reset_if_created(&METER_SLOT, || {
            global::set_meter_provider(SdkMeterProvider::builder().build());
        });
    }
}

/// Reset the slot in `cell` if it was ever created.
///
/// Returns `false`, without running `unpublish`, when there is no slot.
fn reset_if_created<P: Clone>(cell: &OnceLock<GlobalSlot<P>>, unpublish: impl FnOnce()) -> bool {
    let Some(slot) = cell.get() else {
        debug!("provider slot never initialized; nothing to reset");
        return false;
    };
    slot.reset(unpublish);
    true
}

fn probe_reset_strategy() -> &'static dyn GlobalsReset {
    #[cfg(feature = "noop-globals")]
    let strategy: &'static dyn GlobalsReset = &NoopGlobalsReset;
    #[cfg(not(feature = "noop-globals"))]
    let strategy: &'static dyn GlobalsReset = &SlotSwapReset;
    debug!(strategy = strategy.name(), "resolved globals reset strategy");
    strategy
}

/// The reset strategy for this process, resolved on first use.
pub fn reset_strategy() -> &'static dyn GlobalsReset {
    static STRATEGY: OnceLock<&'static dyn GlobalsReset> = OnceLock::new();
    *STRATEGY.get_or_init(probe_reset_strategy)
}

/// Return the global tracer provider slot to its uninitialized state.
pub fn reset_trace_globals() {
    reset_strategy().reset_trace();
}

/// Return the global meter provider slot to its uninitialized state.
pub fn reset_metrics_globals() {
    reset_strategy().reset_metrics();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
