//! Blinking status LED.
//!
//! Two-state scheduler polled at a fine interval:
//!
//! ```text
//!        elapsed ≥ high_ms
//!   High ───────────────▶ Low
//!    ▲                     │
//!    └─────────────────────┘
//!        elapsed ≥ low_ms
//! ```
//!
//! The timing is recomputed from the store's current `frequency` on every
//! transition, so a new frequency takes effect within one half period.

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::events::SupervisorEvent;
use crate::app::ports::EventSink;
use crate::error::HealthFault;
use crate::health::{HealthChange, HealthMonitor};
use crate::store::{AttributeStore, FREQUENCY_MAX, FREQUENCY_MIN};

/// Output level the scheduler is currently holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedState {
    High,
    Low,
}

/// On/off durations for one blink period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub period_ms: u32,
    pub high_ms: u32,
    pub low_ms: u32,
}

impl Timing {
    pub fn for_frequency(frequency: i32, duty_percent: u8) -> Self {
        let hz = frequency.clamp(FREQUENCY_MIN, FREQUENCY_MAX).unsigned_abs();
        let period_ms = 1000 / hz;
        let high_ms = period_ms * u32::from(duty_percent.clamp(1, 99)) / 100;
        Self {
            period_ms,
            high_ms,
            low_ms: period_ms - high_ms,
        }
    }
}

pub struct LedScheduler<P: OutputPin> {
    pin: P,
    duty_percent: u8,
    state: LedState,
    since_ms: u64,
    timing: Timing,
    transitions: u64,
}

impl<P: OutputPin> LedScheduler<P> {
    pub fn new(pin: P, duty_percent: u8) -> Self {
        Self {
            pin,
            duty_percent,
            state: LedState::Low,
            since_ms: 0,
            timing: Timing::for_frequency(crate::store::FREQUENCY_DEFAULT, duty_percent),
            transitions: 0,
        }
    }

    /// Enter `High` and assert the output.
    pub fn start(
        &mut self,
        now_ms: u64,
        store: &AttributeStore,
        health: &HealthMonitor,
        sink: &mut impl EventSink,
    ) {
        self.enter(LedState::High, now_ms, store, health, sink);
    }

    /// Advance the state machine.  Returns the new state on a transition.
    pub fn poll(
        &mut self,
        now_ms: u64,
        store: &AttributeStore,
        health: &HealthMonitor,
        sink: &mut impl EventSink,
    ) -> Option<LedState> {
        let elapsed = now_ms.saturating_sub(self.since_ms);
        let (hold_ms, next) = match self.state {
            LedState::High => (self.timing.high_ms, LedState::Low),
            LedState::Low => (self.timing.low_ms, LedState::High),
        };
        if elapsed < u64::from(hold_ms) {
            return None;
        }
        self.enter(next, now_ms, store, health, sink);
        Some(next)
    }

    /// Drive the output low.  Called on shutdown.
    pub fn stop(&mut self) {
        self.state = LedState::Low;
        if let Err(e) = self.pin.set_low() {
            warn!("LED: failed to turn off on stop: {:?}", e);
        }
    }

    pub fn state(&self) -> LedState {
        self.state
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// The state always advances, even when the write fails, so the
    /// cadence is kept.
    fn enter(
        &mut self,
        state: LedState,
        now_ms: u64,
        store: &AttributeStore,
        health: &HealthMonitor,
        sink: &mut impl EventSink,
    ) {
        let result = match state {
            LedState::High => self.pin.set_high(),
            LedState::Low => self.pin.set_low(),
        };
        let change = match result {
            Ok(()) => health.record_success(HealthFault::OutputDegraded),
            Err(e) => {
                warn!("LED: write {:?} failed: {:?}", state, e);
                health.record_failure(HealthFault::OutputDegraded)
            }
        };
        match change {
            Some(HealthChange::Raised(fault)) => sink.emit(&SupervisorEvent::Degraded(fault)),
            Some(HealthChange::Cleared(fault)) => sink.emit(&SupervisorEvent::Recovered(fault)),
            None => {}
        }

        self.state = state;
        self.since_ms = now_ms;
        self.transitions += 1;
        let timing = Timing::for_frequency(store.frequency(), self.duty_percent);
        if timing != self.timing {
            debug!("LED: period {} ms → {} ms", self.timing.period_ms, timing.period_ms);
            self.timing = timing;
        }
    }
}
