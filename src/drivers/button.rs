//! Polled push-button panel with rising-edge detection.
//!
//! | Button | Default GPIO | Event          |
//! |--------|--------------|----------------|
//! | S1     | 0            | `Increase`     |
//! | S2     | 2            | `Decrease`     |
//! | S3     | 3            | `ToggleMode`   |
//!
//! A press is a low → high transition between two polls.  The first poll
//! only primes the previous levels, so a button held at start-up does not
//! fire.

use embedded_hal::digital::InputPin;
use heapless::Vec;
use log::{debug, warn};

use crate::app::commands::ControlCommand;
use crate::app::events::SupervisorEvent;
use crate::app::ports::EventSink;
use crate::error::HealthFault;
use crate::health::{HealthChange, HealthMonitor};

/// Button events, in panel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Increase,
    Decrease,
    ToggleMode,
}

impl ButtonEvent {
    const PANEL: [Self; 3] = [Self::Increase, Self::Decrease, Self::ToggleMode];
}

impl From<ButtonEvent> for ControlCommand {
    fn from(event: ButtonEvent) -> Self {
        match event {
            ButtonEvent::Increase => Self::IncreaseFrequency,
            ButtonEvent::Decrease => Self::DecreaseFrequency,
            ButtonEvent::ToggleMode => Self::ToggleMode,
        }
    }
}

pub struct ButtonPanel<P: InputPin> {
    pins: [P; 3],
    last: [bool; 3],
    primed: bool,
}

impl<P: InputPin> ButtonPanel<P> {
    /// `pins` in S1, S2, S3 order.
    pub fn new(pins: [P; 3]) -> Self {
        Self {
            pins,
            last: [false; 3],
            primed: false,
        }
    }

    /// Sample every button once and return the presses seen since the
    /// previous poll.
    pub fn poll(&mut self, health: &HealthMonitor, sink: &mut impl EventSink) -> Vec<ButtonEvent, 3> {
        let mut events = Vec::new();
        let mut failed = false;

        for (i, pin) in self.pins.iter_mut().enumerate() {
            let level = match pin.is_high() {
                Ok(level) => level,
                Err(e) => {
                    warn!("Buttons: S{} read failed: {:?}", i + 1, e);
                    failed = true;
                    // Hold the previous level so a failed read never looks like an edge.
                    self.last[i]
                }
            };
            if self.primed && level && !self.last[i] {
                debug!("Buttons: S{} pressed", i + 1);
                // Capacity equals the panel size.
                let _ = events.push(ButtonEvent::PANEL[i]);
            }
            self.last[i] = level;
        }
        self.primed = true;

        let change = if failed {
            health.record_failure(HealthFault::InputDegraded)
        } else {
            health.record_success(HealthFault::InputDegraded)
        };
        match change {
            Some(HealthChange::Raised(fault)) => sink.emit(&SupervisorEvent::Degraded(fault)),
            Some(HealthChange::Cleared(fault)) => sink.emit(&SupervisorEvent::Recovered(fault)),
            None => {}
        }

        events
    }

    pub fn pins_mut(&mut self) -> &mut [P; 3] {
        &mut self.pins
    }
}
