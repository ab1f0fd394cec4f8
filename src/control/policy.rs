//! Temperature → blink-frequency policy.
//!
//! A fixed step table, evaluated from the hottest band down:
//!
//! | temperature (°C) | frequency (Hz) |
//! |------------------|----------------|
//! | ≥ 45             | 20             |
//! | [40, 45)         | 10             |
//! | [35, 40)         | 5              |
//! | < 35             | 2              |

use log::debug;

use crate::app::events::{ChangeSource, SupervisorEvent};
use crate::app::ports::EventSink;
use crate::store::{AttributeStore, ControlOutcome};

/// `(lower bound °C, frequency Hz)`, hottest first.
const STEP_TABLE: [(i32, i32); 3] = [(45, 20), (40, 10), (35, 5)];

/// Frequency below the coolest threshold.
const BASE_FREQUENCY: i32 = 2;

/// Map a temperature onto the step table.
pub fn frequency_for(celsius: i32) -> i32 {
    STEP_TABLE
        .iter()
        .find(|(floor, _)| celsius >= *floor)
        .map_or(BASE_FREQUENCY, |(_, freq)| *freq)
}

/// Periodic AUTO-mode frequency writer.
#[derive(Debug, Default)]
pub struct PolicyEngine {
    ticks: u64,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// One policy tick.  Writes only in AUTO mode and only on change.
    pub fn tick(&mut self, store: &AttributeStore, sink: &mut impl EventSink) -> ControlOutcome {
        self.ticks += 1;
        let temperature = store.temperature();
        let target = frequency_for(temperature);
        let outcome = store.apply_policy_frequency(target);
        match outcome {
            ControlOutcome::Changed { from, to } => {
                debug!("Policy: {}°C → {} Hz (was {} Hz)", temperature, to, from);
                sink.emit(&SupervisorEvent::FrequencyChanged {
                    from,
                    to,
                    source: ChangeSource::Policy,
                });
            }
            ControlOutcome::Unchanged(_) => {}
            ControlOutcome::Ignored(mode) => {
                debug!("Policy: {} mode, frequency left alone", mode);
            }
        }
        outcome
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
