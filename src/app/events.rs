//! Outbound supervisor events.
//!
//! The control loops emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::error::{Error, HealthFault};
use crate::store::{Mode, Snapshot};

/// Where a change to the store came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// AUTO-mode step table.
    Policy,
    /// Physical push button.
    Button,
    /// TCP control endpoint.
    Remote,
    /// In-process caller.
    Api,
}

/// Structured events emitted by the supervisor core.
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorEvent {
    /// The runtime has started (carries the initial attribute values).
    Started(Snapshot),

    /// A fresh temperature reading landed in the store.
    TemperatureSampled(i32),

    /// The thermal source failed; the previous temperature was kept.
    ThermalUnavailable { retained: i32 },

    FrequencyChanged {
        from: i32,
        to: i32,
        source: ChangeSource,
    },

    ModeChanged {
        from: Mode,
        to: Mode,
        source: ChangeSource,
    },

    /// A control request was refused; the store is unchanged.
    CommandRejected { source: ChangeSource, error: Error },

    /// A hardware path crossed the consecutive-failure threshold.
    Degraded(HealthFault),

    /// A degraded hardware path recovered.
    Recovered(HealthFault),

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// The runtime is shutting down.
    Stopped,
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    pub snapshot: Snapshot,
    pub health_flags: u8,
    pub uptime_secs: u64,
}
