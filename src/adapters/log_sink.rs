//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured supervisor events to the
//! `log` facade (stderr through `env_logger` in production).

use log::{debug, info, warn};

use crate::app::events::SupervisorEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`SupervisorEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u64,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events logged so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &SupervisorEvent) {
        self.emitted += 1;
        match event {
            SupervisorEvent::Telemetry(t) => {
                info!(
                    "TELEM | T={}\u{00b0}C | f={}Hz | mode={} | health=0b{:03b} | up={}s",
                    t.snapshot.temperature,
                    t.snapshot.frequency,
                    t.snapshot.mode,
                    t.health_flags,
                    t.uptime_secs,
                );
            }
            SupervisorEvent::TemperatureSampled(celsius) => {
                debug!("TEMP | {}\u{00b0}C", celsius);
            }
            SupervisorEvent::ThermalUnavailable { retained } => {
                warn!("TEMP | unavailable, keeping {}\u{00b0}C", retained);
            }
            SupervisorEvent::FrequencyChanged { from, to, source } => {
                info!("FREQ | {} Hz -> {} Hz ({:?})", from, to, source);
            }
            SupervisorEvent::ModeChanged { from, to, source } => {
                info!("MODE | {} -> {} ({:?})", from, to, source);
            }
            SupervisorEvent::CommandRejected { source, error } => {
                info!("REJECT | {:?}: {}", source, error);
            }
            SupervisorEvent::Degraded(fault) => {
                warn!("HEALTH | degraded: {}", fault);
            }
            SupervisorEvent::Recovered(fault) => {
                info!("HEALTH | recovered: {}", fault);
            }
            SupervisorEvent::Started(s) => {
                info!(
                    "START | f={}Hz mode={} T={}\u{00b0}C",
                    s.frequency, s.mode, s.temperature
                );
            }
            SupervisorEvent::Stopped => {
                info!("STOP | supervisor stopped");
            }
        }
    }
}
