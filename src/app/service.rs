//! Control service: the single entry point for control requests.
//!
//! [`ControlService`] applies [`ControlCommand`]s from buttons, the TCP
//! endpoint and in-process callers to the shared [`AttributeStore`] and
//! reports what happened through an [`EventSink`].
//!
//! ```text
//!   ButtonPanel ──┐
//!   ControlServer ┼──▶ ┌──────────────────┐ ──▶ EventSink
//!   API caller ───┘    │  ControlService  │
//!                      │  store · health  │
//!                      └──────────────────┘
//! ```

use std::sync::Arc;

use log::{debug, info};

use crate::error::Result;
use crate::health::HealthMonitor;
use crate::store::{Attribute, AttributeStore, ControlOutcome, Mode, Snapshot};

use super::commands::ControlCommand;
use super::events::{ChangeSource, SupervisorEvent};
use super::ports::EventSink;

/// Answer to a successfully handled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Current value of one attribute after the command ran.
    Value(Attribute, i32),
    /// Every attribute plus the health bitmask.
    Status { snapshot: Snapshot, health_flags: u8 },
    /// The command does not apply in the current mode; nothing changed.
    Ignored(Mode),
}

/// Cheap to clone; every clone shares the same store and health monitor.
#[derive(Debug, Clone)]
pub struct ControlService {
    store: Arc<AttributeStore>,
    health: Arc<HealthMonitor>,
}

impl ControlService {
    pub fn new(store: Arc<AttributeStore>, health: Arc<HealthMonitor>) -> Self {
        Self { store, health }
    }

    pub fn store(&self) -> &Arc<AttributeStore> {
        &self.store
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    /// Apply one command.
    ///
    /// Rejected commands leave the store untouched, emit
    /// [`SupervisorEvent::CommandRejected`] and return the error.
    pub fn handle(
        &self,
        cmd: ControlCommand,
        source: ChangeSource,
        sink: &mut impl EventSink,
    ) -> Result<Reply> {
        let result = self.dispatch(cmd, source, sink);
        if let Err(error) = result {
            info!("Control: {:?} from {:?} rejected: {}", cmd, source, error);
            sink.emit(&SupervisorEvent::CommandRejected { source, error });
        }
        result
    }

    fn dispatch(
        &self,
        cmd: ControlCommand,
        source: ChangeSource,
        sink: &mut impl EventSink,
    ) -> Result<Reply> {
        match cmd {
            ControlCommand::IncreaseFrequency => {
                Ok(self.frequency_outcome(self.store.increase_frequency(), source, sink))
            }
            ControlCommand::DecreaseFrequency => {
                Ok(self.frequency_outcome(self.store.decrease_frequency(), source, sink))
            }
            ControlCommand::ResetFrequency => {
                Ok(self.frequency_outcome(self.store.reset_frequency(), source, sink))
            }
            ControlCommand::ToggleMode => {
                let to = self.store.toggle_mode();
                sink.emit(&SupervisorEvent::ModeChanged {
                    from: to.toggled(),
                    to,
                    source,
                });
                Ok(Reply::Value(Attribute::Mode, to.value()))
            }
            ControlCommand::SetFrequency(value) => {
                let from = self.store.set(Attribute::Frequency, value)?;
                if from != value {
                    sink.emit(&SupervisorEvent::FrequencyChanged {
                        from,
                        to: value,
                        source,
                    });
                }
                Ok(Reply::Value(Attribute::Frequency, value))
            }
            ControlCommand::SetMode(mode) => {
                let from = Mode::from_value(self.store.set(Attribute::Mode, mode.value())?)?;
                if from != mode {
                    sink.emit(&SupervisorEvent::ModeChanged {
                        from,
                        to: mode,
                        source,
                    });
                }
                Ok(Reply::Value(Attribute::Mode, mode.value()))
            }
            ControlCommand::Get(attribute) => {
                Ok(Reply::Value(attribute, self.store.get(attribute)))
            }
            ControlCommand::Status => Ok(Reply::Status {
                snapshot: self.store.snapshot(),
                health_flags: self.health.faults(),
            }),
        }
    }

    fn frequency_outcome(
        &self,
        outcome: ControlOutcome,
        source: ChangeSource,
        sink: &mut impl EventSink,
    ) -> Reply {
        match outcome {
            ControlOutcome::Changed { from, to } => {
                sink.emit(&SupervisorEvent::FrequencyChanged { from, to, source });
                Reply::Value(Attribute::Frequency, to)
            }
            ControlOutcome::Unchanged(freq) => {
                debug!("Control: frequency already at {} Hz", freq);
                Reply::Value(Attribute::Frequency, freq)
            }
            ControlOutcome::Ignored(mode) => Reply::Ignored(mode),
        }
    }
}
