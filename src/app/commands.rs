//! Inbound commands to the control service.
//!
//! These represent actions requested by the outside world (buttons, the
//! TCP control endpoint, in-process callers) that the
//! [`ControlService`](super::service::ControlService) interprets and
//! acts upon.

use crate::store::{Attribute, Mode};

/// Commands that external adapters can send into the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// `+1` Hz, capped at 20 (MANUAL mode).
    IncreaseFrequency,

    /// `-1` Hz, floored at 1 (MANUAL mode).
    DecreaseFrequency,

    /// Back to 2 Hz (MANUAL mode).
    ResetFrequency,

    /// Flip MANUAL/AUTO, regardless of the current mode.
    ToggleMode,

    /// Direct frequency write; out-of-range values are rejected.
    SetFrequency(i32),

    /// Direct mode write.
    SetMode(Mode),

    /// Read one attribute.
    Get(Attribute),

    /// Read every attribute plus the health flags.
    Status,
}
