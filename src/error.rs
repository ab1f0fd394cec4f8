//! Unified error types for the supervisor.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loops' error handling uniform.  All variants are `Copy` so they
//! can be passed through the health monitor and event sink without
//! allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the supervisor funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The attribute name is not one of `frequency`, `mode`, `temperature`.
    UnknownAttribute,
    /// The value is outside the attribute's accepted range.
    OutOfRange(&'static str),
    /// The attribute cannot be written from outside the supervisor.
    AccessDenied(&'static str),
    /// The CPU temperature could not be read.
    ThermalSourceUnavailable,
    /// A GPIO or other hardware access failed.
    HardwareIo(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// A control-surface request could not be understood.
    Protocol(ProtocolError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownAttribute => write!(f, "unknown attribute"),
            Self::OutOfRange(name) => write!(f, "{name} out of range"),
            Self::AccessDenied(name) => write!(f, "{name} is read-only"),
            Self::ThermalSourceUnavailable => write!(f, "thermal source unavailable"),
            Self::HardwareIo(what) => write!(f, "hardware I/O error: {what}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Protocol(e) => write!(f, "protocol: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    /// Blank request line.
    Empty,
    /// The command verb is not recognised.
    UnknownCommand,
    /// The command needs a value (`frequency:<n>`) but none was given.
    MissingValue,
    /// The value could not be parsed.
    InvalidValue,
    /// The request line exceeded the line buffer.
    LineTooLong,
    /// The client exceeded its request budget.
    RateLimited,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty request"),
            Self::UnknownCommand => write!(f, "unknown command"),
            Self::MissingValue => write!(f, "missing value"),
            Self::InvalidValue => write!(f, "invalid value"),
            Self::LineTooLong => write!(f, "line too long"),
            Self::RateLimited => write!(f, "rate limited"),
        }
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

// ---------------------------------------------------------------------------
// Health faults
// ---------------------------------------------------------------------------

/// Degraded-state conditions.  They never stop the control loops; the
/// health monitor accumulates them in a bitfield so that several can be
/// active at once and each clears independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HealthFault {
    /// LED output writes keep failing.
    OutputDegraded = 0b0000_0001,
    /// The thermal source keeps failing.
    ThermalDegraded = 0b0000_0010,
    /// Button reads keep failing.
    InputDegraded = 0b0000_0100,
}

impl HealthFault {
    pub const ALL: [Self; 3] = [
        Self::OutputDegraded,
        Self::ThermalDegraded,
        Self::InputDegraded,
    ];

    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }

    /// Slot index for per-fault counters.
    pub(crate) const fn index(self) -> usize {
        (self as u8).trailing_zeros() as usize
    }
}

impl fmt::Display for HealthFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutputDegraded => write!(f, "LED output degraded"),
            Self::ThermalDegraded => write!(f, "thermal source degraded"),
            Self::InputDegraded => write!(f, "button input degraded"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
