//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Sampler · Policy · LED scheduler · ControlService
//! ```
//!
//! Driven adapters (thermal zone, clock, event sinks, config files)
//! implement these traits.  GPIO pins use the `embedded-hal` digital
//! traits directly (`OutputPin` for the LED, `InputPin` for buttons), so
//! the domain core never touches sysfs itself.

use crate::config::SupervisorConfig;
use crate::error::Result;

// ───────────────────────────────────────────────────────────────
// Thermal port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Source of the CPU temperature.
pub trait ThermalSource {
    /// Current CPU temperature in whole degrees Celsius.
    ///
    /// Fails with [`Error::ThermalSourceUnavailable`](crate::error::Error::ThermalSourceUnavailable).
    fn read_cpu_temperature(&mut self) -> Result<i32>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock used by the LED scheduler.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`SupervisorEvent`](super::events::SupervisorEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::SupervisorEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port
// ───────────────────────────────────────────────────────────────

/// Loads the supervisor configuration.
///
/// Implementations MUST run [`SupervisorConfig::validate`] and reject
/// invalid ranges with [`ConfigError::ValidationFailed`] instead of
/// clamping them.
pub trait ConfigPort {
    fn load(&self) -> core::result::Result<SupervisorConfig, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config file at the given location.
    NotFound,
    /// The file is not valid JSON for [`SupervisorConfig`].
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error while reading the file.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound => Self::Config("not found"),
            ConfigError::Corrupted => Self::Config("corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::IoError => Self::Config("I/O error"),
        }
    }
}
