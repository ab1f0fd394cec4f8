//! Attribute store: the three named values shared by every loop.
//!
//! ```text
//!   Sampler ──record_temperature──▶ ┌──────────────────┐ ◀── get ── LED scheduler
//!   Policy  ──set(frequency)──────▶ │  AttributeStore  │
//!   Buttons / control endpoint ───▶ │  freq·mode│temp  │ ◀── get ── telemetry
//!                                   └──────────────────┘
//! ```
//!
//! `frequency` and `mode` live together in one atomic control word, so a
//! bounded increment can check the mode and update the frequency in a single
//! compare-and-swap.  `temperature` has its own atomic.  Readers never see a
//! partially written value and no update is lost.

use core::fmt;
use core::ops::RangeInclusive;
use core::str::FromStr;
use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use log::debug;

use crate::error::{Error, Result};

/// Lowest accepted blink frequency (Hz).
pub const FREQUENCY_MIN: i32 = 1;
/// Highest accepted blink frequency (Hz).
pub const FREQUENCY_MAX: i32 = 20;
/// Frequency at start-up and after a reset action (Hz).
pub const FREQUENCY_DEFAULT: i32 = 2;

// ───────────────────────────────────────────────────────────────
// Attribute metadata
// ───────────────────────────────────────────────────────────────

/// The attributes exposed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    Frequency,
    Mode,
    Temperature,
}

/// Who may write an attribute from outside the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
}

impl Attribute {
    pub const ALL: [Self; 3] = [Self::Frequency, Self::Mode, Self::Temperature];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Frequency => "frequency",
            Self::Mode => "mode",
            Self::Temperature => "temperature",
        }
    }

    pub const fn access(self) -> Access {
        match self {
            Self::Frequency | Self::Mode => Access::ReadWrite,
            Self::Temperature => Access::ReadOnly,
        }
    }

    /// Accepted values for external writes, `None` when unbounded.
    pub fn range(self) -> Option<RangeInclusive<i32>> {
        match self {
            Self::Frequency => Some(FREQUENCY_MIN..=FREQUENCY_MAX),
            Self::Mode => Some(0..=1),
            Self::Temperature => None,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(Error::UnknownAttribute)
    }
}

// ───────────────────────────────────────────────────────────────
// Mode
// ───────────────────────────────────────────────────────────────

/// Frequency control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Mode {
    /// Frequency only changes through explicit control actions.
    Manual = 0,
    /// Frequency follows the temperature step table.
    Auto = 1,
}

impl Mode {
    pub const fn toggled(self) -> Self {
        match self {
            Self::Manual => Self::Auto,
            Self::Auto => Self::Manual,
        }
    }

    pub fn from_value(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::Manual),
            1 => Ok(Self::Auto),
            _ => Err(Error::OutOfRange(Attribute::Mode.name())),
        }
    }

    pub const fn value(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => f.write_str("manual"),
            Self::Auto => f.write_str("auto"),
        }
    }
}

impl FromStr for Mode {
    type Err = Error;

    /// Accepts `0`, `1`, `manual`, `auto` (case-insensitive).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("manual") {
            Ok(Self::Manual)
        } else if s.eq_ignore_ascii_case("auto") {
            Ok(Self::Auto)
        } else {
            let value: i32 = s
                .parse()
                .map_err(|_| Error::OutOfRange(Attribute::Mode.name()))?;
            Self::from_value(value)
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Control word packing
// ───────────────────────────────────────────────────────────────

const MODE_BIT: u32 = 1 << 16;
const FREQ_MASK: u32 = 0xFFFF;

const fn pack(frequency: i32, mode: Mode) -> u32 {
    let m = match mode {
        Mode::Manual => 0,
        Mode::Auto => MODE_BIT,
    };
    (frequency as u32 & FREQ_MASK) | m
}

const fn unpack(word: u32) -> (i32, Mode) {
    let mode = if word & MODE_BIT != 0 {
        Mode::Auto
    } else {
        Mode::Manual
    };
    ((word & FREQ_MASK) as i32, mode)
}

// ───────────────────────────────────────────────────────────────
// Store
// ───────────────────────────────────────────────────────────────

/// Result of a bounded control action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// The value moved.
    Changed { from: i32, to: i32 },
    /// Already at the bound (or already at the target); nothing written.
    Unchanged(i32),
    /// The action does not apply in the current mode.
    Ignored(Mode),
}

/// Consistent copy of every attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub frequency: i32,
    pub mode: Mode,
    pub temperature: i32,
}

/// Owner of the three attributes.  Share it behind an `Arc`.
#[derive(Debug)]
pub struct AttributeStore {
    control: AtomicU32,
    temperature: AtomicI32,
}

impl Default for AttributeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AttributeStore {
    /// `frequency=2`, `mode=AUTO`, `temperature=0`.
    pub fn new() -> Self {
        Self {
            control: AtomicU32::new(pack(FREQUENCY_DEFAULT, Mode::Auto)),
            temperature: AtomicI32::new(0),
        }
    }

    // ── Reads ─────────────────────────────────────────────────

    pub fn get(&self, attribute: Attribute) -> i32 {
        match attribute {
            Attribute::Frequency => self.frequency(),
            Attribute::Mode => self.mode().value(),
            Attribute::Temperature => self.temperature(),
        }
    }

    /// Read by textual name, e.g. from the control endpoint.
    pub fn get_by_name(&self, name: &str) -> Result<i32> {
        Ok(self.get(name.parse()?))
    }

    pub fn frequency(&self) -> i32 {
        unpack(self.control.load(Ordering::Acquire)).0
    }

    pub fn mode(&self) -> Mode {
        unpack(self.control.load(Ordering::Acquire)).1
    }

    pub fn temperature(&self) -> i32 {
        self.temperature.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Snapshot {
        let (frequency, mode) = unpack(self.control.load(Ordering::Acquire));
        Snapshot {
            frequency,
            mode,
            temperature: self.temperature(),
        }
    }

    // ── External writes ───────────────────────────────────────

    /// Validated external write.  Out-of-range values are rejected, never
    /// clamped, and a rejected write leaves the store untouched.
    ///
    /// Returns the previous value.
    pub fn set(&self, attribute: Attribute, value: i32) -> Result<i32> {
        if attribute.access() == Access::ReadOnly {
            return Err(Error::AccessDenied(attribute.name()));
        }
        if attribute.range().is_some_and(|range| !range.contains(&value)) {
            return Err(Error::OutOfRange(attribute.name()));
        }
        match attribute {
            Attribute::Frequency => {
                let prev = self.update(|freq, mode| Some(pack(value, mode)).filter(|_| freq != value));
                Ok(prev.0)
            }
            Attribute::Mode => {
                let mode = Mode::from_value(value)?;
                let prev = self.update(|freq, old| Some(pack(freq, mode)).filter(|_| old != mode));
                Ok(prev.1.value())
            }
            // Read-only attributes were turned away above.
            Attribute::Temperature => Err(Error::AccessDenied(attribute.name())),
        }
    }

    /// Name-addressed variant of [`set`](Self::set).
    pub fn set_by_name(&self, name: &str, value: i32) -> Result<i32> {
        self.set(name.parse()?, value)
    }

    // ── Internal writes ───────────────────────────────────────

    /// Sampler-only path for the read-only `temperature` attribute.
    pub(crate) fn record_temperature(&self, celsius: i32) -> i32 {
        self.temperature.swap(celsius, Ordering::AcqRel)
    }

    /// Policy write: only lands while the store is still in AUTO mode, so a
    /// concurrent switch to MANUAL is never overridden.
    pub(crate) fn apply_policy_frequency(&self, frequency: i32) -> ControlOutcome {
        let target = frequency.clamp(FREQUENCY_MIN, FREQUENCY_MAX);
        let mut ignored = None;
        let (from, _) = self.update(|freq, mode| {
            if mode == Mode::Manual {
                ignored = Some(mode);
                None
            } else if freq == target {
                None
            } else {
                Some(pack(target, mode))
            }
        });
        match ignored {
            Some(mode) => ControlOutcome::Ignored(mode),
            None if from == target => ControlOutcome::Unchanged(from),
            None => ControlOutcome::Changed { from, to: target },
        }
    }

    // ── Control actions ───────────────────────────────────────

    /// `+1` Hz, capped at 20.  MANUAL mode only.
    pub fn increase_frequency(&self) -> ControlOutcome {
        self.step_frequency(|f| (f + 1).min(FREQUENCY_MAX))
    }

    /// `-1` Hz, floored at 1.  MANUAL mode only.
    pub fn decrease_frequency(&self) -> ControlOutcome {
        self.step_frequency(|f| (f - 1).max(FREQUENCY_MIN))
    }

    /// Back to the default 2 Hz.  MANUAL mode only.
    pub fn reset_frequency(&self) -> ControlOutcome {
        self.step_frequency(|_| FREQUENCY_DEFAULT)
    }

    /// Flip MANUAL↔AUTO.  Applies in either mode and never touches
    /// `frequency`.  Returns the new mode.
    pub fn toggle_mode(&self) -> Mode {
        let (_, old) = self.update(|freq, mode| Some(pack(freq, mode.toggled())));
        old.toggled()
    }

    // ── Internal ──────────────────────────────────────────────

    fn step_frequency(&self, next: impl Fn(i32) -> i32) -> ControlOutcome {
        let mut ignored = None;
        let (from, _) = self.update(|freq, mode| {
            if mode == Mode::Auto {
                ignored = Some(mode);
                return None;
            }
            let to = next(freq);
            (to != freq).then(|| pack(to, mode))
        });
        if let Some(mode) = ignored {
            debug!("Store: frequency action ignored in {} mode", mode);
            return ControlOutcome::Ignored(mode);
        }
        let to = next(from);
        if to == from {
            ControlOutcome::Unchanged(from)
        } else {
            ControlOutcome::Changed { from, to }
        }
    }

    /// CAS loop over the control word.  `f` returns `None` to leave the word
    /// as is.  Returns the unpacked word observed before the update.
    fn update(&self, mut f: impl FnMut(i32, Mode) -> Option<u32>) -> (i32, Mode) {
        let prev = match self.control.fetch_update(Ordering::AcqRel, Ordering::Acquire, |word| {
            let (freq, mode) = unpack(word);
            f(freq, mode)
        }) {
            Ok(word) | Err(word) => word,
        };
        unpack(prev)
    }
}
