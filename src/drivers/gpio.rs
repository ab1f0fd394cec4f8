//! sysfs GPIO adapter implementing the `embedded-hal` digital traits.
//!
//! ## Lifecycle
//!
//! 1. `export` the line (skipped when `gpioN/` already exists).
//! 2. Write `direction` (`out` / `in`) and, for inputs, `edge`.
//! 3. Keep `value` open for the life of the pin; every level change is a
//!    single positional write, every read a single positional read.
//! 4. On drop, unexport the line if this process exported it.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};

use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};
use log::{debug, info, warn};

/// Pin direction as understood by sysfs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }
}

/// Interrupt edge for inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    None,
    Rising,
    Falling,
    Both,
}

impl Edge {
    fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::Both => "both",
        }
    }
}

/// I/O failure on a specific GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioError {
    pub gpio: u32,
    pub kind: io::ErrorKind,
}

impl core::fmt::Display for GpioError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "gpio{}: {}", self.gpio, self.kind)
    }
}

impl std::error::Error for GpioError {}

impl digital::Error for GpioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// One exported sysfs GPIO line.
#[derive(Debug)]
pub struct SysfsGpio {
    number: u32,
    root: PathBuf,
    direction: Direction,
    value: File,
    exported_here: bool,
}

impl SysfsGpio {
    /// Export `number` under `root` as an output, initially low.
    pub fn output(root: impl AsRef<Path>, number: u32) -> io::Result<Self> {
        let mut pin = Self::open(root.as_ref(), number, Direction::Out, None)?;
        pin.write_level(false).map_err(|e| io::Error::from(e.kind))?;
        Ok(pin)
    }

    /// Export `number` under `root` as an input with the given edge.
    pub fn input(root: impl AsRef<Path>, number: u32, edge: Edge) -> io::Result<Self> {
        Self::open(root.as_ref(), number, Direction::In, Some(edge))
    }

    fn open(root: &Path, number: u32, direction: Direction, edge: Option<Edge>) -> io::Result<Self> {
        let line = root.join(format!("gpio{number}"));
        let exported_here = if line.exists() {
            debug!("GPIO: gpio{} already exported", number);
            false
        } else {
            fs::write(root.join("export"), number.to_string())?;
            true
        };

        fs::write(line.join("direction"), direction.as_str())?;
        if let Some(edge) = edge {
            // Not every line supports interrupts; polling works without it.
            if let Err(e) = fs::write(line.join("edge"), edge.as_str()) {
                warn!("GPIO: gpio{} edge {} not set: {}", number, edge.as_str(), e);
            }
        }

        let value = OpenOptions::new()
            .read(true)
            .write(direction == Direction::Out)
            .open(line.join("value"))?;

        info!("GPIO: gpio{} ready ({})", number, direction.as_str());
        Ok(Self {
            number,
            root: root.to_path_buf(),
            direction,
            value,
            exported_here,
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn error(&self, e: &io::Error) -> GpioError {
        GpioError {
            gpio: self.number,
            kind: e.kind(),
        }
    }

    fn write_level(&mut self, high: bool) -> Result<(), GpioError> {
        let byte: &[u8] = if high { b"1" } else { b"0" };
        self.value
            .write_at(byte, 0)
            .map(|_| ())
            .map_err(|e| self.error(&e))
    }

    fn read_level(&self) -> Result<bool, GpioError> {
        let mut buf = [0u8; 1];
        match self.value.read_at(&mut buf, 0) {
            Ok(0) => Err(GpioError {
                gpio: self.number,
                kind: io::ErrorKind::UnexpectedEof,
            }),
            Ok(_) => Ok(buf[0] == b'1'),
            Err(e) => Err(self.error(&e)),
        }
    }
}

impl Drop for SysfsGpio {
    fn drop(&mut self) {
        if !self.exported_here {
            return;
        }
        if let Err(e) = fs::write(self.root.join("unexport"), self.number.to_string()) {
            warn!("GPIO: unexport gpio{} failed: {}", self.number, e);
        }
    }
}

impl ErrorType for SysfsGpio {
    type Error = GpioError;
}

impl OutputPin for SysfsGpio {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write_level(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write_level(true)
    }
}

impl InputPin for SysfsGpio {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.read_level()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.read_level().map(|high| !high)
    }
}
