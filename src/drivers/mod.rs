//! GPIO drivers: sysfs pins, the blinking LED and the button panel.

pub mod button;
pub mod gpio;
pub mod led;

pub use button::{ButtonEvent, ButtonPanel};
pub use gpio::{Direction, Edge, GpioError, SysfsGpio};
pub use led::{LedScheduler, LedState, Timing};
