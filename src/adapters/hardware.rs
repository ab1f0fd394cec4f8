//! Hardware adapter: the pins and thermal source the runtime drives.
//!
//! [`Hardware`] is generic so the runtime runs unchanged against sysfs on
//! a board and against mocks in tests.  [`SysfsHardware::open_sysfs`] is the
//! only place that touches real peripherals.

use log::{info, warn};

use crate::config::SupervisorConfig;
use crate::drivers::gpio::{Edge, SysfsGpio};
use crate::error::{Error, Result};
use crate::sensors::SysfsThermalZone;

/// LED output, optional S1..S3 buttons and the thermal source.
pub struct Hardware<O, I, T> {
    pub led: O,
    pub buttons: Option<[I; 3]>,
    pub thermal: T,
}

pub type SysfsHardware = Hardware<SysfsGpio, SysfsGpio, SysfsThermalZone>;

impl SysfsHardware {
    /// Export the LED (and buttons, if configured) and bind the thermal zone.
    ///
    /// The LED is required.  Buttons that fail to export are disabled with
    /// a warning and the supervisor keeps running.
    pub fn open_sysfs(config: &SupervisorConfig) -> Result<Self> {
        let led = SysfsGpio::output(&config.gpio_root, config.led_gpio).map_err(|e| {
            warn!("Hardware: LED gpio{} unavailable: {}", config.led_gpio, e);
            Error::HardwareIo("LED GPIO export failed")
        })?;

        let buttons = config.button_gpios.and_then(|gpios| {
            match open_buttons(&config.gpio_root, gpios) {
                Ok(pins) => Some(pins),
                Err(e) => {
                    warn!("Hardware: buttons disabled: {}", e);
                    None
                }
            }
        });

        let thermal = SysfsThermalZone::new(&config.thermal_zone_path);
        info!(
            "Hardware: LED gpio{}, buttons {}, thermal {}",
            config.led_gpio,
            if buttons.is_some() { "on" } else { "off" },
            thermal.path().display()
        );
        Ok(Self {
            led,
            buttons,
            thermal,
        })
    }
}

fn open_buttons(root: &str, gpios: [u32; 3]) -> std::io::Result<[SysfsGpio; 3]> {
    let [s1, s2, s3] = gpios;
    Ok([
        SysfsGpio::input(root, s1, Edge::Rising)?,
        SysfsGpio::input(root, s2, Edge::Rising)?,
        SysfsGpio::input(root, s3, Edge::Rising)?,
    ])
}
