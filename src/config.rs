//! System configuration parameters
//!
//! All tunable parameters for the supervisor.
//! Values come from an optional JSON file; missing fields take defaults.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::health::DEFAULT_DEGRADED_THRESHOLD;

/// Core supervisor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    // --- Timing ---
    /// Temperature sample interval (milliseconds)
    pub sample_interval_ms: u32,
    /// Policy engine interval (milliseconds)
    pub policy_interval_ms: u32,
    /// LED scheduler poll interval (milliseconds)
    pub led_poll_interval_ms: u32,
    /// Button poll interval (milliseconds)
    pub button_poll_interval_ms: u32,
    /// Control endpoint poll interval (milliseconds)
    pub control_poll_interval_ms: u32,
    /// Telemetry report interval (seconds, 0 = off)
    pub telemetry_interval_secs: u32,

    // --- LED ---
    /// Status LED GPIO number
    pub led_gpio: u32,
    /// Share of each period the LED is on (1-99%)
    pub duty_percent: u8,

    // --- Buttons ---
    /// Increase / decrease / toggle-mode button GPIOs; `None` disables buttons
    pub button_gpios: Option<[u32; 3]>,

    // --- Platform paths ---
    /// sysfs GPIO class directory
    pub gpio_root: String,
    /// Thermal zone temperature file (millidegrees Celsius)
    pub thermal_zone_path: String,

    // --- Control endpoint ---
    /// TCP listen address; `None` disables the endpoint
    pub control_listen_addr: Option<String>,

    // --- Health ---
    /// Consecutive hardware failures before a path is reported degraded
    pub degraded_threshold: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            // Timing
            sample_interval_ms: 1000,     // 1 Hz
            policy_interval_ms: 1000,     // 1 Hz
            led_poll_interval_ms: 10,     // 100 Hz
            button_poll_interval_ms: 100, // 10 Hz
            control_poll_interval_ms: 20,
            telemetry_interval_secs: 60,

            // LED (status led gpioa.10)
            led_gpio: 10,
            duty_percent: 50,

            // Buttons S1, S2, S3
            button_gpios: Some([0, 2, 3]),

            // Paths
            gpio_root: "/sys/class/gpio".into(),
            thermal_zone_path: "/sys/class/thermal/thermal_zone0/temp".into(),

            // Control endpoint
            control_listen_addr: Some("0.0.0.0:8080".into()),

            // Health
            degraded_threshold: DEFAULT_DEGRADED_THRESHOLD,
        }
    }
}

impl SupervisorConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(10..=60_000).contains(&self.sample_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "sample_interval_ms must be within 10..=60000",
            ));
        }
        if !(10..=60_000).contains(&self.policy_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "policy_interval_ms must be within 10..=60000",
            ));
        }
        // Sub-period granularity: 20 Hz has a 25 ms half period.
        if !(1..=100).contains(&self.led_poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "led_poll_interval_ms must be within 1..=100",
            ));
        }
        if !(10..=1000).contains(&self.button_poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "button_poll_interval_ms must be within 10..=1000",
            ));
        }
        if !(1..=1000).contains(&self.control_poll_interval_ms) {
            return Err(ConfigError::ValidationFailed(
                "control_poll_interval_ms must be within 1..=1000",
            ));
        }
        if !(1..=99).contains(&self.duty_percent) {
            return Err(ConfigError::ValidationFailed(
                "duty_percent must be within 1..=99",
            ));
        }
        if let Some(buttons) = self.button_gpios {
            if buttons.contains(&self.led_gpio) {
                return Err(ConfigError::ValidationFailed(
                    "button GPIOs must differ from the LED GPIO",
                ));
            }
            if buttons[0] == buttons[1] || buttons[0] == buttons[2] || buttons[1] == buttons[2] {
                return Err(ConfigError::ValidationFailed("button GPIOs must be distinct"));
            }
        }
        if self.gpio_root.is_empty() || self.thermal_zone_path.is_empty() {
            return Err(ConfigError::ValidationFailed("paths must not be empty"));
        }
        if self.degraded_threshold == 0 {
            return Err(ConfigError::ValidationFailed(
                "degraded_threshold must be at least 1",
            ));
        }
        Ok(())
    }
}
