//! Sensor subsystem.
//!
//! Only the CPU temperature is sampled; readings land in the
//! [`AttributeStore`](crate::store::AttributeStore) and the previous good
//! value is kept when a read fails.

pub mod temperature;

pub use temperature::{SysfsThermalZone, TemperatureSampler};
