//! Control algorithms.

pub mod policy;

pub use policy::{PolicyEngine, frequency_for};
