//! Temperature-driven LED blink supervisor.
//!
//! Samples the CPU temperature, derives a blink frequency from it in AUTO
//! mode, blinks a GPIO LED at that frequency and exposes `frequency`,
//! `mode` and `temperature` to buttons and a TCP control endpoint.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod health;
pub mod rpc;
pub mod scheduler;
pub mod sensors;
pub mod store;

pub use error::{Error, Result};
