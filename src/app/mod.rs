//! Application core: domain logic behind port traits.
//!
//! Control requests, outbound events and the traits every adapter
//! implements.  Hardware only enters through [`ports`] and the
//! `embedded-hal` pin traits, so this layer is testable with mocks.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
