//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements   | Connects to                   |
//! |---------------|--------------|-------------------------------|
//! | `config_file` | ConfigPort   | JSON file on disk             |
//! | `hardware`    | (pins)       | sysfs GPIO + thermal zone     |
//! | `log_sink`    | EventSink    | `log` facade                  |
//! | `time`        | Clock        | `std::time::Instant`          |

pub mod config_file;
pub mod hardware;
pub mod log_sink;
pub mod time;
