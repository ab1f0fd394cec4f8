//! Line-oriented TCP control endpoint.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                    Control Stack                          │
//! │                                                           │
//! │  ┌───────────┐   ┌──────────┐   ┌──────────┐              │
//! │  │ Transport │──▶│  Codec   │──▶│ Protocol │──▶ ControlService
//! │  │ (trait)   │   │ (lines)  │   │ (parse)  │              │
//! │  └───────────┘   └──────────┘   └──────────┘              │
//! │       ▲                               │                   │
//! │       └──────── reply line ◀──────────┘                   │
//! └───────────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod codec;
pub mod protocol;
pub mod server;
pub mod transport;

pub use server::{ClientSession, ControlServer, MAX_CLIENTS, handle_line};
