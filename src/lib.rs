//! Debounce + report engine for usb-keydemo.
//!
//! This crate holds the pure logic that turns polled button levels into
//! USB HID keyboard reports. It has no hardware dependencies and can be
//! tested on the host (no embedded hardware required).
//!
//! Usage: `cargo test --lib`
//!
//! Note: The embedded binary uses main.rs with #![no_std] and #![no_main]
//! and wires this engine to GPIO, the watchdog and `embassy-usb`.

#![cfg_attr(not(test), no_std)]

// Must come first so the logging macros are visible in every module.
mod fmt;

pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod hid;
pub mod host;
pub mod keymap;
pub mod machine;
pub mod transport;

pub use controller::{reenumerate, Controller};
pub use debounce::{ActiveLow, Channel, ChannelId, Debouncer, Edge, RawLine};
pub use error::Error;
pub use hid::KeyboardReport;
pub use host::{ControlRequest, HostLink};
pub use machine::{ReportMachine, ReportState};
pub use transport::{HidTransport, Watchdog};
