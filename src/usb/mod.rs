//! USB Device subsystem - presents a boot keyboard to the host.
//!
//! The nRF52840's built-in USB 2.0 Full-Speed controller is driven by
//! `embassy-usb` with a single HID interface:
//!
//! - Interface 0: Keyboard (boot protocol, LED output via SET_REPORT)
//!
//! The polling loop talks to it through [`hid_device::EmbassyTransport`];
//! the writer task drains queued reports onto the interrupt endpoint.

pub mod hid_device;
