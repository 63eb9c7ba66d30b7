//! HID keyboard report type and report descriptor.

pub mod keyboard;


pub use keyboard::{KeyboardReport, KEYBOARD_REPORT_DESCRIPTOR, KEYBOARD_REPORT_SIZE};
