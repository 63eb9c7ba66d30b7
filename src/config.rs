//! Application-wide constants and compile-time configuration.
//!
//! All hardware pin assignments, timing parameters, and protocol
//! constants live here so they can be tuned in one place.

// Input channels

/// Number of physical button channels.
pub const NUM_CHANNELS: usize = 6;

/// Consecutive loop iterations a raw level must hold before the
/// debounced state follows it. Counted in scan iterations, not time.
pub const DEBOUNCE_THRESHOLD: u8 = 200;

/// Interval between two polling-loop iterations (microseconds).
/// With `DEBOUNCE_THRESHOLD` this gives a ~10 ms hysteresis window.
pub const SCAN_INTERVAL_US: u64 = 50;

// GPIO pin assignments (nRF52840-DK defaults)
//
// Buttons are wired between the pin and ground, internal pull-up on.
// The concrete `embassy_nrf::peripherals::*` pins are picked in `main.rs`.
//
//   Channel 0 ('a') → P0.11
//   Channel 1 ('s') → P0.12
//   Channel 2 ('d') → P0.24
//   Channel 3 ('f') → P0.25
//   Channel 4 ('w') → P0.03
//   Channel 5 ('e') → P0.04

// Keyboard report

/// Number of keycode slots in the boot keyboard report.
pub const REPORT_KEY_SLOTS: usize = 6;

/// LED state value meaning "host has not sent an output report yet".
pub const FEEDBACK_SENTINEL: u8 = 0xFF;

// USB

/// USB VID/PID - use the "pid.codes" open-source test VID.
/// Replace with your own allocated VID/PID for production.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0002;

/// USB device strings.
pub const USB_MANUFACTURER: &str = "usb-keydemo";
pub const USB_PRODUCT: &str = "Six-Button Keyboard";
pub const USB_SERIAL_NUMBER: &str = "000001";

/// USB HID polling interval (ms).
pub const USB_HID_POLL_MS: u8 = 10;

/// Number of delay steps while the device stays detached at startup.
pub const REENUMERATE_STEPS: u16 = 250;

/// Length of one detach delay step (ms). 250 × 2 ms = 500 ms.
pub const REENUMERATE_STEP_MS: u32 = 2;

// Watchdog

/// Watchdog timeout (seconds). The loop must feed it at least this often.
pub const WATCHDOG_TIMEOUT_SECS: u32 = 1;
