//! Unified error type for usb-keydemo.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! Implements `defmt::Format` for efficient on-target logging.

/// Top-level error type used across the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    // Transport
    /// The transport refused a report (interrupt endpoint still busy).
    EndpointBusy,

    /// USB stack returned an error.
    Usb,

    // Watchdog
    /// The hardware watchdog could not be configured.
    Watchdog,

    // Generic
    /// Buffer too small for the requested operation.
    BufferOverflow,
}

pub type Result<T> = core::result::Result<T, Error>;
