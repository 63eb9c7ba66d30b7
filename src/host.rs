//! State shared with the USB host.
//!
//! The LED byte and the idle rate are written from the transport's
//! control-request path, which may interrupt the polling loop, so both
//! live in atomics. Only the transport writes the LED byte; the loop
//! only reads it.

use core::sync::atomic::{AtomicU8, Ordering};

use crate::config::FEEDBACK_SENTINEL;
use crate::hid::KeyboardReport;

/// HID class requests the core answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlRequest<'a> {
    /// GET_REPORT: the host asks for the current input report.
    GetReport,
    /// SET_REPORT: output report payload (LED state).
    SetReport(&'a [u8]),
    /// GET_IDLE: the host asks for the stored idle rate.
    GetIdle,
    /// SET_IDLE: new idle rate in 4 ms units.
    SetIdle(u8),
    /// Anything else.
    Other,
}

/// Host feedback (LED byte) and idle rate.
pub struct HostLink {
    leds: AtomicU8,
    idle_rate: AtomicU8,
}

impl Default for HostLink {
    fn default() -> Self {
        Self::new()
    }
}

impl HostLink {
    pub const fn new() -> Self {
        Self {
            leds: AtomicU8::new(FEEDBACK_SENTINEL),
            idle_rate: AtomicU8::new(0),
        }
    }

    /// Last LED byte from the host, or [`FEEDBACK_SENTINEL`].
    pub fn leds(&self) -> u8 {
        self.leds.load(Ordering::Acquire)
    }

    /// `true` once the host has sent its first LED report.
    pub fn host_ready(&self) -> bool {
        self.leds() != FEEDBACK_SENTINEL
    }

    pub fn set_leds(&self, leds: u8) {
        let previous = self.leds.swap(leds, Ordering::AcqRel);
        if previous != leds {
            debug!("LED state: {=u8:#x}", leds);
        }
    }

    pub fn idle_rate(&self) -> u8 {
        self.idle_rate.load(Ordering::Relaxed)
    }

    pub fn set_idle_rate(&self, rate: u8) {
        self.idle_rate.store(rate, Ordering::Relaxed);
    }

    /// Answer a class request, writing any response into `buf`.
    ///
    /// Returns the response length; 0 when there is nothing to send or
    /// `buf` is too small.
    pub fn control(&self, request: ControlRequest<'_>, buf: &mut [u8]) -> usize {
        match request {
            ControlRequest::GetReport => <KeyboardReport>::empty().serialize(buf),
            ControlRequest::SetReport(data) => {
                // Only a single-byte LED report is understood.
                if let [leds] = data {
                    self.set_leds(*leds);
                }
                0
            }
            ControlRequest::GetIdle => match buf.first_mut() {
                Some(slot) => {
                    *slot = self.idle_rate();
                    1
                }
                None => 0,
            },
            ControlRequest::SetIdle(rate) => {
                self.set_idle_rate(rate);
                0
            }
            ControlRequest::Other => 0,
        }
    }
}
