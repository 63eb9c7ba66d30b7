//! Collaborators the polling loop drives but does not implement.

use crate::error::Result;

/// HID interrupt transport towards the host.
pub trait HidTransport {
    /// Advance pending transport work. Never blocks.
    fn poll(&mut self);

    /// `true` when a new input report may be queued.
    fn interrupt_endpoint_ready(&self) -> bool;

    /// Queue a serialized input report.
    fn send_report(&mut self, report: &[u8]) -> Result<()>;

    /// Detach from the bus so the host forgets the device.
    fn disconnect(&mut self);

    /// Attach to the bus; the host enumerates the device again.
    fn connect(&mut self);
}

/// Liveness signal to an external watchdog.
pub trait Watchdog {
    fn feed(&mut self);
}

impl<T: HidTransport + ?Sized> HidTransport for &mut T {
    fn poll(&mut self) {
        (**self).poll()
    }

    fn interrupt_endpoint_ready(&self) -> bool {
        (**self).interrupt_endpoint_ready()
    }

    fn send_report(&mut self, report: &[u8]) -> Result<()> {
        (**self).send_report(report)
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn connect(&mut self) {
        (**self).connect()
    }
}

impl<W: Watchdog + ?Sized> Watchdog for &mut W {
    fn feed(&mut self) {
        (**self).feed()
    }
}
