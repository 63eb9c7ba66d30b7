//! The polling loop.
//!
//! [`Controller`] owns all loop state. Each [`Controller::tick`] runs, in
//! this order: watchdog feed, transport poll, debounce sweep, one report
//! machine step. Nothing in a tick blocks, so the watchdog deadline only
//! depends on how often the caller ticks.

use embedded_hal::delay::DelayNs;

use crate::config::{REENUMERATE_STEPS, REENUMERATE_STEP_MS, REPORT_KEY_SLOTS};
use crate::debounce::{Debouncer, RawLine};
use crate::hid::KeyboardReport;
use crate::host::HostLink;
use crate::machine::ReportMachine;
use crate::transport::{HidTransport, Watchdog};

pub struct Controller<'a, L, const N: usize, const SLOTS: usize = REPORT_KEY_SLOTS> {
    debouncer: Debouncer<L, N>,
    machine: ReportMachine<SLOTS>,
    host: &'a HostLink,
}

impl<'a, L: RawLine, const N: usize, const SLOTS: usize> Controller<'a, L, N, SLOTS> {
    pub fn new(debouncer: Debouncer<L, N>, host: &'a HostLink) -> Self {
        Self {
            debouncer,
            machine: ReportMachine::new(),
            host,
        }
    }

    /// Run one loop iteration. Returns the report sent, if any.
    pub fn tick<T, W>(
        &mut self,
        transport: &mut T,
        watchdog: &mut W,
    ) -> Option<KeyboardReport<SLOTS>>
    where
        T: HidTransport + ?Sized,
        W: Watchdog + ?Sized,
    {
        watchdog.feed();
        transport.poll();
        self.debouncer.scan();

        let debouncer = &mut self.debouncer;
        self.machine
            .step(transport, self.host.host_ready(), || debouncer.take_pending())
    }

    pub fn debouncer(&self) -> &Debouncer<L, N> {
        &self.debouncer
    }

    pub fn machine(&self) -> &ReportMachine<SLOTS> {
        &self.machine
    }

    pub fn host(&self) -> &HostLink {
        self.host
    }
}

/// Force the host to enumerate the device again.
///
/// Detaches, waits `REENUMERATE_STEPS × REENUMERATE_STEP_MS` while
/// keeping the watchdog fed, then attaches.
pub fn reenumerate<T, W, D>(transport: &mut T, watchdog: &mut W, delay: &mut D)
where
    T: HidTransport + ?Sized,
    W: Watchdog + ?Sized,
    D: DelayNs + ?Sized,
{
    info!("Detaching from USB for re-enumeration");
    transport.disconnect();
    for _ in 0..REENUMERATE_STEPS {
        watchdog.feed();
        delay.delay_ms(REENUMERATE_STEP_MS);
    }
    transport.connect();
    info!("Attached to USB");
}
