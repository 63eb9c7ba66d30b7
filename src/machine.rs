//! Report state machine.
//!
//! Turns pending presses into a key-down report followed by a key-up
//! report. Only one report goes out per eligible iteration, and the
//! machine only moves while the endpoint is free and the host has sent
//! its first LED report. Every key-down is followed by exactly one empty
//! report before the next key-down, so the host never sees two keys at
//! once or a stuck key.

use crate::config::REPORT_KEY_SLOTS;
use crate::debounce::ChannelId;
use crate::hid::keyboard::MAX_REPORT_SIZE;
use crate::hid::KeyboardReport;
use crate::keymap;
use crate::transport::HidTransport;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportState {
    /// Waiting for a pending press.
    #[default]
    Idle,
    /// Key-down for this channel goes out next.
    SendKey(ChannelId),
    /// Key-up goes out next.
    ReleaseKey,
}

pub struct ReportMachine<const SLOTS: usize = REPORT_KEY_SLOTS> {
    state: ReportState,
    report: KeyboardReport<SLOTS>,
}

impl<const SLOTS: usize> Default for ReportMachine<SLOTS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const SLOTS: usize> ReportMachine<SLOTS> {
    pub const fn new() -> Self {
        Self {
            state: ReportState::Idle,
            report: KeyboardReport::empty(),
        }
    }

    pub fn state(&self) -> ReportState {
        self.state
    }

    /// The last report built (sent or waiting for a retry).
    pub fn report(&self) -> &KeyboardReport<SLOTS> {
        &self.report
    }

    /// Run one iteration.
    ///
    /// `next_press` is only consulted from `Idle`. Returns the report
    /// handed to the transport, if any.
    pub fn step<T, F>(
        &mut self,
        transport: &mut T,
        host_ready: bool,
        next_press: F,
    ) -> Option<KeyboardReport<SLOTS>>
    where
        T: HidTransport + ?Sized,
        F: FnOnce() -> Option<ChannelId>,
    {
        if !host_ready || !transport.interrupt_endpoint_ready() {
            return None;
        }

        match self.state {
            ReportState::Idle => {
                if let Some(id) = next_press() {
                    self.enter(ReportState::SendKey(id));
                }
                None
            }
            ReportState::SendKey(id) => {
                self.report.press(keymap::keycode(id));
                self.transmit(transport, ReportState::ReleaseKey)
            }
            ReportState::ReleaseKey => {
                self.report.clear();
                self.transmit(transport, ReportState::Idle)
            }
        }
    }

    fn transmit<T>(
        &mut self,
        transport: &mut T,
        next: ReportState,
    ) -> Option<KeyboardReport<SLOTS>>
    where
        T: HidTransport + ?Sized,
    {
        let mut buf = [0u8; MAX_REPORT_SIZE];
        let len = self.report.serialize(&mut buf);
        if len == 0 {
            warn!("Report does not fit in {} bytes", MAX_REPORT_SIZE);
            return None;
        }

        // On refusal keep the state; the same report is rebuilt and retried.
        if let Err(e) = transport.send_report(&buf[..len]) {
            warn!("Report send failed: {:?}", e);
            return None;
        }

        self.enter(next);
        Some(self.report)
    }

    fn enter(&mut self, next: ReportState) {
        debug!("Report state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};

    /// Transport that records every accepted report.
    struct Recorder {
        ready: bool,
        refuse: bool,
        sent: heapless::Vec<[u8; 8], 16>,
    }

    impl Recorder {
        fn ready() -> Self {
            Self {
                ready: true,
                refuse: false,
                sent: heapless::Vec::new(),
            }
        }
    }

    impl HidTransport for Recorder {
        fn poll(&mut self) {}

        fn interrupt_endpoint_ready(&self) -> bool {
            self.ready
        }

        fn send_report(&mut self, report: &[u8]) -> Result<()> {
            if self.refuse {
                return Err(Error::EndpointBusy);
            }
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(report);
            self.sent.push(bytes).unwrap();
            Ok(())
        }

        fn disconnect(&mut self) {}

        fn connect(&mut self) {}
    }

    #[test]
    fn press_becomes_down_then_up() {
        let mut machine: ReportMachine = ReportMachine::new();
        let mut usb = Recorder::ready();

        assert_eq!(machine.step(&mut usb, true, || Some(2)), None);
        assert_eq!(machine.state(), ReportState::SendKey(2));

        let down = machine.step(&mut usb, true, || None).unwrap();
        assert_eq!(down.keycodes[0], keymap::keycode(2));
        assert_eq!(machine.state(), ReportState::ReleaseKey);

        let up = machine.step(&mut usb, true, || None).unwrap();
        assert!(up.is_empty());
        assert_eq!(machine.state(), ReportState::Idle);

        assert_eq!(usb.sent.as_slice(), &[[0, 0, 0x07, 0, 0, 0, 0, 0], [0; 8]]);
    }

    #[test]
    fn pending_press_is_not_consumed_outside_idle() {
        let mut machine: ReportMachine = ReportMachine::new();
        let mut usb = Recorder::ready();
        machine.step(&mut usb, true, || Some(0));

        let mut asked = false;
        machine.step(&mut usb, true, || {
            asked = true;
            Some(1)
        });
        machine.step(&mut usb, true, || {
            asked = true;
            Some(1)
        });
        assert!(!asked);
        assert_eq!(machine.state(), ReportState::Idle);
    }

    #[test]
    fn waits_for_host_feedback() {
        let mut machine: ReportMachine = ReportMachine::new();
        let mut usb = Recorder::ready();
        for _ in 0..10 {
            assert_eq!(machine.step(&mut usb, false, || Some(0)), None);
        }
        assert_eq!(machine.state(), ReportState::Idle);
        assert!(usb.sent.is_empty());
    }

    #[test]
    fn holds_state_while_endpoint_busy() {
        let mut machine: ReportMachine = ReportMachine::new();
        let mut usb = Recorder::ready();
        machine.step(&mut usb, true, || Some(4));

        usb.ready = false;
        for _ in 0..10 {
            assert_eq!(machine.step(&mut usb, true, || None), None);
        }
        assert_eq!(machine.state(), ReportState::SendKey(4));

        usb.ready = true;
        assert!(machine.step(&mut usb, true, || None).is_some());
        assert_eq!(usb.sent.len(), 1);
    }

    #[test]
    fn refused_report_is_retried() {
        let mut machine: ReportMachine = ReportMachine::new();
        let mut usb = Recorder::ready();
        machine.step(&mut usb, true, || Some(1));

        usb.refuse = true;
        assert_eq!(machine.step(&mut usb, true, || None), None);
        assert_eq!(machine.state(), ReportState::SendKey(1));
        assert_eq!(machine.report().keycodes[0], 0x16);

        usb.refuse = false;
        machine.step(&mut usb, true, || None);
        assert_eq!(usb.sent.as_slice(), &[[0, 0, 0x16, 0, 0, 0, 0, 0]]);
        assert_eq!(machine.state(), ReportState::ReleaseKey);

        machine.step(&mut usb, true, || None);
        assert!(machine.report().is_empty());
    }

    #[test]
    fn unknown_channel_sends_no_key() {
        let mut machine: ReportMachine = ReportMachine::new();
        let mut usb = Recorder::ready();
        machine.step(&mut usb, true, || Some(99));
        let down = machine.step(&mut usb, true, || None).unwrap();
        assert!(down.is_empty());
        assert_eq!(machine.state(), ReportState::ReleaseKey);
    }
}
