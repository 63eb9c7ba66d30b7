//! Per-channel debounce engine.
//!
//! Each channel keeps a press counter, a release counter and a latched
//! "pressed" state. A raw level has to hold for `threshold` consecutive
//! polls before the latch follows it, which both filters contact bounce
//! and stops a held button from re-triggering.
//!
//! Channels never look at each other, so a [`Channel`] can be driven on
//! its own with any sample sequence.

use embedded_hal::digital::InputPin;
use heapless::Vec;

use crate::config::DEBOUNCE_THRESHOLD;

/// Stable channel index, also the keymap key.
pub type ChannelId = usize;

/// Debounced transition of a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Edge {
    Pressed,
    Released,
}

/// Source of a channel's raw level.
pub trait RawLine {
    /// `true` while the line is asserted (button pulled to ground).
    fn is_asserted(&mut self) -> bool;
}

impl<F: FnMut() -> bool> RawLine for F {
    fn is_asserted(&mut self) -> bool {
        self()
    }
}

/// Adapts an active-low GPIO input (pull-up, button to ground).
///
/// A failed pin read counts as "not asserted".
pub struct ActiveLow<P>(pub P);

impl<P: InputPin> RawLine for ActiveLow<P> {
    fn is_asserted(&mut self) -> bool {
        self.0.is_low().unwrap_or(false)
    }
}

/// Debounce state of one channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Channel {
    press_counter: u8,
    release_counter: u8,
    latched_pressed: bool,
}

impl Channel {
    pub const fn new() -> Self {
        Self {
            press_counter: 0,
            release_counter: 0,
            latched_pressed: false,
        }
    }

    /// Feed one raw sample.
    ///
    /// Only the counter matching the sample advances; the other one is
    /// cleared, so `threshold` counts consecutive samples.
    pub fn poll(&mut self, asserted: bool, threshold: u8) -> Option<Edge> {
        if asserted {
            self.release_counter = 0;
            self.press_counter = self.press_counter.saturating_add(1);
            if self.press_counter >= threshold && !self.latched_pressed {
                self.latched_pressed = true;
                self.press_counter = 0;
                return Some(Edge::Pressed);
            }
        } else {
            self.press_counter = 0;
            self.release_counter = self.release_counter.saturating_add(1);
            if self.release_counter >= threshold && self.latched_pressed {
                self.latched_pressed = false;
                self.release_counter = 0;
                return Some(Edge::Released);
            }
        }
        None
    }

    pub fn is_pressed(&self) -> bool {
        self.latched_pressed
    }

    pub fn press_counter(&self) -> u8 {
        self.press_counter
    }

    pub fn release_counter(&self) -> u8 {
        self.release_counter
    }
}

/// A bank of `N` debounced channels with their raw lines.
///
/// Every `Pressed` edge marks its channel as pending until the report
/// machine takes it.
pub struct Debouncer<L, const N: usize> {
    lines: [L; N],
    channels: [Channel; N],
    pending: [bool; N],
    threshold: u8,
}

impl<L: RawLine, const N: usize> Debouncer<L, N> {
    /// Create a debouncer with the configured threshold.
    pub fn new(lines: [L; N]) -> Self {
        Self::with_threshold(lines, DEBOUNCE_THRESHOLD)
    }

    /// Create a debouncer with a custom threshold (at least 1).
    pub fn with_threshold(lines: [L; N], threshold: u8) -> Self {
        Self {
            lines,
            channels: [Channel::new(); N],
            pending: [false; N],
            threshold: threshold.max(1),
        }
    }

    /// Sample every line once, in channel order.
    ///
    /// Same as [`Debouncer::sweep`] without collecting the edges. This is
    /// what the polling loop runs.
    pub fn scan(&mut self) {
        self.sample_each(|_, _| {});
    }

    /// Sample every line once, in channel order.
    ///
    /// Returns the edges seen during this sweep.
    pub fn sweep(&mut self) -> Vec<(ChannelId, Edge), N> {
        let mut edges = Vec::new();
        self.sample_each(|id, edge| {
            // At most one edge per channel, so this never overflows.
            let _ = edges.push((id, edge));
        });
        edges
    }

    fn sample_each(&mut self, mut on_edge: impl FnMut(ChannelId, Edge)) {
        let channels = self.lines.iter_mut().zip(self.channels.iter_mut());
        for (id, (line, channel)) in channels.enumerate() {
            let Some(edge) = channel.poll(line.is_asserted(), self.threshold) else {
                continue;
            };
            debug!("Channel {}: {:?}", id, edge);
            if edge == Edge::Pressed {
                self.pending[id] = true;
            }
            on_edge(id, edge);
        }
    }

    /// Take the lowest-numbered pending press, if any.
    pub fn take_pending(&mut self) -> Option<ChannelId> {
        let id = self.pending.iter().position(|&p| p)?;
        self.pending[id] = false;
        Some(id)
    }

    pub fn has_pending(&self) -> bool {
        self.pending.iter().any(|&p| p)
    }

    pub fn is_pending(&self, id: ChannelId) -> bool {
        self.pending.get(id).copied().unwrap_or(false)
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id)
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use core::convert::Infallible;

    const T: u8 = DEBOUNCE_THRESHOLD;

    fn feed(channel: &mut Channel, asserted: bool, n: usize) -> heapless::Vec<Edge, 8> {
        let mut edges = heapless::Vec::new();
        for _ in 0..n {
            if let Some(edge) = channel.poll(asserted, T) {
                edges.push(edge).unwrap();
            }
        }
        edges
    }

    // ════════════════════════════════════════════════════════════════════════
    // Channel Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn short_press_never_registers() {
        let mut ch = Channel::new();
        assert!(feed(&mut ch, true, T as usize - 1).is_empty());
        assert!(!ch.is_pressed());
        assert_eq!(ch.press_counter(), T - 1);
    }

    #[test]
    fn press_registers_exactly_at_threshold() {
        let mut ch = Channel::new();
        assert!(feed(&mut ch, true, T as usize - 1).is_empty());
        assert_eq!(ch.poll(true, T), Some(Edge::Pressed));
        assert!(ch.is_pressed());
        assert_eq!(ch.press_counter(), 0);
    }

    #[test]
    fn held_button_does_not_retrigger() {
        let mut ch = Channel::new();
        let edges = feed(&mut ch, true, 5 * T as usize);
        assert_eq!(edges.as_slice(), &[Edge::Pressed]);
        assert!(ch.is_pressed());
    }

    #[test]
    fn release_rearms_after_threshold() {
        let mut ch = Channel::new();
        feed(&mut ch, true, T as usize);

        assert!(feed(&mut ch, false, T as usize - 1).is_empty());
        assert!(ch.is_pressed());
        assert_eq!(ch.poll(false, T), Some(Edge::Released));
        assert!(!ch.is_pressed());

        assert_eq!(feed(&mut ch, true, T as usize).as_slice(), &[Edge::Pressed]);
    }

    #[test]
    fn release_without_press_is_silent() {
        let mut ch = Channel::new();
        assert!(feed(&mut ch, false, 3 * T as usize).is_empty());
        assert!(!ch.is_pressed());
    }

    #[test]
    fn bouncing_contact_never_registers() {
        let mut ch = Channel::new();
        for i in 0..(10 * T as usize) {
            assert_eq!(ch.poll(i % 2 == 0, T), None);
        }
        assert!(!ch.is_pressed());
    }

    #[test]
    fn interrupted_press_restarts_count() {
        let mut ch = Channel::new();
        feed(&mut ch, true, T as usize - 1);
        feed(&mut ch, false, 1);
        assert!(feed(&mut ch, true, T as usize - 1).is_empty());
        assert_eq!(ch.poll(true, T), Some(Edge::Pressed));
    }

    #[test]
    fn edges_are_at_least_threshold_apart() {
        let mut ch = Channel::new();
        let mut last: Option<usize> = None;
        // Press and release runs of varying length, some too short to count.
        let runs = [3usize, 250, 1, 199, 200, 7, 400, 201, 50, 260];
        let mut i = 0;
        for (n, &len) in runs.iter().enumerate() {
            for _ in 0..len {
                if ch.poll(n % 2 == 1, T).is_some() {
                    if let Some(prev) = last {
                        assert!(i - prev >= T as usize);
                    }
                    last = Some(i);
                }
                i += 1;
            }
        }
        assert!(last.is_some());
    }

    #[test]
    fn counters_saturate() {
        let mut ch = Channel::new();
        feed(&mut ch, false, 1000);
        assert_eq!(ch.release_counter(), u8::MAX);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Debouncer Tests
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn sweep_marks_pressed_channels_pending() {
        let levels: [Cell<bool>; 3] = core::array::from_fn(|_| Cell::new(false));
        let lines: [_; 3] = core::array::from_fn(|i| {
            let level = &levels[i];
            move || level.get()
        });
        let mut deb = Debouncer::with_threshold(lines, 4);

        levels[1].set(true);
        for _ in 0..3 {
            assert!(deb.sweep().is_empty());
        }
        let edges = deb.sweep();
        assert_eq!(edges.as_slice(), &[(1, Edge::Pressed)]);
        assert!(deb.is_pending(1));
        assert!(!deb.is_pending(0));

        assert_eq!(deb.take_pending(), Some(1));
        assert!(!deb.has_pending());
        assert_eq!(deb.take_pending(), None);
    }

    #[test]
    fn take_pending_prefers_lowest_id() {
        let levels: [Cell<bool>; 4] = core::array::from_fn(|_| Cell::new(false));
        let lines: [_; 4] = core::array::from_fn(|i| {
            let level = &levels[i];
            move || level.get()
        });
        let mut deb = Debouncer::with_threshold(lines, 2);

        levels[3].set(true);
        levels[1].set(true);
        deb.sweep();
        deb.sweep();

        assert_eq!(deb.take_pending(), Some(1));
        assert_eq!(deb.take_pending(), Some(3));
        assert_eq!(deb.take_pending(), None);
    }

    #[test]
    fn release_edge_is_not_pending() {
        let level = Cell::new(true);
        let mut deb = Debouncer::with_threshold([|| level.get()], 2);
        deb.sweep();
        deb.sweep();
        assert_eq!(deb.take_pending(), Some(0));

        level.set(false);
        deb.sweep();
        let edges = deb.sweep();
        assert_eq!(edges.as_slice(), &[(0, Edge::Released)]);
        assert!(!deb.has_pending());
    }

    #[test]
    fn scan_tracks_channels_like_sweep() {
        let level = Cell::new(true);
        let mut scanned = Debouncer::with_threshold([|| level.get()], 3);
        let mut swept = Debouncer::with_threshold([|| level.get()], 3);

        for i in 0..10 {
            level.set(i < 5);
            scanned.scan();
            swept.sweep();
            let (a, b) = (scanned.channel(0).unwrap(), swept.channel(0).unwrap());
            assert_eq!(a.is_pressed(), b.is_pressed());
            assert_eq!(a.press_counter(), b.press_counter());
            assert_eq!(a.release_counter(), b.release_counter());
            assert_eq!(scanned.has_pending(), swept.has_pending());
        }
        assert_eq!(scanned.take_pending(), Some(0));
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let deb = Debouncer::with_threshold([|| false], 0);
        assert_eq!(deb.threshold(), 1);
    }

    struct MockPin {
        low: bool,
    }

    impl embedded_hal::digital::ErrorType for MockPin {
        type Error = Infallible;
    }

    impl InputPin for MockPin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.low)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(self.low)
        }
    }

    #[test]
    fn active_low_pin_asserts_when_grounded() {
        let mut grounded = ActiveLow(MockPin { low: true });
        let mut floating = ActiveLow(MockPin { low: false });
        assert!(grounded.is_asserted());
        assert!(!floating.is_asserted());
    }
}
