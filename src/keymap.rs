//! Channel → HID usage mapping.
//!
//! The table is fixed at compile time and total over the configured
//! channels; nothing rewrites it at runtime.

use crate::config::NUM_CHANNELS;

/// HID usage for "no key pressed".
pub const NO_KEY: u8 = 0x00;

/// HID usage for `a`; `b..=z` follow consecutively.
const USAGE_A: u8 = 0x04;

/// Letters typed by each channel, in channel order.
pub const LETTERS: [char; NUM_CHANNELS] = ['a', 's', 'd', 'f', 'w', 'e'];

/// HID usages sent for each channel.
pub const KEYMAP: [u8; NUM_CHANNELS] = build_keymap(LETTERS);

/// Map a lowercase ASCII letter to its keyboard usage.
///
/// Anything outside `'a'..='z'` maps to [`NO_KEY`].
pub const fn letter_usage(c: char) -> u8 {
    if c >= 'a' && c <= 'z' {
        USAGE_A + (c as u8 - b'a')
    } else {
        NO_KEY
    }
}

const fn build_keymap<const N: usize>(letters: [char; N]) -> [u8; N] {
    let mut map = [NO_KEY; N];
    let mut i = 0;
    while i < N {
        map[i] = letter_usage(letters[i]);
        i += 1;
    }
    map
}

/// Keycode for a channel; ids outside the map give [`NO_KEY`].
pub fn keycode(id: usize) -> u8 {
    KEYMAP.get(id).copied().unwrap_or(NO_KEY)
}
