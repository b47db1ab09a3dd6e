//! Common types and data structures used across the adcdiff application
//!
//! This module contains the message, selector and error types shared by the
//! interrupt handler and the tasks.

use crate::config::{ADC_RESULT_SHIFT, CHANNEL_COUNT, DEFAULT_SELECTOR, SAMPLE_MASK};

/// One of the four analog inputs swept by the converter
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    Ch0 = 0,
    Ch1 = 1,
    Ch2 = 2,
    Ch3 = 3,
}

impl Channel {
    pub const ALL: [Channel; CHANNEL_COUNT] = [Channel::Ch0, Channel::Ch1, Channel::Ch2, Channel::Ch3];

    /// Map a converter source index to a channel, `None` for anything outside 0..=3
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Channel::Ch0),
            1 => Some(Channel::Ch1),
            2 => Some(Channel::Ch2),
            3 => Some(Channel::Ch3),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Bit of this channel in a 4-bit flag set
    pub const fn mask(self) -> u8 {
        1 << (self as u8)
    }
}

/// A single converted reading, handed from interrupt context to the coordinator by value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    pub channel: Channel,
    /// 9-bit converted value (0..=511)
    pub value: u16,
}

impl Sample {
    pub const fn new(channel: Channel, value: u16) -> Self {
        Self {
            channel,
            value: value & SAMPLE_MASK,
        }
    }

    /// Build a sample from a raw 12-bit converter result
    pub const fn from_raw(channel: Channel, raw: u16) -> Self {
        Self::new(channel, raw >> ADC_RESULT_SHIFT)
    }
}

/// Active-channel selector, 1-based like the selection buttons (1 -> channel 0)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelSelector(u8);

impl ChannelSelector {
    pub const fn new(selector: u8) -> Option<Self> {
        if selector >= 1 && selector as usize <= CHANNEL_COUNT {
            Some(Self(selector))
        } else {
            None
        }
    }

    /// Selector for the lowest set bit of a selection flag set
    pub const fn from_flags(bits: u8) -> Option<Self> {
        let bits = bits & ((1 << CHANNEL_COUNT) - 1);
        if bits == 0 {
            None
        } else {
            Some(Self(bits.trailing_zeros() as u8 + 1))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn channel(self) -> Channel {
        match self.0 {
            2 => Channel::Ch1,
            3 => Channel::Ch2,
            4 => Channel::Ch3,
            _ => Channel::Ch0,
        }
    }

    /// Selection flag bit that requests this selector
    pub const fn mask(self) -> u8 {
        1 << (self.0 - 1)
    }
}

impl Default for ChannelSelector {
    fn default() -> Self {
        Self(DEFAULT_SELECTOR)
    }
}

/// Reasons the conversion handler did not deliver a sample
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AcquireError {
    /// Sample queue was full; the sample was dropped and no flag was raised
    QueueFull(Sample),
    /// Completion signal from a source that is not one of the four channels
    SpuriousSource(u8),
}

/// Application version information
pub struct AppVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

impl AppVersion {
    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self { major, minor, patch }
    }

}

/// Current application version
pub const APP_VERSION: AppVersion = AppVersion::new(0, 1, 0);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_version_matches_package_version() {
        let version = format!("{}.{}.{}", APP_VERSION.major, APP_VERSION.minor, APP_VERSION.patch);
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn channel_from_index_rejects_unknown_sources() {
        assert_eq!(Channel::from_index(2), Some(Channel::Ch2));
        assert_eq!(Channel::from_index(4), None);
        assert_eq!(Channel::from_index(0xFF), None);
    }

    #[test]
    fn raw_results_are_reduced_to_nine_bits() {
        assert_eq!(Sample::from_raw(Channel::Ch0, 0x0FFF).value, 511);
        assert_eq!(Sample::from_raw(Channel::Ch0, 960).value, 120);
        assert_eq!(Sample::from_raw(Channel::Ch1, 7).value, 0);
    }

    #[test]
    fn selector_range_is_one_based() {
        assert!(ChannelSelector::new(0).is_none());
        assert!(ChannelSelector::new(5).is_none());
        assert_eq!(ChannelSelector::new(3).map(|s| s.channel()), Some(Channel::Ch2));
        assert_eq!(ChannelSelector::default().channel(), Channel::Ch0);
    }

    #[test]
    fn selector_from_flags_takes_lowest_bit() {
        assert_eq!(ChannelSelector::from_flags(0b1100).map(|s| s.get()), Some(3));
        assert_eq!(ChannelSelector::from_flags(0b0001).map(|s| s.get()), Some(1));
        assert_eq!(ChannelSelector::from_flags(0b1_0000), None);
        assert_eq!(ChannelSelector::new(4).map(|s| s.mask()), Some(0b1000));
    }
}
