//! Master side of the link: recovering and decoding captured frames.
//!
//! The master clocks 16 bytes per transaction. Its capture is delayed
//! against the slave's frame by one word of pipeline and one bit of sampling
//! lag, and the tag nibble may arrive with one bit corrupted. Decoding is
//! positional: a slot is accepted when its tag is the channel's own tag or
//! one of that tag's single-bit aliases no other channel claims.

use heapless::Vec;

use crate::frame::{Channel, Frame, PAYLOAD_MASK};
use crate::FRAME_LEN;

const STREAM_BITS: u32 = 16 * FRAME_LEN as u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Measurement {
    pub channel: Channel,
    pub raw: u16,
}

/// Fixed delay, in bit times, between the slave's frame and the master's
/// 16-byte capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Alignment {
    delay_bits: u32,
}

impl Alignment {
    pub const LINK_DELAY_BITS: u32 = 17;

    pub const fn new(delay_bits: u32) -> Self {
        Alignment {
            delay_bits: delay_bits % STREAM_BITS,
        }
    }

    /// Treats the capture as a circular bit stream and reads each slot from
    /// its delayed position.
    pub fn realign(&self, capture: &[u8; 2 * FRAME_LEN]) -> Frame {
        let stream = u128::from_be_bytes(*capture);
        let mut words = [0; FRAME_LEN];
        for (slot, word) in words.iter_mut().enumerate() {
            let start = (16 * slot as u32 + self.delay_bits) % STREAM_BITS;
            *word = (stream.rotate_left(start) >> (STREAM_BITS - 16)) as u16;
        }
        Frame::from_words(words)
    }
}

impl Default for Alignment {
    fn default() -> Self {
        Alignment::new(Alignment::LINK_DELAY_BITS)
    }
}

/// Tag nibbles accepted for each channel.
fn accepted_tags(channel: Channel) -> &'static [u8] {
    match channel {
        Channel::Header => &[0x0],
        Channel::VoltageU => &[0x1, 0x0, 0x3],
        Channel::VoltageV => &[0x2, 0x6],
        Channel::VoltageW => &[0x7, 0x5],
        Channel::CurrentU => &[0xC, 0x4, 0xD],
        Channel::CurrentV => &[0xF, 0xE],
        Channel::CurrentW => &[0xA, 0xB],
        Channel::Reference => &[0x9, 0x8],
    }
}

pub fn accepts(channel: Channel, word: u16) -> bool {
    let nibble = (word >> 12) as u8;
    accepted_tags(channel).contains(&nibble)
}

/// Measurements of every data slot whose tag is acceptable. The header slot
/// is never reported.
pub fn decode(frame: &Frame) -> Vec<Measurement, { FRAME_LEN - 1 }> {
    let mut measurements = Vec::new();
    for channel in Channel::ALL[1..].iter() {
        let word = frame.word(*channel);
        if !accepts(*channel, word) {
            log!(debug, "slot {} rejected: {=u16}", channel, word);
            continue;
        }
        // One entry per data slot, capacity matches.
        let _ = measurements.push(Measurement {
            channel: *channel,
            raw: word & PAYLOAD_MASK,
        });
    }
    measurements
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> Frame {
        Frame::build(&[100, 200, 300, 10, 20, 30, 5])
    }

    /// What the master clocks in: the frame's bit stream delayed by `bits`.
    fn delayed(frame: &Frame, bits: u32) -> [u8; 16] {
        u128::from_be_bytes(frame.to_be_bytes())
            .rotate_right(bits)
            .to_be_bytes()
    }

    #[test]
    fn aliases_are_unambiguous() {
        for (i, a) in Channel::ALL[1..].iter().enumerate() {
            assert!(accepts(*a, a.tag()));
            for b in Channel::ALL[i + 2..].iter() {
                for tag in accepted_tags(*a) {
                    assert!(!accepted_tags(*b).contains(tag));
                }
            }
        }
    }

    #[test]
    fn realign_recovers_delayed_capture() {
        let frame = scenario();
        let capture = delayed(&frame, Alignment::LINK_DELAY_BITS);
        assert_eq!(Alignment::default().realign(&capture), frame);
    }

    #[test]
    fn realign_matches_master_byte_slicing() {
        let capture = delayed(&scenario(), Alignment::LINK_DELAY_BITS);
        // Phase U voltage starts at bit 6 of byte 4.
        let tag = (capture[4] & 0b0111_1000) >> 3;
        let raw = ((capture[4] as u16 & 0b111) << 9)
            | ((capture[5] as u16) << 1)
            | ((capture[6] as u16) >> 7);
        assert_eq!(tag, 0x1);
        assert_eq!(raw, 100);
    }

    #[test]
    fn zero_delay_is_plain_byte_order() {
        let frame = scenario();
        assert_eq!(Alignment::new(0).realign(&frame.to_be_bytes()), frame);
        assert_eq!(Alignment::new(128), Alignment::new(0));
    }

    #[test]
    fn decode_reports_every_data_slot() {
        let measurements = decode(&scenario());
        assert_eq!(measurements.len(), 7);
        assert_eq!(
            measurements[0],
            Measurement {
                channel: Channel::VoltageU,
                raw: 100
            }
        );
        assert_eq!(
            measurements[6],
            Measurement {
                channel: Channel::Reference,
                raw: 5
            }
        );
    }

    #[test]
    fn decode_tolerates_single_bit_tag_error() {
        let mut words = *scenario().words();
        // 0xF014 with the low tag bit flipped
        words[5] = 0xE014;
        let measurements = decode(&Frame::from_words(words));
        assert_eq!(measurements.len(), 7);
        assert_eq!(measurements[4].channel, Channel::CurrentV);
        assert_eq!(measurements[4].raw, 20);
    }

    #[test]
    fn decode_skips_foreign_tag() {
        let mut words = *scenario().words();
        words[2] = 0x9123;
        let measurements = decode(&Frame::from_words(words));
        assert_eq!(measurements.len(), 6);
        assert!(measurements.iter().all(|m| m.channel != Channel::VoltageV));
    }
}
