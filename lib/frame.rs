use crate::error::{Error, Result};
use crate::FRAME_LEN;

pub const TAG_MASK: u16 = 0xF000;
pub const PAYLOAD_MASK: u16 = 0x0FFF;

/// Semantic channel of a frame slot. The discriminant is the slot index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(not(test), derive(defmt::Format))]
pub enum Channel {
    Header = 0,
    VoltageU = 1,
    VoltageV = 2,
    VoltageW = 3,
    CurrentU = 4,
    CurrentV = 5,
    CurrentW = 6,
    Reference = 7,
}

impl Channel {
    pub const ALL: [Channel; FRAME_LEN] = [
        Channel::Header,
        Channel::VoltageU,
        Channel::VoltageV,
        Channel::VoltageW,
        Channel::CurrentU,
        Channel::CurrentV,
        Channel::CurrentW,
        Channel::Reference,
    ];

    pub fn from_slot(slot: usize) -> Option<Self> {
        Channel::ALL.get(slot).copied()
    }

    pub const fn slot(self) -> usize {
        self as usize
    }

    pub const fn tag(self) -> u16 {
        match self {
            Channel::Header => 0x0000,
            Channel::VoltageU => 0x1000,
            Channel::VoltageV => 0x2000,
            Channel::VoltageW => 0x7000,
            Channel::CurrentU => 0xC000,
            Channel::CurrentV => 0xF000,
            Channel::CurrentW => 0xA000,
            Channel::Reference => 0x9000,
        }
    }
}

/// Latest raw converter output of every measured quantity, in frame order
/// (slot 1 first). The header slot has no reading.
pub type Readings = [u16; FRAME_LEN - 1];

/// One transfer unit: eight `tag | payload` words.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    words: [u16; FRAME_LEN],
}

impl Frame {
    /// Frame of all-zero payloads, served until the first window completes.
    pub const fn new() -> Self {
        let mut words = [0; FRAME_LEN];
        let mut slot = 0;
        while slot < FRAME_LEN {
            words[slot] = Channel::ALL[slot].tag();
            slot += 1;
        }
        Frame { words }
    }

    /// Packs the readings behind their slot tags. Payloads wider than the
    /// converter resolution are truncated so they never reach the tag nibble.
    pub fn build(readings: &Readings) -> Self {
        let mut frame = Frame::new();
        for (word, value) in frame.words[1..].iter_mut().zip(readings.iter()) {
            *word |= value & PAYLOAD_MASK;
        }
        frame
    }

    pub fn from_words(words: [u16; FRAME_LEN]) -> Self {
        Frame { words }
    }

    pub fn words(&self) -> &[u16; FRAME_LEN] {
        &self.words
    }

    pub fn word(&self, channel: Channel) -> u16 {
        self.words[channel.slot()]
    }

    pub fn payload(&self, channel: Channel) -> u16 {
        self.word(channel) & PAYLOAD_MASK
    }

    /// Byte view as clocked out MSB first by an 8-bit master.
    pub fn to_be_bytes(&self) -> [u8; 2 * FRAME_LEN] {
        let mut bytes = [0; 2 * FRAME_LEN];
        for (chunk, word) in bytes.chunks_exact_mut(2).zip(self.words.iter()) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    pub fn from_be_bytes(bytes: &[u8; 2 * FRAME_LEN]) -> Self {
        let mut words = [0; FRAME_LEN];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(2)) {
            *word = u16::from_be_bytes([chunk[0], chunk[1]]);
        }
        Frame { words }
    }

    /// Checks that every slot carries exactly its own tag.
    pub fn validate(&self) -> Result<()> {
        for channel in Channel::ALL.iter() {
            let tag = self.word(*channel) & TAG_MASK;
            if tag != channel.tag() {
                return Err(Error::Tag {
                    slot: channel.slot(),
                    tag,
                });
            }
        }
        if self.payload(Channel::Header) != 0 {
            return Err(Error::Tag {
                slot: Channel::Header.slot(),
                tag: self.word(Channel::Header),
            });
        }
        Ok(())
    }
}

impl Default for Frame {
    fn default() -> Self {
        Frame::new()
    }
}
