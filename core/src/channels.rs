use heapless::Vec;

use crate::error::ConfigError;

/// Longest regular sequence a single scan can convert
pub const MAX_SEQUENCE_LEN: usize = 16;

/// Highest analog input channel of the converters
pub const MAX_CHANNEL: u8 = 17;

/// Channels a single unit converts, at most half of [`MAX_SEQUENCE_LEN`]
pub type UnitSequence = Vec<u8, { MAX_SEQUENCE_LEN / 2 }>;

/// Split of a contiguous channel range over the two converter units.
///
/// Unit A gets the lower half, unit B the upper half, both in ascending order. Step
/// `i` of a dual scan converts `unit_a()[i]` and `unit_b()[i]` at the same time.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelAssignment {
    unit_a: UnitSequence,
    unit_b: UnitSequence,
}

impl ChannelAssignment {
    pub fn new(total_channels: usize, base: u8) -> Result<Self, ConfigError> {
        if total_channels % 2 != 0 {
            return Err(ConfigError::OddChannelCount(total_channels));
        }
        if total_channels == 0 || total_channels > MAX_SEQUENCE_LEN {
            return Err(ConfigError::ChannelCountOutOfRange {
                requested: total_channels,
                max: MAX_SEQUENCE_LEN,
            });
        }

        let last = base as usize + total_channels - 1;
        if last > MAX_CHANNEL as usize {
            return Err(ConfigError::ChannelOutOfRange {
                channel: last,
                max: MAX_CHANNEL,
            });
        }

        let half = (total_channels / 2) as u8;
        // Both fit: half <= MAX_SEQUENCE_LEN / 2 was checked above
        let unit_a = (base..base + half).collect();
        let unit_b = (base + half..base + 2 * half).collect();

        Ok(Self { unit_a, unit_b })
    }

    pub fn unit_a(&self) -> &[u8] {
        &self.unit_a
    }

    pub fn unit_b(&self) -> &[u8] {
        &self.unit_b
    }

    /// Number of scan steps, which is also the number of samples per scan
    pub fn pairs(&self) -> usize {
        self.unit_a.len()
    }

    pub fn total_channels(&self) -> usize {
        self.unit_a.len() + self.unit_b.len()
    }

    pub fn first_channel(&self) -> u8 {
        self.unit_a[0]
    }

    pub fn last_channel(&self) -> u8 {
        self.unit_b[self.unit_b.len() - 1]
    }
}

/// Contents of the three regular sequence registers of one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegularSequence {
    /// Slots 13 to 16 and the sequence length
    pub sqr1: u32,
    /// Slots 7 to 12
    pub sqr2: u32,
    /// Slots 1 to 6
    pub sqr3: u32,
}

impl RegularSequence {
    const SLOT_BITS: u32 = 5;
    const SLOTS_PER_REGISTER: usize = 6;
    const LENGTH_SHIFT: u32 = 20;

    pub fn encode(channels: &[u8]) -> Self {
        debug_assert!(!channels.is_empty() && channels.len() <= MAX_SEQUENCE_LEN);

        let mut registers = [0u32; 3];
        for (slot, &channel) in channels.iter().enumerate() {
            let register = slot / Self::SLOTS_PER_REGISTER;
            let shift = (slot % Self::SLOTS_PER_REGISTER) as u32 * Self::SLOT_BITS;
            registers[register] |= (channel as u32 & 0x1f) << shift;
        }

        let [sqr3, sqr2, sqr1] = registers;
        Self {
            // The length field holds the number of conversions minus one
            sqr1: sqr1 | ((channels.len() as u32 - 1) << Self::LENGTH_SHIFT),
            sqr2,
            sqr3,
        }
    }
}

/// The first four 5-bit slot fields of a sequence register, lowest slot first
pub fn slot_fields(register: u32) -> [u8; 4] {
    core::array::from_fn(|i| ((register >> (5 * i)) % 32) as u8)
}
