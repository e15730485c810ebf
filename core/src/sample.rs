/// One step of a dual scan as written by the converter into its data register.
///
/// The master unit's result sits in the low half-word, the slave's result for the
/// paired channel in the high half-word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct ConversionSample(pub u32);

impl ConversionSample {
    pub const fn from_parts(low: u16, high: u16) -> Self {
        Self((high as u32) << 16 | low as u32)
    }

    /// Unit A result
    pub const fn low(self) -> u16 {
        (self.0 & 0xffff) as u16
    }

    /// Unit B result
    pub const fn high(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

/// DMA destination holding one raw word per scan step
pub type SampleBuffer<const N: usize> = [u32; N];
