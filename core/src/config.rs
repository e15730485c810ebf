use fugit::{HertzU32, MicrosDurationU64};

use crate::channels::ChannelAssignment;
use crate::engine::SampleTime;
use crate::error::ConfigError;
use crate::format::max_line_len;

/// Number of converted channels, split evenly over both units
pub const TOTAL_CHANNELS: usize = 8;
/// Samples per scan
pub const SAMPLE_PAIRS: usize = TOTAL_CHANNELS / 2;
/// Lowest converted channel
pub const BASE_CHANNEL: u8 = 0;

pub const OUTBOUND_CAPACITY: usize = 128;
pub const INBOUND_CAPACITY: usize = 128;

/// Timer compare events between two scans
pub const TICKS_PER_SCAN: u32 = 500;

/// Polls of a calibration flag before the converter is given up on
pub const CALIBRATION_POLL_LIMIT: u32 = 100_000;
/// Busy cycles after powering on a converter
pub const SETTLE_CYCLES: u32 = 800_000;

pub const BAUD_RATE: u32 = 38_400;

/// Free running timer that toggles its compare output once per period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerTimer {
    pub clock: HertzU32,
    pub prescaler: u16,
    /// Auto reload value
    pub period: u16,
    pub compare: u16,
}

impl TriggerTimer {
    /// Time between two compare events, rounded down
    pub const fn tick_period(&self) -> MicrosDurationU64 {
        let counts = (self.prescaler as u64 + 1) * (self.period as u64 + 1);
        MicrosDurationU64::from_ticks(counts * 1_000_000 / self.clock.to_Hz() as u64)
    }
}

/// Static description of the whole pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PipelineConfig {
    pub total_channels: usize,
    pub base_channel: u8,
    pub sample_time: SampleTime,
    pub adc_clock: HertzU32,
    pub timer: TriggerTimer,
    pub ticks_per_scan: u32,
    pub baud_rate: u32,
    pub outbound_capacity: usize,
}

impl PipelineConfig {
    /// 72MHz core with the converters at 12MHz and the timer on the doubled APB1 clock
    pub const DEFAULT: Self = Self {
        total_channels: TOTAL_CHANNELS,
        base_channel: BASE_CHANNEL,
        sample_time: SampleTime::Cycles28_5,
        adc_clock: HertzU32::MHz(12),
        timer: TriggerTimer {
            clock: HertzU32::MHz(72),
            prescaler: 0,
            period: 0xffff,
            compare: 0x8fff,
        },
        ticks_per_scan: TICKS_PER_SCAN,
        baud_rate: BAUD_RATE,
        outbound_capacity: OUTBOUND_CAPACITY,
    };

    /// Time for the converters to run one full scan, rounded up
    pub fn scan_duration(&self) -> MicrosDurationU64 {
        let pairs = (self.total_channels / 2) as u64;
        let half_cycles = pairs * self.sample_time.conversion_half_cycles() as u64;
        let clock_hz = self.adc_clock.to_Hz() as u64;
        MicrosDurationU64::from_ticks((half_cycles * 1_000_000).div_ceil(2 * clock_hz))
    }

    /// Time to send the longest possible scan line, rounded up
    pub fn line_duration(&self) -> MicrosDurationU64 {
        // Start bit, 8 data bits, 1 stop bit
        const BITS_PER_BYTE: u64 = 10;
        let bits = max_line_len(self.total_channels / 2) as u64 * BITS_PER_BYTE;
        MicrosDurationU64::from_ticks((bits * 1_000_000).div_ceil(self.baud_rate as u64))
    }

    /// Time between two scan starts
    pub fn trigger_period(&self) -> MicrosDurationU64 {
        self.timer.tick_period() * self.ticks_per_scan
    }

    /// Check the channel layout and that every scan can be converted and sent before
    /// the next trigger.
    pub fn validate(&self) -> Result<ChannelAssignment, ConfigError> {
        let assignment = ChannelAssignment::new(self.total_channels, self.base_channel)?;

        let line = max_line_len(assignment.pairs());
        if line > self.outbound_capacity {
            return Err(ConfigError::LineExceedsBuffer {
                line,
                capacity: self.outbound_capacity,
            });
        }

        let cycle = self.scan_duration() + self.line_duration();
        let period = self.trigger_period();
        if period <= cycle {
            return Err(ConfigError::TriggerTooFast {
                period_us: period.ticks(),
                cycle_us: cycle.ticks(),
            });
        }

        Ok(assignment)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
