use crate::channels::{ChannelAssignment, RegularSequence};
use crate::error::Error;

/// Which of the two converters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Unit {
    /// Unit A, triggered by software, owns the DMA request and the end-of-scan interrupt
    Master,
    /// Unit B, runs in lock step with the master
    Slave,
}

/// Sampling time per channel in converter clock cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleTime {
    Cycles1_5 = 0,
    Cycles7_5 = 1,
    Cycles13_5 = 2,
    Cycles28_5 = 3,
    Cycles41_5 = 4,
    Cycles55_5 = 5,
    Cycles71_5 = 6,
    Cycles239_5 = 7,
}

impl SampleTime {
    /// Successive approximation time added to every sample
    const CONVERSION_HALF_CYCLES: u32 = 25;
    const SMPR2_CHANNELS: u32 = 10;
    const SMPR1_CHANNELS: u32 = 8;

    /// Sampling time in half converter clock cycles
    pub const fn half_cycles(self) -> u32 {
        match self {
            SampleTime::Cycles1_5 => 3,
            SampleTime::Cycles7_5 => 15,
            SampleTime::Cycles13_5 => 27,
            SampleTime::Cycles28_5 => 57,
            SampleTime::Cycles41_5 => 83,
            SampleTime::Cycles55_5 => 111,
            SampleTime::Cycles71_5 => 143,
            SampleTime::Cycles239_5 => 479,
        }
    }

    /// Total time of one conversion in half converter clock cycles
    pub const fn conversion_half_cycles(self) -> u32 {
        self.half_cycles() + Self::CONVERSION_HALF_CYCLES
    }

    /// `(SMPR1, SMPR2)` with this sampling time on every channel
    pub const fn sample_time_registers(self) -> (u32, u32) {
        const fn repeat(bits: u32, channels: u32) -> u32 {
            let mut value = 0;
            let mut i = 0;
            while i < channels {
                value |= bits << (3 * i);
                i += 1;
            }
            value
        }

        let bits = self as u32;
        (
            repeat(bits, Self::SMPR1_CHANNELS),
            repeat(bits, Self::SMPR2_CHANNELS),
        )
    }
}

/// Everything a unit needs to run its part of a dual scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnitSettings {
    pub unit: Unit,
    pub sequence: RegularSequence,
    pub sample_time: SampleTime,
}

/// One analog-to-digital converter unit.
///
/// Implementations configure scan mode, single conversion, right alignment and a
/// software trigger. The [`Unit::Master`] additionally enables dual regular
/// simultaneous mode, the DMA request and the end-of-scan interrupt.
pub trait ConverterUnit {
    fn power_off(&mut self);
    fn configure(&mut self, settings: &UnitSettings);
    fn power_on(&mut self);
    /// Wait for the converter to stabilize after power on
    fn settle(&mut self);

    fn reset_calibration(&mut self);
    fn calibration_reset_pending(&self) -> bool;
    fn start_calibration(&mut self);
    fn calibrating(&self) -> bool;

    /// Start a regular scan, only ever called on the master
    fn start_regular(&mut self);

    /// Raw `SQR3` register, for diagnostics
    fn sequence_register(&self) -> u32;
    /// Raw `(CR1, CR2)` registers, for diagnostics
    fn control_registers(&self) -> (u32, u32);
}

/// Two converter units running lock-stepped scans over a [`ChannelAssignment`].
pub struct DualAcquisitionEngine<M, S> {
    master: M,
    slave: S,
    assignment: ChannelAssignment,
}

impl<M: ConverterUnit, S: ConverterUnit> DualAcquisitionEngine<M, S> {
    /// Power down both units and configure them for dual scans.
    ///
    /// The units stay off until [`Self::power_up`].
    pub fn new(
        mut master: M,
        mut slave: S,
        assignment: ChannelAssignment,
        sample_time: SampleTime,
    ) -> Self {
        master.power_off();
        slave.power_off();

        master.configure(&UnitSettings {
            unit: Unit::Master,
            sequence: RegularSequence::encode(assignment.unit_a()),
            sample_time,
        });
        slave.configure(&UnitSettings {
            unit: Unit::Slave,
            sequence: RegularSequence::encode(assignment.unit_b()),
            sample_time,
        });

        Self {
            master,
            slave,
            assignment,
        }
    }

    /// Power on and calibrate the master, then the slave.
    ///
    /// Every wait on the hardware gives up after `poll_limit` polls.
    pub fn power_up(&mut self, poll_limit: u32) -> Result<(), Error> {
        calibrate(&mut self.master, Unit::Master, poll_limit)?;
        calibrate(&mut self.slave, Unit::Slave, poll_limit)?;
        Ok(())
    }

    /// Start a single scan over all assigned channels
    pub fn start(&mut self) {
        self.master.start_regular();
    }

    pub fn assignment(&self) -> &ChannelAssignment {
        &self.assignment
    }

    pub fn master(&self) -> &M {
        &self.master
    }

    pub fn slave(&self) -> &S {
        &self.slave
    }
}

fn calibrate(unit: &mut impl ConverterUnit, which: Unit, poll_limit: u32) -> Result<(), Error> {
    unit.power_on();
    unit.settle();

    unit.reset_calibration();
    wait_until(poll_limit, || !unit.calibration_reset_pending())
        .ok_or(Error::CalibrationTimeout(which))?;

    unit.start_calibration();
    wait_until(poll_limit, || !unit.calibrating()).ok_or(Error::CalibrationTimeout(which))
}

fn wait_until(poll_limit: u32, mut done: impl FnMut() -> bool) -> Option<()> {
    (0..poll_limit).any(|_| done()).then_some(())
}
