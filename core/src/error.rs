use core::fmt;

use crate::engine::Unit;
use crate::transfer::TransferState;

/// Rejected pipeline configuration, raised once during initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Both units need the same number of channels
    OddChannelCount(usize),
    ChannelCountOutOfRange { requested: usize, max: usize },
    /// The highest assigned channel does not exist on the converter
    ChannelOutOfRange { channel: usize, max: u8 },
    /// The trigger fires before one scan can be converted and its line drained
    TriggerTooFast { period_us: u64, cycle_us: u64 },
    /// A single formatted scan line does not fit in the outbound buffer
    LineExceedsBuffer { line: usize, capacity: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConfigError::OddChannelCount(n) => {
                write!(f, "channel count {n} can not be split over two units")
            }
            ConfigError::ChannelCountOutOfRange { requested, max } => {
                write!(f, "channel count {requested} outside of 2..={max}")
            }
            ConfigError::ChannelOutOfRange { channel, max } => {
                write!(f, "channel {channel} does not exist, highest is {max}")
            }
            ConfigError::TriggerTooFast {
                period_us,
                cycle_us,
            } => write!(
                f,
                "trigger period of {period_us}us is shorter than a scan cycle of {cycle_us}us"
            ),
            ConfigError::LineExceedsBuffer { line, capacity } => write!(
                f,
                "scan line of up to {line} bytes does not fit in {capacity} bytes of buffer"
            ),
        }
    }
}

/// Failure while bringing up the converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Config(ConfigError),
    /// The unit never reported the end of its calibration
    CalibrationTimeout(Unit),
}

impl From<ConfigError> for Error {
    fn from(value: ConfigError) -> Self {
        Error::Config(value)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "invalid configuration: {e}"),
            Error::CalibrationTimeout(unit) => write!(f, "calibration of {unit:?} timed out"),
        }
    }
}

/// A scan that was skipped or could not be read back.
///
/// These never stop the pipeline: the transfer is rearmed and the next trigger
/// starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferFault {
    /// A start was requested while the transfer channel was not armed
    Missed(TransferState),
    /// End of scan arrived without a transfer in flight
    Unexpected(TransferState),
    /// End of scan arrived while words were still outstanding
    Incomplete { remaining: u16 },
}

impl fmt::Display for TransferFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferFault::Missed(state) => write!(f, "scan skipped, transfer was {state:?}"),
            TransferFault::Unexpected(state) => {
                write!(f, "end of scan while transfer was {state:?}")
            }
            TransferFault::Incomplete { remaining } => {
                write!(f, "end of scan with {remaining} words outstanding")
            }
        }
    }
}
