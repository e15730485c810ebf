#![cfg_attr(not(test), no_std)]

//! Hardware independent part of the dual converter scan pipeline.
//!
//! A timer paces scans of two lock-stepped converters, one DMA transfer per scan
//! moves the paired results into memory and the end-of-scan interrupt turns them
//! into a line of text for the serial port.

pub mod channels;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod format;
pub mod handler;
pub mod ring_buffer;
pub mod sample;
pub mod serial;
pub mod transfer;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use channels::ChannelAssignment;
pub use config::PipelineConfig;
pub use engine::{ConverterUnit, DualAcquisitionEngine, SampleTime, Unit};
pub use error::{ConfigError, Error, TransferFault};
pub use handler::AcquisitionCompletionHandler;
pub use ring_buffer::RingBuffer;
pub use sample::ConversionSample;
pub use serial::{SerialLink, SerialPort, TransmitControl};
pub use transfer::{BulkTransferChannel, ScanHandoff, TransferEngine, TransferState};
pub use trigger::{TickSource, TriggerLoop};
