use core::marker::PhantomData;
use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::error::TransferFault;
use crate::sample::{ConversionSample, SampleBuffer};

/// Life cycle of the single-shot transfer into the sample buffer.
///
/// ```text
/// Idle -> Armed -> Transferring -> Complete -> (arm) -> Armed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TransferState {
    Idle = 0,
    /// Configured and enabled, waiting for the converter to start
    Armed = 1,
    /// A scan has been started, the buffer belongs to the DMA
    Transferring = 2,
    /// The scan finished, the buffer belongs to the completion handler
    Complete = 3,
}

impl TransferState {
    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => TransferState::Armed,
            2 => TransferState::Transferring,
            3 => TransferState::Complete,
            _ => TransferState::Idle,
        }
    }
}

/// Ownership handoff of the sample buffer between the trigger and the completion
/// interrupt.
///
/// The trigger may only start a scan while the transfer is armed and the completion
/// handler may only read the buffer after a scan it started has finished. Violations
/// are reported instead of silently corrupting a scan.
pub struct ScanHandoff {
    state: AtomicU8,
    started: AtomicU32,
    completed: AtomicU32,
    missed: AtomicU32,
}

impl Default for ScanHandoff {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanHandoff {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(TransferState::Idle as u8),
            started: AtomicU32::new(0),
            completed: AtomicU32::new(0),
            missed: AtomicU32::new(0),
        }
    }

    pub fn state(&self) -> TransferState {
        TransferState::from_bits(self.state.load(Ordering::Acquire))
    }

    /// Claim the armed transfer for a new scan, returns the scan's generation.
    pub fn begin_scan(&self) -> Result<u32, TransferFault> {
        self.transition(TransferState::Armed, TransferState::Transferring)
            .map_err(|state| {
                self.missed.fetch_add(1, Ordering::Relaxed);
                TransferFault::Missed(state)
            })?;
        Ok(self.started.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
    }

    /// Hand the buffer of the running scan to the reader, returns its generation.
    fn finish_scan(&self) -> Result<u32, TransferFault> {
        self.transition(TransferState::Transferring, TransferState::Complete)
            .map_err(TransferFault::Unexpected)?;
        let generation = self.started.load(Ordering::Acquire);
        self.completed.store(generation, Ordering::Release);
        Ok(generation)
    }

    pub(crate) fn mark_armed(&self) {
        self.state.store(TransferState::Armed as u8, Ordering::Release);
    }

    fn transition(&self, from: TransferState, to: TransferState) -> Result<(), TransferState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(TransferState::from_bits)
    }

    /// Number of scans started so far
    pub fn started(&self) -> u32 {
        self.started.load(Ordering::Relaxed)
    }

    /// Generation of the last scan that was read back
    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::Relaxed)
    }

    /// Number of starts refused because the transfer was not armed
    pub fn missed(&self) -> u32 {
        self.missed.load(Ordering::Relaxed)
    }
}

/// Register level settings of a one-shot, low priority peripheral-to-memory transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    pub source: *const u32,
    pub destination: *mut u32,
    /// Number of 32-bit words
    pub count: u16,
    pub increment_source: bool,
    pub increment_destination: bool,
}

/// A DMA channel that can copy words from a peripheral register into memory.
pub trait TransferEngine {
    /// Disable the channel and clear its configuration and flags
    fn reset(&mut self);
    fn configure(&mut self, config: &TransferConfig);
    fn enable(&mut self);
    /// Words still to be transferred
    fn remaining(&self) -> u16;
}

/// One-shot transfer of a full scan from the converter into the sample buffer.
///
/// After every scan the channel stops and has to be armed again before the next scan
/// can be captured.
pub struct BulkTransferChannel<'a, D, const N: usize> {
    engine: D,
    source: *const u32,
    destination: *mut u32,
    handoff: &'a ScanHandoff,
    _buffer: PhantomData<&'a mut SampleBuffer<N>>,
}

// The raw pointers are only dereferenced while the handoff grants the buffer to us.
unsafe impl<D: Send, const N: usize> Send for BulkTransferChannel<'_, D, N> {}

impl<'a, D: TransferEngine, const N: usize> BulkTransferChannel<'a, D, N> {
    /// `source` is the data register of the master converter.
    pub fn new(
        engine: D,
        source: *const u32,
        buffer: &'a mut SampleBuffer<N>,
        handoff: &'a ScanHandoff,
    ) -> Self {
        assert!(N > 0 && N <= u16::MAX as usize);
        Self {
            engine,
            source,
            destination: buffer.as_mut_ptr(),
            handoff,
            _buffer: PhantomData,
        }
    }

    pub fn config(&self) -> TransferConfig {
        TransferConfig {
            source: self.source,
            destination: self.destination,
            count: N as u16,
            increment_source: false,
            increment_destination: true,
        }
    }

    /// Reset, reconfigure and enable the channel for the next scan.
    pub fn arm(&mut self) {
        self.engine.reset();
        self.engine.configure(&self.config());
        self.engine.enable();
        self.handoff.mark_armed();
    }

    /// Take the samples of the scan that just ended.
    ///
    /// Must be called from the end-of-scan interrupt, and [`Self::arm`] must follow
    /// before the next scan can be captured.
    pub fn finish(&mut self) -> Result<[ConversionSample; N], TransferFault> {
        self.handoff.finish_scan()?;

        let remaining = self.engine.remaining();
        if remaining != 0 {
            return Err(TransferFault::Incomplete { remaining });
        }

        // The DMA wrote the buffer behind the compiler's back, and is done with it now
        Ok(core::array::from_fn(|i| {
            ConversionSample(unsafe { self.destination.add(i).read_volatile() })
        }))
    }

    pub fn state(&self) -> TransferState {
        self.handoff.state()
    }

    pub fn handoff(&self) -> &'a ScanHandoff {
        self.handoff
    }
}
