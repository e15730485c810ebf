use crate::engine::{ConverterUnit, DualAcquisitionEngine};
use crate::error::TransferFault;
use crate::transfer::ScanHandoff;

/// A periodic timer event that has to be acknowledged.
pub trait TickSource {
    /// Returns `true` and clears the event flag if a tick happened since the last call
    fn take_tick(&mut self) -> bool;
}

/// Something that can start a scan.
pub trait ScanStart {
    fn start(&mut self);
}

impl<M: ConverterUnit, S: ConverterUnit> ScanStart for DualAcquisitionEngine<M, S> {
    fn start(&mut self) {
        DualAcquisitionEngine::start(self)
    }
}

/// Starts a scan on every `ticks_per_scan`-th timer tick.
pub struct TriggerLoop<'a> {
    ticks_per_scan: u32,
    elapsed: u32,
    handoff: &'a ScanHandoff,
}

impl<'a> TriggerLoop<'a> {
    pub fn new(ticks_per_scan: u32, handoff: &'a ScanHandoff) -> Self {
        Self {
            ticks_per_scan: ticks_per_scan.max(1),
            elapsed: 0,
            handoff,
        }
    }

    /// Count a tick, returns `true` when a scan is due.
    pub fn on_tick(&mut self) -> bool {
        self.elapsed += 1;
        if self.elapsed >= self.ticks_per_scan {
            self.elapsed = 0;
            true
        } else {
            false
        }
    }

    /// Start a scan if the transfer is armed for it.
    ///
    /// Returns the generation of the started scan.
    pub fn fire(&mut self, scanner: &mut impl ScanStart) -> Result<u32, TransferFault> {
        let generation = self.handoff.begin_scan()?;
        scanner.start();
        Ok(generation)
    }

    /// Count a tick and fire when due.
    pub fn tick(&mut self, scanner: &mut impl ScanStart) -> Option<Result<u32, TransferFault>> {
        self.on_tick().then(|| self.fire(scanner))
    }

    /// Spin on `ticks` until the next scan is due, then fire.
    pub fn wait(
        &mut self,
        ticks: &mut impl TickSource,
        scanner: &mut impl ScanStart,
    ) -> Result<u32, TransferFault> {
        loop {
            if ticks.take_tick() && self.on_tick() {
                return self.fire(scanner);
            }
        }
    }

    pub fn ticks_per_scan(&self) -> u32 {
        self.ticks_per_scan
    }
}
