use dualscan_core::transfer::{TransferConfig, TransferEngine};
use stm32f1xx_hal::{
    pac,
    rcc::{Enable, Reset},
};

/// `DMA1` channel 1, the only channel wired to the `ADC1` request.
pub struct Dma1Channel1 {
    dma1: pac::DMA1,
}

impl Dma1Channel1 {
    pub fn new(dma1: pac::DMA1) -> Self {
        unsafe {
            let rcc = &*pac::RCC::ptr();
            pac::DMA1::enable(rcc);
            pac::DMA1::reset(rcc);
        }
        Self { dma1 }
    }
}

impl TransferEngine for Dma1Channel1 {
    fn reset(&mut self) {
        let ch1 = &self.dma1.ch1;
        // Disable before touching anything else
        ch1.cr.modify(|_, w| w.en().clear_bit());
        ch1.cr.reset();
        // Clear all channel 1 flags
        self.dma1.ifcr.write(|w| w.cgif1().set_bit());
    }

    fn configure(&mut self, config: &TransferConfig) {
        let ch1 = &self.dma1.ch1;

        ch1.par
            .write(|w| unsafe { w.pa().bits(config.source as u32) });
        ch1.mar
            .write(|w| unsafe { w.ma().bits(config.destination as u32) });
        ch1.ndtr.write(|w| unsafe { w.ndt().bits(config.count) });

        ch1.cr.modify(|_, w| {
            // Read from peripheral, stop after `count` words
            w.dir()
                .clear_bit()
                .circ()
                .clear_bit()
                .pinc()
                .bit(config.increment_source)
                .minc()
                .bit(config.increment_destination)
                // Both results of a dual conversion in one word
                .psize()
                .bits32()
                .msize()
                .bits32()
                // Nothing else competes for the controller
                .pl()
                .low()
        });
    }

    fn enable(&mut self) {
        self.dma1.ch1.cr.modify(|_, w| w.en().set_bit());
    }

    fn remaining(&self) -> u16 {
        self.dma1.ch1.ndtr.read().ndt().bits()
    }
}
