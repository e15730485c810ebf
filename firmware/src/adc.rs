use dualscan_core::config::SETTLE_CYCLES;
use dualscan_core::engine::{ConverterUnit, Unit, UnitSettings};
use stm32f1xx_hal::{
    pac,
    rcc::{Enable, Reset},
};

/// `EXTSEL` value that selects the `SWSTART` bit as the regular trigger
const EXTSEL_SWSTART: u32 = 0b111;
/// `DUALMOD` value for regular simultaneous mode only
const DUALMOD_REGULAR_SIMULTANEOUS: u32 = 0b0110;

/// Configuration, power and calibration steps that look the same on both units.
///
/// `ADC1` and `ADC2` have separate register block types, hence the macro.
macro_rules! common_unit_steps {
    () => {
        fn power_off(&mut self) {
            self.regs.cr2.modify(|_, w| w.adon().clear_bit());
        }

        fn power_on(&mut self) {
            self.regs.cr2.modify(|_, w| w.adon().set_bit());
        }

        fn settle(&mut self) {
            cortex_m::asm::delay(SETTLE_CYCLES);
        }

        fn reset_calibration(&mut self) {
            self.regs.cr2.modify(|_, w| w.rstcal().set_bit());
        }

        fn calibration_reset_pending(&self) -> bool {
            self.regs.cr2.read().rstcal().bit_is_set()
        }

        fn start_calibration(&mut self) {
            self.regs.cr2.modify(|_, w| w.cal().set_bit());
        }

        fn calibrating(&self) -> bool {
            self.regs.cr2.read().cal().bit_is_set()
        }

        fn sequence_register(&self) -> u32 {
            self.regs.sqr3.read().bits()
        }

        fn control_registers(&self) -> (u32, u32) {
            (self.regs.cr1.read().bits(), self.regs.cr2.read().bits())
        }
    };
}

/// Writes the sequence and sample time registers and sets up single scans started
/// by software.
macro_rules! configure_scan {
    ($regs:expr, $settings:expr) => {{
        let regs = $regs;
        let settings: &UnitSettings = $settings;

        // Scan all channels of the sequence
        regs.cr1.modify(|_, w| w.scan().set_bit().discen().clear_bit());

        regs.cr2.modify(|_, w| unsafe {
            // Stop after one scan
            w.cont()
                .clear_bit()
                // Results in the low bits
                .align()
                .clear_bit()
                // Started by writing SWSTART
                .extsel()
                .bits(EXTSEL_SWSTART as u8)
                .exttrig()
                .set_bit()
        });

        let (smpr1, smpr2) = settings.sample_time.sample_time_registers();
        regs.smpr1.write(|w| unsafe { w.bits(smpr1) });
        regs.smpr2.write(|w| unsafe { w.bits(smpr2) });

        let sequence = settings.sequence;
        regs.sqr1.write(|w| unsafe { w.bits(sequence.sqr1) });
        regs.sqr2.write(|w| unsafe { w.bits(sequence.sqr2) });
        regs.sqr3.write(|w| unsafe { w.bits(sequence.sqr3) });
    }};
}

/// `ADC1`, the master of the dual scan.
pub struct Adc1 {
    regs: pac::ADC1,
}

impl Adc1 {
    pub fn new(regs: pac::ADC1) -> Self {
        unsafe {
            let rcc = &*pac::RCC::ptr();
            pac::ADC1::enable(rcc);
            pac::ADC1::reset(rcc);
        }
        Self { regs }
    }

    /// Address of the data register, holds both results in dual mode
    pub fn data_register(&self) -> *const u32 {
        self.regs.dr.as_ptr() as *const u32
    }
}

impl ConverterUnit for Adc1 {
    common_unit_steps!();

    fn configure(&mut self, settings: &UnitSettings) {
        defmt::debug_assert_eq!(settings.unit, Unit::Master);
        configure_scan!(&self.regs, settings);

        self.regs.cr1.modify(|_, w| unsafe {
            // Slave follows every regular conversion
            w.dualmod()
                .bits(DUALMOD_REGULAR_SIMULTANEOUS as u8)
                // Interrupt once the whole sequence is done
                .eocie()
                .set_bit()
        });

        // Hand every result pair to the DMA
        self.regs.cr2.modify(|_, w| w.dma().set_bit());
    }

    fn start_regular(&mut self) {
        self.regs.cr2.modify(|_, w| w.swstart().set_bit());
    }
}

/// `ADC2`, converting in lock step with [`Adc1`].
pub struct Adc2 {
    regs: pac::ADC2,
}

impl Adc2 {
    pub fn new(regs: pac::ADC2) -> Self {
        unsafe {
            let rcc = &*pac::RCC::ptr();
            pac::ADC2::enable(rcc);
            pac::ADC2::reset(rcc);
        }
        Self { regs }
    }
}

impl ConverterUnit for Adc2 {
    common_unit_steps!();

    fn configure(&mut self, settings: &UnitSettings) {
        defmt::debug_assert_eq!(settings.unit, Unit::Slave);
        configure_scan!(&self.regs, settings);
    }

    fn start_regular(&mut self) {
        // Started by the master
    }
}

/// Acknowledge the end-of-scan flag of the master.
pub fn clear_end_of_scan() {
    // Only the end-of-scan interrupt touches the status register after init
    let adc1 = unsafe { &*pac::ADC1::ptr() };
    adc1.sr.modify(|_, w| w.eoc().clear_bit());
}
