use dualscan_core::config::TriggerTimer;
use dualscan_core::trigger::TickSource;
use stm32f1xx_hal::{
    pac,
    rcc::{Enable, Reset},
};

/// `OC1M` value that toggles the output on every compare match
const OC1M_TOGGLE: u8 = 0b011;

/// `TIM2` free running, with a compare event on channel 1 once per period.
pub struct Tim2Ticks {
    tim2: pac::TIM2,
}

impl Tim2Ticks {
    pub fn new(tim2: pac::TIM2, timer: &TriggerTimer) -> Self {
        unsafe {
            let rcc = &*pac::RCC::ptr();
            pac::TIM2::enable(rcc);
            pac::TIM2::reset(rcc);
        }

        // Upcounting, edge aligned, no clock division are the reset values
        tim2.psc.write(|w| w.psc().bits(timer.prescaler));
        tim2.arr.write(|w| w.arr().bits(timer.period));

        // Toggle OC1 on compare, without preload so the value applies right away
        tim2.ccmr1_output()
            .modify(|_, w| unsafe { w.oc1m().bits(OC1M_TOGGLE).oc1pe().clear_bit() });
        tim2.ccr1.write(|w| w.ccr().bits(timer.compare));
        tim2.ccer.modify(|_, w| w.cc1e().set_bit());

        // Interrupt on every compare event
        tim2.dier.modify(|_, w| w.cc1ie().set_bit());

        Self { tim2 }
    }

    /// Start counting
    pub fn start(&mut self) {
        self.tim2.cr1.modify(|_, w| w.cen().set_bit());
    }
}

impl TickSource for Tim2Ticks {
    fn take_tick(&mut self) -> bool {
        let tick = self.tim2.sr.read().cc1if().bit_is_set();
        if tick {
            // Write zero to clear, ones leave the other flags alone
            self.tim2.sr.write(|w| unsafe { w.bits(0xffff) }.cc1if().clear_bit());
        }
        tick
    }
}
