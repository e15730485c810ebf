use dualscan_core::serial::{SerialPort, TransmitControl};
use fugit::HertzU32;
use stm32f1xx_hal::{
    pac,
    rcc::{Enable, Reset},
};

/// `USART1` at 8N1, driven one byte per interrupt.
pub struct Usart1 {
    regs: pac::USART1,
}

impl Usart1 {
    /// Expects `PA9` and `PA10` to be set up as TX and RX already.
    pub fn new(regs: pac::USART1, pclk2: HertzU32, baud_rate: u32) -> Self {
        unsafe {
            let rcc = &*pac::RCC::ptr();
            pac::USART1::enable(rcc);
            pac::USART1::reset(rcc);
        }

        // 16x oversampling, the divider register holds mantissa and fraction as one number
        let divider = (pclk2.to_Hz() + baud_rate / 2) / baud_rate;
        regs.brr.write(|w| unsafe { w.bits(divider) });

        // 8 data bits, no parity, one stop bit are the reset values
        regs.cr1.modify(|_, w| {
            w.ue()
                .set_bit()
                .te()
                .set_bit()
                .re()
                .set_bit()
                // Receive interrupt always on, transmit only while there is data
                .rxneie()
                .set_bit()
                .txeie()
                .clear_bit()
        });

        Self { regs }
    }

    /// Handle for other contexts to start the transmitter
    pub fn transmit_control(&self) -> TxEnable {
        TxEnable { _private: () }
    }
}

impl SerialPort for Usart1 {
    fn rx_ready(&self) -> bool {
        self.regs.sr.read().rxne().bit_is_set()
    }

    fn tx_ready(&self) -> bool {
        self.regs.sr.read().txe().bit_is_set()
    }

    fn read(&mut self) -> u8 {
        self.regs.dr.read().dr().bits() as u8
    }

    fn write(&mut self, byte: u8) {
        self.regs.dr.write(|w| unsafe { w.dr().bits(byte.into()) });
    }

    fn tx_interrupt_enabled(&self) -> bool {
        self.regs.cr1.read().txeie().bit_is_set()
    }

    fn disable_tx_interrupt(&mut self) {
        critical_section::with(|_| self.regs.cr1.modify(|_, w| w.txeie().clear_bit()));
    }
}

impl TransmitControl for Usart1 {
    fn enable_tx_interrupt(&mut self) {
        critical_section::with(|_| self.regs.cr1.modify(|_, w| w.txeie().set_bit()));
    }
}

/// Turns on the transmit-empty interrupt of `USART1`.
pub struct TxEnable {
    _private: (),
}

impl TransmitControl for TxEnable {
    fn enable_tx_interrupt(&mut self) {
        // Shares CR1 with the serial interrupt, so modify it atomically
        let usart1 = unsafe { &*pac::USART1::ptr() };
        critical_section::with(|_| usart1.cr1.modify(|_, w| w.txeie().set_bit()));
    }
}
