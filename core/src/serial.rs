use crate::ring_buffer::{Consumer, Producer};

/// The register interface of an interrupt driven serial port.
pub trait SerialPort: TransmitControl {
    /// A received byte is waiting
    fn rx_ready(&self) -> bool;
    /// The transmit data register can take a byte
    fn tx_ready(&self) -> bool;
    fn read(&mut self) -> u8;
    fn write(&mut self, byte: u8);

    fn tx_interrupt_enabled(&self) -> bool;
    fn disable_tx_interrupt(&mut self);
}

/// Lets another interrupt context wake up the transmitter.
pub trait TransmitControl {
    fn enable_tx_interrupt(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmitterState {
    /// The ready interrupt is off until someone queues more data
    Disabled,
    Enabled,
}

/// Drains the outbound buffer one byte per transmitter-ready event.
pub struct SerialTransmitter<'a, const N: usize> {
    outbound: Consumer<'a, N>,
    sent: u32,
}

impl<'a, const N: usize> SerialTransmitter<'a, N> {
    pub fn new(outbound: Consumer<'a, N>) -> Self {
        Self { outbound, sent: 0 }
    }

    /// Send the next queued byte, or switch the ready interrupt off when there is none.
    pub fn on_ready(&mut self, port: &mut impl SerialPort) -> TransmitterState {
        match self.outbound.pop() {
            Some(byte) => {
                port.write(byte);
                self.sent = self.sent.wrapping_add(1);
                TransmitterState::Enabled
            }
            None => {
                port.disable_tx_interrupt();
                // A producer that preempted us between the pop and the disable has
                // enabled the interrupt for a byte that is now queued
                if self.outbound.is_empty() {
                    TransmitterState::Disabled
                } else {
                    port.enable_tx_interrupt();
                    TransmitterState::Enabled
                }
            }
        }
    }

    /// Bytes sent so far
    pub fn sent(&self) -> u32 {
        self.sent
    }

    /// Bytes queued but not sent yet
    pub fn pending(&self) -> usize {
        self.outbound.len()
    }
}

/// Captures inbound bytes, dropping them when nobody reads the buffer.
pub struct SerialReceiver<'a, const N: usize> {
    inbound: Producer<'a, N>,
}

impl<'a, const N: usize> SerialReceiver<'a, N> {
    pub fn new(inbound: Producer<'a, N>) -> Self {
        Self { inbound }
    }

    /// Returns `false` when the byte was dropped
    pub fn on_received(&mut self, byte: u8) -> bool {
        self.inbound.push(byte)
    }

    pub fn dropped(&self) -> usize {
        self.inbound.dropped()
    }
}

/// Both directions of the serial interrupt.
pub struct SerialLink<'a, const TX: usize, const RX: usize> {
    pub transmitter: SerialTransmitter<'a, TX>,
    pub receiver: SerialReceiver<'a, RX>,
}

impl<'a, const TX: usize, const RX: usize> SerialLink<'a, TX, RX> {
    pub fn new(outbound: Consumer<'a, TX>, inbound: Producer<'a, RX>) -> Self {
        Self {
            transmitter: SerialTransmitter::new(outbound),
            receiver: SerialReceiver::new(inbound),
        }
    }

    /// Handle whatever caused the serial interrupt.
    ///
    /// Returns the transmitter state, or `None` when the transmitter was not involved.
    pub fn on_interrupt(&mut self, port: &mut impl SerialPort) -> Option<TransmitterState> {
        if port.rx_ready() {
            let byte = port.read();
            self.receiver.on_received(byte);
        }

        // The ready flag is also set while the interrupt is off
        (port.tx_interrupt_enabled() && port.tx_ready()).then(|| self.transmitter.on_ready(port))
    }
}
