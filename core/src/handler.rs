use crate::error::TransferFault;
use crate::format::write_scan_line;
use crate::ring_buffer::Producer;
use crate::serial::TransmitControl;
use crate::transfer::{BulkTransferChannel, TransferEngine};

/// Runs in the end-of-scan interrupt: turns a finished scan into a line of text and
/// gets the transfer ready for the next one.
pub struct AcquisitionCompletionHandler<'a, D, T, const N: usize, const C: usize> {
    transfer: BulkTransferChannel<'a, D, N>,
    outbound: Producer<'a, C>,
    transmit: T,
    scans: u32,
    lines: u32,
}

impl<'a, D, T, const N: usize, const C: usize> AcquisitionCompletionHandler<'a, D, T, N, C>
where
    D: TransferEngine,
    T: TransmitControl,
{
    /// Arms the transfer, so the first scan can be started right away.
    pub fn new(
        mut transfer: BulkTransferChannel<'a, D, N>,
        outbound: Producer<'a, C>,
        transmit: T,
    ) -> Self {
        transfer.arm();
        Self {
            transfer,
            outbound,
            transmit,
            scans: 0,
            lines: 0,
        }
    }

    /// Queue the scan that just ended, rearm and kick the transmitter.
    ///
    /// Returns the number of bytes that made it into the outbound buffer. A faulty scan
    /// produces no output, but the transfer is rearmed all the same.
    pub fn on_end_of_scan(&mut self) -> Result<usize, TransferFault> {
        self.scans = self.scans.wrapping_add(1);

        let queued = self
            .transfer
            .finish()
            .map(|samples| write_scan_line(&mut self.outbound, &samples));

        self.transfer.arm();
        self.transmit.enable_tx_interrupt();

        if queued.is_ok() {
            self.lines = self.lines.wrapping_add(1);
        }
        queued
    }

    /// End-of-scan events handled so far, faulty ones included
    pub fn scans(&self) -> u32 {
        self.scans
    }

    /// Lines queued so far
    pub fn lines(&self) -> u32 {
        self.lines
    }

    /// Bytes lost to a full outbound buffer
    pub fn dropped(&self) -> usize {
        self.outbound.dropped()
    }

    pub fn transfer(&self) -> &BulkTransferChannel<'a, D, N> {
        &self.transfer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChannelAssignment;
    use crate::engine::{DualAcquisitionEngine, SampleTime};
    use crate::ring_buffer::RingBuffer;
    use crate::serial::{SerialLink, SerialPort, TransmitterState};
    use crate::testing::{SimAdc, SimDma, SimUsart};
    use crate::transfer::{ScanHandoff, TransferState};
    use crate::trigger::TriggerLoop;

    const SCAN: [u32; 4] = [0x0001_0002, 0x0003_0004, 0x0005_0006, 0x0007_0008];

    fn drain<const TX: usize, const RX: usize>(
        link: &mut SerialLink<'_, TX, RX>,
        usart: &mut SimUsart,
    ) {
        while link.on_interrupt(usart) == Some(TransmitterState::Enabled) {}
    }

    #[test]
    fn scan_to_serial_line() {
        let dma = SimDma::default();
        let master = SimAdc::new(1);
        let mut usart = SimUsart::default();

        let mut samples = [0u32; 4];
        let handoff = ScanHandoff::new();
        let mut outbound = RingBuffer::<128>::new();
        let mut inbound = RingBuffer::<16>::new();
        let (tx_producer, tx_consumer) = outbound.split();
        let (rx_producer, _) = inbound.split();

        let assignment = ChannelAssignment::new(8, 0).unwrap();
        let mut engine = DualAcquisitionEngine::new(
            master.clone(),
            SimAdc::new(1),
            assignment,
            SampleTime::Cycles28_5,
        );
        engine.power_up(10).unwrap();

        let transfer =
            BulkTransferChannel::new(dma.clone(), core::ptr::null(), &mut samples, &handoff);
        let mut handler = AcquisitionCompletionHandler::new(transfer, tx_producer, usart.clone());
        let mut link = SerialLink::new(tx_consumer, rx_producer);
        let mut trigger = TriggerLoop::new(3, &handoff);

        assert_eq!(handler.transfer().state(), TransferState::Armed);

        for scan in 1..=2 {
            assert_eq!(trigger.tick(&mut engine), None);
            assert_eq!(trigger.tick(&mut engine), None);
            assert_eq!(trigger.tick(&mut engine), Some(Ok(scan)));
            assert_eq!(master.scans_started(), scan);

            dma.deliver(&SCAN);
            assert_eq!(handler.on_end_of_scan(), Ok(26));
            assert_eq!(handler.transfer().state(), TransferState::Armed);
            assert!(usart.tx_interrupt_enabled());

            drain(&mut link, &mut usart);
            assert!(!usart.tx_interrupt_enabled());
        }

        assert_eq!(
            usart.sent(),
            b"2 - 1 4 - 3 6 - 5 8 - 7 \r\n2 - 1 4 - 3 6 - 5 8 - 7 \r\n"
        );
        assert_eq!(handler.lines(), 2);
        assert_eq!(handler.scans(), 2);
        assert_eq!(handoff.completed(), 2);
    }

    #[test]
    fn faulty_scan_is_rearmed_without_output() {
        let dma = SimDma::default();
        let usart = SimUsart::default();
        let mut samples = [0u32; 4];
        let handoff = ScanHandoff::new();
        let mut outbound = RingBuffer::<64>::new();
        let (tx_producer, tx_consumer) = outbound.split();

        let transfer =
            BulkTransferChannel::new(dma.clone(), core::ptr::null(), &mut samples, &handoff);
        let mut handler = AcquisitionCompletionHandler::new(transfer, tx_producer, usart.clone());

        // Spurious end of scan, nothing was started
        assert_eq!(
            handler.on_end_of_scan(),
            Err(TransferFault::Unexpected(TransferState::Armed))
        );
        assert!(tx_consumer.is_empty());
        assert_eq!(handler.transfer().state(), TransferState::Armed);

        handoff.begin_scan().unwrap();
        dma.deliver(&SCAN[..3]);
        assert_eq!(
            handler.on_end_of_scan(),
            Err(TransferFault::Incomplete { remaining: 1 })
        );
        assert!(tx_consumer.is_empty());
        assert_eq!(handler.transfer().state(), TransferState::Armed);
        assert_eq!(dma.resets(), 3);
        assert_eq!(handler.lines(), 0);
        assert_eq!(handler.scans(), 2);
    }

    #[test]
    fn slow_drain_drops_newest_bytes() {
        let dma = SimDma::default();
        let mut samples = [0u32; 4];
        let handoff = ScanHandoff::new();
        let mut outbound = RingBuffer::<40>::new();
        let (tx_producer, mut tx_consumer) = outbound.split();

        let transfer =
            BulkTransferChannel::new(dma.clone(), core::ptr::null(), &mut samples, &handoff);
        let mut handler =
            AcquisitionCompletionHandler::new(transfer, tx_producer, SimUsart::default());

        for _ in 0..2 {
            handoff.begin_scan().unwrap();
            dma.deliver(&SCAN);
            handler.on_end_of_scan().unwrap();
        }

        let queued: Vec<u8> = core::iter::from_fn(|| tx_consumer.pop()).collect();
        assert_eq!(queued, b"2 - 1 4 - 3 6 - 5 8 - 7 \r\n2 - 1 4 - 3 6 ");
        assert_eq!(handler.dropped(), 12);
    }
}
