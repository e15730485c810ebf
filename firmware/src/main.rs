#![no_main]
#![no_std]

use defmt_rtt as _;
use panic_probe as _;
use rtic::app;
use rtic_sync::{
    channel::{Receiver, Sender},
    make_channel,
};
use static_cell::StaticCell;
use stm32f1xx_hal::prelude::*;

use dualscan_core::{
    config::{
        PipelineConfig, CALIBRATION_POLL_LIMIT, INBOUND_CAPACITY, OUTBOUND_CAPACITY, SAMPLE_PAIRS,
    },
    diagnostics,
    handler::AcquisitionCompletionHandler,
    ring_buffer::RingBuffer,
    sample::SampleBuffer,
    serial::{SerialLink, TransmitControl},
    transfer::{BulkTransferChannel, ScanHandoff},
    trigger::{TickSource, TriggerLoop},
    DualAcquisitionEngine,
};
use dualscan_firmware::{
    adc::{self, Adc1, Adc2},
    dma::Dma1Channel1,
    serial::{TxEnable, Usart1},
    timer::Tim2Ticks,
};

type Engine = DualAcquisitionEngine<Adc1, Adc2>;
type Handler =
    AcquisitionCompletionHandler<'static, Dma1Channel1, TxEnable, SAMPLE_PAIRS, OUTBOUND_CAPACITY>;
type Link = SerialLink<'static, OUTBOUND_CAPACITY, INBOUND_CAPACITY>;

const TICK_QUEUE: usize = 4;
/// End-of-scan interrupts between two reports of dropped output
const DROP_REPORT_INTERVAL: u32 = 100;

#[app(device = stm32f1xx_hal::pac, dispatchers = [EXTI0])]
mod app {
    use super::*;

    static OUTBOUND: StaticCell<RingBuffer<OUTBOUND_CAPACITY>> = StaticCell::new();
    static INBOUND: StaticCell<RingBuffer<INBOUND_CAPACITY>> = StaticCell::new();
    static SAMPLES: StaticCell<SampleBuffer<SAMPLE_PAIRS>> = StaticCell::new();
    static HANDOFF: ScanHandoff = ScanHandoff::new();

    #[shared]
    struct Shared {}

    #[local]
    struct Local {
        ticks: Tim2Ticks,
        tick_sender: Sender<'static, (), TICK_QUEUE>,
        handler: Handler,
        link: Link,
        usart: Usart1,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local) {
        let dp = cx.device;

        let config = PipelineConfig::DEFAULT;
        let assignment = config
            .validate()
            .unwrap_or_else(|e| defmt::panic!("Invalid configuration: {}", e));

        // Setup clocks
        let mut flash = dp.FLASH.constrain();
        let rcc = dp.RCC.constrain();
        let clocks = rcc
            .cfgr
            .use_hse(8.MHz())
            .sysclk(72.MHz())
            .pclk1(36.MHz())
            .pclk2(72.MHz())
            .adcclk(config.adc_clock)
            .freeze(&mut flash.acr);
        defmt::info!(
            "Clocks: sysclk {} Hz, pclk2 {} Hz, adcclk {} Hz",
            clocks.sysclk().to_Hz(),
            clocks.pclk2().to_Hz(),
            clocks.adcclk().to_Hz()
        );
        // The trigger period is checked against these
        defmt::assert_eq!(clocks.adcclk(), config.adc_clock);
        defmt::assert_eq!(clocks.pclk1_tim(), config.timer.clock);

        // Setup GPIO
        let mut gpioa = dp.GPIOA.split();
        {
            let crl = &mut gpioa.crl;
            let _analog_in = (
                gpioa.pa0.into_analog(crl),
                gpioa.pa1.into_analog(crl),
                gpioa.pa2.into_analog(crl),
                gpioa.pa3.into_analog(crl),
                gpioa.pa4.into_analog(crl),
                gpioa.pa5.into_analog(crl),
                gpioa.pa6.into_analog(crl),
                gpioa.pa7.into_analog(crl),
            );
        }
        let _usart_tx = gpioa.pa9.into_alternate_push_pull(&mut gpioa.crh);
        let _usart_rx = gpioa.pa10.into_floating_input(&mut gpioa.crh);

        // Setup converters
        let mut engine: Engine = DualAcquisitionEngine::new(
            Adc1::new(dp.ADC1),
            Adc2::new(dp.ADC2),
            assignment,
            config.sample_time,
        );
        engine
            .power_up(CALIBRATION_POLL_LIMIT)
            .unwrap_or_else(|e| defmt::panic!("Failed to power up converters: {}", e));
        defmt::info!("Converters calibrated");

        // Setup serial port and its buffers
        let usart = Usart1::new(dp.USART1, clocks.pclk2(), config.baud_rate);
        let (mut tx_producer, tx_consumer) = OUTBOUND.init(RingBuffer::new()).split();
        let (rx_producer, _rx_consumer) = INBOUND.init(RingBuffer::new()).split();

        let written = diagnostics::write_startup(&mut tx_producer, &engine);
        defmt::info!(
            "Startup dump: {} bytes queued, {} dropped",
            written,
            tx_producer.dropped()
        );

        // Setup the transfer, armed before the first trigger
        let transfer = BulkTransferChannel::new(
            Dma1Channel1::new(dp.DMA1),
            engine.master().data_register(),
            SAMPLES.init([0; SAMPLE_PAIRS]),
            &HANDOFF,
        );
        let handler = AcquisitionCompletionHandler::new(
            transfer,
            tx_producer,
            usart.transmit_control(),
        );
        let link = SerialLink::new(tx_consumer, rx_producer);
        usart.transmit_control().enable_tx_interrupt();

        // Setup trigger
        let mut ticks = Tim2Ticks::new(dp.TIM2, &config.timer);
        let (tick_sender, tick_receiver) = make_channel!((), TICK_QUEUE);
        let trigger = TriggerLoop::new(config.ticks_per_scan, &HANDOFF);

        trigger_scans::spawn(engine, trigger, tick_receiver)
            .unwrap_or_else(|_| defmt::panic!("Failed to start trigger_scans"));
        ticks.start();

        defmt::info!(
            "Scanning {} channel pairs every {} us",
            SAMPLE_PAIRS,
            config.trigger_period().ticks()
        );

        (
            Shared {},
            Local {
                ticks,
                tick_sender,
                handler,
                link,
                usart,
            },
        )
    }

    /// Start a scan every `ticks_per_scan` timer ticks
    #[task(priority = 1)]
    async fn trigger_scans(
        _cx: trigger_scans::Context,
        mut engine: Engine,
        mut trigger: TriggerLoop<'static>,
        mut ticks: Receiver<'static, (), TICK_QUEUE>,
    ) {
        loop {
            if ticks.recv().await.is_err() {
                defmt::error!("Tick channel closed");
                return;
            }

            match trigger.tick(&mut engine) {
                Some(Ok(generation)) => defmt::trace!("Scan {} started", generation),
                Some(Err(fault)) => defmt::warn!("Scan not started: {}", fault),
                None => {}
            }
        }
    }

    #[task(binds = TIM2, local = [ticks, tick_sender], priority = 1)]
    fn on_tim2(cx: on_tim2::Context) {
        if cx.local.ticks.take_tick() && cx.local.tick_sender.try_send(()).is_err() {
            defmt::warn!("Trigger lagging, tick dropped");
        }
    }

    /// End of a dual scan, the DMA has moved all result pairs
    #[task(binds = ADC1_2, local = [handler], priority = 2)]
    fn on_end_of_scan(cx: on_end_of_scan::Context) {
        adc::clear_end_of_scan();

        let handler = cx.local.handler;
        if let Err(fault) = handler.on_end_of_scan() {
            defmt::warn!("Scan dropped: {}", fault);
        }

        if handler.dropped() > 0 && handler.scans() % DROP_REPORT_INTERVAL == 0 {
            defmt::warn!(
                "{} bytes dropped after {} lines",
                handler.dropped(),
                handler.lines()
            );
        }
    }

    #[task(binds = USART1, local = [link, usart], priority = 2)]
    fn on_usart1(cx: on_usart1::Context) {
        cx.local.link.on_interrupt(cx.local.usart);
    }
}
