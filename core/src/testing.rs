//! Simulated peripherals for host tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::vec::Vec;

use crate::engine::{ConverterUnit, Unit, UnitSettings};
use crate::serial::{SerialPort, TransmitControl};
use crate::transfer::{ScanHandoff, TransferConfig, TransferEngine};
use crate::trigger::TickSource;

/// Put a handoff into the armed state without a transfer channel
pub fn arm(handoff: &ScanHandoff) {
    handoff.mark_armed();
}

#[derive(Default)]
struct DmaState {
    config: Option<TransferConfig>,
    enabled: bool,
    resets: u32,
    remaining: u16,
}

/// DMA channel that only moves data when the test calls [`SimDma::deliver`].
#[derive(Clone, Default)]
pub struct SimDma(Rc<RefCell<DmaState>>);

impl SimDma {
    pub fn config(&self) -> Option<TransferConfig> {
        self.0.borrow().config
    }

    pub fn enabled(&self) -> bool {
        self.0.borrow().enabled
    }

    pub fn resets(&self) -> u32 {
        self.0.borrow().resets
    }

    /// Copy converter words into the destination like the hardware would
    pub fn deliver(&self, words: &[u32]) {
        let mut state = self.0.borrow_mut();
        assert!(state.enabled, "DMA is not enabled");
        let config = state.config.expect("DMA is not configured");

        let done = (config.count - state.remaining) as usize;
        let n = words.len().min(state.remaining as usize);
        for (i, &word) in words[..n].iter().enumerate() {
            unsafe { config.destination.add(done + i).write_volatile(word) };
        }

        state.remaining -= n as u16;
        if state.remaining == 0 {
            // One shot, the channel stops by itself
            state.enabled = false;
        }
    }
}

impl TransferEngine for SimDma {
    fn reset(&mut self) {
        let mut state = self.0.borrow_mut();
        state.config = None;
        state.enabled = false;
        state.remaining = 0;
        state.resets += 1;
    }

    fn configure(&mut self, config: &TransferConfig) {
        let mut state = self.0.borrow_mut();
        assert!(!state.enabled, "configured while enabled");
        state.config = Some(*config);
        state.remaining = config.count;
    }

    fn enable(&mut self) {
        self.0.borrow_mut().enabled = true;
    }

    fn remaining(&self) -> u16 {
        self.0.borrow().remaining
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    PowerOff,
    Configure,
    PowerOn,
    Settle,
    ResetCalibration,
    StartCalibration,
}

/// Orders power-on across all simulated units
static POWER_ON_ORDER: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
struct AdcState {
    events: Vec<SimEvent>,
    settings: Option<UnitSettings>,
    /// Polls a calibration step takes, `None` never finishes
    calibration_polls: Option<u32>,
    polls_left: u32,
    calibrated: bool,
    powered_on_at: Option<usize>,
    scans: u32,
}

impl AdcState {
    fn poll(&mut self) -> bool {
        match self.calibration_polls {
            None => true,
            Some(_) if self.polls_left == 0 => false,
            Some(_) => {
                self.polls_left -= 1;
                true
            }
        }
    }
}

/// Converter unit whose calibration steps take a fixed number of polls.
#[derive(Clone)]
pub struct SimAdc(Rc<RefCell<AdcState>>);

impl SimAdc {
    pub fn new(calibration_polls: u32) -> Self {
        Self(Rc::new(RefCell::new(AdcState {
            calibration_polls: Some(calibration_polls),
            ..Default::default()
        })))
    }

    /// Never reports the end of a calibration
    pub fn hung() -> Self {
        Self(Rc::new(RefCell::new(AdcState::default())))
    }

    pub fn events(&self) -> Vec<SimEvent> {
        self.0.borrow().events.clone()
    }

    pub fn settings(&self) -> Option<UnitSettings> {
        self.0.borrow().settings
    }

    pub fn calibrated(&self) -> bool {
        self.0.borrow().calibrated
    }

    pub fn scans_started(&self) -> u32 {
        self.0.borrow().scans
    }

    pub fn powered_on_before(&self, other: &SimAdc) -> bool {
        match (self.0.borrow().powered_on_at, other.0.borrow().powered_on_at) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    fn record(&self, event: SimEvent) {
        self.0.borrow_mut().events.push(event);
    }
}

impl ConverterUnit for SimAdc {
    fn power_off(&mut self) {
        self.record(SimEvent::PowerOff);
    }

    fn configure(&mut self, settings: &UnitSettings) {
        self.record(SimEvent::Configure);
        self.0.borrow_mut().settings = Some(*settings);
    }

    fn power_on(&mut self) {
        self.record(SimEvent::PowerOn);
        self.0.borrow_mut().powered_on_at = Some(POWER_ON_ORDER.fetch_add(1, Ordering::SeqCst));
    }

    fn settle(&mut self) {
        self.record(SimEvent::Settle);
    }

    fn reset_calibration(&mut self) {
        self.record(SimEvent::ResetCalibration);
        let mut state = self.0.borrow_mut();
        state.polls_left = state.calibration_polls.unwrap_or(0);
    }

    fn calibration_reset_pending(&self) -> bool {
        self.0.borrow_mut().poll()
    }

    fn start_calibration(&mut self) {
        self.record(SimEvent::StartCalibration);
        let mut state = self.0.borrow_mut();
        state.polls_left = state.calibration_polls.unwrap_or(0);
    }

    fn calibrating(&self) -> bool {
        let mut state = self.0.borrow_mut();
        let busy = state.poll();
        if !busy {
            state.calibrated = true;
        }
        busy
    }

    fn start_regular(&mut self) {
        self.0.borrow_mut().scans += 1;
    }

    fn sequence_register(&self) -> u32 {
        self.settings().map_or(0, |s| s.sequence.sqr3)
    }

    fn control_registers(&self) -> (u32, u32) {
        // SCAN, software trigger, ADON, plus DUALMOD, EOCIE and DMA on the master
        match self.settings().map(|s| s.unit) {
            Some(Unit::Master) => (0x0006_0120, 0x001e_0101),
            _ => (0x0000_0100, 0x001e_0001),
        }
    }
}

#[derive(Default)]
struct UsartState {
    sent: Vec<u8>,
    received: VecDeque<u8>,
    tx_interrupt: bool,
}

/// Serial port that is always ready to send.
#[derive(Clone, Default)]
pub struct SimUsart(Rc<RefCell<UsartState>>);

impl SimUsart {
    pub fn sent(&self) -> Vec<u8> {
        self.0.borrow().sent.clone()
    }

    /// A byte arrives on the wire
    pub fn receive(&self, byte: u8) {
        self.0.borrow_mut().received.push_back(byte);
    }
}

impl SerialPort for SimUsart {
    fn rx_ready(&self) -> bool {
        !self.0.borrow().received.is_empty()
    }

    fn tx_ready(&self) -> bool {
        true
    }

    fn read(&mut self) -> u8 {
        self.0
            .borrow_mut()
            .received
            .pop_front()
            .expect("read without a received byte")
    }

    fn write(&mut self, byte: u8) {
        self.0.borrow_mut().sent.push(byte);
    }

    fn tx_interrupt_enabled(&self) -> bool {
        self.0.borrow().tx_interrupt
    }

    fn disable_tx_interrupt(&mut self) {
        self.0.borrow_mut().tx_interrupt = false;
    }
}

impl TransmitControl for SimUsart {
    fn enable_tx_interrupt(&mut self) {
        self.0.borrow_mut().tx_interrupt = true;
    }
}

/// Compare flag that gets set on every `n`-th poll.
pub struct SimTicks {
    every: u32,
    polls: u32,
    acknowledged: u32,
}

impl SimTicks {
    pub fn every(n: u32) -> Self {
        Self {
            every: n,
            polls: 0,
            acknowledged: 0,
        }
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn acknowledged(&self) -> u32 {
        self.acknowledged
    }
}

impl TickSource for SimTicks {
    fn take_tick(&mut self) -> bool {
        self.polls += 1;
        let tick = self.polls % self.every == 0;
        if tick {
            self.acknowledged += 1;
        }
        tick
    }
}
