#![no_std]

pub mod adc;
pub mod dma;
pub mod serial;
pub mod timer;
