//! Startup text sent once before the first scan.

use core::fmt::Write;

use crate::channels::{slot_fields, ChannelAssignment};
use crate::engine::{ConverterUnit, DualAcquisitionEngine};
use crate::format::{write_decimal, write_register, write_str, ByteSink, LINE_END};

type Line = heapless::String<64>;

/// `Dual ADC 8 channels 0-7 DMA IRQ`
pub fn write_banner(sink: &mut impl ByteSink, assignment: &ChannelAssignment) -> usize {
    let mut line = Line::new();
    // Fits: the numbers have at most two digits each
    let _ = write!(
        line,
        "Dual ADC {} channels {}-{} DMA IRQ\r\n",
        assignment.total_channels(),
        assignment.first_channel(),
        assignment.last_channel()
    );
    write_str(sink, &line)
}

/// `<label> fields a b c d `, the first four slots of a sequence register
pub fn write_sequence_fields(sink: &mut impl ByteSink, label: &str, register: u32) -> usize {
    let mut written = write_str(sink, label) + write_str(sink, " fields ");
    for field in slot_fields(register) {
        written += write_decimal(sink, field.into());
    }
    written + sink.put_all(LINE_END)
}

/// `<label> control XXXX XXXX  XXXX XXXX  `, the raw `CR1` and `CR2` registers
pub fn write_control_registers(
    sink: &mut impl ByteSink,
    label: &str,
    (cr1, cr2): (u32, u32),
) -> usize {
    write_str(sink, label)
        + write_str(sink, " control ")
        + write_register(sink, cr1)
        + write_register(sink, cr2)
        + sink.put_all(LINE_END)
}

/// Banner followed by the register dump of both units.
pub fn write_startup<M, S>(sink: &mut impl ByteSink, engine: &DualAcquisitionEngine<M, S>) -> usize
where
    M: ConverterUnit,
    S: ConverterUnit,
{
    write_banner(sink, engine.assignment())
        + write_sequence_fields(sink, "ADC1_SQR3", engine.master().sequence_register())
        + write_sequence_fields(sink, "ADC2_SQR3", engine.slave().sequence_register())
        + write_control_registers(sink, "ADC1", engine.master().control_registers())
}
