//! Text encoding of the serial output.
//!
//! Everything is written byte by byte into a [`ByteSink`], normally the producer side
//! of the outbound ring buffer. Bytes the sink rejects are simply lost.

use crate::ring_buffer::Producer;
use crate::sample::ConversionSample;

/// Largest number of digits in an `i32`
const MAX_DIGITS: usize = 10;

/// Separator between the two halves of a sample, follows the low value's space
const PAIR_SEPARATOR: &[u8] = b"- ";

pub const LINE_END: &[u8] = b"\r\n";

pub trait ByteSink {
    /// Returns `false` when the byte was dropped
    fn put(&mut self, byte: u8) -> bool;

    /// Returns how many of the bytes were accepted
    fn put_all(&mut self, bytes: &[u8]) -> usize {
        bytes.iter().filter(|&&b| self.put(b)).count()
    }
}

impl<const N: usize> ByteSink for Producer<'_, N> {
    fn put(&mut self, byte: u8) -> bool {
        self.push(byte)
    }
}

impl<const N: usize> ByteSink for heapless::Vec<u8, N> {
    fn put(&mut self, byte: u8) -> bool {
        self.push(byte).is_ok()
    }
}

/// Writes `value` in decimal followed by a single space.
pub fn write_decimal(sink: &mut impl ByteSink, value: i32) -> usize {
    let mut digits = heapless::Vec::<u8, MAX_DIGITS>::new();
    let mut magnitude = value.unsigned_abs();

    loop {
        // Can't overflow, an u32 has at most MAX_DIGITS digits
        let _ = digits.push(b'0' + (magnitude % 10) as u8);
        magnitude /= 10;
        if magnitude == 0 {
            break;
        }
    }

    let mut written = 0;
    if value < 0 {
        written += sink.put(b'-') as usize;
    }
    for &digit in digits.iter().rev() {
        written += sink.put(digit) as usize;
    }
    written + sink.put(b' ') as usize
}

/// Writes `<low> - <high> ` for one scan step.
pub fn write_sample(sink: &mut impl ByteSink, sample: ConversionSample) -> usize {
    write_decimal(sink, sample.low().into())
        + sink.put_all(PAIR_SEPARATOR)
        + write_decimal(sink, sample.high().into())
}

/// Writes all samples of a scan followed by CRLF.
pub fn write_scan_line(sink: &mut impl ByteSink, samples: &[ConversionSample]) -> usize {
    let written: usize = samples.iter().map(|&s| write_sample(sink, s)).sum();
    written + sink.put_all(LINE_END)
}

pub fn write_str(sink: &mut impl ByteSink, text: &str) -> usize {
    sink.put_all(text.as_bytes())
}

/// Writes four upper case hex digits followed by a space.
pub fn write_hex(sink: &mut impl ByteSink, value: u16) -> usize {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let digits: usize = (0..4)
        .rev()
        .map(|nibble| sink.put(HEX[(value >> (4 * nibble)) as usize & 0xf]) as usize)
        .sum();
    digits + sink.put(b' ') as usize
}

/// Writes a register as two groups of four hex digits, `0006 0120  `.
pub fn write_register(sink: &mut impl ByteSink, value: u32) -> usize {
    write_hex(sink, (value >> 16) as u16) + write_hex(sink, value as u16) + sink.put(b' ') as usize
}

/// Longest line a scan of `pairs` samples with 12-bit results can produce
pub const fn max_line_len(pairs: usize) -> usize {
    // "4095 - 4095 "
    const SAMPLE: usize = 4 + 1 + PAIR_SEPARATOR.len() + 4 + 1;
    pairs * SAMPLE + LINE_END.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring_buffer::RingBuffer;

    type Line = heapless::Vec<u8, 128>;

    fn text(f: impl FnOnce(&mut Line) -> usize) -> std::string::String {
        let mut line = Line::new();
        let written = f(&mut line);
        assert_eq!(written, line.len());
        std::string::String::from_utf8(line.to_vec()).unwrap()
    }

    #[test]
    fn decimal() {
        assert_eq!(text(|s| write_decimal(s, 0)), "0 ");
        assert_eq!(text(|s| write_decimal(s, 7)), "7 ");
        assert_eq!(text(|s| write_decimal(s, 4095)), "4095 ");
        assert_eq!(text(|s| write_decimal(s, 1000)), "1000 ");
        assert_eq!(text(|s| write_decimal(s, -42)), "-42 ");
        assert_eq!(text(|s| write_decimal(s, i32::MAX)), "2147483647 ");
        assert_eq!(text(|s| write_decimal(s, i32::MIN)), "-2147483648 ");
    }

    #[test]
    fn samples() {
        assert_eq!(
            text(|s| write_sample(s, ConversionSample::from_parts(2, 1))),
            "2 - 1 "
        );
        assert_eq!(
            text(|s| write_sample(s, ConversionSample::from_parts(0, 0))),
            "0 - 0 "
        );
    }

    #[test]
    fn scan_line() {
        let samples = [0x0001_0002, 0x0003_0004, 0x0005_0006, 0x0007_0008].map(ConversionSample);
        assert_eq!(
            text(|s| write_scan_line(s, &samples)),
            "2 - 1 4 - 3 6 - 5 8 - 7 \r\n"
        );
    }

    #[test]
    fn longest_line() {
        let samples = [ConversionSample::from_parts(4095, 4095); 8];
        let line = text(|s| write_scan_line(s, &samples));
        assert_eq!(line.len(), max_line_len(8));
    }

    #[test]
    fn registers() {
        assert_eq!(text(|s| write_hex(s, 0x0a1f)), "0A1F ");
        assert_eq!(text(|s| write_register(s, 0x0006_0100)), "0006 0100  ");
    }

    #[test]
    fn full_sink_counts_accepted_bytes() {
        let mut ring = RingBuffer::<4>::new();
        let (mut producer, mut consumer) = ring.split();

        assert_eq!(write_decimal(&mut producer, 123456), 4);
        let kept: std::vec::Vec<u8> = core::iter::from_fn(|| consumer.pop()).collect();
        assert_eq!(kept, b"1234");
        assert_eq!(producer.dropped(), 3);
    }
}
