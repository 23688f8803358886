//! Listing output: drives a decoder over a capture and writes one line per
//! decoded instruction.

use crate::capture::{Capture, Sample};
use crate::dis::{CpuType, DecodeState, InsnDecoder, OVERFLOW_TEXT};
use std::io;

//===========================================================================//

/// Decodes `capture` sequentially and writes one listing row per
/// instruction to `writer`.  If the capture ends in the middle of an
/// instruction, a final row is written with the text `<incomplete>`.
pub fn write_listing<W: io::Write>(
    writer: &mut W,
    cpu: CpuType,
    capture: &Capture,
) -> io::Result<()> {
    let mut decoder = InsnDecoder::new(cpu);
    for &sample in capture.samples() {
        if decoder.state() == DecodeState::Fetching {
            if decoder.feed(sample.data) {
                write_row(writer, &decoder)?;
                if decoder.text() == Some(OVERFLOW_TEXT) {
                    // An overflow row doesn't consume the byte that forced
                    // it; that byte begins the next instruction.
                    begin_row(writer, &mut decoder, sample)?;
                }
            }
        } else {
            begin_row(writer, &mut decoder, sample)?;
        }
    }
    if decoder.state() == DecodeState::Fetching {
        write_row(writer, &decoder)?;
    }
    Ok(())
}

/// Starts a new instruction at `sample`, writing its row right away if a
/// single byte was enough to complete it.
fn begin_row<W: io::Write>(
    writer: &mut W,
    decoder: &mut InsnDecoder,
    sample: Sample,
) -> io::Result<()> {
    decoder.begin(sample.addr, sample.data);
    if decoder.state() == DecodeState::Complete {
        write_row(writer, decoder)?;
    }
    Ok(())
}

fn write_row<W: io::Write>(
    writer: &mut W,
    decoder: &InsnDecoder,
) -> io::Result<()> {
    let mut bytes = String::new();
    for (index, byte) in decoder.bytes().iter().enumerate() {
        if index > 0 {
            bytes.push(' ');
        }
        bytes.push_str(&format!("{:02X}", byte));
    }
    let text = decoder.text().unwrap_or("<incomplete>");
    writeln!(writer, "{:04X}  {:<14}  {}", decoder.address(), bytes, text)
}

//===========================================================================//
