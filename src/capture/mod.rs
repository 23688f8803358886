//! Capture files: recorded instruction-fetch samples to replay through the
//! decoder.
//!
//! The primary format is a hex trace, one line per burst of fetches:
//!
//! ```text
//! 1000: A9 00    ; LDA #$00
//! 1002: 8D 00 20
//! ```
//!
//! An `ADDR:` marker sets the current address; each byte token records a
//! sample there and advances the address by one.  A capture can also be
//! built from a raw memory image, with addresses synthesized from an
//! origin.

use std::fmt;

mod lex;

pub use lex::{Token, TokenLexer};

//===========================================================================//

/// A single bus sample: one byte fetched from one address.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Sample {
    /// The address the byte was fetched from.
    pub addr: u32,
    /// The fetched data byte.
    pub data: u8,
}

//===========================================================================//

/// An ordered sequence of fetch samples.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Capture {
    samples: Vec<Sample>,
}

impl Capture {
    /// Parses the hex trace format.  Bytes that appear before any address
    /// marker are placed starting at address zero.
    pub fn parse_hex(input: &[u8]) -> Result<Capture, ParseError> {
        let mut samples = Vec::new();
        let mut addr: u32 = 0;
        for result in TokenLexer::new(input) {
            match result? {
                Token::Address(value) => addr = value,
                Token::Byte(data) => {
                    samples.push(Sample { addr, data });
                    addr = addr.wrapping_add(1);
                }
            }
        }
        Ok(Capture { samples })
    }

    /// Builds a capture from a raw memory image, one sample per byte,
    /// starting at `origin`.
    pub fn from_raw(origin: u32, bytes: &[u8]) -> Capture {
        let samples = bytes
            .iter()
            .enumerate()
            .map(|(index, &data)| Sample {
                addr: origin.wrapping_add(index as u32),
                data,
            })
            .collect();
        Capture { samples }
    }

    /// Returns the samples in capture order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
}

//===========================================================================//

/// An error encountered while parsing a capture file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseError {
    /// The line number (starting from 1) where the error occurred.
    pub line: u32,
    /// The error message to report to the user.
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

//===========================================================================//
