//! Facilities for incrementally decoding instructions as they appear on a
//! microprocessor bus.
//!
//! Bytes captured from the bus are pushed into an [`InsnDecoder`] one at a
//! time.  The decoder works out how many bytes the current instruction
//! occupies (which may itself take several bytes to discover, e.g. for
//! prefixed opcodes), accumulates them, and renders a display string once the
//! instruction is complete.  Decoding never fails; malformed input is
//! rendered as a placeholder string instead.

mod mc6800;
mod mc6809;
mod mos6502;
mod z80;

//===========================================================================//

/// The maximum number of bytes a single instruction fetch can accumulate
/// before the decoder gives up.
pub const MAX_INSN_BYTES: usize = 8;

/// An upper bound on the length, in bytes, of any rendered instruction
/// string, including the resolved-target annotation.
pub const MAX_INSN_STRING: usize = 28;

/// The text rendered when an instruction fetch exceeds [`MAX_INSN_BYTES`].
pub const OVERFLOW_TEXT: &str = "<decode overflow>";

//===========================================================================//

/// Which microprocessor's instruction set to decode.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CpuType {
    /// The original NMOS MOS 6502.
    Mos6502,
    /// The CMOS WDC 65C02 (with the extra instructions and addressing
    /// modes).
    Wdc65c02,
    /// The Motorola 6800.
    Mc6800,
    /// The Motorola 6809.
    Mc6809,
    /// The Motorola 6809E.  Decodes identically to the 6809; the two differ
    /// only in their bus interface.
    Mc6809e,
    /// The Zilog Z80.
    Z80,
}

impl CpuType {
    /// Returns the number of bytes the current instruction will occupy, or
    /// `None` if more bytes must be fetched before that can be determined.
    fn bytes_required(self, bytes: &[u8]) -> Option<usize> {
        match self {
            CpuType::Mos6502 => {
                mos6502::bytes_required(&mos6502::OPCODES_6502, bytes)
            }
            CpuType::Wdc65c02 => {
                mos6502::bytes_required(&mos6502::OPCODES_65C02, bytes)
            }
            CpuType::Mc6800 => mc6800::bytes_required(bytes),
            CpuType::Mc6809 | CpuType::Mc6809e => mc6809::bytes_required(bytes),
            CpuType::Z80 => z80::bytes_required(bytes),
        }
    }

    /// Renders a completed instruction, returning the display text and the
    /// resolved branch target address, if any.
    fn format(self, addr: u32, bytes: &[u8]) -> (String, Option<u32>) {
        match self {
            CpuType::Mos6502 => {
                mos6502::format(&mos6502::OPCODES_6502, addr, bytes)
            }
            CpuType::Wdc65c02 => {
                mos6502::format(&mos6502::OPCODES_65C02, addr, bytes)
            }
            CpuType::Mc6800 => mc6800::format(addr, bytes),
            CpuType::Mc6809 | CpuType::Mc6809e => mc6809::format(addr, bytes),
            CpuType::Z80 => z80::format(addr, bytes),
        }
    }
}

//===========================================================================//

/// The lifecycle state of an [`InsnDecoder`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DecodeState {
    /// No instruction has been started yet.
    Idle,
    /// An instruction fetch is in progress.
    Fetching,
    /// The instruction is fully decoded and its text can be read.
    Complete,
}

//===========================================================================//

/// An incremental decoder for a single instruction at a time.
///
/// The caller marks the start of an instruction with [`begin`], then pushes
/// each subsequent bus byte with [`feed`] until the decoder reports
/// completion; [`text`] then yields the rendered instruction.  The decoder
/// never errors: unknown opcodes render as `"?"`, and a fetch that exceeds
/// [`MAX_INSN_BYTES`] renders as [`OVERFLOW_TEXT`].
///
/// [`begin`]: InsnDecoder::begin
/// [`feed`]: InsnDecoder::feed
/// [`text`]: InsnDecoder::text
#[derive(Clone, Debug)]
pub struct InsnDecoder {
    cpu: CpuType,
    state: DecodeState,
    addr: u32,
    bytes: [u8; MAX_INSN_BYTES],
    fetched: usize,
    required: Option<usize>,
    text: String,
}

impl InsnDecoder {
    /// Constructs an idle decoder for the given CPU.  The CPU choice is
    /// fixed for the lifetime of the decoder.
    pub fn new(cpu: CpuType) -> InsnDecoder {
        InsnDecoder {
            cpu,
            state: DecodeState::Idle,
            addr: 0,
            bytes: [0; MAX_INSN_BYTES],
            fetched: 0,
            required: None,
            text: String::new(),
        }
    }

    /// Returns which CPU's instruction set this decoder decodes.
    pub fn cpu(&self) -> CpuType {
        self.cpu
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Returns the address of the first byte of the current instruction.
    pub fn address(&self) -> u32 {
        self.addr
    }

    /// Returns the instruction bytes fetched so far.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..self.fetched]
    }

    /// Returns the total byte count of the current instruction, or `None`
    /// if that isn't yet known.
    pub fn bytes_required(&self) -> Option<usize> {
        self.required
    }

    /// Starts decoding a new instruction whose first byte is `byte` and
    /// whose address is `addr`.  Has no effect while a fetch is already in
    /// progress.  Single-byte instructions complete immediately.
    pub fn begin(&mut self, addr: u32, byte: u8) {
        if self.state == DecodeState::Fetching {
            return;
        }
        self.state = DecodeState::Fetching;
        self.addr = addr;
        // Zero the whole buffer so that formatting is a pure function of
        // this instruction's bytes, even on paths that read past the
        // fetched prefix.
        self.bytes = [0; MAX_INSN_BYTES];
        self.bytes[0] = byte;
        self.fetched = 1;
        self.required = None;
        self.text.clear();
        self.step();
    }

    /// Pushes the next instruction byte.  Ignored unless a fetch is in
    /// progress.  Returns true if this call finished the instruction,
    /// either normally or by overflowing the fetch buffer.
    pub fn feed(&mut self, byte: u8) -> bool {
        if self.state != DecodeState::Fetching {
            return false;
        }
        if self.fetched == MAX_INSN_BYTES {
            self.text = OVERFLOW_TEXT.to_string();
            self.state = DecodeState::Complete;
            return true;
        }
        self.bytes[self.fetched] = byte;
        self.fetched += 1;
        self.step()
    }

    /// Returns the rendered instruction once decoding is complete, or
    /// `None` while it isn't.
    pub fn text(&self) -> Option<&str> {
        match self.state {
            DecodeState::Complete => Some(&self.text),
            _ => None,
        }
    }

    /// Runs one resolve-and-maybe-format pass, returning true if the
    /// instruction completed.
    fn step(&mut self) -> bool {
        if self.required.is_none() {
            self.required = self.cpu.bytes_required(&self.bytes[..self.fetched]);
        }
        if self.required != Some(self.fetched) {
            return false;
        }
        // The formatter gets the whole (zero-padded) buffer rather than
        // just the fetched prefix; see the mc6809 module for the one place
        // the distinction matters.
        let (text, target) = self.cpu.format(self.addr, &self.bytes);
        self.text = text;
        if let Some(target) = target {
            self.text.push_str(&format!(" <{:04X}>", target));
        }
        self.state = DecodeState::Complete;
        true
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{
        CpuType, DecodeState, InsnDecoder, MAX_INSN_BYTES, MAX_INSN_STRING,
        OVERFLOW_TEXT,
    };

    fn decode(cpu: CpuType, addr: u32, bytes: &[u8]) -> String {
        let mut decoder = InsnDecoder::new(cpu);
        decoder.begin(addr, bytes[0]);
        for &byte in &bytes[1..] {
            decoder.feed(byte);
        }
        decoder.text().expect("instruction did not complete").to_string()
    }

    #[test]
    fn single_byte_insn_completes_in_begin() {
        let mut decoder = InsnDecoder::new(CpuType::Mos6502);
        assert_eq!(decoder.state(), DecodeState::Idle);
        decoder.begin(0x1000, 0x00);
        assert_eq!(decoder.state(), DecodeState::Complete);
        assert_eq!(decoder.text(), Some("BRK"));
    }

    #[test]
    fn feed_reports_completion() {
        let mut decoder = InsnDecoder::new(CpuType::Mos6502);
        decoder.begin(0x1000, 0xac);
        assert_eq!(decoder.state(), DecodeState::Fetching);
        assert!(!decoder.feed(0x00));
        assert!(decoder.feed(0x30));
        assert_eq!(decoder.text(), Some("LDY $3000"));
    }

    #[test]
    fn text_is_idempotent() {
        let mut decoder = InsnDecoder::new(CpuType::Mc6800);
        decoder.begin(0x2000, 0x01);
        let first = decoder.text().map(str::to_string);
        assert_eq!(first.as_deref(), Some("NOP"));
        assert_eq!(decoder.text(), first.as_deref());
        assert_eq!(decoder.text(), first.as_deref());
    }

    #[test]
    fn begin_is_ignored_while_fetching() {
        let mut decoder = InsnDecoder::new(CpuType::Mos6502);
        decoder.begin(0x1000, 0xac);
        decoder.begin(0x2000, 0x00);
        assert_eq!(decoder.state(), DecodeState::Fetching);
        assert_eq!(decoder.address(), 0x1000);
        decoder.feed(0x00);
        decoder.feed(0x30);
        assert_eq!(decoder.text(), Some("LDY $3000"));
    }

    #[test]
    fn feed_is_ignored_unless_fetching() {
        let mut decoder = InsnDecoder::new(CpuType::Mos6502);
        assert!(!decoder.feed(0xea));
        decoder.begin(0x1000, 0xea);
        assert_eq!(decoder.text(), Some("NOP"));
        assert!(!decoder.feed(0xea));
        assert_eq!(decoder.text(), Some("NOP"));
    }

    #[test]
    fn bytes_required_is_monotonic() {
        // A page-prefixed 6809 instruction leaves the byte count
        // undetermined until the second byte arrives, after which it must
        // not change.
        let mut decoder = InsnDecoder::new(CpuType::Mc6809);
        decoder.begin(0x1000, 0x10);
        assert_eq!(decoder.bytes_required(), None);
        decoder.feed(0xae);
        assert_eq!(decoder.bytes_required(), None);
        decoder.feed(0x84);
        assert_eq!(decoder.bytes_required(), Some(3));
        assert_eq!(decoder.text(), Some("LDY ,X"));
    }

    #[test]
    fn overflow_forces_completion() {
        // An undefined 6809 page-2 opcode never resolves a length, so the
        // fetch runs into the buffer cap.
        let mut decoder = InsnDecoder::new(CpuType::Mc6809);
        decoder.begin(0x1000, 0x10);
        for _ in 0..(MAX_INSN_BYTES - 1) {
            assert!(!decoder.feed(0x00));
        }
        assert_eq!(decoder.state(), DecodeState::Fetching);
        assert!(decoder.feed(0x00));
        assert_eq!(decoder.text(), Some(OVERFLOW_TEXT));
    }

    #[test]
    fn every_first_byte_reaches_completion() {
        let cpus = [
            CpuType::Mos6502,
            CpuType::Wdc65c02,
            CpuType::Mc6800,
            CpuType::Mc6809,
            CpuType::Mc6809e,
            CpuType::Z80,
        ];
        for cpu in cpus {
            for opcode in 0..=0xffu8 {
                let mut decoder = InsnDecoder::new(cpu);
                decoder.begin(0, opcode);
                for _ in 0..MAX_INSN_BYTES {
                    if decoder.state() == DecodeState::Complete {
                        break;
                    }
                    decoder.feed(0x00);
                }
                let text = decoder.text().unwrap_or_else(|| {
                    panic!("{:?} opcode {:#04x} never completed", cpu, opcode)
                });
                assert!(!text.is_empty());
                assert!(
                    text.len() <= MAX_INSN_STRING,
                    "{:?} opcode {:#04x} rendered {:?} ({} bytes)",
                    cpu,
                    opcode,
                    text,
                    text.len()
                );
                assert!(text.is_ascii());
            }
        }
    }

    #[test]
    fn resolved_target_annotation_is_appended() {
        assert_eq!(decode(CpuType::Mos6502, 0x1006, &[0x10, 0x10]), "BPL 16 <1018>");
        assert_eq!(decode(CpuType::Mc6809, 0x1003, &[0x20, 0xfd]), "BRA -3 <1002>");
    }

    #[test]
    fn target_annotation_wraps_at_16_bits() {
        // A backwards branch near address zero wraps around the u32 space;
        // the annotation widens past four digits rather than truncating.
        let text = decode(CpuType::Mos6502, 0x0001, &[0x10, 0x80]);
        assert_eq!(text, "BPL -128 <FFFFFF83>");
    }
}
