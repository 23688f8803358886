//! Instruction decoding for the Motorola 6809 and 6809E.
//!
//! This is by far the most involved of the supported families.  Opcodes
//! `0x10` and `0x11` open the page-2/page-3 opcode spaces, so the
//! instruction length may not be knowable until two (or, for indexed
//! modes, three) bytes have arrived.  Indexed operands carry a postbyte
//! that selects one of a dozen sub-modes, most with an indirect variant.
//!
//! The decode is deliberately incomplete in the same way the hardware's
//! is: undefined opcodes in a recognized column still classify to that
//! column's addressing mode.

use byteorder::{BigEndian, ByteOrder};

//===========================================================================//

#[rustfmt::skip]
static OPCODES_6809: [&str; 256] = [
    "NEG",  "?",    "?",    "COM",  "LSR",  "?",    "ROR",  "ASR",
    "ASL",  "ROL",  "DEC",  "?",    "INC",  "TST",  "JMP",  "CLR",
    "(pg2)","(pg3)","NOP",  "SYNC", "?",    "?",    "LBRA", "LBSR",
    "?",    "DAA",  "ORCC", "?",    "ANDCC","SEX",  "EXG",  "TFR",
    "BRA",  "BRN",  "BHI",  "BLS",  "BCC",  "BCS",  "BNE",  "BEQ",
    "BVC",  "BVS",  "BPL",  "BMI",  "BGE",  "BLT",  "BGT",  "BLE",
    "LEAX", "LEAY", "LEAS", "LEAU", "PSHS", "PULS", "PSHU", "PULU",
    "?",    "RTS",  "ABX",  "RTI",  "CWAI", "MUL",  "?",    "SWI",
    "NEGA", "?",    "?",    "COMA", "LSRA", "?",    "RORA", "ASRA",
    "ASLA", "ROLA", "DECA", "?",    "INCA", "TSTA", "?",    "CLRA",
    "NEGB", "?",    "?",    "COMB", "LSRB", "?",    "RORB", "ASRB",
    "ASLB", "ROLB", "DECB", "?",    "INCB", "TSTB", "?",    "CLRB",
    "NEG",  "?",    "?",    "COM",  "LSR",  "?",    "ROR",  "ASR",
    "ASL",  "ROL",  "DEC",  "?",    "INC",  "TST",  "JMP",  "CLR",
    "NEG",  "?",    "?",    "COM",  "LSR",  "?",    "ROR",  "ASR",
    "ASL",  "ROL",  "DEC",  "?",    "INC",  "TST",  "JMP",  "CLR",
    "SUBA", "CMPA", "SBCA", "SUBD", "ANDA", "BITA", "LDA",  "?",
    "EORA", "ADCA", "ORA",  "ADDA", "CMPX", "BSR",  "LDX",  "?",
    "SUBA", "CMPA", "SBCA", "SUBD", "ANDA", "BITA", "LDA",  "STA",
    "EORA", "ADCA", "ORA",  "ADDA", "CMPX", "JSR",  "LDX",  "STX",
    "SUBA", "CMPA", "SBCA", "SUBD", "ANDA", "BITA", "LDA",  "STA",
    "EORA", "ADCA", "ORA",  "ADDA", "CMPX", "JSR",  "LDX",  "STX",
    "SUBA", "CMPA", "SBCA", "SUBD", "ANDA", "BITA", "LDA",  "STA",
    "EORA", "ADCA", "ORA",  "ADDA", "CMPX", "JSR",  "LDX",  "STX",
    "SUBB", "CMPB", "SBCB", "ADDD", "ANDB", "BITB", "LDB",  "?",
    "EORB", "ADCB", "ORB",  "ADDB", "LDD",  "?",    "LDU",  "?",
    "SUBB", "CMPB", "SBCB", "ADDD", "ANDB", "BITB", "LDB",  "STB",
    "EORB", "ADCB", "ORB",  "ADDB", "LDD",  "STD",  "LDU",  "STU",
    "SUBB", "CMPB", "SBCB", "ADDD", "ANDB", "BITB", "LDB",  "STB",
    "EORB", "ADCB", "ORB",  "ADDB", "LDD",  "STD",  "LDU",  "STU",
    "SUBB", "CMPB", "SBCB", "ADDD", "ANDB", "BITB", "LDB",  "STB",
    "EORB", "ADCB", "ORB",  "ADDB", "LDD",  "STD",  "LDU",  "STU",
];

#[rustfmt::skip]
static LONG_BRANCHES: [&str; 16] = [
    "?",    "LBRN", "LBHI", "LBLS", "LBCC", "LBCS", "LBNE", "LBEQ",
    "LBVC", "LBVS", "LBPL", "LBMI", "LBGE", "LBLT", "LBGT", "LBLE",
];

//===========================================================================//

/// The addressing modes of the 6809.  Indexed sub-modes carry their
/// indirect flag.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AddrMode {
    /// No operand bytes.
    Inherent,
    /// An 8-bit address within the direct page.
    Direct,
    /// A 16-bit big-endian absolute address.
    Extended,
    /// A signed 8-bit branch displacement.
    Rel8,
    /// A signed 16-bit big-endian branch displacement.
    Rel16,
    /// An 8-bit immediate value.
    Imm8,
    /// A 16-bit big-endian immediate value.
    Imm16,
    /// Indexed, no offset: `,R`.
    ZeroOff { indirect: bool },
    /// Indexed, 5-bit signed offset packed into the postbyte.
    ConstOff5,
    /// Indexed, 8-bit signed offset byte.
    ConstOff8 { indirect: bool },
    /// Indexed, 16-bit signed offset word.
    ConstOff16 { indirect: bool },
    /// Indexed, offset taken from accumulator A, B, or D.
    AccOff { indirect: bool },
    /// Indexed, post-increment by one: `,R+`.
    PostInc1,
    /// Indexed, post-increment by two: `,R++`.
    PostInc2 { indirect: bool },
    /// Indexed, pre-decrement by one: `,-R`.
    PreDec1,
    /// Indexed, pre-decrement by two: `,--R`.
    PreDec2 { indirect: bool },
    /// Indexed, 8-bit offset from the program counter.
    PcRel8 { indirect: bool },
    /// Indexed, 16-bit offset from the program counter.
    PcRel16 { indirect: bool },
    /// Indexed postbyte encoding of an absolute indirect address.
    ExtendedInd,
    /// The register-pair postbyte of EXG and TFR.
    ExgTfr,
    /// The register-set postbyte of PSHS/PULS/PSHU/PULU.
    PshPul,
}

impl AddrMode {
    /// Decodes the indexed-mode postbyte.  Rules are checked in order:
    /// extended indirect and the 5-bit constant offset claim their bit
    /// patterns outright, then the low nibble (with the high bit masked
    /// back in) selects the sub-mode and bit 4 marks it indirect.
    fn from_postbyte(postbyte: u8) -> Option<AddrMode> {
        if postbyte & 0b1001_1111 == 0b1001_1111 {
            return Some(AddrMode::ExtendedInd);
        }
        if postbyte & 0b1000_0000 == 0 {
            return Some(AddrMode::ConstOff5);
        }
        let indirect = postbyte & 0b0001_0000 != 0;
        match postbyte & 0b1000_1111 {
            0b1000_0100 => Some(AddrMode::ZeroOff { indirect }),
            0b1000_1000 => Some(AddrMode::ConstOff8 { indirect }),
            0b1000_1001 => Some(AddrMode::ConstOff16 { indirect }),
            0b1000_0101 | 0b1000_0110 | 0b1000_1011 => {
                Some(AddrMode::AccOff { indirect })
            }
            // The one-step increment and decrement have no indirect forms.
            0b1000_0000 if indirect => None,
            0b1000_0000 => Some(AddrMode::PostInc1),
            0b1000_0001 => Some(AddrMode::PostInc2 { indirect }),
            0b1000_0010 if indirect => None,
            0b1000_0010 => Some(AddrMode::PreDec1),
            0b1000_0011 => Some(AddrMode::PreDec2 { indirect }),
            0b1000_1100 => Some(AddrMode::PcRel8 { indirect }),
            0b1000_1101 => Some(AddrMode::PcRel16 { indirect }),
            _ => None,
        }
    }

    /// Classifies the accumulated bytes, or returns `None` if either more
    /// bytes are needed (page prefixes, indexed postbytes) or no mode is
    /// defined for them.
    fn from_bytes(bytes: &[u8]) -> Option<AddrMode> {
        let &opcode = bytes.first()?;
        if opcode == 0x10 || opcode == 0x11 {
            let &op2 = bytes.get(1)?;
            let extopc = u16::from_be_bytes([opcode, op2]);
            return match extopc & 0xfff0 {
                0x1020 => Some(AddrMode::Rel16),
                0x1030 | 0x1130 => Some(AddrMode::Inherent),
                0x1080 | 0x1180 | 0x10c0 => Some(AddrMode::Imm16),
                0x1090 | 0x1190 | 0x10d0 => Some(AddrMode::Direct),
                0x10a0 | 0x11a0 | 0x10e0 => {
                    AddrMode::from_postbyte(*bytes.get(2)?)
                }
                0x10b0 | 0x11b0 | 0x10f0 => Some(AddrMode::Extended),
                _ => None,
            };
        }
        match opcode {
            0x00..=0x0f | 0x90..=0x9f | 0xd0..=0xdf => Some(AddrMode::Direct),
            0x12 | 0x13 | 0x19 | 0x1d => Some(AddrMode::Inherent),
            0x16 | 0x17 => Some(AddrMode::Rel16),
            0x1a | 0x1c => Some(AddrMode::Imm8),
            0x1e | 0x1f => Some(AddrMode::ExgTfr),
            0x10..=0x1f => None,
            0x20..=0x2f => Some(AddrMode::Rel8),
            0x30..=0x33 | 0x60..=0x6f | 0xa0..=0xaf | 0xe0..=0xef => {
                AddrMode::from_postbyte(*bytes.get(1)?)
            }
            0x34..=0x37 => Some(AddrMode::PshPul),
            0x38 => None,
            0x39..=0x3f | 0x40..=0x5f => Some(AddrMode::Inherent),
            0x70..=0x7f | 0xb0..=0xbf | 0xf0..=0xff => Some(AddrMode::Extended),
            0x8d => Some(AddrMode::Rel8),
            0x80..=0x8f | 0xc0..=0xcf => match opcode & 0xf {
                0x3 | 0xc | 0xe => Some(AddrMode::Imm16),
                _ => Some(AddrMode::Imm8),
            },
        }
    }

    /// Returns how many bytes follow the opcode for this mode (for indexed
    /// modes, postbyte included).
    fn operand_bytes(self) -> usize {
        match self {
            AddrMode::Inherent => 0,
            AddrMode::Direct
            | AddrMode::Rel8
            | AddrMode::Imm8
            | AddrMode::ZeroOff { .. }
            | AddrMode::ConstOff5
            | AddrMode::AccOff { .. }
            | AddrMode::PostInc1
            | AddrMode::PostInc2 { .. }
            | AddrMode::PreDec1
            | AddrMode::PreDec2 { .. }
            | AddrMode::ExgTfr
            | AddrMode::PshPul => 1,
            AddrMode::Extended
            | AddrMode::Rel16
            | AddrMode::Imm16
            | AddrMode::ConstOff8 { .. }
            | AddrMode::PcRel8 { .. } => 2,
            AddrMode::ConstOff16 { .. }
            | AddrMode::PcRel16 { .. }
            | AddrMode::ExtendedInd => 3,
        }
    }

    /// Returns whether this mode wraps its operand in `[` `]`.
    fn indirect(self) -> bool {
        match self {
            AddrMode::ZeroOff { indirect }
            | AddrMode::ConstOff8 { indirect }
            | AddrMode::ConstOff16 { indirect }
            | AddrMode::AccOff { indirect }
            | AddrMode::PostInc2 { indirect }
            | AddrMode::PreDec2 { indirect }
            | AddrMode::PcRel8 { indirect }
            | AddrMode::PcRel16 { indirect } => indirect,
            AddrMode::ExtendedInd => true,
            _ => false,
        }
    }
}

//===========================================================================//

/// Looks up the mnemonic for a page-2/page-3 opcode.  The extended spaces
/// are sparse; unassigned slots (including the missing immediate forms of
/// STY and STS) render as `"?"`.
fn extended_mnemonic(extopc: u16) -> &'static str {
    if (0x1020..=0x102f).contains(&extopc) {
        return LONG_BRANCHES[(extopc & 0xf) as usize];
    }
    match extopc {
        0x103f => "SWI2",
        0x113f => "SWI3",
        0x108f | 0x10cf => "?",
        _ => match (extopc & 0xfff0, extopc & 0xf) {
            (0x1080 | 0x1090 | 0x10a0 | 0x10b0, 0x3) => "CMPD",
            (0x1080 | 0x1090 | 0x10a0 | 0x10b0, 0xc) => "CMPY",
            (0x1080 | 0x1090 | 0x10a0 | 0x10b0, 0xe) => "LDY",
            (0x1080 | 0x1090 | 0x10a0 | 0x10b0, 0xf) => "STY",
            (0x10c0 | 0x10d0 | 0x10e0 | 0x10f0, 0xe) => "LDS",
            (0x10c0 | 0x10d0 | 0x10e0 | 0x10f0, 0xf) => "STS",
            (0x1180 | 0x1190 | 0x11a0 | 0x11b0, 0x3) => "CMPU",
            (0x1180 | 0x1190 | 0x11a0 | 0x11b0, 0xc) => "CMPS",
            _ => "?",
        },
    }
}

/// Names a register field of the EXG/TFR postbyte.
fn pair_regname(field: u8) -> &'static str {
    match field {
        0b0000 => "D",
        0b0001 => "X",
        0b0010 => "Y",
        0b0011 => "U",
        0b0100 => "S",
        0b0101 => "PC",
        0b1000 => "A",
        0b1001 => "B",
        0b1010 => "CCR",
        0b1011 => "DPR",
        _ => "?",
    }
}

//===========================================================================//

/// Returns the instruction length, or `None` until the prefix and postbyte
/// bytes needed to determine it have arrived (or forever, for undefined
/// encodings).
pub(crate) fn bytes_required(bytes: &[u8]) -> Option<usize> {
    let mode = AddrMode::from_bytes(bytes)?;
    let prefixed = matches!(bytes[0], 0x10 | 0x11);
    Some(1 + mode.operand_bytes() + usize::from(prefixed))
}

/// Renders a completed instruction.
pub(crate) fn format(addr: u32, bytes: &[u8]) -> (String, Option<u32>) {
    let Some(mode) = AddrMode::from_bytes(bytes) else {
        return ("<?ADDRMODE?>".to_string(), None);
    };
    let prefixed = matches!(bytes[0], 0x10 | 0x11);
    let mnemonic = if prefixed {
        extended_mnemonic(u16::from_be_bytes([bytes[0], bytes[1]]))
    } else {
        OPCODES_6809[bytes[0] as usize]
    };
    static INDEX_REGS: [&str; 4] = ["X", "Y", "U", "S"];
    // Index of the postbyte (or first operand byte, for non-indexed modes).
    let i = if prefixed { 2 } else { 1 };
    let insn_len = (1 + mode.operand_bytes() + usize::from(prefixed)) as u32;
    let reg = INDEX_REGS[((bytes[i] >> 5) & 3) as usize];
    let (open, close) = if mode.indirect() { ("[", "]") } else { ("", "") };

    let relative = |offset: i16, text: String| {
        let target = addr.wrapping_add(insn_len).wrapping_add(offset as u32);
        (text, Some(target))
    };

    match mode {
        AddrMode::Inherent => (mnemonic.to_string(), None),
        AddrMode::Direct => {
            (format!("{} < ${:02X}", mnemonic, bytes[i]), None)
        }
        AddrMode::Extended => {
            let value = BigEndian::read_u16(&bytes[i..]);
            (format!("{} ${:04X}", mnemonic, value), None)
        }
        AddrMode::ExtendedInd => {
            // The index postbyte sits between the opcode and the address.
            let value = BigEndian::read_u16(&bytes[i + 1..]);
            (format!("{} [${:04X}]", mnemonic, value), None)
        }
        AddrMode::Rel8 => {
            let offset = (bytes[i] as i8) as i16;
            relative(offset, format!("{} {}", mnemonic, offset))
        }
        AddrMode::Rel16 => {
            let offset = BigEndian::read_i16(&bytes[i..]);
            relative(offset, format!("{} {}", mnemonic, offset))
        }
        AddrMode::Imm8 => (format!("{} #${:02X}", mnemonic, bytes[i]), None),
        AddrMode::Imm16 => {
            let value = BigEndian::read_u16(&bytes[i..]);
            (format!("{} #${:04X}", mnemonic, value), None)
        }
        AddrMode::ZeroOff { .. } => {
            (format!("{} {},{}{}", mnemonic, open, reg, close), None)
        }
        AddrMode::ConstOff5 => {
            let offset = (((bytes[i] & 0x1f) as i16) << 11) >> 11;
            (format!("{} {},{}", mnemonic, offset, reg), None)
        }
        AddrMode::ConstOff8 { .. } => {
            let offset = bytes[i + 1] as i8;
            (format!("{} {}{},{}{}", mnemonic, open, offset, reg, close), None)
        }
        AddrMode::ConstOff16 { .. } => {
            // Historical: the operand is read at i + i rather than i + 1,
            // which lands one byte past it for page-prefixed opcodes.
            let offset = BigEndian::read_i16(&bytes[i + i..]);
            (format!("{} {}{},{}{}", mnemonic, open, offset, reg, close), None)
        }
        AddrMode::AccOff { .. } => {
            let acc = match bytes[i] & 0b1111 {
                0b0110 => "A",
                0b0101 => "B",
                0b1011 => "D",
                _ => "?",
            };
            (format!("{} {}{},{}{}", mnemonic, open, acc, reg, close), None)
        }
        AddrMode::PostInc1 => (format!("{} ,{}+", mnemonic, reg), None),
        AddrMode::PostInc2 { .. } => {
            (format!("{} {},{}++{}", mnemonic, open, reg, close), None)
        }
        AddrMode::PreDec1 => (format!("{} ,-{}", mnemonic, reg), None),
        AddrMode::PreDec2 { .. } => {
            (format!("{} {},--{}{}", mnemonic, open, reg, close), None)
        }
        AddrMode::PcRel8 { .. } => {
            // Historical: read at i + i, as for the 16-bit constant offset.
            let offset = (bytes[i + i] as i8) as i16;
            let text = format!("{} {}{},PCR{}", mnemonic, open, offset, close);
            relative(offset, text)
        }
        AddrMode::PcRel16 { .. } => {
            let offset = BigEndian::read_i16(&bytes[i + 1..]);
            let text = format!("{} {}{},PCR{}", mnemonic, open, offset, close);
            relative(offset, text)
        }
        AddrMode::ExgTfr => {
            let reg1 = pair_regname(bytes[i] >> 4);
            let reg2 = pair_regname(bytes[i] & 0xf);
            (format!("{} {},{}", mnemonic, reg1, reg2), None)
        }
        AddrMode::PshPul => {
            // Bit 6 names the other stack pointer: U for PSHS/PULS, S for
            // PSHU/PULU.
            let other = if bytes[0] == 0x34 || bytes[0] == 0x35 { "U" } else { "S" };
            let names = ["CCR", "A", "B", "DPR", "X", "Y", other, "PC"];
            let mut text = format!("{} ", mnemonic);
            let mut empty = true;
            for (bit, name) in names.iter().enumerate() {
                if bytes[i] & (1 << bit) != 0 {
                    if !empty {
                        text.push(',');
                    }
                    text.push_str(name);
                    empty = false;
                }
            }
            (text, None)
        }
    }
}

//===========================================================================//
