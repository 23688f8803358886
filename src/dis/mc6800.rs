//! Instruction decoding for the Motorola 6800.
//!
//! The 6800 encodes its addressing mode in the opcode's column, so both the
//! mode and the instruction length are known from the first byte.  The
//! classification below is deliberately incomplete in the same way the
//! hardware's is: an undefined opcode still classifies to its column's mode
//! and renders the `"?"` mnemonic.

use byteorder::{BigEndian, ByteOrder};

//===========================================================================//

#[rustfmt::skip]
static OPCODES_6800: [&str; 256] = [
    "?",    "NOP",  "?",    "?",    "?",    "?",    "TAP",  "TPA",
    "INX",  "DEX",  "CLV",  "SEV",  "CLC",  "SEC",  "CLI",  "SEI",
    "SBA",  "CBA",  "?",    "?",    "?",    "?",    "TAB",  "TBA",
    "?",    "DAA",  "?",    "ABA",  "?",    "?",    "?",    "?",
    "BRA",  "?",    "BHI",  "BLS",  "BCC",  "BCS",  "BNE",  "BEQ",
    "BVC",  "BVS",  "BPL",  "BMI",  "BGE",  "BLT",  "BGT",  "BLE",
    "TSX",  "INS",  "PULA", "PULB", "DES",  "TXS",  "PSHA", "PSHB",
    "?",    "RTS",  "?",    "RTI",  "?",    "?",    "WAI",  "SWI",
    "NEGA", "?",    "?",    "COMA", "LSRA", "?",    "RORA", "ASRA",
    "ASLA", "ROLA", "DECA", "?",    "INCA", "TSTA", "?",    "CLRA",
    "NEGB", "?",    "?",    "COMB", "LSRB", "?",    "RORB", "ASRB",
    "ASLB", "ROLB", "DECB", "?",    "INCB", "TSTB", "?",    "CLRB",
    "NEG",  "?",    "?",    "COM",  "LSR",  "?",    "ROR",  "ASR",
    "ASL",  "ROL",  "DEC",  "?",    "INC",  "TST",  "JMP",  "CLR",
    "NEG",  "?",    "?",    "COM",  "LSR",  "?",    "ROR",  "ASR",
    "ASL",  "ROL",  "DEC",  "?",    "INC",  "TST",  "JMP",  "CLR",
    "SUBA", "CMPA", "SBCA", "?",    "ANDA", "BITA", "LDAA", "?",
    "EORA", "ADCA", "ORAA", "ADDA", "CPX",  "BSR",  "LDS",  "?",
    "SUBA", "CMPA", "SBCA", "?",    "ANDA", "BITA", "LDAA", "STAA",
    "EORA", "ADCA", "ORAA", "ADDA", "CPX",  "?",    "LDS",  "STS",
    "SUBA", "CMPA", "SBCA", "?",    "ANDA", "BITA", "LDAA", "STAA",
    "EORA", "ADCA", "ORAA", "ADDA", "CPX",  "JSR",  "LDS",  "STS",
    "SUBA", "CMPA", "SBCA", "?",    "ANDA", "BITA", "LDAA", "STAA",
    "EORA", "ADCA", "ORAA", "ADDA", "CPX",  "JSR",  "LDS",  "STS",
    "SUBB", "CMPB", "SBCB", "?",    "ANDB", "BITB", "LDAB", "?",
    "EORB", "ADCB", "ORAB", "ADDB", "?",    "?",    "LDX",  "?",
    "SUBB", "CMPB", "SBCB", "?",    "ANDB", "BITB", "LDAB", "STAB",
    "EORB", "ADCB", "ORAB", "ADDB", "?",    "?",    "LDX",  "STX",
    "SUBB", "CMPB", "SBCB", "?",    "ANDB", "BITB", "LDAB", "STAB",
    "EORB", "ADCB", "ORAB", "ADDB", "?",    "?",    "LDX",  "STX",
    "SUBB", "CMPB", "SBCB", "?",    "ANDB", "BITB", "LDAB", "STAB",
    "EORB", "ADCB", "ORAB", "ADDB", "?",    "?",    "LDX",  "STX",
];

//===========================================================================//

/// The addressing modes of the 6800.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum AddrMode {
    /// No operand bytes.
    Inherent,
    /// One signed displacement byte, branch-relative to the next
    /// instruction.
    Relative,
    /// One unsigned offset byte applied to the X register.
    Indexed,
    /// A 16-bit big-endian absolute address.
    Extended,
    /// An 8-bit zero-page address.
    Direct,
    /// An 8-bit immediate value.
    Imm8,
    /// A 16-bit big-endian immediate value.
    Imm16,
}

impl AddrMode {
    /// Classifies an opcode by its column in the opcode map.
    fn from_opcode(opcode: u8) -> AddrMode {
        match opcode {
            // BSR and the two 16-bit loads break their columns' patterns.
            0x8d => AddrMode::Relative,
            0x8e | 0xce => AddrMode::Imm16,
            0x00..=0x1f | 0x30..=0x5f => AddrMode::Inherent,
            0x20..=0x2f => AddrMode::Relative,
            0x60..=0x6f | 0xa0..=0xaf | 0xe0..=0xef => AddrMode::Indexed,
            0x70..=0x7f | 0xb0..=0xbf | 0xf0..=0xff => AddrMode::Extended,
            0x80..=0x8f | 0xc0..=0xcf => AddrMode::Imm8,
            0x90..=0x9f | 0xd0..=0xdf => AddrMode::Direct,
        }
    }

    /// Returns the instruction length in bytes, opcode included.
    fn insn_length(self) -> usize {
        match self {
            AddrMode::Inherent => 1,
            AddrMode::Relative
            | AddrMode::Indexed
            | AddrMode::Direct
            | AddrMode::Imm8 => 2,
            AddrMode::Extended | AddrMode::Imm16 => 3,
        }
    }
}

//===========================================================================//

/// Returns the instruction length.  Always known from the first byte.
pub(crate) fn bytes_required(bytes: &[u8]) -> Option<usize> {
    let &opcode = bytes.first()?;
    Some(AddrMode::from_opcode(opcode).insn_length())
}

/// Renders a completed instruction.
pub(crate) fn format(addr: u32, bytes: &[u8]) -> (String, Option<u32>) {
    let Some(&opcode) = bytes.first() else {
        return ("<?ADDRMODE?>".to_string(), None);
    };
    let mnemonic = OPCODES_6800[opcode as usize];
    match AddrMode::from_opcode(opcode) {
        AddrMode::Inherent => (mnemonic.to_string(), None),
        AddrMode::Relative => {
            let offset = bytes[1] as i8;
            let target = addr.wrapping_add(2).wrapping_add(offset as u32);
            (format!("{} {}", mnemonic, offset), Some(target))
        }
        AddrMode::Indexed => (format!("{} {},X", mnemonic, bytes[1]), None),
        AddrMode::Extended => {
            let value = BigEndian::read_u16(&bytes[1..]);
            (format!("{} ${:04X}", mnemonic, value), None)
        }
        AddrMode::Direct => (format!("{} ${:02X}", mnemonic, bytes[1]), None),
        AddrMode::Imm8 => (format!("{} #${:02X}", mnemonic, bytes[1]), None),
        AddrMode::Imm16 => {
            let value = BigEndian::read_u16(&bytes[1..]);
            (format!("{} #${:04X}", mnemonic, value), None)
        }
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{bytes_required, format};

    fn disassemble(code: &[u8]) -> String {
        let mut buffer = [0u8; 8];
        buffer[..code.len()].copy_from_slice(code);
        assert_eq!(bytes_required(code), Some(code.len()));
        format(0x1000, &buffer).0
    }

    #[test]
    fn inherent_opcodes_render_bare() {
        assert_eq!(disassemble(&[0x01]), "NOP");
        assert_eq!(disassemble(&[0x07]), "TPA");
        assert_eq!(disassemble(&[0x3f]), "SWI");
        assert_eq!(disassemble(&[0x4f]), "CLRA");
        assert_eq!(disassemble(&[0x00]), "?");
    }

    #[test]
    fn branches_resolve_relative_to_next_insn() {
        let (text, target) = format(0x1000, &[0x20, 0x10, 0, 0, 0, 0, 0, 0]);
        assert_eq!(text, "BRA 16");
        assert_eq!(target, Some(0x1012));

        let (text, target) = format(0x1000, &[0x8d, 0xf6, 0, 0, 0, 0, 0, 0]);
        assert_eq!(text, "BSR -10");
        assert_eq!(target, Some(0x0ff8));
    }

    #[test]
    fn indexed_offsets_are_unsigned() {
        assert_eq!(disassemble(&[0x6d, 0xff]), "TST 255,X");
        assert_eq!(disassemble(&[0xa6, 0x00]), "LDAA 0,X");
        assert_eq!(disassemble(&[0xe7, 0x10]), "STAB 16,X");
    }

    #[test]
    fn direct_extended_and_immediate_render_hex() {
        assert_eq!(disassemble(&[0x96, 0x80]), "LDAA $80");
        assert_eq!(disassemble(&[0xd7, 0x12]), "STAB $12");
        assert_eq!(disassemble(&[0x7e, 0xf0, 0x00]), "JMP $F000");
        assert_eq!(disassemble(&[0xb7, 0x01, 0x23]), "STAA $0123");
        assert_eq!(disassemble(&[0x86, 0x41]), "LDAA #$41");
        assert_eq!(disassemble(&[0x8e, 0x12, 0x34]), "LDS #$1234");
        assert_eq!(disassemble(&[0xce, 0xbe, 0xef]), "LDX #$BEEF");
    }
}
