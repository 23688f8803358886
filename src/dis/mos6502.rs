//! Instruction decoding for the MOS 6502 and WDC 65C02.
//!
//! The 6502 family has no multi-byte opcodes, so the instruction length is
//! always known from the first byte.  Each table entry is a display template
//! whose operand marker doubles as the length descriptor:
//!
//! * `nn` - one operand byte, substituted in hex
//! * `nnnn` - two operand bytes (little-endian), substituted in hex
//! * `rrrr` - one operand byte, a signed branch displacement, substituted in
//!   decimal; also resolves the branch target address

use byteorder::{ByteOrder, LittleEndian};

//===========================================================================//

/// A 6502-family opcode table: one display template per opcode.
pub(crate) type Opcodes = [&'static str; 256];

/// Display templates for the WDC 65C02.
#[rustfmt::skip]
pub(crate) static OPCODES_65C02: Opcodes = [
    "BRK",       "ORA ($nn,X)", "?",         "?",   "TSB $nn",     "ORA $nn",     "ASL $nn",     "RMB0 $nn",
    "PHP",       "ORA #$nn",    "ASLA",      "?",   "TSB $nnnn",   "ORA $nnnn",   "ASL $nnnn",   "BBR0 $nn",
    "BPL rrrr",  "ORA ($nn),Y", "ORA ($nn)", "?",   "TRB $nn",     "ORA $nn,X",   "ASL $nn,X",   "RMB1 $nn",
    "CLC",       "ORA $nnnn,Y", "INCA",      "?",   "TRB $nnnn",   "ORA $nnnn,X", "ASL $nnnn,X", "BBR1 $nn",
    "JSR $nnnn", "AND ($nn,X)", "?",         "?",   "BIT $nn",     "AND $nn",     "ROL $nn",     "RMB2 $nn",
    "PLP",       "AND #$nn",    "ROLA",      "?",   "BIT $nnnn",   "AND $nnnn",   "ROL $nnnn",   "BBR2 $nn",
    "BMI rrrr",  "AND ($nn),Y", "AND ($nn)", "?",   "BIT $nn,X",   "AND $nn,X",   "ROL $nn,X",   "RMB3 $nn",
    "SEC",       "AND $nnnn,Y", "DECA",      "?",   "BIT $nn,X",   "AND $nnnn,X", "ROL $nnnn,X", "BBR3 $nn",
    "RTI",       "EOR ($nn,X)", "?",         "?",   "?",           "EOR $nn",     "LSR $nn",     "RMB4 $nn",
    "PHA",       "EOR #$nn",    "LSRA",      "?",   "JMP $nnnn",   "EOR $nnnn",   "LSR $nnnn",   "BBR4 $nn",
    "BVC rrrr",  "EOR ($nn),Y", "EOR ($nn)", "?",   "?",           "EOR $nn,X",   "LSR $nn,X",   "RMB5 $nn",
    "CLI",       "EOR $nnnn,Y", "PHY",       "?",   "?",           "EOR $nnnn,X", "LSR $nnnn,X", "BBR5 $nn",
    "RTS",       "ADC ($nn,X)", "?",         "?",   "STZ $nn",     "ADC $nn",     "ROR $nn",     "RMB6 $nn",
    "PLA",       "ADC #$nn",    "RORA",      "?",   "JMP ($nnnn)", "ADC $nnnn",   "ROR $nnnn",   "BBR6 $nn",
    "BVS rrrr",  "ADC ($nn),Y", "ADC ($nn)", "?",   "STZ $nn,X",   "ADC $nn,X",   "ROR $nn,X",   "RMB7 $nn",
    "SEI",       "ADC $nnnn,Y", "PLY",       "?",   "JMP ($nn,X)", "ADC $nnnn,X", "ROR $nnnn,X", "BBR7 $nn",
    "BRA rrrr",  "STA ($nn,X)", "?",         "?",   "STY $nn",     "STA $nn",     "STX $nn",     "SMB0 $nn",
    "DEY",       "BIT #$nn",    "TXA",       "?",   "STY $nnnn",   "STA $nnnn",   "STX $nnnn",   "BBS0 $nn",
    "BCC rrrr",  "STA ($nn),Y", "STA ($nn)", "?",   "STY $nn,X",   "STA $nn,X",   "STX ($nn),Y", "SMB1 $nn",
    "TYA",       "STA $nnnn,Y", "TXS",       "?",   "STZ $nn",     "STA $nnnn,X", "STZ $nn,X",   "BBS1 $nn",
    "LDY #$nn",  "LDA ($nn,X)", "LDX #$nn",  "?",   "LDY $nn",     "LDA $nnnn",   "LDX $nn",     "SMB2 $nn",
    "TAY",       "LDA #$nn",    "TAX",       "?",   "LDY $nnnn",   "LDA $nnnn",   "LDX $nnnn",   "BBS2 $nn",
    "BCS rrrr",  "LDA ($nn),Y", "LDA ($nn)", "?",   "LDY $nn,X",   "LDA $nn,X",   "LDX ($nn),Y", "SMB3 $nn",
    "CLV",       "LDA $nnnn,Y", "TSX",       "?",   "LDY $nnnn,X", "LDA $nnnn,X", "LDX $nnnn,Y", "BBS3 $nn",
    "CPY #$nn",  "CMP ($nn,X)", "?",         "?",   "CPY $nnnn",   "CMP $nnnn",   "DEC $nnnn",   "SMB4 $nn",
    "INY",       "CMP #$nn",    "DEX",       "WAI", "CPY $nn",     "CMP $nn",     "DEC $nn",     "BBS4 $nn",
    "BNE rrrr",  "CMP ($nn),Y", "CMP ($nn)", "?",   "?",           "CMP $nn,X",   "DEC $nn,X",   "SMB5 $nn",
    "CLD",       "CMP $nnnn,Y", "PHX",       "STP", "?",           "CMP $nnnn,X", "DEC $nnnn,X", "BBS5 $nn",
    "CPX #$nn",  "SBC ($nn,X)", "?",         "?",   "CPX $nn",     "SBC $nn",     "INC $nn",     "SMB6 $nn",
    "INX",       "SBC #$nn",    "NOP",       "?",   "CPX $nnnn",   "SBC $nnnn",   "INC $nnnn",   "BBS6 $nn",
    "BEQ rrrr",  "SBC ($nn),Y", "SBC ($nn)", "?",   "?",           "SBC $nn,X",   "INC $nn,X",   "SMB7 $nn",
    "SED",       "SBC $nnnn,Y", "PLX",       "?",   "?",           "SBC $nnnn,X", "INC $nnnn,X", "BBS7 $nn",
];

/// Display templates for the original NMOS 6502.
#[rustfmt::skip]
pub(crate) static OPCODES_6502: Opcodes = [
    "BRK",       "ORA ($nn,X)", "?",        "?", "?",           "ORA $nn",     "ASL $nn",     "?",
    "PHP",       "ORA #$nn",    "ASLA",     "?", "?",           "ORA $nnnn",   "ASL $nnnn",   "?",
    "BPL rrrr",  "ORA ($nn),Y", "?",        "?", "?",           "ORA $nn,X",   "ASL $nn,X",   "?",
    "CLC",       "ORA $nnnn,Y", "?",        "?", "?",           "ORA $nnnn,X", "ASL $nnnn,X", "?",
    "JSR $nnnn", "AND ($nn,X)", "?",        "?", "BIT $nn",     "AND $nn",     "ROL $nn",     "?",
    "PLP",       "AND #$nn",    "ROLA",     "?", "BIT $nnnn",   "AND $nnnn",   "ROL $nnnn",   "?",
    "BMI rrrr",  "AND ($nn),Y", "?",        "?", "?",           "AND $nn,X",   "ROL $nn,X",   "?",
    "SEC",       "AND $nnnn,Y", "?",        "?", "?",           "AND $nnnn,X", "ROL $nnnn,X", "?",
    "RTI",       "EOR ($nn,X)", "?",        "?", "?",           "EOR nn",      "LSR $nn",     "?",
    "PHA",       "EOR #$nn",    "LSRA",     "?", "JMP $nnnn",   "EOR $nnnn",   "LSR $nnnn",   "?",
    "BVC rrrr",  "EOR ($nn),Y", "?",        "?", "?",           "EOR $nn,X",   "LSR $nn,X",   "?",
    "CLI",       "EOR $nnnn,Y", "?",        "?", "?",           "EOR $nnnn,X", "LSR $nnnn,X", "?",
    "RTS",       "ADC ($nn,X)", "?",        "?", "?",           "ADC $nn",     "ROR $nn",     "?",
    "PLA",       "ADC #$nn",    "RORA",     "?", "JMP ($nnnn)", "ADC $nnnn",   "ROR $nnnn",   "?",
    "BVS rrrr",  "ADC ($nn),Y", "?",        "?", "?",           "ADC $nn,X",   "ROR $nn,X",   "?",
    "SEI",       "ADC $nnnn,Y", "?",        "?", "?",           "ADC $nnnn,X", "ROR $nnnn,X", "?",
    "?",         "STA ($nn,X)", "?",        "?", "STY $nn",     "STA $nn",     "STX $nn",     "?",
    "DEY",       "?",           "TXA",      "?", "STY $nnnn",   "STA $nnnn",   "STX $nnnn",   "?",
    "BCC rrrr",  "STA ($nn),Y", "?",        "?", "STY $nn,X",   "STA $nn,X",   "STX $nn,Y",   "?",
    "TYA",       "STA $nnnn,Y", "TXS",      "?", "?",           "STA $nnnn,X", "?",           "?",
    "LDY #$nn",  "LDA ($nn,X)", "LDX #$nn", "?", "LDY $nn",     "LDA $nn",     "LDX $nn",     "?",
    "TAY",       "LDA #$nn",    "TAX",      "?", "LDY $nnnn",   "LDA $nnnn",   "LDX $nnnn",   "?",
    "BCS rrrr",  "LDA ($nn),Y", "?",        "?", "LDY $nn,X",   "LDA $nn,X",   "LDX $nn,Y",   "?",
    "CLV",       "LDA $nnnn,Y", "TSX",      "?", "LDY $nnnn,X", "LDA $nnnn,X", "LDX $nnnn,Y", "?",
    "CPY #$nn",  "CMP ($nn,X)", "?",        "?", "CPY $nn",     "CMP $nn",     "DEC $nn",     "?",
    "INY",       "CMP #$nn",    "DEX",      "?", "CPY $nnnn",   "CMP $nnnn",   "DEC $nnnn",   "?",
    "BNE rrrr",  "CMP ($nn),Y", "?",        "?", "?",           "CMP $nn,X",   "DEC $nn,X",   "?",
    "CLD",       "CMP $nnnn,Y", "?",        "?", "?",           "CMP $nnnn,X", "DEC $nnnn,X", "?",
    "CPX #$nn",  "SBC ($nn,X)", "?",        "?", "CPX $nn",     "SBC $nn",     "INC $nn",     "?",
    "INX",       "SBC #$nn",    "NOP",      "?", "CPX $nnnn",   "SBC $nnnn",   "INC $nnnn",   "?",
    "BEQ rrrr",  "SBC ($nn),Y", "?",        "?", "?",           "SBC $nn,X",   "INC $nn,X",   "?",
    "SED",       "SBC $nnnn,Y", "?",        "?", "?",           "SBC $nnnn,X", "INC $nnnn,X", "?",
];

//===========================================================================//

/// Returns the instruction length implied by the opcode's template.  Always
/// known from the first byte.
pub(crate) fn bytes_required(opcodes: &Opcodes, bytes: &[u8]) -> Option<usize> {
    let &opcode = bytes.first()?;
    let template = opcodes[opcode as usize];
    if template.contains("nnnn") {
        Some(3)
    } else if template.contains("nn") {
        Some(2)
    } else if template.contains("rrrr") {
        Some(2)
    } else {
        Some(1)
    }
}

/// Renders a completed instruction by substituting the operand value into
/// the opcode's template.
pub(crate) fn format(
    opcodes: &Opcodes,
    addr: u32,
    bytes: &[u8],
) -> (String, Option<u32>) {
    let template = opcodes[bytes[0] as usize];
    if template.contains("nnnn") {
        let value = LittleEndian::read_u16(&bytes[1..]);
        (template.replacen("nnnn", &format!("{:04X}", value), 1), None)
    } else if template.contains("nn") {
        let text = template.replacen("nn", &format!("{:02X}", bytes[1]), 1);
        (text, None)
    } else if template.contains("rrrr") {
        let offset = bytes[1] as i8;
        let target = addr.wrapping_add(2).wrapping_add(offset as u32);
        (template.replacen("rrrr", &offset.to_string(), 1), Some(target))
    } else {
        (template.to_string(), None)
    }
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{OPCODES_6502, OPCODES_65C02, Opcodes, bytes_required, format};

    fn disassemble(opcodes: &Opcodes, code: &[u8]) -> String {
        let mut buffer = [0u8; 8];
        buffer[..code.len()].copy_from_slice(code);
        assert_eq!(bytes_required(opcodes, code), Some(code.len()));
        format(opcodes, 0x1000, &buffer).0
    }

    #[test]
    fn length_follows_template_marker() {
        assert_eq!(bytes_required(&OPCODES_6502, &[0x00]), Some(1));
        assert_eq!(bytes_required(&OPCODES_6502, &[0x05]), Some(2));
        assert_eq!(bytes_required(&OPCODES_6502, &[0x0d]), Some(3));
        assert_eq!(bytes_required(&OPCODES_6502, &[0x10]), Some(2));
        assert_eq!(bytes_required(&OPCODES_6502, &[0x02]), Some(1));
    }

    #[test]
    fn implied_and_unknown_render_verbatim() {
        assert_eq!(disassemble(&OPCODES_6502, &[0x00]), "BRK");
        assert_eq!(disassemble(&OPCODES_6502, &[0xea]), "NOP");
        assert_eq!(disassemble(&OPCODES_6502, &[0x02]), "?");
        assert_eq!(disassemble(&OPCODES_6502, &[0x0a]), "ASLA");
    }

    #[test]
    fn byte_operands_render_in_hex() {
        assert_eq!(disassemble(&OPCODES_6502, &[0x05, 0x20]), "ORA $20");
        assert_eq!(disassemble(&OPCODES_6502, &[0xa9, 0xff]), "LDA #$FF");
        assert_eq!(disassemble(&OPCODES_6502, &[0x01, 0x0c]), "ORA ($0C,X)");
        assert_eq!(disassemble(&OPCODES_6502, &[0x91, 0x3b]), "STA ($3B),Y");
    }

    #[test]
    fn word_operands_render_little_endian() {
        assert_eq!(disassemble(&OPCODES_6502, &[0xac, 0x00, 0x30]), "LDY $3000");
        assert_eq!(disassemble(&OPCODES_6502, &[0x20, 0x34, 0x12]), "JSR $1234");
        assert_eq!(
            disassemble(&OPCODES_6502, &[0xbd, 0xcd, 0xab]),
            "LDA $ABCD,X"
        );
    }

    #[test]
    fn branches_render_signed_decimal_and_resolve() {
        let (text, target) =
            format(&OPCODES_6502, 0x1006, &[0x10, 0x10, 0, 0, 0, 0, 0, 0]);
        assert_eq!(text, "BPL 16");
        assert_eq!(target, Some(0x1018));

        let (text, target) =
            format(&OPCODES_6502, 0x1000, &[0xf0, 0xfe, 0, 0, 0, 0, 0, 0]);
        assert_eq!(text, "BEQ -2");
        assert_eq!(target, Some(0x1000));
    }

    #[test]
    fn the_6502_table_quirks_are_preserved() {
        // These entries reproduce the tool's historical display strings.
        assert_eq!(disassemble(&OPCODES_6502, &[0x45, 0x10]), "EOR 10");
        assert_eq!(disassemble(&OPCODES_6502, &[0x80]), "?");
    }

    #[test]
    fn w65c02_additions_decode() {
        assert_eq!(disassemble(&OPCODES_65C02, &[0x80, 0x05]), "BRA 5");
        assert_eq!(disassemble(&OPCODES_65C02, &[0x12, 0x44]), "ORA ($44)");
        assert_eq!(disassemble(&OPCODES_65C02, &[0x64, 0x12]), "STZ $12");
        assert_eq!(disassemble(&OPCODES_65C02, &[0x07, 0x80]), "RMB0 $80");
        assert_eq!(disassemble(&OPCODES_65C02, &[0x8f, 0x80]), "BBS0 $80");
        assert_eq!(disassemble(&OPCODES_65C02, &[0xcb]), "WAI");
        assert_eq!(disassemble(&OPCODES_65C02, &[0xdb]), "STP");
        assert_eq!(disassemble(&OPCODES_65C02, &[0x89, 0x41]), "BIT #$41");
        // The table spells 0x7c as a two-byte form; preserved as-is.
        assert_eq!(disassemble(&OPCODES_65C02, &[0x7c, 0x42]), "JMP ($42,X)");
    }
}
