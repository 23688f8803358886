//! Instruction decoding for the Zilog Z80.
//!
//! Z80 instructions are decoded by template substitution.  The opcode
//! selects a template string in which operand markers (`XXXXh`, `XXh`,
//! `+ddd`, `rrrr`) stand for values to be read from the instruction
//! stream.  The `DD`/`FD` prefixes re-decode the following opcode with
//! `HL` replaced by `IX` or `IY` (gaining a displacement operand for
//! memory forms), and the `CB`/`ED` prefixes open secondary opcode
//! groups.  The instruction length falls out of the finished template:
//! one byte per prefix and opcode, plus the width of each marker.

use byteorder::{ByteOrder, LittleEndian};
use std::mem;

//===========================================================================//

#[rustfmt::skip]
static OPCODES_Z80: [&str; 256] = [
    "NOP",           "LD BC,XXXXh",  "LD (BC),A",     "INC BC",
    "INC B",         "DEC B",        "LD B,XXh",      "RLCA",
    "EX AF,AF'",     "ADD HL,BC",    "LD A,(BC)",     "DEC BC",
    "INC C",         "DEC C",        "LD C,XXh",      "RRCA",
    "DJNZ rrrr",     "LD DE,XXXXh",  "LD (DE),A",     "INC DE",
    "INC D",         "DEC D",        "LD D,XXh",      "RLA",
    "JR rrrr",       "ADD HL,DE",    "LD A,(DE)",     "DEC DE",
    "INC E",         "DEC E",        "LD E,XXh",      "RRA",
    "JR NZ,rrrr",    "LD HL,XXXXh",  "LD (XXXXh),HL", "INC HL",
    "INC H",         "DEC H",        "LD H,XXh",      "DAA",
    "JR Z,rrrr",     "ADD HL,HL",    "LD HL,(XXXXh)", "DEC HL",
    "INC L",         "DEC L",        "LD L,XXh",      "CPL",
    "JR NC,rrrr",    "LD SP,XXXXh",  "LD (XXXXh),A",  "INC SP",
    "INC (HL)",      "DEC (HL)",     "LD (HL),XXh",   "SCF",
    "JR C,rrrr",     "ADD HL,SP",    "LD A,(XXXXh)",  "DEC SP",
    "INC A",         "DEC A",        "LD A,XXh",      "CCF",
    "LD B,B",        "LD B,C",       "LD B,D",        "LD B,E",
    "LD B,H",        "LD B,L",       "LD B,(HL)",     "LD B,A",
    "LD C,B",        "LD C,C",       "LD C,D",        "LD C,E",
    "LD C,H",        "LD C,L",       "LD C,(HL)",     "LD C,A",
    "LD D,B",        "LD D,C",       "LD D,D",        "LD D,E",
    "LD D,H",        "LD D,L",       "LD D,(HL)",     "LD D,A",
    "LD E,B",        "LD E,C",       "LD E,D",        "LD E,E",
    "LD E,H",        "LD E,L",       "LD E,(HL)",     "LD E,A",
    "LD H,B",        "LD H,C",       "LD H,D",        "LD H,E",
    "LD H,H",        "LD H,L",       "LD H,(HL)",     "LD H,A",
    "LD L,B",        "LD L,C",       "LD L,D",        "LD L,E",
    "LD L,H",        "LD L,L",       "LD L,(HL)",     "LD L,A",
    "LD (HL),B",     "LD (HL),C",    "LD (HL),D",     "LD (HL),E",
    "LD (HL),H",     "LD (HL),L",    "HALT",          "LD (HL),A",
    "LD A,B",        "LD A,C",       "LD A,D",        "LD A,E",
    "LD A,H",        "LD A,L",       "LD A,(HL)",     "LD A,A",
    "ADD B",         "ADD C",        "ADD D",         "ADD E",
    "ADD H",         "ADD L",        "ADD (HL)",      "ADD A",
    "ADC B",         "ADC C",        "ADC D",         "ADC E",
    "ADC H",         "ADC L",        "ADC (HL)",      "ADC A",
    "SUB B",         "SUB C",        "SUB D",         "SUB E",
    "SUB H",         "SUB L",        "SUB (HL)",      "SUB A",
    "SBC B",         "SBC C",        "SBC D",         "SBC E",
    "SBC H",         "SBC L",        "SBC (HL)",      "SBC A",
    "AND B",         "AND C",        "AND D",         "AND E",
    "AND H",         "AND L",        "AND (HL)",      "AND A",
    "XOR B",         "XOR C",        "XOR D",         "XOR E",
    "XOR H",         "XOR L",        "XOR (HL)",      "XOR A",
    "OR B",          "OR C",         "OR D",          "OR E",
    "OR H",          "OR L",         "OR (HL)",       "OR A",
    "CP B",          "CP C",         "CP D",          "CP E",
    "CP H",          "CP L",         "CP (HL)",       "CP A",
    "RET NZ",        "POP BC",       "JP NZ,XXXXh",   "JP XXXXh",
    "CALL NZ,XXXXh", "PUSH BC",      "ADD XXh",       "RST 00h",
    "RET Z",         "RET",          "JP Z,XXXXh",    "extCB",
    "CALL Z,XXXXh",  "CALL XXXXh",   "ADC XXh",       "RST 08h",
    "RET NC",        "POP DE",       "JP NC,XXXXh",   "OUT (XXh),A",
    "CALL NC,XXXXh", "PUSH DE",      "SUB XXh",       "RST 10h",
    "RET C",         "EXX",          "JP C,XXXXh",    "IN A,(XXh)",
    "CALL C,XXXXh",  "extDD",        "SBC XXh",       "RST 18h",
    "RET PO",        "POP HL",       "JP PO,XXXXh",   "EX (SP),HL",
    "CALL PO,XXXXh", "PUSH HL",      "AND XXh",       "RST 20h",
    "RET PE",        "JP (HL)",      "JP PE,XXXXh",   "EX DE,HL",
    "CALL PE,XXXXh", "extED",        "XOR XXh",       "RST 28h",
    "RET P",         "POP AF",       "JP P,XXXXh",    "DI",
    "CALL P,XXXXh",  "PUSH AF",      "OR XXh",        "RST 30h",
    "RET M",         "LD SP,HL",     "JP M,XXXXh",    "EI",
    "CALL M,XXXXh",  "extFD",        "CP XXh",        "RST 38h",
];

// The rotate/shift/bit group templates already carry their separator, so
// a register name from LD_REGS can be appended directly.
#[rustfmt::skip]
static OPCODES_CB: [&str; 32] = [
    "RLC ",   "RRC ",   "RL ",    "RR ",
    "SLA ",   "SRA ",   "? ",     "SRL ",
    "BIT 0,", "BIT 1,", "BIT 2,", "BIT 3,",
    "BIT 4,", "BIT 5,", "BIT 6,", "BIT 7,",
    "RES 0,", "RES 1,", "RES 2,", "RES 3,",
    "RES 4,", "RES 5,", "RES 6,", "RES 7,",
    "SET 0,", "SET 1,", "SET 2,", "SET 3,",
    "SET 4,", "SET 5,", "SET 6,", "SET 7,",
];

// Slot 6 is the (HL) memory operand; the IN/OUT group has no register
// there.
static LD_REGS: [&str; 8] = ["B", "C", "D", "E", "H", "L", "(HL)", "A"];
static IO_REGS: [&str; 8] = ["B", "C", "D", "E", "H", "L", "?", "A"];
static LD_REGS16: [&str; 4] = ["BC", "DE", "HL", "SP"];

//===========================================================================//

/// One operand marker within an instruction template.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Slot {
    /// `XXXXh`: a 16-bit little-endian value, shown as hex.
    Word,
    /// `XXh`: an 8-bit value, shown as hex.
    Byte,
    /// `+ddd`: a signed index displacement, shown with its sign.
    Disp,
    /// `rrrr`: a branch displacement, stored as target minus two.
    Rel,
}

impl Slot {
    /// Markers are tried in this order at each template position.
    const SCAN_ORDER: [Slot; 4] = [Slot::Word, Slot::Byte, Slot::Disp, Slot::Rel];

    fn marker(self) -> &'static str {
        match self {
            Slot::Word => "XXXXh",
            Slot::Byte => "XXh",
            Slot::Disp => "+ddd",
            Slot::Rel => "rrrr",
        }
    }

    fn operand_size(self) -> usize {
        match self {
            Slot::Word => 2,
            Slot::Byte | Slot::Disp | Slot::Rel => 1,
        }
    }
}

/// An instruction template, split into literal text and operand slots.
#[derive(Debug)]
struct Template {
    pieces: Vec<Piece>,
}

#[derive(Debug)]
enum Piece {
    Literal(String),
    Operand(Slot),
}

impl Template {
    fn parse(text: &str) -> Template {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut rest = text;
        while !rest.is_empty() {
            let slot = Slot::SCAN_ORDER.iter().find_map(|&slot| {
                rest.strip_prefix(slot.marker()).map(|tail| (slot, tail))
            });
            match slot {
                Some((slot, tail)) => {
                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(mem::take(&mut literal)));
                    }
                    pieces.push(Piece::Operand(slot));
                    rest = tail;
                }
                None => {
                    let mut chars = rest.chars();
                    literal.extend(chars.next());
                    rest = chars.as_str();
                }
            }
        }
        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }
        Template { pieces }
    }

    fn operand_bytes(&self) -> usize {
        self.pieces
            .iter()
            .map(|piece| match piece {
                Piece::Literal(_) => 0,
                &Piece::Operand(slot) => slot.operand_size(),
            })
            .sum()
    }

    /// Substitutes operand values into the template.  Operands appear in
    /// the instruction stream in the same left-to-right order as in the
    /// text, so a single advancing index covers both of the two-operand
    /// forms.
    fn render(&self, addr: u32, bytes: &[u8]) -> (String, Option<u32>) {
        let mut text = String::new();
        let mut target = None;
        let mut index = operand_index(bytes);
        for piece in self.pieces.iter() {
            let slot = match piece {
                Piece::Literal(literal) => {
                    text.push_str(literal);
                    continue;
                }
                &Piece::Operand(slot) => slot,
            };
            match slot {
                Slot::Word => {
                    let value = LittleEndian::read_u16(&bytes[index..]);
                    text.push_str(&format!("{:04X}h", value));
                }
                Slot::Byte => {
                    text.push_str(&format!("{:02X}h", bytes[index]));
                }
                Slot::Disp => {
                    let disp = bytes[index] as i8;
                    text.push_str(&format!("{:+}", disp));
                }
                Slot::Rel => {
                    // The stored byte is the target minus two relative to
                    // the instruction address; assemblers write the operand
                    // relative to the instruction itself, so adjust.
                    let offset = (bytes[index] as i8).wrapping_add(2);
                    text.push_str(&format!("{}", offset));
                    target = Some(addr.wrapping_add(offset as u32));
                }
            }
            index += slot.operand_size();
        }
        (text, target)
    }
}

/// Returns the buffer index of the first operand byte.  The `DD`/`FD`
/// `CB` subgroup gets no extra step for its `CB` byte: there the
/// displacement precedes the final opcode byte.
fn operand_index(bytes: &[u8]) -> usize {
    match bytes[0] {
        0xcb | 0xed | 0xdd | 0xfd => 2,
        _ => 1,
    }
}

//===========================================================================//

/// Rewrites the first `HL` in a template as `IX` or `IY`.  A
/// parenthesized `(HL)` is a memory operand and gains a displacement
/// marker, except in `JP (HL)`, which loads `PC` from the register
/// itself.  Templates without `HL` pass through unchanged.
fn hl_to_index(tmpl: &str, opc: u8, prefix: u8) -> String {
    let Some(pos) = tmpl.find("HL") else {
        return tmpl.to_string();
    };
    let mut out = String::with_capacity(tmpl.len() + 4);
    out.push_str(&tmpl[..pos]);
    out.push_str(if prefix == 0xdd { "IX" } else { "IY" });
    if pos > 0 && tmpl.as_bytes()[pos - 1] == b'(' && opc != 0xe9 {
        out.push_str("+ddd");
    }
    out.push_str(&tmpl[pos + 2..]);
    out
}

/// Builds the template for the `ED` opcode group.
fn ed_template(opc: u8) -> String {
    let reg16 = LD_REGS16[((opc >> 4) & 3) as usize];
    if opc & 0b1100_1111 == 0b0100_1011 {
        return format!("LD {},(XXXXh)", reg16);
    }
    if opc & 0b1100_1111 == 0b0100_0011 {
        return format!("LD (XXXXh),{}", reg16);
    }
    if opc & 0b1100_1111 == 0b0100_1010 {
        return format!("ADC HL,{}", reg16);
    }
    if opc & 0b1100_1111 == 0b0100_0010 {
        return format!("SBC HL,{}", reg16);
    }
    if opc & 0b1100_0111 == 0b0100_0000 {
        let reg = match (opc >> 3) & 7 {
            6 => "Flags",
            reg => IO_REGS[reg as usize],
        };
        return format!("IN {},(C)", reg);
    }
    if opc & 0b1100_0111 == 0b0100_0001 {
        return format!("OUT (C),{}", IO_REGS[((opc >> 3) & 7) as usize]);
    }
    let name = match opc {
        0x57 => "LD A,I",
        0x5f => "LD A,R",
        0x47 => "LD I,A",
        0x4f => "LD R,A",
        0xa0 => "LDI",
        0xb0 => "LDIR",
        0xa8 => "LDD",
        0xb8 => "LDDR",
        0xa1 => "CPI",
        0xb1 => "CPIR",
        0xa9 => "CPD",
        0xb9 => "CPDR",
        0x44 => "NEG",
        0x46 => "IM 0",
        0x56 => "IM 1",
        0x5e => "IM 2",
        0x6f => "RLD",
        0x67 => "RRD",
        0x4d => "RETI",
        0x45 => "RETN",
        0xa2 => "INI",
        0xb2 => "INIR",
        0xaa => "IND",
        0xba => "INDR",
        0xa3 => "OUTI",
        0xb3 => "OUTIR",
        0xab => "OUTD",
        0xbb => "OTDR",
        _ => "?",
    };
    name.to_string()
}

/// Derives the instruction template from the bytes fetched so far, or
/// returns `None` if the prefix bytes seen don't yet pin it down.
fn template(bytes: &[u8]) -> Option<Template> {
    let &opc = bytes.first()?;
    if opc == 0xdd || opc == 0xfd {
        let &op2 = bytes.get(1)?;
        if op2 == 0xcb {
            let &op4 = bytes.get(3)?;
            let base = format!(
                "{}{}",
                OPCODES_CB[((op4 >> 3) & 0x1f) as usize],
                LD_REGS[(op4 & 7) as usize]
            );
            return Some(Template::parse(&hl_to_index(&base, op4, opc)));
        }
        // The prefix substitutes IX or IY for HL in the base instruction.
        // Bases without an HL decode as if unprefixed, including the
        // degenerate prefix-of-a-prefix forms, which complete as their
        // "ext" table entries.
        let base = if op2 & 0b1100_1111 == 0b0000_1001 {
            format!(
                "ADD I{},{}",
                if opc == 0xdd { 'X' } else { 'Y' },
                LD_REGS16[((op2 >> 4) & 3) as usize]
            )
        } else {
            OPCODES_Z80[op2 as usize].to_string()
        };
        return Some(Template::parse(&hl_to_index(&base, op2, opc)));
    }
    if opc == 0xcb {
        let &op2 = bytes.get(1)?;
        let text = format!(
            "{}{}",
            OPCODES_CB[((op2 >> 3) & 0x1f) as usize],
            LD_REGS[(op2 & 7) as usize]
        );
        return Some(Template::parse(&text));
    }
    if opc == 0xed {
        let &op2 = bytes.get(1)?;
        return Some(Template::parse(&ed_template(op2)));
    }
    Some(Template::parse(OPCODES_Z80[opc as usize]))
}

//===========================================================================//

/// Returns the instruction length, or `None` until enough prefix bytes
/// have arrived to determine it.  For the undocumented `DD CB`/`FD CB`
/// register forms the returned length is smaller than the number of
/// bytes needed to compute it, so those encodings never read as
/// complete.
pub(crate) fn bytes_required(bytes: &[u8]) -> Option<usize> {
    let template = template(bytes)?;
    let mut required = 1;
    if bytes[0] == 0xcb || bytes[0] == 0xed {
        required += 1;
    } else if bytes[0] == 0xdd || bytes[0] == 0xfd {
        required += 1;
        if bytes[1] == 0xcb {
            required += 1;
        }
    }
    Some(required + template.operand_bytes())
}

/// Renders a completed instruction.
pub(crate) fn format(addr: u32, bytes: &[u8]) -> (String, Option<u32>) {
    let Some(template) = template(bytes) else {
        return ("<?ADDRMODE?>".to_string(), None);
    };
    template.render(addr, bytes)
}

//===========================================================================//

#[cfg(test)]
mod tests {
    use super::{bytes_required, format};

    fn disassemble(code: &[u8]) -> String {
        disassemble_at(0x1000, code).0
    }

    fn disassemble_at(addr: u32, code: &[u8]) -> (String, Option<u32>) {
        let mut buffer = [0u8; 8];
        buffer[..code.len()].copy_from_slice(code);
        assert_eq!(bytes_required(code), Some(code.len()));
        format(addr, &buffer)
    }

    #[test]
    fn plain_opcodes_render_from_the_table() {
        assert_eq!(disassemble(&[0x00]), "NOP");
        assert_eq!(disassemble(&[0x76]), "HALT");
        assert_eq!(disassemble(&[0x08]), "EX AF,AF'");
        assert_eq!(disassemble(&[0x5c]), "LD E,H");
        assert_eq!(disassemble(&[0x97]), "SUB A");
    }

    #[test]
    fn word_operands_are_little_endian() {
        assert_eq!(disassemble(&[0xc3, 0x00, 0x80]), "JP 8000h");
        assert_eq!(disassemble(&[0x01, 0x34, 0x12]), "LD BC,1234h");
        assert_eq!(disassemble(&[0x22, 0xfe, 0xca]), "LD (CAFEh),HL");
        assert_eq!(disassemble(&[0xcc, 0x0d, 0xf0]), "CALL Z,F00Dh");
    }

    #[test]
    fn byte_operands_render_in_hex() {
        assert_eq!(disassemble(&[0x3e, 0x41]), "LD A,41h");
        assert_eq!(disassemble(&[0xd3, 0x7f]), "OUT (7Fh),A");
        assert_eq!(disassemble(&[0xc6, 0x0f]), "ADD 0Fh");
    }

    #[test]
    fn relative_jumps_adjust_the_stored_offset() {
        let (text, target) = disassemble_at(0x10a4, &[0x18, 0x00]);
        assert_eq!(text, "JR 2");
        assert_eq!(target, Some(0x10a6));

        let (text, target) = disassemble_at(0x1000, &[0x20, 0xfc]);
        assert_eq!(text, "JR NZ,-2");
        assert_eq!(target, Some(0x0ffe));

        let (text, target) = disassemble_at(0x1000, &[0x10, 0x05]);
        assert_eq!(text, "DJNZ 7");
        assert_eq!(target, Some(0x1007));

        // The plus-two adjustment wraps in eight bits.
        let (text, target) = disassemble_at(0x1000, &[0x18, 0x7f]);
        assert_eq!(text, "JR -127");
        assert_eq!(target, Some(0x0f81));
    }

    #[test]
    fn index_prefixes_substitute_hl() {
        assert_eq!(disassemble(&[0xdd, 0x5e, 0x05]), "LD E,(IX+5)");
        assert_eq!(disassemble(&[0xfd, 0x66, 0xf6]), "LD H,(IY-10)");
        assert_eq!(disassemble(&[0xdd, 0x75, 0x7f]), "LD (IX+127),L");
        assert_eq!(disassemble(&[0xdd, 0x34, 0x00]), "INC (IX+0)");
        assert_eq!(disassemble(&[0xdd, 0x21, 0x67, 0x45]), "LD IX,4567h");
        assert_eq!(disassemble(&[0xdd, 0x2a, 0x10, 0x20]), "LD IX,(2010h)");
        assert_eq!(disassemble(&[0xfd, 0xf9]), "LD SP,IY");
        assert_eq!(disassemble(&[0xdd, 0xe3]), "EX (SP),IX");
    }

    #[test]
    fn indexed_store_has_two_operands() {
        assert_eq!(disassemble(&[0xdd, 0x36, 0x0a, 0xa5]), "LD (IX+10),A5h");
    }

    #[test]
    fn jp_through_index_register_takes_no_displacement() {
        assert_eq!(disassemble(&[0xdd, 0xe9]), "JP (IX)");
        assert_eq!(disassemble(&[0xfd, 0xe9]), "JP (IY)");
    }

    #[test]
    fn add_to_index_register_substitutes_both_sides() {
        assert_eq!(disassemble(&[0xdd, 0x29]), "ADD IX,IX");
        assert_eq!(disassemble(&[0xfd, 0x09]), "ADD IY,BC");
        assert_eq!(disassemble(&[0xdd, 0x39]), "ADD IX,SP");
    }

    #[test]
    fn prefixed_bases_without_hl_decode_as_unprefixed() {
        assert_eq!(disassemble(&[0xdd, 0x00]), "NOP");
        assert_eq!(disassemble(&[0xfd, 0x47]), "LD B,A");
        assert_eq!(disassemble(&[0xdd, 0xdd]), "extDD");
        assert_eq!(disassemble(&[0xdd, 0xed]), "extED");
        assert_eq!(disassemble(&[0xdd, 0xfd]), "extFD");
    }

    #[test]
    fn bit_group_appends_the_register() {
        assert_eq!(disassemble(&[0xcb, 0x11]), "RL C");
        assert_eq!(disassemble(&[0xcb, 0x46]), "BIT 0,(HL)");
        assert_eq!(disassemble(&[0xcb, 0xff]), "SET 7,A");
        // Slot 6 of the shift group is unassigned.
        assert_eq!(disassemble(&[0xcb, 0x30]), "? B");
    }

    #[test]
    fn indexed_bit_group_reads_the_trailing_opcode() {
        assert_eq!(disassemble(&[0xdd, 0xcb, 0x0a, 0x06]), "RLC (IX+10)");
        assert_eq!(disassemble(&[0xfd, 0xcb, 0x00, 0x76]), "BIT 6,(IY+0)");
        assert_eq!(disassemble(&[0xdd, 0xcb, 0x80, 0xc6]), "SET 0,(IX-128)");
    }

    #[test]
    fn undocumented_indexed_bit_forms_never_read_as_complete() {
        // A register form under DD CB reports a length shorter than the
        // four bytes needed to see it, so the decode can only end in
        // overflow.
        assert_eq!(bytes_required(&[0xdd, 0xcb, 0x00, 0x00]), Some(3));
    }

    #[test]
    fn ed_group_decodes() {
        assert_eq!(disassemble(&[0xed, 0x4b, 0x34, 0x12]), "LD BC,(1234h)");
        assert_eq!(disassemble(&[0xed, 0x53, 0x34, 0x12]), "LD (1234h),DE");
        assert_eq!(disassemble(&[0xed, 0x5a]), "ADC HL,DE");
        assert_eq!(disassemble(&[0xed, 0x42]), "SBC HL,BC");
        assert_eq!(disassemble(&[0xed, 0x48]), "IN C,(C)");
        assert_eq!(disassemble(&[0xed, 0x70]), "IN Flags,(C)");
        assert_eq!(disassemble(&[0xed, 0x61]), "OUT (C),H");
        assert_eq!(disassemble(&[0xed, 0x71]), "OUT (C),?");
        assert_eq!(disassemble(&[0xed, 0x44]), "NEG");
        assert_eq!(disassemble(&[0xed, 0x57]), "LD A,I");
        assert_eq!(disassemble(&[0xed, 0xb0]), "LDIR");
        assert_eq!(disassemble(&[0xed, 0xb3]), "OUTIR");
        assert_eq!(disassemble(&[0xed, 0xbb]), "OTDR");
        assert_eq!(disassemble(&[0xed, 0x77]), "?");
    }

    #[test]
    fn prefixes_alone_leave_the_length_open() {
        assert_eq!(bytes_required(&[0xcb]), None);
        assert_eq!(bytes_required(&[0xed]), None);
        assert_eq!(bytes_required(&[0xdd]), None);
        assert_eq!(bytes_required(&[0xfd]), None);
        assert_eq!(bytes_required(&[0xdd, 0xcb]), None);
        assert_eq!(bytes_required(&[0xdd, 0xcb, 0x0a]), None);
    }
}
