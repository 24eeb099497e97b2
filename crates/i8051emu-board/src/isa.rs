//! Instruction lengths, timings and mnemonics for the 8051 instruction set.
//!
//! Operands print the way the DSM-51 assembler listings do: direct and bit
//! addresses and jump targets in hex with an `h` suffix, immediates in
//! decimal with a `#` prefix.

use std::fmt::Write;

/// The one opcode the 8051 leaves undefined.
pub const RESERVED_OPCODE: u8 = 0xA5;

/// An instruction fetched from code memory. Unused argument bytes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub address: u16,
    pub opcode: u8,
    pub arg1: u8,
    pub arg2: u8,
}

impl Instruction {
    pub fn new(address: u16, bytes: [u8; 3]) -> Self {
        Self {
            address,
            opcode: bytes[0],
            arg1: bytes[1],
            arg2: bytes[2],
        }
    }

    pub fn len(&self) -> u8 {
        length(self.opcode)
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn cycles(&self) -> u8 {
        cycles(self.opcode)
    }

    pub fn is_reserved(&self) -> bool {
        self.opcode == RESERVED_OPCODE
    }

    /// Address of the following instruction.
    pub fn next(&self) -> u16 {
        self.address.wrapping_add(self.len() as u16)
    }

    /// Target of a relative jump whose offset is `rel`.
    pub fn relative(&self, rel: u8) -> u16 {
        self.next().wrapping_add(rel as i8 as u16)
    }

    /// Target of `AJMP`/`ACALL`: the low 11 bits come from the instruction,
    /// the rest from the following address.
    pub fn absolute(&self) -> u16 {
        (self.next() & 0xF800) | (((self.opcode as u16) & 0xE0) << 3) | self.arg1 as u16
    }

    pub fn long(&self) -> u16 {
        u16::from_be_bytes([self.arg1, self.arg2])
    }

    pub fn mnemonic(&self) -> String {
        mnemonic(self)
    }
}

/// Size in bytes of the instruction starting with `opcode`.
pub fn length(opcode: u8) -> u8 {
    match opcode {
        // AJMP / ACALL
        op if op & 0x1F == 0x01 || op & 0x1F == 0x11 => 2,
        0x02 | 0x12 | 0x10 | 0x20 | 0x30 | 0x43 | 0x53 | 0x63 | 0x75 | 0x85 | 0x90 => 3,
        0xB4..=0xBF | 0xD5 => 3,
        0x05 | 0x15 | 0x24 | 0x25 | 0x34 | 0x35 | 0x40 | 0x42 | 0x44 | 0x45 | 0x50 | 0x52
        | 0x54 | 0x55 | 0x60 | 0x62 | 0x64 | 0x65 | 0x70 | 0x72 | 0x74 | 0x80 | 0x82 | 0x86
        | 0x87 | 0x92 | 0x94 | 0x95 | 0xA0 | 0xA2 | 0xA6 | 0xA7 | 0xB0 | 0xB2 | 0xC0 | 0xC2
        | 0xC5 | 0xD0 | 0xD2 | 0xE5 | 0xF5 => 2,
        0x76..=0x7F | 0x88..=0x8F | 0xA8..=0xAF | 0xD8..=0xDF => 2,
        _ => 1,
    }
}

/// Machine cycles taken by the instruction starting with `opcode`.
pub fn cycles(opcode: u8) -> u8 {
    match opcode {
        0x84 | 0xA4 => 4,
        op if op & 0x1F == 0x01 || op & 0x1F == 0x11 => 2,
        0x02 | 0x12 | 0x10 | 0x20 | 0x30 | 0x22 | 0x32 | 0x40 | 0x50 | 0x60 | 0x70 | 0x80 => 2,
        0x43 | 0x53 | 0x63 | 0x72 | 0x73 | 0x75 | 0x82 | 0x83 | 0x85..=0x8F => 2,
        0x90 | 0x92 | 0x93 | 0xA0 | 0xA3 | 0xA6..=0xAF | 0xB0 | 0xB4..=0xBF => 2,
        0xC0 | 0xD0 | 0xD5 | 0xD8..=0xDF | 0xE0 | 0xE2 | 0xE3 | 0xF0 | 0xF2 | 0xF3 => 2,
        _ => 1,
    }
}

fn reg(opcode: u8) -> u8 {
    opcode & 0x07
}

fn ind(opcode: u8) -> u8 {
    opcode & 0x01
}

fn hex(value: impl Into<u32>) -> String {
    format!("{:X}h", value.into())
}

/// Render an instruction the way the DSM-51 listing does, e.g. `MOV R6, 0h`.
pub fn mnemonic(i: &Instruction) -> String {
    let op = i.opcode;
    let a1 = i.arg1;
    let a2 = i.arg2;

    // Families that share an operand pattern in the low bits.
    let alu = match op >> 4 {
        0x2 => Some("ADD"),
        0x3 => Some("ADDC"),
        0x4 => Some("ORL"),
        0x5 => Some("ANL"),
        0x6 => Some("XRL"),
        0x9 => Some("SUBB"),
        _ => None,
    };
    if let Some(name) = alu {
        match op & 0x0F {
            0x04 => return format!("{name} A, #{a1}"),
            0x05 => return format!("{name} A, {}", hex(a1)),
            0x06 | 0x07 => return format!("{name} A, @R{}", ind(op)),
            0x08..=0x0F => return format!("{name} A, R{}", reg(op)),
            _ => {}
        }
    }
    if op & 0x1F == 0x01 {
        return format!("AJMP {}", hex(i.absolute()));
    }
    if op & 0x1F == 0x11 {
        return format!("ACALL {}", hex(i.absolute()));
    }

    let mut out = String::new();
    let _ = match op {
        0x00 => write!(out, "NOP"),
        0x02 => write!(out, "LJMP {}", hex(i.long())),
        0x03 => write!(out, "RR A"),
        0x04 => write!(out, "INC A"),
        0x05 => write!(out, "INC {}", hex(a1)),
        0x06 | 0x07 => write!(out, "INC @R{}", ind(op)),
        0x08..=0x0F => write!(out, "INC R{}", reg(op)),
        0x10 => write!(out, "JBC {}, {}", hex(a1), hex(i.relative(a2))),
        0x12 => write!(out, "LCALL {}", hex(i.long())),
        0x13 => write!(out, "RRC A"),
        0x14 => write!(out, "DEC A"),
        0x15 => write!(out, "DEC {}", hex(a1)),
        0x16 | 0x17 => write!(out, "DEC @R{}", ind(op)),
        0x18..=0x1F => write!(out, "DEC R{}", reg(op)),
        0x20 => write!(out, "JB {}, {}", hex(a1), hex(i.relative(a2))),
        0x22 => write!(out, "RET"),
        0x23 => write!(out, "RL A"),
        0x30 => write!(out, "JNB {}, {}", hex(a1), hex(i.relative(a2))),
        0x32 => write!(out, "RETI"),
        0x33 => write!(out, "RLC A"),
        0x40 => write!(out, "JC {}", hex(i.relative(a1))),
        0x42 => write!(out, "ORL {}, A", hex(a1)),
        0x43 => write!(out, "ORL {}, #{a2}", hex(a1)),
        0x50 => write!(out, "JNC {}", hex(i.relative(a1))),
        0x52 => write!(out, "ANL {}, A", hex(a1)),
        0x53 => write!(out, "ANL {}, #{a2}", hex(a1)),
        0x60 => write!(out, "JZ {}", hex(i.relative(a1))),
        0x62 => write!(out, "XRL {}, A", hex(a1)),
        0x63 => write!(out, "XRL {}, #{a2}", hex(a1)),
        0x70 => write!(out, "JNZ {}", hex(i.relative(a1))),
        0x72 => write!(out, "ORL C, {}", hex(a1)),
        0x73 => write!(out, "JMP @A+DPTR"),
        0x74 => write!(out, "MOV A, #{a1}"),
        0x75 => write!(out, "MOV {}, #{a2}", hex(a1)),
        0x76 | 0x77 => write!(out, "MOV @R{}, #{a1}", ind(op)),
        0x78..=0x7F => write!(out, "MOV R{}, #{a1}", reg(op)),
        0x80 => write!(out, "SJMP {}", hex(i.relative(a1))),
        0x82 => write!(out, "ANL C, {}", hex(a1)),
        0x83 => write!(out, "MOVC A, @A+PC"),
        0x84 => write!(out, "DIV AB"),
        // Source first, destination second in the encoding.
        0x85 => write!(out, "MOV {}, {}", hex(a2), hex(a1)),
        0x86 | 0x87 => write!(out, "MOV {}, @R{}", hex(a1), ind(op)),
        0x88..=0x8F => write!(out, "MOV {}, R{}", hex(a1), reg(op)),
        0x90 => write!(out, "MOV DPTR, #{}", i.long()),
        0x92 => write!(out, "MOV {}, C", hex(a1)),
        0x93 => write!(out, "MOVC A, @A+DPTR"),
        0xA0 => write!(out, "ORL C, /{}", hex(a1)),
        0xA2 => write!(out, "MOV C, {}", hex(a1)),
        0xA3 => write!(out, "INC DPTR"),
        0xA4 => write!(out, "MUL AB"),
        0xA5 => write!(out, "DB {}", hex(op)),
        0xA6 | 0xA7 => write!(out, "MOV @R{}, {}", ind(op), hex(a1)),
        0xA8..=0xAF => write!(out, "MOV R{}, {}", reg(op), hex(a1)),
        0xB0 => write!(out, "ANL C, /{}", hex(a1)),
        0xB2 => write!(out, "CPL {}", hex(a1)),
        0xB3 => write!(out, "CPL C"),
        0xB4 => write!(out, "CJNE A, #{a1}, {}", hex(i.relative(a2))),
        0xB5 => write!(out, "CJNE A, {}, {}", hex(a1), hex(i.relative(a2))),
        0xB6 | 0xB7 => write!(out, "CJNE @R{}, #{a1}, {}", ind(op), hex(i.relative(a2))),
        0xB8..=0xBF => write!(out, "CJNE R{}, #{a1}, {}", reg(op), hex(i.relative(a2))),
        0xC0 => write!(out, "PUSH {}", hex(a1)),
        0xC2 => write!(out, "CLR {}", hex(a1)),
        0xC3 => write!(out, "CLR C"),
        0xC4 => write!(out, "SWAP A"),
        0xC5 => write!(out, "XCH A, {}", hex(a1)),
        0xC6 | 0xC7 => write!(out, "XCH A, @R{}", ind(op)),
        0xC8..=0xCF => write!(out, "XCH A, R{}", reg(op)),
        0xD0 => write!(out, "POP {}", hex(a1)),
        0xD2 => write!(out, "SETB {}", hex(a1)),
        0xD3 => write!(out, "SETB C"),
        0xD4 => write!(out, "DA A"),
        0xD5 => write!(out, "DJNZ {}, {}", hex(a1), hex(i.relative(a2))),
        0xD6 | 0xD7 => write!(out, "XCHD A, @R{}", ind(op)),
        0xD8..=0xDF => write!(out, "DJNZ R{}, {}", reg(op), hex(i.relative(a1))),
        0xE0 => write!(out, "MOVX A, @DPTR"),
        0xE2 | 0xE3 => write!(out, "MOVX A, @R{}", ind(op)),
        0xE4 => write!(out, "CLR A"),
        0xE5 => write!(out, "MOV A, {}", hex(a1)),
        0xE6 | 0xE7 => write!(out, "MOV A, @R{}", ind(op)),
        0xE8..=0xEF => write!(out, "MOV A, R{}", reg(op)),
        0xF0 => write!(out, "MOVX @DPTR, A"),
        0xF2 | 0xF3 => write!(out, "MOVX @R{}, A", ind(op)),
        0xF4 => write!(out, "CPL A"),
        0xF5 => write!(out, "MOV {}, A", hex(a1)),
        0xF6 | 0xF7 => write!(out, "MOV @R{}, A", ind(op)),
        0xF8..=0xFF => write!(out, "MOV R{}, A", reg(op)),
        _ => write!(out, "DB {}", hex(op)),
    };
    out
}
