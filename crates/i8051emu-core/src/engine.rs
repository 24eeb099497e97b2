//! The seam between the front-end core and the emulation engine.
//!
//! The core never decodes or executes instructions itself. Everything it knows
//! about the simulated chip arrives through [`Engine`] and [`Disassembler`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;

/// One of the four address spaces the memory table can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemorySpace {
    /// Program memory.
    #[default]
    Rom,
    /// Internal working memory.
    Ram,
    /// Special function registers.
    Sfr,
    /// External data memory.
    Xram,
}

impl MemorySpace {
    pub const ALL: [MemorySpace; 4] = [
        MemorySpace::Rom,
        MemorySpace::Ram,
        MemorySpace::Sfr,
        MemorySpace::Xram,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MemorySpace::Rom => "ROM",
            MemorySpace::Ram => "RAM",
            MemorySpace::Sfr => "SFR",
            MemorySpace::Xram => "XRAM",
        }
    }

    /// Address of the first cell the engine returns for this space. SFRs start
    /// at 0x80, everything else at zero.
    pub fn base_address(self) -> u16 {
        match self {
            MemorySpace::Sfr => 0x80,
            _ => 0,
        }
    }

    /// The next space in display order, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|s| *s == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for MemorySpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MemorySpace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|space| space.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnknownMemorySpace(s.to_string()))
    }
}

/// Input registers the front-end is allowed to poke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InputRegister {
    /// Matrix keyboard bank 0.
    Cskb0,
    /// Matrix keyboard bank 1.
    Cskb1,
    /// Port 3 pins driven by the board (the sequential keyboard's key line).
    Port3,
}

impl InputRegister {
    pub fn name(self) -> &'static str {
        match self {
            InputRegister::Cskb0 => "CSKB0",
            InputRegister::Cskb1 => "CSKB1",
            InputRegister::Port3 => "P3",
        }
    }
}

/// Exactly one input bit of one input register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyBit {
    pub register: InputRegister,
    /// Bit position, 0 is the least significant bit.
    pub bit: u8,
}

impl KeyBit {
    pub const fn new(register: InputRegister, bit: u8) -> Self {
        Self { register, bit }
    }

    pub fn mask(self) -> u8 {
        1 << (self.bit & 0x07)
    }
}

impl fmt::Display for KeyBit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.register.name(), self.bit)
    }
}

/// Working and control registers as the engine last left them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegisterSnapshot {
    pub pc: u16,
    pub a: u8,
    pub b: u8,
    pub sp: u8,
    pub dptr: u16,
    pub psw: u8,
    /// R0..R7 of the currently selected bank.
    pub r: [u8; 8],
    pub ie: u8,
    pub ip: u8,
    pub tcon: u8,
    pub tmod: u8,
}

/// The memory-mapped peripheral registers of the trainer board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtDeviceBytes {
    /// Display column select; also gates the sequential keyboard.
    pub csds: u8,
    /// Display segment data.
    pub csdb: u8,
    pub cskb0: u8,
    pub cskb1: u8,
}

/// A failure reported by the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid program image: {0}")]
    InvalidImage(String),
    #[error("illegal opcode {opcode:02X}h at {pc:04X}h")]
    IllegalOpcode { pc: u16, opcode: u8 },
    #[error("engine fault at {pc:04X}h: {reason}")]
    Fault { pc: u16, reason: String },
}

/// The emulation engine as seen by the front-end.
pub trait Engine {
    /// Advance the simulated CPU by one instruction.
    fn step_cycle(&mut self) -> Result<(), EngineError>;

    /// Whether [`load_program`](Self::load_program) would accept `image`.
    /// Called before anything is reset, so a rejected image leaves the
    /// current program in place.
    fn check_program(&self, image: &[u8]) -> Result<(), EngineError> {
        let _ = image;
        Ok(())
    }

    /// Load a program image into persistent (program) memory.
    fn load_program(&mut self, image: &[u8]) -> Result<(), EngineError>;

    /// Clear program memory and everything else: a power-on reset.
    fn reset_persistent_memory(&mut self);

    /// Clear working memory and registers, leaving program memory intact.
    fn reset_volatile_memory(&mut self);

    fn set_input_bit(&mut self, register: InputRegister, bit: u8);

    fn clear_input_bit(&mut self, register: InputRegister, bit: u8);

    /// Recompute any state derived from inputs. Called after every input change.
    fn refresh(&mut self) {}

    /// Address of the next instruction to execute.
    fn pc(&self) -> u16;

    /// Raw cells of `space`, starting at [`MemorySpace::base_address`].
    fn read_memory(&self, space: MemorySpace) -> Vec<u8>;

    fn read_registers(&self) -> RegisterSnapshot;

    /// P0..P3 pin values.
    fn read_ports(&self) -> [u8; 4];

    fn read_ext_devices(&self) -> ExtDeviceBytes;

    /// One encoded segment byte per display digit, least significant digit first.
    fn read_display_bytes(&self) -> Vec<u8>;
}

/// One disassembled instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionRow {
    pub address: u16,
    pub bytes: Vec<u8>,
    pub opcode: u8,
    pub arg1: Option<u8>,
    pub arg2: Option<u8>,
    pub mnemonic: String,
}

impl InstructionRow {
    /// Build a row from its raw bytes. The first byte is the opcode.
    pub fn new(address: u16, bytes: Vec<u8>, mnemonic: impl Into<String>) -> Self {
        Self {
            address,
            opcode: bytes.first().copied().unwrap_or_default(),
            arg1: bytes.get(1).copied(),
            arg2: bytes.get(2).copied(),
            bytes,
            mnemonic: mnemonic.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether `addr` falls inside this instruction's bytes.
    pub fn covers(&self, addr: u16) -> bool {
        let start = self.address as u32;
        (start..start + self.bytes.len() as u32).contains(&(addr as u32))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DisassembleError {
    #[error("program image contains no data")]
    Empty,
    #[error("malformed program image: {0}")]
    Image(String),
}

/// Turns a program image into listing rows.
pub trait Disassembler {
    fn disassemble(&self, image: &[u8]) -> Result<Vec<InstructionRow>, DisassembleError>;
}
