//! An 8051 core and the DSM-51 trainer board built around it, exposed to the
//! front-end through [`i8051emu_core::Engine`] and
//! [`i8051emu_core::Disassembler`].

mod board;
mod cpu;
mod disasm;
pub mod hex;
pub mod isa;
pub mod memory;
pub mod sfr;
mod timer;

pub use board::{DIGITS, Dsm51, XRAM_CSDB, XRAM_CSDS, XRAM_CSKB0, XRAM_CSKB1};
pub use cpu::{Cpu, CpuError, Interrupt, MemoryMapper, PortMapper};
pub use disasm::Dsm51Disassembler;
pub use hex::{ImageError, ImageFormat};
pub use timer::{Timer, TimerInputs};
