//! A tiny scripted engine for driving the controller in tests.
//!
//! Opcodes:
//! - `00`        NOP
//! - `04`        INC A, also copies A to RAM[0]
//! - `75 nn`     write `nn` to the display column select (CSDS)
//! - `80 aa`     jump to `aa`
//! - anything else is illegal
//!
//! The fake disassembler rejects images starting with `EE` and yields no rows
//! for images starting with `DD`.

#![allow(dead_code)]

use std::time::{Duration, Instant};

use i8051emu_core::{
    Config, DisassembleError, Disassembler, Engine, EngineError, ExtDeviceBytes, InputRegister,
    InstructionRow, MemorySpace, RegisterSnapshot, Session,
};

pub const ROM_SIZE: usize = 256;
pub const RAM_SIZE: usize = 128;

#[derive(Debug, Clone)]
pub struct FakeEngine {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub pc: u16,
    pub acc: u8,
    pub csds: u8,
    pub cskb0: u8,
    pub cskb1: u8,
    pub p3: u8,
    pub steps: usize,
    pub refreshes: usize,
    pub persistent_resets: usize,
    pub volatile_resets: usize,
    /// Make the next load fail after its check passed.
    pub fail_next_load: bool,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self {
            rom: vec![0; ROM_SIZE],
            ram: vec![0; RAM_SIZE],
            pc: 0,
            acc: 0,
            csds: 0,
            cskb0: 0,
            cskb1: 0,
            p3: 0,
            steps: 0,
            refreshes: 0,
            persistent_resets: 0,
            volatile_resets: 0,
            fail_next_load: false,
        }
    }
}

impl FakeEngine {
    fn fetch(&self, offset: u16) -> u8 {
        self.rom[(self.pc.wrapping_add(offset)) as usize % ROM_SIZE]
    }

    fn register(&mut self, register: InputRegister) -> &mut u8 {
        match register {
            InputRegister::Cskb0 => &mut self.cskb0,
            InputRegister::Cskb1 => &mut self.cskb1,
            InputRegister::Port3 => &mut self.p3,
        }
    }
}

impl Engine for FakeEngine {
    fn step_cycle(&mut self) -> Result<(), EngineError> {
        let opcode = self.fetch(0);
        match opcode {
            0x00 => self.pc += 1,
            0x04 => {
                self.acc = self.acc.wrapping_add(1);
                self.ram[0] = self.acc;
                self.pc += 1;
            }
            0x75 => {
                self.csds = self.fetch(1);
                self.pc += 2;
            }
            0x80 => self.pc = self.fetch(1) as u16,
            _ => return Err(EngineError::IllegalOpcode { pc: self.pc, opcode }),
        }
        self.steps += 1;
        Ok(())
    }

    fn check_program(&self, image: &[u8]) -> Result<(), EngineError> {
        if image.len() > ROM_SIZE {
            return Err(EngineError::InvalidImage("image larger than ROM".into()));
        }
        Ok(())
    }

    fn load_program(&mut self, image: &[u8]) -> Result<(), EngineError> {
        self.check_program(image)?;
        if self.fail_next_load {
            self.fail_next_load = false;
            return Err(EngineError::InvalidImage("flash write failed".into()));
        }
        self.rom[..image.len()].copy_from_slice(image);
        Ok(())
    }

    fn reset_persistent_memory(&mut self) {
        self.persistent_resets += 1;
        self.rom.fill(0);
        self.ram.fill(0);
        self.pc = 0;
        self.acc = 0;
        self.csds = 0;
    }

    fn reset_volatile_memory(&mut self) {
        self.volatile_resets += 1;
        self.ram.fill(0);
        self.pc = 0;
        self.acc = 0;
        self.csds = 0;
    }

    fn set_input_bit(&mut self, register: InputRegister, bit: u8) {
        *self.register(register) |= 1 << bit;
    }

    fn clear_input_bit(&mut self, register: InputRegister, bit: u8) {
        *self.register(register) &= !(1 << bit);
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
    }

    fn pc(&self) -> u16 {
        self.pc
    }

    fn read_memory(&self, space: MemorySpace) -> Vec<u8> {
        match space {
            MemorySpace::Rom => self.rom.clone(),
            MemorySpace::Ram => self.ram.clone(),
            MemorySpace::Sfr => vec![0; 128],
            MemorySpace::Xram => vec![0; 1024],
        }
    }

    fn read_registers(&self) -> RegisterSnapshot {
        RegisterSnapshot {
            pc: self.pc,
            a: self.acc,
            sp: 7,
            ..Default::default()
        }
    }

    fn read_ports(&self) -> [u8; 4] {
        [0xFF, 0xFF, 0xFF, self.p3]
    }

    fn read_ext_devices(&self) -> ExtDeviceBytes {
        ExtDeviceBytes {
            csds: self.csds,
            csdb: 0,
            cskb0: self.cskb0,
            cskb1: self.cskb1,
        }
    }

    fn read_display_bytes(&self) -> Vec<u8> {
        vec![0x06, 0x5B]
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FakeDisassembler;

impl Disassembler for FakeDisassembler {
    fn disassemble(&self, image: &[u8]) -> Result<Vec<InstructionRow>, DisassembleError> {
        match image.first() {
            None => return Err(DisassembleError::Empty),
            Some(0xEE) => return Err(DisassembleError::Image("bad header".into())),
            Some(0xDD) => return Ok(Vec::new()),
            Some(_) => {}
        }
        let mut rows = Vec::new();
        let mut addr = 0;
        while addr < image.len() {
            let (len, text) = match image[addr] {
                0x00 => (1, "NOP".to_string()),
                0x04 => (1, "INC A".to_string()),
                0x75 if addr + 1 < image.len() => (2, format!("MOV CSDS, #{}", image[addr + 1])),
                0x80 if addr + 1 < image.len() => (2, format!("SJMP {:X}h", image[addr + 1])),
                other => (1, format!("DB {other:02X}h")),
            };
            rows.push(InstructionRow::new(
                addr as u16,
                image[addr..addr + len].to_vec(),
                text,
            ));
            addr += len;
        }
        Ok(rows)
    }
}

/// NOP, NOP, INC A, SJMP 0: rows at 0, 1, 2 and 3.
pub const LOOP: &[u8] = &[0x00, 0x00, 0x04, 0x80, 0x00];

pub const CADENCE: Duration = Duration::from_millis(500);

pub fn session() -> Session<FakeEngine, FakeDisassembler> {
    session_with(&Config::default())
}

pub fn session_with(config: &Config) -> Session<FakeEngine, FakeDisassembler> {
    Session::new(FakeEngine::default(), FakeDisassembler, config)
}

/// Instants spaced one cadence apart, starting one cadence after `t0`.
pub fn ticks(t0: Instant) -> impl Iterator<Item = Instant> {
    (1..).map(move |n| t0 + CADENCE * n)
}
