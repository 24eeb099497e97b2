//! The DSM-51 trainer board: an 8051 plus its memory-mapped keyboard and
//! seven-segment display.

use i8051emu_core::projector::P1_DISPLAY_OFF;
use i8051emu_core::{
    Engine, EngineError, ExtDeviceBytes, InputRegister, MemorySpace, RegisterSnapshot,
};
use tracing::{debug, trace};

use crate::cpu::{Cpu, CpuError, MemoryMapper, PortMapper};
use crate::hex::{Image, ImageFormat};
use crate::memory::{Ram, Rom};
use crate::sfr::*;
use crate::timer::{Timer, TimerInputs};

/// Matrix keyboard, keys `0`..`7`.
pub const XRAM_CSKB0: u16 = 0xFF21;
/// Matrix keyboard, keys `8`, `9` and the arrows, Esc and Enter.
pub const XRAM_CSKB1: u16 = 0xFF22;
/// Display column select.
pub const XRAM_CSDS: u16 = 0xFF30;
/// Display segment data.
pub const XRAM_CSDB: u16 = 0xFF38;

pub const DIGITS: usize = 6;

/// External drive of P3 at power-on: every pin pulled up except the
/// sequential keyboard line, which reads low until a key is pressed.
const P3_IDLE: u8 = !(1 << P3_T1);

/// External data memory with the board peripherals mapped over it.
#[derive(Default)]
pub struct Xdata {
    ram: Ram,
    csds: u8,
    csdb: u8,
    cskb0: u8,
    cskb1: u8,
}

impl MemoryMapper for Xdata {
    fn read(&self, addr: u16) -> u8 {
        match addr {
            XRAM_CSKB0 => self.cskb0,
            XRAM_CSKB1 => self.cskb1,
            XRAM_CSDS => self.csds,
            XRAM_CSDB => self.csdb,
            _ => self.ram.read(addr),
        }
    }
    fn write(&mut self, addr: u16, value: u8) {
        match addr {
            XRAM_CSDS => self.csds = value,
            XRAM_CSDB => self.csdb = value,
            // Keyboard banks are inputs only.
            XRAM_CSKB0 | XRAM_CSKB1 => {}
            _ => self.ram.write(addr, value),
        }
    }
}

impl Xdata {
    fn snapshot(&self) -> Vec<u8> {
        let mut bytes = self.ram.as_slice().to_vec();
        for addr in [XRAM_CSKB0, XRAM_CSKB1, XRAM_CSDS, XRAM_CSDB] {
            bytes[addr as usize] = self.read(addr);
        }
        bytes
    }
}

/// The SFRs the CPU core does not own: ports, timers and the rest.
pub struct Io {
    latches: [u8; 4],
    /// What the outside world drives onto each port. A pin reads high only
    /// when both the latch and the outside let it.
    external: [u8; 4],
    timer: Timer,
    sfr: [u8; 128],
}

impl Default for Io {
    fn default() -> Self {
        Self {
            latches: [0xFF; 4],
            external: [0xFF, 0xFF, 0xFF, P3_IDLE],
            timer: Timer::default(),
            sfr: [0; 128],
        }
    }
}

impl Io {
    fn port_index(addr: u8) -> Option<usize> {
        PORTS.iter().position(|port| *port == addr)
    }

    pub fn pins(&self, port: usize) -> u8 {
        self.latches[port] & self.external[port]
    }

    fn pin(&self, port: usize, bit: u8) -> bool {
        self.pins(port) & (1 << bit) != 0
    }

    /// Reset the chip side; whatever the board drives is kept.
    fn reset(&mut self) {
        *self = Self {
            external: self.external,
            ..Self::default()
        };
    }
}

impl PortMapper for Io {
    fn read(&self, addr: u8) -> u8 {
        if let Some(port) = Self::port_index(addr) {
            self.pins(port)
        } else if self.timer.interest(addr) {
            self.timer.read(addr)
        } else {
            self.sfr[addr.wrapping_sub(SFR_BASE) as usize & 0x7F]
        }
    }
    fn read_latch(&self, addr: u8) -> u8 {
        match Self::port_index(addr) {
            Some(port) => self.latches[port],
            None => self.read(addr),
        }
    }
    fn write(&mut self, addr: u8, value: u8) {
        if let Some(port) = Self::port_index(addr) {
            self.latches[port] = value;
        } else if self.timer.interest(addr) {
            self.timer.write(addr, value);
        } else {
            self.sfr[addr.wrapping_sub(SFR_BASE) as usize & 0x7F] = value;
        }
    }
}

pub struct Dsm51 {
    cpu: Cpu,
    code: Rom,
    xdata: Xdata,
    io: Io,
    display: [u8; DIGITS],
    format: ImageFormat,
    /// P3 pins as of the end of the previous step, for edge detection.
    last_p3: u8,
    cycles: u64,
}

impl Default for Dsm51 {
    fn default() -> Self {
        Self::new(ImageFormat::Auto)
    }
}

impl Dsm51 {
    pub fn new(format: ImageFormat) -> Self {
        let io = Io::default();
        let last_p3 = io.pins(3);
        Self {
            cpu: Cpu::new(),
            code: Rom::new(),
            xdata: Xdata::default(),
            io,
            display: [0; DIGITS],
            format,
            last_p3,
            cycles: 0,
        }
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    /// Machine cycles executed since the last reset.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn sfr(&self, addr: u8) -> u8 {
        self.cpu.sfr(addr, &self.io)
    }

    pub fn set_sfr(&mut self, addr: u8, value: u8) {
        self.cpu.sfr_set(addr, value, &mut self.io);
    }

    pub fn xdata(&self, addr: u16) -> u8 {
        self.xdata.read(addr)
    }

    /// Place raw code bytes, bypassing the image parser.
    pub fn load_code(&mut self, addr: u16, bytes: &[u8]) {
        self.code.load(addr, bytes);
    }

    /// Execute one instruction and let the peripherals catch up.
    pub fn step(&mut self) -> Result<u8, CpuError> {
        if tracing::enabled!(tracing::Level::TRACE) {
            let instruction = self.cpu.fetch(&self.code, self.cpu.pc);
            trace!(pc = format_args!("{:04X}", self.cpu.pc), "{}", instruction.mnemonic());
        }
        let cycles = self.cpu.step(&mut self.xdata, &self.code, &mut self.io)?;
        self.cycles += cycles as u64;

        let p3 = self.io.pins(3);
        let falling = self.last_p3 & !p3;
        self.io.timer.tick(TimerInputs {
            cycles,
            t0_edges: (falling >> P3_T0) & 1,
            t1_edges: (falling >> P3_T1) & 1,
            int0: self.io.pin(3, P3_INT0),
            int1: self.io.pin(3, P3_INT1),
        });
        self.sample_external_interrupts(falling);
        self.latch_display();
        self.last_p3 = p3;
        Ok(cycles)
    }

    /// Update IE0/IE1 from the INT pins: level-triggered inputs follow the
    /// pin, edge-triggered ones latch a falling edge.
    fn sample_external_interrupts(&mut self, falling: u8) {
        let pins = self.io.pins(3);
        let timer = &mut self.io.timer;
        for (pin, flag, edge_mode) in [
            (P3_INT0, TCON_IE0, TCON_IT0),
            (P3_INT1, TCON_IE1, TCON_IT1),
        ] {
            if !timer.tcon(edge_mode) {
                timer.set_tcon(flag, pins & (1 << pin) == 0);
            } else if falling & (1 << pin) != 0 {
                timer.set_tcon(flag, true);
            }
        }
    }

    fn display_enabled(&self) -> bool {
        self.io.latches[1] & (1 << P1_DISPLAY_OFF) == 0
    }

    /// While the display is enabled, every column selected in CSDS shows
    /// the pattern in CSDB.
    fn latch_display(&mut self) {
        if !self.display_enabled() {
            return;
        }
        for (digit, segments) in self.display.iter_mut().enumerate() {
            if self.xdata.csds & (1 << digit) != 0 {
                *segments = self.xdata.csdb;
            }
        }
    }

    fn input(&mut self, register: InputRegister) -> &mut u8 {
        match register {
            InputRegister::Cskb0 => &mut self.xdata.cskb0,
            InputRegister::Cskb1 => &mut self.xdata.cskb1,
            InputRegister::Port3 => &mut self.io.external[3],
        }
    }
}

impl Engine for Dsm51 {
    fn step_cycle(&mut self) -> Result<(), EngineError> {
        match self.step() {
            Ok(_) => Ok(()),
            Err(CpuError::IllegalOpcode { pc, opcode }) => {
                Err(EngineError::IllegalOpcode { pc, opcode })
            }
        }
    }

    fn check_program(&self, image: &[u8]) -> Result<(), EngineError> {
        Image::parse(image, self.format)
            .map(drop)
            .map_err(|e| EngineError::InvalidImage(e.to_string()))
    }

    fn load_program(&mut self, image: &[u8]) -> Result<(), EngineError> {
        let image = Image::parse(image, self.format)
            .map_err(|e| EngineError::InvalidImage(e.to_string()))?;
        self.code.clear();
        for (addr, bytes) in image.runs() {
            debug!(addr = format_args!("{addr:04X}"), len = bytes.len(), "loading code");
            self.code.load(addr, &bytes);
        }
        Ok(())
    }

    fn reset_persistent_memory(&mut self) {
        *self = Self::new(self.format);
    }

    fn reset_volatile_memory(&mut self) {
        self.cpu = Cpu::new();
        self.io.reset();
        self.xdata.ram.clear();
        self.xdata.csds = 0;
        self.xdata.csdb = 0;
        self.display = [0; DIGITS];
        self.last_p3 = self.io.pins(3);
        self.cycles = 0;
    }

    fn set_input_bit(&mut self, register: InputRegister, bit: u8) {
        *self.input(register) |= 1 << (bit & 7);
    }

    fn clear_input_bit(&mut self, register: InputRegister, bit: u8) {
        *self.input(register) &= !(1 << (bit & 7));
    }

    fn refresh(&mut self) {
        self.sample_external_interrupts(0);
        self.latch_display();
    }

    fn pc(&self) -> u16 {
        self.cpu.pc
    }

    fn read_memory(&self, space: MemorySpace) -> Vec<u8> {
        match space {
            MemorySpace::Rom => self.code.as_slice().to_vec(),
            MemorySpace::Ram => self.cpu.internal_ram.to_vec(),
            MemorySpace::Sfr => (SFR_BASE..=0xFF).map(|addr| self.sfr(addr)).collect(),
            MemorySpace::Xram => self.xdata.snapshot(),
        }
    }

    fn read_registers(&self) -> RegisterSnapshot {
        let mut r = [0; 8];
        for (x, value) in r.iter_mut().enumerate() {
            *value = self.cpu.r(x as u8);
        }
        RegisterSnapshot {
            pc: self.cpu.pc,
            a: self.cpu.a,
            b: self.cpu.b,
            sp: self.cpu.sp,
            dptr: self.cpu.dptr(),
            psw: self.cpu.psw,
            r,
            ie: self.sfr(SFR_IE),
            ip: self.sfr(SFR_IP),
            tcon: self.sfr(SFR_TCON),
            tmod: self.sfr(SFR_TMOD),
        }
    }

    fn read_ports(&self) -> [u8; 4] {
        [0, 1, 2, 3].map(|port| self.io.pins(port))
    }

    fn read_ext_devices(&self) -> ExtDeviceBytes {
        ExtDeviceBytes {
            csds: self.xdata.csds,
            csdb: self.xdata.csdb,
            cskb0: self.xdata.cskb0,
            cskb1: self.xdata.cskb1,
        }
    }

    fn read_display_bytes(&self) -> Vec<u8> {
        self.display.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(program: &[u8]) -> Dsm51 {
        let mut board = Dsm51::default();
        board.load_code(0, program);
        board
    }

    #[test]
    fn ports_are_wired_and() {
        let mut board = board(&[0x75, SFR_P1, 0x0F]);
        board.step().unwrap();
        assert_eq!(board.read_ports()[1], 0x0F);
        assert_eq!(board.read_ports()[3], P3_IDLE);
        board.set_input_bit(InputRegister::Port3, P3_T1);
        assert_eq!(board.read_ports()[3], 0xFF);
    }

    #[test]
    fn display_latches_selected_columns_while_enabled() {
        // MOV DPTR, #FF38h ; MOV A, #06h ; MOVX @DPTR, A
        // MOV DPTR, #FF30h ; MOV A, #02h ; MOVX @DPTR, A ; CLR P1.6
        let mut board = board(&[
            0x90, 0xFF, 0x38, 0x74, 0x06, 0xF0, 0x90, 0xFF, 0x30, 0x74, 0x02, 0xF0, 0xC2, 0x96,
        ]);
        for _ in 0..6 {
            board.step().unwrap();
        }
        assert_eq!(board.read_display_bytes(), vec![0; DIGITS]);
        board.step().unwrap();
        assert_eq!(board.read_display_bytes(), vec![0, 0x06, 0, 0, 0, 0]);
        assert_eq!(
            board.read_ext_devices(),
            ExtDeviceBytes {
                csds: 0x02,
                csdb: 0x06,
                ..Default::default()
            }
        );
    }

    #[test]
    fn keyboard_banks_are_readable_but_not_writable() {
        // MOV DPTR, #FF21h ; MOVX A, @DPTR ; MOVX @DPTR, A
        let mut board = board(&[0x90, 0xFF, 0x21, 0xE0, 0xF0]);
        board.set_input_bit(InputRegister::Cskb0, 3);
        board.step().unwrap();
        board.step().unwrap();
        assert_eq!(board.cpu().a, 0x08);
        board.clear_input_bit(InputRegister::Cskb0, 3);
        board.step().unwrap();
        assert_eq!(board.xdata(XRAM_CSKB0), 0);
    }

    #[test]
    fn volatile_reset_keeps_code_and_inputs() {
        let mut board = board(&[0x74, 0x05, 0x00]);
        board.set_input_bit(InputRegister::Cskb1, 7);
        board.step().unwrap();
        board.reset_volatile_memory();
        assert_eq!(board.pc(), 0);
        assert_eq!(board.cpu().a, 0);
        assert_eq!(board.cpu().sp, 7);
        assert_eq!(board.read_memory(MemorySpace::Rom)[..2], [0x74, 0x05]);
        assert_eq!(board.read_ext_devices().cskb1, 0x80);

        board.reset_persistent_memory();
        assert_eq!(board.read_memory(MemorySpace::Rom)[0], 0);
        assert_eq!(board.read_ext_devices().cskb1, 0);
    }

    #[test]
    fn memory_spaces_have_their_sizes() {
        let board = Dsm51::default();
        assert_eq!(board.read_memory(MemorySpace::Rom).len(), 0x10000);
        assert_eq!(board.read_memory(MemorySpace::Ram).len(), 256);
        assert_eq!(board.read_memory(MemorySpace::Xram).len(), 0x10000);
        let sfr = board.read_memory(MemorySpace::Sfr);
        assert_eq!(sfr.len(), 128);
        assert_eq!(sfr[(SFR_SP - SFR_BASE) as usize], 7);
        assert_eq!(sfr[(SFR_P0 - SFR_BASE) as usize], 0xFF);
    }

    #[test]
    fn illegal_opcode_surfaces_as_engine_error() {
        let mut board = board(&[0xA5]);
        assert_eq!(
            board.step_cycle(),
            Err(EngineError::IllegalOpcode { pc: 0, opcode: 0xA5 })
        );
    }
}
