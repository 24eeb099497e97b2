use thiserror::Error;

use crate::isa::Instruction;
use crate::sfr::*;

pub trait MemoryMapper {
    fn read(&self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, value: u8);
}

impl MemoryMapper for () {
    fn read(&self, _addr: u16) -> u8 {
        0
    }
    fn write(&mut self, _addr: u16, _value: u8) {}
}

/// Everything in SFR space that the CPU core does not hold itself.
pub trait PortMapper {
    /// Read the register. For the port registers this is the pin state.
    fn read(&self, addr: u8) -> u8;
    /// Read the output latch of a port register. Read-modify-write
    /// instructions use this instead of [`PortMapper::read`].
    fn read_latch(&self, addr: u8) -> u8;
    fn write(&mut self, addr: u8, value: u8);
}

impl PortMapper for () {
    fn read(&self, _addr: u8) -> u8 {
        0
    }
    fn read_latch(&self, _addr: u8) -> u8 {
        0
    }
    fn write(&mut self, _addr: u8, _value: u8) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("illegal opcode {opcode:02X}h at {pc:04X}h")]
    IllegalOpcode { pc: u16, opcode: u8 },
}

/// Interrupt sources, in the order the hardware polls them within one
/// priority level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    External0,
    Timer0,
    External1,
    Timer1,
    Serial,
}

impl Interrupt {
    pub const ALL: [Interrupt; 5] = [
        Interrupt::External0,
        Interrupt::Timer0,
        Interrupt::External1,
        Interrupt::Timer1,
        Interrupt::Serial,
    ];

    pub fn vector(self) -> u16 {
        match self {
            Interrupt::External0 => 0x03,
            Interrupt::Timer0 => 0x0B,
            Interrupt::External1 => 0x13,
            Interrupt::Timer1 => 0x1B,
            Interrupt::Serial => 0x23,
        }
    }

    /// Bit position in both `IE` and `IP`.
    fn enable_bit(self) -> u8 {
        match self {
            Interrupt::External0 => IE_EX0,
            Interrupt::Timer0 => IE_ET0,
            Interrupt::External1 => IE_EX1,
            Interrupt::Timer1 => IE_ET1,
            Interrupt::Serial => IE_ES,
        }
    }

    fn requested(self, tcon: u8, scon: u8) -> bool {
        match self {
            Interrupt::External0 => tcon & (1 << TCON_IE0) != 0,
            Interrupt::Timer0 => tcon & (1 << TCON_TF0) != 0,
            Interrupt::External1 => tcon & (1 << TCON_IE1) != 0,
            Interrupt::Timer1 => tcon & (1 << TCON_TF1) != 0,
            Interrupt::Serial => scon & (1 << SCON_RI | 1 << SCON_TI) != 0,
        }
    }

    /// The `TCON` bits the hardware clears when it vectors to this source.
    /// Level-triggered external interrupts and the serial port keep theirs.
    fn acknowledge_mask(self, tcon: u8) -> u8 {
        match self {
            Interrupt::External0 if tcon & (1 << TCON_IT0) != 0 => 1 << TCON_IE0,
            Interrupt::External1 if tcon & (1 << TCON_IT1) != 0 => 1 << TCON_IE1,
            Interrupt::Timer0 => 1 << TCON_TF0,
            Interrupt::Timer1 => 1 << TCON_TF1,
            _ => 0,
        }
    }
}

const LOW: usize = 0;
const HIGH: usize = 1;

#[derive(Debug, Clone)]
pub struct Cpu {
    pub pc: u16,
    pub internal_ram: [u8; 256],
    pub a: u8,
    pub b: u8,
    pub dpl: u8,
    pub dph: u8,
    pub psw: u8,
    pub sp: u8,
    /// Interrupt service in progress, per priority level.
    pub in_service: [bool; 2],
    /// Set by `RETI` and by writes to `IE`/`IP`: the next instruction runs
    /// before any interrupt is taken.
    hold_interrupts: bool,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            pc: 0x0000,
            internal_ram: [0; 256],
            a: 0,
            b: 0,
            dpl: 0,
            dph: 0,
            psw: 0,
            sp: 7, // !
            in_service: [false; 2],
            hold_interrupts: false,
        }
    }

    /// Take a pending interrupt if one may preempt, then execute one
    /// instruction. Returns the machine cycles spent.
    pub fn step(
        &mut self,
        xdata: &mut impl MemoryMapper,
        code: &impl MemoryMapper,
        ports: &mut impl PortMapper,
    ) -> Result<u8, CpuError> {
        let mut cycles = 0;
        if !std::mem::take(&mut self.hold_interrupts) {
            if let Some((interrupt, level)) = self.pending_interrupt(ports) {
                self.enter_interrupt(interrupt, level, ports);
                cycles += 2;
            }
        }

        let instruction = self.fetch(code, self.pc);
        if instruction.is_reserved() {
            return Err(CpuError::IllegalOpcode {
                pc: self.pc,
                opcode: instruction.opcode,
            });
        }
        self.execute(instruction, xdata, code, ports);
        self.update_parity();
        Ok(cycles + instruction.cycles())
    }

    pub fn fetch(&self, code: &impl MemoryMapper, pc: u16) -> Instruction {
        Instruction::new(
            pc,
            [
                code.read(pc),
                code.read(pc.wrapping_add(1)),
                code.read(pc.wrapping_add(2)),
            ],
        )
    }

    /// The highest-priority enabled interrupt that may preempt whatever is in
    /// service, with the level it runs at.
    pub fn pending_interrupt(&self, ports: &impl PortMapper) -> Option<(Interrupt, usize)> {
        let ie = ports.read(SFR_IE);
        if ie & (1 << IE_EA) == 0 || self.in_service[HIGH] {
            return None;
        }
        let ip = ports.read(SFR_IP);
        let tcon = ports.read(SFR_TCON);
        let scon = ports.read(SFR_SCON);

        let levels: &[usize] = if self.in_service[LOW] {
            &[HIGH]
        } else {
            &[HIGH, LOW]
        };
        for &level in levels {
            let found = Interrupt::ALL.into_iter().find(|irq| {
                let bit = 1 << irq.enable_bit();
                let priority = if ip & bit != 0 { HIGH } else { LOW };
                ie & bit != 0 && priority == level && irq.requested(tcon, scon)
            });
            if let Some(irq) = found {
                return Some((irq, level));
            }
        }
        None
    }

    fn enter_interrupt(&mut self, interrupt: Interrupt, level: usize, ports: &mut impl PortMapper) {
        let tcon = ports.read(SFR_TCON);
        let mask = interrupt.acknowledge_mask(tcon);
        if mask != 0 {
            ports.write(SFR_TCON, tcon & !mask);
        }
        self.push_stack16(self.pc);
        self.pc = interrupt.vector();
        self.in_service[level] = true;
    }

    fn return_from_interrupt(&mut self) {
        if self.in_service[HIGH] {
            self.in_service[HIGH] = false;
        } else {
            self.in_service[LOW] = false;
        }
        self.hold_interrupts = true;
    }

    pub fn a(&self) -> u8 {
        self.a
    }

    pub fn b(&self) -> u8 {
        self.b
    }

    pub fn dptr(&self) -> u16 {
        u16::from_be_bytes([self.dph, self.dpl])
    }

    pub fn dptr_set(&mut self, value: u16) {
        [self.dph, self.dpl] = value.to_be_bytes();
    }

    /// Base address of the selected register bank.
    pub fn bank(&self) -> u8 {
        self.psw & (1 << PSW_RS1 | 1 << PSW_RS0)
    }

    pub fn r(&self, x: u8) -> u8 {
        self.internal_ram[(self.bank() + (x & 7)) as usize]
    }

    pub fn r_mut(&mut self, x: u8) -> &mut u8 {
        &mut self.internal_ram[(self.bank() + (x & 7)) as usize]
    }

    pub fn sfr(&self, addr: u8, ports: &impl PortMapper) -> u8 {
        match addr {
            SFR_A => self.a,
            SFR_B => self.b,
            SFR_DPH => self.dph,
            SFR_DPL => self.dpl,
            SFR_PSW => self.psw,
            SFR_SP => self.sp,
            _ => ports.read(addr),
        }
    }

    pub fn sfr_set(&mut self, addr: u8, value: u8, ports: &mut impl PortMapper) {
        match addr {
            SFR_A => self.a = value,
            SFR_B => self.b = value,
            SFR_DPH => self.dph = value,
            SFR_DPL => self.dpl = value,
            SFR_PSW => self.psw = value,
            SFR_SP => self.sp = value,
            SFR_IE | SFR_IP => {
                self.hold_interrupts = true;
                ports.write(addr, value);
            }
            _ => ports.write(addr, value),
        }
    }

    pub fn psw(&self, flag: u8) -> bool {
        self.psw & (1 << flag) != 0
    }

    pub fn psw_set(&mut self, flag: u8, value: bool) {
        if value {
            self.psw |= 1 << flag;
        } else {
            self.psw &= !(1 << flag);
        }
    }

    fn update_parity(&mut self) {
        self.psw_set(PSW_P, self.a.count_ones() % 2 == 1);
    }

    pub fn push_stack(&mut self, value: u8) {
        self.sp = self.sp.wrapping_add(1);
        self.internal_ram[self.sp as usize] = value;
    }

    /// Low byte first, as `LCALL` does.
    pub fn push_stack16(&mut self, value: u16) {
        self.push_stack((value & 0xFF) as u8);
        self.push_stack((value >> 8) as u8);
    }

    pub fn pop_stack(&mut self) -> u8 {
        let value = self.internal_ram[self.sp as usize];
        self.sp = self.sp.wrapping_sub(1);
        value
    }

    pub fn pop_stack16(&mut self) -> u16 {
        let hi = self.pop_stack();
        let lo = self.pop_stack();
        u16::from_be_bytes([hi, lo])
    }

    fn read(&self, addr: u8, ports: &impl PortMapper) -> u8 {
        if addr < 128 {
            self.internal_ram[addr as usize]
        } else {
            self.sfr(addr, ports)
        }
    }

    /// Like [`Cpu::read`], but ports yield their latch.
    fn read_latch(&self, addr: u8, ports: &impl PortMapper) -> u8 {
        if is_port(addr) {
            ports.read_latch(addr)
        } else {
            self.read(addr, ports)
        }
    }

    fn read_indirect(&self, addr: u8) -> u8 {
        self.internal_ram[addr as usize]
    }

    fn write(&mut self, addr: u8, value: u8, ports: &mut impl PortMapper) {
        if addr < 128 {
            self.internal_ram[addr as usize] = value;
        } else {
            self.sfr_set(addr, value, ports);
        }
    }

    fn write_indirect(&mut self, addr: u8, value: u8) {
        self.internal_ram[addr as usize] = value;
    }

    /// Map a bit address to its byte and mask. Bit addresses 0-127 are
    /// internal RAM 0x20-0x2F, 128-255 are the SFRs at 0x80, 0x88, ... 0xF8.
    fn bit_location(bit_addr: u8) -> (u8, u8) {
        let mask = 1 << (bit_addr & 0x07);
        if bit_addr < 0x80 {
            (0x20 + (bit_addr >> 3), mask)
        } else {
            (bit_addr & 0xF8, mask)
        }
    }

    fn read_bit(&self, bit_addr: u8, ports: &impl PortMapper) -> bool {
        let (addr, mask) = Self::bit_location(bit_addr);
        self.read(addr, ports) & mask != 0
    }

    fn read_bit_latch(&self, bit_addr: u8, ports: &impl PortMapper) -> bool {
        let (addr, mask) = Self::bit_location(bit_addr);
        self.read_latch(addr, ports) & mask != 0
    }

    fn write_bit(&mut self, bit_addr: u8, value: bool, ports: &mut impl PortMapper) {
        let (addr, mask) = Self::bit_location(bit_addr);
        let byte = self.read_latch(addr, ports);
        let byte = if value { byte | mask } else { byte & !mask };
        self.write(addr, byte, ports);
    }

    /// Source operand of the accumulator ALU families (`ADD`, `ORL A`, ...),
    /// selected by the low nibble of the opcode.
    fn alu_source(&self, i: &Instruction, ports: &impl PortMapper) -> u8 {
        match i.opcode & 0x0F {
            0x04 => i.arg1,
            0x05 => self.read(i.arg1, ports),
            0x06 | 0x07 => self.read_indirect(self.r(i.opcode & 1)),
            _ => self.r(i.opcode & 7),
        }
    }

    fn jump_if(&mut self, condition: bool, target: u16) {
        if condition {
            self.pc = target;
        }
    }

    fn execute(
        &mut self,
        i: Instruction,
        xdata: &mut impl MemoryMapper,
        code: &impl MemoryMapper,
        ports: &mut impl PortMapper,
    ) {
        let op = i.opcode;
        let next = i.next();
        self.pc = next;

        match op {
            0x00 => {}

            // Control flow
            _ if op & 0x1F == 0x01 => self.pc = i.absolute(),
            _ if op & 0x1F == 0x11 => {
                self.push_stack16(next);
                self.pc = i.absolute();
            }
            0x02 => self.pc = i.long(),
            0x12 => {
                self.push_stack16(next);
                self.pc = i.long();
            }
            0x22 => self.pc = self.pop_stack16(),
            0x32 => {
                self.pc = self.pop_stack16();
                self.return_from_interrupt();
            }
            0x73 => self.pc = self.dptr().wrapping_add(self.a as u16),
            0x80 => self.pc = i.relative(i.arg1),
            0x40 => self.jump_if(self.psw(PSW_C), i.relative(i.arg1)),
            0x50 => self.jump_if(!self.psw(PSW_C), i.relative(i.arg1)),
            0x60 => self.jump_if(self.a == 0, i.relative(i.arg1)),
            0x70 => self.jump_if(self.a != 0, i.relative(i.arg1)),
            0x20 => self.jump_if(self.read_bit(i.arg1, ports), i.relative(i.arg2)),
            0x30 => self.jump_if(!self.read_bit(i.arg1, ports), i.relative(i.arg2)),
            0x10 => {
                if self.read_bit_latch(i.arg1, ports) {
                    self.write_bit(i.arg1, false, ports);
                    self.pc = i.relative(i.arg2);
                }
            }

            // Compare and decrement loops
            0xB4..=0xBF => {
                let (lhs, rhs) = match op {
                    0xB4 => (self.a, i.arg1),
                    0xB5 => (self.a, self.read(i.arg1, ports)),
                    0xB6 | 0xB7 => (self.read_indirect(self.r(op & 1)), i.arg1),
                    _ => (self.r(op & 7), i.arg1),
                };
                self.psw_set(PSW_C, lhs < rhs);
                self.jump_if(lhs != rhs, i.relative(i.arg2));
            }
            0xD5 => {
                let value = self.read_latch(i.arg1, ports).wrapping_sub(1);
                self.write(i.arg1, value, ports);
                self.jump_if(value != 0, i.relative(i.arg2));
            }
            0xD8..=0xDF => {
                let r = self.r_mut(op & 7);
                *r = r.wrapping_sub(1);
                let value = *r;
                self.jump_if(value != 0, i.relative(i.arg1));
            }

            // DPTR / MOVX / MOVC
            0x90 => self.dptr_set(i.long()),
            0xA3 => self.dptr_set(self.dptr().wrapping_add(1)),
            0xE0 => self.a = xdata.read(self.dptr()),
            0xF0 => xdata.write(self.dptr(), self.a),
            0xE2 | 0xE3 => self.a = xdata.read(self.short_xdata_address(op, ports)),
            0xF2 | 0xF3 => xdata.write(self.short_xdata_address(op, ports), self.a),
            0x93 => self.a = code.read(self.dptr().wrapping_add(self.a as u16)),
            0x83 => self.a = code.read(next.wrapping_add(self.a as u16)),

            // Increment and decrement
            0x04 => self.a = self.a.wrapping_add(1),
            0x05 => {
                let value = self.read_latch(i.arg1, ports).wrapping_add(1);
                self.write(i.arg1, value, ports);
            }
            0x06 | 0x07 => {
                let addr = self.r(op & 1);
                self.write_indirect(addr, self.read_indirect(addr).wrapping_add(1));
            }
            0x08..=0x0F => {
                let r = self.r_mut(op & 7);
                *r = r.wrapping_add(1);
            }
            0x14 => self.a = self.a.wrapping_sub(1),
            0x15 => {
                let value = self.read_latch(i.arg1, ports).wrapping_sub(1);
                self.write(i.arg1, value, ports);
            }
            0x16 | 0x17 => {
                let addr = self.r(op & 1);
                self.write_indirect(addr, self.read_indirect(addr).wrapping_sub(1));
            }
            0x18..=0x1F => {
                let r = self.r_mut(op & 7);
                *r = r.wrapping_sub(1);
            }

            // Accumulator arithmetic
            0x24..=0x2F => {
                let (a, c, ov, ac) = add_with_carry(self.a, self.alu_source(&i, ports), false);
                self.set_arith(a, c, ov, ac);
            }
            0x34..=0x3F => {
                let carry = self.psw(PSW_C);
                let (a, c, ov, ac) = add_with_carry(self.a, self.alu_source(&i, ports), carry);
                self.set_arith(a, c, ov, ac);
            }
            0x94..=0x9F => {
                let borrow = self.psw(PSW_C);
                let (a, c, ov, ac) = sub_with_borrow(self.a, self.alu_source(&i, ports), borrow);
                self.set_arith(a, c, ov, ac);
            }
            0x44..=0x4F => self.a |= self.alu_source(&i, ports),
            0x54..=0x5F => self.a &= self.alu_source(&i, ports),
            0x64..=0x6F => self.a ^= self.alu_source(&i, ports),
            0xA4 => {
                let (a, b, ov) = mul(self.a, self.b);
                (self.a, self.b) = (a, b);
                self.psw_set(PSW_C, false);
                self.psw_set(PSW_OV, ov);
            }
            0x84 => {
                let (a, b, ov) = div(self.a, self.b);
                (self.a, self.b) = (a, b);
                self.psw_set(PSW_C, false);
                self.psw_set(PSW_OV, ov);
            }
            0xD4 => {
                let (a, c) = decimal_adjust(self.a, self.psw(PSW_C), self.psw(PSW_AC));
                self.a = a;
                self.psw_set(PSW_C, c);
            }
            0xE4 => self.a = 0,
            0xF4 => self.a = !self.a,
            0x03 => self.a = rr(self.a),
            0x23 => self.a = rl(self.a),
            0x13 => {
                let (a, c) = rrc(self.a, self.psw(PSW_C));
                self.a = a;
                self.psw_set(PSW_C, c);
            }
            0x33 => {
                let (a, c) = rlc(self.a, self.psw(PSW_C));
                self.a = a;
                self.psw_set(PSW_C, c);
            }
            0xC4 => self.a = swap_nibbles(self.a),

            // Logical operations on a direct address (read-modify-write)
            0x42 | 0x43 | 0x52 | 0x53 | 0x62 | 0x63 => {
                let operand = if op & 1 == 0 { self.a } else { i.arg2 };
                let value = self.read_latch(i.arg1, ports);
                let value = match op & 0xF0 {
                    0x40 => value | operand,
                    0x50 => value & operand,
                    _ => value ^ operand,
                };
                self.write(i.arg1, value, ports);
            }

            // Moves
            0x74 => self.a = i.arg1,
            0x75 => self.write(i.arg1, i.arg2, ports),
            0x76 | 0x77 => self.write_indirect(self.r(op & 1), i.arg1),
            0x78..=0x7F => *self.r_mut(op & 7) = i.arg1,
            0x85 => {
                let value = self.read(i.arg1, ports);
                self.write(i.arg2, value, ports);
            }
            0x86 | 0x87 => {
                let value = self.read_indirect(self.r(op & 1));
                self.write(i.arg1, value, ports);
            }
            0x88..=0x8F => {
                let value = self.r(op & 7);
                self.write(i.arg1, value, ports);
            }
            0xA6 | 0xA7 => {
                let value = self.read(i.arg1, ports);
                self.write_indirect(self.r(op & 1), value);
            }
            0xA8..=0xAF => *self.r_mut(op & 7) = self.read(i.arg1, ports),
            0xE5 => self.a = self.read(i.arg1, ports),
            0xE6 | 0xE7 => self.a = self.read_indirect(self.r(op & 1)),
            0xE8..=0xEF => self.a = self.r(op & 7),
            0xF5 => self.write(i.arg1, self.a, ports),
            0xF6 | 0xF7 => self.write_indirect(self.r(op & 1), self.a),
            0xF8..=0xFF => *self.r_mut(op & 7) = self.a,

            // Stack
            0xC0 => {
                let value = self.read(i.arg1, ports);
                self.push_stack(value);
            }
            0xD0 => {
                let value = self.pop_stack();
                self.write(i.arg1, value, ports);
            }

            // Exchange
            0xC5 => {
                let value = self.read(i.arg1, ports);
                self.write(i.arg1, self.a, ports);
                self.a = value;
            }
            0xC6 | 0xC7 => {
                let addr = self.r(op & 1);
                let value = self.read_indirect(addr);
                self.write_indirect(addr, self.a);
                self.a = value;
            }
            0xC8..=0xCF => {
                let a = self.a;
                self.a = std::mem::replace(self.r_mut(op & 7), a);
            }
            0xD6 | 0xD7 => {
                let addr = self.r(op & 1);
                let value = self.read_indirect(addr);
                self.write_indirect(addr, (value & 0xF0) | (self.a & 0x0F));
                self.a = (self.a & 0xF0) | (value & 0x0F);
            }

            // Carry and bit operations
            0xC3 => self.psw_set(PSW_C, false),
            0xD3 => self.psw_set(PSW_C, true),
            0xB3 => self.psw_set(PSW_C, !self.psw(PSW_C)),
            0xC2 => self.write_bit(i.arg1, false, ports),
            0xD2 => self.write_bit(i.arg1, true, ports),
            0xB2 => {
                let value = self.read_bit_latch(i.arg1, ports);
                self.write_bit(i.arg1, !value, ports);
            }
            0xA2 => self.psw_set(PSW_C, self.read_bit(i.arg1, ports)),
            0x92 => self.write_bit(i.arg1, self.psw(PSW_C), ports),
            0x82 => self.psw_set(PSW_C, self.psw(PSW_C) & self.read_bit(i.arg1, ports)),
            0xB0 => self.psw_set(PSW_C, self.psw(PSW_C) & !self.read_bit(i.arg1, ports)),
            0x72 => self.psw_set(PSW_C, self.psw(PSW_C) | self.read_bit(i.arg1, ports)),
            0xA0 => self.psw_set(PSW_C, self.psw(PSW_C) | !self.read_bit(i.arg1, ports)),

            // 0xA5, rejected before execution
            _ => {}
        }
    }

    fn set_arith(&mut self, a: u8, c: bool, ov: bool, ac: bool) {
        self.a = a;
        self.psw_set(PSW_C, c);
        self.psw_set(PSW_OV, ov);
        self.psw_set(PSW_AC, ac);
    }

    /// `MOVX @Ri` addresses: `Ri` supplies the low byte, the `P2` latch the high.
    fn short_xdata_address(&self, op: u8, ports: &impl PortMapper) -> u16 {
        u16::from_be_bytes([ports.read_latch(SFR_P2), self.r(op & 1)])
    }
}

fn swap_nibbles(a: u8) -> u8 {
    a.rotate_left(4)
}

/// `DA A`: returns the adjusted accumulator and the new carry.
fn decimal_adjust(a: u8, c: bool, ac: bool) -> (u8, bool) {
    let mut value = a as u16;
    let mut carry = c;
    if value & 0x0F > 9 || ac {
        value += 0x06;
        carry |= value > 0xFF;
    }
    if value & 0xF0 > 0x90 || carry {
        value += 0x60;
        carry |= value > 0xFF;
    }
    (value as u8, carry)
}

/// Returns `(result, C, OV, AC)`.
#[inline(always)]
fn add_with_carry(a: u8, b: u8, c: bool) -> (u8, bool, bool, bool) {
    let ac = ((a & 0x0F) + (b & 0x0F) + c as u8) > 0x0F;
    let sum = a as u16 + b as u16 + c as u16;
    let ov = ((a ^ b) & 0x80) == 0 && ((a ^ sum as u8) & 0x80) != 0;
    (sum as u8, (sum >> 8) != 0, ov, ac)
}

/// Returns `(result, C, OV, AC)`; C and AC are borrows.
#[inline(always)]
fn sub_with_borrow(a: u8, b: u8, c: bool) -> (u8, bool, bool, bool) {
    let ac = (a & 0x0F) < (b & 0x0F) + c as u8;
    let diff = (a as u16).wrapping_sub(b as u16).wrapping_sub(c as u16);
    let result = diff as u8;
    let ov = ((a ^ b) & 0x80) != 0 && ((a ^ result) & 0x80) != 0;
    (result, (diff >> 8) != 0, ov, ac)
}

/// Returns `(A, B, OV)`.
#[inline(always)]
fn mul(a: u8, b: u8) -> (u8, u8, bool) {
    let mul = a as u16 * b as u16;
    (mul as u8, (mul >> 8) as u8, mul > 0xFF)
}

/// Returns `(A, B, OV)`. Dividing by zero sets OV and leaves A and B alone.
#[inline(always)]
fn div(a: u8, b: u8) -> (u8, u8, bool) {
    if b == 0 {
        return (a, b, true);
    }
    (a / b, a % b, false)
}

#[inline(always)]
fn rlc(a: u8, c: bool) -> (u8, bool) {
    ((a << 1) | c as u8, a & 0x80 != 0)
}

#[inline(always)]
fn rrc(a: u8, c: bool) -> (u8, bool) {
    ((a >> 1) | ((c as u8) << 7), a & 0x01 != 0)
}

#[inline(always)]
fn rl(a: u8) -> u8 {
    a.rotate_left(1)
}

#[inline(always)]
fn rr(a: u8) -> u8 {
    a.rotate_right(1)
}
