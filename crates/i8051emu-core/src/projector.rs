//! Hardware state projection: raw engine bytes in, renderable view models out.
//!
//! Everything here is a pure function of its input. A projection is always
//! rebuilt from a complete [`RawSnapshot`]; nothing is patched in place, so two
//! projections of equal snapshots are equal.

use std::fmt;

use crate::engine::{Engine, ExtDeviceBytes, MemorySpace, RegisterSnapshot};

/// Bumped whenever [`FLAG_TABLE`] changes meaning.
pub const FLAG_TABLE_VERSION: u32 = 1;

/// Bits of P1 that switch the board peripherals. All three are active low.
pub const P1_BUZZER_OFF: u8 = 5;
pub const P1_DISPLAY_OFF: u8 = 6;
pub const P1_LED_OFF: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControlRegister {
    Ie,
    Ip,
    Psw,
    Tcon,
    Tmod,
}

impl ControlRegister {
    pub const ALL: [ControlRegister; 5] = [
        ControlRegister::Ie,
        ControlRegister::Ip,
        ControlRegister::Psw,
        ControlRegister::Tcon,
        ControlRegister::Tmod,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ControlRegister::Ie => "IE",
            ControlRegister::Ip => "IP",
            ControlRegister::Psw => "PSW",
            ControlRegister::Tcon => "TCON",
            ControlRegister::Tmod => "TMOD",
        }
    }
}

/// Every named control/status bit the flags table shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Flag {
    Ea,
    Es,
    Et1,
    Ex1,
    Et0,
    Ex0,
    Ps,
    Pt1,
    Px1,
    Pt0,
    Px0,
    C,
    Ac,
    F0,
    Rs1,
    Rs0,
    Ov,
    F1,
    P,
    Tf1,
    Tr1,
    Tf0,
    Tr0,
    Ie1,
    It1,
    Ie0,
    It0,
    T1Gate,
    T1Ct,
    T1M1,
    T1M0,
    T0Gate,
    T0Ct,
    T0M1,
    T0M0,
}

/// Where a flag lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagBit {
    pub flag: Flag,
    pub register: ControlRegister,
    pub bit: u8,
    pub name: &'static str,
    /// Column header in the flags table; TMOD repeats GATE, C/T, M1, M0 per timer.
    pub label: &'static str,
}

const fn fb(
    flag: Flag,
    register: ControlRegister,
    bit: u8,
    name: &'static str,
    label: &'static str,
) -> FlagBit {
    FlagBit {
        flag,
        register,
        bit,
        name,
        label,
    }
}

/// Bit-to-name table, in [`Flag`] declaration order.
pub const FLAG_TABLE: [FlagBit; 35] = {
    use ControlRegister::*;
    [
        fb(Flag::Ea, Ie, 7, "EA", "EA"),
        fb(Flag::Es, Ie, 4, "ES", "ES"),
        fb(Flag::Et1, Ie, 3, "ET1", "ET1"),
        fb(Flag::Ex1, Ie, 2, "EX1", "EX1"),
        fb(Flag::Et0, Ie, 1, "ET0", "ET0"),
        fb(Flag::Ex0, Ie, 0, "EX0", "EX0"),
        fb(Flag::Ps, Ip, 4, "PS", "PS"),
        fb(Flag::Pt1, Ip, 3, "PT1", "PT1"),
        fb(Flag::Px1, Ip, 2, "PX1", "PX1"),
        fb(Flag::Pt0, Ip, 1, "PT0", "PT0"),
        fb(Flag::Px0, Ip, 0, "PX0", "PX0"),
        fb(Flag::C, Psw, 7, "C", "C"),
        fb(Flag::Ac, Psw, 6, "AC", "AC"),
        fb(Flag::F0, Psw, 5, "F0", "F0"),
        fb(Flag::Rs1, Psw, 4, "RS1", "RS1"),
        fb(Flag::Rs0, Psw, 3, "RS0", "RS0"),
        fb(Flag::Ov, Psw, 2, "OV", "OV"),
        fb(Flag::F1, Psw, 1, "F1", "F1"),
        fb(Flag::P, Psw, 0, "P", "P"),
        fb(Flag::Tf1, Tcon, 7, "TF1", "TF1"),
        fb(Flag::Tr1, Tcon, 6, "TR1", "TR1"),
        fb(Flag::Tf0, Tcon, 5, "TF0", "TF0"),
        fb(Flag::Tr0, Tcon, 4, "TR0", "TR0"),
        fb(Flag::Ie1, Tcon, 3, "IE1", "IE1"),
        fb(Flag::It1, Tcon, 2, "IT1", "IT1"),
        fb(Flag::Ie0, Tcon, 1, "IE0", "IE0"),
        fb(Flag::It0, Tcon, 0, "IT0", "IT0"),
        fb(Flag::T1Gate, Tmod, 7, "T1_GATE", "GATE"),
        fb(Flag::T1Ct, Tmod, 6, "T1_CT", "C/T"),
        fb(Flag::T1M1, Tmod, 5, "T1_M1", "M1"),
        fb(Flag::T1M0, Tmod, 4, "T1_M0", "M0"),
        fb(Flag::T0Gate, Tmod, 3, "T0_GATE", "GATE"),
        fb(Flag::T0Ct, Tmod, 2, "T0_CT", "C/T"),
        fb(Flag::T0M1, Tmod, 1, "T0_M1", "M1"),
        fb(Flag::T0M0, Tmod, 0, "T0_M0", "M0"),
    ]
};

impl Flag {
    pub fn info(self) -> &'static FlagBit {
        &FLAG_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }
}

/// Decoded state of every flag in [`FLAG_TABLE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSet {
    values: [bool; FLAG_TABLE.len()],
}

impl Default for FlagSet {
    fn default() -> Self {
        Self {
            values: [false; FLAG_TABLE.len()],
        }
    }
}

impl FlagSet {
    pub fn get(&self, flag: Flag) -> bool {
        self.values[flag as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static FlagBit, bool)> + '_ {
        FLAG_TABLE.iter().zip(self.values.iter().copied())
    }

    /// One table row: bit 7 first, `None` where the register has no named bit.
    pub fn row(&self, register: ControlRegister) -> [Option<(&'static FlagBit, bool)>; 8] {
        let mut row = [None; 8];
        for (info, value) in self.iter().filter(|(info, _)| info.register == register) {
            row[7 - info.bit as usize] = Some((info, value));
        }
        row
    }
}

pub fn decode_flags(ie: u8, ip: u8, psw: u8, tcon: u8, tmod: u8) -> FlagSet {
    let mut values = [false; FLAG_TABLE.len()];
    for (value, info) in values.iter_mut().zip(FLAG_TABLE.iter()) {
        let byte = match info.register {
            ControlRegister::Ie => ie,
            ControlRegister::Ip => ip,
            ControlRegister::Psw => psw,
            ControlRegister::Tcon => tcon,
            ControlRegister::Tmod => tmod,
        };
        *value = byte & (1 << info.bit) != 0;
    }
    FlagSet { values }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Port {
    P0,
    P1,
    P2,
    P3,
}

impl Port {
    pub const ALL: [Port; 4] = [Port::P0, Port::P1, Port::P2, Port::P3];
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", *self as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtDevice {
    Csds,
    Csdb,
    Cskb0,
    Cskb1,
}

impl ExtDevice {
    pub const ALL: [ExtDevice; 4] = [
        ExtDevice::Csds,
        ExtDevice::Csdb,
        ExtDevice::Cskb0,
        ExtDevice::Cskb1,
    ];
}

impl fmt::Display for ExtDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExtDevice::Csds => "CSDS",
            ExtDevice::Csdb => "CSDB",
            ExtDevice::Cskb0 => "CSKB0",
            ExtDevice::Cskb1 => "CSKB1",
        })
    }
}

/// A named 8-bit register split into bits, most significant bit first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterBits<R> {
    pub register: R,
    pub bits: [bool; 8],
}

impl<R> RegisterBits<R> {
    pub fn new(register: R, value: u8) -> Self {
        Self {
            register,
            bits: std::array::from_fn(|i| value & (0x80 >> i) != 0),
        }
    }

    pub fn value(&self) -> u8 {
        self.bits
            .iter()
            .fold(0, |acc, &bit| (acc << 1) | bit as u8)
    }
}

pub type PortRegister = RegisterBits<Port>;
pub type ExtDeviceRegister = RegisterBits<ExtDevice>;

pub fn decode_ports(raw: &[u8]) -> Vec<PortRegister> {
    Port::ALL
        .into_iter()
        .zip(raw)
        .map(|(port, &value)| PortRegister::new(port, value))
        .collect()
}

pub fn decode_ext_devices(raw: ExtDeviceBytes) -> Vec<ExtDeviceRegister> {
    let values = [raw.csds, raw.csdb, raw.cskb0, raw.cskb1];
    ExtDevice::ALL
        .into_iter()
        .zip(values)
        .map(|(device, value)| ExtDeviceRegister::new(device, value))
        .collect()
}

/// Segments of one 7-segment digit. Bit 0 of the encoded byte is segment a,
/// bit 6 is segment g and bit 7 is the decimal point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DigitState {
    /// Segments a through g.
    pub segments: [bool; 7],
    pub dp: bool,
}

const GLYPHS: [(u8, char); 22] = [
    (0x3F, '0'),
    (0x06, '1'),
    (0x5B, '2'),
    (0x4F, '3'),
    (0x66, '4'),
    (0x6D, '5'),
    (0x7D, '6'),
    (0x07, '7'),
    (0x7F, '8'),
    (0x6F, '9'),
    (0x77, 'A'),
    (0x7C, 'b'),
    (0x39, 'C'),
    (0x5E, 'd'),
    (0x79, 'E'),
    (0x71, 'F'),
    (0x76, 'H'),
    (0x38, 'L'),
    (0x73, 'P'),
    (0x3E, 'U'),
    (0x40, '-'),
    (0x00, ' '),
];

impl DigitState {
    pub fn from_byte(byte: u8) -> Self {
        Self {
            segments: std::array::from_fn(|i| byte & (1 << i) != 0),
            dp: byte & 0x80 != 0,
        }
    }

    pub fn to_byte(&self) -> u8 {
        let segments = self
            .segments
            .iter()
            .enumerate()
            .fold(0, |acc, (i, &on)| acc | ((on as u8) << i));
        segments | ((self.dp as u8) << 7)
    }

    pub fn is_blank(&self) -> bool {
        self.to_byte() == 0
    }

    /// The character this segment pattern shows, or `None` for patterns that
    /// are not a hex digit or one of a few common letters.
    pub fn glyph(&self) -> Option<char> {
        let pattern = self.to_byte() & 0x7F;
        GLYPHS
            .iter()
            .find(|(code, _)| *code == pattern)
            .map(|(_, c)| *c)
    }
}

/// Decode the display. `csd` holds the least significant digit first; the
/// result holds the most significant (leftmost) digit first.
pub fn decode_digits(csd: &[u8]) -> Vec<DigitState> {
    csd.iter().rev().map(|&byte| DigitState::from_byte(byte)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeripheralEnableFlags {
    pub display_enabled: bool,
    pub buzzer_enabled: bool,
    pub led_enabled: bool,
}

pub fn decode_enable_flags(peripheral_control: u8) -> PeripheralEnableFlags {
    let low = |bit: u8| peripheral_control & (1 << bit) == 0;
    PeripheralEnableFlags {
        display_enabled: low(P1_DISPLAY_OFF),
        buzzer_enabled: low(P1_BUZZER_OFF),
        led_enabled: low(P1_LED_OFF),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyRegisterName {
    Pc,
    A,
    B,
    Sp,
    Dptr,
    Psw,
    R(u8),
}

impl fmt::Display for KeyRegisterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyRegisterName::Pc => f.write_str("PC"),
            KeyRegisterName::A => f.write_str("A"),
            KeyRegisterName::B => f.write_str("B"),
            KeyRegisterName::Sp => f.write_str("SP"),
            KeyRegisterName::Dptr => f.write_str("DPTR"),
            KeyRegisterName::Psw => f.write_str("PSW"),
            KeyRegisterName::R(n) => write!(f, "R{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRegister {
    pub name: KeyRegisterName,
    pub value: u16,
}

impl KeyRegister {
    /// Hex digits needed to show the value.
    pub fn width(&self) -> usize {
        match self.name {
            KeyRegisterName::Pc | KeyRegisterName::Dptr => 4,
            _ => 2,
        }
    }
}

impl fmt::Display for KeyRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:0width$X}", self.name, self.value, width = self.width())
    }
}

pub fn decode_key_registers(regs: &RegisterSnapshot) -> Vec<KeyRegister> {
    let mut out = vec![
        KeyRegister {
            name: KeyRegisterName::Pc,
            value: regs.pc,
        },
        KeyRegister {
            name: KeyRegisterName::A,
            value: regs.a as u16,
        },
        KeyRegister {
            name: KeyRegisterName::B,
            value: regs.b as u16,
        },
        KeyRegister {
            name: KeyRegisterName::Sp,
            value: regs.sp as u16,
        },
        KeyRegister {
            name: KeyRegisterName::Dptr,
            value: regs.dptr,
        },
        KeyRegister {
            name: KeyRegisterName::Psw,
            value: regs.psw as u16,
        },
    ];
    out.extend((0..8).map(|n| KeyRegister {
        name: KeyRegisterName::R(n),
        value: regs.r[n as usize] as u16,
    }));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryCell {
    pub address: u16,
    pub value: u8,
}

/// Everything the projector reads, captured from the engine in one go. Only
/// the selected memory space is copied.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawSnapshot {
    pub pc: u16,
    pub registers: RegisterSnapshot,
    pub ports: [u8; 4],
    pub ext: ExtDeviceBytes,
    pub display: Vec<u8>,
    pub memory_space: MemorySpace,
    /// Raw cells of `memory_space`.
    pub memory: Vec<u8>,
}

impl RawSnapshot {
    pub fn capture(engine: &impl Engine, space: MemorySpace) -> Self {
        Self {
            pc: engine.pc(),
            registers: engine.read_registers(),
            ports: engine.read_ports(),
            ext: engine.read_ext_devices(),
            display: engine.read_display_bytes(),
            memory_space: space,
            memory: engine.read_memory(space),
        }
    }
}

/// Cells of `space`, addressed from the space's base address.
pub fn project_memory(space: MemorySpace, cells: &[u8]) -> Vec<MemoryCell> {
    let base = space.base_address();
    cells
        .iter()
        .enumerate()
        .map(|(i, &value)| MemoryCell {
            address: base.wrapping_add(i as u16),
            value,
        })
        .collect()
}

/// The complete renderable state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewModel {
    pub current_addr: u16,
    pub flags: FlagSet,
    pub ports: Vec<PortRegister>,
    pub ext_devices: Vec<ExtDeviceRegister>,
    pub key_registers: Vec<KeyRegister>,
    pub digits: Vec<DigitState>,
    pub enables: PeripheralEnableFlags,
    pub memory_space: MemorySpace,
    pub memory: Vec<MemoryCell>,
}

pub fn project(raw: &RawSnapshot) -> ViewModel {
    let regs = &raw.registers;
    ViewModel {
        current_addr: raw.pc,
        flags: decode_flags(regs.ie, regs.ip, regs.psw, regs.tcon, regs.tmod),
        ports: decode_ports(&raw.ports),
        ext_devices: decode_ext_devices(raw.ext),
        key_registers: decode_key_registers(regs),
        digits: decode_digits(&raw.display),
        enables: decode_enable_flags(raw.ports[Port::P1 as usize]),
        memory_space: raw.memory_space,
        memory: project_memory(raw.memory_space, &raw.memory),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn flag_table_is_in_declaration_order() {
        for (i, info) in FLAG_TABLE.iter().enumerate() {
            assert_eq!(info.flag as usize, i, "{} out of order", info.name);
        }
    }

    #[test]
    fn flag_table_bits_are_unique_per_register() {
        for register in ControlRegister::ALL {
            let mut seen = 0u8;
            for info in FLAG_TABLE.iter().filter(|info| info.register == register) {
                assert_eq!(seen & (1 << info.bit), 0, "{} reuses a bit", info.name);
                seen |= 1 << info.bit;
            }
        }
    }

    #[test]
    fn psw_decodes_msb_first() {
        let flags = decode_flags(0, 0, 0b1101_0001, 0, 0);
        let psw: Vec<_> = [
            Flag::C,
            Flag::Ac,
            Flag::F0,
            Flag::Rs1,
            Flag::Rs0,
            Flag::Ov,
            Flag::F1,
            Flag::P,
        ]
        .into_iter()
        .map(|f| flags.get(f))
        .collect();
        assert_eq!(psw, [true, true, false, true, false, false, false, true]);

        let flags = decode_flags(0, 0, 0b1011_0001, 0, 0);
        assert!(flags.get(Flag::C));
        assert!(!flags.get(Flag::Ac));
        assert!(flags.get(Flag::F0));
        assert!(flags.get(Flag::Rs1));
        assert!(!flags.get(Flag::Rs0));
        assert!(flags.get(Flag::P));
    }

    #[test]
    fn flags_come_from_their_own_register() {
        let flags = decode_flags(0x80, 0x00, 0x00, 0x10, 0x01);
        assert!(flags.get(Flag::Ea));
        assert!(flags.get(Flag::Tr0));
        assert!(flags.get(Flag::T0M0));
        assert_eq!(flags.iter().filter(|(_, on)| *on).count(), 3);
    }

    #[test]
    fn ie_row_leaves_unnamed_bits_empty() {
        let flags = decode_flags(0b1001_0001, 0, 0, 0, 0);
        let row = flags.row(ControlRegister::Ie);
        assert_eq!(row[0].map(|(i, v)| (i.name, v)), Some(("EA", true)));
        assert!(row[1].is_none());
        assert!(row[2].is_none());
        assert_eq!(row[3].map(|(i, v)| (i.name, v)), Some(("ES", true)));
        assert_eq!(row[7].map(|(i, v)| (i.name, v)), Some(("EX0", true)));
    }

    #[test]
    fn ports_are_msb_first() {
        let ports = decode_ports(&[0x80, 0x01, 0xFF, 0x00]);
        assert_eq!(ports.len(), 4);
        assert_eq!(ports[0].register, Port::P0);
        assert_eq!(ports[0].bits, [true, false, false, false, false, false, false, false]);
        assert_eq!(ports[1].bits, [false, false, false, false, false, false, false, true]);
        assert_eq!(ports[3].register.to_string(), "P3");
    }

    #[test]
    fn digits_are_reversed_for_display() {
        let digits = decode_digits(&[0x06, 0x5B]);
        assert_eq!(digits, vec![DigitState::from_byte(0x5B), DigitState::from_byte(0x06)]);
        assert_eq!(digits[0].glyph(), Some('2'));
        assert_eq!(digits[1].glyph(), Some('1'));
    }

    #[test]
    fn digit_segments_follow_bit_order() {
        let one = DigitState::from_byte(0x06);
        assert_eq!(one.segments, [false, true, true, false, false, false, false]);
        assert!(!one.dp);
        let dotted = DigitState::from_byte(0x86);
        assert!(dotted.dp);
        assert_eq!(dotted.glyph(), Some('1'));
        assert_eq!(DigitState::from_byte(0x49).glyph(), None);
    }

    #[test]
    fn peripherals_are_active_low() {
        let all_off = decode_enable_flags(0xFF);
        assert_eq!(all_off, PeripheralEnableFlags::default());

        let display_only = decode_enable_flags(!(1 << P1_DISPLAY_OFF));
        assert!(display_only.display_enabled);
        assert!(!display_only.buzzer_enabled);
        assert!(!display_only.led_enabled);
    }

    #[test]
    fn key_registers_cover_working_set() {
        let regs = RegisterSnapshot {
            pc: 0x0123,
            a: 0x42,
            dptr: 0xFF30,
            r: [0, 1, 2, 3, 4, 5, 6, 7],
            ..Default::default()
        };
        let keys = decode_key_registers(&regs);
        assert_eq!(keys.len(), 14);
        assert_eq!(keys[0].to_string(), "PC=0123");
        assert_eq!(keys[1].to_string(), "A=42");
        assert_eq!(keys[4].to_string(), "DPTR=FF30");
        assert_eq!(keys[13].to_string(), "R7=07");
    }

    #[test]
    fn memory_cells_start_at_the_space_base() {
        let sfr = project_memory(MemorySpace::Sfr, &[4, 5, 6]);
        assert_eq!(
            sfr,
            vec![
                MemoryCell { address: 0x80, value: 4 },
                MemoryCell { address: 0x81, value: 5 },
                MemoryCell { address: 0x82, value: 6 },
            ]
        );
        assert_eq!(project_memory(MemorySpace::Rom, &[1, 2])[1], MemoryCell { address: 1, value: 2 });
    }

    #[test]
    fn projection_uses_the_captured_space() {
        let raw = RawSnapshot {
            memory_space: MemorySpace::Xram,
            memory: vec![9; 3],
            ..Default::default()
        };
        let view = project(&raw);
        assert_eq!(view.memory_space, MemorySpace::Xram);
        assert_eq!(view.memory.len(), 3);
    }

    #[test]
    fn default_view_has_every_flag_clear() {
        let view = ViewModel::default();
        assert!(view.flags.iter().all(|(_, value)| !value));
        assert_eq!(view.flags.iter().count(), FLAG_TABLE.len());
        assert_eq!(view.flags, decode_flags(0, 0, 0, 0, 0));
    }

    proptest! {
        #[test]
        fn projection_is_deterministic(
            regs in any::<[u8; 8]>(),
            ports in any::<[u8; 4]>(),
            display in proptest::collection::vec(any::<u8>(), 0..8),
            ram in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let raw = RawSnapshot {
                pc: u16::from_le_bytes([regs[0], regs[1]]),
                registers: RegisterSnapshot {
                    a: regs[2],
                    psw: regs[3],
                    ie: regs[4],
                    ip: regs[5],
                    tcon: regs[6],
                    tmod: regs[7],
                    ..Default::default()
                },
                ports,
                display,
                memory_space: MemorySpace::Ram,
                memory: ram,
                ..Default::default()
            };
            let first = project(&raw);
            let second = project(&raw.clone());
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(first.memory.len(), raw.memory.len());
            prop_assert_eq!(first.digits.len(), raw.display.len());
        }

        #[test]
        fn register_bits_round_trip(value in any::<u8>()) {
            let bits = PortRegister::new(Port::P2, value);
            prop_assert_eq!(bits.value(), value);
            prop_assert_eq!(bits.bits[0], value & 0x80 != 0);
            prop_assert_eq!(bits.bits[7], value & 0x01 != 0);
        }

        #[test]
        fn flag_decoding_matches_table(ie in any::<u8>(), ip in any::<u8>(), psw in any::<u8>(), tcon in any::<u8>(), tmod in any::<u8>()) {
            let flags = decode_flags(ie, ip, psw, tcon, tmod);
            for (info, value) in flags.iter() {
                let byte = [ie, ip, psw, tcon, tmod][info.register as usize];
                prop_assert_eq!(value, byte & (1 << info.bit) != 0);
            }
        }
    }
}
