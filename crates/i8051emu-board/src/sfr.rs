//! SFR (special-function register) addresses and bit positions for the 8051.

/// Base address for SFRs: 0x80
pub const SFR_BASE: u8 = 0x80;
/// Port 0 latch
pub const SFR_P0: u8 = 0x80;
/// Stack pointer: the last byte pushed onto the internal-RAM stack
pub const SFR_SP: u8 = 0x81;
/// Data pointer low byte
pub const SFR_DPL: u8 = 0x82;
/// Data pointer high byte
pub const SFR_DPH: u8 = 0x83;
/// Power control
pub const SFR_PCON: u8 = 0x87;
/// Timer/counter control, plus the external interrupt flags
pub const SFR_TCON: u8 = 0x88;
/// Timer/counter mode
pub const SFR_TMOD: u8 = 0x89;
pub const SFR_TL0: u8 = 0x8A;
pub const SFR_TL1: u8 = 0x8B;
pub const SFR_TH0: u8 = 0x8C;
pub const SFR_TH1: u8 = 0x8D;
/// Port 1 latch. On the DSM-51 this carries the display, buzzer and LED enables.
pub const SFR_P1: u8 = 0x90;
/// Serial control
pub const SFR_SCON: u8 = 0x98;
/// Serial buffer
pub const SFR_SBUF: u8 = 0x99;
/// Port 2 latch; also the high byte for `MOVX @Ri`
pub const SFR_P2: u8 = 0xA0;
/// Interrupt enable
pub const SFR_IE: u8 = 0xA8;
/// Port 3 latch
pub const SFR_P3: u8 = 0xB0;
/// Interrupt priority
pub const SFR_IP: u8 = 0xB8;
/// Program status word
pub const SFR_PSW: u8 = 0xD0;
/// Accumulator
pub const SFR_A: u8 = 0xE0;
/// B register, used by `MUL AB` and `DIV AB`
pub const SFR_B: u8 = 0xF0;

/// Carry flag
pub const PSW_C: u8 = 7;
/// Auxiliary carry, out of bit 3
pub const PSW_AC: u8 = 6;
/// User flag 0
pub const PSW_F0: u8 = 5;
/// Register bank select, high bit
pub const PSW_RS1: u8 = 4;
/// Register bank select, low bit
pub const PSW_RS0: u8 = 3;
/// Signed overflow
pub const PSW_OV: u8 = 2;
/// User flag 1
pub const PSW_F1: u8 = 1;
/// Even parity of the accumulator
pub const PSW_P: u8 = 0;

pub const TCON_TF1: u8 = 7;
pub const TCON_TR1: u8 = 6;
pub const TCON_TF0: u8 = 5;
pub const TCON_TR0: u8 = 4;
pub const TCON_IE1: u8 = 3;
pub const TCON_IT1: u8 = 2;
pub const TCON_IE0: u8 = 1;
pub const TCON_IT0: u8 = 0;

/// Global interrupt enable
pub const IE_EA: u8 = 7;
pub const IE_ES: u8 = 4;
pub const IE_ET1: u8 = 3;
pub const IE_EX1: u8 = 2;
pub const IE_ET0: u8 = 1;
pub const IE_EX0: u8 = 0;

pub const SCON_TI: u8 = 1;
pub const SCON_RI: u8 = 0;

/// External interrupt 0 input
pub const P3_INT0: u8 = 2;
/// External interrupt 1 input
pub const P3_INT1: u8 = 3;
/// Timer 0 counter input
pub const P3_T0: u8 = 4;
/// Timer 1 counter input. The DSM-51 sequential keyboard drives this pin.
pub const P3_T1: u8 = 5;

/// Port latch addresses, indexed by port number.
pub const PORTS: [u8; 4] = [SFR_P0, SFR_P1, SFR_P2, SFR_P3];

pub fn is_port(addr: u8) -> bool {
    PORTS.contains(&addr)
}
