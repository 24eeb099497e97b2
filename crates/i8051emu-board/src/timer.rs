use crate::sfr::*;

/// What one CPU step looked like from the timers' point of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimerInputs {
    /// Machine cycles the step took.
    pub cycles: u8,
    /// Falling edges seen on the T0 and T1 pins during the step.
    pub t0_edges: u8,
    pub t1_edges: u8,
    /// Levels of the INT0 and INT1 pins, for gated operation.
    pub int0: bool,
    pub int1: bool,
}

/// Timer/counters 0 and 1.
///
/// TMOD, per timer (timer 1 in the high nibble):
///
/// `[GATE, C/T, M1, M0]`
///
///  - GATE: run only while the INTx pin is high
///  - C/T: count falling edges on the Tx pin instead of machine cycles
///  - M1/M0: 13-bit, 16-bit, 8-bit auto-reload, or split (timer 0 only)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timer {
    tcon: u8,
    tmod: u8,
    th0: u8,
    tl0: u8,
    th1: u8,
    tl1: u8,
}

impl Timer {
    pub fn interest(&self, addr: u8) -> bool {
        matches!(
            addr,
            SFR_TCON | SFR_TMOD | SFR_TH0 | SFR_TL0 | SFR_TH1 | SFR_TL1
        )
    }

    pub fn read(&self, addr: u8) -> u8 {
        match addr {
            SFR_TCON => self.tcon,
            SFR_TMOD => self.tmod,
            SFR_TH0 => self.th0,
            SFR_TL0 => self.tl0,
            SFR_TH1 => self.th1,
            SFR_TL1 => self.tl1,
            _ => 0,
        }
    }

    pub fn write(&mut self, addr: u8, value: u8) {
        match addr {
            SFR_TCON => self.tcon = value,
            SFR_TMOD => self.tmod = value,
            SFR_TH0 => self.th0 = value,
            SFR_TL0 => self.tl0 = value,
            SFR_TH1 => self.th1 = value,
            SFR_TL1 => self.tl1 = value,
            _ => {}
        }
    }

    pub fn tcon(&self, bit: u8) -> bool {
        self.tcon & (1 << bit) != 0
    }

    pub fn set_tcon(&mut self, bit: u8, value: bool) {
        if value {
            self.tcon |= 1 << bit;
        } else {
            self.tcon &= !(1 << bit);
        }
    }

    pub fn tick(&mut self, inputs: TimerInputs) {
        let mode0 = self.tmod & 0x03;
        let mode1 = (self.tmod >> 4) & 0x03;
        let events0 = if self.tmod & 0x04 != 0 {
            inputs.t0_edges
        } else {
            inputs.cycles
        };
        let events1 = if self.tmod & 0x40 != 0 {
            inputs.t1_edges
        } else {
            inputs.cycles
        };
        let run0 = self.tcon(TCON_TR0) && (self.tmod & 0x08 == 0 || inputs.int0);
        let run1 = self.tcon(TCON_TR1) && (self.tmod & 0x80 == 0 || inputs.int1);

        if mode0 == 3 {
            // TL0 keeps timer 0's controls; TH0 borrows TR1 and TF1 and only
            // counts machine cycles.
            if run0 && count8(&mut self.tl0, events0) {
                self.set_tcon(TCON_TF0, true);
            }
            if self.tcon(TCON_TR1) && count8(&mut self.th0, inputs.cycles) {
                self.set_tcon(TCON_TF1, true);
            }
            // Timer 1 runs freely unless parked in mode 3, and cannot flag.
            if mode1 != 3 {
                count(&mut self.tl1, &mut self.th1, mode1, events1);
            }
            return;
        }

        if run0 && count(&mut self.tl0, &mut self.th0, mode0, events0) {
            self.set_tcon(TCON_TF0, true);
        }
        if run1 && mode1 != 3 && count(&mut self.tl1, &mut self.th1, mode1, events1) {
            self.set_tcon(TCON_TF1, true);
        }
    }
}

/// Advance a timer by `events`. Returns whether it overflowed.
fn count(tl: &mut u8, th: &mut u8, mode: u8, events: u8) -> bool {
    let mut overflow = false;
    for _ in 0..events {
        match mode {
            // 13 bits: TH is the high byte, TL the low five bits
            0 => {
                let low = (*tl & 0x1F) + 1;
                if low > 0x1F {
                    *tl &= 0xE0;
                    *th = th.wrapping_add(1);
                    overflow |= *th == 0;
                } else {
                    *tl = (*tl & 0xE0) | low;
                }
            }
            1 => {
                let (value, wrapped) = u16::from_be_bytes([*th, *tl]).overflowing_add(1);
                [*th, *tl] = value.to_be_bytes();
                overflow |= wrapped;
            }
            // 8 bits, reloaded from TH
            _ => {
                *tl = tl.wrapping_add(1);
                if *tl == 0 {
                    *tl = *th;
                    overflow = true;
                }
            }
        }
    }
    overflow
}

fn count8(reg: &mut u8, events: u8) -> bool {
    let (value, wrapped) = reg.overflowing_add(events);
    *reg = value;
    wrapped
}
