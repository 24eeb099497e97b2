//! Keypad input: pointer down/up on a simulated key becomes a single bit set or
//! clear on the engine's input registers.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::engine::{Engine, InputRegister, KeyBit};

/// P3 pin the sequential keyboard pulls when the scanned key is down.
pub const SEQ_KEY_PRESSED: KeyBit = KeyBit::new(InputRegister::Port3, 5);

/// Keys of the sequential (scanned) keyboard. Each sits on one column of the
/// display column-select register and is only read while that column is
/// selected: ENTER on bit 0 through ← on bit 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SequentialKey {
    Enter,
    Esc,
    Right,
    Up,
    Down,
    Left,
}

impl SequentialKey {
    pub const ALL: [SequentialKey; 6] = [
        SequentialKey::Enter,
        SequentialKey::Esc,
        SequentialKey::Right,
        SequentialKey::Up,
        SequentialKey::Down,
        SequentialKey::Left,
    ];

    /// Column-select bit that must be asserted for the key to be read.
    pub fn column(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            SequentialKey::Enter => "ENT",
            SequentialKey::Esc => "ESC",
            SequentialKey::Right => "→",
            SequentialKey::Up => "↑",
            SequentialKey::Down => "↓",
            SequentialKey::Left => "←",
        }
    }
}

/// Keys of the matrix keyboard. Digit `n` is CSKB0 bit `n` for 0-7; CSKB1
/// holds 8, 9, ←, →, ↑, ↓, ESC and ENTER on bits 0 to 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatrixKey {
    Digit(u8),
    Left,
    Right,
    Up,
    Down,
    Esc,
    Enter,
}

impl MatrixKey {
    pub const ALL: [MatrixKey; 16] = [
        MatrixKey::Digit(0),
        MatrixKey::Digit(1),
        MatrixKey::Digit(2),
        MatrixKey::Digit(3),
        MatrixKey::Digit(4),
        MatrixKey::Digit(5),
        MatrixKey::Digit(6),
        MatrixKey::Digit(7),
        MatrixKey::Digit(8),
        MatrixKey::Digit(9),
        MatrixKey::Left,
        MatrixKey::Right,
        MatrixKey::Up,
        MatrixKey::Down,
        MatrixKey::Esc,
        MatrixKey::Enter,
    ];

    pub fn bit(self) -> KeyBit {
        match self {
            MatrixKey::Digit(d @ 0..=7) => KeyBit::new(InputRegister::Cskb0, d),
            MatrixKey::Digit(d) => KeyBit::new(InputRegister::Cskb1, (d - 8) & 1),
            MatrixKey::Left => KeyBit::new(InputRegister::Cskb1, 2),
            MatrixKey::Right => KeyBit::new(InputRegister::Cskb1, 3),
            MatrixKey::Up => KeyBit::new(InputRegister::Cskb1, 4),
            MatrixKey::Down => KeyBit::new(InputRegister::Cskb1, 5),
            MatrixKey::Esc => KeyBit::new(InputRegister::Cskb1, 6),
            MatrixKey::Enter => KeyBit::new(InputRegister::Cskb1, 7),
        }
    }

    pub fn from_bit(bit: KeyBit) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.bit() == bit)
    }

    pub fn label(self) -> String {
        match self {
            MatrixKey::Digit(d) => d.to_string(),
            MatrixKey::Left => "←".into(),
            MatrixKey::Right => "→".into(),
            MatrixKey::Up => "↑".into(),
            MatrixKey::Down => "↓".into(),
            MatrixKey::Esc => "ESC".into(),
            MatrixKey::Enter => "ENT".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Sequential(SequentialKey),
    Matrix(MatrixKey),
}

impl Key {
    /// The input bit this key drives.
    pub fn bit(self) -> KeyBit {
        match self {
            Key::Sequential(_) => SEQ_KEY_PRESSED,
            Key::Matrix(key) => key.bit(),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Sequential(key) => write!(f, "seq {:?}", key),
            Key::Matrix(key) => write!(f, "matrix {}", key.label()),
        }
    }
}

impl From<SequentialKey> for Key {
    fn from(key: SequentialKey) -> Self {
        Key::Sequential(key)
    }
}

impl From<MatrixKey> for Key {
    fn from(key: MatrixKey) -> Self {
        Key::Matrix(key)
    }
}

/// How key releases are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyReleaseMode {
    /// Held keys are also released by a pointer-up anywhere in the window,
    /// and releases are never gated.
    #[default]
    Global,
    /// Only a pointer-up on the key itself releases it; sequential releases
    /// are gated on the key's column like presses are.
    PerKey,
}

/// Turns key presses into input-register bit changes.
#[derive(Debug, Clone, Default)]
pub struct InputBridge {
    mode: KeyReleaseMode,
    held: BTreeSet<Key>,
}

impl InputBridge {
    pub fn new(mode: KeyReleaseMode) -> Self {
        Self {
            mode,
            held: BTreeSet::new(),
        }
    }

    pub fn mode(&self) -> KeyReleaseMode {
        self.mode
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn held(&self) -> impl Iterator<Item = Key> + '_ {
        self.held.iter().copied()
    }

    fn column_listening(engine: &impl Engine, key: SequentialKey) -> bool {
        engine.read_ext_devices().csds & (1 << key.column()) != 0
    }

    /// Press `key`. Returns `false` when the press was ignored because a
    /// sequential key's column is not being scanned.
    pub fn press(&mut self, engine: &mut impl Engine, key: Key) -> bool {
        if let Key::Sequential(seq) = key {
            if !Self::column_listening(engine, seq) {
                trace!(%key, "column not selected, press ignored");
                return false;
            }
        }
        let bit = key.bit();
        engine.set_input_bit(bit.register, bit.bit);
        engine.refresh();
        self.held.insert(key);
        trace!(%key, %bit, "key down");
        true
    }

    /// Release `key`. Returns `false` when the release was gated away.
    pub fn release(&mut self, engine: &mut impl Engine, key: Key) -> bool {
        if let (KeyReleaseMode::PerKey, Key::Sequential(seq)) = (self.mode, key) {
            if !Self::column_listening(engine, seq) {
                trace!(%key, "column not selected, release ignored");
                return false;
            }
        }
        let bit = key.bit();
        engine.clear_input_bit(bit.register, bit.bit);
        engine.refresh();
        self.held.remove(&key);
        trace!(%key, %bit, "key up");
        true
    }

    /// A pointer-up somewhere in the window. In [`KeyReleaseMode::Global`]
    /// this releases every held key; returns how many were released.
    pub fn release_all(&mut self, engine: &mut impl Engine) -> usize {
        if self.mode == KeyReleaseMode::PerKey {
            return 0;
        }
        let held = std::mem::take(&mut self.held);
        for key in &held {
            self.release(engine, *key);
        }
        held.len()
    }

    /// Forget held keys without touching the engine, e.g. after a reset
    /// already cleared the inputs.
    pub fn forget(&mut self) {
        self.held.clear();
    }
}
