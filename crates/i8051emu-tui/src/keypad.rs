//! Where the on-screen keys sit, so mouse events can be mapped back to them.

use i8051emu_core::{Key, MatrixKey, SequentialKey};
use ratatui::layout::{Position, Rect};

/// Width of one key cap, including its right-hand gap.
pub const KEY_WIDTH: u16 = 5;
/// Lines taken by the whole keypad: a label and one row for the sequential
/// keys, a label and four rows for the matrix.
pub const KEYPAD_HEIGHT: u16 = 7;

const MATRIX_ROWS: [[MatrixKey; 4]; 4] = [
    [
        MatrixKey::Digit(7),
        MatrixKey::Digit(8),
        MatrixKey::Digit(9),
        MatrixKey::Esc,
    ],
    [
        MatrixKey::Digit(4),
        MatrixKey::Digit(5),
        MatrixKey::Digit(6),
        MatrixKey::Up,
    ],
    [
        MatrixKey::Digit(1),
        MatrixKey::Digit(2),
        MatrixKey::Digit(3),
        MatrixKey::Down,
    ],
    [
        MatrixKey::Digit(0),
        MatrixKey::Left,
        MatrixKey::Right,
        MatrixKey::Enter,
    ],
];

/// One key cap on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCap {
    pub key: Key,
    pub area: Rect,
}

impl KeyCap {
    pub fn label(&self) -> String {
        match self.key {
            Key::Sequential(key) => key.label().to_string(),
            Key::Matrix(key) => key.label(),
        }
    }
}

/// Lay the keypad out inside `area`. Caps that would fall outside the area
/// are left out.
pub fn layout(area: Rect) -> Vec<KeyCap> {
    let mut caps = Vec::new();
    let mut place = |key: Key, col: u16, row: u16| {
        let cap = Rect::new(area.x + col * KEY_WIDTH, area.y + row, KEY_WIDTH - 1, 1);
        if cap.right() <= area.right() && cap.bottom() <= area.bottom() {
            caps.push(KeyCap { key, area: cap });
        }
    };

    for (col, key) in SequentialKey::ALL.into_iter().enumerate() {
        place(key.into(), col as u16, 1);
    }
    for (row, keys) in MATRIX_ROWS.iter().enumerate() {
        for (col, key) in keys.iter().enumerate() {
            place((*key).into(), col as u16, 3 + row as u16);
        }
    }
    caps
}

/// The key under the given terminal cell, if any.
pub fn hit(caps: &[KeyCap], column: u16, row: u16) -> Option<Key> {
    caps.iter()
        .find(|cap| cap.area.contains(Position::new(column, row)))
        .map(|cap| cap.key)
}
