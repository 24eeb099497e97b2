mod common;

use common::*;
use i8051emu_core::input::SEQ_KEY_PRESSED;
use i8051emu_core::{Config, Key, KeyReleaseMode, MatrixKey, SequentialKey};
use proptest::prelude::*;

fn inputs(session: &i8051emu_core::Session<FakeEngine, FakeDisassembler>) -> (u8, u8, u8) {
    let engine = session.controller().engine();
    (engine.cskb0, engine.cskb1, engine.p3)
}

/// Selects column `csds` by executing `MOV CSDS, #csds`.
fn with_columns(config: &Config, csds: u8) -> i8051emu_core::Session<FakeEngine, FakeDisassembler> {
    let mut session = session_with(config);
    session.on_file_loaded(&[0x75, csds, 0x80, 0x02]).unwrap();
    session.on_step().unwrap();
    session
}

#[test]
fn matrix_press_and_release_touch_one_bit() {
    let mut session = session();
    session.on_key_pressed(MatrixKey::Digit(3).into());
    assert_eq!(inputs(&session), (0b0000_1000, 0, 0));

    session.on_key_pressed(MatrixKey::Enter.into());
    assert_eq!(inputs(&session), (0b0000_1000, 0b1000_0000, 0));

    session.on_key_released(MatrixKey::Digit(3).into());
    assert_eq!(inputs(&session), (0, 0b1000_0000, 0));
}

#[test]
fn press_is_idempotent() {
    let mut session = session();
    session.on_key_pressed(MatrixKey::Digit(9).into());
    session.on_key_pressed(MatrixKey::Digit(9).into());
    assert_eq!(inputs(&session), (0, 0b0000_0010, 0));
    session.on_key_released(MatrixKey::Digit(9).into());
    session.on_key_released(MatrixKey::Digit(9).into());
    assert_eq!(inputs(&session), (0, 0, 0));
}

#[test]
fn every_input_change_refreshes_the_engine() {
    let mut session = session();
    session.on_key_pressed(MatrixKey::Up.into());
    session.on_key_released(MatrixKey::Up.into());
    assert_eq!(session.controller().engine().refreshes, 2);
}

#[test]
fn sequential_press_needs_a_listening_column() {
    let mut session = session();
    session.on_key_pressed(SequentialKey::Enter.into());
    assert_eq!(inputs(&session), (0, 0, 0));
    assert_eq!(session.controller().engine().refreshes, 0);

    let mut session = with_columns(&Config::default(), 1 << SequentialKey::Enter.column());
    session.on_key_pressed(SequentialKey::Esc.into());
    assert_eq!(inputs(&session).2, 0);

    session.on_key_pressed(SequentialKey::Enter.into());
    assert_eq!(inputs(&session).2, SEQ_KEY_PRESSED.mask());
    assert!(session.controller().input().is_held(SequentialKey::Enter.into()));
    assert!(session.controller().view().ports[3].bits[2]);

    session.on_key_released(SequentialKey::Enter.into());
    assert_eq!(inputs(&session).2, 0);
}

#[test]
fn per_key_release_is_gated_like_press() {
    let config = Config {
        key_release: Some(KeyReleaseMode::PerKey),
        ..Default::default()
    };
    let mut session = with_columns(&config, 1 << SequentialKey::Up.column());
    session.on_key_pressed(SequentialKey::Up.into());
    assert_eq!(inputs(&session).2, SEQ_KEY_PRESSED.mask());

    // Column deselected by a volatile reset; the release is no longer heard.
    session.on_reset();
    session.on_key_released(SequentialKey::Up.into());
    assert_eq!(inputs(&session).2, SEQ_KEY_PRESSED.mask());
}

#[test]
fn global_release_is_never_gated() {
    let mut session = with_columns(&Config::default(), 1 << SequentialKey::Up.column());
    session.on_key_pressed(SequentialKey::Up.into());
    session.on_reset();
    session.on_key_released(SequentialKey::Up.into());
    assert_eq!(inputs(&session).2, 0);
}

#[test]
fn pointer_release_frees_every_held_key() {
    let mut session = session();
    session.on_key_pressed(MatrixKey::Digit(0).into());
    session.on_key_pressed(MatrixKey::Esc.into());
    session.on_pointer_released();
    assert_eq!(inputs(&session), (0, 0, 0));
    assert_eq!(session.controller().input().held().count(), 0);
}

#[test]
fn pointer_release_is_ignored_per_key() {
    let config = Config {
        key_release: Some(KeyReleaseMode::PerKey),
        ..Default::default()
    };
    let mut session = session_with(&config);
    session.on_key_pressed(MatrixKey::Digit(0).into());
    session.on_pointer_released();
    assert_eq!(inputs(&session), (1, 0, 0));
}

proptest! {
    #[test]
    fn matrix_keys_are_isolated(index in 0..MatrixKey::ALL.len()) {
        let key = MatrixKey::ALL[index];
        let bit = key.bit();
        let mut session = session();
        session.on_key_pressed(Key::Matrix(key));
        let (cskb0, cskb1, p3) = inputs(&session);
        let expected = match bit.register {
            i8051emu_core::InputRegister::Cskb0 => (bit.mask(), 0, 0),
            i8051emu_core::InputRegister::Cskb1 => (0, bit.mask(), 0),
            i8051emu_core::InputRegister::Port3 => (0, 0, bit.mask()),
        };
        prop_assert_eq!((cskb0, cskb1, p3), expected);

        session.on_key_released(Key::Matrix(key));
        prop_assert_eq!(inputs(&session), (0, 0, 0));
    }
}
