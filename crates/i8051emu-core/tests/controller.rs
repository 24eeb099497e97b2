mod common;

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use common::*;
use i8051emu_core::{
    Change, Command, Config, EngineError, Error, LoadError, MemorySpace, RunMode,
    DisassembleError, Session,
};

fn pcs_after_steps(n: usize) -> Vec<u16> {
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    (0..n)
        .map(|_| {
            session.on_step().unwrap();
            session.controller().state().cursor.current
        })
        .collect()
}

#[test]
fn step_follows_rows_then_branches() {
    assert_eq!(pcs_after_steps(6), vec![1, 2, 3, 0, 1, 2]);
}

#[test]
fn step_without_program_is_a_no_op() {
    let mut session = session();
    session.on_step().unwrap();
    assert_eq!(session.controller().engine().steps, 0);
    assert_eq!(session.controller().mode(), RunMode::Idle);
}

#[test]
fn load_installs_rows_and_resets_view() {
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    let controller = session.controller();
    let state = controller.state();
    let addrs: Vec<u16> = state.program.rows().iter().map(|r| r.address).collect();
    assert_eq!(addrs, vec![0, 1, 2, 3]);
    assert_eq!(state.program.rows()[3].mnemonic, "SJMP 0h");
    assert_eq!(state.cursor.current, 0);
    assert_eq!(state.memory_space, MemorySpace::Rom);
    assert_eq!(state.view.memory.len(), ROM_SIZE);
    assert_eq!(controller.engine().persistent_resets, 1);
}

#[test]
fn empty_load_leaves_everything_as_it_was() {
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    session.on_step().unwrap();
    let before = session.controller().state().clone();

    let err = session.on_file_loaded(&[]).unwrap_err();
    assert_eq!(err, Error::Load(LoadError::Empty));

    let after = session.controller().state();
    assert_eq!(after.program, before.program);
    assert_eq!(after.cursor, before.cursor);
    assert_eq!(session.controller().engine().persistent_resets, 1);
}

#[test]
fn malformed_load_keeps_previous_program() {
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    session.on_step().unwrap();
    let rows = session.controller().state().program.clone();

    let err = session.on_file_loaded(&[0xEE, 0x00]).unwrap_err();
    assert!(matches!(
        err,
        Error::Load(LoadError::Disassembly(DisassembleError::Image(_)))
    ));
    assert_eq!(session.controller().state().program, rows);
    assert_eq!(session.controller().state().cursor.current, 1);
    assert_eq!(session.controller().engine().rom[..LOOP.len()], *LOOP);
}

#[test]
fn load_without_instructions_is_rejected() {
    let mut session = session();
    let err = session.on_file_loaded(&[0xDD]).unwrap_err();
    assert_eq!(err, Error::Load(LoadError::NoInstructions));
    assert!(session.controller().state().program.is_empty());
}

#[test]
fn engine_rejection_keeps_previous_program() {
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    session.on_step().unwrap();
    let before = session.controller().state().clone();

    let oversized = vec![0u8; ROM_SIZE + 1];
    let err = session.on_file_loaded(&oversized).unwrap_err();
    assert!(matches!(err, Error::Load(LoadError::Engine(EngineError::InvalidImage(_)))));

    let controller = session.controller();
    assert_eq!(controller.state().program, before.program);
    assert_eq!(controller.state().cursor, before.cursor);
    assert_eq!(controller.engine().persistent_resets, 1);
    assert_eq!(controller.engine().rom[..LOOP.len()], *LOOP);
}

#[test]
fn failed_engine_load_leaves_no_program() {
    let engine = FakeEngine {
        fail_next_load: true,
        ..Default::default()
    };
    let mut session = Session::new(engine, FakeDisassembler, &Config::default());
    let err = session.on_file_loaded(LOOP).unwrap_err();
    assert!(matches!(err, Error::Load(LoadError::Engine(_))));
    assert!(session.controller().state().program.is_empty());
    session.on_step().unwrap();
    assert_eq!(session.controller().engine().steps, 0);

    session.on_file_loaded(LOOP).unwrap();
    assert_eq!(session.controller().state().program.len(), 4);
}

#[test]
fn run_toggles_and_pause_only_acts_while_running() {
    let t0 = Instant::now();
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();

    session.on_pause();
    assert_eq!(session.controller().mode(), RunMode::Idle);

    session.apply(Command::Run, t0).unwrap();
    assert_eq!(session.controller().mode(), RunMode::Running);
    assert_eq!(session.next_deadline(), Some(t0 + CADENCE));

    session.apply(Command::Run, t0).unwrap();
    assert_eq!(session.controller().mode(), RunMode::Idle);
    assert_eq!(session.next_deadline(), None);

    session.apply(Command::Run, t0).unwrap();
    session.on_pause();
    assert_eq!(session.controller().mode(), RunMode::Idle);
    assert!(session.controller().state().run.timer().is_none());
}

#[test]
fn run_without_program_does_nothing() {
    let mut session = session();
    session.apply(Command::Run, Instant::now()).unwrap();
    assert_eq!(session.controller().mode(), RunMode::Idle);
}

#[test]
fn running_steps_once_per_cadence() {
    let t0 = Instant::now();
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    session.apply(Command::Run, t0).unwrap();

    assert!(!session.tick(t0 + CADENCE / 2).unwrap());
    assert_eq!(session.controller().engine().steps, 0);

    let mut ticks = ticks(t0);
    let first = ticks.next().unwrap();
    assert!(session.tick(first).unwrap());
    assert!(!session.tick(first).unwrap());
    assert_eq!(session.controller().engine().steps, 1);

    // A late poll fires one tick, not a backlog.
    assert!(session.tick(first + CADENCE * 10).unwrap());
    assert_eq!(session.controller().engine().steps, 2);
}

#[test]
fn manual_step_is_ignored_while_running() {
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    session.apply(Command::Run, Instant::now()).unwrap();
    session.on_step().unwrap();
    assert_eq!(session.controller().engine().steps, 0);
}

#[test]
fn run_to_target_stops_exactly_on_target() {
    let t0 = Instant::now();
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    session.apply(Command::RunToAddress(3), t0).unwrap();
    assert_eq!(session.controller().mode(), RunMode::SteppingToTarget);
    assert_eq!(session.controller().state().run.target(), Some(3));

    let mut visited = Vec::new();
    for now in ticks(t0).take(10) {
        session.tick(now).unwrap();
        visited.push(session.controller().state().cursor.current);
        if session.controller().mode() == RunMode::Idle {
            break;
        }
    }
    assert_eq!(visited, vec![1, 2, 3, 3]);
    assert_eq!(session.controller().engine().steps, 3);
    assert_eq!(session.next_deadline(), None);
}

#[test]
fn run_and_run_to_target_exclude_each_other() {
    let t0 = Instant::now();
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();

    session.apply(Command::RunToAddress(2), t0).unwrap();
    session.apply(Command::Run, t0).unwrap();
    assert_eq!(session.controller().mode(), RunMode::SteppingToTarget);
    session.on_pause();
    assert_eq!(session.controller().mode(), RunMode::SteppingToTarget);
    session.on_stop();

    session.apply(Command::Run, t0).unwrap();
    session.apply(Command::RunToAddress(2), t0).unwrap();
    assert_eq!(session.controller().mode(), RunMode::Running);
    assert_eq!(session.controller().state().run.target(), None);
}

#[test]
fn unreachable_target_runs_until_stopped() {
    let t0 = Instant::now();
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    session.apply(Command::RunToAddress(0x40), t0).unwrap();
    for now in ticks(t0).take(100) {
        session.tick(now).unwrap();
    }
    assert_eq!(session.controller().mode(), RunMode::SteppingToTarget);
    assert_eq!(session.controller().engine().steps, 100);

    session.on_stop();
    assert_eq!(session.controller().mode(), RunMode::Idle);
    assert!(session.controller().state().run.timer().is_none());
}

#[test]
fn run_to_target_limit_gives_up() {
    let t0 = Instant::now();
    let config = Config {
        run_to_target_limit: Some(5),
        ..Default::default()
    };
    let mut session = session_with(&config);
    session.on_file_loaded(LOOP).unwrap();
    session.apply(Command::RunToAddress(0x40), t0).unwrap();
    for now in ticks(t0).take(20) {
        session.tick(now).unwrap();
    }
    assert_eq!(session.controller().mode(), RunMode::Idle);
    assert_eq!(session.controller().engine().steps, 5);
}

#[test]
fn load_cancels_an_active_run() {
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    session.apply(Command::Run, Instant::now()).unwrap();
    session.on_file_loaded(&[0x00, 0x80, 0x00]).unwrap();
    assert_eq!(session.controller().mode(), RunMode::Idle);
    assert_eq!(session.next_deadline(), None);
}

#[test]
fn illegal_opcode_halts_the_run() {
    let t0 = Instant::now();
    let mut session = session();
    let halted = Rc::new(RefCell::new(Vec::new()));
    let sink = halted.clone();
    session.subscribe(move |change| {
        if let Change::Halted(e) = change {
            sink.borrow_mut().push(e.clone());
        }
    });

    session.on_file_loaded(&[0x00, 0xA5]).unwrap();
    session.apply(Command::Run, t0).unwrap();
    let mut ticks = ticks(t0);
    session.tick(ticks.next().unwrap()).unwrap();
    let err = session.tick(ticks.next().unwrap()).unwrap_err();

    let expected = EngineError::IllegalOpcode { pc: 1, opcode: 0xA5 };
    assert_eq!(err, Error::Halted(expected.clone()));
    assert_eq!(session.controller().mode(), RunMode::Idle);
    assert_eq!(*halted.borrow(), vec![expected]);
}

#[test]
fn execution_may_leave_the_listing() {
    let t0 = Instant::now();
    let mut session = session();
    session.on_file_loaded(&[0x80, 0x40]).unwrap();
    session.on_step().unwrap();
    let state = session.controller().state();
    assert_eq!(state.cursor.current, 0x40);
    assert!(state.program.covering(0x40).is_none());
    assert_eq!(session.controller().view().current_addr, 0x40);

    // Unlisted memory still executes, stepped or running.
    session.apply(Command::Run, t0).unwrap();
    let mut ticks = ticks(t0);
    session.tick(ticks.next().unwrap()).unwrap();
    session.tick(ticks.next().unwrap()).unwrap();
    assert_eq!(session.controller().state().cursor.current, 0x42);
    assert_eq!(session.controller().mode(), RunMode::Running);
}

#[test]
fn stale_timer_ticks_are_dropped() {
    let t0 = Instant::now();
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();

    session.apply(Command::Run, t0).unwrap();
    let first = session.controller().active_timer().unwrap();
    session.on_stop();
    assert_eq!(session.controller().active_timer(), None);
    session.apply(Command::TimerFired(first), t0).unwrap();
    assert_eq!(session.controller().engine().steps, 0);

    session.apply(Command::Run, t0).unwrap();
    let second = session.controller().active_timer().unwrap();
    assert_ne!(first, second);
    session.apply(Command::TimerFired(first), t0).unwrap();
    assert_eq!(session.controller().engine().steps, 0);
    session.apply(Command::TimerFired(second), t0).unwrap();
    assert_eq!(session.controller().engine().steps, 1);
    assert_eq!(session.controller().state().cursor.current, 1);
}

#[test]
fn memory_space_switch_resets_scroll() {
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    session.on_scroll(40);
    assert_eq!(session.controller().state().viewport.scroll_offset(), 40);

    session.on_memory_space_changed("ram").unwrap();
    let state = session.controller().state();
    assert_eq!(state.memory_space, MemorySpace::Ram);
    assert_eq!(state.viewport.scroll_offset(), 0);
    assert_eq!(state.view.memory_space, MemorySpace::Ram);
    assert_eq!(state.view.memory.len(), RAM_SIZE);
    assert_eq!(state.viewport.visible_range(), 0..16);

    session.on_memory_space_changed("SFR").unwrap();
    let first = session.controller().view().memory[0];
    assert_eq!(first.address, 0x80);
}

#[test]
fn unknown_memory_space_keeps_selection() {
    let mut session = session();
    session.on_memory_space_changed("XRAM").unwrap();
    let err = session.on_memory_space_changed("EEPROM").unwrap_err();
    assert_eq!(err, Error::UnknownMemorySpace("EEPROM".into()));
    assert_eq!(session.controller().state().memory_space, MemorySpace::Xram);
}

#[test]
fn volatile_reset_keeps_program_memory() {
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    for _ in 0..3 {
        session.on_step().unwrap();
    }
    assert_eq!(session.controller().engine().ram[0], 1);
    session.on_memory_space_changed("RAM").unwrap();

    session.on_reset();
    let controller = session.controller();
    assert_eq!(controller.engine().ram[0], 0);
    assert_eq!(controller.engine().rom[..LOOP.len()], *LOOP);
    assert_eq!(controller.state().cursor.current, 0);
    assert_eq!(controller.state().memory_space, MemorySpace::Rom);
    assert_eq!(controller.state().program.len(), 4);
}

#[test]
fn only_row_starts_can_be_selected() {
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    assert!(session.on_row_selected(3));
    assert!(!session.on_row_selected(4));
    assert_eq!(session.controller().state().cursor.selected, Some(3));
}

#[test]
fn view_tracks_engine_after_every_step() {
    let mut session = session();
    session.on_file_loaded(LOOP).unwrap();
    for _ in 0..3 {
        session.on_step().unwrap();
    }
    let view = session.controller().view();
    assert_eq!(view.current_addr, 3);
    assert_eq!(view.key_registers[1].value, 1);
    assert_eq!(view.memory[2].value, 0x04);
    assert_eq!(view.digits[0].glyph(), Some('2'));
}
