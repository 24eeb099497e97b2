//! The surface a presentation layer drives.
//!
//! A [`Session`] wraps the [`ExecutionController`] and owns a command queue.
//! The owning thread calls the `on_*` methods directly; other threads hold a
//! [`CommandSender`] and the owner applies their commands, in order, from
//! [`Session::pump`]. Either way all mutation happens on one thread.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;

use tracing::{debug, trace};

use crate::config::Config;
use crate::controller::ExecutionController;
use crate::engine::{Disassembler, Engine};
use crate::error::Result;
use crate::events::{Change, SubscriptionId};
use crate::input::Key;
use crate::timer::TimerHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LoadProgram(Vec<u8>),
    Step,
    Run,
    Pause,
    Stop,
    /// Run to the selected row.
    RunToTarget,
    RunToAddress(u16),
    Refresh,
    SelectMemorySpace(String),
    KeyPressed(Key),
    KeyReleased(Key),
    PointerReleased,
    SelectRow(u16),
    Reset,
    ScrollMemory(i64),
    ScrollMemoryTo(u16),
    /// A tick delivered by a host-side timer for the run it was armed for.
    TimerFired(TimerHandle),
}

/// Enqueues commands for a [`Session`]. Cheap to clone and `Send`.
#[derive(Debug, Clone)]
pub struct CommandSender(Sender<Command>);

impl CommandSender {
    /// Queue `command`. Returns `false` once the session is gone.
    pub fn send(&self, command: Command) -> bool {
        self.0.send(command).is_ok()
    }
}

#[derive(Debug)]
pub struct Session<E, D> {
    controller: ExecutionController<E, D>,
    tx: Sender<Command>,
    rx: Receiver<Command>,
}

impl<E: Engine, D: Disassembler> Session<E, D> {
    pub fn new(engine: E, disassembler: D, config: &Config) -> Self {
        Self::from_controller(ExecutionController::new(engine, disassembler, config))
    }

    pub fn from_controller(controller: ExecutionController<E, D>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self { controller, tx, rx }
    }

    pub fn controller(&self) -> &ExecutionController<E, D> {
        &self.controller
    }

    pub fn sender(&self) -> CommandSender {
        CommandSender(self.tx.clone())
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Change) + 'static) -> SubscriptionId {
        self.controller.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.controller.unsubscribe(id)
    }

    pub fn on_file_loaded(&mut self, image: &[u8]) -> Result<()> {
        self.controller.load_program(image)
    }

    pub fn on_step(&mut self) -> Result<()> {
        self.controller.step()
    }

    pub fn on_run(&mut self) {
        self.controller.run(Instant::now());
    }

    pub fn on_pause(&mut self) {
        self.controller.pause();
    }

    pub fn on_stop(&mut self) {
        self.controller.stop();
    }

    /// Run to the selected row. Without a selection this does nothing.
    pub fn on_run_to_target(&mut self) {
        match self.controller.state().cursor.selected {
            Some(target) => self.controller.run_to_target(target, Instant::now()),
            None => trace!("run to target ignored: no row selected"),
        }
    }

    pub fn on_refresh(&mut self) {
        self.controller.refresh();
    }

    pub fn on_memory_space_changed(&mut self, space: &str) -> Result<()> {
        self.controller.select_memory_space_named(space)
    }

    pub fn on_key_pressed(&mut self, key: Key) {
        self.controller.press_key(key);
    }

    pub fn on_key_released(&mut self, key: Key) {
        self.controller.release_key(key);
    }

    /// Pointer-up anywhere in the window.
    pub fn on_pointer_released(&mut self) {
        self.controller.release_all_keys();
    }

    pub fn on_row_selected(&mut self, addr: u16) -> bool {
        self.controller.select_row(addr)
    }

    pub fn on_reset(&mut self) {
        self.controller.reset_volatile();
    }

    pub fn on_scroll(&mut self, rows: i64) {
        self.controller.scroll_memory(rows);
    }

    pub fn on_scroll_to(&mut self, addr: u16) {
        self.controller.scroll_memory_to(addr);
    }

    pub fn on_resize_memory(&mut self, extent: u32) {
        self.controller.resize_memory_viewport(extent);
    }

    /// Apply one command as if the matching `on_*` method had been called.
    pub fn apply(&mut self, command: Command, now: Instant) -> Result<()> {
        debug!(?command, "apply");
        match command {
            Command::LoadProgram(image) => self.controller.load_program(&image)?,
            Command::Step => self.controller.step()?,
            Command::Run => self.controller.run(now),
            Command::Pause => self.controller.pause(),
            Command::Stop => self.controller.stop(),
            Command::RunToTarget => match self.controller.state().cursor.selected {
                Some(target) => self.controller.run_to_target(target, now),
                None => trace!("run to target ignored: no row selected"),
            },
            Command::RunToAddress(target) => self.controller.run_to_target(target, now),
            Command::Refresh => self.controller.refresh(),
            Command::SelectMemorySpace(name) => self.controller.select_memory_space_named(&name)?,
            Command::KeyPressed(key) => self.controller.press_key(key),
            Command::KeyReleased(key) => self.controller.release_key(key),
            Command::PointerReleased => self.controller.release_all_keys(),
            Command::SelectRow(addr) => {
                self.controller.select_row(addr);
            }
            Command::Reset => self.controller.reset_volatile(),
            Command::ScrollMemory(rows) => self.controller.scroll_memory(rows),
            Command::ScrollMemoryTo(addr) => self.controller.scroll_memory_to(addr),
            Command::TimerFired(handle) => {
                self.controller.fire(handle)?;
            }
        }
        Ok(())
    }

    /// Apply queued commands in order. Stops at the first failing command,
    /// leaving the rest queued; returns how many were applied.
    pub fn pump(&mut self) -> Result<usize> {
        let mut applied = 0;
        while let Ok(command) = self.rx.try_recv() {
            self.apply(command, Instant::now())?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Drive the run timer; see [`ExecutionController::poll`].
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        self.controller.poll(now)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.controller.next_deadline()
    }
}
