//! The run-loop state machine.
//!
//! ```text
//!            run()                       run_to_target(t)
//!   Idle ───────────────▶ Running   Idle ─────────────────▶ SteppingToTarget
//!    ▲  ◀─────────────────   │        ▲  ◀───────────────────────  │
//!    │    run() / pause()    │        │   pc == t, limit, stop()   │
//!    └────────── stop(), engine failure ───────────────────────────┘
//! ```
//!
//! Running and SteppingToTarget never follow each other directly. Every
//! mutating operation re-projects the view from a fresh engine snapshot and
//! then publishes exactly one [`Change`].

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::config::Config;
use crate::engine::{Disassembler, Engine, EngineError, MemorySpace};
use crate::error::{Error, LoadError, Result};
use crate::events::{Change, EventBus, SubscriptionId};
use crate::input::{InputBridge, Key};
use crate::program::{AddressCursor, ProgramImage};
use crate::projector::{RawSnapshot, ViewModel, project};
use crate::timer::{PeriodicTimer, TimerHandle, TimerIds};
use crate::viewport::MemoryViewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunMode {
    #[default]
    Idle,
    Running,
    SteppingToTarget,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunMode::Idle => "idle",
            RunMode::Running => "running",
            RunMode::SteppingToTarget => "stepping to target",
        })
    }
}

/// The run mode together with its timer. A timer exists exactly when the
/// mode is not idle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Running {
        timer: PeriodicTimer,
    },
    SteppingToTarget {
        timer: PeriodicTimer,
        target: u16,
        /// Steps taken so far.
        ticks: u64,
    },
}

impl RunState {
    pub fn mode(&self) -> RunMode {
        match self {
            RunState::Idle => RunMode::Idle,
            RunState::Running { .. } => RunMode::Running,
            RunState::SteppingToTarget { .. } => RunMode::SteppingToTarget,
        }
    }

    pub fn timer(&self) -> Option<&PeriodicTimer> {
        match self {
            RunState::Idle => None,
            RunState::Running { timer } | RunState::SteppingToTarget { timer, .. } => Some(timer),
        }
    }

    pub fn target(&self) -> Option<u16> {
        match self {
            RunState::SteppingToTarget { target, .. } => Some(*target),
            _ => None,
        }
    }
}

/// All front-end state, owned by the controller.
#[derive(Debug, Clone)]
pub struct AppState {
    pub program: ProgramImage,
    pub cursor: AddressCursor,
    pub memory_space: MemorySpace,
    pub viewport: MemoryViewport,
    pub view: ViewModel,
    pub run: RunState,
}

pub struct ExecutionController<E, D> {
    engine: E,
    disassembler: D,
    state: AppState,
    input: InputBridge,
    events: EventBus,
    timers: TimerIds,
    cadence: Duration,
    target_limit: Option<u64>,
}

impl<E: fmt::Debug, D> fmt::Debug for ExecutionController<E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionController")
            .field("engine", &self.engine)
            .field("run", &self.state.run)
            .field("cursor", &self.state.cursor)
            .field("rows", &self.state.program.len())
            .finish_non_exhaustive()
    }
}

impl<E: Engine, D: Disassembler> ExecutionController<E, D> {
    pub fn new(engine: E, disassembler: D, config: &Config) -> Self {
        let mut controller = Self {
            engine,
            disassembler,
            state: AppState {
                program: ProgramImage::default(),
                cursor: AddressCursor::default(),
                memory_space: MemorySpace::Rom,
                viewport: MemoryViewport::new(
                    config.memory_row_height(),
                    config.memory_viewport_extent(),
                ),
                view: ViewModel::default(),
                run: RunState::Idle,
            },
            input: InputBridge::new(config.key_release()),
            events: EventBus::default(),
            timers: TimerIds::default(),
            cadence: config.cadence(),
            target_limit: config.run_to_target_limit(),
        };
        controller.state.cursor.current = controller.engine.pc();
        controller.reproject();
        controller
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> &ViewModel {
        &self.state.view
    }

    pub fn mode(&self) -> RunMode {
        self.state.run.mode()
    }

    pub fn input(&self) -> &InputBridge {
        &self.input
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&Change) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    fn publish(&mut self, change: Change) {
        self.events.publish(&change);
    }

    fn reproject(&mut self) {
        let raw = RawSnapshot::capture(&self.engine, self.state.memory_space);
        self.state.view = project(&raw);
        self.state.viewport.set_len(self.state.view.memory.len());
    }

    /// Drop the active timer, if any. Returns whether a run was active.
    fn cancel_run(&mut self) -> bool {
        let was = self.state.run.mode();
        self.state.run = RunState::Idle;
        if was != RunMode::Idle {
            debug!(from = %was, "run cancelled");
            true
        } else {
            false
        }
    }

    fn halt(&mut self, error: EngineError) -> Error {
        warn!(%error, "execution halted");
        self.cancel_run();
        self.reproject();
        self.publish(Change::Halted(error.clone()));
        Error::Halted(error)
    }

    /// Load a new program. Nothing changes unless the image disassembles to at
    /// least one row and the engine accepts it.
    pub fn load_program(&mut self, image: &[u8]) -> Result<()> {
        if image.is_empty() {
            warn!("load rejected: empty image");
            return Err(LoadError::Empty.into());
        }
        let rows = self.disassembler.disassemble(image).map_err(|e| {
            warn!(error = %e, "load rejected");
            LoadError::from(e)
        })?;
        if rows.is_empty() {
            warn!("load rejected: no instructions");
            return Err(LoadError::NoInstructions.into());
        }
        self.engine.check_program(image).map_err(|e| {
            warn!(error = %e, "engine rejected program");
            LoadError::Engine(e)
        })?;

        self.cancel_run();
        self.state.program = ProgramImage::default();
        self.state.cursor = AddressCursor::default();
        self.input.forget();
        self.engine.reset_persistent_memory();

        // Only reachable when the engine's check and its loader disagree; the
        // old program is gone by now.
        if let Err(e) = self.engine.load_program(image) {
            warn!(error = %e, "engine failed to load a checked program");
            self.state.cursor.current = self.engine.pc();
            self.reproject();
            self.publish(Change::Loaded { rows: 0 });
            return Err(LoadError::Engine(e).into());
        }

        let count = rows.len();
        self.state.program = ProgramImage::new(rows);
        self.state.cursor.current = self.engine.pc();
        self.state.memory_space = MemorySpace::Rom;
        self.state.viewport.reset();
        self.reproject();
        debug!(rows = count, pc = self.state.cursor.current, "program loaded");
        self.publish(Change::Loaded { rows: count });
        Ok(())
    }

    /// One engine step. The cursor follows the engine's PC even where the
    /// listing has no row for it.
    fn step_once(&mut self) -> Result<u16> {
        if let Err(e) = self.engine.step_cycle() {
            return Err(self.halt(e));
        }
        let pc = self.engine.pc();
        self.state.cursor.current = pc;
        match self.state.program.covering(pc).map(|row| row.address) {
            None => trace!(pc, "no listing row at pc"),
            Some(row) if row != pc => debug!(pc, row, "execution landed inside an instruction"),
            Some(_) => {}
        }
        self.reproject();
        trace!(pc, "stepped");
        Ok(pc)
    }

    pub fn step(&mut self) -> Result<()> {
        if self.state.program.is_empty() {
            trace!("step ignored: no program");
            return Ok(());
        }
        if self.mode() != RunMode::Idle {
            trace!(mode = %self.mode(), "step ignored while running");
            return Ok(());
        }
        let pc = self.step_once()?;
        self.publish(Change::Stepped { pc });
        Ok(())
    }

    /// Start running, or pause if already running.
    pub fn run(&mut self, now: Instant) {
        if self.state.program.is_empty() {
            trace!("run ignored: no program");
            return;
        }
        match self.mode() {
            RunMode::Running => self.pause(),
            RunMode::SteppingToTarget => trace!("run ignored while stepping to target"),
            RunMode::Idle => {
                let timer = PeriodicTimer::start(self.timers.issue(), self.cadence, now);
                self.state.run = RunState::Running { timer };
                debug!(cadence = ?self.cadence, "running");
                self.publish(Change::RunStateChanged(RunMode::Running));
            }
        }
    }

    pub fn pause(&mut self) {
        if self.mode() != RunMode::Running {
            trace!(mode = %self.mode(), "pause ignored");
            return;
        }
        self.cancel_run();
        self.publish(Change::RunStateChanged(RunMode::Idle));
    }

    /// Cancel whichever run is active.
    pub fn stop(&mut self) {
        if self.cancel_run() {
            self.publish(Change::RunStateChanged(RunMode::Idle));
        } else {
            trace!("stop ignored: idle");
        }
    }

    pub fn run_to_target(&mut self, target: u16, now: Instant) {
        if self.state.program.is_empty() {
            trace!("run to target ignored: no program");
            return;
        }
        if self.mode() != RunMode::Idle {
            trace!(mode = %self.mode(), "run to target ignored while running");
            return;
        }
        let timer = PeriodicTimer::start(self.timers.issue(), self.cadence, now);
        self.state.run = RunState::SteppingToTarget {
            timer,
            target,
            ticks: 0,
        };
        debug!(target, limit = ?self.target_limit, "stepping to target");
        self.publish(Change::RunStateChanged(RunMode::SteppingToTarget));
    }

    /// When the active timer next wants a [`poll`](Self::poll).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.state.run.timer().map(PeriodicTimer::deadline)
    }

    /// Handle of the active timer, for hosts that deliver ticks themselves.
    pub fn active_timer(&self) -> Option<TimerHandle> {
        self.state.run.timer().map(PeriodicTimer::handle)
    }

    /// Drive the active timer. Performs at most one tick; returns whether one
    /// fired.
    pub fn poll(&mut self, now: Instant) -> Result<bool> {
        let fired = match &mut self.state.run {
            RunState::Idle => false,
            RunState::Running { timer } | RunState::SteppingToTarget { timer, .. } => timer.poll(now),
        };
        if !fired {
            return Ok(false);
        }
        self.tick_active()?;
        Ok(true)
    }

    /// Deliver a tick raised outside [`poll`](Self::poll). Ticks from a
    /// cancelled or replaced timer are dropped; returns whether the tick ran.
    pub fn fire(&mut self, handle: TimerHandle) -> Result<bool> {
        if self.active_timer() != Some(handle) {
            trace!(?handle, "stale timer tick dropped");
            return Ok(false);
        }
        self.tick_active()?;
        Ok(true)
    }

    fn tick_active(&mut self) -> Result<()> {
        match self.state.run {
            RunState::Idle => {}
            RunState::Running { .. } => {
                let pc = self.step_once()?;
                self.publish(Change::Stepped { pc });
            }
            RunState::SteppingToTarget { target, ticks, .. } => {
                if self.state.cursor.current == target {
                    debug!(target, ticks, "target reached");
                    self.cancel_run();
                    self.publish(Change::RunStateChanged(RunMode::Idle));
                } else if self.target_limit.is_some_and(|limit| ticks >= limit) {
                    warn!(target, ticks, "run to target gave up");
                    self.cancel_run();
                    self.publish(Change::RunStateChanged(RunMode::Idle));
                } else {
                    if let RunState::SteppingToTarget { ticks, .. } = &mut self.state.run {
                        *ticks += 1;
                    }
                    let pc = self.step_once()?;
                    self.publish(Change::Stepped { pc });
                }
            }
        }
        Ok(())
    }

    /// Clear working memory and registers. Program memory is kept.
    pub fn reset_volatile(&mut self) {
        self.cancel_run();
        self.engine.reset_volatile_memory();
        self.state.cursor.current = self.engine.pc();
        self.state.memory_space = MemorySpace::Rom;
        self.state.viewport.reset();
        self.reproject();
        debug!("volatile reset");
        self.publish(Change::Reset);
    }

    pub fn select_memory_space(&mut self, space: MemorySpace) {
        self.state.memory_space = space;
        self.state.viewport.reset();
        self.reproject();
        debug!(%space, "memory space selected");
        self.publish(Change::MemorySpaceChanged(space));
    }

    /// Select a memory space by name. An unknown name leaves the selection
    /// unchanged.
    pub fn select_memory_space_named(&mut self, name: &str) -> Result<()> {
        let space = name
            .parse::<MemorySpace>()
            .inspect_err(|e| warn!(error = %e, "memory space rejected"))?;
        self.select_memory_space(space);
        Ok(())
    }

    pub fn refresh(&mut self) {
        self.engine.refresh();
        self.reproject();
        self.publish(Change::Refreshed);
    }

    /// Pick the row run-to-target aims for. Only row start addresses count.
    pub fn select_row(&mut self, addr: u16) -> bool {
        if self.state.program.row_index(addr).is_none() {
            trace!(addr, "no row at address");
            return false;
        }
        self.state.cursor.selected = Some(addr);
        self.publish(Change::RowSelected(addr));
        true
    }

    pub fn scroll_memory(&mut self, rows: i64) {
        self.state.viewport.scroll_rows(rows);
        self.publish(Change::Scrolled);
    }

    /// Bring the cell at `addr` of the current space into view.
    pub fn scroll_memory_to(&mut self, addr: u16) {
        let base = self.state.memory_space.base_address();
        if let Some(index) = addr.checked_sub(base) {
            self.state.viewport.scroll_to_index(index as usize);
        }
        self.publish(Change::Scrolled);
    }

    pub fn resize_memory_viewport(&mut self, extent: u32) {
        if self.state.viewport.extent() != extent {
            self.state.viewport.resize(extent);
            self.publish(Change::Scrolled);
        }
    }

    pub fn press_key(&mut self, key: Key) {
        if self.input.press(&mut self.engine, key) {
            self.reproject();
            self.publish(Change::KeyPressed(key));
        }
    }

    pub fn release_key(&mut self, key: Key) {
        if self.input.release(&mut self.engine, key) {
            self.reproject();
            self.publish(Change::KeyReleased(key));
        }
    }

    /// A pointer-up anywhere. Releases every held key when configured to.
    pub fn release_all_keys(&mut self) {
        let held: Vec<Key> = self.input.held().collect();
        if self.input.release_all(&mut self.engine) > 0 {
            self.reproject();
            for key in held {
                self.publish(Change::KeyReleased(key));
            }
        }
    }
}
