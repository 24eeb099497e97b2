//! Terminal front-end for the trainer emulator: draws a [`Session`]'s view
//! model with ratatui and turns key and mouse events into session commands.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::io;
use std::time::Instant;

use i8051emu_core::input::InputBridge;
use i8051emu_core::projector::{ControlRegister, DigitState, RegisterBits};
use i8051emu_core::{
    AppState, Command, Disassembler, Engine, ExecutionController, RunMode, Session,
};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    crossterm::event::{
        Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
        MouseEventKind,
    },
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use tracing::{debug, warn};

mod keypad;
mod scheduler;

pub use keypad::{KEYPAD_HEIGHT, KeyCap};
pub use scheduler::RenderScheduler;

// Re-export crossterm from ratatui so users get the matching version
pub use ratatui::crossterm;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    Active,
    /// The user asked to quit.
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Listing,
    Memory,
    Keypad,
}

impl Focus {
    const ORDER: [Focus; 3] = [Focus::Listing, Focus::Memory, Focus::Keypad];

    fn next(self) -> Self {
        let index = Self::ORDER.iter().position(|f| f == &self).unwrap_or(0);
        Self::ORDER[(index + 1) % Self::ORDER.len()]
    }

    fn prev(self) -> Self {
        let index = Self::ORDER.iter().position(|f| f == &self).unwrap_or(0);
        Self::ORDER[(index + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// Keys bound to session commands. The status bar lists the same keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiConfig {
    pub step_key: char,
    pub run_key: char,
    pub pause_key: char,
    pub stop_key: char,
    pub target_key: char,
    pub reset_key: char,
    pub refresh_key: char,
    pub memory_key: char,
    pub quit_key: char,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            step_key: 's',
            run_key: 'r',
            pause_key: 'p',
            stop_key: 'x',
            target_key: 't',
            reset_key: 'R',
            refresh_key: 'f',
            memory_key: 'm',
            quit_key: 'q',
        }
    }
}

impl UiConfig {
    fn command(&self, key: char, app: &AppState) -> Option<Command> {
        let command = if key == self.step_key {
            Command::Step
        } else if key == self.run_key {
            Command::Run
        } else if key == self.pause_key {
            Command::Pause
        } else if key == self.stop_key {
            Command::Stop
        } else if key == self.target_key {
            Command::RunToTarget
        } else if key == self.reset_key {
            Command::Reset
        } else if key == self.refresh_key {
            Command::Refresh
        } else if key == self.memory_key {
            Command::SelectMemorySpace(app.memory_space.next().name().to_string())
        } else {
            return None;
        };
        Some(command)
    }

    fn help(&self) -> String {
        [
            (self.step_key, "Step"),
            (self.run_key, "Run"),
            (self.pause_key, "Pause"),
            (self.target_key, "Run to"),
            (self.stop_key, "Stop"),
            (self.reset_key, "Reset"),
            (self.refresh_key, "Refresh"),
            (self.memory_key, "Memory"),
        ]
        .iter()
        .map(|(key, what)| format!("{key}: {what}"))
        .collect::<Vec<_>>()
        .join(" │ ")
    }
}

struct ListingWindow {
    /// Index of the first row shown
    start: Cell<usize>,
    /// Where the listing was last drawn, for mouse selection
    area: Cell<Rect>,
}

struct UiInternalState {
    focus: Focus,
    state: UiState,
    /// Last error, shown in place of the key help until the next command
    /// succeeds.
    status: Option<String>,
    listing: ListingWindow,
    memory_area: Cell<Rect>,
    keypad: RefCell<Vec<KeyCap>>,
}

/// The terminal front-end. Owns the terminal; the caller owns the session
/// and the event loop.
pub struct Ui<B: Backend> {
    config: UiConfig,
    terminal: Terminal<B>,
    state: UiInternalState,
    entered: bool,
}

impl Ui<CrosstermBackend<io::Stdout>> {
    pub fn new(config: UiConfig) -> io::Result<Self> {
        Self::with_backend(config, CrosstermBackend::new(io::stdout()))
    }

    /// Enter alternate screen, enable raw mode and mouse capture
    pub fn enter(&mut self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()?;
        crossterm::execute!(
            io::stdout(),
            crossterm::terminal::EnterAlternateScreen,
            crossterm::event::EnableMouseCapture,
        )?;
        self.entered = true;
        self.terminal.clear()?;
        Ok(())
    }
}

impl<B: Backend> Ui<B> {
    pub fn with_backend(config: UiConfig, backend: B) -> io::Result<Self> {
        Ok(Self {
            config,
            terminal: Terminal::new(backend)?,
            state: UiInternalState {
                focus: Focus::Listing,
                state: UiState::Active,
                status: None,
                listing: ListingWindow {
                    start: Cell::new(0),
                    area: Cell::new(Rect::default()),
                },
                memory_area: Cell::new(Rect::default()),
                keypad: RefCell::new(Vec::new()),
            },
            entered: false,
        })
    }

    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }

    pub fn ui_state(&self) -> UiState {
        self.state.state
    }

    /// The error currently shown in the status bar.
    pub fn status(&self) -> Option<&str> {
        self.state.status.as_deref()
    }

    /// Show `error` in the status bar.
    pub fn report(&mut self, error: &dyn fmt::Display) {
        warn!(%error, "reported");
        self.state.status = Some(error.to_string());
    }

    /// Handle a crossterm event by applying the commands it maps to.
    pub fn handle_event<E: Engine, D: Disassembler>(
        &mut self,
        event: Event,
        session: &mut Session<E, D>,
        now: Instant,
    ) {
        for command in self.commands_for(event, session.controller()) {
            match session.apply(command, now) {
                Ok(()) => self.state.status = None,
                Err(e) => {
                    self.report(&e);
                    break;
                }
            }
        }
    }

    fn commands_for<E: Engine, D: Disassembler>(
        &mut self,
        event: Event,
        controller: &ExecutionController<E, D>,
    ) -> Vec<Command> {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => {
                self.key_command(key, controller.state()).into_iter().collect()
            }
            Event::Mouse(mouse) => self.mouse_commands(mouse, controller.state()),
            _ => Vec::new(),
        }
    }

    fn key_command(&mut self, key: KeyEvent, app: &AppState) -> Option<Command> {
        let memory_page = self.state.memory_area.get().height.saturating_sub(1).max(1) as i64;
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.state = UiState::Quit;
                None
            }
            KeyCode::Char(c) if c == self.config.quit_key => {
                self.state.state = UiState::Quit;
                None
            }
            KeyCode::Tab if key.modifiers.contains(KeyModifiers::SHIFT) => {
                self.state.focus = self.state.focus.prev();
                None
            }
            KeyCode::Tab => {
                self.state.focus = self.state.focus.next();
                None
            }
            KeyCode::BackTab => {
                // BackTab is also Shift+Tab on some terminals
                self.state.focus = self.state.focus.prev();
                None
            }
            KeyCode::Char(c) => self.config.command(c, app),
            KeyCode::Up | KeyCode::Down if self.state.focus == Focus::Listing => {
                let rows = app.program.rows();
                let anchor = app.cursor.selected.unwrap_or(app.cursor.current);
                let index = match app
                    .program
                    .covering(anchor)
                    .and_then(|row| app.program.row_index(row.address))
                {
                    Some(index) if key.code == KeyCode::Up => index.saturating_sub(1),
                    Some(index) => (index + 1).min(rows.len().saturating_sub(1)),
                    // Execution is outside the listing.
                    None => 0,
                };
                rows.get(index).map(|row| Command::SelectRow(row.address))
            }
            KeyCode::Up if self.state.focus == Focus::Memory => Some(Command::ScrollMemory(-1)),
            KeyCode::Down if self.state.focus == Focus::Memory => Some(Command::ScrollMemory(1)),
            KeyCode::PageUp => Some(Command::ScrollMemory(-memory_page)),
            KeyCode::PageDown => Some(Command::ScrollMemory(memory_page)),
            KeyCode::Home => Some(Command::ScrollMemoryTo(app.memory_space.base_address())),
            KeyCode::End => app
                .view
                .memory
                .last()
                .map(|cell| Command::ScrollMemoryTo(cell.address)),
            _ => None,
        }
    }

    fn mouse_commands(&mut self, mouse: MouseEvent, app: &AppState) -> Vec<Command> {
        let at = Position::new(mouse.column, mouse.row);
        let key = keypad::hit(&self.state.keypad.borrow(), mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(key) = key {
                    self.state.focus = Focus::Keypad;
                    return vec![Command::KeyPressed(key)];
                }
                let listing = self.state.listing.area.get();
                if listing.contains(at) {
                    self.state.focus = Focus::Listing;
                    let index = self.state.listing.start.get() + (mouse.row - listing.y) as usize;
                    if let Some(row) = app.program.rows().get(index) {
                        return vec![Command::SelectRow(row.address)];
                    }
                }
                if self.state.memory_area.get().contains(at) {
                    self.state.focus = Focus::Memory;
                }
                Vec::new()
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let mut commands: Vec<Command> = key.map(Command::KeyReleased).into_iter().collect();
                commands.push(Command::PointerReleased);
                commands
            }
            MouseEventKind::ScrollUp if self.state.memory_area.get().contains(at) => {
                vec![Command::ScrollMemory(-3)]
            }
            MouseEventKind::ScrollDown if self.state.memory_area.get().contains(at) => {
                vec![Command::ScrollMemory(3)]
            }
            _ => Vec::new(),
        }
    }

    /// Render the front-end, then fit the memory viewport to the pane it was
    /// drawn in.
    pub fn render<E: Engine, D: Disassembler>(
        &mut self,
        session: &mut Session<E, D>,
    ) -> io::Result<()> {
        let controller = session.controller();
        let config = &self.config;
        let state = &self.state;
        self.terminal.draw(|f| {
            render_frame(
                f,
                controller.state(),
                controller.input(),
                controller.mode(),
                config,
                state,
            );
        })?;

        let extent = self.state.memory_area.get().height.saturating_sub(1) as u32;
        if extent > 0 {
            session.on_resize_memory(extent);
        }
        Ok(())
    }

    /// Exit alternate screen and disable raw mode
    pub fn exit(&mut self) -> io::Result<()> {
        if !std::mem::take(&mut self.entered) {
            return Ok(());
        }
        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(
            io::stdout(),
            crossterm::event::DisableMouseCapture,
            crossterm::terminal::LeaveAlternateScreen,
        )?;
        debug!("terminal restored");
        Ok(())
    }
}

impl<B: Backend> Drop for Ui<B> {
    fn drop(&mut self) {
        let _ = self.exit();
    }
}

fn render_frame(
    f: &mut Frame,
    app: &AppState,
    input: &InputBridge,
    mode: RunMode,
    config: &UiConfig,
    ui: &UiInternalState,
) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Main content area
            Constraint::Length(1), // Status bar
        ])
        .split(f.area());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Length(1),
            Constraint::Min(30),
            Constraint::Length(1),
            Constraint::Length(31),
        ])
        .split(main_layout[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(KEYPAD_HEIGHT)])
        .split(columns[4]);

    render_listing(f, columns[0], app, ui);
    for separator in [columns[1], columns[3]] {
        let lines: Vec<Line> = (0..separator.height).map(|_| Line::from("│")).collect();
        f.render_widget(
            Paragraph::new(lines).style(Style::default().fg(Color::DarkGray)),
            separator,
        );
    }
    render_hardware(f, columns[2], app);
    render_memory(f, right[0], app, ui);
    render_keypad(f, right[1], input, ui);
    render_status(f, main_layout[1], mode, config, ui);
}

fn render_status(f: &mut Frame, area: Rect, mode: RunMode, config: &UiConfig, ui: &UiInternalState) {
    let (text, style) = match &ui.status {
        Some(error) => (
            format!(" {error} "),
            Style::default()
                .bg(Color::Red)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        None => {
            let text = format!(
                " {:<9} │ {} │ Tab: Focus │ {}: Quit ",
                match mode {
                    RunMode::Idle => "IDLE",
                    RunMode::Running => "RUNNING",
                    RunMode::SteppingToTarget => "TO TARGET",
                },
                config.help(),
                config.quit_key,
            );
            let bg = if mode == RunMode::Idle {
                Color::Blue
            } else {
                Color::Green
            };
            (
                text,
                Style::default()
                    .bg(bg)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
        }
    };
    f.render_widget(Paragraph::new(Line::from(Span::styled(text, style))), area);
}

fn render_listing(f: &mut Frame, area: Rect, app: &AppState, ui: &UiInternalState) {
    ui.listing.area.set(area);
    let rows = app.program.rows();
    if rows.is_empty() {
        f.render_widget(
            Paragraph::new("No program loaded").style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    }

    let height = (area.height as usize).max(1);
    let index_of = |addr: u16| {
        app.program
            .covering(addr)
            .and_then(|row| app.program.row_index(row.address))
    };
    let current = index_of(app.cursor.current);
    let follow = if ui.focus == Focus::Listing {
        app.cursor.selected.and_then(index_of).or(current)
    } else {
        current
    };

    // Keep the followed row on screen, moving the window as little as possible.
    let mut start = ui.listing.start.get().min(rows.len().saturating_sub(1));
    if let Some(index) = follow {
        if index < start {
            start = index;
        } else if index >= start + height {
            start = index + 1 - height;
        }
    }
    ui.listing.start.set(start);

    let focused = ui.focus == Focus::Listing;
    for (line_area, (index, row)) in area.rows().zip(rows.iter().enumerate().skip(start)) {
        let is_current = Some(index) == current;
        let is_selected = app.cursor.selected == Some(row.address);
        let bytes = row
            .bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");
        let text = format!(
            "{}{} {:04X}: {:9} {}",
            if is_current { ">" } else { " " },
            if is_selected { "◆" } else { " " },
            row.address,
            bytes,
            row.mnemonic,
        );

        let style = if is_current {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        }
        .bg(if is_selected {
            Color::Blue
        } else if focused {
            Color::Black
        } else {
            Color::Reset
        });
        f.render_widget(Line::styled(text, style), line_area);
    }
}

fn bits_line<R: fmt::Display>(register: &RegisterBits<R>) -> Line<'static> {
    let mut spans = vec![Span::raw(format!("{:<6}", register.register.to_string()))];
    for on in register.bits {
        spans.push(Span::styled(
            if on { "1 " } else { "0 " },
            if on {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::DIM)
            },
        ));
    }
    spans.push(Span::raw(format!("= {:02X}h", register.value())));
    Line::from(spans)
}

fn digit_span(digit: &DigitState, lit: bool) -> Span<'static> {
    let glyph = if digit.is_blank() {
        ' '
    } else {
        digit.glyph().unwrap_or('?')
    };
    let text = format!("{glyph}{}", if digit.dp { '.' } else { ' ' });
    let style = if lit {
        Style::default()
            .fg(Color::LightRed)
            .bg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray).bg(Color::Black)
    };
    Span::styled(text, style)
}

fn render_hardware(f: &mut Frame, area: Rect, app: &AppState) {
    let view = &app.view;
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = Vec::new();

    // Key registers: PC..PSW, then the register bank
    let (head, bank) = view.key_registers.split_at(view.key_registers.len().min(6));
    for group in [head, bank] {
        let spans: Vec<Span> = group
            .iter()
            .flat_map(|reg| [Span::raw(reg.to_string()), Span::raw(" ")])
            .collect();
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));

    for register in ControlRegister::ALL {
        let mut spans = vec![Span::styled(format!("{:<6}", register.name()), bold)];
        for bit in view.flags.row(register) {
            let span = match bit {
                Some((info, true)) => Span::styled(format!("{:<5}", info.label), bold),
                Some((info, false)) => Span::styled(
                    format!("{:<5}", info.label),
                    Style::default().add_modifier(Modifier::DIM),
                ),
                None => Span::styled("-    ", Style::default().fg(Color::DarkGray)),
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));

    lines.extend(view.ports.iter().map(bits_line));
    lines.push(Line::from(""));
    lines.extend(view.ext_devices.iter().map(bits_line));
    lines.push(Line::from(""));

    let enables = &view.enables;
    let mut display = vec![Span::styled("Display ", bold)];
    display.extend(
        view.digits
            .iter()
            .map(|digit| digit_span(digit, enables.display_enabled)),
    );
    lines.push(Line::from(display));

    let indicator = |name: &'static str, on: bool| {
        Span::styled(
            format!("{name} {} ", if on { "on " } else { "off" }),
            if on {
                Style::default().fg(Color::LightGreen)
            } else {
                Style::default().add_modifier(Modifier::DIM)
            },
        )
    };
    lines.push(Line::from(vec![
        indicator("DISP", enables.display_enabled),
        indicator("BUZ", enables.buzzer_enabled),
        indicator("LED", enables.led_enabled),
    ]));

    f.render_widget(Paragraph::new(lines), area);
}

fn render_memory(f: &mut Frame, area: Rect, app: &AppState, ui: &UiInternalState) {
    ui.memory_area.set(area);
    let focused = ui.focus == Focus::Memory;
    let mut lines = vec![Line::from(Span::styled(
        format!("{} memory", app.memory_space),
        Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    ))];
    let visible = app.viewport.visible(&app.view.memory);
    lines.extend(visible.iter().take(area.height.saturating_sub(1) as usize).map(|cell| {
        let ascii = if cell.value.is_ascii_graphic() {
            cell.value as char
        } else {
            '.'
        };
        Line::from(format!("{:04X}: {:02X}  {ascii}", cell.address, cell.value))
    }));
    let style = Style::default().bg(if focused { Color::Black } else { Color::Reset });
    f.render_widget(Paragraph::new(lines).style(style), area);
}

fn render_keypad(f: &mut Frame, area: Rect, input: &InputBridge, ui: &UiInternalState) {
    let caps = keypad::layout(area);
    let label = Style::default().add_modifier(Modifier::BOLD);
    for (title, row) in [("Sequential", 0), ("Matrix", 2)] {
        if row < area.height {
            f.render_widget(
                Line::styled(title, label),
                Rect::new(area.x, area.y + row, area.width, 1),
            );
        }
    }
    for cap in &caps {
        let held = input.is_held(cap.key);
        let style = if held {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else if ui.focus == Focus::Keypad {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default().bg(Color::DarkGray)
        };
        f.render_widget(
            Line::styled(format!("{:^4}", cap.label()), style),
            cap.area,
        );
    }
    *ui.keypad.borrow_mut() = caps;
}
