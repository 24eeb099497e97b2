use std::fs::{self, File};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use i8051emu_board::{Dsm51, Dsm51Disassembler, ImageFormat};
use i8051emu_core::projector::Flag;
use i8051emu_core::{Config, Session};
use i8051emu_tui::crossterm::event::{self, Event};
use i8051emu_tui::{RenderScheduler, Ui, UiConfig, UiState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Upper bound on how long the interactive loop sleeps waiting for input.
const IDLE_POLL: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Program image to load, Intel HEX or raw binary
    #[arg(value_name = "IMAGE")]
    image: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run timer period in milliseconds
    #[arg(long)]
    cadence_ms: Option<u64>,

    /// Step through the program without the terminal UI
    #[arg(long)]
    headless: bool,

    /// Maximum number of instructions to execute in headless mode
    #[arg(short, long, default_value = "1000")]
    max_steps: u64,

    /// Print registers after every headless step
    #[arg(short, long)]
    trace: bool,

    /// Where the interactive mode writes its log
    #[arg(long, default_value = "i8051emu.log")]
    log_file: PathBuf,

    /// Load the image as raw binary even if it looks like Intel HEX
    #[arg(long)]
    binary: bool,

    /// Print a sample configuration file and exit
    #[arg(long)]
    sample_config: bool,
}

type BoardSession = Session<Dsm51, Dsm51Disassembler>;

fn main() -> Result<()> {
    let args = Args::parse();

    if args.sample_config {
        print!("{}", Config::sample());
        return Ok(());
    }

    init_logging(&args)?;

    let mut config = Config::load(args.config.as_deref()).context("failed to load configuration")?;
    config.merge(Config {
        cadence_ms: args.cadence_ms,
        ..Default::default()
    });

    let format = if args.binary {
        ImageFormat::Binary
    } else {
        ImageFormat::Auto
    };
    let mut session = Session::new(
        Dsm51::new(format),
        Dsm51Disassembler::new(format),
        &config,
    );

    let image = match &args.image {
        Some(path) => Some(
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?,
        ),
        None => None,
    };

    if args.headless {
        let image = image.context("headless mode needs an image")?;
        session
            .on_file_loaded(&image)
            .context("failed to load program")?;
        run_headless(&mut session, &args);
        Ok(())
    } else {
        run_interactive(session, image)
    }
}

fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    } else {
        // The terminal belongs to the UI, so logs go to a file.
        let file = File::create(&args.log_file)
            .with_context(|| format!("failed to create {}", args.log_file.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    }
    Ok(())
}

fn print_registers(session: &BoardSession) {
    let view = session.controller().view();
    let flags = &view.flags;
    let (head, bank) = view.key_registers.split_at(view.key_registers.len().min(6));
    let join = |regs: &[i8051emu_core::projector::KeyRegister]| {
        regs.iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    };
    println!(
        "  {}  C={} OV={} AC={} P={}",
        join(head),
        flags.get(Flag::C) as u8,
        flags.get(Flag::Ov) as u8,
        flags.get(Flag::Ac) as u8,
        flags.get(Flag::P) as u8,
    );
    println!("  {}", join(bank));
}

fn run_headless(session: &mut BoardSession, args: &Args) {
    let mut instruction_count = 0;
    while instruction_count < args.max_steps {
        let state = session.controller().state();
        if let Some(row) = state.program.covering(state.cursor.current) {
            println!(
                "{pc:04X}: {:10} {}",
                row.bytes
                    .iter()
                    .map(|b| format!("{:02X}", b))
                    .collect::<Vec<_>>()
                    .join(" "),
                row.mnemonic,
                pc = row.address,
            );
        } else {
            println!("{:04X}: (not in listing)", state.cursor.current);
        }
        instruction_count += 1;
        if let Err(e) = session.on_step() {
            println!(
                "CPU halted at 0x{:04X} after {} instructions: {e}",
                session.controller().state().cursor.current,
                instruction_count
            );
            print_registers(session);
            return;
        }
        if args.trace {
            print_registers(session);
        }
    }

    println!(
        "Stopped at 0x{:04X} after {} instructions",
        session.controller().state().cursor.current,
        instruction_count
    );
    print_registers(session);
}

fn run_interactive(mut session: BoardSession, image: Option<Vec<u8>>) -> Result<()> {
    let mut ui = Ui::new(UiConfig::default()).context("failed to open the terminal")?;
    ui.enter().context("failed to set up the terminal")?;
    let scheduler = RenderScheduler::attach(&mut session);

    if let Some(image) = image {
        if let Err(e) = session.on_file_loaded(&image) {
            warn!(error = %e, "initial load failed");
            ui.report(&e);
        }
    }
    info!("interactive session started");

    while ui.ui_state() != UiState::Quit {
        if scheduler.take() {
            ui.render(&mut session).context("failed to draw")?;
        }

        let timeout = session
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .unwrap_or(IDLE_POLL)
            .min(IDLE_POLL);
        if event::poll(timeout).context("failed to poll terminal events")? {
            let event = event::read().context("failed to read terminal event")?;
            if !matches!(event, Event::Resize(..)) {
                ui.handle_event(event, &mut session, Instant::now());
            }
            // Status line changes and resizes publish nothing.
            scheduler.request();
        }

        if let Err(e) = session.tick(Instant::now()) {
            ui.report(&e);
            scheduler.request();
        }
        if let Err(e) = session.pump() {
            ui.report(&e);
            scheduler.request();
        }
    }

    scheduler.detach(&mut session);
    ui.exit().context("failed to restore the terminal")?;
    info!("interactive session ended");
    Ok(())
}
