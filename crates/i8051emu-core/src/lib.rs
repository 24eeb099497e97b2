//! Execution control and hardware-state projection for an 8051 trainer-board
//! emulator front-end.
//!
//! The crate sits between a presentation layer and an emulation [`Engine`].
//! Presentation code drives a [`Session`], subscribes to [`Change`]s and
//! renders the [`ViewModel`] it finds in the controller's [`AppState`].

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod input;
pub mod program;
pub mod projector;
pub mod session;
pub mod timer;
pub mod viewport;

pub use config::Config;
pub use controller::{AppState, ExecutionController, RunMode, RunState};
pub use engine::{
    Disassembler, DisassembleError, Engine, EngineError, ExtDeviceBytes, InputRegister,
    InstructionRow, KeyBit, MemorySpace, RegisterSnapshot,
};
pub use error::{Error, LoadError, Result};
pub use events::{Change, SubscriptionId};
pub use input::{Key, KeyReleaseMode, MatrixKey, SequentialKey};
pub use program::{AddressCursor, ProgramImage};
pub use projector::ViewModel;
pub use session::{Command, CommandSender, Session};
pub use timer::TimerHandle;
pub use viewport::MemoryViewport;
