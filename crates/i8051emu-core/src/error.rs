use thiserror::Error;

use crate::engine::{DisassembleError, EngineError};

/// Why a program image was rejected. The previously loaded program is left
/// untouched whenever one of these is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("program image is empty")]
    Empty,
    #[error("program image contains no instructions")]
    NoInstructions,
    #[error(transparent)]
    Disassembly(#[from] DisassembleError),
    #[error("engine rejected the program: {0}")]
    Engine(EngineError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("load rejected: {0}")]
    Load(#[from] LoadError),
    #[error("unknown memory space '{0}'")]
    UnknownMemorySpace(String),
    #[error("execution halted: {0}")]
    Halted(#[from] EngineError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
