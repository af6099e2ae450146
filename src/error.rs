use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the simulator
#[derive(Error, Debug)]
pub enum SimulatorError {
    #[error("Failed to load ELF file: {0}")]
    ElfLoadError(#[from] ElfError),

    #[error("CPU execution error: {0}")]
    ExecutionError(#[from] ExecutionError),

    #[error("Memory error: {0}")]
    MemoryError(#[from] MemoryError),

    #[error("Invalid instruction: {0:032b} at PC={1:#010x}")]
    InvalidInstructionError(u32, u32),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Errors related to ELF file operations
#[derive(Error, Debug)]
pub enum ElfError {
    #[error("Failed to read ELF file '{0}': {1}")]
    FileReadError(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse ELF file '{0}': {1}")]
    ParseError(PathBuf, String),

    #[error("Invalid ELF format: {0}")]
    InvalidFormat(String),

    #[error("Memory address out of bounds: {0:#010x}")]
    AddressOutOfBounds(u32),

    #[error("Invalid ELF machine type: {0} (expected MIPS)")]
    InvalidMachine(u16),
}

/// Errors related to CPU execution
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("EXCEPTION({0}): integer overflow")]
    IntegerOverflow(&'static str),

    #[error("break instruction at PC={0:#010x}")]
    Breakpoint(u32),

    #[error("Stack overflow: SP={0:#010x}, floor={1:#010x}")]
    StackOverflow(u32, u32),

    #[error("Execution limit reached: {0} instructions")]
    ExecutionLimitReached(u64),
}

/// Errors related to memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Unaligned word access at address {0:#010x}")]
    AlignmentError(u32),
}

/// Type alias for Result with SimulatorError
pub type SimulatorResult<T> = Result<T, SimulatorError>;
