use thiserror::Error;

/// Everything that can go wrong while loading or running a ROM.
///
/// Running off the end of memory is not an error; see `Step::Halted`.
#[derive(Debug, Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    RomTooLarge { size: usize, max: usize },

    #[error("unable to read ROM")]
    Io(#[from] std::io::Error),

    #[error("stack overflow: call at {pc:#06X} with all 16 stack slots in use")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: return at {pc:#06X} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("memory access out of bounds: {len} byte(s) at {address:#06X}")]
    MemoryOutOfBounds { address: usize, len: usize },
}
