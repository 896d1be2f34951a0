pub use chip8::{Chip8, Step};
pub use constants::CLOCK_SPEED;
pub use error::Chip8Error;
pub use io::{DisplaySink, InputEvent, InputSource};
pub use state::{FrameBuffer, Keypad, Mode, State};

mod chip8;
pub mod constants;
mod error;
mod instruction;
pub mod io;
mod opcode;
mod operations;
pub mod state;
