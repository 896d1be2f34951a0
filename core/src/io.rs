//! Seams between the machine and the outside world.
//!
//! A front end supplies an `InputSource` for key transitions and a `DisplaySink` to show
//! frames; the driver loop shuttles events and frames between them and a `Chip8`.
use crate::state::FrameBuffer;

/// A single input transition reported by an `InputSource`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// A keypad key (0..F) went down
    KeyDown(u8),
    /// A keypad key (0..F) went up
    KeyUp(u8),
    /// The user asked to stop
    Quit,
    /// Start (true) or stop (false) stepping backwards through saved states
    Rewind(bool),
    /// Start (true) or stop (false) running without pacing
    FastForward(bool),
}

/// Something that can be polled for input transitions
pub trait InputSource {
    /// Drains every event that arrived since the last poll
    fn poll(&mut self) -> Vec<InputEvent>;
}

/// Something that can show a frame
pub trait DisplaySink {
    type Error;

    fn present(&mut self, frame: &FrameBuffer) -> Result<(), Self::Error>;
}
