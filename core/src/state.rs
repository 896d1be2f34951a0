use std::ops::Range;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, KEY_COUNT, MEMORY_SIZE, PROGRAM_START, SPRITE_SHEET, STACK_SIZE,
};
use crate::error::Chip8Error;

/// A snapshot of the Chip8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) doubles as the carry, borrow and collision flag;
///       arithmetic and draw instructions overwrite it, so read it right after the
///       instruction that set it
/// - (i) a 16-bit memory address register
///
/// Counter
/// - (pc) a 16-bit program counter
///
/// Pointer
/// - (sp) the number of occupied stack slots; always in 0..=16
///
/// Timers
/// - 2 8-bit timers (delay & sound)
/// - While the sound timer is non-zero a tone should be playing
///
/// ## Memory
/// - 16 slot stack of return addresses
/// - 4096 bytes of addressable memory
///     - 0x000..0x050 holds the sprite sheet
///     - 0x200.. holds the ROM
/// - 32x64 frame buffer
///     - stores the contents of the next frame to be drawn
///     - `draw_flag` is set whenever it changes and cleared once it has been presented
///
/// ## Input
/// - Emulation halts while `mode` is `WaitingForKey` until a key's value is written to
///   that register
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub v: [u8; 16],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub stack: [u16; STACK_SIZE],
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
    pub draw_flag: bool,
    pub mode: Mode,
}

/// Whether the instruction stream is flowing or parked on a `Fx0A`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mode {
    Running,
    /// Waiting for a key press to be stored in the given register
    WaitingForKey(u8),
}

impl State {
    pub fn new() -> Self {
        // 0x000 - 0x050 is reserved for a sprite sheet
        let mut memory = [0; MEMORY_SIZE];
        memory[0..SPRITE_SHEET.len()].copy_from_slice(&SPRITE_SHEET);

        State {
            v: [0; 16],
            i: 0,
            pc: PROGRAM_START,
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            stack: [0; STACK_SIZE],
            memory,
            frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            draw_flag: false,
            mode: Mode::Running,
        }
    }

    /// Returns the memory range `address..address + len` if it lies entirely within memory
    ///
    /// # Arguments
    /// * `address` the first byte of the range
    /// * `len` the number of bytes in the range
    pub fn span(&self, address: usize, len: usize) -> Result<Range<usize>, Chip8Error> {
        match address.checked_add(len) {
            Some(end) if end <= MEMORY_SIZE => Ok(address..end),
            _ => Err(Chip8Error::MemoryOutOfBounds { address, len }),
        }
    }

    /// Pushes a return address onto the call stack
    pub fn push(&mut self, address: u16) -> Result<(), Chip8Error> {
        let sp = self.sp as usize;
        if sp >= STACK_SIZE {
            return Err(Chip8Error::StackOverflow { pc: self.pc });
        }
        self.stack[sp] = address;
        self.sp += 1;
        Ok(())
    }

    /// Pops the most recent return address off the call stack
    pub fn pop(&mut self) -> Result<u16, Chip8Error> {
        if self.sp == 0 {
            return Err(Chip8Error::StackUnderflow { pc: self.pc });
        }
        self.sp -= 1;
        Ok(self.stack[self.sp as usize])
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// The FrameBuffer is indexed as [y][x]; each cell is 0 (off) or 1 (on)
pub type FrameBuffer = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

/// The pressed status of keys 0..F
pub type Keypad = [bool; KEY_COUNT];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_has_sprite_sheet() {
        let state = State::new();
        assert_eq!(state.memory[0..80], SPRITE_SHEET[..]);
        assert!(state.memory[80..].iter().all(|&b| b == 0));
        assert_eq!(state.pc, 0x200);
        assert_eq!(state.mode, Mode::Running);
    }

    #[test]
    fn test_span_within_memory() {
        let state = State::new();
        assert_eq!(state.span(0xFFD, 3).unwrap(), 0xFFD..0x1000);
    }

    #[test]
    fn test_span_past_end_of_memory() {
        let state = State::new();
        assert!(matches!(
            state.span(0xFFE, 3),
            Err(Chip8Error::MemoryOutOfBounds {
                address: 0xFFE,
                len: 3
            })
        ));
    }

    #[test]
    fn test_push_then_pop() {
        let mut state = State::new();
        state.push(0x0ABC).unwrap();
        assert_eq!(state.sp, 1);
        assert_eq!(state.pop().unwrap(), 0x0ABC);
        assert_eq!(state.sp, 0);
    }

    #[test]
    fn test_push_overflows() {
        let mut state = State::new();
        for n in 0..STACK_SIZE as u16 {
            state.push(n).unwrap();
        }
        assert!(matches!(
            state.push(0x300),
            Err(Chip8Error::StackOverflow { .. })
        ));
        assert_eq!(state.sp as usize, STACK_SIZE);
    }

    #[test]
    fn test_pop_underflows() {
        let mut state = State::new();
        assert!(matches!(
            state.pop(),
            Err(Chip8Error::StackUnderflow { pc: 0x200 })
        ));
        assert_eq!(state.sp, 0);
    }
}
