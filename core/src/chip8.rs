use std::collections::VecDeque;
use std::io::Read;

use tracing::{debug, info, trace, warn};

use crate::constants::{
    CPU_CYCLES_PER_TIMER_CYCLE, KEY_COUNT, MAX_ROM_SIZE, MAX_SAVED_STATES, MEMORY_SIZE,
    PROGRAM_START,
};
use crate::error::Chip8Error;
use crate::instruction::from_op;
use crate::state::{FrameBuffer, Keypad, Mode, State};

/// What a call to `Chip8::step` did
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Fetched and executed the contained opcode
    Executed(u16),
    /// Nothing happened; the machine is parked on a `Fx0A` until a key is pressed
    AwaitingKey,
    /// The program counter ran off the end of memory; the program is finished
    Halted,
}

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - `previous_states` for rewinding
///  - `pressed_keys` with public interfaces for manipulating them
///  - a cycle counter that divides the CPU rate down to the timer rate
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - advancing and reversing the CPU
/// - advancing its timers
/// - inspecting its frame buffer for rendering by some display
#[derive(Debug)]
pub struct Chip8 {
    state: State,
    previous_states: VecDeque<State>,
    max_saved_states: usize,
    pressed_keys: Keypad,
    timer_cycles: u32,
    cycles_per_timer: u32,
}

impl Chip8 {
    pub fn new() -> Self {
        Chip8 {
            state: State::new(),
            previous_states: VecDeque::new(),
            max_saved_states: MAX_SAVED_STATES,
            pressed_keys: [false; KEY_COUNT],
            timer_cycles: 0,
            cycles_per_timer: CPU_CYCLES_PER_TIMER_CYCLE,
        }
    }

    /// Sets how many past states are kept for `rewind`; 0 disables rewinding
    pub fn with_rewind_depth(mut self, depth: usize) -> Self {
        self.max_saved_states = depth;
        self.previous_states.truncate(depth);
        self
    }

    /// Sets how many calls to `advance_timers` make up one timer tick; values below 1 are
    /// treated as 1
    pub fn with_timer_divider(mut self, cycles: u32) -> Self {
        self.cycles_per_timer = cycles.max(1);
        self
    }

    /// Load a rom from a source file
    ///
    /// # Arguments
    /// * `reader` a file reader that contains a ROM
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<(), Chip8Error> {
        let mut image = Vec::with_capacity(MAX_ROM_SIZE);
        reader.read_to_end(&mut image)?;
        self.load_program(&image)
    }

    /// Resets the machine and copies a program image into memory at `PROGRAM_START`
    ///
    /// This is the only way to fully reset the machine. Images that don't fit between
    /// `PROGRAM_START` and the end of memory are rejected and leave the machine untouched.
    ///
    /// # Arguments
    /// * `image` the raw program bytes
    pub fn load_program(&mut self, image: &[u8]) -> Result<(), Chip8Error> {
        if image.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: image.len(),
                max: MAX_ROM_SIZE,
            });
        }

        let mut state = State::new();
        let start = PROGRAM_START as usize;
        state.memory[start..start + image.len()].copy_from_slice(image);

        self.state = state;
        self.previous_states.clear();
        self.pressed_keys = [false; KEY_COUNT];
        self.timer_cycles = 0;
        info!(bytes = image.len(), "loaded ROM");
        Ok(())
    }

    /// The current machine state
    pub fn state(&self) -> &State {
        &self.state
    }

    /// The pressed status of keys 0..F
    pub fn pressed_keys(&self) -> &Keypad {
        &self.pressed_keys
    }

    /// The current frame, whether or not it has changed
    pub fn frame(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    /// Returns the FrameBuffer if the display should be redrawn
    pub fn get_frame(&self) -> Option<&FrameBuffer> {
        if self.state.draw_flag {
            Some(&self.state.frame_buffer)
        } else {
            None
        }
    }

    /// Marks the current frame as presented so `get_frame` returns `None` until it changes
    pub fn clear_draw_flag(&mut self) {
        self.state.draw_flag = false;
    }

    /// Whether a tone should currently be playing
    pub fn sound_active(&self) -> bool {
        self.state.sound_timer > 0
    }

    /// Set the pressed status of key
    /// - completes a pending `Fx0A` by storing the key in its register
    ///
    /// # Arguments
    /// * `key` the 8-bit representation of the key that was pressed
    pub fn key_press(&mut self, key: u8) {
        if key as usize >= KEY_COUNT {
            warn!(key, "ignoring press of key outside the keypad");
            return;
        }
        self.pressed_keys[key as usize] = true;
        if let Mode::WaitingForKey(register) = self.state.mode {
            debug!(key, register, "key press resumed execution");
            self.state.v[register as usize] = key;
            self.state.mode = Mode::Running;
        }
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 8-bit representation of the key that was released
    pub fn key_release(&mut self, key: u8) {
        if key as usize >= KEY_COUNT {
            warn!(key, "ignoring release of key outside the keypad");
            return;
        }
        self.pressed_keys[key as usize] = false;
    }

    /// Advances the CPU by a single cycle
    /// - does nothing while awaiting a keypress
    /// - halts once the pc runs off the end of memory
    /// - otherwise fetches the next opcode, moves the pc past it and executes it
    ///
    /// On error the state is left as it was before the cycle.
    pub fn step(&mut self) -> Result<Step, Chip8Error> {
        if let Mode::WaitingForKey(_) = self.state.mode {
            return Ok(Step::AwaitingKey);
        }

        let op = match self.get_op() {
            Some(op) => op,
            None => {
                debug!(pc = self.state.pc, "pc ran off the end of memory");
                return Ok(Step::Halted);
            }
        };
        trace!(
            "{:04X} v{:02X?} i{:04X} pc{:04X}",
            op,
            self.state.v,
            self.state.i,
            self.state.pc
        );

        let fetched = State {
            pc: self.state.pc + 0x2,
            ..self.state
        };
        let next = from_op(&op)(&op, &fetched, &self.pressed_keys)?;

        self.save_state();
        self.state = next;
        if let Mode::WaitingForKey(register) = self.state.mode {
            debug!(register, "waiting for key press");
        }
        Ok(Step::Executed(op))
    }

    /// Reverses the CPU by a single cycle if possible
    /// - if there are previous_states, pops the most recent one and restores it
    pub fn rewind(&mut self) -> bool {
        match self.previous_states.pop_front() {
            Some(state) => {
                self.state = State {
                    draw_flag: true,
                    ..state
                };
                true
            }
            None => false,
        }
    }

    /// Puts the current state in previous_states
    /// - if there are already `max_saved_states` saved then the oldest is dropped
    fn save_state(&mut self) {
        if self.max_saved_states == 0 {
            return;
        }
        if self.previous_states.len() == self.max_saved_states {
            self.previous_states.pop_back();
        }
        self.previous_states.push_front(self.state);
    }

    /// Counts a cycle towards the next timer tick, ticking the timers once every
    /// `cycles_per_timer` calls
    ///
    /// Returns true if the sound timer ran out on this call.
    pub fn advance_timers(&mut self) -> bool {
        self.timer_cycles += 1;
        if self.timer_cycles < self.cycles_per_timer {
            return false;
        }
        self.timer_cycles = 0;
        self.tick_timers()
    }

    /// Decrements both timers towards zero
    ///
    /// Returns true if the sound timer went from 1 to 0, i.e. any tone should stop.
    pub fn tick_timers(&mut self) -> bool {
        if self.state.delay_timer > 0 {
            self.state.delay_timer -= 1;
        }

        if self.state.sound_timer > 0 {
            self.state.sound_timer -= 1;
            return self.state.sound_timer == 0;
        }
        false
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    /// Returns None when the opcode would straddle or lie past the end of memory.
    fn get_op(&self) -> Option<u16> {
        let pc = self.state.pc as usize;
        if pc + 1 >= MEMORY_SIZE {
            return None;
        }
        let left = u16::from(self.state.memory[pc]);
        let right = u16::from(self.state.memory[pc + 1]);
        Some(left << 8 | right)
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
