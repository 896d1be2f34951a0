//! Instruction semantics.
//!
//! Every operation takes the state as it was after the fetch (so `pc` already points at
//! the following instruction) and returns the state after execution. Skips add another 2
//! to `pc`; jumps overwrite it.
use crate::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH, SPRITE_HEIGHT};
use crate::error::Chip8Error;
use crate::opcode::Opcode;
use crate::state::{Keypad, Mode, State};

/// Whether `key` is held; values outside the keypad are never held
fn is_pressed(keys: &Keypad, key: u8) -> bool {
    keys.get(key as usize).copied().unwrap_or(false)
}

/// Skips the next instruction if `condition` holds
fn skip_if(condition: bool, state: &State) -> Result<State, Chip8Error> {
    let pc = if condition {
        state.pc.wrapping_add(0x2)
    } else {
        state.pc
    };
    Ok(State { pc, ..*state })
}

/// Writes `value` to Vx and then `flag` to VF
fn with_flag(op: &dyn Opcode, state: &State, value: u8, flag: bool) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] = value;
    v[0xF] = u8::from(flag);
    Ok(State { v, ..*state })
}

/// unrecognised; does nothing
pub fn nop(_op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    Ok(*state)
}

/// clear
pub fn clr(_op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    Ok(State {
        frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
        draw_flag: true,
        ..*state
    })
}

/// PC = STACK.pop()
pub fn rts(_op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let mut next = *state;
    next.pc = next.pop()?;
    Ok(next)
}

/// PC = addr
pub fn jump(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    Ok(State {
        pc: op.nnn(),
        ..*state
    })
}

/// STACK.push(PC); PC = addr
pub fn call(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let mut next = *state;
    next.push(state.pc)?;
    next.pc = op.nnn();
    Ok(next)
}

/// if Vx == nn then pc += 2
pub fn ske(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    skip_if(state.v[op.x() as usize] == op.nn(), state)
}

/// if Vx != nn then pc += 2
pub fn skne(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    skip_if(state.v[op.x() as usize] != op.nn(), state)
}

/// if Vx == Vy then pc += 2
pub fn skre(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    skip_if(state.v[op.x() as usize] == state.v[op.y() as usize], state)
}

/// Vx = nn
pub fn load(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] = op.nn();
    Ok(State { v, ..*state })
}

/// Vx += nn
/// Wraps on overflow; VF is untouched
pub fn add(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] = v[op.x() as usize].wrapping_add(op.nn());
    Ok(State { v, ..*state })
}

/// Vx = Vy
pub fn mv(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] = v[op.y() as usize];
    Ok(State { v, ..*state })
}

/// Vx |= Vy
pub fn or(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] |= v[op.y() as usize];
    Ok(State { v, ..*state })
}

/// Vx &= Vy
pub fn and(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] &= v[op.y() as usize];
    Ok(State { v, ..*state })
}

/// Vx ^= Vy
pub fn xor(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] ^= v[op.y() as usize];
    Ok(State { v, ..*state })
}

/// Vx += Vy; VF = carry
pub fn addr(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let (res, carry) = state.v[op.x() as usize].overflowing_add(state.v[op.y() as usize]);
    with_flag(op, state, res, carry)
}

/// Vx -= Vy; VF = !borrow
pub fn sub(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let (res, borrow) = state.v[op.x() as usize].overflowing_sub(state.v[op.y() as usize]);
    with_flag(op, state, res, !borrow)
}

/// Vx >>= 1; VF = shifted out lsb
pub fn shr(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let vx = state.v[op.x() as usize];
    with_flag(op, state, vx >> 1, vx & 0x1 == 0x1)
}

/// Vx = Vy - Vx; VF = !borrow
pub fn subn(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let (res, borrow) = state.v[op.y() as usize].overflowing_sub(state.v[op.x() as usize]);
    with_flag(op, state, res, !borrow)
}

/// Vx <<= 1; VF = shifted out msb
pub fn shl(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let vx = state.v[op.x() as usize];
    with_flag(op, state, vx << 1, vx & 0x80 == 0x80)
}

/// if Vx != Vy then pc += 2
pub fn skrne(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    skip_if(state.v[op.x() as usize] != state.v[op.y() as usize], state)
}

/// I = addr
pub fn loadi(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    Ok(State {
        i: op.nnn(),
        ..*state
    })
}

/// PC = V0 + addr
pub fn jumpi(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    Ok(State {
        pc: u16::from(state.v[0x0]) + op.nnn(),
        ..*state
    })
}

/// Vx = rand_byte & nn
pub fn rand(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let rand_byte: u8 = rand::random();
    let mut v = state.v;
    v[op.x() as usize] = rand_byte & op.nn();
    Ok(State { v, ..*state })
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs a sprite from memory I..I+n at position x, y on the FrameBuffer with wrapping.
/// Sets VF if any pixels were erased
pub fn draw(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let rows = state.span(state.i as usize, op.n() as usize)?;
    let origin_x = state.v[op.x() as usize] as usize;
    let origin_y = state.v[op.y() as usize] as usize;
    let mut frame_buffer = state.frame_buffer;
    let mut collision = 0x0;

    for (row, sprite_byte) in state.memory[rows].iter().enumerate() {
        let y = (origin_y + row) % DISPLAY_HEIGHT;
        for bit in 0..8 {
            let x = (origin_x + bit) % DISPLAY_WIDTH;
            let pixel = (sprite_byte >> (7 - bit)) & 0x1;
            collision |= pixel & frame_buffer[y][x];
            frame_buffer[y][x] ^= pixel;
        }
    }

    let mut v = state.v;
    v[0xF] = collision;
    Ok(State {
        draw_flag: true,
        v,
        frame_buffer,
        ..*state
    })
}

/// if Vx.pressed then pc += 2
pub fn skpr(op: &dyn Opcode, state: &State, keys: &Keypad) -> Result<State, Chip8Error> {
    skip_if(is_pressed(keys, state.v[op.x() as usize]), state)
}

/// if !Vx.pressed then pc += 2
pub fn skup(op: &dyn Opcode, state: &State, keys: &Keypad) -> Result<State, Chip8Error> {
    skip_if(!is_pressed(keys, state.v[op.x() as usize]), state)
}

/// Vx = DT
pub fn moved(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let mut v = state.v;
    v[op.x() as usize] = state.delay_timer;
    Ok(State { v, ..*state })
}

/// await keypress for Vx
pub fn keyd(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    Ok(State {
        mode: Mode::WaitingForKey(op.x()),
        ..*state
    })
}

/// DT = Vx
pub fn loads(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    Ok(State {
        delay_timer: state.v[op.x() as usize],
        ..*state
    })
}

/// ST = Vx
pub fn ld(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    Ok(State {
        sound_timer: state.v[op.x() as usize],
        ..*state
    })
}

/// I += Vx
pub fn addi(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    Ok(State {
        i: state.i.wrapping_add(u16::from(state.v[op.x() as usize])),
        ..*state
    })
}

/// I = Vx * 5
/// Set I to the memory address of the glyph for Vx
/// See constants::SPRITE_SHEET for more details
pub fn ldspr(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    Ok(State {
        i: u16::from(state.v[op.x() as usize]) * SPRITE_HEIGHT,
        ..*state
    })
}

/// mem[I..I+3] = bcd(Vx)
/// Store the decimal digits of Vx in memory starting at address I
pub fn bcd(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let vx = state.v[op.x() as usize];
    let digits = [vx / 100, vx / 10 % 10, vx % 10];
    let mut memory = state.memory;
    memory[state.span(state.i as usize, digits.len())?].copy_from_slice(&digits);
    Ok(State { memory, ..*state })
}

/// mem[I..=I+x] = V0..=Vx
pub fn stor(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let count = op.x() as usize + 1;
    let mut memory = state.memory;
    memory[state.span(state.i as usize, count)?].copy_from_slice(&state.v[..count]);
    Ok(State { memory, ..*state })
}

/// V0..=Vx = mem[I..=I+x]
pub fn read(op: &dyn Opcode, state: &State, _keys: &Keypad) -> Result<State, Chip8Error> {
    let count = op.x() as usize + 1;
    let mut v = state.v;
    v[..count].copy_from_slice(&state.memory[state.span(state.i as usize, count)?]);
    Ok(State { v, ..*state })
}
