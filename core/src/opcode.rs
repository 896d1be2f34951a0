/// # Opcodes
///
/// Opcodes are 2-byte big-endian words, written as nibbles `(f, x, y, n)`.
/// Their behavior is cased on some combination of:
/// - `f` the instruction family; applies to all opcodes
/// - `n` or `(y, n)` the specific operation within a family
/// - the full word for fixed functions without operands (e.g. `00E0`; clear screen)
///
/// Nibbles not used to select the operation carry operands.
/// - `nnn` (`x`, `y` and `n` together) is a 12-bit address
/// - `nn` (`y` and `n` together) is an 8-bit immediate
/// - `x` names the register Vx or the register range V0..=Vx
/// - `y` names the register Vy
/// - `n` is a 4-bit immediate (sprite height for `Dxyn`)
pub trait Opcode {
    /// The Opcode's component nibbles.
    fn nibbles(&self) -> (u8, u8, u8, u8);

    /// The Opcode's first nibble.
    /// `[f___]`
    fn family(&self) -> u8;

    /// The Opcode's second nibble.
    /// `[_x__]`
    fn x(&self) -> u8;

    /// The Opcode's third nibble.
    /// `[__y_]`
    fn y(&self) -> u8;

    /// The Opcode's fourth nibble.
    /// `[___n]`
    fn n(&self) -> u8;

    /// The Opcode's least significant byte.
    /// `[__nn]`
    fn nn(&self) -> u8;

    /// The Opcode without its family nibble.
    /// `[_nnn]`
    fn nnn(&self) -> u16;
}

impl Opcode for u16 {
    fn nibbles(&self) -> (u8, u8, u8, u8) {
        (self.family(), self.x(), self.y(), self.n())
    }

    fn family(&self) -> u8 {
        (self >> 12) as u8
    }

    fn x(&self) -> u8 {
        ((self & 0x0F00) >> 8) as u8
    }

    fn y(&self) -> u8 {
        ((self & 0x00F0) >> 4) as u8
    }

    fn n(&self) -> u8 {
        (self & 0x000F) as u8
    }

    fn nn(&self) -> u8 {
        (self & 0x00FF) as u8
    }

    fn nnn(&self) -> u16 {
        self & 0x0FFF
    }
}
