use sdl2::keyboard::Keycode;

/// # Keymap
/// Chip-8 input is generated with a hexadecimal keypad.
///
/// A keymap is a table from physical keys to keypad keys; any table of 16 pairs can be
/// swapped in. The default layout maps the keypad onto the left 4 alphanumeric columns.
/// ```text
/// |1|2|3|C|      |1|2|3|4|
/// |4|5|6|D|  ->  |Q|W|E|R|
/// |7|8|9|E|  ->  |A|S|D|F|
/// |A|0|B|F|      |Z|X|C|V|
/// ```
#[derive(Clone, Debug)]
pub struct Keymap {
    table: [(Keycode, u8); 16],
}

impl Keymap {
    pub fn new(table: [(Keycode, u8); 16]) -> Self {
        Keymap { table }
    }

    /// The keypad key bound to a physical key, if any
    pub fn get(&self, key: Keycode) -> Option<u8> {
        self.table
            .iter()
            .find(|(code, _)| *code == key)
            .map(|&(_, hex)| hex)
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Keymap::new([
            (Keycode::X, 0x0),
            (Keycode::Num1, 0x1),
            (Keycode::Num2, 0x2),
            (Keycode::Num3, 0x3),
            (Keycode::Q, 0x4),
            (Keycode::W, 0x5),
            (Keycode::E, 0x6),
            (Keycode::A, 0x7),
            (Keycode::S, 0x8),
            (Keycode::D, 0x9),
            (Keycode::Z, 0xA),
            (Keycode::C, 0xB),
            (Keycode::Num4, 0xC),
            (Keycode::R, 0xD),
            (Keycode::F, 0xE),
            (Keycode::V, 0xF),
        ])
    }
}
