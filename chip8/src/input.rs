use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::EventPump;

use emu8_core::{InputEvent, InputSource};

use crate::keymap::Keymap;

/// Keyboard and window events from SDL, translated through a `Keymap`
///
/// Besides the keypad, Space fast-forwards and Escape rewinds while held.
pub struct SdlInput {
    events: EventPump,
    keymap: Keymap,
}

impl SdlInput {
    pub fn new(events: EventPump, keymap: Keymap) -> Self {
        SdlInput { events, keymap }
    }
}

impl InputSource for SdlInput {
    fn poll(&mut self) -> Vec<InputEvent> {
        let keymap = &self.keymap;
        self.events
            .poll_iter()
            .filter_map(|event| match event {
                Event::Quit { .. } => Some(InputEvent::Quit),
                Event::KeyDown {
                    keycode: Some(key),
                    repeat: false,
                    ..
                } => translate(keymap, key, true),
                Event::KeyUp {
                    keycode: Some(key), ..
                } => translate(keymap, key, false),
                _ => None,
            })
            .collect()
    }
}

/// Maps a physical key transition onto an input event
fn translate(keymap: &Keymap, key: Keycode, down: bool) -> Option<InputEvent> {
    match (key, keymap.get(key)) {
        (_, Some(hex)) if down => Some(InputEvent::KeyDown(hex)),
        (_, Some(hex)) => Some(InputEvent::KeyUp(hex)),
        (Keycode::Space, _) => Some(InputEvent::FastForward(down)),
        (Keycode::Escape, _) => Some(InputEvent::Rewind(down)),
        _ => None,
    }
}
