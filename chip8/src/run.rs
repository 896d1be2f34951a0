use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::{debug, info};

use emu8_core::{Chip8, DisplaySink, InputEvent, InputSource, Step};

use crate::speaker::Speaker;

/// Why the emulator stopped
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Exit {
    /// The input source asked to quit
    Quit,
    /// The program ran off the end of memory
    Halted,
}

/// Drives a loaded Chip8 until the user quits or the program halts
///
/// Every iteration:
/// - presents the frame if it changed
/// - applies pending input
/// - steps (or rewinds) the CPU and advances its timers
/// - sleeps out the rest of `cycle_time` unless fast-forwarding
///
/// # Arguments
/// * `chip8` a Chip8 with a ROM loaded
/// * `input` where key presses and quit requests come from
/// * `display` where frames go
/// * `speaker` follows the sound timer; on while it is non-zero
/// * `cycle_time` the minimum wall time per CPU cycle
pub fn run<I, D>(
    chip8: &mut Chip8,
    input: &mut I,
    display: &mut D,
    speaker: &mut Speaker,
    cycle_time: Duration,
) -> anyhow::Result<Exit>
where
    I: InputSource,
    D: DisplaySink,
    D::Error: std::error::Error + Send + Sync + 'static,
{
    let mut last_cycle: Instant = Instant::now();

    // Whether or not the clock speed should be respected
    let mut fast_forward: bool = false;
    // Whether the game's state should be cycled forwards or backwards
    let mut rewind: bool = false;

    display
        .present(chip8.frame())
        .context("unable to present the first frame")?;

    loop {
        // If the draw flag is set, render the current frame and unset it
        if let Some(frame) = chip8.get_frame() {
            display.present(frame).context("unable to present frame")?;
            chip8.clear_draw_flag();
        }

        // Handle input
        for event in input.poll() {
            match event {
                InputEvent::Quit => return Ok(Exit::Quit),
                InputEvent::KeyDown(key) => chip8.key_press(key),
                InputEvent::KeyUp(key) => chip8.key_release(key),
                InputEvent::FastForward(on) => fast_forward = on,
                InputEvent::Rewind(on) => rewind = on,
            }
        }

        // Update state
        if rewind {
            if !chip8.rewind() {
                debug!("no saved states left to rewind to");
            }
        } else {
            if chip8.step().context("program crashed")? == Step::Halted {
                info!("program ran off the end of memory");
                return Ok(Exit::Halted);
            }
            if chip8.advance_timers() {
                debug!("sound timer ran out");
            }
        }

        // Fx18 and rewinding can change the sound timer without a tick
        if chip8.sound_active() {
            speaker.start();
        } else {
            speaker.stop();
        }

        // Handle timing
        let current_time = Instant::now();
        let elapsed_cycle_time = current_time - last_cycle;
        if !fast_forward && cycle_time > elapsed_cycle_time {
            std::thread::sleep(cycle_time - elapsed_cycle_time);
        }
        last_cycle = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emu8_core::{Chip8Error, FrameBuffer};
    use std::collections::VecDeque;
    use std::convert::Infallible;

    /// Plays back one batch of events per poll, then quits
    struct ScriptedInput {
        script: VecDeque<Vec<InputEvent>>,
        polls: usize,
    }

    impl ScriptedInput {
        fn new(script: Vec<Vec<InputEvent>>) -> Self {
            ScriptedInput {
                script: script.into(),
                polls: 0,
            }
        }
    }

    impl InputSource for ScriptedInput {
        fn poll(&mut self) -> Vec<InputEvent> {
            self.polls += 1;
            self.script
                .pop_front()
                .unwrap_or_else(|| vec![InputEvent::Quit])
        }
    }

    #[derive(Default)]
    struct RecordingDisplay {
        frames: Vec<FrameBuffer>,
    }

    impl DisplaySink for RecordingDisplay {
        type Error = Infallible;

        fn present(&mut self, frame: &FrameBuffer) -> Result<(), Infallible> {
            self.frames.push(*frame);
            Ok(())
        }
    }

    fn boot(program: &[u8]) -> Chip8 {
        let mut chip8 = Chip8::new();
        chip8.load_program(program).unwrap();
        chip8
    }

    fn idle(polls: usize) -> Vec<Vec<InputEvent>> {
        vec![vec![]; polls]
    }

    #[test]
    fn test_quits_on_request() {
        // jp 0x200
        let mut chip8 = boot(&[0x12, 0x00]);
        let mut input = ScriptedInput::new(idle(3));
        let mut display = RecordingDisplay::default();
        let exit = run(
            &mut chip8,
            &mut input,
            &mut display,
            &mut Speaker::default(),
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(exit, Exit::Quit);
        assert_eq!(input.polls, 4);
    }

    #[test]
    fn test_stops_when_program_halts() {
        // jp 0xFFE; memory there is empty so the next op runs off the end
        let mut chip8 = boot(&[0x1F, 0xFE]);
        let mut input = ScriptedInput::new(idle(10));
        let mut display = RecordingDisplay::default();
        let exit = run(
            &mut chip8,
            &mut input,
            &mut display,
            &mut Speaker::default(),
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(exit, Exit::Halted);
        assert_eq!(input.polls, 3);
    }

    #[test]
    fn test_presents_only_changed_frames() {
        // ld v0, 0; drw v0, v0, 5 (glyph 0); jp self
        let mut chip8 = boot(&[0x60, 0x00, 0xD0, 0x05, 0x12, 0x04]);
        let mut input = ScriptedInput::new(idle(10));
        let mut display = RecordingDisplay::default();
        run(
            &mut chip8,
            &mut input,
            &mut display,
            &mut Speaker::default(),
            Duration::ZERO,
        )
        .unwrap();
        // The blank first frame and the frame with the glyph
        assert_eq!(display.frames.len(), 2);
        assert_eq!(display.frames[1][0][0..4], [1, 1, 1, 1]);
    }

    #[test]
    fn test_waits_for_key_while_polling() {
        // ld v1, k; cls; jp self
        let mut chip8 = boot(&[0xF1, 0x0A, 0x00, 0xE0, 0x12, 0x04]);
        let mut script = idle(5);
        script.push(vec![InputEvent::KeyDown(0x7)]);
        script.extend(idle(3));
        let mut input = ScriptedInput::new(script);
        let mut display = RecordingDisplay::default();
        run(
            &mut chip8,
            &mut input,
            &mut display,
            &mut Speaker::default(),
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(chip8.state().v[0x1], 0x7);
        assert_eq!(chip8.state().pc, 0x204);
        assert!(chip8.pressed_keys()[0x7]);
        // Only the blank first frame and the cleared one after the key arrived
        assert_eq!(display.frames.len(), 2);
    }

    #[test]
    fn test_quit_while_waiting_for_key() {
        let mut chip8 = boot(&[0xF1, 0x0A]);
        let mut input = ScriptedInput::new(idle(2));
        let mut display = RecordingDisplay::default();
        let exit = run(
            &mut chip8,
            &mut input,
            &mut display,
            &mut Speaker::default(),
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(exit, Exit::Quit);
        assert_eq!(chip8.state().pc, 0x202);
    }

    #[test]
    fn test_rewinds_while_held() {
        // ld v1, 1; add v1, 1; add v1, 1; jp self
        let mut chip8 = boot(&[0x61, 0x01, 0x71, 0x01, 0x71, 0x01, 0x12, 0x06]);
        let mut script = idle(2);
        script.push(vec![InputEvent::Rewind(true)]);
        let mut input = ScriptedInput::new(script);
        let mut display = RecordingDisplay::default();
        run(
            &mut chip8,
            &mut input,
            &mut display,
            &mut Speaker::default(),
            Duration::ZERO,
        )
        .unwrap();
        // Two steps forward, one back
        assert_eq!(chip8.state().v[0x1], 0x1);
        assert_eq!(chip8.state().pc, 0x202);
    }

    #[test]
    fn test_speaker_follows_sound_timer() {
        // ld v0, 5; ld st, v0; jp self
        let mut chip8 = boot(&[0x60, 0x05, 0xF0, 0x18, 0x12, 0x04]);
        let mut input = ScriptedInput::new(idle(3));
        let mut display = RecordingDisplay::default();
        let mut speaker = Speaker::default();
        run(
            &mut chip8,
            &mut input,
            &mut display,
            &mut speaker,
            Duration::ZERO,
        )
        .unwrap();
        assert!(chip8.sound_active());
        assert!(speaker.is_playing());
    }

    #[test]
    fn test_speaker_stops_when_sound_timer_is_cleared() {
        // ld v0, 5; ld st, v0; ld v1, 0; ld st, v1; jp self
        let mut chip8 = boot(&[
            0x60, 0x05, 0xF0, 0x18, 0x61, 0x00, 0xF1, 0x18, 0x12, 0x08,
        ]);
        let mut input = ScriptedInput::new(idle(10));
        let mut display = RecordingDisplay::default();
        let mut speaker = Speaker::default();
        run(
            &mut chip8,
            &mut input,
            &mut display,
            &mut speaker,
            Duration::ZERO,
        )
        .unwrap();
        assert!(!chip8.sound_active());
        assert!(!speaker.is_playing());
    }

    #[test]
    fn test_speaker_stops_when_rewound_past_tone() {
        // ld v0, 5; ld st, v0; jp self
        let mut chip8 = boot(&[0x60, 0x05, 0xF0, 0x18, 0x12, 0x04]);
        let mut script = idle(2);
        script.push(vec![InputEvent::Rewind(true)]);
        script.extend(idle(1));
        let mut input = ScriptedInput::new(script);
        let mut display = RecordingDisplay::default();
        let mut speaker = Speaker::default();
        run(
            &mut chip8,
            &mut input,
            &mut display,
            &mut speaker,
            Duration::ZERO,
        )
        .unwrap();
        assert!(!chip8.sound_active());
        assert!(!speaker.is_playing());
    }

    #[test]
    fn test_crash_is_reported() {
        // ret with nothing on the stack
        let mut chip8 = boot(&[0x00, 0xEE]);
        let mut input = ScriptedInput::new(idle(3));
        let mut display = RecordingDisplay::default();
        let err = run(
            &mut chip8,
            &mut input,
            &mut display,
            &mut Speaker::default(),
            Duration::ZERO,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Chip8Error>(),
            Some(Chip8Error::StackUnderflow { .. })
        ));
    }
}
