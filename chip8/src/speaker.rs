use tracing::debug;

/// Stand-in for an audio device; tracks whether a tone would be playing
#[derive(Debug, Default)]
pub struct Speaker {
    playing: bool,
}

impl Speaker {
    pub fn start(&mut self) {
        if !self.playing {
            debug!("tone on");
            self.playing = true;
        }
    }

    pub fn stop(&mut self) {
        if self.playing {
            debug!("tone off");
            self.playing = false;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let mut speaker = Speaker::default();
        speaker.start();
        speaker.start();
        assert!(speaker.is_playing());
        speaker.stop();
        speaker.stop();
        assert!(!speaker.is_playing());
    }
}
