use std::sync::Arc;

use parking_lot::Mutex;

use super::OutputDevice;
use super::voice::{FrameResult, Voice};

/// Backend that makes no sound. It records what it was asked to play so
/// tests can assert on it, and `drain` stands in for the rendering threads
/// by pulling voices dry on demand.
#[derive(Default)]
pub struct MockOutput {
    played: Mutex<Vec<Arc<Voice>>>,
}

impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of voices handed over so far.
    pub fn played_count(&self) -> usize {
        self.played.lock().len()
    }

    /// Playback rates of every voice played, in trigger order.
    pub fn played_rates(&self) -> Vec<u32> {
        self.played.lock().iter().map(|v| v.playback_rate()).collect()
    }

    /// Strings of every voice played, in trigger order.
    pub fn played_strings(&self) -> Vec<usize> {
        self.played.lock().iter().map(|v| v.string()).collect()
    }

    /// True once every recorded voice has completed or been stopped.
    pub fn all_finished(&self) -> bool {
        self.played.lock().iter().all(|v| v.is_finished())
    }

    /// Pulls every recorded voice to completion, like the rendering threads
    /// eventually would.
    pub fn drain(&self, frames_per_pull: usize) {
        assert!(frames_per_pull > 0);
        for voice in self.played.lock().iter() {
            while let FrameResult::Data(_) = voice.pull(frames_per_pull) {}
        }
    }
}

impl OutputDevice for MockOutput {
    fn play(&self, voice: Arc<Voice>) -> anyhow::Result<()> {
        self.played.lock().push(voice);
        Ok(())
    }
}
