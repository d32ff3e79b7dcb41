use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::voice::Voice;

/// Every voice currently sounding. This is the one structure both the
/// control side and the rendering side care about, so all mutation goes
/// through the lock; `Voice::pull` itself never takes it, since each voice
/// owns its own cursor.
pub struct VoiceRegistry {
    voices: Mutex<Vec<Arc<Voice>>>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self {
            voices: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, voice: Arc<Voice>) {
        self.voices.lock().push(voice);
    }

    /// Drops every voice whose buffer ran out or that was stopped.
    pub fn drain_finished(&self) {
        self.voices.lock().retain(|voice| !voice.is_finished());
    }

    /// Stops everything and empties the registry. A voice already inside a
    /// render callback may finish that one invocation; once its stream sees
    /// the stop it is never pulled again.
    pub fn stop_all(&self) {
        let mut voices = self.voices.lock();
        for voice in voices.iter() {
            voice.stop();
        }
        if !voices.is_empty() {
            debug!(count = voices.len(), "stopped all voices");
        }
        voices.clear();
    }

    pub fn active_count(&self) -> usize {
        self.voices.lock().len()
    }
}

impl Default for VoiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
