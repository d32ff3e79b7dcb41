// Audio output layer. Every triggered note becomes a Voice; the backend
// streams each voice on its own device stream, pulling frames from it on a
// rendering thread until the buffer runs dry.

use std::sync::Arc;

pub mod cpal;
pub mod mock;
pub mod pitch;
pub mod registry;
pub mod sample_bank;
pub mod voice;

pub use pitch::{InvalidFret, shift, shifted_rate};
pub use registry::VoiceRegistry;
pub use sample_bank::{LoadError, Sample, SampleBank};
pub use voice::{FrameResult, Voice, VoiceId};

/// Bytes per PCM frame: samples are 16-bit mono throughout.
pub const BYTES_PER_FRAME: usize = 2;

/// Where voices go to make sound. The sequencer registers a voice and hands
/// it here; the backend pulls frames from it on its own rendering thread
/// until the voice completes or is stopped.
pub trait OutputDevice: Send + Sync {
    /// Starts streaming the voice at its playback rate. Returns once the
    /// stream is launched, not once it finishes.
    fn play(&self, voice: Arc<Voice>) -> anyhow::Result<()>;
}

/// Opens the default output device.
pub fn start_audio() -> anyhow::Result<cpal::CpalOutput> {
    cpal::CpalOutput::open()
}
