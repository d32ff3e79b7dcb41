use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use super::BYTES_PER_FRAME;

// atomic counter so ids stay unique across threads
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VoiceId(pub u64);

fn next_voice_id() -> VoiceId {
    VoiceId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// What a rendering thread gets back from one pull.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameResult {
    /// Next chunk of PCM, at most `frame_count * 2` bytes. The last chunk
    /// before the end may be shorter than asked for.
    Data(Vec<u8>),
    /// Cursor reached the end of the buffer, or the voice was stopped.
    Complete,
}

/// One playing note: an owned PCM buffer plus the read cursor the rendering
/// thread advances. The buffer is never shared. The only cross-thread
/// writes are the stop flag (control side) and the cursor (rendering side),
/// both atomic, so pulling needs no lock at all.
#[derive(Debug)]
pub struct Voice {
    id: VoiceId,
    string: usize,
    data: Vec<u8>,
    playback_rate: u32,
    cursor: AtomicUsize,
    stopped: AtomicBool,
}

impl Voice {
    pub fn new(string: usize, data: Vec<u8>, playback_rate: u32) -> Self {
        Self {
            id: next_voice_id(),
            string,
            data,
            playback_rate,
            cursor: AtomicUsize::new(0),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    /// String this note sounds on, for log lines and tests.
    pub fn string(&self) -> usize {
        self.string
    }

    /// Rate the backend should stream this buffer at; this is the entire
    /// pitch shift.
    pub fn playback_rate(&self) -> u32 {
        self.playback_rate
    }

    /// Next `frame_count` frames of PCM. Only the rendering thread calls
    /// this; the cursor never moves backwards and never passes the end.
    pub fn pull(&self, frame_count: usize) -> FrameResult {
        if self.stopped.load(Ordering::Acquire) {
            return FrameResult::Complete;
        }
        let start = self.cursor.load(Ordering::Relaxed);
        if start >= self.data.len() {
            return FrameResult::Complete;
        }
        let end = (start + frame_count * BYTES_PER_FRAME).min(self.data.len());
        self.cursor.store(end, Ordering::Release);
        FrameResult::Data(self.data[start..end].to_vec())
    }

    /// Hard-stops the voice: the next pull reports `Complete` no matter how
    /// much buffer is left. Callable from any thread.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.stopped.load(Ordering::Acquire) || self.cursor.load(Ordering::Acquire) >= self.data.len()
    }
}
