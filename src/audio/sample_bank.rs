use std::path::Path;
use std::sync::Arc;

use tracing::error;

use super::BYTES_PER_FRAME;
use crate::shared::NUM_STRINGS;

/// One decoded open-string recording: raw little-endian 16-bit mono PCM plus
/// the rate it was recorded at. Never mutated after loading.
#[derive(Clone, Debug)]
pub struct Sample {
    data: Vec<u8>,
    sample_rate: u32,
}

impl Sample {
    pub(crate) fn new(data: Vec<u8>, sample_rate: u32) -> Self {
        Self { data, sample_rate }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_count(&self) -> usize {
        self.data.len() / BYTES_PER_FRAME
    }
}

/// A sample that couldn't be loaded. The string plays silent for the rest of
/// the session; nothing retries and nothing crashes.
#[derive(Debug, thiserror::Error)]
#[error("failed to load sample for string {string}: {reason}")]
pub struct LoadError {
    pub string: usize,
    pub reason: String,
}

/// Loads and caches the six open-string recordings. Each string is read from
/// disk at most once; afterwards `get` is just an Arc clone.
pub struct SampleBank {
    samples: [Option<Arc<Sample>>; NUM_STRINGS],
}

impl SampleBank {
    pub fn new() -> Self {
        Self {
            samples: std::array::from_fn(|_| None),
        }
    }

    /// File each string's recording lives in: `open_s1.wav` for string 0
    /// through `open_s6.wav` for string 5.
    pub fn file_name(string: usize) -> String {
        format!("open_s{}.wav", string + 1)
    }

    /// Loads every string's sample from `dir` by the conventional file
    /// names. Failures are logged and that string stays silent; playback
    /// still runs.
    pub fn load_dir(dir: &Path) -> Self {
        let mut bank = Self::new();
        for string in 0..NUM_STRINGS {
            let path = dir.join(Self::file_name(string));
            if let Err(e) = bank.load(string, &path) {
                error!(string, path = %path.display(), err = %e, "sample load failed");
            }
        }
        bank
    }

    /// Loads one string's sample. Idempotent: a string that already has a
    /// cached sample is left untouched and the load reports success.
    pub fn load(&mut self, string: usize, path: &Path) -> Result<(), LoadError> {
        if string >= NUM_STRINGS {
            return Err(LoadError {
                string,
                reason: format!("no such string (0-{})", NUM_STRINGS - 1),
            });
        }
        if self.samples[string].is_some() {
            return Ok(());
        }
        let sample = decode_wav(path).map_err(|reason| LoadError { string, reason })?;
        self.samples[string] = Some(Arc::new(sample));
        Ok(())
    }

    /// Cached sample for a string, if it loaded. Never touches the disk.
    pub fn get(&self, string: usize) -> Option<Arc<Sample>> {
        self.samples.get(string)?.clone()
    }
}

impl Default for SampleBank {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_wav(path: &Path) -> Result<Sample, String> {
    let mut reader = hound::WavReader::open(path).map_err(|e| e.to_string())?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(format!("expected mono, file has {} channels", spec.channels));
    }
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        return Err(format!(
            "expected 16-bit int PCM, file is {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        ));
    }

    let mut data = Vec::with_capacity(reader.len() as usize * BYTES_PER_FRAME);
    for sample in reader.samples::<i16>() {
        let s = sample.map_err(|e| e.to_string())?;
        data.extend_from_slice(&s.to_le_bytes());
    }
    Ok(Sample::new(data, spec.sample_rate))
}
