// Test helpers: WAV fixtures and cross-thread polling.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Writes a little mono 16-bit PCM file containing a recognizable ramp.
pub(crate) fn write_wav(path: &Path, sample_rate: u32, frames: usize) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        writer.write_sample(i as i16 * 3).unwrap();
    }
    writer.finalize().unwrap();
}

/// Spins until the predicate holds or a few seconds pass.
pub(crate) fn eventually<F: Fn() -> bool>(predicate: F, msg: &str) {
    let start = Instant::now();
    while !predicate() {
        if start.elapsed() > Duration::from_secs(3) {
            panic!("{msg}");
        }
        thread::sleep(Duration::from_millis(10));
    }
}
