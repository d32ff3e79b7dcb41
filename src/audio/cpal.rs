use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::bounded;
use tracing::{debug, error};

use super::OutputDevice;
use super::voice::{FrameResult, Voice};

/// How often the owning thread rechecks its voice while the callback runs.
const TEARDOWN_POLL: Duration = Duration::from_millis(100);

/// Real backend: one output stream per voice, opened at the voice's playback
/// rate. Each stream is built and owned inside a dedicated thread, since
/// cpal streams don't move across threads; the device handle itself does.
pub struct CpalOutput {
    device: cpal::Device,
}

impl CpalOutput {
    pub fn open() -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("no default output device")?;
        Ok(Self { device })
    }
}

impl OutputDevice for CpalOutput {
    fn play(&self, voice: Arc<Voice>) -> anyhow::Result<()> {
        let device = self.device.clone();
        thread::spawn(move || stream_voice(device, voice));
        Ok(())
    }
}

fn stream_voice(device: cpal::Device, voice: Arc<Voice>) {
    let config = cpal::StreamConfig {
        channels: 1,
        sample_rate: voice.playback_rate(),
        buffer_size: cpal::BufferSize::Default,
    };

    // the callback signals here once the buffer runs dry
    let (done_tx, done_rx) = bounded::<()>(1);

    let err_fn = {
        let done_tx = done_tx.clone();
        move |err| {
            error!("audio output stream error: {err}");
            let _ = done_tx.try_send(());
        }
    };

    let callback_voice = voice.clone();
    let stream = device.build_output_stream(
        &config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            match callback_voice.pull(data.len()) {
                FrameResult::Data(bytes) => {
                    let mut filled = 0;
                    for (out, pcm) in data.iter_mut().zip(bytes.chunks_exact(2)) {
                        let s = i16::from_le_bytes([pcm[0], pcm[1]]);
                        *out = f32::from(s) / 32768.0;
                        filled += 1;
                    }
                    data[filled..].fill(0.0); // zero any shortfall
                }
                FrameResult::Complete => {
                    data.fill(0.0);
                    let _ = done_tx.try_send(());
                }
            }
        },
        err_fn,
        None,
    );

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            error!(rate = voice.playback_rate(), "could not open output stream: {e}");
            voice.stop();
            return;
        }
    };
    if let Err(e) = stream.play() {
        error!("could not start output stream: {e}");
        voice.stop();
        return;
    }

    // Hold the stream until the voice drains or is stopped, then drop it so
    // the rendering thread detaches.
    loop {
        if done_rx.recv_timeout(TEARDOWN_POLL).is_ok() || voice.is_finished() {
            break;
        }
    }
    debug!(voice = voice.id().0, string = voice.string(), "voice stream closed");
}
