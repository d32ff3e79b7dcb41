use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::Mutex;
use tracing::debug;

use super::PlaybackObserver;
use super::sequencer::{Fired, Sequencer};
use crate::audio::{OutputDevice, SampleBank, VoiceRegistry};
use crate::shared::{DEFAULT_BPM, MAX_BPM, MIN_BPM, PlaybackState};
use crate::tab::FretGrid;

/// The control surface collaborators call: `start`, `stop`, `set_tempo`.
/// Owns the voice registry and the run thread. Everything mutable about a
/// run sits behind one lock, so start and stop can never race each other or
/// a firing step.
pub struct Player {
    inner: Arc<Inner>,
}

struct Inner {
    grid: Arc<dyn FretGrid>,
    bank: Arc<SampleBank>,
    registry: Arc<VoiceRegistry>,
    output: Arc<dyn OutputDevice>,
    observer: Arc<dyn PlaybackObserver>,
    bpm: AtomicU32,
    run: Mutex<Run>,
}

/// Book-keeping for the current run. `generation` grows on every start and
/// stop; a run thread that sees a newer generation than its own goes away
/// without touching anything.
struct Run {
    generation: u64,
    cancel: Option<Sender<()>>,
    state: PlaybackState,
    thread: Option<thread::JoinHandle<()>>,
}

impl Player {
    pub fn new(
        grid: Arc<dyn FretGrid>,
        bank: Arc<SampleBank>,
        output: Arc<dyn OutputDevice>,
        observer: Arc<dyn PlaybackObserver>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                grid,
                bank,
                registry: Arc::new(VoiceRegistry::new()),
                output,
                observer,
                bpm: AtomicU32::new(DEFAULT_BPM),
                run: Mutex::new(Run {
                    generation: 0,
                    cancel: None,
                    state: PlaybackState::Stopped,
                    thread: None,
                }),
            }),
        }
    }

    /// Starts from the top. Always a hard reset: any prior run is fully
    /// stopped first, exactly as if `stop` had been called.
    pub fn start(&self) {
        let mut run = self.inner.run.lock();
        self.inner.stop_locked(&mut run);

        if self.inner.grid.bar_count() == 0 {
            drop(run);
            // nothing to walk; this counts as ending naturally, before any audio
            self.inner.observer.on_playback_ended();
            return;
        }

        run.generation += 1;
        let generation = run.generation;
        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        run.cancel = Some(cancel_tx);
        run.state = PlaybackState::Playing { bar: 0, step: 0 };

        let inner = self.inner.clone();
        run.thread = Some(thread::spawn(move || run_loop(inner, generation, cancel_rx)));
        debug!(generation, "playback started");
    }

    /// Stops playback. Before this returns, the pending step timer is dead,
    /// every active voice is stopped, and the highlight is cleared. Calling
    /// it while already stopped is a no-op beyond that cleanup.
    pub fn stop(&self) {
        let mut run = self.inner.run.lock();
        self.inner.stop_locked(&mut run);
    }

    /// Clamps into 40..=240 and applies from the next armed step onward; a
    /// step already waiting keeps the interval it was armed with.
    pub fn set_tempo(&self, bpm: u32) {
        let clamped = bpm.clamp(MIN_BPM, MAX_BPM);
        if clamped != bpm {
            debug!(bpm, clamped, "tempo outside range, clamped");
        }
        self.inner.bpm.store(clamped, Ordering::Relaxed);
    }

    pub fn tempo(&self) -> u32 {
        self.inner.bpm.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> PlaybackState {
        self.inner.run.lock().state
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        let handle = {
            let mut run = self.inner.run.lock();
            self.inner.stop_locked(&mut run);
            run.thread.take()
        };
        // join outside the lock: the thread needs it to notice the cancel
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

impl Inner {
    /// The actual stop, with the run lock already held.
    fn stop_locked(&self, run: &mut Run) {
        run.generation += 1; // orphans the run thread wherever it is
        if let Some(cancel) = run.cancel.take() {
            let _ = cancel.try_send(()); // wake a sleeping timer now
        }
        self.registry.stop_all();
        self.observer.on_highlight_clear();
        if run.state.is_playing() {
            debug!("playback stopped");
        }
        run.state = PlaybackState::Stopped;
    }
}

/// One run of the tablature, on its own thread. Holds the run lock while a
/// step fires, so a concurrent `stop` either waits the fire out or has
/// already orphaned this generation. The `recv_timeout` below is the single
/// pending timer the whole engine ever has.
fn run_loop(inner: Arc<Inner>, generation: u64, cancel: Receiver<()>) {
    let mut sequencer = Sequencer::new(
        inner.grid.clone(),
        inner.bank.clone(),
        inner.registry.clone(),
        inner.output.clone(),
        inner.observer.clone(),
    );
    sequencer.start();

    loop {
        let fired = {
            let mut run = inner.run.lock();
            if run.generation != generation {
                return; // a newer start or stop owns the state now
            }
            let fired = sequencer.fire(inner.bpm.load(Ordering::Relaxed));
            match fired {
                Fired::Scheduled { bar, step, .. } => {
                    run.state = PlaybackState::Playing { bar, step };
                }
                Fired::Finished => {
                    // natural end; the sequencer already stopped the voices
                    // and cleared the highlight
                    run.generation += 1;
                    run.cancel = None;
                    run.state = PlaybackState::Stopped;
                }
            }
            fired
        };

        match fired {
            Fired::Scheduled { interval, .. } => match cancel.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            },
            Fired::Finished => {
                inner.observer.on_playback_ended();
                return;
            }
        }
    }
}
