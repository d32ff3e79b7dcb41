use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::PlaybackObserver;
use crate::audio::{OutputDevice, SampleBank, Voice, VoiceRegistry, pitch};
use crate::shared::{NUM_STRINGS, STEPS_PER_BAR, step_interval_ms};
use crate::tab::FretGrid;

/// Where the sequencer is in its walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequencerState {
    Idle,
    Armed { bar: usize, step: usize },
    Finished,
}

/// What one fire produced: either the step that just sounded plus the wait
/// before the next one, or the end of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fired {
    Scheduled {
        bar: usize,
        step: usize,
        interval: Duration,
    },
    Finished,
}

/// Walks the tablature one step at a time. This is a plain state machine:
/// the player owns the single timer and calls `fire` when it elapses, which
/// makes cancelling a run one operation instead of a flag checked inside a
/// self-rescheduling callback chain.
pub struct Sequencer {
    state: SequencerState,
    grid: Arc<dyn FretGrid>,
    bank: Arc<SampleBank>,
    registry: Arc<VoiceRegistry>,
    output: Arc<dyn OutputDevice>,
    observer: Arc<dyn PlaybackObserver>,
}

impl Sequencer {
    pub fn new(
        grid: Arc<dyn FretGrid>,
        bank: Arc<SampleBank>,
        registry: Arc<VoiceRegistry>,
        output: Arc<dyn OutputDevice>,
        observer: Arc<dyn PlaybackObserver>,
    ) -> Self {
        Self {
            state: SequencerState::Idle,
            grid,
            bank,
            registry,
            output,
            observer,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// Arms the first step. An empty tablature finishes on the spot, before
    /// any audio.
    pub fn start(&mut self) {
        self.state = if self.grid.bar_count() == 0 {
            SequencerState::Finished
        } else {
            SequencerState::Armed { bar: 0, step: 0 }
        };
    }

    /// Runs the armed step: triggers its voices, shows its highlight, arms
    /// the next one. The caller owns the one pending timer, so this can only
    /// ever be reached in the `Armed` state.
    pub fn fire(&mut self, bpm: u32) -> Fired {
        debug_assert!(
            !matches!(self.state, SequencerState::Idle),
            "fired before start"
        );
        let SequencerState::Armed { mut bar, mut step } = self.state else {
            // already finished (for instance the grid emptied under us)
            return Fired::Finished;
        };

        // rolling into the next bar is pure bookkeeping: no audio, no delay
        if step >= STEPS_PER_BAR {
            bar += 1;
            step = 0;
        }
        if bar >= self.grid.bar_count() {
            // running off the end cleans up exactly like an external stop
            self.finish();
            return Fired::Finished;
        }

        // prune voices that rang out since the last step
        self.registry.drain_finished();
        self.observer.on_highlight_clear();

        let mut sounding = Vec::new();
        for string in 0..NUM_STRINGS {
            let Some(fret) = self.grid.cell_at(bar, step, string) else {
                continue;
            };
            if self.trigger(string, fret) {
                sounding.push(string);
            }
        }
        // every voice of this step is registered and started before the
        // highlight shows and before the next timer is armed
        self.observer.on_step_highlight(bar, step, &sounding);

        self.state = SequencerState::Armed { bar, step: step + 1 };
        Fired::Scheduled {
            bar,
            step,
            interval: Duration::from_millis(step_interval_ms(bpm)),
        }
    }

    /// Ends the run from outside; same cleanup as running off the end.
    pub fn cancel(&mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        self.registry.stop_all();
        self.observer.on_highlight_clear();
        self.state = SequencerState::Finished;
    }

    /// One string's note for the current step. Failures silence the string
    /// and nothing else.
    fn trigger(&self, string: usize, fret: u8) -> bool {
        let Some(sample) = self.bank.get(string) else {
            debug!(string, "no sample loaded, string stays silent");
            return false;
        };
        let (data, rate) = match pitch::shift(&sample, fret) {
            Ok(shifted) => shifted,
            Err(e) => {
                warn!(string, fret, "skipping cell: {e}");
                return false;
            }
        };
        let voice = Arc::new(Voice::new(string, data, rate));
        self.registry.register(voice.clone());
        if let Err(e) = self.output.play(voice.clone()) {
            warn!(string, "backend refused voice: {e}");
            // let the next drain pass collect it
            voice.stop();
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::audio::mock::MockOutput;
    use crate::tab::Tablature;
    use crate::testutil::write_wav;

    #[derive(Clone, Debug, PartialEq)]
    enum Event {
        Highlight(usize, usize, Vec<usize>),
        Clear,
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<Event>>,
        ended: Mutex<usize>,
    }

    impl RecordingObserver {
        fn events(&self) -> Vec<Event> {
            self.events.lock().clone()
        }

        fn highlights(&self) -> Vec<Event> {
            self.events()
                .into_iter()
                .filter(|e| matches!(e, Event::Highlight(..)))
                .collect()
        }
    }

    impl PlaybackObserver for RecordingObserver {
        fn on_step_highlight(&self, bar: usize, step: usize, strings: &[usize]) {
            self.events
                .lock()
                .push(Event::Highlight(bar, step, strings.to_vec()));
        }

        fn on_highlight_clear(&self) {
            self.events.lock().push(Event::Clear);
        }

        fn on_playback_ended(&self) {
            *self.ended.lock() += 1;
        }
    }

    const RATE: u32 = 8_000;

    struct Rig {
        sequencer: Sequencer,
        output: Arc<MockOutput>,
        observer: Arc<RecordingObserver>,
        registry: Arc<VoiceRegistry>,
        _dir: tempfile::TempDir,
    }

    fn rig(tab: Tablature) -> Rig {
        let dir = tempfile::tempdir().unwrap();
        let mut bank = SampleBank::new();
        for string in 0..NUM_STRINGS {
            let path = dir.path().join(SampleBank::file_name(string));
            write_wav(&path, RATE, 16);
            bank.load(string, &path).unwrap();
        }

        let output = Arc::new(MockOutput::new());
        let observer = Arc::new(RecordingObserver::default());
        let registry = Arc::new(VoiceRegistry::new());
        let sequencer = Sequencer::new(
            Arc::new(tab),
            Arc::new(bank),
            registry.clone(),
            output.clone(),
            observer.clone(),
        );
        Rig {
            sequencer,
            output,
            observer,
            registry,
            _dir: dir,
        }
    }

    #[test]
    fn empty_tablature_finishes_on_start() {
        let mut r = rig(Tablature::new());
        r.sequencer.start();
        assert_eq!(r.sequencer.state(), SequencerState::Finished);
        assert_eq!(r.output.played_count(), 0);
    }

    #[test]
    fn one_bar_rolls_over_to_finished_without_audio() {
        let mut tab = Tablature::new();
        tab.add_bar();
        let mut r = rig(tab);

        r.sequencer.start();
        for step in 0..STEPS_PER_BAR {
            match r.sequencer.fire(120) {
                Fired::Scheduled {
                    bar,
                    step: fired,
                    interval,
                } => {
                    assert_eq!((bar, fired), (0, step));
                    assert_eq!(interval, Duration::from_millis(250));
                }
                Fired::Finished => panic!("finished early at step {step}"),
            }
        }
        // ninth fire is the rollover into bar 1, which doesn't exist
        assert_eq!(r.sequencer.fire(120), Fired::Finished);
        assert_eq!(r.sequencer.state(), SequencerState::Finished);
        assert_eq!(r.output.played_count(), 0);
    }

    #[test]
    fn cells_become_voices_and_highlights() {
        let mut tab = Tablature::new();
        let bar = tab.add_bar();
        tab.set(bar, 0, 0, "0");
        tab.set(bar, 0, 4, "12");
        let mut r = rig(tab);

        r.sequencer.start();
        r.sequencer.fire(120);

        assert_eq!(r.output.played_count(), 2);
        assert_eq!(r.output.played_strings(), vec![0, 4]);
        assert_eq!(r.output.played_rates(), vec![RATE, RATE * 2]);
        assert_eq!(
            r.observer.highlights(),
            vec![Event::Highlight(0, 0, vec![0, 4])]
        );
    }

    #[test]
    fn empty_and_invalid_cells_stay_silent() {
        let mut tab = Tablature::new();
        let bar = tab.add_bar();
        tab.set(bar, 0, 1, "22");
        tab.set(bar, 0, 2, "abc");
        let mut r = rig(tab);

        r.sequencer.start();
        r.sequencer.fire(120);

        assert_eq!(r.output.played_count(), 0);
        assert_eq!(r.observer.highlights(), vec![Event::Highlight(0, 0, vec![])]);
    }

    #[test]
    fn missing_sample_silences_only_that_string() {
        let mut tab = Tablature::new();
        let bar = tab.add_bar();
        tab.set(bar, 0, 1, "3");
        tab.set(bar, 0, 2, "3");

        // bank with nothing loaded for string 1
        let dir = tempfile::tempdir().unwrap();
        let mut bank = SampleBank::new();
        let path = dir.path().join(SampleBank::file_name(2));
        write_wav(&path, RATE, 16);
        bank.load(2, &path).unwrap();

        let output = Arc::new(MockOutput::new());
        let observer = Arc::new(RecordingObserver::default());
        let mut sequencer = Sequencer::new(
            Arc::new(tab),
            Arc::new(bank),
            Arc::new(VoiceRegistry::new()),
            output.clone(),
            observer.clone(),
        );

        sequencer.start();
        sequencer.fire(120);

        assert_eq!(output.played_strings(), vec![2]);
        assert_eq!(observer.highlights(), vec![Event::Highlight(0, 0, vec![2])]);
    }

    #[test]
    fn finished_voices_are_pruned_each_step() {
        let mut tab = Tablature::new();
        let bar = tab.add_bar();
        tab.set(bar, 0, 0, "0");
        tab.set(bar, 1, 0, "0");
        let mut r = rig(tab);

        r.sequencer.start();
        r.sequencer.fire(120);
        assert_eq!(r.registry.active_count(), 1);

        // the rendering side finishes the first voice before the next step
        r.output.drain(16);
        r.sequencer.fire(120);
        assert_eq!(r.registry.active_count(), 1);
    }

    #[test]
    fn cancel_stops_voices_and_clears_highlight() {
        let mut tab = Tablature::new();
        let bar = tab.add_bar();
        tab.set(bar, 0, 0, "5");
        let mut r = rig(tab);

        r.sequencer.start();
        r.sequencer.fire(120);
        assert_eq!(r.registry.active_count(), 1);

        r.sequencer.cancel();

        assert_eq!(r.sequencer.state(), SequencerState::Finished);
        assert_eq!(r.registry.active_count(), 0);
        assert!(r.output.all_finished());
        assert_eq!(r.observer.events().last(), Some(&Event::Clear));
    }

    #[test]
    fn tempo_is_read_at_fire_time() {
        let mut tab = Tablature::new();
        tab.add_bar();
        let mut r = rig(tab);

        r.sequencer.start();
        let Fired::Scheduled { interval, .. } = r.sequencer.fire(60) else {
            panic!("expected a scheduled step");
        };
        assert_eq!(interval, Duration::from_millis(500));
        let Fired::Scheduled { interval, .. } = r.sequencer.fire(120) else {
            panic!("expected a scheduled step");
        };
        assert_eq!(interval, Duration::from_millis(250));
    }

    #[test]
    fn voices_start_before_the_highlight_shows() {
        // an observer that peeks at the backend when the highlight arrives
        struct ProbingObserver {
            output: Arc<MockOutput>,
            seen: Mutex<Vec<usize>>,
        }
        impl PlaybackObserver for ProbingObserver {
            fn on_step_highlight(&self, _bar: usize, _step: usize, _strings: &[usize]) {
                self.seen.lock().push(self.output.played_count());
            }
            fn on_highlight_clear(&self) {}
            fn on_playback_ended(&self) {}
        }

        let mut tab = Tablature::new();
        let bar = tab.add_bar();
        tab.set(bar, 0, 0, "0");
        tab.set(bar, 0, 5, "2");

        let dir = tempfile::tempdir().unwrap();
        let mut bank = SampleBank::new();
        for string in 0..NUM_STRINGS {
            let path = dir.path().join(SampleBank::file_name(string));
            write_wav(&path, RATE, 8);
            bank.load(string, &path).unwrap();
        }

        let output = Arc::new(MockOutput::new());
        let observer = Arc::new(ProbingObserver {
            output: output.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let mut sequencer = Sequencer::new(
            Arc::new(tab),
            Arc::new(bank),
            Arc::new(VoiceRegistry::new()),
            output,
            observer.clone(),
        );

        sequencer.start();
        sequencer.fire(120);

        assert_eq!(*observer.seen.lock(), vec![2]);
    }
}
