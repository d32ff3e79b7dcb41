use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Sender, bounded};
use tracing::info;

use fretty::audio::{SampleBank, start_audio};
use fretty::playback::{PlaybackObserver, Player};
use fretty::shared::DEFAULT_BPM;
use fretty::tab::Tablature;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // sample dir and optional BPM from the command line
    let sample_dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    let bpm: u32 = std::env::args()
        .nth(2)
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_BPM);

    let bank = Arc::new(SampleBank::load_dir(&sample_dir));
    let output = Arc::new(start_audio()?);

    let (ended_tx, ended_rx) = bounded::<()>(1);
    let observer = Arc::new(ConsoleObserver { ended: ended_tx });

    let player = Player::new(Arc::new(demo_riff()), bank, output, observer);
    player.set_tempo(bpm);

    info!(bpm, dir = %sample_dir.display(), "playing the demo riff");
    player.start();

    // the riff is finite; wait for the natural end, with slack for slow devices
    let _ = ended_rx.recv_timeout(Duration::from_secs(120));
    player.stop();
    Ok(())
}

/// Two bars of an E minor noodle.
fn demo_riff() -> Tablature {
    let mut tab = Tablature::new();
    let b0 = tab.add_bar();
    let b1 = tab.add_bar();
    for (bar, step, string, fret) in [
        (b0, 0, 0, "0"),
        (b0, 2, 4, "2"),
        (b0, 4, 5, "0"),
        (b0, 4, 0, "3"),
        (b0, 6, 4, "2"),
        (b1, 0, 1, "2"),
        (b1, 2, 2, "2"),
        (b1, 4, 3, "0"),
        (b1, 7, 0, "0"),
    ] {
        tab.set(bar, step, string, fret);
    }
    tab
}

struct ConsoleObserver {
    ended: Sender<()>,
}

impl PlaybackObserver for ConsoleObserver {
    fn on_step_highlight(&self, bar: usize, step: usize, strings: &[usize]) {
        println!("bar {bar} step {step}  strings {strings:?}");
    }

    fn on_highlight_clear(&self) {}

    fn on_playback_ended(&self) {
        println!("done");
        let _ = self.ended.try_send(());
    }
}
