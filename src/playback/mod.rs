// Playback control: the sequencer walks the grid one step at a time, the
// player owns the run thread and is the surface collaborators call.

mod player;
mod sequencer;

pub use player::Player;

/// Callbacks the engine raises for the UI collaborator. They run on the
/// playback thread: keep them quick, and never call back into the player
/// from inside one.
pub trait PlaybackObserver: Send + Sync {
    /// A step began; `strings` lists the strings sounding on it.
    fn on_step_highlight(&self, bar: usize, step: usize, strings: &[usize]);

    /// The previous step's highlight should come off.
    fn on_highlight_clear(&self);

    /// Playback ran off the end of the tablature on its own. Not raised for
    /// an explicit stop.
    fn on_playback_ended(&self);
}
