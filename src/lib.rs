//! Guitar tablature playback engine.
//!
//! A tablature is six strings by eight steps per bar, each cell an optional
//! fret number. fretty walks that grid at a BPM-derived eighth-note interval
//! and plays every sounding string by streaming a recorded open-string
//! sample at a pitch-shifted playback rate: the bytes never change, the rate
//! does. The grid editor and any UI stay outside the crate; they implement
//! [`tab::FretGrid`] and [`playback::PlaybackObserver`] and drive
//! [`playback::Player`].

pub mod audio;
pub mod playback;
pub mod shared;
pub mod tab;

#[cfg(test)]
mod testutil;

pub use audio::{SampleBank, Voice, VoiceRegistry, start_audio};
pub use playback::{PlaybackObserver, Player};
pub use shared::PlaybackState;
pub use tab::{FretGrid, Tablature};
