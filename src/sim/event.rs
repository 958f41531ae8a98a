//! Events flowing out of a frame.
//! Games emit `GameEvent`s from `update`; the session turns them (and its own
//! screen changes) into `RuntimeEvent`s for the presentation layer.

use crate::domain::screen::GameOverSummary;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// A short synthesized tone.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Tone {
    pub freq_hz: f32,
    pub duration_ms: u32,
    pub waveform: Waveform,
}

impl Tone {
    pub const fn new(freq_hz: f32, duration_ms: u32, waveform: Waveform) -> Self {
        Tone { freq_hz, duration_ms, waveform }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Cue(Tone),
    /// Terminal condition reached; the session moves to GameOver.
    Finished { final_score: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub enum RuntimeEvent {
    Started,
    Restarted,
    GameOver(GameOverSummary),
    Cue(Tone),
}
