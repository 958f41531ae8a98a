//! Tone emitter: procedural cues synthesized in memory and played via rodio.
//!
//! Playback is fire-and-forget. Every failure (no output device, decoder
//! error, sound disabled in config) is swallowed so a silent machine still
//! runs the game. Build without the "sound" feature to drop rodio entirely.

use std::f32::consts::PI;

use crate::sim::event::{Tone, Waveform};

const SAMPLE_RATE: u32 = 22050;

/// Length of the linear fade applied at both ends of a tone, in samples.
const FADE_SAMPLES: usize = 220;

// ════════════════════════════════════════════════════════════
//  Synthesis: pure, shared by the real engine and the tests
// ════════════════════════════════════════════════════════════

/// One period of `waveform` evaluated at `phase` in [0, 1).
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
fn oscillator(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (phase * 2.0 * PI).sin(),
        Waveform::Square => {
            if phase < 0.5 { 1.0 } else { -1.0 }
        }
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        Waveform::Sawtooth => 2.0 * phase - 1.0,
    }
}

/// Mono samples for a tone of `duration_ms` at `freq_hz`, scaled by `volume`.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
pub fn synthesize(freq_hz: f32, duration_ms: u32, waveform: Waveform, volume: f32) -> Vec<f32> {
    let n = (SAMPLE_RATE as u64 * duration_ms as u64 / 1000) as usize;
    if n == 0 || !(freq_hz > 0.0) {
        return Vec::new();
    }
    let volume = volume.clamp(0.0, 1.0);
    let fade = FADE_SAMPLES.min(n / 2).max(1);
    (0..n)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            let phase = (t * freq_hz).fract();
            let head = (i as f32 / fade as f32).min(1.0);
            let tail = ((n - i) as f32 / fade as f32).min(1.0);
            oscillator(waveform, phase) * head.min(tail) * volume
        })
        .collect()
}

/// Wraps mono f32 samples into a 16-bit PCM WAV buffer.
#[cfg_attr(not(feature = "sound"), allow(dead_code))]
pub fn make_wav(samples: &[f32]) -> Vec<u8> {
    let num_channels: u16 = 1;
    let bits_per_sample: u16 = 16;
    let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
    let block_align = num_channels * bits_per_sample / 8;
    let data_size = samples.len() as u32 * 2;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&num_channels.to_le_bytes());
    buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &s in samples {
        let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
        buf.extend_from_slice(&val.to_le_bytes());
    }
    buf
}

#[cfg(feature = "sound")]
mod inner {
    use std::io::Cursor;

    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use super::{make_wav, synthesize};
    use crate::config::SoundConfig;
    use crate::sim::event::Waveform;

    pub struct ToneEmitter {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        volume: f32,
    }

    impl ToneEmitter {
        pub fn new(cfg: &SoundConfig) -> Option<Self> {
            if !cfg.enabled {
                tracing::info!("sound disabled in config");
                return None;
            }
            match OutputStream::try_default() {
                Ok((stream, handle)) => Some(ToneEmitter {
                    _stream: stream,
                    handle,
                    volume: cfg.volume,
                }),
                Err(e) => {
                    tracing::info!(error = %e, "no audio output; continuing silently");
                    None
                }
            }
        }

        pub fn play(&self, freq_hz: f32, duration_ms: u32, waveform: Waveform) {
            let samples = synthesize(freq_hz, duration_ms, waveform, self.volume);
            if samples.is_empty() {
                return;
            }
            if let Ok(sink) = Sink::try_new(&self.handle) {
                if let Ok(src) = rodio::Decoder::new(Cursor::new(make_wav(&samples))) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: compiles to no-ops when sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::ToneEmitter;

#[cfg(not(feature = "sound"))]
pub struct ToneEmitter;

#[cfg(not(feature = "sound"))]
impl ToneEmitter {
    pub fn new(_cfg: &crate::config::SoundConfig) -> Option<Self> { Some(ToneEmitter) }
    pub fn play(&self, _freq_hz: f32, _duration_ms: u32, _waveform: Waveform) {}
}

impl ToneEmitter {
    pub fn play_tone(&self, tone: Tone) {
        self.play(tone.freq_hz, tone.duration_ms, tone.waveform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_tracks_duration() {
        assert_eq!(synthesize(440.0, 100, Waveform::Sine, 1.0).len(), 2205);
        assert!(synthesize(440.0, 0, Waveform::Sine, 1.0).is_empty());
        assert!(synthesize(0.0, 100, Waveform::Sine, 1.0).is_empty());
    }

    #[test]
    fn samples_stay_within_volume() {
        for w in [Waveform::Sine, Waveform::Square, Waveform::Triangle, Waveform::Sawtooth] {
            let s = synthesize(330.0, 50, w, 0.4);
            assert!(s.iter().all(|v| v.abs() <= 0.4 + 1e-6), "{w:?}");
        }
    }

    #[test]
    fn envelope_starts_and_ends_silent() {
        let s = synthesize(880.0, 60, Waveform::Square, 1.0);
        assert_eq!(s[0], 0.0);
        assert!(s[s.len() - 1].abs() < 0.01);
        assert!(s[s.len() / 2].abs() > 0.9);
    }

    #[test]
    fn waveform_shapes() {
        assert!((oscillator(Waveform::Triangle, 0.5) - 1.0).abs() < 1e-6);
        assert!((oscillator(Waveform::Triangle, 0.0) + 1.0).abs() < 1e-6);
        assert!((oscillator(Waveform::Sawtooth, 0.75) - 0.5).abs() < 1e-6);
        assert_eq!(oscillator(Waveform::Square, 0.25), 1.0);
    }

    #[test]
    fn wav_header_describes_payload() {
        let wav = make_wav(&[0.0, 1.0, -1.0]);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(wav.len(), 44 + 6);
        assert_eq!(u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]), 6);
        assert_eq!(i16::from_le_bytes([wav[46], wav[47]]), 32767);
    }
}
