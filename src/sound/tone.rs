//! Synthesized completion tones.
//!
//! Each [`SoundKind`] maps to a short waveform with a 10 ms attack and a
//! decay tail. [`Tone`] renders it sample by sample as a mono `f32`
//! [`rodio::Source`], so nothing is loaded from disk.

use std::f32::consts::PI;
use std::time::Duration;

use rodio::Source;

use crate::types::SoundKind;

/// Output sample rate of synthesized tones.
pub const SAMPLE_RATE: u32 = 44_100;

const ATTACK_SECS: f32 = 0.01;

/// Decay floor of the exponential envelope.
const DECAY_FLOOR: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
}

impl Waveform {
    /// One sample of the waveform at `phase` cycles (wrapped to [0, 1)).
    fn sample(self, phase: f32) -> f32 {
        let phase = phase.fract();
        match self {
            Waveform::Sine => (2.0 * PI * phase).sin(),
            Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decay {
    /// Exponential ramp down to [`DECAY_FLOOR`]
    Exponential,
    /// Straight ramp down to silence
    Linear,
}

/// Static description of a tone.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneSpec {
    pub waveform: Waveform,
    /// `(frequency Hz, relative amplitude)` pairs summed together
    pub partials: &'static [(f32, f32)],
    pub duration: Duration,
    /// Peak gain before the user volume is applied
    pub gain: f32,
    pub decay: Decay,
    /// Optional one-pole low-pass cutoff
    pub lowpass_hz: Option<f32>,
}

impl ToneSpec {
    pub fn for_kind(kind: SoundKind) -> Self {
        match kind {
            SoundKind::Bell => Self {
                waveform: Waveform::Sine,
                partials: &[(880.0, 1.0)],
                duration: Duration::from_millis(500),
                gain: 0.5,
                decay: Decay::Exponential,
                lowpass_hz: None,
            },
            SoundKind::Chime => Self {
                waveform: Waveform::Sine,
                partials: &[(660.0, 0.6), (990.0, 0.4)],
                duration: Duration::from_millis(800),
                gain: 0.5,
                decay: Decay::Exponential,
                lowpass_hz: None,
            },
            SoundKind::Knock => Self {
                waveform: Waveform::Triangle,
                partials: &[(150.0, 1.0)],
                duration: Duration::from_millis(100),
                gain: 0.8,
                decay: Decay::Exponential,
                lowpass_hz: None,
            },
            SoundKind::Digital => Self {
                waveform: Waveform::Square,
                partials: &[(440.0, 1.0)],
                duration: Duration::from_millis(200),
                gain: 0.3,
                decay: Decay::Linear,
                lowpass_hz: Some(600.0),
            },
        }
    }

    fn envelope(&self, t: f32) -> f32 {
        let total = self.duration.as_secs_f32();
        if t < ATTACK_SECS {
            return t / ATTACK_SECS;
        }
        let tail = (total - ATTACK_SECS).max(f32::EPSILON);
        let progress = ((t - ATTACK_SECS) / tail).clamp(0.0, 1.0);
        match self.decay {
            Decay::Exponential => DECAY_FLOOR.powf(progress),
            Decay::Linear => 1.0 - progress,
        }
    }
}

/// A playable rendering of a [`ToneSpec`] at a given volume.
#[derive(Debug, Clone)]
pub struct Tone {
    spec: ToneSpec,
    volume: f32,
    position: u64,
    total_samples: u64,
    /// Low-pass state and coefficient
    filtered: f32,
    alpha: Option<f32>,
}

impl Tone {
    /// Creates a tone for `kind`; `volume` is clamped to [0, 1].
    pub fn new(kind: SoundKind, volume: f32) -> Self {
        Self::from_spec(ToneSpec::for_kind(kind), volume)
    }

    pub fn from_spec(spec: ToneSpec, volume: f32) -> Self {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        let total_samples = (spec.duration.as_secs_f64() * f64::from(SAMPLE_RATE)).round() as u64;
        let alpha = spec.lowpass_hz.map(|cutoff| {
            let dt = 1.0 / SAMPLE_RATE as f32;
            let rc = 1.0 / (2.0 * PI * cutoff);
            dt / (rc + dt)
        });

        Self {
            spec,
            volume,
            position: 0,
            total_samples,
            filtered: 0.0,
            alpha,
        }
    }

    pub fn total_samples(&self) -> u64 {
        self.total_samples
    }
}

impl Iterator for Tone {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.position >= self.total_samples {
            return None;
        }

        let t = self.position as f32 / SAMPLE_RATE as f32;
        let raw: f32 = self
            .spec
            .partials
            .iter()
            .map(|&(freq, amp)| amp * self.spec.waveform.sample(freq * t))
            .sum();
        let shaped = match self.alpha {
            Some(alpha) => {
                self.filtered += alpha * (raw - self.filtered);
                self.filtered
            }
            None => raw,
        };

        self.position += 1;
        Some(shaped * self.spec.envelope(t) * self.spec.gain * self.volume)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.total_samples.saturating_sub(self.position) as usize;
        (left, Some(left))
    }
}

impl Source for Tone {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.total_samples.saturating_sub(self.position) as usize)
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(self.spec.duration)
    }
}
