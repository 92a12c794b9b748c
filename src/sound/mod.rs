//! Sound playback system for the Tomato Timer.
//!
//! This module provides audio feedback when a session completes:
//!
//! - Four synthesized tones (bell, knock, chime, digital)
//! - Non-blocking playback on a dedicated audio thread
//! - Graceful degradation when audio is unavailable
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  crossbeam   ┌──────────────────┐
//! │ RodioSoundPlayer │────────────▶│   audio thread   │
//! │  (Send + Sync)   │  PlayRequest │  OutputStream    │
//! └──────────────────┘              │  Sink ◀── Tone   │
//!                                   └──────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use tomato_timer::sound::{RodioSoundPlayer, SoundPlayer};
//! use tomato_timer::types::SoundKind;
//!
//! let player = RodioSoundPlayer::new().expect("audio init");
//! player.play(SoundKind::Chime, 0.5).expect("playback failed");
//! ```

mod error;
mod player;
mod tone;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::types::SoundKind;

pub use error::SoundError;
pub use player::{try_create_player, RodioSoundPlayer};
pub use tone::{Decay, Tone, ToneSpec, Waveform, SAMPLE_RATE};

/// Trait for sound playback implementations.
///
/// This trait abstracts the sound playback functionality, allowing for
/// different implementations (e.g., rodio-based, mock for testing).
pub trait SoundPlayer: Send + Sync {
    /// Plays the tone for `kind` at `volume` (clamped to [0, 1]).
    ///
    /// This method is non-blocking; the sound plays in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if playback fails.
    fn play(&self, kind: SoundKind, volume: f32) -> Result<(), SoundError>;

    /// Returns true if the audio system is available.
    fn is_available(&self) -> bool;
}

/// Mock sound player for testing.
#[derive(Debug)]
pub struct MockSoundPlayer {
    play_calls: Mutex<Vec<(SoundKind, f32)>>,
    available: AtomicBool,
    should_fail: AtomicBool,
}

impl Default for MockSoundPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSoundPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            play_calls: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        self.should_fail.store(should_fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn play_count(&self) -> usize {
        self.play_calls.lock().unwrap().len()
    }

    #[must_use]
    pub fn get_play_calls(&self) -> Vec<(SoundKind, f32)> {
        self.play_calls.lock().unwrap().clone()
    }
}

impl SoundPlayer for MockSoundPlayer {
    fn play(&self, kind: SoundKind, volume: f32) -> Result<(), SoundError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(SoundError::PlaybackError("Mock failure".to_string()));
        }
        self.play_calls.lock().unwrap().push((kind, volume));
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_calls() {
        let mock = MockSoundPlayer::new();
        mock.play(SoundKind::Bell, 0.5).unwrap();
        mock.play(SoundKind::Digital, 1.0).unwrap();

        assert_eq!(mock.play_count(), 2);
        assert_eq!(
            mock.get_play_calls(),
            vec![(SoundKind::Bell, 0.5), (SoundKind::Digital, 1.0)]
        );
    }

    #[test]
    fn test_mock_failure() {
        let mock = MockSoundPlayer::new();
        mock.set_should_fail(true);

        assert!(mock.play(SoundKind::Knock, 0.5).is_err());
        assert_eq!(mock.play_count(), 0);
    }

    #[test]
    fn test_mock_availability() {
        let mock = MockSoundPlayer::new();
        assert!(mock.is_available());
        mock.set_available(false);
        assert!(!mock.is_available());
    }
}
