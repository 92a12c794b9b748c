//! Sound player implementation using rodio.
//!
//! The rodio output stream must stay on the thread that opened it, so
//! `RodioSoundPlayer` owns a dedicated audio thread and hands it play
//! requests over a crossbeam channel. The handle itself is `Send + Sync`
//! and can be shared with `Arc`.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded, Sender};
use rodio::{OutputStream, Sink};
use tracing::{debug, warn};

use crate::types::SoundKind;

use super::error::SoundError;
use super::tone::Tone;
use super::SoundPlayer;

/// A request handled by the audio thread.
#[derive(Debug, Clone, Copy)]
struct PlayRequest {
    kind: SoundKind,
    volume: f32,
}

/// A sound player that plays synthesized tones through rodio.
///
/// Playback is non-blocking; tones continue in the background after `play`
/// returns.
pub struct RodioSoundPlayer {
    requests: Sender<PlayRequest>,
}

impl RodioSoundPlayer {
    /// Opens the default output device on a new audio thread.
    ///
    /// # Errors
    ///
    /// Returns `SoundError::DeviceNotAvailable` if no audio output device
    /// is available, or `SoundError::PlaybackError` if the thread could not
    /// be started.
    pub fn new() -> Result<Self, SoundError> {
        let (requests, incoming) = unbounded::<PlayRequest>();
        let (ready_tx, ready_rx) = bounded::<Result<(), SoundError>>(1);

        thread::Builder::new()
            .name("tomato-audio".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(SoundError::DeviceNotAvailable(e.to_string())));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                debug!("Audio output stream initialized");

                // Ends when every sender has been dropped
                for request in incoming {
                    let sink = match Sink::try_new(&handle) {
                        Ok(sink) => sink,
                        Err(e) => {
                            warn!("Failed to create audio sink: {}", e);
                            continue;
                        }
                    };
                    sink.append(Tone::new(request.kind, request.volume));
                    sink.detach();
                    debug!(kind = request.kind.as_str(), "Sound playback started (detached)");
                }
                debug!("Audio thread exiting");
            })
            .map_err(|e| SoundError::PlaybackError(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| SoundError::StreamError("audio thread exited during startup".into()))??;

        Ok(Self { requests })
    }
}

impl SoundPlayer for RodioSoundPlayer {
    fn play(&self, kind: SoundKind, volume: f32) -> Result<(), SoundError> {
        self.requests
            .send(PlayRequest { kind, volume })
            .map_err(|_| SoundError::PlaybackError("audio thread has stopped".to_string()))
    }

    fn is_available(&self) -> bool {
        true
    }
}

impl std::fmt::Debug for RodioSoundPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioSoundPlayer")
            .field("pending", &self.requests.len())
            .finish_non_exhaustive()
    }
}

/// Creates a sound player, returning None if audio is unavailable.
///
/// If audio initialization fails, a warning is logged and None is returned.
#[must_use]
pub fn try_create_player() -> Option<Arc<dyn SoundPlayer>> {
    match RodioSoundPlayer::new() {
        Ok(player) => Some(Arc::new(player)),
        Err(e) => {
            warn!("Audio not available, sound disabled: {} ({})", e, e.suggestion());
            None
        }
    }
}
