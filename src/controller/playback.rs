//! Play/pause against the active track

use std::sync::Arc;

use crate::model::{PlaybackStatus, StatusUpdate, Track};
use crate::session::PlayerBackend;

pub struct PlaybackController<P> {
    player: Arc<P>,
}

impl<P: PlayerBackend> PlaybackController<P> {
    pub fn new(player: Arc<P>) -> Self {
        Self { player }
    }

    /// Load and start `track`.
    ///
    /// An unavailable track never reaches the player and leaves `status`
    /// untouched, as does a failed load.
    pub fn play(&self, status: &mut PlaybackStatus, track: Track) -> StatusUpdate {
        if !track.is_available() {
            tracing::info!(
                track = %track.name,
                availability = ?track.availability,
                "Track not available, skipping"
            );
            return StatusUpdate::NotAvailable(track);
        }

        if let Err(e) = self.player.load(&track) {
            tracing::warn!(error = %e, track = %track.name, "Track load failed");
            return StatusUpdate::LoadFailed(track);
        }
        self.player.play();

        tracing::info!(track = %track.name, artist = %track.artist(), "Playing");
        *status = PlaybackStatus::Playing(track.clone());
        StatusUpdate::Playing(track)
    }

    /// Toggle between paused and playing. Does nothing while idle.
    ///
    /// Resuming continues the loaded track where it was paused; only `play`
    /// loads.
    ///
    /// Decided from `status` alone; the player is never asked for its state.
    pub fn pause(&self, status: &mut PlaybackStatus) -> Option<StatusUpdate> {
        match &*status {
            PlaybackStatus::Idle => {
                tracing::debug!("Pause requested with nothing loaded");
                None
            }
            PlaybackStatus::Paused(track) => {
                let track = track.clone();
                self.player.play();
                tracing::info!(track = %track.name, "Resumed");
                *status = PlaybackStatus::Playing(track.clone());
                Some(StatusUpdate::Playing(track))
            }
            PlaybackStatus::Playing(track) => {
                let track = track.clone();
                self.player.pause();
                tracing::info!(track = %track.name, "Paused");
                *status = PlaybackStatus::Paused(track.clone());
                Some(StatusUpdate::Paused(track))
            }
        }
    }
}
