//! Playback-related state owned by the coordinator

use std::fmt;

use super::types::{format_duration, ConnectionState, Track, TrackHandle};

/// What is loaded into the player, if anything.
///
/// Being paused always implies a track is loaded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing(Track),
    Paused(Track),
}

impl PlaybackStatus {
    pub fn current_track(&self) -> Option<&Track> {
        match self {
            PlaybackStatus::Idle => None,
            PlaybackStatus::Playing(track) | PlaybackStatus::Paused(track) => Some(track),
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, PlaybackStatus::Paused(_))
    }

    pub fn is_paused_or_playing(&self) -> bool {
        !matches!(self, PlaybackStatus::Idle)
    }
}

/// Session state, mutated only from inside the coordinator loop
#[derive(Clone, Debug, Default)]
pub struct SessionState {
    pub connection: ConnectionState,
    pub playback: PlaybackStatus,
}

/// Outcome of a playback request, rendered as the status line shown to the user
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusUpdate {
    Playing(Track),
    Paused(Track),
    NotAvailable(Track),
    LoadFailed(Track),
    Unresolved(TrackHandle),
    NoTrack,
}

fn write_track(f: &mut fmt::Formatter<'_>, status: &str, track: &Track) -> fmt::Result {
    write!(
        f,
        "{}: {} - {} [{}]",
        status,
        track.artist(),
        track.name,
        format_duration(track.duration)
    )
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusUpdate::Playing(track) => write_track(f, "Playing", track),
            StatusUpdate::Paused(track) => write_track(f, "Paused", track),
            StatusUpdate::NotAvailable(_) => f.write_str("Not available"),
            StatusUpdate::LoadFailed(track) => {
                write!(f, "Could not load: {} - {}", track.artist(), track.name)
            }
            StatusUpdate::Unresolved(handle) => write!(f, "Could not resolve track: {}", handle),
            StatusUpdate::NoTrack => f.write_str("No track selected"),
        }
    }
}
