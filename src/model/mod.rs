//! Model module - Session state and data types
//!
//! - `types`: service-facing types (tracks, playlists, connection state)
//! - `playback`: playback status, session state and status lines

mod playback;
mod types;

pub use types::{
    format_duration, Availability, ConnectionState, PlaylistEntry, PlaylistHandle,
    PlaylistIndex, PlaylistKind, Track, TrackHandle,
};

pub use playback::{PlaybackStatus, SessionState, StatusUpdate};
