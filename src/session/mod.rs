//! Session module - the streaming service as seen by the coordinator
//!
//! - `watcher`: waits for the connection to report it is logged in
//! - `spotify`: librespot/rspotify implementation of the service traits

pub mod spotify;
pub mod watcher;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use crate::error::{PlaybackError, ServiceError};
use crate::model::{ConnectionState, PlaylistEntry, PlaylistHandle, Track, TrackHandle};

pub use spotify::SpotifyService;
pub use watcher::ConnectionWatcher;

/// The remote streaming backend
#[async_trait]
pub trait StreamingService: Send + Sync {
    /// Issue the login request. Completion is observed through
    /// [`connection_updates`](Self::connection_updates).
    async fn login(&self) -> Result<(), ServiceError>;

    fn connection_state(&self) -> ConnectionState;

    fn connection_updates(&self) -> watch::Receiver<ConnectionState>;

    /// Notified with the finished track every time playback reaches its end
    fn end_of_track_updates(&self) -> broadcast::Receiver<TrackHandle>;

    /// Entries of the user's playlist container, in container order
    async fn playlists(&self) -> Result<Vec<PlaylistEntry>, ServiceError>;

    /// Wait for a playlist to materialise and return its name
    async fn wait_for_playlist(&self, playlist: &PlaylistHandle) -> Result<String, ServiceError>;

    /// Wait for a track's metadata to become valid
    async fn track(&self, track: &TrackHandle) -> Result<Track, ServiceError>;

    async fn logout(&self);
}

/// The service's player, driving the audio pipeline
#[cfg_attr(test, mockall::automock)]
pub trait PlayerBackend: Send + Sync {
    /// Load `track` into the pipeline from its start
    fn load(&self, track: &Track) -> Result<(), PlaybackError>;

    /// Start the loaded track, or continue it after `pause`
    fn play(&self);

    fn pause(&self);

    fn stop(&self);
}
