//! Controller module - the coordinator loop serialising every session change
//!
//! - `playback`: play/pause against the active track
//! - `playlists`: playlist snapshot built after login
//! - `player_events`: end-of-track forwarding into the loop

mod playback;
mod player_events;
mod playlists;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::cache::SessionCache;
use crate::error::{InitError, PlaybackError};
use crate::model::{
    ConnectionState, PlaylistIndex, SessionState, StatusUpdate, TrackHandle,
};
use crate::session::{ConnectionWatcher, PlayerBackend, StreamingService};

pub use playback::PlaybackController;
pub use playlists::build_playlist_index;

/// Commands delivered by the front-end
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Play(TrackHandle),
    TogglePause,
    Shutdown,
}

/// Everything the coordinator reports back to the front-end
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UiEvent {
    /// Playlist snapshot, `None` when login failed
    Playlists(Option<PlaylistIndex>),
    Status(String),
    /// The current track finished; the front-end picks what comes next
    PlayNext,
    Shutdown,
}

pub type UiSender = mpsc::UnboundedSender<UiEvent>;

/// Owns the session state. Exactly one event is handled at a time and the
/// state is only touched from inside that handler.
pub struct Coordinator<S, P> {
    service: Arc<S>,
    playback: PlaybackController<P>,
    player: Arc<P>,
    cache: SessionCache,
    ui: UiSender,
    state: SessionState,
    login_timeout: Duration,
}

impl<S, P> Coordinator<S, P>
where
    S: StreamingService + 'static,
    P: PlayerBackend + 'static,
{
    pub fn new(
        service: Arc<S>,
        player: Arc<P>,
        cache: SessionCache,
        ui: UiSender,
        login_timeout: Duration,
    ) -> Self {
        Self {
            service,
            playback: PlaybackController::new(player.clone()),
            player,
            cache,
            ui,
            state: SessionState::default(),
            login_timeout,
        }
    }

    /// Initialise the session, then serve commands until shutdown.
    ///
    /// An initialisation failure is reported once, the front-end is told to
    /// shut down and the error is returned; nothing is retried.
    pub async fn start(mut self, commands: mpsc::Receiver<Command>) -> Result<(), InitError> {
        if let Err(e) = self.initialise().await {
            tracing::error!(error = %e, "Session initialisation failed");
            self.publish(UiEvent::Shutdown);
            return Err(e);
        }
        self.run(commands).await;
        Ok(())
    }

    /// Log in, wait for the connection and publish the playlist snapshot
    pub async fn initialise(&mut self) -> Result<(), InitError> {
        let watcher = ConnectionWatcher::new(self.service.connection_updates());
        self.service.login().await?;

        if !watcher.await_login(self.login_timeout).await {
            self.state.connection = ConnectionState::Failed;
            self.publish(UiEvent::Playlists(None));
            return Err(InitError::LoginTimeout(self.login_timeout));
        }
        self.state.connection = self.service.connection_state();
        tracing::info!("Logged in");

        let index = match build_playlist_index(self.service.as_ref()).await {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(error = %e, "Could not list playlists");
                PlaylistIndex::default()
            }
        };
        self.publish(UiEvent::Playlists(Some(index)));
        Ok(())
    }

    /// Serve commands and end-of-track notifications until shutdown.
    /// The command channel closing counts as a shutdown request.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let (ended_tx, mut ended_rx) = mpsc::unbounded_channel();
        let forwarder = player_events::forward_end_of_track(
            self.service.end_of_track_updates(),
            ended_tx,
        );

        tracing::info!("Coordinator loop started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Play(track)) => self.handle_play(track).await,
                    Some(Command::TogglePause) => self.handle_toggle_pause(),
                    Some(Command::Shutdown) | None => {
                        self.shutdown().await;
                        break;
                    }
                },
                Some(finished) = ended_rx.recv() => self.handle_track_ended(finished),
            }
        }

        forwarder.abort();
        tracing::info!("Coordinator loop stopped");
    }

    async fn handle_play(&mut self, handle: TrackHandle) {
        tracing::debug!(uri = %handle, "Play requested");
        if let Err(e) = ensure_selected(&handle) {
            tracing::debug!(error = %e, "Ignoring play request");
            self.publish_status(StatusUpdate::NoTrack);
            return;
        }

        let track = match self.service.track(&handle).await {
            Ok(track) => track,
            Err(e) => {
                tracing::warn!(error = %e, uri = %handle, "Could not resolve track");
                self.publish_status(StatusUpdate::Unresolved(handle));
                return;
            }
        };

        let update = self.playback.play(&mut self.state.playback, track);
        self.publish_status(update);
    }

    fn handle_toggle_pause(&mut self) {
        tracing::debug!(
            loaded = self.state.playback.is_paused_or_playing(),
            paused = self.state.playback.is_paused(),
            "Toggle pause requested"
        );
        if let Some(update) = self.playback.pause(&mut self.state.playback) {
            self.publish_status(update);
        }
    }

    fn handle_track_ended(&mut self, finished: TrackHandle) {
        tracing::debug!(uri = %finished, "Track ended, asking for the next one");
        self.publish(UiEvent::PlayNext);
    }

    async fn shutdown(&mut self) {
        tracing::info!(connection = ?self.state.connection, "Shutting down session");
        self.player.stop();
        if self.state.connection == ConnectionState::LoggedIn {
            self.service.logout().await;
        }
        if let Err(e) = self.cache.clear() {
            tracing::warn!(error = %e, path = %self.cache.location().display(), "Could not remove cache");
        }
        self.state = SessionState::default();
        self.publish(UiEvent::Shutdown);
    }

    fn publish_status(&self, update: StatusUpdate) {
        self.publish(UiEvent::Status(update.to_string()));
    }

    fn publish(&self, event: UiEvent) {
        if self.ui.send(event).is_err() {
            tracing::debug!("Front-end is gone, dropping event");
        }
    }
}

/// A play request must name a track
fn ensure_selected(handle: &TrackHandle) -> Result<(), PlaybackError> {
    if handle.is_empty() {
        Err(PlaybackError::EmptyTrack)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_handle_is_not_a_selection() {
        assert!(matches!(
            ensure_selected(&TrackHandle::new("")),
            Err(PlaybackError::EmptyTrack)
        ));
        assert!(ensure_selected(&TrackHandle::new("spotify:track:a")).is_ok());
    }
}
