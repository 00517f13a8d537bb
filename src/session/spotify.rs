//! Streaming service backed by librespot (session, playback) and the Web API
//! through rspotify (metadata, playlist container)

use std::sync::Arc;

use async_trait::async_trait;
use futures::TryStreamExt;
use librespot::core::authentication::Credentials;
use librespot::core::cache::Cache;
use librespot::core::config::SessionConfig;
use librespot::core::session::Session;
use librespot::core::spotify_uri::SpotifyUri;
use librespot::playback::audio_backend::Sink;
use librespot::playback::config::PlayerConfig;
use librespot::playback::mixer::NoOpVolume;
use librespot::playback::player::{Player, PlayerEvent};
use rspotify::model::{FullTrack, Market, PlaylistId, TrackId};
use rspotify::prelude::*;
use rspotify::{AuthCodeSpotify, Config as WebConfig, Token};
use tokio::sync::{broadcast, watch};

use super::{PlayerBackend, StreamingService};
use crate::audio::BridgeSink;
use crate::auth::AuthResult;
use crate::cache::SessionCache;
use crate::config::Config;
use crate::error::{InitError, PlaybackError, ServiceError};
use crate::log_service_result;
use crate::model::{
    Availability, ConnectionState, PlaylistEntry, PlaylistHandle, PlaylistKind, Track, TrackHandle,
};

const END_OF_TRACK_BACKLOG: usize = 16;

pub struct SpotifyService {
    session: Session,
    player: Arc<Player>,
    web: AuthCodeSpotify,
    credentials: Credentials,
    connection: Arc<watch::Sender<ConnectionState>>,
    end_of_track: broadcast::Sender<TrackHandle>,
}

impl SpotifyService {
    pub async fn new(
        config: &Config,
        cache: &SessionCache,
        auth: AuthResult,
        sink: BridgeSink,
    ) -> Result<Self, InitError> {
        let session_config = SessionConfig {
            device_id: device_id(&config.device_name),
            ..Default::default()
        };

        let location = cache.location().to_path_buf();
        let librespot_cache = Cache::new(
            Some(location.clone()),
            Some(location.clone()),
            Some(location.join("files")),
            None,
        )
        .map_err(|_| InitError::CacheDirUnavailable)?;

        let session = Session::new(session_config, Some(librespot_cache));

        let player_config = PlayerConfig {
            bitrate: config.bitrate.into(),
            ..Default::default()
        };
        let player = Player::new(
            player_config,
            session.clone(),
            Box::new(NoOpVolume),
            move || Box::new(sink) as Box<dyn Sink>,
        );

        let web = setup_web_client(auth.web_token).await?;

        let (connection, _) = watch::channel(ConnectionState::Disconnected);
        let (end_of_track, _) = broadcast::channel(END_OF_TRACK_BACKLOG);

        let service = Self {
            session,
            player,
            web,
            credentials: auth.credentials,
            connection: Arc::new(connection),
            end_of_track,
        };
        service.start_player_event_listener();
        Ok(service)
    }

    /// Forward librespot player events the core cares about
    fn start_player_event_listener(&self) {
        let mut events = self.player.get_player_event_channel();
        let end_of_track = self.end_of_track.clone();
        tracing::info!("Starting librespot player event listener");

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    PlayerEvent::EndOfTrack { track_id, .. } => {
                        let uri = track_id.to_uri().unwrap_or_default();
                        tracing::debug!(uri = %uri, "PlayerEvent::EndOfTrack");
                        // Nobody listening yet is fine.
                        let _ = end_of_track.send(TrackHandle::new(uri));
                    }
                    PlayerEvent::Unavailable { track_id, .. } => {
                        let uri = track_id.to_uri().unwrap_or_default();
                        tracing::warn!(uri = %uri, "PlayerEvent::Unavailable");
                    }
                    _ => {
                        tracing::trace!("PlayerEvent: other event received");
                    }
                }
            }
            tracing::debug!("Player event listener shutting down");
        });
    }
}

fn device_id(device_name: &str) -> String {
    // Consistent per machine
    let hostname = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{}-{}", device_name, hostname)
}

async fn setup_web_client(access_token: Token) -> Result<AuthCodeSpotify, InitError> {
    let spotify = AuthCodeSpotify::with_config(
        Default::default(),
        Default::default(),
        WebConfig {
            token_cached: false,
            token_refreshing: false,
            ..Default::default()
        },
    );

    match spotify.token.lock().await {
        Ok(mut token) => *token = Some(access_token),
        Err(_) => return Err(InitError::Auth("web token store unavailable".to_string())),
    }
    tracing::debug!("rspotify client initialized");
    Ok(spotify)
}

fn request_error(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Request(e.to_string())
}

fn availability(track: &FullTrack) -> Availability {
    if track.restrictions.is_some() {
        Availability::Restricted
    } else if track.is_playable == Some(false) {
        Availability::Unavailable
    } else {
        Availability::Available
    }
}

#[async_trait]
impl StreamingService for SpotifyService {
    async fn login(&self) -> Result<(), ServiceError> {
        let session = self.session.clone();
        let credentials = self.credentials.clone();
        let connection = self.connection.clone();

        tracing::info!("Logging in");
        tokio::spawn(async move {
            match session.connect(credentials, false).await {
                Ok(()) => {
                    tracing::info!(username = %session.username(), "Session connected");
                    connection.send_replace(ConnectionState::LoggedIn);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Session connect failed");
                    connection.send_replace(ConnectionState::Failed);
                }
            }
        });
        Ok(())
    }

    fn connection_state(&self) -> ConnectionState {
        *self.connection.borrow()
    }

    fn connection_updates(&self) -> watch::Receiver<ConnectionState> {
        self.connection.subscribe()
    }

    fn end_of_track_updates(&self) -> broadcast::Receiver<TrackHandle> {
        self.end_of_track.subscribe()
    }

    async fn playlists(&self) -> Result<Vec<PlaylistEntry>, ServiceError> {
        let result = self.web.current_user_playlists().try_collect::<Vec<_>>().await;
        log_service_result!("current_user_playlists", result);

        // The Web API flattens folders away, every entry is a playlist.
        Ok(result
            .map_err(request_error)?
            .into_iter()
            .map(|playlist| PlaylistEntry {
                kind: PlaylistKind::Playlist,
                handle: PlaylistHandle::new(playlist.id.id()),
            })
            .collect())
    }

    async fn wait_for_playlist(&self, playlist: &PlaylistHandle) -> Result<String, ServiceError> {
        let id = PlaylistId::from_id(playlist.as_str())
            .map_err(|e| ServiceError::InvalidUri(e.to_string()))?;
        let result = self.web.playlist(id, None, None).await;
        log_service_result!("playlist", result);
        Ok(result.map_err(request_error)?.name)
    }

    async fn track(&self, track: &TrackHandle) -> Result<Track, ServiceError> {
        let id = TrackId::from_uri(track.as_str())
            .map_err(|e| ServiceError::InvalidUri(e.to_string()))?;
        let result = self.web.track(id, Some(Market::FromToken)).await;
        log_service_result!("track", result);
        let full = result.map_err(request_error)?;

        Ok(Track {
            handle: track.clone(),
            availability: availability(&full),
            duration: full.duration.to_std().unwrap_or_default(),
            artists: full.artists.into_iter().map(|artist| artist.name).collect(),
            name: full.name,
        })
    }

    async fn logout(&self) {
        tracing::info!("Logging out");
        self.stop();
        self.session.shutdown();
        self.connection.send_replace(ConnectionState::Disconnected);
    }
}

impl PlayerBackend for SpotifyService {
    fn load(&self, track: &Track) -> Result<(), PlaybackError> {
        let load_error = |reason: String| PlaybackError::Load {
            track: track.handle.to_string(),
            reason,
        };

        let uri = SpotifyUri::from_uri(track.handle.as_str()).map_err(|e| load_error(e.to_string()))?;
        if self.session.is_invalid() {
            return Err(load_error("session is not connected".to_string()));
        }

        tracing::debug!(uri = %track.handle, "Loading track");
        self.player.load(uri, false, 0);
        Ok(())
    }

    fn play(&self) {
        self.player.play();
    }

    fn pause(&self) {
        self.player.pause();
    }

    fn stop(&self) {
        self.player.stop();
    }
}
