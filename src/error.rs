//! Error types shared across the session core

use std::time::Duration;
use thiserror::Error;

/// Failures that abort session initialisation. All of them are fatal.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("application key (client id) is missing")]
    MissingApplicationKey,

    #[error("cannot find cache dir")]
    CacheDirUnavailable,

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("login request failed: {0}")]
    Login(#[from] ServiceError),

    #[error("could not login within {0:?}")]
    LoginTimeout(Duration),

    #[error("audio output unavailable: {0}")]
    Audio(#[from] DeviceError),
}

/// Failures of a single play request. Never fatal for the session.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no track selected")]
    EmptyTrack,

    #[error("could not load {track}: {reason}")]
    Load { track: String, reason: String },
}

/// Errors reported by the remote streaming service collaborator
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("invalid uri: {0}")]
    InvalidUri(String),

    #[error("service request failed: {0}")]
    Request(String),
}

/// Errors raised by the audio output device
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("failed to open output stream: {0}")]
    Open(String),

    #[error("output stream error: {0}")]
    Stream(String),

    #[error("output device stopped accepting audio")]
    Stalled,
}
