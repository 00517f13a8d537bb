//! Runtime configuration
//!
//! Everything here can be set on the command line or through the matching
//! `SCONSIFY_*` environment variable. The output format is not configurable:
//! the device contract is fixed at 2 channels, 44.1 kHz, 16-bit, 2048 frames
//! per block.

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::TypedValueParser;
use clap::{Parser, ValueEnum};
use librespot::playback::config::Bitrate;

use crate::audio::OutputConfig;

/// Default OAuth client id used when none is configured
pub const DEFAULT_CLIENT_ID: &str = "492e1e45ea814fa3ac555fe1576aaf5b";

pub const DEFAULT_LOGIN_TIMEOUT_SECS: u64 = 9;
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;
pub const DEFAULT_DEVICE_NAME: &str = "Sconsify";

/// Directory (relative to home) holding everything the application writes
pub const APP_DIR: &str = ".sconsify";
pub const CACHE_SUBDIR: &str = "cache";
pub const CREDENTIALS_SUBDIR: &str = "credentials";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StreamBitrate {
    #[value(name = "96")]
    Low,
    #[value(name = "160")]
    Normal,
    #[value(name = "320")]
    High,
}

impl From<StreamBitrate> for Bitrate {
    fn from(value: StreamBitrate) -> Self {
        match value {
            StreamBitrate::Low => Bitrate::Bitrate96,
            StreamBitrate::Normal => Bitrate::Bitrate160,
            StreamBitrate::High => Bitrate::Bitrate320,
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(name = "sconsify", version, about = "Console Spotify player")]
pub struct Config {
    /// OAuth client id used as the application key
    #[arg(long, env = "SCONSIFY_CLIENT_ID", default_value = DEFAULT_CLIENT_ID)]
    pub client_id: String,

    /// Home directory the cache and credential directories live under
    #[arg(long, env = "SCONSIFY_HOME")]
    pub home: Option<PathBuf>,

    /// Seconds to wait for the session to report it is logged in
    #[arg(long, env = "SCONSIFY_LOGIN_TIMEOUT", default_value_t = DEFAULT_LOGIN_TIMEOUT_SECS)]
    pub login_timeout: u64,

    /// Number of audio frames staged between decoder and output device
    #[arg(
        long,
        env = "SCONSIFY_QUEUE_CAPACITY",
        default_value_t = DEFAULT_QUEUE_CAPACITY,
        value_parser = clap::value_parser!(u16).range(1..).map(usize::from)
    )]
    pub queue_capacity: usize,

    #[arg(long, env = "SCONSIFY_BITRATE", value_enum, default_value = "320")]
    pub bitrate: StreamBitrate,

    #[arg(long, env = "SCONSIFY_LOG_DIR", default_value = ".logs")]
    pub log_dir: PathBuf,

    /// Name announced for this playback device
    #[arg(long, env = "SCONSIFY_DEVICE_NAME", default_value = DEFAULT_DEVICE_NAME)]
    pub device_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            home: None,
            login_timeout: DEFAULT_LOGIN_TIMEOUT_SECS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            bitrate: StreamBitrate::High,
            log_dir: PathBuf::from(".logs"),
            device_name: DEFAULT_DEVICE_NAME.to_string(),
        }
    }
}

impl Config {
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout)
    }

    pub fn output(&self) -> OutputConfig {
        OutputConfig::default()
    }

    /// The configured home, falling back to the user's home directory
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone().or_else(dirs::home_dir)
    }

    pub fn credentials_dir(&self) -> Option<PathBuf> {
        self.home_dir()
            .map(|home| home.join(APP_DIR).join(CREDENTIALS_SUBDIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behaviour() {
        let config = Config::parse_from(["sconsify"]);
        assert_eq!(config.login_timeout(), Duration::from_secs(9));
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.bitrate, StreamBitrate::High);
        assert_eq!(config.client_id, DEFAULT_CLIENT_ID);
    }

    #[test]
    fn command_line_overrides() {
        let config = Config::parse_from([
            "sconsify",
            "--login-timeout",
            "3",
            "--queue-capacity",
            "2",
            "--bitrate",
            "96",
            "--home",
            "/tmp/someone",
        ]);
        assert_eq!(config.login_timeout(), Duration::from_secs(3));
        assert_eq!(config.queue_capacity, 2);
        assert_eq!(config.bitrate, StreamBitrate::Low);
        assert_eq!(
            config.credentials_dir(),
            Some(PathBuf::from("/tmp/someone/.sconsify/credentials"))
        );
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let result = Config::try_parse_from(["sconsify", "--queue-capacity", "0"]);
        assert!(result.is_err());
    }
}
