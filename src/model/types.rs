//! Core type definitions shared by the session components

use std::fmt;
use std::time::Duration;

/// Health of the authenticated connection to the streaming backend
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    LoggedIn,
    Failed,
}

/// Opaque handle identifying a track on the service (a `spotify:track:` uri)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TrackHandle(String);

impl TrackHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TrackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the service will stream a track to this user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Availability {
    Available,
    Unavailable,
    /// Blocked for this market or account type
    Restricted,
}

/// Track metadata as reported by the service. Read-only for the core.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Track {
    pub handle: TrackHandle,
    pub name: String,
    pub artists: Vec<String>,
    pub duration: Duration,
    pub availability: Availability,
}

impl Track {
    /// First credited artist, empty when the service lists none
    pub fn artist(&self) -> &str {
        self.artists.first().map(String::as_str).unwrap_or_default()
    }

    pub fn is_available(&self) -> bool {
        self.availability == Availability::Available
    }
}

/// Renders `m:ss`, or `h:mm:ss` from one hour up
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Opaque handle identifying a playlist on the service
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlaylistHandle(String);

impl PlaylistHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaylistHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of an entry in the user's playlist container
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaylistKind {
    Playlist,
    StartFolder,
    EndFolder,
    Placeholder,
}

/// One not-yet-materialised entry of the playlist container
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub kind: PlaylistKind,
    pub handle: PlaylistHandle,
}

/// Ordered name → playlist mapping, built once after login
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaylistIndex {
    entries: Vec<(String, PlaylistHandle)>,
}

impl PlaylistIndex {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlaylistHandle)> {
        self.entries.iter().map(|(name, handle)| (name.as_str(), handle))
    }

    /// First playlist carrying `name`
    pub fn get(&self, name: &str) -> Option<&PlaylistHandle> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, handle)| handle)
    }
}

impl FromIterator<(String, PlaylistHandle)> for PlaylistIndex {
    fn from_iter<I: IntoIterator<Item = (String, PlaylistHandle)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
