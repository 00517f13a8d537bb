//! Per-session cache directory
//!
//! The cache is never invalidated incrementally: it is wiped before a session
//! starts and removed again on a normal shutdown.

use std::io;
use std::path::{Path, PathBuf};

use crate::config::{APP_DIR, CACHE_SUBDIR};
use crate::error::InitError;

#[derive(Clone, Debug)]
pub struct SessionCache {
    location: PathBuf,
}

impl SessionCache {
    /// Resolve `<home>/.sconsify/cache/`
    pub fn under_home(home: Option<&Path>) -> Result<Self, InitError> {
        match home {
            Some(home) if !home.as_os_str().is_empty() => Ok(Self {
                location: home.join(APP_DIR).join(CACHE_SUBDIR),
            }),
            _ => Err(InitError::CacheDirUnavailable),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Only a directory ending in `.sconsify/cache` is ever removed.
    fn is_owned(&self) -> bool {
        self.location.ends_with(Path::new(APP_DIR).join(CACHE_SUBDIR))
    }

    /// Remove the whole cache directory. A missing directory is not an error.
    pub fn clear(&self) -> io::Result<()> {
        if !self.is_owned() {
            tracing::warn!(path = %self.location.display(), "Refusing to clear foreign directory");
            return Ok(());
        }

        match std::fs::remove_dir_all(&self.location) {
            Ok(()) => {
                tracing::debug!(path = %self.location.display(), "Session cache cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_home_is_an_init_error() {
        assert!(matches!(
            SessionCache::under_home(None),
            Err(InitError::CacheDirUnavailable)
        ));
        assert!(matches!(
            SessionCache::under_home(Some(Path::new(""))),
            Err(InitError::CacheDirUnavailable)
        ));
    }

    #[test]
    fn clear_removes_cache_but_not_siblings() {
        let home = tempfile::tempdir().unwrap();
        let cache = SessionCache::under_home(Some(home.path())).unwrap();
        std::fs::create_dir_all(cache.location().join("files")).unwrap();
        std::fs::write(cache.location().join("files/blob"), b"data").unwrap();
        let credentials = home.path().join(APP_DIR).join("credentials");
        std::fs::create_dir_all(&credentials).unwrap();

        cache.clear().unwrap();

        assert!(!cache.location().exists());
        assert!(credentials.exists());
    }

    #[test]
    fn clearing_a_missing_cache_is_fine() {
        let home = tempfile::tempdir().unwrap();
        let cache = SessionCache::under_home(Some(home.path())).unwrap();
        assert!(cache.clear().is_ok());
    }

    #[test]
    fn foreign_directory_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SessionCache { location: dir.path().to_path_buf() };
        cache.clear().unwrap();
        assert!(dir.path().exists());
    }
}
