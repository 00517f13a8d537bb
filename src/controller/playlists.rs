//! Playlist snapshot built once after login

use crate::error::ServiceError;
use crate::model::{PlaylistIndex, PlaylistKind};
use crate::session::StreamingService;

/// Walk the playlist container in order, wait for every regular playlist to
/// materialise and index it by name. Folder markers and placeholders are
/// skipped; a playlist that fails to materialise is left out.
pub async fn build_playlist_index<S>(service: &S) -> Result<PlaylistIndex, ServiceError>
where
    S: StreamingService + ?Sized,
{
    let entries = service.playlists().await?;
    let total = entries.len();
    let mut indexed = Vec::with_capacity(total);

    for entry in entries {
        if entry.kind != PlaylistKind::Playlist {
            tracing::trace!(kind = ?entry.kind, "Skipping container entry");
            continue;
        }

        match service.wait_for_playlist(&entry.handle).await {
            Ok(name) => indexed.push((name, entry.handle)),
            Err(e) => {
                tracing::warn!(error = %e, playlist = %entry.handle, "Playlist did not load");
            }
        }
    }

    tracing::info!(total, indexed = indexed.len(), "Playlist snapshot built");
    Ok(indexed.into_iter().collect())
}
