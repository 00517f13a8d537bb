//! Forwards end-of-track notifications from the service into the coordinator loop

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::model::TrackHandle;

pub(crate) fn forward_end_of_track(
    mut updates: broadcast::Receiver<TrackHandle>,
    ended: mpsc::UnboundedSender<TrackHandle>,
) -> JoinHandle<()> {
    tracing::debug!("Starting end-of-track forwarder");

    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(track) => {
                    if ended.send(track).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed end-of-track notifications");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("End-of-track forwarder stopped");
    })
}
