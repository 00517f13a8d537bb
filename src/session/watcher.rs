//! Login wait with a hard timeout

use std::time::Duration;

use tokio::sync::watch;

use crate::model::ConnectionState;

/// Resolves a pending login to logged-in or failed
pub struct ConnectionWatcher {
    updates: watch::Receiver<ConnectionState>,
}

impl ConnectionWatcher {
    pub fn new(updates: watch::Receiver<ConnectionState>) -> Self {
        Self { updates }
    }

    /// Race connection-state notifications against a single timeout window.
    ///
    /// Returns true as soon as the state reads `LoggedIn`; false when the
    /// window closes first or no further notification can arrive. Intermediate
    /// states (including `Failed`) keep the wait going.
    pub async fn await_login(mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        if *self.updates.borrow_and_update() == ConnectionState::LoggedIn {
            return true;
        }

        loop {
            tokio::select! {
                changed = self.updates.changed() => {
                    if changed.is_err() {
                        tracing::warn!("Connection updates closed before login completed");
                        return false;
                    }
                    let state = *self.updates.borrow_and_update();
                    tracing::debug!(?state, "Connection state changed");
                    if state == ConnectionState::LoggedIn {
                        return true;
                    }
                }
                _ = &mut deadline => {
                    tracing::warn!(timeout_secs = timeout.as_secs_f64(), "Timed out waiting for login");
                    return false;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(9);

    #[tokio::test(start_paused = true)]
    async fn logged_in_before_timeout_wins() {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        let wait = tokio::spawn(ConnectionWatcher::new(rx).await_login(TIMEOUT));

        tokio::time::sleep(Duration::from_secs(2)).await;
        tx.send(ConnectionState::Failed).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        tx.send(ConnectionState::LoggedIn).unwrap();

        assert!(wait.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn silence_times_out() {
        let (_tx, rx) = watch::channel(ConnectionState::Disconnected);
        let started = tokio::time::Instant::now();

        assert!(!ConnectionWatcher::new(rx).await_login(TIMEOUT).await);
        assert!(started.elapsed() >= TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn logged_in_after_timeout_is_too_late() {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        let wait = tokio::spawn(ConnectionWatcher::new(rx).await_login(TIMEOUT));

        tokio::time::sleep(TIMEOUT + Duration::from_millis(1)).await;
        let _ = tx.send(ConnectionState::LoggedIn);

        assert!(!wait.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_alone_waits_out_the_window() {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        let wait = tokio::spawn(ConnectionWatcher::new(rx).await_login(TIMEOUT));

        tx.send(ConnectionState::Failed).unwrap();
        assert!(!wait.await.unwrap());
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn closed_updates_resolve_immediately() {
        let (tx, rx) = watch::channel(ConnectionState::Disconnected);
        drop(tx);
        let started = tokio::time::Instant::now();

        assert!(!ConnectionWatcher::new(rx).await_login(TIMEOUT).await);
        assert!(started.elapsed() < TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn already_logged_in_returns_true() {
        let (_tx, rx) = watch::channel(ConnectionState::LoggedIn);
        assert!(ConnectionWatcher::new(rx).await_login(TIMEOUT).await);
    }
}
