//! Tracing setup
//!
//! Everything goes to `<log_dir>/sconsify.YYYY-MM-DD.log`; stdout is left to
//! the console front-end. `RUST_LOG` overrides [`DEFAULT_FILTER`].

use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "sconsify";
const LOG_FILE_SUFFIX: &str = "log";
pub const DEFAULT_FILTER: &str = "sconsify=debug,librespot=info,rspotify=info,warn";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(log_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(log_dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(log_dir)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    // Flushes on drop; the subscriber lives as long as the process.
    std::mem::forget(guard);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_thread_names(true),
        )
        .try_init()?;

    tracing::info!(log_dir = %log_dir.display(), "Logging initialized");
    Ok(())
}

/// Log the outcome of a streaming service request
#[macro_export]
macro_rules! log_service_result {
    ($operation:expr, $result:expr) => {
        match &$result {
            Ok(_) => tracing::info!(operation = $operation, "Service request successful"),
            Err(e) => tracing::error!(operation = $operation, error = %e, "Service request failed"),
        }
    };
}
