mod console;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;

use sconsify::audio::{audio_queue, AudioOutput, AudioStats, BridgeSink, CpalDevice};
use sconsify::auth;
use sconsify::cache::SessionCache;
use sconsify::config::Config;
use sconsify::controller::{Command, Coordinator, UiSender};
use sconsify::error::InitError;
use sconsify::logging;
use sconsify::session::SpotifyService;

const COMMAND_BACKLOG: usize = 16;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    if let Err(e) = logging::init_logging(&config.log_dir) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    tracing::info!("=== Sconsify Starting ===");

    let (ui_tx, ui_rx) = mpsc::unbounded_channel();
    let (command_tx, command_rx) = mpsc::channel(COMMAND_BACKLOG);
    let front_end = tokio::spawn(console::run(ui_rx, command_tx));

    let result = run_session(&config, ui_tx, command_rx).await;
    if let Err(e) = front_end.await {
        tracing::error!(error = %e, "Console front-end failed");
    }

    match result {
        Ok(()) => {
            tracing::info!("Sconsify shutting down");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "Initialisation failed");
            Err(anyhow::anyhow!(e))
        }
    }
}

async fn run_session(
    config: &Config,
    ui: UiSender,
    commands: mpsc::Receiver<Command>,
) -> Result<(), InitError> {
    let cache = SessionCache::under_home(config.home_dir().as_deref())?;
    if let Err(e) = cache.clear() {
        tracing::warn!(error = %e, "Could not clear session cache");
    }

    let auth_result = auth::perform_oauth_flow(&config.client_id, config.credentials_dir()).await?;

    let output_config = config.output();
    let stats = Arc::new(AudioStats::default());
    let (producer, consumer) = audio_queue(config.queue_capacity, stats.clone());
    let output = AudioOutput::start(
        consumer,
        producer.clone(),
        stats,
        output_config,
        CpalDevice::open,
    )
    .await?;

    let sink = BridgeSink::new(producer, output_config);
    let service = Arc::new(SpotifyService::new(config, &cache, auth_result, sink).await?);

    let coordinator = Coordinator::new(
        service.clone(),
        service,
        cache,
        ui,
        config.login_timeout(),
    );
    let result = coordinator.start(commands).await;

    if let Err(e) = tokio::task::spawn_blocking(move || output.shutdown()).await {
        tracing::error!(error = %e, "Audio output shutdown failed");
    }
    result
}
