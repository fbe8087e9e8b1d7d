#![deny(clippy::all)]

mod app;
mod audio;
mod cli;
mod config;
mod controller;
mod engine;
mod error;
mod input;
mod playback;
mod presenter;

use app::App;
use clap::Parser;
use cli::CliArgs;
use config::{Config, API_KEY_ENV};
use controller::{Controller, TriggerKeyword};
use engine::{EngineSettings, RealtimeEngine};
use error::AppError;
use playback::ProcessPlayer;
use presenter::ConsolePresenter;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Logs go to stderr; stdout belongs to the console UI.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {:?}", path),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Failed to load .env: {}", e),
    }

    let args = CliArgs::parse();
    let config = Config::load(args.config.as_deref())?;
    debug!(?config, "Configuration loaded");

    let mut presenter = ConsolePresenter::stdout();
    let mut controller = Controller::new(
        TriggerKeyword::new(config.trigger.keyword.clone()),
        config.messages.clone(),
    );

    // Capability check: without credentials there is no recognizer to wire up.
    let Some(api_key) = config.recognition.api_key() else {
        info!(
            "No API key configured (set {} or recognition.api_key)",
            API_KEY_ENV
        );
        app::render_unsupported(&mut presenter, &mut controller);
        return Ok(());
    };

    presenter.show_help();

    let (engine, engine_rx) =
        RealtimeEngine::new(EngineSettings::from_config(&config.recognition), api_key);
    let (player, playback_rx) = ProcessPlayer::new(&config.video);
    let input_rx = input::spawn_stdin_reader();

    App::new(controller, presenter, engine, player)
        .run(engine_rx, playback_rx, input_rx)
        .await;

    Ok(())
}
