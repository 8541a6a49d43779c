//! `run` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use contracts::RecorderBlueprint;
use tracing::{debug, info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::session::{Session, SessionConfig};

/// Execute the `run` command
pub async fn run_recorder(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args)?;
    if let Ok(effective) = config_loader::ConfigLoader::to_toml(&blueprint) {
        debug!(config = %effective, "Effective configuration");
    }

    match blueprint.recording.output_path {
        Some(ref path) => info!(output = %path.display(), "Recorded data will be saved here"),
        None => warn!("No output path configured, recording disabled"),
    }

    info!(
        frame_limit = blueprint.recording.frame_limit,
        episode_limit = blueprint.recording.episode_limit,
        autostart = blueprint.recording.autostart,
        cameras = blueprint.recording.cameras.len(),
        "Configuration loaded"
    );

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let session = Session::new(SessionConfig {
        blueprint,
        max_ticks: (args.ticks != 0).then_some(args.ticks),
        tick_interval: Duration::from_millis(args.tick_interval_ms),
        drive_model: args.drive_model,
    });

    let stats = session
        .run(shutdown_signal())
        .await
        .context("Recording session failed")?;

    info!(
        ticks = stats.ticks,
        episodes = stats.episodes,
        duration_secs = stats.duration.as_secs_f64(),
        tps = format!("{:.2}", stats.ticks_per_second()),
        "Recording session finished"
    );
    stats.print_summary();

    Ok(())
}

fn apply_overrides(blueprint: &mut RecorderBlueprint, args: &RunArgs) -> Result<()> {
    let recording = &mut blueprint.recording;
    if let Some(ref output) = args.output {
        info!(output = %output.display(), "Overriding output path from CLI");
        recording.output_path = Some(output.clone());
    }
    if let Some(limit) = args.frame_limit {
        recording.frame_limit = limit;
    }
    if let Some(limit) = args.episode_limit {
        recording.episode_limit = limit;
    }
    if args.autostart {
        recording.autostart = true;
    }

    config_loader::ConfigLoader::validate(blueprint)
        .map_err(|e| CliError::invalid_override(e.to_string()))?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
