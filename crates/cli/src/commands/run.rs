//! `run` command implementation.

use anyhow::Result;
use contracts::CameraBlueprint;
use std::time::Duration;
use tracing::{error, info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;
    apply_overrides(&mut blueprint, args)?;

    info!(
        node = %blueprint.node.name,
        width = blueprint.camera.texture_width,
        height = blueprint.camera.texture_height,
        rate_hz = blueprint.camera.publish_rate,
        origin = %blueprint.camera.origin,
        sinks = blueprint.sinks.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline_config = PipelineConfig {
        blueprint,
        max_cycles: (args.max_cycles > 0).then_some(args.max_cycles),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    info!("Starting publisher...");

    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .map_err(|e| CliError::pipeline_execution(format!("{e:#}")))?;

    info!(
        stop_reason = %stats.stop_reason,
        cycles = stats.cycles.total_cycles,
        published = stats.cycles.published_cycles,
        duration_secs = stats.duration.as_secs_f64(),
        "Publisher finished"
    );
    stats.print_summary();

    Ok(())
}

/// Apply CLI overrides, then re-validate
fn apply_overrides(blueprint: &mut CameraBlueprint, args: &RunArgs) -> Result<()> {
    if let Some(rate) = args.rate {
        info!(rate_hz = rate, "Overriding publish rate from CLI");
        blueprint.camera.publish_rate = rate;
    }
    if let Some(width) = args.width {
        info!(width, "Overriding texture width from CLI");
        blueprint.camera.texture_width = width;
    }
    if let Some(height) = args.height {
        info!(height, "Overriding texture height from CLI");
        blueprint.camera.texture_height = height;
    }
    if let Some(origin) = args.origin {
        blueprint.camera.origin = origin.into();
        info!(origin = %blueprint.camera.origin, "Overriding row origin from CLI");
    }

    config_loader::ConfigLoader::validate(blueprint)
        .map_err(|e| CliError::config_validation(e.to_string()))?;
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
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
                error!(error = %e, "Failed to install SIGTERM handler");
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

    warn!("Received shutdown signal, stopping publisher...");
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &CameraBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Node: {}", blueprint.node.name);
    println!("Camera:");
    println!(
        "  Resolution: {}x{}",
        blueprint.camera.texture_width, blueprint.camera.texture_height
    );
    println!("  Publish rate: {} Hz", blueprint.camera.publish_rate);
    println!("  Origin: {}", blueprint.camera.origin);
    println!("Channels:");
    println!("  color -> {}", blueprint.channels.color);
    println!("  depth -> {}", blueprint.channels.depth);

    if !blueprint.sinks.is_empty() {
        println!("\nSinks ({}):", blueprint.sinks.len());
        for sink in &blueprint.sinks {
            println!("  - {} ({:?}, {})", sink.name, sink.sink_type, sink.channel);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OriginArg;
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::RowOrigin;
    use std::path::PathBuf;

    fn args() -> RunArgs {
        RunArgs {
            config: PathBuf::from("camera.toml"),
            rate: None,
            width: None,
            height: None,
            origin: None,
            max_cycles: 0,
            timeout: 0,
            dry_run: false,
            metrics_port: 0,
        }
    }

    fn blueprint() -> CameraBlueprint {
        ConfigLoader::load_from_str(
            "[camera]\ntexture_width = 848\ntexture_height = 480\n",
            ConfigFormat::Toml,
        )
        .unwrap()
    }

    #[test]
    fn test_overrides_applied() {
        let mut bp = blueprint();
        let args = RunArgs {
            rate: Some(5.0),
            width: Some(64),
            height: Some(32),
            origin: Some(OriginArg::TopLeft),
            ..args()
        };

        apply_overrides(&mut bp, &args).unwrap();
        assert_eq!(bp.camera.publish_rate, 5.0);
        assert_eq!(bp.camera.texture_width, 64);
        assert_eq!(bp.camera.texture_height, 32);
        assert_eq!(bp.camera.origin, RowOrigin::TopLeft);
    }

    #[test]
    fn test_zero_rate_override_rejected() {
        let mut bp = blueprint();
        let args = RunArgs {
            rate: Some(0.0),
            ..args()
        };

        let err = apply_overrides(&mut bp, &args).unwrap_err();
        assert!(err.to_string().contains("publish_rate"));
    }

    #[tokio::test]
    async fn test_missing_config_file() {
        let args = RunArgs {
            config: PathBuf::from("/nonexistent/camera.toml"),
            ..args()
        };
        let err = run_pipeline(&args).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
