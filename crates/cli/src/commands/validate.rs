//! `validate` command: load a config, report errors and non-fatal warnings

use std::path::Path;

use anyhow::{Context, Result};
use contracts::{CameraBlueprint, Channel};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

impl ValidationResult {
    fn rejected(path: &Path, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            config_path: path.display().to_string(),
            error: Some(error.into()),
            warnings: Vec::new(),
            summary: None,
        }
    }

    fn accepted(path: &Path, blueprint: &CameraBlueprint) -> Self {
        Self {
            valid: true,
            config_path: path.display().to_string(),
            error: None,
            warnings: collect_warnings(blueprint),
            summary: Some(ConfigSummary::of(blueprint)),
        }
    }
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    node: String,
    resolution: String,
    publish_rate_hz: f64,
    color_topic: String,
    depth_topic: String,
    sink_count: usize,
}

impl ConfigSummary {
    fn of(blueprint: &CameraBlueprint) -> Self {
        let camera = &blueprint.camera;
        Self {
            version: format!("{:?}", blueprint.version),
            node: blueprint.node.name.clone(),
            resolution: format!("{}x{}", camera.texture_width, camera.texture_height),
            publish_rate_hz: camera.publish_rate,
            color_topic: blueprint.channels.topic(Channel::Color).to_string(),
            depth_topic: blueprint.channels.topic(Channel::Depth).to_string(),
            sink_count: blueprint.sinks.len(),
        }
    }
}

/// Execute the `validate` command; fails when the config is invalid
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    anyhow::ensure!(result.valid, "Configuration validation failed");
    Ok(())
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let path = args.config.as_path();
    if !path.exists() {
        return ValidationResult::rejected(path, format!("File not found: {}", path.display()));
    }

    match config_loader::ConfigLoader::load_from_path(path) {
        Ok(blueprint) => ValidationResult::accepted(path, &blueprint),
        Err(e) => ValidationResult::rejected(path, e.to_string()),
    }
}

/// Configurations that run but probably not as intended
fn collect_warnings(blueprint: &CameraBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.sinks.is_empty() {
        warnings.push("No sinks configured - published frames will be discarded".to_string());
    } else {
        for channel in Channel::ALL {
            if blueprint.sinks_for(channel).next().is_none() {
                warnings.push(format!("No sinks bound to the {} channel", channel));
            }
        }
    }

    if blueprint.render.render_rate < blueprint.camera.publish_rate {
        warnings.push(format!(
            "render.render_rate ({} Hz) is below camera.publish_rate ({} Hz) - frames will repeat",
            blueprint.render.render_rate, blueprint.camera.publish_rate
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if !result.valid {
        println!("✗ Invalid camera config: {}", result.config_path);
        if let Some(error) = &result.error {
            println!("  {error}");
        }
        return;
    }

    println!("✓ Camera config OK: {}", result.config_path);
    if let Some(summary) = &result.summary {
        println!(
            "  {} ({:?}) {} @ {} Hz",
            summary.node, summary.version, summary.resolution, summary.publish_rate_hz
        );
        println!("  topics: {} / {}", summary.color_topic, summary.depth_topic);
        println!("  sinks:  {}", summary.sink_count);
    }
    for warning in &result.warnings {
        println!("  warning: {warning}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn args_for(path: PathBuf) -> ValidateArgs {
        ValidateArgs {
            config: path,
            json: true,
        }
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let file = write_config(
            r#"
[camera]
texture_width = 848
texture_height = 480
publish_rate = 60.0

[[sinks]]
name = "color_log"
channel = "color"
sink_type = "log"
"#,
        );

        let result = validate_config(&args_for(file.path().to_path_buf()));
        assert!(result.valid);

        let warnings = &result.warnings;
        assert!(warnings.iter().any(|w| w.contains("depth channel")));
        assert!(warnings.iter().any(|w| w.contains("frames will repeat")));

        let summary = result.summary.unwrap();
        assert_eq!(summary.resolution, "848x480");
        assert_eq!(summary.sink_count, 1);
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let file = write_config("[camera]\ntexture_width = 0\n");
        let result = validate_config(&args_for(file.path().to_path_buf()));

        assert!(!result.valid);
        assert!(result.error.unwrap().contains("texture_width"));
        assert!(run_validate(&args_for(file.path().to_path_buf())).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&args_for(PathBuf::from("/nonexistent/camera.toml")));
        assert!(!result.valid);
        assert!(result.error.unwrap().starts_with("File not found"));
    }
}
