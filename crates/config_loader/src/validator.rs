//! Config validation
//!
//! Rules:
//! - texture_width / texture_height > 0
//! - publish_rate and render_rate finite and > 0
//! - channel topics non-empty and distinct
//! - sink names non-empty and unique, queue_capacity > 0

use std::collections::HashSet;

use contracts::{CameraBlueprint, ContractError};

/// Validate a CameraBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
    validate_node(blueprint)?;
    validate_camera(blueprint)?;
    validate_channels(blueprint)?;
    validate_render(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

fn validate_node(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
    if blueprint.node.name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "node.name",
            "node name cannot be empty",
        ));
    }
    Ok(())
}

/// Validate target resolution and publish rate
fn validate_camera(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
    let camera = &blueprint.camera;

    if camera.texture_width == 0 {
        return Err(ContractError::config_validation(
            "camera.texture_width",
            "texture_width must be > 0",
        ));
    }
    if camera.texture_height == 0 {
        return Err(ContractError::config_validation(
            "camera.texture_height",
            "texture_height must be > 0",
        ));
    }
    if !camera.publish_rate.is_finite() || camera.publish_rate <= 0.0 {
        return Err(ContractError::config_validation(
            "camera.publish_rate",
            format!("publish_rate must be > 0, got {}", camera.publish_rate),
        ));
    }
    Ok(())
}

fn validate_channels(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
    let channels = &blueprint.channels;

    if channels.color.trim().is_empty() {
        return Err(ContractError::config_validation(
            "channels.color",
            "topic cannot be empty",
        ));
    }
    if channels.depth.trim().is_empty() {
        return Err(ContractError::config_validation(
            "channels.depth",
            "topic cannot be empty",
        ));
    }
    if channels.color == channels.depth {
        return Err(ContractError::config_validation(
            "channels.color / channels.depth",
            format!("color and depth share topic '{}'", channels.color),
        ));
    }
    Ok(())
}

fn validate_render(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
    let rate = blueprint.render.render_rate;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(ContractError::config_validation(
            "render.render_rate",
            format!("render_rate must be > 0, got {rate}"),
        ));
    }
    Ok(())
}

/// Validate sink configs
fn validate_sinks(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(&sink.name) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
    }
    Ok(())
}
