//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use contracts::{CameraBlueprint, Channel};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    node: String,
    camera: CameraInfo,
    channels: Vec<ChannelInfo>,
    render: RenderInfo,
}

#[derive(Serialize)]
struct CameraInfo {
    texture_width: u32,
    texture_height: u32,
    publish_rate_hz: f64,
    origin: String,
}

#[derive(Serialize)]
struct ChannelInfo {
    channel: String,
    topic: String,
    encoding: String,
    step: usize,
    frame_bytes: usize,
    sinks: Vec<SinkInfo>,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

#[derive(Serialize)]
struct RenderInfo {
    render_rate_hz: f64,
    animate: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &CameraBlueprint, args: &InfoArgs) -> ConfigInfo {
    let camera = &blueprint.camera;

    let channels = Channel::ALL
        .into_iter()
        .map(|channel| {
            let format = channel.format();
            let sinks = blueprint
                .sinks_for(channel)
                .map(|s| SinkInfo {
                    name: s.name.clone(),
                    sink_type: format!("{:?}", s.sink_type),
                    queue_capacity: s.queue_capacity,
                    params: if args.sinks {
                        s.params.clone()
                    } else {
                        HashMap::new()
                    },
                })
                .collect();

            ChannelInfo {
                channel: channel.to_string(),
                topic: blueprint.channels.topic(channel).to_string(),
                encoding: format.to_string(),
                step: format.row_stride(camera.texture_width),
                frame_bytes: format.frame_len(camera.texture_width, camera.texture_height),
                sinks,
            }
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        node: blueprint.node.name.clone(),
        camera: CameraInfo {
            texture_width: camera.texture_width,
            texture_height: camera.texture_height,
            publish_rate_hz: camera.publish_rate,
            origin: camera.origin.to_string(),
        },
        channels,
        render: RenderInfo {
            render_rate_hz: blueprint.render.render_rate,
            animate: blueprint.render.animate,
        },
    }
}

fn print_config_info(blueprint: &CameraBlueprint, args: &InfoArgs) {
    let camera = &blueprint.camera;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Camera Publisher Configuration                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Node");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   └─ Name: {}", blueprint.node.name);

    println!("\nCamera");
    println!(
        "   ├─ Resolution: {}x{}",
        camera.texture_width, camera.texture_height
    );
    println!("   ├─ Publish rate: {} Hz", camera.publish_rate);
    println!("   └─ Origin: {}", camera.origin);

    println!("\nChannels");
    for (i, channel) in Channel::ALL.into_iter().enumerate() {
        let is_last = i == Channel::ALL.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        let format = channel.format();

        println!(
            "   {} {} -> {} ({}, step {})",
            prefix,
            channel,
            blueprint.channels.topic(channel),
            format,
            format.row_stride(camera.texture_width)
        );

        let sinks: Vec<_> = blueprint.sinks_for(channel).collect();
        if sinks.is_empty() {
            println!("   {}  └─ (no sinks)", child_prefix);
        }
        for (j, sink) in sinks.iter().enumerate() {
            let sink_prefix = if j == sinks.len() - 1 { "└─" } else { "├─" };
            println!(
                "   {}  {} {} ({:?}, queue {})",
                child_prefix, sink_prefix, sink.name, sink.sink_type, sink.queue_capacity
            );
            if args.sinks {
                let mut params: Vec<_> = sink.params.iter().collect();
                params.sort();
                for (key, value) in params {
                    println!("   {}       {} = {}", child_prefix, key, value);
                }
            }
        }
    }

    println!("\nRender");
    println!("   ├─ Rate: {} Hz", blueprint.render.render_rate);
    println!("   └─ Animate: {}", blueprint.render.animate);

    println!();
}
