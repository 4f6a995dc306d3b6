//! # Config Loader
//!
//! Reads a `CameraBlueprint` from TOML or JSON and rejects configurations
//! the publisher cannot run (zero-sized texture, non-positive rate, sinks
//! with duplicate names or zero-length queues).
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("camera.toml")).unwrap();
//! println!("Rate: {} Hz", blueprint.camera.publish_rate);
//! ```

mod parser;
mod validator;

pub use contracts::CameraBlueprint;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a config file, format chosen by extension
    pub fn load_from_path(path: &Path) -> Result<CameraBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), ?format, "Config file read");
        Self::load_from_str(&content, format)
    }

    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<CameraBlueprint, ContractError> {
        let blueprint = format.parse(content)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Re-check a blueprint changed in code, e.g. by CLI overrides
    pub fn validate(blueprint: &CameraBlueprint) -> Result<(), ContractError> {
        validator::validate(blueprint)
    }

    pub fn to_toml(blueprint: &CameraBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Toml.render(blueprint)
    }

    pub fn to_json(blueprint: &CameraBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Json.render(blueprint)
    }
}
