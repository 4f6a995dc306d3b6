//! Config file formats
//!
//! TOML is the primary format; JSON is accepted for generated configs.

use std::path::Path;

use contracts::{CameraBlueprint, ContractError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Format for a file extension, case-insensitive
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    /// Format of the file at `path`, judged by its extension
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ContractError::config_parse(format!("{} has no extension", path.display())))?;

        Self::from_extension(ext)
            .ok_or_else(|| ContractError::config_parse(format!("unsupported config format: .{ext}")))
    }

    pub fn parse(self, content: &str) -> Result<CameraBlueprint, ContractError> {
        match self {
            Self::Toml => parse_toml(content),
            Self::Json => parse_json(content),
        }
    }

    pub fn render(self, blueprint: &CameraBlueprint) -> Result<String, ContractError> {
        let rendered = match self {
            Self::Toml => toml::to_string_pretty(blueprint).map_err(|e| e.to_string()),
            Self::Json => serde_json::to_string_pretty(blueprint).map_err(|e| e.to_string()),
        };
        rendered.map_err(|e| ContractError::config_parse(format!("{self:?} serialize error: {e}")))
    }
}

pub fn parse_toml(content: &str) -> Result<CameraBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse_json(content: &str) -> Result<CameraBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error at line {}: {e}", e.line()),
        source: Some(Box::new(e)),
    })
}
