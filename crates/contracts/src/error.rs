//! Layered error definitions
//!
//! Categorized by source: config / capture / format / schedule / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Capture Errors =====
    /// Render target not ready or misconfigured
    #[error("capture unavailable: {reason}")]
    CaptureUnavailable { reason: String },

    // ===== Format Errors =====
    /// Pixel format outside the recognized set
    #[error("unsupported pixel format: {format}")]
    UnsupportedFormat { format: String },

    /// Byte length does not match the declared geometry
    #[error("buffer size mismatch for {context}: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Wall clock cannot be represented in the message timestamp
    #[error("clock out of range: {message}")]
    ClockOutOfRange { message: String },

    // ===== Schedule Errors =====
    /// Publish rate is zero, negative or not finite
    #[error("invalid publish rate: {rate} (must be a finite value > 0)")]
    InvalidRate { rate: f64 },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    /// Channel has no live publisher behind it
    #[error("channel '{channel}' is closed")]
    ChannelClosed { channel: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create capture unavailable error
    pub fn capture_unavailable(reason: impl Into<String>) -> Self {
        Self::CaptureUnavailable {
            reason: reason.into(),
        }
    }

    /// Create unsupported format error
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create buffer size mismatch error
    pub fn buffer_size_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::BufferSizeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error indicates a broken contract between components
    /// rather than a recoverable runtime condition.
    pub fn is_defect(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedFormat { .. } | Self::BufferSizeMismatch { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defect_classification() {
        assert!(ContractError::unsupported_format("bgra8").is_defect());
        assert!(ContractError::buffer_size_mismatch("color", 6, 5).is_defect());
        assert!(!ContractError::capture_unavailable("not ready").is_defect());
        assert!(!ContractError::InvalidRate { rate: 0.0 }.is_defect());
    }

    #[test]
    fn test_error_messages() {
        let err = ContractError::InvalidRate { rate: -1.0 };
        assert!(err.to_string().contains("-1"));

        let err = ContractError::buffer_size_mismatch("depth", 4, 3);
        assert_eq!(
            err.to_string(),
            "buffer size mismatch for depth: expected 4 bytes, got 3"
        );
    }
}
