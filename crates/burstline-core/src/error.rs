//! Error taxonomy for the Burst AOT domain model.

/// Errors produced by target resolution and the domain model.
///
/// `UnsupportedPlatform` is the only whole-job error in this crate: the
/// orchestrator raises it before any assembly entry is processed. Everything
/// else signals malformed input.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("unsupported build target {target}: {reason}")]
    UnsupportedPlatform { target: String, reason: String },

    #[error("unknown build target: {0}")]
    UnknownTarget(String),

    #[error("unknown target cpu: {0}")]
    UnknownCpu(String),

    #[error("cpu {cpu} is not valid for platform {platform}")]
    InvalidCpu { platform: String, cpu: String },

    #[error("invalid assembly definition: {0}")]
    InvalidDefinition(String),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("invalid version expression: {0}")]
    InvalidVersionExpression(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, CoreError>;
