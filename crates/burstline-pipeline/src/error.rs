//! Pipeline-level error taxonomy.

use crate::diagnostics::Diagnostic;

/// Errors produced while driving the compiler and staging its outputs.
///
/// `CompilationFailed` and `CompilerTimeout` are per-entry fatal: the job
/// logs them, skips staging for that entry and continues with the rest.
/// Everything else aborts the job.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] burstline_core::CoreError),

    #[error("invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("failed to launch compiler for {assembly}: {source}")]
    CompilerLaunch {
        assembly: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compilation failed for {assembly} ({subdirectory}): exit code {exit_code}, {error_count} error(s)")]
    CompilationFailed {
        assembly: String,
        subdirectory: String,
        exit_code: i32,
        error_count: usize,
        diagnostics: Vec<Diagnostic>,
        stderr: String,
    },

    #[error("compiler timed out after {timeout_secs}s for {assembly}")]
    CompilerTimeout { assembly: String, timeout_secs: u64 },

    #[error("all {count} assembly entries failed")]
    AllEntriesFailed { count: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether this error is scoped to one entry rather than the job.
    pub fn is_entry_scoped(&self) -> bool {
        matches!(
            self,
            PipelineError::CompilationFailed { .. }
                | PipelineError::CompilerTimeout { .. }
                | PipelineError::CompilerLaunch { .. }
        )
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
