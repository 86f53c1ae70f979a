//! Compiler process boundary.
//!
//! The orchestrator never spawns `bcl` directly; it goes through the
//! [`CompilerInvoker`] trait so tests can substitute a scripted fake.
//! `BclInvoker` is the real implementation: one response file, one process,
//! one [`CompileOutput`] per combination.

use crate::diagnostics::{parse_diagnostics, Diagnostic};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use burstline_core::{OptionSet, OutputCombination};
use std::io::Write;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

/// One compiler invocation: an assembly × output combination pair.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    /// Name of the managed assembly being compiled.
    pub assembly_name: String,

    /// The output combination this invocation produces.
    pub combination: OutputCombination,

    /// Fully built option set for the invocation.
    pub option_set: OptionSet,

    /// Output path (without extension) the compiler writes to.
    pub output_path: PathBuf,

    /// Whether the incremental compilation switch is passed.
    pub incremental: bool,
}

/// Captured result of a completed compiler process.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// Exit code (0 = success).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Diagnostics parsed from the combined output.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileOutput {
    /// Whether the invocation succeeded: clean exit and no error diagnostics.
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && !self.diagnostics.iter().any(|d| d.is_error())
    }

    /// Number of error diagnostics in the output.
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }
}

/// Process boundary between the orchestrator and the AOT compiler.
///
/// Implementations return `Ok` for any invocation that ran to completion,
/// even a failing one; the caller inspects [`CompileOutput::succeeded`].
/// `Err` is reserved for invocations that never completed (launch failure,
/// timeout).
#[async_trait]
pub trait CompilerInvoker: Send + Sync {
    async fn compile(&self, request: &CompileRequest) -> Result<CompileOutput>;
}

/// Invoker backed by the real `bcl` executable.
pub struct BclInvoker {
    executable: PathBuf,
    timeout_secs: u64,
}

impl BclInvoker {
    /// Create an invoker for the given `bcl` executable, with no timeout.
    pub fn new(executable: PathBuf) -> Self {
        Self {
            executable,
            timeout_secs: 0,
        }
    }

    /// Set a per-invocation timeout in seconds (0 = no timeout).
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[async_trait]
impl CompilerInvoker for BclInvoker {
    async fn compile(&self, request: &CompileRequest) -> Result<CompileOutput> {
        let start = Instant::now();

        // The option set goes through a response file; the command line
        // carries only the incremental switch and the file reference.
        let mut response_file = tempfile::Builder::new()
            .prefix("burstline-")
            .suffix(".rsp")
            .tempfile()
            .map_err(|source| PipelineError::CompilerLaunch {
                assembly: request.assembly_name.clone(),
                source,
            })?;
        response_file
            .write_all(request.option_set.response_file_contents().as_bytes())
            .map_err(|source| PipelineError::CompilerLaunch {
                assembly: request.assembly_name.clone(),
                source,
            })?;

        let mut command = Command::new(&self.executable);
        if request.incremental {
            command.arg("+burstc");
        }
        command.arg(format!("@{}", response_file.path().display()));
        command.envs(&request.combination.environment);
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        debug!(
            assembly = %request.assembly_name,
            subdirectory = %request.combination.subdirectory,
            response_file = %response_file.path().display(),
            "invoking compiler"
        );

        let child = command
            .spawn()
            .map_err(|source| PipelineError::CompilerLaunch {
                assembly: request.assembly_name.clone(),
                source,
            })?;

        let output = if self.timeout_secs > 0 {
            tokio::time::timeout(
                std::time::Duration::from_secs(self.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| PipelineError::CompilerTimeout {
                assembly: request.assembly_name.clone(),
                timeout_secs: self.timeout_secs,
            })??
        } else {
            child.wait_with_output().await?
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let mut diagnostics = parse_diagnostics(&stdout);
        diagnostics.extend(parse_diagnostics(&stderr));

        Ok(CompileOutput {
            exit_code,
            stdout,
            stderr,
            duration_ms,
            diagnostics,
        })
    }
}
