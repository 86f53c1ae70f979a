//! Burstline pipeline - compilation job execution
//!
//! Everything with a side effect lives here:
//! - Job manifest loading and validation
//! - The compiler process boundary (`CompilerInvoker` / `BclInvoker`)
//! - Compiler diagnostic parsing
//! - Artifact collation and staging
//! - The sequential job orchestrator and its report

pub mod compiler;
pub mod diagnostics;
pub mod error;
pub mod fakes;
pub mod job;
pub mod manifest;
pub mod stage;
pub mod telemetry;

// Re-export key types
pub use compiler::{BclInvoker, CompileOutput, CompileRequest, CompilerInvoker};
pub use diagnostics::{parse_diagnostics, Diagnostic, DiagnosticKind};
pub use error::{PipelineError, Result};
pub use fakes::ScriptedInvoker;
pub use job::{BurstJob, EntryReport, EntryStatus, JobConfig, JobReport};
pub use manifest::{JobManifest, ManifestEntry, StagingEntry};
pub use stage::{
    collate_debug_information, collect_combination_outputs, pdbs_remain_in_build,
    reset_directory, stage_assembly_artifacts,
};
pub use telemetry::{init_tracing, verbosity_level};
