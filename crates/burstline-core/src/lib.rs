//! Burstline core - domain model for Burst AOT compilation
//!
//! Pure logic only, no process I/O:
//! - Assembly definition records and their gating rules
//! - Build target to (platform, instruction set) resolution
//! - Output combination collection
//! - Deterministic option-set construction per compiler invocation

pub mod assembly;
pub mod digest;
pub mod error;
pub mod options;
pub mod resolve;
pub mod settings;
pub mod target;
pub mod version;

// Re-export key types
pub use assembly::{AssemblyDefinition, VersionDefine};
pub use error::{CoreError, Result};
pub use options::{build_option_set, CompileInputs, OptionSet};
pub use resolve::{
    check_supported, collect_combinations, effective_cpus, resolve_target, AotSettings,
    OutputCombination,
};
pub use settings::{
    DebugDataKind, EnvOverrides, GlobalSettings, OptimizeFor, PlatformSettings,
    ENV_DISABLE_INCREMENTAL, ENV_FORCE_SAFETY_CHECKS,
};
pub use target::{BuildTarget, BuildTargetSpec, CpuFamily, TargetCpu, TargetPlatform};
pub use version::{Version, VersionExpression};
