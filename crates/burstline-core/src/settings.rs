//! Compilation settings: per-platform knobs, global switches and the
//! environment-override snapshot.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::target::TargetCpu;

/// Environment variable that forces safety checks on in development builds.
pub const ENV_FORCE_SAFETY_CHECKS: &str = "BURST_FORCE_SAFETY_CHECKS";

/// Environment variable that disables the compiler's incremental mode.
pub const ENV_DISABLE_INCREMENTAL: &str = "BURST_DISABLE_INCREMENTAL";

/// Debug data detail emitted by the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DebugDataKind {
    /// Line tables only; enough for stack traces.
    LineOnly,
    /// Full debug information.
    #[default]
    Full,
}

impl fmt::Display for DebugDataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // These spellings are the compiler's `--debug=` values.
        let s = match self {
            DebugDataKind::LineOnly => "LineOnly",
            DebugDataKind::Full => "Full",
        };
        f.write_str(s)
    }
}

/// Optimization goal for a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OptimizeFor {
    #[default]
    Default,
    Balanced,
    Performance,
    Size,
    FastCompilation,
}

/// Per-platform compilation knobs.
///
/// All fields default so a manifest only states what it changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PlatformSettings {
    /// Whether AOT compilation runs for this platform at all.
    pub enabled: bool,

    /// Instruction sets to compile; empty means the platform default.
    pub target_cpus: Vec<TargetCpu>,

    /// Requested debug data detail.
    pub debug_data_kind: DebugDataKind,

    /// Optimization goal.
    pub optimize_for: OptimizeFor,

    /// Master optimization switch; off emits unoptimized code.
    pub enable_optimizations: bool,

    /// Keep debug data even in non-development builds.
    pub enable_debug_in_all_builds: bool,

    /// Compiler warning codes to suppress.
    pub disabled_warnings: Vec<String>,

    /// Assemblies excluded from compilation on this platform.
    pub disabled_assemblies: Vec<String>,

    /// Extra option tokens appended verbatim after the generated set.
    pub extra_compiler_options: Vec<String>,

    /// Process environment overrides applied to compiler invocations.
    pub environment: BTreeMap<String, String>,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        PlatformSettings {
            enabled: true,
            target_cpus: Vec::new(),
            debug_data_kind: DebugDataKind::default(),
            optimize_for: OptimizeFor::default(),
            enable_optimizations: true,
            enable_debug_in_all_builds: false,
            disabled_warnings: Vec::new(),
            disabled_assemblies: Vec::new(),
            extra_compiler_options: Vec::new(),
            environment: BTreeMap::new(),
        }
    }
}

/// Job-wide switches that are not tied to one platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct GlobalSettings {
    /// Kill switch: no platform compiles while set.
    pub force_disable_compilation: bool,

    /// Managed debugging session expected; enables compiler debug logging.
    pub debugging: bool,
}

/// Snapshot of the environment overrides the compiler honors.
///
/// Captured once at job start and passed down, so option building stays a
/// pure function of its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvOverrides {
    /// `BURST_FORCE_SAFETY_CHECKS`: force safety checks on in development builds.
    pub force_safety_checks: bool,

    /// `BURST_DISABLE_INCREMENTAL`: drop the incremental compilation switch.
    pub disable_incremental: bool,
}

impl EnvOverrides {
    /// Read the override variables from the current process environment.
    ///
    /// A variable counts as set when present, non-empty and not `"0"`.
    pub fn capture() -> Self {
        EnvOverrides {
            force_safety_checks: env_flag(ENV_FORCE_SAFETY_CHECKS),
            disable_incremental: env_flag(ENV_DISABLE_INCREMENTAL),
        }
    }

    /// Snapshot with nothing overridden, for callers that opt out of
    /// ambient environment influence.
    pub const fn none() -> Self {
        EnvOverrides {
            force_safety_checks: false,
            disable_incremental: false,
        }
    }
}

fn env_flag(name: &str) -> bool {
    match std::env::var(name) {
        Ok(value) => !value.is_empty() && value != "0",
        Err(_) => false,
    }
}
