//! Target resolution and output-combination collection.
//!
//! Maps a build target to the compiler's platform vocabulary, decides
//! whether compilation runs at all, and enumerates the per-architecture
//! output combinations. Collection is deterministic: identical inputs
//! produce identical combination lists in identical order, which staging
//! depends on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assembly::AssemblyDefinition;
use crate::error::{CoreError, Result};
use crate::settings::{EnvOverrides, GlobalSettings, PlatformSettings};
use crate::target::{BuildTarget, CpuFamily, TargetCpu, TargetPlatform};

/// One compiler invocation's worth of work: a single output binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputCombination {
    /// Output subdirectory under the compilation temp area.
    pub subdirectory: String,

    /// Base name of the emitted library, without extension.
    pub library_name: String,

    /// Instruction sets compiled into this binary, in emission order.
    pub cpus: Vec<TargetCpu>,

    /// Forces line-only debug data regardless of the requested kind.
    ///
    /// Set on combinations with a known full-debug-info toolchain defect.
    pub force_line_only_debug: bool,

    /// Process environment overrides for this invocation.
    pub environment: BTreeMap<String, String>,
}

/// Resolved per-(assembly, target) compilation aggregate.
///
/// Built fresh for each assembly in a job run and read-only afterwards.
/// `is_supported == false` means the assembly is gated out of this target:
/// the combination list is empty and no compiler invocation happens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AotSettings {
    /// Compiler platform for the build target.
    pub platform: TargetPlatform,

    /// Platform default instruction sets.
    pub default_cpus: Vec<TargetCpu>,

    /// Effective per-platform knobs.
    pub settings: PlatformSettings,

    /// Output combinations, stable-sorted by (subdirectory, library name).
    pub combinations: Vec<OutputCombination>,

    /// Whether the assembly compiles for this target at all.
    pub is_supported: bool,

    /// Job-wide debugging flag.
    pub debugging: bool,

    /// Environment override snapshot taken at job start.
    pub env: EnvOverrides,
}

impl AotSettings {
    /// Base name of the bursted library for an assembly.
    pub fn library_name(assembly_name: &str) -> String {
        format!("{}_Burst", assembly_name)
    }

    /// Resolve the full aggregate for one assembly.
    ///
    /// Fails with `UnsupportedPlatform` when the target cannot compile at
    /// all (kill switch, platform disabled); an assembly gated out by its
    /// own constraints yields `is_supported == false` instead.
    pub fn resolve(
        assembly: &AssemblyDefinition,
        target: BuildTarget,
        global: &GlobalSettings,
        platform_settings: &PlatformSettings,
        active_defines: &[String],
        env: EnvOverrides,
    ) -> Result<AotSettings> {
        let (platform, default_cpus) = resolve_target(target);
        check_supported(target, global, platform_settings)?;

        let included =
            assembly.is_included_for(target) && assembly.constraints_satisfied(active_defines);

        if !included {
            return Ok(AotSettings {
                platform,
                default_cpus,
                settings: platform_settings.clone(),
                combinations: Vec::new(),
                is_supported: false,
                debugging: global.debugging,
                env,
            });
        }

        let cpus = effective_cpus(platform, &default_cpus, platform_settings)?;
        let combinations = collect_combinations(
            platform,
            &cpus,
            platform_settings,
            &Self::library_name(&assembly.name),
        );

        Ok(AotSettings {
            platform,
            default_cpus,
            settings: platform_settings.clone(),
            combinations,
            is_supported: true,
            debugging: global.debugging,
            env,
        })
    }
}

/// Map a build target to its compiler platform and default instruction sets.
pub fn resolve_target(target: BuildTarget) -> (TargetPlatform, Vec<TargetCpu>) {
    use TargetCpu::*;
    match target {
        BuildTarget::StandaloneWindows => (TargetPlatform::Windows, vec![X86Sse2]),
        BuildTarget::StandaloneWindows64 => (TargetPlatform::Windows, vec![X64Sse2]),
        BuildTarget::StandaloneOSX => (TargetPlatform::MacOS, vec![X64Sse2]),
        BuildTarget::StandaloneLinux64 => (TargetPlatform::Linux, vec![X64Sse2]),
        BuildTarget::Android => (TargetPlatform::Android, vec![Armv7aNeon32]),
        BuildTarget::Ios => (TargetPlatform::Ios, vec![Armv8aAarch64]),
        BuildTarget::TvOs => (TargetPlatform::TvOs, vec![Armv8aAarch64]),
        BuildTarget::WebGl => (TargetPlatform::Wasm, vec![Wasm32]),
        BuildTarget::WsaPlayer => (TargetPlatform::Uwp, vec![X64Sse2]),
        BuildTarget::Switch => (TargetPlatform::Switch, vec![Armv8aAarch64]),
        BuildTarget::EmbeddedLinux => (TargetPlatform::EmbeddedLinux, vec![X64Sse2]),
        BuildTarget::Qnx => (TargetPlatform::Qnx, vec![X64Sse2]),
        BuildTarget::VisionOS => (TargetPlatform::VisionOs, vec![Armv8aAarch64]),
    }
}

/// Check that the target compiles at all under the given settings.
pub fn check_supported(
    target: BuildTarget,
    global: &GlobalSettings,
    settings: &PlatformSettings,
) -> Result<()> {
    if global.force_disable_compilation {
        return Err(CoreError::UnsupportedPlatform {
            target: target.to_string(),
            reason: "compilation disabled by kill switch".to_string(),
        });
    }
    if !settings.enabled {
        return Err(CoreError::UnsupportedPlatform {
            target: target.to_string(),
            reason: "platform disabled in settings".to_string(),
        });
    }
    Ok(())
}

/// Compute the effective instruction-set list for a platform.
///
/// The settings override replaces the defaults when non-empty; `Auto`
/// entries expand to the defaults in place. The result is deduplicated in
/// first-seen order and validated against the platform.
pub fn effective_cpus(
    platform: TargetPlatform,
    defaults: &[TargetCpu],
    settings: &PlatformSettings,
) -> Result<Vec<TargetCpu>> {
    let requested: &[TargetCpu] = if settings.target_cpus.is_empty() {
        defaults
    } else {
        &settings.target_cpus
    };

    let mut cpus: Vec<TargetCpu> = Vec::new();
    for &cpu in requested {
        if cpu == TargetCpu::Auto {
            for &default in defaults {
                if !cpus.contains(&default) {
                    cpus.push(default);
                }
            }
            continue;
        }
        if !platform.supports_cpu(cpu) {
            return Err(CoreError::InvalidCpu {
                platform: platform.to_string(),
                cpu: cpu.to_string(),
            });
        }
        if !cpus.contains(&cpu) {
            cpus.push(cpu);
        }
    }
    Ok(cpus)
}

/// Collect the output combinations for a platform and instruction-set list.
///
/// Instruction sets are grouped into one combination per architecture
/// family; mobile platforms map families to their packaging layout. The
/// result is stable-sorted by (subdirectory, library name).
pub fn collect_combinations(
    platform: TargetPlatform,
    cpus: &[TargetCpu],
    settings: &PlatformSettings,
    library_name: &str,
) -> Vec<OutputCombination> {
    let mut combinations: Vec<OutputCombination> = Vec::new();
    let mut push = |subdirectory: &str, cpus: Vec<TargetCpu>, force_line_only: bool| {
        if cpus.is_empty() {
            return;
        }
        combinations.push(OutputCombination {
            subdirectory: subdirectory.to_string(),
            library_name: library_name.to_string(),
            cpus,
            force_line_only_debug: force_line_only,
            environment: settings.environment.clone(),
        });
    };

    match platform {
        TargetPlatform::Android => {
            // One binary per ABI. The armeabi-v7a toolchain cannot consume
            // full debug data, so that combination pins line-only.
            for (family, abi) in [
                (CpuFamily::Arm32, "armeabi-v7a"),
                (CpuFamily::Arm64, "arm64-v8a"),
                (CpuFamily::X86, "x86"),
                (CpuFamily::X64, "x86_64"),
            ] {
                let group = family_cpus(cpus, family);
                push(abi, group, family == CpuFamily::Arm32);
            }
        }
        TargetPlatform::Ios | TargetPlatform::TvOs | TargetPlatform::VisionOs => {
            // Device binary from the ARM sets, simulator binary from any
            // x86 sets the settings opted into.
            let device: Vec<TargetCpu> = cpus
                .iter()
                .copied()
                .filter(|c| matches!(c.family(), CpuFamily::Arm32 | CpuFamily::Arm64))
                .collect();
            let simulator: Vec<TargetCpu> = cpus
                .iter()
                .copied()
                .filter(|c| matches!(c.family(), CpuFamily::X86 | CpuFamily::X64))
                .collect();
            push("arm64", device, false);
            push("simulator", simulator, false);
        }
        TargetPlatform::Switch => {
            push("arm64", cpus.to_vec(), false);
        }
        TargetPlatform::Wasm => {
            push("wasm32", cpus.to_vec(), false);
        }
        TargetPlatform::Windows
        | TargetPlatform::MacOS
        | TargetPlatform::Linux
        | TargetPlatform::Uwp
        | TargetPlatform::EmbeddedLinux
        | TargetPlatform::Qnx => {
            // One multi-CPU binary per architecture family present. A
            // universal macOS build therefore yields x86_64 + arm64.
            for family in [
                CpuFamily::X86,
                CpuFamily::X64,
                CpuFamily::Arm32,
                CpuFamily::Arm64,
            ] {
                let group = family_cpus(cpus, family);
                push(family.directory(), group, false);
            }
        }
    }

    combinations.sort_by(|a, b| {
        (a.subdirectory.as_str(), a.library_name.as_str())
            .cmp(&(b.subdirectory.as_str(), b.library_name.as_str()))
    });
    combinations
}

fn family_cpus(cpus: &[TargetCpu], family: CpuFamily) -> Vec<TargetCpu> {
    cpus.iter().copied().filter(|c| c.family() == family).collect()
}
