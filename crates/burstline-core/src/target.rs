//! Build targets, compiler platforms and instruction sets.
//!
//! `BuildTarget` is the identifier handed in by the surrounding build system
//! (e.g. `StandaloneWindows64`); the compiler itself speaks in terms of a
//! `TargetPlatform` plus one `TargetCpu` per emitted code path. Resolution
//! from one vocabulary to the other lives in [`crate::resolve`].

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Build-target identifier as supplied by the build system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildTarget {
    StandaloneWindows,
    StandaloneWindows64,
    StandaloneOSX,
    StandaloneLinux64,
    Android,
    #[serde(rename = "iOS")]
    Ios,
    #[serde(rename = "tvOS")]
    TvOs,
    #[serde(rename = "WebGL")]
    WebGl,
    #[serde(rename = "WSAPlayer")]
    WsaPlayer,
    Switch,
    EmbeddedLinux,
    #[serde(rename = "QNX")]
    Qnx,
    VisionOS,
}

impl BuildTarget {
    /// Canonical identifier, as written in manifests and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTarget::StandaloneWindows => "StandaloneWindows",
            BuildTarget::StandaloneWindows64 => "StandaloneWindows64",
            BuildTarget::StandaloneOSX => "StandaloneOSX",
            BuildTarget::StandaloneLinux64 => "StandaloneLinux64",
            BuildTarget::Android => "Android",
            BuildTarget::Ios => "iOS",
            BuildTarget::TvOs => "tvOS",
            BuildTarget::WebGl => "WebGL",
            BuildTarget::WsaPlayer => "WSAPlayer",
            BuildTarget::Switch => "Switch",
            BuildTarget::EmbeddedLinux => "EmbeddedLinux",
            BuildTarget::Qnx => "QNX",
            BuildTarget::VisionOS => "VisionOS",
        }
    }

    /// Platform name used by assembly definition include/exclude lists.
    ///
    /// The definition format predates some targets and uses its own spelling
    /// for the desktop ones.
    pub fn definition_platform(&self) -> &'static str {
        match self {
            BuildTarget::StandaloneWindows => "WindowsStandalone32",
            BuildTarget::StandaloneWindows64 => "WindowsStandalone64",
            BuildTarget::StandaloneOSX => "macOSStandalone",
            BuildTarget::StandaloneLinux64 => "LinuxStandalone64",
            BuildTarget::Android => "Android",
            BuildTarget::Ios => "iOS",
            BuildTarget::TvOs => "tvOS",
            BuildTarget::WebGl => "WebGL",
            BuildTarget::WsaPlayer => "WSA",
            BuildTarget::Switch => "Switch",
            BuildTarget::EmbeddedLinux => "EmbeddedLinux",
            BuildTarget::Qnx => "QNX",
            BuildTarget::VisionOS => "VisionOS",
        }
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        let target = match normalized.as_str() {
            "standalonewindows" | "windows" => BuildTarget::StandaloneWindows,
            "standalonewindows64" | "windows64" => BuildTarget::StandaloneWindows64,
            "standaloneosx" | "osx" | "macos" => BuildTarget::StandaloneOSX,
            "standalonelinux64" | "linux64" => BuildTarget::StandaloneLinux64,
            "android" => BuildTarget::Android,
            "ios" => BuildTarget::Ios,
            "tvos" => BuildTarget::TvOs,
            "webgl" | "wasm" => BuildTarget::WebGl,
            "wsaplayer" | "uwp" => BuildTarget::WsaPlayer,
            "switch" => BuildTarget::Switch,
            "embeddedlinux" => BuildTarget::EmbeddedLinux,
            "qnx" => BuildTarget::Qnx,
            "visionos" => BuildTarget::VisionOS,
            _ => return Err(CoreError::UnknownTarget(s.to_string())),
        };
        Ok(target)
    }
}

/// Platform the AOT compiler emits code for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPlatform {
    Windows,
    #[serde(rename = "macOS")]
    MacOS,
    Linux,
    Android,
    #[serde(rename = "iOS")]
    Ios,
    #[serde(rename = "WASM")]
    Wasm,
    #[serde(rename = "UWP")]
    Uwp,
    Switch,
    #[serde(rename = "tvOS")]
    TvOs,
    EmbeddedLinux,
    #[serde(rename = "QNX")]
    Qnx,
    #[serde(rename = "visionOS")]
    VisionOs,
}

impl TargetPlatform {
    /// Name as passed to the compiler's `--platform=` option.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetPlatform::Windows => "Windows",
            TargetPlatform::MacOS => "macOS",
            TargetPlatform::Linux => "Linux",
            TargetPlatform::Android => "Android",
            TargetPlatform::Ios => "iOS",
            TargetPlatform::Wasm => "WASM",
            TargetPlatform::Uwp => "UWP",
            TargetPlatform::Switch => "Switch",
            TargetPlatform::TvOs => "tvOS",
            TargetPlatform::EmbeddedLinux => "EmbeddedLinux",
            TargetPlatform::Qnx => "QNX",
            TargetPlatform::VisionOs => "visionOS",
        }
    }

    /// Instruction sets the compiler accepts for this platform.
    pub fn valid_cpus(&self) -> &'static [TargetCpu] {
        use TargetCpu::*;
        match self {
            TargetPlatform::Windows => &[X86Sse2, X86Sse4, X64Sse2, X64Sse4, Avx, Avx2],
            TargetPlatform::MacOS => &[X64Sse2, X64Sse4, Avx, Avx2, Armv8aAarch64],
            TargetPlatform::Linux => &[X64Sse2, X64Sse4, Avx, Avx2],
            TargetPlatform::Android => &[
                X86Sse2,
                X86Sse4,
                X64Sse2,
                X64Sse4,
                Armv7aNeon32,
                Armv8aAarch64,
                Armv8aAarch64Halffp,
                Armv9a,
            ],
            TargetPlatform::Ios => &[Armv7aNeon32, Armv8aAarch64, X64Sse2, X64Sse4],
            TargetPlatform::Wasm => &[Wasm32],
            TargetPlatform::Uwp => &[
                X86Sse2,
                X86Sse4,
                X64Sse2,
                X64Sse4,
                Avx,
                Avx2,
                Armv7aNeon32,
                Armv8aAarch64,
            ],
            TargetPlatform::Switch => &[Armv8aAarch64],
            TargetPlatform::TvOs => &[Armv8aAarch64, X64Sse2, X64Sse4],
            TargetPlatform::EmbeddedLinux => {
                &[X64Sse2, X64Sse4, Avx, Avx2, Armv7aNeon32, Armv8aAarch64]
            }
            TargetPlatform::Qnx => &[X64Sse2, X64Sse4, Armv7aNeon32, Armv8aAarch64],
            TargetPlatform::VisionOs => &[Armv8aAarch64, X64Sse2, X64Sse4],
        }
    }

    /// Whether `cpu` is compilable on this platform.
    pub fn supports_cpu(&self, cpu: TargetCpu) -> bool {
        self.valid_cpus().contains(&cpu)
    }

    /// File extension of the emitted native library.
    pub fn binary_extension(&self) -> &'static str {
        match self {
            TargetPlatform::Windows | TargetPlatform::Uwp => "dll",
            TargetPlatform::MacOS => "bundle",
            TargetPlatform::Linux
            | TargetPlatform::Android
            | TargetPlatform::EmbeddedLinux
            | TargetPlatform::Qnx => "so",
            TargetPlatform::Ios | TargetPlatform::TvOs | TargetPlatform::VisionOs => "a",
            TargetPlatform::Switch => "a",
            TargetPlatform::Wasm => "bc",
        }
    }

    /// Platforms whose binaries are loaded via statically linked entry
    /// points rather than dynamic symbol lookup.
    pub fn requires_static_linkage(&self) -> bool {
        matches!(
            self,
            TargetPlatform::Ios
                | TargetPlatform::TvOs
                | TargetPlatform::Switch
                | TargetPlatform::VisionOs
        )
    }
}

impl fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Instruction set selector for one emitted code path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetCpu {
    /// Placeholder resolved to the platform default before compilation.
    Auto,
    #[serde(rename = "X86_SSE2")]
    X86Sse2,
    #[serde(rename = "X86_SSE4")]
    X86Sse4,
    #[serde(rename = "X64_SSE2")]
    X64Sse2,
    #[serde(rename = "X64_SSE4")]
    X64Sse4,
    #[serde(rename = "AVX")]
    Avx,
    #[serde(rename = "AVX2")]
    Avx2,
    #[serde(rename = "WASM32")]
    Wasm32,
    #[serde(rename = "ARMV7A_NEON32")]
    Armv7aNeon32,
    #[serde(rename = "ARMV8A_AARCH64")]
    Armv8aAarch64,
    #[serde(rename = "THUMB2_NEON32")]
    Thumb2Neon32,
    #[serde(rename = "ARMV8A_AARCH64_HALFFP")]
    Armv8aAarch64Halffp,
    #[serde(rename = "ARMV9A")]
    Armv9a,
}

impl TargetCpu {
    /// Name as passed to the compiler's `--target=` option.
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetCpu::Auto => "Auto",
            TargetCpu::X86Sse2 => "X86_SSE2",
            TargetCpu::X86Sse4 => "X86_SSE4",
            TargetCpu::X64Sse2 => "X64_SSE2",
            TargetCpu::X64Sse4 => "X64_SSE4",
            TargetCpu::Avx => "AVX",
            TargetCpu::Avx2 => "AVX2",
            TargetCpu::Wasm32 => "WASM32",
            TargetCpu::Armv7aNeon32 => "ARMV7A_NEON32",
            TargetCpu::Armv8aAarch64 => "ARMV8A_AARCH64",
            TargetCpu::Thumb2Neon32 => "THUMB2_NEON32",
            TargetCpu::Armv8aAarch64Halffp => "ARMV8A_AARCH64_HALFFP",
            TargetCpu::Armv9a => "ARMV9A",
        }
    }

    /// Rough architecture family a CPU belongs to, used to split
    /// combinations into per-architecture outputs.
    pub fn family(&self) -> CpuFamily {
        match self {
            TargetCpu::Auto => CpuFamily::X64,
            TargetCpu::X86Sse2 | TargetCpu::X86Sse4 => CpuFamily::X86,
            TargetCpu::X64Sse2 | TargetCpu::X64Sse4 | TargetCpu::Avx | TargetCpu::Avx2 => {
                CpuFamily::X64
            }
            TargetCpu::Wasm32 => CpuFamily::Wasm,
            TargetCpu::Armv7aNeon32 | TargetCpu::Thumb2Neon32 => CpuFamily::Arm32,
            TargetCpu::Armv8aAarch64 | TargetCpu::Armv8aAarch64Halffp | TargetCpu::Armv9a => {
                CpuFamily::Arm64
            }
        }
    }
}

impl fmt::Display for TargetCpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetCpu {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase();
        let cpu = match normalized.as_str() {
            "AUTO" => TargetCpu::Auto,
            "X86_SSE2" => TargetCpu::X86Sse2,
            "X86_SSE4" => TargetCpu::X86Sse4,
            "X64_SSE2" => TargetCpu::X64Sse2,
            "X64_SSE4" => TargetCpu::X64Sse4,
            "AVX" => TargetCpu::Avx,
            "AVX2" => TargetCpu::Avx2,
            "WASM32" => TargetCpu::Wasm32,
            "ARMV7A_NEON32" => TargetCpu::Armv7aNeon32,
            "ARMV8A_AARCH64" => TargetCpu::Armv8aAarch64,
            "THUMB2_NEON32" => TargetCpu::Thumb2Neon32,
            "ARMV8A_AARCH64_HALFFP" => TargetCpu::Armv8aAarch64Halffp,
            "ARMV9A" => TargetCpu::Armv9a,
            _ => return Err(CoreError::UnknownCpu(s.to_string())),
        };
        Ok(cpu)
    }
}

/// Architecture family grouping for combination splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CpuFamily {
    X86,
    X64,
    Arm32,
    Arm64,
    Wasm,
}

impl CpuFamily {
    /// Output subdirectory name for this family.
    pub fn directory(&self) -> &'static str {
        match self {
            CpuFamily::X86 => "x86",
            CpuFamily::X64 => "x86_64",
            CpuFamily::Arm32 => "arm32",
            CpuFamily::Arm64 => "arm64",
            CpuFamily::Wasm => "wasm32",
        }
    }
}

/// Target description handed in once per job by the surrounding build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildTargetSpec {
    /// Build target to compile for.
    pub target: BuildTarget,

    /// Development build: keeps debug data and enables debug-only options.
    pub development: bool,

    /// Final build output location (file or directory, per platform).
    pub output_path: PathBuf,
}
