//! Option-set construction for one compiler invocation.
//!
//! `build_option_set` is a pure function: identical inputs yield a
//! byte-identical token sequence. Relative token order is fixed and load
//! bearing, since response files are diffed across runs to detect
//! configuration drift. All filesystem knowledge arrives pre-resolved in
//! [`CompileInputs`].

use std::fmt::Display;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::assembly::AssemblyDefinition;
use crate::resolve::{AotSettings, OutputCombination};
use crate::settings::{DebugDataKind, OptimizeFor};
use crate::target::{BuildTargetSpec, TargetPlatform};

/// Filesystem inputs for one invocation, gathered by the orchestrator so
/// option building itself does no I/O.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileInputs {
    /// Compiler key folder.
    pub key_folder: PathBuf,

    /// Compiler decode folder.
    pub decode_folder: PathBuf,

    /// Assembly search folders, in discovery order.
    pub assembly_folders: Vec<PathBuf>,

    /// Located compiled output of the assembly being processed, if found.
    pub compiled_assembly: Option<PathBuf>,

    /// Effective compile defines for the assembly.
    pub defines: Vec<String>,

    /// Output path for this combination's binary, without extension.
    pub output_path: PathBuf,

    /// Compiler scratch folder.
    pub temp_folder: PathBuf,

    /// Additional debug-symbol search paths.
    pub pdb_search_paths: Vec<PathBuf>,

    /// Where the compiler should write its linker descriptor, if anywhere.
    pub link_xml_path: Option<PathBuf>,
}

/// Ordered option tokens for one invocation, plus any non-fatal warnings
/// recorded while assembling them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OptionSet {
    pub tokens: Vec<String>,
    pub warnings: Vec<String>,
}

impl OptionSet {
    /// Response-file rendition: one token per line, trailing newline.
    pub fn response_file_contents(&self) -> String {
        let mut contents = self.tokens.join("\n");
        contents.push('\n');
        contents
    }
}

fn opt(name: &str, value: impl Display) -> String {
    format!("--{}={}", name, value)
}

fn flag(name: &str) -> String {
    format!("--{}", name)
}

/// Build the option set for one (assembly, combination) invocation.
pub fn build_option_set(
    assembly: &AssemblyDefinition,
    target: &BuildTargetSpec,
    aot: &AotSettings,
    combination: &OutputCombination,
    inputs: &CompileInputs,
) -> OptionSet {
    let mut tokens: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();
    let settings = &aot.settings;

    tokens.push(opt("key-folder", inputs.key_folder.display()));
    tokens.push(opt("decode-folder", inputs.decode_folder.display()));
    tokens.push(opt("platform", aot.platform));

    // Search folders, deduplicated but in discovery order.
    let mut seen: Vec<&PathBuf> = Vec::new();
    for folder in &inputs.assembly_folders {
        if seen.contains(&folder) {
            continue;
        }
        seen.push(folder);
        tokens.push(opt("assembly-folder", folder.display()));
    }

    // A missing compiled output degrades the set instead of failing it:
    // the compiler still runs so sibling assemblies keep their schedule.
    match &inputs.compiled_assembly {
        Some(compiled) => {
            tokens.push(opt("root-assembly", compiled.display()));
            tokens.push(opt("assembly-defines", defines_value(assembly, &inputs.defines)));
        }
        None => {
            warnings.push(format!(
                "no compiled output found for assembly {}; root-assembly and assembly-defines omitted",
                assembly.name
            ));
        }
    }

    for cpu in &combination.cpus {
        tokens.push(opt("target", cpu));
    }

    tokens.push(opt("output", inputs.output_path.display()));
    tokens.push(opt("temp-folder", inputs.temp_folder.display()));

    if aot.platform.requires_static_linkage() {
        tokens.push(flag("generate-static-linkage-methods"));
    }

    if aot.platform == TargetPlatform::Windows {
        tokens.push(opt(
            "linker-options",
            format!(
                "PdbAltPath=\"{lib}/{lib}.pdb\"",
                lib = combination.library_name
            ),
        ));
    }

    for path in &inputs.pdb_search_paths {
        tokens.push(opt("pdb-search-paths", path.display()));
    }

    // Escape hatch, not default behavior: requires both the development
    // build and the explicit environment override.
    if target.development && aot.env.force_safety_checks {
        tokens.push(opt("global-safety-checks-setting", "ForceOn"));
    }

    if let Some(link_xml) = &inputs.link_xml_path {
        tokens.push(opt("generate-link-xml", link_xml.display()));
    }

    if target.development || settings.enable_debug_in_all_builds {
        // The combination workaround wins over the requested kind.
        let kind = if combination.force_line_only_debug {
            DebugDataKind::LineOnly
        } else {
            settings.debug_data_kind
        };
        tokens.push(opt("debug", kind));
    }

    if !settings.disabled_warnings.is_empty() {
        tokens.push(opt("disable-warnings", settings.disabled_warnings.join(";")));
    }

    if !settings.enable_optimizations {
        tokens.push(flag("disable-opt"));
    } else {
        match settings.optimize_for {
            OptimizeFor::Default | OptimizeFor::Balanced => tokens.push(opt("opt-level", 2)),
            OptimizeFor::Performance => tokens.push(opt("opt-level", 3)),
            OptimizeFor::Size => {
                tokens.push(flag("opt-for-size"));
                tokens.push(opt("opt-level", 3));
            }
            OptimizeFor::FastCompilation => tokens.push(opt("opt-level", 1)),
        }
    }

    if aot.debugging {
        tokens.push(flag("debug-logging"));
    }

    for name in &settings.disabled_assemblies {
        tokens.push(opt("discard-assemblies", name));
    }

    tokens.extend(settings.extra_compiler_options.iter().cloned());

    OptionSet { tokens, warnings }
}

fn defines_value(assembly: &AssemblyDefinition, defines: &[String]) -> String {
    if defines.is_empty() {
        assembly.name.clone()
    } else {
        format!("{};{}", assembly.name, defines.join(";"))
    }
}
