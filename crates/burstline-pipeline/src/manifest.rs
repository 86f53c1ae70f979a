//! Job manifest loading and validation.
//!
//! The manifest is the JSON input describing one compilation job: which
//! assemblies to compile (inline definitions or paths to definition files),
//! where the upstream build staged the managed binaries, and any per-platform
//! settings overrides. Relative paths inside a manifest file are resolved
//! against the directory the manifest was loaded from.

use crate::error::{PipelineError, Result};
use burstline_core::{AssemblyDefinition, GlobalSettings, PlatformSettings, TargetPlatform};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One assembly entry in the job manifest.
///
/// Exactly one of `definition` (inline record) or `definition_path`
/// (path to an assembly-definition JSON file) must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestEntry {
    /// Inline assembly definition.
    pub definition: Option<AssemblyDefinition>,

    /// Path to an assembly-definition JSON file.
    pub definition_path: Option<PathBuf>,

    /// Destination directories the compiled artifacts are staged into.
    pub staging_paths: Vec<PathBuf>,
}

/// A validated, loaded manifest entry ready for the job loop.
#[derive(Debug, Clone)]
pub struct StagingEntry {
    pub definition: AssemblyDefinition,
    pub staging_paths: Vec<PathBuf>,
}

/// Input manifest for one compilation job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobManifest {
    /// Assemblies to compile.
    pub entries: Vec<ManifestEntry>,

    /// Directory where the upstream build staged the managed assemblies.
    pub library_dir: PathBuf,

    /// Extra directories searched for referenced assemblies.
    pub assembly_search_paths: Vec<PathBuf>,

    /// Extra directories searched for debug symbols.
    pub pdb_search_paths: Vec<PathBuf>,

    /// Path where the compiler writes its link.xml fragment, when set.
    pub link_xml: Option<PathBuf>,

    /// Installed package versions, used to evaluate version defines.
    pub packages: BTreeMap<String, String>,

    /// Scripting defines active for the build, shared by every entry.
    pub scripting_defines: Vec<String>,

    /// Project-wide settings.
    pub global: GlobalSettings,

    /// Per-platform settings overrides, keyed by platform name
    /// (e.g. `"Windows"`, `"Android"`).
    pub platforms: BTreeMap<String, PlatformSettings>,

    /// Override for the compiler key folder (defaults to the compiler home).
    pub key_folder: Option<PathBuf>,

    /// Override for the compiler decode folder (defaults to the compiler home).
    pub decode_folder: Option<PathBuf>,

    /// Product name used for the debug-information folder.
    pub product_name: Option<String>,
}

impl JobManifest {
    /// Parse a manifest from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: JobManifest = serde_json::from_str(json)?;
        Ok(manifest)
    }

    /// Load a manifest from a file, resolving relative paths against the
    /// file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut manifest = Self::from_json(&contents)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.library_dir = resolve_path(base, &manifest.library_dir);
        manifest.assembly_search_paths = manifest
            .assembly_search_paths
            .iter()
            .map(|p| resolve_path(base, p))
            .collect();
        manifest.pdb_search_paths = manifest
            .pdb_search_paths
            .iter()
            .map(|p| resolve_path(base, p))
            .collect();
        manifest.link_xml = manifest.link_xml.as_deref().map(|p| resolve_path(base, p));
        for entry in &mut manifest.entries {
            entry.definition_path = entry
                .definition_path
                .as_deref()
                .map(|p| resolve_path(base, p));
            entry.staging_paths = entry
                .staging_paths
                .iter()
                .map(|p| resolve_path(base, p))
                .collect();
        }

        Ok(manifest)
    }

    /// Settings for one platform, falling back to defaults when the manifest
    /// carries no override for it.
    pub fn platform_settings(&self, platform: TargetPlatform) -> PlatformSettings {
        self.platforms
            .get(platform.as_str())
            .cloned()
            .unwrap_or_default()
    }

    /// Validate and load every entry, returning them sorted by assembly name.
    ///
    /// Entries with a `definition_path` are read from disk here. Duplicate
    /// assembly names and entries with zero or two definition sources are
    /// rejected.
    pub fn staging_entries(&self) -> Result<Vec<StagingEntry>> {
        let mut entries = Vec::with_capacity(self.entries.len());
        let mut seen = std::collections::HashSet::new();

        for (index, entry) in self.entries.iter().enumerate() {
            let definition = match (&entry.definition, &entry.definition_path) {
                (Some(definition), None) => definition.clone(),
                (None, Some(path)) => AssemblyDefinition::from_file(path)
                    .map_err(PipelineError::Core)?,
                (Some(_), Some(_)) => {
                    return Err(PipelineError::InvalidManifest(format!(
                        "entry {index} sets both definition and definition_path"
                    )));
                }
                (None, None) => {
                    return Err(PipelineError::InvalidManifest(format!(
                        "entry {index} sets neither definition nor definition_path"
                    )));
                }
            };

            if !seen.insert(definition.name.clone()) {
                return Err(PipelineError::InvalidManifest(format!(
                    "duplicate assembly entry: {}",
                    definition.name
                )));
            }

            entries.push(StagingEntry {
                definition,
                staging_paths: entry.staging_paths.clone(),
            });
        }

        entries.sort_by(|a, b| a.definition.name.cmp(&b.definition.name));
        Ok(entries)
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
