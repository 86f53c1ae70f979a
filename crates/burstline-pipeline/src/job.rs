//! Job orchestration.
//!
//! `BurstJob` drives one compilation job end to end: validate the target,
//! resolve each manifest entry, invoke the compiler per combination, then
//! stage every surviving entry's artifacts. Entries run strictly one after
//! another; a failing entry is recorded and the rest continue.

use crate::compiler::{CompileRequest, CompilerInvoker};
use crate::error::{PipelineError, Result};
use crate::manifest::{JobManifest, StagingEntry};
use crate::stage::{
    collate_debug_information, collect_combination_outputs, pdbs_remain_in_build,
    reset_directory, stage_assembly_artifacts,
};
use burstline_core::{
    build_option_set, check_supported, resolve_target, AotSettings, BuildTarget, BuildTargetSpec,
    CompileInputs, EnvOverrides, PlatformSettings,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Job-wide configuration assembled by the caller.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Build target description for this job.
    pub target: BuildTargetSpec,

    /// Scratch area for per-combination compiler outputs; cleared and
    /// recreated at the start of each entry's pass.
    pub staging_area: PathBuf,

    /// Directory the compiler executable lives in; default location of the
    /// key and decode folders.
    pub compiler_home: PathBuf,

    /// Environment override snapshot taken once at startup.
    pub env: EnvOverrides,
}

/// Terminal state of one manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    /// Compiled and staged (possibly with nothing to copy).
    Staged,

    /// Gated out for this target; no compiler invocation happened.
    Skipped,

    /// A combination failed; the entry was not staged.
    Failed,
}

/// Per-entry slice of the job report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryReport {
    /// Assembly name.
    pub assembly: String,

    /// Terminal state of the entry.
    pub status: EntryStatus,

    /// Number of output combinations compiled.
    pub combinations: usize,

    /// Every artifact path staged for this entry.
    pub staged: Vec<PathBuf>,

    /// Non-fatal warnings recorded while building option sets.
    pub warnings: Vec<String>,

    /// Error message for failed entries.
    pub error: Option<String>,

    /// Entry duration in milliseconds.
    pub duration_ms: u64,
}

/// Terminal report of a complete job run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    /// Job ID.
    pub job_id: Uuid,

    /// Build target the job compiled for.
    pub target: BuildTarget,

    /// Whether this was a development build.
    pub development: bool,

    /// Wall-clock start time.
    pub started_at: DateTime<Utc>,

    /// Per-entry outcomes, in processing (name) order.
    pub entries: Vec<EntryReport>,

    /// Every artifact path copied during staging.
    pub staged_artifacts: Vec<PathBuf>,

    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

impl JobReport {
    /// Number of entries that compiled and staged.
    pub fn staged_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Staged)
            .count()
    }

    /// Number of entries that failed.
    pub fn failed_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Failed)
            .count()
    }

    /// Number of entries gated out of the target.
    pub fn skipped_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Skipped)
            .count()
    }
}

/// Outcome of one entry's compile pass.
enum EntryOutcome {
    Skipped { reason: String },
    Compiled { combinations: usize, warnings: Vec<String> },
}

/// One compilation job, driven sequentially over the manifest entries.
pub struct BurstJob {
    invoker: Arc<dyn CompilerInvoker>,
    config: JobConfig,
}

impl BurstJob {
    pub fn new(invoker: Arc<dyn CompilerInvoker>, config: JobConfig) -> Self {
        Self { invoker, config }
    }

    /// Execute the job described by `manifest`.
    ///
    /// Fails up front when the target itself cannot compile; per-entry
    /// failures are recorded in the report instead, and the job is an error
    /// only when every entry failed.
    pub async fn run(&self, manifest: &JobManifest) -> Result<JobReport> {
        let start = Instant::now();
        let started_at = Utc::now();
        let job_id = Uuid::new_v4();
        let target = self.config.target.target;

        // Target support is target-wide, so an unsupported target aborts
        // the whole job before any entry is touched.
        let (platform, _) = resolve_target(target);
        let platform_settings = manifest.platform_settings(platform);
        check_supported(target, &manifest.global, &platform_settings)?;

        let entries = manifest.staging_entries()?;
        info!(
            job_id = %job_id,
            target = %target,
            platform = %platform,
            entries = entries.len(),
            "starting compilation job"
        );

        // Compile pass: entries in name order, failures caught per entry.
        let mut reports: Vec<EntryReport> = Vec::new();
        for entry in &entries {
            let assembly = entry.definition.name.clone();
            let entry_start = Instant::now();

            let outcome = match self.compile_entry(entry, manifest, &platform_settings).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(assembly = %assembly, error = %e, "entry compilation failed");
                    reports.push(EntryReport {
                        assembly,
                        status: EntryStatus::Failed,
                        combinations: 0,
                        staged: Vec::new(),
                        warnings: Vec::new(),
                        error: Some(e.to_string()),
                        duration_ms: entry_start.elapsed().as_millis() as u64,
                    });
                    continue;
                }
            };

            match outcome {
                EntryOutcome::Skipped { reason } => {
                    info!(assembly = %assembly, reason = %reason, "entry skipped");
                    reports.push(EntryReport {
                        assembly,
                        status: EntryStatus::Skipped,
                        combinations: 0,
                        staged: Vec::new(),
                        warnings: Vec::new(),
                        error: None,
                        duration_ms: entry_start.elapsed().as_millis() as u64,
                    });
                }
                EntryOutcome::Compiled { combinations, warnings } => {
                    reports.push(EntryReport {
                        assembly,
                        status: EntryStatus::Staged,
                        combinations,
                        staged: Vec::new(),
                        warnings,
                        error: None,
                        duration_ms: entry_start.elapsed().as_millis() as u64,
                    });
                }
            }
        }

        // Staging pass: runs for every compiled entry even when others
        // failed, so partial successes still ship.
        for (entry, report) in entries.iter().zip(reports.iter_mut()) {
            if report.status != EntryStatus::Staged {
                continue;
            }
            let library_name = AotSettings::library_name(&entry.definition.name);
            match stage_assembly_artifacts(
                &manifest.library_dir,
                &library_name,
                &entry.staging_paths,
            ) {
                Ok(staged) => {
                    info!(
                        assembly = %entry.definition.name,
                        count = staged.len(),
                        "staged artifacts"
                    );
                    report.staged = staged;
                }
                Err(e) => {
                    error!(assembly = %entry.definition.name, error = %e, "staging failed");
                    report.status = EntryStatus::Failed;
                    report.error = Some(e.to_string());
                }
            }
        }

        // Post-staging housekeeping: move symbols out of shipping builds.
        let pdbs_remain = pdbs_remain_in_build(
            self.config.target.development,
            platform_settings.enable_debug_in_all_builds,
            platform,
        );
        let product = manifest.product_name.as_deref().unwrap_or("Build");
        match collate_debug_information(
            &manifest.library_dir,
            &self.config.target.output_path,
            product,
            pdbs_remain,
        ) {
            Ok(moved) if !moved.is_empty() => {
                info!(count = moved.len(), "relocated debug symbols out of the build");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "debug symbol collation failed"),
        }

        let staged_artifacts: Vec<PathBuf> = reports
            .iter()
            .flat_map(|r| r.staged.iter().cloned())
            .collect();
        let staged_entries = reports
            .iter()
            .filter(|r| r.status == EntryStatus::Staged)
            .count();
        let failed = reports
            .iter()
            .filter(|r| r.status == EntryStatus::Failed)
            .count();

        if !reports.is_empty() && failed == reports.len() {
            return Err(PipelineError::AllEntriesFailed { count: failed });
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            job_id = %job_id,
            staged_entries,
            failed_entries = failed,
            artifacts = staged_artifacts.len(),
            duration_ms,
            "compilation job finished"
        );

        Ok(JobReport {
            job_id,
            target,
            development: self.config.target.development,
            started_at,
            entries: reports,
            staged_artifacts,
            duration_ms,
        })
    }

    /// Compile every combination of one entry into the library directory.
    async fn compile_entry(
        &self,
        entry: &StagingEntry,
        manifest: &JobManifest,
        platform_settings: &PlatformSettings,
    ) -> Result<EntryOutcome> {
        let definition = &entry.definition;

        let mut defines = manifest.scripting_defines.clone();
        for define in definition.active_version_defines(&manifest.packages)? {
            if !defines.contains(&define) {
                defines.push(define);
            }
        }

        let aot = AotSettings::resolve(
            definition,
            self.config.target.target,
            &manifest.global,
            platform_settings,
            &defines,
            self.config.env,
        )?;

        if !aot.is_supported {
            return Ok(EntryOutcome::Skipped {
                reason: "gated out by platform or define constraints".to_string(),
            });
        }

        debug!(
            assembly = %definition.name,
            digest = %definition.defines_digest(&defines),
            combinations = aot.combinations.len(),
            "resolved assembly"
        );

        // Each entry gets a clean scratch area; the previous entry's
        // outputs were already collected into the library directory.
        reset_directory(&self.config.staging_area)?;
        let temp_folder = self.config.staging_area.join("tmp");
        std::fs::create_dir_all(&temp_folder)?;

        let compiled_assembly = locate_compiled_assembly(&definition.name, manifest);
        let mut assembly_folders: Vec<PathBuf> = vec![manifest.library_dir.clone()];
        assembly_folders.extend(manifest.assembly_search_paths.iter().cloned());

        let key_folder = manifest
            .key_folder
            .clone()
            .unwrap_or_else(|| self.config.compiler_home.clone());
        let decode_folder = manifest
            .decode_folder
            .clone()
            .unwrap_or_else(|| self.config.compiler_home.clone());

        let mut warnings = Vec::new();
        for combination in &aot.combinations {
            let output_path = self
                .config
                .staging_area
                .join(&combination.subdirectory)
                .join(&combination.library_name);

            let inputs = CompileInputs {
                key_folder: key_folder.clone(),
                decode_folder: decode_folder.clone(),
                assembly_folders: assembly_folders.clone(),
                compiled_assembly: compiled_assembly.clone(),
                defines: defines.clone(),
                output_path: output_path.clone(),
                temp_folder: temp_folder.clone(),
                pdb_search_paths: manifest.pdb_search_paths.clone(),
                link_xml_path: manifest.link_xml.clone(),
            };

            let option_set =
                build_option_set(definition, &self.config.target, &aot, combination, &inputs);
            for warning in &option_set.warnings {
                warn!(
                    assembly = %definition.name,
                    subdirectory = %combination.subdirectory,
                    "{warning}"
                );
            }
            warnings.extend(option_set.warnings.iter().cloned());

            info!(
                assembly = %definition.name,
                subdirectory = %combination.subdirectory,
                cpus = ?combination.cpus,
                "invoking compiler"
            );
            let request = CompileRequest {
                assembly_name: definition.name.clone(),
                combination: combination.clone(),
                option_set,
                output_path,
                incremental: !self.config.env.disable_incremental,
            };

            let output = self.invoker.compile(&request).await?;
            if !output.succeeded() {
                return Err(PipelineError::CompilationFailed {
                    assembly: definition.name.clone(),
                    subdirectory: combination.subdirectory.clone(),
                    exit_code: output.exit_code,
                    error_count: output.error_count(),
                    diagnostics: output.diagnostics,
                    stderr: output.stderr,
                });
            }

            collect_combination_outputs(&self.config.staging_area, combination, &manifest.library_dir)?;
        }

        Ok(EntryOutcome::Compiled {
            combinations: aot.combinations.len(),
            warnings,
        })
    }
}

/// Find an assembly's compiled output in the library directory or any of the
/// extra search paths.
fn locate_compiled_assembly(name: &str, manifest: &JobManifest) -> Option<PathBuf> {
    let file_name = format!("{name}.dll");
    std::iter::once(&manifest.library_dir)
        .chain(manifest.assembly_search_paths.iter())
        .map(|dir| dir.join(&file_name))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(statuses: &[EntryStatus]) -> JobReport {
        JobReport {
            job_id: Uuid::new_v4(),
            target: BuildTarget::StandaloneWindows64,
            development: false,
            started_at: Utc::now(),
            entries: statuses
                .iter()
                .enumerate()
                .map(|(i, &status)| EntryReport {
                    assembly: format!("Assembly{i}"),
                    status,
                    combinations: 1,
                    staged: Vec::new(),
                    warnings: Vec::new(),
                    error: None,
                    duration_ms: 1,
                })
                .collect(),
            staged_artifacts: Vec::new(),
            duration_ms: 2,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = report_with(&[
            EntryStatus::Staged,
            EntryStatus::Failed,
            EntryStatus::Skipped,
            EntryStatus::Staged,
        ]);
        assert_eq!(report.staged_count(), 2);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
    }

    #[test]
    fn test_report_serializes_to_json() {
        let report = report_with(&[EntryStatus::Staged]);
        let json = serde_json::to_string(&report).expect("serialize failed");
        assert!(json.contains("\"StandaloneWindows64\""));
        assert!(json.contains("\"Staged\""));
    }
}
