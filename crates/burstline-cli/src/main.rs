//! Burstline - Burst AOT compilation job orchestrator
//!
//! The `burstline` command compiles already-built managed assemblies to
//! native code through the external `bcl` compiler and stages the results.
//!
//! ## Commands
//!
//! - `run`: Execute a compilation job from a manifest
//! - `combinations`: Show the output combinations a target resolves to
//! - `options`: Print the option set for one assembly and combination
//! - `validate`: Check a manifest and report each entry's disposition

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use burstline_core::{
    build_option_set, check_supported, collect_combinations, effective_cpus, resolve_target,
    AotSettings, BuildTarget, BuildTargetSpec, CompileInputs, EnvOverrides,
};
use burstline_pipeline::{
    init_tracing, verbosity_level, BclInvoker, BurstJob, EntryStatus, JobConfig, JobManifest,
};

#[derive(Parser)]
#[command(name = "burstline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Burst AOT compilation job orchestrator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a compilation job from a manifest
    Run {
        /// Path to the job manifest (JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Build target (e.g. StandaloneWindows64, Android)
        #[arg(short, long)]
        target: String,

        /// Release build (development is the default)
        #[arg(long)]
        release: bool,

        /// Final build output location
        #[arg(short, long)]
        output: PathBuf,

        /// Path to the bcl compiler executable
        #[arg(long, default_value = "bcl")]
        bcl: PathBuf,

        /// Scratch directory for compiler outputs (default: system temp)
        #[arg(long)]
        staging_area: Option<PathBuf>,

        /// Per-invocation timeout in seconds (0 = no timeout)
        #[arg(long, default_value = "0")]
        timeout_secs: u64,

        /// Write the job report as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show the output combinations a target resolves to
    Combinations {
        /// Build target (e.g. StandaloneWindows64, Android)
        #[arg(short, long)]
        target: String,

        /// Manifest supplying per-platform settings (optional)
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Assembly name used for library naming
        #[arg(short, long, default_value = "Assembly")]
        assembly: String,
    },

    /// Print the option set for one assembly and combination (dry run)
    Options {
        /// Path to the job manifest (JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Build target (e.g. StandaloneWindows64, Android)
        #[arg(short, long)]
        target: String,

        /// Assembly name from the manifest
        #[arg(short, long)]
        assembly: String,

        /// Combination index to print
        #[arg(short, long, default_value = "0")]
        combination: usize,

        /// Release build (development is the default)
        #[arg(long)]
        release: bool,

        /// Final build output location
        #[arg(short, long, default_value = "build")]
        output: PathBuf,

        /// Path to the bcl compiler executable
        #[arg(long, default_value = "bcl")]
        bcl: PathBuf,
    },

    /// Check a manifest and report each entry's disposition
    Validate {
        /// Path to the job manifest (JSON)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Build target (e.g. StandaloneWindows64, Android)
        #[arg(short, long)]
        target: String,

        /// Write the validation result as JSON to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.json, verbosity_level(cli.verbose));

    match cli.command {
        Commands::Run {
            manifest,
            target,
            release,
            output,
            bcl,
            staging_area,
            timeout_secs,
            report,
        } => {
            cmd_run(
                &manifest,
                &target,
                release,
                output,
                bcl,
                staging_area,
                timeout_secs,
                report.as_deref(),
            )
            .await
        }
        Commands::Combinations {
            target,
            manifest,
            assembly,
        } => cmd_combinations(&target, manifest.as_deref(), &assembly),
        Commands::Options {
            manifest,
            target,
            assembly,
            combination,
            release,
            output,
            bcl,
        } => cmd_options(&manifest, &target, &assembly, combination, release, output, &bcl),
        Commands::Validate {
            manifest,
            target,
            report,
        } => cmd_validate(&manifest, &target, report.as_deref()),
    }
}

/// Execute a compilation job from a manifest
#[allow(clippy::too_many_arguments)]
async fn cmd_run(
    manifest_path: &Path,
    target: &str,
    release: bool,
    output: PathBuf,
    bcl: PathBuf,
    staging_area: Option<PathBuf>,
    timeout_secs: u64,
    report_path: Option<&Path>,
) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let target: BuildTarget = target.parse().context("Unknown build target")?;
    info!(
        manifest = %manifest_path.display(),
        target = %target,
        release,
        "executing compilation job"
    );

    let compiler_home = bcl
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let staging_area =
        staging_area.unwrap_or_else(|| std::env::temp_dir().join("burstline-staging"));

    let config = JobConfig {
        target: BuildTargetSpec {
            target,
            development: !release,
            output_path: output,
        },
        staging_area,
        compiler_home,
        env: EnvOverrides::capture(),
    };

    let invoker = Arc::new(BclInvoker::new(bcl).with_timeout(timeout_secs));
    let job = BurstJob::new(invoker, config);

    let job_report = job
        .run(&manifest)
        .await
        .context("Compilation job failed")?;

    println!("Job {} ({})", job_report.job_id, job_report.target);
    for entry in &job_report.entries {
        let marker = match entry.status {
            EntryStatus::Staged => "✓",
            EntryStatus::Skipped => "-",
            EntryStatus::Failed => "✗",
        };
        println!(
            "  {} {} ({} combination(s), {}ms)",
            marker, entry.assembly, entry.combinations, entry.duration_ms
        );
        if let Some(error) = &entry.error {
            println!("      {}", error);
        }
    }
    println!(
        "Entries: {} staged, {} skipped, {} failed",
        job_report.staged_count(),
        job_report.skipped_count(),
        job_report.failed_count()
    );
    println!("Artifacts staged: {}", job_report.staged_artifacts.len());

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&job_report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {:?}", path))?;
        println!("Report written to {:?}", path);
    }

    Ok(())
}

/// Show the output combinations a target resolves to
fn cmd_combinations(target: &str, manifest_path: Option<&Path>, assembly: &str) -> Result<()> {
    let target: BuildTarget = target.parse().context("Unknown build target")?;
    let (platform, defaults) = resolve_target(target);
    let settings = match manifest_path {
        Some(path) => load_manifest(path)?.platform_settings(platform),
        None => Default::default(),
    };
    let cpus = effective_cpus(platform, &defaults, &settings)
        .context("Invalid CPU selection for target")?;
    let combinations = collect_combinations(
        platform,
        &cpus,
        &settings,
        &AotSettings::library_name(assembly),
    );

    println!("Target:   {}", target);
    println!("Platform: {}", platform);
    println!(
        "Defaults: {}",
        defaults
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();

    if combinations.is_empty() {
        println!("No output combinations.");
        return Ok(());
    }

    for combo in &combinations {
        let cpu_list = combo
            .cpus
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let note = if combo.force_line_only_debug {
            "  (line-only debug)"
        } else {
            ""
        };
        println!(
            "  {}/{}.{}  [{}]{}",
            combo.subdirectory,
            combo.library_name,
            platform.binary_extension(),
            cpu_list,
            note
        );
    }

    Ok(())
}

/// Print the option set for one assembly and combination (dry run)
fn cmd_options(
    manifest_path: &Path,
    target: &str,
    assembly: &str,
    combination_index: usize,
    release: bool,
    output: PathBuf,
    bcl: &Path,
) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let target: BuildTarget = target.parse().context("Unknown build target")?;
    let spec = BuildTargetSpec {
        target,
        development: !release,
        output_path: output,
    };

    let entries = manifest.staging_entries().context("Invalid manifest entries")?;
    let entry = entries
        .iter()
        .find(|e| e.definition.name == assembly)
        .with_context(|| format!("Assembly not found in manifest: {}", assembly))?;

    let mut defines = manifest.scripting_defines.clone();
    for define in entry
        .definition
        .active_version_defines(&manifest.packages)
        .context("Invalid version define")?
    {
        if !defines.contains(&define) {
            defines.push(define);
        }
    }

    let (platform, _) = resolve_target(target);
    let aot = AotSettings::resolve(
        &entry.definition,
        target,
        &manifest.global,
        &manifest.platform_settings(platform),
        &defines,
        EnvOverrides::capture(),
    )
    .context("Target resolution failed")?;

    if !aot.is_supported {
        anyhow::bail!("Assembly {} is gated out of target {}", assembly, target);
    }
    let combination = aot.combinations.get(combination_index).with_context(|| {
        format!(
            "Combination index {} out of range ({} available)",
            combination_index,
            aot.combinations.len()
        )
    })?;

    let compiler_home = bcl
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let staging_area = std::env::temp_dir().join("burstline-staging");

    let mut assembly_folders = vec![manifest.library_dir.clone()];
    assembly_folders.extend(manifest.assembly_search_paths.iter().cloned());

    let inputs = CompileInputs {
        key_folder: manifest.key_folder.clone().unwrap_or_else(|| compiler_home.clone()),
        decode_folder: manifest.decode_folder.clone().unwrap_or(compiler_home),
        assembly_folders,
        compiled_assembly: None,
        defines,
        output_path: staging_area
            .join(&combination.subdirectory)
            .join(&combination.library_name),
        temp_folder: staging_area.join("tmp"),
        pdb_search_paths: manifest.pdb_search_paths.clone(),
        link_xml_path: manifest.link_xml.clone(),
    };

    let option_set = build_option_set(&entry.definition, &spec, &aot, combination, &inputs);

    print!("{}", option_set.response_file_contents());
    for warning in &option_set.warnings {
        eprintln!("warning: {}", warning);
    }

    Ok(())
}

/// Validation summary written by `validate --report`.
#[derive(Debug, Clone, Serialize, PartialEq)]
struct ValidationOutput {
    target: String,
    platform: String,
    compilable: bool,
    compiled: Vec<String>,
    gated: Vec<String>,
    errors: Vec<String>,
}

/// Check a manifest and report each entry's disposition
fn cmd_validate(manifest_path: &Path, target: &str, report_path: Option<&Path>) -> Result<()> {
    let manifest = load_manifest(manifest_path)?;
    let target: BuildTarget = target.parse().context("Unknown build target")?;
    let (platform, _) = resolve_target(target);
    let platform_settings = manifest.platform_settings(platform);

    let mut output = ValidationOutput {
        target: target.to_string(),
        platform: platform.to_string(),
        compilable: true,
        compiled: Vec::new(),
        gated: Vec::new(),
        errors: Vec::new(),
    };

    println!("Manifest: {:?}", manifest_path);
    println!("Target:   {} ({})", target, platform);

    if let Err(e) = check_supported(target, &manifest.global, &platform_settings) {
        println!("Target is not compilable: {}", e);
        output.compilable = false;
        return write_validation_report(&output, report_path);
    }

    let entries = manifest.staging_entries().context("Invalid manifest entries")?;
    if entries.is_empty() {
        println!("No entries.");
        return write_validation_report(&output, report_path);
    }

    println!();
    for entry in &entries {
        let name = &entry.definition.name;
        let mut defines = manifest.scripting_defines.clone();
        let versioned = match entry.definition.active_version_defines(&manifest.packages) {
            Ok(versioned) => versioned,
            Err(e) => {
                println!("  ✗ {} (invalid version define: {})", name, e);
                output.errors.push(name.clone());
                continue;
            }
        };
        for define in versioned {
            if !defines.contains(&define) {
                defines.push(define);
            }
        }

        match AotSettings::resolve(
            &entry.definition,
            target,
            &manifest.global,
            &platform_settings,
            &defines,
            EnvOverrides::none(),
        ) {
            Ok(aot) if aot.is_supported => {
                let digest = entry.definition.defines_digest(&defines);
                println!(
                    "  ✓ {} ({} combination(s), defines {})",
                    name,
                    aot.combinations.len(),
                    &digest[..12.min(digest.len())]
                );
                output.compiled.push(name.clone());
            }
            Ok(_) => {
                println!("  - {} (gated out)", name);
                output.gated.push(name.clone());
            }
            Err(e) => {
                println!("  ✗ {} ({})", name, e);
                output.errors.push(name.clone());
            }
        }
    }

    write_validation_report(&output, report_path)
}

fn write_validation_report(output: &ValidationOutput, path: Option<&Path>) -> Result<()> {
    if let Some(path) = path {
        let json = serde_json::to_string_pretty(output)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {:?}", path))?;
        println!("Report written to {:?}", path);
    }
    Ok(())
}

fn load_manifest(path: &Path) -> Result<JobManifest> {
    JobManifest::from_file(path).with_context(|| format!("Failed to load manifest: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_manifest(dir: &Path) -> PathBuf {
        let json = serde_json::json!({
            "library_dir": "library",
            "scripting_defines": ["GAME"],
            "entries": [
                {
                    "definition": { "name": "Foo.Runtime" },
                    "staging_paths": ["plugins/Foo"],
                },
                {
                    "definition": {
                        "name": "Mobile.Only",
                        "includePlatforms": ["Android"],
                    },
                    "staging_paths": ["plugins/Mobile"],
                },
            ],
        });
        let path = dir.join("job.json");
        std::fs::write(&path, json.to_string()).expect("write manifest failed");
        path
    }

    #[test]
    fn test_cmd_validate_reports_dispositions() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let manifest = write_manifest(dir.path());
        let report = dir.path().join("validation.json");

        let result = cmd_validate(&manifest, "StandaloneWindows64", Some(&report));
        assert!(result.is_ok(), "validate failed: {:?}", result.err());

        let written = std::fs::read_to_string(&report).expect("report missing");
        let parsed: serde_json::Value =
            serde_json::from_str(&written).expect("report is not JSON");
        assert_eq!(parsed["compilable"], true);
        assert_eq!(parsed["compiled"][0], "Foo.Runtime");
        assert_eq!(parsed["gated"][0], "Mobile.Only");
        assert!(parsed["errors"].as_array().is_some_and(Vec::is_empty));
    }

    #[test]
    fn test_cmd_combinations_for_android() {
        let result = cmd_combinations("Android", None, "Foo.Runtime");
        assert!(result.is_ok(), "combinations failed: {:?}", result.err());
    }

    #[test]
    fn test_cmd_combinations_rejects_unknown_target() {
        let err = cmd_combinations("Amiga", None, "Foo").unwrap_err();
        assert!(format!("{err:#}").contains("Unknown build target"));
    }

    #[test]
    fn test_cmd_options_prints_option_set() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let manifest = write_manifest(dir.path());

        let result = cmd_options(
            &manifest,
            "StandaloneWindows64",
            "Foo.Runtime",
            0,
            false,
            PathBuf::from("build"),
            Path::new("bcl"),
        );
        assert!(result.is_ok(), "options failed: {:?}", result.err());
    }

    #[test]
    fn test_cmd_options_rejects_gated_assembly() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let manifest = write_manifest(dir.path());

        let err = cmd_options(
            &manifest,
            "StandaloneWindows64",
            "Mobile.Only",
            0,
            false,
            PathBuf::from("build"),
            Path::new("bcl"),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("gated out"));
    }

    #[test]
    fn test_cmd_options_rejects_bad_combination_index() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let manifest = write_manifest(dir.path());

        let err = cmd_options(
            &manifest,
            "StandaloneWindows64",
            "Foo.Runtime",
            7,
            false,
            PathBuf::from("build"),
            Path::new("bcl"),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("out of range"));
    }
}
