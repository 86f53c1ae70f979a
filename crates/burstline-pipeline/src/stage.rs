//! Artifact collation and staging.
//!
//! After compilation, each combination's outputs sit under the scratch area
//! in a per-combination subdirectory. Collation pulls them into the shared
//! library directory; staging copies the final `{name}_Burst.dll/.pdb/.txt`
//! triple into every destination directory an entry asks for. Both steps
//! overwrite on copy, so re-running a job converges to the same tree.

use crate::error::Result;
use burstline_core::OutputCombination;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions of the artifact triple produced per library.
const ARTIFACT_EXTENSIONS: [&str; 3] = ["dll", "pdb", "txt"];

/// Remove and recreate a scratch directory.
pub fn reset_directory(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Pull one combination's outputs from the scratch area into the library
/// directory, overwriting previous results. Returns the collected paths.
pub fn collect_combination_outputs(
    staging_area: &Path,
    combination: &OutputCombination,
    library_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(library_dir)?;
    let produced = staging_area.join(&combination.subdirectory);

    let mut collected = Vec::new();
    for extension in ARTIFACT_EXTENSIONS {
        let source = produced.join(format!("{}.{}", combination.library_name, extension));
        if !source.is_file() {
            debug!(path = %source.display(), "no combination output to collect");
            continue;
        }
        let destination = library_dir.join(format!("{}.{}", combination.library_name, extension));
        std::fs::copy(&source, &destination)?;
        collected.push(destination);
    }
    Ok(collected)
}

/// Copy an assembly's artifact triple from the library directory into every
/// destination directory. Returns every path written.
///
/// Missing optional artifacts are skipped. A missing primary binary yields
/// an empty result and a log line, not an error.
pub fn stage_assembly_artifacts(
    library_dir: &Path,
    library_name: &str,
    destinations: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    let primary = library_dir.join(format!("{library_name}.dll"));
    if !primary.is_file() {
        warn!(
            library = %library_name,
            path = %primary.display(),
            "primary binary missing, nothing to stage"
        );
        return Ok(Vec::new());
    }

    let mut staged = Vec::new();
    for destination_dir in destinations {
        std::fs::create_dir_all(destination_dir)?;
        for extension in ARTIFACT_EXTENSIONS {
            let file_name = format!("{library_name}.{extension}");
            let source = library_dir.join(&file_name);
            if !source.is_file() {
                debug!(path = %source.display(), "optional artifact missing, skipping");
                continue;
            }
            let destination = destination_dir.join(&file_name);
            std::fs::copy(&source, &destination)?;
            staged.push(destination);
        }
    }
    Ok(staged)
}

/// Whether debug symbols stay alongside the shipped binaries for this build.
pub fn pdbs_remain_in_build(
    development: bool,
    debug_in_all_builds: bool,
    platform: burstline_core::TargetPlatform,
) -> bool {
    development || debug_in_all_builds || platform == burstline_core::TargetPlatform::Uwp
}

/// Sweep debug symbols out of the library directory into the do-not-ship
/// folder next to the build output, unless symbols remain in the build.
/// Returns the moved paths.
pub fn collate_debug_information(
    library_dir: &Path,
    build_output_path: &Path,
    product_name: &str,
    pdbs_remain: bool,
) -> Result<Vec<PathBuf>> {
    if pdbs_remain {
        return Ok(Vec::new());
    }

    let parent = build_output_path.parent().unwrap_or_else(|| Path::new("."));
    let symbol_dir = parent.join(format!("{product_name}_BurstDebugInformation_DoNotShip"));
    std::fs::create_dir_all(&symbol_dir)?;

    let mut moved = Vec::new();
    for entry in std::fs::read_dir(library_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_pdb = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdb"))
            .unwrap_or(false);
        if !is_pdb || !path.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let destination = symbol_dir.join(&file_name);
        std::fs::copy(&path, &destination)?;
        std::fs::remove_file(&path)?;
        debug!(symbol = %destination.display(), "relocated debug symbols");
        moved.push(destination);
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burstline_core::{TargetCpu, TargetPlatform};

    fn combination(subdirectory: &str, library_name: &str) -> OutputCombination {
        OutputCombination {
            subdirectory: subdirectory.to_string(),
            library_name: library_name.to_string(),
            cpus: vec![TargetCpu::X64Sse2],
            force_line_only_debug: false,
            environment: Default::default(),
        }
    }

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create_dir_all failed");
        }
        std::fs::write(path, contents).expect("write failed");
    }

    #[test]
    fn test_reset_directory_clears_contents() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let scratch = dir.path().join("tmp");
        write(&scratch.join("stale.txt"), "old");

        reset_directory(&scratch).expect("reset failed");
        assert!(scratch.is_dir());
        assert!(!scratch.join("stale.txt").exists());

        // Absent directory is fine too.
        reset_directory(&dir.path().join("brand-new")).expect("reset failed");
    }

    #[test]
    fn test_collect_combination_outputs() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let staging_area = dir.path().join("staging");
        let library_dir = dir.path().join("library");
        write(&staging_area.join("x86_64/Foo_Burst.dll"), "binary");
        write(&staging_area.join("x86_64/Foo_Burst.pdb"), "symbols");

        let collected = collect_combination_outputs(
            &staging_area,
            &combination("x86_64", "Foo_Burst"),
            &library_dir,
        )
        .expect("collect failed");

        assert_eq!(collected.len(), 2);
        assert!(library_dir.join("Foo_Burst.dll").is_file());
        assert!(library_dir.join("Foo_Burst.pdb").is_file());
        assert!(!library_dir.join("Foo_Burst.txt").exists());
    }

    #[test]
    fn test_stage_copies_triple_to_every_destination() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let library_dir = dir.path().join("library");
        write(&library_dir.join("Foo_Burst.dll"), "binary");
        write(&library_dir.join("Foo_Burst.pdb"), "symbols");
        write(&library_dir.join("Foo_Burst.txt"), "log");

        let destinations = vec![dir.path().join("a"), dir.path().join("b/nested")];
        let staged = stage_assembly_artifacts(&library_dir, "Foo_Burst", &destinations)
            .expect("stage failed");

        assert_eq!(staged.len(), 6);
        for destination in &destinations {
            assert!(destination.join("Foo_Burst.dll").is_file());
            assert!(destination.join("Foo_Burst.pdb").is_file());
            assert!(destination.join("Foo_Burst.txt").is_file());
        }
    }

    #[test]
    fn test_stage_skips_missing_optional_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let library_dir = dir.path().join("library");
        write(&library_dir.join("Foo_Burst.dll"), "binary");

        let destinations = vec![dir.path().join("out")];
        let staged = stage_assembly_artifacts(&library_dir, "Foo_Burst", &destinations)
            .expect("stage failed");

        assert_eq!(staged.len(), 1);
        assert!(dir.path().join("out/Foo_Burst.dll").is_file());
        assert!(!dir.path().join("out/Foo_Burst.pdb").exists());
    }

    #[test]
    fn test_stage_without_primary_binary_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let library_dir = dir.path().join("library");
        std::fs::create_dir_all(&library_dir).expect("create failed");
        write(&library_dir.join("Foo_Burst.pdb"), "symbols");

        let destinations = vec![dir.path().join("out")];
        let staged = stage_assembly_artifacts(&library_dir, "Foo_Burst", &destinations)
            .expect("stage failed");

        assert!(staged.is_empty());
        assert!(!dir.path().join("out").exists() || !dir.path().join("out/Foo_Burst.pdb").exists());
    }

    #[test]
    fn test_stage_is_idempotent_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let library_dir = dir.path().join("library");
        write(&library_dir.join("Foo_Burst.dll"), "first");

        let destinations = vec![dir.path().join("out")];
        stage_assembly_artifacts(&library_dir, "Foo_Burst", &destinations).expect("stage failed");

        write(&library_dir.join("Foo_Burst.dll"), "second");
        let staged = stage_assembly_artifacts(&library_dir, "Foo_Burst", &destinations)
            .expect("stage failed");

        assert_eq!(staged.len(), 1);
        let contents =
            std::fs::read_to_string(dir.path().join("out/Foo_Burst.dll")).expect("read failed");
        assert_eq!(contents, "second");
    }

    #[test]
    fn test_pdbs_remain_in_build_rules() {
        assert!(pdbs_remain_in_build(true, false, TargetPlatform::Windows));
        assert!(pdbs_remain_in_build(false, true, TargetPlatform::Windows));
        assert!(pdbs_remain_in_build(false, false, TargetPlatform::Uwp));
        assert!(!pdbs_remain_in_build(false, false, TargetPlatform::Windows));
    }

    #[test]
    fn test_collate_moves_pdbs_when_not_shipping() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let library_dir = dir.path().join("library");
        write(&library_dir.join("Foo_Burst.dll"), "binary");
        write(&library_dir.join("Foo_Burst.pdb"), "symbols");
        let build_output = dir.path().join("Builds/Game.exe");
        std::fs::create_dir_all(build_output.parent().unwrap()).expect("create failed");

        let moved = collate_debug_information(&library_dir, &build_output, "Game", false)
            .expect("collate failed");

        assert_eq!(moved.len(), 1);
        let symbol_dir = dir.path().join("Builds/Game_BurstDebugInformation_DoNotShip");
        assert!(symbol_dir.join("Foo_Burst.pdb").is_file());
        assert!(!library_dir.join("Foo_Burst.pdb").exists());
        assert!(library_dir.join("Foo_Burst.dll").is_file());
    }

    #[test]
    fn test_collate_keeps_pdbs_for_development() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let library_dir = dir.path().join("library");
        write(&library_dir.join("Foo_Burst.pdb"), "symbols");
        let build_output = dir.path().join("Builds/Game.exe");

        let moved = collate_debug_information(&library_dir, &build_output, "Game", true)
            .expect("collate failed");

        assert!(moved.is_empty());
        assert!(library_dir.join("Foo_Burst.pdb").is_file());
    }
}
