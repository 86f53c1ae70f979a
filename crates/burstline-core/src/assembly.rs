//! Assembly definition records.
//!
//! One record per compilable unit, deserialized from the build system's
//! JSON definition format and immutable afterwards. Gating (platform
//! include/exclude lists, define constraints, version-gated defines) is
//! evaluated here; nothing in this module touches the filesystem beyond
//! loading the record itself.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::digest;
use crate::error::{CoreError, Result};
use crate::target::BuildTarget;
use crate::version::{Version, VersionExpression};

/// A compile define activated when a package version matches an expression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VersionDefine {
    /// Package the expression is evaluated against.
    pub name: String,
    /// Interval version expression (see [`crate::version`]).
    pub expression: String,
    /// Define emitted when the expression matches.
    pub define: String,
}

/// One compilable unit as described by its JSON definition record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AssemblyDefinition {
    /// Unique assembly name; also the artifact base name.
    pub name: String,
    /// Compile with unsafe code allowed.
    pub allow_unsafe_code: bool,
    /// Referenced automatically by code that does not list references.
    pub auto_referenced: bool,
    /// Skip engine assembly references.
    pub no_engine_references: bool,
    /// Precompiled references are listed explicitly instead of inherited.
    pub override_references: bool,
    /// Root namespace for generated code.
    pub root_namespace: String,
    /// Defines that must all hold for the assembly to compile.
    pub define_constraints: Vec<String>,
    /// Names of referenced assembly definitions.
    pub references: Vec<String>,
    /// Paths of referenced precompiled assemblies.
    pub precompiled_references: Vec<String>,
    /// Legacy optional engine module references.
    pub optional_unity_references: Vec<String>,
    /// Platforms the assembly is limited to; empty means all.
    pub include_platforms: Vec<String>,
    /// Platforms the assembly is excluded from.
    pub exclude_platforms: Vec<String>,
    /// Version-gated compile defines.
    pub version_defines: Vec<VersionDefine>,
}

impl Default for AssemblyDefinition {
    fn default() -> Self {
        AssemblyDefinition {
            name: String::new(),
            allow_unsafe_code: false,
            // The definition format auto-references by default.
            auto_referenced: true,
            no_engine_references: false,
            override_references: false,
            root_namespace: String::new(),
            define_constraints: Vec::new(),
            references: Vec::new(),
            precompiled_references: Vec::new(),
            optional_unity_references: Vec::new(),
            include_platforms: Vec::new(),
            exclude_platforms: Vec::new(),
            version_defines: Vec::new(),
        }
    }
}

impl AssemblyDefinition {
    /// Deserialize a definition from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let definition: AssemblyDefinition = serde_json::from_str(json)?;
        if definition.name.is_empty() {
            return Err(CoreError::InvalidDefinition(
                "definition has no name".to_string(),
            ));
        }
        Ok(definition)
    }

    /// Load a definition record from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Whether this assembly participates in a build for `target`.
    ///
    /// A non-empty include list is an allow-list; otherwise the exclude
    /// list is consulted.
    pub fn is_included_for(&self, target: BuildTarget) -> bool {
        let platform = target.definition_platform();
        if !self.include_platforms.is_empty() {
            return self.include_platforms.iter().any(|p| p == platform);
        }
        !self.exclude_platforms.iter().any(|p| p == platform)
    }

    /// Whether every define constraint holds against the active define set.
    ///
    /// A leading `!` negates a constraint.
    pub fn constraints_satisfied(&self, defines: &[String]) -> bool {
        self.define_constraints.iter().all(|constraint| {
            match constraint.strip_prefix('!') {
                Some(negated) => !defines.iter().any(|d| d == negated),
                None => defines.iter().any(|d| d == constraint),
            }
        })
    }

    /// Evaluate version-gated defines against an installed-package inventory
    /// (package name to version string).
    ///
    /// A define is active when its package is present and the package
    /// version satisfies the expression. Absent packages deactivate the
    /// define; malformed expressions or versions are errors. Order follows
    /// the record, deduplicated.
    pub fn active_version_defines(
        &self,
        packages: &BTreeMap<String, String>,
    ) -> Result<Vec<String>> {
        let mut active: Vec<String> = Vec::new();
        for gate in &self.version_defines {
            let Some(installed) = packages.get(&gate.name) else {
                continue;
            };
            let expression = VersionExpression::parse(&gate.expression)?;
            let version = Version::parse(installed)?;
            if expression.matches(&version) && !active.contains(&gate.define) {
                active.push(gate.define.clone());
            }
        }
        Ok(active)
    }

    /// Stable digest of this assembly's effective define set, for change
    /// detection and log correlation.
    pub fn defines_digest(&self, defines: &[String]) -> String {
        digest::defines_digest(&self.name, defines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(json: &str) -> AssemblyDefinition {
        AssemblyDefinition::from_json(json).expect("parse definition")
    }

    #[test]
    fn test_from_json_minimal() {
        let def = definition(r#"{ "name": "Foo.Runtime" }"#);
        assert_eq!(def.name, "Foo.Runtime");
        assert!(def.auto_referenced, "auto-referenced defaults on");
        assert!(!def.allow_unsafe_code);
        assert!(def.include_platforms.is_empty());
    }

    #[test]
    fn test_from_json_full_record() {
        let def = definition(
            r#"{
                "name": "Foo",
                "allowUnsafeCode": true,
                "autoReferenced": false,
                "rootNamespace": "Foo.Native",
                "defineConstraints": ["ENABLE_FOO", "!DISABLE_FOO"],
                "references": ["Bar"],
                "precompiledReferences": ["Baz.dll"],
                "includePlatforms": ["WindowsStandalone64"],
                "versionDefines": [
                    { "name": "com.example.burst", "expression": "[1.4,2.0)", "define": "FOO_BURST_14" }
                ]
            }"#,
        );
        assert!(def.allow_unsafe_code);
        assert!(!def.auto_referenced);
        assert_eq!(def.root_namespace, "Foo.Native");
        assert_eq!(def.version_defines.len(), 1);
        assert_eq!(def.version_defines[0].define, "FOO_BURST_14");
    }

    #[test]
    fn test_from_json_rejects_missing_name() {
        assert!(AssemblyDefinition::from_json("{}").is_err());
        assert!(AssemblyDefinition::from_json("not json").is_err());
    }

    #[test]
    fn test_include_list_is_an_allow_list() {
        let def = definition(r#"{ "name": "Foo", "includePlatforms": ["WindowsStandalone64"] }"#);
        assert!(def.is_included_for(BuildTarget::StandaloneWindows64));
        assert!(!def.is_included_for(BuildTarget::StandaloneLinux64));
        assert!(!def.is_included_for(BuildTarget::Android));
    }

    #[test]
    fn test_exclude_list_applies_when_no_includes() {
        let def = definition(r#"{ "name": "Foo", "excludePlatforms": ["Android"] }"#);
        assert!(def.is_included_for(BuildTarget::StandaloneWindows64));
        assert!(!def.is_included_for(BuildTarget::Android));
    }

    #[test]
    fn test_constraints_with_negation() {
        let def = definition(
            r#"{ "name": "Foo", "defineConstraints": ["ENABLE_FOO", "!LEGACY_MODE"] }"#,
        );
        let active = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert!(def.constraints_satisfied(&active(&["ENABLE_FOO"])));
        assert!(!def.constraints_satisfied(&active(&[])));
        assert!(!def.constraints_satisfied(&active(&["ENABLE_FOO", "LEGACY_MODE"])));
    }

    #[test]
    fn test_version_defines_against_inventory() {
        let def = definition(
            r#"{
                "name": "Foo",
                "versionDefines": [
                    { "name": "com.example.burst", "expression": "[1.4,2.0)", "define": "FOO_BURST_14" },
                    { "name": "com.example.jobs", "expression": "0.9.0", "define": "FOO_JOBS" },
                    { "name": "com.example.absent", "expression": "1.0.0", "define": "FOO_ABSENT" }
                ]
            }"#,
        );
        let mut packages = BTreeMap::new();
        packages.insert("com.example.burst".to_string(), "1.8.4".to_string());
        packages.insert("com.example.jobs".to_string(), "0.8.0".to_string());

        let defines = def.active_version_defines(&packages).expect("evaluate");
        assert_eq!(defines, vec!["FOO_BURST_14".to_string()]);
    }

    #[test]
    fn test_version_defines_bad_expression_is_an_error() {
        let def = definition(
            r#"{
                "name": "Foo",
                "versionDefines": [
                    { "name": "com.example.burst", "expression": "[oops", "define": "D" }
                ]
            }"#,
        );
        let mut packages = BTreeMap::new();
        packages.insert("com.example.burst".to_string(), "1.0.0".to_string());
        assert!(def.active_version_defines(&packages).is_err());
    }

    #[test]
    fn test_defines_digest_matches_helper() {
        let def = definition(r#"{ "name": "Foo" }"#);
        let defines = vec!["B".to_string(), "A".to_string()];
        assert_eq!(
            def.defines_digest(&defines),
            crate::digest::defines_digest("Foo", &defines)
        );
    }
}
