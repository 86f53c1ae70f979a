//! SHA-256 helpers for stable content digests.

use sha2::{Digest, Sha256};

/// SHA256 hex digest of raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Stable digest of an assembly's effective define set.
///
/// Defines are sorted before hashing so their ordering in the source record
/// cannot change the digest; the assembly name is mixed in so two assemblies
/// with the same defines still digest differently.
pub fn defines_digest(assembly_name: &str, defines: &[String]) -> String {
    let mut sorted: Vec<&str> = defines.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let canonical = format!("{}\n{}", assembly_name, sorted.join(";"));
    sha256_hex(canonical.as_bytes())
}
