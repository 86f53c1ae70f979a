//! Package version parsing and interval expression matching.
//!
//! Version-gated defines use mathematical interval notation against package
//! versions: a bare `1.2.3` matches that version or anything newer,
//! `[1.2,3.4]` is a closed range, `(1.2,3.4)` an open one, and mixed
//! brackets give half-open ranges. `[1.2.3]` pins an exact version.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{CoreError, Result};

/// Package version: MAJOR.MINOR.PATCH with an optional prerelease tag.
///
/// Missing components parse as zero (`1.3` is `1.3.0`), matching how range
/// bounds are commonly written. Build metadata after `+` is accepted and
/// ignored for ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

impl Version {
    /// Parse a version string.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoreError::InvalidVersion("empty version".to_string()));
        }

        // Strip build metadata.
        let s = match s.find('+') {
            Some(pos) => &s[..pos],
            None => s,
        };

        // Split off the prerelease tag.
        let (core, prerelease) = match s.find('-') {
            Some(pos) => (&s[..pos], Some(s[pos + 1..].to_string())),
            None => (s, None),
        };

        let mut parts = core.split('.');
        let major = Self::component(parts.next(), s)?;
        let minor = match parts.next() {
            Some(p) => Self::component(Some(p), s)?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(p) => Self::component(Some(p), s)?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(CoreError::InvalidVersion(format!(
                "too many components in '{}'",
                s
            )));
        }

        Ok(Version {
            major,
            minor,
            patch,
            prerelease,
        })
    }

    fn component(part: Option<&str>, original: &str) -> Result<u64> {
        let part = part.unwrap_or_default();
        part.parse().map_err(|_| {
            CoreError::InvalidVersion(format!("bad component '{}' in '{}'", part, original))
        })
    }

    /// Create a version from numeric components.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Version {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }
        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.major.cmp(&other.major) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match self.minor.cmp(&other.minor) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match self.patch.cmp(&other.patch) {
            Ordering::Equal => {}
            ord => return ord,
        }
        // A prerelease sorts below the plain release of the same version.
        match (&self.prerelease, &other.prerelease) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(a), Some(b)) => a.cmp(b),
        }
    }
}

/// One end of a version interval.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Bound {
    Inclusive(Version),
    Exclusive(Version),
    Unbounded,
}

/// A parsed version interval expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionExpression {
    lower: Bound,
    upper: Bound,
}

impl VersionExpression {
    /// Parse an interval expression string.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoreError::InvalidVersionExpression(
                "empty expression".to_string(),
            ));
        }

        let lower_inclusive = match s.chars().next() {
            Some('[') => Some(true),
            Some('(') => Some(false),
            _ => None,
        };

        // Bare version: that version or newer.
        let Some(lower_inclusive) = lower_inclusive else {
            let version = Version::parse(s)?;
            return Ok(VersionExpression {
                lower: Bound::Inclusive(version),
                upper: Bound::Unbounded,
            });
        };

        let upper_inclusive = match s.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => {
                return Err(CoreError::InvalidVersionExpression(format!(
                    "unterminated interval '{}'",
                    s
                )))
            }
        };

        let inner = &s[1..s.len() - 1];
        let parts: Vec<&str> = inner.split(',').collect();
        match parts.as_slice() {
            // `[1.2.3]` pins an exact version; exclusive brackets make no sense here.
            [single] => {
                if !lower_inclusive || !upper_inclusive {
                    return Err(CoreError::InvalidVersionExpression(format!(
                        "exact interval must use square brackets: '{}'",
                        s
                    )));
                }
                let version = Version::parse(single)?;
                Ok(VersionExpression {
                    lower: Bound::Inclusive(version.clone()),
                    upper: Bound::Inclusive(version),
                })
            }
            [low, high] => {
                let lower = Self::bound(low, lower_inclusive)?;
                let upper = Self::bound(high, upper_inclusive)?;
                if let (Bound::Unbounded, Bound::Unbounded) = (&lower, &upper) {
                    return Err(CoreError::InvalidVersionExpression(format!(
                        "interval with no bounds: '{}'",
                        s
                    )));
                }
                Ok(VersionExpression { lower, upper })
            }
            _ => Err(CoreError::InvalidVersionExpression(format!(
                "expected one or two bounds in '{}'",
                s
            ))),
        }
    }

    fn bound(part: &str, inclusive: bool) -> Result<Bound> {
        let part = part.trim();
        if part.is_empty() {
            return Ok(Bound::Unbounded);
        }
        let version = Version::parse(part)?;
        Ok(if inclusive {
            Bound::Inclusive(version)
        } else {
            Bound::Exclusive(version)
        })
    }

    /// Check whether a version falls inside this interval.
    pub fn matches(&self, version: &Version) -> bool {
        let lower_ok = match &self.lower {
            Bound::Inclusive(v) => version >= v,
            Bound::Exclusive(v) => version > v,
            Bound::Unbounded => true,
        };
        let upper_ok = match &self.upper {
            Bound::Inclusive(v) => version <= v,
            Bound::Exclusive(v) => version < v,
            Bound::Unbounded => true,
        };
        lower_ok && upper_ok
    }
}
