//! Classification of the gap between a declared version and the latest one

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `[^|~]MAJOR.MINOR.PATCH[-pre][+build]`, pre-release and build are ignored
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\^~]?(\d+)\.(\d+)\.(\d+)(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?$")
        .expect("version pattern is valid")
});

/// How far a declared version lags behind the latest published version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferenceKind {
    Major,
    Minor,
    Patch,
    None,
    /// Either side is not a `major.minor.patch` version
    Invalid,
}

impl DifferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifferenceKind::Major => "major",
            DifferenceKind::Minor => "minor",
            DifferenceKind::Patch => "patch",
            DifferenceKind::None => "none",
            DifferenceKind::Invalid => "invalid",
        }
    }

    /// Severity rank, `None` for `Invalid` which does not order against the rest
    pub fn severity(&self) -> Option<u8> {
        match self {
            DifferenceKind::Major => Some(3),
            DifferenceKind::Minor => Some(2),
            DifferenceKind::Patch => Some(1),
            DifferenceKind::None => Some(0),
            DifferenceKind::Invalid => None,
        }
    }

    /// Whether the latest version is ahead of the declared one
    pub fn is_update(&self) -> bool {
        matches!(
            self,
            DifferenceKind::Major | DifferenceKind::Minor | DifferenceKind::Patch
        )
    }
}

impl std::fmt::Display for DifferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a version into its numeric triple.
///
/// A single character is treated as a bare major (`"5"` -> `5.0.0`).
fn parse_triple(version: &str) -> Option<[u64; 3]> {
    let padded;
    let version = if version.chars().count() == 1 {
        padded = format!("{version}.0.0");
        padded.as_str()
    } else {
        version
    };

    let caps = VERSION_RE.captures(version)?;
    let mut triple = [0u64; 3];
    for (slot, index) in triple.iter_mut().zip(1..=3) {
        *slot = caps.get(index)?.as_str().parse().ok()?;
    }
    Some(triple)
}

/// Compare a declared version against a (caret-prefixed) latest version.
///
/// The first of major, minor, patch that differs names the result. Inputs
/// that are not plain `major.minor.patch` versions yield `Invalid`.
pub fn compare(declared: &str, latest: &str) -> DifferenceKind {
    let (Some(declared), Some(latest)) = (parse_triple(declared), parse_triple(latest)) else {
        return DifferenceKind::Invalid;
    };

    const KINDS: [DifferenceKind; 3] = [
        DifferenceKind::Major,
        DifferenceKind::Minor,
        DifferenceKind::Patch,
    ];

    declared
        .iter()
        .zip(latest.iter())
        .zip(KINDS)
        .find(|((d, l), _)| d != l)
        .map(|(_, kind)| kind)
        .unwrap_or(DifferenceKind::None)
}
