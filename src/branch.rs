//! Branches: the physical storage locations composing the union.
//!
//! A [`Branch`] is one backing directory plus the mode governing what the
//! union may do to it. Branches are immutable once constructed; changing the
//! branch set means publishing a whole new [`BranchTable`] through
//! [`crate::config::Config::replace`], never editing a live table in place.
//!
//! Administrators describe branches with the `PATH[=MODE]` syntax:
//!
//! ```text
//! /mnt/disk1          read-write (default)
//! /mnt/disk2=RO       read-only
//! /mnt/disk3=NC       writable, but no new files are placed here
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The ordered branch set. Always replaced wholesale, never mutated
/// element-by-element while visible to readers.
pub type BranchTable = Vec<Branch>;

/// What the union is allowed to do to a branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchMode {
    /// Full read-write access.
    #[default]
    #[serde(rename = "RW")]
    ReadWrite,
    /// No mutations of any kind.
    #[serde(rename = "RO")]
    ReadOnly,
    /// Existing files may be mutated, but no new files are created here.
    #[serde(rename = "NC")]
    NoCreate,
}

impl BranchMode {
    /// Short administrator-facing tag (`RW`, `RO`, `NC`).
    pub fn tag(&self) -> &'static str {
        match self {
            BranchMode::ReadWrite => "RW",
            BranchMode::ReadOnly => "RO",
            BranchMode::NoCreate => "NC",
        }
    }
}

impl fmt::Display for BranchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One physical backing location.
///
/// The root path is fixed for the branch's lifetime. Free space is never
/// stored here: it is re-queried at selection time through
/// [`crate::probe::BranchProbe`], so the record can never go stale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Physical root directory of this branch.
    pub path: PathBuf,
    /// Access mode.
    #[serde(default)]
    pub mode: BranchMode,
}

impl Branch {
    /// Create a branch record.
    pub fn new(path: impl Into<PathBuf>, mode: BranchMode) -> Self {
        Branch {
            path: path.into(),
            mode,
        }
    }

    /// Physical root directory.
    pub fn root(&self) -> &Path {
        &self.path
    }

    /// Whether existing files on this branch may be mutated.
    pub fn allows_mutation(&self) -> bool {
        self.mode != BranchMode::ReadOnly
    }

    /// Whether new files may be placed on this branch.
    pub fn allows_create(&self) -> bool {
        self.mode == BranchMode::ReadWrite
    }

    /// Join a logical union path onto this branch's physical root.
    ///
    /// Logical paths are absolute within the union (`/a/b`); the leading
    /// separator is stripped so the result stays under the branch root.
    pub fn full_path(&self, logical: &str) -> PathBuf {
        self.path.join(logical.trim_start_matches('/'))
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.path.display(), self.mode)
    }
}

/// Error parsing a `PATH[=MODE]` branch spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchParseError {
    /// The path portion was empty.
    EmptyPath,
    /// The `=MODE` suffix was not one of `RW`, `RO`, `NC`.
    UnknownMode(String),
}

impl fmt::Display for BranchParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchParseError::EmptyPath => write!(f, "branch spec has an empty path"),
            BranchParseError::UnknownMode(m) => {
                write!(f, "unknown branch mode '{}' (expected RW, RO, or NC)", m)
            }
        }
    }
}

impl std::error::Error for BranchParseError {}

impl FromStr for Branch {
    type Err = BranchParseError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let (path, mode) = match spec.rsplit_once('=') {
            Some((path, tag)) => {
                let mode = match tag {
                    "RW" => BranchMode::ReadWrite,
                    "RO" => BranchMode::ReadOnly,
                    "NC" => BranchMode::NoCreate,
                    other => return Err(BranchParseError::UnknownMode(other.to_string())),
                };
                (path, mode)
            }
            None => (spec, BranchMode::ReadWrite),
        };

        if path.is_empty() {
            return Err(BranchParseError::EmptyPath);
        }

        Ok(Branch::new(path, mode))
    }
}
