//! Process-wide configuration: the branch table, free-space threshold, and
//! active policies.
//!
//! # Concurrency Model
//!
//! The branch table sits behind a reader/writer lock. Every dispatch takes a
//! [`Config::snapshot`] (shared access) and holds it for the call's whole
//! duration, so the branch set a call observes cannot change mid-call. An
//! administrative [`Config::replace`] takes exclusive access: it waits for
//! in-flight dispatches to finish, then swaps in a complete new table. No
//! reader ever sees a partial table, and no live table is edited in place.
//!
//! The threshold and policy set are read once per dispatch and swap
//! atomically (`AtomicU64` / `ArcSwap`); a held policy snapshot is never
//! mutated underneath its holder.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::branch::{Branch, BranchParseError, BranchTable};
use crate::policy::PolicySet;

/// Shared mount configuration.
pub struct Config {
    /// The ordered branch set. Readers hold the guard for a full dispatch.
    branches: RwLock<BranchTable>,
    /// Minimum free bytes a branch must have to accept a mutation.
    min_free_space: AtomicU64,
    /// Active selection strategies per operation category.
    policies: ArcSwap<PolicySet>,
}

impl Config {
    /// Build a configuration from an initial branch table.
    pub fn new(branches: BranchTable, min_free_space: u64, policies: PolicySet) -> Self {
        Config {
            branches: RwLock::new(branches),
            min_free_space: AtomicU64::new(min_free_space),
            policies: ArcSwap::from_pointee(policies),
        }
    }

    /// Acquire shared access to the branch table.
    ///
    /// The returned guard is the dispatch's snapshot: it stays valid and
    /// unchanging until dropped, and any number may be held concurrently.
    pub fn snapshot(&self) -> RwLockReadGuard<'_, BranchTable> {
        self.branches.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the branch table wholesale.
    ///
    /// Blocks until every in-flight snapshot is released, then publishes the
    /// new table atomically. Dispatches already holding a snapshot complete
    /// against the table they acquired.
    pub fn replace(&self, new_table: BranchTable) {
        let mut guard = self.branches.write().unwrap_or_else(|e| e.into_inner());
        log::debug!(
            "branch table replaced: {} -> {} branches",
            guard.len(),
            new_table.len()
        );
        *guard = new_table;
    }

    /// Current free-space threshold in bytes.
    pub fn min_free_space(&self) -> u64 {
        self.min_free_space.load(Ordering::Acquire)
    }

    /// Update the free-space threshold.
    pub fn set_min_free_space(&self, bytes: u64) {
        self.min_free_space.store(bytes, Ordering::Release);
    }

    /// The active policy set. Later swaps are only observed by fresh loads.
    pub fn policies(&self) -> Arc<PolicySet> {
        self.policies.load_full()
    }

    /// Swap the active policy set.
    pub fn set_policies(&self, policies: PolicySet) {
        self.policies.store(Arc::new(policies));
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("branches", &*self.snapshot())
            .field("min_free_space", &self.min_free_space())
            .field("policies", &self.policies())
            .finish()
    }
}

/// On-disk configuration file (JSON).
///
/// ```json
/// {
///   "branches": [
///     { "path": "/mnt/disk1" },
///     { "path": "/mnt/disk2", "mode": "RO" }
///   ],
///   "min_free_space": 4294967296
/// }
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Branch records in mount order.
    pub branches: Vec<Branch>,
    /// Free-space threshold in bytes.
    #[serde(default)]
    pub min_free_space: u64,
    /// Selection strategies; defaults apply when omitted.
    #[serde(default)]
    pub policies: PolicySet,
}

impl ConfigFile {
    /// Load and parse a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut raw = String::new();
        std::fs::File::open(path)
            .and_then(|mut f| f.read_to_string(&mut raw))
            .map_err(ConfigError::Io)?;
        let parsed: ConfigFile = serde_json::from_str(&raw).map_err(ConfigError::Parse)?;
        if parsed.branches.is_empty() {
            return Err(ConfigError::NoBranches);
        }
        Ok(parsed)
    }

    /// Build a configuration from CLI `PATH[=MODE]` specs.
    pub fn from_specs(
        specs: &[String],
        min_free_space: u64,
    ) -> Result<Self, ConfigError> {
        if specs.is_empty() {
            return Err(ConfigError::NoBranches);
        }
        let branches = specs
            .iter()
            .map(|s| s.parse::<Branch>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConfigError::Branch)?;
        Ok(ConfigFile {
            branches,
            min_free_space,
            policies: PolicySet::default(),
        })
    }

    /// Turn the parsed file into live configuration state.
    pub fn into_config(self) -> Config {
        Config::new(self.branches, self.min_free_space, self.policies)
    }
}

/// Error loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Reading the file failed.
    Io(std::io::Error),
    /// The file was not valid JSON for [`ConfigFile`].
    Parse(serde_json::Error),
    /// A CLI branch spec did not parse.
    Branch(BranchParseError),
    /// No branches were given; a union needs at least one.
    NoBranches,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config: {}", e),
            ConfigError::Parse(e) => write!(f, "cannot parse config: {}", e),
            ConfigError::Branch(e) => write!(f, "bad branch spec: {}", e),
            ConfigError::NoBranches => write!(f, "no branches configured"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Branch(e) => Some(e),
            ConfigError::NoBranches => None,
        }
    }
}
