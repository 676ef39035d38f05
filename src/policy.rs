//! Branch selection policies.
//!
//! A policy maps (branch table snapshot, logical path, free-space threshold)
//! to an ordered list of branch indices, or a [`SelectionError`] when no
//! branch is eligible. Policies are a small closed set of tagged strategies,
//! in three families:
//!
//! - **search** — where does the path currently exist? Filtered only by
//!   existence; ordering follows the table.
//! - **action** — which existing copies may receive a mutation? The search
//!   result, minus branches that are read-only or below the free-space
//!   threshold. Search ordering is preserved: callers depend on a stable
//!   visitation order for side-effecting actions.
//! - **create** — where should a *new* file be placed? Operates on the whole
//!   table, not on existing copies.
//!
//! Policies never mutate shared state and are deterministic given identical
//! inputs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::Errno;
use crate::branch::Branch;
use crate::probe::BranchProbe;

/// Why no branch was eligible.
///
/// When action filtering rejects branches for different reasons the retained
/// reason follows a fixed precedence: `NotFound < ReadOnly < NoSpace`. The
/// caller then sees the most actionable explanation (a copy existed but no
/// branch could take the write) rather than a bare "not found".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionError {
    /// The path exists on no branch.
    NotFound,
    /// Copies exist, but every holding branch is read-only.
    ReadOnly,
    /// Copies exist on writable branches, but none has enough free space.
    NoSpace,
}

impl SelectionError {
    /// POSIX errno for this failure.
    pub fn errno(&self) -> Errno {
        match self {
            SelectionError::NotFound => libc::ENOENT,
            SelectionError::ReadOnly => libc::EROFS,
            SelectionError::NoSpace => libc::ENOSPC,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SelectionError::NotFound => 0,
            SelectionError::ReadOnly => 1,
            SelectionError::NoSpace => 2,
        }
    }

    /// Keep the higher-precedence of two rejection reasons.
    fn upgrade(self, other: SelectionError) -> SelectionError {
        if other.rank() > self.rank() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for SelectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionError::NotFound => write!(f, "path not found on any branch"),
            SelectionError::ReadOnly => write!(f, "no writable branch holds the path"),
            SelectionError::NoSpace => write!(f, "no holding branch has enough free space"),
        }
    }
}

impl std::error::Error for SelectionError {}

/// Search family: locate existing copies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPolicy {
    /// Every branch holding the path, in table order.
    #[default]
    All,
    /// Only the first branch holding the path.
    FirstFound,
}

impl SearchPolicy {
    /// Branch indices currently holding `path`, in table order.
    pub fn select(
        &self,
        table: &[Branch],
        probe: &dyn BranchProbe,
        path: &str,
    ) -> Result<Vec<usize>, SelectionError> {
        let mut selected = Vec::new();

        for (idx, branch) in table.iter().enumerate() {
            if probe.exists(branch, path) {
                selected.push(idx);
                if *self == SearchPolicy::FirstFound {
                    break;
                }
            }
        }

        if selected.is_empty() {
            return Err(SelectionError::NotFound);
        }
        Ok(selected)
    }
}

/// Action family: existing copies eligible to receive a mutation.
///
/// Defined as the underlying search result with ineligible branches dropped:
/// a read-only branch cannot take the mutation, and a branch below the
/// free-space threshold is skipped so the write cannot wedge it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPolicy {
    /// The search strategy supplying candidates.
    #[serde(default)]
    pub search: SearchPolicy,
}

impl ActionPolicy {
    /// Eligible branch indices in the search policy's order.
    pub fn select(
        &self,
        table: &[Branch],
        probe: &dyn BranchProbe,
        path: &str,
        min_free_space: u64,
    ) -> Result<Vec<usize>, SelectionError> {
        let candidates = self.search.select(table, probe, path)?;

        let mut reason = SelectionError::NotFound;
        let mut selected = Vec::with_capacity(candidates.len());

        for idx in candidates {
            let branch = &table[idx];
            if !branch.allows_mutation() {
                reason = reason.upgrade(SelectionError::ReadOnly);
                continue;
            }
            if probe.free_space(branch) < min_free_space {
                reason = reason.upgrade(SelectionError::NoSpace);
                continue;
            }
            selected.push(idx);
        }

        if selected.is_empty() {
            return Err(reason);
        }
        Ok(selected)
    }
}

/// Create family: placing new files.
///
/// Named as a sibling of search/action and consumed through the same shape of
/// interface; only the one strategy the dispatcher needs is provided here.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreatePolicy {
    /// The writable branch with the most free space, threshold permitting.
    /// Ties keep the earliest branch, so placement stays deterministic.
    #[default]
    MostFreeSpace,
}

impl CreatePolicy {
    /// Index of the branch that should receive a new file.
    pub fn select(
        &self,
        table: &[Branch],
        probe: &dyn BranchProbe,
        min_free_space: u64,
    ) -> Result<usize, SelectionError> {
        let CreatePolicy::MostFreeSpace = *self;

        let mut reason = SelectionError::NotFound;
        let mut best: Option<(usize, u64)> = None;

        for (idx, branch) in table.iter().enumerate() {
            if !branch.allows_create() {
                reason = reason.upgrade(SelectionError::ReadOnly);
                continue;
            }
            let free = probe.free_space(branch);
            if free < min_free_space {
                reason = reason.upgrade(SelectionError::NoSpace);
                continue;
            }
            if best.map_or(true, |(_, best_free)| free > best_free) {
                best = Some((idx, free));
            }
        }

        match best {
            Some((idx, _)) => Ok(idx),
            None => Err(reason),
        }
    }
}

/// The active strategy per operation category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    /// Read-side lookups.
    #[serde(default)]
    pub search: SearchPolicy,
    /// Metadata/content mutations on existing files.
    #[serde(default)]
    pub action: ActionPolicy,
    /// Placement of new files.
    #[serde(default)]
    pub create: CreatePolicy,
}
