//! The dispatch core: one logical call, many physical branches, one result.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     incoming call (path, caller)             │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ UgidScope         impersonate caller (restored on all exits) │
//! │ Config::snapshot  shared access, held for the whole call     │
//! │ Policy::select    ordered branch indices, or ENOENT/EROFS/…  │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │ for each selected branch, in order:                          │
//! │     op(branch, path) → Ok | errno                            │
//! │     aggregate = aggregate.combine(outcome)                   │
//! │ (every branch is visited; no short-circuit on failure)       │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                   aggregate → Ok(()) | Err(errno)
//! ```
//!
//! A mutation is attempted on **every** branch holding the path so the
//! physical copies stay consistent with each other, not just with whichever
//! branch happens to answer first. Calls that carry an open-file binding
//! never come through here — see [`crate::handle`].

use crate::aggregate::{Aggregate, Errno};
use crate::branch::Branch;
use crate::config::Config;
use crate::probe::BranchProbe;
use crate::ugid::{Credentials, Ugid, UgidScope};

/// Executes logical calls against the configured branch set.
///
/// Borrowed, not owned: the dispatcher is a cheap per-mount view over the
/// shared configuration, the branch probe, and the identity store.
pub struct Dispatcher<'a> {
    config: &'a Config,
    probe: &'a dyn BranchProbe,
    creds: &'a dyn Credentials,
}

impl<'a> Dispatcher<'a> {
    /// Assemble a dispatcher over shared mount state.
    pub fn new(
        config: &'a Config,
        probe: &'a dyn BranchProbe,
        creds: &'a dyn Credentials,
    ) -> Self {
        Dispatcher {
            config,
            probe,
            creds,
        }
    }

    /// The configuration this dispatcher reads.
    pub fn config(&self) -> &Config {
        self.config
    }

    /// Apply a mutating operation to every eligible branch holding `path`.
    ///
    /// `op` receives the branch record and the logical path and performs
    /// exactly one per-branch action, reporting its own errno on failure.
    /// The per-branch outcomes fold through [`Aggregate::combine`]; the final
    /// aggregate is the call's result.
    ///
    /// The caller's identity is in effect from before the policy's existence
    /// probes until after the last branch is visited, and the branch-table
    /// snapshot is held just as long.
    pub fn run_action<F>(&self, caller: Ugid, path: &str, mut op: F) -> Result<(), Errno>
    where
        F: FnMut(&Branch, &str) -> Result<(), Errno>,
    {
        let _scope = UgidScope::new(self.creds, caller);
        let table = self.config.snapshot();
        let policies = self.config.policies();

        let selected = policies
            .action
            .select(&table, self.probe, path, self.config.min_free_space())
            .map_err(|e| e.errno())?;

        let mut aggregate = Aggregate::Unset;
        for idx in selected {
            let outcome = op(&table[idx], path);
            aggregate = aggregate.combine(outcome);
        }

        aggregate.into_result()
    }

    /// Resolve `path` to a single existing branch and run `f` against it.
    ///
    /// The read-side counterpart of [`run_action`](Self::run_action): the
    /// search policy locates the copies, the first is used, and `f`'s single
    /// outcome is the call's result — no aggregation across branches.
    pub fn run_search<F, T>(&self, caller: Ugid, path: &str, f: F) -> Result<T, Errno>
    where
        F: FnOnce(usize, &Branch) -> Result<T, Errno>,
    {
        let _scope = UgidScope::new(self.creds, caller);
        let table = self.config.snapshot();
        let policies = self.config.policies();

        let selected = policies
            .search
            .select(&table, self.probe, path)
            .map_err(|e| e.errno())?;

        let idx = selected[0];
        f(idx, &table[idx])
    }

    /// Pick the branch that should receive a new file and run `f` against it.
    pub fn run_create<F, T>(&self, caller: Ugid, f: F) -> Result<T, Errno>
    where
        F: FnOnce(usize, &Branch) -> Result<T, Errno>,
    {
        let _scope = UgidScope::new(self.creds, caller);
        let table = self.config.snapshot();
        let policies = self.config.policies();

        let idx = policies
            .create
            .select(&table, self.probe, self.config.min_free_space())
            .map_err(|e| e.errno())?;

        f(idx, &table[idx])
    }
}
