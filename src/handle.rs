//! Open-file bindings: the fast path for handle-based calls.
//!
//! When a file is opened the branch decision is final. The resulting
//! [`OpenFile`] pins the descriptor to the branch that was actually opened,
//! so every later operation on the handle hits the same physical file even
//! if the branch table or policies are reconfigured mid-lifetime. Handle
//! operations bypass table snapshots, policy selection, and identity scoping
//! entirely — all of that was resolved and validated at open time.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use rustc_hash::FxHashMap;

/// A descriptor bound to the branch it was opened on.
///
/// Immutable for its lifetime; the descriptor closes when the last reference
/// drops.
#[derive(Debug)]
pub struct OpenFile {
    fd: OwnedFd,
    branch_index: usize,
    branch_root: PathBuf,
}

impl OpenFile {
    /// Bind an opened descriptor to its branch.
    pub fn new(fd: OwnedFd, branch_index: usize, branch_root: PathBuf) -> Self {
        OpenFile {
            fd,
            branch_index,
            branch_root,
        }
    }

    /// Raw descriptor for the handle-based primitives.
    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }

    /// Position of the owning branch in the table at open time.
    pub fn branch_index(&self) -> usize {
        self.branch_index
    }

    /// Physical root of the owning branch.
    pub fn branch_root(&self) -> &Path {
        &self.branch_root
    }
}

/// Registry mapping transport-visible handle numbers to open files.
///
/// Read-mostly: lookups vastly outnumber open/close, so the map sits behind a
/// reader/writer lock with handle numbers allocated lock-free.
#[derive(Debug, Default)]
pub struct HandleTable {
    map: RwLock<FxHashMap<u64, Arc<OpenFile>>>,
    next_fh: AtomicU64,
}

impl HandleTable {
    /// Empty table. Handle numbers start at 1; 0 is never issued.
    pub fn new() -> Self {
        HandleTable {
            map: RwLock::new(FxHashMap::default()),
            next_fh: AtomicU64::new(1),
        }
    }

    /// Register an open file, returning its handle number.
    pub fn insert(&self, file: OpenFile) -> u64 {
        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        map.insert(fh, Arc::new(file));
        fh
    }

    /// Look up a handle.
    pub fn get(&self, fh: u64) -> Option<Arc<OpenFile>> {
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        map.get(&fh).cloned()
    }

    /// Remove a handle, returning the binding (the descriptor closes once
    /// every outstanding reference drops).
    pub fn remove(&self, fh: u64) -> Option<Arc<OpenFile>> {
        let mut map = self.map.write().unwrap_or_else(|e| e.into_inner());
        map.remove(&fh)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        let map = self.map.read().unwrap_or_else(|e| e.into_inner());
        map.len()
    }

    /// Whether no handles are open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
