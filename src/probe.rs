//! Per-branch vitals: existence checks and free-space queries.
//!
//! Policies never touch the disk directly; they go through [`BranchProbe`] so
//! the selection logic stays deterministic under test (fake vitals) while
//! production uses real `lstat`/`statvfs` results. Free space is queried at
//! selection time, once per branch per dispatch, and never cached.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;

use crate::branch::Branch;

/// Read-only vitals of a branch, as seen at selection time.
pub trait BranchProbe {
    /// Whether the logical path currently exists on this branch.
    ///
    /// Symlinks count as existing without being followed; a dangling symlink
    /// is still a union member on this branch.
    fn exists(&self, branch: &Branch, path: &str) -> bool;

    /// Currently available bytes on the branch's filesystem.
    fn free_space(&self, branch: &Branch) -> u64;
}

/// Production probe backed by the branch's real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskProbe;

impl BranchProbe for DiskProbe {
    fn exists(&self, branch: &Branch, path: &str) -> bool {
        std::fs::symlink_metadata(branch.full_path(path)).is_ok()
    }

    fn free_space(&self, branch: &Branch) -> u64 {
        let Ok(cpath) = CString::new(branch.root().as_os_str().as_bytes()) else {
            return 0;
        };

        let mut st: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(cpath.as_ptr(), &mut st) };
        if rc != 0 {
            // An unprobeable branch is treated as full rather than failing
            // the whole selection.
            return 0;
        }

        (st.f_bavail as u64).saturating_mul(st.f_frsize as u64)
    }
}
