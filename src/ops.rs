//! The metadata-operation family.
//!
//! Each path-based operation is one [`Dispatcher::run_action`] over the
//! corresponding per-branch primitive from [`crate::fs_ops`]; each
//! handle-based variant acts directly on the descriptor recorded in the
//! [`OpenFile`] binding, bypassing selection entirely. A transport that has
//! both a path and an open handle for a call should prefer the handle — that
//! is what keeps a file's operations pinned to the physical copy that was
//! actually opened.

use crate::aggregate::Errno;
use crate::dispatch::Dispatcher;
use crate::fs_ops::{self, Timespecs};
use crate::handle::OpenFile;
use crate::ugid::Ugid;

// ============================================================================
// PATH-BASED OPERATIONS (policy-selected, aggregated)
// ============================================================================

/// Set timestamps on every eligible copy of `path`.
pub fn utimens(
    dispatcher: &Dispatcher<'_>,
    caller: Ugid,
    path: &str,
    times: Timespecs,
) -> Result<(), Errno> {
    dispatcher.run_action(caller, path, |branch, path| {
        fs_ops::lutimens(&branch.full_path(path), &times)
    })
}

/// Change mode bits on every eligible copy of `path`.
pub fn chmod(
    dispatcher: &Dispatcher<'_>,
    caller: Ugid,
    path: &str,
    mode: u32,
) -> Result<(), Errno> {
    dispatcher.run_action(caller, path, |branch, path| {
        fs_ops::chmod(&branch.full_path(path), mode)
    })
}

/// Change ownership on every eligible copy of `path`.
pub fn chown(
    dispatcher: &Dispatcher<'_>,
    caller: Ugid,
    path: &str,
    uid: u32,
    gid: u32,
) -> Result<(), Errno> {
    dispatcher.run_action(caller, path, |branch, path| {
        fs_ops::lchown(&branch.full_path(path), uid, gid)
    })
}

/// Truncate every eligible copy of `path` to `size` bytes.
pub fn truncate(
    dispatcher: &Dispatcher<'_>,
    caller: Ugid,
    path: &str,
    size: u64,
) -> Result<(), Errno> {
    dispatcher.run_action(caller, path, |branch, path| {
        fs_ops::truncate(&branch.full_path(path), size)
    })
}

/// Remove every eligible copy of `path`.
pub fn unlink(dispatcher: &Dispatcher<'_>, caller: Ugid, path: &str) -> Result<(), Errno> {
    dispatcher.run_action(caller, path, |branch, path| {
        fs_ops::unlink(&branch.full_path(path))
    })
}

// ============================================================================
// OPEN / CREATE (binding the branch decision)
// ============================================================================

/// Open an existing file, binding the handle to the branch it was found on.
pub fn open(
    dispatcher: &Dispatcher<'_>,
    caller: Ugid,
    path: &str,
    flags: i32,
) -> Result<OpenFile, Errno> {
    dispatcher.run_search(caller, path, |idx, branch| {
        let fd = fs_ops::open(&branch.full_path(path), flags, 0)?;
        Ok(OpenFile::new(fd, idx, branch.root().to_path_buf()))
    })
}

/// Create a new file on the branch the create policy picks.
///
/// The parent directory must already exist on the chosen branch; cloning
/// directory structure across branches is a higher-layer concern.
pub fn create(
    dispatcher: &Dispatcher<'_>,
    caller: Ugid,
    path: &str,
    flags: i32,
    mode: u32,
) -> Result<OpenFile, Errno> {
    dispatcher.run_create(caller, |idx, branch| {
        let fd = fs_ops::open(
            &branch.full_path(path),
            flags | libc::O_CREAT,
            mode,
        )?;
        Ok(OpenFile::new(fd, idx, branch.root().to_path_buf()))
    })
}

// ============================================================================
// HANDLE-BASED FAST PATHS (single branch, no policy, no aggregation)
// ============================================================================

/// Set timestamps through an open handle.
pub fn futimens(file: &OpenFile, times: Timespecs) -> Result<(), Errno> {
    fs_ops::futimens(file.raw_fd(), &times)
}

/// Change mode bits through an open handle.
pub fn fchmod(file: &OpenFile, mode: u32) -> Result<(), Errno> {
    fs_ops::fchmod(file.raw_fd(), mode)
}

/// Change ownership through an open handle.
pub fn fchown(file: &OpenFile, uid: u32, gid: u32) -> Result<(), Errno> {
    fs_ops::fchown(file.raw_fd(), uid, gid)
}

/// Truncate through an open handle.
pub fn ftruncate(file: &OpenFile, size: u64) -> Result<(), Errno> {
    fs_ops::ftruncate(file.raw_fd(), size)
}
