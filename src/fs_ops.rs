//! Per-branch filesystem primitives.
//!
//! Thin wrappers over the underlying syscalls: each performs exactly one
//! filesystem action against one physical path or descriptor and reports the
//! raw errno on failure. None of them retry — retries, if any, are a decision
//! for layers above the dispatch core.

use std::ffi::CString;
use std::os::fd::{FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::aggregate::Errno;

/// A pair of timestamps (atime, mtime) in syscall form.
pub type Timespecs = [libc::timespec; 2];

/// Timestamp pair meaning "now" for both atime and mtime.
pub fn times_now() -> Timespecs {
    let now = libc::timespec {
        tv_sec: 0,
        tv_nsec: libc::UTIME_NOW,
    };
    [now, now]
}

/// Timestamp pair from whole seconds, for explicit settings.
pub fn times_from_secs(atime: i64, mtime: i64) -> Timespecs {
    [
        libc::timespec {
            tv_sec: atime as libc::time_t,
            tv_nsec: 0,
        },
        libc::timespec {
            tv_sec: mtime as libc::time_t,
            tv_nsec: 0,
        },
    ]
}

fn cpath(path: &Path) -> Result<CString, Errno> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| libc::EINVAL)
}

fn last_errno() -> Errno {
    std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(libc::EIO)
}

fn check(rc: libc::c_int) -> Result<(), Errno> {
    if rc == -1 {
        Err(last_errno())
    } else {
        Ok(())
    }
}

/// Set timestamps without following a final symlink.
pub fn lutimens(path: &Path, times: &Timespecs) -> Result<(), Errno> {
    let c = cpath(path)?;
    check(unsafe {
        libc::utimensat(
            libc::AT_FDCWD,
            c.as_ptr(),
            times.as_ptr(),
            libc::AT_SYMLINK_NOFOLLOW,
        )
    })
}

/// Set timestamps on an open descriptor.
pub fn futimens(fd: RawFd, times: &Timespecs) -> Result<(), Errno> {
    check(unsafe { libc::futimens(fd, times.as_ptr()) })
}

/// Change mode bits.
pub fn chmod(path: &Path, mode: u32) -> Result<(), Errno> {
    let c = cpath(path)?;
    check(unsafe { libc::chmod(c.as_ptr(), mode as libc::mode_t) })
}

/// Change mode bits on an open descriptor.
pub fn fchmod(fd: RawFd, mode: u32) -> Result<(), Errno> {
    check(unsafe { libc::fchmod(fd, mode as libc::mode_t) })
}

/// Change ownership without following a final symlink.
pub fn lchown(path: &Path, uid: u32, gid: u32) -> Result<(), Errno> {
    let c = cpath(path)?;
    check(unsafe { libc::lchown(c.as_ptr(), uid, gid) })
}

/// Change ownership on an open descriptor.
pub fn fchown(fd: RawFd, uid: u32, gid: u32) -> Result<(), Errno> {
    check(unsafe { libc::fchown(fd, uid, gid) })
}

/// Truncate to `size` bytes.
pub fn truncate(path: &Path, size: u64) -> Result<(), Errno> {
    let c = cpath(path)?;
    check(unsafe { libc::truncate(c.as_ptr(), size as libc::off_t) })
}

/// Truncate an open descriptor to `size` bytes.
pub fn ftruncate(fd: RawFd, size: u64) -> Result<(), Errno> {
    check(unsafe { libc::ftruncate(fd, size as libc::off_t) })
}

/// Remove a file.
pub fn unlink(path: &Path) -> Result<(), Errno> {
    let c = cpath(path)?;
    check(unsafe { libc::unlink(c.as_ptr()) })
}

/// Open a file, returning an owned descriptor closed on drop.
pub fn open(path: &Path, flags: i32, mode: u32) -> Result<OwnedFd, Errno> {
    let c = cpath(path)?;
    let fd = unsafe { libc::open(c.as_ptr(), flags, mode as libc::mode_t) };
    if fd == -1 {
        return Err(last_errno());
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}
