//! Scoped caller-identity impersonation.
//!
//! Each branch is a distinct physical filesystem whose own permission checks
//! must see the *caller's* identity, not the service process's, or access
//! control would be silently bypassed or falsely denied. [`UgidScope`]
//! impersonates the caller for exactly one dispatch and restores the previous
//! identity on every exit path — success, per-branch failure, selection
//! failure, or unwind — via `Drop`, never a manually paired set/restore.
//!
//! The identity store itself sits behind [`Credentials`] so the restoration
//! contract is testable without running as root; production uses the
//! per-thread Linux filesystem uid/gid ([`FsCredentials`]), which never leaks
//! across threads.

/// A caller's (uid, gid) pair as supplied by the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ugid {
    /// Caller's user id.
    pub uid: u32,
    /// Caller's group id.
    pub gid: u32,
}

impl Ugid {
    /// Identity pair from raw ids.
    pub fn new(uid: u32, gid: u32) -> Self {
        Ugid { uid, gid }
    }

    /// The current process's own identity.
    pub fn process() -> Self {
        Ugid {
            uid: unsafe { libc::getuid() },
            gid: unsafe { libc::getgid() },
        }
    }
}

/// The ambient identity presented to branch permission checks.
///
/// Implementations are thread-scoped: setting an identity on one thread must
/// not affect concurrent dispatches on other threads.
pub trait Credentials {
    /// The identity currently in effect on this thread.
    fn current(&self) -> Ugid;

    /// Switch this thread's effective identity.
    fn set(&self, ugid: Ugid);
}

/// Per-thread filesystem uid/gid via `setfsuid`/`setfsgid`.
///
/// The fsuid/fsgid pair is what the kernel consults for filesystem permission
/// checks, and it is per-thread, so concurrent dispatches impersonating
/// different callers do not interfere. Requires the process to run with
/// enough privilege to assume arbitrary ids (the usual mount-daemon setup).
#[derive(Debug, Default, Clone, Copy)]
pub struct FsCredentials;

#[cfg(target_os = "linux")]
impl Credentials for FsCredentials {
    fn current(&self) -> Ugid {
        // Passing -1 is the documented way to read the current value
        // without changing it.
        let uid = unsafe { libc::setfsuid(u32::MAX) } as u32;
        let gid = unsafe { libc::setfsgid(u32::MAX) } as u32;
        Ugid { uid, gid }
    }

    fn set(&self, ugid: Ugid) {
        // gid first: once the fsuid drops to an unprivileged user the order
        // no longer matters, but this keeps the transition valid when
        // switching between two non-root callers.
        unsafe {
            libc::setfsgid(ugid.gid);
            libc::setfsuid(ugid.uid);
        }
    }
}

#[cfg(not(target_os = "linux"))]
impl Credentials for FsCredentials {
    // Non-Linux builds have no per-thread fsuid; keep a thread-local shadow
    // so the scoping contract still holds for library consumers and tests.
    fn current(&self) -> Ugid {
        SHADOW.with(|cell| cell.get())
    }

    fn set(&self, ugid: Ugid) {
        SHADOW.with(|cell| cell.set(ugid));
    }
}

#[cfg(not(target_os = "linux"))]
thread_local! {
    static SHADOW: std::cell::Cell<Ugid> = std::cell::Cell::new(Ugid::process());
}

/// Guard impersonating a caller for the duration of one dispatch.
pub struct UgidScope<'a> {
    creds: &'a dyn Credentials,
    prev: Ugid,
}

impl<'a> UgidScope<'a> {
    /// Begin impersonating `caller`; the prior identity is captured and
    /// restored when the scope drops.
    pub fn new(creds: &'a dyn Credentials, caller: Ugid) -> Self {
        let prev = creds.current();
        if prev != caller {
            creds.set(caller);
        }
        UgidScope { creds, prev }
    }
}

impl Drop for UgidScope<'_> {
    fn drop(&mut self) {
        self.creds.set(self.prev);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// In-memory identity store recording every transition.
    struct FakeCreds {
        current: Cell<Ugid>,
    }

    impl Credentials for FakeCreds {
        fn current(&self) -> Ugid {
            self.current.get()
        }
        fn set(&self, ugid: Ugid) {
            self.current.set(ugid);
        }
    }

    #[test]
    fn scope_impersonates_and_restores() {
        let creds = FakeCreds {
            current: Cell::new(Ugid::new(0, 0)),
        };

        {
            let _scope = UgidScope::new(&creds, Ugid::new(1000, 1000));
            assert_eq!(creds.current(), Ugid::new(1000, 1000));
        }

        assert_eq!(creds.current(), Ugid::new(0, 0));
    }

    #[test]
    fn scope_restores_on_unwind() {
        let creds = FakeCreds {
            current: Cell::new(Ugid::new(0, 0)),
        };

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _scope = UgidScope::new(&creds, Ugid::new(500, 100));
            panic!("mid-dispatch failure");
        }));

        assert!(result.is_err());
        assert_eq!(creds.current(), Ugid::new(0, 0));
    }

    #[test]
    fn nested_scopes_unwind_in_order() {
        let creds = FakeCreds {
            current: Cell::new(Ugid::new(0, 0)),
        };

        {
            let _outer = UgidScope::new(&creds, Ugid::new(1, 1));
            {
                let _inner = UgidScope::new(&creds, Ugid::new(2, 2));
                assert_eq!(creds.current(), Ugid::new(2, 2));
            }
            assert_eq!(creds.current(), Ugid::new(1, 1));
        }
        assert_eq!(creds.current(), Ugid::new(0, 0));
    }
}
