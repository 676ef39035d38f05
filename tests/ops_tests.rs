//! End-to-end metadata operations over real on-disk branches.
//!
//! Each test builds a union from tempdir branches and drives the operation
//! the way a transport would, then inspects the physical files underneath.
//! Identity scoping uses a fake credential store so the suite runs unprivileged.

use std::cell::Cell;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use meldfs::{
    fs_ops, ops, Branch, BranchMode, Config, Credentials, DiskProbe, Dispatcher, HandleTable,
    PolicySet, Ugid,
};
use tempfile::TempDir;

struct FakeCreds(Cell<Ugid>);

impl Credentials for FakeCreds {
    fn current(&self) -> Ugid {
        self.0.get()
    }
    fn set(&self, ugid: Ugid) {
        self.0.set(ugid);
    }
}

struct Union {
    branches: Vec<TempDir>,
    config: Config,
}

impl Union {
    /// Build a union of `n` read-write tempdir branches.
    fn new(n: usize) -> Self {
        let branches: Vec<TempDir> = (0..n).map(|_| tempfile::tempdir().unwrap()).collect();
        let table = branches
            .iter()
            .map(|d| Branch::new(d.path(), BranchMode::ReadWrite))
            .collect();
        Union {
            branches,
            config: Config::new(table, 0, PolicySet::default()),
        }
    }

    fn root(&self, idx: usize) -> &Path {
        self.branches[idx].path()
    }

    fn put(&self, idx: usize, name: &str, contents: &[u8]) {
        std::fs::write(self.root(idx).join(name), contents).unwrap();
    }

    fn with_dispatcher<T>(&self, f: impl FnOnce(&Dispatcher<'_>, Ugid) -> T) -> T {
        let probe = DiskProbe;
        let creds = FakeCreds(Cell::new(Ugid::process()));
        let dispatcher = Dispatcher::new(&self.config, &probe, &creds);
        f(&dispatcher, Ugid::process())
    }
}

// =============================================================================
// PATH-BASED OPERATIONS
// =============================================================================

#[test]
fn utimens_updates_every_holding_branch() {
    let union = Union::new(3);
    union.put(0, "f.txt", b"copy a");
    union.put(2, "f.txt", b"copy b");

    union.with_dispatcher(|d, caller| {
        ops::utimens(d, caller, "/f.txt", fs_ops::times_from_secs(1_000, 2_000)).unwrap();
    });

    for idx in [0, 2] {
        let meta = std::fs::metadata(union.root(idx).join("f.txt")).unwrap();
        assert_eq!(meta.mtime(), 2_000, "branch {} copy not updated", idx);
        assert_eq!(meta.atime(), 1_000);
    }
    assert!(!union.root(1).join("f.txt").exists());
}

#[test]
fn chmod_applies_to_every_copy() {
    let union = Union::new(2);
    union.put(0, "f.txt", b"x");
    union.put(1, "f.txt", b"x");

    union.with_dispatcher(|d, caller| {
        ops::chmod(d, caller, "/f.txt", 0o600).unwrap();
    });

    for idx in [0, 1] {
        let mode = std::fs::metadata(union.root(idx).join("f.txt"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn truncate_applies_to_every_copy() {
    let union = Union::new(2);
    union.put(0, "f.txt", b"0123456789");
    union.put(1, "f.txt", b"0123456789");

    union.with_dispatcher(|d, caller| {
        ops::truncate(d, caller, "/f.txt", 4).unwrap();
    });

    for idx in [0, 1] {
        let meta = std::fs::metadata(union.root(idx).join("f.txt")).unwrap();
        assert_eq!(meta.len(), 4);
    }
}

#[test]
fn unlink_removes_every_copy() {
    let union = Union::new(3);
    union.put(0, "f.txt", b"x");
    union.put(1, "f.txt", b"x");

    union.with_dispatcher(|d, caller| {
        ops::unlink(d, caller, "/f.txt").unwrap();
    });

    assert!(!union.root(0).join("f.txt").exists());
    assert!(!union.root(1).join("f.txt").exists());
}

#[test]
fn partial_success_reports_success() {
    // Branch 0 holds a regular file; on branch 1 the same name is a
    // directory, so its unlink fails. One branch succeeding is enough.
    let union = Union::new(2);
    union.put(0, "victim", b"x");
    std::fs::create_dir(union.root(1).join("victim")).unwrap();

    union.with_dispatcher(|d, caller| {
        ops::unlink(d, caller, "/victim").unwrap();
    });

    assert!(!union.root(0).join("victim").exists());
    assert!(union.root(1).join("victim").is_dir());
}

#[test]
fn missing_path_surfaces_enoent() {
    let union = Union::new(2);
    union.with_dispatcher(|d, caller| {
        let err = ops::unlink(d, caller, "/nope").unwrap_err();
        assert_eq!(err, libc::ENOENT);
    });
}

#[test]
fn read_only_branch_is_never_written() {
    let branch_rw = tempfile::tempdir().unwrap();
    let branch_ro = tempfile::tempdir().unwrap();
    std::fs::write(branch_rw.path().join("f"), b"x").unwrap();
    std::fs::write(branch_ro.path().join("f"), b"x").unwrap();

    let config = Config::new(
        vec![
            Branch::new(branch_rw.path(), BranchMode::ReadWrite),
            Branch::new(branch_ro.path(), BranchMode::ReadOnly),
        ],
        0,
        PolicySet::default(),
    );
    let probe = DiskProbe;
    let creds = FakeCreds(Cell::new(Ugid::process()));
    let dispatcher = Dispatcher::new(&config, &probe, &creds);

    ops::utimens(
        &dispatcher,
        Ugid::process(),
        "/f",
        fs_ops::times_from_secs(1_000, 2_000),
    )
    .unwrap();

    let rw_meta = std::fs::metadata(branch_rw.path().join("f")).unwrap();
    let ro_meta = std::fs::metadata(branch_ro.path().join("f")).unwrap();
    assert_eq!(rw_meta.mtime(), 2_000);
    assert_ne!(ro_meta.mtime(), 2_000, "read-only branch was mutated");
}

// =============================================================================
// OPEN / CREATE / HANDLE FAST PATH
// =============================================================================

#[test]
fn open_binds_to_the_first_holder() {
    let union = Union::new(2);
    union.put(1, "f.txt", b"only on branch 1");

    let file = union
        .with_dispatcher(|d, caller| ops::open(d, caller, "/f.txt", libc::O_RDWR))
        .unwrap();
    assert_eq!(file.branch_index(), 1);
    assert_eq!(file.branch_root(), union.root(1));
}

#[test]
fn futimens_through_handle_hits_the_bound_copy_only() {
    let union = Union::new(2);
    union.put(0, "f.txt", b"x");
    union.put(1, "f.txt", b"x");

    let file = union
        .with_dispatcher(|d, caller| ops::open(d, caller, "/f.txt", libc::O_RDWR))
        .unwrap();
    assert_eq!(file.branch_index(), 0);

    ops::futimens(&file, fs_ops::times_from_secs(3_000, 4_000)).unwrap();

    let bound = std::fs::metadata(union.root(0).join("f.txt")).unwrap();
    let other = std::fs::metadata(union.root(1).join("f.txt")).unwrap();
    assert_eq!(bound.mtime(), 4_000);
    assert_ne!(other.mtime(), 4_000, "handle op leaked to another branch");
}

#[test]
fn create_respects_no_create_branches() {
    let branch_nc = tempfile::tempdir().unwrap();
    let branch_rw = tempfile::tempdir().unwrap();

    let config = Config::new(
        vec![
            Branch::new(branch_nc.path(), BranchMode::NoCreate),
            Branch::new(branch_rw.path(), BranchMode::ReadWrite),
        ],
        0,
        PolicySet::default(),
    );
    let probe = DiskProbe;
    let creds = FakeCreds(Cell::new(Ugid::process()));
    let dispatcher = Dispatcher::new(&config, &probe, &creds);

    let file = ops::create(
        &dispatcher,
        Ugid::process(),
        "/new.txt",
        libc::O_WRONLY,
        0o644,
    )
    .unwrap();
    assert_eq!(file.branch_index(), 1);
    assert!(branch_rw.path().join("new.txt").exists());
    assert!(!branch_nc.path().join("new.txt").exists());
}

#[test]
fn handle_table_round_trip() {
    let union = Union::new(1);
    union.put(0, "f.txt", b"x");

    let table = HandleTable::new();
    let file = union
        .with_dispatcher(|d, caller| ops::open(d, caller, "/f.txt", libc::O_RDWR))
        .unwrap();

    let fh = table.insert(file);
    let bound = table.get(fh).expect("handle must resolve");
    ops::ftruncate(&bound, 0).unwrap();
    assert_eq!(
        std::fs::metadata(union.root(0).join("f.txt")).unwrap().len(),
        0
    );

    table.remove(fh);
    assert!(table.get(fh).is_none());
}
