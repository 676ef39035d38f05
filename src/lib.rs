//! # meldfs
//!
//! Dispatch core for a union filesystem: many independent physical storage
//! locations ("branches") presented as one logical filesystem.
//!
//! For every filesystem call the core decides *which* branch(es) the call
//! applies to, executes the underlying operation against possibly several
//! physical paths, and collapses their individually-succeeding-or-failing
//! outcomes into one POSIX-correct result — while the branch set itself may
//! be reconfigured by an administrator with calls in flight.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │               transport boundary (FUSE session, …)            │
//! │        supplies: logical path or handle, params, (uid,gid)    │
//! └───────────────────────────────────────────────────────────────┘
//!           │ path-based                          │ handle-based
//!           ▼                                     ▼
//! ┌─────────────────────────┐       ┌────────────────────────────┐
//! │  Dispatcher (dispatch)  │       │  OpenFile binding (handle) │
//! │  UgidScope → snapshot   │       │  fd pinned to its branch   │
//! │  → policy → per-branch  │       │  at open time; no policy,  │
//! │  loop → aggregation     │       │  no snapshot, no scoping   │
//! └─────────────────────────┘       └────────────────────────────┘
//!           │                                     │
//!           ▼                                     ▼
//! ┌───────────────────────────────────────────────────────────────┐
//! │        per-branch primitives (fs_ops): one syscall each       │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! The branch table ([`config::Config`]) is wholesale-replaceable behind a
//! reader/writer lock: dispatches hold shared access for their whole
//! duration, reconfiguration waits for them and swaps the table atomically.
//! Selection strategies ([`policy`]) are a closed set of tagged policies in
//! search, action, and create families. Per-branch outcomes fold through the
//! pure [`aggregate::Aggregate::combine`] so a call succeeds if the operation
//! took effect anywhere it needed to, and the most actionable error wins
//! otherwise.
//!
//! The core itself never logs, retries, or terminates the process: every
//! failure is a returned errno for the transport to translate.

pub mod aggregate;
pub mod branch;
pub mod config;
pub mod dispatch;
pub mod fs_ops;
pub mod handle;
pub mod ops;
pub mod policy;
pub mod probe;
pub mod ugid;

pub use aggregate::{Aggregate, Errno};
pub use branch::{Branch, BranchMode, BranchTable};
pub use config::{Config, ConfigError, ConfigFile};
pub use dispatch::Dispatcher;
pub use handle::{HandleTable, OpenFile};
pub use policy::{ActionPolicy, CreatePolicy, PolicySet, SearchPolicy, SelectionError};
pub use probe::{BranchProbe, DiskProbe};
pub use ugid::{Credentials, FsCredentials, Ugid, UgidScope};
