//! Error aggregation across branches.
//!
//! A mutating call is attempted on every selected branch; each attempt yields
//! success or an errno. [`Aggregate::combine`] folds that sequence into the
//! single result the caller sees:
//!
//! - any branch succeeding makes the overall call succeed, permanently — the
//!   union's contract is "succeeds if the operation took effect anywhere it
//!   needed to";
//! - among failures, the first code encountered is kept, except that a held
//!   `ENOENT` is replaced by any later non-`ENOENT` code. "Not on this
//!   particular branch" is the least informative failure and must not mask a
//!   real permission/IO/resource error from another branch.
//!
//! The fold is a pure function, so repeated runs over the same per-branch
//! outcomes always produce the same aggregate.

use std::fmt;

/// POSIX error number, as produced by the per-branch primitives.
pub type Errno = libc::c_int;

/// Running fold state over per-branch outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// No branch attempted yet.
    Unset,
    /// At least one branch succeeded. Sticky.
    Success,
    /// Every branch so far failed; the retained code.
    Failure(Errno),
}

impl Aggregate {
    /// Fold one per-branch outcome into the running aggregate.
    pub fn combine(self, outcome: Result<(), Errno>) -> Aggregate {
        match (self, outcome) {
            (_, Ok(())) => Aggregate::Success,
            (Aggregate::Success, Err(_)) => Aggregate::Success,
            (Aggregate::Unset, Err(err)) => Aggregate::Failure(err),
            (Aggregate::Failure(held), Err(err)) => {
                if held == libc::ENOENT && err != libc::ENOENT {
                    Aggregate::Failure(err)
                } else {
                    Aggregate::Failure(held)
                }
            }
        }
    }

    /// The call's overall result once every branch has been visited.
    ///
    /// `Unset` can only mean the dispatcher was handed an empty selection,
    /// which the policies never produce; it maps to `EINVAL` rather than
    /// fabricating success.
    pub fn into_result(self) -> Result<(), Errno> {
        match self {
            Aggregate::Success => Ok(()),
            Aggregate::Failure(err) => Err(err),
            Aggregate::Unset => Err(libc::EINVAL),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Unset => write!(f, "unset"),
            Aggregate::Success => write!(f, "success"),
            Aggregate::Failure(err) => {
                write!(f, "errno {} ({})", err, std::io::Error::from_raw_os_error(*err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fold(outcomes: &[Result<(), Errno>]) -> Aggregate {
        outcomes
            .iter()
            .fold(Aggregate::Unset, |acc, &o| acc.combine(o))
    }

    #[test]
    fn success_onto_anything_is_success() {
        assert_eq!(Aggregate::Unset.combine(Ok(())), Aggregate::Success);
        assert_eq!(Aggregate::Success.combine(Ok(())), Aggregate::Success);
        assert_eq!(
            Aggregate::Failure(libc::EACCES).combine(Ok(())),
            Aggregate::Success
        );
    }

    #[test]
    fn success_is_sticky() {
        assert_eq!(
            Aggregate::Success.combine(Err(libc::EIO)),
            Aggregate::Success
        );
        assert_eq!(fold(&[Ok(()), Err(libc::EIO), Err(libc::EACCES)]), Aggregate::Success);
    }

    #[test]
    fn first_failure_fills_unset() {
        assert_eq!(
            Aggregate::Unset.combine(Err(libc::EACCES)),
            Aggregate::Failure(libc::EACCES)
        );
    }

    #[test]
    fn enoent_never_masks_an_actionable_error() {
        assert_eq!(
            fold(&[Err(libc::ENOENT), Err(libc::EACCES)]),
            Aggregate::Failure(libc::EACCES)
        );
        assert_eq!(
            fold(&[Err(libc::ENOENT), Err(libc::ENOENT), Err(libc::EIO)]),
            Aggregate::Failure(libc::EIO)
        );
    }

    #[test]
    fn earliest_actionable_failure_wins() {
        assert_eq!(
            fold(&[Err(libc::EACCES), Err(libc::EIO)]),
            Aggregate::Failure(libc::EACCES)
        );
        // A later ENOENT never replaces anything.
        assert_eq!(
            fold(&[Err(libc::EIO), Err(libc::ENOENT)]),
            Aggregate::Failure(libc::EIO)
        );
    }

    #[test]
    fn fold_is_deterministic() {
        let outcomes = [Err(libc::ENOENT), Err(libc::EROFS), Err(libc::EIO)];
        assert_eq!(fold(&outcomes), fold(&outcomes));
        assert_eq!(fold(&outcomes), Aggregate::Failure(libc::EROFS));
    }

    #[test]
    fn into_result_maps_states() {
        assert_eq!(Aggregate::Success.into_result(), Ok(()));
        assert_eq!(Aggregate::Failure(libc::EIO).into_result(), Err(libc::EIO));
        assert_eq!(Aggregate::Unset.into_result(), Err(libc::EINVAL));
    }
}
