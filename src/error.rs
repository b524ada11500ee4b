//! Error kinds produced by the container and its collaborators.
//!
//! Every fallible operation in this crate returns [`Result<T, Error>`]; nothing
//! panics on a user-triggered condition (a bad index, a missing value, a
//! failing comparator). Panics remain reserved for violated internal
//! invariants in debug builds, surfaced here as [`Error::Internal`].

use std::fmt;

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building or querying a [`crate::Container`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An index was outside `[0, len)` after negative-index normalization.
    #[error("index {index} out of range for container of length {len}")]
    Bounds {
        /// The offending index, after normalization.
        index: isize,
        /// The container's length at the time of the access.
        len: usize,
    },

    /// A dynamically-typed access site was handed a subscript it cannot
    /// service. The statically-typed primary API never produces this; it
    /// exists for the dynamic entry points described in `DESIGN.md`.
    #[error("list indices must be integers, not {found}")]
    Type {
        /// The name of the unsupported subscript type.
        found: &'static str,
    },

    /// `index(v)` (or `count`/`contains` internals) found no element equal
    /// to the requested value. `repr` is the value's pre-rendered `Debug`
    /// representation, threaded through the same way `Error::comparator_msg`
    /// carries a message rather than the value itself — `T` has no bound
    /// here that would let the error hold it directly.
    #[error("{repr} is not in list")]
    ValueNotFound {
        /// `Debug`-formatted representation of the value searched for.
        repr: String,
    },

    /// The user-supplied key projection or comparator raised while
    /// comparing two elements.
    #[error("comparator failed: {0}")]
    Comparator(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Allocating a new pivot node failed. Unreachable under Rust's default
    /// abort-on-OOM allocator, kept to mirror the pass-through contract of
    /// the system this crate is modeled on.
    #[error("failed to allocate a pivot node")]
    Resource,

    /// A debug-only invariant check failed. Only ever raised from
    /// `debug_assert!`-guarded code paths; release builds never construct
    /// this variant.
    #[error("internal invariant violated: {0}")]
    Internal(&'static str),
}

impl Error {
    /// Wraps an arbitrary comparator failure.
    pub fn comparator<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Comparator(Box::new(err))
    }

    /// Builds a [`Error::Comparator`] from a plain message, for comparator
    /// callbacks that signal failure without their own error type.
    pub fn comparator_msg(msg: impl Into<String>) -> Self {
        Error::Comparator(Box::new(ComparatorMessage(msg.into())))
    }

    /// Builds a [`Error::ValueNotFound`] carrying `v`'s `Debug` rendering.
    pub fn value_not_found(v: &impl fmt::Debug) -> Self {
        Error::ValueNotFound {
            repr: format!("{v:?}"),
        }
    }
}

/// A minimal `std::error::Error` wrapper for message-only comparator failures.
#[derive(Debug)]
struct ComparatorMessage(String);

impl fmt::Display for ComparatorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ComparatorMessage {}
