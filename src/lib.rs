//! # lazysort
//!
//! A lazily sorted sequence container. Built from an arbitrary input
//! sequence, a [`Container`] behaves like a sorted list to its consumers but
//! performs only as much sorting work as each query requires: a single
//! indexed access is expected `O(n)` via randomized quickselect, and
//! repeated accesses amortize toward `O(n log n)` as partition boundaries
//! are remembered and reused in an internal treap of pivot nodes.
//!
//! The container's length and element multiset are fixed after
//! construction — see [`Container`] for the full query surface.

mod comparator;
pub mod container;
pub mod error;
pub mod iter;
mod partition;
mod sort_driver;
mod treap;

pub use container::Container;
pub use error::{Error, Result};
