//! Three-valued comparison under an optional key projection and reverse flag.
//!
//! Every ordering decision in this crate passes through [`Comparator::lt`].
//! "Three-valued" here means the comparison can genuinely fail — either the
//! key projection raises, or the underlying values are unordered (the
//! `PartialOrd` analogue of NaN) — and both cases surface as [`Error`]
//! rather than being silently coerced into an arbitrary ordering.

use std::cmp::Ordering;

use crate::error::{Error, Result};

type KeyFn<T, K> = Box<dyn Fn(&T) -> Result<K>>;

/// Compares elements of type `T`, optionally through a key projection to `K`.
///
/// When no key is configured, `K` is irrelevant and elements are compared
/// directly; the type parameter defaults to `T` so `Comparator<T>` is a
/// valid spelling for the unkeyed case.
pub struct Comparator<T, K = T>
where
    T: PartialOrd,
    K: PartialOrd,
{
    key: Option<KeyFn<T, K>>,
    reverse: bool,
}

impl<T, K> Comparator<T, K>
where
    T: PartialOrd,
    K: PartialOrd,
{
    /// A comparator with no key projection.
    pub fn identity(reverse: bool) -> Self {
        Comparator {
            key: None,
            reverse,
        }
    }

    /// A comparator that projects through a fallible key function before
    /// comparing. Matches the host-callable path in the original design,
    /// where an arbitrary user function can raise.
    pub fn keyed<F>(key: F, reverse: bool) -> Self
    where
        F: Fn(&T) -> Result<K> + 'static,
    {
        Comparator {
            key: Some(Box::new(key)),
            reverse,
        }
    }

    /// `a < b` under the configured key and reverse sense.
    ///
    /// Projects both operands (if a key is configured) before comparing, so
    /// a failing projection is reported before any ordering is attempted.
    pub fn lt(&self, a: &T, b: &T) -> Result<bool> {
        let ordering = match &self.key {
            None => a.partial_cmp(b),
            Some(key) => {
                let ka = key(a)?;
                let kb = key(b)?;
                ka.partial_cmp(&kb)
            }
        };
        let ordering =
            ordering.ok_or_else(|| Error::comparator_msg("values are not comparable"))?;
        Ok(match (ordering, self.reverse) {
            (Ordering::Less, false) => true,
            (Ordering::Greater, true) => true,
            _ => false,
        })
    }

    /// `a == b` under the configured key — independent of the reverse flag,
    /// since reversing both sides of an equality test cannot change it.
    pub fn eq(&self, a: &T, b: &T) -> Result<bool> {
        Ok(!self.lt(a, b)? && !self.lt(b, a)?)
    }
}
