//! In-place partitioning over `xs` slices, guided by a [`Comparator`].
//!
//! These routines never touch the pivot treap — they are pure array
//! operations the sort driver calls once it has decided which half-open
//! range needs work.

use rand::Rng;

use crate::comparator::Comparator;
use crate::error::Result;

/// Ranges of `hi - lo` at or below this switch to insertion sort.
pub(crate) const SORT_THRESH: usize = 8;

/// Draws three independent positions in `[lo, hi)` and returns the index of
/// the middle-ranked value among them.
pub(crate) fn pick_pivot<T, K, R: Rng>(
    xs: &[T],
    lo: usize,
    hi: usize,
    rng: &mut R,
    cmp: &Comparator<T, K>,
) -> Result<usize>
where
    T: PartialOrd,
    K: PartialOrd,
{
    debug_assert!(hi > lo);
    let mut a = rng.gen_range(lo..hi);
    let mut b = rng.gen_range(lo..hi);
    let mut c = rng.gen_range(lo..hi);

    if cmp.lt(&xs[b], &xs[a])? {
        std::mem::swap(&mut a, &mut b);
    }
    if cmp.lt(&xs[c], &xs[b])? {
        std::mem::swap(&mut b, &mut c);
        if cmp.lt(&xs[b], &xs[a])? {
            std::mem::swap(&mut a, &mut b);
        }
    }
    Ok(b)
}

/// Lomuto-style partition of `xs[lo..hi]` around the value currently at
/// `pivot_idx` (which must lie in `[lo, hi)`).
///
/// Swaps the pivot to `lo`, scans left-to-right tracking `last_less` (the
/// rightmost position known to hold a value less than the pivot), then
/// restores the pivot to its final sorted rank. Returns that rank.
pub(crate) fn partition<T, K>(
    xs: &mut [T],
    lo: usize,
    hi: usize,
    pivot_idx: usize,
    cmp: &Comparator<T, K>,
) -> Result<usize>
where
    T: PartialOrd,
    K: PartialOrd,
{
    debug_assert!(lo <= pivot_idx && pivot_idx < hi);
    xs.swap(lo, pivot_idx);
    let mut last_less = lo;
    for i in (lo + 1)..hi {
        if cmp.lt(&xs[i], &xs[lo])? {
            last_less += 1;
            xs.swap(i, last_less);
        }
    }
    xs.swap(lo, last_less);
    Ok(last_less)
}

/// Draws a median-of-three pivot and partitions `xs[lo..hi]` around it.
pub(crate) fn partition_random<T, K, R: Rng>(
    xs: &mut [T],
    lo: usize,
    hi: usize,
    rng: &mut R,
    cmp: &Comparator<T, K>,
) -> Result<usize>
where
    T: PartialOrd,
    K: PartialOrd,
{
    let pivot_idx = pick_pivot(xs, lo, hi, rng, cmp)?;
    partition(xs, lo, hi, pivot_idx, cmp)
}

/// Stable insertion sort over the half-open range `[lo, hi)`.
pub(crate) fn insertion_sort<T, K>(xs: &mut [T], lo: usize, hi: usize, cmp: &Comparator<T, K>) -> Result<()>
where
    T: PartialOrd,
    K: PartialOrd,
{
    for i in (lo + 1)..hi {
        let mut j = i;
        while j > lo && cmp.lt(&xs[j], &xs[j - 1])? {
            xs.swap(j, j - 1);
            j -= 1;
        }
    }
    Ok(())
}

/// Plain randomized quicksort over `[lo, hi)`, falling back to insertion
/// sort at [`SORT_THRESH`]. Does not publish any pivot to the treap — used
/// only when the caller will mark the whole range sorted atomically via its
/// bracketing pivots.
pub(crate) fn quick_sort<T, K, R: Rng>(
    xs: &mut [T],
    lo: usize,
    hi: usize,
    rng: &mut R,
    cmp: &Comparator<T, K>,
) -> Result<()>
where
    T: PartialOrd,
    K: PartialOrd,
{
    if hi - lo <= SORT_THRESH {
        return insertion_sort(xs, lo, hi, cmp);
    }
    let p = partition_random(xs, lo, hi, rng, cmp)?;
    if p > lo {
        quick_sort(xs, lo, p, rng, cmp)?;
    }
    quick_sort(xs, p + 1, hi, rng, cmp)
}
