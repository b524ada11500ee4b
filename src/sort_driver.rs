//! Drives partitioning against the pivot treap: `sort_point`, `sort_range`,
//! and `find_item`. This is the state machine described in the data model —
//! every call here both answers a query and permanently refines the shared
//! partial order.
//!
//! Operations are free functions over borrowed pieces of a [`Container`]
//! (`xs`, the treap, the comparator, the RNG) rather than methods on a
//! struct that would otherwise have to hold several simultaneous mutable
//! borrows of the same container.

use log::trace;
use rand::rngs::StdRng;

use crate::comparator::Comparator;
use crate::error::Result;
use crate::partition::{self, SORT_THRESH};
use crate::treap::{PivotId, PivotTreap};

/// Ensures position `k` is at its final sorted rank. Idempotent: a second
/// call with the same `k` finds `lo.idx == k` immediately and returns.
pub(crate) fn sort_point<T, K>(
    xs: &mut [T],
    treap: &mut PivotTreap,
    cmp: &Comparator<T, K>,
    rng: &mut StdRng,
    k: isize,
) -> Result<()>
where
    T: PartialOrd,
    K: PartialOrd,
{
    loop {
        let (lo, hi_opt) = treap.bound(k);
        if treap.idx(lo) == k {
            return Ok(());
        }
        let hi = hi_opt.expect("hi sentinel brackets every in-domain index");
        if treap.sorted_right(hi) {
            return Ok(());
        }

        let lo_idx = treap.idx(lo);
        let hi_idx = treap.idx(hi);
        if lo_idx + 1 + SORT_THRESH as isize <= hi_idx {
            partition_step(xs, treap, cmp, rng, lo, hi)?;
            continue;
        }
        terminal_step(xs, treap, cmp, lo, hi)?;
        return Ok(());
    }
}

/// Sorts `[start, stop)` in place. Brackets both endpoints first, then walks
/// pivot-to-pivot gaps in order, skipping any already marked sorted.
pub(crate) fn sort_range<T, K>(
    xs: &mut [T],
    treap: &mut PivotTreap,
    cmp: &Comparator<T, K>,
    rng: &mut StdRng,
    start: isize,
    stop: isize,
) -> Result<()>
where
    T: PartialOrd,
    K: PartialOrd,
{
    if start >= stop {
        return Ok(());
    }
    sort_point(xs, treap, cmp, rng, start)?;
    sort_point(xs, treap, cmp, rng, stop)?;

    // Normally `idx(curr) == start` after the sort_point above. It can fall
    // short of `start` if depivoting elsewhere already merged this region
    // into a larger sorted span — in that case `curr` is already flagged
    // `sorted_left` and the loop below just skips ahead without resorting.
    let (mut curr, _) = treap.bound(start);
    loop {
        if treap.idx(curr) >= stop {
            break;
        }
        let next = treap
            .successor(curr)
            .expect("hi sentinel bounds the walk before it runs out");
        if !treap.sorted_left(curr) {
            let curr_idx = treap.idx(curr);
            let next_idx = treap.idx(next);
            partition::quick_sort(xs, (curr_idx + 1) as usize, next_idx as usize, rng, cmp)?;
            treap.set_sorted_left(curr, true);
            treap.set_sorted_right(next, true);
        }
        depivot(treap, curr);
        curr = next;
    }
    Ok(())
}

/// Locates the first position equal to `v`, partitioning just enough of the
/// array to decide. Returns `None` if no element compares equal.
pub(crate) fn find_item<T, K>(
    xs: &mut [T],
    treap: &mut PivotTreap,
    cmp: &Comparator<T, K>,
    rng: &mut StdRng,
    v: &T,
) -> Result<Option<usize>>
where
    T: PartialOrd,
    K: PartialOrd,
{
    let mut current = treap.root();
    let mut lo = treap.lo_sentinel();
    let mut hi = treap.hi_sentinel();
    while let Some(node) = current {
        // Sentinels bound the domain rather than holding a real `xs`
        // element, so there is no value to compare `v` against — they act
        // as -infinity/+infinity, the same way `PivotTreap::bound` treats
        // their `idx` as an ordinary endpoint instead of a special case.
        // The root is always a sentinel in practice (both sentinels' fixed
        // priorities dominate any drawn pivot priority), so bailing out
        // here would make this descent never run at all.
        if node == treap.lo_sentinel() {
            lo = node;
            current = treap.right(node);
            continue;
        }
        if node == treap.hi_sentinel() {
            hi = node;
            current = treap.left(node);
            continue;
        }
        let node_idx = treap.idx(node) as usize;
        if cmp.lt(v, &xs[node_idx])? {
            hi = node;
            current = treap.left(node);
        } else if cmp.lt(&xs[node_idx], v)? {
            lo = node;
            current = treap.right(node);
        } else {
            return Ok(Some(node_idx));
        }
    }

    loop {
        let lo_idx = treap.idx(lo);
        let hi_idx = treap.idx(hi);
        let already_sorted = treap.sorted_right(hi) || (lo_idx >= 0 && treap.sorted_left(lo));
        if already_sorted || hi_idx - lo_idx - 1 <= SORT_THRESH as isize {
            if !already_sorted {
                partition::insertion_sort(xs, (lo_idx + 1) as usize, hi_idx as usize, cmp)?;
                treap.set_sorted_left(lo, true);
                treap.set_sorted_right(hi, true);
                depivot(treap, lo);
                depivot(treap, hi);
            }
            for i in (lo_idx + 1)..hi_idx {
                if cmp.eq(&xs[i as usize], v)? {
                    return Ok(Some(i as usize));
                }
            }
            return Ok(None);
        }

        let p = partition::partition_random(xs, (lo_idx + 1) as usize, hi_idx as usize, rng, cmp)?;
        let start = if treap.right(lo).is_none() { lo } else { hi };
        let mid = treap.insert(p as isize, start, rng);
        uniq_pivots(xs, treap, cmp, lo, mid, hi)?;

        if cmp.lt(&xs[p], v)? {
            lo = mid;
        } else if cmp.lt(v, &xs[p])? {
            hi = mid;
        } else {
            return Ok(Some(p));
        }
    }
}

/// One partition step of the `sort_point`/`find_item` state machine:
/// partitions `(lo.idx, hi.idx)`, inserts the resulting pivot, and
/// deduplicates it against equal-valued neighbors.
fn partition_step<T, K>(
    xs: &mut [T],
    treap: &mut PivotTreap,
    cmp: &Comparator<T, K>,
    rng: &mut StdRng,
    lo: PivotId,
    hi: PivotId,
) -> Result<()>
where
    T: PartialOrd,
    K: PartialOrd,
{
    let lo_idx = treap.idx(lo);
    let hi_idx = treap.idx(hi);
    let p = partition::partition_random(xs, (lo_idx + 1) as usize, hi_idx as usize, rng, cmp)?;
    let start = if treap.right(lo).is_none() { lo } else { hi };
    let mid = treap.insert(p as isize, start, rng);
    trace!("sort_driver: inserted pivot at {p}");
    uniq_pivots(xs, treap, cmp, lo, mid, hi)
}

/// The residual gap is small enough to finish with insertion sort; marks
/// both brackets sorted on the side facing the gap and depivots them if
/// that now collapses a larger sorted region.
fn terminal_step<T, K>(
    xs: &mut [T],
    treap: &mut PivotTreap,
    cmp: &Comparator<T, K>,
    lo: PivotId,
    hi: PivotId,
) -> Result<()>
where
    T: PartialOrd,
    K: PartialOrd,
{
    let lo_idx = treap.idx(lo);
    let hi_idx = treap.idx(hi);
    partition::insertion_sort(xs, (lo_idx + 1) as usize, hi_idx as usize, cmp)?;
    treap.set_sorted_left(lo, true);
    treap.set_sorted_right(hi, true);
    depivot(treap, lo);
    depivot(treap, hi);
    Ok(())
}

/// Absorbs an adjacent equal-valued endpoint pivot into the freshly
/// inserted `mid`, enforcing the no-equal-adjacent-pivots invariant.
fn uniq_pivots<T, K>(
    xs: &[T],
    treap: &mut PivotTreap,
    cmp: &Comparator<T, K>,
    lo: PivotId,
    mid: PivotId,
    hi: PivotId,
) -> Result<()>
where
    T: PartialOrd,
    K: PartialOrd,
{
    if !treap.is_sentinel(lo) {
        let lo_idx = treap.idx(lo) as usize;
        let mid_idx = treap.idx(mid) as usize;
        if cmp.eq(&xs[lo_idx], &xs[mid_idx])? {
            treap.adopt_flags(mid, lo);
            treap.delete(lo);
            trace!("sort_driver: dedup absorbed lo pivot at {lo_idx}");
        }
    }
    if !treap.is_sentinel(hi) {
        let mid_idx = treap.idx(mid) as usize;
        let hi_idx = treap.idx(hi) as usize;
        if cmp.eq(&xs[mid_idx], &xs[hi_idx])? {
            treap.adopt_flags(mid, hi);
            treap.delete(hi);
            trace!("sort_driver: dedup absorbed hi pivot at {hi_idx}");
        }
    }
    Ok(())
}

/// Deletes `node` if both its flags are now set, merging its two sorted
/// neighbors into one region. A no-op for sentinels and for nodes not yet
/// eligible.
fn depivot(treap: &mut PivotTreap, node: PivotId) {
    if treap.is_depivotable(node) {
        trace!("sort_driver: depivoting {}", treap.idx(node));
        treap.delete(node);
    }
}
