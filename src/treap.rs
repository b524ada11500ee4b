//! The pivot treap: a randomized BST, keyed by array position and heap-
//! ordered by a random priority, recording which positions are at their
//! final sorted rank.
//!
//! Nodes live in a flat arena (`Vec<PivotNode>`) addressed by [`PivotId`]
//! rather than as boxed, cyclically-linked allocations — the same shape the
//! pack's B-tree-forest crates use for a node pool with parent back-links,
//! since safe Rust cannot express an owning child / non-owning parent cycle
//! directly. The two sentinel pivots at conceptual positions `-1` and `n`
//! occupy fixed arena slots and are never freed.

use rand::Rng;

/// Handle to a pivot node inside a [`PivotTreap`]'s arena.
pub(crate) type PivotId = usize;

#[derive(Debug, Clone, Copy)]
struct PivotNode {
    /// Array position this pivot pins down, or the sentinel value `-1`/`n`.
    idx: isize,
    /// `(idx, successor.idx)` is fully sorted.
    sorted_left: bool,
    /// `(predecessor.idx, idx)` is fully sorted.
    sorted_right: bool,
    priority: u64,
    left: Option<PivotId>,
    right: Option<PivotId>,
    parent: Option<PivotId>,
}

/// Randomized BST of pivot nodes, indexed by array position.
pub(crate) struct PivotTreap {
    nodes: Vec<PivotNode>,
    free: Vec<PivotId>,
    root: Option<PivotId>,
    lo_sentinel: PivotId,
    hi_sentinel: PivotId,
}

impl PivotTreap {
    /// Builds a treap bounding an array of length `n`, containing only the
    /// two sentinel pivots at `-1` and `n`.
    pub(crate) fn new(n: usize) -> Self {
        let lo = PivotNode {
            idx: -1,
            sorted_left: false,
            sorted_right: false,
            priority: u64::MAX,
            left: None,
            right: None,
            parent: None,
        };
        let hi = PivotNode {
            idx: n as isize,
            sorted_left: false,
            sorted_right: false,
            priority: u64::MAX - 1,
            left: None,
            right: None,
            parent: None,
        };
        // lo is the root, hi its right child: a two-node max-heap with lo's
        // priority the larger of the two, satisfying the heap property
        // trivially at construction.
        let mut lo = lo;
        lo.right = Some(1);
        PivotTreap {
            nodes: vec![lo, hi],
            free: Vec::new(),
            root: Some(0),
            lo_sentinel: 0,
            hi_sentinel: 1,
        }
        .fixup_hi_parent()
    }

    fn fixup_hi_parent(mut self) -> Self {
        self.nodes[self.hi_sentinel].parent = Some(self.lo_sentinel);
        self
    }

    pub(crate) fn lo_sentinel(&self) -> PivotId {
        self.lo_sentinel
    }

    pub(crate) fn hi_sentinel(&self) -> PivotId {
        self.hi_sentinel
    }

    pub(crate) fn is_sentinel(&self, node: PivotId) -> bool {
        node == self.lo_sentinel || node == self.hi_sentinel
    }

    pub(crate) fn idx(&self, node: PivotId) -> isize {
        self.nodes[node].idx
    }

    pub(crate) fn sorted_left(&self, node: PivotId) -> bool {
        self.nodes[node].sorted_left
    }

    pub(crate) fn sorted_right(&self, node: PivotId) -> bool {
        self.nodes[node].sorted_right
    }

    pub(crate) fn set_sorted_left(&mut self, node: PivotId, value: bool) {
        self.nodes[node].sorted_left = value;
    }

    pub(crate) fn set_sorted_right(&mut self, node: PivotId, value: bool) {
        self.nodes[node].sorted_right = value;
    }

    pub(crate) fn left(&self, node: PivotId) -> Option<PivotId> {
        self.nodes[node].left
    }

    pub(crate) fn right(&self, node: PivotId) -> Option<PivotId> {
        self.nodes[node].right
    }

    pub(crate) fn root(&self) -> Option<PivotId> {
        self.root
    }

    /// `into` absorbs `from`'s flags, OR-ing them in. Used when a
    /// newly-inserted pivot absorbs an equal-valued neighbor (`uniq_pivots`
    /// in the sort driver).
    pub(crate) fn adopt_flags(&mut self, into: PivotId, from: PivotId) {
        self.nodes[into].sorted_left |= self.nodes[from].sorted_left;
        self.nodes[into].sorted_right |= self.nodes[from].sorted_right;
    }

    /// Both flags set: the node sits between two sorted regions that now
    /// form one and is eligible for removal.
    pub(crate) fn is_depivotable(&self, node: PivotId) -> bool {
        !self.is_sentinel(node) && self.nodes[node].sorted_left && self.nodes[node].sorted_right
    }

    /// In-order next node, or `None` past the hi sentinel.
    pub(crate) fn successor(&self, node: PivotId) -> Option<PivotId> {
        if let Some(mut cur) = self.nodes[node].right {
            while let Some(l) = self.nodes[cur].left {
                cur = l;
            }
            return Some(cur);
        }
        let mut cur = node;
        while let Some(parent) = self.nodes[cur].parent {
            if self.nodes[parent].left == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
        None
    }

    /// In-order previous node, or `None` before the lo sentinel.
    pub(crate) fn predecessor(&self, node: PivotId) -> Option<PivotId> {
        if let Some(mut cur) = self.nodes[node].left {
            while let Some(r) = self.nodes[cur].right {
                cur = r;
            }
            return Some(cur);
        }
        let mut cur = node;
        while let Some(parent) = self.nodes[cur].parent {
            if self.nodes[parent].right == Some(cur) {
                return Some(parent);
            }
            cur = parent;
        }
        None
    }

    /// Returns `(lo, hi)` bracketing `k`: `lo` is the greatest pivot with
    /// `idx <= k`, `hi` the least pivot with `idx > k`. When `k` is itself a
    /// pivot's index, `lo` is that pivot and `hi` is its successor (`None`
    /// only when `k` is the hi sentinel's index).
    pub(crate) fn bound(&self, k: isize) -> (PivotId, Option<PivotId>) {
        let mut current = self.root;
        let mut lo = self.lo_sentinel;
        let mut hi = None;
        while let Some(node) = current {
            let node_idx = self.nodes[node].idx;
            if k < node_idx {
                hi = Some(node);
                current = self.nodes[node].left;
            } else if k > node_idx {
                lo = node;
                current = self.nodes[node].right;
            } else {
                lo = node;
                hi = self.successor(node);
                break;
            }
        }
        (lo, hi)
    }

    /// Inserts a fresh pivot at `idx`, descending from `start` (normally the
    /// nearer of two known bracketing pivots — purely a performance hint,
    /// any ancestor of the correct leaf slot works).
    pub(crate) fn insert<R: Rng>(&mut self, idx: isize, start: PivotId, rng: &mut R) -> PivotId {
        debug_assert!(
            self.nodes.iter().enumerate().all(|(i, _)| {
                let is_free = self.free.contains(&i);
                is_free || self.nodes[i].idx != idx
            }),
            "duplicate pivot index"
        );

        let mut current = start;
        loop {
            if idx < self.nodes[current].idx {
                match self.nodes[current].left {
                    Some(l) => current = l,
                    None => break,
                }
            } else {
                match self.nodes[current].right {
                    Some(r) => current = r,
                    None => break,
                }
            }
        }

        let node = PivotNode {
            idx,
            sorted_left: false,
            sorted_right: false,
            priority: rng.gen(),
            left: None,
            right: None,
            parent: Some(current),
        };
        let new_id = self.alloc(node);
        if idx < self.nodes[current].idx {
            self.nodes[current].left = Some(new_id);
        } else {
            self.nodes[current].right = Some(new_id);
        }
        self.bubble_up(new_id);
        #[cfg(debug_assertions)]
        {
            self.assert_node();
            self.assert_tree_flags();
        }
        new_id
    }

    fn alloc(&mut self, node: PivotNode) -> PivotId {
        if let Some(slot) = self.free.pop() {
            self.nodes[slot] = node;
            slot
        } else {
            self.nodes.push(node);
            self.nodes.len() - 1
        }
    }

    fn bubble_up(&mut self, mut node: PivotId) {
        while let Some(parent) = self.nodes[node].parent {
            if self.nodes[node].priority <= self.nodes[parent].priority {
                break;
            }
            if self.nodes[parent].left == Some(node) {
                self.rotate_right(parent);
            } else {
                self.rotate_left(parent);
            }
        }
        if self.nodes[node].parent.is_none() {
            self.root = Some(node);
        }
    }

    /// `x`'s right child rises to replace `x`.
    fn rotate_left(&mut self, x: PivotId) {
        let y = self.nodes[x].right.expect("rotate_left requires a right child");
        let parent = self.nodes[x].parent;
        let y_left = self.nodes[y].left;

        self.nodes[x].right = y_left;
        if let Some(yl) = y_left {
            self.nodes[yl].parent = Some(x);
        }
        self.nodes[y].left = Some(x);
        self.nodes[x].parent = Some(y);
        self.nodes[y].parent = parent;
        self.reattach(parent, x, y);
    }

    /// `x`'s left child rises to replace `x`.
    fn rotate_right(&mut self, x: PivotId) {
        let y = self.nodes[x].left.expect("rotate_right requires a left child");
        let parent = self.nodes[x].parent;
        let y_right = self.nodes[y].right;

        self.nodes[x].left = y_right;
        if let Some(yr) = y_right {
            self.nodes[yr].parent = Some(x);
        }
        self.nodes[y].right = Some(x);
        self.nodes[x].parent = Some(y);
        self.nodes[y].parent = parent;
        self.reattach(parent, x, y);
    }

    /// Points `parent`'s child slot that used to hold `old` at `new`
    /// instead, or updates the root pointer if `parent` is `None`.
    fn reattach(&mut self, parent: Option<PivotId>, old: PivotId, new: PivotId) {
        match parent {
            None => self.root = Some(new),
            Some(p) => {
                if self.nodes[p].left == Some(old) {
                    self.nodes[p].left = Some(new);
                } else {
                    self.nodes[p].right = Some(new);
                }
            }
        }
    }

    /// Removes `node` from the treap. Sentinels are never passed here.
    pub(crate) fn delete(&mut self, node: PivotId) {
        debug_assert!(!self.is_sentinel(node), "attempted to delete a sentinel");
        let parent = self.nodes[node].parent;
        let left = self.nodes[node].left;
        let right = self.nodes[node].right;

        let replacement = match (left, right) {
            (None, r) => r,
            (l, None) => l,
            (Some(l), Some(r)) => Some(self.merge(l, r)),
        };

        if let Some(rep) = replacement {
            self.nodes[rep].parent = parent;
        }
        match parent {
            None => self.root = replacement,
            Some(p) => {
                if self.nodes[p].left == Some(node) {
                    self.nodes[p].left = replacement;
                } else {
                    self.nodes[p].right = replacement;
                }
            }
        }
        self.free.push(node);
        #[cfg(debug_assertions)]
        {
            self.assert_node();
            self.assert_tree_flags();
        }
    }

    /// Merges two subtrees where every index in `left` is less than every
    /// index in `right`. The higher-priority root wins; its inner child
    /// merges recursively with the other subtree.
    fn merge(&mut self, left: PivotId, right: PivotId) -> PivotId {
        if self.nodes[left].priority >= self.nodes[right].priority {
            let merged = match self.nodes[left].right {
                Some(lr) => self.merge(lr, right),
                None => right,
            };
            self.nodes[left].right = Some(merged);
            self.nodes[merged].parent = Some(left);
            left
        } else {
            let merged = match self.nodes[right].left {
                Some(rl) => self.merge(left, rl),
                None => left,
            };
            self.nodes[right].left = Some(merged);
            self.nodes[merged].parent = Some(right);
            right
        }
    }

    /// Recursive BST-order, heap-order, and parent-link consistency check.
    /// Only ever run from debug assertions and tests.
    #[cfg(debug_assertions)]
    pub(crate) fn assert_node(&self) {
        if let Some(root) = self.root {
            assert!(self.nodes[root].parent.is_none());
            self.assert_node_rec(root, isize::MIN, isize::MAX, u64::MAX);
        }
    }

    #[cfg(debug_assertions)]
    fn assert_node_rec(&self, node: PivotId, lo: isize, hi: isize, max_priority: u64) {
        let n = &self.nodes[node];
        assert!(n.idx > lo && n.idx < hi, "BST order violated");
        assert!(n.priority <= max_priority, "heap order violated");
        if let Some(l) = n.left {
            assert_eq!(self.nodes[l].parent, Some(node));
            self.assert_node_rec(l, lo, n.idx, n.priority);
        }
        if let Some(r) = n.right {
            assert_eq!(self.nodes[r].parent, Some(node));
            self.assert_node_rec(r, n.idx, hi, n.priority);
        }
    }

    /// Walks the in-order sequence verifying that `SORTED_LEFT`/
    /// `SORTED_RIGHT` agree across adjacent pivots (invariant 6 of the data
    /// model).
    #[cfg(debug_assertions)]
    pub(crate) fn assert_tree_flags(&self) {
        let mut cur = Some(self.lo_sentinel);
        while let Some(node) = cur {
            let next = self.successor(node);
            if self.nodes[node].sorted_left {
                let next = next.expect("SORTED_LEFT requires a successor");
                assert!(self.nodes[next].sorted_right, "flag mismatch across pivots");
            }
            cur = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn new_treap_has_only_sentinels() {
        let t = PivotTreap::new(10);
        assert_eq!(t.idx(t.lo_sentinel()), -1);
        assert_eq!(t.idx(t.hi_sentinel()), 10);
        assert_eq!(t.bound(5).0, t.lo_sentinel());
        assert_eq!(t.bound(5).1, Some(t.hi_sentinel()));
    }

    #[test]
    fn insert_maintains_order_and_heap() {
        let mut t = PivotTreap::new(100);
        let mut r = rng();
        let mut inserted = Vec::new();
        for &idx in &[50_i32, 25, 75, 10, 90, 60, 40] {
            let (lo, hi) = t.bound(idx as isize);
            let start = if t.idx(lo) >= 0 || t.is_sentinel(lo) {
                lo
            } else {
                hi.unwrap()
            };
            let id = t.insert(idx as isize, start, &mut r);
            inserted.push(id);
            t.assert_node();
        }
    }

    #[test]
    fn bound_brackets_correctly() {
        let mut t = PivotTreap::new(100);
        let mut r = rng();
        t.insert(50, t.lo_sentinel(), &mut r);
        let (lo, hi) = t.bound(30);
        assert_eq!(t.idx(lo), -1);
        assert_eq!(t.idx(hi.unwrap()), 50);
        let (lo, hi) = t.bound(70);
        assert_eq!(t.idx(lo), 50);
        assert_eq!(t.idx(hi.unwrap()), 100);
        let (lo, hi) = t.bound(50);
        assert_eq!(t.idx(lo), 50);
        assert_eq!(t.idx(hi.unwrap()), 100);
    }

    #[test]
    fn delete_leaf_and_two_children() {
        let mut t = PivotTreap::new(100);
        let mut r = rng();
        let a = t.insert(50, t.lo_sentinel(), &mut r);
        let _b = t.insert(25, t.lo_sentinel(), &mut r);
        let _c = t.insert(75, t.hi_sentinel(), &mut r);
        t.assert_node();
        t.delete(a);
        t.assert_node();
        let (lo, hi) = t.bound(50);
        assert_eq!(t.idx(lo), 25);
        assert_eq!(t.idx(hi.unwrap()), 75);
    }

    #[test]
    fn successor_and_predecessor_walk_sentinels() {
        let mut t = PivotTreap::new(10);
        let mut r = rng();
        t.insert(5, t.lo_sentinel(), &mut r);
        let lo = t.lo_sentinel();
        let mid = t.successor(lo).unwrap();
        assert_eq!(t.idx(mid), 5);
        let hi = t.successor(mid).unwrap();
        assert_eq!(hi, t.hi_sentinel());
        assert_eq!(t.predecessor(hi).unwrap(), mid);
        assert_eq!(t.predecessor(mid).unwrap(), lo);
    }

    #[test]
    fn adopt_flags_ors_in() {
        let mut t = PivotTreap::new(10);
        let mut r = rng();
        let a = t.insert(3, t.lo_sentinel(), &mut r);
        let b = t.insert(6, t.hi_sentinel(), &mut r);
        t.set_sorted_right(a, true);
        t.adopt_flags(b, a);
        assert!(t.sorted_right(b));
    }
}
