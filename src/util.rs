//! Utility type to support a rank-ordered, self balancing binary splay tree

#![warn(missing_docs)]

extern crate alloc;
use alloc::collections::TryReserveError;
use alloc::vec::Vec;

use core::fmt::Display;

//-----------------------------------------------------------------------------------------------//

// A leaf in a rank-ordered splay tree
#[derive(Clone)]
struct Leaf {
    parent: usize,
    left: usize,
    right: usize,
    size: usize,
}

//-----------------------------------------------------------------------------------------------//

/// A tree of integer leaves, ordered by rank rather than by key
///
/// Leaves carry no ordering data of their own. A leaf's position is its rank: the number of
/// leaves that precede it in-order. Ranks are never stored, because every structural edit would
/// invalidate them - each leaf instead maintains the size of its subtree, and a rank is resolved
/// by descending through the size fields. The in-order sequence of leaves is the document order
/// that containers built on this type present to their callers.
///
/// As with the keyed splay trees this type grew out of, the tree manages a set of `usize`
/// indices into an external vector of payload data, without storing the vector itself.
#[derive(Clone)]
pub struct Tree {
    leaf: Vec<Leaf>,
    root: usize,
    recycle: usize,
    count: usize,
}

impl Tree {
    /// Construct an empty tree
    pub fn new() -> Tree {
        Tree {
            leaf: Vec::new(),
            root: !0,
            recycle: !0,
            count: 0,
        }
    }

    /// Construct an empty tree, pre-allocating a given capacity
    pub fn with_capacity(capacity: usize) -> Tree {
        Tree {
            leaf: Vec::with_capacity(capacity),
            root: !0,
            recycle: !0,
            count: 0,
        }
    }

    /// Get the number of leaves in the tree
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Get the number of recycled leaves in the splay tree
    #[inline]
    pub fn recycle_count(&self) -> usize {
        self.leaf.len() - self.count
    }

    /// Get the current allocated size of the splay tree. This is the current `count` plus the
    /// `recycle_count`. Note that this is not necessarily the same as the allocated capacity.
    #[inline]
    pub fn allocated_count(&self) -> usize {
        self.leaf.len()
    }

    /// Check if there are any leaves in the splay tree
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Remove all leaves from the splay tree, discarding their storage
    pub fn clear(&mut self) {
        self.leaf.truncate(0);
        self.root = !0;
        self.recycle = !0;
        self.count = 0;
    }

    /// Recycle every leaf in the tree
    ///
    /// Iterative post-order walk with an explicit leaf stack and a parallel visited-marker
    /// stack; each reachable leaf is pushed onto the recycle list exactly once. Unlike
    /// [`Tree::clear`] the arena storage is kept, so subsequent insertions reuse the recycled
    /// leaves. No-op on an already-empty tree.
    pub fn release(&mut self) {
        let mut stack: Vec<usize> = Vec::new();
        let mut visited: Vec<bool> = Vec::new();

        let mut x = self.root;
        while !x != 0 {
            stack.push(x);
            visited.push(false);
            x = self.leaf[x].left;
        }

        while let Some(&y) = stack.last() {
            let top = visited.len() - 1;
            if visited[top] {
                stack.pop();
                visited.pop();
                self.free(y);
            } else {
                visited[top] = true;
                let mut x = self.leaf[y].right;
                while !x != 0 {
                    stack.push(x);
                    visited.push(false);
                    x = self.leaf[x].left;
                }
            }
        }

        self.root = !0;
        debug_assert_eq!(self.count, 0);
    }

    /// Reserves capacity for at least `additional` more leaves
    ///
    /// Note the implementation is subtle. The tree may already have some room that has been
    /// allocated then 'recycled', and this space is subtracted from the `additional` requested.
    /// This function returns the total amount of additional element storage that was required
    /// (if any), which is useful when implementing more complex types. Growth failure is
    /// reported rather than aborting, so callers can surface it as a resource error.
    pub fn reserve(&mut self, additional: usize) -> Result<usize, TryReserveError> {
        let recycle_count = self.recycle_count();
        if additional > recycle_count {
            let required = additional - recycle_count;
            self.leaf.try_reserve(required)?;
            Ok(required)
        } else {
            Ok(0)
        }
    }

    /// Append a leaf at the highest rank, making it the new root
    ///
    /// The previous tree becomes the new leaf's left subtree unchanged. This is the bulk-load
    /// path: loading a document one leaf at a time this way skips the order-statistic descent
    /// and leaves a right-degenerate chain that later splays flatten under use.
    pub fn push_back(&mut self) -> usize {
        let old = self.root;
        let leaf = self.alloc(!0);

        let size = if !old == 0 {
            1
        } else {
            self.leaf[old].parent = leaf;
            self.leaf[old].size + 1
        };
        self.leaf[leaf].left = old;
        self.leaf[leaf].size = size;

        self.root = leaf;
        leaf
    }

    /// Insert a fresh leaf at `rank`, returning it
    ///
    /// `rank` may equal `count`, which appends after the last leaf. The new leaf finishes as the
    /// root of the tree. Calling with `rank > count` is a contract violation; callers check
    /// their bounds first.
    pub fn insert_rank(&mut self, rank: usize) -> usize {
        debug_assert!(rank <= self.count);

        // First leaf is a special case
        if self.count == 0 {
            let leaf = self.alloc(!0);
            self.root = leaf;
            return leaf;
        }

        // Appending after the last leaf: splay it up and hang it to the left
        if rank == self.count {
            let last = self.locate(rank - 1);
            let leaf = self.alloc(!0);
            self.leaf[last].parent = leaf;
            self.leaf[leaf].left = last;
            let size = self.leaf[last].size + 1;
            self.leaf[leaf].size = size;
            self.root = leaf;
            return leaf;
        }

        // The leaf currently at `rank` becomes the right child of the new root and hands over
        // its left subtree
        let right = self.locate(rank);
        let leaf = self.alloc(!0);
        let left = self.leaf[right].left;
        self.leaf[leaf].left = left;
        self.leaf[leaf].right = right;
        if !left != 0 {
            self.leaf[left].parent = leaf;
        }
        self.leaf[right].parent = leaf;
        self.leaf[right].left = !0;
        resize(&mut self.leaf, right);
        resize(&mut self.leaf, leaf);
        self.root = leaf;
        leaf
    }

    /// Get the leaf at rank `k`, splaying it to the root
    ///
    /// If `k` is not less than the leaf count then `usize::MAX` is returned and the tree is not
    /// touched. This is the only way ranks are resolved to leaves.
    pub fn locate(&mut self, k: usize) -> usize {
        if k >= self.count {
            return !0;
        }

        let x = descend(&self.leaf, self.root, k);
        promote(&mut self.leaf, x);
        self.root = x;
        x
    }

    /// Cut the leaves at ranks `i..=j` and reinsert them after the `k`-th remaining leaf
    ///
    /// `k` is 1-based over the tree with the cut range already removed; `k == 0` reinserts the
    /// range at the very front. The whole operation is composed of splits and joins over the
    /// shared arena, so no leaf is allocated or recycled and the count is unchanged. Bounds
    /// (`i <= j < count` and `k <= count - (j - i + 1)`) are the caller's contract; containers
    /// built on this type check them unconditionally before calling down.
    pub fn relocate(&mut self, i: usize, j: usize, k: usize) {
        debug_assert!(i <= j && j < self.count);
        debug_assert!(k <= self.count - (j - i + 1));

        let leaf = &mut self.leaf[..];

        let (middle, right) = split(leaf, self.root, j);
        let (left, middle) = if i > 0 {
            split(leaf, middle, i - 1)
        } else {
            (!0, middle)
        };

        // The document with the range removed
        let rest = join(leaf, left, right);

        let (left, tail) = if k > 0 {
            split(leaf, rest, k - 1)
        } else {
            (!0, rest)
        };

        let head = join(leaf, left, middle);
        self.root = join(leaf, head, tail);
    }

    /// Get the first leaf in the tree (lowest rank)
    #[inline]
    pub fn first(&self) -> usize {
        first(&self.leaf, self.root)
    }

    /// Get the last leaf in the tree (highest rank)
    #[inline]
    pub fn last(&self) -> usize {
        last(&self.leaf, self.root)
    }

    /// Get the previous leaf in the tree
    #[inline]
    pub fn prev(&self, leaf: usize) -> usize {
        prev(&self.leaf, leaf)
    }

    /// Get the next leaf in the tree
    #[inline]
    pub fn next(&self, leaf: usize) -> usize {
        next(&self.leaf, leaf)
    }

    /// Collect every leaf in rank order
    ///
    /// Iterative in-order walk with an explicit stack, so the auxiliary memory is bounded by
    /// the tree depth rather than the call stack. The walk mutates nothing; it is a snapshot of
    /// the current structure.
    pub fn in_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.count);
        let mut stack: Vec<usize> = Vec::new();

        let mut x = self.root;
        loop {
            while !x != 0 {
                stack.push(x);
                x = self.leaf[x].left;
            }
            match stack.pop() {
                Some(y) => {
                    order.push(y);
                    x = self.leaf[y].right;
                }
                None => break,
            }
        }
        order
    }

    // Allocate and initialise a new leaf
    fn alloc(&mut self, parent: usize) -> usize {
        // Increase the leaf count
        self.count += 1;

        // Recycle an old leaf
        let leaf = self.recycle;
        if !leaf != 0 {
            let l = &mut self.leaf[leaf];
            self.recycle = l.parent;
            l.parent = parent;
            l.left = !0;
            l.right = !0;
            l.size = 1;

            return leaf;
        }

        // Inititialise a new one
        let leaf = self.leaf.len();
        self.leaf.push(Leaf {
            parent,
            left: !0,
            right: !0,
            size: 1,
        });

        // Return the new leaf
        leaf
    }

    // Free a leaf and add it to the recycle queue
    fn free(&mut self, leaf: usize) {
        // Decrease the leaf count
        self.count -= 1;

        // Recycle the leaf
        self.leaf[leaf].parent = self.recycle;
        self.recycle = leaf;
    }

    // TEST : Walk every reachable leaf and check parent links, size fields and the cached count
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert!(!self.root == 0 || self.leaf[self.root].parent == !0);

        let order = self.in_order();
        assert_eq!(order.len(), self.count);

        for &x in &order {
            let l = self.leaf[x].left;
            let r = self.leaf[x].right;

            if !l != 0 {
                assert_eq!(self.leaf[l].parent, x);
            }
            if !r != 0 {
                assert_eq!(self.leaf[r].parent, x);
            }

            let size = size_of(&self.leaf, l) + size_of(&self.leaf, r) + 1;
            assert_eq!(self.leaf[x].size, size);
        }

        if !self.root != 0 {
            assert_eq!(self.leaf[self.root].size, self.count);
        }
    }
}

impl Default for Tree {
    fn default() -> Self {
        Tree::new()
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[ ")?;
        let mut leaf = self.first();
        while !leaf != 0 {
            write!(f, "{leaf} ")?;
            leaf = self.next(leaf);
        }
        write!(f, "]")?;
        Ok(())
    }
}

//-----------------------------------------------------------------------------------------------//

// IMPLEMENTATION NOTE
//
// The functions below are low level. They are not 'unsafe' in the Rust sense, but they implement
// very low level operations. Use with caution.

// Subtree size of a possibly-absent leaf
#[inline]
fn size_of(leaf: &[Leaf], x: usize) -> usize {
    if !x == 0 {
        0
    } else {
        leaf[x].size
    }
}

// Recompute a leaf's size from its children
#[inline]
fn resize(leaf: &mut [Leaf], x: usize) {
    let size = size_of(leaf, leaf[x].left) + size_of(leaf, leaf[x].right) + 1;
    leaf[x].size = size;
}

// Rotate a leaf to the right, promoting its left child
//
// Relinks the grandparent's child link, the displaced inner subtree and the parent
// back-references on both affected leaves. No-op if the required child is absent. Rotation
// changes the subtree membership of exactly two leaves, so only those two sizes are recomputed,
// the demoted leaf before its new parent. This is the sole place structural size corrections
// are computed bottom-up; every higher-level operation is relinking plus these primitives.
fn rotate_right(leaf: &mut [Leaf], x: usize) {
    let y = leaf[x].left;
    if !y == 0 {
        return;
    }

    let p = leaf[x].parent;
    let b = leaf[y].right;

    leaf[y].parent = p;
    if !p != 0 {
        if leaf[p].left == x {
            leaf[p].left = y;
        } else {
            debug_assert_eq!(leaf[p].right, x);
            leaf[p].right = y;
        }
    }

    leaf[x].parent = y;
    leaf[y].right = x;
    leaf[x].left = b;
    if !b != 0 {
        leaf[b].parent = x;
    }

    resize(leaf, x);
    resize(leaf, y);
}

// Rotate a leaf to the left, promoting its right child
fn rotate_left(leaf: &mut [Leaf], x: usize) {
    let y = leaf[x].right;
    if !y == 0 {
        return;
    }

    let p = leaf[x].parent;
    let b = leaf[y].left;

    leaf[y].parent = p;
    if !p != 0 {
        if leaf[p].left == x {
            leaf[p].left = y;
        } else {
            debug_assert_eq!(leaf[p].right, x);
            leaf[p].right = y;
        }
    }

    leaf[x].parent = y;
    leaf[y].left = x;
    leaf[x].right = b;
    if !b != 0 {
        leaf[b].parent = x;
    }

    resize(leaf, x);
    resize(leaf, y);
}

// Promote a leaf to the root of its tree
//
// The order of the leaves is unchanged. Repeated application of the single and double rotation
// patterns (zig, zig-zig, zig-zag) moves the leaf up until it has no parent; each iteration
// strictly reduces its depth. Promotion is the key mechanism that enables splay trees to
// achieve amortised log(N) time access without any stored balance data. It is the
// responsibility of the caller to store the new root.
fn promote(leaf: &mut [Leaf], x: usize) {
    if !x == 0 {
        return;
    }

    loop {
        let y = leaf[x].parent;
        if !y == 0 {
            return;
        }

        let z = leaf[y].parent;

        if !z == 0 {
            // Zig
            if leaf[y].left == x {
                rotate_right(leaf, y);
            } else {
                debug_assert_eq!(leaf[y].right, x);
                rotate_left(leaf, y);
            }
        } else if leaf[y].left == x {
            if leaf[z].left == y {
                // Zig-zig
                rotate_right(leaf, z);
                rotate_right(leaf, y);
            } else {
                // Zig-zag
                debug_assert_eq!(leaf[z].right, y);
                rotate_right(leaf, y);
                rotate_left(leaf, z);
            }
        } else if leaf[z].right == y {
            // Zig-zig
            rotate_left(leaf, z);
            rotate_left(leaf, y);
        } else {
            // Zig-zag
            debug_assert_eq!(leaf[z].left, y);
            rotate_left(leaf, y);
            rotate_right(leaf, z);
        }
    }
}

// Find the leaf at rank `k` under `x` by order-statistic descent
//
// At each leaf, the rank of that leaf within its own subtree is the size of its left child; the
// descent goes left, stops, or goes right with the rank reduced by the left subtree and the
// leaf itself. `k` must be less than the subtree size, so the descent cannot fall off the tree.
fn descend(leaf: &[Leaf], mut x: usize, mut k: usize) -> usize {
    // `x` should be a root
    debug_assert!(!x == 0 || leaf[x].parent == !0);
    debug_assert!(k < size_of(leaf, x));

    loop {
        let s = size_of(leaf, leaf[x].left);
        if k == s {
            return x;
        }
        if k < s {
            x = leaf[x].left;
        } else {
            k = k - s - 1;
            x = leaf[x].right;
        }
    }
}

// Split a tree at a rank boundary
//
// Leaves of rank `0..=rank` stay under the returned left root; leaves of rank `rank+1..` move
// under the returned right root, which is `!0` when the boundary is the last leaf. The leaf at
// `rank` is splayed first, so both halves come back as detached roots sharing the one arena.
fn split(leaf: &mut [Leaf], root: usize, rank: usize) -> (usize, usize) {
    debug_assert!(rank < size_of(leaf, root));

    let x = descend(leaf, root, rank);
    promote(leaf, x);

    let right = leaf[x].right;
    leaf[x].right = !0;
    if !right != 0 {
        leaf[right].parent = !0;
    }
    resize(leaf, x);

    (x, right)
}

// Join two trees, every rank of `a` preceding every rank of `b`
//
// An empty side is the identity: the other root is returned unchanged. Otherwise the
// highest-rank leaf of `a` is splayed to its root and `b` is hung off its free right link.
// After this function the two input roots are interior structure of the result; neither may be
// used as an independent tree again.
fn join(leaf: &mut [Leaf], a: usize, b: usize) -> usize {
    if !a == 0 {
        return b;
    }
    if !b == 0 {
        return a;
    }

    let m = subtree_max(leaf, a);
    promote(leaf, m);

    leaf[m].right = b;
    leaf[b].parent = m;
    resize(leaf, m);

    m
}

// Get the highest-rank leaf in the subtree rooted at `x`
fn subtree_max(leaf: &[Leaf], mut x: usize) -> usize {
    debug_assert!(!x != 0);

    loop {
        let y = leaf[x].right;
        if !y == 0 {
            return x;
        }
        x = y;
    }
}

// Get the first leaf (the left-most)
fn first(leaf: &[Leaf], mut x: usize) -> usize {
    // `x` should be a root
    debug_assert!(!x == 0 || leaf[x].parent == !0);

    if !x == 0 {
        return !0;
    }

    loop {
        let y = leaf[x].left;
        if !y == 0 {
            return x;
        }
        x = y;
    }
}

// Get the last leaf (the right-most)
fn last(leaf: &[Leaf], mut x: usize) -> usize {
    // `x` should be a root
    debug_assert!(!x == 0 || leaf[x].parent == !0);

    if !x == 0 {
        return !0;
    }

    loop {
        let y = leaf[x].right;
        if !y == 0 {
            return x;
        }
        x = y;
    }
}

// Get the logical predecessor to a leaf
fn prev(leaf: &[Leaf], mut x: usize) -> usize {
    let mut y = leaf[x].left;
    if !y != 0 {
        loop {
            let z = leaf[y].right;
            if !z == 0 {
                return y;
            }
            y = z;
        }
    }

    loop {
        let y = leaf[x].parent;
        if !y == 0 {
            return !0;
        }
        if leaf[y].right == x {
            return y;
        }
        debug_assert_eq!(leaf[y].left, x);
        x = y;
    }
}

// Get the logical successor to a leaf
fn next(leaf: &[Leaf], mut x: usize) -> usize {
    let mut y = leaf[x].right;
    if !y != 0 {
        loop {
            let z = leaf[y].left;
            if !z == 0 {
                return y;
            }
            y = z;
        }
    }

    loop {
        let y = leaf[x].parent;
        if !y == 0 {
            return !0;
        }
        if leaf[y].left == x {
            return y;
        }
        debug_assert_eq!(leaf[y].right, x);
        x = y;
    }
}

//-----------------------------------------------------------------------------------------------//

#[test]
// A very simple test of bulk-loading a tree
fn test_tree_0() {
    let mut tree = Tree::new();

    for rank in 0..5 {
        let leaf = tree.push_back();
        debug_assert_eq!(leaf, rank);
    }

    debug_assert_eq!(tree.count(), 5);
    debug_assert_eq!(tree.in_order(), [0, 1, 2, 3, 4]);
    debug_assert_eq!(tree.first(), 0);
    debug_assert_eq!(tree.last(), 4);

    let mut leaf = tree.first();
    let mut walked = 0;
    while !leaf != 0 {
        debug_assert_eq!(leaf, walked);
        leaf = tree.next(leaf);
        walked += 1;
    }
    debug_assert_eq!(walked, 5);

    // And the same walk backwards
    let mut leaf = tree.last();
    while !leaf != 0 {
        walked -= 1;
        debug_assert_eq!(leaf, walked);
        leaf = tree.prev(leaf);
    }
    debug_assert_eq!(walked, 0);

    {
        use alloc::format;
        debug_assert_eq!(format!("{tree}"), "[ 0 1 2 3 4 ]");
    }

    tree.assert_invariants();
}

#[test]
// Order-statistic lookups after a bulk load
fn test_tree_1() {
    let mut tree = Tree::new();
    for _ in 0..100 {
        tree.push_back();
    }

    // Leaves are allocated in rank order by push_back, so rank == leaf index
    for k in 0..100 {
        debug_assert_eq!(tree.locate(k), k);
        tree.assert_invariants();
    }

    debug_assert_eq!(tree.locate(100), !0);
    debug_assert_eq!(tree.locate(!0), !0);
}

#[test]
// General-position insertion at the front reverses allocation order
fn test_tree_2() {
    let mut tree = Tree::new();

    for _ in 0..6 {
        tree.insert_rank(0);
        tree.assert_invariants();
    }

    debug_assert_eq!(tree.in_order(), [5, 4, 3, 2, 1, 0]);

    // And appending keeps the new leaf last
    let leaf = tree.insert_rank(6);
    debug_assert_eq!(tree.last(), leaf);
    tree.assert_invariants();
}

#[test]
// Cut-and-paste relinking of a rank range
fn test_tree_3() {
    let mut tree = Tree::new();
    for _ in 0..6 {
        tree.push_back();
    }

    // Move ranks 0..=2 to sit after the 2nd remaining leaf
    tree.relocate(0, 2, 2);
    debug_assert_eq!(tree.in_order(), [3, 4, 0, 1, 2, 5]);
    debug_assert_eq!(tree.count(), 6);
    tree.assert_invariants();

    // Move a single leaf to the front
    tree.relocate(5, 5, 0);
    debug_assert_eq!(tree.in_order(), [5, 3, 4, 0, 1, 2]);
    tree.assert_invariants();

    // Full-range relocation is the identity
    tree.relocate(0, 5, 0);
    debug_assert_eq!(tree.in_order(), [5, 3, 4, 0, 1, 2]);
    tree.assert_invariants();
}

#[test]
// Releasing a tree recycles every leaf for reuse
fn test_tree_4() {
    let mut tree = Tree::new();
    for _ in 0..50 {
        tree.push_back();
    }

    let allocated = tree.allocated_count();
    tree.release();

    debug_assert_eq!(tree.count(), 0);
    debug_assert!(tree.is_empty());
    debug_assert_eq!(tree.recycle_count(), 50);
    debug_assert_eq!(tree.allocated_count(), allocated);

    for _ in 0..50 {
        tree.push_back();
    }

    // Reload consumed the recycle list instead of growing the arena
    debug_assert_eq!(tree.allocated_count(), allocated);
    debug_assert_eq!(tree.count(), 50);
    tree.assert_invariants();
}

#[test]
// A stress test with bulk loading and random lookups
fn test_tree_5() {
    use rand::prelude::*;

    const COUNT: usize = 10000;

    let mut rng = SmallRng::seed_from_u64(1234567890);

    let mut tree = Tree::new();
    for _ in 0..COUNT {
        tree.push_back();
    }

    for _ in 0..COUNT {
        let k = rng.random_range(0..COUNT);
        debug_assert_eq!(tree.locate(k), k);
    }

    tree.assert_invariants();
}

#[test]
// A stress test with random relocations, checked against a flat model
fn test_tree_6() {
    use rand::prelude::*;

    const COUNT: usize = 500;
    const OPS: usize = 2000;

    let mut rng = SmallRng::seed_from_u64(9876543210);

    let mut tree = Tree::new();
    let mut model: Vec<usize> = Vec::new();
    for leaf in 0..COUNT {
        tree.push_back();
        model.push(leaf);
    }

    for op in 0..OPS {
        let i = rng.random_range(0..COUNT);
        let j = rng.random_range(i..COUNT);
        let k = rng.random_range(0..=COUNT - (j - i + 1));

        tree.relocate(i, j, k);

        let cut: Vec<usize> = model.drain(i..=j).collect();
        for (offset, leaf) in cut.into_iter().enumerate() {
            model.insert(k + offset, leaf);
        }

        if op % 100 == 0 {
            debug_assert_eq!(tree.in_order(), model);
            tree.assert_invariants();
        }
    }

    debug_assert_eq!(tree.in_order(), model);
    tree.assert_invariants();
}
