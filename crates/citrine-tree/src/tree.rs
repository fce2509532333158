//! Red-black tree over a `Vec` arena, with order statistics and cached
//! subtree reductions.

use thiserror::Error;

use crate::Reduce;
use crate::iter::TreeIter;

/// Index of a node in the arena. `NIL` is the absent child/parent sentinel.
pub(crate) type NodeIdx = u32;

pub(crate) const NIL: NodeIdx = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    Red,
    Black,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Left,
    Right,
}

impl Direction {
    fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

#[derive(Debug)]
struct Node<K, V, A> {
    key: K,
    value: V,
    color: Color,
    parent: NodeIdx,
    left: NodeIdx,
    right: NodeIdx,
    /// Number of nodes in the subtree rooted here (self included).
    size: usize,
    /// Cached reduction of the subtree rooted here.
    reduced: A,
}

/// Violations reported by [`RedBlackTree::check_invariants`].
///
/// These indicate a bug in the tree itself (or an impure reduction); they are
/// surfaced as values so property tests can report them with context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("root node is red")]
    RootNotBlack,

    #[error("red node has a red child")]
    RedRedViolation,

    #[error("black-height mismatch between siblings: left={left}, right={right}")]
    BlackHeightMismatch { left: usize, right: usize },

    #[error("in-order key sequence is not strictly increasing")]
    OrderViolation,

    #[error("cached subtree size {cached} differs from recomputed {actual}")]
    SizeMismatch { cached: usize, actual: usize },

    #[error("cached subtree reduction differs from recomputed value")]
    ReductionMismatch,

    #[error("child's parent link does not point back to its parent")]
    BrokenParentLink,

    #[error("tree length {len} differs from root subtree size {root_size}")]
    LengthMismatch { len: usize, root_size: usize },
}

/// Ordered map with O(log n) insert/remove/lookup, order-statistic queries,
/// and O(log n) reduction folds over key ranges.
///
/// # Invariants
///
/// Maintained across every mutation (verified by [`Self::check_invariants`]):
///
/// - in-order traversal yields strictly increasing keys
/// - no red node has a red child; the root is black
/// - every root-to-nil path crosses the same number of black nodes
/// - `node.size = 1 + left.size + right.size`
/// - `node.reduced = combine(include(left.reduced, &key), right.reduced)`
pub struct RedBlackTree<K, V, R: Reduce<K>> {
    slots: Vec<Option<Node<K, V, R::Acc>>>,
    free: Vec<NodeIdx>,
    root: NodeIdx,
    len: usize,
    reduce: R,
}

impl<K, V, R: Reduce<K> + Default> Default for RedBlackTree<K, V, R> {
    fn default() -> Self {
        Self::with_reduce(R::default())
    }
}

impl<K, V, R: Reduce<K> + Default> RedBlackTree<K, V, R> {
    /// Creates an empty tree with a defaulted reduction.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K, V, R: Reduce<K>> RedBlackTree<K, V, R> {
    /// Creates an empty tree carrying the given reduction.
    pub fn with_reduce(reduce: R) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NIL,
            len: 0,
            reduce,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reduction of the entire key set (`nil()` for an empty tree).
    pub fn reduction(&self) -> R::Acc {
        self.reduced_of(self.root)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.root = NIL;
        self.len = 0;
    }

    // ------------------------------------------------------------------
    // Arena plumbing
    // ------------------------------------------------------------------

    fn node(&self, idx: NodeIdx) -> &Node<K, V, R::Acc> {
        self.slots[idx as usize]
            .as_ref()
            .expect("node index refers to an occupied slot")
    }

    fn node_mut(&mut self, idx: NodeIdx) -> &mut Node<K, V, R::Acc> {
        self.slots[idx as usize]
            .as_mut()
            .expect("node index refers to an occupied slot")
    }

    fn alloc(&mut self, key: K, value: V) -> NodeIdx {
        let reduced = self
            .reduce
            .combine(self.reduce.include(self.reduce.nil(), &key), self.reduce.nil());

        let node = Node {
            key,
            value,
            color: Color::Red,
            parent: NIL,
            left: NIL,
            right: NIL,
            size: 1,
            reduced,
        };

        if let Some(idx) = self.free.pop() {
            debug_assert!(self.slots[idx as usize].is_none(), "free-list slot occupied");
            self.slots[idx as usize] = Some(node);
            idx
        } else {
            self.slots.push(Some(node));
            (self.slots.len() - 1) as NodeIdx
        }
    }

    fn dealloc(&mut self, idx: NodeIdx) {
        let taken = self.slots[idx as usize].take();
        debug_assert!(taken.is_some(), "deallocating an empty slot");
        self.free.push(idx);
    }

    fn is_red(&self, idx: NodeIdx) -> bool {
        idx != NIL && self.node(idx).color == Color::Red
    }

    fn size_of(&self, idx: NodeIdx) -> usize {
        if idx == NIL { 0 } else { self.node(idx).size }
    }

    fn reduced_of(&self, idx: NodeIdx) -> R::Acc {
        if idx == NIL {
            self.reduce.nil()
        } else {
            self.node(idx).reduced.clone()
        }
    }

    fn child(&self, idx: NodeIdx, dir: Direction) -> NodeIdx {
        let n = self.node(idx);
        match dir {
            Direction::Left => n.left,
            Direction::Right => n.right,
        }
    }

    /// Sets `parent.child[dir] = child` and fixes the back-link.
    fn set_child(&mut self, parent: NodeIdx, dir: Direction, child: NodeIdx) {
        {
            let p = self.node_mut(parent);
            match dir {
                Direction::Left => p.left = child,
                Direction::Right => p.right = child,
            }
        }
        if child != NIL {
            self.node_mut(child).parent = parent;
        }
    }

    fn direction_of(&self, parent: NodeIdx, child: NodeIdx) -> Direction {
        if self.node(parent).left == child {
            Direction::Left
        } else {
            debug_assert_eq!(self.node(parent).right, child, "not a child of parent");
            Direction::Right
        }
    }

    /// Recomputes `size` and `reduced` at `idx` from its children.
    fn local_recalc(&mut self, idx: NodeIdx) {
        let (left, right) = {
            let n = self.node(idx);
            (n.left, n.right)
        };

        let size = 1 + self.size_of(left) + self.size_of(right);
        let reduced = self.reduce.combine(
            self.reduce
                .include(self.reduced_of(left), &self.node(idx).key),
            self.reduced_of(right),
        );

        let n = self.node_mut(idx);
        n.size = size;
        n.reduced = reduced;
    }

    /// Recomputes `size`/`reduced` from `idx` up to the root.
    fn refresh_upward(&mut self, mut idx: NodeIdx) {
        while idx != NIL {
            self.local_recalc(idx);
            idx = self.node(idx).parent;
        }
    }

    /// Rotates the subtree rooted at `p` in direction `dir`; the child on the
    /// opposite side rises into `p`'s place. Refreshes the two rotated nodes'
    /// caches (ancestor caches are unaffected: the subtree's content is
    /// unchanged).
    fn rotate(&mut self, p: NodeIdx, dir: Direction) {
        let rising = self.child(p, dir.opposite());
        debug_assert_ne!(rising, NIL, "rotation requires a child on the rising side");

        let grandparent = self.node(p).parent;
        let inner = self.child(rising, dir);

        self.set_child(p, dir.opposite(), inner);
        self.set_child(rising, dir, p);

        if grandparent == NIL {
            self.root = rising;
            self.node_mut(rising).parent = NIL;
        } else {
            let pdir = self.direction_of(grandparent, p);
            self.set_child(grandparent, pdir, rising);
        }

        self.local_recalc(p);
        self.local_recalc(rising);
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    fn find_idx(&self, key: &K) -> NodeIdx
    where
        K: Ord,
    {
        let mut cur = self.root;
        while cur != NIL {
            match key.cmp(&self.node(cur).key) {
                std::cmp::Ordering::Equal => return cur,
                std::cmp::Ordering::Less => cur = self.node(cur).left,
                std::cmp::Ordering::Greater => cur = self.node(cur).right,
            }
        }
        NIL
    }

    pub fn contains_key(&self, key: &K) -> bool
    where
        K: Ord,
    {
        self.find_idx(key) != NIL
    }

    pub fn get(&self, key: &K) -> Option<&V>
    where
        K: Ord,
    {
        let idx = self.find_idx(key);
        (idx != NIL).then(|| &self.node(idx).value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V>
    where
        K: Ord,
    {
        let idx = self.find_idx(key);
        (idx != NIL).then(|| &mut self.node_mut(idx).value)
    }

    /// Greatest key `≤ key` (`closed = true`) or `< key` (`closed = false`).
    pub fn glb(&self, key: &K, closed: bool) -> Option<(&K, &V)>
    where
        K: Ord,
    {
        let mut best = NIL;
        let mut cur = self.root;

        while cur != NIL {
            let ord = self.node(cur).key.cmp(key);
            let acceptable = ord == std::cmp::Ordering::Less
                || (closed && ord == std::cmp::Ordering::Equal);
            if acceptable {
                best = cur;
                cur = self.node(cur).right;
            } else {
                cur = self.node(cur).left;
            }
        }

        (best != NIL).then(|| {
            let n = self.node(best);
            (&n.key, &n.value)
        })
    }

    /// Least key `≥ key` (`closed = true`) or `> key` (`closed = false`).
    pub fn lub(&self, key: &K, closed: bool) -> Option<(&K, &V)>
    where
        K: Ord,
    {
        let mut best = NIL;
        let mut cur = self.root;

        while cur != NIL {
            let ord = self.node(cur).key.cmp(key);
            let acceptable = ord == std::cmp::Ordering::Greater
                || (closed && ord == std::cmp::Ordering::Equal);
            if acceptable {
                best = cur;
                cur = self.node(cur).left;
            } else {
                cur = self.node(cur).right;
            }
        }

        (best != NIL).then(|| {
            let n = self.node(best);
            (&n.key, &n.value)
        })
    }

    /// `i`-th smallest key (0-based), via subtree sizes.
    pub fn nth(&self, mut i: usize) -> Option<(&K, &V)> {
        if i >= self.len {
            return None;
        }

        let mut cur = self.root;
        loop {
            debug_assert_ne!(cur, NIL, "rank within bounds implies a node");
            let left_size = self.size_of(self.node(cur).left);
            if i < left_size {
                cur = self.node(cur).left;
            } else if i == left_size {
                let n = self.node(cur);
                return Some((&n.key, &n.value));
            } else {
                i -= left_size + 1;
                cur = self.node(cur).right;
            }
        }
    }

    // ------------------------------------------------------------------
    // Insert
    // ------------------------------------------------------------------

    /// Inserts `key → value`. Returns `true` if the key is new; overwrites
    /// the value (and returns `false`) if the key was already present.
    pub fn insert(&mut self, key: K, value: V) -> bool
    where
        K: Ord,
    {
        let mut parent = NIL;
        let mut dir = Direction::Left;
        let mut cur = self.root;

        while cur != NIL {
            match key.cmp(&self.node(cur).key) {
                std::cmp::Ordering::Equal => {
                    self.node_mut(cur).value = value;
                    return false;
                }
                std::cmp::Ordering::Less => {
                    parent = cur;
                    dir = Direction::Left;
                    cur = self.node(cur).left;
                }
                std::cmp::Ordering::Greater => {
                    parent = cur;
                    dir = Direction::Right;
                    cur = self.node(cur).right;
                }
            }
        }

        let idx = self.alloc(key, value);
        if parent == NIL {
            self.root = idx;
        } else {
            self.set_child(parent, dir, idx);
        }
        self.len += 1;

        self.refresh_upward(parent);
        self.fix_insert(idx);

        true
    }

    /// Classical insert fix-up: resolve red-red violations walking rootward.
    fn fix_insert(&mut self, mut n: NodeIdx) {
        loop {
            let p = self.node(n).parent;
            if p == NIL {
                self.node_mut(n).color = Color::Black;
                return;
            }
            if !self.is_red(p) {
                return;
            }

            let g = self.node(p).parent;
            if g == NIL {
                // red root
                self.node_mut(p).color = Color::Black;
                return;
            }

            let pdir = self.direction_of(g, p);
            let uncle = self.child(g, pdir.opposite());

            if self.is_red(uncle) {
                // red uncle: recolor and ascend
                self.node_mut(p).color = Color::Black;
                self.node_mut(uncle).color = Color::Black;
                self.node_mut(g).color = Color::Red;
                n = g;
                continue;
            }

            // black uncle: at most two rotations terminate
            let rotated_parent = if self.direction_of(p, n) == pdir {
                p
            } else {
                // inner child: first rotation converts to the outer case
                self.rotate(p, pdir);
                n
            };

            self.rotate(g, pdir.opposite());
            self.node_mut(rotated_parent).color = Color::Black;
            self.node_mut(g).color = Color::Red;
            return;
        }
    }

    // ------------------------------------------------------------------
    // Remove
    // ------------------------------------------------------------------

    /// Removes `key`; returns `false` if absent.
    pub fn remove(&mut self, key: &K) -> bool
    where
        K: Ord,
    {
        let z = self.find_idx(key);
        if z == NIL {
            return false;
        }
        self.remove_at(z);
        true
    }

    fn remove_at(&mut self, z: NodeIdx) {
        let mut target = z;

        // Two children: move the in-order predecessor's payload into z and
        // delete the predecessor's node instead.
        if self.node(z).left != NIL && self.node(z).right != NIL {
            let mut pred = self.node(z).left;
            while self.node(pred).right != NIL {
                pred = self.node(pred).right;
            }
            self.swap_payload(z, pred);
            target = pred;
        }

        let y = target;
        let n = self.node(y);
        debug_assert!(
            n.left == NIL || n.right == NIL,
            "deletion target has at most one child"
        );
        let child = if n.left != NIL { n.left } else { n.right };
        let parent = n.parent;
        let y_color = n.color;
        let dir = if parent == NIL {
            Direction::Left
        } else {
            self.direction_of(parent, y)
        };

        if parent == NIL {
            self.root = child;
            if child != NIL {
                self.node_mut(child).parent = NIL;
            }
        } else {
            self.set_child(parent, dir, child);
        }

        self.dealloc(y);
        self.len -= 1;
        self.refresh_upward(parent);

        if y_color == Color::Black {
            if child != NIL && self.is_red(child) {
                // promoted red child absorbs the lost black
                self.node_mut(child).color = Color::Black;
            } else if parent != NIL {
                self.fix_remove(parent, dir);
            }
            // parent == NIL with a black (or absent) child: the whole tree
            // lost one black level uniformly; nothing to fix
        }
    }

    fn swap_payload(&mut self, a: NodeIdx, b: NodeIdx) {
        debug_assert_ne!(a, b);
        let mut na = self.slots[a as usize]
            .take()
            .expect("occupied slot in payload swap");
        {
            let nb = self.slots[b as usize]
                .as_mut()
                .expect("occupied slot in payload swap");
            std::mem::swap(&mut na.key, &mut nb.key);
            std::mem::swap(&mut na.value, &mut nb.value);
        }
        self.slots[a as usize] = Some(na);
    }

    /// Deletion fix-up. `parent.child(dir)` is the deficient (double-black)
    /// position, possibly nil. Case numbering follows the classical sibling
    /// analysis: S = sibling, C = close nephew, D = distant nephew.
    fn fix_remove(&mut self, mut p: NodeIdx, mut dir: Direction) {
        loop {
            let mut s = self.child(p, dir.opposite());
            debug_assert_ne!(s, NIL, "deficient side implies a sibling");

            if self.is_red(s) {
                // red sibling: rotate to expose a black sibling
                self.rotate(p, dir);
                self.node_mut(s).color = Color::Black;
                self.node_mut(p).color = Color::Red;
                s = self.child(p, dir.opposite());
                debug_assert_ne!(s, NIL);
            }

            let c = self.child(s, dir);
            let d = self.child(s, dir.opposite());

            if self.is_red(d) {
                // distant nephew red: single rotation terminates
                self.rotate(p, dir);
                let p_color = self.node(p).color;
                self.node_mut(s).color = p_color;
                self.node_mut(p).color = Color::Black;
                self.node_mut(d).color = Color::Black;
                return;
            }

            if self.is_red(c) {
                // close nephew red: double rotation terminates
                self.rotate(s, dir.opposite());
                self.rotate(p, dir);
                let p_color = self.node(p).color;
                self.node_mut(c).color = p_color;
                self.node_mut(p).color = Color::Black;
                self.node_mut(s).color = Color::Black;
                return;
            }

            if self.is_red(p) {
                // sibling and nephews black, parent red: swap P/S colors
                self.node_mut(s).color = Color::Red;
                self.node_mut(p).color = Color::Black;
                return;
            }

            // everything black: push the deficiency one level up
            self.node_mut(s).color = Color::Red;
            let g = self.node(p).parent;
            if g == NIL {
                return;
            }
            dir = self.direction_of(g, p);
            p = g;
        }
    }

    // ------------------------------------------------------------------
    // Range folds
    // ------------------------------------------------------------------

    /// Folds the reduction over all keys in the half-open range `[lo, hi)`,
    /// in O(log n) using the cached subtree reductions.
    pub fn fold_range(&self, lo: &K, hi: &K) -> R::Acc
    where
        K: Ord,
    {
        if lo >= hi {
            return self.reduce.nil();
        }
        self.fold_between(self.root, lo, hi)
    }

    fn fold_between(&self, idx: NodeIdx, lo: &K, hi: &K) -> R::Acc
    where
        K: Ord,
    {
        if idx == NIL {
            return self.reduce.nil();
        }
        let n = self.node(idx);
        if n.key < *lo {
            return self.fold_between(n.right, lo, hi);
        }
        if n.key >= *hi {
            return self.fold_between(n.left, lo, hi);
        }

        // key in range: left tail + key + right head
        let left = self.fold_ge(n.left, lo);
        let right = self.fold_lt(n.right, hi);
        self.reduce
            .combine(self.reduce.include(left, &n.key), right)
    }

    /// Reduction of all keys `≥ lo` in the subtree at `idx`.
    fn fold_ge(&self, idx: NodeIdx, lo: &K) -> R::Acc
    where
        K: Ord,
    {
        if idx == NIL {
            return self.reduce.nil();
        }
        let n = self.node(idx);
        if n.key < *lo {
            self.fold_ge(n.right, lo)
        } else {
            // right subtree is wholly in range: use its cache
            let left = self.fold_ge(n.left, lo);
            self.reduce
                .combine(self.reduce.include(left, &n.key), self.reduced_of(n.right))
        }
    }

    /// Reduction of all keys `< hi` in the subtree at `idx`.
    fn fold_lt(&self, idx: NodeIdx, hi: &K) -> R::Acc
    where
        K: Ord,
    {
        if idx == NIL {
            return self.reduce.nil();
        }
        let n = self.node(idx);
        if n.key >= *hi {
            self.fold_lt(n.left, hi)
        } else {
            let right = self.fold_lt(n.right, hi);
            self.reduce.combine(
                self.reduce.include(self.reduced_of(n.left), &n.key),
                right,
            )
        }
    }

    // ------------------------------------------------------------------
    // Iteration plumbing (used by `TreeIter`)
    // ------------------------------------------------------------------

    /// Bidirectional in-order iterator over `(key, value)` pairs.
    pub fn iter(&self) -> TreeIter<'_, K, V, R> {
        TreeIter::new(self)
    }

    pub(crate) fn entry(&self, idx: NodeIdx) -> (&K, &V) {
        let n = self.node(idx);
        (&n.key, &n.value)
    }

    pub(crate) fn min_idx(&self) -> NodeIdx {
        self.extreme_idx(Direction::Left)
    }

    pub(crate) fn max_idx(&self) -> NodeIdx {
        self.extreme_idx(Direction::Right)
    }

    fn extreme_idx(&self, dir: Direction) -> NodeIdx {
        let mut cur = self.root;
        if cur == NIL {
            return NIL;
        }
        while self.child(cur, dir) != NIL {
            cur = self.child(cur, dir);
        }
        cur
    }

    pub(crate) fn successor_idx(&self, idx: NodeIdx) -> NodeIdx {
        self.adjacent_idx(idx, Direction::Right)
    }

    pub(crate) fn predecessor_idx(&self, idx: NodeIdx) -> NodeIdx {
        self.adjacent_idx(idx, Direction::Left)
    }

    fn adjacent_idx(&self, idx: NodeIdx, dir: Direction) -> NodeIdx {
        let ahead = self.child(idx, dir);
        if ahead != NIL {
            let mut cur = ahead;
            while self.child(cur, dir.opposite()) != NIL {
                cur = self.child(cur, dir.opposite());
            }
            return cur;
        }

        // ascend while coming from the `dir` side
        let mut cur = idx;
        let mut parent = self.node(cur).parent;
        while parent != NIL && self.direction_of(parent, cur) == dir {
            cur = parent;
            parent = self.node(cur).parent;
        }
        parent
    }

    // ------------------------------------------------------------------
    // Invariant verification
    // ------------------------------------------------------------------

    /// Verifies every structural invariant; O(n). Intended for tests and
    /// diagnostics, not hot paths.
    pub fn check_invariants(&self) -> Result<(), TreeError>
    where
        K: Ord,
        R::Acc: PartialEq,
    {
        if self.root != NIL {
            if self.is_red(self.root) {
                return Err(TreeError::RootNotBlack);
            }
            if self.node(self.root).parent != NIL {
                return Err(TreeError::BrokenParentLink);
            }
        }

        let (_black_height, size) = self.verify_subtree(self.root)?;

        if size != self.len {
            return Err(TreeError::LengthMismatch {
                len: self.len,
                root_size: size,
            });
        }

        // strict in-order ascent
        let mut idx = self.min_idx();
        let mut prev: Option<&K> = None;
        while idx != NIL {
            let (k, _) = self.entry(idx);
            if let Some(p) = prev {
                if p >= k {
                    return Err(TreeError::OrderViolation);
                }
            }
            prev = Some(k);
            idx = self.successor_idx(idx);
        }

        Ok(())
    }

    /// Returns `(black_height, subtree_size)` or the first violation found.
    fn verify_subtree(&self, idx: NodeIdx) -> Result<(usize, usize), TreeError>
    where
        K: Ord,
        R::Acc: PartialEq,
    {
        if idx == NIL {
            return Ok((0, 0));
        }

        let n = self.node(idx);

        for child in [n.left, n.right] {
            if child != NIL {
                if self.node(child).parent != idx {
                    return Err(TreeError::BrokenParentLink);
                }
                if n.color == Color::Red && self.node(child).color == Color::Red {
                    return Err(TreeError::RedRedViolation);
                }
            }
        }

        let (lh, lsize) = self.verify_subtree(n.left)?;
        let (rh, rsize) = self.verify_subtree(n.right)?;

        if lh != rh {
            return Err(TreeError::BlackHeightMismatch { left: lh, right: rh });
        }

        let size = 1 + lsize + rsize;
        if n.size != size {
            return Err(TreeError::SizeMismatch {
                cached: n.size,
                actual: size,
            });
        }

        let expected = self.reduce.combine(
            self.reduce.include(self.reduced_of(n.left), &n.key),
            self.reduced_of(n.right),
        );
        if n.reduced != expected {
            return Err(TreeError::ReductionMismatch);
        }

        let own_black = usize::from(n.color == Color::Black);
        Ok((lh + own_black, size))
    }
}

impl<K: std::fmt::Debug, V: std::fmt::Debug, R: Reduce<K>> std::fmt::Debug
    for RedBlackTree<K, V, R>
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V, R: Reduce<K>> IntoIterator for &'a RedBlackTree<K, V, R> {
    type Item = (&'a K, &'a V);
    type IntoIter = TreeIter<'a, K, V, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
