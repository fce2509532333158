//! # citrine-tree: ordered map with subtree reductions
//!
//! A red-black tree that carries a user-supplied *reduction monoid* at every
//! subtree root, giving O(log n) ordered-map operations plus O(log n) folds
//! over arbitrary key ranges ([`RedBlackTree::fold_range`]) and
//! order-statistic lookups ([`RedBlackTree::nth`]).
//!
//! The reduction is a monoid `(Acc, combine, nil)` together with an
//! absorption step `include: (Acc, &Key) -> Acc`; each node caches the
//! reduction of its whole subtree and the tree refreshes caches locally on
//! every rotation and along every insert/remove path.
//!
//! Nodes live in a `Vec` arena addressed by `u32` ids; ownership is exclusive
//! (no shared pointers), and iterators borrow the tree, so use of an iterator
//! after structural mutation is rejected at compile time.
//!
//! This container is not thread-safe; it is intended for the single-threaded
//! simulation substrate it ships with.

mod iter;
mod reduce;
mod tree;

pub use iter::TreeIter;
pub use reduce::{NullReduce, OrdinalReduce, Reduce, SumReduce};
pub use tree::{RedBlackTree, TreeError};
