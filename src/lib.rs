//! ## Introduction
//!
//! This crate implements a rope: a sequence-of-characters container optimised for cutting a
//! contiguous range out of the sequence and reinserting it elsewhere. The backing structure is
//! a splay tree ordered by position (rank) rather than by key - an order-statistics tree whose
//! in-order traversal reproduces the document text, and which self-balances through amortised
//! rotations as it is used.
//!
//! ## Benefits
//!
//! - Moving a range costs a handful of splays, amortised logarithmic in the document length,
//!   regardless of how many characters the range holds. The untouched portions of the text are
//!   never scanned or copied.
//! - Characters are stored once, in a single array. Structural edits relink integer indices;
//!   the characters themselves never move after they are stored.
//! - The storage of the characters is separate to the storage of the structure of the tree.
//!   The tree manages `usize` indices into an external payload vector, so the same foundation
//!   can carry other payload types.
//! - Invalid ranges are reported as typed errors before anything is mutated; a failed
//!   operation always leaves the rope in its prior valid state.
//! - The library is small and `#![no_std]` (it requires `alloc`).
//!
//! ## Contents
//!
//! <center>
//!
//! | Type        | Purpose                                        |
//! |:------------|:-----------------------------------------------|
//! | `Rope`      | The character container and its range moves    |
//! | `RopeError` | Range and resource errors, detected up front   |
//!
//! </center>
//!
//! The crate exposes an additional type `util::Tree` that provides the foundation of the rope.
//! This can be thought of as a utility that manages a set of `usize` indices into an external
//! vector of data, ordered by rank and resolved through order statistics, without storing the
//! vector itself. It is provided to support development of additional rank-ordered collection
//! types.

#![no_std]
#![warn(missing_docs)]

mod rope;
pub mod util;

pub use rope::*;
