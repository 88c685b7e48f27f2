//! Implementation of a rope, backed by a rank-ordered splay tree
#![warn(missing_docs)]

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use core::{cell::RefCell, fmt::Display, iter::FusedIterator, str::FromStr};

use thiserror::Error;

use crate::util::Tree;

//-----------------------------------------------------------------------------------------------//

/// Errors reported by rope operations
///
/// Range errors are detected before any structural mutation, so a failed operation always
/// leaves the rope in its prior valid state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RopeError {
    /// A rank lies outside the interval the operation defines for it
    #[error("index {index} out of bounds for rope of length {len}")]
    OutOfBounds {
        /// The offending rank
        index: usize,
        /// The rope length at the time of the call
        len: usize,
    },

    /// A range was given with its start after its end
    #[error("range start {start} is greater than range end {end}")]
    ReversedRange {
        /// Start of the range
        start: usize,
        /// End of the range
        end: usize,
    },

    /// The reinsertion point lies beyond the text that remains once the range is cut
    #[error("destination {dest} is past the {remaining} characters left after the cut")]
    DestinationOutOfBounds {
        /// The 1-based reinsertion point
        dest: usize,
        /// Characters remaining after the cut
        remaining: usize,
    },

    /// The backing storage could not be grown
    #[error("failed to reserve space for {additional} more characters")]
    OutOfMemory {
        /// Characters the rope tried to make room for
        additional: usize,
    },
}

//-----------------------------------------------------------------------------------------------//

/// A sequence of characters optimised for cutting out a contiguous range and reinserting it
/// elsewhere, without scanning or copying the untouched portions.
///
/// Characters are stored once, in a slot per tree leaf; every edit after the initial load is
/// pure relinking inside the backing [`Tree`], so moving a million-character range costs the
/// same handful of splays as moving a single character. The tree sits behind a `RefCell`
/// because lookups splay the accessed leaf to the root, reconfiguring the tree through `&self`.
///
/// The rope is not a general editable-text buffer: it is loaded once (character appends and a
/// general-position insert are provided) and thereafter rearranged with
/// [`move_range`](Rope::move_range). There is no per-character delete.
#[derive(Clone)]
pub struct Rope {
    tree: RefCell<Tree>,
    text: Vec<char>,
}

impl Rope {
    /// Constructor
    pub fn new() -> Rope {
        Rope {
            tree: RefCell::new(Tree::new()),
            text: Vec::new(),
        }
    }

    /// Constructor
    pub fn with_capacity(capacity: usize) -> Rope {
        Rope {
            tree: RefCell::new(Tree::with_capacity(capacity)),
            text: Vec::with_capacity(capacity),
        }
    }

    /// Bulk-load a rope from a string slice
    ///
    /// Storage for the whole text is reserved up front, so the load either succeeds completely
    /// or fails with [`RopeError::OutOfMemory`] before any character is stored.
    pub fn from_text(text: &str) -> Result<Rope, RopeError> {
        let mut rope = Rope::new();
        rope.reserve(text.len())?;
        for value in text.chars() {
            rope.push(value)?;
        }
        Ok(rope)
    }

    /// Get the number of characters in the rope
    #[inline]
    pub fn len(&self) -> usize {
        self.tree.borrow().count()
    }

    /// Check if the rope holds any characters
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.borrow().is_empty()
    }

    /// Reserves capacity for at least `additional` more characters
    ///
    /// Growth failure is surfaced as [`RopeError::OutOfMemory`] rather than aborting, which
    /// lets the loading and inserting operations fail before any structural change.
    pub fn reserve(&mut self, additional: usize) -> Result<(), RopeError> {
        let tree = &mut self.tree.borrow_mut();

        debug_assert_eq!(self.text.len(), tree.allocated_count());

        let required = tree
            .reserve(additional)
            .map_err(|_| RopeError::OutOfMemory { additional })?;
        if required > 0 {
            self.text
                .try_reserve(required)
                .map_err(|_| RopeError::OutOfMemory { additional })?;
        }
        Ok(())
    }

    /// Append a character at the end of the rope
    ///
    /// This is the bulk-load path: the new character's leaf becomes the root with the previous
    /// tree as its left subtree, skipping the order-statistic descent an
    /// [`insert`](Rope::insert) at the tail would pay.
    pub fn push(&mut self, value: char) -> Result<(), RopeError> {
        self.reserve(1)?;
        let leaf = self.tree.borrow_mut().push_back();
        self.store(leaf, value);
        Ok(())
    }

    /// Insert a character at `rank`, shifting every later character up by one
    ///
    /// `rank` may equal the current length, which appends. The inserted character's leaf is
    /// splayed to the root.
    pub fn insert(&mut self, rank: usize, value: char) -> Result<(), RopeError> {
        let len = self.len();
        if rank > len {
            return Err(RopeError::OutOfBounds { index: rank, len });
        }

        self.reserve(1)?;
        let leaf = self.tree.borrow_mut().insert_rank(rank);
        self.store(leaf, value);
        Ok(())
    }

    /// Get the character at `rank`
    ///
    /// If `rank` is not less than the rope length then `None` is returned. A hit splays the
    /// character's leaf, so repeated lookups around the same position get faster.
    pub fn get(&self, rank: usize) -> Option<char> {
        let tree = &mut self.tree.borrow_mut();

        let leaf = tree.locate(rank);
        if !leaf == 0 {
            return None;
        }

        Some(self.text[leaf])
    }

    /// Cut the characters at ranks `i..=j` and reinsert them after the `k`-th character of the
    /// remaining text
    ///
    /// `k` is 1-based over the rope with the range already removed; `k == 0` reinserts the
    /// range at the very front. Requires `i <= j`, `j < len` and `k <= len - (j - i + 1)`;
    /// violations are reported before anything is touched, never clamped. The operation is
    /// pure relinking - no character is copied, created or destroyed.
    pub fn move_range(&mut self, i: usize, j: usize, k: usize) -> Result<(), RopeError> {
        let len = self.len();

        if i > j {
            return Err(RopeError::ReversedRange { start: i, end: j });
        }
        if j >= len {
            return Err(RopeError::OutOfBounds { index: j, len });
        }
        let remaining = len - (j - i + 1);
        if k > remaining {
            return Err(RopeError::DestinationOutOfBounds { dest: k, remaining });
        }

        self.tree.borrow_mut().relocate(i, j, k);
        Ok(())
    }

    /// Render the full text in position order
    ///
    /// Produces a fresh snapshot each call and mutates nothing; the walk uses an explicit
    /// stack, so arbitrarily unbalanced trees cannot overflow the call stack.
    pub fn render(&self) -> String {
        let tree = self.tree.borrow();
        let mut text = String::with_capacity(tree.count());
        for leaf in tree.in_order() {
            text.push(self.text[leaf]);
        }
        text
    }

    /// Remove all characters from the rope
    ///
    /// Every leaf is recycled, keeping the arena storage for reuse; a subsequent load of
    /// comparable size allocates nothing.
    pub fn clear(&mut self) {
        self.tree.borrow_mut().release();
    }

    /// Iterate over the characters of the rope in position order
    pub fn iter(&self) -> RopeIterator<'_> {
        let tree = &self.tree.borrow();
        RopeIterator {
            rope: self,
            leaf: tree.first(),
            count: tree.count(),
        }
    }

    // Store a character in the payload slot of a leaf. A brand-new leaf extends the slice; a
    // recycled one overwrites its old slot.
    fn store(&mut self, leaf: usize, value: char) {
        if leaf == self.text.len() {
            self.text.push(value);
        } else {
            self.text[leaf] = value;
        }
    }
}

impl Default for Rope {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Rope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for value in self {
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

impl FromStr for Rope {
    type Err = RopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rope::from_text(s)
    }
}

impl<'a> IntoIterator for &'a Rope {
    type Item = char;
    type IntoIter = RopeIterator<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

//-----------------------------------------------------------------------------------------------//

/// Iterator over the characters of a `Rope`, in position order
pub struct RopeIterator<'a> {
    rope: &'a Rope,
    leaf: usize,
    count: usize,
}

impl Iterator for RopeIterator<'_> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        if !self.leaf == 0 {
            return None;
        }

        let leaf = self.leaf;
        self.leaf = self.rope.tree.borrow().next(self.leaf);
        self.count -= 1;

        Some(self.rope.text[leaf])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.count, Some(self.count))
    }
}

impl FusedIterator for RopeIterator<'_> {}

//-----------------------------------------------------------------------------------------------//

#[test]
// Moving a prefix into the middle of the remaining text
fn test_rope_0() {
    let mut rope = Rope::from_text("abcdef").unwrap();

    // Cut "abc"; the remainder is "def"; reinsert after its 2nd character
    rope.move_range(0, 2, 2).unwrap();

    debug_assert_eq!(rope.render(), "deabcf");
    debug_assert_eq!(rope.len(), 6);
    rope.tree.borrow().assert_invariants();
}

#[test]
// Moving an interior range to the very front
fn test_rope_1() {
    let mut rope = Rope::from_text("hello").unwrap();

    // Cut "el"; the remainder is "hlo"; k == 0 reinserts at the front
    rope.move_range(1, 2, 0).unwrap();

    debug_assert_eq!(rope.render(), "elhlo");
    rope.tree.borrow().assert_invariants();
}

#[test]
// An empty rope renders as an empty string and rejects every move
fn test_rope_2() {
    let rope = Rope::from_text("").unwrap();

    debug_assert_eq!(rope.len(), 0);
    debug_assert!(rope.is_empty());
    debug_assert_eq!(rope.render(), "");
    debug_assert_eq!(rope.get(0), None);

    let mut rope = rope;
    debug_assert_eq!(
        rope.move_range(0, 0, 0),
        Err(RopeError::OutOfBounds { index: 0, len: 0 })
    );
}

#[test]
// A single-character rope is unchanged by the only legal move
fn test_rope_3() {
    let mut rope = Rope::from_text("a").unwrap();

    rope.move_range(0, 0, 0).unwrap();

    debug_assert_eq!(rope.render(), "a");
    debug_assert_eq!(rope.get(0), Some('a'));
}

#[test]
// Boundary shapes: full-range moves and a cut ending at the last character
fn test_rope_4() {
    let mut rope = Rope::from_text("splay").unwrap();

    // Splitting after the last character leaves an empty right half internally
    rope.move_range(0, 4, 0).unwrap();
    debug_assert_eq!(rope.render(), "splay");

    // Cut the tail and put it at the front
    rope.move_range(3, 4, 0).unwrap();
    debug_assert_eq!(rope.render(), "ayspl");

    // Cut the head and put it at the back
    rope.move_range(0, 1, 3).unwrap();
    debug_assert_eq!(rope.render(), "splay");

    rope.tree.borrow().assert_invariants();
}

#[test]
// Order-statistic lookups agree with the rendered text
fn test_rope_5() {
    let mut rope = Rope::from_text("abcdefghij").unwrap();
    rope.move_range(2, 5, 4).unwrap();
    rope.move_range(0, 3, 6).unwrap();

    let text: Vec<char> = rope.render().chars().collect();
    debug_assert_eq!(text.len(), rope.len());

    for (k, &value) in text.iter().enumerate() {
        debug_assert_eq!(rope.get(k), Some(value));
    }
    debug_assert_eq!(rope.get(text.len()), None);
}

#[test]
// Every range error is reported with its context and mutates nothing
fn test_rope_6() {
    let mut rope = Rope::from_text("abcdef").unwrap();

    debug_assert_eq!(
        rope.move_range(3, 2, 0),
        Err(RopeError::ReversedRange { start: 3, end: 2 })
    );
    debug_assert_eq!(
        rope.move_range(0, 6, 0),
        Err(RopeError::OutOfBounds { index: 6, len: 6 })
    );
    // Cutting "abc" leaves three characters, so k == 4 is one past the end
    debug_assert_eq!(
        rope.move_range(0, 2, 4),
        Err(RopeError::DestinationOutOfBounds { dest: 4, remaining: 3 })
    );
    debug_assert_eq!(
        rope.insert(7, 'x'),
        Err(RopeError::OutOfBounds { index: 7, len: 6 })
    );

    debug_assert_eq!(rope.render(), "abcdef");
    rope.tree.borrow().assert_invariants();
}

#[test]
// General-position insertion at the front, middle, end and into an empty rope
fn test_rope_7() {
    let mut rope = Rope::new();

    rope.insert(0, 'c').unwrap();
    rope.insert(0, 'a').unwrap();
    rope.insert(1, 'b').unwrap();
    rope.insert(3, 'd').unwrap();

    debug_assert_eq!(rope.render(), "abcd");
    rope.tree.borrow().assert_invariants();
}

#[test]
// Pushes, parsing, display and iteration all agree
fn test_rope_8() {
    use alloc::format;
    use alloc::string::ToString;

    let mut rope: Rope = "rope".parse().unwrap();
    rope.push('s').unwrap();

    debug_assert_eq!(rope.to_string(), "ropes");
    debug_assert_eq!(format!("{rope}"), rope.render());

    let collected: String = rope.iter().collect();
    debug_assert_eq!(collected, "ropes");
    debug_assert_eq!(rope.iter().size_hint(), (5, Some(5)));
}

#[test]
// Clearing recycles the leaves; a reload reuses them without growing the arena
fn test_rope_9() {
    let mut rope = Rope::from_text("recycled").unwrap();
    let allocated = rope.tree.borrow().allocated_count();

    rope.clear();
    debug_assert_eq!(rope.len(), 0);
    debug_assert_eq!(rope.render(), "");

    for value in "recycled".chars().rev() {
        rope.push(value).unwrap();
    }

    debug_assert_eq!(rope.render(), "delcycer");
    debug_assert_eq!(rope.tree.borrow().allocated_count(), allocated);
}

#[test]
// A stress test with random cut-and-paste operations, checked against a flat model
fn test_rope_10() {
    use rand::prelude::*;

    const COUNT: usize = 300;
    const OPS: usize = 2000;

    let mut rng = SmallRng::seed_from_u64(5678901234);

    let mut model: Vec<char> = Vec::new();
    let mut rope = Rope::new();
    for _ in 0..COUNT {
        let value = (b'a' + rng.random_range(0..26u8)) as char;
        rope.push(value).unwrap();
        model.push(value);
    }

    for op in 0..OPS {
        let i = rng.random_range(0..COUNT);
        let j = rng.random_range(i..COUNT);
        let k = rng.random_range(0..=COUNT - (j - i + 1));

        rope.move_range(i, j, k).unwrap();

        let cut: Vec<char> = model.drain(i..=j).collect();
        for (offset, value) in cut.into_iter().enumerate() {
            model.insert(k + offset, value);
        }

        if op % 100 == 0 {
            let text: String = model.iter().collect();
            debug_assert_eq!(rope.render(), text);
            rope.tree.borrow().assert_invariants();
        }
    }

    let text: String = model.iter().collect();
    debug_assert_eq!(rope.render(), text);
    debug_assert_eq!(rope.len(), COUNT);
    rope.tree.borrow().assert_invariants();
}
