//! List Values
//!
//! An ordered sequence of byte strings with O(1) push at either end.
//! Backed by a `VecDeque`, so the length is always the element count and
//! iteration order is insertion order (head first).

use bytes::Bytes;
use std::collections::VecDeque;

/// An ordered list of values, head first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct List {
    items: VecDeque<Bytes>,
}

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a value at the tail. Returns the new length.
    pub fn push_back(&mut self, value: Bytes) -> usize {
        self.items.push_back(value);
        self.items.len()
    }

    /// Inserts a value at the head. Returns the new length.
    pub fn push_front(&mut self, value: Bytes) -> usize {
        self.items.push_front(value);
        self.items.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bytes> {
        self.items.iter()
    }

    /// Returns the inclusive slice `[start, end]`.
    ///
    /// Negative indices count from the tail (`-1` is the last element).
    /// Out-of-range bounds are clamped; a range that is empty after
    /// normalization yields an empty vector.
    ///
    /// ```
    /// use tidekv::storage::List;
    /// use bytes::Bytes;
    ///
    /// let list: List = ["a", "b", "c", "d"].into_iter().map(Bytes::from).collect();
    /// assert_eq!(list.range(-2, -1), vec!["c", "d"]);
    /// assert!(list.range(5, 10).is_empty());
    /// ```
    pub fn range(&self, start: i64, end: i64) -> Vec<Bytes> {
        match normalize_range(self.items.len(), start, end) {
            Some((start, end)) => self.items.range(start..=end).cloned().collect(),
            None => Vec::new(),
        }
    }
}

impl FromIterator<Bytes> for List {
    fn from_iter<I: IntoIterator<Item = Bytes>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Resolves Python-style inclusive bounds against a list of `len` elements.
///
/// Negative bounds get `len` added; `start` then floors at 0 and `end` caps
/// at `len - 1`. Returns `None` when `start > end` or `start >= len`.
fn normalize_range(len: usize, start: i64, end: i64) -> Option<(usize, usize)> {
    let len = i64::try_from(len).ok()?;

    let start = if start < 0 { (start + len).max(0) } else { start };
    let end = if end < 0 { end + len } else { end.min(len - 1) };

    if start > end || start >= len {
        return None;
    }

    Some((start as usize, end as usize))
}
