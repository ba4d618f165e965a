//! Chunked collection for rows whose count is unknown until the cursor is exhausted.
//!
//! Rows are appended into fixed-capacity chunks. A full chunk is never grown or copied; the
//! next chunk is four times larger, up to [`MAX_CHUNK_CAPACITY`].

use std::fmt;
use std::ops::Index;

/// Capacity of the first chunk.
pub const FIRST_CHUNK_CAPACITY: usize = 16;
/// Chunks stop growing at this capacity.
pub const MAX_CHUNK_CAPACITY: usize = 16 * 1024;

fn next_capacity(previous: usize) -> usize {
    if previous == 0 {
        FIRST_CHUNK_CAPACITY
    } else {
        (previous * 4).min(MAX_CHUNK_CAPACITY)
    }
}

/// Append-only collector owned by one in-flight query.
pub struct ResultAccumulator<T> {
    chunks: Vec<Vec<T>>,
    len: usize,
    active_capacity: usize,
}

impl<T> ResultAccumulator<T> {
    /// An empty accumulator. Allocates nothing until the first append.
    #[must_use]
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            len: 0,
            active_capacity: 0,
        }
    }

    pub fn push(&mut self, item: T) {
        match self.chunks.last_mut() {
            Some(active) if active.len() < self.active_capacity => active.push(item),
            _ => {
                self.active_capacity = next_capacity(self.active_capacity);
                let mut chunk = Vec::with_capacity(self.active_capacity);
                chunk.push(item);
                self.chunks.push(chunk);
            }
        }
        self.len += 1;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stop appending and expose the items read-only, in append order.
    #[must_use]
    pub fn freeze(self) -> ResultList<T> {
        ResultList {
            chunks: self.chunks,
            len: self.len,
        }
    }
}

impl<T> Default for ResultAccumulator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Extend<T> for ResultAccumulator<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

impl<T> fmt::Debug for ResultAccumulator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultAccumulator")
            .field("len", &self.len)
            .field("chunks", &self.chunks.len())
            .field("active_capacity", &self.active_capacity)
            .finish()
    }
}

/// Frozen, indexable result of a query.
///
/// ```rust
/// use sql_mapper::prelude::*;
///
/// let mut acc = ResultAccumulator::new();
/// acc.extend(0..20);
/// let rows = acc.freeze();
/// assert_eq!(rows.len(), 20);
/// assert_eq!(rows[17], 17);
/// assert_eq!(rows.get(20), None);
/// ```
#[derive(Clone)]
pub struct ResultList<T> {
    chunks: Vec<Vec<T>>,
    len: usize,
}

impl<T> ResultList<T> {
    /// An empty list with no backing allocation.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            chunks: Vec::new(),
            len: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Item at `index`, walking chunk boundaries in order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        let mut remaining = index;
        for chunk in &self.chunks {
            if remaining < chunk.len() {
                return chunk.get(remaining);
            }
            remaining -= chunk.len();
        }
        None
    }

    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.chunks.iter().flatten()
    }

    /// Copy into one contiguous vector. A single chunk is handed over without copying.
    #[must_use]
    pub fn into_vec(mut self) -> Vec<T> {
        if self.chunks.len() == 1 {
            return self.chunks.pop().unwrap_or_default();
        }
        let mut out = Vec::with_capacity(self.len);
        for chunk in self.chunks {
            out.extend(chunk);
        }
        out
    }
}

impl<T> Default for ResultList<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Index<usize> for ResultList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(item) => item,
            None => panic!(
                "index out of bounds: the len is {} but the index is {index}",
                self.len
            ),
        }
    }
}

impl<T> IntoIterator for ResultList<T> {
    type Item = T;
    type IntoIter = std::iter::Flatten<std::vec::IntoIter<Vec<T>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.into_iter().flatten()
    }
}

impl<'a, T> IntoIterator for &'a ResultList<T> {
    type Item = &'a T;
    type IntoIter = std::iter::Flatten<std::slice::Iter<'a, Vec<T>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter().flatten()
    }
}

impl<T> From<ResultList<T>> for Vec<T> {
    fn from(list: ResultList<T>) -> Self {
        list.into_vec()
    }
}

impl<T: PartialEq> PartialEq for ResultList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: fmt::Debug> fmt::Debug for ResultList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(n: usize) -> ResultList<usize> {
        let mut acc = ResultAccumulator::new();
        for i in 0..n {
            acc.push(i);
        }
        assert_eq!(acc.len(), n);
        acc.freeze()
    }

    #[test]
    fn indexes_every_item_in_append_order() {
        for n in [0, 1, 17, 1000] {
            let list = filled(n);
            assert_eq!(list.len(), n);
            for i in 0..n {
                assert_eq!(list[i], i);
            }
            assert_eq!(list.get(n), None);
            assert_eq!(list.iter().count(), n);
        }
    }

    #[test]
    fn empty_accumulator_never_allocates() {
        let acc = ResultAccumulator::<String>::new();
        assert!(acc.is_empty());
        let list = acc.freeze();
        assert!(list.is_empty());
        assert_eq!(list.chunks.capacity(), 0);
        assert_eq!(list.first(), None);
    }

    #[test]
    fn chunks_grow_by_four_up_to_the_cap() {
        let mut acc = ResultAccumulator::new();
        acc.extend(0..100_000_u32);
        let capacities: Vec<usize> = acc.chunks.iter().map(Vec::capacity).collect();
        assert_eq!(
            &capacities[..7],
            &[16, 64, 256, 1024, 4096, 16384, 16384]
        );
        assert!(capacities.iter().all(|&c| c <= MAX_CHUNK_CAPACITY));
        for chunk in &acc.chunks[..acc.chunks.len() - 1] {
            assert_eq!(chunk.len(), chunk.capacity());
        }
        let list = acc.freeze();
        assert_eq!(list[99_999], 99_999);
        assert_eq!(list[16], 16);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn out_of_range_index_panics() {
        let list = filled(17);
        let _ = list[17];
    }

    #[test]
    fn into_vec_and_into_iter_preserve_order() {
        let list = filled(300);
        let owned: Vec<usize> = list.clone().into_iter().collect();
        assert_eq!(owned, (0..300).collect::<Vec<_>>());
        assert_eq!(list.into_vec(), owned);
        assert_eq!(filled(5).into_vec(), vec![0, 1, 2, 3, 4]);
    }
}
