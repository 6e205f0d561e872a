// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Per-block line boundary index.
//!
//! A [`LineTable`] doesn't own any bytes. It describes how the bytes of one pooled block
//! buffer are cut into lines, using one cumulative end offset per line:
//!
//! ```text
//! buffer:   h e l l o w o r l d !
//!           ├───────┤├────────┤├┤
//! offsets:        5         10  11
//! line:       0         1       2
//! ```
//!
//! The start of line `n` is the end of line `n - 1` (or 0 for the first line), so there
//! are no separators in the buffer. Since the table lives in the [`crate::Block`] and not
//! in the pooled buffer, it survives eviction of the buffer, and tells the reload path
//! exactly how many bytes to ask for.
//!
//! Every mutator takes the buffer and the block capacity as arguments. The buffer is
//! never grown past the capacity: an edit that won't fit fails with
//! [`LineStoreError::CapacityOverflow`] and leaves both the table and the buffer
//! untouched.

use crate::{LineIndex, LineStoreError, LineStoreResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineTable {
    offsets: Vec<u32>,
}

impl LineTable {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    #[must_use]
    pub fn line_count(&self) -> usize { self.offsets.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.offsets.is_empty() }

    /// Number of bytes of the buffer that are in use.
    #[must_use]
    pub fn used_len(&self) -> usize { self.offsets.last().map_or(0, |it| *it as usize) }

    #[must_use]
    pub fn offsets(&self) -> &[u32] { &self.offsets }

    /// Byte offset where line `n` starts. For `n == line_count()` this is the used
    /// length (where an appended line would start).
    #[must_use]
    pub fn start_of(&self, arg_n: impl Into<LineIndex>) -> usize {
        let n = arg_n.into().as_usize();
        match n {
            0 => 0,
            _ => self
                .offsets
                .get(n - 1)
                .map_or_else(|| self.used_len(), |it| *it as usize),
        }
    }

    /// Byte range of line `n`, or `None` if it is out of range.
    #[must_use]
    pub fn range_of(&self, arg_n: impl Into<LineIndex>) -> Option<std::ops::Range<usize>> {
        let n = arg_n.into();
        let end = *self.offsets.get(n.as_usize())? as usize;
        Some(self.start_of(n)..end)
    }

    /// Zero-copy view of line `n` in `buffer`. Empty if `n` is out of range, or if the
    /// buffer doesn't hold the bytes this table describes.
    #[must_use]
    pub fn get<'a>(&self, buffer: &'a [u8], arg_n: impl Into<LineIndex>) -> &'a [u8] {
        self.range_of(arg_n)
            .and_then(|range| buffer.get(range))
            .unwrap_or_default()
    }

    /// Insert `bytes` as a new line before line `n` (`n == line_count()` appends).
    ///
    /// # Errors
    ///
    /// - [`LineStoreError::LineOutOfRange`] if `n > line_count()`.
    /// - [`LineStoreError::CapacityOverflow`] if the used length would exceed
    ///   `capacity`.
    pub fn insert(
        &mut self,
        buffer: &mut Vec<u8>,
        capacity: usize,
        arg_n: impl Into<LineIndex>,
        bytes: &[u8],
    ) -> LineStoreResult<()> {
        let n = arg_n.into();
        if !n.is_insert_position(self.line_count()) {
            return Err(LineStoreError::LineOutOfRange {
                index: n.as_usize(),
                count: self.line_count(),
            });
        }
        let needed = self.used_len() + bytes.len();
        check_fits(needed, capacity)?;

        let start = self.start_of(n);
        buffer.truncate(self.used_len());
        buffer.splice(start..start, bytes.iter().copied());

        let delta = as_offset(bytes.len());
        self.offsets.insert(n.as_usize(), as_offset(start));
        for it in &mut self.offsets[n.as_usize()..] {
            *it += delta;
        }
        Ok(())
    }

    /// Insert `bytes` as the last line. Nothing is shifted.
    ///
    /// # Errors
    ///
    /// [`LineStoreError::CapacityOverflow`] if the used length would exceed `capacity`.
    pub fn append(
        &mut self,
        buffer: &mut Vec<u8>,
        capacity: usize,
        bytes: &[u8],
    ) -> LineStoreResult<()> {
        let needed = self.used_len() + bytes.len();
        check_fits(needed, capacity)?;
        buffer.truncate(self.used_len());
        buffer.extend_from_slice(bytes);
        self.offsets.push(as_offset(needed));
        Ok(())
    }

    /// Replace the contents of line `n` with `bytes`.
    ///
    /// # Errors
    ///
    /// - [`LineStoreError::LineOutOfRange`] if `n >= line_count()`.
    /// - [`LineStoreError::CapacityOverflow`] if the used length would exceed
    ///   `capacity`.
    pub fn replace(
        &mut self,
        buffer: &mut Vec<u8>,
        capacity: usize,
        arg_n: impl Into<LineIndex>,
        bytes: &[u8],
    ) -> LineStoreResult<()> {
        let n = arg_n.into();
        let range = self.range_of(n).ok_or(LineStoreError::LineOutOfRange {
            index: n.as_usize(),
            count: self.line_count(),
        })?;
        let old_len = range.len();
        let needed = self.used_len() - old_len + bytes.len();
        check_fits(needed, capacity)?;

        buffer.truncate(self.used_len());
        buffer.splice(range, bytes.iter().copied());

        let (grow, shrink) = (as_offset(bytes.len()), as_offset(old_len));
        for it in &mut self.offsets[n.as_usize()..] {
            *it = *it + grow - shrink;
        }
        Ok(())
    }

    /// Remove line `n` and its bytes.
    ///
    /// # Errors
    ///
    /// [`LineStoreError::LineOutOfRange`] if `n >= line_count()`.
    pub fn delete(
        &mut self,
        buffer: &mut Vec<u8>,
        arg_n: impl Into<LineIndex>,
    ) -> LineStoreResult<()> {
        let n = arg_n.into();
        let range = self.range_of(n).ok_or(LineStoreError::LineOutOfRange {
            index: n.as_usize(),
            count: self.line_count(),
        })?;
        let removed = as_offset(range.len());

        buffer.truncate(self.used_len());
        buffer.drain(range);

        self.offsets.remove(n.as_usize());
        for it in &mut self.offsets[n.as_usize()..] {
            *it -= removed;
        }
        Ok(())
    }

    /// Keep lines `[0, at)` here. Lines `[at, line_count())` are moved into `into_buffer`
    /// (which is cleared first), and the returned table describes them, rebased to start
    /// at offset 0.
    #[must_use]
    pub fn split_off(
        &mut self,
        buffer: &mut Vec<u8>,
        arg_at: impl Into<LineIndex>,
        into_buffer: &mut Vec<u8>,
    ) -> LineTable {
        let at = arg_at.into().as_usize().min(self.line_count());
        let cut = self.start_of(at);

        into_buffer.clear();
        into_buffer.extend_from_slice(buffer.get(cut..self.used_len()).unwrap_or_default());
        buffer.truncate(cut);

        let base = as_offset(cut);
        let moved = self.offsets.split_off(at);
        LineTable {
            offsets: moved.into_iter().map(|it| it - base).collect(),
        }
    }

    /// Smallest line index whose cumulative end offset is at or past `threshold`,
    /// clamped into `[1, line_count() - 1]`. Cutting before that line leaves both sides
    /// non-empty, and keeps a long line that crosses the threshold out of the first side.
    /// Returns `None` if there are fewer than 2 lines.
    #[must_use]
    pub fn cut_line_at_or_after(&self, threshold: usize) -> Option<LineIndex> {
        let count = self.line_count();
        if count < 2 {
            return None;
        }
        let found = self
            .offsets
            .iter()
            .position(|it| *it as usize >= threshold)
            .unwrap_or(count - 1)
            .clamp(1, count - 1);
        Some(LineIndex::new(found))
    }

    pub fn clear(&mut self, buffer: &mut Vec<u8>) {
        self.offsets.clear();
        buffer.clear();
    }

    /// Forget every line without touching any buffer (the buffer is gone, or belongs to
    /// the pool).
    pub fn reset(&mut self) { self.offsets.clear(); }
}

fn check_fits(needed: usize, capacity: usize) -> LineStoreResult<()> {
    if needed > capacity {
        return Err(LineStoreError::CapacityOverflow { needed, capacity });
    }
    Ok(())
}

/// Offsets are bounded by the block capacity, which [`crate::BlockPool::new`] checks
/// fits in a `u32`.
#[allow(clippy::cast_possible_truncation)]
fn as_offset(value: usize) -> u32 { value as u32 }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_eq2;
    use test_case::test_case;

    const CAPACITY: usize = 32;

    fn table_with(lines: &[&str]) -> (LineTable, Vec<u8>) {
        let mut table = LineTable::new();
        let mut buffer = Vec::with_capacity(CAPACITY);
        for it in lines {
            table.append(&mut buffer, CAPACITY, it.as_bytes()).unwrap();
        }
        (table, buffer)
    }

    fn lines_of(table: &LineTable, buffer: &[u8]) -> Vec<String> {
        (0..table.line_count())
            .map(|it| String::from_utf8_lossy(table.get(buffer, it)).to_string())
            .collect()
    }

    #[test]
    fn test_empty_table() {
        let table = LineTable::new();
        assert!(table.is_empty());
        assert_eq!(table.used_len(), 0);
        assert_eq!(table.get(&[], 0), b"");
    }

    #[test]
    fn test_append_and_get() {
        let (table, buffer) = table_with(&["hello", "world", "!"]);
        assert_eq2!(table.offsets(), &[5, 10, 11]);
        assert_eq!(table.used_len(), 11);
        assert_eq2!(lines_of(&table, &buffer), vec!["hello", "world", "!"]);
        assert_eq!(table.get(&buffer, 3), b"");
    }

    #[test]
    fn test_empty_lines_are_lines() {
        let (table, buffer) = table_with(&["", "a", ""]);
        assert_eq!(table.line_count(), 3);
        assert_eq2!(table.offsets(), &[0, 1, 1]);
        assert_eq2!(lines_of(&table, &buffer), vec!["", "a", ""]);
    }

    #[test_case(0, &["new", "aa", "bbb", "c"] ; "at start")]
    #[test_case(1, &["aa", "new", "bbb", "c"] ; "in the middle")]
    #[test_case(3, &["aa", "bbb", "c", "new"] ; "at end")]
    fn test_insert(n: usize, expected: &[&str]) {
        let (mut table, mut buffer) = table_with(&["aa", "bbb", "c"]);
        table.insert(&mut buffer, CAPACITY, n, b"new").unwrap();
        assert_eq2!(lines_of(&table, &buffer), expected);
        assert_eq!(table.used_len(), 9);
        assert_eq!(buffer.len(), 9);
    }

    #[test]
    fn test_insert_past_end_is_out_of_range() {
        let (mut table, mut buffer) = table_with(&["aa"]);
        assert_eq!(
            table.insert(&mut buffer, CAPACITY, 2, b"x"),
            Err(LineStoreError::LineOutOfRange { index: 2, count: 1 })
        );
    }

    #[test]
    fn test_overflow_leaves_everything_untouched() {
        let (mut table, mut buffer) = table_with(&["0123456789", "0123456789"]);
        let before = (table.clone(), buffer.clone());

        assert_eq!(
            table.insert(&mut buffer, CAPACITY, 1, b"0123456789abc"),
            Err(LineStoreError::CapacityOverflow {
                needed: 33,
                capacity: CAPACITY
            })
        );
        assert!(table.append(&mut buffer, CAPACITY, &[b'x'; 13]).is_err());
        assert!(table.replace(&mut buffer, CAPACITY, 0, &[b'x'; 23]).is_err());
        assert_eq2!((table, buffer), before);
    }

    #[test]
    fn test_exact_fit_is_allowed() {
        let (mut table, mut buffer) = table_with(&["0123456789"]);
        table.append(&mut buffer, CAPACITY, &[b'x'; 22]).unwrap();
        assert_eq!(table.used_len(), CAPACITY);
    }

    #[test_case(b"B" ; "shrink")]
    #[test_case(b"bbbbbbb" ; "grow")]
    #[test_case(b"" ; "to empty")]
    fn test_replace(bytes: &[u8]) {
        let (mut table, mut buffer) = table_with(&["aa", "bbb", "c"]);
        table.replace(&mut buffer, CAPACITY, 1, bytes).unwrap();
        assert_eq!(table.get(&buffer, 0), b"aa");
        assert_eq!(table.get(&buffer, 1), bytes);
        assert_eq!(table.get(&buffer, 2), b"c");
        assert_eq!(table.used_len(), 3 + bytes.len());
    }

    #[test]
    fn test_delete_shifts_following_lines() {
        let (mut table, mut buffer) = table_with(&["aa", "bbb", "c"]);
        table.delete(&mut buffer, 0).unwrap();
        assert_eq2!(lines_of(&table, &buffer), vec!["bbb", "c"]);
        assert_eq2!(table.offsets(), &[3, 4]);
        assert_eq!(
            table.delete(&mut buffer, 2),
            Err(LineStoreError::LineOutOfRange { index: 2, count: 2 })
        );
    }

    #[test]
    fn test_split_off_rebases_offsets() {
        let (mut table, mut buffer) = table_with(&["aa", "bbb", "c", "dddd"]);
        let mut other = Vec::with_capacity(CAPACITY);
        let tail = table.split_off(&mut buffer, 2, &mut other);

        assert_eq2!(lines_of(&table, &buffer), vec!["aa", "bbb"]);
        assert_eq2!(lines_of(&tail, &other), vec!["c", "dddd"]);
        assert_eq2!(tail.offsets(), &[1, 5]);
        assert_eq!(buffer.len(), 5);
    }

    #[test_case(0, Some(1) ; "clamped to one")]
    #[test_case(3, Some(1) ; "line that crosses the threshold")]
    #[test_case(6, Some(2) ; "line that ends on the threshold")]
    #[test_case(7, Some(3) ; "next line")]
    #[test_case(100, Some(3) ; "clamped to count minus one")]
    fn test_cut_line_at_or_after(threshold: usize, expected: Option<usize>) {
        // Ends: 2, 5, 6, 10.
        let (table, _) = table_with(&["aa", "bbb", "c", "dddd"]);
        assert_eq!(
            table.cut_line_at_or_after(threshold),
            expected.map(LineIndex::new)
        );
    }

    #[test]
    fn test_cut_line_needs_two_lines() {
        let (table, _) = table_with(&["only"]);
        assert_eq!(table.cut_line_at_or_after(0), None);
    }
}
