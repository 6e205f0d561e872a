// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::{fmt::Debug,
          ops::{Add, Deref, Sub}};

/// 0-based index of a line in a [`crate::Document`] (global) or in a
/// [`crate::Block`] (local).
///
/// Values can be created using the [`line`] function, or by converting from `usize`.
/// All the line-indexed APIs accept `impl Into<LineIndex>`, so plain integers work too.
///
/// # Examples
///
/// ```
/// use r3bl_line_store::{LineIndex, line};
///
/// let index1 = LineIndex::new(5);
/// let index2 = line(5);
/// let index3 = LineIndex::from(5_usize);
///
/// assert_eq!(index1, index2);
/// assert_eq!(index2, index3);
/// assert_eq!(index1.as_usize(), 5);
/// ```
#[derive(Copy, Clone, PartialEq, PartialOrd, Ord, Eq, Hash, Default)]
pub struct LineIndex(pub usize);

/// Creates a new [`LineIndex`] from a value that can be converted into one.
pub fn line(arg_line_index: impl Into<LineIndex>) -> LineIndex { arg_line_index.into() }

impl LineIndex {
    #[must_use]
    pub fn new(value: usize) -> Self { Self(value) }

    #[must_use]
    pub fn as_usize(&self) -> usize { self.0 }

    #[must_use]
    pub fn is_zero(&self) -> bool { self.0 == 0 }

    /// Is this index a valid position for an existing line, in a sequence of `count`
    /// lines?
    #[must_use]
    pub fn is_in_bounds(&self, count: usize) -> bool { self.0 < count }

    /// Is this index a valid insertion point (one past the end is allowed), in a
    /// sequence of `count` lines?
    #[must_use]
    pub fn is_insert_position(&self, count: usize) -> bool { self.0 <= count }
}

impl Debug for LineIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LineIndex({})", self.0)
    }
}

impl From<usize> for LineIndex {
    fn from(value: usize) -> Self { Self(value) }
}

impl From<u32> for LineIndex {
    fn from(value: u32) -> Self { Self(value as usize) }
}

impl From<i32> for LineIndex {
    #[allow(clippy::cast_sign_loss)]
    fn from(value: i32) -> Self { Self(value.max(0) as usize) }
}

impl From<LineIndex> for usize {
    fn from(value: LineIndex) -> Self { value.0 }
}

impl Deref for LineIndex {
    type Target = usize;

    fn deref(&self) -> &Self::Target { &self.0 }
}

impl Add<usize> for LineIndex {
    type Output = LineIndex;

    fn add(self, rhs: usize) -> Self::Output { Self(self.0 + rhs) }
}

impl Sub<usize> for LineIndex {
    type Output = LineIndex;

    fn sub(self, rhs: usize) -> Self::Output { Self(self.0.saturating_sub(rhs)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(0, 0, false, true)]
    #[test_case(0, 1, true, true)]
    #[test_case(3, 3, false, true)]
    #[test_case(4, 3, false, false)]
    fn test_bounds(index: usize, count: usize, in_bounds: bool, insert_ok: bool) {
        assert_eq!(line(index).is_in_bounds(count), in_bounds);
        assert_eq!(line(index).is_insert_position(count), insert_ok);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(line(3) + 2, line(5));
        assert_eq!(line(3) - 5, line(0));
        assert_eq!(*line(7), 7);
        assert_eq!(line(-1), line(0));
    }
}
