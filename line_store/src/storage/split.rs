// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Splitting a block that an edit doesn't fit in.
//!
//! The cut point depends on *where* in the block the edit lands, so that the half which
//! receives the edit gets most of the free space:
//!
//! ```text
//! edit offset in [0, C/3)     cut near C/3   ┌───┬───────┐  edit goes left, lots of room
//! edit offset in [C/3, 2C/3)  cut near C/2   ┌─────┬─────┐  balanced
//! edit offset in [2C/3, C]    cut near 2C/3  ┌───────┬───┐  edit goes right, lots of room
//! ```
//!
//! This keeps typing at the end of a block (the common case when a file is being
//! written top to bottom) from splitting the same block over and over.

use crate::{Block, Document, LineIndex, LineStoreError, LineStoreResult};

/// The byte offset a block of `capacity` bytes is cut near, when the edit that
/// overflowed it starts at `edit_offset`.
#[must_use]
pub fn split_threshold(capacity: usize, edit_offset: usize) -> usize {
    let third = capacity / 3;
    let two_thirds = 2 * capacity / 3;
    if edit_offset < third {
        third
    } else if edit_offset < two_thirds {
        capacity / 2
    } else {
        two_thirds
    }
}

impl Document {
    /// Split the block at `block_index` (where an edit of local line `n` overflowed) near
    /// [`split_threshold`]. Both halves keep at least one line. Returns the number of
    /// lines left in the first half, or `None` if the block has a single line and can't
    /// be split.
    ///
    /// # Errors
    ///
    /// [`LineStoreError::PoolExhausted`] if no block can be acquired for the second
    /// half. The block is left as it was.
    pub fn split_block(
        &mut self,
        block_index: usize,
        arg_n: impl Into<LineIndex>,
    ) -> LineStoreResult<Option<usize>> {
        let block = &self.blocks[block_index];
        let edit_offset = block.line_table().start_of(arg_n);
        let threshold = split_threshold(self.block_capacity, edit_offset);
        let Some(cut) = block.line_table().cut_line_at_or_after(threshold) else {
            return Ok(None);
        };
        self.split_block_at(block_index, cut)?;
        Ok(Some(cut.as_usize()))
    }

    /// Split the block at `block_index` so that it keeps lines `[0, at)`, and the rest
    /// moves into a new block inserted right after it. `at` must be in
    /// `[1, line_count - 1]`. The new block is released if the cursor isn't on it.
    ///
    /// # Errors
    ///
    /// - [`LineStoreError::PoolExhausted`] if no block can be acquired for the second
    ///   half. The block is left as it was.
    /// - [`LineStoreError::LineOutOfRange`] if `at` would leave a half empty.
    pub fn split_block_at(
        &mut self,
        block_index: usize,
        arg_at: impl Into<LineIndex>,
    ) -> LineStoreResult<()> {
        let at = arg_at.into();
        let count = self.blocks[block_index].line_count();
        if at.is_zero() || !at.is_in_bounds(count) {
            return Err(LineStoreError::LineOutOfRange {
                index: at.as_usize(),
                count,
            });
        }

        self.ensure_loaded(block_index)?;
        let mut new_block: Block = self.new_loaded_block()?;
        if let Err(error) = self.blocks[block_index].split_off_into(at, &mut new_block) {
            new_block.clear(&mut self.pool.borrow_mut());
            return Err(error);
        }

        tracing::debug!(
            message = "✂️ split block",
            block_index,
            at = at.as_usize(),
            left_bytes = self.blocks[block_index].used_len(),
            right_bytes = new_block.used_len(),
        );

        // The moved lines were already counted before the cursor, so only its index
        // shifts.
        if block_index < self.cursor.block_index {
            self.cursor.block_index += 1;
        }
        self.blocks.insert(block_index + 1, new_block);
        Ok(())
    }

    /// Insert overflowed the block at `block_index` (the cursor block). Append a new
    /// block if this is the end of the document, otherwise split and retry.
    pub(crate) fn insert_with_split(
        &mut self,
        block_index: usize,
        local: usize,
        bytes: &[u8],
    ) -> LineStoreResult<()> {
        let count = self.blocks[block_index].line_count();
        let is_last_block = block_index + 1 == self.blocks.len();
        if local == count && is_last_block {
            return self.insert_fresh_block(block_index + 1, bytes);
        }

        let Some(cut) = self.split_block(block_index, local)? else {
            return self.insert_isolated(block_index, local, bytes);
        };

        // At the cut, the end of the first half is tried before the start of the second.
        let candidates = match local.cmp(&cut) {
            std::cmp::Ordering::Less => vec![(block_index, local)],
            std::cmp::Ordering::Greater => vec![(block_index + 1, local - cut)],
            std::cmp::Ordering::Equal => vec![(block_index, cut), (block_index + 1, 0)],
        };
        self.release_other_half(block_index, &candidates);

        for (target_index, target_local) in candidates.iter().copied() {
            self.focus(target_index)?;
            match self.blocks[target_index].insert_line(target_local, bytes) {
                Ok(()) => return Ok(()),
                Err(LineStoreError::CapacityOverflow { .. }) => {}
                Err(error) => return Err(error),
            }
        }

        let (target_index, target_local) = candidates[0];
        self.insert_isolated(target_index, target_local, bytes)
    }

    /// Replace overflowed the block at `block_index` (the cursor block). Split and
    /// retry.
    pub(crate) fn replace_with_split(
        &mut self,
        block_index: usize,
        local: usize,
        bytes: &[u8],
    ) -> LineStoreResult<()> {
        let Some(cut) = self.split_block(block_index, local)? else {
            return self.replace_isolated(block_index, local, bytes);
        };

        let target = if local < cut {
            (block_index, local)
        } else {
            (block_index + 1, local - cut)
        };
        self.release_other_half(block_index, &[target]);

        let (target_index, target_local) = target;
        self.focus(target_index)?;
        match self.blocks[target_index].replace_line(target_local, bytes) {
            Ok(()) => Ok(()),
            Err(LineStoreError::CapacityOverflow { .. }) => {
                self.replace_isolated(target_index, target_local, bytes)
            }
            Err(error) => Err(error),
        }
    }

    /// Release whichever half of a split (at `block_index` and `block_index + 1`) is not
    /// a retry target.
    fn release_other_half(&mut self, block_index: usize, targets: &[(usize, usize)]) {
        for it in [block_index, block_index + 1] {
            if !targets.iter().any(|(target_index, _)| *target_index == it) {
                self.blocks[it].release(&mut self.pool.borrow_mut());
            }
        }
    }

    /// The line can't fit next to its neighbors. Cut the block exactly at `local`, and
    /// put the line alone in a fresh block in between.
    fn insert_isolated(
        &mut self,
        block_index: usize,
        local: usize,
        bytes: &[u8],
    ) -> LineStoreResult<()> {
        let count = self.blocks[block_index].line_count();
        let new_index = if local == 0 {
            block_index
        } else {
            if local < count {
                self.split_block_at(block_index, local)?;
            }
            block_index + 1
        };
        tracing::debug!(message = "✂️ isolating inserted line", new_index);
        self.insert_fresh_block(new_index, bytes)
    }

    /// The new line contents can't fit next to their neighbors. Cut the block right
    /// before and right after line `local`, so it is alone in its block.
    fn replace_isolated(
        &mut self,
        mut block_index: usize,
        mut local: usize,
        bytes: &[u8],
    ) -> LineStoreResult<()> {
        if local > 0 {
            self.split_block_at(block_index, local)?;
            block_index += 1;
            local = 0;
        }
        if self.blocks[block_index].line_count() > 1 {
            self.split_block_at(block_index, 1)?;
        }
        tracing::debug!(message = "✂️ isolating replaced line", block_index);
        self.focus(block_index)?;
        self.blocks[block_index].replace_line(local, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PoolConfig, assert_eq2, new_shared_block_pool};
    use test_case::test_case;

    #[test_case(0, 30 ; "start of block cuts at a third")]
    #[test_case(29, 30 ; "still in the first third")]
    #[test_case(30, 45 ; "middle third cuts at half")]
    #[test_case(59, 45 ; "still in the middle third")]
    #[test_case(60, 60 ; "last third cuts at two thirds")]
    #[test_case(90, 60 ; "end of block")]
    fn test_split_threshold(edit_offset: usize, expected: usize) {
        assert_eq!(split_threshold(90, edit_offset), expected);
    }

    #[test_case(1, 2 ; "first third")]
    #[test_case(4, 4 ; "middle third cuts at half")]
    #[test_case(5, 5 ; "two thirds rounds down after multiplying")]
    #[test_case(8, 5 ; "end of block")]
    fn test_split_threshold_capacity_not_a_multiple_of_three(
        edit_offset: usize,
        expected: usize,
    ) {
        assert_eq!(split_threshold(8, edit_offset), expected);
    }

    fn document(block_capacity: usize, max_slots: usize) -> Document {
        Document::new(new_shared_block_pool(
            PoolConfig::default()
                .with_block_capacity(block_capacity)
                .with_max_slots(max_slots),
        ))
    }

    fn all_lines(document: &mut Document) -> Vec<Vec<u8>> {
        (0..document.line_count())
            .map(|it| document.get_str(it).unwrap().to_vec())
            .collect()
    }

    #[test]
    fn test_split_block_at_moves_tail_into_a_new_block() {
        let mut document = document(64, 8);
        for (index, it) in ["aa", "bbb", "c", "dddd"].iter().enumerate() {
            document.add_str(index, it.as_bytes()).unwrap();
        }
        document.split_block_at(0, 2).unwrap();

        assert_eq!(document.block_count(), 2);
        assert_eq!(document.blocks()[0].line_count(), 2);
        assert_eq!(document.blocks()[1].line_count(), 2);
        assert_eq2!(
            all_lines(&mut document),
            vec![b"aa".to_vec(), b"bbb".to_vec(), b"c".to_vec(), b"dddd".to_vec()]
        );
    }

    #[test]
    fn test_long_line_crossing_the_threshold_moves_to_the_second_half() {
        // Line ends: 10, 85, 90. The block is exactly full.
        let mut document = document(90, 8);
        let lines = [vec![b'a'; 10], vec![b'b'; 75], vec![b'c'; 5]];
        for (index, it) in lines.iter().enumerate() {
            document.add_str(index, it).unwrap();
        }
        assert_eq!(document.block_count(), 1);

        document.add_str(0, &[b'z'; 20]).unwrap();

        // A single split, and the new line fits next to the short first line.
        assert_eq2!(
            document
                .blocks()
                .iter()
                .map(Block::line_count)
                .collect::<Vec<_>>(),
            vec![2, 2]
        );
        assert_eq2!(
            document
                .blocks()
                .iter()
                .map(Block::used_len)
                .collect::<Vec<_>>(),
            vec![30, 80]
        );
        assert_eq2!(
            all_lines(&mut document),
            vec![
                vec![b'z'; 20],
                lines[0].clone(),
                lines[1].clone(),
                lines[2].clone()
            ]
        );
    }

    #[test_case(0 ; "at zero")]
    #[test_case(4 ; "at count")]
    fn test_split_block_at_rejects_empty_halves(at: usize) {
        let mut document = document(64, 8);
        for it in 0..4 {
            document.add_str(it, b"x").unwrap();
        }
        assert_eq!(
            document.split_block_at(0, at),
            Err(LineStoreError::LineOutOfRange { index: at, count: 4 })
        );
        assert_eq!(document.block_count(), 1);
    }

    #[test]
    fn test_single_line_block_can_not_be_split() {
        let mut document = document(8, 8);
        document.add_str(0, b"12345678").unwrap();
        assert_eq!(document.split_block(0, 0), Ok(None));
    }

    #[test]
    fn test_split_failure_leaves_block_untouched() {
        let mut document = document(8, 1);
        document.add_str(0, b"1234").unwrap();
        document.add_str(1, b"5678").unwrap();
        assert_eq!(
            document.split_block_at(0, 1),
            Err(LineStoreError::PoolExhausted { max_slots: 1 })
        );
        assert_eq!(document.block_count(), 1);
        assert_eq!(document.blocks()[0].line_count(), 2);
    }

    #[test]
    fn test_insert_into_a_block_of_long_lines_isolates_the_new_line() {
        // Two lines of 5 bytes in an 8 byte block can't share, so each one ends up in
        // its own block.
        let mut document = document(8, 8);
        document.add_str(0, b"aaaa").unwrap();
        document.add_str(1, b"bbbb").unwrap();
        document.add_str(1, b"12345").unwrap();

        assert_eq2!(
            all_lines(&mut document),
            vec![b"aaaa".to_vec(), b"12345".to_vec(), b"bbbb".to_vec()]
        );
        assert!(
            document
                .blocks()
                .iter()
                .all(|it| it.used_len() <= document.block_capacity())
        );
    }

    #[test]
    fn test_replace_in_a_single_line_block() {
        let mut document = document(8, 8);
        document.add_str(0, b"1234").unwrap();
        document.change_str(0, b"12345678").unwrap();
        assert_eq!(document.get_str(0).unwrap(), b"12345678");
        assert_eq!(document.block_count(), 1);
    }

    #[test]
    fn test_replace_isolates_a_line_that_fills_a_block() {
        let mut document = document(8, 8);
        for (index, it) in ["ab", "cd", "ef", "gh"].iter().enumerate() {
            document.add_str(index, it.as_bytes()).unwrap();
        }
        document.change_str(1, b"12345678").unwrap();

        assert_eq2!(
            all_lines(&mut document),
            vec![
                b"ab".to_vec(),
                b"12345678".to_vec(),
                b"ef".to_vec(),
                b"gh".to_vec()
            ]
        );
        let sum: usize = document.blocks().iter().map(Block::line_count).sum();
        assert_eq!(sum, 4);
    }
}
