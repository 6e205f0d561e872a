// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! All the lines of one open file, stored as an ordered sequence of [`Block`]s whose
//! bytes live in a shared [`crate::BlockPool`].
//!
//! ```text
//!  global line:  0  1  2 │ 3  4 │ 5  6  7  8 │ 9
//!                ────────┼──────┼────────────┼───
//!  blocks:       [  B0   ][ B1  ][    B2     ][B3]
//!                          ▲
//!                  cursor {block_index: 1, first_line: 3}
//! ```
//!
//! Line lookups scan from a cached cursor, so sequential access (the common case for an
//! editor that renders a viewport, or walks the file) is O(1) amortized. The cursor block
//! is the only *unmodified* block that keeps its buffer borrowed: moving the cursor
//! releases the block it leaves, so idle blocks can be evicted by the pool under
//! pressure. Modified blocks stay pinned.
//!
//! When a lookup lands on a block whose slot was recycled, the block's bytes are reloaded
//! through the reload callback before they are returned. When an edit doesn't fit in a
//! block, the block is split (see [`crate::split_threshold`]) and the edit is retried.

use std::fmt::{Debug, Formatter};

use crate::{Block, LineIndex, LineStoreError, LineStoreResult, ReloadFn, SharedBlockPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DocumentCursor {
    pub block_index: usize,
    pub first_line: usize,
}

pub struct Document {
    pub(crate) pool: SharedBlockPool,
    pub(crate) blocks: Vec<Block>,
    pub(crate) block_capacity: usize,
    pub(crate) line_count: usize,
    pub(crate) is_changed: bool,
    pub(crate) cursor: DocumentCursor,
    pub(crate) reload_fn: Option<Box<ReloadFn>>,
}

impl Debug for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("line_count", &self.line_count)
            .field("block_count", &self.blocks.len())
            .field("is_changed", &self.is_changed)
            .field("cursor", &self.cursor)
            .field("has_reload_fn", &self.reload_fn.is_some())
            .finish_non_exhaustive()
    }
}

impl Drop for Document {
    fn drop(&mut self) { self.clear(); }
}

impl Document {
    #[must_use]
    pub fn new(pool: SharedBlockPool) -> Self {
        let block_capacity = pool.borrow().block_capacity();
        Self {
            pool,
            blocks: Vec::new(),
            block_capacity,
            line_count: 0,
            is_changed: false,
            cursor: DocumentCursor::default(),
            reload_fn: None,
        }
    }

    #[must_use]
    pub fn line_count(&self) -> usize { self.line_count }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.line_count == 0 }

    #[must_use]
    pub fn block_count(&self) -> usize { self.blocks.len() }

    #[must_use]
    pub fn blocks(&self) -> &[Block] { &self.blocks }

    #[must_use]
    pub fn block_capacity(&self) -> usize { self.block_capacity }

    #[must_use]
    pub fn cursor(&self) -> DocumentCursor { self.cursor }

    #[must_use]
    pub fn pool(&self) -> &SharedBlockPool { &self.pool }

    /// Has the document been edited since it was loaded, or since the last
    /// [`Document::clear_modify_flag`]?
    #[must_use]
    pub fn is_changed(&self) -> bool { self.is_changed }

    /// Called by the editor after a successful save. Blocks keep their own modified
    /// flag: their bytes still differ from what was originally loaded from
    /// `file_offset`, so they must stay pinned.
    pub fn clear_modify_flag(&mut self) { self.is_changed = false; }

    /// The callback used to repopulate blocks that were evicted from the pool. It runs
    /// synchronously, while the pool isn't borrowed.
    pub fn set_reload_callback(
        &mut self,
        reload_fn: impl FnMut(u64, u32, &mut [u8]) -> bool + 'static,
    ) {
        self.reload_fn = Some(Box::new(reload_fn));
    }

    /// Line `n`, reloading its block first if it was evicted. Out of range lines are
    /// empty.
    ///
    /// # Errors
    ///
    /// - [`LineStoreError::ReloadFailed`] if the block was evicted and can't be
    ///   reloaded.
    /// - [`LineStoreError::PoolExhausted`] if there's no slot to load the block into.
    pub fn get_str(&mut self, arg_n: impl Into<LineIndex>) -> LineStoreResult<&[u8]> {
        let Some((block_index, local)) = self.seek(arg_n.into()) else {
            return Ok(&[]);
        };
        self.ensure_loaded(block_index)?;
        Ok(self.blocks[block_index].line(local))
    }

    /// Insert `bytes` as a new line before line `n`. `n == line_count()` appends.
    ///
    /// # Errors
    ///
    /// - [`LineStoreError::LineOutOfRange`] if `n > line_count()`.
    /// - [`LineStoreError::LineTooLong`] if `bytes` doesn't fit in a block.
    /// - [`LineStoreError::PoolExhausted`] or [`LineStoreError::ReloadFailed`] if the
    ///   storage for the edit can't be obtained. Nothing is changed in that case.
    pub fn add_str(
        &mut self,
        arg_n: impl Into<LineIndex>,
        bytes: &[u8],
    ) -> LineStoreResult<()> {
        let n = arg_n.into();
        if !n.is_insert_position(self.line_count) {
            return Err(self.out_of_range(n));
        }
        self.check_line_len(bytes)?;

        if self.blocks.is_empty() {
            self.insert_fresh_block(0, bytes)?;
        } else {
            let (block_index, local) = match self.seek(n) {
                Some(it) => it,
                None => self.seek_end(),
            };
            self.ensure_loaded(block_index)?;
            match self.blocks[block_index].insert_line(local, bytes) {
                Ok(()) => {}
                Err(LineStoreError::CapacityOverflow { .. }) => {
                    self.insert_with_split(block_index, local, bytes)?;
                }
                Err(error) => return Err(error),
            }
        }

        self.line_count += 1;
        self.is_changed = true;
        Ok(())
    }

    /// Replace the contents of line `n` with `bytes`.
    ///
    /// # Errors
    ///
    /// - [`LineStoreError::LineOutOfRange`] if `n >= line_count()`.
    /// - [`LineStoreError::LineTooLong`] if `bytes` doesn't fit in a block.
    /// - [`LineStoreError::PoolExhausted`] or [`LineStoreError::ReloadFailed`] if the
    ///   storage for the edit can't be obtained.
    pub fn change_str(
        &mut self,
        arg_n: impl Into<LineIndex>,
        bytes: &[u8],
    ) -> LineStoreResult<()> {
        let n = arg_n.into();
        self.check_line_len(bytes)?;
        let Some((block_index, local)) = self.seek(n) else {
            return Err(self.out_of_range(n));
        };

        self.ensure_loaded(block_index)?;
        match self.blocks[block_index].replace_line(local, bytes) {
            Ok(()) => {}
            Err(LineStoreError::CapacityOverflow { .. }) => {
                self.replace_with_split(block_index, local, bytes)?;
            }
            Err(error) => return Err(error),
        }

        self.is_changed = true;
        Ok(())
    }

    /// Remove line `n`. A block left with no lines is removed from the document, and its
    /// handle goes back to the pool.
    ///
    /// # Errors
    ///
    /// - [`LineStoreError::LineOutOfRange`] if `n >= line_count()`.
    /// - [`LineStoreError::PoolExhausted`] or [`LineStoreError::ReloadFailed`] if the
    ///   owning block was evicted and can't be brought back.
    pub fn del_str(&mut self, arg_n: impl Into<LineIndex>) -> LineStoreResult<()> {
        let n = arg_n.into();
        let Some((block_index, local)) = self.seek(n) else {
            return Err(self.out_of_range(n));
        };

        self.ensure_loaded(block_index)?;
        self.blocks[block_index].delete_line(local)?;
        self.line_count -= 1;
        self.is_changed = true;

        if self.blocks[block_index].is_empty() {
            let mut block = self.remove_block(block_index);
            block.clear(&mut self.pool.borrow_mut());
        }
        Ok(())
    }

    /// Drop every line, and give every buffer and handle back to the pool.
    pub fn clear(&mut self) {
        let Ok(mut pool) = self.pool.try_borrow_mut() else {
            tracing::warn!(message = "🧱 pool is busy, document blocks leaked");
            return;
        };
        for block in &mut self.blocks {
            block.clear(&mut pool);
        }
        self.blocks.clear();
        self.line_count = 0;
        self.is_changed = false;
        self.cursor = DocumentCursor::default();
    }

    /// Append a line that was just read from the backing source, starting at
    /// `file_offset`. The line goes at the end of the last block if it fits, otherwise a
    /// new block is started at `file_offset` (and the previous one is released, so it
    /// can be evicted). Loading doesn't mark the document changed.
    ///
    /// # Errors
    ///
    /// - [`LineStoreError::LineTooLong`] if `bytes` doesn't fit in a block.
    /// - [`LineStoreError::PoolExhausted`] if no block can be started.
    pub fn push_loaded_line(&mut self, file_offset: u64, bytes: &[u8]) -> LineStoreResult<()> {
        self.check_line_len(bytes)?;

        let fits_in_last = self
            .blocks
            .last()
            .is_some_and(|it| it.used_len() + bytes.len() <= self.block_capacity);

        if fits_in_last {
            let (block_index, _) = self.seek_end();
            self.ensure_loaded(block_index)?;
            self.blocks[block_index].push_loaded_line(bytes)?;
        } else {
            // Let go of the previous block before acquiring, so even a single slot pool
            // can recycle it.
            if let Some(last) = self.blocks.last_mut() {
                last.release(&mut self.pool.borrow_mut());
            }
            let mut block = self.new_loaded_block()?.with_file_offset(file_offset);
            block.push_loaded_line(bytes)?;
            let block_index = self.blocks.len();
            self.insert_block(block_index, block);
            self.move_cursor(block_index, self.line_count);
        }

        self.line_count += 1;
        Ok(())
    }

    /// Called once the whole file has been pushed with [`Document::push_loaded_line`].
    /// Releases the last block, so no loaded block pins a buffer.
    pub fn finish_load(&mut self) {
        let mut pool = self.pool.borrow_mut();
        if let Some(block) = self.blocks.last_mut() {
            block.release(&mut pool);
        }
        tracing::debug!(
            message = "📂 document loaded",
            lines = self.line_count,
            blocks = self.blocks.len()
        );
    }
}

/// Cursor, lookup, and block bookkeeping.
impl Document {
    pub(crate) fn out_of_range(&self, n: LineIndex) -> LineStoreError {
        LineStoreError::LineOutOfRange {
            index: n.as_usize(),
            count: self.line_count,
        }
    }

    pub(crate) fn check_line_len(&self, bytes: &[u8]) -> LineStoreResult<()> {
        if bytes.len() > self.block_capacity {
            return Err(LineStoreError::LineTooLong {
                len: bytes.len(),
                capacity: self.block_capacity,
            });
        }
        Ok(())
    }

    /// Find the block that holds global line `n`, scanning from the cursor, and move the
    /// cursor there. Returns `(block_index, local_line)`, or `None` if `n` is out of
    /// range.
    pub(crate) fn seek(&mut self, n: LineIndex) -> Option<(usize, usize)> {
        let n = n.as_usize();
        if n >= self.line_count {
            return None;
        }

        let DocumentCursor {
            mut block_index,
            mut first_line,
        } = self.cursor;

        while n < first_line {
            block_index -= 1;
            first_line -= self.blocks[block_index].line_count();
        }
        while n >= first_line + self.blocks[block_index].line_count() {
            first_line += self.blocks[block_index].line_count();
            block_index += 1;
        }

        self.move_cursor(block_index, first_line);
        Some((block_index, n - first_line))
    }

    /// The insertion point one past the last line: the end of the last block.
    pub(crate) fn seek_end(&mut self) -> (usize, usize) {
        let block_index = self.blocks.len().saturating_sub(1);
        let local = self.blocks.last().map_or(0, Block::line_count);
        self.move_cursor(block_index, self.line_count - local);
        (block_index, local)
    }

    /// Global line number of the first line of `block_index`, computed from the cursor.
    pub(crate) fn first_line_of(&self, block_index: usize) -> usize {
        let DocumentCursor {
            block_index: cursor_index,
            first_line,
        } = self.cursor;
        if block_index >= cursor_index {
            first_line
                + self.blocks[cursor_index..block_index]
                    .iter()
                    .map(Block::line_count)
                    .sum::<usize>()
        } else {
            first_line
                - self.blocks[block_index..cursor_index]
                    .iter()
                    .map(Block::line_count)
                    .sum::<usize>()
        }
    }

    /// Move the cursor. The block it leaves is released, so an unmodified buffer is
    /// only pinned while the cursor is on it.
    pub(crate) fn move_cursor(&mut self, block_index: usize, first_line: usize) {
        let old_index = self.cursor.block_index;
        if old_index != block_index
            && let Some(old_block) = self.blocks.get_mut(old_index)
        {
            old_block.release(&mut self.pool.borrow_mut());
        }
        if old_index != block_index {
            tracing::trace!(
                message = "📍 cursor moved",
                from = old_index,
                to = block_index,
                first_line
            );
        }
        self.cursor = DocumentCursor {
            block_index,
            first_line,
        };
    }

    /// Move the cursor to `block_index` and make sure its bytes are there.
    pub(crate) fn focus(&mut self, block_index: usize) -> LineStoreResult<()> {
        let first_line = self.first_line_of(block_index);
        self.move_cursor(block_index, first_line);
        self.ensure_loaded(block_index)
    }

    /// Borrow the block's buffer, and reload it through the reload callback if its slot
    /// was recycled. The pool is not borrowed while the callback runs.
    pub(crate) fn ensure_loaded(&mut self, block_index: usize) -> LineStoreResult<()> {
        let Self {
            pool,
            blocks,
            reload_fn,
            ..
        } = self;
        let block = &mut blocks[block_index];
        block.get_data(&mut pool.borrow_mut())?;

        if !block.is_data_lost() {
            return Ok(());
        }
        match reload_fn {
            Some(reload_fn) => block.reload_with(reload_fn.as_mut()),
            None => {
                tracing::warn!(
                    message = "💾 evicted block, and there's no reload callback",
                    file_offset = block.file_offset()
                );
                #[allow(clippy::cast_possible_truncation)]
                let size = block.used_len() as u32;
                Err(LineStoreError::ReloadFailed {
                    file_offset: block.file_offset(),
                    size,
                })
            }
        }
    }

    /// A new empty block, with its buffer already borrowed from the pool.
    pub(crate) fn new_loaded_block(&self) -> LineStoreResult<Block> {
        let mut pool = self.pool.borrow_mut();
        let mut block = Block::new(self.block_capacity);
        if let Err(error) = block.get_data(&mut pool) {
            block.clear(&mut pool);
            return Err(error);
        }
        Ok(block)
    }

    /// Insert `block` into the sequence, keeping the cursor on the same block.
    pub(crate) fn insert_block(&mut self, block_index: usize, block: Block) {
        if !self.blocks.is_empty() && block_index <= self.cursor.block_index {
            self.cursor.block_index += 1;
            self.cursor.first_line += block.line_count();
        }
        self.blocks.insert(block_index, block);
    }

    /// Remove a block from the sequence. The caller must clear it. If the cursor was on
    /// it, the cursor moves to the block that now sits at the same index (or the new
    /// last block).
    pub(crate) fn remove_block(&mut self, block_index: usize) -> Block {
        let block = self.blocks.remove(block_index);
        let cursor = &mut self.cursor;
        if block_index < cursor.block_index {
            cursor.block_index -= 1;
            cursor.first_line -= block.line_count();
        } else if block_index == cursor.block_index
            && block_index == self.blocks.len()
            && let Some(previous) = self.blocks.last()
        {
            cursor.block_index -= 1;
            cursor.first_line -= previous.line_count();
        }
        block
    }

    /// Put `bytes` alone in a brand-new block at `block_index`, and move the cursor
    /// there. This always succeeds for a line no longer than the block capacity, as long
    /// as the pool has a slot.
    pub(crate) fn insert_fresh_block(
        &mut self,
        block_index: usize,
        bytes: &[u8],
    ) -> LineStoreResult<()> {
        let mut block = self.new_loaded_block()?;
        if let Err(error) = block.append_line(bytes) {
            block.clear(&mut self.pool.borrow_mut());
            return Err(error);
        }
        self.insert_block(block_index, block);
        let first_line = self.first_line_of(block_index);
        self.move_cursor(block_index, first_line);
        tracing::debug!(message = "🧱 new block", block_index, first_line);
        Ok(())
    }
}
