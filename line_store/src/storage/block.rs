// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{BlockPool, Handle, LineIndex, LineStoreError, LineStoreResult, LineTable};

/// Repopulates an evicted block: `(file_offset, size, buffer) -> success`. The buffer
/// is exactly `size` bytes long, and must be completely filled with the bytes that were
/// originally loaded from `file_offset` (line terminators stripped).
pub type ReloadFn = dyn FnMut(u64, u32, &mut [u8]) -> bool;

/// A run of consecutive lines, stored in one pooled buffer.
///
/// The block owns a pool [`Handle`] for its whole life, but only holds the bytes (the
/// buffer is moved in from the pool) while they are in use. The [`LineTable`] lives
/// here, not in the pooled buffer, so it survives eviction.
///
/// Lifecycle:
///
/// ```text
/// Block::new() ─► get_data() ─► [borrowed] ─► release() ─► [idle] ─► get_data() ...
///                  │ acquire       │ mutate: modified,      │ slot can be recycled
///                  │ + checkout    │ stays pinned           │ by the pool, and the
///                  ▼               ▼                        ▼ next get_data() sets
///                                                           data_lost
/// clear() at any point checks in, releases the handle, and resets the block.
/// ```
///
/// Blocks don't implement [`Drop`], since they can't reach the pool from there. The
/// [`crate::Document`] always calls [`Block::clear`] before dropping one.
#[derive(Debug)]
pub struct Block {
    handle: Handle,
    line_table: LineTable,
    data: Option<Vec<u8>>,
    capacity: usize,
    is_modified: bool,
    is_data_lost: bool,
    file_offset: u64,
}

impl Block {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            handle: Handle::NULL,
            line_table: LineTable::new(),
            data: None,
            capacity,
            is_modified: false,
            is_data_lost: false,
            file_offset: 0,
        }
    }

    #[must_use]
    pub fn with_file_offset(mut self, file_offset: u64) -> Self {
        self.file_offset = file_offset;
        self
    }

    #[must_use]
    pub fn handle(&self) -> Handle { self.handle }

    #[must_use]
    pub fn line_table(&self) -> &LineTable { &self.line_table }

    #[must_use]
    pub fn line_count(&self) -> usize { self.line_table.line_count() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.line_table.is_empty() }

    #[must_use]
    pub fn used_len(&self) -> usize { self.line_table.used_len() }

    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity }

    #[must_use]
    pub fn is_borrowed(&self) -> bool { self.data.is_some() }

    #[must_use]
    pub fn is_modified(&self) -> bool { self.is_modified }

    #[must_use]
    pub fn is_data_lost(&self) -> bool { self.is_data_lost }

    #[must_use]
    pub fn file_offset(&self) -> u64 { self.file_offset }

    /// Borrow the block's buffer from the pool, acquiring a handle first if there is
    /// none. If the pool recycled the slot while this block was idle, a new handle is
    /// acquired and [`Block::is_data_lost`] becomes true (for a non-empty block). The
    /// returned buffer then has the right length, but its contents must be reloaded.
    ///
    /// # Errors
    ///
    /// - [`LineStoreError::PoolExhausted`] if no handle can be acquired.
    /// - [`LineStoreError::HandleStale`] if a freshly acquired handle can't be checked
    ///   out.
    pub fn get_data(&mut self, pool: &mut BlockPool) -> LineStoreResult<&mut Vec<u8>> {
        if self.data.is_none() {
            if self.handle.is_null() {
                self.handle = pool.acquire()?;
                self.data = Some(checkout_fresh(pool, self.handle)?);
            } else if let Some(buffer) = pool.checkout(self.handle) {
                self.data = Some(buffer);
            } else {
                tracing::debug!(
                    message = "🔗 block slot was recycled",
                    handle = %self.handle,
                    file_offset = self.file_offset,
                    lines = self.line_count()
                );
                self.handle = Handle::NULL;
                if !self.line_table.is_empty() {
                    self.is_data_lost = true;
                }
                self.handle = pool.acquire()?;
                let mut buffer = checkout_fresh(pool, self.handle)?;
                buffer.resize(self.used_len(), 0);
                self.data = Some(buffer);
            }
        }
        self.data.as_mut().ok_or(LineStoreError::BlockNotLoaded)
    }

    /// The borrowed bytes, if any.
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> { self.data.as_deref() }

    /// Line `n` of this block. Empty if the block isn't borrowed, or `n` is out of range.
    #[must_use]
    pub fn line(&self, arg_n: impl Into<LineIndex>) -> &[u8] {
        self.line_table.get(self.data().unwrap_or_default(), arg_n)
    }

    /// Stop borrowing the bytes, so the pool can recycle the slot when it needs to.
    /// Modified blocks keep their buffer pinned, since the bytes can't be reloaded. This
    /// is a no-op for a block that isn't borrowed.
    ///
    /// Returns `true` if the buffer went back to the pool.
    pub fn release(&mut self, pool: &mut BlockPool) -> bool {
        if self.is_modified {
            return false;
        }
        match self.data.take() {
            Some(buffer) => pool.checkin(self.handle, buffer),
            None => false,
        }
    }

    /// Give the buffer and the handle back to the pool, and reset the block to empty.
    pub fn clear(&mut self, pool: &mut BlockPool) {
        if let Some(buffer) = self.data.take() {
            pool.checkin(self.handle, buffer);
        }
        if !self.handle.is_null() {
            pool.release(self.handle);
        }
        self.handle = Handle::NULL;
        self.line_table.reset();
        self.is_modified = false;
        self.is_data_lost = false;
        self.file_offset = 0;
    }

    /// Repopulate the borrowed buffer from the backing source, using `reload_fn`.
    ///
    /// # Errors
    ///
    /// - [`LineStoreError::BlockNotLoaded`] if the block isn't borrowed.
    /// - [`LineStoreError::ReloadFailed`] if `reload_fn` returns false. The block stays
    ///   marked as data lost.
    pub fn reload_with(&mut self, reload_fn: &mut (dyn FnMut(u64, u32, &mut [u8]) -> bool + '_)) -> LineStoreResult<()> {
        let size = self.used_len();
        let file_offset = self.file_offset;
        let buffer = self.data.as_mut().ok_or(LineStoreError::BlockNotLoaded)?;
        buffer.resize(size, 0);

        #[allow(clippy::cast_possible_truncation)]
        let size_u32 = size as u32;

        if reload_fn(file_offset, size_u32, &mut buffer[..size]) {
            tracing::debug!(message = "💾 reloaded block", file_offset, size);
            self.is_data_lost = false;
            Ok(())
        } else {
            tracing::warn!(message = "💾 reload failed", file_offset, size);
            Err(LineStoreError::ReloadFailed {
                file_offset,
                size: size_u32,
            })
        }
    }

    /// # Errors
    ///
    /// See [`LineTable::insert`], plus [`LineStoreError::BlockNotLoaded`].
    pub fn insert_line(
        &mut self,
        arg_n: impl Into<LineIndex>,
        bytes: &[u8],
    ) -> LineStoreResult<()> {
        let buffer = self.data.as_mut().ok_or(LineStoreError::BlockNotLoaded)?;
        self.line_table.insert(buffer, self.capacity, arg_n, bytes)?;
        self.is_modified = true;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`LineTable::append`], plus [`LineStoreError::BlockNotLoaded`].
    pub fn append_line(&mut self, bytes: &[u8]) -> LineStoreResult<()> {
        let buffer = self.data.as_mut().ok_or(LineStoreError::BlockNotLoaded)?;
        self.line_table.append(buffer, self.capacity, bytes)?;
        self.is_modified = true;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`LineTable::replace`], plus [`LineStoreError::BlockNotLoaded`].
    pub fn replace_line(
        &mut self,
        arg_n: impl Into<LineIndex>,
        bytes: &[u8],
    ) -> LineStoreResult<()> {
        let buffer = self.data.as_mut().ok_or(LineStoreError::BlockNotLoaded)?;
        self.line_table.replace(buffer, self.capacity, arg_n, bytes)?;
        self.is_modified = true;
        Ok(())
    }

    /// # Errors
    ///
    /// See [`LineTable::delete`], plus [`LineStoreError::BlockNotLoaded`].
    pub fn delete_line(&mut self, arg_n: impl Into<LineIndex>) -> LineStoreResult<()> {
        let buffer = self.data.as_mut().ok_or(LineStoreError::BlockNotLoaded)?;
        self.line_table.delete(buffer, arg_n)?;
        self.is_modified = true;
        Ok(())
    }

    /// Append a line that was read straight from the backing source. Unlike
    /// [`Block::append_line`] this doesn't mark the block modified, so it can still be
    /// evicted and reloaded.
    ///
    /// # Errors
    ///
    /// See [`Block::append_line`].
    pub fn push_loaded_line(&mut self, bytes: &[u8]) -> LineStoreResult<()> {
        let buffer = self.data.as_mut().ok_or(LineStoreError::BlockNotLoaded)?;
        self.line_table.append(buffer, self.capacity, bytes)
    }

    /// Move lines `[at, line_count())` into `other`, which must be borrowed and empty.
    /// Both blocks are marked modified.
    ///
    /// # Errors
    ///
    /// [`LineStoreError::BlockNotLoaded`] if either block isn't borrowed.
    pub fn split_off_into(
        &mut self,
        arg_at: impl Into<LineIndex>,
        other: &mut Block,
    ) -> LineStoreResult<()> {
        let buffer = self.data.as_mut().ok_or(LineStoreError::BlockNotLoaded)?;
        let other_buffer = other.data.as_mut().ok_or(LineStoreError::BlockNotLoaded)?;
        other.line_table = self.line_table.split_off(buffer, arg_at, other_buffer);
        self.is_modified = true;
        other.is_modified = true;
        Ok(())
    }
}

/// Checkout of a handle that was just acquired. The buffer may still hold bytes from
/// the slot's previous owner, so it is cleared.
fn checkout_fresh(pool: &mut BlockPool, handle: Handle) -> LineStoreResult<Vec<u8>> {
    let mut buffer = pool
        .checkout(handle)
        .ok_or(LineStoreError::HandleStale { handle })?;
    buffer.clear();
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PoolConfig, assert_eq2};

    fn pool(max_slots: usize) -> BlockPool {
        BlockPool::new(
            PoolConfig::default()
                .with_block_capacity(16)
                .with_max_slots(max_slots)
                .with_activation_step(1),
        )
    }

    fn loaded_block(pool: &mut BlockPool, lines: &[&str]) -> Block {
        let mut block = Block::new(16);
        block.get_data(pool).unwrap();
        for it in lines {
            block.push_loaded_line(it.as_bytes()).unwrap();
        }
        block
    }

    #[test]
    fn test_get_data_acquires_lazily() {
        let mut pool = pool(2);
        let mut block = Block::new(16);
        assert!(block.handle().is_null());
        assert_eq!(pool.activated_count(), 0);

        block.get_data(&mut pool).unwrap();
        assert!(!block.handle().is_null());
        assert!(block.is_borrowed());
        assert_eq!(pool.checked_out_count(), 1);
    }

    #[test]
    fn test_mutators_need_a_borrowed_buffer() {
        let mut block = Block::new(16);
        assert_eq!(block.append_line(b"a"), Err(LineStoreError::BlockNotLoaded));
        assert_eq!(block.insert_line(0, b"a"), Err(LineStoreError::BlockNotLoaded));
        assert_eq!(
            block.replace_line(0, b"a"),
            Err(LineStoreError::BlockNotLoaded)
        );
        assert_eq!(block.delete_line(0), Err(LineStoreError::BlockNotLoaded));
    }

    #[test]
    fn test_mutators_mark_modified_but_loading_does_not() {
        let mut pool = pool(2);
        let mut block = loaded_block(&mut pool, &["a", "b"]);
        assert!(!block.is_modified());

        block.replace_line(1, b"bb").unwrap();
        assert!(block.is_modified());
        assert_eq!(block.line(1), b"bb");
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut pool = pool(2);
        let mut block = loaded_block(&mut pool, &["a"]);

        assert!(block.release(&mut pool));
        assert!(!block.is_borrowed());
        assert_eq!(pool.available_count(), 1);

        assert!(!block.release(&mut pool));
        assert_eq!(pool.available_count(), 1);
        assert_eq!(pool.checked_out_count(), 0);

        // The slot is still owned by the block, and the bytes are still there.
        block.get_data(&mut pool).unwrap();
        assert!(!block.is_data_lost());
        assert_eq!(block.line(0), b"a");
    }

    #[test]
    fn test_modified_block_stays_pinned() {
        let mut pool = pool(2);
        let mut block = loaded_block(&mut pool, &["a"]);
        block.append_line(b"b").unwrap();
        assert!(!block.release(&mut pool));
        assert!(block.is_borrowed());
        assert_eq!(pool.checked_out_count(), 1);
    }

    #[test]
    fn test_recycled_slot_sets_data_lost() {
        let mut pool = pool(1);
        let mut victim = loaded_block(&mut pool, &["abc", "de"]);
        let old_handle = victim.handle();
        victim.release(&mut pool);

        // Another block takes the only slot, then goes idle again.
        let mut other = loaded_block(&mut pool, &["zzzzzz"]);
        other.release(&mut pool);
        assert!(!pool.is_listed(old_handle));

        let buffer = victim.get_data(&mut pool).unwrap();
        assert_eq!(buffer.len(), 5);
        assert!(victim.is_data_lost());
        assert_ne!(victim.handle(), old_handle);
        assert_eq!(victim.line_count(), 2);
    }

    #[test]
    fn test_reload_with_fills_buffer_and_clears_data_lost() {
        let mut pool = pool(1);
        let mut victim = loaded_block(&mut pool, &["abc", "de"]).with_file_offset(7);
        victim.release(&mut pool);
        let mut other = loaded_block(&mut pool, &["zz"]);
        other.release(&mut pool);
        victim.get_data(&mut pool).unwrap();

        let mut calls = vec![];
        let mut reload_fn = |file_offset: u64, size: u32, buffer: &mut [u8]| {
            calls.push((file_offset, size));
            buffer.copy_from_slice(b"abcde");
            true
        };
        victim.reload_with(&mut reload_fn).unwrap();

        assert_eq2!(calls, vec![(7, 5)]);
        assert!(!victim.is_data_lost());
        assert_eq!(victim.line(0), b"abc");
        assert_eq!(victim.line(1), b"de");
    }

    #[test]
    fn test_failed_reload_keeps_data_lost() {
        let mut pool = pool(1);
        let mut victim = loaded_block(&mut pool, &["abc"]).with_file_offset(3);
        victim.release(&mut pool);
        let mut other = loaded_block(&mut pool, &["zz"]);
        other.release(&mut pool);
        victim.get_data(&mut pool).unwrap();

        let mut reload_fn = |_: u64, _: u32, _: &mut [u8]| false;
        assert_eq!(
            victim.reload_with(&mut reload_fn),
            Err(LineStoreError::ReloadFailed {
                file_offset: 3,
                size: 3
            })
        );
        assert!(victim.is_data_lost());
    }

    #[test]
    fn test_clear_returns_handle_to_pool() {
        let mut pool = pool(1);
        let mut block = loaded_block(&mut pool, &["a"]);
        let handle = block.handle();
        block.clear(&mut pool);

        assert!(block.handle().is_null());
        assert!(block.is_empty());
        assert!(!pool.is_listed(handle));
        assert_eq!(pool.available_count(), 1);

        // Clearing twice is harmless.
        block.clear(&mut pool);
        assert_eq!(pool.available_count(), 1);
    }

    #[test]
    fn test_split_off_into() {
        let mut pool = pool(2);
        let mut block = loaded_block(&mut pool, &["aa", "bbb", "c"]);
        let mut other = Block::new(16);
        other.get_data(&mut pool).unwrap();

        block.split_off_into(1, &mut other).unwrap();
        assert_eq!(block.line_count(), 1);
        assert_eq!(other.line_count(), 2);
        assert_eq!(other.line(0), b"bbb");
        assert_eq!(other.line(1), b"c");
        assert!(block.is_modified() && other.is_modified());
    }

    #[test]
    fn test_fresh_handle_starts_with_an_empty_buffer() {
        let mut pool = pool(1);
        let mut first = loaded_block(&mut pool, &["stale bytes"]);
        first.clear(&mut pool);

        let mut second = Block::new(16);
        let buffer = second.get_data(&mut pool).unwrap();
        assert!(buffer.is_empty());
    }
}
