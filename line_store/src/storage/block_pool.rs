// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! A fixed-capacity pool of byte buffers, named by generational [`Handle`]s.
//!
//! The pool separates two things that a plain `Vec<Vec<u8>>` would conflate:
//!
//! 1. **Identity ownership** ([`BlockPool::acquire`] / [`BlockPool::release`]). A
//!    [`crate::Block`] acquires a handle once, and keeps it for as long as it lives.
//! 2. **Byte access** ([`BlockPool::checkout`] / [`BlockPool::checkin`]). The block only
//!    holds the bytes while it is being read or edited. The buffer is *moved* out of the
//!    pool on checkout, and moved back on checkin.
//!
//! While a block is idle its slot sits in the availability list, and the pool is free
//! to recycle it for someone else under pressure. Recycling bumps the slot's generation,
//! so the idle block's handle silently stops matching, and its next checkout returns
//! `None`. The block then knows its bytes are gone and must be reloaded.
//!
//! # Availability list
//!
//! The list is an intrusive doubly linked list threaded through the slot array by index
//! (no pointers, no extra allocation). It is ordered by recency:
//!
//! ```text
//! head (most recently touched)                        tail (least recently touched)
//!   ↓                                                   ↓
//! [ acquired / checked in ] ... [ owned, idle ] ... [ released / newly activated ]
//!                                                       ↑
//!                                       acquire() always takes from here
//! ```
//!
//! | Operation      | List effect                                 |
//! | :------------- | :------------------------------------------ |
//! | `activate(n)`  | new slots linked at the tail                |
//! | `acquire()`    | tail entry moved to the head, generation +1 |
//! | `release(h)`   | entry moved to the tail, generation +1      |
//! | `checkout(h)`  | entry unlinked (pinned)                     |
//! | `checkin(h)`   | entry linked at the head                    |
//!
//! Free slots are only ever linked at the tail, and owned slots only at the head, so free
//! slots are always consumed before an owned idle slot is evicted.

use std::{cell::RefCell, rc::Rc};

use crate::{Generation, Handle, LineStoreError, LineStoreResult, PoolConfig,
            next_generation};

/// The pool is shared by every [`crate::Document`] that the editor has open. All access
/// is single threaded.
pub type SharedBlockPool = Rc<RefCell<BlockPool>>;

/// Creates a new [`SharedBlockPool`] with the given configuration.
///
/// # Panics
///
/// See [`BlockPool::new`].
#[must_use]
pub fn new_shared_block_pool(config: PoolConfig) -> SharedBlockPool {
    Rc::new(RefCell::new(BlockPool::new(config)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// In the availability list, either free or owned by an idle block.
    Listed,
    /// Bytes are moved out to a block, the slot can't be recycled.
    CheckedOut,
}

#[derive(Debug)]
struct Slot {
    generation: Generation,
    buffer: Option<Vec<u8>>,
    state: SlotState,
    is_owned: bool,
    /// Neighbor towards the head (more recently touched).
    prev: Option<u32>,
    /// Neighbor towards the tail (less recently touched).
    next: Option<u32>,
}

impl Slot {
    fn new() -> Self {
        Self {
            generation: 0,
            buffer: None,
            state: SlotState::Listed,
            is_owned: false,
            prev: None,
            next: None,
        }
    }
}

#[derive(Debug)]
pub struct BlockPool {
    config: PoolConfig,
    slots: Vec<Slot>,
    head: Option<u32>,
    tail: Option<u32>,
    listed_count: usize,
}

impl BlockPool {
    /// Creates an empty pool. No slot is activated until the first
    /// [`BlockPool::acquire`].
    ///
    /// # Panics
    ///
    /// Panics if the block capacity or the max slot count is 0, or if either doesn't fit
    /// in a `u32` (line offsets and slot indices are stored as `u32`).
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        assert!(config.block_capacity > 0, "Block capacity must be greater than 0");
        assert!(config.max_slots > 0, "Max slots must be greater than 0");
        assert!(
            u32::try_from(config.block_capacity).is_ok(),
            "Block capacity must fit in a u32"
        );
        assert!(
            u32::try_from(config.max_slots).is_ok(),
            "Max slots must fit in a u32"
        );
        Self {
            config,
            slots: Vec::new(),
            head: None,
            tail: None,
            listed_count: 0,
        }
    }

    #[must_use]
    pub fn config(&self) -> PoolConfig { self.config }

    #[must_use]
    pub fn block_capacity(&self) -> usize { self.config.block_capacity }

    #[must_use]
    pub fn max_slots(&self) -> usize { self.config.max_slots }

    #[must_use]
    pub fn activated_count(&self) -> usize { self.slots.len() }

    #[must_use]
    pub fn available_count(&self) -> usize { self.listed_count }

    #[must_use]
    pub fn checked_out_count(&self) -> usize { self.slots.len() - self.listed_count }

    /// Grows the usable slot count by `n`, bounded by the configured max. New slots start
    /// free, with generation 0, at the tail of the availability list. Returns the number
    /// of slots that were actually activated.
    pub fn activate(&mut self, n: usize) -> usize {
        let headroom = self.config.max_slots - self.slots.len();
        let count = n.min(headroom);
        for _ in 0..count {
            let index = self.slots.len();
            self.slots.push(Slot::new());
            self.link_tail(index);
            self.listed_count += 1;
        }
        if count > 0 {
            tracing::debug!(
                message = "🧱 activated pool slots",
                count,
                activated = self.slots.len()
            );
        }
        count
    }

    /// Hands out a fresh identity for the least recently touched listed slot.
    ///
    /// If the tail of the list is owned by an idle block (ie: no free slot is left) and
    /// the pool can still grow, a step of new slots is activated first, so idle blocks
    /// are only evicted once the pool is at its cap.
    ///
    /// # Errors
    ///
    /// Returns [`LineStoreError::PoolExhausted`] if every activated slot is checked out
    /// and no more can be activated.
    pub fn acquire(&mut self) -> LineStoreResult<Handle> {
        let tail_is_owned = self.tail.is_some_and(|it| self.slots[it as usize].is_owned);
        if self.tail.is_none() || tail_is_owned {
            self.activate(self.config.effective_activation_step());
        }

        let Some(victim) = self.tail else {
            tracing::warn!(
                message = "🧱 block pool exhausted",
                max_slots = self.config.max_slots
            );
            return Err(LineStoreError::PoolExhausted {
                max_slots: self.config.max_slots,
            });
        };

        let index = victim as usize;
        let slot = &mut self.slots[index];
        if slot.is_owned {
            tracing::debug!(
                message = "♻️ recycling idle slot",
                slot_index = victim,
                old_generation = slot.generation
            );
        }
        slot.generation = next_generation(slot.generation);
        slot.is_owned = true;
        let handle = Handle::new(victim, slot.generation);

        self.unlink(index);
        self.link_head(index);

        Ok(handle)
    }

    /// Gives the slot named by `handle` back to the pool for good. The slot's generation
    /// is bumped (so `handle` can never check out again) and it is relinked at the tail,
    /// making it the next slot [`BlockPool::acquire`] reuses.
    ///
    /// Returns `false` if `handle` is stale, or currently checked out.
    pub fn release(&mut self, handle: Handle) -> bool {
        let Some(index) = self.find_listed(handle) else {
            return false;
        };
        let slot = &mut self.slots[index];
        slot.generation = next_generation(slot.generation);
        slot.is_owned = false;
        self.unlink(index);
        self.link_tail(index);
        true
    }

    /// Pins the slot named by `handle` and moves its buffer out to the caller. The buffer
    /// is allocated lazily (with the full block capacity) the first time a slot is
    /// checked out.
    ///
    /// Returns `None` if `handle` doesn't name a listed, owned slot. The caller must treat
    /// the bytes it expected as lost.
    pub fn checkout(&mut self, handle: Handle) -> Option<Vec<u8>> {
        let index = self.find_listed(handle)?;
        self.unlink(index);
        self.listed_count -= 1;

        let block_capacity = self.config.block_capacity;
        let slot = &mut self.slots[index];
        slot.state = SlotState::CheckedOut;
        Some(
            slot.buffer
                .take()
                .unwrap_or_else(|| Vec::with_capacity(block_capacity)),
        )
    }

    /// Returns a checked out buffer to its slot, and relinks the slot at the head (most
    /// recently used, least likely next victim). The buffer's contents are untouched.
    ///
    /// Returns `false` (and drops the buffer) if `handle` doesn't name a checked out
    /// slot.
    pub fn checkin(&mut self, handle: Handle, buffer: Vec<u8>) -> bool {
        let index = handle.slot();
        let is_match = self.slots.get(index).is_some_and(|slot| {
            slot.state == SlotState::CheckedOut && slot.generation == handle.generation
        });
        if !is_match {
            tracing::warn!(message = "🔗 checkin with unknown handle", %handle);
            return false;
        }

        let slot = &mut self.slots[index];
        slot.state = SlotState::Listed;
        slot.buffer = Some(buffer);
        self.link_head(index);
        self.listed_count += 1;
        true
    }

    /// Is `handle` an exact match for a listed slot, ie: would a checkout succeed?
    #[must_use]
    pub fn is_listed(&self, handle: Handle) -> bool { self.find_listed(handle).is_some() }

    /// Listed handles from the tail (next victim) to the head.
    #[must_use]
    pub fn handles_lru_first(&self) -> Vec<Handle> {
        let mut acc = Vec::with_capacity(self.listed_count);
        let mut cursor = self.tail;
        while let Some(index) = cursor {
            let slot = &self.slots[index as usize];
            acc.push(Handle::new(index, slot.generation));
            cursor = slot.prev;
        }
        acc
    }
}

mod linked_list {
    use super::BlockPool;
    use crate::Handle;

    impl BlockPool {
        pub(super) fn find_listed(&self, handle: Handle) -> Option<usize> {
            if handle.is_null() {
                return None;
            }
            let index = handle.slot();
            let slot = self.slots.get(index)?;
            let is_match = slot.state == super::SlotState::Listed
                && slot.is_owned
                && slot.generation == handle.generation;
            is_match.then_some(index)
        }

        #[allow(clippy::cast_possible_truncation)]
        pub(super) fn link_head(&mut self, index: usize) {
            let id = index as u32;
            let old_head = self.head;
            {
                let slot = &mut self.slots[index];
                slot.prev = None;
                slot.next = old_head;
            }
            match old_head {
                Some(it) => self.slots[it as usize].prev = Some(id),
                None => self.tail = Some(id),
            }
            self.head = Some(id);
        }

        #[allow(clippy::cast_possible_truncation)]
        pub(super) fn link_tail(&mut self, index: usize) {
            let id = index as u32;
            let old_tail = self.tail;
            {
                let slot = &mut self.slots[index];
                slot.next = None;
                slot.prev = old_tail;
            }
            match old_tail {
                Some(it) => self.slots[it as usize].next = Some(id),
                None => self.head = Some(id),
            }
            self.tail = Some(id);
        }

        pub(super) fn unlink(&mut self, index: usize) {
            let (prev, next) = {
                let slot = &mut self.slots[index];
                (slot.prev.take(), slot.next.take())
            };
            match prev {
                Some(it) => self.slots[it as usize].next = next,
                None => self.head = next,
            }
            match next {
                Some(it) => self.slots[it as usize].prev = prev,
                None => self.tail = prev,
            }
        }
    }
}
