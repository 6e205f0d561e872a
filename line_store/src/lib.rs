// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! # r3bl_line_store
//!
//! Paged, pooled line storage for terminal text editors.
//!
//! Every open document stores its lines in a bounded set of fixed-capacity byte blocks.
//! The blocks are borrowed from one shared [`BlockPool`] and named by generational
//! [`Handle`]s (slot index + generation) instead of pointers. This gives you:
//!
//! 1. **Bounded memory.** The pool never holds more than `max_slots * block_capacity`
//!    bytes of buffers, no matter how big (or how many) the open files are.
//! 2. **Random access edits.** Insert, replace, and delete any line by its index.
//!    Blocks that fill up are split near a capacity balancing boundary.
//! 3. **Eviction and lazy reload.** Idle, unmodified blocks don't pin their buffer. The
//!    pool recycles the least recently touched one under pressure, and the next read of
//!    an evicted block re-reads its bytes from the backing file.
//!
//! ```text
//! ┌──────────────────────── Document ─────────────────────────┐
//! │ [Block 0] [Block 1] [Block 2] ...  cursor, line count     │
//! └─────┬─────────┬─────────┬─────────────────────────────────┘
//!       │ Handle  │ Handle  │ Handle {slot_index, generation}
//! ┌─────▼─────────▼─────────▼──── BlockPool ──────────────────┐
//! │ slot 0 │ slot 1 │ slot 2 │ ... │ slot N_MAX-1             │
//! │ availability list: head (MRU) ◄──────────► tail (LRU)     │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use r3bl_line_store::{Document, PoolConfig, new_shared_block_pool};
//!
//! let pool = new_shared_block_pool(PoolConfig::default());
//! let mut document = Document::new(pool);
//!
//! document.add_str(0, b"a").unwrap();
//! document.add_str(1, b"b").unwrap();
//! document.add_str(0, b"z").unwrap();
//!
//! assert_eq!(document.line_count(), 3);
//! assert_eq!(document.get_str(0).unwrap(), b"z");
//! assert_eq!(document.get_str(2).unwrap(), b"b");
//! ```
//!
//! To load a file, and reload evicted blocks from it, use
//! [`load_document_from_path`]. The `lsview` binary shows how the pieces fit together.
//!
//! All access is single threaded. The pool is shared through an `Rc<RefCell<_>>` (see
//! [`SharedBlockPool`]), so the compiler keeps documents on the thread that owns them.

// Enforce strict error handling in production library code only. Tests are allowed to
// use .unwrap() (workspace `Cargo.toml` config allows it).
#![cfg_attr(not(test), deny(clippy::unwrap_in_result))]

// Attach modules (re-exported below to provide clean public API).
pub mod core;
pub mod storage;

// Re-export.
pub use core::*;
pub use storage::*;
