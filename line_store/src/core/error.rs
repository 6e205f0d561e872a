// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Errors produced by the line storage engine. See [`LineStoreError`] for details.

use crate::Handle;

/// Type alias to make it easy to work with [`LineStoreError`]. The binary and the file
/// loader convert into [`miette::Report`] at their boundary, via `?`.
pub type LineStoreResult<T> = Result<T, LineStoreError>;

/// Errors from the [`crate::BlockPool`], [`crate::Block`], and [`crate::Document`] APIs.
///
/// | Variant              | Cause                                                    | Visible to editor? |
/// | :------------------- | :------------------------------------------------------- | :----------------- |
/// | [`PoolExhausted`]    | Every activatable slot is checked out                    | Yes                |
/// | [`HandleStale`]      | Slot was recycled under an idle block                    | No (reload)        |
/// | [`LineOutOfRange`]   | Line index past the end of the document                  | Yes                |
/// | [`CapacityOverflow`] | Edit doesn't fit in the block                            | No (split + retry) |
/// | [`LineTooLong`]      | A single line is bigger than a whole block               | Yes                |
/// | [`ReloadFailed`]     | Backing source couldn't re-supply an evicted block       | Yes                |
/// | [`BlockNotLoaded`]   | Block mutated without a borrowed buffer                  | Yes (usage error)  |
///
/// [`PoolExhausted`]: Self::PoolExhausted
/// [`HandleStale`]: Self::HandleStale
/// [`LineOutOfRange`]: Self::LineOutOfRange
/// [`CapacityOverflow`]: Self::CapacityOverflow
/// [`LineTooLong`]: Self::LineTooLong
/// [`ReloadFailed`]: Self::ReloadFailed
/// [`BlockNotLoaded`]: Self::BlockNotLoaded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum LineStoreError {
    #[error("🧱 Block pool exhausted, all {max_slots} slots are checked out")]
    #[diagnostic(
        code(line_store::pool::exhausted),
        help(
            "Idle blocks must be released so only actively edited blocks stay pinned. \
             Consider a larger `max_slots` in `PoolConfig`."
        )
    )]
    PoolExhausted { max_slots: usize },

    #[error("🔗 Handle {handle:?} no longer names a listed pool slot")]
    #[diagnostic(code(line_store::pool::handle_stale))]
    HandleStale { handle: Handle },

    #[error("📏 Line index {index} is out of range, document has {count} lines")]
    #[diagnostic(code(line_store::document::line_out_of_range))]
    LineOutOfRange { index: usize, count: usize },

    #[error("📦 Edit needs {needed} bytes but the block capacity is {capacity}")]
    #[diagnostic(code(line_store::block::capacity_overflow))]
    CapacityOverflow { needed: usize, capacity: usize },

    #[error("📜 Line of {len} bytes can't fit in a block of {capacity} bytes")]
    #[diagnostic(
        code(line_store::document::line_too_long),
        help("The block capacity is the hard ceiling on the length of a single line.")
    )]
    LineTooLong { len: usize, capacity: usize },

    #[error("💾 Could not reload {size} bytes at file offset {file_offset}")]
    #[diagnostic(
        code(line_store::document::reload_failed),
        help(
            "The block was evicted from the pool and the reload callback is missing or \
             returned false. Did the backing file change on disk?"
        )
    )]
    ReloadFailed { file_offset: u64, size: u32 },

    #[error("🔒 Block has no borrowed buffer, call `get_data()` first")]
    #[diagnostic(code(line_store::block::not_loaded))]
    BlockNotLoaded,
}

#[cfg(test)]
mod tests {
    use super::*;
    use miette::Diagnostic;

    #[test]
    fn test_error_codes_are_namespaced() {
        let errors = [
            LineStoreError::PoolExhausted { max_slots: 4 },
            LineStoreError::LineOutOfRange { index: 9, count: 3 },
            LineStoreError::LineTooLong {
                len: 100,
                capacity: 64,
            },
            LineStoreError::ReloadFailed {
                file_offset: 12,
                size: 5,
            },
        ];

        for error in &errors {
            let code = error.code().map(|it| it.to_string()).unwrap_or_default();
            assert!(code.starts_with("line_store::"), "bad code: {code}");
        }
    }

    #[test]
    fn test_error_display() {
        let error = LineStoreError::LineOutOfRange { index: 9, count: 3 };
        assert!(error.to_string().contains("Line index 9"));
        assert!(error.to_string().contains("3 lines"));
    }
}
