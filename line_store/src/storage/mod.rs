// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod block;
pub mod block_pool;
pub mod document;
pub mod file_loader;
pub mod handle;
pub mod line_table;
pub mod split;

// Re-export.
pub use block::*;
pub use block_pool::*;
pub use document::*;
pub use file_loader::*;
pub use handle::*;
pub use line_table::*;
pub use split::*;
