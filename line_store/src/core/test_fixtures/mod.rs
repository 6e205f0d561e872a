// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Attach sources.
pub mod backing_source;
pub mod temp_dir;

// Re-export.
pub use backing_source::*;
pub use temp_dir::*;
