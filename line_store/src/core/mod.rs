// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

// Connect to source file.
pub mod config;
pub mod decl_macros;
pub mod error;
pub mod log;
pub mod test_fixtures;
pub mod units;

// Re-export.
pub use config::*;
pub use decl_macros::*;
pub use error::*;
pub use log::*;
pub use test_fixtures::*;
pub use units::*;
