// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Default capacity (in bytes) of every pooled block buffer.
pub const DEFAULT_BLOCK_CAPACITY: usize = 64 * 1024;

/// Default hard cap on the number of pool slots that may ever be activated.
pub const DEFAULT_MAX_SLOTS: usize = 4096;

/// Default number of slots activated at a time, when the pool needs to grow.
pub const DEFAULT_ACTIVATION_STEP: usize = 64;

/// Sizing of a [`crate::BlockPool`]. Memory use is bounded by
/// `block_capacity * max_slots` bytes of buffer storage.
///
/// # Example
///
/// ```
/// use r3bl_line_store::PoolConfig;
///
/// let config = PoolConfig::default()
///     .with_block_capacity(4 * 1024)
///     .with_max_slots(16);
/// assert_eq!(config.block_capacity, 4 * 1024);
/// assert_eq!(config.max_slots, 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub block_capacity: usize,
    pub max_slots: usize,
    pub activation_step: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            block_capacity: DEFAULT_BLOCK_CAPACITY,
            max_slots: DEFAULT_MAX_SLOTS,
            activation_step: DEFAULT_ACTIVATION_STEP,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn with_block_capacity(mut self, block_capacity: usize) -> Self {
        self.block_capacity = block_capacity;
        self
    }

    #[must_use]
    pub fn with_max_slots(mut self, max_slots: usize) -> Self {
        self.max_slots = max_slots;
        self
    }

    #[must_use]
    pub fn with_activation_step(mut self, activation_step: usize) -> Self {
        self.activation_step = activation_step;
        self
    }

    /// The activation step can't be zero (the pool would never grow) and never needs to
    /// be bigger than the cap.
    #[must_use]
    pub fn effective_activation_step(&self) -> usize {
        self.activation_step.clamp(1, self.max_slots.max(1))
    }
}
