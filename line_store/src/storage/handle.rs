// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::fmt::{Debug, Display, Formatter};

/// Generation counter for detecting stale handles.
pub type Generation = u32;

/// Identity of one [`crate::BlockPool`] slot, safe against reuse. The slot index alone
/// isn't enough, since a slot is recycled many times over the life of the pool; every
/// recycle bumps the slot's generation, so a handle held from a previous "life" of the
/// slot never compares equal to the current one.
///
/// Equality requires both fields to be equal. [`Handle::NULL`] (`{0, 0}`) means
/// "unassigned". The pool never hands it out: a slot's generation is bumped before its
/// first use.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Handle {
    pub slot_index: u32,
    pub generation: Generation,
}

impl Handle {
    pub const NULL: Handle = Handle {
        slot_index: 0,
        generation: 0,
    };

    #[must_use]
    pub fn new(slot_index: u32, generation: Generation) -> Self {
        Self {
            slot_index,
            generation,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool { *self == Self::NULL }

    #[must_use]
    pub fn slot(&self) -> usize { self.slot_index as usize }
}

/// Next generation for a slot. Wraps around, skipping 0 so a recycled slot 0 can never
/// produce [`Handle::NULL`].
#[must_use]
pub fn next_generation(generation: Generation) -> Generation {
    match generation.wrapping_add(1) {
        0 => 1,
        it => it,
    }
}

impl Debug for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({}#{})", self.slot_index, self.generation)
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { Debug::fmt(self, f) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_handle() {
        assert!(Handle::default().is_null());
        assert!(!Handle::new(0, 1).is_null());
        assert!(!Handle::new(1, 0).is_null());
    }

    #[test]
    fn test_equality_requires_both_fields() {
        assert_eq!(Handle::new(3, 7), Handle::new(3, 7));
        assert_ne!(Handle::new(3, 7), Handle::new(3, 8));
        assert_ne!(Handle::new(3, 7), Handle::new(4, 7));
    }

    #[test]
    fn test_next_generation_skips_zero() {
        assert_eq!(next_generation(0), 1);
        assert_eq!(next_generation(41), 42);
        assert_eq!(next_generation(u32::MAX), 1);
    }
}
