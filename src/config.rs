//! Tunables for vector allocation.

use crate::memory::{AllocatorRef, RootAllocator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Number of slots allocated by the first allocation of a vector.
pub const INITIAL_SLOT_CAPACITY: usize = 3970;

/// Expected average size, in bytes, of a value.
pub const AVERAGE_VALUE_WIDTH: usize = 8;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct VectorConfig {
    /// Number of slots reserved the first time a vector allocates.
    pub initial_slot_capacity: usize,
    /// Bytes per slot reserved for values the first time a vector allocates.
    pub average_value_width: usize,
    /// Upper bound on outstanding bytes for allocators built by
    /// [`VectorConfig::allocator`]. `None` means unlimited.
    pub allocation_limit: Option<usize>,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            initial_slot_capacity: INITIAL_SLOT_CAPACITY,
            average_value_width: AVERAGE_VALUE_WIDTH,
            allocation_limit: None,
        }
    }
}

impl VectorConfig {
    /// Parses a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `json` is not a valid configuration.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Returns the number of value bytes reserved for `slots` slots.
    pub fn initial_value_bytes(&self, slots: usize) -> usize {
        slots.saturating_mul(self.average_value_width)
    }

    /// Builds a root allocator honoring `allocation_limit`.
    pub fn allocator(&self) -> AllocatorRef {
        let allocator = match self.allocation_limit {
            Some(limit) => RootAllocator::new(limit),
            None => RootAllocator::unlimited(),
        };
        Arc::new(allocator)
    }
}
