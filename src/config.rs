//! Capacity configuration and the shared growth policy.

use crate::error::{Error, Result};

/// Default initial slot count for a new container.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Configuration for a single container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Initial capacity hint (clamped to the slot ceiling)
    pub initial_capacity: usize,
    /// Upper bound on slots; the platform ceiling applies when lower
    pub max_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_capacity: usize::MAX,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Effective slot ceiling for slots of type `E`.
    pub(crate) fn slot_limit<E>(&self) -> usize {
        let platform = isize::MAX as usize / std::mem::size_of::<E>().max(1);
        self.max_capacity.min(platform)
    }

    /// Initial capacity clamped to the ceiling for slots of type `E`.
    pub(crate) fn initial_slots<E>(&self) -> usize {
        self.initial_capacity.min(self.slot_limit::<E>())
    }
}

/// Configuration for a [`Grid`](crate::Grid).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConfig {
    /// Initial capacity of the row registry
    pub row_capacity: usize,
    /// Initial capacity of each row's cell container
    pub column_capacity: usize,
    /// Slot ceiling applied to every container the grid creates
    pub max_capacity: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row_capacity: DEFAULT_INITIAL_CAPACITY,
            column_capacity: 4,
            max_capacity: usize::MAX,
        }
    }
}

impl GridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_capacity(mut self, row_capacity: usize) -> Self {
        self.row_capacity = row_capacity;
        self
    }

    pub fn with_column_capacity(mut self, column_capacity: usize) -> Self {
        self.column_capacity = column_capacity;
        self
    }

    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    pub(crate) fn rows(&self) -> Config {
        Config {
            initial_capacity: self.row_capacity,
            max_capacity: self.max_capacity,
        }
    }

    pub(crate) fn columns(&self) -> Config {
        Config {
            initial_capacity: self.column_capacity,
            max_capacity: self.max_capacity,
        }
    }
}

/// Next capacity for a container holding `current` slots that needs
/// `required`: grows by half (at least one slot), never past `limit`.
pub(crate) fn grown_capacity(current: usize, required: usize, limit: usize) -> Result<usize> {
    if required > limit {
        return Err(Error::resource_exhausted(required, limit));
    }
    let step = (current / 2).max(1);
    let next = current.saturating_add(step).max(required).min(limit);
    tracing::trace!(current, required, next, "growing container");
    Ok(next)
}

/// Slot count needed to hold `key`.
#[inline]
pub(crate) fn slots_for_key(key: usize, limit: usize) -> Result<usize> {
    key.checked_add(1)
        .ok_or_else(|| Error::resource_exhausted(usize::MAX, limit))
}
