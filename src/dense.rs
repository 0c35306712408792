//! Growable array-backed map keyed by `usize`.
//!
//! `DenseMap` is the plain variant of the container family: slot index is
//! the key, there are no range views, and every operation other than growth
//! is O(1). Absence is an empty slot, so `T` may itself be `Option<_>` and a
//! stored `None` stays distinguishable from an unset key.

use std::fmt;

use crate::config::{grown_capacity, slots_for_key, Config};
use crate::error::{Error, Result};

/// A growable, integer-keyed map backed by a vector of optional slots.
pub struct DenseMap<T> {
    /// `slots.len()` is the logical capacity; it never shrinks.
    slots: Vec<Option<T>>,
    len: usize,
    limit: usize,
    revision: u64,
}

impl<T> DenseMap<T> {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(Config::new().with_initial_capacity(capacity))
    }

    pub fn with_config(config: Config) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(config.initial_slots::<Option<T>>(), || None);
        Self {
            slots,
            len: 0,
            limit: config.slot_limit::<Option<T>>(),
            revision: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots currently allocated.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Structural modification counter.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    pub fn get(&self, key: usize) -> Option<&T> {
        self.slots.get(key)?.as_ref()
    }

    #[inline]
    pub fn get_mut(&mut self, key: usize) -> Option<&mut T> {
        self.slots.get_mut(key)?.as_mut()
    }

    #[inline]
    pub fn contains_key(&self, key: usize) -> bool {
        self.get(key).is_some()
    }

    /// Stores `value` under `key`, returning the value it replaced.
    ///
    /// Fails with `ResourceExhausted` when `key` lies past the slot ceiling.
    pub fn put(&mut self, key: usize, value: T) -> Result<Option<T>> {
        self.ensure_slot(key)?;
        let old = self.slots[key].replace(value);
        if old.is_none() {
            self.len += 1;
            self.revision += 1;
        }
        Ok(old)
    }

    pub fn remove(&mut self, key: usize) -> Option<T> {
        let old = self.slots.get_mut(key)?.take();
        if old.is_some() {
            self.len -= 1;
            self.revision += 1;
        }
        old
    }

    /// Removes every entry, keeping the allocated slots.
    pub fn clear(&mut self) {
        if self.len == 0 {
            return;
        }
        for slot in &mut self.slots {
            *slot = None;
        }
        self.len = 0;
        self.revision += 1;
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.slots.iter().enumerate(),
            remaining: self.len,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = usize> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Opens a fail-fast cursor that borrows the map only per step.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            next: 0,
            last: None,
            expected: self.revision,
        }
    }

    /// Exchanges whatever is stored under `a` and `b` (either may be absent).
    pub fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        if a == b || (!self.contains_key(a) && !self.contains_key(b)) {
            return Ok(());
        }
        self.ensure_slot(a.max(b))?;
        self.slots.swap(a, b);
        self.revision += 1;
        Ok(())
    }

    /// Moves every key `>= from` to `key + 1`.
    pub fn shift_up(&mut self, from: usize) -> Result<()> {
        let Some(last) = self.last_occupied().filter(|&last| last >= from) else {
            return Ok(());
        };
        let end = slots_for_key(last, self.limit)?;
        self.ensure_slot(end)?;
        self.slots[from..=end].rotate_right(1);
        self.revision += 1;
        Ok(())
    }

    /// Moves every key `>= from` to `key - 1`. Slot `from - 1` must be empty.
    pub fn shift_down(&mut self, from: usize) -> Result<()> {
        if from == 0 {
            return Err(Error::invalid_argument("cannot shift keys below 0"));
        }
        if self.contains_key(from - 1) {
            return Err(Error::illegal_state(format!(
                "shifting down from {from} would overwrite key {}",
                from - 1
            )));
        }
        let Some(last) = self.last_occupied().filter(|&last| last >= from) else {
            return Ok(());
        };
        self.slots[from - 1..=last].rotate_left(1);
        self.revision += 1;
        Ok(())
    }

    fn last_occupied(&self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.slots.iter().rposition(Option::is_some)
    }

    fn ensure_slot(&mut self, key: usize) -> Result<()> {
        if key < self.slots.len() {
            return Ok(());
        }
        let required = slots_for_key(key, self.limit)?;
        let next = grown_capacity(self.slots.len(), required, self.limit)?;
        self.slots.resize_with(next, || None);
        Ok(())
    }
}

impl<T> Default for DenseMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for DenseMap<T> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            len: self.len,
            limit: self.limit,
            revision: 0,
        }
    }
}

impl<T: PartialEq> PartialEq for DenseMap<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: fmt::Debug> fmt::Debug for DenseMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a DenseMap<T> {
    type Item = (usize, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Iter<'a, T> {
    inner: std::iter::Enumerate<std::slice::Iter<'a, Option<T>>>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (usize, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        for (key, slot) in self.inner.by_ref() {
            if let Some(value) = slot {
                self.remaining -= 1;
                return Some((key, value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Detached traversal position over a [`DenseMap`].
///
/// The cursor records the map's revision when opened. Any structural change
/// not made through [`Cursor::remove`] makes the next step fail with
/// `ConcurrentModification`.
#[derive(Debug, Clone)]
pub struct Cursor {
    next: usize,
    last: Option<usize>,
    expected: u64,
}

impl Cursor {
    /// Yields the next entry, or `None` once the map is exhausted.
    pub fn advance<'a, T>(&mut self, map: &'a DenseMap<T>) -> Option<Result<(usize, &'a T)>> {
        if map.revision != self.expected {
            return Some(Err(Error::concurrent_modification(
                self.expected,
                map.revision,
            )));
        }
        while self.next < map.slots.len() {
            let key = self.next;
            self.next += 1;
            if let Some(value) = &map.slots[key] {
                self.last = Some(key);
                return Some(Ok((key, value)));
            }
        }
        None
    }

    /// Removes the entry most recently yielded by [`Cursor::advance`].
    pub fn remove<T>(&mut self, map: &mut DenseMap<T>) -> Result<T> {
        if map.revision != self.expected {
            return Err(Error::concurrent_modification(self.expected, map.revision));
        }
        let key = self
            .last
            .take()
            .ok_or_else(|| Error::illegal_state("cursor has no current entry to remove"))?;
        let value = map
            .remove(key)
            .ok_or_else(|| Error::illegal_state(format!("key {key} is no longer present")))?;
        self.expected = map.revision;
        Ok(value)
    }
}
