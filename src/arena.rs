//! Generational arena for grid records.
//!
//! Records are addressed by a [`Key`] carrying the slot index and the
//! generation the slot had when the record was inserted. Removing a record
//! bumps the slot's generation, so every key handed out for it stops
//! resolving even after the slot is reused.

/// Address of a record: slot index plus generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Key {
    index: usize,
    generation: u64,
}

enum Entry<T> {
    Occupied { generation: u64, value: T },
    Vacant { generation: u64 },
}

/// Slot storage with a free list of vacant indices.
pub(crate) struct Arena<T> {
    entries: Vec<Entry<T>>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(&mut self, value: T) -> Key {
        self.len += 1;
        while let Some(index) = self.free.pop() {
            // Only vacant slots are reusable; anything else is skipped.
            if let Some(&Entry::Vacant { generation }) = self.entries.get(index) {
                self.entries[index] = Entry::Occupied { generation, value };
                return Key { index, generation };
            }
        }
        let index = self.entries.len();
        self.entries.push(Entry::Occupied {
            generation: 0,
            value,
        });
        Key {
            index,
            generation: 0,
        }
    }

    #[inline]
    pub(crate) fn get(&self, key: Key) -> Option<&T> {
        match self.entries.get(key.index)? {
            Entry::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, key: Key) -> Option<&mut T> {
        match self.entries.get_mut(key.index)? {
            Entry::Occupied { generation, value } if *generation == key.generation => Some(value),
            _ => None,
        }
    }

    #[inline]
    pub(crate) fn contains(&self, key: Key) -> bool {
        self.get(key).is_some()
    }

    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        if !self.contains(key) {
            return None;
        }
        let vacant = Entry::Vacant {
            generation: key.generation + 1,
        };
        let Entry::Occupied { value, .. } = std::mem::replace(&mut self.entries[key.index], vacant)
        else {
            return None;
        };
        self.free.push(key.index);
        self.len -= 1;
        Some(value)
    }

    /// Removes every record; all previously issued keys stop resolving.
    pub(crate) fn clear(&mut self) {
        self.free.clear();
        for (index, entry) in self.entries.iter_mut().enumerate() {
            if let Entry::Occupied { generation, .. } = *entry {
                *entry = Entry::Vacant {
                    generation: generation + 1,
                };
            }
            self.free.push(index);
        }
        self.len = 0;
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().filter_map(|e| match e {
            Entry::Occupied { value, .. } => Some(value),
            Entry::Vacant { .. } => None,
        })
    }
}
