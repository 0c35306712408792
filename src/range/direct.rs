//! Direct-indexed backing store: slot index == key.

use crate::config::{grown_capacity, slots_for_key, Config};
use crate::error::Result;

use super::{Store, Ticket};

/// One slot of a [`DirectStore`].
///
/// A slot is pinned once an entry handle has been handed out for it; the
/// ticket lets the handle notice when the slot no longer holds its entry.
enum Slot<T> {
    Empty,
    Value(T),
    Pinned(T, Ticket),
}

impl<T> Slot<T> {
    #[inline]
    fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    #[inline]
    fn value(&self) -> Option<&T> {
        match self {
            Slot::Empty => None,
            Slot::Value(v) | Slot::Pinned(v, _) => Some(v),
        }
    }

    #[inline]
    fn value_mut(&mut self) -> Option<&mut T> {
        match self {
            Slot::Empty => None,
            Slot::Value(v) | Slot::Pinned(v, _) => Some(v),
        }
    }

    #[inline]
    fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, Slot::Empty) {
            Slot::Empty => None,
            Slot::Value(v) | Slot::Pinned(v, _) => Some(v),
        }
    }
}

/// Full-range array store: O(1) access, memory proportional to the largest
/// key.
pub struct DirectStore<T> {
    /// `slots.len()` is the logical capacity.
    slots: Vec<Slot<T>>,
    len: usize,
    limit: usize,
    revision: u64,
    next_ticket: Ticket,
}

impl<T> DirectStore<T> {
    /// `[from, to)` clipped to allocated slots.
    #[inline]
    fn span(&self, from: usize, to: usize) -> std::ops::Range<usize> {
        let end = to.min(self.slots.len());
        from.min(end)..end
    }

    fn ensure_slot(&mut self, key: usize) -> Result<()> {
        if key < self.slots.len() {
            return Ok(());
        }
        let required = slots_for_key(key, self.limit)?;
        let next = grown_capacity(self.slots.len(), required, self.limit)?;
        self.slots.resize_with(next, || Slot::Empty);
        Ok(())
    }
}

impl<T> Store<T> for DirectStore<T> {
    fn with_config(config: &Config) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(config.initial_slots::<Slot<T>>(), || Slot::Empty);
        Self {
            slots,
            len: 0,
            limit: config.slot_limit::<Slot<T>>(),
            revision: 0,
            next_ticket: 0,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    fn get(&self, key: usize) -> Option<&T> {
        self.slots.get(key)?.value()
    }

    #[inline]
    fn get_mut(&mut self, key: usize) -> Option<&mut T> {
        self.slots.get_mut(key)?.value_mut()
    }

    fn insert(&mut self, key: usize, value: T) -> Result<Option<T>> {
        self.ensure_slot(key)?;
        let slot = &mut self.slots[key];
        match slot.value_mut() {
            Some(old) => Ok(Some(std::mem::replace(old, value))),
            None => {
                *slot = Slot::Value(value);
                self.len += 1;
                self.revision += 1;
                Ok(None)
            }
        }
    }

    fn remove(&mut self, key: usize) -> Option<T> {
        let old = self.slots.get_mut(key)?.take()?;
        self.len -= 1;
        self.revision += 1;
        Some(old)
    }

    fn count_in(&self, from: usize, to: usize) -> usize {
        let span = self.span(from, to);
        if span.start == 0 && span.end == self.slots.len() {
            return self.len;
        }
        self.slots[span].iter().filter(|s| !s.is_empty()).count()
    }

    fn clear_in(&mut self, from: usize, to: usize) -> usize {
        let span = self.span(from, to);
        let mut removed = 0;
        for slot in &mut self.slots[span] {
            if slot.take().is_some() {
                removed += 1;
            }
        }
        if removed > 0 {
            self.len -= removed;
            self.revision += 1;
        }
        removed
    }

    fn first_in(&self, from: usize, to: usize) -> Option<usize> {
        let span = self.span(from, to);
        let start = span.start;
        self.slots[span]
            .iter()
            .position(|s| !s.is_empty())
            .map(|i| start + i)
    }

    fn last_in(&self, from: usize, to: usize) -> Option<usize> {
        let span = self.span(from, to);
        let start = span.start;
        self.slots[span]
            .iter()
            .rposition(|s| !s.is_empty())
            .map(|i| start + i)
    }

    fn for_each_in<F: FnMut(usize, &T)>(&self, from: usize, to: usize, mut f: F) {
        let span = self.span(from, to);
        let start = span.start;
        for (i, slot) in self.slots[span].iter().enumerate() {
            if let Some(v) = slot.value() {
                f(start + i, v);
            }
        }
    }

    fn shift_up_in(&mut self, from: usize, to: usize) -> Result<()> {
        let Some(last) = self.last_in(from, to) else {
            return Ok(());
        };
        debug_assert!(last + 1 < to);
        self.ensure_slot(last + 1)?;
        self.slots[from..=last + 1].rotate_right(1);
        self.revision += 1;
        Ok(())
    }

    fn shift_down_in(&mut self, from: usize, to: usize) {
        let Some(last) = self.last_in(from, to) else {
            return;
        };
        debug_assert!(from > 0 && self.slots[from - 1].is_empty());
        self.slots[from - 1..=last].rotate_left(1);
        self.revision += 1;
    }

    fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        if a == b || (!self.contains_key(a) && !self.contains_key(b)) {
            return Ok(());
        }
        self.ensure_slot(a.max(b))?;
        self.slots.swap(a, b);
        self.revision += 1;
        Ok(())
    }

    fn promote(&mut self, key: usize) -> Option<Ticket> {
        match self.slots.get(key)? {
            Slot::Empty => return None,
            Slot::Pinned(_, ticket) => return Some(*ticket),
            Slot::Value(_) => {}
        }
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let slot = &mut self.slots[key];
        if let Slot::Value(v) = std::mem::replace(slot, Slot::Empty) {
            *slot = Slot::Pinned(v, ticket);
        }
        Some(ticket)
    }

    fn ticket(&self, key: usize) -> Option<Ticket> {
        match self.slots.get(key)? {
            Slot::Pinned(_, ticket) => Some(*ticket),
            _ => None,
        }
    }
}
