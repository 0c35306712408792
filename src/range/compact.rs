//! Key-sorted, gap-free backing store.
//!
//! Records live in a vector in strictly ascending key order, so every lookup
//! and insertion point is a binary search and every range bound is
//! recomputed against the live vector on each call.

use crate::config::{grown_capacity, Config};
use crate::error::Result;

use super::{Store, Ticket};

struct Record<T> {
    key: usize,
    value: T,
    ticket: Option<Ticket>,
}

/// Sorted-array store: memory proportional to the number of entries.
pub struct CompactStore<T> {
    records: Vec<Record<T>>,
    /// Logical capacity under the growth policy (the vector may over-reserve).
    capacity: usize,
    limit: usize,
    revision: u64,
    next_ticket: Ticket,
}

impl<T> CompactStore<T> {
    #[inline]
    fn search(&self, key: usize) -> std::result::Result<usize, usize> {
        self.records.binary_search_by(|r| r.key.cmp(&key))
    }

    /// Index of the first record with `record.key >= key`.
    #[inline]
    fn lower_bound(&self, key: usize) -> usize {
        self.records.partition_point(|r| r.key < key)
    }

    #[inline]
    fn bounds(&self, from: usize, to: usize) -> (usize, usize) {
        if from >= to {
            let at = self.lower_bound(from);
            return (at, at);
        }
        (self.lower_bound(from), self.lower_bound(to))
    }

    /// Inserts `record` at `index`, growing and copying in a single pass.
    fn insert_at(&mut self, index: usize, record: Record<T>) -> Result<()> {
        if self.records.len() < self.capacity {
            self.records.insert(index, record);
            return Ok(());
        }
        let next = grown_capacity(self.capacity, self.records.len() + 1, self.limit)?;
        let mut records = Vec::with_capacity(next);
        let mut old = std::mem::take(&mut self.records).into_iter();
        records.extend(old.by_ref().take(index));
        records.push(record);
        records.extend(old);
        self.records = records;
        self.capacity = next;
        Ok(())
    }

    fn rekey(&mut self, index: usize, key: usize) {
        let mut record = self.records.remove(index);
        record.key = key;
        let at = self.lower_bound(key);
        self.records.insert(at, record);
        self.revision += 1;
    }
}

impl<T> Store<T> for CompactStore<T> {
    fn with_config(config: &Config) -> Self {
        let capacity = config.initial_slots::<Record<T>>();
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
            limit: config.slot_limit::<Record<T>>(),
            revision: 0,
            next_ticket: 0,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn revision(&self) -> u64 {
        self.revision
    }

    fn get(&self, key: usize) -> Option<&T> {
        let i = self.search(key).ok()?;
        Some(&self.records[i].value)
    }

    fn get_mut(&mut self, key: usize) -> Option<&mut T> {
        let i = self.search(key).ok()?;
        Some(&mut self.records[i].value)
    }

    fn insert(&mut self, key: usize, value: T) -> Result<Option<T>> {
        match self.search(key) {
            Ok(i) => Ok(Some(std::mem::replace(&mut self.records[i].value, value))),
            Err(i) => {
                self.insert_at(
                    i,
                    Record {
                        key,
                        value,
                        ticket: None,
                    },
                )?;
                self.revision += 1;
                Ok(None)
            }
        }
    }

    fn remove(&mut self, key: usize) -> Option<T> {
        let i = self.search(key).ok()?;
        self.revision += 1;
        Some(self.records.remove(i).value)
    }

    fn count_in(&self, from: usize, to: usize) -> usize {
        let (lo, hi) = self.bounds(from, to);
        hi - lo
    }

    fn clear_in(&mut self, from: usize, to: usize) -> usize {
        let (lo, hi) = self.bounds(from, to);
        if hi > lo {
            self.records.drain(lo..hi);
            self.revision += 1;
        }
        hi - lo
    }

    fn first_in(&self, from: usize, to: usize) -> Option<usize> {
        let lo = self.lower_bound(from);
        self.records
            .get(lo)
            .map(|r| r.key)
            .filter(|&key| key < to)
    }

    fn last_in(&self, from: usize, to: usize) -> Option<usize> {
        let hi = self.lower_bound(to);
        if hi == 0 {
            return None;
        }
        Some(self.records[hi - 1].key).filter(|&key| key >= from)
    }

    fn for_each_in<F: FnMut(usize, &T)>(&self, from: usize, to: usize, mut f: F) {
        let (lo, hi) = self.bounds(from, to);
        for r in &self.records[lo..hi] {
            f(r.key, &r.value);
        }
    }

    fn shift_up_in(&mut self, from: usize, to: usize) -> Result<()> {
        let (lo, hi) = self.bounds(from, to);
        if hi == lo {
            return Ok(());
        }
        debug_assert!(self.records[hi - 1].key + 1 < to);
        for r in &mut self.records[lo..hi] {
            r.key += 1;
        }
        self.revision += 1;
        Ok(())
    }

    fn shift_down_in(&mut self, from: usize, to: usize) {
        let (lo, hi) = self.bounds(from, to);
        if hi == lo {
            return;
        }
        debug_assert!(from > 0 && (lo == 0 || self.records[lo - 1].key < from - 1));
        for r in &mut self.records[lo..hi] {
            r.key -= 1;
        }
        self.revision += 1;
    }

    fn swap(&mut self, a: usize, b: usize) -> Result<()> {
        if a == b {
            return Ok(());
        }
        match (self.search(a), self.search(b)) {
            (Ok(i), Ok(j)) => {
                self.records.swap(i, j);
                self.records[i].key = a;
                self.records[j].key = b;
                self.revision += 1;
            }
            (Ok(i), Err(_)) => self.rekey(i, b),
            (Err(_), Ok(j)) => self.rekey(j, a),
            (Err(_), Err(_)) => {}
        }
        Ok(())
    }

    fn promote(&mut self, key: usize) -> Option<Ticket> {
        let i = self.search(key).ok()?;
        let record = &mut self.records[i];
        if record.ticket.is_none() {
            self.next_ticket += 1;
            record.ticket = Some(self.next_ticket);
        }
        record.ticket
    }

    fn ticket(&self, key: usize) -> Option<Ticket> {
        let i = self.search(key).ok()?;
        self.records[i].ticket
    }
}
