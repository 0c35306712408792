//! Integer-keyed maps with zero-copy range views.
//!
//! A [`RangeMap`] is a window `[from, to)` over a backing [`Store`] shared
//! through `Rc<RefCell<_>>`. Every view carved from a map shares its store,
//! so mutations through one view are immediately visible through all others.
//! The unrestricted window is `[0, usize::MAX)`; `usize::MAX` itself is the
//! exclusive bound and can never be stored.
//!
//! Two strategies implement [`Store`]:
//!
//! - [`CompactStore`]: records sorted by key with no gaps, binary-searched.
//!   Memory tracks the number of entries; inserts and removals shift.
//! - [`DirectStore`]: slot index is the key. O(1) access; memory tracks the
//!   largest key.
//!
//! Traversals ([`RangeMap::iter`] and friends) hold their own handle to the
//! store rather than a borrow, so the map may be mutated between steps. Each
//! step compares the store's revision against the one captured when the
//! traversal opened and fails with `ConcurrentModification` on a mismatch.

mod compact;
mod direct;

pub use compact::CompactStore;
pub use direct::DirectStore;

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::config::Config;
use crate::error::{Error, Result};

/// Identity of a pinned entry. A handle is attached while the slot under its
/// key still carries the same ticket.
pub type Ticket = u64;

/// Map over the sorted compact strategy.
pub type CompactMap<T> = RangeMap<T, CompactStore<T>>;

/// Map over the direct-indexed strategy.
pub type DirectMap<T> = RangeMap<T, DirectStore<T>>;

// =============================================================================
// Backing store contract
// =============================================================================

/// A backing strategy for [`RangeMap`].
///
/// Range arguments are half-open `[from, to)`. Methods documented with a
/// precondition trust the caller; [`RangeMap`] validates before delegating.
pub trait Store<T> {
    fn with_config(config: &Config) -> Self
    where
        Self: Sized;

    /// Number of entries across the whole store.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    /// Structural modification counter.
    fn revision(&self) -> u64;

    fn get(&self, key: usize) -> Option<&T>;

    fn get_mut(&mut self, key: usize) -> Option<&mut T>;

    fn contains_key(&self, key: usize) -> bool {
        self.get(key).is_some()
    }

    fn insert(&mut self, key: usize, value: T) -> Result<Option<T>>;

    fn remove(&mut self, key: usize) -> Option<T>;

    fn count_in(&self, from: usize, to: usize) -> usize;

    /// Removes every key in range, returning how many were removed.
    fn clear_in(&mut self, from: usize, to: usize) -> usize;

    fn first_in(&self, from: usize, to: usize) -> Option<usize>;

    fn last_in(&self, from: usize, to: usize) -> Option<usize>;

    fn for_each_in<F: FnMut(usize, &T)>(&self, from: usize, to: usize, f: F);

    /// Moves every key in range to `key + 1`.
    ///
    /// Precondition: the last key in range is below `to - 1`.
    fn shift_up_in(&mut self, from: usize, to: usize) -> Result<()>;

    /// Moves every key in range to `key - 1`.
    ///
    /// Precondition: `from > 0` and `from - 1` is absent.
    fn shift_down_in(&mut self, from: usize, to: usize);

    /// Exchanges the contents of two keys; either may be absent.
    fn swap(&mut self, a: usize, b: usize) -> Result<()>;

    /// Pins the entry under `key`, returning its ticket. Idempotent.
    fn promote(&mut self, key: usize) -> Option<Ticket>;

    fn ticket(&self, key: usize) -> Option<Ticket>;
}

// =============================================================================
// RangeMap
// =============================================================================

/// An integer-keyed map restricted to `[from, to)` over a shared store.
pub struct RangeMap<T, S> {
    store: Rc<RefCell<S>>,
    from: usize,
    to: usize,
    _marker: PhantomData<T>,
}

impl<T, S: Store<T>> RangeMap<T, S> {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(Config::new().with_initial_capacity(capacity))
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            store: Rc::new(RefCell::new(S::with_config(&config))),
            from: 0,
            to: usize::MAX,
            _marker: PhantomData,
        }
    }

    /// Lower bound (inclusive) of this view.
    #[inline]
    pub fn from_key(&self) -> usize {
        self.from
    }

    /// Upper bound (exclusive) of this view.
    #[inline]
    pub fn to_key(&self) -> usize {
        self.to
    }

    #[inline]
    fn in_view(&self, key: usize) -> bool {
        key >= self.from && key < self.to
    }

    /// Number of entries visible through this view.
    pub fn len(&self) -> usize {
        self.store.borrow().count_in(self.from, self.to)
    }

    pub fn is_empty(&self) -> bool {
        self.store.borrow().first_in(self.from, self.to).is_none()
    }

    /// Capacity of the shared store.
    pub fn capacity(&self) -> usize {
        self.store.borrow().capacity()
    }

    /// Revision of the shared store.
    pub fn revision(&self) -> u64 {
        self.store.borrow().revision()
    }

    pub fn contains_key(&self, key: usize) -> bool {
        self.in_view(key) && self.store.borrow().contains_key(key)
    }

    /// Returns a clone of the value under `key`; `None` when absent or
    /// outside the view.
    pub fn get(&self, key: usize) -> Option<T>
    where
        T: Clone,
    {
        if !self.in_view(key) {
            return None;
        }
        self.store.borrow().get(key).cloned()
    }

    /// Runs `f` on the value under `key` without cloning it.
    ///
    /// `f` runs while the store is borrowed and must not touch this map or
    /// any view sharing its store.
    pub fn get_with<R>(&self, key: usize, f: impl FnOnce(&T) -> R) -> Option<R> {
        if !self.in_view(key) {
            return None;
        }
        self.store.borrow().get(key).map(f)
    }

    /// Mutates the value under `key` in place. Not a structural change.
    pub fn update<R>(&mut self, key: usize, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        if !self.in_view(key) {
            return None;
        }
        self.store.borrow_mut().get_mut(key).map(f)
    }

    /// Stores `value` under `key`, returning the value it replaced.
    pub fn put(&mut self, key: usize, value: T) -> Result<Option<T>> {
        if !self.in_view(key) {
            return Err(Error::invalid_argument(format!(
                "key {key} is outside view [{}, {})",
                self.from, self.to
            )));
        }
        self.store.borrow_mut().insert(key, value)
    }

    pub fn remove(&mut self, key: usize) -> Option<T> {
        if !self.in_view(key) {
            return None;
        }
        self.store.borrow_mut().remove(key)
    }

    /// Removes every key inside this view; keys outside it are untouched.
    pub fn clear(&mut self) {
        self.store.borrow_mut().clear_in(self.from, self.to);
    }

    pub fn first_key(&self) -> Result<usize> {
        self.store
            .borrow()
            .first_in(self.from, self.to)
            .ok_or_else(|| self.empty_view())
    }

    pub fn last_key(&self) -> Result<usize> {
        self.store
            .borrow()
            .last_in(self.from, self.to)
            .ok_or_else(|| self.empty_view())
    }

    fn empty_view(&self) -> Error {
        Error::not_found(format!("view [{}, {}) is empty", self.from, self.to))
    }

    /// A view of `[from, to)` sharing this map's store.
    ///
    /// The range must be well-formed and lie inside this view.
    pub fn view(&self, from: usize, to: usize) -> Result<Self> {
        if from > to {
            return Err(Error::invalid_argument(format!(
                "view start {from} is greater than end {to}"
            )));
        }
        if from < self.from || to > self.to {
            return Err(Error::invalid_argument(format!(
                "view [{from}, {to}) is not contained in [{}, {})",
                self.from, self.to
            )));
        }
        Ok(Self {
            store: Rc::clone(&self.store),
            from,
            to,
            _marker: PhantomData,
        })
    }

    /// True if both maps are views over the same store.
    pub fn shares_store_with(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store)
    }

    /// Runs `f` on every entry of the view in key order under a single
    /// borrow. `f` must not touch this map or any view sharing its store.
    pub fn for_each<F: FnMut(usize, &T)>(&self, f: F) {
        self.store.borrow().for_each_in(self.from, self.to, f);
    }

    /// Snapshot of the view's entries in key order.
    pub fn to_vec(&self) -> Vec<(usize, T)>
    where
        T: Clone,
    {
        let mut out = Vec::new();
        self.for_each(|k, v| out.push((k, v.clone())));
        out
    }

    /// Copies the view's entries into a new, independent, unrestricted map.
    pub fn duplicate(&self) -> Result<Self>
    where
        T: Clone,
    {
        let entries = self.to_vec();
        let mut out = Self::with_capacity(entries.len());
        for (key, value) in entries {
            out.put(key, value)?;
        }
        Ok(out)
    }

    pub fn iter(&self) -> Iter<T, S> {
        Iter {
            store: Rc::clone(&self.store),
            position: self.position(),
            _marker: PhantomData,
        }
    }

    pub fn keys(&self) -> Keys<T, S> {
        Keys {
            store: Rc::clone(&self.store),
            position: self.position(),
            _marker: PhantomData,
        }
    }

    pub fn values(&self) -> Values<T, S> {
        Values { inner: self.iter() }
    }

    /// Traverses the view yielding pinned [`Entry`] handles.
    pub fn entries(&self) -> Entries<T, S> {
        Entries {
            store: Rc::clone(&self.store),
            position: self.position(),
            _marker: PhantomData,
        }
    }

    /// A handle to the entry under `key`, pinning its slot.
    pub fn entry(&self, key: usize) -> Option<Entry<T, S>> {
        if !self.in_view(key) {
            return None;
        }
        let ticket = self.store.borrow_mut().promote(key)?;
        Some(Entry {
            store: Rc::clone(&self.store),
            key,
            ticket,
            _marker: PhantomData,
        })
    }

    fn position(&self) -> Position {
        Position {
            next: self.from,
            to: self.to,
            last: None,
            expected: self.store.borrow().revision(),
            done: false,
        }
    }

    fn check_bound(&self, key: usize) -> Result<()> {
        if key < self.from || key > self.to {
            return Err(Error::invalid_argument(format!(
                "key {key} is outside view [{}, {}]",
                self.from, self.to
            )));
        }
        Ok(())
    }

    /// Moves every key in `[from, view end)` up by one.
    ///
    /// Fails with `IndexOutOfRange` if the last such key would leave the view.
    pub fn shift_keys_up(&mut self, from: usize) -> Result<()> {
        self.check_bound(from)?;
        let mut store = self.store.borrow_mut();
        let Some(last) = store.last_in(from, self.to) else {
            return Ok(());
        };
        if last + 1 >= self.to {
            return Err(Error::index_out_of_range(format!(
                "key {last} cannot move past view end {}",
                self.to
            )));
        }
        store.shift_up_in(from, self.to)
    }

    /// Moves every key in `[from, view end)` down by one.
    ///
    /// `from - 1` must lie inside the view and be absent.
    pub fn shift_keys_down(&mut self, from: usize) -> Result<()> {
        self.check_bound(from)?;
        if from == self.from {
            return Err(Error::invalid_argument(format!(
                "cannot shift keys below view start {}",
                self.from
            )));
        }
        let mut store = self.store.borrow_mut();
        if store.contains_key(from - 1) {
            return Err(Error::illegal_state(format!(
                "shifting down from {from} would overwrite key {}",
                from - 1
            )));
        }
        store.shift_down_in(from, self.to);
        Ok(())
    }

    /// Exchanges the contents of keys `a` and `b` (either may be absent).
    pub fn swap_keys(&mut self, a: usize, b: usize) -> Result<()> {
        if !self.in_view(a) || !self.in_view(b) {
            return Err(Error::invalid_argument(format!(
                "swap of {a} and {b} leaves view [{}, {})",
                self.from, self.to
            )));
        }
        self.store.borrow_mut().swap(a, b)
    }
}

impl<T, S: Store<T>> Default for RangeMap<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, S: Store<T>> fmt::Debug for RangeMap<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        self.for_each(|k, v| {
            map.entry(&k, v);
        });
        map.finish()
    }
}

// =============================================================================
// Fail-fast traversal
// =============================================================================

#[derive(Debug, Clone)]
struct Position {
    next: usize,
    to: usize,
    last: Option<usize>,
    expected: u64,
    done: bool,
}

impl Position {
    fn advance<T, S: Store<T>>(&mut self, store: &S) -> Option<Result<usize>> {
        if self.done {
            return None;
        }
        let found = store.revision();
        if found != self.expected {
            self.done = true;
            return Some(Err(Error::concurrent_modification(self.expected, found)));
        }
        match store.first_in(self.next, self.to) {
            Some(key) => {
                self.next = key + 1;
                self.last = Some(key);
                Some(Ok(key))
            }
            None => {
                self.done = true;
                None
            }
        }
    }

    fn remove<T, S: Store<T>>(&mut self, store: &mut S) -> Result<T> {
        let found = store.revision();
        if found != self.expected {
            return Err(Error::concurrent_modification(self.expected, found));
        }
        let key = self
            .last
            .take()
            .ok_or_else(|| Error::illegal_state("traversal has no current entry to remove"))?;
        let value = store
            .remove(key)
            .ok_or_else(|| Error::illegal_state(format!("key {key} is no longer present")))?;
        self.expected = store.revision();
        Ok(value)
    }
}

/// Fail-fast traversal over `(key, value)` pairs.
pub struct Iter<T, S> {
    store: Rc<RefCell<S>>,
    position: Position,
    _marker: PhantomData<T>,
}

impl<T, S: Store<T>> Iter<T, S> {
    /// Removes the entry most recently yielded.
    pub fn remove(&mut self) -> Result<T> {
        self.position.remove(&mut *self.store.borrow_mut())
    }
}

impl<T: Clone, S: Store<T>> Iterator for Iter<T, S> {
    type Item = Result<(usize, T)>;

    fn next(&mut self) -> Option<Self::Item> {
        let store = self.store.borrow();
        let key = match self.position.advance::<T, S>(&*store)? {
            Ok(key) => key,
            Err(e) => return Some(Err(e)),
        };
        store.get(key).cloned().map(|value| Ok((key, value)))
    }
}

/// Fail-fast traversal over keys.
pub struct Keys<T, S> {
    store: Rc<RefCell<S>>,
    position: Position,
    _marker: PhantomData<T>,
}

impl<T, S: Store<T>> Keys<T, S> {
    /// Removes the entry whose key was most recently yielded.
    pub fn remove(&mut self) -> Result<T> {
        self.position.remove(&mut *self.store.borrow_mut())
    }
}

impl<T, S: Store<T>> Iterator for Keys<T, S> {
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        self.position.advance::<T, S>(&*self.store.borrow())
    }
}

/// Fail-fast traversal over values.
pub struct Values<T, S> {
    inner: Iter<T, S>,
}

impl<T: Clone, S: Store<T>> Iterator for Values<T, S> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|item| item.map(|(_, v)| v))
    }
}

/// Fail-fast traversal yielding pinned entry handles.
pub struct Entries<T, S> {
    store: Rc<RefCell<S>>,
    position: Position,
    _marker: PhantomData<T>,
}

impl<T, S: Store<T>> Entries<T, S> {
    /// Removes the entry most recently yielded. The traversal continues with
    /// the following key; handles to the removed entry become detached.
    pub fn remove(&mut self) -> Result<T> {
        self.position.remove(&mut *self.store.borrow_mut())
    }
}

impl<T, S: Store<T>> Iterator for Entries<T, S> {
    type Item = Result<Entry<T, S>>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut store = self.store.borrow_mut();
        let key = match self.position.advance::<T, S>(&*store)? {
            Ok(key) => key,
            Err(e) => return Some(Err(e)),
        };
        let ticket = store.promote(key)?;
        Some(Ok(Entry {
            store: Rc::clone(&self.store),
            key,
            ticket,
            _marker: PhantomData,
        }))
    }
}

// =============================================================================
// Entry handles
// =============================================================================

/// A mutable key/value handle aliasing one slot of a store.
///
/// The handle stays attached while its key holds the same pinned entry.
/// Removing the key (through any view), re-keying it by a shift or swap, or
/// removing through the handle itself detaches it; every operation on a
/// detached handle fails with `IllegalState`.
pub struct Entry<T, S> {
    store: Rc<RefCell<S>>,
    key: usize,
    ticket: Ticket,
    _marker: PhantomData<T>,
}

impl<T, S: Store<T>> Entry<T, S> {
    #[inline]
    pub fn key(&self) -> usize {
        self.key
    }

    pub fn is_attached(&self) -> bool {
        self.store.borrow().ticket(self.key) == Some(self.ticket)
    }

    fn check(&self, store: &S) -> Result<()> {
        if store.ticket(self.key) != Some(self.ticket) {
            return Err(Error::illegal_state(format!(
                "entry for key {} is detached",
                self.key
            )));
        }
        Ok(())
    }

    pub fn value(&self) -> Result<T>
    where
        T: Clone,
    {
        self.with_value(T::clone)
    }

    pub fn with_value<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let store = self.store.borrow();
        self.check(&store)?;
        store
            .get(self.key)
            .map(f)
            .ok_or_else(|| Error::illegal_state(format!("key {} is empty", self.key)))
    }

    /// Replaces the aliased value, returning the previous one.
    pub fn set_value(&self, value: T) -> Result<T> {
        let mut store = self.store.borrow_mut();
        self.check(&store)?;
        store
            .get_mut(self.key)
            .map(|slot| std::mem::replace(slot, value))
            .ok_or_else(|| Error::illegal_state(format!("key {} is empty", self.key)))
    }

    /// Removes the aliased entry from the store.
    pub fn remove(&self) -> Result<T> {
        let mut store = self.store.borrow_mut();
        self.check(&store)?;
        store
            .remove(self.key)
            .ok_or_else(|| Error::illegal_state(format!("key {} is empty", self.key)))
    }
}

impl<T, S> fmt::Debug for Entry<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("ticket", &self.ticket)
            .finish()
    }
}
