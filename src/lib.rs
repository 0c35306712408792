//! # intgrid
//!
//! Integer-keyed containers with zero-copy range views, and a mutable
//! two-dimensional grid built on top of them.
//!
//! - [`DenseMap`]: growable array map, slot index == key.
//! - [`RangeMap`]: map restricted to a `[from, to)` window over a shared
//!   backing [`Store`], either [`CompactStore`] (sorted, memory follows the
//!   entry count) or [`DirectStore`] (O(1), memory follows the largest key).
//! - [`Grid`]: rows × columns of optional values whose rows and columns can
//!   be inserted, deleted, swapped, and sorted while every live handle keeps
//!   pointing at the same cell.
//!
//! ## Example
//!
//! ```rust
//! use intgrid::{natural_order, sort_by_row, CompactMap, Grid};
//!
//! let mut map: CompactMap<&str> = CompactMap::new();
//! map.put(1, "a").unwrap();
//! map.put(5, "b").unwrap();
//! let view = map.view(2, 10).unwrap();
//! assert_eq!(view.to_vec(), vec![(5, "b")]);
//!
//! let mut grid: Grid<u32> = Grid::new();
//! for (column, value) in [3, 1, 2].into_iter().enumerate() {
//!     grid.put(0, column, value).unwrap();
//!     grid.put(1, column, value * 10).unwrap();
//! }
//! let row = grid.row(0).unwrap();
//! sort_by_row(&mut grid, row, natural_order).unwrap();
//! assert_eq!(grid.get(0, 0), Some(&1));
//! assert_eq!(grid.get(1, 0), Some(&10));
//! ```

#![forbid(unsafe_code)]

mod arena;
pub mod config;
pub mod dense;
#[cfg(feature = "serde")]
mod encoding;
mod error;
pub mod grid;
pub mod range;

pub use config::{Config, GridConfig};
pub use dense::DenseMap;
pub use error::{Error, Result};
pub use grid::ops::{copy_rect, natural_order, sort_by_column, sort_by_row};
pub use grid::{CellHandle, ColumnHandle, Grid, RowHandle};
pub use range::{CompactMap, CompactStore, DirectMap, DirectStore, Entry, RangeMap, Store};

#[cfg(test)]
mod proptests;
