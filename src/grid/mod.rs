//! Mutable two-dimensional grid composed from the integer-keyed containers.
//!
//! Layout:
//!
//! - a row registry (`DirectMap`) from row index to a row record;
//! - per row, a column-keyed `CompactMap` from column index to a cell record;
//! - a column registry (`DenseMap`) from column index to the record backing a
//!   [`ColumnHandle`], created only when a caller asks for one.
//!
//! Row, column, and cell records live in generational arenas. Handles are
//! arena keys, so a handle follows its row/column/cell through inserts,
//! deletes, and swaps, and stops resolving once the record is evicted.
//!
//! Every structural operation rewrites the indices recorded in the affected
//! records so that, for each live cell, `(row, column)` equals its key in
//! the row registry and in its row's cell map.

pub mod ops;

use std::fmt;
use std::ops::Range;

use crate::arena::{Arena, Key};
use crate::config::GridConfig;
use crate::dense::DenseMap;
use crate::error::{Error, Result};
use crate::range::{CompactMap, DirectMap};

/// Live reference to a materialized row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowHandle(Key);

/// Live reference to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnHandle(Key);

/// Live reference to a materialized cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellHandle(Key);

struct RowRecord {
    index: usize,
    cells: CompactMap<Key>,
}

struct ColumnRecord {
    index: usize,
}

struct CellRecord<T> {
    row: usize,
    column: usize,
    /// `None` is a blank cell.
    value: Option<T>,
}

/// A mutable grid of optional values with a `row_count × column_count`
/// bounding box.
pub struct Grid<T> {
    rows: DirectMap<Key>,
    row_records: Arena<RowRecord>,
    columns: DenseMap<Key>,
    column_records: Arena<ColumnRecord>,
    cells: Arena<CellRecord<T>>,
    row_count: usize,
    column_count: usize,
    revision: u64,
    config: GridConfig,
}

fn evicted(what: &str) -> Error {
    Error::illegal_state(format!("{what} handle refers to an evicted {what}"))
}

impl<T> Grid<T> {
    pub fn new() -> Self {
        Self::with_config(GridConfig::default())
    }

    /// An empty grid whose bounding box is already `rows × columns`.
    pub fn with_size(rows: usize, columns: usize) -> Self {
        Self::sized(GridConfig::default(), rows, columns)
    }

    pub fn with_config(config: GridConfig) -> Self {
        Self::sized(config, 0, 0)
    }

    pub(crate) fn sized(config: GridConfig, rows: usize, columns: usize) -> Self {
        Self {
            rows: DirectMap::with_config(config.rows()),
            row_records: Arena::new(),
            columns: DenseMap::with_config(config.columns()),
            column_records: Arena::new(),
            cells: Arena::new(),
            row_count: rows,
            column_count: columns,
            revision: 0,
            config,
        }
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Bounding box as `(rows, columns)`.
    #[inline]
    pub fn size(&self) -> (usize, usize) {
        (self.row_count, self.column_count)
    }

    /// Number of non-blank cells.
    pub fn occupied(&self) -> usize {
        self.cells.values().filter(|c| c.value.is_some()).count()
    }

    /// Structural modification counter.
    #[inline]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    // =========================================================================
    // Internal lookups
    // =========================================================================

    fn cell_key(&self, row: usize, column: usize) -> Option<Key> {
        let row_key = self.rows.get(row)?;
        self.row_records.get(row_key)?.cells.get(column)
    }

    fn check_position(&self, row: usize, column: usize) -> Result<()> {
        if row >= self.row_count || column >= self.column_count {
            return Err(Error::index_out_of_range(format!(
                "cell ({row}, {column}) is outside the {}x{} grid",
                self.row_count, self.column_count
            )));
        }
        Ok(())
    }

    fn check_row(&self, index: usize) -> Result<()> {
        if index >= self.row_count {
            return Err(Error::index_out_of_range(format!(
                "row {index} is outside the grid's {} rows",
                self.row_count
            )));
        }
        Ok(())
    }

    fn check_column(&self, index: usize) -> Result<()> {
        if index >= self.column_count {
            return Err(Error::index_out_of_range(format!(
                "column {index} is outside the grid's {} columns",
                self.column_count
            )));
        }
        Ok(())
    }

    fn ensure_row(&mut self, row: usize) -> Result<Key> {
        if let Some(key) = self.rows.get(row) {
            return Ok(key);
        }
        let key = self.row_records.insert(RowRecord {
            index: row,
            cells: CompactMap::with_config(self.config.columns()),
        });
        if let Err(e) = self.rows.put(row, key) {
            self.row_records.remove(key);
            return Err(e);
        }
        Ok(key)
    }

    fn ensure_cell(&mut self, row: usize, column: usize) -> Result<Key> {
        let created = !self.rows.contains_key(row);
        let row_key = self.ensure_row(row)?;
        let record = self
            .row_records
            .get_mut(row_key)
            .ok_or_else(|| evicted("row"))?;
        if let Some(key) = record.cells.get(column) {
            return Ok(key);
        }
        let key = self.cells.insert(CellRecord {
            row,
            column,
            value: None,
        });
        if let Err(e) = record.cells.put(column, key) {
            self.cells.remove(key);
            if created {
                self.rows.remove(row);
                self.row_records.remove(row_key);
            }
            return Err(e);
        }
        self.revision += 1;
        Ok(key)
    }

    fn cell_record(&self, cell: CellHandle) -> Result<&CellRecord<T>> {
        self.cells.get(cell.0).ok_or_else(|| evicted("cell"))
    }

    fn cell_record_mut(&mut self, cell: CellHandle) -> Result<&mut CellRecord<T>> {
        self.cells.get_mut(cell.0).ok_or_else(|| evicted("cell"))
    }

    // =========================================================================
    // Cell access
    // =========================================================================

    /// Value at `(row, column)`; `None` for blank, unmaterialized, or
    /// out-of-box positions.
    pub fn get(&self, row: usize, column: usize) -> Option<&T> {
        let key = self.cell_key(row, column)?;
        self.cells.get(key)?.value.as_ref()
    }

    pub fn get_mut(&mut self, row: usize, column: usize) -> Option<&mut T> {
        let key = self.cell_key(row, column)?;
        self.cells.get_mut(key)?.value.as_mut()
    }

    /// True if `(row, column)` holds a non-blank value.
    pub fn contains(&self, row: usize, column: usize) -> bool {
        self.get(row, column).is_some()
    }

    /// Stores `value` at `(row, column)`, growing the bounding box to cover
    /// it. Returns the previous value.
    pub fn put(&mut self, row: usize, column: usize, value: T) -> Result<Option<T>> {
        let key = self.ensure_cell(row, column)?;
        self.row_count = self.row_count.max(row + 1);
        self.column_count = self.column_count.max(column + 1);
        let cell = self.cells.get_mut(key).ok_or_else(|| evicted("cell"))?;
        Ok(cell.value.replace(value))
    }

    /// Blanks `(row, column)`. A live handle to the cell stays valid.
    pub fn take(&mut self, row: usize, column: usize) -> Option<T> {
        let key = self.cell_key(row, column)?;
        self.cells.get_mut(key)?.value.take()
    }

    /// Evicts the cell at `(row, column)`, invalidating its handles.
    pub fn remove_cell(&mut self, row: usize, column: usize) -> Option<T> {
        let row_key = self.rows.get(row)?;
        let key = self.row_records.get_mut(row_key)?.cells.remove(column)?;
        self.revision += 1;
        self.cells.remove(key)?.value
    }

    /// Handle to the cell at `(row, column)`, materializing a blank cell if
    /// needed. The position must lie inside the bounding box.
    pub fn cell(&mut self, row: usize, column: usize) -> Result<CellHandle> {
        self.check_position(row, column)?;
        self.ensure_cell(row, column).map(CellHandle)
    }

    /// Handle to an already materialized cell.
    pub fn find_cell(&self, row: usize, column: usize) -> Option<CellHandle> {
        self.cell_key(row, column).map(CellHandle)
    }

    pub fn cell_value(&self, cell: CellHandle) -> Result<Option<&T>> {
        Ok(self.cell_record(cell)?.value.as_ref())
    }

    pub fn set_cell_value(&mut self, cell: CellHandle, value: T) -> Result<Option<T>> {
        Ok(self.cell_record_mut(cell)?.value.replace(value))
    }

    pub fn take_cell_value(&mut self, cell: CellHandle) -> Result<Option<T>> {
        Ok(self.cell_record_mut(cell)?.value.take())
    }

    /// Current `(row, column)` of the cell.
    pub fn cell_position(&self, cell: CellHandle) -> Result<(usize, usize)> {
        let record = self.cell_record(cell)?;
        Ok((record.row, record.column))
    }

    pub fn is_blank(&self, cell: CellHandle) -> Result<bool> {
        Ok(self.cell_record(cell)?.value.is_none())
    }

    // =========================================================================
    // Row and column handles
    // =========================================================================

    /// Handle to row `index`, materializing it if needed.
    pub fn row(&mut self, index: usize) -> Result<RowHandle> {
        self.check_row(index)?;
        self.ensure_row(index).map(RowHandle)
    }

    pub fn find_row(&self, index: usize) -> Option<RowHandle> {
        self.rows.get(index).map(RowHandle)
    }

    pub fn row_index(&self, row: RowHandle) -> Result<usize> {
        self.row_records
            .get(row.0)
            .map(|r| r.index)
            .ok_or_else(|| evicted("row"))
    }

    /// Non-blank `(column, value)` pairs of the row in column order.
    pub fn row_values(&self, row: RowHandle) -> Result<Vec<(usize, &T)>> {
        let record = self.row_records.get(row.0).ok_or_else(|| evicted("row"))?;
        let cells = &self.cells;
        let mut out = Vec::new();
        record.cells.for_each(|column, key| {
            if let Some(value) = cells.get(*key).and_then(|c| c.value.as_ref()) {
                out.push((column, value));
            }
        });
        Ok(out)
    }

    /// Materialized rows in index order.
    pub fn rows(&self) -> impl Iterator<Item = (usize, RowHandle)> {
        self.rows
            .to_vec()
            .into_iter()
            .map(|(index, key)| (index, RowHandle(key)))
    }

    /// Handle to column `index`.
    pub fn column(&mut self, index: usize) -> Result<ColumnHandle> {
        self.check_column(index)?;
        if let Some(key) = self.columns.get(index) {
            return Ok(ColumnHandle(*key));
        }
        let key = self.column_records.insert(ColumnRecord { index });
        if let Err(e) = self.columns.put(index, key) {
            self.column_records.remove(key);
            return Err(e);
        }
        Ok(ColumnHandle(key))
    }

    pub fn column_index(&self, column: ColumnHandle) -> Result<usize> {
        self.column_records
            .get(column.0)
            .map(|c| c.index)
            .ok_or_else(|| evicted("column"))
    }

    /// Column handles issued so far, in index order.
    pub fn columns(&self) -> impl Iterator<Item = (usize, ColumnHandle)> + '_ {
        self.columns
            .iter()
            .map(|(index, key)| (index, ColumnHandle(*key)))
    }

    /// Non-blank `(row, value)` pairs of the column in row order.
    pub fn column_values(&self, column: ColumnHandle) -> Result<Vec<(usize, &T)>> {
        let index = self.column_index(column)?;
        let (records, cells) = (&self.row_records, &self.cells);
        let mut out = Vec::new();
        self.rows.for_each(|row, key| {
            let value = records
                .get(*key)
                .and_then(|r| r.cells.get(index))
                .and_then(|cell| cells.get(cell))
                .and_then(|c| c.value.as_ref());
            if let Some(value) = value {
                out.push((row, value));
            }
        });
        Ok(out)
    }

    /// Non-blank `(row, column, value)` triples in row-major order.
    pub fn cells(&self) -> Vec<(usize, usize, &T)> {
        let (records, cells) = (&self.row_records, &self.cells);
        let mut out = Vec::new();
        self.rows.for_each(|row, key| {
            let Some(record) = records.get(*key) else {
                return;
            };
            record.cells.for_each(|column, cell| {
                if let Some(value) = cells.get(*cell).and_then(|c| c.value.as_ref()) {
                    out.push((row, column, value));
                }
            });
        });
        out
    }

    // =========================================================================
    // Index bookkeeping
    // =========================================================================

    /// Rewrites the recorded index of a row and of every cell it owns.
    fn reindex_row(&mut self, key: Key, index: usize) {
        let Some(record) = self.row_records.get_mut(key) else {
            return;
        };
        record.index = index;
        let cells = &mut self.cells;
        record.cells.for_each(|_, cell| {
            if let Some(c) = cells.get_mut(*cell) {
                c.row = index;
            }
        });
    }

    fn reindex_rows_from(&mut self, from: usize) -> Result<()> {
        for (index, key) in self.rows.view(from, usize::MAX)?.to_vec() {
            self.reindex_row(key, index);
        }
        Ok(())
    }

    /// Rewrites the recorded column of every cell in a row at or after `from`.
    fn reindex_cells_from(&mut self, row_key: Key, from: usize) -> Result<()> {
        let Some(record) = self.row_records.get(row_key) else {
            return Ok(());
        };
        let cells = &mut self.cells;
        record
            .cells
            .view(from, usize::MAX)?
            .for_each(|column, cell| {
                if let Some(c) = cells.get_mut(*cell) {
                    c.column = column;
                }
            });
        Ok(())
    }

    fn reindex_columns_from(&mut self, from: usize) {
        for (index, key) in self.columns.iter() {
            if index < from {
                continue;
            }
            if let Some(record) = self.column_records.get_mut(*key) {
                record.index = index;
            }
        }
    }

    fn row_keys(&self) -> Vec<Key> {
        self.rows.to_vec().into_iter().map(|(_, key)| key).collect()
    }

    // =========================================================================
    // Structural operations
    // =========================================================================

    /// Inserts a blank row at `index`, moving rows at or after it down by one.
    ///
    /// Inserting past the bounding box grows it to `index + 1` rows.
    pub fn insert_row_before(&mut self, index: usize) -> Result<()> {
        let count = self
            .row_count
            .max(index)
            .checked_add(1)
            .ok_or_else(|| Error::invalid_argument(format!("row {index} overflows the grid")))?;
        self.rows.shift_keys_up(index)?;
        self.reindex_rows_from(index + 1)?;
        self.row_count = count;
        self.revision += 1;
        tracing::debug!(index, rows = count, "inserted row");
        Ok(())
    }

    pub fn insert_row_after(&mut self, index: usize) -> Result<()> {
        let before = index
            .checked_add(1)
            .ok_or_else(|| Error::invalid_argument(format!("row {index} overflows the grid")))?;
        self.insert_row_before(before)
    }

    /// Deletes row `index`, evicting its cells and moving later rows up.
    pub fn delete_row(&mut self, index: usize) -> Result<()> {
        self.check_row(index)?;
        if let Some(key) = self.rows.remove(index) {
            self.evict_row(key);
        }
        self.rows.shift_keys_down(index + 1)?;
        self.reindex_rows_from(index)?;
        self.row_count -= 1;
        self.revision += 1;
        tracing::debug!(index, rows = self.row_count, "deleted row");
        Ok(())
    }

    fn evict_row(&mut self, key: Key) {
        let Some(record) = self.row_records.remove(key) else {
            return;
        };
        let cells = &mut self.cells;
        record.cells.for_each(|_, cell| {
            cells.remove(*cell);
        });
    }

    /// Exchanges rows `a` and `b` together with all of their cells.
    pub fn swap_rows(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_row(a)?;
        self.check_row(b)?;
        if a == b {
            return Ok(());
        }
        self.rows.swap_keys(a, b)?;
        for index in [a, b] {
            if let Some(key) = self.rows.get(index) {
                self.reindex_row(key, index);
            }
        }
        self.revision += 1;
        tracing::trace!(a, b, "swapped rows");
        Ok(())
    }

    /// Inserts a blank column at `index`, moving columns at or after it right.
    ///
    /// Touches every materialized row.
    pub fn insert_column_before(&mut self, index: usize) -> Result<()> {
        let count = self
            .column_count
            .max(index)
            .checked_add(1)
            .ok_or_else(|| {
                Error::invalid_argument(format!("column {index} overflows the grid"))
            })?;
        self.columns.shift_up(index)?;
        for row_key in self.row_keys() {
            if let Some(record) = self.row_records.get_mut(row_key) {
                record.cells.shift_keys_up(index)?;
            }
            self.reindex_cells_from(row_key, index + 1)?;
        }
        self.reindex_columns_from(index + 1);
        self.column_count = count;
        self.revision += 1;
        tracing::debug!(index, columns = count, "inserted column");
        Ok(())
    }

    pub fn insert_column_after(&mut self, index: usize) -> Result<()> {
        let before = index.checked_add(1).ok_or_else(|| {
            Error::invalid_argument(format!("column {index} overflows the grid"))
        })?;
        self.insert_column_before(before)
    }

    /// Deletes column `index` from every row, moving later columns left.
    pub fn delete_column(&mut self, index: usize) -> Result<()> {
        self.check_column(index)?;
        if let Some(key) = self.columns.remove(index) {
            self.column_records.remove(key);
        }
        self.columns.shift_down(index + 1)?;
        for row_key in self.row_keys() {
            let Some(record) = self.row_records.get_mut(row_key) else {
                continue;
            };
            if let Some(cell) = record.cells.remove(index) {
                self.cells.remove(cell);
            }
            record.cells.shift_keys_down(index + 1)?;
            self.reindex_cells_from(row_key, index)?;
        }
        self.reindex_columns_from(index);
        self.column_count -= 1;
        self.revision += 1;
        tracing::debug!(index, columns = self.column_count, "deleted column");
        Ok(())
    }

    /// Exchanges columns `a` and `b` in every row.
    pub fn swap_columns(&mut self, a: usize, b: usize) -> Result<()> {
        self.check_column(a)?;
        self.check_column(b)?;
        if a == b {
            return Ok(());
        }
        self.columns.swap(a, b)?;
        for row_key in self.row_keys() {
            let Some(record) = self.row_records.get_mut(row_key) else {
                continue;
            };
            record.cells.swap_keys(a, b)?;
            for index in [a, b] {
                if let Some(c) = record.cells.get(index).and_then(|k| self.cells.get_mut(k)) {
                    c.column = index;
                }
            }
        }
        for index in [a, b] {
            if let Some(record) = self
                .columns
                .get(index)
                .and_then(|k| self.column_records.get_mut(*k))
            {
                record.index = index;
            }
        }
        self.revision += 1;
        tracing::trace!(a, b, "swapped columns");
        Ok(())
    }

    /// Evicts every row, column, and cell and resets the bounding box.
    pub fn clear(&mut self) {
        tracing::debug!(cells = self.cells.len(), "clearing grid");
        self.rows.clear();
        self.row_records.clear();
        self.columns.clear();
        self.column_records.clear();
        self.cells.clear();
        self.row_count = 0;
        self.column_count = 0;
        self.revision += 1;
    }

    // =========================================================================
    // Bulk fill and transform
    // =========================================================================

    /// Offers every position in the bounding box to `f`; `Some` writes the
    /// value, `None` blanks the cell. Returns the number of values written.
    pub fn fill<F>(&mut self, mut f: F) -> Result<usize>
    where
        F: FnMut(usize, usize) -> Option<T>,
    {
        let mut written = 0;
        for row in 0..self.row_count {
            for column in 0..self.column_count {
                match f(row, column) {
                    Some(value) => {
                        self.put(row, column, value)?;
                        written += 1;
                    }
                    None => {
                        self.take(row, column);
                    }
                }
            }
        }
        Ok(written)
    }

    /// Offers every blank or unmaterialized position to `f`; `Some` writes
    /// the value. Returns the number of values written.
    pub fn fill_blanks<F>(&mut self, mut f: F) -> Result<usize>
    where
        F: FnMut(usize, usize) -> Option<T>,
    {
        let mut written = 0;
        for row in 0..self.row_count {
            for column in 0..self.column_count {
                if self.contains(row, column) {
                    continue;
                }
                if let Some(value) = f(row, column) {
                    self.put(row, column, value)?;
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    /// Copy of the whole grid.
    pub fn map(&self) -> Result<Grid<T>>
    where
        T: Clone,
    {
        self.map_with(|_, _, v| Some(v.clone()))
    }

    /// New grid holding `f(row, column, value)` for every non-blank cell;
    /// `None` results stay blank.
    pub fn map_with<U, F>(&self, f: F) -> Result<Grid<U>>
    where
        F: FnMut(usize, usize, &T) -> Option<U>,
    {
        self.map_range_with(0..self.row_count, 0..self.column_count, f)
    }

    /// Copy of the `rows × columns` rectangle, re-based to `(0, 0)`.
    pub fn map_range(&self, rows: Range<usize>, columns: Range<usize>) -> Result<Grid<T>>
    where
        T: Clone,
    {
        self.map_range_with(rows, columns, |_, _, v| Some(v.clone()))
    }

    /// Transformed copy of the `rows × columns` rectangle, re-based to
    /// `(0, 0)`. `f` receives source coordinates.
    pub fn map_range_with<U, F>(
        &self,
        rows: Range<usize>,
        columns: Range<usize>,
        f: F,
    ) -> Result<Grid<U>>
    where
        F: FnMut(usize, usize, &T) -> Option<U>,
    {
        ops::check_rect(self, &rows, &columns)?;
        let mut out = Grid::sized(self.config, rows.len(), columns.len());
        ops::copy_rect(self, rows, columns, &mut out, (0, 0), f)?;
        Ok(out)
    }
}

impl<T> Default for Grid<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> PartialEq for Grid<T> {
    /// Same bounding box and the same non-blank cells.
    fn eq(&self, other: &Self) -> bool {
        self.size() == other.size() && self.cells() == other.cells()
    }
}

impl<T: fmt::Debug> fmt::Debug for Grid<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grid")
            .field("rows", &self.row_count)
            .field("columns", &self.column_count)
            .field("cells", &self.cells())
            .finish()
    }
}
