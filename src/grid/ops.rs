//! Rectangle copy and line sorting over a [`Grid`].

use std::cmp::Ordering;
use std::ops::Range;

use super::{ColumnHandle, Grid, RowHandle};
use crate::error::{Error, Result};

/// Orders values by `Ord`, blanks last.
pub fn natural_order<T: Ord>(a: Option<&T>, b: Option<&T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub(crate) fn check_rect<T>(
    grid: &Grid<T>,
    rows: &Range<usize>,
    columns: &Range<usize>,
) -> Result<()> {
    if rows.start > rows.end || columns.start > columns.end {
        return Err(Error::invalid_argument(format!(
            "reversed rectangle {rows:?} x {columns:?}"
        )));
    }
    if rows.end > grid.row_count || columns.end > grid.column_count {
        return Err(Error::index_out_of_range(format!(
            "rectangle {rows:?} x {columns:?} exceeds the {}x{} grid",
            grid.row_count, grid.column_count
        )));
    }
    Ok(())
}

fn translate(index: usize, start: usize, origin: usize) -> Result<usize> {
    (index - start)
        .checked_add(origin)
        .ok_or_else(|| Error::invalid_argument(format!("target offset {origin} overflows")))
}

/// Writes `f(row, column, value)` for every non-blank cell of the
/// `rows × columns` rectangle of `source` into `target`, with the rectangle's
/// origin placed at `at`. `None` results are skipped. Returns the number of
/// cells written.
pub fn copy_rect<T, U, F>(
    source: &Grid<T>,
    rows: Range<usize>,
    columns: Range<usize>,
    target: &mut Grid<U>,
    at: (usize, usize),
    mut f: F,
) -> Result<usize>
where
    F: FnMut(usize, usize, &T) -> Option<U>,
{
    check_rect(source, &rows, &columns)?;
    let mut written = 0;
    for (row, key) in source.rows.view(rows.start, rows.end)?.to_vec() {
        let Some(record) = source.row_records.get(key) else {
            continue;
        };
        for (column, cell) in record.cells.view(columns.start, columns.end)?.to_vec() {
            let Some(value) = source.cells.get(cell).and_then(|c| c.value.as_ref()) else {
                continue;
            };
            if let Some(out) = f(row, column, value) {
                let r = translate(row, rows.start, at.0)?;
                let c = translate(column, columns.start, at.1)?;
                target.put(r, c, out)?;
                written += 1;
            }
        }
    }
    Ok(written)
}

// =============================================================================
// Sorting
// =============================================================================

/// The fixed line whose values drive a sort.
#[derive(Debug, Clone, Copy)]
enum Line {
    /// Sorting along a row permutes columns.
    Row(usize),
    /// Sorting along a column permutes rows.
    Column(usize),
}

impl Line {
    #[inline]
    fn value<T>(self, grid: &Grid<T>, position: isize) -> Option<&T> {
        let position = usize::try_from(position).ok()?;
        match self {
            Line::Row(row) => grid.get(row, position),
            Line::Column(column) => grid.get(position, column),
        }
    }

    #[inline]
    fn swap<T>(self, grid: &mut Grid<T>, a: isize, b: isize) -> Result<()> {
        let (a, b) = match (usize::try_from(a), usize::try_from(b)) {
            (Ok(a), Ok(b)) => (a, b),
            _ => {
                return Err(Error::index_out_of_range(format!(
                    "line positions {a} and {b} must not be negative"
                )))
            }
        };
        match self {
            Line::Row(_) => grid.swap_columns(a, b),
            Line::Column(_) => grid.swap_rows(a, b),
        }
    }

    fn len<T>(self, grid: &Grid<T>) -> usize {
        match self {
            Line::Row(_) => grid.column_count,
            Line::Column(_) => grid.row_count,
        }
    }
}

/// Sorts `row` under `cmp` by permuting whole columns, so every other row
/// keeps its values paired with the same column.
pub fn sort_by_row<T, F>(grid: &mut Grid<T>, row: RowHandle, cmp: F) -> Result<()>
where
    T: Clone,
    F: FnMut(Option<&T>, Option<&T>) -> Ordering,
{
    let index = grid.row_index(row)?;
    sort_line(grid, Line::Row(index), cmp)
}

/// Sorts `column` under `cmp` by permuting whole rows.
pub fn sort_by_column<T, F>(grid: &mut Grid<T>, column: ColumnHandle, cmp: F) -> Result<()>
where
    T: Clone,
    F: FnMut(Option<&T>, Option<&T>) -> Ordering,
{
    let index = grid.column_index(column)?;
    sort_line(grid, Line::Column(index), cmp)
}

fn sort_line<T, F>(grid: &mut Grid<T>, line: Line, mut cmp: F) -> Result<()>
where
    T: Clone,
    F: FnMut(Option<&T>, Option<&T>) -> Ordering,
{
    let len = line.len(grid);
    tracing::debug!(?line, len, "sorting grid line");
    if len < 2 {
        return Ok(());
    }
    let hi = isize::try_from(len - 1)
        .map_err(|_| Error::invalid_argument(format!("line of {len} positions is too long")))?;
    quicksort(grid, line, 0, hi, &mut cmp)
}

/// Hoare-partition quicksort over positions `[lo, hi]`, swapping through the
/// grid. Recurses into the smaller partition and loops on the larger.
fn quicksort<T, F>(
    grid: &mut Grid<T>,
    line: Line,
    mut lo: isize,
    mut hi: isize,
    cmp: &mut F,
) -> Result<()>
where
    T: Clone,
    F: FnMut(Option<&T>, Option<&T>) -> Ordering,
{
    while lo < hi {
        let pivot = line.value(grid, lo + (hi - lo) / 2).cloned();
        let (mut i, mut j) = (lo, hi);
        while i <= j {
            while i < hi && cmp(line.value(grid, i), pivot.as_ref()) == Ordering::Less {
                i += 1;
            }
            while j > lo && cmp(line.value(grid, j), pivot.as_ref()) == Ordering::Greater {
                j -= 1;
            }
            if i <= j {
                if i != j {
                    line.swap(grid, i, j)?;
                }
                i += 1;
                j -= 1;
            }
        }
        if j - lo < hi - i {
            quicksort(grid, line, lo, j, cmp)?;
            lo = i;
        } else {
            quicksort(grid, line, i, hi, cmp)?;
            hi = j;
        }
    }
    Ok(())
}
