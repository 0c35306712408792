use super::*;

use crate::grid::tests::validate_grid;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use proptest_derive::Arbitrary;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use std::collections::BTreeMap;

// =============================================================================
// Flat maps against BTreeMap
// =============================================================================

#[derive(Clone, Debug, Arbitrary)]
enum MapOp {
    #[proptest(weight = 6)]
    Put(#[proptest(strategy = "0..48usize")] usize, u32),
    #[proptest(weight = 3)]
    Remove(#[proptest(strategy = "0..48usize")] usize),
    #[proptest(weight = 3)]
    Get(#[proptest(strategy = "0..64usize")] usize),
    Swap(
        #[proptest(strategy = "0..48usize")] usize,
        #[proptest(strategy = "0..48usize")] usize,
    ),
    ShiftUp(#[proptest(strategy = "0..48usize")] usize),
    ShiftDown(#[proptest(strategy = "0..48usize")] usize),
}

fn model_swap(m: &mut BTreeMap<usize, u32>, a: usize, b: usize) {
    let va = m.remove(&a);
    let vb = m.remove(&b);
    if let Some(v) = va {
        m.insert(b, v);
    }
    if let Some(v) = vb {
        m.insert(a, v);
    }
}

fn model_shift(m: &mut BTreeMap<usize, u32>, from: usize, up: bool) {
    let moved: Vec<(usize, u32)> = m.range(from..).map(|(k, v)| (*k, *v)).collect();
    for (k, _) in &moved {
        m.remove(k);
    }
    for (k, v) in moved {
        m.insert(if up { k + 1 } else { k - 1 }, v);
    }
}

/// Expected outcome of a shift-down from `from` on the model.
fn model_shift_down(m: &mut BTreeMap<usize, u32>, from: usize) -> std::result::Result<(), Error> {
    if from == 0 {
        return Err(Error::invalid_argument(""));
    }
    if m.contains_key(&(from - 1)) {
        return Err(Error::illegal_state(""));
    }
    model_shift(m, from, false);
    Ok(())
}

fn same_kind(a: &Error, b: &Error) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn map_ops() -> impl Strategy<Value = Vec<MapOp>> {
    prop::collection::vec(any::<MapOp>(), 0..=400)
}

fn check_range_ops<S: Store<u32>>(ops: &[MapOp]) -> std::result::Result<(), TestCaseError> {
    let mut r: RangeMap<u32, S> = RangeMap::with_capacity(2);
    let mut m: BTreeMap<usize, u32> = BTreeMap::new();

    for op in ops {
        match *op {
            MapOp::Put(k, v) => {
                prop_assert_eq!(r.put(k, v).unwrap(), m.insert(k, v));
            }
            MapOp::Remove(k) => {
                prop_assert_eq!(r.remove(k), m.remove(&k));
            }
            MapOp::Get(k) => {
                prop_assert_eq!(r.get(k), m.get(&k).copied());
                prop_assert_eq!(r.contains_key(k), m.contains_key(&k));
            }
            MapOp::Swap(a, b) => {
                r.swap_keys(a, b).unwrap();
                model_swap(&mut m, a, b);
            }
            MapOp::ShiftUp(from) => {
                r.shift_keys_up(from).unwrap();
                model_shift(&mut m, from, true);
            }
            MapOp::ShiftDown(from) => {
                let got = r.shift_keys_down(from);
                let want = model_shift_down(&mut m, from);
                match (got, want) {
                    (Ok(()), Ok(())) => {}
                    (Err(g), Err(w)) => prop_assert!(same_kind(&g, &w), "{g:?} vs {w:?}"),
                    (g, w) => prop_assert!(false, "shift_down({from}): {g:?} vs {w:?}"),
                }
            }
        }
        prop_assert_eq!(r.len(), m.len());
    }

    let expected: Vec<(usize, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
    prop_assert_eq!(r.to_vec(), expected.clone());
    let iterated: Vec<(usize, u32)> = r.iter().collect::<Result<_>>().unwrap();
    prop_assert_eq!(iterated, expected);
    Ok(())
}

#[derive(Clone, Debug, Arbitrary)]
enum ViewOp {
    Put(#[proptest(strategy = "0..40usize")] usize, u32, bool),
    Remove(#[proptest(strategy = "0..40usize")] usize, bool),
    Get(#[proptest(strategy = "0..40usize")] usize, bool),
    Clear,
}

fn check_view_ops<S: Store<u32>>(
    lo: usize,
    hi: usize,
    ops: &[ViewOp],
) -> std::result::Result<(), TestCaseError> {
    let mut base: RangeMap<u32, S> = RangeMap::new();
    let mut view = base.view(lo, hi).unwrap();
    let mut m: BTreeMap<usize, u32> = BTreeMap::new();
    let inside = |k: usize| (lo..hi).contains(&k);

    for op in ops {
        match *op {
            ViewOp::Put(k, v, through_view) => {
                if !through_view {
                    prop_assert_eq!(base.put(k, v).unwrap(), m.insert(k, v));
                } else if inside(k) {
                    prop_assert_eq!(view.put(k, v).unwrap(), m.insert(k, v));
                } else {
                    prop_assert!(matches!(view.put(k, v), Err(Error::InvalidArgument(_))));
                }
            }
            ViewOp::Remove(k, through_view) => {
                if !through_view {
                    prop_assert_eq!(base.remove(k), m.remove(&k));
                } else if inside(k) {
                    prop_assert_eq!(view.remove(k), m.remove(&k));
                } else {
                    prop_assert_eq!(view.remove(k), None);
                }
            }
            ViewOp::Get(k, through_view) => {
                let want = if through_view && !inside(k) {
                    None
                } else {
                    m.get(&k).copied()
                };
                let got = if through_view { view.get(k) } else { base.get(k) };
                prop_assert_eq!(got, want);
            }
            ViewOp::Clear => {
                view.clear();
                m.retain(|k, _| !inside(*k));
            }
        }
        prop_assert_eq!(base.len(), m.len());
        prop_assert_eq!(view.len(), m.range(lo..hi).count());
    }

    let visible: Vec<usize> = m.range(lo..hi).map(|(k, _)| *k).collect();
    prop_assert_eq!(view.keys().collect::<Result<Vec<_>>>().unwrap(), visible.clone());
    prop_assert_eq!(view.first_key().ok(), visible.first().copied());
    prop_assert_eq!(view.last_key().ok(), visible.last().copied());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_dense_equivalence(ops in map_ops()) {
        let mut d: DenseMap<u32> = DenseMap::with_capacity(1);
        let mut m: BTreeMap<usize, u32> = BTreeMap::new();

        for op in ops {
            match op {
                MapOp::Put(k, v) => {
                    prop_assert_eq!(d.put(k, v).unwrap(), m.insert(k, v));
                }
                MapOp::Remove(k) => {
                    prop_assert_eq!(d.remove(k), m.remove(&k));
                }
                MapOp::Get(k) => {
                    prop_assert_eq!(d.get(k).copied(), m.get(&k).copied());
                }
                MapOp::Swap(a, b) => {
                    d.swap(a, b).unwrap();
                    model_swap(&mut m, a, b);
                }
                MapOp::ShiftUp(from) => {
                    d.shift_up(from).unwrap();
                    model_shift(&mut m, from, true);
                }
                MapOp::ShiftDown(from) => {
                    let got = d.shift_down(from);
                    let want = model_shift_down(&mut m, from);
                    match (got, want) {
                        (Ok(()), Ok(())) => {}
                        (Err(g), Err(w)) => prop_assert!(same_kind(&g, &w), "{g:?} vs {w:?}"),
                        (g, w) => prop_assert!(false, "shift_down({from}): {g:?} vs {w:?}"),
                    }
                }
            }
            prop_assert_eq!(d.len(), m.len());
        }

        let got: Vec<(usize, u32)> = d.iter().map(|(k, v)| (k, *v)).collect();
        let expected: Vec<(usize, u32)> = m.iter().map(|(k, v)| (*k, *v)).collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn prop_compact_equivalence(ops in map_ops()) {
        check_range_ops::<CompactStore<u32>>(&ops)?;
    }

    #[test]
    fn prop_direct_equivalence(ops in map_ops()) {
        check_range_ops::<DirectStore<u32>>(&ops)?;
    }

    #[test]
    fn prop_view_equivalence(
        (lo, hi) in (0..40usize, 0..40usize).prop_map(|(a, b)| (a.min(b), a.max(b))),
        ops in prop::collection::vec(any::<ViewOp>(), 0..=200),
    ) {
        check_view_ops::<CompactStore<u32>>(lo, hi, &ops)?;
        check_view_ops::<DirectStore<u32>>(lo, hi, &ops)?;
    }

    #[test]
    fn prop_cursor_removal(
        keys in prop::collection::btree_set(0..128usize, 0..64),
        mask in prop::collection::vec(any::<bool>(), 64),
    ) {
        let mut d: DenseMap<usize> = DenseMap::new();
        for &k in &keys {
            d.put(k, k * 2).unwrap();
        }

        let mut cursor = d.cursor();
        let mut kept = Vec::new();
        let mut i = 0;
        loop {
            let Some(step) = cursor.advance(&d) else {
                break;
            };
            let (key, value) = step.unwrap();
            prop_assert_eq!(*value, key * 2);
            if mask[i % mask.len()] {
                prop_assert_eq!(cursor.remove(&mut d).unwrap(), key * 2);
            } else {
                kept.push(key);
            }
            i += 1;
        }
        prop_assert_eq!(i, keys.len());
        prop_assert_eq!(d.keys().collect::<Vec<_>>(), kept);
    }
}

// =============================================================================
// Grid against a row-major model
// =============================================================================

#[derive(Clone, Debug, Arbitrary)]
enum GridOp {
    #[proptest(weight = 8)]
    Put(
        #[proptest(strategy = "0..8usize")] usize,
        #[proptest(strategy = "0..6usize")] usize,
        #[proptest(strategy = "0..5u8")] u8,
    ),
    #[proptest(weight = 2)]
    Take(
        #[proptest(strategy = "0..9usize")] usize,
        #[proptest(strategy = "0..7usize")] usize,
    ),
    #[proptest(weight = 2)]
    RemoveCell(
        #[proptest(strategy = "0..9usize")] usize,
        #[proptest(strategy = "0..7usize")] usize,
    ),
    InsertRowBefore(#[proptest(strategy = "0..10usize")] usize),
    DeleteRow(#[proptest(strategy = "0..9usize")] usize),
    SwapRows(
        #[proptest(strategy = "0..9usize")] usize,
        #[proptest(strategy = "0..9usize")] usize,
    ),
    InsertColumnBefore(#[proptest(strategy = "0..8usize")] usize),
    DeleteColumn(#[proptest(strategy = "0..7usize")] usize),
    SwapColumns(
        #[proptest(strategy = "0..7usize")] usize,
        #[proptest(strategy = "0..7usize")] usize,
    ),
    SortByRow(#[proptest(strategy = "0..9usize")] usize),
    SortByColumn(#[proptest(strategy = "0..7usize")] usize),
}

/// Row-major reference grid.
#[derive(Clone, Debug, Default)]
struct Model {
    columns: usize,
    cells: Vec<Vec<Option<u8>>>,
}

impl Model {
    fn rows(&self) -> usize {
        self.cells.len()
    }

    fn get(&self, r: usize, c: usize) -> Option<u8> {
        self.cells.get(r).and_then(|row| row.get(c).copied().flatten())
    }

    fn grow(&mut self, rows: usize, columns: usize) {
        self.columns = self.columns.max(columns);
        let width = self.columns;
        if self.cells.len() < rows {
            self.cells.resize_with(rows, Vec::new);
        }
        for row in &mut self.cells {
            row.resize(width, None);
        }
    }

    fn snapshot(g: &Grid<u8>) -> Self {
        let (rows, columns) = g.size();
        let cells = (0..rows)
            .map(|r| (0..columns).map(|c| g.get(r, c).copied()).collect())
            .collect();
        Self { columns, cells }
    }

    fn column_set(&self) -> Vec<Vec<Option<u8>>> {
        let mut columns: Vec<Vec<Option<u8>>> = (0..self.columns)
            .map(|c| self.cells.iter().map(|row| row[c]).collect())
            .collect();
        columns.sort();
        columns
    }

    fn row_set(&self) -> Vec<Vec<Option<u8>>> {
        let mut rows = self.cells.clone();
        rows.sort();
        rows
    }
}

fn assert_matches_model(g: &Grid<u8>, m: &Model) -> std::result::Result<(), TestCaseError> {
    validate_grid(g);
    prop_assert_eq!(g.size(), (m.rows(), m.columns));
    for r in 0..m.rows() {
        for c in 0..m.columns {
            prop_assert_eq!(g.get(r, c).copied(), m.get(r, c), "cell ({}, {})", r, c);
        }
    }
    let occupied = m.cells.iter().flatten().filter(|v| v.is_some()).count();
    prop_assert_eq!(g.occupied(), occupied);
    Ok(())
}

fn is_sorted(values: &[Option<u8>]) -> bool {
    values
        .windows(2)
        .all(|w| natural_order(w[0].as_ref(), w[1].as_ref()) != Ordering::Greater)
}

fn apply_grid_op(g: &mut Grid<u8>, m: &mut Model, op: &GridOp) -> std::result::Result<(), TestCaseError> {
    match *op {
        GridOp::Put(r, c, v) => {
            let old = g.put(r, c, v).unwrap();
            m.grow(r + 1, c + 1);
            prop_assert_eq!(old, m.cells[r][c].replace(v));
        }
        GridOp::Take(r, c) => {
            let old = m.cells.get_mut(r).and_then(|row| row.get_mut(c)).and_then(Option::take);
            prop_assert_eq!(g.take(r, c), old);
        }
        GridOp::RemoveCell(r, c) => {
            let old = m.cells.get_mut(r).and_then(|row| row.get_mut(c)).and_then(Option::take);
            prop_assert_eq!(g.remove_cell(r, c), old);
        }
        GridOp::InsertRowBefore(r) => {
            g.insert_row_before(r).unwrap();
            let rows = m.rows().max(r);
            m.grow(rows, 0);
            m.cells.insert(r, vec![None; m.columns]);
        }
        GridOp::DeleteRow(r) => {
            if r < m.rows() {
                g.delete_row(r).unwrap();
                m.cells.remove(r);
            } else {
                prop_assert!(matches!(g.delete_row(r), Err(Error::IndexOutOfRange(_))));
            }
        }
        GridOp::SwapRows(a, b) => {
            if a < m.rows() && b < m.rows() {
                g.swap_rows(a, b).unwrap();
                m.cells.swap(a, b);
            } else {
                prop_assert!(matches!(g.swap_rows(a, b), Err(Error::IndexOutOfRange(_))));
            }
        }
        GridOp::InsertColumnBefore(c) => {
            g.insert_column_before(c).unwrap();
            let columns = m.columns.max(c);
            m.grow(0, columns);
            for row in &mut m.cells {
                row.insert(c, None);
            }
            m.columns += 1;
        }
        GridOp::DeleteColumn(c) => {
            if c < m.columns {
                g.delete_column(c).unwrap();
                for row in &mut m.cells {
                    row.remove(c);
                }
                m.columns -= 1;
            } else {
                prop_assert!(matches!(g.delete_column(c), Err(Error::IndexOutOfRange(_))));
            }
        }
        GridOp::SwapColumns(a, b) => {
            if a < m.columns && b < m.columns {
                g.swap_columns(a, b).unwrap();
                for row in &mut m.cells {
                    row.swap(a, b);
                }
            } else {
                prop_assert!(matches!(g.swap_columns(a, b), Err(Error::IndexOutOfRange(_))));
            }
        }
        GridOp::SortByRow(r) => {
            if r >= m.rows() {
                prop_assert!(matches!(g.row(r), Err(Error::IndexOutOfRange(_))));
                return Ok(());
            }
            let row = g.row(r).unwrap();
            sort_by_row(g, row, natural_order).unwrap();
            let after = Model::snapshot(g);
            prop_assert!(is_sorted(&after.cells[r]), "row {} not sorted", r);
            prop_assert_eq!(after.column_set(), m.column_set(), "columns must move whole");
            *m = after;
        }
        GridOp::SortByColumn(c) => {
            if c >= m.columns {
                prop_assert!(matches!(g.column(c), Err(Error::IndexOutOfRange(_))));
                return Ok(());
            }
            let column = g.column(c).unwrap();
            sort_by_column(g, column, natural_order).unwrap();
            let after = Model::snapshot(g);
            let line: Vec<Option<u8>> = after.cells.iter().map(|row| row[c]).collect();
            prop_assert!(is_sorted(&line), "column {} not sorted", c);
            prop_assert_eq!(after.row_set(), m.row_set(), "rows must move whole");
            *m = after;
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 50_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_grid_equivalence(ops in prop::collection::vec(any::<GridOp>(), 0..=120)) {
        let mut g: Grid<u8> = Grid::new();
        let mut m = Model::default();
        for op in &ops {
            apply_grid_op(&mut g, &mut m, op)?;
            assert_matches_model(&g, &m)?;
        }

        let copy = g.map().unwrap();
        prop_assert_eq!(&copy, &g);
        validate_grid(&copy);
    }

    #[test]
    fn prop_cell_handles_follow_cells(
        ops in prop::collection::vec(any::<GridOp>(), 0..=60),
        r in 0..6usize,
        c in 0..4usize,
    ) {
        let mut g: Grid<u8> = Grid::with_size(6, 4);
        g.fill(|r, c| Some((r * 4 + c) as u8)).unwrap();
        let handle = g.cell(r, c).unwrap();
        let tag = (r * 4 + c) as u8;
        let mut m = Model::snapshot(&g);

        for op in &ops {
            // Keep the tracked value unique.
            if let GridOp::Put(..) = op {
                continue;
            }
            apply_grid_op(&mut g, &mut m, op)?;
            match g.cell_position(handle) {
                Ok((row, column)) => {
                    prop_assert_eq!(g.find_cell(row, column), Some(handle));
                    let value = g.cell_value(handle).unwrap().copied();
                    prop_assert!(value.is_none() || value == Some(tag));
                }
                Err(e) => {
                    prop_assert!(e.is_illegal_state());
                    break;
                }
            }
        }
    }
}

// =============================================================================
// Seeded and exhaustive checks
// =============================================================================

#[test]
fn random_sort_keeps_columns_paired() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..50 {
        let width = rng.gen_range(1..200);
        let mut g: Grid<u32> = Grid::new();
        for c in 0..width {
            if rng.gen_range(0..10) > 0 {
                g.put(0, c, rng.gen_range(0..50)).unwrap();
            }
            g.put(1, c, c as u32).unwrap();
        }
        let before: Vec<(Option<u32>, u32)> = (0..width)
            .map(|c| (g.get(0, c).copied(), c as u32))
            .collect();

        let row = g.row(0).unwrap();
        sort_by_row(&mut g, row, natural_order).unwrap();
        validate_grid(&g);

        let line: Vec<Option<u32>> = (0..width).map(|c| g.get(0, c).copied()).collect();
        assert!(line
            .windows(2)
            .all(|w| natural_order(w[0].as_ref(), w[1].as_ref()) != Ordering::Greater));
        for c in 0..width {
            let tag = *g.get(1, c).unwrap();
            assert_eq!(before[tag as usize].0, g.get(0, c).copied());
        }
    }
}

#[test]
fn random_iteration_with_removal() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut m: DirectMap<u64> = DirectMap::new();
    let mut model: BTreeMap<usize, u64> = BTreeMap::new();
    for _ in 0..2_000 {
        let k = rng.gen_range(0..1_000);
        let v = rng.gen::<u64>();
        m.put(k, v).unwrap();
        model.insert(k, v);
    }

    let lo = rng.gen_range(0..500);
    let hi = rng.gen_range(lo..1_000);
    let mut it = m.view(lo, hi).unwrap().iter();
    while let Some(item) = it.next() {
        let (k, v) = item.unwrap();
        assert_eq!(model.get(&k), Some(&v));
        if v % 3 == 0 {
            assert_eq!(it.remove().unwrap(), v);
            model.remove(&k);
        }
    }
    let expected: Vec<(usize, u64)> = model.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(m.to_vec(), expected);
}

fn for_each_permutation<T: Clone>(items: &[T], mut f: impl FnMut(Vec<T>)) {
    fn rec<T: Clone>(items: &[T], used: &mut [bool], out: &mut Vec<T>, f: &mut impl FnMut(Vec<T>)) {
        if out.len() == items.len() {
            f(out.clone());
            return;
        }
        for i in 0..items.len() {
            if used[i] {
                continue;
            }
            used[i] = true;
            out.push(items[i].clone());
            rec(items, used, out, f);
            out.pop();
            used[i] = false;
        }
    }

    let mut used = vec![false; items.len()];
    let mut out = Vec::with_capacity(items.len());
    rec(items, &mut used, &mut out, &mut f);
}

#[test]
fn exhaustive_sort_small_lines() {
    let values = [Some(1u8), Some(2), Some(2), Some(3), None, Some(0)];

    for_each_permutation(&values, |perm| {
        let mut g: Grid<u8> = Grid::with_size(perm.len(), 2);
        for (c, v) in perm.iter().enumerate() {
            if let Some(v) = v {
                g.put(c, 0, *v).unwrap();
            }
            g.put(c, 1, c as u8).unwrap();
        }
        let column = g.column(0).unwrap();
        sort_by_column(&mut g, column, natural_order).unwrap();
        validate_grid(&g);

        let sorted: Vec<Option<u8>> = (0..perm.len()).map(|r| g.get(r, 0).copied()).collect();
        assert_eq!(
            sorted,
            vec![Some(0), Some(1), Some(2), Some(2), Some(3), None]
        );
        for r in 0..perm.len() {
            let tag = *g.get(r, 1).unwrap() as usize;
            assert_eq!(perm[tag], g.get(r, 0).copied());
        }
    });
}

#[test]
fn exhaustive_delete_order() {
    let rows = [0usize, 1, 2, 3, 4];

    for_each_permutation(&rows, |perm| {
        let mut g: Grid<usize> = Grid::new();
        let mut handles = Vec::new();
        for &r in &rows {
            g.put(r, 0, r).unwrap();
            g.put(r, 2, r * 10).unwrap();
            handles.push(g.cell(r, 2).unwrap());
        }

        let mut live: Vec<usize> = rows.to_vec();
        for deleted in perm {
            let index = live.iter().position(|&r| r == deleted).unwrap();
            g.delete_row(index).unwrap();
            live.remove(index);
            validate_grid(&g);

            assert!(g.cell_value(handles[deleted]).unwrap_err().is_illegal_state());
            for (i, &r) in live.iter().enumerate() {
                assert_eq!(g.get(i, 0), Some(&r));
                assert_eq!(g.cell_position(handles[r]).unwrap(), (i, 2));
            }
        }
        assert_eq!(g.size(), (0, 3));
    });
}
