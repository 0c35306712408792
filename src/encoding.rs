//! Serde support for the containers and the grid (feature `serde`).
//!
//! Maps encode as a flat sequence of `(key, value)` pairs in key order; a
//! view encodes only the keys it can see and always decodes into an
//! unrestricted map. A grid encodes its extent plus its non-blank cells.
//! Decoding rejects duplicate keys and cells outside the declared extent.

use serde::de::{self, Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

use crate::dense::DenseMap;
use crate::grid::Grid;
use crate::range::{RangeMap, Store};

impl<T: Serialize> Serialize for DenseMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for DenseMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries: Vec<(usize, T)> = Vec::deserialize(deserializer)?;
        let mut map = DenseMap::new();
        for (key, value) in entries {
            if map.put(key, value).map_err(de::Error::custom)?.is_some() {
                return Err(de::Error::custom(format!("duplicate key {key}")));
            }
        }
        Ok(map)
    }
}

impl<T: Serialize, St: Store<T>> Serialize for RangeMap<T, St> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;

        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        let mut result = Ok(());
        self.for_each(|key, value| {
            if result.is_ok() {
                result = seq.serialize_element(&(key, value));
            }
        });
        result?;
        seq.end()
    }
}

impl<'de, T: Deserialize<'de>, St: Store<T>> Deserialize<'de> for RangeMap<T, St> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries: Vec<(usize, T)> = Vec::deserialize(deserializer)?;
        let mut map = RangeMap::with_capacity(entries.len());
        for (key, value) in entries {
            if map.put(key, value).map_err(de::Error::custom)?.is_some() {
                return Err(de::Error::custom(format!("duplicate key {key}")));
            }
        }
        Ok(map)
    }
}

#[derive(serde::Serialize)]
struct GridRef<'a, T> {
    rows: usize,
    columns: usize,
    cells: Vec<(usize, usize, &'a T)>,
}

#[derive(serde::Deserialize)]
struct GridData<T> {
    rows: usize,
    columns: usize,
    cells: Vec<(usize, usize, T)>,
}

impl<T: Serialize> Serialize for Grid<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        GridRef {
            rows: self.row_count(),
            columns: self.column_count(),
            cells: self.cells(),
        }
        .serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Grid<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = GridData::<T>::deserialize(deserializer)?;
        let mut grid = Grid::with_size(data.rows, data.columns);
        for (row, column, value) in data.cells {
            if row >= data.rows || column >= data.columns {
                return Err(de::Error::custom(format!(
                    "cell ({row}, {column}) lies outside the {}x{} grid",
                    data.rows, data.columns
                )));
            }
            if grid.put(row, column, value).map_err(de::Error::custom)?.is_some() {
                return Err(de::Error::custom(format!("duplicate cell ({row}, {column})")));
            }
        }
        Ok(grid)
    }
}
