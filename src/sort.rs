//! Multi-key stable sorting.

use crate::column::Column;
use crate::error::Result;
use crate::table::Table;
use log::debug;
use std::cmp::Ordering;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A column to sort by, and its direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn new(column: &str, order: SortOrder) -> Self {
        SortKey {
            column: column.to_string(),
            order,
        }
    }

    pub fn asc(column: &str) -> Self {
        SortKey::new(column, SortOrder::Ascending)
    }

    pub fn desc(column: &str) -> Self {
        SortKey::new(column, SortOrder::Descending)
    }
}

impl From<&str> for SortKey {
    fn from(column: &str) -> Self {
        SortKey::asc(column)
    }
}

/// Compare two rows on one column. Missing values go last in either
/// direction.
fn compare_rows(column: &Column, order: SortOrder, a: usize, b: usize) -> Ordering {
    let ascending = column.cmp_rows(a, b);
    if order == SortOrder::Ascending || column.is_null_at(a) || column.is_null_at(b) {
        ascending
    } else {
        ascending.reverse()
    }
}

impl Table {
    /// Sort rows by the keys in order, each breaking ties of the previous.
    /// Rows that tie on every key keep their input order.
    ///
    /// ```
    /// use tidytable::{Column, ColumnValue, SortKey, Table};
    ///
    /// let table = Table::from_columns(vec![Column::infer(
    ///     "price",
    ///     vec![ColumnValue::from(80), ColumnValue::Null, ColumnValue::from(150)],
    /// )
    /// .unwrap()])
    /// .unwrap();
    ///
    /// let sorted = table.arrange(&[SortKey::desc("price")]).unwrap();
    /// assert_eq!(sorted.get_value(0, "price").unwrap(), &ColumnValue::from(150));
    /// assert!(sorted.get_value(2, "price").unwrap().is_null());
    /// ```
    pub fn arrange(&self, keys: &[SortKey]) -> Result<Table> {
        let resolved = keys
            .iter()
            .map(|k| Ok((self.column(&k.column)?, k.order)))
            .collect::<Result<Vec<_>>>()?;

        let mut indices: Vec<usize> = (0..self.len()).collect();
        indices.sort_by(|&a, &b| {
            resolved
                .iter()
                .map(|(column, order)| compare_rows(column, *order, a, b))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        debug!("arrange: {} rows by {} key(s)", self.len(), keys.len());
        Ok(self.take_rows(&indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnValue;
    use crate::error::TableError;

    fn table() -> Table {
        Table::from_columns(vec![
            Column::infer("id", (1..=6i64).map(ColumnValue::from).collect()).unwrap(),
            Column::infer(
                "hotel",
                vec!["b".into(), "a".into(), "b".into(), "a".into(), ColumnValue::Null, "a".into()],
            )
            .unwrap(),
            Column::infer(
                "price",
                vec![
                    2.0.into(),
                    ColumnValue::Null,
                    1.0.into(),
                    2.0.into(),
                    3.0.into(),
                    1.0.into(),
                ],
            )
            .unwrap(),
        ])
        .unwrap()
    }

    fn ids(t: &Table) -> Vec<i64> {
        t.column("id").unwrap().iter().filter_map(ColumnValue::as_i64).collect()
    }

    #[test]
    fn test_single_key_nulls_last() {
        let t = table();
        assert_eq!(ids(&t.arrange(&[SortKey::from("price")]).unwrap()), vec![3, 6, 1, 4, 5, 2]);
        assert_eq!(ids(&t.arrange(&[SortKey::desc("price")]).unwrap()), vec![5, 1, 4, 3, 6, 2]);
    }

    #[test]
    fn test_multi_key_and_stability() {
        let t = table();
        let out = t
            .arrange(&[SortKey::asc("hotel"), SortKey::desc("price")])
            .unwrap();
        assert_eq!(ids(&out), vec![4, 6, 2, 1, 3, 5]);

        // ties on hotel keep input order
        assert_eq!(ids(&t.arrange(&[SortKey::from("hotel")]).unwrap()), vec![2, 4, 6, 1, 3, 5]);
    }

    #[test]
    fn test_arrange_is_idempotent_permutation() {
        let t = table();
        let keys = [SortKey::asc("hotel"), SortKey::asc("price")];
        let once = t.arrange(&keys).unwrap();
        assert_eq!(once.arrange(&keys).unwrap(), once);

        let mut sorted_ids = ids(&once);
        sorted_ids.sort();
        assert_eq!(sorted_ids, ids(&t));
    }

    #[test]
    fn test_nan_sorts_as_missing() {
        let mut csv = String::from("x\n");
        for i in 0..200 {
            if i % 3 == 0 {
                csv.push_str("NaN\n");
            } else {
                csv.push_str(&format!("{}.5\n", (i * 37) % 101));
            }
        }
        let t = Table::from_csv(&csv, &crate::table::CsvOptions::default()).unwrap();

        for key in [SortKey::asc("x"), SortKey::desc("x")] {
            let sorted = t.arrange(&[key.clone()]).unwrap();
            let values = sorted.column("x").unwrap().values();
            let present: Vec<f64> = values.iter().filter_map(ColumnValue::as_f64).collect();
            assert_eq!(present.len(), 133);
            assert!(values[133..].iter().all(ColumnValue::is_null));
            let in_order = present.windows(2).all(|w| match key.order {
                SortOrder::Ascending => w[0] <= w[1],
                SortOrder::Descending => w[0] >= w[1],
            });
            assert!(in_order);
        }
    }

    #[test]
    fn test_unknown_key() {
        assert!(matches!(
            table().arrange(&[SortKey::asc("nope")]),
            Err(TableError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_categorical_sorts_by_level() {
        let t = table().factor("hotel", &["b", "a"]).unwrap();
        assert_eq!(ids(&t.arrange(&[SortKey::from("hotel")]).unwrap()), vec![1, 3, 2, 4, 6, 5]);
    }
}
