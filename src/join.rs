//! Equi-joins on one or more key columns.
//!
//! Output rows follow the left table; for each left row, its matches appear
//! in the right table's order. Missing keys never match, not even each
//! other.

use crate::column::{Column, HashKey};
use crate::error::{Result, TableError};
use crate::table::Table;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Type of join operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    /// Only rows that match in both tables
    #[default]
    Inner,
    /// All rows from the left table; right columns are missing when unmatched
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinOptions {
    pub join_type: JoinType,
    /// Appended to non-key names present in both tables, left then right.
    pub suffix: (String, String),
}

impl Default for JoinOptions {
    fn default() -> Self {
        JoinOptions {
            join_type: JoinType::Inner,
            suffix: (".x".to_string(), ".y".to_string()),
        }
    }
}

impl JoinOptions {
    pub fn left() -> Self {
        JoinOptions {
            join_type: JoinType::Left,
            ..JoinOptions::default()
        }
    }
}

fn compatible_keys(left: &Column, right: &Column) -> bool {
    let (l, r) = (left.column_type(), right.column_type());
    (l.is_numeric() && r.is_numeric()) || (l.is_textual() && r.is_textual()) || l == r
}

impl Table {
    /// Join with `right` on the `by` columns, present in both tables.
    pub fn join(&self, right: &Table, by: &[&str], options: &JoinOptions) -> Result<Table> {
        if by.is_empty() {
            return Err(TableError::InvalidArgument(
                "join needs at least one key column".to_string(),
            ));
        }

        let mut left_keys = Vec::with_capacity(by.len());
        let mut right_keys = Vec::with_capacity(by.len());
        for key in by {
            let l = self.column(key)?;
            let r = right.column(key)?;
            if !compatible_keys(l, r) {
                return Err(TableError::type_mismatch(
                    key,
                    format!(
                        "cannot join {} key with {} key",
                        l.column_type(),
                        r.column_type()
                    ),
                ));
            }
            left_keys.push(l);
            right_keys.push(r);
        }

        // Hash index of the right table's keys; rows with a missing key are
        // left out so they can never match.
        let mut index: HashMap<Vec<HashKey>, Vec<usize>> = HashMap::new();
        for row in 0..right.len() {
            if right_keys.iter().any(|c| c.is_null_at(row)) {
                continue;
            }
            let hash = right_keys.iter().map(|c| c.values()[row].hash_key()).collect();
            index.entry(hash).or_default().push(row);
        }

        let mut left_rows = Vec::new();
        let mut right_rows: Vec<Option<usize>> = Vec::new();
        for row in 0..self.len() {
            let matches = if left_keys.iter().any(|c| c.is_null_at(row)) {
                None
            } else {
                let hash: Vec<HashKey> =
                    left_keys.iter().map(|c| c.values()[row].hash_key()).collect();
                index.get(&hash)
            };
            match matches {
                Some(found) => {
                    for &r in found {
                        left_rows.push(row);
                        right_rows.push(Some(r));
                    }
                }
                None if options.join_type == JoinType::Left => {
                    left_rows.push(row);
                    right_rows.push(None);
                }
                None => {}
            }
        }

        let right_extra: Vec<&Column> = right
            .columns()
            .iter()
            .filter(|c| !by.contains(&c.name()))
            .collect();
        let collides = |name: &str| {
            !by.contains(&name) && right_extra.iter().any(|c| c.name() == name)
        };

        let mut columns: Vec<Column> = self
            .columns()
            .iter()
            .map(|c| {
                let taken = c.take(&left_rows);
                if collides(c.name()) {
                    let name = format!("{}{}", c.name(), options.suffix.0);
                    taken.rename(name)
                } else {
                    taken
                }
            })
            .collect();
        for c in &right_extra {
            let taken = c.take_optional(&right_rows);
            if self.has_column(c.name()) {
                let name = format!("{}{}", c.name(), options.suffix.1);
                columns.push(taken.rename(name));
            } else {
                columns.push(taken);
            }
        }

        debug!(
            "{:?} join on {:?}: {} x {} rows -> {} rows",
            options.join_type,
            by,
            self.len(),
            right.len(),
            left_rows.len()
        );
        Table::from_columns(columns)
    }

    /// Rows whose keys match in both tables.
    ///
    /// ```
    /// use tidytable::{Column, ColumnValue, Table};
    ///
    /// let bookings = Table::from_columns(vec![
    ///     Column::infer("hotel", vec![ColumnValue::from("City"), ColumnValue::from("Resort")]).unwrap(),
    ///     Column::infer("nights", vec![ColumnValue::from(2), ColumnValue::from(5)]).unwrap(),
    /// ])
    /// .unwrap();
    /// let rates = Table::from_columns(vec![
    ///     Column::infer("hotel", vec![ColumnValue::from("City")]).unwrap(),
    ///     Column::infer("rate", vec![ColumnValue::from(99.0)]).unwrap(),
    /// ])
    /// .unwrap();
    ///
    /// let joined = bookings.inner_join(&rates, &["hotel"]).unwrap();
    /// assert_eq!(joined.column_names(), vec!["hotel", "nights", "rate"]);
    /// assert_eq!(joined.len(), 1);
    /// ```
    pub fn inner_join(&self, right: &Table, by: &[&str]) -> Result<Table> {
        self.join(right, by, &JoinOptions::default())
    }

    /// Every left row, with missing right columns where nothing matched.
    pub fn left_join(&self, right: &Table, by: &[&str]) -> Result<Table> {
        self.join(right, by, &JoinOptions::left())
    }
}
