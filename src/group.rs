//! Grouping by key columns.
//!
//! Groups are ordered by their key tuple, ascending under each key column's
//! natural ordering with missing keys last. Rows within a group keep their
//! input order.

use crate::column::{Column, ColumnValue, HashKey};
use crate::error::{Result, TableError};
use crate::summarize::{n, Aggregation};
use crate::table::Table;
use log::{debug, trace};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// One partition of a grouped table.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    key: Vec<ColumnValue>,
    rows: Vec<usize>,
}

impl Group {
    /// The single group of an ungrouped table.
    pub(crate) fn whole(len: usize) -> Self {
        Group {
            key: Vec::new(),
            rows: (0..len).collect(),
        }
    }

    /// Key values, one per grouping column.
    pub fn key(&self) -> &[ColumnValue] {
        &self.key
    }

    /// Row indices of the source table.
    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Human-readable key tuple, e.g. `(stayed, 2016)`.
    pub(crate) fn label(&self) -> String {
        if self.key.is_empty() {
            return "<ungrouped>".to_string();
        }
        let parts: Vec<String> = self.key.iter().map(ToString::to_string).collect();
        format!("({})", parts.join(", "))
    }
}

/// A table partitioned by one or more key columns.
#[derive(Clone, PartialEq)]
pub struct GroupedTable {
    table: Table,
    keys: Vec<String>,
    groups: Vec<Group>,
}

impl GroupedTable {
    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Drop the grouping and return the table.
    pub fn ungroup(self) -> Table {
        self.table
    }

    /// The key columns, in grouping order.
    pub(crate) fn key_columns(&self) -> Vec<&Column> {
        self.keys
            .iter()
            .filter_map(|k| self.table.column(k).ok())
            .collect()
    }
}

impl fmt::Debug for GroupedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GroupedTable {{ keys: {:?}, groups: {}, rows: {} }}",
            self.keys,
            self.groups.len(),
            self.table.len()
        )
    }
}

impl Table {
    /// Partition rows by the distinct values of `columns`.
    ///
    /// ```
    /// use tidytable::{Column, ColumnValue, Table};
    ///
    /// let table = Table::from_columns(vec![Column::infer(
    ///     "status",
    ///     vec![ColumnValue::from("stayed"), ColumnValue::from("cancelled"), ColumnValue::from("stayed")],
    /// )
    /// .unwrap()])
    /// .unwrap();
    ///
    /// let grouped = table.group_by(&["status"]).unwrap();
    /// assert_eq!(grouped.len(), 2);
    /// assert_eq!(grouped.groups()[0].key()[0], ColumnValue::from("cancelled"));
    /// assert_eq!(grouped.groups()[1].rows(), &[0, 2]);
    /// ```
    pub fn group_by(&self, columns: &[&str]) -> Result<GroupedTable> {
        if columns.is_empty() {
            return Err(TableError::InvalidArgument(
                "group_by needs at least one column".to_string(),
            ));
        }

        let mut keys: Vec<String> = Vec::new();
        for name in columns {
            self.resolve(name)?;
            if !keys.iter().any(|k| k == name) {
                keys.push(name.to_string());
            }
        }
        let key_columns: Vec<&Column> = keys
            .iter()
            .map(|k| self.column(k))
            .collect::<Result<_>>()?;

        let mut index: HashMap<Vec<HashKey>, usize> = HashMap::new();
        let mut groups: Vec<Group> = Vec::new();
        for row in 0..self.len() {
            let hash: Vec<HashKey> = key_columns
                .iter()
                .map(|c| c.values()[row].hash_key())
                .collect();
            let slot = *index.entry(hash).or_insert_with(|| {
                groups.push(Group {
                    key: key_columns.iter().map(|c| c.values()[row].clone()).collect(),
                    rows: Vec::new(),
                });
                groups.len() - 1
            });
            groups[slot].rows.push(row);
        }

        groups.sort_by(|a, b| {
            key_columns
                .iter()
                .map(|c| c.cmp_rows(a.rows[0], b.rows[0]))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });

        debug!(
            "group_by {:?}: {} rows into {} groups",
            keys,
            self.len(),
            groups.len()
        );
        for group in &groups {
            trace!("group {} has {} rows", group.label(), group.len());
        }

        Ok(GroupedTable {
            table: self.clone(),
            keys,
            groups,
        })
    }

    /// Number of rows per distinct combination of `columns`, in a column `n`.
    pub fn count(&self, columns: &[&str]) -> Result<Table> {
        self.group_by(columns)?.summarize(&[Aggregation::new("n", n())])
    }

    /// Distinct combinations of `columns` (all columns when empty), keeping
    /// the first occurrence of each in input order.
    pub fn distinct(&self, columns: &[&str]) -> Result<Table> {
        let projected = if columns.is_empty() {
            self.clone()
        } else {
            self.select_columns(columns)?
        };

        let mut seen = std::collections::HashSet::new();
        let keep: Vec<usize> = (0..projected.len())
            .filter(|&row| {
                let hash: Vec<HashKey> = projected
                    .columns()
                    .iter()
                    .map(|c| c.values()[row].hash_key())
                    .collect();
                seen.insert(hash)
            })
            .collect();
        Ok(projected.take_rows(&keep))
    }
}
