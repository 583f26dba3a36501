//! Aggregation: one row per group (`summarize`) or any number of rows per
//! group (`reframe`).
//!
//! Output columns are the grouping columns, in grouping order, followed by
//! the aggregation outputs in the order given.

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{Result, TableError};
use crate::group::{Group, GroupedTable};
use crate::table::Table;
use log::debug;
use std::cmp::Ordering;
use std::collections::HashSet;

/// A reduction of a group's rows to a single value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reducer {
    /// Number of rows, missing values included.
    Count,
    CountMissing(String),
    /// Mean of the present values; missing when there are none.
    Mean(String),
    Min(String),
    Max(String),
}

pub fn n() -> Reducer {
    Reducer::Count
}

pub fn count_missing(column: &str) -> Reducer {
    Reducer::CountMissing(column.to_string())
}

pub fn mean(column: &str) -> Reducer {
    Reducer::Mean(column.to_string())
}

pub fn min(column: &str) -> Reducer {
    Reducer::Min(column.to_string())
}

pub fn max(column: &str) -> Reducer {
    Reducer::Max(column.to_string())
}

impl Reducer {
    /// Empty output column, after checking the input exists and fits.
    fn output_column(&self, table: &Table, name: &str) -> Result<Column> {
        match self {
            Reducer::Count => Ok(Column::new(name, ColumnType::Int64)),
            Reducer::CountMissing(input) => {
                table.column(input)?;
                Ok(Column::new(name, ColumnType::Int64))
            }
            Reducer::Mean(input) => {
                let column = table.column(input)?;
                if !column.column_type().is_numeric() {
                    return Err(TableError::type_mismatch(
                        input,
                        format!("mean needs a numeric column, found {}", column.column_type()),
                    ));
                }
                Ok(Column::new(name, ColumnType::Float64))
            }
            Reducer::Min(input) | Reducer::Max(input) => Ok(table.column(input)?.empty_like(name)),
        }
    }

    fn evaluate(&self, table: &Table, rows: &[usize]) -> Result<ColumnValue> {
        Ok(match self {
            Reducer::Count => ColumnValue::Int64(rows.len() as i64),
            Reducer::CountMissing(input) => {
                let column = table.column(input)?;
                let missing = rows.iter().filter(|&&r| column.is_null_at(r)).count();
                ColumnValue::Int64(missing as i64)
            }
            Reducer::Mean(input) => {
                let column = table.column(input)?;
                let present: Vec<f64> = rows.iter().filter_map(|&r| column.get_f64(r)).collect();
                if present.is_empty() {
                    ColumnValue::Null
                } else {
                    ColumnValue::Float64(present.iter().sum::<f64>() / present.len() as f64)
                }
            }
            Reducer::Min(input) => extreme(table.column(input)?, rows, Ordering::Less),
            Reducer::Max(input) => extreme(table.column(input)?, rows, Ordering::Greater),
        })
    }
}

/// Smallest (`Less`) or largest (`Greater`) present value; first wins ties.
fn extreme(column: &Column, rows: &[usize], want: Ordering) -> ColumnValue {
    let mut best: Option<usize> = None;
    for &row in rows {
        if column.is_null_at(row) {
            continue;
        }
        match best {
            Some(b) if column.cmp_rows(row, b) != want => {}
            _ => best = Some(row),
        }
    }
    best.map_or(ColumnValue::Null, |r| column.values()[r].clone())
}

/// A named single-value aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    pub name: String,
    pub reducer: Reducer,
}

impl Aggregation {
    pub fn new(name: &str, reducer: Reducer) -> Self {
        Aggregation {
            name: name.to_string(),
            reducer,
        }
    }
}

/// A reduction yielding a sequence of values per group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiReducer {
    /// `[min, max]` of the present values.
    Range(String),
    /// Distinct present values in first-occurrence order.
    Unique(String),
    Single(Reducer),
}

pub fn range(column: &str) -> MultiReducer {
    MultiReducer::Range(column.to_string())
}

pub fn unique(column: &str) -> MultiReducer {
    MultiReducer::Unique(column.to_string())
}

impl From<Reducer> for MultiReducer {
    fn from(reducer: Reducer) -> Self {
        MultiReducer::Single(reducer)
    }
}

impl MultiReducer {
    fn output_column(&self, table: &Table, name: &str) -> Result<Column> {
        match self {
            MultiReducer::Range(input) | MultiReducer::Unique(input) => {
                Ok(table.column(input)?.empty_like(name))
            }
            MultiReducer::Single(reducer) => reducer.output_column(table, name),
        }
    }

    fn evaluate(&self, table: &Table, rows: &[usize]) -> Result<Vec<ColumnValue>> {
        match self {
            MultiReducer::Range(input) => {
                let column = table.column(input)?;
                Ok(vec![
                    extreme(column, rows, Ordering::Less),
                    extreme(column, rows, Ordering::Greater),
                ])
            }
            MultiReducer::Unique(input) => {
                let column = table.column(input)?;
                let mut seen = HashSet::new();
                Ok(rows
                    .iter()
                    .map(|&r| &column.values()[r])
                    .filter(|v| !v.is_null() && seen.insert(v.hash_key()))
                    .cloned()
                    .collect())
            }
            MultiReducer::Single(reducer) => Ok(vec![reducer.evaluate(table, rows)?]),
        }
    }
}

/// A named multi-value aggregation, for `reframe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiAggregation {
    pub name: String,
    pub reducer: MultiReducer,
}

impl MultiAggregation {
    pub fn new(name: &str, reducer: impl Into<MultiReducer>) -> Self {
        MultiAggregation {
            name: name.to_string(),
            reducer: reducer.into(),
        }
    }
}

/// Output names must be unique; a table without aggregations still has rows.
fn finish(columns: Vec<Column>, row_count: usize) -> Result<Table> {
    if columns.is_empty() {
        return Ok(Table::from_parts(columns, row_count));
    }
    Table::from_columns(columns)
}

fn summarize_groups(
    table: &Table,
    key_columns: &[&Column],
    groups: &[Group],
    aggregations: &[Aggregation],
) -> Result<Table> {
    let mut keys: Vec<Column> = key_columns.iter().map(|c| c.empty_like(c.name())).collect();
    let mut outputs = aggregations
        .iter()
        .map(|a| a.reducer.output_column(table, &a.name))
        .collect::<Result<Vec<_>>>()?;

    for group in groups {
        for (column, value) in keys.iter_mut().zip(group.key()) {
            column.push(value.clone())?;
        }
        for (column, aggregation) in outputs.iter_mut().zip(aggregations) {
            column.push(aggregation.reducer.evaluate(table, group.rows())?)?;
        }
    }

    debug!(
        "summarize: {} rows into {} rows, {} aggregation(s)",
        table.len(),
        groups.len(),
        aggregations.len()
    );
    keys.extend(outputs);
    finish(keys, groups.len())
}

fn reframe_groups(
    table: &Table,
    key_columns: &[&Column],
    groups: &[Group],
    aggregations: &[MultiAggregation],
) -> Result<Table> {
    let mut keys: Vec<Column> = key_columns.iter().map(|c| c.empty_like(c.name())).collect();
    let mut outputs = aggregations
        .iter()
        .map(|a| a.reducer.output_column(table, &a.name))
        .collect::<Result<Vec<_>>>()?;

    let mut row_count = 0;
    for group in groups {
        let results = aggregations
            .iter()
            .map(|a| a.reducer.evaluate(table, group.rows()))
            .collect::<Result<Vec<_>>>()?;

        let expected = results.first().map_or(0, Vec::len);
        for (aggregation, values) in aggregations.iter().zip(&results) {
            if values.len() != expected {
                return Err(TableError::LengthMismatch {
                    group: group.label(),
                    output: aggregation.name.clone(),
                    expected,
                    found: values.len(),
                });
            }
        }

        for (column, value) in keys.iter_mut().zip(group.key()) {
            for _ in 0..expected {
                column.push(value.clone())?;
            }
        }
        for (column, values) in outputs.iter_mut().zip(results) {
            for value in values {
                column.push(value)?;
            }
        }
        row_count += expected;
    }

    debug!(
        "reframe: {} rows into {} rows across {} group(s)",
        table.len(),
        row_count,
        groups.len()
    );
    keys.extend(outputs);
    finish(keys, row_count)
}

impl Table {
    /// Reduce the whole table to exactly one row.
    ///
    /// ```
    /// use tidytable::{mean, n, Aggregation, Column, ColumnValue, Table};
    ///
    /// let table = Table::from_columns(vec![Column::infer(
    ///     "price",
    ///     vec![ColumnValue::from(100), ColumnValue::Null, ColumnValue::from(150)],
    /// )
    /// .unwrap()])
    /// .unwrap();
    ///
    /// let summary = table
    ///     .summarize(&[Aggregation::new("count", n()), Aggregation::new("avg", mean("price"))])
    ///     .unwrap();
    /// assert_eq!(summary.get_value(0, "count").unwrap(), &ColumnValue::Int64(3));
    /// assert_eq!(summary.get_value(0, "avg").unwrap(), &ColumnValue::Float64(125.0));
    /// ```
    pub fn summarize(&self, aggregations: &[Aggregation]) -> Result<Table> {
        summarize_groups(self, &[], &[Group::whole(self.len())], aggregations)
    }

    /// Reduce the whole table to as many rows as the aggregations yield.
    pub fn reframe(&self, aggregations: &[MultiAggregation]) -> Result<Table> {
        reframe_groups(self, &[], &[Group::whole(self.len())], aggregations)
    }
}

impl GroupedTable {
    /// One row per group.
    pub fn summarize(&self, aggregations: &[Aggregation]) -> Result<Table> {
        summarize_groups(self.table(), &self.key_columns(), self.groups(), aggregations)
    }

    /// Any number of rows per group, with the key repeated on each.
    pub fn reframe(&self, aggregations: &[MultiAggregation]) -> Result<Table> {
        reframe_groups(self.table(), &self.key_columns(), self.groups(), aggregations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bookings() -> Table {
        Table::from_columns(vec![
            Column::infer("id", vec![1.into(), 2.into(), 3.into(), 4.into()]).unwrap(),
            Column::infer(
                "status",
                vec!["stayed".into(), "cancelled".into(), "stayed".into(), "cancelled".into()],
            )
            .unwrap(),
            Column::infer(
                "price",
                vec![100.into(), 80.into(), 150.into(), ColumnValue::Null],
            )
            .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_ungrouped_summarize_one_row() {
        let out = bookings()
            .summarize(&[
                Aggregation::new("count", n()),
                Aggregation::new("missing", count_missing("price")),
                Aggregation::new("lowest", min("price")),
                Aggregation::new("highest", max("price")),
            ])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.column_names(), vec!["count", "missing", "lowest", "highest"]);
        assert_eq!(out.get_value(0, "count").unwrap(), &ColumnValue::Int64(4));
        assert_eq!(out.get_value(0, "missing").unwrap(), &ColumnValue::Int64(1));
        assert_eq!(out.get_value(0, "lowest").unwrap(), &ColumnValue::Int64(80));
        assert_eq!(out.get_value(0, "highest").unwrap(), &ColumnValue::Int64(150));
    }

    #[test]
    fn test_grouped_mean_excludes_missing() {
        let out = bookings()
            .group_by(&["status"])
            .unwrap()
            .summarize(&[Aggregation::new("mean_price", mean("price"))])
            .unwrap();
        assert_eq!(out.column_names(), vec!["status", "mean_price"]);
        assert_eq!(out.len(), 2);
        assert_eq!(out.get_value(0, "status").unwrap().as_string(), Some("cancelled"));
        assert_eq!(out.get_value(0, "mean_price").unwrap(), &ColumnValue::Float64(80.0));
        assert_eq!(out.get_value(1, "mean_price").unwrap(), &ColumnValue::Float64(125.0));
    }

    #[test]
    fn test_mean_all_missing_and_empty_tables() {
        let empty = bookings().filter_expr("price > 1000").unwrap();
        let out = empty
            .summarize(&[Aggregation::new("count", n()), Aggregation::new("avg", mean("price"))])
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get_value(0, "count").unwrap(), &ColumnValue::Int64(0));
        assert!(out.get_value(0, "avg").unwrap().is_null());

        let grouped = empty
            .group_by(&["status"])
            .unwrap()
            .summarize(&[Aggregation::new("count", n())])
            .unwrap();
        assert_eq!(grouped.len(), 0);
        assert_eq!(grouped.column_names(), vec!["status", "count"]);
    }

    #[test]
    fn test_mean_rejects_text() {
        let err = bookings()
            .summarize(&[Aggregation::new("m", mean("status"))])
            .unwrap_err();
        assert!(matches!(err, TableError::TypeMismatch { ref column, .. } if column == "status"));
        assert!(matches!(
            bookings().summarize(&[Aggregation::new("m", mean("nope"))]),
            Err(TableError::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_reframe_range_per_group() {
        let out = bookings()
            .group_by(&["status"])
            .unwrap()
            .reframe(&[MultiAggregation::new("price_range", range("price"))])
            .unwrap();
        assert_eq!(out.len(), 4);
        let statuses: Vec<String> = out.column("status").unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(statuses, vec!["cancelled", "cancelled", "stayed", "stayed"]);
        let ranges: Vec<String> = out.column("price_range").unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(ranges, vec!["80", "80", "100", "150"]);
    }

    #[test]
    fn test_reframe_length_mismatch() {
        let err = bookings()
            .reframe(&[
                MultiAggregation::new("price_range", range("price")),
                MultiAggregation::new("count", n()),
            ])
            .unwrap_err();
        assert!(matches!(
            err,
            TableError::LengthMismatch { ref output, expected: 2, found: 1, .. } if output == "count"
        ));
    }

    #[test]
    fn test_reframe_unique() {
        let out = bookings()
            .reframe(&[MultiAggregation::new("status", unique("status"))])
            .unwrap();
        let values: Vec<String> = out.column("status").unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(values, vec!["stayed", "cancelled"]);
    }
}
