//! Column selection, renaming and relocation.
//!
//! Selectors resolve to column positions. A list of selectors is resolved in
//! order with duplicates dropped, so `select(&["b".into(), everything()])`
//! moves `b` to the front.

use crate::column::{Column, ColumnType};
use crate::error::{Result, TableError};
use crate::mutate::Position;
use crate::table::Table;
use log::debug;
use regex::RegexBuilder;
use std::collections::HashSet;
use std::ops::{Not, Range};

/// A criterion picking columns by name, pattern or type.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// An exact column name; fails if absent.
    Name(String),
    StartsWith(String),
    EndsWith(String),
    Contains(String),
    /// Regular expression searched in the name.
    Matches(String),
    NumRange {
        prefix: String,
        range: Range<i64>,
        width: usize,
    },
    /// Names that exist are selected, others ignored.
    AnyOf(Vec<String>),
    /// Every name must exist.
    AllOf(Vec<String>),
    Everything,
    /// The last column, or `offset` columns before it.
    LastCol(usize),
    OfType(ColumnType),
    Not(Box<Selector>),
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Name(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Name(name)
    }
}

impl Not for Selector {
    type Output = Selector;

    fn not(self) -> Selector {
        Selector::Not(Box::new(self))
    }
}

pub fn starts_with(prefix: &str) -> Selector {
    Selector::StartsWith(prefix.to_string())
}

pub fn ends_with(suffix: &str) -> Selector {
    Selector::EndsWith(suffix.to_string())
}

pub fn contains(needle: &str) -> Selector {
    Selector::Contains(needle.to_string())
}

pub fn matches(pattern: &str) -> Selector {
    Selector::Matches(pattern.to_string())
}

/// `num_range("wk", 1..4, 0)` names `wk1`, `wk2` and `wk3`; a non-zero
/// `width` zero-pads the number.
pub fn num_range(prefix: &str, range: Range<i64>, width: usize) -> Selector {
    Selector::NumRange {
        prefix: prefix.to_string(),
        range,
        width,
    }
}

pub fn any_of(names: &[&str]) -> Selector {
    Selector::AnyOf(names.iter().map(|n| n.to_string()).collect())
}

pub fn all_of(names: &[&str]) -> Selector {
    Selector::AllOf(names.iter().map(|n| n.to_string()).collect())
}

pub fn everything() -> Selector {
    Selector::Everything
}

pub fn last_col(offset: usize) -> Selector {
    Selector::LastCol(offset)
}

pub fn of_type(column_type: ColumnType) -> Selector {
    Selector::OfType(column_type)
}

impl Selector {
    /// Column positions matched by this selector, in table order (or in
    /// listed order for name lists).
    pub fn resolve(&self, table: &Table) -> Result<Vec<usize>> {
        let names = table.column_names();
        let by_name = |pred: &dyn Fn(&str) -> bool| -> Vec<usize> {
            names
                .iter()
                .enumerate()
                .filter(|(_, n)| pred(n))
                .map(|(i, _)| i)
                .collect()
        };

        Ok(match self {
            Selector::Name(name) => vec![table.resolve(name)?],
            Selector::StartsWith(prefix) => {
                let prefix = prefix.to_lowercase();
                by_name(&|n| n.to_lowercase().starts_with(&prefix))
            }
            Selector::EndsWith(suffix) => {
                let suffix = suffix.to_lowercase();
                by_name(&|n| n.to_lowercase().ends_with(&suffix))
            }
            Selector::Contains(needle) => {
                let needle = needle.to_lowercase();
                by_name(&|n| n.to_lowercase().contains(&needle))
            }
            Selector::Matches(pattern) => {
                let re = RegexBuilder::new(pattern).case_insensitive(true).build()?;
                by_name(&|n| re.is_match(n))
            }
            Selector::NumRange {
                prefix,
                range,
                width,
            } => range
                .clone()
                .filter_map(|i| table.column_index(&format!("{}{:0w$}", prefix, i, w = *width)))
                .collect(),
            Selector::AnyOf(list) => list.iter().filter_map(|n| table.column_index(n)).collect(),
            Selector::AllOf(list) => list
                .iter()
                .map(|n| table.resolve(n))
                .collect::<Result<Vec<_>>>()?,
            Selector::Everything => (0..names.len()).collect(),
            Selector::LastCol(offset) => {
                if *offset >= names.len() {
                    return Err(TableError::InvalidArgument(format!(
                        "last_col({}) on a table with {} columns",
                        offset,
                        names.len()
                    )));
                }
                vec![names.len() - 1 - offset]
            }
            Selector::OfType(column_type) => table
                .columns()
                .iter()
                .enumerate()
                .filter(|(_, c)| c.column_type() == *column_type)
                .map(|(i, _)| i)
                .collect(),
            Selector::Not(inner) => {
                let excluded: HashSet<usize> = inner.resolve(table)?.into_iter().collect();
                (0..names.len()).filter(|i| !excluded.contains(i)).collect()
            }
        })
    }
}

/// Resolve a selector list. A leading negation starts from every column;
/// any negation removes from what has been selected so far.
pub fn resolve_selectors(table: &Table, selectors: &[Selector]) -> Result<Vec<usize>> {
    let mut selected: Vec<usize> = Vec::new();
    for (i, selector) in selectors.iter().enumerate() {
        match selector {
            Selector::Not(inner) => {
                if i == 0 {
                    selected = (0..table.width()).collect();
                }
                let excluded = inner.resolve(table)?;
                selected.retain(|c| !excluded.contains(c));
            }
            other => {
                for idx in other.resolve(table)? {
                    if !selected.contains(&idx) {
                        selected.push(idx);
                    }
                }
            }
        }
    }
    Ok(selected)
}

impl Table {
    /// Keep the selected columns, in selection order.
    ///
    /// ```
    /// use tidytable::{starts_with, Column, ColumnValue, Table};
    ///
    /// let table = Table::from_columns(vec![
    ///     Column::infer("hotel", vec![ColumnValue::from("Resort")]).unwrap(),
    ///     Column::infer("arrival_year", vec![ColumnValue::from(2016)]).unwrap(),
    ///     Column::infer("arrival_month", vec![ColumnValue::from("July")]).unwrap(),
    /// ])
    /// .unwrap();
    ///
    /// let arrivals = table.select(&[starts_with("arrival")]).unwrap();
    /// assert_eq!(arrivals.column_names(), vec!["arrival_year", "arrival_month"]);
    /// ```
    pub fn select(&self, selectors: &[Selector]) -> Result<Table> {
        let indices = resolve_selectors(self, selectors)?;
        debug!("select: {} of {} columns", indices.len(), self.width());
        let columns = indices.iter().map(|&i| self.columns()[i].clone()).collect();
        Ok(Table::from_parts(columns, self.len()))
    }

    /// Keep columns by exact name.
    pub fn select_columns(&self, names: &[&str]) -> Result<Table> {
        let selectors: Vec<Selector> = names.iter().map(|n| Selector::from(*n)).collect();
        self.select(&selectors)
    }

    /// Rename columns given `(new, old)` pairs; positions are unchanged.
    pub fn rename(&self, pairs: &[(&str, &str)]) -> Result<Table> {
        let mut out = self.clone();
        for (new, old) in pairs {
            let idx = self.resolve(old)?;
            let renamed = out.columns()[idx].with_name(*new);
            out.columns_mut()[idx] = renamed;
        }

        let mut seen = HashSet::new();
        for name in out.column_names() {
            if !seen.insert(name) {
                return Err(TableError::DuplicateColumn(name.to_string()));
            }
        }
        Ok(out)
    }

    /// Move the selected columns to `position`. `Position::End` moves them
    /// to the back, `Position::Start` to the front.
    pub fn relocate(&self, selectors: &[Selector], position: Position) -> Result<Table> {
        let moving = resolve_selectors(self, selectors)?;
        let (moved, rest): (Vec<&Column>, Vec<&Column>) = {
            let moved = moving.iter().map(|&i| &self.columns()[i]).collect();
            let rest = (0..self.width())
                .filter(|i| !moving.contains(i))
                .map(|i| &self.columns()[i])
                .collect();
            (moved, rest)
        };

        let names: Vec<&str> = rest.iter().map(|c| c.name()).collect();
        let at = position.insertion_index(&names).map_err(|err| match err {
            TableError::UnknownColumn(anchor) if self.has_column(&anchor) => {
                TableError::InvalidArgument(format!(
                    "cannot relocate columns relative to '{}', which is being moved",
                    anchor
                ))
            }
            other => other,
        })?;

        let mut columns: Vec<Column> = rest.into_iter().cloned().collect();
        columns.splice(at..at, moved.into_iter().cloned());
        Ok(Table::from_parts(columns, self.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnValue;

    fn weekly() -> Table {
        let names = ["id", "Wk1", "wk2", "wk3", "total_cost", "cost_per_night"];
        let columns = names
            .iter()
            .enumerate()
            .map(|(i, n)| {
                let value = if *n == "total_cost" {
                    ColumnValue::Float64(1.5)
                } else {
                    ColumnValue::Int64(i as i64)
                };
                Column::infer(*n, vec![value]).unwrap()
            })
            .collect();
        Table::from_columns(columns).unwrap()
    }

    fn names(table: &Table) -> Vec<String> {
        table.column_names().iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_by_name_and_helpers() {
        let t = weekly();
        assert_eq!(names(&t.select_columns(&["wk3", "id"]).unwrap()), ["wk3", "id"]);
        assert_eq!(names(&t.select(&[starts_with("wk")]).unwrap()), ["Wk1", "wk2", "wk3"]);
        assert_eq!(names(&t.select(&[ends_with("COST")]).unwrap()), ["total_cost"]);
        assert_eq!(
            names(&t.select(&[contains("cost")]).unwrap()),
            ["total_cost", "cost_per_night"]
        );
        assert_eq!(names(&t.select(&[matches("^wk[12]$")]).unwrap()), ["Wk1", "wk2"]);
        assert_eq!(names(&t.select(&[num_range("wk", 2..5, 0)]).unwrap()), ["wk2", "wk3"]);
        assert_eq!(names(&t.select(&[last_col(0)]).unwrap()), ["cost_per_night"]);
        assert_eq!(names(&t.select(&[of_type(ColumnType::Float64)]).unwrap()), ["total_cost"]);
    }

    #[test]
    fn test_select_dedupes_in_first_occurrence_order() {
        let t = weekly();
        let out = t.select(&[Selector::from("wk2"), everything()]).unwrap();
        assert_eq!(
            names(&out),
            ["wk2", "id", "Wk1", "wk3", "total_cost", "cost_per_night"]
        );
    }

    #[test]
    fn test_negation() {
        let t = weekly();
        let out = t.select(&[!starts_with("wk"), !Selector::from("id")]).unwrap();
        assert_eq!(names(&out), ["total_cost", "cost_per_night"]);

        let out = t.select(&[contains("cost"), !Selector::from("total_cost")]).unwrap();
        assert_eq!(names(&out), ["cost_per_night"]);
    }

    #[test]
    fn test_select_errors() {
        let t = weekly();
        assert!(matches!(t.select_columns(&["nope"]), Err(TableError::UnknownColumn(_))));
        assert!(matches!(
            t.select(&[all_of(&["id", "nope"])]),
            Err(TableError::UnknownColumn(_))
        ));
        assert_eq!(names(&t.select(&[any_of(&["id", "nope"])]).unwrap()), ["id"]);
        assert!(matches!(t.select(&[matches("(")]), Err(TableError::Regex(_))));
        assert!(matches!(t.select(&[last_col(10)]), Err(TableError::InvalidArgument(_))));
    }

    #[test]
    fn test_select_is_idempotent() {
        let t = weekly();
        let criteria = [contains("wk"), Selector::from("id")];
        let once = t.select(&criteria).unwrap();
        assert_eq!(once.select(&criteria).unwrap(), once);
        assert_eq!(once.len(), t.len());
    }

    #[test]
    fn test_rename() {
        let t = weekly();
        let out = t.rename(&[("week1", "Wk1")]).unwrap();
        assert_eq!(names(&out)[1], "week1");
        assert!(matches!(t.rename(&[("id", "wk2")]), Err(TableError::DuplicateColumn(_))));
        assert!(matches!(t.rename(&[("x", "nope")]), Err(TableError::UnknownColumn(_))));
    }

    #[test]
    fn test_relocate() {
        let t = weekly();
        let out = t.relocate(&[ends_with("cost")], Position::Start).unwrap();
        assert_eq!(names(&out)[0], "total_cost");

        let out = t.relocate(&[Selector::from("id")], Position::after("wk3")).unwrap();
        assert_eq!(
            names(&out),
            ["Wk1", "wk2", "wk3", "id", "total_cost", "cost_per_night"]
        );

        assert!(matches!(
            t.relocate(&[Selector::from("id")], Position::after("id")),
            Err(TableError::InvalidArgument(_))
        ));
    }
}
