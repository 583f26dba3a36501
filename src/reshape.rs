//! Pivoting between long (key/value rows) and wide (one column per key)
//! layouts.

use crate::column::{Column, ColumnType, ColumnValue, HashKey};
use crate::error::{Result, TableError};
use crate::select::{resolve_selectors, Selector};
use crate::table::Table;
use log::debug;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotWiderOptions {
    /// Prepended to every new column name.
    pub names_prefix: String,
    /// Value for cells with no source row. Explicit missing values in the
    /// source are kept as missing.
    pub values_fill: Option<ColumnValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PivotLongerOptions {
    /// Stripped from the start of column names written to `names_to`.
    pub names_prefix: Option<String>,
    /// Skip output rows whose value is missing.
    pub values_drop_na: bool,
}

impl Table {
    /// Spread `values_from` into one column per distinct `names_from` value.
    pub fn pivot_wider(&self, names_from: &str, values_from: &str) -> Result<Table> {
        self.pivot_wider_with(names_from, values_from, &PivotWiderOptions::default())
    }

    pub fn pivot_wider_with(
        &self,
        names_from: &str,
        values_from: &str,
        options: &PivotWiderOptions,
    ) -> Result<Table> {
        let names_idx = self.resolve(names_from)?;
        let values_idx = self.resolve(values_from)?;
        if names_idx == values_idx {
            return Err(TableError::InvalidArgument(format!(
                "'{}' cannot be both names_from and values_from",
                names_from
            )));
        }
        let names_col = &self.columns()[names_idx];
        let values_col = &self.columns()[values_idx];
        let id_cols: Vec<&Column> = self
            .columns()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != names_idx && *i != values_idx)
            .map(|(_, c)| c)
            .collect();

        // Identifier combinations, first occurrence order.
        let mut id_index: HashMap<Vec<HashKey>, usize> = HashMap::new();
        let mut id_rows: Vec<usize> = Vec::new();
        // New columns keyed by value, first occurrence order.
        let mut new_index: HashMap<HashKey, usize> = HashMap::new();
        let mut new_names: Vec<String> = Vec::new();
        let mut cells: Vec<Vec<Option<usize>>> = Vec::new();

        for row in 0..self.len() {
            let id_key: Vec<HashKey> = id_cols.iter().map(|c| c.values()[row].hash_key()).collect();
            let group = *id_index.entry(id_key).or_insert_with(|| {
                id_rows.push(row);
                id_rows.len() - 1
            });

            let name_value = &names_col.values()[row];
            let slot = *new_index.entry(name_value.hash_key()).or_insert_with(|| {
                new_names.push(format!("{}{}", options.names_prefix, name_value));
                cells.push(Vec::new());
                new_names.len() - 1
            });

            let column_cells = &mut cells[slot];
            if column_cells.len() <= group {
                column_cells.resize(group + 1, None);
            }
            if column_cells[group].is_some() {
                let ids: Vec<String> = id_cols
                    .iter()
                    .map(|c| c.values()[row].to_string())
                    .collect();
                return Err(TableError::DuplicateKey {
                    cell: new_names[slot].clone(),
                    group: format!("({})", ids.join(", ")),
                });
            }
            column_cells[group] = Some(row);
        }

        let mut columns: Vec<Column> = id_cols.iter().map(|c| c.take(&id_rows)).collect();
        // Distinct values may still render to the same name, e.g. "NA" and missing.
        for (name, mut column_cells) in new_names.into_iter().zip(cells) {
            if columns.iter().any(|c| c.name() == name) {
                return Err(TableError::DuplicateColumn(name));
            }
            column_cells.resize(id_rows.len(), None);

            let mut column = values_col.empty_like(&name);
            for cell in column_cells {
                let value = match cell {
                    Some(row) => values_col.values()[row].clone(),
                    None => options.values_fill.clone().unwrap_or(ColumnValue::Null),
                };
                column.push(value)?;
            }
            columns.push(column);
        }

        debug!(
            "pivot_wider: {} rows -> {} rows x {} columns",
            self.len(),
            id_rows.len(),
            columns.len()
        );
        if columns.is_empty() {
            return Ok(Table::from_parts(columns, id_rows.len()));
        }
        Table::from_columns(columns)
    }

    /// Gather the `cols` columns into `names_to`/`values_to` pairs, one output
    /// row per input row and gathered column.
    pub fn pivot_longer(&self, cols: &[Selector], names_to: &str, values_to: &str) -> Result<Table> {
        self.pivot_longer_with(cols, names_to, values_to, &PivotLongerOptions::default())
    }

    pub fn pivot_longer_with(
        &self,
        cols: &[Selector],
        names_to: &str,
        values_to: &str,
        options: &PivotLongerOptions,
    ) -> Result<Table> {
        let gathered = resolve_selectors(self, cols)?;
        if gathered.is_empty() {
            return Err(TableError::InvalidArgument(
                "pivot_longer selected no columns".to_string(),
            ));
        }
        let gathered: Vec<&Column> = gathered.iter().map(|&i| &self.columns()[i]).collect();
        let id_cols: Vec<&Column> = self
            .columns()
            .iter()
            .filter(|c| !gathered.iter().any(|g| g.name() == c.name()))
            .collect();

        let mut values = unified_column(&gathered, values_to)?;
        let mut names = Column::new(names_to, ColumnType::String);
        let mut id_rows = Vec::new();

        for row in 0..self.len() {
            for column in &gathered {
                let value = &column.values()[row];
                if options.values_drop_na && value.is_null() {
                    continue;
                }
                let name = match &options.names_prefix {
                    Some(prefix) => column.name().strip_prefix(prefix.as_str()).unwrap_or(column.name()),
                    None => column.name(),
                };
                id_rows.push(row);
                names.push(ColumnValue::String(name.to_string()))?;
                values.push(value.clone())?;
            }
        }

        let mut columns: Vec<Column> = id_cols.iter().map(|c| c.take(&id_rows)).collect();
        columns.push(names);
        columns.push(values);

        debug!(
            "pivot_longer: {} rows x {} columns -> {} rows",
            self.len(),
            gathered.len(),
            id_rows.len()
        );
        Table::from_columns(columns)
    }
}

/// Empty column able to hold every gathered column's values.
fn unified_column(gathered: &[&Column], name: &str) -> Result<Column> {
    let first = gathered[0];
    let mut unified = first.column_type();
    let mut same_levels = true;

    for column in &gathered[1..] {
        let ty = column.column_type();
        same_levels &= column.levels() == first.levels();
        unified = match (unified, ty) {
            (a, b) if a == b => a,
            (a, b) if a.is_numeric() && b.is_numeric() => ColumnType::Float64,
            (a, b) if a.is_textual() && b.is_textual() => ColumnType::String,
            (a, b) => {
                return Err(TableError::type_mismatch(
                    column.name(),
                    format!("cannot gather {} and {} columns together", a, b),
                ))
            }
        };
    }

    Ok(match unified {
        ColumnType::Categorical if same_levels => first.empty_like(name),
        ColumnType::Categorical => Column::new(name, ColumnType::String),
        other => Column::new(name, other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::{any_of, starts_with};

    fn long() -> Table {
        let hotels = ["City", "City", "Resort", "Resort", "Resort"];
        let days = ["Mon", "Tue", "Mon", "Tue", "Wed"];
        let counts = [10, 12, 4, 6, 8];
        Table::from_columns(vec![
            Column::infer("hotel", hotels.iter().map(|&h| h.into()).collect()).unwrap(),
            Column::infer("day", days.iter().map(|&d| d.into()).collect()).unwrap(),
            Column::infer("n", counts.iter().map(|&n: &i64| n.into()).collect()).unwrap(),
        ])
        .unwrap()
    }

    fn strings(table: &Table, column: &str) -> Vec<String> {
        table.column(column).unwrap().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_pivot_wider_fills_missing_cells() {
        let wide = long().pivot_wider("day", "n").unwrap();
        assert_eq!(wide.column_names(), vec!["hotel", "Mon", "Tue", "Wed"]);
        assert_eq!(wide.len(), 2);
        assert_eq!(strings(&wide, "Wed"), vec!["NA", "8"]);
        assert_eq!(wide.column("Mon").unwrap().column_type(), ColumnType::Int64);
    }

    #[test]
    fn test_pivot_wider_options() {
        let options = PivotWiderOptions {
            names_prefix: "day_".to_string(),
            values_fill: Some(ColumnValue::Int64(0)),
        };
        let wide = long().pivot_wider_with("day", "n", &options).unwrap();
        assert_eq!(wide.column_names(), vec!["hotel", "day_Mon", "day_Tue", "day_Wed"]);
        assert_eq!(strings(&wide, "day_Wed"), vec!["0", "8"]);

        let bad_fill = PivotWiderOptions {
            values_fill: Some(ColumnValue::String("none".to_string())),
            ..PivotWiderOptions::default()
        };
        assert!(matches!(
            long().pivot_wider_with("day", "n", &bad_fill),
            Err(TableError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_pivot_wider_duplicate_cell() {
        let doubled = long()
            .select(&[any_of(&["day", "n"])])
            .unwrap();
        let err = doubled.pivot_wider("day", "n").unwrap_err();
        assert!(matches!(err, TableError::DuplicateKey { ref cell, .. } if cell == "Mon"));
    }

    #[test]
    fn test_pivot_wider_name_collision() {
        let t = long().rename(&[("Mon", "hotel")]).unwrap();
        assert!(matches!(t.pivot_wider("day", "n"), Err(TableError::DuplicateColumn(_))));
    }

    #[test]
    fn test_pivot_wider_missing_name_is_its_own_key() {
        let t = Table::from_columns(vec![
            Column::infer("id", vec![1.into(), 1.into(), 2.into()]).unwrap(),
            Column::infer("key", vec!["a".into(), ColumnValue::Null, ColumnValue::Null]).unwrap(),
            Column::infer("v", vec![10.into(), 20.into(), 30.into()]).unwrap(),
        ])
        .unwrap();
        let wide = t.pivot_wider("key", "v").unwrap();
        assert_eq!(wide.column_names(), vec!["id", "a", "NA"]);
        assert_eq!(strings(&wide, "NA"), vec!["20", "30"]);

        let clash = Table::from_columns(vec![
            Column::infer("id", vec![1.into(), 1.into()]).unwrap(),
            Column::infer("key", vec!["NA".into(), ColumnValue::Null]).unwrap(),
            Column::infer("v", vec![1.into(), 2.into()]).unwrap(),
        ])
        .unwrap();
        assert!(matches!(
            clash.pivot_wider("key", "v"),
            Err(TableError::DuplicateColumn(ref name)) if name == "NA"
        ));
    }

    #[test]
    fn test_pivot_longer() {
        let wide = long().pivot_wider("day", "n").unwrap();
        let back = wide
            .pivot_longer(&[!Selector::from("hotel")], "day", "n")
            .unwrap();
        assert_eq!(back.column_names(), vec!["hotel", "day", "n"]);
        assert_eq!(back.len(), 6);
        assert_eq!(strings(&back, "day")[..3], ["Mon", "Tue", "Wed"]);
        assert_eq!(strings(&back, "n")[..3], ["10", "12", "NA"]);

        let dropped = wide
            .pivot_longer_with(
                &[!Selector::from("hotel")],
                "day",
                "n",
                &PivotLongerOptions {
                    values_drop_na: true,
                    ..PivotLongerOptions::default()
                },
            )
            .unwrap();
        assert_eq!(dropped.len(), 5);
    }

    #[test]
    fn test_pivot_longer_strips_prefix_and_unifies_types() {
        let wide = Table::from_columns(vec![
            Column::infer("id", vec![1.into()]).unwrap(),
            Column::infer("wk1", vec![3.into()]).unwrap(),
            Column::infer("wk2", vec![4.5.into()]).unwrap(),
        ])
        .unwrap();
        let options = PivotLongerOptions {
            names_prefix: Some("wk".to_string()),
            ..PivotLongerOptions::default()
        };
        let out = wide
            .pivot_longer_with(&[starts_with("wk")], "week", "rank", &options)
            .unwrap();
        assert_eq!(strings(&out, "week"), vec!["1", "2"]);
        assert_eq!(out.column("rank").unwrap().column_type(), ColumnType::Float64);
        assert_eq!(out.get_value(0, "rank").unwrap(), &ColumnValue::Float64(3.0));
    }

    #[test]
    fn test_pivot_longer_errors() {
        let t = long();
        assert!(matches!(
            t.pivot_longer(&[starts_with("zzz")], "k", "v"),
            Err(TableError::InvalidArgument(_))
        ));
        assert!(matches!(
            t.pivot_longer(&[any_of(&["day", "n"])], "k", "v"),
            Err(TableError::TypeMismatch { .. })
        ));
    }
}
