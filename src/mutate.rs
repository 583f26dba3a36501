//! Computed columns.
//!
//! An [`Assignment`] pairs a column name with a closure over a [`RowView`].
//! Assignments in one `mutate` call run in order, so later ones can read the
//! columns earlier ones produced.

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{Result, TableError};
use crate::table::{RowView, Table};
use log::debug;

/// Where new columns are placed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    End,
    Start,
    After(String),
    Before(String),
}

impl Position {
    pub fn after(name: &str) -> Self {
        Position::After(name.to_string())
    }

    pub fn before(name: &str) -> Self {
        Position::Before(name.to_string())
    }

    fn anchor(&self) -> Option<&str> {
        match self {
            Position::After(name) | Position::Before(name) => Some(name),
            Position::End | Position::Start => None,
        }
    }

    /// Insertion index in `names` (which must not contain the moved columns).
    pub(crate) fn insertion_index(&self, names: &[&str]) -> Result<usize> {
        let find = |anchor: &str| {
            names
                .iter()
                .position(|n| *n == anchor)
                .ok_or_else(|| TableError::UnknownColumn(anchor.to_string()))
        };
        match self {
            Position::End => Ok(names.len()),
            Position::Start => Ok(0),
            Position::After(anchor) => Ok(find(anchor)? + 1),
            Position::Before(anchor) => find(anchor),
        }
    }
}

type RowFn<'a> = Box<dyn Fn(&RowView<'_>) -> Result<ColumnValue> + 'a>;

/// A named per-row computation.
pub struct Assignment<'a> {
    name: String,
    compute: RowFn<'a>,
}

impl<'a> Assignment<'a> {
    /// ```
    /// use tidytable::Assignment;
    ///
    /// let total = Assignment::new("total", |row| {
    ///     let nights = row.get_i64("nights")?;
    ///     let rate = row.get_f64("rate")?;
    ///     Ok(nights.zip(rate).map(|(n, r)| n as f64 * r))
    /// });
    /// assert_eq!(total.name(), "total");
    /// ```
    pub fn new<F, V>(name: &str, compute: F) -> Self
    where
        F: Fn(&RowView<'_>) -> Result<V> + 'a,
        V: Into<ColumnValue>,
    {
        Assignment {
            name: name.to_string(),
            compute: Box::new(move |row: &RowView<'_>| compute(row).map(Into::into)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Assignment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Assignment {{ name: '{}' }}", self.name)
    }
}

impl Table {
    /// Add or overwrite columns. New columns go to `position` together, in
    /// assignment order; overwritten columns keep their place.
    ///
    /// Closures run once per row, so column references inside them are only
    /// checked when there is a row to evaluate. On a zero-row table an
    /// assignment that reads an absent column succeeds and adds an empty
    /// `String` column.
    pub fn mutate(&self, assignments: Vec<Assignment<'_>>, position: Position) -> Result<Table> {
        if let Some(anchor) = position.anchor() {
            self.resolve(anchor)?;
        }

        let mut working = self.clone();
        let mut added: Vec<String> = Vec::new();

        for assignment in &assignments {
            let values = working
                .iter_rows()
                .map(|row| (assignment.compute)(&row))
                .collect::<Result<Vec<_>>>()?;

            match working.column_index(&assignment.name) {
                Some(idx) => {
                    let existing = &working.columns()[idx];
                    let column = if values.iter().all(ColumnValue::is_null) {
                        Column::from_values(&assignment.name, existing.column_type(), values)?
                    } else {
                        Column::infer(&assignment.name, values)?
                    };
                    // all-missing overwrite of a categorical keeps its levels
                    let column = match existing.levels() {
                        Some(levels) if column.column_type() == ColumnType::Categorical => {
                            Column::factor(
                                &assignment.name,
                                levels.to_vec(),
                                column.values().to_vec(),
                            )?
                        }
                        _ => column,
                    };
                    working.columns_mut()[idx] = column;
                }
                None => {
                    let column = Column::infer(&assignment.name, values)?;
                    working.columns_mut().push(column);
                    added.push(assignment.name.clone());
                }
            }
        }

        if position != Position::End && !added.is_empty() {
            let columns = std::mem::take(working.columns_mut());
            let (moved, mut rest): (Vec<Column>, Vec<Column>) = columns
                .into_iter()
                .partition(|c| added.iter().any(|a| a == c.name()));
            let names: Vec<&str> = rest.iter().map(Column::name).collect();
            let at = position.insertion_index(&names)?;
            rest.splice(at..at, moved);
            *working.columns_mut() = rest;
        }

        debug!(
            "mutate: {} assignment(s), {} new column(s)",
            assignments.len(),
            added.len()
        );
        Ok(working)
    }

    /// Convert a text column to categorical with the given level order.
    pub fn factor(&self, column: &str, levels: &[&str]) -> Result<Table> {
        let idx = self.resolve(column)?;
        let source = &self.columns()[idx];
        if !source.column_type().is_textual() {
            return Err(TableError::type_mismatch(
                column,
                format!("cannot make a factor from a {} column", source.column_type()),
            ));
        }

        let levels: Vec<String> = levels.iter().map(|l| l.to_string()).collect();
        let converted = Column::factor(column, levels, source.values().to_vec())?;

        let mut out = self.clone();
        out.columns_mut()[idx] = converted;
        Ok(out)
    }
}
