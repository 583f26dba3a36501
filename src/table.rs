//! TidyTable Table Implementation
//!
//! A Table is an ordered collection of equal-length named columns. Tables are
//! values: every wrangling operation borrows its input and returns a new
//! Table, so a failed operation never leaves a half-modified input behind.
//!
//! # Examples
//!
//! ```
//! use tidytable::{Table, Schema, ColumnType, ColumnValue};
//! use std::collections::HashMap;
//!
//! let schema = Schema::new(vec![
//!     ("id".to_string(), ColumnType::Int64),
//!     ("status".to_string(), ColumnType::String),
//! ]);
//!
//! let mut table = Table::new(schema);
//!
//! let mut row = HashMap::new();
//! row.insert("id".to_string(), ColumnValue::Int64(1));
//! row.insert("status".to_string(), ColumnValue::String("stayed".to_string()));
//! table.append_row(row).unwrap();
//!
//! assert_eq!(table.len(), 1);
//! assert_eq!(table.get_value(0, "status").unwrap().as_string(), Some("stayed"));
//! ```

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{Result, TableError};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::Path;

/// Options for reading delimited text.
///
/// Deserializable so it can live in a JSON config file:
///
/// ```
/// use tidytable::CsvOptions;
///
/// let options = CsvOptions::from_json(r#"{"delimiter": ";", "missing_values": ["", "NA"]}"#).unwrap();
/// assert_eq!(options.delimiter, ';');
/// assert!(options.trim);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    /// Field separator, must be ASCII
    pub delimiter: char,
    /// Field contents read as the missing marker
    pub missing_values: Vec<String>,
    /// Strip surrounding whitespace from headers and fields
    pub trim: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        CsvOptions {
            delimiter: ',',
            missing_values: vec![String::new()],
            trim: true,
        }
    }
}

impl CsvOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(TableError::InvalidArgument(format!(
                "delimiter '{}' is not an ASCII character",
                self.delimiter
            )))
        }
    }

    fn is_missing(&self, field: &str) -> bool {
        self.missing_values.iter().any(|m| m == field)
    }
}

/// Column names and types of a table, in column order.
///
/// ```
/// use tidytable::{Schema, ColumnType};
///
/// let schema = Schema::new(vec![
///     ("id".to_string(), ColumnType::Int64),
///     ("price".to_string(), ColumnType::Float64),
/// ]);
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.get_column_index("price"), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<(String, ColumnType)>,
}

impl Schema {
    pub fn new(columns: Vec<(String, ColumnType)>) -> Self {
        Schema { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == name)
    }

    pub fn get_column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ty)| *ty)
    }

    pub fn get_column_info(&self, index: usize) -> Option<(&str, ColumnType)> {
        self.columns.get(index).map(|(name, ty)| (name.as_str(), *ty))
    }
}

/// An immutable, ordered collection of named, equal-length columns.
#[derive(Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Create an empty table with the given schema. Rows are added with
    /// [`Table::append_row`] while the table is being built.
    pub fn new(schema: Schema) -> Self {
        let columns = schema
            .columns
            .into_iter()
            .map(|(name, ty)| Column::new(name, ty))
            .collect();
        Table {
            columns,
            row_count: 0,
        }
    }

    /// Assemble a table from columns, checking name uniqueness and length.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let row_count = columns.first().map_or(0, Column::len);
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(TableError::DuplicateColumn(column.name().to_string()));
            }
            if column.len() != row_count {
                return Err(TableError::ColumnLength {
                    column: column.name().to_string(),
                    expected: row_count,
                    found: column.len(),
                });
            }
        }
        Ok(Table { columns, row_count })
    }

    /// Build from pre-validated columns. A table may legitimately have rows
    /// but no columns (e.g. after selecting nothing).
    pub(crate) fn from_parts(columns: Vec<Column>, row_count: usize) -> Self {
        debug_assert!(columns.iter().all(|c| c.len() == row_count));
        Table { columns, row_count }
    }

    pub(crate) fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    /// Direct column access for engines that rebuild a table in place.
    /// Callers keep every column at `len()` values.
    pub(crate) fn columns_mut(&mut self) -> &mut Vec<Column> {
        &mut self.columns
    }

    pub fn len(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn schema(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| (c.name().to_string(), c.column_type()))
                .collect(),
        )
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Index of a column, or `UnknownColumn`.
    pub(crate) fn resolve(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        let idx = self.resolve(name)?;
        Ok(&self.columns[idx])
    }

    pub fn get_value(&self, row: usize, column: &str) -> Result<&ColumnValue> {
        let col = self.column(column)?;
        col.get(row).ok_or(TableError::RowOutOfRange {
            index: row,
            len: self.row_count,
        })
    }

    pub fn get_row(&self, row: usize) -> Result<HashMap<String, ColumnValue>> {
        Ok(self.row(row)?.to_map())
    }

    /// Borrowed, typed view of one row.
    pub fn row(&self, index: usize) -> Result<RowView<'_>> {
        if index >= self.row_count {
            return Err(TableError::RowOutOfRange {
                index,
                len: self.row_count,
            });
        }
        Ok(RowView { table: self, index })
    }

    pub fn iter_rows(&self) -> TableRowIterator<'_> {
        TableRowIterator {
            table: self,
            index: 0,
        }
    }

    /// Append a row while building a table. The whole row is validated
    /// before any column is touched.
    pub fn append_row(&mut self, row: HashMap<String, ColumnValue>) -> Result<()> {
        let values = self.order_row(row)?;
        for (col, value) in self.columns.iter_mut().zip(values) {
            col.push(value)?;
        }
        self.row_count += 1;
        Ok(())
    }

    /// Append several rows; if any row is invalid nothing is appended.
    pub fn append_rows(&mut self, rows: Vec<HashMap<String, ColumnValue>>) -> Result<usize> {
        let ordered = rows
            .into_iter()
            .map(|row| self.order_row(row))
            .collect::<Result<Vec<_>>>()?;

        let count = ordered.len();
        for values in ordered {
            for (col, value) in self.columns.iter_mut().zip(values) {
                col.push(value)?;
            }
            self.row_count += 1;
        }
        Ok(count)
    }

    fn order_row(&self, mut row: HashMap<String, ColumnValue>) -> Result<Vec<ColumnValue>> {
        let mut values = Vec::with_capacity(self.columns.len());
        for col in &self.columns {
            let value = row.remove(col.name()).ok_or_else(|| {
                TableError::InvalidArgument(format!("missing value for column '{}'", col.name()))
            })?;
            col.check(&value)?;
            values.push(value);
        }
        if let Some(extra) = row.keys().next() {
            return Err(TableError::UnknownColumn(extra.clone()));
        }
        Ok(values)
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Table {
        let indices: Vec<usize> = (0..n.min(self.row_count)).collect();
        self.take_rows(&indices)
    }

    /// Gather rows by index, in the given order.
    pub(crate) fn take_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            row_count: indices.len(),
        }
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Read a table from CSV text. The first record is the header.
    ///
    /// ```
    /// use tidytable::{ColumnType, CsvOptions, Table};
    ///
    /// let csv = "id,status,price\n1,stayed,100\n2,cancelled,\n";
    /// let table = Table::from_csv(csv, &CsvOptions::default()).unwrap();
    /// assert_eq!(table.len(), 2);
    /// assert_eq!(table.column("price").unwrap().column_type(), ColumnType::Int64);
    /// assert!(table.get_value(1, "price").unwrap().is_null());
    /// ```
    pub fn from_csv(csv: &str, options: &CsvOptions) -> Result<Table> {
        Self::read_csv(csv.as_bytes(), options)
    }

    pub fn from_csv_path(path: impl AsRef<Path>, options: &CsvOptions) -> Result<Table> {
        let path = path.as_ref();
        debug!("reading CSV from {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::read_csv(file, options)
    }

    fn read_csv<R: io::Read>(reader: R, options: &CsvOptions) -> Result<Table> {
        let trim = if options.trim {
            csv::Trim::All
        } else {
            csv::Trim::None
        };
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter_byte()?)
            .trim(trim)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if headers.is_empty() {
            return Err(TableError::InvalidArgument("CSV header is empty".to_string()));
        }

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
        for record in reader.records() {
            let record = record?;
            for (i, field) in record.iter().enumerate() {
                let cell = (!options.is_missing(field)).then(|| field.to_string());
                cells[i].push(cell);
            }
        }

        let columns = headers
            .into_iter()
            .zip(cells)
            .map(|(name, cells)| parse_csv_column(name, cells))
            .collect::<Result<Vec<_>>>()?;

        let table = Table::from_columns(columns)?;
        debug!(
            "read CSV table with {} rows and {} columns",
            table.len(),
            table.width()
        );
        Ok(table)
    }

    /// Write the table as CSV. Missing values become empty fields.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.column_names())?;
        for row in 0..self.row_count {
            writer.write_record(self.columns.iter().map(|c| csv_field(&c.values()[row])))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| TableError::Io(e.into_error()))?;
        String::from_utf8(bytes)
            .map_err(|e| TableError::InvalidArgument(format!("CSV output is not UTF-8: {}", e)))
    }

    /// Export as a JSON array of row objects, keys in column order.
    pub fn to_json(&self) -> Result<String> {
        let rows: Vec<serde_json::Value> = (0..self.row_count)
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .map(|c| (c.name().to_string(), json_value(&c.values()[row])))
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();
        Ok(serde_json::to_string_pretty(&rows)?)
    }

    /// Read a JSON array of row objects. Column order follows first
    /// appearance of each key; absent keys are missing values.
    ///
    /// ```
    /// use tidytable::Table;
    ///
    /// let json = r#"[{"id": 1, "name": "Alice"}, {"id": 2, "name": null}]"#;
    /// let table = Table::from_json(json).unwrap();
    /// assert_eq!(table.len(), 2);
    /// assert!(table.get_value(1, "name").unwrap().is_null());
    /// ```
    pub fn from_json(json: &str) -> Result<Table> {
        let parsed: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(json)?;

        let mut names: Vec<&String> = Vec::new();
        for obj in &parsed {
            for key in obj.keys() {
                if !names.contains(&key) {
                    names.push(key);
                }
            }
        }

        let columns = names
            .iter()
            .map(|name| {
                let values = parsed
                    .iter()
                    .map(|obj| obj.get(*name).map_or(Ok(ColumnValue::Null), column_value_from_json))
                    .collect::<Result<Vec<_>>>()?;
                Column::infer(name.as_str(), values)
            })
            .collect::<Result<Vec<_>>>()?;

        let row_count = parsed.len();
        if columns.is_empty() {
            return Ok(Table::from_parts(Vec::new(), row_count));
        }
        Table::from_columns(columns)
    }
}

/// Infer the column type from every present cell, then parse.
fn parse_csv_column(name: String, cells: Vec<Option<String>>) -> Result<Column> {
    let column_type = infer_csv_type(&cells);
    let values = cells
        .into_iter()
        .map(|cell| match cell {
            None => Ok(ColumnValue::Null),
            Some(text) => parse_csv_value(&name, &text, column_type),
        })
        .collect::<Result<Vec<_>>>()?;
    Column::from_values(name, column_type, values)
}

fn infer_csv_type(cells: &[Option<String>]) -> ColumnType {
    let present: Vec<&str> = cells.iter().flatten().map(String::as_str).collect();
    if present.is_empty() {
        return ColumnType::String;
    }
    if present
        .iter()
        .all(|v| v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("false"))
    {
        return ColumnType::Bool;
    }
    if present.iter().all(|v| v.parse::<i64>().is_ok()) {
        return ColumnType::Int64;
    }
    // `nan`/`inf` words alone do not make a column numeric; a NaN cell in a
    // numeric column is read as missing.
    let reals: Vec<Option<f64>> = present.iter().map(|v| v.parse::<f64>().ok()).collect();
    if reals.iter().all(Option::is_some) && reals.iter().flatten().any(|f| f.is_finite()) {
        return ColumnType::Float64;
    }
    ColumnType::String
}

fn parse_csv_value(column: &str, text: &str, column_type: ColumnType) -> Result<ColumnValue> {
    let bad = || TableError::type_mismatch(column, format!("cannot parse '{}' as {}", text, column_type));
    match column_type {
        ColumnType::Int64 => text.parse().map(ColumnValue::Int64).map_err(|_| bad()),
        ColumnType::Float64 => text.parse().map(ColumnValue::Float64).map_err(|_| bad()),
        ColumnType::Bool => Ok(ColumnValue::Bool(text.eq_ignore_ascii_case("true"))),
        ColumnType::String | ColumnType::Categorical => Ok(ColumnValue::String(text.to_string())),
    }
}

/// Reals are written with a fractional part so they read back as reals.
fn csv_field(value: &ColumnValue) -> String {
    match value {
        ColumnValue::Null => String::new(),
        ColumnValue::Float64(f) => format!("{:?}", f),
        other => other.to_string(),
    }
}

fn json_value(value: &ColumnValue) -> serde_json::Value {
    match value {
        ColumnValue::Int64(n) => serde_json::Value::Number((*n).into()),
        ColumnValue::Float64(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ColumnValue::String(s) => serde_json::Value::String(s.clone()),
        ColumnValue::Bool(b) => serde_json::Value::Bool(*b),
        ColumnValue::Null => serde_json::Value::Null,
    }
}

fn column_value_from_json(value: &serde_json::Value) -> Result<ColumnValue> {
    match value {
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Ok(ColumnValue::Int64(i)),
            None => n.as_f64().map(ColumnValue::Float64).ok_or_else(|| {
                TableError::InvalidArgument(format!("unsupported JSON number {}", n))
            }),
        },
        serde_json::Value::String(s) => Ok(ColumnValue::String(s.clone())),
        serde_json::Value::Bool(b) => Ok(ColumnValue::Bool(*b)),
        serde_json::Value::Null => Ok(ColumnValue::Null),
        other => Err(TableError::InvalidArgument(format!(
            "nested JSON value {} cannot be stored in a column",
            other
        ))),
    }
}

/// A borrowed view of one table row, handed to mutate and filter closures.
#[derive(Clone, Copy)]
pub struct RowView<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> RowView<'a> {
    pub(crate) fn new(table: &'a Table, index: usize) -> Self {
        RowView { table, index }
    }

    /// Position of the row in its table.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn get(&self, column: &str) -> Result<&'a ColumnValue> {
        Ok(&self.table.column(column)?.values()[self.index])
    }

    fn typed(&self, column: &str, ok: fn(ColumnType) -> bool, expected: &str) -> Result<&'a ColumnValue> {
        let col = self.table.column(column)?;
        if !ok(col.column_type()) {
            return Err(TableError::type_mismatch(
                column,
                format!("expected {} column, found {}", expected, col.column_type()),
            ));
        }
        Ok(&col.values()[self.index])
    }

    /// Numeric value (integers widen). `Ok(None)` when missing.
    pub fn get_f64(&self, column: &str) -> Result<Option<f64>> {
        Ok(self.typed(column, ColumnType::is_numeric, "numeric")?.to_f64())
    }

    pub fn get_i64(&self, column: &str) -> Result<Option<i64>> {
        Ok(self
            .typed(column, |t| t == ColumnType::Int64, "int64")?
            .as_i64())
    }

    pub fn get_str(&self, column: &str) -> Result<Option<&'a str>> {
        Ok(self
            .typed(column, ColumnType::is_textual, "text")?
            .as_string())
    }

    pub fn get_bool(&self, column: &str) -> Result<Option<bool>> {
        Ok(self
            .typed(column, |t| t == ColumnType::Bool, "bool")?
            .as_bool())
    }

    pub fn to_map(&self) -> HashMap<String, ColumnValue> {
        self.table
            .columns
            .iter()
            .map(|c| (c.name().to_string(), c.values()[self.index].clone()))
            .collect()
    }
}

pub struct TableRowIterator<'a> {
    table: &'a Table,
    index: usize,
}

impl<'a> Iterator for TableRowIterator<'a> {
    type Item = RowView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.table.row_count {
            None
        } else {
            let row = RowView::new(self.table, self.index);
            self.index += 1;
            Some(row)
        }
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Table {{ columns: {:?}, rows: {} }}",
            self.column_names(),
            self.row_count
        )
    }
}

fn type_tag(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Int64 => "<int>",
        ColumnType::Float64 => "<dbl>",
        ColumnType::String => "<chr>",
        ColumnType::Bool => "<lgl>",
        ColumnType::Categorical => "<fct>",
    }
}

/// Aligned text grid: a header line, a type line, then one line per row.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# A table: {} x {}", self.row_count, self.columns.len())?;

        let grid: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|c| {
                let mut cells = vec![c.name().to_string(), type_tag(c.column_type()).to_string()];
                cells.extend(c.iter().map(ToString::to_string));
                cells
            })
            .collect();
        let widths: Vec<usize> = grid
            .iter()
            .map(|cells| cells.iter().map(|s| s.chars().count()).max().unwrap_or(0))
            .collect();

        for line in 0..self.row_count + 2 {
            let cells: Vec<String> = grid
                .iter()
                .zip(&widths)
                .map(|(cells, width)| format!("{:>width$}", cells[line], width = *width))
                .collect();
            writeln!(f, "{}", cells.join("  ").trim_end())?;
        }
        Ok(())
    }
}
