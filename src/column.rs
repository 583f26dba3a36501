//! TidyTable column store.
//!
//! A Column is a named, typed, ordered sequence of values. Every slot holds
//! either a value of the column's type or the missing marker
//! (`ColumnValue::Null`). Categorical columns additionally carry an ordered
//! list of permitted levels, which defines their sort order.

use crate::error::{Result, TableError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Column data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Int64,
    Float64,
    String,
    Bool,
    Categorical,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Int64 | ColumnType::Float64)
    }

    /// Text-like columns hold `ColumnValue::String` payloads.
    pub fn is_textual(self) -> bool {
        matches!(self, ColumnType::String | ColumnType::Categorical)
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Int64 => "int64",
            ColumnType::Float64 => "float64",
            ColumnType::String => "string",
            ColumnType::Bool => "bool",
            ColumnType::Categorical => "categorical",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell value. `Null` is the missing marker for every type.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Int64(i64),
    Float64(f64),
    String(String),
    Bool(bool),
    Null,
}

impl ColumnValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ColumnValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ColumnValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of the value: integers widen to `f64`.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            ColumnValue::Int64(v) => Some(*v as f64),
            ColumnValue::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ColumnValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ColumnValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnValue::Int64(_) => "int64",
            ColumnValue::Float64(_) => "float64",
            ColumnValue::String(_) => "string",
            ColumnValue::Bool(_) => "bool",
            ColumnValue::Null => "null",
        }
    }

    /// NaN is not a value a column can hold; see [`Column::push`].
    pub fn is_nan(&self) -> bool {
        matches!(self, ColumnValue::Float64(v) if v.is_nan())
    }

    /// Natural ordering of two present values. Returns `None` when either side
    /// is missing or the payloads are not comparable. Reals use a total order.
    pub fn compare(&self, other: &ColumnValue) -> Option<Ordering> {
        match (self, other) {
            (ColumnValue::Int64(a), ColumnValue::Int64(b)) => Some(a.cmp(b)),
            (ColumnValue::String(a), ColumnValue::String(b)) => Some(a.cmp(b)),
            (ColumnValue::Bool(a), ColumnValue::Bool(b)) => Some(a.cmp(b)),
            (a, b) => {
                let (a, b) = (a.to_f64()?, b.to_f64()?);
                Some(if a == b { Ordering::Equal } else { a.total_cmp(&b) })
            }
        }
    }

    /// Hashable identity used for join and pivot lookups. Integral reals hash
    /// like the equal integer so `1` and `1.0` match.
    pub(crate) fn hash_key(&self) -> HashKey {
        match self {
            ColumnValue::Int64(v) => HashKey::Int(*v),
            ColumnValue::Float64(f) => {
                if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    HashKey::Int(*f as i64)
                } else {
                    HashKey::Float(f.to_bits())
                }
            }
            ColumnValue::String(s) => HashKey::Text(s.clone()),
            ColumnValue::Bool(b) => HashKey::Bool(*b),
            ColumnValue::Null => HashKey::Null,
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Int64(v) => write!(f, "{}", v),
            ColumnValue::Float64(v) => write!(f, "{}", v),
            ColumnValue::String(v) => f.write_str(v),
            ColumnValue::Bool(v) => write!(f, "{}", v),
            ColumnValue::Null => f.write_str("NA"),
        }
    }
}

impl From<i64> for ColumnValue {
    fn from(v: i64) -> Self {
        ColumnValue::Int64(v)
    }
}

impl From<i32> for ColumnValue {
    fn from(v: i32) -> Self {
        ColumnValue::Int64(v as i64)
    }
}

impl From<f64> for ColumnValue {
    fn from(v: f64) -> Self {
        ColumnValue::Float64(v)
    }
}

impl From<bool> for ColumnValue {
    fn from(v: bool) -> Self {
        ColumnValue::Bool(v)
    }
}

impl From<&str> for ColumnValue {
    fn from(v: &str) -> Self {
        ColumnValue::String(v.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(v: String) -> Self {
        ColumnValue::String(v)
    }
}

impl<T: Into<ColumnValue>> From<Option<T>> for ColumnValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ColumnValue::Null, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum HashKey {
    Int(i64),
    Float(u64),
    Text(String),
    Bool(bool),
    Null,
}

/// A named, typed column of values.
#[derive(Clone, PartialEq)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    values: Vec<ColumnValue>,
    /// Declared level order, only for categorical columns
    levels: Option<Vec<String>>,
}

impl Column {
    /// Create an empty column. Categorical columns created this way have no
    /// levels; use [`Column::categorical`] to declare them.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let levels = (column_type == ColumnType::Categorical).then(Vec::new);
        Column {
            name: name.into(),
            column_type,
            values: Vec::new(),
            levels,
        }
    }

    /// Create an empty categorical column with the given level order.
    pub fn categorical(name: impl Into<String>, levels: Vec<String>) -> Self {
        Column {
            name: name.into(),
            column_type: ColumnType::Categorical,
            values: Vec::new(),
            levels: Some(levels),
        }
    }

    pub fn from_values(
        name: impl Into<String>,
        column_type: ColumnType,
        values: Vec<ColumnValue>,
    ) -> Result<Self> {
        let mut column = Column::new(name, column_type);
        column.extend(values)?;
        Ok(column)
    }

    /// Build a categorical column; every present value must be a level.
    pub fn factor(
        name: impl Into<String>,
        levels: Vec<String>,
        values: Vec<ColumnValue>,
    ) -> Result<Self> {
        let mut column = Column::categorical(name, levels);
        column.extend(values)?;
        Ok(column)
    }

    /// Build a column whose type is inferred from the values themselves.
    ///
    /// Integers mixed with reals widen to `Float64`; a column of nothing but
    /// missing values is typed `String`.
    pub fn infer(name: impl Into<String>, values: Vec<ColumnValue>) -> Result<Self> {
        let name = name.into();
        let mut inferred: Option<ColumnType> = None;

        for value in &values {
            let found = match value {
                ColumnValue::Null => continue,
                ColumnValue::Int64(_) => ColumnType::Int64,
                ColumnValue::Float64(_) => ColumnType::Float64,
                ColumnValue::String(_) => ColumnType::String,
                ColumnValue::Bool(_) => ColumnType::Bool,
            };
            inferred = Some(match inferred {
                None => found,
                Some(prev) if prev == found => prev,
                Some(prev) if prev.is_numeric() && found.is_numeric() => ColumnType::Float64,
                Some(prev) => {
                    return Err(TableError::type_mismatch(
                        &name,
                        format!("cannot combine {} and {} values", prev, found),
                    ))
                }
            });
        }

        Column::from_values(name, inferred.unwrap_or(ColumnType::String), values)
    }

    /// Empty column with the same type and levels under another name.
    pub(crate) fn empty_like(&self, name: &str) -> Column {
        Column {
            name: name.to_string(),
            column_type: self.column_type,
            values: Vec::new(),
            levels: self.levels.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn levels(&self) -> Option<&[String]> {
        self.levels.as_deref()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[ColumnValue] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&ColumnValue> {
        self.values.get(index)
    }

    /// Numeric access without cloning. `None` for missing or non-numeric.
    #[inline]
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(ColumnValue::to_f64)
    }

    #[inline]
    pub fn is_null_at(&self, index: usize) -> bool {
        self.values.get(index).map_or(false, ColumnValue::is_null)
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnValue> {
        self.values.iter()
    }

    /// Position of a level in the declared order.
    pub fn level_rank(&self, value: &str) -> Option<usize> {
        self.levels.as_ref()?.iter().position(|l| l == value)
    }

    fn validate_value(&self, value: ColumnValue) -> Result<ColumnValue> {
        match (value, self.column_type) {
            (ColumnValue::Null, _) => Ok(ColumnValue::Null),
            // NaN is stored as missing so comparisons stay three-valued
            (ColumnValue::Float64(f), ColumnType::Float64) if f.is_nan() => Ok(ColumnValue::Null),
            (v @ ColumnValue::Int64(_), ColumnType::Int64) => Ok(v),
            (ColumnValue::Int64(n), ColumnType::Float64) => Ok(ColumnValue::Float64(n as f64)),
            (v @ ColumnValue::Float64(_), ColumnType::Float64) => Ok(v),
            (v @ ColumnValue::String(_), ColumnType::String) => Ok(v),
            (v @ ColumnValue::Bool(_), ColumnType::Bool) => Ok(v),
            (ColumnValue::String(s), ColumnType::Categorical) => {
                if self.level_rank(&s).is_some() {
                    Ok(ColumnValue::String(s))
                } else {
                    Err(TableError::type_mismatch(
                        &self.name,
                        format!("'{}' is not a declared level", s),
                    ))
                }
            }
            (v, expected) => Err(TableError::type_mismatch(
                &self.name,
                format!("expected {}, got {} value", expected, v.type_name()),
            )),
        }
    }

    /// Check a value against the column type without storing it.
    pub(crate) fn check(&self, value: &ColumnValue) -> Result<()> {
        self.validate_value(value.clone()).map(|_| ())
    }

    /// Append a value. A NaN real is stored as the missing marker.
    pub fn push(&mut self, value: ColumnValue) -> Result<()> {
        let value = self.validate_value(value)?;
        self.values.push(value);
        Ok(())
    }

    fn extend(&mut self, values: Vec<ColumnValue>) -> Result<()> {
        self.values.reserve(values.len());
        for value in values {
            self.push(value)?;
        }
        Ok(())
    }

    /// Clone of this column under a new name.
    pub fn with_name(&self, name: impl Into<String>) -> Column {
        Column {
            name: name.into(),
            ..self.clone()
        }
    }

    pub(crate) fn rename(mut self, name: impl Into<String>) -> Column {
        self.name = name.into();
        self
    }

    /// Gather the given rows, in the given order.
    pub(crate) fn take(&self, indices: &[usize]) -> Column {
        Column {
            name: self.name.clone(),
            column_type: self.column_type,
            values: indices.iter().map(|&i| self.values[i].clone()).collect(),
            levels: self.levels.clone(),
        }
    }

    /// Gather rows where `None` produces a missing value.
    pub(crate) fn take_optional(&self, indices: &[Option<usize>]) -> Column {
        Column {
            name: self.name.clone(),
            column_type: self.column_type,
            values: indices
                .iter()
                .map(|i| i.map_or(ColumnValue::Null, |i| self.values[i].clone()))
                .collect(),
            levels: self.levels.clone(),
        }
    }

    /// Ordering of two present values under this column's semantics:
    /// categorical values follow the declared level order.
    pub fn compare_values(&self, a: &ColumnValue, b: &ColumnValue) -> Option<Ordering> {
        if self.column_type == ColumnType::Categorical {
            if let (ColumnValue::String(a), ColumnValue::String(b)) = (a, b) {
                return Some(self.level_rank(a)?.cmp(&self.level_rank(b)?));
            }
        }
        a.compare(b)
    }

    /// Ascending comparison of two rows with missing values last.
    pub(crate) fn cmp_rows(&self, a: usize, b: usize) -> Ordering {
        match (&self.values[a], &self.values[b]) {
            (ColumnValue::Null, ColumnValue::Null) => Ordering::Equal,
            (ColumnValue::Null, _) => Ordering::Greater,
            (_, ColumnValue::Null) => Ordering::Less,
            (va, vb) => self.compare_values(va, vb).unwrap_or(Ordering::Equal),
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Column {{ name: '{}', type: {:?}, len: {} }}",
            self.name,
            self.column_type,
            self.len()
        )
    }
}
