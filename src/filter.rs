//! Row filtering.
//!
//! Kept rows are exactly those whose predicate is `Truth::True`; their
//! relative order is unchanged.

use crate::error::Result;
use crate::expr::{eval_expr, parse_expr, Expr, Truth};
use crate::table::{RowView, Table};
use log::debug;

impl Table {
    /// Keep rows matching an expression. Column references and operand
    /// types are checked before any row is evaluated.
    pub fn filter(&self, expr: &Expr) -> Result<Table> {
        expr.check(self)?;
        self.filter_by(|row| eval_expr(expr, row))
    }

    /// Parse and apply a filter expression such as `"status == 'stayed'"`.
    pub fn filter_expr(&self, text: &str) -> Result<Table> {
        let expr = parse_expr(text)?;
        self.filter(&expr)
    }

    /// Keep rows matching every predicate, evaluated left to right. A row
    /// stops being evaluated at its first predicate that is not true.
    pub fn filter_all(&self, exprs: &[Expr]) -> Result<Table> {
        for expr in exprs {
            expr.check(self)?;
        }
        self.filter_by(|row| {
            for expr in exprs {
                let truth = eval_expr(expr, row)?;
                if !truth.is_true() {
                    return Ok(truth);
                }
            }
            Ok(Truth::True)
        })
    }

    /// Keep rows for which a closure returns true. The closure may return a
    /// `bool`, an `Option<bool>` (where `None` drops the row) or a [`Truth`].
    ///
    /// ```
    /// use tidytable::{Column, ColumnValue, Table};
    ///
    /// let table = Table::from_columns(vec![Column::infer(
    ///     "price",
    ///     vec![ColumnValue::from(100.0), ColumnValue::Null, ColumnValue::from(150.0)],
    /// )
    /// .unwrap()])
    /// .unwrap();
    ///
    /// let pricey = table.filter_by(|row| Ok(row.get_f64("price")?.map(|p| p > 120.0))).unwrap();
    /// assert_eq!(pricey.len(), 1);
    /// ```
    pub fn filter_by<F, T>(&self, predicate: F) -> Result<Table>
    where
        F: Fn(&RowView<'_>) -> Result<T>,
        T: Into<Truth>,
    {
        let mut keep = Vec::new();
        for row in self.iter_rows() {
            if predicate(&row)?.into().is_true() {
                keep.push(row.index());
            }
        }
        debug!("filter: kept {} of {} rows", keep.len(), self.len());
        Ok(self.take_rows(&keep))
    }
}
