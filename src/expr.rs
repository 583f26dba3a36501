//! Row predicates with three-valued logic.
//!
//! Predicates can be built in code with [`col`] or parsed from text:
//! - `status == 'stayed'`
//! - `price >= 100 AND nights > 2`
//! - `arrival < departure`
//! - `country IN ('PRT', 'GBR')`
//! - `agent IS NULL OR NOT (deposit == 'Refundable')`
//!
//! A comparison involving a missing value is `Unknown`. Only rows whose
//! predicate is strictly `True` survive a filter.

use crate::column::{Column, ColumnType, ColumnValue};
use crate::error::{Result, TableError};
use crate::table::{RowView, Table};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Not;
use std::str::FromStr;

/// SQL-style truth value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    True,
    False,
    Unknown,
}

impl Truth {
    pub fn is_true(self) -> bool {
        self == Truth::True
    }

    pub fn and(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::False, _) | (_, Truth::False) => Truth::False,
            (Truth::True, Truth::True) => Truth::True,
            _ => Truth::Unknown,
        }
    }

    pub fn or(self, other: Truth) -> Truth {
        match (self, other) {
            (Truth::True, _) | (_, Truth::True) => Truth::True,
            (Truth::False, Truth::False) => Truth::False,
            _ => Truth::Unknown,
        }
    }
}

impl Not for Truth {
    type Output = Truth;

    fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b {
            Truth::True
        } else {
            Truth::False
        }
    }
}

/// `None` is the missing case and maps to `Unknown`.
impl From<Option<bool>> for Truth {
    fn from(b: Option<bool>) -> Self {
        b.map_or(Truth::Unknown, Truth::from)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    fn is_equality(self) -> bool {
        matches!(self, CompareOp::Eq | CompareOp::Ne)
    }

    fn test(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(ColumnValue),
    Column(String),
}

/// A parsed or built row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Compare {
        column: String,
        op: CompareOp,
        operand: Operand,
    },
    In {
        column: String,
        values: Vec<ColumnValue>,
        negated: bool,
    },
    IsNull { column: String },
    IsNotNull { column: String },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }

    /// Validate column references and operand types against a table.
    pub fn check(&self, table: &Table) -> Result<()> {
        match self {
            Expr::Compare {
                column,
                op,
                operand,
            } => {
                let left = table.column(column)?;
                match operand {
                    Operand::Literal(value) => check_literal(left, *op, value),
                    Operand::Column(other) => {
                        let right = table.column(other)?;
                        if same_family(left.column_type(), right.column_type()) {
                            Ok(())
                        } else {
                            Err(TableError::type_mismatch(
                                column,
                                format!(
                                    "cannot compare {} column with {} column '{}'",
                                    left.column_type(),
                                    right.column_type(),
                                    other
                                ),
                            ))
                        }
                    }
                }
            }
            Expr::In { column, values, .. } => {
                let left = table.column(column)?;
                values
                    .iter()
                    .try_for_each(|v| check_literal(left, CompareOp::Eq, v))
            }
            Expr::IsNull { column } | Expr::IsNotNull { column } => {
                table.column(column).map(|_| ())
            }
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.check(table)?;
                r.check(table)
            }
            Expr::Not(inner) => inner.check(table),
        }
    }

    /// Column names referenced by the expression, in first-mention order.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns(&self, columns: &mut Vec<String>) {
        fn add(columns: &mut Vec<String>, name: &str) {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
        match self {
            Expr::Compare {
                column, operand, ..
            } => {
                add(columns, column);
                if let Operand::Column(other) = operand {
                    add(columns, other);
                }
            }
            Expr::In { column, .. } | Expr::IsNull { column } | Expr::IsNotNull { column } => {
                add(columns, column)
            }
            Expr::And(l, r) | Expr::Or(l, r) => {
                l.collect_columns(columns);
                r.collect_columns(columns);
            }
            Expr::Not(inner) => inner.collect_columns(columns),
        }
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

impl FromStr for Expr {
    type Err = TableError;

    fn from_str(s: &str) -> Result<Expr> {
        parse_expr(s)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare {
                column,
                op,
                operand,
            } => {
                write!(f, "{} {} ", column, op.symbol())?;
                match operand {
                    Operand::Literal(v) => write_literal(f, v),
                    Operand::Column(c) => f.write_str(c),
                }
            }
            Expr::In {
                column,
                values,
                negated,
            } => {
                write!(f, "{} {}IN (", column, if *negated { "NOT " } else { "" })?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_literal(f, v)?;
                }
                f.write_str(")")
            }
            Expr::IsNull { column } => write!(f, "{} IS NULL", column),
            Expr::IsNotNull { column } => write!(f, "{} IS NOT NULL", column),
            Expr::And(l, r) => write!(f, "({} AND {})", l, r),
            Expr::Or(l, r) => write!(f, "({} OR {})", l, r),
            Expr::Not(inner) => write!(f, "NOT {}", inner),
        }
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &ColumnValue) -> fmt::Result {
    match value {
        ColumnValue::String(s) => write!(f, "'{}'", s.replace('\'', "\\'")),
        ColumnValue::Null => f.write_str("NULL"),
        other => write!(f, "{}", other),
    }
}

/// Start a predicate on a column.
///
/// ```
/// use tidytable::col;
///
/// let stayed_and_pricey = col("status").eq("stayed").and(col("price").gt(100));
/// assert_eq!(stayed_and_pricey.to_string(), "(status == 'stayed' AND price > 100)");
/// ```
pub fn col(name: &str) -> ColumnRef {
    ColumnRef(name.to_string())
}

/// A column awaiting a comparison; see [`col`].
#[derive(Debug, Clone)]
pub struct ColumnRef(String);

impl ColumnRef {
    fn literal(self, op: CompareOp, value: impl Into<ColumnValue>) -> Expr {
        Expr::Compare {
            column: self.0,
            op,
            operand: Operand::Literal(value.into()),
        }
    }

    pub fn eq(self, value: impl Into<ColumnValue>) -> Expr {
        self.literal(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<ColumnValue>) -> Expr {
        self.literal(CompareOp::Ne, value)
    }

    pub fn lt(self, value: impl Into<ColumnValue>) -> Expr {
        self.literal(CompareOp::Lt, value)
    }

    pub fn le(self, value: impl Into<ColumnValue>) -> Expr {
        self.literal(CompareOp::Le, value)
    }

    pub fn gt(self, value: impl Into<ColumnValue>) -> Expr {
        self.literal(CompareOp::Gt, value)
    }

    pub fn ge(self, value: impl Into<ColumnValue>) -> Expr {
        self.literal(CompareOp::Ge, value)
    }

    /// Compare against another column of the same row.
    pub fn compare_column(self, op: CompareOp, other: &str) -> Expr {
        Expr::Compare {
            column: self.0,
            op,
            operand: Operand::Column(other.to_string()),
        }
    }

    pub fn is_in<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<ColumnValue>,
    {
        Expr::In {
            column: self.0,
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in<I, V>(self, values: I) -> Expr
    where
        I: IntoIterator<Item = V>,
        V: Into<ColumnValue>,
    {
        Expr::In {
            column: self.0,
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull { column: self.0 }
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull { column: self.0 }
    }
}

fn same_family(a: ColumnType, b: ColumnType) -> bool {
    (a.is_numeric() && b.is_numeric()) || (a.is_textual() && b.is_textual()) || a == b
}

fn check_literal(column: &Column, op: CompareOp, value: &ColumnValue) -> Result<()> {
    let column_type = column.column_type();
    let ok = match value {
        ColumnValue::Null => true,
        ColumnValue::Int64(_) | ColumnValue::Float64(_) => column_type.is_numeric(),
        ColumnValue::Bool(_) => column_type == ColumnType::Bool,
        ColumnValue::String(s) if column_type == ColumnType::Categorical => {
            if !op.is_equality() && column.level_rank(s).is_none() {
                return Err(TableError::type_mismatch(
                    column.name(),
                    format!("'{}' is not a level, cannot order against it", s),
                ));
            }
            true
        }
        ColumnValue::String(_) => column_type == ColumnType::String,
    };
    if ok {
        Ok(())
    } else {
        Err(TableError::type_mismatch(
            column.name(),
            format!(
                "cannot compare {} column with {} literal",
                column_type,
                value.type_name()
            ),
        ))
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Not,
    Is,
    In,
    Comma,
    LParen,
    RParen,
    Eof,
}

struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        self.pos += 1;
        c
    }

    /// Consume `second` if it follows, choosing between two tokens.
    fn either(&mut self, second: char, matched: Token, single: Token) -> Token {
        self.bump();
        if self.peek() == Some(second) {
            self.bump();
            matched
        } else {
            single
        }
    }

    fn read_ident(&mut self) -> String {
        let mut ident = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                ident.push(c);
                self.bump();
            } else {
                break;
            }
        }
        ident
    }

    fn read_quoted_ident(&mut self) -> Result<Token> {
        self.bump();
        let mut ident = String::new();
        while let Some(c) = self.bump() {
            if c == '`' {
                return Ok(Token::Ident(ident));
            }
            ident.push(c);
        }
        Err(TableError::Parse("unterminated quoted column name".to_string()))
    }

    fn read_number(&mut self, negative: bool) -> Result<Token> {
        let mut text = String::new();
        if negative {
            text.push('-');
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !is_float {
                is_float = true;
                text.push(c);
            } else {
                break;
            }
            self.bump();
        }

        let parsed = if is_float {
            text.parse().map(Token::Float).ok()
        } else {
            text.parse().map(Token::Int).ok()
        };
        parsed.ok_or_else(|| TableError::Parse(format!("invalid number '{}'", text)))
    }

    fn read_string(&mut self, quote: char) -> Result<Token> {
        self.bump();
        let mut s = String::new();
        while let Some(c) = self.bump() {
            if c == quote {
                return Ok(Token::String(s));
            } else if c == '\\' {
                match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some(escaped) => s.push(escaped),
                    None => break,
                }
            } else {
                s.push(c);
            }
        }
        Err(TableError::Parse("unterminated string literal".to_string()))
    }

    fn next_token(&mut self) -> Result<Token> {
        while self.peek().map_or(false, char::is_whitespace) {
            self.bump();
        }

        let c = match self.peek() {
            None => return Ok(Token::Eof),
            Some(c) => c,
        };
        match c {
            '(' => {
                self.bump();
                Ok(Token::LParen)
            }
            ')' => {
                self.bump();
                Ok(Token::RParen)
            }
            ',' => {
                self.bump();
                Ok(Token::Comma)
            }
            // `=` and `==` both mean equality
            '=' => Ok(self.either('=', Token::Eq, Token::Eq)),
            '!' => Ok(self.either('=', Token::Ne, Token::Not)),
            '<' => Ok(self.either('=', Token::Le, Token::Lt)),
            '>' => Ok(self.either('=', Token::Ge, Token::Gt)),
            '\'' | '"' => self.read_string(c),
            '`' => self.read_quoted_ident(),
            '-' if self.peek_at(1).map_or(false, |d| d.is_ascii_digit() || d == '.') => {
                self.bump();
                self.read_number(true)
            }
            _ if c.is_ascii_digit() => self.read_number(false),
            _ if c.is_alphabetic() || c == '_' => {
                let ident = self.read_ident();
                Ok(match ident.to_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    "IS" => Token::Is,
                    "IN" => Token::In,
                    "NULL" | "NA" => Token::Null,
                    "TRUE" => Token::Bool(true),
                    "FALSE" => Token::Bool(false),
                    _ => Token::Ident(ident),
                })
            }
            _ => Err(TableError::Parse(format!("unexpected character '{}'", c))),
        }
    }
}

// ============================================================================
// Parser
// ============================================================================

/// Precedence, lowest first: OR, AND, NOT, comparison.
struct Parser {
    lexer: Lexer,
    current: Token,
}

impl Parser {
    fn new(input: &str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Parser { lexer, current })
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.current == expected {
            self.advance()
        } else {
            Err(TableError::Parse(format!(
                "expected {:?}, found {:?}",
                expected, self.current
            )))
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.current == Token::Or {
            self.advance()?;
            left = left.or(self.parse_and()?);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.current == Token::And {
            self.advance()?;
            left = left.and(self.parse_not()?);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.current == Token::Not {
            self.advance()?;
            Ok(!self.parse_not()?)
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        if self.current == Token::LParen {
            self.advance()?;
            let expr = self.parse_or()?;
            self.expect(Token::RParen)?;
            return Ok(expr);
        }

        let column = match &self.current {
            Token::Ident(name) => name.clone(),
            other => {
                return Err(TableError::Parse(format!(
                    "expected column name, found {:?}",
                    other
                )))
            }
        };
        self.advance()?;

        match self.current {
            Token::Is => {
                self.advance()?;
                let negated = self.current == Token::Not;
                if negated {
                    self.advance()?;
                }
                self.expect(Token::Null)?;
                return Ok(if negated {
                    Expr::IsNotNull { column }
                } else {
                    Expr::IsNull { column }
                });
            }
            Token::In => {
                self.advance()?;
                let values = self.parse_list()?;
                return Ok(Expr::In {
                    column,
                    values,
                    negated: false,
                });
            }
            Token::Not => {
                self.advance()?;
                self.expect(Token::In)?;
                let values = self.parse_list()?;
                return Ok(Expr::In {
                    column,
                    values,
                    negated: true,
                });
            }
            _ => {}
        }

        let op = match self.current {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            ref other => {
                return Err(TableError::Parse(format!(
                    "expected comparison operator after '{}', found {:?}",
                    column, other
                )))
            }
        };
        self.advance()?;

        let operand = match &self.current {
            Token::Ident(name) => Operand::Column(name.clone()),
            _ => Operand::Literal(self.literal()?),
        };
        self.advance()?;

        Ok(Expr::Compare {
            column,
            op,
            operand,
        })
    }

    /// The current token as a literal, without consuming it.
    fn literal(&self) -> Result<ColumnValue> {
        match &self.current {
            Token::Int(n) => Ok(ColumnValue::Int64(*n)),
            Token::Float(f) => Ok(ColumnValue::Float64(*f)),
            Token::String(s) => Ok(ColumnValue::String(s.clone())),
            Token::Bool(b) => Ok(ColumnValue::Bool(*b)),
            Token::Null => Ok(ColumnValue::Null),
            other => Err(TableError::Parse(format!(
                "expected literal value, found {:?}",
                other
            ))),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<ColumnValue>> {
        self.expect(Token::LParen)?;
        let mut values = Vec::new();
        if self.current == Token::RParen {
            self.advance()?;
            return Ok(values);
        }
        loop {
            values.push(self.literal()?);
            self.advance()?;
            match self.current {
                Token::Comma => self.advance()?,
                Token::RParen => {
                    self.advance()?;
                    return Ok(values);
                }
                ref other => {
                    return Err(TableError::Parse(format!(
                        "expected ',' or ')' in value list, found {:?}",
                        other
                    )))
                }
            }
        }
    }
}

/// Parse an expression string.
pub fn parse_expr(input: &str) -> Result<Expr> {
    let mut parser = Parser::new(input)?;
    let expr = parser.parse_or()?;
    if parser.current != Token::Eof {
        return Err(TableError::Parse(format!(
            "unexpected {:?} after expression",
            parser.current
        )));
    }
    Ok(expr)
}

// ============================================================================
// Evaluation
// ============================================================================

/// Evaluate a predicate against one row. AND and OR short-circuit left to
/// right once the outcome is decided.
pub fn eval_expr(expr: &Expr, row: &RowView<'_>) -> Result<Truth> {
    match expr {
        Expr::Compare {
            column,
            op,
            operand,
        } => {
            let left = row.table().column(column)?;
            let a = row.get(column)?;
            let ordering = match operand {
                Operand::Literal(b) => {
                    if a.is_null() || b.is_null() || b.is_nan() {
                        return Ok(Truth::Unknown);
                    }
                    left.compare_values(a, b).or_else(|| a.compare(b))
                }
                Operand::Column(other) => {
                    let right = row.table().column(other)?;
                    let b = row.get(other)?;
                    if a.is_null() || b.is_null() {
                        return Ok(Truth::Unknown);
                    }
                    if left.levels().is_some() && left.levels() == right.levels() {
                        left.compare_values(a, b)
                    } else {
                        a.compare(b)
                    }
                }
            };
            match ordering {
                Some(ordering) => Ok(Truth::from(op.test(ordering))),
                None => Err(TableError::type_mismatch(
                    column,
                    format!("cannot compare {} with {}", a.type_name(), describe(operand)),
                )),
            }
        }
        Expr::In {
            column,
            values,
            negated,
        } => {
            let a = row.get(column)?;
            if a.is_null() {
                return Ok(Truth::Unknown);
            }
            let found = values
                .iter()
                .any(|v| a.compare(v) == Some(Ordering::Equal));
            let truth = if found {
                Truth::True
            } else if values.iter().any(|v| v.is_null() || v.is_nan()) {
                Truth::Unknown
            } else {
                Truth::False
            };
            Ok(if *negated { !truth } else { truth })
        }
        Expr::IsNull { column } => Ok(Truth::from(row.get(column)?.is_null())),
        Expr::IsNotNull { column } => Ok(Truth::from(!row.get(column)?.is_null())),
        Expr::And(l, r) => {
            let left = eval_expr(l, row)?;
            if left == Truth::False {
                return Ok(Truth::False);
            }
            Ok(left.and(eval_expr(r, row)?))
        }
        Expr::Or(l, r) => {
            let left = eval_expr(l, row)?;
            if left == Truth::True {
                return Ok(Truth::True);
            }
            Ok(left.or(eval_expr(r, row)?))
        }
        Expr::Not(inner) => Ok(!eval_expr(inner, row)?),
    }
}

fn describe(operand: &Operand) -> String {
    match operand {
        Operand::Literal(v) => format!("{} literal", v.type_name()),
        Operand::Column(c) => format!("column '{}'", c),
    }
}
