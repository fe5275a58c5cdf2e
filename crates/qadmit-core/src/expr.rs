//! Filter predicate expressions.
//!
//! Predicates reference columns as `relation.attribute`; parsing resolves the
//! names through a [`Catalog`] so the lock model only ever sees ids.
//!
//! Supported syntax:
//! - comparisons `col OP literal` / `literal OP col` with OP ∈ {=, ==, !=, <>, <, <=, >, >=}
//! - `col BETWEEN low AND high`, `col IS NULL`, `col IS NOT NULL`
//! - arithmetic `+ - * /` inside comparisons
//! - `NOT`, `AND`, `OR` (OR binds loosest) and parentheses

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::error::{Error, Result};
use crate::id::{AttributeId, RelationId};
use crate::types::Scalar;

/// Fully-resolved column reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub relation: RelationId,
    pub attribute: AttributeId,
}

impl ColumnRef {
    pub const fn new(relation: RelationId, attribute: AttributeId) -> Self {
        Self {
            relation,
            attribute,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}.a{}", self.relation, self.attribute)
    }
}

/// Binary operators for expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Comparison operators
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical operators
    And,
    Or,
    // Arithmetic operators
    Add,
    Sub,
    Mul,
    Div,
}

impl BinOp {
    /// Parse a binary operator from a string.
    pub fn parse(op: &str) -> Result<Self> {
        match op {
            "==" | "=" => Ok(BinOp::Eq),
            "!=" | "<>" => Ok(BinOp::Ne),
            "<" => Ok(BinOp::Lt),
            "<=" => Ok(BinOp::Le),
            ">" => Ok(BinOp::Gt),
            ">=" => Ok(BinOp::Ge),
            "AND" | "and" | "&&" => Ok(BinOp::And),
            "OR" | "or" | "||" => Ok(BinOp::Or),
            "+" => Ok(BinOp::Add),
            "-" => Ok(BinOp::Sub),
            "*" => Ok(BinOp::Mul),
            "/" => Ok(BinOp::Div),
            _ => Err(Error::Parse(format!("unknown binary operator: {op}"))),
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    /// The operator that results from swapping the operands (`5 < x` ⇔ `x > 5`).
    pub fn flip(self) -> Self {
        match self {
            BinOp::Lt => BinOp::Gt,
            BinOp::Le => BinOp::Ge,
            BinOp::Gt => BinOp::Lt,
            BinOp::Ge => BinOp::Le,
            other => other,
        }
    }
}

/// Unary operators for expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    IsNull,
    IsNotNull,
}

/// Expression AST for filter predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Column reference: relation.attribute
    Column(ColumnRef),
    /// Literal value: 42, 'hello', true, etc.
    Literal(Scalar),
    /// Binary operation: left OP right
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation: OP arg
    UnaryOp { op: UnaryOp, arg: Box<Expr> },
    /// Inclusive range test: expr BETWEEN low AND high
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
    },
}

impl Expr {
    pub fn column(column: ColumnRef) -> Self {
        Expr::Column(column)
    }

    pub fn literal(value: Scalar) -> Self {
        Expr::Literal(value)
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::binary(BinOp::And, self, other)
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::binary(BinOp::Or, self, other)
    }

    /// Parse a predicate string, resolving columns through `catalog`.
    pub fn parse(text: &str, catalog: &dyn Catalog) -> Result<Self> {
        let tokens = tokenize(text)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            catalog,
        };
        let expr = parser.parse_or()?;
        if let Some(tok) = parser.peek() {
            return Err(Error::Parse(format!(
                "unexpected trailing token {tok:?} in '{text}'"
            )));
        }
        Ok(expr)
    }

    /// Every column referenced anywhere in this expression, in first-seen order.
    pub fn columns(&self) -> Vec<ColumnRef> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<ColumnRef>) {
        match self {
            Expr::Column(c) => {
                if !out.contains(c) {
                    out.push(*c);
                }
            }
            Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::UnaryOp { arg, .. } => arg.collect_columns(out),
            Expr::Between { expr, low, high } => {
                expr.collect_columns(out);
                low.collect_columns(out);
                high.collect_columns(out);
            }
        }
    }
}

// --- tokenizer ---

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Literal(Scalar),
    Op(String),
    LParen,
    RParen,
    And,
    Or,
    Not,
    Between,
    Is,
    Null,
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else if c == '\'' || c == '"' {
            let start = i + 1;
            let end = chars[start..]
                .iter()
                .position(|&ch| ch == c)
                .map(|p| start + p)
                .ok_or_else(|| Error::Parse(format!("unterminated string literal in '{text}'")))?;
            tokens.push(Token::Literal(Scalar::Str(chars[start..end].iter().collect())));
            i = end + 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let raw: String = chars[start..i].iter().collect();
            tokens.push(Token::Literal(parse_literal(&raw)?));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len()
                && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
            {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(match word.to_ascii_uppercase().as_str() {
                "AND" => Token::And,
                "OR" => Token::Or,
                "NOT" => Token::Not,
                "BETWEEN" => Token::Between,
                "IS" => Token::Is,
                "NULL" => Token::Null,
                "TRUE" => Token::Literal(Scalar::Bool(true)),
                "FALSE" => Token::Literal(Scalar::Bool(false)),
                _ => Token::Ident(word),
            });
        } else {
            let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
            let op = match two.as_str() {
                "==" | "!=" | "<>" | "<=" | ">=" | "&&" | "||" => two,
                _ => c.to_string(),
            };
            match op.as_str() {
                "&&" => tokens.push(Token::And),
                "||" => tokens.push(Token::Or),
                "!" => tokens.push(Token::Not),
                "=" | "==" | "!=" | "<>" | "<" | "<=" | ">" | ">=" | "+" | "-" | "*" | "/" => {
                    tokens.push(Token::Op(op.clone()))
                }
                _ => {
                    return Err(Error::Parse(format!(
                        "unknown operator '{op}' in '{text}'"
                    )))
                }
            }
            i += op.chars().count();
        }
    }
    Ok(tokens)
}

/// Parse a numeric literal into a Scalar value.
fn parse_literal(literal: &str) -> Result<Scalar> {
    let trimmed = literal.trim();

    // Try integer (i32 first, then i64)
    if let Ok(i) = trimmed.parse::<i32>() {
        return Ok(Scalar::I32(i));
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Ok(Scalar::I64(i));
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Ok(Scalar::F64(f));
    }

    Err(Error::Parse(format!("cannot parse '{literal}' as literal")))
}

// --- recursive descent ---

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    catalog: &'a dyn Catalog,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(Error::Parse(format!(
                "expected {expected:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&Token::Or) {
            let right = self.parse_and()?;
            left = left.or(right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&Token::And) {
            let right = self.parse_not()?;
            left = left.and(right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if self.eat(&Token::Not) {
            let arg = self.parse_not()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOp::Not,
                arg: Box::new(arg),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let left = self.parse_additive()?;
        match self.peek() {
            Some(Token::Op(op)) if BinOp::parse(op)?.is_comparison() => {
                let op = BinOp::parse(op)?;
                self.pos += 1;
                let right = self.parse_additive()?;
                Ok(Expr::binary(op, left, right))
            }
            Some(Token::Between) => {
                self.pos += 1;
                let low = self.parse_additive()?;
                self.expect(Token::And)?;
                let high = self.parse_additive()?;
                Ok(Expr::Between {
                    expr: Box::new(left),
                    low: Box::new(low),
                    high: Box::new(high),
                })
            }
            Some(Token::Is) => {
                self.pos += 1;
                let op = if self.eat(&Token::Not) {
                    UnaryOp::IsNotNull
                } else {
                    UnaryOp::IsNull
                };
                self.expect(Token::Null)?;
                Ok(Expr::UnaryOp {
                    op,
                    arg: Box::new(left),
                })
            }
            _ => Ok(left),
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op(op)) if op == "+" || op == "-" => BinOp::parse(op)?,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_term()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_primary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op(op)) if op == "*" || op == "/" => BinOp::parse(op)?,
                _ => break,
            };
            self.pos += 1;
            let right = self.parse_primary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Literal(v)) => Ok(Expr::Literal(v)),
            Some(Token::Null) => Ok(Expr::Literal(Scalar::Null)),
            Some(Token::Op(op)) if op == "-" => match self.next() {
                Some(Token::Literal(Scalar::I32(v))) => Ok(Expr::Literal(Scalar::I32(-v))),
                Some(Token::Literal(Scalar::I64(v))) => Ok(Expr::Literal(Scalar::I64(-v))),
                Some(Token::Literal(Scalar::F64(v))) => Ok(Expr::Literal(Scalar::F64(-v))),
                other => Err(Error::Parse(format!(
                    "expected numeric literal after '-', found {other:?}"
                ))),
            },
            Some(Token::Ident(name)) => Ok(Expr::Column(self.catalog.resolve_column(&name)?)),
            other => Err(Error::Parse(format!(
                "expected column, literal, or '(' but found {other:?}"
            ))),
        }
    }
}
