//! Requirement expression parsing.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::metric::Metric;

/// Comparison operator in a requirement expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// Whether the operator holds for a computed ordering.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Le => ordering != Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
        }
    }

    /// The operator's source form.
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        }
    }
}

/// A parsed requirement expression such as `>=3.5` or `==ubuntu`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    /// Comparison operator.
    pub op: CompareOp,
    /// Typed right-hand value.
    pub value: Metric,
}

// Two-character operators must come before their one-character prefixes.
const OPERATORS: [(&str, CompareOp); 6] = [
    ("==", CompareOp::Eq),
    ("!=", CompareOp::Ne),
    ("<=", CompareOp::Le),
    (">=", CompareOp::Ge),
    ("<", CompareOp::Lt),
    (">", CompareOp::Gt),
];

impl Expression {
    /// Parse a requirement expression of the form `<operator><value>`.
    pub fn parse(raw: &str) -> Result<Expression, Error> {
        let trimmed = raw.trim();

        for (token, op) in OPERATORS {
            if let Some(rest) = trimmed.strip_prefix(token) {
                if rest.is_empty() {
                    return Err(Error::BadExpression(raw.to_string()));
                }
                return Ok(Expression {
                    op,
                    value: Metric::literal(rest),
                });
            }
        }

        Err(Error::BadExpression(raw.to_string()))
    }
}
