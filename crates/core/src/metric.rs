//! Measured metric values and their comparison semantics.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::expr::CompareOp;

/// The evaluated result of probing a requirement on one server.
///
/// Probe output is numeric whenever every non-blank line of it parses as a
/// number; otherwise the raw text is kept so textual requirements (e.g.
/// equality on a hostname or a GPU model string) still work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Metric {
    /// Arithmetic mean of the numeric output lines.
    Number(f64),
    /// Raw output text, kept verbatim.
    Text(String),
}

impl Metric {
    /// Evaluate raw probe output into a metric.
    ///
    /// Splits on newlines, drops blank lines, and parses every remaining
    /// line as a number. If all lines parse, the result is their mean; if
    /// any line fails (or there are no lines at all), the original text is
    /// returned unchanged.
    pub fn evaluate(text: &str) -> Metric {
        let lines: Vec<&str> = text
            .split('\n')
            .filter(|line| !line.trim().is_empty())
            .collect();

        if lines.is_empty() {
            return Metric::Text(text.to_string());
        }

        let mut sum = 0.0;
        for line in &lines {
            match line.trim().parse::<f64>() {
                Ok(value) => sum += value,
                Err(_) => return Metric::Text(text.to_string()),
            }
        }

        Metric::Number(sum / lines.len() as f64)
    }

    /// Parse a literal value from a requirement expression.
    ///
    /// Recognizes integers and floats; anything else is kept as text.
    pub fn literal(raw: &str) -> Metric {
        let trimmed = raw.trim();

        if let Ok(value) = trimmed.parse::<i64>() {
            return Metric::Number(value as f64);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return Metric::Number(value);
        }

        Metric::Text(raw.to_string())
    }

    /// Compare this metric against a requirement value.
    ///
    /// Comparison follows the native semantics of the variant: numeric
    /// ordering for numbers, lexicographic ordering for text. Comparing a
    /// number against text (or a NaN against anything) fails with
    /// [`Error::Comparison`].
    pub fn satisfies(&self, op: CompareOp, value: &Metric) -> Result<bool, Error> {
        let ordering = match (self, value) {
            (Metric::Number(a), Metric::Number(b)) => a.partial_cmp(b),
            (Metric::Text(a), Metric::Text(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        };

        match ordering {
            Some(ordering) => Ok(op.holds(ordering)),
            None => Err(Error::Comparison {
                metric: self.render(),
                op: op.symbol(),
                value: value.render(),
            }),
        }
    }

    /// Render the metric for log and error messages.
    pub fn render(&self) -> String {
        match self {
            Metric::Number(n) => n.to_string(),
            Metric::Text(t) => t.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_all_numeric_lines() {
        assert_eq!(Metric::evaluate("1\n2\n3"), Metric::Number(2.0));
    }

    #[test]
    fn test_evaluate_skips_blank_lines() {
        assert_eq!(Metric::evaluate("4\n\n  \n8\n"), Metric::Number(6.0));
    }

    #[test]
    fn test_evaluate_single_float() {
        assert_eq!(Metric::evaluate("3.5\n"), Metric::Number(3.5));
    }

    #[test]
    fn test_evaluate_non_numeric_returns_original() {
        let text = "Tesla V100\n";
        assert_eq!(Metric::evaluate(text), Metric::Text(text.to_string()));
    }

    #[test]
    fn test_evaluate_mixed_returns_original() {
        let text = "1\ntwo\n3";
        assert_eq!(Metric::evaluate(text), Metric::Text(text.to_string()));
    }

    #[test]
    fn test_evaluate_empty_returns_original() {
        assert_eq!(Metric::evaluate(""), Metric::Text(String::new()));
    }

    #[test]
    fn test_evaluate_is_idempotent_on_text() {
        let first = Metric::evaluate("a\nb");
        let second = Metric::evaluate("a\nb");
        assert_eq!(first, second);
    }

    #[test]
    fn test_literal_integer() {
        assert_eq!(Metric::literal("4"), Metric::Number(4.0));
    }

    #[test]
    fn test_literal_float_with_whitespace() {
        assert_eq!(Metric::literal(" 3.5 "), Metric::Number(3.5));
    }

    #[test]
    fn test_literal_text() {
        assert_eq!(Metric::literal("ubuntu"), Metric::Text("ubuntu".to_string()));
    }

    #[test]
    fn test_satisfies_numeric() {
        let metric = Metric::Number(4.0);
        assert!(metric.satisfies(CompareOp::Ge, &Metric::Number(3.5)).unwrap());
        assert!(!metric.satisfies(CompareOp::Lt, &Metric::Number(3.5)).unwrap());
        assert!(metric.satisfies(CompareOp::Ne, &Metric::Number(3.5)).unwrap());
    }

    #[test]
    fn test_satisfies_text() {
        let metric = Metric::Text("ubuntu".to_string());
        let value = Metric::Text("ubuntu".to_string());
        assert!(metric.satisfies(CompareOp::Eq, &value).unwrap());
        assert!(!metric.satisfies(CompareOp::Ne, &value).unwrap());
    }

    #[test]
    fn test_satisfies_cross_variant_fails() {
        let metric = Metric::Number(1.0);
        let value = Metric::Text("one".to_string());
        assert!(metric.satisfies(CompareOp::Eq, &value).is_err());
    }

    #[test]
    fn test_satisfies_nan_fails() {
        let metric = Metric::Number(f64::NAN);
        assert!(metric.satisfies(CompareOp::Gt, &Metric::Number(0.0)).is_err());
    }
}
