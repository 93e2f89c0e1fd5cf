//! Filter expressions and result capping for usage records
//!
//! An expression is an optional comparison operator followed by a decimal
//! threshold: `>80`, `<=50`, `=90`. A bare number means `>`, so `50` is
//! the same as `>50`. The empty string means no filtering.

use crate::error::{Error, Result};
use crate::models::UsageRecord;
use std::fmt;

/// Comparison applied to a record's percentage used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Equal,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Equal => "=",
        }
    }

    fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Comparison::Greater => value > threshold,
            Comparison::GreaterOrEqual => value >= threshold,
            Comparison::Less => value < threshold,
            Comparison::LessOrEqual => value <= threshold,
            Comparison::Equal => value == threshold,
        }
    }
}

/// A parsed filter expression
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterExpression {
    pub comparison: Comparison,
    pub threshold: f64,
}

impl FilterExpression {
    pub fn new(comparison: Comparison, threshold: f64) -> Self {
        Self {
            comparison,
            threshold,
        }
    }

    /// Parse the textual form. Returns `Ok(None)` for an empty expression.
    pub fn parse(input: &str) -> Result<Option<Self>> {
        let expr = input.trim();
        if expr.is_empty() {
            return Ok(None);
        }

        let (comparison, number) = if let Some(rest) = expr.strip_prefix(">=") {
            (Comparison::GreaterOrEqual, rest)
        } else if let Some(rest) = expr.strip_prefix("<=") {
            (Comparison::LessOrEqual, rest)
        } else if let Some(rest) = expr.strip_prefix('>') {
            (Comparison::Greater, rest)
        } else if let Some(rest) = expr.strip_prefix('<') {
            (Comparison::Less, rest)
        } else if let Some(rest) = expr.strip_prefix('=') {
            (Comparison::Equal, rest)
        } else {
            (Comparison::Greater, expr)
        };

        let threshold = number
            .trim()
            .parse::<f64>()
            .map_err(|e| Error::InvalidFilter {
                input: input.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Some(Self::new(comparison, threshold)))
    }

    pub fn matches(&self, record: &UsageRecord) -> bool {
        self.comparison.holds(record.percentage_used, self.threshold)
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.comparison.as_str(), self.threshold)
    }
}

/// Keep only the records satisfying `filter`. An empty filter returns the
/// input unchanged; a malformed one fails the whole call.
pub fn filter_usages(usages: Vec<UsageRecord>, filter: &str) -> Result<Vec<UsageRecord>> {
    match FilterExpression::parse(filter)? {
        None => Ok(usages),
        Some(expr) => Ok(usages.into_iter().filter(|u| expr.matches(u)).collect()),
    }
}

/// Keep the first `n` records. Non-positive `n` means unlimited.
pub fn limit_top_n(mut usages: Vec<UsageRecord>, n: i64) -> Vec<UsageRecord> {
    if n > 0 && (n as usize) < usages.len() {
        usages.truncate(n as usize);
    }
    usages
}
