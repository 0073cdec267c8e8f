//! Numeric comparison operators.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Comparator applied to the numeric leaves of a facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Equal,
    Lesser,
    LesserEqual,
    Greater,
    GreaterEqual,
    /// `a <= v <= b`
    Between,
    /// `a - b <= v <= a + b`. A negative `b` gives an empty window.
    Around,
}

impl Operator {
    pub const ALL: &'static [Operator] = &[
        Operator::Equal,
        Operator::Lesser,
        Operator::LesserEqual,
        Operator::Greater,
        Operator::GreaterEqual,
        Operator::Between,
        Operator::Around,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "equal",
            Operator::Lesser => "lesser",
            Operator::LesserEqual => "lesserequal",
            Operator::Greater => "greater",
            Operator::GreaterEqual => "greaterequal",
            Operator::Between => "between",
            Operator::Around => "around",
        }
    }

    pub fn needs_second_threshold(&self) -> bool {
        matches!(self, Operator::Between | Operator::Around)
    }

    /// Whether `value` satisfies the comparator. Two-threshold operators
    /// never match without `b`.
    pub fn matches(&self, value: f64, a: f64, b: Option<f64>) -> bool {
        match (self, b) {
            (Operator::Equal, _) => value == a,
            (Operator::Lesser, _) => value < a,
            (Operator::LesserEqual, _) => value <= a,
            (Operator::Greater, _) => value > a,
            (Operator::GreaterEqual, _) => value >= a,
            (Operator::Between, Some(b)) => a <= value && value <= b,
            (Operator::Around, Some(b)) => a - b <= value && value <= a + b,
            (Operator::Between | Operator::Around, None) => false,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("unknown operator '{}'", s))
    }
}
