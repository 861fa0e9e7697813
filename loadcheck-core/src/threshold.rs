use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which aggregated value of a metric a threshold looks at.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Aggregation {
    Avg,
    Min,
    Med,
    Max,
    Count,
    Rate,
    Passes,
    Fails,
    Percentile(f64),
}

impl Aggregation {
    /// The key this aggregation is stored under in a metric's values.
    pub fn key(&self) -> String {
        match self {
            Aggregation::Avg => "avg".to_string(),
            Aggregation::Min => "min".to_string(),
            Aggregation::Med => "med".to_string(),
            Aggregation::Max => "max".to_string(),
            Aggregation::Count => "count".to_string(),
            Aggregation::Rate => "rate".to_string(),
            Aggregation::Passes => "passes".to_string(),
            Aggregation::Fails => "fails".to_string(),
            Aggregation::Percentile(p) => percentile_key(*p),
        }
    }

    fn parse(input: &str) -> Option<Self> {
        let aggregation = match input {
            "avg" => Aggregation::Avg,
            "min" => Aggregation::Min,
            "med" => Aggregation::Med,
            "max" => Aggregation::Max,
            "count" => Aggregation::Count,
            "rate" => Aggregation::Rate,
            "passes" => Aggregation::Passes,
            "fails" => Aggregation::Fails,
            other => {
                let p: f64 = other.strip_prefix("p(")?.strip_suffix(')')?.parse().ok()?;
                if !(0. ..=100.).contains(&p) {
                    return None;
                }
                Aggregation::Percentile(p)
            }
        };
        Some(aggregation)
    }
}

pub fn percentile_key(p: f64) -> String {
    format!("p({p})")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    fn holds(&self, observed: f64, bound: f64) -> bool {
        match self {
            Comparison::Lt => observed < bound,
            Comparison::Le => observed <= bound,
            Comparison::Gt => observed > bound,
            Comparison::Ge => observed >= bound,
            Comparison::Eq => observed == bound,
            Comparison::Ne => observed != bound,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }
}

/// A pass/fail condition over one aggregated metric value, such as `p(95)<500`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub metric: String,
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub bound: f64,
}

impl Threshold {
    pub fn parse(metric: &str, expression: &str) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidThreshold {
            metric: metric.to_string(),
            expression: expression.to_string(),
            reason,
        };

        let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
        let idx = compact
            .find(|c: char| matches!(c, '<' | '>' | '=' | '!'))
            .ok_or_else(|| invalid("missing comparison operator"))?;
        let (aggregation, rest) = compact.split_at(idx);

        let aggregation =
            Aggregation::parse(aggregation).ok_or_else(|| invalid("unknown aggregation"))?;

        let (comparison, bound) = [
            ("<=", Comparison::Le),
            (">=", Comparison::Ge),
            ("==", Comparison::Eq),
            ("!=", Comparison::Ne),
            ("<", Comparison::Lt),
            (">", Comparison::Gt),
        ]
        .into_iter()
        .find_map(|(symbol, comparison)| rest.strip_prefix(symbol).map(|b| (comparison, b)))
        .ok_or_else(|| invalid("unknown comparison operator"))?;

        let bound: f64 = bound.parse().map_err(|_| invalid("bound is not a number"))?;
        if !bound.is_finite() {
            return Err(invalid("bound is not finite"));
        }

        Ok(Self {
            metric: metric.to_string(),
            aggregation,
            comparison,
            bound,
        })
    }

    /// A threshold over a value that was never observed passes.
    pub fn passes(&self, observed: Option<f64>) -> bool {
        match observed {
            Some(observed) => self.comparison.holds(observed, self.bound),
            None => true,
        }
    }

    pub fn expression(&self) -> String {
        format!(
            "{}{}{}",
            self.aggregation.key(),
            self.comparison.symbol(),
            self.bound
        )
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.metric, self.expression())
    }
}
