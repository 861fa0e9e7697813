use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Names of the metrics the runtime records on its own.
pub mod builtin {
    pub const HTTP_REQS: &str = "http_reqs";
    pub const HTTP_REQ_DURATION: &str = "http_req_duration";
    pub const HTTP_REQ_FAILED: &str = "http_req_failed";
    pub const CHECKS: &str = "checks";
    pub const ITERATIONS: &str = "iterations";
    pub const ITERATION_DURATION: &str = "iteration_duration";
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonic count.
    Counter,
    /// Fraction of boolean observations that were `true`.
    Rate,
    /// Distribution of numeric observations, in milliseconds for durations.
    Trend,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Counter => "counter",
            MetricKind::Rate => "rate",
            MetricKind::Trend => "trend",
        };
        f.write_str(name)
    }
}

/// Aggregated values of one metric at the end of a run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    #[serde(rename = "type")]
    pub kind: MetricKind,
    pub values: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub thresholds: BTreeMap<String, ThresholdStatus>,
}

impl MetricSummary {
    pub fn new(kind: MetricKind) -> Self {
        Self {
            kind,
            values: BTreeMap::new(),
            thresholds: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, name: &str, value: f64) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdStatus {
    pub ok: bool,
}

/// Pass/fail tally of one named check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

/// Every metric and check recorded during a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub metrics: BTreeMap<String, MetricSummary>,
    pub checks: Vec<CheckSummary>,
}

impl MetricsSnapshot {
    /// Look up one aggregated value, e.g. `value("http_req_duration", "p(95)")`.
    ///
    /// Missing metrics, missing values and non-finite values all come back as `None`.
    pub fn value(&self, metric: &str, value: &str) -> Option<f64> {
        self.metrics
            .get(metric)
            .and_then(|m| m.values.get(value))
            .copied()
            .filter(|v| v.is_finite())
    }

    /// Same as [`MetricsSnapshot::value`] with missing values reported as zero.
    pub fn value_or_zero(&self, metric: &str, value: &str) -> f64 {
        self.value(metric, value).unwrap_or(0.)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_values() {
        let mut snapshot = MetricsSnapshot::default();
        snapshot.metrics.insert(
            "errors".to_string(),
            MetricSummary::new(MetricKind::Rate).with_value("rate", f64::NAN),
        );

        assert_eq!(snapshot.value("errors", "rate"), None);
        assert_eq!(snapshot.value_or_zero("errors", "rate"), 0.);
        assert_eq!(snapshot.value_or_zero("nope", "count"), 0.);
    }

    #[test]
    fn test_serialized_shape() {
        let mut snapshot = MetricsSnapshot::default();
        snapshot.metrics.insert(
            "http_reqs".to_string(),
            MetricSummary::new(MetricKind::Counter).with_value("count", 3.),
        );

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["metrics"]["http_reqs"]["type"], "counter");
        assert_eq!(json["metrics"]["http_reqs"]["values"]["count"], 3.);
        assert!(json["metrics"]["http_reqs"].get("thresholds").is_none());
    }
}
