use crate::{LoadProfile, MetricsSnapshot, Threshold, ThresholdStatus};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::time::Duration;

/// Run Statistics for a given Scenario
///
/// Holds the full metrics snapshot along with the outcome of every threshold. This is also the
/// document written to a scenario's summary export path.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunStatistics {
    pub scenario: String,
    pub profile: LoadProfile,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    #[serde(rename = "test_run_duration_ms")]
    pub duration: Duration,
    pub max_vus: usize,
    #[serde(flatten)]
    pub snapshot: MetricsSnapshot,
    pub thresholds: Vec<ThresholdOutcome>,
}

impl RunStatistics {
    pub fn passed(&self) -> bool {
        self.thresholds.iter().all(|t| t.ok)
    }

    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdOutcome> {
        self.thresholds.iter().filter(|t| !t.ok)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOutcome {
    pub metric: String,
    pub expression: String,
    pub observed: Option<f64>,
    pub ok: bool,
}

/// Judge every threshold against the snapshot, marking each result on the metric it covers.
pub fn evaluate_thresholds(
    snapshot: &mut MetricsSnapshot,
    thresholds: &[Threshold],
) -> Vec<ThresholdOutcome> {
    thresholds
        .iter()
        .map(|threshold| {
            let observed = snapshot.value(&threshold.metric, &threshold.aggregation.key());
            let ok = threshold.passes(observed);
            let expression = threshold.expression();

            if let Some(metric) = snapshot.metrics.get_mut(&threshold.metric) {
                metric
                    .thresholds
                    .insert(expression.clone(), ThresholdStatus { ok });
            }

            ThresholdOutcome {
                metric: threshold.metric.clone(),
                expression,
                observed,
                ok,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MetricKind, MetricSummary};

    fn snapshot() -> MetricsSnapshot {
        let mut snapshot = MetricsSnapshot::default();
        snapshot.metrics.insert(
            "http_req_duration".to_string(),
            MetricSummary::new(MetricKind::Trend).with_value("p(95)", 620.),
        );
        snapshot.metrics.insert(
            "errors".to_string(),
            MetricSummary::new(MetricKind::Rate).with_value("rate", 0.),
        );
        snapshot
    }

    #[test]
    fn test_evaluate() {
        let mut snapshot = snapshot();
        let thresholds = vec![
            Threshold::parse("http_req_duration", "p(95)<500").unwrap(),
            Threshold::parse("errors", "rate<0.01").unwrap(),
            Threshold::parse("http_req_failed", "rate<0.01").unwrap(),
        ];

        let outcomes = evaluate_thresholds(&mut snapshot, &thresholds);
        assert_eq!(outcomes.len(), 3);
        assert!(!outcomes[0].ok);
        assert_eq!(outcomes[0].observed, Some(620.));
        assert!(outcomes[1].ok);
        // No requests were ever made
        assert!(outcomes[2].ok);
        assert_eq!(outcomes[2].observed, None);

        assert_eq!(
            snapshot.metrics["http_req_duration"].thresholds["p(95)<500"],
            ThresholdStatus { ok: false }
        );
    }

    #[test]
    fn test_passed() {
        let mut snapshot = snapshot();
        let thresholds = vec![Threshold::parse("errors", "rate<0.01").unwrap()];
        let outcomes = evaluate_thresholds(&mut snapshot, &thresholds);

        let stats = RunStatistics {
            scenario: "smoke".to_string(),
            profile: LoadProfile::Constant {
                vus: 1,
                duration: Duration::from_secs(1),
            },
            duration: Duration::from_secs(1),
            max_vus: 1,
            snapshot,
            thresholds: outcomes,
        };

        assert!(stats.passed());
        assert_eq!(stats.failed_thresholds().count(), 0);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["test_run_duration_ms"], 1000);
        assert_eq!(json["metrics"]["errors"]["thresholds"]["rate<0.01"]["ok"], true);
    }
}
