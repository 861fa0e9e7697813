mod utils;
#[allow(unused)]
use utils::*;

use load_tests::stress::{stress_test, STRESS_LABELS};
use loadcheck::core::builtin;
use loadcheck::prelude::*;
use mock_service::Faults;
use std::time::Duration;

#[tokio::test]
#[ntest::timeout(60_000)]
async fn short_ramp_passes_against_healthy_service() {
    serve(Faults::default());
    load_tests::init_client().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let stats = stress_test()
        .stages(&[
            Stage::new(Duration::from_secs(1), 4),
            Stage::new(Duration::from_secs(2), 4),
            Stage::new(Duration::from_secs(1), 0),
        ])
        .summary_export(dir.path().join("stress-summary.json"))
        .await
        .unwrap();

    assert!(stats.passed(), "{:?}", stats.thresholds);
    assert_eq!(stats.max_vus, 4);

    let snapshot = &stats.snapshot;
    let successful = snapshot.value_or_zero(STRESS_LABELS.success, "count");
    assert!(successful > 0.);
    assert_eq!(snapshot.value(STRESS_LABELS.error, "count"), None);
    assert_eq!(snapshot.value(STRESS_LABELS.error_rate, "rate"), Some(0.));
    assert_eq!(
        snapshot.value(builtin::HTTP_REQS, "count"),
        Some(successful),
        "one request per behavior"
    );
}

#[cfg(feature = "integration")]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_stress_profile() {
        serve(Faults::default());
        load_tests::init_client().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let stats = stress_test()
            .summary_export(dir.path().join("stress-summary.json"))
            .await
            .unwrap();

        assert!(stats.passed());
        assert_eq!(stats.max_vus, 100);
    }
}
