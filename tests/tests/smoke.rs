mod utils;
#[allow(unused)]
use utils::*;

use load_tests::smoke::smoke_test;
use loadcheck::core::builtin;
use loadcheck::prelude::*;
use mock_service::Faults;
use std::time::Duration;

#[tokio::test]
#[ntest::timeout(60_000)]
async fn smoke_passes_against_healthy_service() {
    serve(Faults::default());
    load_tests::init_client().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let export = dir.path().join("results/smoke-summary.json");

    let stats = smoke_test()
        .vus(2)
        .duration(Duration::from_secs(3))
        .summary_export(&export)
        .await
        .unwrap();

    assert!(stats.passed(), "{:?}", stats.thresholds);
    assert_eq!(load_tests::exit_status(&Ok(stats.clone())), 0);
    let snapshot = &stats.snapshot;
    assert!(snapshot.value_or_zero(builtin::HTTP_REQS, "count") >= 8.);
    assert_eq!(snapshot.value(builtin::HTTP_REQ_FAILED, "rate"), Some(0.));
    assert_eq!(snapshot.value(builtin::CHECKS, "rate"), Some(1.));
    assert_eq!(snapshot.value("errors", "rate"), Some(0.));
    assert!(snapshot.value("health_check_duration", "p(95)").is_some());
    assert!(snapshot.value("calculate_duration", "avg").is_some());

    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&export).unwrap()).unwrap();
    assert_eq!(written["scenario"], "smoke");
    assert_eq!(
        written["metrics"]["http_req_duration"]["thresholds"]["p(95)<500"]["ok"],
        true
    );
}

#[cfg(feature = "integration")]
mod tests {
    use super::*;

    #[tokio::test]
    async fn full_smoke_profile() {
        serve(Faults::default());
        load_tests::init_client().unwrap();
        let dir = tempfile::tempdir().unwrap();

        let stats = smoke_test()
            .summary_export(dir.path().join("smoke-summary.json"))
            .await
            .unwrap();

        assert!(stats.passed());
        assert_eq!(stats.max_vus, 5);
    }
}
