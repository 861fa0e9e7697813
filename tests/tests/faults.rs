mod utils;
#[allow(unused)]
use utils::*;

use load_tests::smoke::smoke_test;
use loadcheck::core::builtin;
use loadcheck::prelude::*;
use mock_service::{CalculateFault, Faults};
use std::time::Duration;

#[tokio::test]
#[ntest::timeout(60_000)]
async fn smoke_fails_against_broken_service() {
    serve(Faults {
        unhealthy: true,
        calculate: CalculateFault::EmptyObject,
        ..Default::default()
    });
    load_tests::init_client().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let output = smoke_test()
        .vus(2)
        .duration(Duration::from_secs(3))
        .summary_export(dir.path().join("smoke-summary.json"))
        .await;
    assert_eq!(load_tests::exit_status(&output), 99);

    let stats = output.unwrap();
    let failed: Vec<_> = stats
        .failed_thresholds()
        .map(|t| t.metric.as_str())
        .collect();
    assert_eq!(failed, ["errors", "http_req_failed"]);

    let snapshot = &stats.snapshot;
    // The health and calculate groups fail every iteration, items and metrics never do
    assert_eq!(snapshot.value("errors", "rate"), Some(0.5));
    assert_eq!(snapshot.value(builtin::HTTP_REQ_FAILED, "rate"), Some(0.25));
    let calculate_result = snapshot
        .checks
        .iter()
        .find(|c| c.name == "calculate add: result is correct")
        .unwrap();
    assert_eq!(calculate_result.passes, 0);
    assert!(calculate_result.fails > 0);
}
