mod utils;
#[allow(unused)]
use utils::*;

use loadcheck::core::builtin;
use loadcheck::metrics::MetricRegistry;
use loadcheck::prelude::*;
use mock_service::Faults;
use serde_json::json;
use std::time::Duration;

#[tokio::test]
#[ntest::timeout(30_000)]
async fn client_records_builtin_metrics() {
    let client = HttpClient::new(serve(Faults::default()));
    let registry = MetricRegistry::new();

    registry
        .scope(async {
            let res = client.get("/health").await;
            assert_eq!(res.status, 200);
            assert_eq!(
                res.json_field("status"),
                Some(serde_json::Value::from("healthy"))
            );

            let res = client
                .post_json(
                    "/api/v1/calculate",
                    &json!({"a": 1, "b": 0, "operation": "divide"}),
                )
                .await;
            assert_eq!(res.status, 400);

            let res = client
                .post_json(
                    "/api/v1/items",
                    &json!({"name": "Item 1", "description": "created in a test"}),
                )
                .await;
            assert_eq!(res.status, 201);

            let res = client.get("/api/v1/items/does-not-exist").await;
            assert_eq!(res.status, 404);
        })
        .await;

    let snapshot = registry.snapshot(Duration::from_secs(1), &[]);
    assert_eq!(snapshot.value(builtin::HTTP_REQS, "count"), Some(4.));
    assert_eq!(snapshot.value(builtin::HTTP_REQ_FAILED, "passes"), Some(2.));
    assert_eq!(snapshot.value(builtin::HTTP_REQ_FAILED, "fails"), Some(2.));
    assert!(snapshot.value_or_zero(builtin::HTTP_REQ_DURATION, "max") > 0.);
}

#[tokio::test]
#[ntest::timeout(30_000)]
async fn metrics_endpoint_is_prometheus_text() {
    let client = HttpClient::new(serve(Faults::default()));
    let res = MetricRegistry::new().scope(client.get("/metrics")).await;
    assert_eq!(res.status, 200);
    assert!(res.body_contains("http_requests_total"));
}
