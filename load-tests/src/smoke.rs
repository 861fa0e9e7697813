//! Light load verifying that every endpoint answers correctly.
//!
//! Five virtual users each walk through health, calculate, list items and metrics for one
//! minute, pausing between calls.
use crate::client;
use crate::payload::CalculateRequest;
use loadcheck::core::{builtin, MetricsSnapshot};
use loadcheck::prelude::*;
use loadcheck::summary::{count, millis, percent};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;

pub static ERRORS: Rate = Rate::new("errors");
pub static HEALTH_CHECK_DURATION: Trend = Trend::new("health_check_duration");
pub static CALCULATE_DURATION: Trend = Trend::new("calculate_duration");

pub const SUMMARY_PATH: &str = "tests/load/results/smoke-summary.json";
pub const VUS: usize = 5;
pub const DURATION: Duration = Duration::from_secs(60);

/// The smoke scenario with its declared options.
pub fn smoke_test() -> impl ConfigurableScenario<ScenarioOutput> {
    smoke()
        .vus(VUS)
        .duration(DURATION)
        .threshold(builtin::HTTP_REQ_DURATION, "p(95)<500")
        .threshold(ERRORS.name(), "rate<0.01")
        .threshold(builtin::HTTP_REQ_FAILED, "rate<0.01")
        .summary_export(SUMMARY_PATH)
        .text_summary(smoke_text_summary)
}

#[scenario]
pub async fn smoke() {
    smoke_iteration(client()).await;
}

pub async fn smoke_iteration(client: &HttpClient) {
    let res = client.get("/health").await;
    HEALTH_CHECK_DURATION.add_duration(res.timings.duration);
    ERRORS.add(!check_health(&res));
    sleep(Duration::from_millis(500)).await;

    let payload = CalculateRequest::random_add(&mut rand::thread_rng());
    let res = client.post_json("/api/v1/calculate", &payload).await;
    CALCULATE_DURATION.add_duration(res.timings.duration);
    ERRORS.add(!check_calculate(&res));
    sleep(Duration::from_millis(500)).await;

    let res = client.get("/api/v1/items").await;
    ERRORS.add(!check_items(&res));
    sleep(Duration::from_millis(500)).await;

    let res = client.get("/metrics").await;
    ERRORS.add(!check_metrics(&res));
    sleep(Duration::from_secs(1)).await;
}

pub fn check_health(res: &Response) -> bool {
    check(res)
        .that("health: status is 200", |r| r.status == 200)
        .that("health: response has status field", |r| {
            r.json_field("status").as_ref().and_then(Value::as_str) == Some("healthy")
        })
        .passed()
}

pub fn check_calculate(res: &Response) -> bool {
    check(res)
        .that("calculate add: status is 200", |r| r.status == 200)
        .that("calculate add: result is correct", |r| {
            r.json_field("result").is_some()
        })
        .passed()
}

pub fn check_items(res: &Response) -> bool {
    check(res)
        .that("items: status is 200", |r| r.status == 200)
        .that("items: response is array", Response::is_json_array)
        .passed()
}

pub fn check_metrics(res: &Response) -> bool {
    check(res)
        .that("metrics: status is 200", |r| r.status == 200)
        .that("metrics: contains prometheus format", |r| {
            r.body_contains("http_requests_total") || r.body_contains("process_")
        })
        .passed()
}

pub fn smoke_text_summary(snapshot: &MetricsSnapshot) -> String {
    let mut summary = String::from("\n=== SMOKE TEST SUMMARY ===\n\n");
    summary += &format!(
        "Total Requests: {}\n",
        count(snapshot, builtin::HTTP_REQS, "count")
    );
    summary += &format!(
        "Failed Requests: {}\n",
        count(snapshot, builtin::HTTP_REQ_FAILED, "passes")
    );
    summary += &format!(
        "Average Response Time: {}\n",
        millis(snapshot, builtin::HTTP_REQ_DURATION, "avg")
    );
    summary += &format!(
        "P95 Response Time: {}\n",
        millis(snapshot, builtin::HTTP_REQ_DURATION, "p(95)")
    );
    summary += &format!("Error Rate: {}\n", percent(snapshot, ERRORS.name(), "rate"));
    summary
}
