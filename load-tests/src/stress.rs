//! Ramping load to find where the service starts to break.
//!
//! Virtual users ramp 0 → 10 → 50 → 100 → 0 over 23 minutes. Every iteration picks one of four
//! behaviors by weight, each recorded as a transaction.
use crate::client;
use crate::payload::{CalculateRequest, NewItem};
use loadcheck::core::{builtin, MetricsSnapshot};
use loadcheck::prelude::*;
use loadcheck::summary::{count, millis, percent};
use loadcheck::transaction::TransactionLabels;
use rand::Rng;
use std::fmt;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};
use tokio::time::sleep;

pub const STRESS_LABELS: TransactionLabels = TransactionLabels {
    latency: "request_duration",
    success: "successful_requests",
    error: "failed_requests",
    error_rate: "errors",
};

pub const SUMMARY_PATH: &str = "tests/load/results/stress-summary.json";

const fn minutes(m: u64) -> Duration {
    Duration::from_secs(m * 60)
}

pub const STAGES: [Stage; 7] = [
    Stage::new(minutes(2), 10),
    Stage::new(minutes(5), 10),
    Stage::new(minutes(2), 50),
    Stage::new(minutes(5), 50),
    Stage::new(minutes(2), 100),
    Stage::new(minutes(5), 100),
    Stage::new(minutes(2), 0),
];

/// Upper bound of the pause after every iteration.
pub const MAX_THINK_TIME: Duration = Duration::from_millis(500);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Behavior {
    Health,
    Calculate,
    ListItems,
    CreateItem,
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Behavior::Health => "health",
            Behavior::Calculate => "calculate",
            Behavior::ListItems => "list items",
            Behavior::CreateItem => "create item",
        };
        write!(f, "{name}")
    }
}

pub const BEHAVIOR_WEIGHTS: [(u32, Behavior); 4] = [
    (30, Behavior::Health),
    (40, Behavior::Calculate),
    (15, Behavior::ListItems),
    (15, Behavior::CreateItem),
];

pub fn behaviors() -> &'static WeightedTable<Behavior> {
    static TABLE: OnceLock<WeightedTable<Behavior>> = OnceLock::new();
    TABLE.get_or_init(|| {
        WeightedTable::new(BEHAVIOR_WEIGHTS).expect("behavior weights are non-zero")
    })
}

/// The checks of one behavior did not all hold.
#[derive(Debug, thiserror::Error, PartialEq)]
#[error("{behavior} checks failed (status {status})")]
pub struct CheckFailure {
    pub behavior: Behavior,
    pub status: u16,
}

/// The stress scenario with its declared options.
pub fn stress_test() -> impl ConfigurableScenario<ScenarioOutput> {
    stress()
        .stages(&STAGES)
        .threshold(builtin::HTTP_REQ_DURATION, "p(95)<2000")
        .threshold(STRESS_LABELS.error_rate, "rate<0.1")
        .threshold(builtin::HTTP_REQ_FAILED, "rate<0.1")
        .summary_export(SUMMARY_PATH)
        .text_summary(stress_text_summary)
}

#[scenario]
pub async fn stress() {
    let behavior = *behaviors().choose(&mut rand::thread_rng());
    let _ = run_behavior(client(), behavior).await;

    let pause = rand::thread_rng().gen_range(Duration::ZERO..MAX_THINK_TIME);
    sleep(pause).await;
}

pub async fn run_behavior(client: &HttpClient, behavior: Behavior) -> Result<(), CheckFailure> {
    match behavior {
        Behavior::Health => health(client).await,
        Behavior::Calculate => calculate(client).await,
        Behavior::ListItems => list_items(client).await,
        Behavior::CreateItem => create_item(client).await,
    }
}

#[transaction(STRESS_LABELS)]
async fn health(client: &HttpClient) -> Result<(), CheckFailure> {
    let res = client.get("/health").await;
    judge_health(&res)
}

#[transaction(STRESS_LABELS)]
async fn calculate(client: &HttpClient) -> Result<(), CheckFailure> {
    let payload = CalculateRequest::random(&mut rand::thread_rng());
    let res = client.post_json("/api/v1/calculate", &payload).await;
    judge_calculate(&res)
}

#[transaction(STRESS_LABELS)]
async fn list_items(client: &HttpClient) -> Result<(), CheckFailure> {
    let res = client.get("/api/v1/items").await;
    judge_list_items(&res)
}

#[transaction(STRESS_LABELS)]
async fn create_item(client: &HttpClient) -> Result<(), CheckFailure> {
    let item = NewItem::at(SystemTime::now());
    let res = client.post_json("/api/v1/items", &item).await;
    judge_create_item(&res)
}

fn outcome(behavior: Behavior, res: &Response, passed: bool) -> Result<(), CheckFailure> {
    if passed {
        Ok(())
    } else {
        Err(CheckFailure {
            behavior,
            status: res.status,
        })
    }
}

pub fn judge_health(res: &Response) -> Result<(), CheckFailure> {
    let passed = check(res)
        .that("health: status is 200", |r| r.status == 200)
        .passed();
    outcome(Behavior::Health, res, passed)
}

pub fn judge_calculate(res: &Response) -> Result<(), CheckFailure> {
    let passed = check(res)
        .that("calculate: status is 200", |r| r.status == 200)
        .that("calculate: has result", |r| r.json_field("result").is_some())
        .passed();
    outcome(Behavior::Calculate, res, passed)
}

pub fn judge_list_items(res: &Response) -> Result<(), CheckFailure> {
    let passed = check(res)
        .that("items: status is 200", |r| r.status == 200)
        .passed();
    outcome(Behavior::ListItems, res, passed)
}

pub fn judge_create_item(res: &Response) -> Result<(), CheckFailure> {
    let passed = check(res)
        .that("create item: status is 201", |r| r.status == 201)
        .passed();
    outcome(Behavior::CreateItem, res, passed)
}

pub fn stress_text_summary(snapshot: &MetricsSnapshot) -> String {
    let duration = |value: &str| millis(snapshot, builtin::HTTP_REQ_DURATION, value);

    let mut summary = String::from("\n=== STRESS TEST SUMMARY ===\n\n");
    summary += &format!(
        "Total Requests: {}\n",
        count(snapshot, builtin::HTTP_REQS, "count")
    );
    summary += &format!(
        "Successful Requests: {}\n",
        count(snapshot, STRESS_LABELS.success, "count")
    );
    summary += &format!(
        "Failed Requests: {}\n",
        count(snapshot, STRESS_LABELS.error, "count")
    );
    summary += "\nResponse Times:\n";
    summary += &format!("  Average: {}\n", duration("avg"));
    summary += &format!("  Median: {}\n", duration("med"));
    summary += &format!("  P90: {}\n", duration("p(90)"));
    summary += &format!("  P95: {}\n", duration("p(95)"));
    summary += &format!("  Max: {}\n", duration("max"));
    summary += &format!(
        "\nThroughput: {:.2} req/s\n",
        snapshot.value_or_zero(builtin::HTTP_REQS, "rate")
    );
    summary += &format!(
        "Error Rate: {}\n",
        percent(snapshot, STRESS_LABELS.error_rate, "rate")
    );
    summary
}
