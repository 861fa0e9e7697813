//! Named metrics and the registry that aggregates them.
//!
//! Scenarios declare their metrics once at module scope and add observations from inside a
//! virtual user:
//!
//! ```no_run
//! use loadcheck::metrics::{Counter, Rate, Trend};
//!
//! static ERRORS: Rate = Rate::new("errors");
//! static CALCULATE_DURATION: Trend = Trend::new("calculate_duration");
//! static CREATED: Counter = Counter::new("created_items");
//!
//! async fn iteration() {
//!     ERRORS.add(false);
//!     CALCULATE_DURATION.add(12.5);
//!     CREATED.add(1);
//! }
//! ```
//!
//! Observations are routed to the registry of the virtual user that makes them. Outside of a
//! virtual user (or a [`MetricRegistry::scope`]) they are dropped.
use loadcheck_core::{
    percentile_key, Aggregation, CheckSummary, MetricKind, MetricSummary, MetricsSnapshot,
    Threshold, DEFAULT_TREND_PERCENTILES,
};
use metrics_util::AtomicBucket;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, PoisonError, RwLock,
};
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, error, trace, warn};

/// Fraction of boolean observations that were `true`.
#[derive(Debug)]
pub struct Rate {
    name: &'static str,
}

impl Rate {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn add(&self, value: bool) {
        observe(self.name, Observation::Rate(value));
    }
}

/// Distribution of numeric observations.
#[derive(Debug)]
pub struct Trend {
    name: &'static str,
}

impl Trend {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn add(&self, value: f64) {
        observe(self.name, Observation::Trend(value));
    }

    /// Durations are recorded in milliseconds.
    pub fn add_duration(&self, duration: Duration) {
        self.add(duration.as_secs_f64() * 1_000.);
    }
}

/// Monotonic count.
#[derive(Debug)]
pub struct Counter {
    name: &'static str,
}

impl Counter {
    pub const fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn add(&self, n: u64) {
        observe(self.name, Observation::Counter(n));
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Observation {
    Counter(u64),
    Rate(bool),
    Trend(f64),
}

impl Observation {
    fn kind(&self) -> MetricKind {
        match self {
            Observation::Counter(_) => MetricKind::Counter,
            Observation::Rate(_) => MetricKind::Rate,
            Observation::Trend(_) => MetricKind::Trend,
        }
    }
}

#[derive(Clone)]
pub(crate) struct VuContext {
    pub registry: MetricRegistry,
}

tokio::task_local! {
    pub(crate) static VU_CONTEXT: VuContext;
}

pub(crate) fn observe(name: &'static str, observation: Observation) {
    let res = VU_CONTEXT.try_with(|ctx| ctx.registry.observe(name, observation));
    if res.is_err() {
        trace!("No virtual user context, dropping observation for {name}.");
    }
}

pub(crate) fn observe_check(name: &'static str, passed: bool) {
    let res = VU_CONTEXT.try_with(|ctx| ctx.registry.observe_check(name, passed));
    if res.is_err() {
        trace!("No virtual user context, dropping check {name}.");
    }
}

/// Shared, append-only store for every metric of one scenario run.
///
/// Cloning is cheap; all clones share the same accumulators.
#[derive(Clone, Default)]
pub struct MetricRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    metrics: RwLock<HashMap<&'static str, Arc<MetricCell>>>,
    checks: RwLock<Vec<(&'static str, Arc<CheckCell>)>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `fut` with this registry receiving its observations, as if it were a virtual user.
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        let ctx = VuContext {
            registry: self.clone(),
        };
        VU_CONTEXT.scope(ctx, fut).await
    }

    pub(crate) fn observe(&self, name: &'static str, observation: Observation) {
        if let Some(cell) = self.cell(name, observation.kind()) {
            cell.record(observation);
        }

        #[cfg(feature = "metrics")]
        forward(name, observation);
    }

    pub(crate) fn observe_check(&self, name: &'static str, passed: bool) {
        self.observe(
            loadcheck_core::builtin::CHECKS,
            Observation::Rate(passed),
        );

        let existing = self
            .inner
            .checks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, cell)| cell.clone());

        let cell = match existing {
            Some(cell) => cell,
            None => {
                let mut checks = self
                    .inner
                    .checks
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                // Another virtual user may have registered it in the meantime
                match checks.iter().find(|(n, _)| *n == name) {
                    Some((_, cell)) => cell.clone(),
                    None => {
                        let cell = Arc::new(CheckCell::default());
                        checks.push((name, cell.clone()));
                        cell
                    }
                }
            }
        };

        if passed {
            cell.passes.fetch_add(1, Ordering::Relaxed);
        } else {
            cell.fails.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn cell(&self, name: &'static str, kind: MetricKind) -> Option<Arc<MetricCell>> {
        let existing = self
            .inner
            .metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();

        let cell = match existing {
            Some(cell) => cell,
            None => self
                .inner
                .metrics
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(name)
                .or_insert_with(|| Arc::new(MetricCell::new(kind)))
                .clone(),
        };

        if cell.kind() != kind {
            error!(
                "Metric {name} is a {} and cannot record a {kind} observation.",
                cell.kind()
            );
            return None;
        }

        Some(cell)
    }

    /// Aggregate everything recorded so far.
    ///
    /// `elapsed` is the run time used for per-second rates. Trends report the default
    /// percentiles plus any percentile one of `thresholds` refers to.
    pub fn snapshot(&self, elapsed: Duration, thresholds: &[Threshold]) -> MetricsSnapshot {
        let metrics = self
            .inner
            .metrics
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, cell)| {
                let mut percentiles = DEFAULT_TREND_PERCENTILES.to_vec();
                percentiles.extend(thresholds.iter().filter_map(|t| match t.aggregation {
                    Aggregation::Percentile(p) if t.metric == *name => Some(p),
                    _ => None,
                }));
                (name.to_string(), cell.summarize(elapsed, &percentiles))
            })
            .collect();

        let checks = self
            .inner
            .checks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, cell)| CheckSummary {
                name: name.to_string(),
                passes: cell.passes.load(Ordering::Relaxed),
                fails: cell.fails.load(Ordering::Relaxed),
            })
            .collect();

        MetricsSnapshot { metrics, checks }
    }
}

#[cfg(feature = "metrics")]
fn forward(name: &'static str, observation: Observation) {
    match observation {
        Observation::Counter(n) => metrics::counter!(name).increment(n),
        Observation::Rate(value) => {
            let outcome = if value { "pass" } else { "fail" };
            metrics::counter!(name, "outcome" => outcome).increment(1);
        }
        Observation::Trend(value) => metrics::histogram!(name).record(value),
    }
}

enum MetricCell {
    Counter(AtomicU64),
    Rate { passes: AtomicU64, fails: AtomicU64 },
    Trend(AtomicBucket<f64>),
}

impl MetricCell {
    fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => MetricCell::Counter(AtomicU64::new(0)),
            MetricKind::Rate => MetricCell::Rate {
                passes: AtomicU64::new(0),
                fails: AtomicU64::new(0),
            },
            MetricKind::Trend => MetricCell::Trend(AtomicBucket::new()),
        }
    }

    fn kind(&self) -> MetricKind {
        match self {
            MetricCell::Counter(_) => MetricKind::Counter,
            MetricCell::Rate { .. } => MetricKind::Rate,
            MetricCell::Trend(_) => MetricKind::Trend,
        }
    }

    fn record(&self, observation: Observation) {
        match (self, observation) {
            (MetricCell::Counter(count), Observation::Counter(n)) => {
                count.fetch_add(n, Ordering::Relaxed);
            }
            (MetricCell::Rate { passes, .. }, Observation::Rate(true)) => {
                passes.fetch_add(1, Ordering::Relaxed);
            }
            (MetricCell::Rate { fails, .. }, Observation::Rate(false)) => {
                fails.fetch_add(1, Ordering::Relaxed);
            }
            (MetricCell::Trend(bucket), Observation::Trend(value)) => bucket.push(value),
            (cell, observation) => {
                error!("Mismatched {observation:?} for a {} metric.", cell.kind())
            }
        }
    }

    fn summarize(&self, elapsed: Duration, percentiles: &[f64]) -> MetricSummary {
        let summary = MetricSummary::new(self.kind());
        match self {
            MetricCell::Counter(count) => {
                let count = count.load(Ordering::Relaxed) as f64;
                summary
                    .with_value("count", count)
                    .with_value("rate", per_second(count, elapsed))
            }
            MetricCell::Rate { passes, fails } => {
                let passes = passes.load(Ordering::Relaxed) as f64;
                let fails = fails.load(Ordering::Relaxed) as f64;
                if passes + fails == 0. {
                    return summary;
                }
                summary
                    .with_value("rate", passes / (passes + fails))
                    .with_value("passes", passes)
                    .with_value("fails", fails)
            }
            MetricCell::Trend(bucket) => {
                let samples = bucket.data();
                match TrendStats::new(&samples) {
                    Some(stats) => stats.summarize(summary, percentiles),
                    None => summary,
                }
            }
        }
    }
}

#[derive(Default)]
struct CheckCell {
    passes: AtomicU64,
    fails: AtomicU64,
}

fn per_second(count: f64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0. {
        count / secs
    } else {
        0.
    }
}

struct TrendStats {
    sorted: Vec<f64>,
    sum: f64,
}

impl TrendStats {
    fn new(samples: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = samples.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        Some(Self {
            sum: sorted.iter().sum(),
            sorted,
        })
    }

    fn summarize(&self, summary: MetricSummary, percentiles: &[f64]) -> MetricSummary {
        let mut summary = summary
            .with_value("avg", self.sum / self.sorted.len() as f64)
            .with_value("min", self.sorted[0])
            .with_value("max", self.sorted[self.sorted.len() - 1])
            .with_value("med", self.quantile(0.5));

        for p in percentiles {
            summary = summary.with_value(&percentile_key(*p), self.quantile(p / 100.));
        }
        summary
    }

    /// Linear interpolation between the closest ranks, at rank `q * (n - 1)`.
    fn quantile(&self, q: f64) -> f64 {
        let rank = q.clamp(0., 1.) * (self.sorted.len() - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = rank.ceil() as usize;
        let (lo, hi) = (self.sorted[lower], self.sorted[upper]);
        lo + (hi - lo) * (rank - lower as f64)
    }
}
