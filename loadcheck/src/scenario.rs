//! Scenario logic and the builder methods attached to `#[scenario]` functions.
use crate::cli::LoadCli;
use crate::error::RunError;
use crate::metrics::MetricRegistry;
use crate::summary::{default_text_summary, handle_summary, TextSummary};
use crate::vu_pool::{Timer, VuPool};
use clap::Parser;
use loadcheck_core::{evaluate_thresholds, RunStatistics, ScenarioConfig, Stage, RAMP_INTERVAL};
use std::{
    future::Future,
    path::PathBuf,
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};
use tokio::time::Instant;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};

/// What awaiting a scenario produces.
pub type ScenarioOutput = Result<RunStatistics, RunError>;

/// Load test scenario structure
///
/// Handler for running scenarios. Not intended for manual creation, use the
/// [`#[scenario]`](loadcheck_macros::scenario) macro which will add these methods to functions.
#[pin_project::pin_project]
pub struct Scenario<T> {
    func: T,
    runner_fut: Option<Pin<Box<dyn Future<Output = ScenarioOutput> + Send>>>,
    config: ScenarioConfig,
    text_summary: TextSummary,
}

impl<T> Scenario<T> {
    #[doc(hidden)]
    pub fn new(name: &str, func: T) -> Self {
        Self {
            func,
            runner_fut: None,
            config: ScenarioConfig::new(name),
            text_summary: default_text_summary,
        }
    }
}

impl<T, F> Future for Scenario<T>
where
    T: Fn() -> F + Send + 'static + Clone + Sync,
    F: Future<Output = ()> + Send,
{
    type Output = ScenarioOutput;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let runner = this.runner_fut.get_or_insert_with(|| {
            let func = this.func.clone();
            let config = this.config.clone();
            let text_summary = *this.text_summary;
            Box::pin(async move { run_scenario(func, config, text_summary).await })
        });

        runner.as_mut().poll(cx)
    }
}

pub trait ConfigurableScenario<T: Send>: Future<Output = T> + Sized + Send {
    fn vus(self, vus: usize) -> Self;
    fn duration(self, duration: Duration) -> Self;
    fn stages(self, stages: &[Stage]) -> Self;
    fn start_vus(self, start_vus: usize) -> Self;
    fn threshold(self, metric: &str, expression: &str) -> Self;
    fn graceful_stop(self, graceful_stop: Duration) -> Self;
    fn summary_export(self, path: impl Into<PathBuf>) -> Self;
    fn text_summary(self, text_summary: TextSummary) -> Self;
    fn with_args(self) -> Self;
    fn config(&self) -> &ScenarioConfig;
}

impl<T, F> ConfigurableScenario<ScenarioOutput> for Scenario<T>
where
    T: Fn() -> F + Send + 'static + Clone + Sync,
    F: Future<Output = ()> + Send,
{
    /// Run the scenario with a fixed number of virtual users.
    ///
    /// NOTE: Must supply a `.duration()` as well
    ///
    /// # Example
    /// ```no_run
    /// use loadcheck::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     my_scenario()
    ///         .vus(5)
    ///         .duration(Duration::from_secs(60))
    ///         .await;
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn vus(mut self, vus: usize) -> Self {
        self.config.vus = Some(vus);
        self
    }

    /// Run the scenario for the given duration. Ignored when stages are set.
    fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = Some(duration);
        self
    }

    /// Ramp the number of virtual users linearly through `stages`.
    ///
    /// # Example
    /// ```no_run
    /// use loadcheck::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     my_scenario()
    ///         .stages(&[
    ///             Stage::new(Duration::from_secs(60), 10),
    ///             Stage::new(Duration::from_secs(120), 10),
    ///             Stage::new(Duration::from_secs(30), 0),
    ///         ])
    ///         .await;
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn stages(mut self, stages: &[Stage]) -> Self {
        self.config.stages = stages.to_vec();
        self
    }

    /// Virtual users running before the first stage begins. Defaults to 0.
    fn start_vus(mut self, start_vus: usize) -> Self {
        self.config.start_vus = start_vus;
        self
    }

    /// Add a pass/fail criterion such as `("http_req_duration", "p(95)<500")`.
    ///
    /// Expressions are validated when the scenario starts.
    fn threshold(mut self, metric: &str, expression: &str) -> Self {
        self.config.add_threshold(metric, expression);
        self
    }

    fn graceful_stop(mut self, graceful_stop: Duration) -> Self {
        self.config.graceful_stop = graceful_stop;
        self
    }

    /// Write the JSON summary to `path` when the run ends.
    fn summary_export(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.summary_export = Some(path.into());
        self
    }

    fn text_summary(mut self, text_summary: TextSummary) -> Self {
        self.text_summary = text_summary;
        self
    }

    /// Let command line flags override the configuration set so far.
    ///
    /// # Example
    /// ```no_run
    /// use loadcheck::prelude::*;
    /// use std::time::Duration;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     // `my-bin --vus 20 --duration 30s`
    ///     my_scenario()
    ///         .vus(5)
    ///         .duration(Duration::from_secs(60))
    ///         .with_args()
    ///         .await;
    /// }
    ///
    /// #[scenario]
    /// async fn my_scenario() {
    /// }
    /// ```
    fn with_args(mut self) -> Self {
        LoadCli::parse().apply(&mut self.config);
        self
    }

    /// The configuration the scenario will run with.
    fn config(&self) -> &ScenarioConfig {
        &self.config
    }
}

#[instrument(name="scenario", skip_all, fields(name=config.name))]
pub(crate) async fn run_scenario<T, F>(
    scenario: T,
    config: ScenarioConfig,
    text_summary: TextSummary,
) -> ScenarioOutput
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send,
{
    let profile = config.profile()?;
    let thresholds = config.parsed_thresholds()?;
    info!("Running {} with profile {profile}", config.name);

    let registry = MetricRegistry::new();
    let mut pool = VuPool::new(scenario, registry.clone());
    let total = profile.total_duration();

    let start = Instant::now();
    pool.set_concurrency(profile.target_vus(Duration::ZERO));

    let mut timer = Timer::new(RAMP_INTERVAL).await;
    debug!("Re-evaluating VUs every {timer}");
    loop {
        let since_last = timer.tick().await;
        if since_last > RAMP_INTERVAL * 2 {
            warn!(
                "Profile loop fell behind: {} since the last tick",
                humantime::format_duration(since_last)
            );
        }

        let elapsed = start.elapsed();
        if elapsed >= total {
            break;
        }
        pool.set_concurrency(profile.target_vus(elapsed));
    }

    let max_vus = pool.max_vus();
    pool.shutdown(config.graceful_stop).await;
    let duration = start.elapsed();
    info!(
        "Scenario complete after {}",
        humantime::format_duration(Duration::from_millis(duration.as_millis() as u64))
    );

    let mut snapshot = registry.snapshot(duration, &thresholds);
    let outcomes = evaluate_thresholds(&mut snapshot, &thresholds);

    let stats = RunStatistics {
        scenario: config.name.clone(),
        profile,
        duration,
        max_vus,
        snapshot,
        thresholds: outcomes,
    };

    for failed in stats.failed_thresholds() {
        warn!(
            "Threshold {} {} failed (observed {:?})",
            failed.metric, failed.expression, failed.observed
        );
    }

    handle_summary(&stats, text_summary, config.summary_export.as_deref()).await?;

    Ok(stats)
}
