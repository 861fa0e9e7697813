mod timer;

pub(crate) use timer::Timer;

use crate::metrics::{MetricRegistry, Observation, VuContext, VU_CONTEXT};
use loadcheck_core::builtin;
use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn, Instrument};

/// The set of virtual users running one scenario.
///
/// Every virtual user is a tokio task looping over the scenario function inside a
/// [`VU_CONTEXT`] scope, so metric handles used by the scenario land in this pool's registry.
pub(crate) struct VuPool<T> {
    scenario: T,
    registry: MetricRegistry,
    active: Vec<VirtualUser>,
    retiring: Vec<VirtualUser>,
    next_id: usize,
    max_vus: usize,
}

struct VirtualUser {
    id: usize,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl VirtualUser {
    fn signal_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl<T, F> VuPool<T>
where
    T: Fn() -> F + Send + Sync + 'static + Clone,
    F: Future<Output = ()> + Send,
{
    pub fn new(scenario: T, registry: MetricRegistry) -> Self {
        Self {
            scenario,
            registry,
            active: vec![],
            retiring: vec![],
            next_id: 1,
            max_vus: 0,
        }
    }

    /// Grow or shrink to `concurrency` virtual users.
    ///
    /// Surplus users are asked to stop once their current iteration finishes rather than being
    /// aborted mid-request.
    pub fn set_concurrency(&mut self, concurrency: usize) {
        self.retiring.retain(|vu| !vu.handle.is_finished());

        if self.active.len() == concurrency {
            return;
        } else if self.active.len() > concurrency {
            for vu in self.active.drain(concurrency..) {
                trace!("Retiring VU {}", vu.id);
                vu.signal_stop();
                self.retiring.push(vu);
            }
        } else {
            while self.active.len() < concurrency {
                let vu = self.spawn();
                self.active.push(vu);
            }
        }

        self.max_vus = self.max_vus.max(self.active.len());
        debug!("Running {} VUs", self.active.len());
    }

    fn spawn(&mut self) -> VirtualUser {
        let id = self.next_id;
        self.next_id += 1;

        let scenario = self.scenario.clone();
        let registry = self.registry.clone();
        let stop = Arc::new(AtomicBool::new(false));
        let ctx = VuContext {
            registry: registry.clone(),
        };

        let task_stop = stop.clone();
        let handle = tokio::spawn(
            VU_CONTEXT
                .scope(ctx, async move {
                    while !task_stop.load(Ordering::Relaxed) {
                        let start = Instant::now();
                        scenario().await;
                        registry.observe(builtin::ITERATIONS, Observation::Counter(1));
                        registry.observe(
                            builtin::ITERATION_DURATION,
                            Observation::Trend(start.elapsed().as_secs_f64() * 1_000.),
                        );
                    }
                })
                .instrument(tracing::trace_span!("vu", id)),
        );

        VirtualUser { id, stop, handle }
    }

    pub fn concurrency(&self) -> usize {
        self.active.len()
    }

    pub fn max_vus(&self) -> usize {
        self.max_vus
    }

    /// Stop every virtual user, waiting up to `graceful_stop` for in-flight iterations.
    pub async fn shutdown(mut self, graceful_stop: Duration) {
        let mut vus: Vec<_> = self.active.drain(..).chain(self.retiring.drain(..)).collect();
        for vu in &vus {
            vu.signal_stop();
        }

        let wait = async {
            for vu in vus.iter_mut() {
                if let Err(err) = (&mut vu.handle).await {
                    if err.is_panic() {
                        error!("VU {} panicked: {err}", vu.id);
                    }
                }
            }
        };

        if tokio::time::timeout(graceful_stop, wait).await.is_err() {
            let remaining = vus.iter().filter(|vu| !vu.handle.is_finished()).count();
            warn!(
                "{remaining} VUs did not finish within {}; aborting them.",
                humantime::format_duration(graceful_stop)
            );
            for vu in vus {
                vu.handle.abort();
            }
        }
    }
}
