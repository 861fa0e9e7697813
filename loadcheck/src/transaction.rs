use crate::metrics::{observe, Observation};
use std::cell::Cell;
use std::future::Future;
use std::time::{Duration, Instant};

tokio::task_local! {
    static HTTP_TIME: Cell<Option<Duration>>;
}

/// Metric names a transaction records into.
#[derive(Copy, Clone, Debug)]
pub struct TransactionLabels {
    /// Trend receiving the response time of every call, in milliseconds.
    pub latency: &'static str,
    /// Counter incremented when the call returns `Ok`.
    pub success: &'static str,
    /// Counter incremented when the call returns `Err`.
    pub error: &'static str,
    /// Rate receiving `true` for every `Err` and `false` for every `Ok`.
    pub error_rate: &'static str,
}

/// Transaction hook used by the `#[transaction]` macro. Not intended to be used manually.
///
/// Each call records exactly one latency observation and exactly one of the success or error
/// outcomes. The latency is the summed duration of the HTTP responses received during the call,
/// or the call's elapsed time if it made no request.
pub async fn transaction_hook<T, R, E>(labels: TransactionLabels, func: T) -> T::Output
where
    T: Future<Output = Result<R, E>>,
{
    let start = Instant::now();
    let (res, http_time) = HTTP_TIME
        .scope(Cell::new(None), async {
            let res = func.await;
            (res, HTTP_TIME.with(Cell::get))
        })
        .await;
    let latency = http_time.unwrap_or_else(|| start.elapsed());

    observe(
        labels.latency,
        Observation::Trend(latency.as_secs_f64() * 1_000.),
    );

    if res.is_ok() {
        observe(labels.success, Observation::Counter(1));
    } else {
        observe(labels.error, Observation::Counter(1));
    }
    observe(labels.error_rate, Observation::Rate(res.is_err()));

    res
}

/// Attribute a response time to the enclosing transaction, if any.
pub(crate) fn record_http_time(duration: Duration) {
    let _ = HTTP_TIME.try_with(|total| total.set(Some(total.get().unwrap_or_default() + duration)));
}
