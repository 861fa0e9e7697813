//! Smoke and stress scenarios for the calculator service.
//!
//! Both scenarios read the target from `BASE_URL` (default `http://localhost:8000`). The
//! `smoke` and `stress` binaries run them with their declared profiles, overridable from the
//! command line.
use loadcheck::core::{ConfigError, DEFAULT_BASE_URL, THRESHOLD_EXIT_CODE};
use loadcheck::http::HttpClient;
use loadcheck::scenario::ScenarioOutput;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::OnceLock;
#[allow(unused)]
use tracing::{error, info, warn};
use tracing_subscriber::FmtSubscriber;

pub mod payload;
pub mod smoke;
pub mod stress;

/// Address for an optional Prometheus scrape endpoint exposing the run's metrics live.
pub const PROMETHEUS_LISTEN_ENV: &str = "PROMETHEUS_LISTEN";

static CLIENT: OnceLock<HttpClient> = OnceLock::new();

/// Resolve `BASE_URL` once, failing on an invalid value.
pub fn init_client() -> Result<&'static HttpClient, ConfigError> {
    if let Some(client) = CLIENT.get() {
        return Ok(client);
    }

    let client = HttpClient::from_env()?;
    info!("Targeting {}", client.base_url());
    Ok(CLIENT.get_or_init(|| client))
}

/// The shared client. Falls back to the default target if `BASE_URL` is invalid and
/// [`init_client`] was never called.
pub fn client() -> &'static HttpClient {
    CLIENT.get_or_init(|| {
        HttpClient::from_env().unwrap_or_else(|err| {
            warn!("{err}; using {DEFAULT_BASE_URL}");
            HttpClient::new(DEFAULT_BASE_URL)
        })
    })
}

/// Logging for the binaries, plus a Prometheus endpoint when `PROMETHEUS_LISTEN` is set.
pub fn init() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loadcheck=info,load_tests=info".into()),
        )
        .init();

    if let Ok(addr) = std::env::var(PROMETHEUS_LISTEN_ENV) {
        let addr: SocketAddr = addr.parse()?;
        PrometheusBuilder::new().with_http_listener(addr).install()?;
        info!("Serving Prometheus metrics on {addr}");
    }

    init_client()?;
    Ok(())
}

/// `0` when every threshold passed, `99` when one failed and `1` when the run itself failed.
pub fn exit_status(output: &ScenarioOutput) -> u8 {
    match output {
        Ok(stats) if stats.passed() => 0,
        Ok(stats) => {
            for failed in stats.failed_thresholds() {
                error!("Threshold failed: {} {}", failed.metric, failed.expression);
            }
            THRESHOLD_EXIT_CODE
        }
        Err(err) => {
            error!("Run aborted: {err}");
            1
        }
    }
}

pub fn exit_code(output: &ScenarioOutput) -> ExitCode {
    ExitCode::from(exit_status(output))
}
