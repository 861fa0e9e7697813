use std::time::Duration;

/// Base URL used when `BASE_URL` is absent or empty.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment variable holding the target base URL.
pub const BASE_URL_ENV: &str = "BASE_URL";

/// How long stopping virtual users may take to finish their current iteration.
pub const DEFAULT_GRACEFUL_STOP: Duration = Duration::from_secs(30);

/// How often the runtime re-evaluates the target number of virtual users.
pub const RAMP_INTERVAL: Duration = Duration::from_millis(100);

/// Percentiles every trend reports, in addition to any a threshold asks for.
pub const DEFAULT_TREND_PERCENTILES: [f64; 2] = [90., 95.];

/// Process exit code used by the scenario binaries when a threshold fails.
pub const THRESHOLD_EXIT_CODE: u8 = 99;
