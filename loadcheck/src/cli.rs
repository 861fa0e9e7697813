use clap::Parser;
use loadcheck_core::ScenarioConfig;
use std::path::PathBuf;
use std::time::Duration;
#[allow(unused)]
use tracing::{debug, warn};

/// Command line overrides shared by every scenario binary.
#[derive(Parser, Debug)]
#[command(version, about = "Run a loadcheck scenario against $BASE_URL")]
pub(crate) struct LoadCli {
    /// Number of virtual users for a constant run
    #[arg(short = 'u', long)]
    vus: Option<usize>,

    /// Run for a fixed duration instead of the declared profile, e.g. `30s` or `2m`
    #[arg(short, long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,

    /// Where to write the JSON summary
    #[arg(long)]
    summary_export: Option<PathBuf>,

    /// Record metrics but do not judge thresholds
    #[arg(long)]
    no_thresholds: bool,
}

impl LoadCli {
    pub fn apply(self, config: &mut ScenarioConfig) {
        if let Some(duration) = self.duration {
            config.duration = Some(duration);
            config.stages.clear();
        }

        if let Some(vus) = self.vus {
            if config.stages.is_empty() {
                config.vus = Some(vus);
            } else {
                warn!("--vus is ignored for a staged scenario unless --duration is also given.");
            }
        }

        if let Some(path) = self.summary_export {
            config.summary_export = Some(path);
        }

        if self.no_thresholds {
            config.skip_thresholds = true;
        }

        debug!("Configuration after CLI overrides: {config:?}");
    }
}
