//! Plain data shared by the loadcheck runtime and scenarios: run configuration, load profiles,
//! threshold expressions, metric descriptions and end-of-run statistics.
mod config;
mod constants;
mod error;
mod metrics;
mod profile;
mod stats;
mod threshold;

pub use config::*;
pub use constants::*;
pub use error::*;
pub use metrics::*;
pub use profile::*;
pub use stats::*;
pub use threshold::*;
