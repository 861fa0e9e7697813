#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod check;
pub mod error;
pub mod http;
pub mod metrics;
pub mod scenario;
pub mod summary;
#[doc(hidden)]
pub mod transaction;
pub mod weighted;

mod cli;
pub(crate) mod vu_pool;

pub use error::RunError;
pub use loadcheck_core as core;
pub use loadcheck_macros::{scenario, transaction};
pub use scenario::Scenario;

pub mod prelude {
    pub use crate::check::check;
    pub use crate::http::{HttpClient, Request, Response};
    pub use crate::metrics::{Counter, Rate, Trend};
    pub use crate::scenario::{ConfigurableScenario, ScenarioOutput};
    pub use crate::weighted::WeightedTable;
    pub use loadcheck_macros::{scenario, transaction};

    pub use loadcheck_core::{RunStatistics, Stage};
}
