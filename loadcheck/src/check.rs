//! Named, non-fatal assertions over a [`Response`].
//!
//! ```no_run
//! # use loadcheck::http::Response;
//! use loadcheck::check::check;
//!
//! # fn example(res: &Response) -> bool {
//! check(res)
//!     .that("health: status is 200", |r| r.status == 200)
//!     .that("health: body is json", |r| r.json().is_some())
//!     .passed()
//! # }
//! ```
//!
//! Every predicate is evaluated, even after an earlier one failed, and each outcome is recorded
//! into the built-in `checks` rate and the per-check tallies of the summary.
use crate::http::Response;
use crate::metrics::observe_check;
#[allow(unused)]
use tracing::{debug, trace};

pub fn check(res: &Response) -> Check<'_> {
    Check { res, passed: true }
}

#[must_use = "call `.passed()` to learn whether every check held"]
pub struct Check<'a> {
    res: &'a Response,
    passed: bool,
}

impl<'a> Check<'a> {
    pub fn that<P>(mut self, name: &'static str, predicate: P) -> Self
    where
        P: FnOnce(&Response) -> bool,
    {
        let ok = predicate(self.res);
        if !ok {
            debug!("Check failed: {name} (status {})", self.res.status);
        }
        observe_check(name, ok);
        self.passed &= ok;
        self
    }

    /// `true` when every predicate held.
    pub fn passed(self) -> bool {
        self.passed
    }
}
