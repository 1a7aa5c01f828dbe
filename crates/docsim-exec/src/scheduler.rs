//! Bounded parallel evaluation of independent scenarios.
//!
//! Scenarios share nothing mutable, so they fan out over a dedicated rayon
//! pool sized to `max_parallel_scenarios`. Each one runs under its own
//! `catch_unwind`: a panic loses that scenario only. Results come back in
//! input order whatever the interleaving.

use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, warn};

use crate::report::ScenarioReport;
use crate::runtime::{ExecError, Simulator};
use crate::scenario::Scenario;

/// Map `f` over `items` on at most `max_parallel` threads. `None` marks an
/// item whose call panicked.
pub fn run_bounded<T, R, F>(items: &[T], max_parallel: usize, f: F) -> Vec<Option<R>>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
{
    let guarded = |(i, item): (usize, &T)| {
        let out = catch_unwind(AssertUnwindSafe(|| f(item))).ok();
        if out.is_none() {
            warn!(item = i, "scenario worker panicked");
        }
        out
    };

    let workers = max_parallel.max(1).min(items.len());
    if workers <= 1 {
        return items.iter().enumerate().map(guarded).collect();
    }
    match ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool.install(|| items.par_iter().enumerate().map(guarded).collect()),
        Err(e) => {
            warn!(error = %e, "thread pool unavailable, running sequentially");
            items.iter().enumerate().map(guarded).collect()
        }
    }
}

/// Run every scenario, at most `max_parallel_scenarios` at a time.
pub fn run_all(sim: &Simulator, scenarios: &[Scenario]) -> Vec<Result<ScenarioReport, ExecError>> {
    let max_parallel = sim.config().max_parallel_scenarios;
    debug!(scenarios = scenarios.len(), max_parallel, "running scenarios");
    run_bounded(scenarios, max_parallel, |s| sim.run(s))
        .into_iter()
        .zip(scenarios)
        .map(|(r, s)| r.unwrap_or_else(|| Err(ExecError::Worker(s.name.clone()))))
        .collect()
}
