//! Bounded worker pool over independent snapshot records.
//!
//! Snapshots share nothing, so each record is parsed, optimized, and
//! summarized on whichever worker picks it up. Workers finish in arbitrary
//! order; every outcome carries its originating record index so callers can
//! restore input order when they need it.

use crate::engine::EngineError;
use crate::routing::{RouteOptimizer, SolvedRoute};
use crate::snapshot::{Snapshot, SnapshotError};
use log::warn;
use serde::Serialize;
use thiserror::Error;

/// Workers used when the caller does not choose a pool size.
pub const DEFAULT_WORKERS: usize = 8;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// What to do with each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// Optimize a fresh route per snapshot.
    Solve,
    /// Replay each snapshot's recorded baseline route (an absent baseline
    /// degrades to the depot-only route).
    ReplayBaseline,
}

/// Result of processing one record, tagged with its input index.
#[derive(Debug)]
pub struct SnapshotOutcome {
    pub index: usize,
    pub result: Result<SolvedRoute, BatchError>,
}

fn process_record(record: &str, mode: BatchMode) -> Result<SolvedRoute, BatchError> {
    let snapshot = Snapshot::from_yaml(record)?;
    let optimizer = RouteOptimizer::for_snapshot(&snapshot)?;
    match mode {
        BatchMode::Solve => Ok(optimizer.solve()?),
        BatchMode::ReplayBaseline => {
            Ok(optimizer.replay(snapshot.baseline_route().unwrap_or_default()))
        }
    }
}

/// Runs one optimizer per record on a pool of `workers` threads.
///
/// Outcomes are returned in completion order; a record that fails to parse
/// produces an error outcome instead of stopping the batch.
pub fn process_records(records: &[&str], mode: BatchMode, workers: usize) -> Vec<SnapshotOutcome> {
    let workers = workers.clamp(1, records.len().max(1));
    let (job_sender, job_receiver) = crossbeam_channel::unbounded::<(usize, &str)>();
    let (outcome_sender, outcome_receiver) = crossbeam_channel::unbounded::<SnapshotOutcome>();

    for (index, &record) in records.iter().enumerate() {
        // Receiver outlives this loop; unbounded sends cannot fail here
        let _ = job_sender.send((index, record));
    }
    drop(job_sender);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let jobs = job_receiver.clone();
            let outcomes = outcome_sender.clone();
            scope.spawn(move || {
                while let Ok((index, record)) = jobs.recv() {
                    let result = process_record(record, mode);
                    if let Err(error) = &result {
                        warn!("record {index} failed: {error}");
                    }
                    let _ = outcomes.send(SnapshotOutcome { index, result });
                }
            });
        }
        drop(outcome_sender);
        outcome_receiver.iter().collect()
    })
}

/// Per-record metric columns in input order, the shape downstream
/// comparison tooling consumes. Failed records are dropped from the
/// summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub distances: Vec<i64>,
    pub rewards: Vec<i64>,
    pub penalties: Vec<i64>,
    pub rewards_evolution: Vec<Vec<i64>>,
}

impl BatchSummary {
    pub fn from_outcomes(mut outcomes: Vec<SnapshotOutcome>) -> Self {
        outcomes.sort_by_key(|outcome| outcome.index);
        let mut summary = Self::default();
        for outcome in outcomes {
            if let Ok(route) = outcome.result {
                summary.distances.push(route.metrics.distance);
                summary.rewards.push(route.metrics.reward);
                summary.penalties.push(route.metrics.penalty);
                summary
                    .rewards_evolution
                    .push(route.metrics.reward_evolution);
            }
        }
        summary
    }
}
