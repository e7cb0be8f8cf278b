//! Parallel analysis of many positions.
//!
//! Requests are grouped into work units of `positions_per_engine`
//! consecutive positions, or spread evenly over the pool when that is `0`.
//! A fixed number of worker slots claim units from a shared atomic cursor,
//! run one engine invocation per unit, and report each outcome back keyed by
//! the request's submission index. The report is assembled in submission
//! order once every slot has finished.
//!
//! Slots live in a [`JoinSet`], so dropping the batch future aborts them and
//! with them every engine process and result file they hold.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use uuid::Uuid;
use xgid_core::PositionRequest;

use crate::engine::AnalysisEngine;
use crate::result::AnalysisResult;
use crate::AnalysisError;

/// The outcome recorded for one submitted request.
#[derive(Debug)]
pub struct PositionOutcome {
    pub request: PositionRequest,
    pub result: Result<AnalysisResult, AnalysisError>,
}

impl PositionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes of a batch, in submission order.
#[derive(Debug)]
pub struct BatchReport {
    run_id: Uuid,
    outcomes: Vec<PositionOutcome>,
}

impl BatchReport {
    /// Identifier correlating this batch's log lines.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn outcomes(&self) -> &[PositionOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }
}

/// Returns the automatic pool size: available CPUs minus two, at least one.
pub fn auto_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_sub(2)
        .max(1)
}

/// Runs batches of requests across a bounded pool of engine processes.
#[derive(Debug, Clone)]
pub struct Coordinator {
    engine: Arc<AnalysisEngine>,
    workers: usize,
    positions_per_engine: usize,
}

type SlotReport = (usize, Result<AnalysisResult, AnalysisError>);

impl Coordinator {
    /// Creates a coordinator with automatic pool sizing and one position
    /// per engine invocation.
    pub fn new(engine: AnalysisEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            workers: 0,
            positions_per_engine: 1,
        }
    }

    /// Sets the pool size; `0` selects [`auto_workers`].
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets how many consecutive positions share one engine process; `0`
    /// gives every worker a single engine process with an even share.
    pub fn with_positions_per_engine(mut self, positions: usize) -> Self {
        self.positions_per_engine = positions;
        self
    }

    pub fn engine(&self) -> &AnalysisEngine {
        &self.engine
    }

    pub fn positions_per_engine(&self) -> usize {
        self.positions_per_engine
    }

    /// Returns the number of slots used for `units` work units.
    pub fn pool_size(&self, units: usize) -> usize {
        let requested = if self.workers == 0 {
            auto_workers()
        } else {
            self.workers
        };
        requested.min(units).max(1)
    }

    /// Splits `total` positions into the work units one batch will run.
    fn plan(&self, total: usize) -> Vec<Range<usize>> {
        match self.positions_per_engine {
            0 => spread_units(total, self.pool_size(total)),
            size => work_units(total, size),
        }
    }

    /// Analyses every request and returns one outcome per request, in order.
    ///
    /// A failing position never cancels the others. Failures of a batched
    /// invocation are recorded against each position it covered.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EngineNotFound`] before any position is
    /// scheduled if the engine executable is missing.
    pub async fn analyze_all(
        &self,
        requests: Vec<PositionRequest>,
    ) -> Result<BatchReport, AnalysisError> {
        self.engine.ensure_available()?;

        let run_id = Uuid::new_v4();
        let total = requests.len();
        if total == 0 {
            return Ok(BatchReport {
                run_id,
                outcomes: Vec::new(),
            });
        }

        let units = Arc::new(self.plan(total));
        let slots = self.pool_size(units.len());
        tracing::info!(
            %run_id,
            "Analysing {} position(s) in {} invocation(s) across {} worker(s)",
            total,
            units.len(),
            slots
        );

        let requests = Arc::new(requests);
        let cursor = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel::<SlotReport>();

        let mut workers = JoinSet::new();
        for slot in 0..slots {
            let engine = Arc::clone(&self.engine);
            let requests = Arc::clone(&requests);
            let units = Arc::clone(&units);
            let cursor = Arc::clone(&cursor);
            let tx = tx.clone();

            workers.spawn(async move {
                while let Some(range) = units.get(cursor.fetch_add(1, Ordering::Relaxed)) {
                    run_unit(slot, &engine, &requests, range.clone(), &tx).await;
                }
            });
        }
        drop(tx);

        let mut collected: Vec<Option<Result<AnalysisResult, AnalysisError>>> =
            (0..total).map(|_| None).collect();
        let mut done = 0;
        while let Some((index, outcome)) = rx.recv().await {
            let Some(entry) = collected.get_mut(index) else {
                continue;
            };
            if entry.is_some() {
                tracing::warn!(%run_id, "Duplicate outcome for position {} ignored", index);
                continue;
            }
            done += 1;
            match &outcome {
                Ok(_) => tracing::info!(%run_id, "[{}/{}] {} analysed", done, total, requests[index].xgid()),
                Err(e) => tracing::warn!(%run_id, "[{}/{}] {} failed: {}", done, total, requests[index].xgid(), e),
            }
            *entry = Some(outcome);
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!(%run_id, "Worker slot stopped abnormally: {}", e);
            }
        }

        let requests = Arc::try_unwrap(requests).unwrap_or_else(|shared| (*shared).clone());
        let outcomes = assemble(requests, collected);

        let report = BatchReport { run_id, outcomes };
        tracing::info!(
            %run_id,
            "Batch finished: {} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        );
        Ok(report)
    }
}

async fn run_unit(
    slot: usize,
    engine: &AnalysisEngine,
    requests: &[PositionRequest],
    range: Range<usize>,
    tx: &mpsc::UnboundedSender<SlotReport>,
) {
    tracing::debug!("Slot {} claimed positions {}..{}", slot, range.start, range.end);

    // Sends only fail once the receiver is gone, when nobody is listening.
    match engine.analyze_batch(&requests[range.clone()]).await {
        Ok(results) => {
            for (index, result) in range.zip(results) {
                let _ = tx.send((index, Ok(result)));
            }
        }
        Err(e) => {
            for index in range {
                let _ = tx.send((index, Err(e.duplicate())));
            }
        }
    }
}

/// Splits `0..total` into consecutive ranges of at most `size` indices.
fn work_units(total: usize, size: usize) -> Vec<Range<usize>> {
    let size = size.max(1);
    (0..total)
        .step_by(size)
        .map(|start| start..(start + size).min(total))
        .collect()
}

/// Splits `0..total` into at most `parts` consecutive ranges whose sizes
/// differ by at most one, larger ranges first.
fn spread_units(total: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.max(1);
    let (base, extra) = (total / parts, total % parts);
    let mut start = 0;
    (0..parts)
        .map(|k| base + usize::from(k < extra))
        .filter(|&size| size > 0)
        .map(|size| {
            let range = start..start + size;
            start += size;
            range
        })
        .collect()
}

/// Pairs each request with its outcome; unreported slots become failures.
fn assemble(
    requests: Vec<PositionRequest>,
    collected: Vec<Option<Result<AnalysisResult, AnalysisError>>>,
) -> Vec<PositionOutcome> {
    requests
        .into_iter()
        .zip(collected)
        .enumerate()
        .map(|(index, (request, outcome))| PositionOutcome {
            result: outcome.unwrap_or_else(|| {
                Err(AnalysisError::Internal(format!(
                    "no outcome was reported for position {} ({})",
                    index,
                    request.xgid()
                )))
            }),
            request,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailureKind;
    use xgid_core::Xgid;

    const XGIDS: [&str; 3] = [
        "XGID=-b----E-C---eE---c-e----B-:0:0:1:63:0:0:0:0:10",
        "XGID=-a-BBBB-----cD--b-cbbcb-A-:1:1:1:00:0:0:0:0:10",
        "XGID=aa--BBBB-----cD--b-cbbc--A:0:0:-1:52:0:0:0:0:10",
    ];

    fn requests() -> Vec<PositionRequest> {
        XGIDS
            .iter()
            .map(|x| PositionRequest::new(Xgid::parse(x).unwrap()))
            .collect()
    }

    #[test]
    fn test_work_units() {
        assert_eq!(work_units(5, 1), vec![0..1, 1..2, 2..3, 3..4, 4..5]);
        assert_eq!(work_units(5, 2), vec![0..2, 2..4, 4..5]);
        assert_eq!(work_units(3, 10), vec![0..3]);
        assert_eq!(work_units(3, 0), vec![0..1, 1..2, 2..3]);
        assert!(work_units(0, 4).is_empty());
    }

    #[test]
    fn test_spread_units() {
        assert_eq!(spread_units(10, 4), vec![0..3, 3..6, 6..8, 8..10]);
        assert_eq!(spread_units(6, 3), vec![0..2, 2..4, 4..6]);
        assert_eq!(spread_units(2, 5), vec![0..1, 1..2]);
        assert_eq!(spread_units(3, 0), vec![0..3]);
        assert!(spread_units(0, 4).is_empty());
    }

    #[test]
    fn test_auto_workers_is_positive() {
        assert!(auto_workers() >= 1);
    }

    #[test]
    fn test_pool_size_is_bounded_by_units() {
        let coordinator = Coordinator::new(AnalysisEngine::new("gnubg")).with_workers(8);
        assert_eq!(coordinator.pool_size(3), 3);
        assert_eq!(coordinator.pool_size(20), 8);
        assert_eq!(coordinator.pool_size(0), 1);

        let auto = Coordinator::new(AnalysisEngine::new("gnubg"));
        assert!(auto.pool_size(100) >= 1);
        assert!(auto.pool_size(100) <= auto_workers());
    }

    #[test]
    fn test_plan_follows_positions_per_engine() {
        let grouped = Coordinator::new(AnalysisEngine::new("gnubg"))
            .with_workers(3)
            .with_positions_per_engine(4);
        assert_eq!(grouped.plan(10), vec![0..4, 4..8, 8..10]);

        let spread = grouped.clone().with_positions_per_engine(0);
        assert_eq!(spread.plan(10), vec![0..4, 4..7, 7..10]);
        assert_eq!(spread.plan(2), vec![0..1, 1..2]);

        let auto = Coordinator::new(AnalysisEngine::new("gnubg")).with_positions_per_engine(0);
        assert_eq!(auto.plan(100).len(), auto.pool_size(100));
    }

    #[test]
    fn test_assemble_fills_missing_outcomes() {
        let requests = requests();
        let collected = vec![
            Some(Err(AnalysisError::ChannelEmpty("/tmp/x".into()))),
            None,
            Some(Err(AnalysisError::EngineTimeout(std::time::Duration::from_secs(1)))),
        ];

        let outcomes = assemble(requests, collected);
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[1].request.xgid().as_str(), XGIDS[1]);
        match &outcomes[1].result {
            Err(AnalysisError::Internal(msg)) => assert!(msg.contains("position 1")),
            other => panic!("Expected Internal, got {:?}", other),
        }
        assert_eq!(
            outcomes[2].result.as_ref().unwrap_err().kind(),
            FailureKind::EngineTimeout
        );
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let exe = tempfile::NamedTempFile::new().unwrap();
        let report = Coordinator::new(AnalysisEngine::new(exe.path()))
            .analyze_all(Vec::new())
            .await
            .unwrap();
        assert!(report.is_empty());
        assert_eq!(report.succeeded(), 0);
        assert_eq!(report.failed(), 0);
    }

    #[tokio::test]
    async fn test_missing_engine_fails_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let engine = AnalysisEngine::new(dir.path().join("no-such-gnubg"))
            .with_temp_dir(Some(dir.path().to_path_buf()));
        let err = Coordinator::new(engine)
            .with_workers(2)
            .with_positions_per_engine(2)
            .analyze_all(requests())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), FailureKind::EngineNotFound);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_spawn_failure_is_recorded_per_position() {
        let dir = tempfile::tempdir().unwrap();
        // Exists but lacks the execute bit, so every spawn is refused.
        let exe = dir.path().join("gnubg");
        std::fs::write(&exe, "").unwrap();
        let engine = AnalysisEngine::new(&exe).with_temp_dir(Some(dir.path().to_path_buf()));

        let report = Coordinator::new(engine)
            .with_workers(2)
            .with_positions_per_engine(2)
            .analyze_all(requests())
            .await
            .unwrap();

        assert_eq!(report.len(), 3);
        assert_eq!(report.failed(), 3);
        for (outcome, xgid) in report.outcomes().iter().zip(XGIDS) {
            assert_eq!(outcome.request.xgid().as_str(), xgid);
            assert_eq!(outcome.result.as_ref().unwrap_err().kind(), FailureKind::Io);
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
