// Copyright 2026 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The core application logic that drives one run end to end.
//!
//! The orchestrator expands `SOLs x procedures` into tasks, wires the queue,
//! the worker pool, its manager and the outcome log together, waits for the
//! pool to drain and then writes the per-procedure summary. In Extract mode
//! it finishes by merging the spool files.

use crate::application::cancellation::CancelToken;
use crate::application::dispatcher::TaskAction;
use crate::application::pool_manager::{PoolManager, PoolStats, ScalingPolicy, WorkerPool};
use crate::application::progress::Progress;
use crate::application::summary::SummaryAggregator;
use crate::application::worker::WorkerContext;
use crate::domain::entities::{build_tasks, Mode, ProcedureSummary, TaskOutcome};
use crate::domain::errors::{MoverError, Result};
use crate::ports::merge_port::SpoolMergePort;
use crate::ports::run_log_port::{OutcomeWriter, RunLogPort};
use crossbeam_channel::{bounded, Receiver};
use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Knobs for a single run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub mode: Mode,
    pub policy: ScalingPolicy,
    /// Capacity of the outcome channel between workers and the log writer.
    pub outcome_buffer: usize,
}

/// What happened during a run.
#[derive(Debug)]
pub struct RunReport {
    pub total_tasks: usize,
    pub completed: usize,
    pub failed: usize,
    pub summaries: Vec<ProcedureSummary>,
    pub pool: PoolStats,
    pub elapsed: Duration,
    /// Merged files written; `None` when no merge ran.
    pub merged_files: Option<usize>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.completed - self.failed
    }
}

pub struct Orchestrator {
    action: Arc<dyn TaskAction>,
    run_log: Arc<dyn RunLogPort>,
    merger: Arc<dyn SpoolMergePort>,
    settings: RunSettings,
    root: CancelToken,
}

impl Orchestrator {
    pub fn new(
        action: Arc<dyn TaskAction>,
        run_log: Arc<dyn RunLogPort>,
        merger: Arc<dyn SpoolMergePort>,
        settings: RunSettings,
    ) -> Self {
        Self {
            action,
            run_log,
            merger,
            settings,
            root: CancelToken::new(),
        }
    }

    /// Cancelling this token stops the run: workers finish their current
    /// task and exit, queued tasks are abandoned and no merge is performed.
    pub fn cancel_token(&self) -> CancelToken {
        self.root.clone()
    }

    pub fn run(&self, sols: &[String], procedures: &[String]) -> Result<RunReport> {
        let started = Instant::now();
        let tasks = build_tasks(sols, procedures);
        let total = tasks.len();
        info!(
            "Starting {} run: {} SOLs x {} procedures = {} tasks",
            self.settings.mode.label(),
            sols.len(),
            procedures.len(),
            total
        );

        let mut outcome_log = self.run_log.open()?;

        // Sized to the whole task list so submission never blocks.
        let (task_tx, task_rx) = bounded(total.max(1));
        let (outcome_tx, outcome_rx) = bounded(self.settings.outcome_buffer.max(1));

        let log_writer = thread::Builder::new()
            .name("run-log".into())
            .spawn(move || record_outcomes(outcome_log.as_mut(), outcome_rx))
            .map_err(|e| MoverError::WorkerError(format!("could not spawn log writer: {}", e)))?;

        let summary = Arc::new(SummaryAggregator::new());
        let context = WorkerContext {
            tasks: task_rx.clone(),
            action: Arc::clone(&self.action),
            outcomes: outcome_tx,
            summary: Arc::clone(&summary),
            progress: Arc::new(Progress::new(total)),
        };
        let pool = WorkerPool::start(context, self.settings.policy.clone(), self.root.clone())?;

        let input_closed = Arc::new(AtomicBool::new(false));
        let manager =
            PoolManager::new(pool, task_rx, self.root.clone(), Arc::clone(&input_closed)).spawn()?;

        let mut submitted = 0;
        for task in tasks {
            if self.root.is_cancelled() {
                warn!("Run cancelled; {} tasks were never queued", total - submitted);
                break;
            }
            if task_tx.send(task).is_err() {
                break;
            }
            submitted += 1;
        }
        drop(task_tx);
        input_closed.store(true, Ordering::SeqCst);
        info!("All {} tasks queued; waiting for workers", submitted);

        let pool = manager
            .join()
            .map_err(|_| MoverError::WorkerError("pool manager terminated abnormally".into()))?;
        // Joining the pool drops the last outcome sender, which ends the log writer.
        let pool_stats = pool.join();
        let log_result = log_writer.join().unwrap_or_else(|_| {
            Err(MoverError::WorkerError(
                "outcome log writer terminated abnormally".into(),
            ))
        });
        if let Ok(written) = &log_result {
            info!("Outcome log complete ({} entries)", written);
        }

        let summaries = summary.finalize(procedures);
        let summary_result = self.run_log.write_summary(&summaries);
        if let Err(e) = &summary_result {
            error!("Could not write the run summary: {}", e);
        }

        let merged_files = match self.settings.mode {
            Mode::Extract if self.root.is_cancelled() => {
                warn!("Run was cancelled; skipping spool merge");
                None
            }
            Mode::Extract => match self.merger.merge(sols, procedures) {
                Ok(n) => Some(n),
                Err(e) => {
                    error!("Spool merge failed: {}", e);
                    None
                }
            },
            Mode::Insert => None,
        };

        let report = RunReport {
            total_tasks: total,
            completed: summary.recorded(),
            failed: summary.failed(),
            summaries,
            pool: pool_stats,
            elapsed: started.elapsed(),
            merged_files,
        };
        info!(
            "🏁 Run finished in {:.1}s: {} tasks, {} succeeded, {} failed \
             (peak {} workers, {} scale-ups, {} scale-downs)",
            report.elapsed.as_secs_f64(),
            report.total_tasks,
            report.succeeded(),
            report.failed,
            report.pool.peak_workers,
            report.pool.scale_ups,
            report.pool.scale_downs
        );
        log_result?;
        summary_result?;
        Ok(report)
    }
}

/// Drains the outcome channel into the log until every worker is gone.
///
/// After a failed write the channel is still drained so no worker blocks on
/// it; the first error is returned.
fn record_outcomes(
    log: &mut dyn OutcomeWriter,
    outcomes: Receiver<TaskOutcome>,
) -> Result<usize> {
    let mut written = 0;
    let mut failure = None;
    for outcome in outcomes.iter() {
        if failure.is_some() {
            continue;
        }
        match log.write(&outcome) {
            Ok(()) => written += 1,
            Err(e) => {
                error!("Outcome log write failed; remaining outcomes are not logged: {}", e);
                failure = Some(e);
            }
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(written),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatcher::InsertAction;
    use crate::application::extract_action::ExtractAction;
    use crate::application::lock_unpoisoned;
    use crate::config::{ExtractionConfig, MergeConfig};
    use crate::domain::entities::{ColumnSpec, Task, TaskStatus, Templates};
    use crate::ports::extraction_port::{ExtractionPort, RowSink};
    use crate::ports::procedure_port::ProcedurePort;
    use std::collections::{HashMap, HashSet};
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryRunLog {
        outcomes: Arc<Mutex<Vec<TaskOutcome>>>,
        summaries: Mutex<Vec<ProcedureSummary>>,
        fail_open: bool,
        /// Writes accepted before the log starts failing.
        fail_after: Option<usize>,
    }

    struct MemoryOutcomes {
        sink: Arc<Mutex<Vec<TaskOutcome>>>,
        remaining: Option<usize>,
    }

    impl OutcomeWriter for MemoryOutcomes {
        fn write(&mut self, outcome: &TaskOutcome) -> Result<()> {
            match self.remaining.as_mut() {
                Some(0) => {
                    let full = std::io::Error::new(std::io::ErrorKind::Other, "no space left");
                    return Err(MoverError::IoError(full));
                }
                Some(n) => *n -= 1,
                None => {}
            }
            lock_unpoisoned(&self.sink).push(outcome.clone());
            Ok(())
        }
    }

    impl RunLogPort for MemoryRunLog {
        fn open(&self) -> Result<Box<dyn OutcomeWriter>> {
            if self.fail_open {
                return Err(MoverError::IoError(std::io::ErrorKind::PermissionDenied.into()));
            }
            Ok(Box::new(MemoryOutcomes {
                sink: Arc::clone(&self.outcomes),
                remaining: self.fail_after,
            }))
        }

        fn write_summary(&self, summaries: &[ProcedureSummary]) -> Result<()> {
            *lock_unpoisoned(&self.summaries) = summaries.to_vec();
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingMerger {
        calls: Mutex<Vec<(Vec<String>, Vec<String>)>>,
    }

    impl SpoolMergePort for RecordingMerger {
        fn merge(&self, sols: &[String], procedures: &[String]) -> Result<usize> {
            lock_unpoisoned(&self.calls).push((sols.to_vec(), procedures.to_vec()));
            Ok(procedures.len())
        }
    }

    struct Sleep(Duration);

    impl TaskAction for Sleep {
        fn execute(&self, _task: &Task) -> Result<()> {
            thread::sleep(self.0);
            Ok(())
        }
    }

    /// Rows keyed by SOL; REGION is the second column.
    struct RegionRows;

    impl ExtractionPort for RegionRows {
        fn stream_rows(
            &self,
            _table: &str,
            _columns: &[String],
            sol_id: &str,
            sink: &mut dyn RowSink,
        ) -> Result<u64> {
            let rows = [("1", "N"), ("2", "S"), ("3", "N")];
            sink.begin()?;
            for (id, region) in rows {
                sink.row(vec![format!("{}-{}", sol_id, id), region.to_string()])?;
            }
            Ok(rows.len() as u64)
        }
    }

    #[derive(Default)]
    struct Counting(AtomicUsize);

    impl TaskAction for Counting {
        fn execute(&self, _task: &Task) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingProcedure;

    impl ProcedurePort for FailingProcedure {
        fn call_procedure(&self, _package: &str, _procedure: &str, _sol_id: &str) -> Result<()> {
            Err(MoverError::DatabaseError("ORA-20001: posting failed".into()))
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn settings(mode: Mode, min: usize, max: usize) -> RunSettings {
        RunSettings {
            mode,
            policy: ScalingPolicy {
                interval: Duration::from_millis(10),
                ..ScalingPolicy::new(min, max)
            },
            outcome_buffer: 1000,
        }
    }

    fn extract_action(dir: &Path, split: Option<&[&str]>) -> Arc<dyn TaskAction> {
        let mut split_rules = HashMap::new();
        if let Some(cols) = split {
            split_rules.insert("P1".to_string(), strings(cols));
        }
        let config = ExtractionConfig {
            procedures: strings(&["P1"]),
            package_name: "PKG".into(),
            template_path: dir.to_string_lossy().into_owned(),
            spool_output_path: dir.to_string_lossy().into_owned(),
            split_rules,
            prefetch_rows: None,
            merge: MergeConfig::default(),
        };
        let mut templates = Templates::new();
        templates.insert(
            "P1".into(),
            vec![ColumnSpec::named("ID"), ColumnSpec::named("REGION")],
        );
        Arc::new(ExtractAction::new(
            Arc::new(config),
            Arc::new(templates),
            Arc::new(RegionRows),
        ))
    }

    fn orchestrator(
        action: Arc<dyn TaskAction>,
        settings: RunSettings,
    ) -> (Orchestrator, Arc<MemoryRunLog>, Arc<RecordingMerger>) {
        with_log(action, settings, MemoryRunLog::default())
    }

    fn with_log(
        action: Arc<dyn TaskAction>,
        settings: RunSettings,
        log: MemoryRunLog,
    ) -> (Orchestrator, Arc<MemoryRunLog>, Arc<RecordingMerger>) {
        let log = Arc::new(log);
        let merger = Arc::new(RecordingMerger::default());
        let orch = Orchestrator::new(action, log.clone(), merger.clone(), settings);
        (orch, log, merger)
    }

    #[test]
    fn test_extract_two_sols_without_split() {
        let dir = tempfile::tempdir().unwrap();
        let (orch, log, merger) =
            orchestrator(extract_action(dir.path(), None), settings(Mode::Extract, 2, 4));

        let report = orch.run(&strings(&["A", "B"]), &strings(&["P1"])).unwrap();

        assert!(dir.path().join("P1_A.spool").exists());
        assert!(dir.path().join("P1_B.spool").exists());
        assert_eq!(report.total_tasks, 2);
        assert_eq!(report.completed, 2);
        assert_eq!(report.failed, 0);

        let outcomes = lock_unpoisoned(&log.outcomes);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == TaskStatus::Success));
        let summaries = lock_unpoisoned(&log.summaries);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].procedure, "P1");

        assert_eq!(lock_unpoisoned(&merger.calls).len(), 1);
        assert_eq!(report.merged_files, Some(1));
    }

    #[test]
    fn test_extract_with_split_rule() {
        let dir = tempfile::tempdir().unwrap();
        let (orch, _log, _merger) = orchestrator(
            extract_action(dir.path(), Some(&["REGION"])),
            settings(Mode::Extract, 2, 4),
        );

        orch.run(&strings(&["A"]), &strings(&["P1"])).unwrap();

        let north = std::fs::read_to_string(dir.path().join("P1_A_N.spool")).unwrap();
        let south = std::fs::read_to_string(dir.path().join("P1_A_S.spool")).unwrap();
        assert_eq!(north, "ID,REGION\nA-1,N\nA-3,N\n");
        assert_eq!(south, "ID,REGION\nA-2,S\n");
        assert!(!dir.path().join("P1_A.spool").exists());
    }

    #[test]
    fn test_insert_failure_marks_summary_failed() {
        let action = Arc::new(InsertAction::new("PKG", Arc::new(FailingProcedure)));
        let (orch, log, merger) = orchestrator(action, settings(Mode::Insert, 2, 4));

        let report = orch.run(&strings(&["A"]), &strings(&["P1"])).unwrap();

        assert_eq!(report.failed, 1);
        let outcomes = lock_unpoisoned(&log.outcomes);
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, TaskStatus::Fail);
        assert!(outcomes[0].error_details.as_deref().unwrap().contains("ORA-20001"));
        assert_eq!(lock_unpoisoned(&log.summaries)[0].status, TaskStatus::Fail);
        assert!(lock_unpoisoned(&merger.calls).is_empty());
        assert_eq!(report.merged_files, None);
    }

    #[test]
    fn test_backlog_scales_pool_within_bounds() {
        let sols: Vec<String> = (1..=200).map(|i| format!("S{:03}", i)).collect();
        let (orch, log, _merger) = orchestrator(
            Arc::new(Sleep(Duration::from_millis(10))),
            settings(Mode::Insert, 2, 16),
        );

        let report = orch.run(&sols, &strings(&["P1"])).unwrap();

        assert!(report.pool.peak_workers >= 3, "peak was {}", report.pool.peak_workers);
        assert!(report.pool.peak_workers <= 16);
        assert_eq!(report.completed, 200);
        assert_eq!(lock_unpoisoned(&log.outcomes).len(), 200);
    }

    #[test]
    fn test_cancellation_mid_run_loses_and_duplicates_nothing() {
        let sols: Vec<String> = (1..=200).map(|i| format!("S{:03}", i)).collect();
        let (orch, log, merger) = orchestrator(
            Arc::new(Sleep(Duration::from_millis(10))),
            settings(Mode::Extract, 2, 4),
        );

        let token = orch.cancel_token();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(60));
            token.cancel();
        });
        let report = orch.run(&sols, &strings(&["P1"])).unwrap();
        canceller.join().unwrap();

        let outcomes = lock_unpoisoned(&log.outcomes);
        assert!(outcomes.len() < 200);
        assert_eq!(outcomes.len(), report.completed);
        let unique: HashSet<&str> = outcomes.iter().map(|o| o.sol_id.as_str()).collect();
        assert_eq!(unique.len(), outcomes.len());
        assert!(outcomes.iter().all(|o| o.end_time >= o.start_time));
        assert!(lock_unpoisoned(&merger.calls).is_empty());
    }

    #[test]
    fn test_empty_sol_list_is_a_clean_no_op() {
        let (orch, log, _merger) =
            orchestrator(Arc::new(Sleep(Duration::ZERO)), settings(Mode::Insert, 2, 4));

        let report = orch.run(&[], &strings(&["P1", "P2"])).unwrap();

        assert_eq!(report.total_tasks, 0);
        assert_eq!(report.completed, 0);
        assert_eq!(report.pool.scale_ups, 0);
        assert!(report.summaries.is_empty());
        assert!(lock_unpoisoned(&log.outcomes).is_empty());
    }

    #[test]
    fn test_single_task_stays_at_min_workers() {
        let (orch, _log, _merger) =
            orchestrator(Arc::new(Sleep(Duration::ZERO)), settings(Mode::Insert, 2, 8));

        let report = orch.run(&strings(&["A"]), &strings(&["P1"])).unwrap();
        assert_eq!(report.pool.peak_workers, 2);
        assert_eq!(report.completed, 1);
    }

    #[test]
    fn test_unopenable_run_log_aborts_before_any_task() {
        let action = Arc::new(Counting::default());
        let log = MemoryRunLog {
            fail_open: true,
            ..MemoryRunLog::default()
        };
        let (orch, log, merger) = with_log(action.clone(), settings(Mode::Extract, 2, 4), log);

        let err = orch
            .run(&strings(&["A", "B"]), &strings(&["P1"]))
            .unwrap_err();

        assert!(matches!(err, MoverError::IoError(_)));
        assert_eq!(action.0.load(Ordering::SeqCst), 0);
        assert!(lock_unpoisoned(&log.summaries).is_empty());
        assert!(lock_unpoisoned(&merger.calls).is_empty());
    }

    #[test]
    fn test_outcome_log_failure_still_summarises_and_merges() {
        let action = Arc::new(Counting::default());
        let log = MemoryRunLog {
            fail_after: Some(1),
            ..MemoryRunLog::default()
        };
        let (orch, log, merger) = with_log(action.clone(), settings(Mode::Extract, 2, 4), log);

        let err = orch
            .run(&strings(&["A", "B", "C"]), &strings(&["P1"]))
            .unwrap_err();

        assert!(matches!(err, MoverError::IoError(_)));
        assert_eq!(action.0.load(Ordering::SeqCst), 3);
        assert_eq!(lock_unpoisoned(&log.outcomes).len(), 1);
        let summaries = lock_unpoisoned(&log.summaries);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].status, TaskStatus::Success);
        assert_eq!(lock_unpoisoned(&merger.calls).len(), 1);
    }
}
