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

//! # Worker
//!
//! A worker is a named OS thread that pulls tasks off the shared queue and
//! runs them through the dispatcher until either:
//! - the queue is closed and drained, or
//! - its cancel token fires (pool shrink or run abort).
//!
//! Cancellation is only observed between tasks; a task in flight always runs
//! to completion and always produces exactly one outcome.

use crate::application::cancellation::CancelToken;
use crate::application::dispatcher::TaskAction;
use crate::application::progress::Progress;
use crate::application::summary::SummaryAggregator;
use crate::domain::entities::{Task, TaskOutcome};
use chrono::Local;
use crossbeam_channel::{select, Receiver, Sender};
use log::{debug, error, warn};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Everything a worker thread shares with the rest of the pool.
#[derive(Clone)]
pub struct WorkerContext {
    pub tasks: Receiver<Task>,
    pub action: Arc<dyn TaskAction>,
    pub outcomes: Sender<TaskOutcome>,
    pub summary: Arc<SummaryAggregator>,
    pub progress: Arc<Progress>,
}

impl WorkerContext {
    /// Starts worker `id` on its own thread.
    pub fn spawn(&self, id: usize, cancel: CancelToken) -> std::io::Result<JoinHandle<()>> {
        let ctx = self.clone();
        thread::Builder::new()
            .name(format!("worker-{}", id))
            .spawn(move || ctx.run(id, cancel))
    }

    fn run(self, id: usize, cancel: CancelToken) {
        debug!("Worker {} started", id);
        let mut handled = 0usize;
        loop {
            if cancel.is_cancelled() {
                debug!("Worker {} retiring after {} tasks", id, handled);
                return;
            }
            let next = select! {
                recv(cancel.signal()) -> _ => None,
                recv(&self.tasks) -> msg => Some(msg),
            };
            match next {
                None => {
                    debug!("Worker {} retiring after {} tasks", id, handled);
                    return;
                }
                Some(Ok(task)) => {
                    self.handle(task);
                    handled += 1;
                }
                // Closed and empty.
                Some(Err(_)) => break,
            }
        }
        debug!("Worker {} finished: queue drained after {} tasks", id, handled);
    }

    /// Runs one task and publishes its outcome.
    pub fn handle(&self, task: Task) {
        let start_time = Local::now();
        let started = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.action.execute(&task)));
        let elapsed = started.elapsed();

        let result = match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!(
                    "❌ {} failed for SOL {}: {}",
                    task.procedure, task.sol_id, e
                );
                Err(e.to_string())
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                error!(
                    "❌ {} panicked for SOL {}: {}",
                    task.procedure, task.sol_id, msg
                );
                Err(format!("panic: {}", msg))
            }
        };

        let outcome = TaskOutcome::new(task, start_time, elapsed, result);
        self.summary.record(&outcome);
        if self.outcomes.send(outcome).is_err() {
            warn!("Outcome log is closed; task outcome not recorded");
        }
        self.progress.increment();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
