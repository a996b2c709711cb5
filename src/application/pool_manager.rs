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

//! # Dynamic Worker Pool
//!
//! The pool starts with `min_workers` threads. A manager thread wakes up every
//! `interval`, looks at how many tasks are still waiting in the queue and
//! applies at most one scaling event:
//!
//! - depth above the high watermark and room to grow: spawn one worker;
//! - depth below the low watermark and above the floor: retire the most
//!   recently spawned worker (LIFO) by cancelling its token.
//!
//! A retired worker finishes whatever task it holds before it exits, so no
//! task is lost or run twice.

use crate::application::cancellation::CancelToken;
use crate::application::worker::WorkerContext;
use crate::domain::entities::Task;
use crate::domain::errors::{MoverError, Result};
use crossbeam_channel::{select, tick, Receiver};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const DEFAULT_HIGH_WATERMARK: usize = 20;
pub const DEFAULT_LOW_WATERMARK: usize = 5;
pub const DEFAULT_MIN_WORKERS: usize = 2;
pub const DEFAULT_SCALE_INTERVAL: Duration = Duration::from_secs(1);

/// Bounds and thresholds for the pool manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalingPolicy {
    pub min_workers: usize,
    pub max_workers: usize,
    pub high_watermark: usize,
    pub low_watermark: usize,
    pub interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalingAction {
    ScaleUp,
    ScaleDown,
    NoChange,
}

impl ScalingPolicy {
    /// Policy with default watermarks and tick interval.
    pub fn new(min_workers: usize, max_workers: usize) -> Self {
        Self {
            min_workers,
            max_workers,
            high_watermark: DEFAULT_HIGH_WATERMARK,
            low_watermark: DEFAULT_LOW_WATERMARK,
            interval: DEFAULT_SCALE_INTERVAL,
        }
    }

    pub fn decide(&self, queue_depth: usize, workers: usize) -> ScalingAction {
        if queue_depth > self.high_watermark && workers < self.max_workers {
            ScalingAction::ScaleUp
        } else if queue_depth < self.low_watermark && workers > self.min_workers {
            ScalingAction::ScaleDown
        } else {
            ScalingAction::NoChange
        }
    }
}

/// What the pool went through during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub peak_workers: usize,
    pub low_workers: usize,
    pub scale_ups: usize,
    pub scale_downs: usize,
}

struct ActiveWorker {
    id: usize,
    cancel: CancelToken,
    handle: JoinHandle<()>,
}

/// The set of worker threads.
///
/// `active` is a stack: the last element is the newest worker and the first
/// to be retired. Retired workers keep their join handle until `join`.
pub struct WorkerPool {
    context: WorkerContext,
    policy: ScalingPolicy,
    root: CancelToken,
    active: Vec<ActiveWorker>,
    retired: Vec<JoinHandle<()>>,
    next_id: usize,
    stats: PoolStats,
}

impl WorkerPool {
    /// Spawns the initial `min_workers` workers.
    pub fn start(context: WorkerContext, policy: ScalingPolicy, root: CancelToken) -> Result<Self> {
        let mut pool = Self {
            context,
            policy,
            root,
            active: Vec::new(),
            retired: Vec::new(),
            next_id: 1,
            stats: PoolStats::default(),
        };
        for _ in 0..pool.policy.min_workers {
            pool.spawn_worker()?;
        }
        pool.stats.low_workers = pool.active.len();
        info!(
            "🚀 Started {} workers (max {})",
            pool.active.len(),
            pool.policy.max_workers
        );
        Ok(pool)
    }

    fn spawn_worker(&mut self) -> Result<()> {
        let id = self.next_id;
        let cancel = self.root.child();
        let handle = self
            .context
            .spawn(id, cancel.clone())
            .map_err(|e| {
                MoverError::WorkerError(format!("could not spawn worker {}: {}", id, e))
            })?;
        self.next_id += 1;
        self.active.push(ActiveWorker { id, cancel, handle });
        self.stats.peak_workers = self.stats.peak_workers.max(self.active.len());
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.active.len()
    }

    /// Adds one worker unless the ceiling is reached.
    pub fn scale_up(&mut self) -> Result<bool> {
        if self.active.len() >= self.policy.max_workers {
            return Ok(false);
        }
        self.spawn_worker()?;
        self.stats.scale_ups += 1;
        Ok(true)
    }

    /// Retires the newest worker unless the floor is reached.
    pub fn scale_down(&mut self) -> bool {
        if self.active.len() <= self.policy.min_workers {
            return false;
        }
        match self.active.pop() {
            Some(worker) => {
                worker.cancel.cancel();
                debug!("Retiring worker {}", worker.id);
                self.retired.push(worker.handle);
                self.stats.scale_downs += 1;
                self.stats.low_workers = self.stats.low_workers.min(self.active.len());
                true
            }
            None => false,
        }
    }

    /// Waits for every worker, active or retired, to exit.
    pub fn join(self) -> PoolStats {
        let handles = self
            .active
            .into_iter()
            .map(|w| w.handle)
            .chain(self.retired);
        for handle in handles {
            if handle.join().is_err() {
                error!("A worker thread terminated abnormally");
            }
        }
        self.stats
    }
}

/// Periodic controller for a `WorkerPool`.
pub struct PoolManager {
    pool: WorkerPool,
    queue: Receiver<Task>,
    root: CancelToken,
    input_closed: Arc<AtomicBool>,
}

impl PoolManager {
    /// `input_closed` is raised by the producer once every task is queued.
    pub fn new(
        pool: WorkerPool,
        queue: Receiver<Task>,
        root: CancelToken,
        input_closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            pool,
            queue,
            root,
            input_closed,
        }
    }

    /// Runs the control loop on its own thread. The pool is handed back when
    /// the loop ends so the caller can join the workers.
    pub fn spawn(self) -> Result<JoinHandle<WorkerPool>> {
        thread::Builder::new()
            .name("pool-manager".into())
            .spawn(move || self.run())
            .map_err(|e| MoverError::WorkerError(format!("could not spawn pool manager: {}", e)))
    }

    fn run(mut self) -> WorkerPool {
        let ticker = tick(self.pool.policy.interval);
        loop {
            let cancelled = select! {
                recv(self.root.signal()) -> _ => true,
                recv(ticker) -> _ => false,
            };
            if cancelled {
                info!("[Manager] Run cancelled; manager stopping");
                break;
            }
            if !self.on_tick() {
                debug!("[Manager] Queue drained; manager stopping");
                break;
            }
        }
        self.pool
    }

    /// One control step. Returns `false` once there is nothing left to manage.
    fn on_tick(&mut self) -> bool {
        let depth = self.queue.len();
        if depth == 0 && self.input_closed.load(Ordering::SeqCst) {
            return false;
        }
        let workers = self.pool.worker_count();
        match self.pool.policy.decide(depth, workers) {
            ScalingAction::ScaleUp => match self.pool.scale_up() {
                Ok(true) => info!(
                    "[Manager] Queue depth {}; scaled up to {} workers",
                    depth,
                    self.pool.worker_count()
                ),
                Ok(false) => {}
                Err(e) => warn!("[Manager] Scale-up failed: {}", e),
            },
            ScalingAction::ScaleDown => {
                if self.pool.scale_down() {
                    info!(
                        "[Manager] Queue depth {}; scaled down to {} workers",
                        depth,
                        self.pool.worker_count()
                    );
                }
            }
            ScalingAction::NoChange => {}
        }
        true
    }
}
