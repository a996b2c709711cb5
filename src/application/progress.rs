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

use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// Run-wide completion counter shared by all workers.
pub struct Progress {
    total: usize,
    current: AtomicUsize,
    overall_start: Instant,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            current: AtomicUsize::new(0),
            overall_start: Instant::now(),
        }
    }

    /// Counts one finished task and logs the running tally.
    pub fn increment(&self) -> usize {
        let done = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        let pct = if self.total == 0 {
            100.0
        } else {
            done as f64 * 100.0 / self.total as f64
        };
        info!(
            "📊 Progress: {}/{} ({:.1}%) | elapsed {:.1}s",
            done,
            self.total,
            pct,
            self.overall_start.elapsed().as_secs_f64()
        );
        done
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.total
    }
}
