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

//! Per-procedure roll-up of task outcomes, fed concurrently by workers.

use crate::application::lock_unpoisoned;
use crate::domain::entities::{ProcedureSummary, TaskOutcome};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct SummaryAggregator {
    by_procedure: Mutex<HashMap<String, ProcedureSummary>>,
    recorded: AtomicUsize,
    failed: AtomicUsize,
}

impl SummaryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: &TaskOutcome) {
        self.recorded.fetch_add(1, Ordering::SeqCst);
        if !outcome.is_success() {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        let mut map = lock_unpoisoned(&self.by_procedure);
        match map.get_mut(&outcome.procedure) {
            Some(summary) => summary.absorb(outcome),
            None => {
                map.insert(outcome.procedure.clone(), ProcedureSummary::from_outcome(outcome));
            }
        }
    }

    pub fn recorded(&self) -> usize {
        self.recorded.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Summaries in the order of `procedures`. Procedures that never ran
    /// are left out.
    pub fn finalize(&self, procedures: &[String]) -> Vec<ProcedureSummary> {
        let map = lock_unpoisoned(&self.by_procedure);
        procedures
            .iter()
            .filter_map(|p| map.get(p).cloned())
            .collect()
    }
}
