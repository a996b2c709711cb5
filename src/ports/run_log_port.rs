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

//! # Run Log Port
//!
//! The consumer side of the outcome channel, plus the per-procedure summary
//! written once the pool has drained.

use crate::domain::entities::{ProcedureSummary, TaskOutcome};
use crate::domain::errors::Result;

/// An opened outcome log. Lives on the log thread for the whole run.
pub trait OutcomeWriter: Send {
    /// Appends one outcome; it must be visible on disk when this returns.
    fn write(&mut self, outcome: &TaskOutcome) -> Result<()>;
}

pub trait RunLogPort: Send + Sync {
    /// Creates both log destinations before any task runs.
    ///
    /// An error here aborts the run with nothing executed.
    fn open(&self) -> Result<Box<dyn OutcomeWriter>>;

    /// Writes the final per-procedure roll-up.
    fn write_summary(&self, summaries: &[ProcedureSummary]) -> Result<()>;
}
