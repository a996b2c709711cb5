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

//! # Domain Entities
//!
//! The "Nouns" of a run: the work items (`Task`), the column templates that
//! shape an extract, and the records produced once work is done
//! (`TaskOutcome`, `ProcedureSummary`).

use crate::domain::errors::{MoverError, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Operating mode, fixed for the whole run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mode {
    /// Run a templated SELECT per task and write spool files.
    Extract,
    /// Call `<package>.<procedure>(sol_id)` per task.
    Insert,
}

impl Mode {
    /// Word used in log file names (`<package>_extract.csv`).
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Extract => "extract",
            Mode::Insert => "insert",
        }
    }
}

impl FromStr for Mode {
    type Err = MoverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "E" => Ok(Mode::Extract),
            "I" => Ok(Mode::Insert),
            other => Err(MoverError::ConfigError(format!(
                "Invalid mode '{}'. Valid values are 'E' for Extract and 'I' for Insert.",
                other
            ))),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Extract => write!(f, "E"),
            Mode::Insert => write!(f, "I"),
        }
    }
}

/// One unit of work: a procedure applied to a single SOL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    pub sol_id: String,
    pub procedure: String,
}

impl Task {
    pub fn new(sol_id: impl Into<String>, procedure: impl Into<String>) -> Self {
        Self {
            sol_id: sol_id.into(),
            procedure: procedure.into(),
        }
    }
}

/// Builds the flat task list `sols x procedures`, SOL-major.
pub fn build_tasks(sols: &[String], procedures: &[String]) -> Vec<Task> {
    sols.iter()
        .flat_map(|sol| procedures.iter().map(move |proc| Task::new(sol.as_str(), proc.as_str())))
        .collect()
}

/// A single output column in a procedure template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name as selected from the table (e.g., "ACCT_NO").
    pub name: String,
    /// Informational type hint carried by the template, if any.
    pub data_type: Option<String>,
}

impl ColumnSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
        }
    }
}

/// Procedure name -> ordered column list. Loaded once, read-only afterwards.
pub type Templates = HashMap<String, Vec<ColumnSpec>>;

/// Final state of a task (or the roll-up of a procedure).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Success,
    Fail,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Success => write!(f, "SUCCESS"),
            TaskStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// The "Report Card" for one executed task.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub sol_id: String,
    pub procedure: String,
    pub start_time: DateTime<Local>,
    /// Derived from `start_time + elapsed`, so it never precedes `start_time`.
    pub end_time: DateTime<Local>,
    pub elapsed: Duration,
    pub status: TaskStatus,
    /// Textual form of the error when `status` is `Fail`.
    pub error_details: Option<String>,
}

impl TaskOutcome {
    /// Assembles an outcome from the dispatch result of `task`.
    pub fn new(
        task: Task,
        start_time: DateTime<Local>,
        elapsed: Duration,
        result: std::result::Result<(), String>,
    ) -> Self {
        let end_time = start_time
            + chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());
        let (status, error_details) = match result {
            Ok(()) => (TaskStatus::Success, None),
            Err(e) => (TaskStatus::Fail, Some(e)),
        };
        Self {
            sol_id: task.sol_id,
            procedure: task.procedure,
            start_time,
            end_time,
            elapsed,
            status,
            error_details,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}

/// Per-procedure roll-up across every SOL.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProcedureSummary {
    pub procedure: String,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub status: TaskStatus,
}

impl ProcedureSummary {
    /// Starts a summary from the first outcome seen for a procedure.
    pub fn from_outcome(outcome: &TaskOutcome) -> Self {
        Self {
            procedure: outcome.procedure.clone(),
            start_time: outcome.start_time,
            end_time: outcome.end_time,
            status: outcome.status,
        }
    }

    /// Folds another outcome in. `Fail` is absorbing.
    pub fn absorb(&mut self, outcome: &TaskOutcome) {
        if outcome.start_time < self.start_time {
            self.start_time = outcome.start_time;
        }
        if outcome.end_time > self.end_time {
            self.end_time = outcome.end_time;
        }
        if outcome.status == TaskStatus::Fail {
            self.status = TaskStatus::Fail;
        }
    }

    pub fn duration(&self) -> Duration {
        (self.end_time - self.start_time)
            .to_std()
            .unwrap_or_default()
    }
}
