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

//! CSV run logs under `log_file_path`:
//! - `<package>_<mode>.csv`: one row per task, in completion order;
//! - `<package>_<mode>_summary.csv`: one row per procedure.

use crate::domain::entities::{Mode, ProcedureSummary, TaskOutcome};
use crate::domain::errors::Result;
use crate::ports::run_log_port::{OutcomeWriter, RunLogPort};
use chrono::{DateTime, Local};
use csv::{Terminator, WriterBuilder};
use log::info;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

const OUTCOME_HEADER: [&str; 7] = [
    "SOL_ID",
    "PROCEDURE",
    "START_TIME",
    "END_TIME",
    "EXECUTION_TIME",
    "STATUS",
    "ERROR_DETAILS",
];

const SUMMARY_HEADER: [&str; 5] = [
    "PROCEDURE",
    "START_TIME",
    "END_TIME",
    "EXECUTION_TIME",
    "STATUS",
];

fn format_time(t: &DateTime<Local>) -> String {
    t.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Seconds with millisecond precision.
fn format_elapsed(d: Duration) -> String {
    format!("{:.3}", d.as_secs_f64())
}

/// `RunLogPort` backed by CSV files.
pub struct CsvRunLog {
    log_dir: PathBuf,
    package_name: String,
    mode: Mode,
}

impl CsvRunLog {
    pub fn new(log_dir: impl AsRef<Path>, package_name: &str, mode: Mode) -> Self {
        Self {
            log_dir: log_dir.as_ref().to_path_buf(),
            package_name: package_name.to_string(),
            mode,
        }
    }

    pub fn outcome_log_path(&self) -> PathBuf {
        self.log_dir
            .join(format!("{}_{}.csv", self.package_name, self.mode.label()))
    }

    pub fn summary_log_path(&self) -> PathBuf {
        self.log_dir
            .join(format!("{}_{}_summary.csv", self.package_name, self.mode.label()))
    }

    fn create_csv(path: &Path) -> Result<csv::Writer<File>> {
        let file = File::create(path)?;
        Ok(WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file))
    }
}

/// Outcome rows, flushed one by one so the file is tail-able mid-run.
struct CsvOutcomeWriter {
    wtr: csv::Writer<File>,
}

impl OutcomeWriter for CsvOutcomeWriter {
    fn write(&mut self, outcome: &TaskOutcome) -> Result<()> {
        self.wtr.write_record([
            outcome.sol_id.clone(),
            outcome.procedure.clone(),
            format_time(&outcome.start_time),
            format_time(&outcome.end_time),
            format_elapsed(outcome.elapsed),
            outcome.status.to_string(),
            outcome.error_details.clone().unwrap_or_default(),
        ])?;
        self.wtr.flush()?;
        Ok(())
    }
}

impl RunLogPort for CsvRunLog {
    fn open(&self) -> Result<Box<dyn OutcomeWriter>> {
        let summary_path = self.summary_log_path();
        let mut summary = Self::create_csv(&summary_path)?;
        summary.write_record(SUMMARY_HEADER)?;
        summary.flush()?;

        let path = self.outcome_log_path();
        let mut wtr = Self::create_csv(&path)?;
        wtr.write_record(OUTCOME_HEADER)?;
        wtr.flush()?;
        info!("📒 Writing task outcomes to {}", path.display());
        Ok(Box::new(CsvOutcomeWriter { wtr }))
    }

    fn write_summary(&self, summaries: &[ProcedureSummary]) -> Result<()> {
        let path = self.summary_log_path();
        let mut wtr = Self::create_csv(&path)?;
        wtr.write_record(SUMMARY_HEADER)?;
        for s in summaries {
            wtr.write_record([
                s.procedure.clone(),
                format_time(&s.start_time),
                format_time(&s.end_time),
                format_elapsed(s.duration()),
                s.status.to_string(),
            ])?;
        }
        wtr.flush()?;
        info!(
            "📒 Wrote summary for {} procedures to {}",
            summaries.len(),
            path.display()
        );
        Ok(())
    }
}
