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

//! # Extract Action
//!
//! Extract mode work for one task: select the template columns of the
//! procedure's table for one SOL and spool them to CSV.
//!
//! Without a split rule the rows stream straight into
//! `<procedure>_<sol>.spool`. With a split rule the rows are grouped by the
//! values of the split columns and each group lands in
//! `<procedure>_<sol>_<key>.spool`.

use crate::application::dispatcher::TaskAction;
use crate::config::ExtractionConfig;
use crate::domain::entities::{Task, Templates};
use crate::domain::errors::{MoverError, Result};
use crate::infrastructure::local_storage::spool_writer::{
    spool_file_name, split_key, SpoolWriter,
};
use crate::ports::extraction_port::{ExtractionPort, RowSink};
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct ExtractAction {
    config: Arc<ExtractionConfig>,
    templates: Arc<Templates>,
    port: Arc<dyn ExtractionPort>,
}

impl ExtractAction {
    pub fn new(
        config: Arc<ExtractionConfig>,
        templates: Arc<Templates>,
        port: Arc<dyn ExtractionPort>,
    ) -> Self {
        Self {
            config,
            templates,
            port,
        }
    }

    fn spool_dir(&self) -> &Path {
        Path::new(&self.config.spool_output_path)
    }

    /// Positions of the split columns within the template, matched ignoring case.
    fn split_indices(
        &self,
        task: &Task,
        names: &[String],
        split: &[String],
    ) -> Result<Vec<usize>> {
        split
            .iter()
            .map(|col| {
                names
                    .iter()
                    .position(|n| n.eq_ignore_ascii_case(col))
                    .ok_or_else(|| MoverError::ExtractionError {
                        procedure: task.procedure.clone(),
                        sol_id: task.sol_id.clone(),
                        reason: format!("split column {} is not in the template", col),
                    })
            })
            .collect()
    }

    fn extract_plain(&self, task: &Task, names: &[String]) -> Result<u64> {
        let path = self
            .spool_dir()
            .join(spool_file_name(&task.procedure, &task.sol_id, None));
        let mut sink = PlainSink {
            path: &path,
            header: names,
            writer: None,
        };
        self.port
            .stream_rows(&task.procedure, names, &task.sol_id, &mut sink)
            .map_err(|e| wrap(task, e))?;
        let rows = match sink.writer {
            Some(writer) => writer.finish()?,
            // A port that never called begin still owes the header-only file.
            None => SpoolWriter::create(&path, names)?.finish()?,
        };
        debug!("Spooled {} rows to {}", rows, path.display());
        Ok(rows)
    }

    fn extract_split(&self, task: &Task, names: &[String], indices: &[usize]) -> Result<u64> {
        let mut sink = SplitSink {
            indices,
            groups: BTreeMap::new(),
        };
        self.port
            .stream_rows(&task.procedure, names, &task.sol_id, &mut sink)
            .map_err(|e| wrap(task, e))?;

        if sink.groups.is_empty() {
            debug!(
                "No rows for {} / SOL {}; no split files written",
                task.procedure, task.sol_id
            );
        }

        let mut total = 0;
        for (key, rows) in sink.groups {
            let path: PathBuf = self
                .spool_dir()
                .join(spool_file_name(&task.procedure, &task.sol_id, Some(&key)));
            let mut writer = SpoolWriter::create(&path, names)?;
            for row in &rows {
                writer.write_row(row)?;
            }
            total += writer.finish()?;
        }
        Ok(total)
    }
}

/// Streams rows into `<procedure>_<sol>.spool`, created once the query is accepted.
struct PlainSink<'a> {
    path: &'a Path,
    header: &'a [String],
    writer: Option<SpoolWriter>,
}

impl RowSink for PlainSink<'_> {
    fn begin(&mut self) -> Result<()> {
        if self.writer.is_none() {
            self.writer = Some(SpoolWriter::create(self.path, self.header)?);
        }
        Ok(())
    }

    fn row(&mut self, row: Vec<String>) -> Result<()> {
        self.begin()?;
        match self.writer.as_mut() {
            Some(writer) => writer.write_row(&row),
            None => Ok(()),
        }
    }
}

/// Buffers rows by split key; files are written after the query completes.
struct SplitSink<'a> {
    indices: &'a [usize],
    groups: BTreeMap<String, Vec<Vec<String>>>,
}

impl RowSink for SplitSink<'_> {
    fn row(&mut self, row: Vec<String>) -> Result<()> {
        let values: Vec<&str> = self.indices.iter().map(|&i| row[i].as_str()).collect();
        self.groups.entry(split_key(&values)).or_default().push(row);
        Ok(())
    }
}

fn wrap(task: &Task, e: MoverError) -> MoverError {
    match e {
        MoverError::ExtractionError { .. } => e,
        other => MoverError::ExtractionError {
            procedure: task.procedure.clone(),
            sol_id: task.sol_id.clone(),
            reason: other.to_string(),
        },
    }
}

impl TaskAction for ExtractAction {
    fn execute(&self, task: &Task) -> Result<()> {
        let columns = self
            .templates
            .get(&task.procedure)
            .ok_or_else(|| MoverError::MissingTemplate(task.procedure.clone()))?;
        let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();

        let rows = match self.config.split_columns(&task.procedure) {
            Some(split) => {
                let indices = self.split_indices(task, &names, split)?;
                self.extract_split(task, &names, &indices)?
            }
            None => self.extract_plain(task, &names)?,
        };
        info!(
            "✅ Extracted {} rows for {} (SOL {})",
            rows, task.procedure, task.sol_id
        );
        Ok(())
    }
}
