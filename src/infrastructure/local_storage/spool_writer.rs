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

//! Spool files: CSV with a header row, `\n` line endings, minimal quoting.

use crate::domain::errors::Result;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

pub const SPOOL_EXTENSION: &str = "spool";

/// `<procedure>_<sol>.spool`, or `<procedure>_<sol>_<key>.spool` for a split group.
pub fn spool_file_name(procedure: &str, sol_id: &str, split_key: Option<&str>) -> String {
    match split_key {
        Some(key) => format!("{}_{}_{}.{}", procedure, sol_id, key, SPOOL_EXTENSION),
        None => format!("{}_{}.{}", procedure, sol_id, SPOOL_EXTENSION),
    }
}

/// Joins split-column values into a file-name key.
///
/// Path separators would escape the spool directory, so they become `-`.
pub fn split_key(values: &[&str]) -> String {
    values
        .join("_")
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '-' } else { c })
        .collect()
}

/// Buffered CSV writer for one spool file.
pub struct SpoolWriter {
    writer: csv::Writer<BufWriter<File>>,
    rows: u64,
}

impl SpoolWriter {
    /// Creates (or truncates) `path` and writes the header row.
    pub fn create(path: impl AsRef<Path>, header: &[String]) -> Result<Self> {
        let file = File::create(path)?;
        let mut writer = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .quote_style(QuoteStyle::Necessary)
            .from_writer(BufWriter::with_capacity(128 * 1024, file));
        writer.write_record(header)?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write_row(&mut self, row: &[String]) -> Result<()> {
        self.writer.write_record(row)?;
        self.rows += 1;
        Ok(())
    }

    /// Flushes everything to disk and returns the number of data rows.
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush()?;
        Ok(self.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spool_file_names() {
        assert_eq!(spool_file_name("P1", "A", None), "P1_A.spool");
        assert_eq!(spool_file_name("P1", "A", Some("N")), "P1_A_N.spool");
        assert_eq!(split_key(&["N", "RET"]), "N_RET");
        assert_eq!(split_key(&["a/b", ""]), "a-b_");
    }

    #[test]
    fn test_writer_emits_header_and_quotes_when_needed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("P1_A.spool");
        let header = vec!["ID".to_string(), "NAME".to_string()];

        let mut writer = SpoolWriter::create(&path, &header).unwrap();
        writer.write_row(&["1".into(), "plain".into()]).unwrap();
        writer.write_row(&["2".into(), "with, comma".into()]).unwrap();
        writer.write_row(&["3".into(), "".into()]).unwrap();
        assert_eq!(writer.finish().unwrap(), 3);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "ID,NAME\n1,plain\n2,\"with, comma\"\n3,\n");
    }
}
