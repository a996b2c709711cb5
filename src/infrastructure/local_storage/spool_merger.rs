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

//! # Spool Merger
//!
//! Post-processing for Extract mode. Every SOL produced its own spool file
//! per procedure; the merger stitches them into one CSV per procedure:
//!
//! - plain procedures: `<procedure>_<sol>.spool` for each SOL, in SOL-list
//!   order, into `<procedure>.csv`;
//! - split procedures: `<procedure>_<sol>_<key>.spool` grouped by `<key>`
//!   across SOLs, into `<procedure>_<key>.csv` (keys in sorted order).
//!
//! The header is written once. Sources whose header disagrees with the first
//! one fail that procedure's merge. SOLs without a spool file (failed or
//! empty split extracts) are skipped.

use crate::config::ExtractionConfig;
use crate::domain::errors::{MoverError, Result};
use crate::infrastructure::local_storage::spool_writer::{spool_file_name, SPOOL_EXTENSION};
use crate::ports::merge_port::SpoolMergePort;
use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// `SpoolMergePort` over the local spool directory.
pub struct SpoolMerger {
    spool_dir: PathBuf,
    output_dir: PathBuf,
    split_procedures: HashSet<String>,
    enabled: bool,
    remove_spools: bool,
}

impl SpoolMerger {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            spool_dir: PathBuf::from(&config.spool_output_path),
            output_dir: PathBuf::from(config.merge_output_path()),
            split_procedures: config
                .split_rules
                .iter()
                .filter(|(_, cols)| !cols.is_empty())
                .map(|(proc, _)| proc.clone())
                .collect(),
            enabled: config.merge.enabled,
            remove_spools: config.merge.remove_spools,
        }
    }

    fn merge_plain(&self, procedure: &str, sols: &[String]) -> Result<usize> {
        let sources: Vec<PathBuf> = sols
            .iter()
            .map(|sol| self.spool_dir.join(spool_file_name(procedure, sol, None)))
            .filter(|p| {
                let exists = p.exists();
                if !exists {
                    warn!("No spool file {} to merge", p.display());
                }
                exists
            })
            .collect();
        if sources.is_empty() {
            return Ok(0);
        }
        let dest = self.output_dir.join(format!("{}.csv", procedure));
        self.concat(procedure, &sources, &dest)?;
        Ok(1)
    }

    fn merge_split(
        &self,
        procedure: &str,
        sols: &[String],
        spool_names: &[String],
    ) -> Result<usize> {
        let mut groups: BTreeMap<String, Vec<(usize, PathBuf)>> = BTreeMap::new();
        for name in spool_names {
            if let Some((sol_idx, key)) = match_split_file(procedure, sols, name) {
                groups
                    .entry(key)
                    .or_default()
                    .push((sol_idx, self.spool_dir.join(name)));
            }
        }

        let mut merged = 0;
        for (key, mut sources) in groups {
            sources.sort_by_key(|(idx, _)| *idx);
            let paths: Vec<PathBuf> = sources.into_iter().map(|(_, p)| p).collect();
            let dest = self.output_dir.join(format!("{}_{}.csv", procedure, key));
            self.concat(procedure, &paths, &dest)?;
            merged += 1;
        }
        Ok(merged)
    }

    /// Writes `sources` into `dest` with a single header row.
    fn concat(&self, procedure: &str, sources: &[PathBuf], dest: &Path) -> Result<u64> {
        let file = File::create(dest)?;
        let mut wtr = WriterBuilder::new()
            .terminator(Terminator::Any(b'\n'))
            .from_writer(BufWriter::with_capacity(128 * 1024, file));

        let mut header: Option<StringRecord> = None;
        let mut rows = 0u64;
        for src in sources {
            let mut rdr = ReaderBuilder::new().has_headers(true).from_path(src)?;
            let src_header = rdr.headers()?.clone();
            match &header {
                None => {
                    wtr.write_record(&src_header)?;
                    header = Some(src_header);
                }
                Some(h) if !h.iter().eq(src_header.iter()) => {
                    return Err(MoverError::MergeError {
                        procedure: procedure.to_string(),
                        reason: format!(
                            "header of {} differs from the first spool file",
                            src.display()
                        ),
                    });
                }
                Some(_) => {}
            }
            for record in rdr.records() {
                wtr.write_record(&record?)?;
                rows += 1;
            }
        }
        wtr.flush()?;
        info!(
            "🧩 Merged {} spool files ({} rows) into {}",
            sources.len(),
            rows,
            dest.display()
        );

        if self.remove_spools {
            for src in sources {
                if let Err(e) = std::fs::remove_file(src) {
                    warn!("Could not remove merged spool {}: {}", src.display(), e);
                }
            }
        }
        Ok(rows)
    }

    fn list_spool_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.spool_dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(&format!(".{}", SPOOL_EXTENSION)) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

/// Resolves `<procedure>_<sol>_<key>.spool` to `(sol index, key)`.
///
/// SOLs may contain `_`, so the longest SOL that fits wins.
fn match_split_file(procedure: &str, sols: &[String], file_name: &str) -> Option<(usize, String)> {
    let rest = file_name
        .strip_prefix(procedure)?
        .strip_prefix('_')?
        .strip_suffix(SPOOL_EXTENSION)?
        .strip_suffix('.')?;
    sols.iter()
        .enumerate()
        .filter_map(|(idx, sol)| {
            rest.strip_prefix(sol.as_str())
                .and_then(|r| r.strip_prefix('_'))
                .map(|key| (idx, sol.len(), key.to_string()))
        })
        .max_by_key(|(_, len, _)| *len)
        .map(|(idx, _, key)| (idx, key))
}

impl SpoolMergePort for SpoolMerger {
    fn merge(&self, sols: &[String], procedures: &[String]) -> Result<usize> {
        if !self.enabled {
            info!("Spool merge disabled; leaving per-SOL spool files in place");
            return Ok(0);
        }
        std::fs::create_dir_all(&self.output_dir)?;
        let spool_names = if self.split_procedures.is_empty() {
            Vec::new()
        } else {
            self.list_spool_files()?
        };

        let mut merged = 0;
        let mut failed = Vec::new();
        for proc in procedures {
            let res = if self.split_procedures.contains(proc) {
                self.merge_split(proc, sols, &spool_names)
            } else {
                self.merge_plain(proc, sols)
            };
            match res {
                Ok(n) => {
                    debug!("Merged {} files for {}", n, proc);
                    merged += n;
                }
                Err(e) => {
                    error!("Merge failed for {}: {}", proc, e);
                    failed.push(proc.clone());
                }
            }
        }

        if failed.is_empty() {
            Ok(merged)
        } else {
            Err(MoverError::MergeError {
                procedure: failed.join(", "),
                reason: format!("{} procedure(s) could not be merged", failed.len()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MergeConfig;
    use std::collections::HashMap;

    fn config(spool: &Path, split: &[(&str, &[&str])]) -> ExtractionConfig {
        ExtractionConfig {
            procedures: vec![],
            package_name: "PKG".into(),
            template_path: "/unused".into(),
            spool_output_path: spool.to_str().unwrap().into(),
            split_rules: split
                .iter()
                .map(|(p, cols)| (p.to_string(), cols.iter().map(|c| c.to_string()).collect()))
                .collect::<HashMap<_, _>>(),
            prefetch_rows: None,
            merge: MergeConfig::default(),
        }
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_match_split_file_prefers_longest_sol() {
        let sols = strings(&["A", "A_B"]);
        assert_eq!(match_split_file("P1", &sols, "P1_A_N.spool"), Some((0, "N".into())));
        assert_eq!(match_split_file("P1", &sols, "P1_A_B_N.spool"), Some((1, "N".into())));
        assert_eq!(match_split_file("P1", &sols, "P2_A_N.spool"), None);
        assert_eq!(match_split_file("P1", &sols, "P1_C_N.spool"), None);
    }

    #[test]
    fn test_merge_plain_in_sol_order_with_single_header() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("P1_B.spool"), "ID,V\n3,c\n").unwrap();
        std::fs::write(dir.path().join("P1_A.spool"), "ID,V\n1,a\n2,b\n").unwrap();

        let merger = SpoolMerger::new(&config(dir.path(), &[]));
        let merged = merger
            .merge(&strings(&["A", "B", "MISSING"]), &strings(&["P1"]))
            .unwrap();
        assert_eq!(merged, 1);
        let content = std::fs::read_to_string(dir.path().join("P1.csv")).unwrap();
        assert_eq!(content, "ID,V\n1,a\n2,b\n3,c\n");
    }

    #[test]
    fn test_merge_split_groups_by_key_across_sols() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("P1_A_N.spool"), "ID,REGION\n1,N\n").unwrap();
        std::fs::write(dir.path().join("P1_A_S.spool"), "ID,REGION\n2,S\n").unwrap();
        std::fs::write(dir.path().join("P1_B_N.spool"), "ID,REGION\n3,N\n").unwrap();

        let merger = SpoolMerger::new(&config(dir.path(), &[("P1", &["REGION"])]));
        let merged = merger.merge(&strings(&["A", "B"]), &strings(&["P1"])).unwrap();
        assert_eq!(merged, 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("P1_N.csv")).unwrap(),
            "ID,REGION\n1,N\n3,N\n"
        );
        assert_eq!(
            std::fs::read_to_string(dir.path().join("P1_S.csv")).unwrap(),
            "ID,REGION\n2,S\n"
        );
    }

    #[test]
    fn test_header_mismatch_fails_procedure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("P1_A.spool"), "ID,V\n1,a\n").unwrap();
        std::fs::write(dir.path().join("P1_B.spool"), "ID,W\n2,b\n").unwrap();

        let merger = SpoolMerger::new(&config(dir.path(), &[]));
        let err = merger.merge(&strings(&["A", "B"]), &strings(&["P1"])).unwrap_err();
        assert!(matches!(err, MoverError::MergeError { .. }));
    }

    #[test]
    fn test_disabled_merge_is_noop_and_remove_spools() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("P1_A.spool"), "ID\n1\n").unwrap();

        let mut cfg = config(dir.path(), &[]);
        cfg.merge.enabled = false;
        assert_eq!(SpoolMerger::new(&cfg).merge(&strings(&["A"]), &strings(&["P1"])).unwrap(), 0);
        assert!(!dir.path().join("P1.csv").exists());

        cfg.merge.enabled = true;
        cfg.merge.remove_spools = true;
        assert_eq!(SpoolMerger::new(&cfg).merge(&strings(&["A"]), &strings(&["P1"])).unwrap(), 1);
        assert!(dir.path().join("P1.csv").exists());
        assert!(!dir.path().join("P1_A.spool").exists());
    }
}
