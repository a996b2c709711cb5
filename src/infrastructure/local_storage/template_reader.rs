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

//! # Template Reader
//!
//! Column templates live at `<template_path>/<procedure>.csv`. A template is
//! a CSV file with a header row; the column list is read, in order, from the
//! `name` (or `column_name`) column. A `type` (or `data_type`) column is
//! carried along when present. Header matching ignores case.
//!
//! Names must be plain or double-quoted column identifiers; expressions are
//! rejected. CSV escaping applies, so a quoted name is written `"""Acct No"""`.

use crate::domain::entities::{ColumnSpec, Templates};
use crate::domain::errors::{MoverError, Result};
use crate::infrastructure::oracle::sql_utils::is_valid_column;
use csv::{ReaderBuilder, Trim};
use log::info;
use std::path::Path;

const NAME_HEADERS: &[&str] = &["name", "column_name"];
const TYPE_HEADERS: &[&str] = &["type", "data_type"];

/// Loads the template of every procedure. Any failure is fatal to the run.
pub fn load_templates(template_path: &str, procedures: &[String]) -> Result<Templates> {
    let mut templates = Templates::with_capacity(procedures.len());
    for proc in procedures {
        let path = Path::new(template_path).join(format!("{}.csv", proc));
        let columns = read_columns(&path).map_err(|e| MoverError::TemplateError {
            procedure: proc.clone(),
            reason: format!("{} ({})", e, path.display()),
        })?;
        info!("Loaded template for {} ({} columns)", proc, columns.len());
        templates.insert(proc.clone(), columns);
    }
    Ok(templates)
}

/// Reads the ordered column list from a single template file.
pub fn read_columns(path: &Path) -> Result<Vec<ColumnSpec>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let find = |candidates: &[&str]| {
        headers
            .iter()
            .position(|h| candidates.iter().any(|c| h.eq_ignore_ascii_case(c)))
    };
    let name_idx = find(NAME_HEADERS).ok_or_else(|| {
        MoverError::ConfigError("template has no 'name' or 'column_name' header".into())
    })?;
    let type_idx = find(TYPE_HEADERS);

    let mut columns = Vec::new();
    for record in reader.records() {
        let record = record?;
        let name = match record.get(name_idx) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => continue,
        };
        if !is_valid_column(&name) {
            return Err(MoverError::ConfigError(format!(
                "column '{}' is not a valid identifier",
                name
            )));
        }
        let data_type = type_idx
            .and_then(|i| record.get(i))
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        columns.push(ColumnSpec { name, data_type });
    }

    if columns.is_empty() {
        return Err(MoverError::ConfigError("template lists no columns".into()));
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_reads_columns_in_order_with_types() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "LOAN_MASTER.csv",
            "Column_Name,Data_Type,Remarks\nSOL_ID,VARCHAR2,branch\nACCT_NO, VARCHAR2 ,\n\nBALANCE,,\n",
        );
        let cols = read_columns(&dir.path().join("LOAN_MASTER.csv")).unwrap();
        assert_eq!(
            cols,
            vec![
                ColumnSpec { name: "SOL_ID".into(), data_type: Some("VARCHAR2".into()) },
                ColumnSpec { name: "ACCT_NO".into(), data_type: Some("VARCHAR2".into()) },
                ColumnSpec { name: "BALANCE".into(), data_type: None },
            ]
        );
    }

    #[test]
    fn test_load_templates_for_all_procedures() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "P1.csv", "name\nA\nB\n");
        write(dir.path(), "P2.csv", "name\nC\n");
        let procs = vec!["P1".to_string(), "P2".to_string()];
        let templates = load_templates(dir.path().to_str().unwrap(), &procs).unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates["P1"].len(), 2);
        assert_eq!(templates["P2"][0].name, "C");
    }

    #[test]
    fn test_missing_template_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "P1.csv", "name\nA\n");
        let procs = vec!["P1".to_string(), "P2".to_string()];
        let err = load_templates(dir.path().to_str().unwrap(), &procs).unwrap_err();
        match err {
            MoverError::TemplateError { procedure, .. } => assert_eq!(procedure, "P2"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_template_without_name_header_or_rows_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "NOHDR.csv", "col,type\nA,NUMBER\n");
        write(dir.path(), "EMPTY.csv", "name\n");
        write(dir.path(), "BAD.csv", "name\nA;B\n");
        assert!(read_columns(&dir.path().join("NOHDR.csv")).is_err());
        assert!(read_columns(&dir.path().join("EMPTY.csv")).is_err());
        assert!(read_columns(&dir.path().join("BAD.csv")).is_err());
    }

    #[test]
    fn test_quoted_column_names_are_kept_and_expressions_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let body = "name,type\nSOL_ID,\n\"\"\"Acct No\"\"\",NUMBER\n";
        write(dir.path(), "P1.csv", body);
        write(dir.path(), "EXPR.csv", "name\nSUBSTR(ACCT_NO, 1, 3)\n");

        let cols = read_columns(&dir.path().join("P1.csv")).unwrap();
        assert_eq!(cols[1].name, "\"Acct No\"");
        assert_eq!(cols[1].data_type.as_deref(), Some("NUMBER"));
        assert!(read_columns(&dir.path().join("EXPR.csv")).is_err());
    }
}
