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

//! Utility functions for generating Oracle SQL statements.
//!
//! Table, column, package and procedure names come from configuration and
//! templates and are spliced into SQL text, so every one of them must pass
//! `is_valid_identifier` first (columns may also be double-quoted, see
//! `is_valid_column`). The SOL itself is always a bind variable.

use crate::domain::errors::{MoverError, Result};

/// Accepts plain, unquoted Oracle identifiers, optionally schema-qualified
/// (`OWNER.TABLE`). Letters first, then letters, digits, `_`, `$` or `#`.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(c) if c.is_ascii_alphabetic() => {
                    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#'))
                }
                _ => false,
            }
        })
}

/// Oracle caps quoted identifiers at 128 bytes.
const MAX_QUOTED_LEN: usize = 128;

/// A column is either a plain identifier or a double-quoted one
/// (`"Acct No"`). Quoted names keep their case and may hold any printable
/// character except `"`. Expressions are not columns.
pub fn is_valid_column(name: &str) -> bool {
    if is_valid_identifier(name) {
        return true;
    }
    match name.strip_prefix('"').and_then(|n| n.strip_suffix('"')) {
        Some(inner) => {
            !inner.is_empty()
                && inner.len() <= MAX_QUOTED_LEN
                && !inner.chars().any(|c| c == '"' || c.is_control())
        }
        None => false,
    }
}

fn ensure_identifier(kind: &str, name: &str) -> Result<()> {
    ensure(kind, name, is_valid_identifier(name))
}

fn ensure(kind: &str, name: &str, valid: bool) -> Result<()> {
    if valid {
        Ok(())
    } else {
        Err(MoverError::ConfigError(format!(
            "{} '{}' is not a valid SQL identifier",
            kind, name
        )))
    }
}

/// `SELECT c1, c2, ... FROM <table> WHERE SOL_ID = :1`
pub fn build_extract_query(table: &str, columns: &[String]) -> Result<String> {
    ensure_identifier("table", table)?;
    if columns.is_empty() {
        return Err(MoverError::ConfigError(format!(
            "no columns to select from {}",
            table
        )));
    }
    for col in columns {
        ensure("column", col, is_valid_column(col))?;
    }
    Ok(format!(
        "SELECT {} FROM {} WHERE SOL_ID = :1",
        columns.join(", "),
        table
    ))
}

/// Anonymous PL/SQL block calling `<package>.<procedure>(:1)`.
pub fn build_procedure_call(package: &str, procedure: &str) -> Result<String> {
    ensure_identifier("package", package)?;
    ensure_identifier("procedure", procedure)?;
    Ok(format!("BEGIN {}.{}(:1); END;", package, procedure))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_rules() {
        assert!(is_valid_identifier("LOAN_MASTER"));
        assert!(is_valid_identifier("acct$no#2"));
        assert!(is_valid_identifier("MIGR.LOAN_MASTER"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1ABC"));
        assert!(!is_valid_identifier("A B"));
        assert!(!is_valid_identifier("X;DROP"));
        assert!(!is_valid_identifier("\"QUOTED\""));
        assert!(!is_valid_identifier("OWNER."));
    }

    #[test]
    fn test_quoted_columns() {
        assert!(is_valid_column("ACCT_NO"));
        assert!(is_valid_column("\"QUOTED\""));
        assert!(is_valid_column("\"Acct No\""));
        assert!(!is_valid_column("\"\""));
        assert!(!is_valid_column("\"A\"B\""));
        assert!(!is_valid_column("\"UNCLOSED"));
        assert!(!is_valid_column("UPPER(NAME)"));
        assert!(!is_valid_column("A || B"));
        assert!(!is_valid_column(&format!("\"{}\"", "X".repeat(129))));
    }

    #[test]
    fn test_extract_query_shape() {
        let cols = vec!["SOL_ID".to_string(), "ACCT_NO".to_string(), "BAL".to_string()];
        assert_eq!(
            build_extract_query("LOAN_MASTER", &cols).unwrap(),
            "SELECT SOL_ID, ACCT_NO, BAL FROM LOAN_MASTER WHERE SOL_ID = :1"
        );
    }

    #[test]
    fn test_extract_query_rejects_bad_input() {
        assert!(build_extract_query("T", &[]).is_err());
        assert!(build_extract_query("T", &["A,B".to_string()]).is_err());
        assert!(build_extract_query("T--", &["A".to_string()]).is_err());
        assert!(build_extract_query("T", &["COUNT(*)".to_string()]).is_err());
    }

    #[test]
    fn test_extract_query_keeps_quoted_columns() {
        let cols = vec!["SOL_ID".to_string(), "\"Acct No\"".to_string()];
        assert_eq!(
            build_extract_query("T", &cols).unwrap(),
            "SELECT SOL_ID, \"Acct No\" FROM T WHERE SOL_ID = :1"
        );
    }

    #[test]
    fn test_procedure_call_shape() {
        assert_eq!(
            build_procedure_call("PKG_MIGR", "LOAD_LOANS").unwrap(),
            "BEGIN PKG_MIGR.LOAD_LOANS(:1); END;"
        );
        assert!(build_procedure_call("PKG", "X(1)").is_err());
    }
}
