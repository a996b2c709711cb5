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

//! Infrastructure adapter that runs the templated per-SOL SELECT on Oracle.

use crate::domain::errors::Result;
use crate::infrastructure::oracle::connection_manager::OracleConnectionManager;
use crate::infrastructure::oracle::sql_utils::build_extract_query;
use crate::ports::extraction_port::{ExtractionPort, RowSink};
use log::debug;
use oracle::sql_type::{OracleType, Timestamp};
use r2d2::Pool;
use std::sync::Arc;
use std::time::Instant;

/// Concrete implementation of `ExtractionPort` for Oracle databases.
///
/// Borrows a pooled connection per call, streams the result set and renders
/// every cell to text. The rendering is pinned here rather than left to the
/// session's NLS settings:
/// - NUMBER / FLOAT / text types: the driver's string conversion,
/// - DATE: `YYYY-MM-DD HH:MM:SS`,
/// - TIMESTAMP (any flavour): `YYYY-MM-DD HH:MM:SS.ffffff`,
/// - RAW / BLOB: upper-case hex,
/// - NULL: empty string.
pub struct OracleExtractor {
    pool: Arc<Pool<OracleConnectionManager>>,
    prefetch_rows: u32,
}

impl OracleExtractor {
    pub fn new(pool: Arc<Pool<OracleConnectionManager>>, prefetch_rows: u32) -> Self {
        Self {
            pool,
            prefetch_rows,
        }
    }

    fn format_value(row: &oracle::Row, i: usize, otype: &OracleType) -> Result<String> {
        let rendered = match otype {
            OracleType::Date => {
                let v: Option<Timestamp> = row.get(i)?;
                v.map(|ts| Self::format_date(&ts))
            }
            OracleType::Timestamp(_) | OracleType::TimestampTZ(_) | OracleType::TimestampLTZ(_) => {
                let v: Option<Timestamp> = row.get(i)?;
                v.map(|ts| Self::format_timestamp(&ts))
            }
            OracleType::Raw(_) | OracleType::BLOB => {
                let v: Option<Vec<u8>> = row.get(i)?;
                v.map(|b| Self::format_raw(&b))
            }
            _ => row.get::<usize, Option<String>>(i)?,
        };
        Ok(rendered.unwrap_or_default())
    }

    fn format_date(ts: &Timestamp) -> String {
        format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            ts.year(),
            ts.month(),
            ts.day(),
            ts.hour(),
            ts.minute(),
            ts.second()
        )
    }

    fn format_timestamp(ts: &Timestamp) -> String {
        format!(
            "{}.{:06}",
            Self::format_date(ts),
            ts.nanosecond() / 1000
        )
    }

    fn format_raw(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02X}", b)).collect()
    }
}

impl ExtractionPort for OracleExtractor {
    fn stream_rows(
        &self,
        table: &str,
        columns: &[String],
        sol_id: &str,
        sink: &mut dyn RowSink,
    ) -> Result<u64> {
        let sql = build_extract_query(table, columns)?;
        let conn = self.pool.get()?;

        let started = Instant::now();
        let mut stmt = conn
            .statement(&sql)
            .prefetch_rows(self.prefetch_rows)
            .build()?;
        let sol = sol_id.to_string();
        let rows = stmt.query(&[&sol])?;
        debug!(
            "🧑‍💻 Query executed for {} (SOL {}) in {:?}",
            table,
            sol_id,
            started.elapsed()
        );
        sink.begin()?;

        let col_types: Vec<OracleType> = rows
            .column_info()
            .iter()
            .map(|c| c.oracle_type().clone())
            .collect();

        let mut count = 0;
        for row_res in rows {
            let row = row_res?;
            let mut record = Vec::with_capacity(col_types.len());
            for (i, otype) in col_types.iter().enumerate() {
                record.push(Self::format_value(&row, i, otype)?);
            }
            sink.row(record)?;
            count += 1;
        }
        Ok(count)
    }
}
