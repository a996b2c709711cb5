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

//! # Extraction Port
//!
//! This Port defines the contract for the "Row Source" behind the Extract
//! action. Implementations run the templated SELECT for one SOL and hand
//! back rows already rendered as strings.

use crate::domain::errors::Result;

/// Receives the rows of one extraction query.
pub trait RowSink {
    /// Called once the query has been accepted, before the first row.
    ///
    /// Not called when the query itself fails.
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn row(&mut self, row: Vec<String>) -> Result<()>;
}

/// `ExtractionPort` streams the rows of a templated query.
pub trait ExtractionPort: Send + Sync {
    /// Runs `SELECT <columns> FROM <table> WHERE SOL_ID = :1` with `sol_id`
    /// bound, calling `sink.begin()` once the query succeeds and then
    /// `sink.row` once per row in result-set order.
    ///
    /// Each row has exactly `columns.len()` cells. NULL becomes "".
    /// Returns the number of rows delivered.
    fn stream_rows(
        &self,
        table: &str,
        columns: &[String],
        sol_id: &str,
        sink: &mut dyn RowSink,
    ) -> Result<u64>;
}
