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

//! Infrastructure adapter for the Insert action: packaged procedure calls.

use crate::domain::errors::{MoverError, Result};
use crate::infrastructure::oracle::connection_manager::OracleConnectionManager;
use crate::infrastructure::oracle::sql_utils::build_procedure_call;
use crate::ports::procedure_port::ProcedurePort;
use log::warn;
use r2d2::Pool;
use std::fmt::Display;
use std::sync::Arc;

/// Concrete implementation of `ProcedurePort` for Oracle.
pub struct OracleProcedureCaller {
    pool: Arc<Pool<OracleConnectionManager>>,
}

impl OracleProcedureCaller {
    pub fn new(pool: Arc<Pool<OracleConnectionManager>>) -> Self {
        Self { pool }
    }
}

impl ProcedurePort for OracleProcedureCaller {
    fn call_procedure(&self, package: &str, procedure: &str, sol_id: &str) -> Result<()> {
        let sql = build_procedure_call(package, procedure)?;
        let conn = self.pool.get()?;
        let sol = sol_id.to_string();
        // Nothing may stay pending on a pooled session.
        if let Err(e) = conn.execute(&sql, &[&sol]) {
            let rollback = conn.rollback();
            return Err(after_failed_call(e.into(), rollback, package, procedure, sol_id));
        }
        conn.commit()?;
        Ok(())
    }
}

/// The call's own error is what the task reports; a failed rollback is logged.
fn after_failed_call<E: Display>(
    call_error: MoverError,
    rollback: std::result::Result<(), E>,
    package: &str,
    procedure: &str,
    sol_id: &str,
) -> MoverError {
    if let Err(e) = rollback {
        warn!(
            "Rollback after failed {}.{} (SOL {}) also failed: {}",
            package, procedure, sol_id, e
        );
    }
    call_error
}
