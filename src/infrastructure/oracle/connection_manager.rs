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

use crate::config::DatabaseConfig;
use crate::domain::errors::Result;
use oracle::{Connection, Error};
use r2d2::{ManageConnection, Pool};
use std::time::Duration;

/// Connections are recycled after this long.
pub const CONNECTION_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// R2D2 connection manager for Oracle.
#[derive(Debug)]
pub struct OracleConnectionManager {
    user: String,
    pass: String,
    conn_str: String,
}

impl OracleConnectionManager {
    pub fn new(user: &str, pass: &str, conn_str: &str) -> Self {
        Self {
            user: user.to_string(),
            pass: pass.to_string(),
            conn_str: conn_str.to_string(),
        }
    }

    pub fn from_config(db: &DatabaseConfig) -> Self {
        Self::new(&db.username, &db.resolve_password(), &db.get_connection_string())
    }

    pub fn connect_string(&self) -> &str {
        &self.conn_str
    }
}

impl ManageConnection for OracleConnectionManager {
    type Connection = Connection;
    type Error = Error;

    fn connect(&self) -> std::result::Result<Self::Connection, Self::Error> {
        Connection::connect(&self.user, &self.pass, &self.conn_str)
    }

    fn is_valid(&self, conn: &mut Self::Connection) -> std::result::Result<(), Self::Error> {
        conn.ping()
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Builds a pool capped at `max_size` connections, all kept warm.
///
/// `build` opens the connections eagerly, so a bad DSN or credentials fail
/// here, before any worker starts.
pub fn build_pool(
    manager: OracleConnectionManager,
    max_size: u32,
) -> Result<Pool<OracleConnectionManager>> {
    let pool = Pool::builder()
        .max_size(max_size.max(1))
        .max_lifetime(Some(CONNECTION_MAX_LIFETIME))
        .idle_timeout(None)
        .build(manager)?;
    Ok(pool)
}
