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

//! # Runtime Context
//!
//! Shared resources that live for the whole run: the Oracle connection pool
//! and the worker ceiling it is sized for.

use crate::config::AppConfig;
use crate::domain::errors::{MoverError, Result};
use crate::infrastructure::oracle::connection_manager::{build_pool, OracleConnectionManager};
use log::info;
use r2d2::Pool;
use std::sync::Arc;

pub struct RuntimeContext {
    pub pool: Arc<Pool<OracleConnectionManager>>,
    /// Upper bound on concurrent workers; also the pool size.
    pub concurrency: usize,
}

impl RuntimeContext {
    /// Opens the connection pool with one connection per potential worker.
    pub fn init(config: &AppConfig) -> Result<Self> {
        let concurrency = config.concurrency();
        let manager = OracleConnectionManager::from_config(&config.database);
        info!(
            "Initializing connection pool for {} ({} connections)...",
            manager.connect_string(),
            concurrency
        );

        let size = u32::try_from(concurrency).map_err(|_| {
            MoverError::ConfigError(format!("concurrency {} is too large", concurrency))
        })?;
        let pool = build_pool(manager, size)?;

        Ok(Self {
            pool: Arc::new(pool),
            concurrency,
        })
    }
}
