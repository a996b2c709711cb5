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

//! Core error definitions for the SOL data mover.
//!
//! Start-up failures (configuration, templates, connection) abort the run.
//! Everything raised while a task executes is turned into a `FAIL` outcome by
//! the worker and never stops the pool.

use thiserror::Error;

/// Error types encountered while preparing or executing a run.
#[derive(Error, Debug)]
pub enum MoverError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Template error for {procedure}: {reason}")]
    TemplateError { procedure: String, reason: String },

    #[error("Missing template for procedure {0}")]
    MissingTemplate(String),

    #[error("Extraction failed for {procedure} (SOL {sol_id}): {reason}")]
    ExtractionError {
        procedure: String,
        sol_id: String,
        reason: String,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Connection pool error: {0}")]
    PoolError(String),

    #[error("Worker pool error: {0}")]
    WorkerError(String),

    #[error("Merge failed for {procedure}: {reason}")]
    MergeError { procedure: String, reason: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl From<oracle::Error> for MoverError {
    fn from(e: oracle::Error) -> Self {
        MoverError::DatabaseError(e.to_string())
    }
}

impl From<r2d2::Error> for MoverError {
    fn from(e: r2d2::Error) -> Self {
        MoverError::PoolError(e.to_string())
    }
}

impl From<serde_yaml::Error> for MoverError {
    fn from(e: serde_yaml::Error) -> Self {
        MoverError::ConfigError(e.to_string())
    }
}

impl From<serde_json::Error> for MoverError {
    fn from(e: serde_json::Error) -> Self {
        MoverError::ConfigError(e.to_string())
    }
}

/// A specialized Result type for the SOL data mover.
pub type Result<T> = std::result::Result<T, MoverError>;
