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

//! # Configuration
//!
//! Two files drive a run:
//! - the **application config** (`--appCfg`): database, concurrency, input
//!   and log locations;
//! - the **run config** (`--runCfg`): procedures, package, templates, spool
//!   output and split rules.
//!
//! Both may be YAML or JSON; the format is picked from the file extension.

use crate::application::pool_manager::{
    ScalingPolicy, DEFAULT_HIGH_WATERMARK, DEFAULT_LOW_WATERMARK, DEFAULT_MIN_WORKERS,
    DEFAULT_SCALE_INTERVAL,
};
use crate::domain::entities::Mode;
use crate::domain::errors::{MoverError, Result};
use crate::infrastructure::oracle::sql_utils::{is_valid_column, is_valid_identifier};
use clap::Parser;
use log::warn;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default number of rows Oracle sends per round trip.
pub const DEFAULT_PREFETCH_ROWS: u32 = 5000;

/// Default capacity of the outcome channel.
pub const DEFAULT_OUTCOME_BUFFER: usize = 1000;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the main application configuration file
    #[arg(long = "appCfg")]
    pub app_cfg: String,

    /// Path to the extraction/insert configuration file
    #[arg(long = "runCfg")]
    pub run_cfg: String,

    /// Mode of operation: E - Extract, I - Insert
    #[arg(long = "mode")]
    pub mode: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: Option<String>,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Service name or SID.
    #[serde(default)]
    pub service: String,
    /// Full EZConnect/TNS string; overrides host/port/service when set.
    pub connection_string: Option<String>,
}

fn default_port() -> u16 {
    1521
}

impl DatabaseConfig {
    pub fn get_connection_string(&self) -> String {
        match &self.connection_string {
            Some(cs) if !cs.trim().is_empty() => cs.clone(),
            _ => format!("//{}:{}/{}", self.host, self.port, self.service),
        }
    }

    /// Password from the file, then `ORACLE_PASSWORD`, then empty.
    pub fn resolve_password(&self) -> String {
        self.password
            .clone()
            .or_else(|| std::env::var("ORACLE_PASSWORD").ok())
            .unwrap_or_default()
    }
}

/// Optional overrides for the pool manager's watermarks and tick.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ScalingConfig {
    pub high_watermark: Option<usize>,
    pub low_watermark: Option<usize>,
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    /// Ceiling for both the worker count and the connection pool.
    pub concurrency: Option<usize>,
    pub min_workers: Option<usize>,
    pub sol_file_path: String,
    pub log_file_path: String,
    #[serde(default)]
    pub scaling: ScalingConfig,
    pub outcome_buffer: Option<usize>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        load_file(path)
    }

    /// Effective ceiling; falls back to the host CPU count.
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn outcome_buffer(&self) -> usize {
        self.outcome_buffer.unwrap_or(DEFAULT_OUTCOME_BUFFER).max(1)
    }

    fn requested_min_workers(&self) -> usize {
        self.min_workers.unwrap_or(DEFAULT_MIN_WORKERS).max(1)
    }

    /// The configured floor when it exceeds the ceiling and will be clamped.
    pub fn clamped_min_workers(&self) -> Option<usize> {
        let requested = self.requested_min_workers();
        (requested > self.concurrency()).then_some(requested)
    }

    /// Builds the pool manager's policy from this config.
    ///
    /// A floor above the ceiling is pulled down to the ceiling.
    pub fn scaling_policy(&self) -> ScalingPolicy {
        let max_workers = self.concurrency();
        ScalingPolicy {
            min_workers: self.requested_min_workers().min(max_workers),
            max_workers,
            high_watermark: self.scaling.high_watermark.unwrap_or(DEFAULT_HIGH_WATERMARK),
            low_watermark: self.scaling.low_watermark.unwrap_or(DEFAULT_LOW_WATERMARK),
            interval: self
                .scaling
                .interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_SCALE_INTERVAL),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.username.trim().is_empty() {
            return Err(MoverError::ConfigError("database.username is required".into()));
        }
        if self.database.connection_string.is_none()
            && (self.database.host.trim().is_empty() || self.database.service.trim().is_empty())
        {
            return Err(MoverError::ConfigError(
                "database.host and database.service are required when no connection_string is given"
                    .into(),
            ));
        }
        if self.concurrency == Some(0) {
            return Err(MoverError::ConfigError("concurrency must be at least 1".into()));
        }
        if self.sol_file_path.trim().is_empty() {
            return Err(MoverError::ConfigError("sol_file_path is required".into()));
        }
        if self.log_file_path.trim().is_empty() {
            return Err(MoverError::ConfigError("log_file_path is required".into()));
        }
        if let Some(requested) = self.clamped_min_workers() {
            warn!(
                "min_workers ({}) exceeds concurrency ({}); starting with {} workers",
                requested,
                self.concurrency(),
                self.concurrency()
            );
        }
        let policy = self.scaling_policy();
        if policy.low_watermark > policy.high_watermark {
            return Err(MoverError::ConfigError(format!(
                "scaling.low_watermark ({}) must not exceed scaling.high_watermark ({})",
                policy.low_watermark, policy.high_watermark
            )));
        }
        if policy.interval.is_zero() {
            return Err(MoverError::ConfigError("scaling.interval_ms must be positive".into()));
        }
        Ok(())
    }
}

/// Post-processing options for Extract mode.
#[derive(Debug, Deserialize, Clone)]
pub struct MergeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Where merged files go; defaults to the spool directory.
    pub output_path: Option<String>,
    /// Delete each spool file once it has been merged.
    #[serde(default)]
    pub remove_spools: bool,
}

fn default_true() -> bool {
    true
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_path: None,
            remove_spools: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    pub procedures: Vec<String>,
    pub package_name: String,
    pub template_path: String,
    pub spool_output_path: String,
    /// Procedure -> columns whose values partition rows into separate files.
    #[serde(default)]
    pub split_rules: HashMap<String, Vec<String>>,
    pub prefetch_rows: Option<u32>,
    #[serde(default)]
    pub merge: MergeConfig,
}

impl ExtractionConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        load_file(path)
    }

    pub fn prefetch_rows(&self) -> u32 {
        self.prefetch_rows.unwrap_or(DEFAULT_PREFETCH_ROWS)
    }

    /// Split columns for `procedure`; `None` when the procedure is not split.
    pub fn split_columns(&self, procedure: &str) -> Option<&[String]> {
        self.split_rules
            .get(procedure)
            .filter(|cols| !cols.is_empty())
            .map(|cols| cols.as_slice())
    }

    pub fn merge_output_path(&self) -> &str {
        self.merge
            .output_path
            .as_deref()
            .unwrap_or(&self.spool_output_path)
    }

    pub fn validate(&self, mode: Mode) -> Result<()> {
        if !is_valid_identifier(&self.package_name) {
            return Err(MoverError::ConfigError(format!(
                "package_name '{}' is not a valid identifier",
                self.package_name
            )));
        }
        for proc in &self.procedures {
            if !is_valid_identifier(proc) {
                return Err(MoverError::ConfigError(format!(
                    "procedure '{}' is not a valid identifier",
                    proc
                )));
            }
        }
        if mode == Mode::Extract && self.spool_output_path.trim().is_empty() {
            return Err(MoverError::ConfigError(
                "spool_output_path is required in Extract mode".into(),
            ));
        }
        if self.template_path.trim().is_empty() {
            return Err(MoverError::ConfigError("template_path is required".into()));
        }
        for (proc, cols) in &self.split_rules {
            if let Some(bad) = cols.iter().find(|c| !is_valid_column(c)) {
                return Err(MoverError::ConfigError(format!(
                    "split column '{}' for {} is not a valid identifier",
                    bad, proc
                )));
            }
        }
        Ok(())
    }
}

fn load_file<T: DeserializeOwned>(path: &str) -> Result<T> {
    if !Path::new(path).exists() {
        return Err(MoverError::ConfigError(format!(
            "Configuration file does not exist: {}",
            path
        )));
    }
    let contents = std::fs::read_to_string(path)?;
    let config = if path.ends_with(".json") {
        serde_json::from_str(&contents)?
    } else {
        serde_yaml::from_str(&contents)?
    };
    Ok(config)
}
