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

//! # SOL Data Mover
//!
//! Batch tool that applies a list of procedures to every SOL (branch) in a
//! list, using a dynamically sized pool of worker threads:
//!
//! - **Extract (`E`)**: selects each procedure's template columns for one SOL
//!   and spools them to CSV, then merges the spools per procedure.
//! - **Insert (`I`)**: calls `<package>.<procedure>(sol_id)` for each SOL.
//!
//! The application follows the **Hexagonal Architecture** (Ports and Adapters)
//! to keep the pool and orchestration logic apart from Oracle and the file
//! system.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;

use crate::application::dispatcher::TaskDispatcher;
use crate::application::orchestrator::{Orchestrator, RunSettings};
use crate::application::runtime::RuntimeContext;
use crate::config::{AppConfig, CliArgs, ExtractionConfig};
use crate::domain::entities::Mode;
use crate::domain::errors::Result;
use crate::infrastructure::local_storage::run_log_writer::CsvRunLog;
use crate::infrastructure::local_storage::sol_reader::read_sols;
use crate::infrastructure::local_storage::spool_merger::SpoolMerger;
use crate::infrastructure::local_storage::template_reader::load_templates;
use crate::infrastructure::oracle::extractor::OracleExtractor;
use crate::infrastructure::oracle::procedure_caller::OracleProcedureCaller;
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};
use std::process;
use std::sync::Arc;

fn main() {
    // 1. Initialize Logging
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    // 2. Parse Arguments
    let args = CliArgs::parse();

    if let Err(e) = run(&args) {
        error!("❌ {}", e);
        process::exit(1);
    }
    info!("🎯 All done!");
}

fn run(args: &CliArgs) -> Result<()> {
    // 3. Load Config
    let mode: Mode = args.mode.parse()?;
    let app_config = AppConfig::from_file(&args.app_cfg)?;
    app_config.validate()?;
    let run_config = ExtractionConfig::from_file(&args.run_cfg)?;
    run_config.validate(mode)?;
    info!(
        "Loaded configuration: mode {} ({}), package {}, {} procedures",
        mode,
        mode.label(),
        run_config.package_name,
        run_config.procedures.len()
    );

    // 4. Load Inputs
    let templates = load_templates(&run_config.template_path, &run_config.procedures)?;
    let sols = read_sols(&app_config.sol_file_path)?;
    if sols.is_empty() {
        warn!("SOL list {} is empty; nothing to do", app_config.sol_file_path);
    } else {
        info!("Loaded {} SOLs from {}", sols.len(), app_config.sol_file_path);
    }

    std::fs::create_dir_all(&app_config.log_file_path)?;
    if mode == Mode::Extract {
        std::fs::create_dir_all(&run_config.spool_output_path)?;
    }

    // 5. Initialize Hexagonal Components
    let runtime = RuntimeContext::init(&app_config)?;
    let run_config = Arc::new(run_config);

    let extractor = Arc::new(OracleExtractor::new(
        Arc::clone(&runtime.pool),
        run_config.prefetch_rows(),
    ));
    let procedures = Arc::new(OracleProcedureCaller::new(Arc::clone(&runtime.pool)));
    let dispatcher = TaskDispatcher::for_mode(
        mode,
        Arc::clone(&run_config),
        Arc::new(templates),
        extractor,
        procedures,
    );

    info!("Dispatching tasks in {} mode", dispatcher.mode().label());

    let run_log = Arc::new(CsvRunLog::new(
        &app_config.log_file_path,
        &run_config.package_name,
        mode,
    ));
    let merger = Arc::new(SpoolMerger::new(&run_config));

    // 6. Run Orchestrator
    let settings = RunSettings {
        mode,
        policy: app_config.scaling_policy(),
        outcome_buffer: app_config.outcome_buffer(),
    };
    let orchestrator = Orchestrator::new(Arc::new(dispatcher), run_log, merger, settings);
    let report = orchestrator.run(&sols, &run_config.procedures)?;

    if report.failed > 0 {
        warn!(
            "{} of {} tasks failed; see the run log for details",
            report.failed, report.total_tasks
        );
    }
    Ok(())
}
