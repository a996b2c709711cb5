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

//! Routes a task to the action of the run's mode.
//!
//! The mode is fixed for a run, so the action is chosen once when the
//! dispatcher is built and every worker shares it.

use crate::application::extract_action::ExtractAction;
use crate::config::ExtractionConfig;
use crate::domain::entities::{Mode, Task, Templates};
use crate::domain::errors::Result;
use crate::ports::extraction_port::ExtractionPort;
use crate::ports::procedure_port::ProcedurePort;
use log::info;
use std::sync::Arc;

/// The work performed for a single task.
pub trait TaskAction: Send + Sync {
    fn execute(&self, task: &Task) -> Result<()>;
}

/// Insert mode: `<package>.<procedure>(sol_id)`.
pub struct InsertAction {
    package_name: String,
    port: Arc<dyn ProcedurePort>,
}

impl InsertAction {
    pub fn new(package_name: impl Into<String>, port: Arc<dyn ProcedurePort>) -> Self {
        Self {
            package_name: package_name.into(),
            port,
        }
    }
}

impl TaskAction for InsertAction {
    fn execute(&self, task: &Task) -> Result<()> {
        self.port
            .call_procedure(&self.package_name, &task.procedure, &task.sol_id)?;
        info!(
            "✅ {}.{} completed for SOL {}",
            self.package_name, task.procedure, task.sol_id
        );
        Ok(())
    }
}

pub enum TaskDispatcher {
    Extract(ExtractAction),
    Insert(InsertAction),
}

impl TaskDispatcher {
    pub fn for_mode(
        mode: Mode,
        config: Arc<ExtractionConfig>,
        templates: Arc<Templates>,
        extraction: Arc<dyn ExtractionPort>,
        procedures: Arc<dyn ProcedurePort>,
    ) -> Self {
        match mode {
            Mode::Extract => {
                TaskDispatcher::Extract(ExtractAction::new(config, templates, extraction))
            }
            Mode::Insert => {
                TaskDispatcher::Insert(InsertAction::new(config.package_name.clone(), procedures))
            }
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            TaskDispatcher::Extract(_) => Mode::Extract,
            TaskDispatcher::Insert(_) => Mode::Insert,
        }
    }
}

impl TaskAction for TaskDispatcher {
    fn execute(&self, task: &Task) -> Result<()> {
        match self {
            TaskDispatcher::Extract(action) => {
                info!("📥 Extracting {} for SOL {}", task.procedure, task.sol_id);
                action.execute(task)
            }
            TaskDispatcher::Insert(action) => {
                info!("🔁 Inserting {} for SOL {}", task.procedure, task.sol_id);
                action.execute(task)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::lock_unpoisoned;
    use crate::config::MergeConfig;
    use crate::domain::errors::MoverError;
    use crate::ports::extraction_port::RowSink;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingProcedures {
        calls: Mutex<Vec<(String, String, String)>>,
    }

    impl ProcedurePort for RecordingProcedures {
        fn call_procedure(&self, package: &str, procedure: &str, sol_id: &str) -> Result<()> {
            lock_unpoisoned(&self.calls).push((package.into(), procedure.into(), sol_id.into()));
            if procedure == "BROKEN" {
                return Err(MoverError::DatabaseError(
                    "ORA-06550: line 1, column 7: PLS-00201".into(),
                ));
            }
            Ok(())
        }
    }

    struct NoExtraction;

    impl ExtractionPort for NoExtraction {
        fn stream_rows(
            &self,
            _table: &str,
            _columns: &[String],
            _sol_id: &str,
            _sink: &mut dyn RowSink,
        ) -> Result<u64> {
            panic!("extraction must not run in Insert mode");
        }
    }

    fn config() -> Arc<ExtractionConfig> {
        Arc::new(ExtractionConfig {
            procedures: vec!["P1".into()],
            package_name: "LOAN_PKG".into(),
            template_path: String::new(),
            spool_output_path: String::new(),
            split_rules: HashMap::new(),
            prefetch_rows: None,
            merge: MergeConfig::default(),
        })
    }

    #[test]
    fn test_insert_mode_calls_package_procedure() {
        let procs = Arc::new(RecordingProcedures::default());
        let dispatcher = TaskDispatcher::for_mode(
            Mode::Insert,
            config(),
            Arc::new(Templates::new()),
            Arc::new(NoExtraction),
            procs.clone(),
        );
        assert_eq!(dispatcher.mode(), Mode::Insert);

        dispatcher.execute(&Task::new("001", "P1")).unwrap();
        assert_eq!(
            lock_unpoisoned(&procs.calls).as_slice(),
            &[("LOAN_PKG".to_string(), "P1".to_string(), "001".to_string())]
        );
    }

    #[test]
    fn test_insert_error_is_returned_verbatim() {
        let dispatcher = TaskDispatcher::for_mode(
            Mode::Insert,
            config(),
            Arc::new(Templates::new()),
            Arc::new(NoExtraction),
            Arc::new(RecordingProcedures::default()),
        );
        let err = dispatcher.execute(&Task::new("001", "BROKEN")).unwrap_err();
        assert!(err.to_string().contains("ORA-06550"));
    }

    #[test]
    fn test_extract_mode_selects_extract_action() {
        let dispatcher = TaskDispatcher::for_mode(
            Mode::Extract,
            config(),
            Arc::new(Templates::new()),
            Arc::new(NoExtraction),
            Arc::new(RecordingProcedures::default()),
        );
        assert_eq!(dispatcher.mode(), Mode::Extract);
        // No template for P1, so the action fails before touching the port.
        assert!(matches!(
            dispatcher.execute(&Task::new("001", "P1")),
            Err(MoverError::MissingTemplate(_))
        ));
    }
}
