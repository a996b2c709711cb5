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

use crate::domain::errors::{MoverError, Result};
use log::warn;
use std::collections::HashSet;

/// Reads the SOL list: one identifier per line.
///
/// Lines are trimmed; blank lines and `#` comments are skipped. Repeated SOLs
/// are dropped (first occurrence wins) so no task is scheduled twice.
pub fn read_sols(path: &str) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        MoverError::ConfigError(format!("Could not read SOL file {}: {}", path, e))
    })?;
    Ok(parse_sols(&content))
}

fn parse_sols(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut sols = Vec::new();
    for line in content.lines() {
        let sol = line.trim();
        if sol.is_empty() || sol.starts_with('#') {
            continue;
        }
        if !seen.insert(sol.to_string()) {
            warn!("Duplicate SOL {} ignored", sol);
            continue;
        }
        sols.push(sol.to_string());
    }
    sols
}
