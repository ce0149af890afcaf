// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Overrides read from environment variables.

use std::collections::HashMap;

use vista_core::traits::ConfigSource;
use vista_core::ConfigValue;

/// The default prefix, giving names such as `VISTA_FORCE_SOFTWARE_RENDERING`.
pub const DEFAULT_PREFIX: &str = "VISTA_";

/// Reads overrides from `<PREFIX><KEY>` environment variables, where `KEY` is
/// the override name in upper snake case.
///
/// Variables are captured once, at construction.
#[derive(Debug, Clone)]
pub struct EnvConfigSource {
    prefix: String,
    vars: HashMap<String, String>,
}

impl EnvConfigSource {
    /// Captures the process environment under [`DEFAULT_PREFIX`].
    pub fn new() -> Self {
        Self::from_vars(DEFAULT_PREFIX, std::env::vars())
    }

    /// Captures the given variables, keeping those starting with `prefix`.
    pub fn from_vars(
        prefix: impl Into<String>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let prefix = prefix.into();
        let vars = vars
            .into_iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .collect();
        Self { prefix, vars }
    }

    /// The variable name an override is read from.
    pub fn variable_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, upper_snake_case(key))
    }
}

impl Default for EnvConfigSource {
    /// An empty capture under [`DEFAULT_PREFIX`].
    fn default() -> Self {
        Self::from_vars(DEFAULT_PREFIX, Vec::new())
    }
}

fn upper_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(c.to_ascii_uppercase());
    }
    out
}

impl ConfigSource for EnvConfigSource {
    fn read_override(&self, name: &str) -> Option<ConfigValue> {
        let value = self.vars.get(&self.variable_name(name))?;
        Some(match value.trim().parse::<i64>() {
            Ok(number) => ConfigValue::Int(number),
            Err(_) => ConfigValue::Text(value.clone()),
        })
    }
}
