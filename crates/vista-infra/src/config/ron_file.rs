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

//! Overrides read from a RON file.
//!
//! The file holds a single map from override name to value:
//!
//! ```text
//! {
//!     "ForceSoftwareRendering": false,
//!     "MaxTextureSize": 8192,
//!     "DriverDenylist": "10de:2684",
//! }
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use vista_core::traits::ConfigSource;
use vista_core::ConfigValue;

/// Overrides loaded from a RON map.
#[derive(Debug, Clone, Default)]
pub struct RonConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl RonConfigSource {
    /// Parses overrides from RON text.
    pub fn parse(text: &str) -> Result<Self> {
        let values: HashMap<String, ConfigValue> =
            ron::from_str(text).context("Failed to parse override map")?;
        Ok(Self { values })
    }

    /// Reads and parses an override file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read override file {}", path.display()))?;
        let source =
            Self::parse(&text).with_context(|| format!("Invalid override file {}", path.display()))?;
        log::info!(
            "Loaded {} override(s) from {}",
            source.values.len(),
            path.display()
        );
        Ok(source)
    }

    /// Like [`load`](Self::load), but a missing file yields no overrides.
    pub fn load_optional(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No override file at {}", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Number of overrides in the file.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the file held no overrides.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigSource for RonConfigSource {
    fn read_override(&self, name: &str) -> Option<ConfigValue> {
        self.values.get(name).cloned()
    }
}
