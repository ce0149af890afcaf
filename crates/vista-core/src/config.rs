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

//! Configuration overrides for topology building.
//!
//! Overrides are read once, when the [`SnapshotManager`](crate::SnapshotManager)
//! is created, and are not re-read on rebuild.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::adapter::{DeviceKey, DriverDate, DriverPolicy};
use crate::traits::ConfigSource;

/// Override key: force every adapter to software rendering.
pub const KEY_FORCE_SOFTWARE: &str = "ForceSoftwareRendering";
/// Override key: keep only the primary adapter.
pub const KEY_DISABLE_MULTI_ADAPTER: &str = "DisableMultiAdapter";
/// Override key: skip the driver recency check.
pub const KEY_DISABLE_DRIVER_CHECK: &str = "DisableDriverVersionCheck";
/// Override key: minimum driver date, `YYYY-MM-DD`.
pub const KEY_MINIMUM_DRIVER_DATE: &str = "MinimumDriverDate";
/// Override key: comma-separated `vendor:device` hex pairs.
pub const KEY_DRIVER_DENYLIST: &str = "DriverDenylist";
/// Override key: clamp for reported texture dimensions.
pub const KEY_MAX_TEXTURE_SIZE: &str = "MaxTextureSize";

/// A raw override value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// A boolean switch.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// Free-form text.
    Text(String),
}

impl ConfigValue {
    /// Interprets the value as a switch. Integers are true when non-zero; text
    /// accepts `1`, `true`, `yes` and `on` (case-insensitive).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(value) => Some(*value),
            ConfigValue::Int(value) => Some(*value != 0),
            ConfigValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            },
        }
    }

    /// Interprets the value as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(value) => Some(*value),
            ConfigValue::Text(text) => text.trim().parse().ok(),
            ConfigValue::Bool(_) => None,
        }
    }

    /// Interprets the value as text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Topology configuration resolved from overrides.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Every adapter reports the no-acceleration capability.
    pub force_software: bool,
    /// Only the primary adapter is kept in snapshots.
    pub disable_multi_adapter: bool,
    /// Driver recency and denylist policy.
    pub driver_policy: DriverPolicy,
    /// Clamp applied to reported texture dimensions.
    pub max_texture_size: Option<u32>,
}

impl TopologyConfig {
    /// Resolves the configuration from `source`. Malformed values are logged
    /// and ignored.
    pub fn load(source: &dyn ConfigSource) -> Self {
        let mut config = TopologyConfig::default();

        if let Some(value) = read_bool(source, KEY_FORCE_SOFTWARE) {
            config.force_software = value;
        }
        if let Some(value) = read_bool(source, KEY_DISABLE_MULTI_ADAPTER) {
            config.disable_multi_adapter = value;
        }
        if let Some(value) = read_bool(source, KEY_DISABLE_DRIVER_CHECK) {
            config.driver_policy.check_enabled = !value;
        }
        if let Some(value) = source.read_override(KEY_MINIMUM_DRIVER_DATE) {
            match value.as_text().and_then(DriverDate::parse) {
                Some(date) => config.driver_policy.minimum_date = date,
                None => log::warn!("Ignoring malformed {KEY_MINIMUM_DRIVER_DATE} override: {value:?}"),
            }
        }
        if let Some(value) = source.read_override(KEY_DRIVER_DENYLIST) {
            match value.as_text() {
                Some(text) => config.driver_policy.denylist = DeviceKey::parse_list(text),
                None => log::warn!("Ignoring malformed {KEY_DRIVER_DENYLIST} override: {value:?}"),
            }
        }
        if let Some(value) = source.read_override(KEY_MAX_TEXTURE_SIZE) {
            match value.as_int().and_then(|size| u32::try_from(size).ok()) {
                Some(size) if size > 0 => config.max_texture_size = Some(size),
                _ => log::warn!("Ignoring malformed {KEY_MAX_TEXTURE_SIZE} override: {value:?}"),
            }
        }

        log::debug!("Resolved topology configuration: {config:?}");
        config
    }
}

fn read_bool(source: &dyn ConfigSource, key: &str) -> Option<bool> {
    let value = source.read_override(key)?;
    let parsed = value.as_bool();
    if parsed.is_none() {
        log::warn!("Ignoring malformed {key} override: {value:?}");
    }
    parsed
}

/// An in-memory override map.
#[derive(Debug, Clone, Default)]
pub struct MapConfigSource {
    values: HashMap<String, ConfigValue>,
}

impl MapConfigSource {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an override, builder style.
    pub fn with(mut self, name: impl Into<String>, value: ConfigValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Sets an override.
    pub fn insert(&mut self, name: impl Into<String>, value: ConfigValue) {
        self.values.insert(name.into(), value);
    }
}

impl From<HashMap<String, ConfigValue>> for MapConfigSource {
    fn from(values: HashMap<String, ConfigValue>) -> Self {
        Self { values }
    }
}

impl ConfigSource for MapConfigSource {
    fn read_override(&self, name: &str) -> Option<ConfigValue> {
        self.values.get(name).cloned()
    }
}

/// Consults several sources in order; the first one holding a key wins.
#[derive(Default)]
pub struct ChainedConfigSource {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl ChainedConfigSource {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a lower-priority source.
    pub fn then(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl ConfigSource for ChainedConfigSource {
    fn read_override(&self, name: &str) -> Option<ConfigValue> {
        self.sources
            .iter()
            .find_map(|source| source.read_override(name))
    }
}
