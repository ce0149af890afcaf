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

//! # Vista Core
//!
//! Foundational crate for the display topology cache: value types describing
//! adapters and monitors, the interface contracts implemented by platform
//! crates, and the [`SnapshotManager`] that hands out reference-counted
//! [`TopologySnapshot`]s to the rendering pipeline.
//!
//! Platform work (enumerating monitors, querying drivers, loading the graphics
//! module) lives behind the traits in [`traits`]; concrete implementations are
//! provided by `vista-infra`.

#![warn(missing_docs)]

pub mod adapter;
pub mod cache;
pub mod collections;
pub mod config;
pub mod error;
pub mod geometry;
pub mod manager;
pub mod module;
pub mod snapshot;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapter::{
    AccelerationTier, AdapterEntry, AdapterIdentity, Capability, DisplayMode, MonitorToken,
    PixelFormat, RawAdapterInfo, RawCapability, Rotation, ShaderVersion,
};
pub use config::{ConfigValue, TopologyConfig};
pub use error::{TopologyError, TopologyResult};
pub use manager::{ManagerStatsSnapshot, SnapshotManager, SnapshotRef, MAX_REBUILD_ATTEMPTS};
pub use module::ModuleHandle;
pub use snapshot::{StalenessTokens, TopologySnapshot};
