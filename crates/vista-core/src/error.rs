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

//! Defines the hierarchy of error types for the topology subsystem.
//!
//! Collaborator-facing errors ([`EnumerationError`], [`CapabilityQueryError`],
//! [`LoadError`]) are narrow and describe what the platform reported. They are
//! folded into the single consumer-facing [`TopologyError`], which is what
//! every public operation of the manager returns.

use thiserror::Error;

/// The error returned by snapshot and module operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The display or adapter state changed while it was being read, or the
    /// rebuild retry budget was exhausted. Retry later; this is not fatal.
    #[error("the display topology changed while it was being read")]
    TopologyInvalid,
    /// The platform failed to enumerate adapters for a reason unrelated to a
    /// topology race.
    #[error("adapter enumeration failed: {0}")]
    EnumerationFailed(String),
    /// The graphics module could not be loaded. This failure is sticky for the
    /// lifetime of the [`ModuleHandle`](crate::ModuleHandle).
    #[error("the graphics module failed to load: {0}")]
    ModuleLoadFailed(String),
    /// An allocation failed while building topology data.
    #[error("out of memory while building the display topology")]
    OutOfMemory,
    /// The software rasterizer could not be registered with the loaded module.
    #[error("software rasterizer registration failed: {0}")]
    SoftwareFallbackFailed(String),
}

impl TopologyError {
    /// Returns `true` for errors that call for a later rebuild rather than
    /// surfacing a hard failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TopologyInvalid)
    }
}

/// A convenience alias used throughout the crate.
pub type TopologyResult<T> = Result<T, TopologyError>;

/// An error reported by [`AdapterEnumerator::enumerate_adapters`](crate::traits::AdapterEnumerator::enumerate_adapters).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnumerationError {
    /// Monitors or modes changed while the list was being read.
    #[error("the topology changed mid-enumeration")]
    TopologyChanged,
    /// A hard failure, such as a permission problem or unexpected system error.
    #[error("{0}")]
    Failed(String),
    /// The platform ran out of memory.
    #[error("out of memory")]
    OutOfMemory,
}

impl From<EnumerationError> for TopologyError {
    fn from(err: EnumerationError) -> Self {
        match err {
            EnumerationError::TopologyChanged => TopologyError::TopologyInvalid,
            EnumerationError::Failed(msg) => TopologyError::EnumerationFailed(msg),
            EnumerationError::OutOfMemory => TopologyError::OutOfMemory,
        }
    }
}

/// An error reported by [`AdapterEnumerator::query_capabilities`](crate::traits::AdapterEnumerator::query_capabilities).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityQueryError {
    /// The device was lost (driver reset, adapter removed).
    #[error("the graphics device was lost")]
    DeviceLost,
    /// The driver reported an internal error.
    #[error("the graphics driver reported an internal error")]
    DriverInternal,
    /// The adapter cannot report capabilities; it is treated as unaccelerated.
    #[error("capabilities unavailable: {0}")]
    Unsupported(String),
    /// The driver ran out of memory.
    #[error("out of memory")]
    OutOfMemory,
}

impl CapabilityQueryError {
    /// Device-lost and driver-internal errors are treated like a topology race:
    /// both are recovered by rebuilding the snapshot.
    pub fn invalidates_topology(&self) -> bool {
        matches!(self, Self::DeviceLost | Self::DriverInternal)
    }
}

/// An error reported by [`GraphicsModuleLoader::load_graphics_module`](crate::traits::GraphicsModuleLoader::load_graphics_module).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The driver library is not present on this system.
    #[error("graphics module not found: {0}")]
    NotFound(String),
    /// The library loaded but a required entry point could not be resolved.
    #[error("missing entry point '{0}'")]
    MissingEntryPoint(String),
    /// Any other load failure.
    #[error("{0}")]
    Failed(String),
}

impl From<LoadError> for TopologyError {
    fn from(err: LoadError) -> Self {
        TopologyError::ModuleLoadFailed(err.to_string())
    }
}
