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

//! The wgpu-backed graphics module.

use std::sync::{Mutex, PoisonError};

use anyhow::{anyhow, Result};
use vista_core::error::LoadError;
use vista_core::traits::{GraphicsModule, GraphicsModuleLoader};
use wgpu::{Adapter, Instance, PowerPreference, RequestAdapterOptions};

use super::conversions::backend_name;

/// Loads the wgpu instance as the graphics module.
#[derive(Debug, Clone)]
pub struct WgpuModuleLoader {
    power_preference: PowerPreference,
}

impl WgpuModuleLoader {
    /// Creates a loader that requests a high-performance adapter.
    pub fn new() -> Self {
        Self {
            power_preference: PowerPreference::HighPerformance,
        }
    }

    /// Overrides the power preference used to request an adapter.
    pub fn with_power_preference(mut self, power_preference: PowerPreference) -> Self {
        self.power_preference = power_preference;
        self
    }
}

impl Default for WgpuModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsModuleLoader for WgpuModuleLoader {
    fn load_graphics_module(&self) -> Result<Box<dyn GraphicsModule>, LoadError> {
        let instance = Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());

        // A module with no usable adapter is treated as missing.
        let adapter = pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            power_preference: self.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|e| LoadError::NotFound(format!("no wgpu adapter available: {e}")))?;

        let info = adapter.get_info();
        log::info!(
            "wgpu module ready, found adapter \"{}\" on {}",
            info.name,
            backend_name(info.backend)
        );

        Ok(Box::new(WgpuModule {
            instance,
            software_adapter: Mutex::new(None),
        }))
    }
}

/// A loaded wgpu instance.
#[derive(Debug)]
pub struct WgpuModule {
    instance: Instance,
    software_adapter: Mutex<Option<Adapter>>,
}

impl WgpuModule {
    /// The wgpu instance.
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// The software adapter, once registered.
    pub fn software_adapter(&self) -> Option<Adapter> {
        self.software_adapter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn request_fallback_adapter(&self) -> Result<Adapter> {
        pollster::block_on(self.instance.request_adapter(&RequestAdapterOptions {
            power_preference: PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: true,
        }))
        .map_err(|e| anyhow!("Failed to find a fallback adapter: {}", e))
    }
}

impl GraphicsModule for WgpuModule {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn register_software_fallback(&self) -> Result<(), String> {
        let adapter = self.request_fallback_adapter().map_err(|e| e.to_string())?;
        log::info!(
            "Software fallback adapter: \"{}\"",
            adapter.get_info().name
        );
        *self
            .software_adapter
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(adapter);
        Ok(())
    }
}
