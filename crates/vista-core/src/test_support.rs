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

//! Fakes shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::adapter::{
    AccelerationTier, AdapterEntry, AdapterIdentity, Capability, DisplayMode, EntryCapability,
    MonitorToken, PixelFormat, RawAdapterInfo, RawCapability, ShaderVersion,
};
use crate::error::{CapabilityQueryError, EnumerationError, LoadError};
use crate::geometry::{DesktopBounds, Rect, ScaleContext};
use crate::traits::{AdapterEnumerator, GraphicsModule, GraphicsModuleLoader};

#[derive(Debug, Default)]
struct LoaderCounters {
    loads: AtomicUsize,
    fallback_registrations: AtomicUsize,
}

#[derive(Clone, Default)]
pub(crate) struct FakeLoader {
    fail: bool,
    counters: Arc<LoaderCounters>,
}

impl FakeLoader {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn load_calls(&self) -> usize {
        self.counters.loads.load(Ordering::SeqCst)
    }

    pub(crate) fn fallback_registrations(&self) -> usize {
        self.counters.fallback_registrations.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct FakeModule {
    counters: Arc<LoaderCounters>,
}

impl GraphicsModule for FakeModule {
    fn name(&self) -> &str {
        "fake"
    }

    fn register_software_fallback(&self) -> Result<(), String> {
        self.counters
            .fallback_registrations
            .fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl GraphicsModuleLoader for FakeLoader {
    fn load_graphics_module(&self) -> Result<Box<dyn GraphicsModule>, LoadError> {
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LoadError::NotFound("fake.so".into()));
        }
        Ok(Box::new(FakeModule {
            counters: Arc::clone(&self.counters),
        }))
    }
}

pub(crate) fn monitor(index: usize, x: i32, is_primary: bool) -> RawAdapterInfo {
    let mut bounds = DesktopBounds::new();
    bounds.insert(
        ScaleContext::PerMonitorAware,
        Rect::from_origin_size(x, 0, 1920, 1080),
    );
    RawAdapterInfo {
        adapter_index: index,
        monitor: MonitorToken(index as u64),
        identity: AdapterIdentity {
            vendor_id: 0x10de,
            device_id: 0x2684 + index as u32,
            description: format!("Adapter {index}"),
            ..AdapterIdentity::default()
        },
        bounds,
        mode: DisplayMode {
            width: 1920,
            height: 1080,
            refresh_rate_hz: 60,
            format: PixelFormat::Bgra8,
            ..DisplayMode::default()
        },
        is_primary,
        ..RawAdapterInfo::default()
    }
}

pub(crate) fn raw_capability(shader: ShaderVersion, texture_size: u32) -> RawCapability {
    RawCapability {
        pixel_shader: shader,
        vertex_shader: shader,
        max_texture_width: texture_size,
        max_texture_height: texture_size,
        video_memory_bytes: Some(512 * 1024 * 1024),
        hardware_vertex_processing: true,
        is_software: false,
    }
}

fn entry_with(index: usize, tier: AccelerationTier, texture_size: u32, remote: bool) -> AdapterEntry {
    let mut info = monitor(index, 1920 * index as i32, index == 0);
    info.is_remote = remote;
    let derived = Capability {
        tier,
        max_texture_width: texture_size,
        max_texture_height: texture_size,
        pixel_shader: ShaderVersion::V2_0,
        vertex_shader: ShaderVersion::V2_0,
        hardware_vertex_processing: true,
    };
    AdapterEntry::new(
        index,
        info,
        EntryCapability {
            raw: None,
            derived,
            driver_recent_enough: true,
            driver_denylisted: false,
        },
    )
}

pub(crate) fn entry(index: usize, tier: AccelerationTier, texture_size: u32) -> AdapterEntry {
    entry_with(index, tier, texture_size, false)
}

pub(crate) fn remote_entry(index: usize, tier: AccelerationTier, texture_size: u32) -> AdapterEntry {
    entry_with(index, tier, texture_size, true)
}

type ScriptedAdapter = (RawAdapterInfo, Result<RawCapability, CapabilityQueryError>);

/// Returns the same adapters on every call.
pub(crate) struct StaticEnumerator {
    adapters: Result<Vec<ScriptedAdapter>, EnumerationError>,
}

impl StaticEnumerator {
    pub(crate) fn new(adapters: Vec<ScriptedAdapter>) -> Self {
        Self {
            adapters: Ok(adapters),
        }
    }

    pub(crate) fn failing(err: EnumerationError) -> Self {
        Self { adapters: Err(err) }
    }
}

impl AdapterEnumerator for StaticEnumerator {
    fn display_uniqueness(&self) -> u64 {
        1
    }

    fn enumerate_adapters(&self) -> Result<Vec<RawAdapterInfo>, EnumerationError> {
        match &self.adapters {
            Ok(adapters) => Ok(adapters.iter().map(|(info, _)| info.clone()).collect()),
            Err(err) => Err(err.clone()),
        }
    }

    fn query_capabilities(
        &self,
        adapter_index: usize,
    ) -> Result<RawCapability, CapabilityQueryError> {
        let adapters = self.adapters.as_ref().map_err(|_| CapabilityQueryError::DeviceLost)?;
        adapters
            .iter()
            .find(|(info, _)| info.adapter_index == adapter_index)
            .map(|(_, caps)| caps.clone())
            .unwrap_or(Err(CapabilityQueryError::DeviceLost))
    }
}
