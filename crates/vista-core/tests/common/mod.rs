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

//! Scripted collaborators for driving the snapshot manager in tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vista_core::error::{CapabilityQueryError, EnumerationError, LoadError};
use vista_core::geometry::{DesktopBounds, Rect, ScaleContext};
use vista_core::traits::{AdapterEnumerator, GraphicsModule, GraphicsModuleLoader};
use vista_core::{
    AccelerationTier, AdapterIdentity, DisplayMode, MonitorToken, PixelFormat, RawAdapterInfo,
    RawCapability, ShaderVersion,
};

/// Routes `log` output through the test harness. Safe to call repeatedly.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub type ScriptedAdapter = (RawAdapterInfo, Result<RawCapability, CapabilityQueryError>);

/// An enumerator whose adapters and failures are set by the test.
#[derive(Default)]
pub struct ScriptedEnumerator {
    adapters: Mutex<Vec<ScriptedAdapter>>,
    uniqueness: AtomicU64,
    enumerations: AtomicUsize,
    pending_races: AtomicUsize,
    always_race: AtomicBool,
    pending_token_bumps: AtomicUsize,
    pending_device_losses: AtomicUsize,
    hard_failure: Mutex<Option<EnumerationError>>,
}

impl ScriptedEnumerator {
    pub fn new(adapters: Vec<ScriptedAdapter>) -> Arc<Self> {
        Arc::new(Self {
            adapters: Mutex::new(adapters),
            uniqueness: AtomicU64::new(1),
            ..Self::default()
        })
    }

    /// Replaces the adapter list. Does not touch the uniqueness value.
    pub fn set_adapters(&self, adapters: Vec<ScriptedAdapter>) {
        *self.adapters.lock().unwrap() = adapters;
    }

    /// Simulates a platform-side display change.
    pub fn bump_uniqueness(&self) {
        self.uniqueness.fetch_add(1, Ordering::SeqCst);
    }

    pub fn enumeration_count(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    /// The next `count` enumerations report a mid-enumeration topology change.
    pub fn race_next(&self, count: usize) {
        self.pending_races.store(count, Ordering::SeqCst);
    }

    /// Every enumeration reports a mid-enumeration topology change.
    pub fn always_race(&self, enabled: bool) {
        self.always_race.store(enabled, Ordering::SeqCst);
    }

    /// The next `count` enumerations succeed but bump the uniqueness value
    /// before returning.
    pub fn advance_tokens_during_next(&self, count: usize) {
        self.pending_token_bumps.store(count, Ordering::SeqCst);
    }

    /// The next `count` capability queries report a lost device.
    pub fn lose_device_next(&self, count: usize) {
        self.pending_device_losses.store(count, Ordering::SeqCst);
    }

    pub fn fail_with(&self, err: Option<EnumerationError>) {
        *self.hard_failure.lock().unwrap() = err;
    }

    fn take_pending(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl AdapterEnumerator for ScriptedEnumerator {
    fn display_uniqueness(&self) -> u64 {
        self.uniqueness.load(Ordering::SeqCst)
    }

    fn enumerate_adapters(&self) -> Result<Vec<RawAdapterInfo>, EnumerationError> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);

        if let Some(err) = self.hard_failure.lock().unwrap().clone() {
            return Err(err);
        }
        if self.always_race.load(Ordering::SeqCst) || Self::take_pending(&self.pending_races) {
            return Err(EnumerationError::TopologyChanged);
        }
        if Self::take_pending(&self.pending_token_bumps) {
            self.bump_uniqueness();
        }

        Ok(self
            .adapters
            .lock()
            .unwrap()
            .iter()
            .map(|(info, _)| info.clone())
            .collect())
    }

    fn query_capabilities(
        &self,
        adapter_index: usize,
    ) -> Result<RawCapability, CapabilityQueryError> {
        if Self::take_pending(&self.pending_device_losses) {
            return Err(CapabilityQueryError::DeviceLost);
        }
        self.adapters
            .lock()
            .unwrap()
            .iter()
            .find(|(info, _)| info.adapter_index == adapter_index)
            .map(|(_, caps)| caps.clone())
            .unwrap_or(Err(CapabilityQueryError::DeviceLost))
    }
}

#[derive(Debug, Default)]
struct LoaderCounters {
    loads: AtomicUsize,
    fallback_registrations: AtomicUsize,
}

/// A module loader that counts what happens to it.
#[derive(Clone, Default)]
pub struct FakeLoader {
    fail: bool,
    counters: Arc<LoaderCounters>,
}

impl FakeLoader {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn load_calls(&self) -> usize {
        self.counters.loads.load(Ordering::SeqCst)
    }

    pub fn fallback_registrations(&self) -> usize {
        self.counters.fallback_registrations.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct FakeModule {
    counters: Arc<LoaderCounters>,
}

impl GraphicsModule for FakeModule {
    fn name(&self) -> &str {
        "scripted"
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
            return Err(LoadError::MissingEntryPoint("CreateDevice".into()));
        }
        Ok(Box::new(FakeModule {
            counters: Arc::clone(&self.counters),
        }))
    }
}

/// A 1920x1080 monitor at horizontal offset `x`.
pub fn monitor(index: usize, x: i32, is_primary: bool) -> RawAdapterInfo {
    let mut bounds = DesktopBounds::new();
    bounds.insert(
        ScaleContext::PerMonitorAware,
        Rect::from_origin_size(x, 0, 1920, 1080),
    );
    bounds.insert(
        ScaleContext::Unaware,
        Rect::from_origin_size(x / 2, 0, 960, 540),
    );
    RawAdapterInfo {
        adapter_index: index,
        monitor: MonitorToken(100 + index as u64),
        identity: AdapterIdentity {
            vendor_id: 0x1002,
            device_id: 0x7340 + index as u32,
            description: format!("Scripted adapter {index}"),
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

/// Driver data that derives to `tier` with square textures of `texture_size`.
pub fn caps_for_tier(tier: AccelerationTier, texture_size: u32) -> RawCapability {
    let (pixel_shader, vertex_shader) = match tier {
        AccelerationTier::Full => (ShaderVersion::new(3, 0), ShaderVersion::new(3, 0)),
        AccelerationTier::Partial => (ShaderVersion::V2_0, ShaderVersion::new(1, 1)),
        AccelerationTier::None => (ShaderVersion::new(1, 4), ShaderVersion::new(1, 1)),
    };
    RawCapability {
        pixel_shader,
        vertex_shader,
        max_texture_width: texture_size,
        max_texture_height: texture_size,
        video_memory_bytes: Some(1024 * 1024 * 1024),
        hardware_vertex_processing: tier == AccelerationTier::Full,
        is_software: false,
    }
}

pub fn adapter(index: usize, tier: AccelerationTier, texture_size: u32) -> ScriptedAdapter {
    (
        monitor(index, 1920 * index as i32, index == 0),
        Ok(caps_for_tier(tier, texture_size)),
    )
}
