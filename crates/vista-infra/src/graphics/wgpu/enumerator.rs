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

//! Adapter enumeration over wgpu and the monitor catalog.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use anyhow::{bail, Result};
use vista_core::error::{CapabilityQueryError, EnumerationError};
use vista_core::traits::AdapterEnumerator;
use vista_core::{
    AdapterIdentity, DisplayMode, MonitorToken, PixelFormat, RawAdapterInfo, RawCapability,
};
use wgpu::{Adapter, Backend, Instance, PowerPreference, RequestAdapterOptions};

use super::conversions::{backend_name, raw_capability, IntoVista};
use crate::platform::{MonitorCatalog, MonitorDescriptor};

/// The adapter set recorded by the latest enumeration, indexed by
/// `adapter_index`.
///
/// Concurrent enumerations replace each other's set. Whenever a recorded set
/// differs from the one it replaces the epoch advances, which invalidates any
/// snapshot built against the older set.
#[derive(Debug)]
struct AdapterRegistry<T> {
    epoch: AtomicU64,
    current: Mutex<(Vec<AdapterIdentity>, Vec<T>)>,
}

impl<T> AdapterRegistry<T> {
    fn new() -> Self {
        Self {
            epoch: AtomicU64::new(0),
            current: Mutex::new((Vec::new(), Vec::new())),
        }
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Records a freshly enumerated set. Returns `true` if it replaced a
    /// different one.
    fn record(&self, identities: Vec<AdapterIdentity>, adapters: Vec<T>) -> bool {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let changed = !current.0.is_empty() && current.0 != identities;
        if changed {
            let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
            log::info!(
                "Graphics adapter set changed to {} adapter(s) (epoch {epoch})",
                identities.len()
            );
        }
        *current = (identities, adapters);
        changed
    }

    fn with_adapter<R>(&self, index: usize, f: impl FnOnce(&T) -> R) -> Option<R> {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.1.get(index).map(f)
    }
}

/// Enumerates the monitors known to a [`MonitorCatalog`] and the wgpu
/// adapters that can drive them.
///
/// wgpu does not say which adapter scans out to which monitor, so every
/// monitor is paired with the high-performance adapter. Without any monitor
/// (headless), one entry per adapter is reported.
///
/// The display uniqueness value advances with the catalog generation and
/// whenever the set of wgpu adapters changes.
#[derive(Debug)]
pub struct WgpuAdapterEnumerator {
    instance: Instance,
    catalog: MonitorCatalog,
    adapters: AdapterRegistry<Adapter>,
}

impl WgpuAdapterEnumerator {
    /// Creates an enumerator reading monitors from `catalog`.
    pub fn new(catalog: MonitorCatalog) -> Self {
        Self {
            instance: Instance::new(wgpu::InstanceDescriptor::new_without_display_handle()),
            catalog,
            adapters: AdapterRegistry::new(),
        }
    }

    /// The catalog monitors are read from.
    pub fn catalog(&self) -> &MonitorCatalog {
        &self.catalog
    }

    /// Requests one adapter per power preference and drops duplicates.
    fn request_adapters(&self) -> Result<Vec<Adapter>> {
        let mut adapters: Vec<Adapter> = Vec::new();

        for power_preference in [PowerPreference::HighPerformance, PowerPreference::LowPower] {
            match pollster::block_on(self.instance.request_adapter(&RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })) {
                Ok(adapter) => {
                    let info = adapter.get_info();
                    let known = adapters.iter().any(|other| {
                        let other = other.get_info();
                        other.vendor == info.vendor
                            && other.device == info.device
                            && other.backend == info.backend
                            && other.name == info.name
                    });
                    if !known {
                        log::debug!(
                            "Found adapter \"{}\" on {} ({:?})",
                            info.name,
                            backend_name(info.backend),
                            power_preference
                        );
                        adapters.push(adapter);
                    }
                }
                Err(e) => log::debug!("No adapter for {power_preference:?}: {e}"),
            }
        }

        if adapters.is_empty() {
            bail!("No graphics adapter is available");
        }
        Ok(adapters)
    }
}

/// Pairs monitors with adapters.
///
/// Every monitor is driven by the first adapter. A monitor occupying exactly
/// the same desktop area as an earlier one is reported as a mirror.
pub fn describe_outputs(
    monitors: &[MonitorDescriptor],
    adapters: &[AdapterIdentity],
) -> Vec<RawAdapterInfo> {
    let Some(first) = adapters.first() else {
        return Vec::new();
    };

    if monitors.is_empty() {
        return adapters
            .iter()
            .enumerate()
            .map(|(index, identity)| RawAdapterInfo {
                adapter_index: index,
                monitor: MonitorToken(index as u64),
                identity: identity.clone(),
                is_primary: index == 0,
                ..RawAdapterInfo::default()
            })
            .collect();
    }

    monitors
        .iter()
        .enumerate()
        .map(|(index, monitor)| {
            let is_mirror = monitors[..index]
                .iter()
                .any(|earlier| earlier.position == monitor.position && earlier.size == monitor.size);
            RawAdapterInfo {
                adapter_index: 0,
                monitor: monitor.token(),
                identity: first.clone(),
                bounds: monitor.desktop_bounds(),
                mode: DisplayMode {
                    width: monitor.size.0,
                    height: monitor.size.1,
                    refresh_rate_hz: monitor.refresh_rate_hz(),
                    format: PixelFormat::Bgra8,
                    ..DisplayMode::default()
                },
                is_primary: monitor.is_primary,
                is_remote: false,
                is_mirror,
            }
        })
        .collect()
}

impl AdapterEnumerator for WgpuAdapterEnumerator {
    fn display_uniqueness(&self) -> u64 {
        // Both counters only grow, so their sum moves whenever either does.
        self.catalog
            .generation()
            .wrapping_add(self.adapters.epoch())
    }

    fn enumerate_adapters(&self) -> Result<Vec<RawAdapterInfo>, EnumerationError> {
        let (generation, monitors) = self.catalog.snapshot();

        let adapters = self
            .request_adapters()
            .map_err(|e| EnumerationError::Failed(e.to_string()))?;
        let identities: Vec<AdapterIdentity> = adapters
            .iter()
            .map(|adapter| (&adapter.get_info()).into_vista())
            .collect();

        if self.catalog.generation() != generation {
            return Err(EnumerationError::TopologyChanged);
        }

        let outputs = describe_outputs(&monitors, &identities);
        self.adapters.record(identities, adapters);
        Ok(outputs)
    }

    fn query_capabilities(
        &self,
        adapter_index: usize,
    ) -> Result<RawCapability, CapabilityQueryError> {
        self.adapters
            .with_adapter(adapter_index, |adapter| {
                let info = adapter.get_info();
                if info.backend == Backend::Noop {
                    return Err(CapabilityQueryError::Unsupported(format!(
                        "\"{}\" runs on the no-op backend",
                        info.name
                    )));
                }
                Ok(raw_capability(
                    &info,
                    &adapter.limits(),
                    &adapter.get_downlevel_capabilities(),
                ))
            })
            .unwrap_or(Err(CapabilityQueryError::DeviceLost))
    }
}
