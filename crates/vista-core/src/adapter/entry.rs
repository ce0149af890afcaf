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

//! Per-monitor adapter records.

use serde::{Deserialize, Serialize};

use super::capability::{AccelerationTier, Capability, RawCapability};
use super::driver::{DeviceKey, DriverDate, DriverVersion};
use crate::geometry::{DesktopBounds, Rect, ScaleContext};

/// An opaque, platform-provided token identifying a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MonitorToken(pub u64);

/// Identity of the adapter driving a monitor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AdapterIdentity {
    /// PCI vendor id.
    pub vendor_id: u32,
    /// PCI device id.
    pub device_id: u32,
    /// PCI subsystem id.
    pub subsystem_id: u32,
    /// Hardware revision.
    pub revision: u32,
    /// Installed driver version.
    pub driver_version: DriverVersion,
    /// Driver release date, if the platform reports one.
    pub driver_date: Option<DriverDate>,
    /// Human-readable adapter name.
    pub description: String,
}

impl AdapterIdentity {
    /// The `(vendor, device)` pair used by the driver denylist.
    pub fn device_key(&self) -> DeviceKey {
        DeviceKey {
            vendor_id: self.vendor_id,
            device_id: self.device_id,
        }
    }
}

/// Desktop pixel format of a display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PixelFormat {
    /// The platform did not report a format.
    #[default]
    Unknown,
    /// 16-bit 5:6:5.
    Rgb565,
    /// 32-bit BGRA with an unused alpha channel.
    Bgrx8,
    /// 32-bit BGRA.
    Bgra8,
    /// 32-bit 10:10:10:2.
    Rgb10A2,
    /// 64-bit half-float RGBA.
    Rgba16Float,
}

impl PixelFormat {
    /// Bits per pixel of the format; zero when unknown.
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Unknown => 0,
            PixelFormat::Rgb565 => 16,
            PixelFormat::Bgrx8 | PixelFormat::Bgra8 | PixelFormat::Rgb10A2 => 32,
            PixelFormat::Rgba16Float => 64,
        }
    }
}

/// Display rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// Landscape.
    #[default]
    Identity,
    /// Rotated 90 degrees clockwise.
    Rotate90,
    /// Upside down.
    Rotate180,
    /// Rotated 270 degrees clockwise.
    Rotate270,
}

/// The active display mode of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DisplayMode {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Refresh rate in hertz; zero when unknown.
    pub refresh_rate_hz: u32,
    /// Desktop pixel format.
    pub format: PixelFormat,
    /// Rotation.
    pub rotation: Rotation,
}

/// One monitor/adapter pairing as reported by the platform enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawAdapterInfo {
    /// The platform's ordinal for this adapter, passed back to
    /// [`AdapterEnumerator::query_capabilities`](crate::traits::AdapterEnumerator::query_capabilities).
    pub adapter_index: usize,
    /// The monitor this adapter output drives.
    pub monitor: MonitorToken,
    /// Adapter identity.
    pub identity: AdapterIdentity,
    /// Desktop bounds of the monitor per scale context.
    pub bounds: DesktopBounds,
    /// Active display mode.
    pub mode: DisplayMode,
    /// Whether this is the primary display.
    pub is_primary: bool,
    /// Whether the adapter is remote (e.g. a remote desktop session).
    pub is_remote: bool,
    /// Whether the monitor mirrors another monitor.
    pub is_mirror: bool,
}

/// The capability side of an adapter entry, computed once at snapshot build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EntryCapability {
    pub(crate) raw: Option<RawCapability>,
    pub(crate) derived: Capability,
    pub(crate) driver_recent_enough: bool,
    pub(crate) driver_denylisted: bool,
}

/// An immutable record describing one monitor and the adapter driving it.
///
/// Entries are created while a snapshot is built and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterEntry {
    index: usize,
    adapter_index: usize,
    monitor: MonitorToken,
    identity: AdapterIdentity,
    bounds: DesktopBounds,
    mode: DisplayMode,
    is_primary: bool,
    is_remote: bool,
    is_mirror: bool,
    capability: EntryCapability,
}

impl AdapterEntry {
    pub(crate) fn new(index: usize, info: RawAdapterInfo, capability: EntryCapability) -> Self {
        Self {
            index,
            adapter_index: info.adapter_index,
            monitor: info.monitor,
            identity: info.identity,
            bounds: info.bounds,
            mode: info.mode,
            is_primary: info.is_primary,
            is_remote: info.is_remote,
            is_mirror: info.is_mirror,
            capability,
        }
    }

    /// Stable position of the entry within its snapshot.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The platform's ordinal for the adapter.
    pub fn adapter_index(&self) -> usize {
        self.adapter_index
    }

    /// The monitor this entry describes.
    pub fn monitor(&self) -> MonitorToken {
        self.monitor
    }

    /// Adapter identity.
    pub fn identity(&self) -> &AdapterIdentity {
        &self.identity
    }

    /// Desktop bounds for every observed scale context.
    pub fn bounds(&self) -> &DesktopBounds {
        &self.bounds
    }

    /// Desktop bounds under a specific scale context.
    pub fn desktop_bounds(&self, context: ScaleContext) -> Option<Rect> {
        self.bounds.get(context)
    }

    /// Active display mode.
    pub fn mode(&self) -> &DisplayMode {
        &self.mode
    }

    /// Bits per pixel of the desktop format.
    pub fn bits_per_pixel(&self) -> u32 {
        self.mode.format.bits_per_pixel()
    }

    /// Whether this is the primary display.
    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Whether the adapter is remote or mirrors another output.
    pub fn is_non_local(&self) -> bool {
        self.is_remote || self.is_mirror
    }

    /// Whether the adapter is remote.
    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    /// Whether the monitor mirrors another monitor.
    pub fn is_mirror(&self) -> bool {
        self.is_mirror
    }

    /// Derived capability used for rendering decisions.
    pub fn capability(&self) -> &Capability {
        &self.capability.derived
    }

    /// Acceleration tier of the derived capability.
    pub fn tier(&self) -> AccelerationTier {
        self.capability.derived.tier
    }

    /// What the driver reported, if the query succeeded.
    pub fn raw_capability(&self) -> Option<&RawCapability> {
        self.capability.raw.as_ref()
    }

    /// Whether the driver passed the recency check.
    pub fn driver_recent_enough(&self) -> bool {
        self.capability.driver_recent_enough
    }

    /// Whether the hardware model is denylisted.
    pub fn driver_denylisted(&self) -> bool {
        self.capability.driver_denylisted
    }
}
