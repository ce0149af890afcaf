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

//! Monitor list fed by the windowing system.
//!
//! winit only reports monitors from inside a running event loop, while the
//! snapshot manager may enumerate from any thread. The catalog bridges the two:
//! the event loop pushes the current monitor list into it, and the adapter
//! enumerator reads it back along with a generation counter that serves as the
//! display uniqueness value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use vista_core::geometry::{DesktopBounds, Rect, ScaleContext};
use vista_core::MonitorToken;
use winit::event_loop::ActiveEventLoop;
use winit::monitor::MonitorHandle;

/// What the windowing system reports about one monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorDescriptor {
    /// Human-readable name, when the platform provides one.
    pub name: Option<String>,
    /// Top-left corner in physical desktop coordinates.
    pub position: (i32, i32),
    /// Size in physical pixels.
    pub size: (u32, u32),
    /// DPI scale factor.
    pub scale_factor: f64,
    /// Refresh rate in millihertz, when known.
    pub refresh_rate_millihertz: Option<u32>,
    /// Whether the platform reports this as the primary monitor.
    pub is_primary: bool,
}

impl MonitorDescriptor {
    /// Captures a winit monitor handle.
    pub fn from_handle(handle: &MonitorHandle, primary: Option<&MonitorHandle>) -> Self {
        let position = handle.position();
        let size = handle.size();
        Self {
            name: handle.name(),
            position: (position.x, position.y),
            size: (size.width, size.height),
            scale_factor: handle.scale_factor(),
            refresh_rate_millihertz: handle.refresh_rate_millihertz(),
            is_primary: primary.is_some_and(|primary| primary == handle),
        }
    }

    /// A stable token derived from the monitor's name and position.
    pub fn token(&self) -> MonitorToken {
        let mut hash = Fnv1a::new();
        hash.write(self.name.as_deref().unwrap_or_default().as_bytes());
        hash.write(&self.position.0.to_le_bytes());
        hash.write(&self.position.1.to_le_bytes());
        MonitorToken(hash.finish())
    }

    /// Bounds in physical pixels.
    pub fn physical_bounds(&self) -> Rect {
        Rect::from_origin_size(self.position.0, self.position.1, self.size.0, self.size.1)
    }

    /// Bounds virtualized to a scale factor of 1.0.
    pub fn logical_bounds(&self) -> Rect {
        let scale = if self.scale_factor > 0.0 {
            self.scale_factor
        } else {
            1.0
        };
        let logical = |v: f64| (v / scale).round();
        Rect::from_origin_size(
            logical(self.position.0 as f64) as i32,
            logical(self.position.1 as f64) as i32,
            logical(self.size.0 as f64) as u32,
            logical(self.size.1 as f64) as u32,
        )
    }

    /// Physical and logical bounds keyed by scale context.
    pub fn desktop_bounds(&self) -> DesktopBounds {
        let mut bounds = DesktopBounds::new();
        bounds.insert(ScaleContext::PerMonitorAware, self.physical_bounds());
        bounds.insert(ScaleContext::Unaware, self.logical_bounds());
        bounds
    }

    /// Refresh rate rounded to whole hertz; zero when unknown.
    pub fn refresh_rate_hz(&self) -> u32 {
        self.refresh_rate_millihertz
            .map_or(0, |mhz| (mhz + 500) / 1000)
    }
}

struct Fnv1a(u64);

impl Fnv1a {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    fn new() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 ^= u64::from(*byte);
            self.0 = self.0.wrapping_mul(Self::PRIME);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
struct CatalogInner {
    monitors: RwLock<Vec<MonitorDescriptor>>,
    generation: AtomicU64,
}

/// A shared, thread-safe list of monitors with a change counter.
#[derive(Debug, Clone, Default)]
pub struct MonitorCatalog {
    inner: Arc<CatalogInner>,
}

impl MonitorCatalog {
    /// Creates an empty catalog at generation zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the monitor list. The generation advances only when the list
    /// actually changed. Returns `true` if it did.
    pub fn replace(&self, monitors: Vec<MonitorDescriptor>) -> bool {
        let mut current = self
            .inner
            .monitors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if *current == monitors {
            return false;
        }
        *current = monitors;
        let generation = self.inner.generation.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!(
            "Monitor catalog updated to generation {generation} ({} monitor(s))",
            current.len()
        );
        true
    }

    /// Re-reads the monitor list from a running event loop.
    pub fn refresh_from_event_loop(&self, event_loop: &ActiveEventLoop) -> bool {
        let primary = event_loop.primary_monitor();
        let monitors = event_loop
            .available_monitors()
            .map(|handle| MonitorDescriptor::from_handle(&handle, primary.as_ref()))
            .collect();
        self.replace(monitors)
    }

    /// Advances the generation without changing the list, for platform
    /// notifications (mode or DPI changes) that winit does not describe.
    pub fn invalidate(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// The current generation.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    /// The current list and the generation it belongs to.
    pub fn snapshot(&self) -> (u64, Vec<MonitorDescriptor>) {
        let monitors = self
            .inner
            .monitors
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        (self.generation(), monitors.clone())
    }
}
