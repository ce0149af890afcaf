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

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use vista_core::{ModuleHandle, SnapshotManager, SnapshotRef};
use vista_infra::{MonitorCatalog, WgpuAdapterEnumerator, WgpuModuleLoader};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::WindowId;

const OVERRIDE_FILE: &str = "vista.ron";

struct TopologyReporter {
    catalog: MonitorCatalog,
    manager: SnapshotManager,
    result: Result<()>,
}

impl TopologyReporter {
    fn report(&self) -> Result<()> {
        let snapshot = self.manager.get_latest()?;
        log_snapshot(&snapshot);

        let (common, tokens) = self.manager.query_acceleration_caps(true)?;
        let (best, _) = self.manager.query_acceleration_caps(false)?;
        log::info!("Common capability: {:?} ({}px textures)", common.tier, common.max_texture_size());
        log::info!("Best capability:   {:?} ({}px textures)", best.tier, best.max_texture_size());
        log::info!("Tokens: {tokens:?}");

        if !common.is_hardware_accelerated() {
            self.manager.ensure_software_fallback_registered(&snapshot)?;
        }

        log::info!("Manager statistics: {:?}", self.manager.stats());
        Ok(())
    }
}

fn log_snapshot(snapshot: &SnapshotRef) {
    log::info!("Snapshot holds {} adapter entries", snapshot.len());
    for entry in snapshot.adapters() {
        log::info!(
            "  [{}] {} on monitor {:?}: {}x{}@{}Hz, tier {:?}{}{}",
            entry.index(),
            entry.identity().description,
            entry.monitor(),
            entry.mode().width,
            entry.mode().height,
            entry.mode().refresh_rate_hz,
            entry.tier(),
            if entry.is_primary() { ", primary" } else { "" },
            if entry.is_mirror() { ", mirror" } else { "" },
        );
    }
}

impl ApplicationHandler for TopologyReporter {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.catalog.refresh_from_event_loop(event_loop);

        // Keep the module loaded across the queries below.
        self.manager.pin_module();
        self.result = self.report();
        self.manager.unpin_module();

        event_loop.exit();
    }

    fn window_event(&mut self, _: &ActiveEventLoop, _: WindowId, _: WindowEvent) {}
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info"))
        .filter_module("wgpu_hal", log::LevelFilter::Error)
        .init();

    let catalog = MonitorCatalog::new();
    let enumerator = WgpuAdapterEnumerator::new(catalog.clone());
    let module = ModuleHandle::new(WgpuModuleLoader::new());
    let overrides = vista_infra::config::layered(Some(Path::new(OVERRIDE_FILE)))?;
    let manager = SnapshotManager::with_config_source(Arc::new(enumerator), module, &overrides);

    let mut reporter = TopologyReporter {
        catalog,
        manager,
        result: Ok(()),
    };
    EventLoop::new()?.run_app(&mut reporter)?;
    reporter.result
}
