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

//! Lifetime of the loaded graphics driver module.
//!
//! The module outlives many snapshot generations. It stays loaded while its
//! usage counter is non-zero; the counter is bumped by every live snapshot
//! (through a [`ModuleHold`]) and by every external pin taken with
//! [`ModuleHandle::increment_use_ref`]. The counter is a plain atomic and is
//! never guarded by the snapshot manager's lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{LoadError, TopologyError, TopologyResult};
use crate::traits::{GraphicsModule, GraphicsModuleLoader};

struct LoadedModule {
    module: Box<dyn GraphicsModule>,
    instance: u64,
    software_fallback_registered: bool,
}

enum ModuleState {
    Unloaded,
    Loaded(LoadedModule),
    /// Load failures are sticky until the handle is dropped.
    Failed(LoadError),
}

/// Owns the loaded graphics module and its usage counters.
pub struct ModuleHandle {
    loader: Box<dyn GraphicsModuleLoader>,
    state: Mutex<ModuleState>,
    use_refs: AtomicUsize,
    pins: AtomicUsize,
    instances: AtomicU64,
}

impl ModuleHandle {
    /// Creates an unloaded handle. Nothing is loaded until first use.
    pub fn new(loader: impl GraphicsModuleLoader + 'static) -> Arc<Self> {
        Arc::new(Self {
            loader: Box::new(loader),
            state: Mutex::new(ModuleState::Unloaded),
            use_refs: AtomicUsize::new(0),
            pins: AtomicUsize::new(0),
            instances: AtomicU64::new(0),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, ModuleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Loads the module on first call. Later calls are cheap; after a failed
    /// load the cached failure is returned without retrying.
    pub fn ensure_loaded(&self) -> TopologyResult<()> {
        let mut state = self.lock_state();
        match &*state {
            ModuleState::Loaded(_) => Ok(()),
            ModuleState::Failed(err) => Err(err.clone().into()),
            ModuleState::Unloaded => match self.loader.load_graphics_module() {
                Ok(module) => {
                    let instance = self.instances.fetch_add(1, Ordering::Relaxed) + 1;
                    log::info!(
                        "Loaded graphics module \"{}\" (instance {instance})",
                        module.name()
                    );
                    *state = ModuleState::Loaded(LoadedModule {
                        module,
                        instance,
                        software_fallback_registered: false,
                    });
                    Ok(())
                }
                Err(err) => {
                    log::warn!("Graphics module failed to load, not retrying: {err}");
                    *state = ModuleState::Failed(err.clone());
                    Err(err.into())
                }
            },
        }
    }

    /// Returns `true` while a module instance is loaded.
    pub fn is_loaded(&self) -> bool {
        matches!(*self.lock_state(), ModuleState::Loaded(_))
    }

    /// Identifies the currently loaded instance; a new value is assigned every
    /// time the module is reloaded after teardown.
    pub fn loaded_instance(&self) -> Option<u64> {
        match &*self.lock_state() {
            ModuleState::Loaded(loaded) => Some(loaded.instance),
            _ => None,
        }
    }

    /// Total usage: live snapshots plus external pins.
    pub fn use_count(&self) -> usize {
        self.use_refs.load(Ordering::Acquire)
    }

    /// Number of external pins.
    pub fn pinned_count(&self) -> usize {
        self.pins.load(Ordering::Acquire)
    }

    /// Pins the module independently of any snapshot. Returns the new pin count.
    pub fn increment_use_ref(&self) -> usize {
        self.use_refs.fetch_add(1, Ordering::AcqRel);
        self.pins.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Releases a pin taken with [`increment_use_ref`](Self::increment_use_ref).
    /// Returns the remaining pin count.
    pub fn decrement_use_ref(&self) -> usize {
        match self
            .pins
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |pins| pins.checked_sub(1))
        {
            Ok(previous) => {
                self.release_use();
                previous - 1
            }
            Err(_) => {
                debug_assert!(false, "decrement_use_ref called without a matching pin");
                log::error!("Graphics module unpinned more times than it was pinned");
                0
            }
        }
    }

    /// Takes a usage hold for a snapshot, loading the module if needed.
    pub(crate) fn acquire_hold(self: &Arc<Self>) -> TopologyResult<ModuleHold> {
        // Count before loading so a concurrent teardown sees us.
        self.use_refs.fetch_add(1, Ordering::AcqRel);
        let hold = ModuleHold {
            module: Arc::clone(self),
        };
        self.ensure_loaded()?;
        Ok(hold)
    }

    fn release_use(&self) {
        if self.use_refs.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.unload_if_unused();
        }
    }

    fn unload_if_unused(&self) {
        let mut state = self.lock_state();
        // Re-check under the lock: a hold may have been taken since the count hit zero.
        if self.use_refs.load(Ordering::Acquire) != 0 {
            return;
        }
        if let ModuleState::Loaded(loaded) = &*state {
            log::info!(
                "Unloading graphics module \"{}\" (instance {}), no users remain",
                loaded.module.name(),
                loaded.instance
            );
            *state = ModuleState::Unloaded;
        }
    }

    /// Registers the software rasterizer with the loaded module instance.
    ///
    /// Safe to call redundantly: registration happens at most once per loaded
    /// instance, and again only after the module was torn down and reloaded.
    pub fn register_software_fallback_once(&self) -> TopologyResult<()> {
        let mut state = self.lock_state();
        match &mut *state {
            ModuleState::Loaded(loaded) => {
                if loaded.software_fallback_registered {
                    return Ok(());
                }
                loaded
                    .module
                    .register_software_fallback()
                    .map_err(TopologyError::SoftwareFallbackFailed)?;
                loaded.software_fallback_registered = true;
                log::info!(
                    "Registered software rasterizer with \"{}\" (instance {})",
                    loaded.module.name(),
                    loaded.instance
                );
                Ok(())
            }
            ModuleState::Failed(err) => Err(err.clone().into()),
            // The instance the caller validated against has been torn down.
            ModuleState::Unloaded => Err(TopologyError::TopologyInvalid),
        }
    }
}

impl fmt::Debug for ModuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHandle")
            .field("loaded_instance", &self.loaded_instance())
            .field("use_refs", &self.use_count())
            .field("pins", &self.pinned_count())
            .finish()
    }
}

/// Keeps the module loaded for as long as it lives. Every snapshot owns one.
pub(crate) struct ModuleHold {
    module: Arc<ModuleHandle>,
}

impl ModuleHold {
    pub(crate) fn module(&self) -> &Arc<ModuleHandle> {
        &self.module
    }
}

impl Clone for ModuleHold {
    fn clone(&self) -> Self {
        // The source hold keeps the module loaded, so no load check is needed.
        self.module.use_refs.fetch_add(1, Ordering::AcqRel);
        Self {
            module: Arc::clone(&self.module),
        }
    }
}

impl Drop for ModuleHold {
    fn drop(&mut self) {
        self.module.release_use();
    }
}

impl fmt::Debug for ModuleHold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModuleHold").finish()
    }
}
