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

//! Immutable topology snapshots.

mod builder;
mod tokens;

pub(crate) use self::builder::build_snapshot;
pub use self::tokens::StalenessTokens;
pub(crate) use self::tokens::AtomicTokens;

use std::fmt;
use std::sync::Arc;

use crate::adapter::{AdapterEntry, Capability, MonitorToken};
use crate::cache::{CapabilityCache, ContrastTable, GammaTable};
use crate::geometry::{DesktopBounds, Rect, ScaleContext};
use crate::module::{ModuleHandle, ModuleHold};

/// A consistent description of the monitors and adapters attached to the host.
///
/// Everything except the staleness tokens and the lazily filled
/// [`CapabilityCache`] is fixed at construction. A snapshot keeps the graphics
/// module loaded for as long as it lives.
pub struct TopologySnapshot {
    adapters: Vec<AdapterEntry>,
    desktop_bounds: DesktopBounds,
    has_non_local_adapter: bool,
    tokens: AtomicTokens,
    cache: CapabilityCache,
    module_hold: ModuleHold,
}

impl TopologySnapshot {
    pub(crate) fn new(
        adapters: Vec<AdapterEntry>,
        desktop_bounds: DesktopBounds,
        has_non_local_adapter: bool,
        tokens: StalenessTokens,
        module_hold: ModuleHold,
    ) -> Self {
        Self {
            adapters,
            desktop_bounds,
            has_non_local_adapter,
            tokens: AtomicTokens::new(tokens),
            cache: CapabilityCache::new(),
            module_hold,
        }
    }

    /// Adapter entries in enumeration order.
    pub fn adapters(&self) -> &[AdapterEntry] {
        &self.adapters
    }

    /// The entry at `index`.
    pub fn adapter(&self, index: usize) -> Option<&AdapterEntry> {
        self.adapters.get(index)
    }

    /// Number of adapter entries.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Returns `true` when no monitor is attached.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// The entry flagged primary, or the first entry if none is.
    pub fn primary_adapter(&self) -> Option<&AdapterEntry> {
        self.adapters
            .iter()
            .find(|entry| entry.is_primary())
            .or_else(|| self.adapters.first())
    }

    /// The entry driving `monitor`.
    pub fn adapter_for_monitor(&self, monitor: MonitorToken) -> Option<&AdapterEntry> {
        self.adapters.iter().find(|entry| entry.monitor() == monitor)
    }

    /// Union of every adapter's desktop bounds, per scale context.
    pub fn all_desktop_bounds(&self) -> &DesktopBounds {
        &self.desktop_bounds
    }

    /// Union of every adapter's desktop bounds under `context`.
    pub fn desktop_bounds(&self, context: ScaleContext) -> Option<Rect> {
        self.desktop_bounds.get(context)
    }

    /// Whether a remote or mirroring adapter is present.
    pub fn has_non_local_adapter(&self) -> bool {
        self.has_non_local_adapter
    }

    /// The staleness tokens currently stamped on the snapshot.
    pub fn tokens(&self) -> StalenessTokens {
        self.tokens.load()
    }

    /// Takes over `other`'s staleness tokens. Only the manager calls this,
    /// under its commit lock, after establishing equivalence.
    pub(crate) fn adopt_tokens_from(&self, other: &TopologySnapshot) {
        self.tokens.store(other.tokens());
    }

    /// Structural equality ignoring staleness tokens, reference counts and
    /// cached tables.
    pub fn is_equivalent_to(&self, other: &TopologySnapshot) -> bool {
        self.adapters == other.adapters
            && self.desktop_bounds == other.desktop_bounds
            && self.has_non_local_adapter == other.has_non_local_adapter
    }

    /// The capability every attached adapter can honor. Memoized.
    pub fn common_minimum_capability(&self) -> Capability {
        self.cache.common_minimum(&self.adapters)
    }

    /// Field-wise best capability across adapters; the no-acceleration
    /// sentinel when there are none.
    pub fn best_capability(&self) -> Capability {
        self.adapters
            .iter()
            .map(|entry| *entry.capability())
            .reduce(|acc, next| acc.max_with(&next))
            .unwrap_or(Capability::NO_ACCELERATION)
    }

    /// Memoized gamma lookup table for bucket `index`.
    pub fn gamma_table(&self, index: usize) -> Arc<GammaTable> {
        self.cache.gamma_table(index)
    }

    /// Memoized contrast lookup table for factor `k`.
    pub fn contrast_table(&self, k: f32) -> Arc<ContrastTable> {
        self.cache.contrast_table(k)
    }

    /// The derived-data cache.
    pub fn cache(&self) -> &CapabilityCache {
        &self.cache
    }

    pub(crate) fn module(&self) -> &Arc<ModuleHandle> {
        self.module_hold.module()
    }
}

impl fmt::Debug for TopologySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopologySnapshot")
            .field("adapters", &self.adapters)
            .field("desktop_bounds", &self.desktop_bounds)
            .field("has_non_local_adapter", &self.has_non_local_adapter)
            .field("tokens", &self.tokens())
            .field("cache", &self.cache)
            .finish()
    }
}
