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

//! Per-snapshot memoized derived data.
//!
//! A [`CapabilityCache`] lives inside a [`TopologySnapshot`](crate::TopologySnapshot)
//! and is dropped with it. Because the snapshot's adapter list never changes,
//! nothing stored here ever needs invalidation.

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use crate::adapter::{AdapterEntry, Capability};
use crate::collections::CompactList;

/// Number of gamma buckets; bucket `i` stands for gamma `1.0 + 0.1 * i`.
pub const GAMMA_BUCKETS: usize = 13;

/// Largest contrast factor a table is built for.
pub const MAX_CONTRAST: f32 = 10.0;

/// Reduces per-adapter capabilities to the capability every adapter can honor.
///
/// Returns the no-acceleration sentinel when there are no adapters or any
/// adapter is remote or mirrored. A single local adapter's capability is
/// returned unchanged.
pub fn common_minimum(adapters: &[AdapterEntry]) -> Capability {
    if adapters.is_empty() || adapters.iter().any(AdapterEntry::is_non_local) {
        return Capability::NO_ACCELERATION;
    }
    adapters
        .iter()
        .map(|entry| *entry.capability())
        .reduce(|acc, next| acc.min_with(&next))
        .unwrap_or(Capability::NO_ACCELERATION)
}

/// 8-bit encode/decode lookup tables for one gamma value.
#[derive(Clone, PartialEq)]
pub struct GammaTable {
    bucket: usize,
    gamma: f32,
    /// Linear to gamma-encoded.
    pub encode: [u8; 256],
    /// Gamma-encoded to linear.
    pub decode: [u8; 256],
}

impl GammaTable {
    fn build(bucket: usize) -> Self {
        let gamma = 1.0 + 0.1 * bucket as f32;
        let mut encode = [0u8; 256];
        let mut decode = [0u8; 256];
        for i in 0..256 {
            let x = i as f32 / 255.0;
            encode[i] = quantize(x.powf(1.0 / gamma));
            decode[i] = quantize(x.powf(gamma));
        }
        Self {
            bucket,
            gamma,
            encode,
            decode,
        }
    }

    /// The bucket this table was built for.
    pub fn bucket(&self) -> usize {
        self.bucket
    }

    /// The gamma exponent.
    pub fn gamma(&self) -> f32 {
        self.gamma
    }
}

impl fmt::Debug for GammaTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GammaTable")
            .field("bucket", &self.bucket)
            .field("gamma", &self.gamma)
            .finish_non_exhaustive()
    }
}

/// An 8-bit lookup table for text contrast enhancement.
///
/// Entry `a` holds `a * (k + 1) / (a * k + 1)` for alpha `a` in `0..=1`.
#[derive(Clone, PartialEq)]
pub struct ContrastTable {
    factor: f32,
    /// The enhanced alpha values.
    pub values: [u8; 256],
}

impl ContrastTable {
    fn build(factor: f32) -> Self {
        let mut values = [0u8; 256];
        for (i, value) in values.iter_mut().enumerate() {
            let a = i as f32 / 255.0;
            *value = quantize(a * (factor + 1.0) / (a * factor + 1.0));
        }
        Self { factor, values }
    }

    /// The contrast factor the table was built for.
    pub fn factor(&self) -> f32 {
        self.factor
    }
}

impl fmt::Debug for ContrastTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContrastTable")
            .field("factor", &self.factor)
            .finish_non_exhaustive()
    }
}

fn quantize(unit: f32) -> u8 {
    (unit.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Lazily computed tables and reductions for one snapshot.
#[derive(Default)]
pub struct CapabilityCache {
    common_minimum: OnceLock<Capability>,
    gamma: Mutex<CompactList<Arc<GammaTable>>>,
    contrast: Mutex<CompactList<Arc<ContrastTable>>>,
}

impl CapabilityCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized common-minimum capability, computing it from
    /// `adapters` on first use.
    pub fn common_minimum(&self, adapters: &[AdapterEntry]) -> Capability {
        *self.common_minimum.get_or_init(|| common_minimum(adapters))
    }

    /// Returns `true` once the common-minimum capability has been computed.
    pub fn has_common_minimum(&self) -> bool {
        self.common_minimum.get().is_some()
    }

    /// Returns the gamma table for `index`, building it on first use.
    /// Indexes past the last bucket are clamped.
    pub fn gamma_table(&self, index: usize) -> Arc<GammaTable> {
        let bucket = index.min(GAMMA_BUCKETS - 1);
        let mut tables = self.gamma.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = tables.find(|table| table.bucket == bucket) {
            return Arc::clone(table);
        }
        let table = Arc::new(GammaTable::build(bucket));
        tables.push(Arc::clone(&table));
        table
    }

    /// Returns the contrast table for factor `k`, building it on first use.
    /// The factor is clamped to `0.0..=MAX_CONTRAST`; NaN is treated as zero.
    pub fn contrast_table(&self, k: f32) -> Arc<ContrastTable> {
        let factor = if k.is_nan() { 0.0 } else { k.clamp(0.0, MAX_CONTRAST) };
        let key = factor.to_bits();
        let mut tables = self
            .contrast
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = tables.find(|table| table.factor.to_bits() == key) {
            return Arc::clone(table);
        }
        let table = Arc::new(ContrastTable::build(factor));
        tables.push(Arc::clone(&table));
        table
    }

    /// Number of gamma and contrast tables built so far.
    pub fn table_counts(&self) -> (usize, usize) {
        let gamma = self.gamma.lock().unwrap_or_else(PoisonError::into_inner).len();
        let contrast = self
            .contrast
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        (gamma, contrast)
    }
}

impl fmt::Debug for CapabilityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (gamma, contrast) = self.table_counts();
        f.debug_struct("CapabilityCache")
            .field("common_minimum", &self.common_minimum.get())
            .field("gamma_tables", &gamma)
            .field("contrast_tables", &contrast)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AccelerationTier;
    use crate::test_support::{entry, remote_entry};

    #[test]
    fn common_minimum_folds_field_wise() {
        let adapters = [
            entry(0, AccelerationTier::Full, 4096),
            entry(1, AccelerationTier::Partial, 2048),
        ];
        let min = common_minimum(&adapters);
        assert_eq!(min.tier, AccelerationTier::Partial);
        assert_eq!(min.max_texture_size(), 2048);
    }

    #[test]
    fn common_minimum_of_single_local_adapter_is_unchanged() {
        let adapters = [entry(0, AccelerationTier::Full, 4096)];
        assert_eq!(common_minimum(&adapters), *adapters[0].capability());
    }

    #[test]
    fn common_minimum_with_non_local_adapter_is_sentinel() {
        let adapters = [
            entry(0, AccelerationTier::Full, 4096),
            remote_entry(1, AccelerationTier::Full, 4096),
        ];
        assert_eq!(common_minimum(&adapters), Capability::NO_ACCELERATION);
        assert_eq!(common_minimum(&[]), Capability::NO_ACCELERATION);
    }

    #[test]
    fn common_minimum_is_memoized() {
        let cache = CapabilityCache::new();
        let adapters = [entry(0, AccelerationTier::Full, 4096)];
        assert!(!cache.has_common_minimum());
        let first = cache.common_minimum(&adapters);
        // Later calls ignore their argument.
        let second = cache.common_minimum(&[]);
        assert_eq!(first, second);
        assert!(cache.has_common_minimum());
    }

    #[test]
    fn gamma_tables_are_shared_and_clamped() {
        let cache = CapabilityCache::new();
        let a = cache.gamma_table(3);
        let b = cache.gamma_table(3);
        assert!(Arc::ptr_eq(&a, &b));

        let clamped = cache.gamma_table(99);
        assert_eq!(clamped.bucket(), GAMMA_BUCKETS - 1);
        assert!(Arc::ptr_eq(&clamped, &cache.gamma_table(GAMMA_BUCKETS - 1)));
        assert_eq!(cache.table_counts(), (2, 0));
    }

    #[test]
    fn identity_gamma_is_identity() {
        let table = CapabilityCache::new().gamma_table(0);
        assert_eq!(table.gamma(), 1.0);
        for i in 0..256 {
            assert_eq!(table.encode[i] as usize, i);
            assert_eq!(table.decode[i] as usize, i);
        }
    }

    #[test]
    fn gamma_encode_brightens_midtones() {
        let table = CapabilityCache::new().gamma_table(10);
        assert!(table.encode[128] > 128);
        assert!(table.decode[128] < 128);
        assert_eq!(table.encode[0], 0);
        assert_eq!(table.encode[255], 255);
    }

    #[test]
    fn contrast_tables_keyed_by_factor() {
        let cache = CapabilityCache::new();
        let a = cache.contrast_table(1.0);
        assert!(Arc::ptr_eq(&a, &cache.contrast_table(1.0)));
        assert!(!Arc::ptr_eq(&a, &cache.contrast_table(2.0)));

        let clamped = cache.contrast_table(50.0);
        assert_eq!(clamped.factor(), MAX_CONTRAST);
        assert_eq!(cache.table_counts(), (0, 3));
    }

    #[test]
    fn contrast_zero_is_identity_and_positive_boosts() {
        let cache = CapabilityCache::new();
        let flat = cache.contrast_table(0.0);
        for i in 0..256 {
            assert_eq!(flat.values[i] as usize, i);
        }
        let boosted = cache.contrast_table(1.0);
        assert!(boosted.values[64] > 64);
        assert_eq!(boosted.values[255], 255);
    }
}
