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

//! Builds a candidate snapshot from a fresh enumeration.

use crate::adapter::{AdapterEntry, Capability, EntryCapability, RawAdapterInfo};
use crate::config::TopologyConfig;
use crate::error::{CapabilityQueryError, TopologyError, TopologyResult};
use crate::geometry::DesktopBounds;
use crate::module::ModuleHold;
use crate::traits::AdapterEnumerator;

use super::{StalenessTokens, TopologySnapshot};

/// Enumerates adapters and assembles a fully populated snapshot.
///
/// Runs without any manager lock held. The returned snapshot is stamped with
/// `tokens`, which the caller read before starting.
pub(crate) fn build_snapshot(
    enumerator: &dyn AdapterEnumerator,
    config: &TopologyConfig,
    tokens: StalenessTokens,
    hold: ModuleHold,
) -> TopologyResult<TopologySnapshot> {
    let mut infos = enumerator.enumerate_adapters()?;

    if config.disable_multi_adapter && infos.len() > 1 {
        let primary = infos.iter().position(|info| info.is_primary).unwrap_or(0);
        let kept = infos.swap_remove(primary);
        log::debug!(
            "Multi-adapter disabled, keeping only '{}'",
            kept.identity.description
        );
        infos = vec![kept];
    }

    let mut adapters = Vec::with_capacity(infos.len());
    let mut desktop_bounds = DesktopBounds::new();
    let mut has_non_local_adapter = false;

    for (index, info) in infos.into_iter().enumerate() {
        let capability = resolve_capability(enumerator, config, &info)?;
        let entry = AdapterEntry::new(index, info, capability);

        desktop_bounds.union_with(entry.bounds());
        has_non_local_adapter |= entry.is_non_local();
        adapters.push(entry);
    }

    Ok(TopologySnapshot::new(
        adapters,
        desktop_bounds,
        has_non_local_adapter,
        tokens,
        hold,
    ))
}

fn resolve_capability(
    enumerator: &dyn AdapterEnumerator,
    config: &TopologyConfig,
    info: &RawAdapterInfo,
) -> TopologyResult<EntryCapability> {
    let policy = &config.driver_policy;
    let driver_recent_enough = policy.is_recent_enough(&info.identity);
    let driver_denylisted = policy.is_denylisted(&info.identity);

    let raw = match enumerator.query_capabilities(info.adapter_index) {
        Ok(raw) => Some(raw),
        Err(err) if err.invalidates_topology() => {
            log::debug!(
                "Capability query for adapter {} failed ({err}), treating as a topology change",
                info.adapter_index
            );
            return Err(TopologyError::TopologyInvalid);
        }
        Err(CapabilityQueryError::OutOfMemory) => return Err(TopologyError::OutOfMemory),
        Err(err) => {
            log::warn!(
                "No capability data for '{}', falling back to software: {err}",
                info.identity.description
            );
            None
        }
    };

    let derived = match &raw {
        Some(_) if config.force_software => Capability::NO_ACCELERATION,
        Some(_) if !driver_recent_enough => {
            log::warn!(
                "Driver {} for '{}' is older than {}, disabling acceleration",
                info.identity.driver_version,
                info.identity.description,
                policy.minimum_date
            );
            Capability::NO_ACCELERATION
        }
        Some(_) if driver_denylisted => {
            log::warn!(
                "Device {:04x}:{:04x} is denylisted, disabling acceleration",
                info.identity.vendor_id,
                info.identity.device_id
            );
            Capability::NO_ACCELERATION
        }
        Some(raw) => {
            let derived = Capability::derive(raw);
            match config.max_texture_size {
                Some(limit) => derived.with_texture_limit(limit),
                None => derived,
            }
        }
        None => Capability::NO_ACCELERATION,
    };

    Ok(EntryCapability {
        raw,
        derived,
        driver_recent_enough,
        driver_denylisted,
    })
}
