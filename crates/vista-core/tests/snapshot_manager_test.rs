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

mod common;

use std::sync::Arc;
use std::thread;

use common::{adapter, FakeLoader, ScriptedEnumerator};
use vista_core::config::{MapConfigSource, KEY_FORCE_SOFTWARE};
use vista_core::error::{CapabilityQueryError, EnumerationError};
use vista_core::{
    AccelerationTier, Capability, ConfigValue, ModuleHandle, SnapshotManager, SnapshotRef,
    TopologyConfig, TopologyError, MAX_REBUILD_ATTEMPTS,
};

fn setup(
    adapters: Vec<common::ScriptedAdapter>,
) -> (SnapshotManager, Arc<ScriptedEnumerator>, FakeLoader) {
    common::init_logging();
    let enumerator = ScriptedEnumerator::new(adapters);
    let loader = FakeLoader::default();
    let manager = SnapshotManager::new(
        enumerator.clone(),
        ModuleHandle::new(loader.clone()),
        TopologyConfig::default(),
    );
    (manager, enumerator, loader)
}

fn two_adapters() -> Vec<common::ScriptedAdapter> {
    vec![
        adapter(0, AccelerationTier::Partial, 2048),
        adapter(1, AccelerationTier::Full, 4096),
    ]
}

#[test]
fn test_fast_path_returns_the_same_snapshot() {
    let (manager, enumerator, _loader) = setup(two_adapters());

    let first = manager.get_latest().unwrap();
    for _ in 0..10 {
        let current = manager.get_current().expect("manager should hold a snapshot");
        let latest = manager.get_latest().unwrap();
        assert!(SnapshotRef::ptr_eq(&first, &current));
        assert!(SnapshotRef::ptr_eq(&first, &latest));
    }

    assert_eq!(enumerator.enumeration_count(), 1, "no rebuild without invalidation");
    assert_eq!(manager.stats().fast_path_hits, 10);
}

#[test]
fn test_external_invalidate_triggers_enumeration() {
    let (manager, enumerator, _loader) = setup(two_adapters());
    let held = manager.get_latest().unwrap();

    manager.schedule_external_invalidate();
    assert!(!manager.is_up_to_date(&held));
    let _latest = manager.get_latest().unwrap();

    assert_eq!(enumerator.enumeration_count(), 2);
}

#[test]
fn test_equivalent_rebuild_keeps_identity_and_adopts_tokens() {
    let (manager, enumerator, _loader) = setup(two_adapters());
    let first = manager.get_latest().unwrap();
    let old_tokens = first.tokens();

    manager.schedule_external_invalidate();
    enumerator.bump_uniqueness();
    let second = manager.get_latest().unwrap();

    assert!(
        SnapshotRef::ptr_eq(&first, &second),
        "an equivalent candidate must not replace the current snapshot"
    );
    assert_ne!(first.tokens(), old_tokens);
    assert_eq!(first.tokens(), manager.live_tokens());
    assert!(manager.is_up_to_date(&first));

    let stats = manager.stats();
    assert_eq!(stats.installs, 1);
    assert_eq!(stats.adoptions, 1);
}

#[test]
fn test_retries_are_bounded() {
    let (manager, enumerator, loader) = setup(two_adapters());
    enumerator.always_race(true);

    let result = manager.get_latest();

    assert_eq!(result.unwrap_err(), TopologyError::TopologyInvalid);
    assert_eq!(enumerator.enumeration_count(), MAX_REBUILD_ATTEMPTS);
    assert_eq!(MAX_REBUILD_ATTEMPTS, 5);
    assert_eq!(manager.stats().discarded, 5);
    assert_eq!(loader.load_calls(), 1, "module is loaded once for the whole rebuild");
    assert!(!manager.module().is_loaded());
}

#[test]
fn test_transient_races_are_absorbed() {
    let (manager, enumerator, _loader) = setup(two_adapters());
    enumerator.race_next(3);

    let snapshot = manager.get_latest().unwrap();

    assert_eq!(snapshot.len(), 2);
    assert_eq!(enumerator.enumeration_count(), 4);
}

#[test]
fn test_tokens_advancing_during_build_discard_the_candidate() {
    let (manager, enumerator, _loader) = setup(two_adapters());
    enumerator.advance_tokens_during_next(2);

    let snapshot = manager.get_latest().unwrap();

    assert_eq!(enumerator.enumeration_count(), 3);
    assert_eq!(snapshot.tokens().loader_uniqueness, 3);
    assert!(manager.is_up_to_date(&snapshot));
}

#[test]
fn test_device_lost_is_retried_as_topology_change() {
    let (manager, enumerator, _loader) = setup(two_adapters());
    enumerator.lose_device_next(1);

    let snapshot = manager.get_latest().unwrap();

    assert_eq!(enumerator.enumeration_count(), 2);
    assert_eq!(snapshot.len(), 2);
}

#[test]
fn test_hard_enumeration_failure_is_not_retried() {
    let (manager, enumerator, _loader) = setup(two_adapters());
    enumerator.fail_with(Some(EnumerationError::Failed("access denied".into())));

    let err = manager.get_latest().unwrap_err();

    assert_eq!(err, TopologyError::EnumerationFailed("access denied".into()));
    assert!(!err.is_retryable());
    assert_eq!(enumerator.enumeration_count(), 1);
}

#[test]
fn test_out_of_memory_propagates() {
    let (manager, _enumerator, _loader) = setup(vec![(
        common::monitor(0, 0, true),
        Err(CapabilityQueryError::OutOfMemory),
    )]);

    assert_eq!(manager.get_latest().unwrap_err(), TopologyError::OutOfMemory);
}

#[test]
fn test_snapshot_is_destroyed_once_with_one_module_release() {
    // --- 1. ARRANGE ---
    let (manager, _enumerator, loader) = setup(two_adapters());
    let module = Arc::clone(manager.module());
    let snapshot = manager.get_latest().unwrap();
    let clones: Vec<SnapshotRef> = (0..4).map(|_| snapshot.clone()).collect();
    assert_eq!(module.use_count(), 1, "a snapshot holds exactly one module use");

    // --- 2. ACT ---
    drop(snapshot);
    for (i, clone) in clones.into_iter().enumerate() {
        assert!(module.is_loaded(), "module unloaded while clone {i} was alive");
        drop(clone);
    }

    // --- 3. ASSERT ---
    assert_eq!(module.use_count(), 0);
    assert!(!module.is_loaded());
    assert!(manager.get_current().is_none());
    assert_eq!(loader.load_calls(), 1);
    assert_eq!(manager.stats().releases, 1);
}

#[test]
fn test_released_snapshot_is_rebuilt_on_demand() {
    let (manager, enumerator, loader) = setup(two_adapters());

    drop(manager.get_latest().unwrap());
    assert!(manager.get_current().is_none());

    let snapshot = manager.get_latest().unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(enumerator.enumeration_count(), 2);
    assert_eq!(loader.load_calls(), 2, "module reloads after an idle teardown");
}

#[test]
fn test_pinned_module_survives_snapshot_release() {
    let (manager, _enumerator, loader) = setup(two_adapters());

    manager.pin_module();
    drop(manager.get_latest().unwrap());
    assert!(manager.get_current().is_some(), "a pin keeps the manager's snapshot");

    manager.schedule_external_invalidate();
    drop(manager.get_latest().unwrap());
    assert_eq!(loader.load_calls(), 1);

    assert_eq!(manager.unpin_module(), 0);
    assert!(manager.get_current().is_none());
    assert!(!manager.module().is_loaded());
}

#[test]
fn test_common_minimum_capability() {
    let (manager, _enumerator, _loader) = setup(vec![
        adapter(0, AccelerationTier::Full, 4096),
        adapter(1, AccelerationTier::Partial, 2048),
    ]);
    let snapshot = manager.get_latest().unwrap();
    let min = snapshot.common_minimum_capability();
    assert_eq!(min.tier, AccelerationTier::Partial);
    assert_eq!(min.max_texture_width, 2048);
    assert_eq!(min.max_texture_height, 2048);

    let (single, _enumerator, _loader) = setup(vec![adapter(0, AccelerationTier::Full, 4096)]);
    let snapshot = single.get_latest().unwrap();
    assert_eq!(
        snapshot.common_minimum_capability(),
        *snapshot.adapter(0).unwrap().capability()
    );
    assert_eq!(snapshot.common_minimum_capability().tier, AccelerationTier::Full);

    let mut mirrored = adapter(1, AccelerationTier::Full, 4096);
    mirrored.0.is_mirror = true;
    let (non_local, _enumerator, _loader) =
        setup(vec![adapter(0, AccelerationTier::Full, 4096), mirrored]);
    let snapshot = non_local.get_latest().unwrap();
    assert!(snapshot.has_non_local_adapter());
    assert_eq!(
        snapshot.common_minimum_capability(),
        Capability::NO_ACCELERATION
    );
}

#[test]
fn test_unplugging_a_monitor_builds_a_new_snapshot() {
    let (manager, enumerator, _loader) = setup(vec![
        adapter(0, AccelerationTier::Partial, 2048),
        adapter(1, AccelerationTier::Full, 4096),
    ]);

    let s1 = manager.get_latest().unwrap();
    assert_eq!(s1.len(), 2);
    assert_eq!(s1.adapter(0).unwrap().tier(), AccelerationTier::Partial);
    assert_eq!(s1.adapter(1).unwrap().tier(), AccelerationTier::Full);

    enumerator.set_adapters(vec![adapter(0, AccelerationTier::Partial, 2048)]);
    manager.schedule_external_invalidate();
    let s2 = manager.get_latest().unwrap();

    assert!(!SnapshotRef::ptr_eq(&s1, &s2));
    assert_eq!(s2.len(), 1);
    // The old snapshot still describes the old topology.
    assert_eq!(s1.len(), 2);
    assert_eq!(s1.adapter(1).unwrap().tier(), AccelerationTier::Full);
    assert!(!manager.is_up_to_date(&s1));

    drop(s1);
    let current = manager.get_current().unwrap();
    assert!(SnapshotRef::ptr_eq(&current, &s2));
}

#[test]
fn test_module_load_failure_is_sticky() {
    let enumerator = ScriptedEnumerator::new(two_adapters());
    let loader = FakeLoader::failing();
    let manager = SnapshotManager::new(
        enumerator.clone(),
        ModuleHandle::new(loader.clone()),
        TopologyConfig::default(),
    );

    let first = manager.get_latest().unwrap_err();
    let second = manager.get_latest().unwrap_err();

    assert!(matches!(first, TopologyError::ModuleLoadFailed(_)));
    assert_eq!(first, second);
    assert_eq!(loader.load_calls(), 1);
    assert_eq!(enumerator.enumeration_count(), 0);
}

#[test]
fn test_software_fallback_is_registered_once_and_revalidated() {
    let (manager, enumerator, loader) = setup(two_adapters());

    let s1 = manager.get_latest().unwrap();
    manager.ensure_software_fallback_registered(&s1).unwrap();
    manager.ensure_software_fallback_registered(&s1).unwrap();
    assert_eq!(loader.fallback_registrations(), 1);

    enumerator.set_adapters(vec![adapter(0, AccelerationTier::Partial, 2048)]);
    manager.schedule_external_invalidate();
    assert_eq!(
        manager.ensure_software_fallback_registered(&s1),
        Err(TopologyError::TopologyInvalid),
        "a superseded snapshot must be rejected"
    );

    let s2 = manager.get_latest().unwrap();
    assert!(!SnapshotRef::ptr_eq(&s1, &s2));
    manager.ensure_software_fallback_registered(&s2).unwrap();
    assert_eq!(
        loader.fallback_registrations(),
        1,
        "same module instance, no second registration"
    );
}

#[test]
fn test_force_software_configuration() {
    let enumerator = ScriptedEnumerator::new(two_adapters());
    let source = MapConfigSource::new().with(KEY_FORCE_SOFTWARE, ConfigValue::Bool(true));
    let manager = SnapshotManager::with_config_source(
        enumerator,
        ModuleHandle::new(FakeLoader::default()),
        &source,
    );
    assert!(manager.config().force_software);

    let snapshot = manager.get_latest().unwrap();
    assert!(snapshot
        .adapters()
        .iter()
        .all(|entry| *entry.capability() == Capability::NO_ACCELERATION));

    let (best, _) = manager.query_acceleration_caps(false).unwrap();
    assert_eq!(best, Capability::NO_ACCELERATION);
}

#[test]
fn test_concurrent_readers_see_complete_snapshots() {
    let (manager, _enumerator, _loader) = setup(two_adapters());
    manager.pin_module();

    thread::scope(|scope| {
        for _ in 0..2 {
            let manager = manager.clone();
            scope.spawn(move || {
                for _ in 0..200 {
                    match manager.get_latest() {
                        Ok(snapshot) => {
                            assert_eq!(snapshot.len(), 2);
                            assert_eq!(snapshot.adapter(0).unwrap().index(), 0);
                            assert_eq!(
                                snapshot.adapter(1).unwrap().tier(),
                                AccelerationTier::Full
                            );
                            assert!(!snapshot.all_desktop_bounds().is_empty());
                        }
                        Err(err) => assert!(err.is_retryable(), "unexpected error {err}"),
                    }
                }
            });
        }

        let invalidator = manager.clone();
        scope.spawn(move || {
            for _ in 0..200 {
                invalidator.schedule_external_invalidate();
                thread::yield_now();
            }
        });
    });

    let stats = manager.stats();
    assert_eq!(stats.installs, 1, "equivalent rebuilds never replace the snapshot");
    assert_eq!(manager.unpin_module(), 0);
}
