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

//! The snapshot manager.
//!
//! Readers obtain the current snapshot without taking a lock. Rebuilds follow a
//! copy-validate-commit pattern: staleness tokens are read and adapters are
//! enumerated with no lock held, then the candidate is validated and committed
//! inside a short critical section. Snapshots retired by a commit are dropped
//! after that section ends.

mod stats;

pub use self::stats::ManagerStatsSnapshot;

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use arc_swap::ArcSwapOption;

use self::stats::ManagerStats;
use crate::adapter::Capability;
use crate::config::TopologyConfig;
use crate::error::{TopologyError, TopologyResult};
use crate::module::ModuleHandle;
use crate::snapshot::{build_snapshot, StalenessTokens, TopologySnapshot};
use crate::traits::{AdapterEnumerator, ConfigSource};

/// How many candidates [`SnapshotManager::get_latest`] builds before giving up.
pub const MAX_REBUILD_ATTEMPTS: usize = 5;

/// What a commit took out of service. Dropped once the commit lock is released.
enum Retired {
    Nothing,
    Candidate { _snapshot: TopologySnapshot },
    Previous { _snapshot: Arc<TopologySnapshot> },
}

struct ManagerShared {
    enumerator: Arc<dyn AdapterEnumerator>,
    module: Arc<ModuleHandle>,
    config: TopologyConfig,
    current: ArcSwapOption<TopologySnapshot>,
    /// Serializes validate-and-swap. Never held across enumeration.
    commit_lock: Mutex<()>,
    external_updates: AtomicU64,
    initialized: AtomicBool,
    stats: ManagerStats,
}

impl ManagerShared {
    fn lock_commit(&self) -> MutexGuard<'_, ()> {
        self.commit_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn live_tokens(&self) -> StalenessTokens {
        StalenessTokens::new(
            self.enumerator.display_uniqueness(),
            self.external_updates.load(Ordering::Acquire),
        )
    }

    fn is_up_to_date(&self, snapshot: &TopologySnapshot) -> bool {
        snapshot.tokens() == self.live_tokens()
    }

    /// Drops the manager's reference to the current snapshot when nobody else
    /// holds it and the module is not pinned.
    ///
    /// `departing` is a reference that is about to be dropped by the caller and
    /// must not be counted as a holder.
    fn check_in_use(&self, departing: Option<&Arc<TopologySnapshot>>) -> bool {
        let released = {
            let _guard = self.lock_commit();
            let Some(current) = self.current.load_full() else {
                return false;
            };

            // The manager's reference plus the one just loaded.
            let mut expected = 2;
            if departing.is_some_and(|departing| Arc::ptr_eq(departing, &current)) {
                expected += 1;
            }
            if Arc::strong_count(&current) > expected || self.module.pinned_count() != 0 {
                return false;
            }

            self.current.store(None);
            current
        };

        ManagerStats::bump(&self.stats.releases);
        log::debug!(
            "Released idle topology snapshot ({} adapter(s))",
            released.len()
        );
        drop(released);
        true
    }

    /// Validates `candidate` against the current snapshot and installs it if
    /// it brings anything new. Returns the snapshot callers should receive.
    fn commit(&self, candidate: TopologySnapshot) -> (Arc<TopologySnapshot>, Retired) {
        let _guard = self.lock_commit();

        match self.current.load_full() {
            Some(current) if self.is_up_to_date(&current) => {
                ManagerStats::bump(&self.stats.discarded);
                log::debug!("Current topology snapshot is already up to date, keeping it");
                (current, Retired::Candidate { _snapshot: candidate })
            }
            Some(current) if current.is_equivalent_to(&candidate) => {
                current.adopt_tokens_from(&candidate);
                ManagerStats::bump(&self.stats.adoptions);
                log::debug!(
                    "Rebuilt topology is equivalent to the current snapshot, adopting tokens {:?}",
                    candidate.tokens()
                );
                (current, Retired::Candidate { _snapshot: candidate })
            }
            _ => {
                let installed = Arc::new(candidate);
                let previous = self.current.swap(Some(Arc::clone(&installed)));
                ManagerStats::bump(&self.stats.installs);
                log::info!(
                    "Installed display topology snapshot: {} adapter(s), tokens {:?}",
                    installed.len(),
                    installed.tokens()
                );
                let retired = match previous {
                    Some(previous) => Retired::Previous {
                        _snapshot: previous,
                    },
                    None => Retired::Nothing,
                };
                (installed, retired)
            }
        }
    }
}

/// A shared reference to a [`TopologySnapshot`] handed out by the manager.
///
/// The snapshot's data never changes while the reference is held, even if the
/// manager installs a newer snapshot meanwhile. Dropping a reference lets the
/// manager release its own copy once it is the sole holder.
pub struct SnapshotRef {
    snapshot: Arc<TopologySnapshot>,
    manager: Weak<ManagerShared>,
}

impl SnapshotRef {
    /// Returns `true` when both references point at the same snapshot.
    pub fn ptr_eq(a: &SnapshotRef, b: &SnapshotRef) -> bool {
        Arc::ptr_eq(&a.snapshot, &b.snapshot)
    }

    /// Number of live references to the snapshot, the manager's included.
    pub fn strong_count(this: &SnapshotRef) -> usize {
        Arc::strong_count(&this.snapshot)
    }
}

impl Deref for SnapshotRef {
    type Target = TopologySnapshot;

    fn deref(&self) -> &TopologySnapshot {
        &self.snapshot
    }
}

impl Clone for SnapshotRef {
    fn clone(&self) -> Self {
        Self {
            snapshot: Arc::clone(&self.snapshot),
            manager: Weak::clone(&self.manager),
        }
    }
}

impl Drop for SnapshotRef {
    fn drop(&mut self) {
        if let Some(shared) = self.manager.upgrade() {
            shared.check_in_use(Some(&self.snapshot));
        }
    }
}

impl fmt::Debug for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.snapshot, f)
    }
}

/// Hands out consistent, reference-counted topology snapshots.
///
/// The manager is an explicitly constructed service. Clones share the same
/// state, so it can be passed to every component that needs it.
#[derive(Clone)]
pub struct SnapshotManager {
    shared: Arc<ManagerShared>,
}

impl SnapshotManager {
    /// Creates a manager. No enumeration happens until the first
    /// [`get_latest`](Self::get_latest).
    pub fn new(
        enumerator: Arc<dyn AdapterEnumerator>,
        module: Arc<ModuleHandle>,
        config: TopologyConfig,
    ) -> Self {
        Self {
            shared: Arc::new(ManagerShared {
                enumerator,
                module,
                config,
                current: ArcSwapOption::empty(),
                commit_lock: Mutex::new(()),
                external_updates: AtomicU64::new(0),
                initialized: AtomicBool::new(false),
                stats: ManagerStats::default(),
            }),
        }
    }

    /// Creates a manager whose configuration is read once from `source`.
    pub fn with_config_source(
        enumerator: Arc<dyn AdapterEnumerator>,
        module: Arc<ModuleHandle>,
        source: &dyn ConfigSource,
    ) -> Self {
        Self::new(enumerator, module, TopologyConfig::load(source))
    }

    fn wrap(&self, snapshot: Arc<TopologySnapshot>) -> SnapshotRef {
        SnapshotRef {
            snapshot,
            manager: Arc::downgrade(&self.shared),
        }
    }

    /// Returns the snapshot the manager currently holds, without checking
    /// whether it is stale.
    ///
    /// Must not be called before the first successful
    /// [`get_latest`](Self::get_latest). Returns `None` when the manager has
    /// no snapshot, including after an idle snapshot was released.
    pub fn get_current(&self) -> Option<SnapshotRef> {
        debug_assert!(
            self.shared.initialized.load(Ordering::Acquire),
            "get_current called before the first successful get_latest"
        );
        self.shared
            .current
            .load_full()
            .map(|snapshot| self.wrap(snapshot))
    }

    /// Returns an up-to-date snapshot, rebuilding it if needed.
    ///
    /// # Errors
    ///
    /// [`TopologyError::TopologyInvalid`] if every one of the
    /// [`MAX_REBUILD_ATTEMPTS`] attempts raced with a topology change. Other
    /// errors from the module loader or the enumerator are returned unchanged.
    pub fn get_latest(&self) -> TopologyResult<SnapshotRef> {
        let shared = &self.shared;

        if let Some(current) = shared.current.load_full() {
            if shared.is_up_to_date(&current) {
                ManagerStats::bump(&shared.stats.fast_path_hits);
                return Ok(self.wrap(current));
            }
        }

        // Keeps the module loaded across attempts so a discarded candidate
        // cannot unload it.
        let hold = shared.module.acquire_hold()?;

        for attempt in 1..=MAX_REBUILD_ATTEMPTS {
            let tokens = shared.live_tokens();
            ManagerStats::bump(&shared.stats.enumerations);

            let candidate = match build_snapshot(
                shared.enumerator.as_ref(),
                &shared.config,
                tokens,
                hold.clone(),
            ) {
                Ok(candidate) => candidate,
                Err(TopologyError::TopologyInvalid) => {
                    ManagerStats::bump(&shared.stats.discarded);
                    log::debug!("Topology changed during enumeration (attempt {attempt})");
                    continue;
                }
                Err(err) => return Err(err),
            };

            if shared.live_tokens() != tokens {
                ManagerStats::bump(&shared.stats.discarded);
                log::debug!("Staleness tokens advanced while building (attempt {attempt})");
                continue;
            }

            let (snapshot, retired) = shared.commit(candidate);
            drop(retired);
            shared.initialized.store(true, Ordering::Release);
            return Ok(self.wrap(snapshot));
        }

        log::warn!(
            "Display topology kept changing, giving up after {MAX_REBUILD_ATTEMPTS} attempts"
        );
        Err(TopologyError::TopologyInvalid)
    }

    /// Marks every existing snapshot stale. Callable from any thread; the
    /// rebuild happens on the next [`get_latest`](Self::get_latest).
    pub fn schedule_external_invalidate(&self) {
        self.shared.external_updates.fetch_add(1, Ordering::AcqRel);
    }

    /// Returns `true` if `snapshot`'s tokens match the live counters.
    pub fn is_up_to_date(&self, snapshot: &TopologySnapshot) -> bool {
        self.shared.is_up_to_date(snapshot)
    }

    /// The live staleness tokens.
    pub fn live_tokens(&self) -> StalenessTokens {
        self.shared.live_tokens()
    }

    /// Releases the manager's snapshot if nothing else holds it and the module
    /// is not pinned. Returns `true` if it was released.
    ///
    /// Runs automatically whenever a [`SnapshotRef`] is dropped and whenever
    /// the last module pin is released.
    pub fn check_in_use(&self) -> bool {
        self.shared.check_in_use(None)
    }

    /// Pins the graphics module. Returns the new pin count.
    pub fn pin_module(&self) -> usize {
        self.shared.module.increment_use_ref()
    }

    /// Releases a pin taken with [`pin_module`](Self::pin_module). Returns the
    /// remaining pin count.
    pub fn unpin_module(&self) -> usize {
        let remaining = self.shared.module.decrement_use_ref();
        if remaining == 0 {
            self.check_in_use();
        }
        remaining
    }

    /// Registers the software rasterizer for the module instance backing
    /// `snapshot`.
    ///
    /// # Errors
    ///
    /// [`TopologyError::TopologyInvalid`] if `snapshot` is no longer the most
    /// current one; the caller should fetch a new snapshot and retry.
    pub fn ensure_software_fallback_registered(&self, snapshot: &SnapshotRef) -> TopologyResult<()> {
        let latest = self.get_latest()?;
        if !SnapshotRef::ptr_eq(&latest, snapshot) {
            log::debug!("Software fallback requested for a superseded snapshot");
            return Err(TopologyError::TopologyInvalid);
        }
        latest.module().register_software_fallback_once()
    }

    /// Returns the capability used to pick a render-target creation strategy,
    /// along with the tokens of the snapshot it was read from.
    ///
    /// With `return_common_minimum` the result is what every attached display
    /// supports; otherwise it is the best any one of them supports.
    pub fn query_acceleration_caps(
        &self,
        return_common_minimum: bool,
    ) -> TopologyResult<(Capability, StalenessTokens)> {
        let latest = self.get_latest()?;
        let capability = if return_common_minimum {
            latest.common_minimum_capability()
        } else {
            latest.best_capability()
        };
        Ok((capability, latest.tokens()))
    }

    /// The graphics module shared by every snapshot.
    pub fn module(&self) -> &Arc<ModuleHandle> {
        &self.shared.module
    }

    /// The configuration resolved at construction.
    pub fn config(&self) -> &TopologyConfig {
        &self.shared.config
    }

    /// Counters describing how snapshots have been served.
    pub fn stats(&self) -> ManagerStatsSnapshot {
        self.shared.stats.snapshot()
    }
}

impl fmt::Debug for SnapshotManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotManager")
            .field("current", &self.shared.current.load_full().map(|s| s.tokens()))
            .field(
                "external_updates",
                &self.shared.external_updates.load(Ordering::Relaxed),
            )
            .field("module", &self.shared.module)
            .finish()
    }
}
