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

//! Counters describing how the manager has been serving snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters, bumped with relaxed atomics.
#[derive(Debug, Default)]
pub(crate) struct ManagerStats {
    pub(crate) fast_path_hits: AtomicU64,
    pub(crate) enumerations: AtomicU64,
    pub(crate) installs: AtomicU64,
    pub(crate) adoptions: AtomicU64,
    pub(crate) discarded: AtomicU64,
    pub(crate) releases: AtomicU64,
}

impl ManagerStats {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ManagerStatsSnapshot {
        ManagerStatsSnapshot {
            fast_path_hits: self.fast_path_hits.load(Ordering::Relaxed),
            enumerations: self.enumerations.load(Ordering::Relaxed),
            installs: self.installs.load(Ordering::Relaxed),
            adoptions: self.adoptions.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of the manager's counters.
///
/// Counters are read one at a time, so a copy taken while other threads are
/// rebuilding may be slightly inconsistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManagerStatsSnapshot {
    /// `get_latest` calls answered by an up-to-date current snapshot.
    pub fast_path_hits: u64,
    /// Adapter enumerations started.
    pub enumerations: u64,
    /// Candidates installed as the new current snapshot.
    pub installs: u64,
    /// Candidates whose tokens were adopted by an equivalent current snapshot.
    pub adoptions: u64,
    /// Candidates thrown away without being committed.
    pub discarded: u64,
    /// Times the manager released its own reference because nothing else held it.
    pub releases: u64,
}

impl ManagerStatsSnapshot {
    /// Rebuilds that changed nothing visible, as a fraction of all commits.
    pub fn adoption_ratio(&self) -> f64 {
        let commits = self.installs + self.adoptions;
        if commits == 0 {
            0.0
        } else {
            self.adoptions as f64 / commits as f64
        }
    }
}
