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

//! Staleness tokens.

use std::sync::Arc;

use arc_swap::ArcSwap;

/// The pair of counters a snapshot is stamped with when it is built.
///
/// A snapshot is up to date while both values still match the live counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StalenessTokens {
    /// The enumerator's display uniqueness value.
    pub loader_uniqueness: u64,
    /// The manager's external update counter.
    pub external_updates: u64,
}

impl StalenessTokens {
    /// Creates a token pair.
    pub const fn new(loader_uniqueness: u64, external_updates: u64) -> Self {
        Self {
            loader_uniqueness,
            external_updates,
        }
    }
}

/// Tokens stored on a snapshot. Equivalence adoption replaces the pair while
/// fast-path readers compare it, so both values are swapped as one.
#[derive(Debug)]
pub(crate) struct AtomicTokens {
    tokens: ArcSwap<StalenessTokens>,
}

impl AtomicTokens {
    pub(crate) fn new(tokens: StalenessTokens) -> Self {
        Self {
            tokens: ArcSwap::from_pointee(tokens),
        }
    }

    pub(crate) fn load(&self) -> StalenessTokens {
        **self.tokens.load()
    }

    pub(crate) fn store(&self, tokens: StalenessTokens) {
        self.tokens.store(Arc::new(tokens));
    }
}
