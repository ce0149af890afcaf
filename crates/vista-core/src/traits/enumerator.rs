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

use crate::adapter::{RawAdapterInfo, RawCapability};
use crate::error::{CapabilityQueryError, EnumerationError};

/// A trait for a system that lists the active monitors and the adapters
/// driving them.
///
/// Enumeration may be slow and may itself provoke topology changes observed by
/// other threads, so the manager never calls it while holding its lock. A
/// concrete implementation lives in `vista-infra`.
pub trait AdapterEnumerator: Send + Sync {
    /// Returns the platform's display uniqueness value.
    ///
    /// The value must change whenever monitors, modes or adapters change. It is
    /// read before and after each enumeration, and stored in every snapshot as
    /// its loader-side staleness token.
    fn display_uniqueness(&self) -> u64;

    /// Lists every active adapter output, in the platform's adapter order.
    ///
    /// # Errors
    ///
    /// [`EnumerationError::TopologyChanged`] when the topology changed while it
    /// was being read; the caller retries. Any other error is surfaced as-is.
    fn enumerate_adapters(&self) -> Result<Vec<RawAdapterInfo>, EnumerationError>;

    /// Queries driver capabilities for the adapter with the given
    /// [`RawAdapterInfo::adapter_index`].
    fn query_capabilities(&self, adapter_index: usize)
        -> Result<RawCapability, CapabilityQueryError>;
}
