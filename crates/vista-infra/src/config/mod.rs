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

//! Configuration sources backed by the environment and by files.

mod env;
mod ron_file;

pub use self::env::{EnvConfigSource, DEFAULT_PREFIX};
pub use self::ron_file::RonConfigSource;

use std::path::Path;

use anyhow::Result;
use vista_core::config::ChainedConfigSource;

/// Environment variables first, then the optional RON file at `path`.
pub fn layered(path: Option<&Path>) -> Result<ChainedConfigSource> {
    let chain = ChainedConfigSource::new().then(EnvConfigSource::new());
    Ok(match path {
        Some(path) => chain.then(RonConfigSource::load_optional(path)?),
        None => chain,
    })
}
