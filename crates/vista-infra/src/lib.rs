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

//! # Vista Infra
//!
//! Concrete collaborators for `vista-core`: a wgpu-backed graphics module and
//! adapter enumerator, a monitor catalog fed by winit, and configuration
//! sources reading the environment and RON files.

#![warn(missing_docs)]

pub mod config;
pub mod graphics;
pub mod platform;

pub use config::{EnvConfigSource, RonConfigSource};
pub use graphics::wgpu::{WgpuAdapterEnumerator, WgpuModule, WgpuModuleLoader};
pub use platform::{MonitorCatalog, MonitorDescriptor};
