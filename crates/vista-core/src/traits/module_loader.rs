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

use std::fmt::Debug;

use crate::error::LoadError;

/// A loaded graphics driver module with its entry points resolved.
pub trait GraphicsModule: Send + Sync + Debug {
    /// A short name for logs, e.g. the library or API name.
    fn name(&self) -> &str;

    /// Registers a software rasterizer with the module's hardware factory.
    ///
    /// Called at most once per loaded module instance by
    /// [`ModuleHandle`](crate::ModuleHandle).
    fn register_software_fallback(&self) -> Result<(), String>;
}

/// A trait for loading the graphics driver module.
pub trait GraphicsModuleLoader: Send + Sync {
    /// Loads the module and resolves its required entry points.
    ///
    /// Loading is expensive; [`ModuleHandle`](crate::ModuleHandle) caches
    /// failures and never calls this again after one.
    fn load_graphics_module(&self) -> Result<Box<dyn GraphicsModule>, LoadError>;
}
