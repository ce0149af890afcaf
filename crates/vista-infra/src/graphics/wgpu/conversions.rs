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

use vista_core::adapter::DriverVersion;
use vista_core::{AdapterIdentity, RawCapability, ShaderVersion};
use wgpu::{Backend, DeviceType};

/// A local extension trait to convert WGPU types into topology types.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_vista()` syntax.
pub trait IntoVista<T> {
    /// Consumes self and converts it into the topology type.
    fn into_vista(self) -> T;
}

// --- Shader models ---

/// Maps a shader model to `(pixel, vertex)` shader versions.
impl IntoVista<(ShaderVersion, ShaderVersion)> for wgpu::ShaderModel {
    fn into_vista(self) -> (ShaderVersion, ShaderVersion) {
        let version = match self {
            wgpu::ShaderModel::Sm2 => ShaderVersion::new(2, 0),
            wgpu::ShaderModel::Sm4 => ShaderVersion::new(4, 0),
            wgpu::ShaderModel::Sm5 => ShaderVersion::new(5, 0),
            #[allow(unreachable_patterns)]
            _ => ShaderVersion::new(5, 0),
        };
        (version, version)
    }
}

// --- Adapter identity ---

impl IntoVista<AdapterIdentity> for &wgpu::AdapterInfo {
    fn into_vista(self) -> AdapterIdentity {
        AdapterIdentity {
            vendor_id: self.vendor,
            device_id: self.device,
            driver_version: driver_version(&self.driver_info),
            // Not exposed by any backend.
            driver_date: None,
            description: self.name.clone(),
            ..AdapterIdentity::default()
        }
    }
}

/// Extracts a version from a backend's free-form driver string, e.g.
/// `"Mesa 24.0.5"` or `"31.0.15.5222"`. Returns zero when none is found.
pub fn driver_version(driver_info: &str) -> DriverVersion {
    driver_info
        .split_whitespace()
        .find_map(|word| {
            word.chars()
                .next()
                .filter(char::is_ascii_digit)
                .and_then(|_| DriverVersion::parse(word))
        })
        .unwrap_or_default()
}

/// Whether the adapter is a CPU rasterizer.
pub fn is_software(device_type: DeviceType) -> bool {
    matches!(device_type, DeviceType::Cpu)
}

/// Assembles the raw capability report for an adapter.
pub fn raw_capability(
    info: &wgpu::AdapterInfo,
    limits: &wgpu::Limits,
    downlevel: &wgpu::DownlevelCapabilities,
) -> RawCapability {
    let (pixel_shader, vertex_shader) = downlevel.shader_model.into_vista();
    let software = is_software(info.device_type);
    RawCapability {
        pixel_shader,
        vertex_shader,
        max_texture_width: limits.max_texture_dimension_2d,
        max_texture_height: limits.max_texture_dimension_2d,
        // wgpu does not report dedicated video memory.
        video_memory_bytes: None,
        hardware_vertex_processing: !software,
        is_software: software,
    }
}

/// Returns a human-readable name for a backend.
pub fn backend_name(backend: Backend) -> &'static str {
    match backend {
        Backend::Vulkan => "Vulkan",
        Backend::Metal => "Metal",
        Backend::Dx12 => "DirectX 12",
        Backend::Gl => "OpenGL",
        Backend::BrowserWebGpu => "WebGPU",
        Backend::Noop => "No-op",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shader_models_map_to_versions() {
        let (ps, vs) = wgpu::ShaderModel::Sm2.into_vista();
        assert_eq!(ps, ShaderVersion::V2_0);
        assert_eq!(vs, ShaderVersion::V2_0);
        assert_eq!(
            wgpu::ShaderModel::Sm5.into_vista().0,
            ShaderVersion::new(5, 0)
        );
    }

    #[test]
    fn driver_version_from_backend_strings() {
        assert_eq!(
            driver_version("Mesa 24.0.5"),
            DriverVersion([24, 0, 5, 0])
        );
        assert_eq!(
            driver_version("31.0.15.5222"),
            DriverVersion([31, 0, 15, 5222])
        );
        assert_eq!(driver_version(""), DriverVersion::default());
        assert_eq!(driver_version("unknown"), DriverVersion::default());
    }

    #[test]
    fn cpu_adapters_are_software() {
        assert!(is_software(DeviceType::Cpu));
        assert!(!is_software(DeviceType::DiscreteGpu));
        assert_eq!(backend_name(Backend::Vulkan), "Vulkan");
    }
}
