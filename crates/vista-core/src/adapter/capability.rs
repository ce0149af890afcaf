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

//! Hardware capability data, raw and derived.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Video memory required for [`AccelerationTier::Full`].
pub const FULL_TIER_MIN_VIDEO_MEMORY: u64 = 120 * 1024 * 1024;

/// How much of the rendering pipeline an adapter can accelerate.
///
/// Tiers are ordered, so the common minimum across adapters is simply the
/// smallest tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum AccelerationTier {
    /// Software rendering only.
    #[default]
    None = 0,
    /// Some hardware acceleration; shader-heavy effects fall back to software.
    Partial = 1,
    /// Full hardware acceleration.
    Full = 2,
}

impl AccelerationTier {
    /// Returns the numeric level of the tier (0, 1 or 2).
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Returns the tier for a numeric level, saturating above 2.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::None,
            1 => Self::Partial,
            _ => Self::Full,
        }
    }
}

/// A shader model version.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct ShaderVersion {
    /// Major version.
    pub major: u8,
    /// Minor version.
    pub minor: u8,
}

impl ShaderVersion {
    /// No programmable shader support.
    pub const NONE: ShaderVersion = ShaderVersion::new(0, 0);
    /// Shader model 2.0, the minimum for any acceleration.
    pub const V2_0: ShaderVersion = ShaderVersion::new(2, 0);

    /// Creates a shader version.
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ShaderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Capabilities as reported by the graphics driver for one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RawCapability {
    /// Highest supported pixel shader model.
    pub pixel_shader: ShaderVersion,
    /// Highest supported vertex shader model.
    pub vertex_shader: ShaderVersion,
    /// Maximum texture width in texels.
    pub max_texture_width: u32,
    /// Maximum texture height in texels.
    pub max_texture_height: u32,
    /// Dedicated video memory, when the driver reports it.
    pub video_memory_bytes: Option<u64>,
    /// Whether vertex processing runs on the GPU.
    pub hardware_vertex_processing: bool,
    /// Whether the adapter is a software rasterizer.
    pub is_software: bool,
}

/// Capability data derived for an adapter, used to pick a render-target
/// creation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Capability {
    /// Acceleration tier.
    pub tier: AccelerationTier,
    /// Maximum texture width in texels.
    pub max_texture_width: u32,
    /// Maximum texture height in texels.
    pub max_texture_height: u32,
    /// Highest supported pixel shader model.
    pub pixel_shader: ShaderVersion,
    /// Highest supported vertex shader model.
    pub vertex_shader: ShaderVersion,
    /// Whether vertex processing runs on the GPU.
    pub hardware_vertex_processing: bool,
}

impl Capability {
    /// The "no acceleration" sentinel.
    pub const NO_ACCELERATION: Capability = Capability {
        tier: AccelerationTier::None,
        max_texture_width: 0,
        max_texture_height: 0,
        pixel_shader: ShaderVersion::NONE,
        vertex_shader: ShaderVersion::NONE,
        hardware_vertex_processing: false,
    };

    /// Returns the "no acceleration" sentinel.
    pub const fn no_acceleration() -> Self {
        Self::NO_ACCELERATION
    }

    /// Derives capability data from what the driver reported.
    ///
    /// * Software adapters and anything below pixel shader 2.0 get no acceleration.
    /// * Pixel and vertex shader 2.0 with enough video memory is [`AccelerationTier::Full`].
    /// * Everything else is [`AccelerationTier::Partial`].
    ///
    /// Unknown video memory is not held against the adapter.
    pub fn derive(raw: &RawCapability) -> Self {
        if raw.is_software || raw.pixel_shader < ShaderVersion::V2_0 {
            return Self::NO_ACCELERATION;
        }

        let enough_memory = raw
            .video_memory_bytes
            .map_or(true, |bytes| bytes >= FULL_TIER_MIN_VIDEO_MEMORY);
        let tier = if raw.vertex_shader >= ShaderVersion::V2_0 && enough_memory {
            AccelerationTier::Full
        } else {
            AccelerationTier::Partial
        };

        Self {
            tier,
            max_texture_width: raw.max_texture_width,
            max_texture_height: raw.max_texture_height,
            pixel_shader: raw.pixel_shader,
            vertex_shader: raw.vertex_shader,
            hardware_vertex_processing: raw.hardware_vertex_processing,
        }
    }

    /// Returns `true` unless this is a software-only capability.
    pub fn is_hardware_accelerated(&self) -> bool {
        self.tier != AccelerationTier::None
    }

    /// The largest square texture the adapter supports.
    pub fn max_texture_size(&self) -> u32 {
        self.max_texture_width.min(self.max_texture_height)
    }

    /// Clamps the texture limits to at most `limit` texels per side.
    pub fn with_texture_limit(mut self, limit: u32) -> Self {
        self.max_texture_width = self.max_texture_width.min(limit);
        self.max_texture_height = self.max_texture_height.min(limit);
        self
    }

    /// Field-wise minimum of two capabilities.
    pub fn min_with(&self, other: &Capability) -> Capability {
        Capability {
            tier: self.tier.min(other.tier),
            max_texture_width: self.max_texture_width.min(other.max_texture_width),
            max_texture_height: self.max_texture_height.min(other.max_texture_height),
            pixel_shader: self.pixel_shader.min(other.pixel_shader),
            vertex_shader: self.vertex_shader.min(other.vertex_shader),
            hardware_vertex_processing: self.hardware_vertex_processing
                && other.hardware_vertex_processing,
        }
    }

    /// Field-wise maximum of two capabilities.
    pub fn max_with(&self, other: &Capability) -> Capability {
        Capability {
            tier: self.tier.max(other.tier),
            max_texture_width: self.max_texture_width.max(other.max_texture_width),
            max_texture_height: self.max_texture_height.max(other.max_texture_height),
            pixel_shader: self.pixel_shader.max(other.pixel_shader),
            vertex_shader: self.vertex_shader.max(other.vertex_shader),
            hardware_vertex_processing: self.hardware_vertex_processing
                || other.hardware_vertex_processing,
        }
    }
}
