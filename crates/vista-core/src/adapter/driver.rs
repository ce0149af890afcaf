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

//! Driver identity and the recency/denylist policy applied to it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::AdapterIdentity;

/// A driver release date.
///
/// Field order makes the derived ordering chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DriverDate {
    /// Year, e.g. 2024.
    pub year: u16,
    /// Month, 1 to 12.
    pub month: u8,
    /// Day of month, 1 to 31.
    pub day: u8,
}

impl DriverDate {
    /// Creates a date.
    pub const fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Parses `YYYY-MM-DD`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().splitn(3, '-');
        let year = parts.next()?.parse().ok()?;
        let month: u8 = parts.next()?.parse().ok()?;
        let day: u8 = parts.next()?.parse().ok()?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        Some(Self { year, month, day })
    }
}

impl fmt::Display for DriverDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// A four-part driver version, `product.version.subversion.build`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct DriverVersion(pub [u16; 4]);

impl DriverVersion {
    /// Parses up to four dot-separated numeric components. Non-numeric
    /// suffixes on a component (`"551.23-beta"`) are ignored; missing
    /// components are zero.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = [0u16; 4];
        let mut parsed_any = false;
        for (slot, component) in parts.iter_mut().zip(text.trim().split('.')) {
            let digits: String = component
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if digits.is_empty() {
                break;
            }
            *slot = digits.parse().ok()?;
            parsed_any = true;
        }
        parsed_any.then_some(Self(parts))
    }
}

impl fmt::Display for DriverVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

/// A `(vendor, device)` pair identifying a hardware model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceKey {
    /// PCI vendor id.
    pub vendor_id: u32,
    /// PCI device id.
    pub device_id: u32,
}

impl DeviceKey {
    /// Parses `vendor:device` in hexadecimal, with or without a `0x` prefix.
    pub fn parse(text: &str) -> Option<Self> {
        let (vendor, device) = text.trim().split_once(':')?;
        Some(Self {
            vendor_id: parse_hex(vendor)?,
            device_id: parse_hex(device)?,
        })
    }

    /// Parses a comma-separated list of keys, skipping malformed entries.
    pub fn parse_list(text: &str) -> Vec<Self> {
        text.split(',')
            .filter(|item| !item.trim().is_empty())
            .filter_map(|item| {
                let key = Self::parse(item);
                if key.is_none() {
                    log::warn!("Ignoring malformed driver denylist entry '{}'", item.trim());
                }
                key
            })
            .collect()
    }
}

fn parse_hex(text: &str) -> Option<u32> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(digits, 16).ok()
}

/// Decides whether an adapter's driver may be used for acceleration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverPolicy {
    /// When `false`, every driver counts as recent enough.
    pub check_enabled: bool,
    /// Drivers released before this date are too old.
    pub minimum_date: DriverDate,
    /// Hardware models whose drivers must never be used for acceleration.
    pub denylist: Vec<DeviceKey>,
}

impl DriverPolicy {
    /// The built-in minimum driver date.
    pub const DEFAULT_MINIMUM_DATE: DriverDate = DriverDate::new(2004, 11, 1);

    /// Returns `true` if the driver is new enough. Drivers that do not report
    /// a date are given the benefit of the doubt.
    pub fn is_recent_enough(&self, identity: &AdapterIdentity) -> bool {
        if !self.check_enabled {
            return true;
        }
        identity
            .driver_date
            .map_or(true, |date| date >= self.minimum_date)
    }

    /// Returns `true` if the adapter's hardware model is denylisted.
    pub fn is_denylisted(&self, identity: &AdapterIdentity) -> bool {
        let key = identity.device_key();
        self.denylist.iter().any(|denied| *denied == key)
    }
}

impl Default for DriverPolicy {
    fn default() -> Self {
        Self {
            check_enabled: true,
            minimum_date: Self::DEFAULT_MINIMUM_DATE,
            denylist: Vec::new(),
        }
    }
}
