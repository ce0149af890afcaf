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

//! Desktop geometry in virtual-screen coordinates.
//!
//! Desktop bounds depend on the DPI scale context the observer runs under, and
//! a single process may observe several contexts at once. Bounds are therefore
//! always stored per [`ScaleContext`].

use serde::{Deserialize, Serialize};

use crate::collections::CompactList;

/// An axis-aligned rectangle in virtual desktop coordinates.
///
/// `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub left: i32,
    /// Top edge.
    pub top: i32,
    /// Right edge (exclusive).
    pub right: i32,
    /// Bottom edge (exclusive).
    pub bottom: i32,
}

impl Rect {
    /// Creates a rectangle from its edges.
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Creates a rectangle from an origin and a size.
    pub fn from_origin_size(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            left: x,
            top: y,
            right: x.saturating_add(width.min(i32::MAX as u32) as i32),
            bottom: y.saturating_add(height.min(i32::MAX as u32) as i32),
        }
    }

    /// Width in pixels; zero for inverted rectangles.
    pub fn width(&self) -> u32 {
        (i64::from(self.right) - i64::from(self.left)).max(0) as u32
    }

    /// Height in pixels; zero for inverted rectangles.
    pub fn height(&self) -> u32 {
        (i64::from(self.bottom) - i64::from(self.top)).max(0) as u32
    }

    /// Returns `true` if the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Returns the smallest rectangle containing both `self` and `other`.
    /// Empty rectangles do not contribute.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Returns `true` if the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }
}

/// The DPI awareness context under which desktop coordinates are observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleContext {
    /// Coordinates are virtualized to 96 DPI.
    Unaware,
    /// Coordinates are scaled by the system DPI captured at process start.
    SystemAware,
    /// Coordinates are physical pixels on every monitor.
    PerMonitorAware,
}

/// A rectangle tagged with the scale context it was observed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScaledRect {
    /// The context the bounds were observed under.
    pub context: ScaleContext,
    /// The bounds themselves.
    pub bounds: Rect,
}

/// Desktop bounds keyed by scale context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DesktopBounds {
    entries: CompactList<ScaledRect>,
}

impl DesktopBounds {
    /// Creates an empty set of bounds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bounds observed under `context`, if known.
    pub fn get(&self, context: ScaleContext) -> Option<Rect> {
        self.entries
            .find(|entry| entry.context == context)
            .map(|entry| entry.bounds)
    }

    /// Records the bounds for `context`, replacing any previous value.
    pub fn insert(&mut self, context: ScaleContext, bounds: Rect) {
        if let Some(existing) = self
            .entries
            .as_mut_slice()
            .iter_mut()
            .find(|entry| entry.context == context)
        {
            existing.bounds = bounds;
            return;
        }
        self.entries.push(ScaledRect { context, bounds });
    }

    /// Grows the bounds for every context in `other` to include it.
    pub fn union_with(&mut self, other: &DesktopBounds) {
        for entry in other.iter() {
            let merged = match self.get(entry.context) {
                Some(current) => current.union(&entry.bounds),
                None => entry.bounds,
            };
            self.insert(entry.context, merged);
        }
    }

    /// Iterates over every recorded context and its bounds.
    pub fn iter(&self) -> impl Iterator<Item = &ScaledRect> {
        self.entries.iter()
    }

    /// Returns `true` if no bounds were recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ScaledRect> for DesktopBounds {
    fn from_iter<I: IntoIterator<Item = ScaledRect>>(iter: I) -> Self {
        let mut bounds = DesktopBounds::new();
        for entry in iter {
            bounds.insert(entry.context, entry.bounds);
        }
        bounds
    }
}
