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

//! Small collection helpers.

use std::slice;

/// A growable sequence that stores a single element inline.
///
/// Most topology data comes in ones: one scale context per monitor, one gamma
/// table per snapshot. `CompactList` avoids a heap allocation for those cases
/// and only spills into a `Vec` once a second element is pushed.
///
/// A `Many` list always holds at least two elements, so two lists with the
/// same contents always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CompactList<T> {
    /// No elements.
    Empty,
    /// Exactly one element, stored inline.
    One(T),
    /// Two or more elements.
    Many(Vec<T>),
}

impl<T> CompactList<T> {
    /// Creates an empty list.
    pub const fn new() -> Self {
        Self::Empty
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::One(_) => 1,
            Self::Many(values) => values.len(),
        }
    }

    /// Returns `true` if the list holds no elements.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Appends an element, spilling to the heap on the second push.
    pub fn push(&mut self, value: T) {
        *self = match std::mem::take(self) {
            Self::Empty => Self::One(value),
            Self::One(first) => Self::Many(vec![first, value]),
            Self::Many(mut values) => {
                values.push(value);
                Self::Many(values)
            }
        };
    }

    /// Views the elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        match self {
            Self::Empty => &[],
            Self::One(value) => slice::from_ref(value),
            Self::Many(values) => values,
        }
    }

    /// Views the elements as a mutable slice.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            Self::Empty => &mut [],
            Self::One(value) => slice::from_mut(value),
            Self::Many(values) => values,
        }
    }

    /// Returns the element at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    /// Returns an iterator over the elements.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Returns the first element matching `predicate`.
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<&T> {
        self.iter().find(|value| predicate(value))
    }
}

impl<T> Default for CompactList<T> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<T> FromIterator<T> for CompactList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for value in iter {
            list.push(value);
        }
        list
    }
}

impl<'a, T> IntoIterator for &'a CompactList<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
