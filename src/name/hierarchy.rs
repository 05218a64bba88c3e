//-
// Copyright (c) 2020, Jason Lingle
//
// This file is part of Mailspace.
//
// Mailspace is free software: you can  redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailspace is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Mailspace. If not, see <http://www.gnu.org/licenses/>.

use std::iter::FusedIterator;

use super::Name;

/// Iterator over the ancestors of a name, from the single-segment root down
/// to the name itself.
///
/// Every item shares the segment buffer of the original name.
#[derive(Clone, Debug)]
pub struct HierarchyLevels {
    name: Name,
    next_len: usize,
}

impl HierarchyLevels {
    pub(super) fn new(name: Name) -> Self {
        HierarchyLevels { name, next_len: 1 }
    }
}

impl Iterator for HierarchyLevels {
    type Item = Name;

    fn next(&mut self) -> Option<Name> {
        if self.next_len > self.name.segment_count() {
            return None;
        }

        let level = self.name.prefix(self.next_len).ok();
        self.next_len += 1;
        level
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining =
            (self.name.segment_count() + 1).saturating_sub(self.next_len);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for HierarchyLevels {}
impl FusedIterator for HierarchyLevels {}
