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

use std::cmp::Ordering;

use super::{Owner, USERS_ROOT, VIRTUAL_USERS_ROOT};
use crate::name::Name;

/// The order in which names are presented to a particular user.
///
/// Names fall into buckets which are ordered as follows:
///
/// 1. The empty name.
/// 2. The user's own mailboxes.
/// 3. Other users' mailboxes.
/// 4. Everything else, i.e., shared mailboxes.
///
/// Within a bucket, names are in their natural order.
#[derive(Clone, Debug)]
pub struct ContextualOrdering {
    home: Name,
}

impl ContextualOrdering {
    pub fn new(user: &Owner) -> Self {
        ContextualOrdering {
            home: user.inbox().clone(),
        }
    }

    pub fn compare(&self, a: &Name, b: &Name) -> Ordering {
        self.bucket(a)
            .cmp(&self.bucket(b))
            .then_with(|| a.cmp(b))
    }

    /// Sort `names` into this order.
    pub fn sort(&self, names: &mut [Name]) {
        names.sort_by(|a, b| self.compare(a, b));
    }

    fn bucket(&self, name: &Name) -> u8 {
        if name.is_empty() {
            0
        } else if name.starts_with(&self.home) {
            1
        } else if matches!(name.first(), Some(USERS_ROOT) | Some(VIRTUAL_USERS_ROOT))
        {
            2
        } else {
            3
        }
    }
}
