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

//! Mapping between client-visible names and canonical names.
//!
//! Canonical names are rooted under one of three backend roots:
//!
//! - `#users/<user>/...` for the mailboxes of plain users.
//!
//! - `#vusers/<domain>/<user>/...` for the mailboxes of virtual users, i.e.,
//!   users whose login is `user@domain`.
//!
//! - `#shared/<group>/...` for mailboxes owned by groups.
//!
//! A user's home root (`#users/<user>` or `#vusers/<domain>/<user>`) *is* that
//! user's INBOX; everything else they own lives beneath it.
//!
//! Clients never see the backend roots directly. They name their own
//! mailboxes relative to `INBOX` (or an explicit personal namespace token),
//! and reach other namespaces through configurable `#`-prefixed tokens. The
//! `Resolver` translates in both directions.

mod ordering;
pub mod owner;
mod resolver;

pub use self::ordering::ContextualOrdering;
pub use self::owner::Owner;
pub use self::resolver::{NamespaceKind, Resolver};

use crate::name::Name;

/// Backend root of plain users' mailboxes.
pub const USERS_ROOT: &str = "#users";
/// Backend root of virtual (domain-qualified) users' mailboxes.
pub const VIRTUAL_USERS_ROOT: &str = "#vusers";
/// Backend root of group-owned mailboxes.
pub const SHARED_ROOT: &str = "#shared";

/// The conventional name of each user's primary mailbox, matched
/// case-insensitively.
pub const INBOX: &str = "INBOX";

/// The first character of every namespace token.
pub const NAMESPACE_MARKER: char = '#';

/// Whether the name can be assumed to exist without consulting storage.
///
/// This holds for the empty name, the namespace roots, and the domain nodes
/// beneath the virtual users root, none of which have storage of their own.
pub fn exists_trivially(name: &Name) -> bool {
    match name.segment_count() {
        0 | 1 => true,
        2 => Some(VIRTUAL_USERS_ROOT) == name.first(),
        _ => false,
    }
}
