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

use std::sync::Arc;

use log::{debug, trace};

use super::{
    exists_trivially, ContextualOrdering, Owner, INBOX, NAMESPACE_MARKER,
    SHARED_ROOT, USERS_ROOT, VIRTUAL_USERS_ROOT,
};
use crate::name::{Name, Segments, UnresolvedName};
use crate::query::{contains_wildcard, Query};
use crate::support::config::NamespaceConfig;
use crate::support::error::Error;

/// The kinds of namespace a client-visible token can select.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamespaceKind {
    /// The current user's own mailboxes.
    Personal,
    /// Other users' mailboxes, addressed by login.
    OtherUsers,
    /// Group-owned mailboxes.
    Shared,
}

/// Translates between client-visible and canonical names.
///
/// A `Resolver` holds only the token table derived from configuration, so it
/// can be shared freely between connections.
#[derive(Clone, Debug)]
pub struct Resolver {
    table: Vec<(String, NamespaceKind)>,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::new(&NamespaceConfig::default())
    }
}

impl Resolver {
    pub fn new(config: &NamespaceConfig) -> Self {
        let tokens = &config.namespaces;
        let table = vec![
            (tokens.personal.clone(), NamespaceKind::Personal),
            (tokens.other_users.clone(), NamespaceKind::OtherUsers),
            (tokens.shared.clone(), NamespaceKind::Shared),
        ]
        .into_iter()
        .filter(|&(ref token, _)| !token.is_empty())
        .collect();

        Resolver { table }
    }

    /// Return the namespace selected by the client-visible `token`, if any.
    pub fn namespace_kind(&self, token: &str) -> Option<NamespaceKind> {
        self.table
            .iter()
            .find(|&&(ref t, _)| t == token)
            .map(|&(_, kind)| kind)
    }

    /// Return the client-visible token for `kind`, if that namespace is
    /// enabled.
    pub fn namespace_token(&self, kind: NamespaceKind) -> Option<&str> {
        self.table
            .iter()
            .find(|&&(_, k)| k == kind)
            .map(|&(ref t, _)| &**t)
    }

    /// Resolve a client-supplied name in the context of `user`.
    ///
    /// - `INBOX/...` and `<personal>/...` become the user's home root
    ///   followed by the rest of the name. `<personal>/INBOX/...` is treated
    ///   the same as `INBOX/...`.
    ///
    /// - `<other-users>/<login>/...` and `<shared>/<group>/...` are rewritten
    ///   onto the backend roots.
    ///
    /// - A name whose first segment is not `#`-prefixed is relative and is
    ///   returned unrooted for the caller to anchor.
    ///
    /// Any other `#`-prefixed first segment is an unknown namespace.
    pub fn resolve(
        &self,
        name: &UnresolvedName,
        user: &Owner,
    ) -> Result<Name, Error> {
        let first = match name.first() {
            None => return Ok(Name::empty()),
            Some(first) => first,
        };

        let resolved = if INBOX.eq_ignore_ascii_case(first) {
            user.inbox().append(&rest(name, 1)?.to_relative_name())
        } else if !first.starts_with(NAMESPACE_MARKER) {
            return Ok(name.to_relative_name());
        } else {
            match self.namespace_kind(first) {
                Some(NamespaceKind::Personal) => {
                    let mut tail = rest(name, 1)?;
                    if tail
                        .first()
                        .map_or(false, |s| INBOX.eq_ignore_ascii_case(s))
                    {
                        tail = rest(&tail, 1)?;
                    }
                    user.inbox().append(&tail.to_relative_name())
                }
                Some(NamespaceKind::OtherUsers) => {
                    resolve_other_user(name)?
                }
                Some(NamespaceKind::Shared) => {
                    rooted_under(&[SHARED_ROOT], &rest(name, 1)?)
                }
                None => {
                    debug!("Rejected unknown namespace {:?}", first);
                    return Err(Error::UnknownNamespace(first.to_owned()));
                }
            }
        };

        trace!("Resolved {:?} for {} to {:?}", name, user, resolved);
        Ok(resolved)
    }

    /// Express a canonical name as `user` would see it.
    ///
    /// Names under `user`'s own home root are rewritten to be under `INBOX`.
    /// Names of other users are placed under the other-users token, with
    /// virtual users recombined into `user@domain` form. Group names are
    /// placed under the shared token.
    ///
    /// The empty name unresolves to the empty name. Otherwise, fails with
    /// `InvalidArgument` if `name` is not rooted or is a virtual
    /// domain node, which has no client-visible form, and with
    /// `UnknownNamespace` if the namespace is not recognised or has no
    /// client-visible token.
    pub fn unresolve(
        &self,
        name: &Name,
        user: &Owner,
    ) -> Result<UnresolvedName, Error> {
        let first = match name.first() {
            None => return Ok(UnresolvedName::empty()),
            Some(first) => first,
        };

        if !name.is_rooted() {
            return Err(Error::InvalidArgument(
                "cannot unresolve a relative name",
            ));
        }

        let home = user.inbox();
        if name.starts_with(home) {
            let tail = name.suffix(name.segment_count() - home.segment_count())?;
            return Ok(prefixed(&[INBOX], tail.raw_segments()));
        }

        let (kind, skip) = match first {
            USERS_ROOT => (NamespaceKind::OtherUsers, 1),
            VIRTUAL_USERS_ROOT => (NamespaceKind::OtherUsers, 3),
            SHARED_ROOT => (NamespaceKind::Shared, 1),
            _ => return Err(Error::UnknownNamespace(first.to_owned())),
        };

        let token = self
            .namespace_token(kind)
            .ok_or_else(|| Error::UnknownNamespace(first.to_owned()))?;

        if VIRTUAL_USERS_ROOT == first {
            if name.segment_count() < 3 {
                return Err(Error::InvalidArgument(
                    "virtual domain nodes have no client-visible name",
                ));
            }

            let login = format!(
                "{}@{}",
                name.segment_at(2)?,
                name.segment_at(1)?
            );
            let tail = name.suffix(name.segment_count() - skip)?;
            return Ok(prefixed(&[token, login.as_str()], tail.raw_segments()));
        }

        let tail = name.suffix(name.segment_count() - skip)?;
        Ok(prefixed(&[token], tail.raw_segments()))
    }

    /// Return the owner of `name`, if it has one.
    ///
    /// The result is memoised on `name`.
    pub fn get_owner(&self, name: &Name) -> Option<Arc<Owner>> {
        name.owner().cloned()
    }

    /// See `namespace::exists_trivially`.
    pub fn exists_trivially(&self, name: &Name) -> bool {
        exists_trivially(name)
    }

    /// Return the INBOX (home root) of `owner`.
    pub fn get_inbox(&self, owner: &Owner) -> Name {
        owner.inbox().clone()
    }

    /// Return the ordering in which names are presented to `user`.
    pub fn contextualized_comparator(&self, user: &Owner) -> ContextualOrdering {
        ContextualOrdering::new(user)
    }

    /// Build a query from the reference and pattern arguments of a `LIST`
    /// command.
    pub fn compile_query(
        &self,
        reference: &UnresolvedName,
        pattern: &UnresolvedName,
        user: &Owner,
    ) -> Result<Query, Error> {
        let base = self.resolve(reference, user)?;
        let expression = self.resolve(pattern, user)?;
        Query::new(&base, &expression)
    }
}

/// Return `name` without its first `skip` segments.
fn rest(name: &UnresolvedName, skip: usize) -> Result<UnresolvedName, Error> {
    name.suffix(name.segment_count() - skip)
}

fn resolve_other_user(name: &UnresolvedName) -> Result<Name, Error> {
    let login = match name.segment_at(1) {
        Err(_) => return Ok(rooted_under(&[USERS_ROOT], &rest(name, 1)?)),
        Ok(login) => login,
    };

    if !contains_wildcard(login) {
        if let Some((user, domain)) = login.rsplit_once('@') {
            if !user.is_empty() && !domain.is_empty() {
                return Ok(rooted_under(
                    &[VIRTUAL_USERS_ROOT, domain, user],
                    &rest(name, 2)?,
                ));
            }
        }
    }

    Ok(rooted_under(&[USERS_ROOT], &rest(name, 1)?))
}

fn concat_segments(head: &[&str], tail: &Segments) -> Segments {
    let mut segments = Vec::<Arc<str>>::with_capacity(head.len() + tail.len());
    segments.extend(head.iter().map(|&s| Arc::from(s)));
    segments.extend(tail.iter().cloned());
    Segments::from_vec(segments)
}

fn rooted_under(head: &[&str], tail: &UnresolvedName) -> Name {
    Name::from_segments(concat_segments(head, tail.raw_segments()), true)
}

fn prefixed(head: &[&str], tail: &Segments) -> UnresolvedName {
    UnresolvedName::from_segments(concat_segments(head, tail))
}
