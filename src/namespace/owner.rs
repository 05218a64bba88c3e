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
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use super::{
    exists_trivially, SHARED_ROOT, USERS_ROOT, VIRTUAL_USERS_ROOT,
};
use crate::name::{Name, Segments};
use crate::query::contains_wildcard;
use crate::support::error::Error;

/// The entity which a name belongs to.
///
/// Equality, ordering, and hashing consider only the identifying fields.
#[derive(Clone)]
pub struct Owner {
    user: String,
    domain: Option<String>,
    group: bool,
    inbox: OnceLock<Name>,
}

impl Owner {
    /// A plain user.
    ///
    /// The name must not contain `@`; use `virtual_user` or `from_login` for
    /// domain-qualified users.
    pub fn user(user: impl Into<String>) -> Result<Self, Error> {
        Owner::build(user.into(), None, false)
    }

    /// A virtual user, whose login is `user@domain`.
    pub fn virtual_user(
        user: impl Into<String>,
        domain: impl Into<String>,
    ) -> Result<Self, Error> {
        Owner::build(user.into(), Some(domain.into()), false)
    }

    /// A group, which owns shared mailboxes.
    pub fn group(group: impl Into<String>) -> Result<Self, Error> {
        Owner::build(group.into(), None, true)
    }

    /// Interpret a login name, which is a virtual user if it contains `@`.
    pub fn from_login(login: &str) -> Result<Self, Error> {
        match login.rsplit_once('@') {
            None => Owner::user(login),
            Some((user, domain)) => Owner::virtual_user(user, domain),
        }
    }

    fn build(
        user: String,
        domain: Option<String>,
        group: bool,
    ) -> Result<Self, Error> {
        if user.is_empty() || domain.as_ref().map_or(false, String::is_empty)
        {
            return Err(Error::InvalidArgument("empty user or domain"));
        }

        // A plain user named `a@b` would be indistinguishable from the
        // virtual user `a` of domain `b` once written as a login.
        if (!group && domain.is_none() && user.contains('@'))
            || domain.as_ref().map_or(false, |d| d.contains('@'))
        {
            return Err(Error::InvalidArgument("'@' in user or domain"));
        }

        Ok(Owner {
            user,
            domain,
            group,
            inbox: OnceLock::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.user
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn is_group(&self) -> bool {
        self.group
    }

    pub fn is_virtual(&self) -> bool {
        self.domain.is_some()
    }

    /// The login form of this owner, `user` or `user@domain`.
    pub fn login(&self) -> String {
        match self.domain {
            None => self.user.clone(),
            Some(ref domain) => format!("{}@{}", self.user, domain),
        }
    }

    /// The home root of this owner, which is also their INBOX.
    ///
    /// This is memoised per `Owner` value.
    pub fn inbox(&self) -> &Name {
        self.inbox.get_or_init(|| {
            let user = Arc::<str>::from(&*self.user);
            let segments: Vec<Arc<str>> = match self.domain {
                _ if self.group => vec![SHARED_ROOT.into(), user],
                None => vec![USERS_ROOT.into(), user],
                Some(ref domain) => {
                    vec![VIRTUAL_USERS_ROOT.into(), Arc::from(&**domain), user]
                }
            };
            // Constructors reject empty user and domain strings
            Name::from_segments(Segments::from_vec(segments), true)
        })
    }

    fn key(&self) -> (bool, Option<&str>, &str) {
        (self.group, self.domain(), &self.user)
    }
}

impl PartialEq for Owner {
    fn eq(&self, other: &Owner) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Owner {}

impl PartialOrd for Owner {
    fn partial_cmp(&self, other: &Owner) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Owner {
    fn cmp(&self, other: &Owner) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl Hash for Owner {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state)
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Owner")
            .field("user", &self.user)
            .field("domain", &self.domain)
            .field("group", &self.group)
            .finish()
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.group {
            write!(f, "group:")?;
        }
        write!(f, "{}", self.user)?;
        if let Some(ref domain) = self.domain {
            write!(f, "@{}", domain)?;
        }
        Ok(())
    }
}

/// Determine the owner of `name` from its backend root.
///
/// Relative names, names which exist trivially, and names whose identifying
/// segments contain wildcards have no owner.
pub(crate) fn compute_owner(name: &Name) -> Option<Owner> {
    if !name.is_rooted() || exists_trivially(name) {
        return None;
    }

    let identifying = |ix: usize| {
        name.segment_at(ix)
            .ok()
            .filter(|segment| !contains_wildcard(segment))
    };

    match name.first()? {
        USERS_ROOT => Owner::user(identifying(1)?).ok(),
        VIRTUAL_USERS_ROOT => {
            Owner::virtual_user(identifying(2)?, identifying(1)?).ok()
        }
        SHARED_ROOT => Owner::group(identifying(1)?).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn abs(s: &[&str]) -> Name {
        Name::absolute(s.iter().copied()).unwrap()
    }

    #[test]
    fn virtual_owner_scenario() {
        let owner =
            compute_owner(&abs(&["#vusers", "example.com", "alice", "Sent"]))
                .unwrap();
        assert_eq!("alice", owner.name());
        assert_eq!(Some("example.com"), owner.domain());
        assert!(!owner.is_group());
        assert_eq!(
            &abs(&["#vusers", "example.com", "alice"]),
            owner.inbox()
        );
        assert_eq!("alice@example.com", owner.login());
    }

    #[test]
    fn plain_and_group_owners() {
        let joe = compute_owner(&abs(&["#users", "joe"])).unwrap();
        assert_eq!(Owner::user("joe").unwrap(), joe);
        assert_eq!(&abs(&["#users", "joe"]), joe.inbox());

        let team = compute_owner(&abs(&["#shared", "team", "x"])).unwrap();
        assert!(team.is_group());
        assert_eq!(&abs(&["#shared", "team"]), team.inbox());
        assert_eq!("group:team", team.to_string());
    }

    #[test]
    fn no_owner() {
        assert_eq!(None, compute_owner(&Name::empty()));
        assert_eq!(None, compute_owner(&abs(&["#users"])));
        assert_eq!(None, compute_owner(&abs(&["#vusers", "example.com"])));
        assert_eq!(
            None,
            compute_owner(&Name::new(vec!["#users", "joe"], false).unwrap())
        );
        assert_eq!(None, compute_owner(&abs(&["#users", "j%", "x"])));
        assert_eq!(
            None,
            compute_owner(&abs(&["#vusers", "*.com", "alice", "x"]))
        );
        assert_eq!(None, compute_owner(&abs(&["#other", "joe"])));
        // Wildcards below the identifying segments are irrelevant
        assert_eq!(
            Some(Owner::user("joe").unwrap()),
            compute_owner(&abs(&["#users", "joe", "*"]))
        );
    }

    #[test]
    fn from_login() {
        assert_eq!(Owner::user("joe").unwrap(), Owner::from_login("joe").unwrap());
        assert_eq!(
            Owner::virtual_user("alice", "example.com").unwrap(),
            Owner::from_login("alice@example.com").unwrap()
        );
        assert_matches!(Err(Error::InvalidArgument(..)), Owner::from_login(""));
        assert_matches!(
            Err(Error::InvalidArgument(..)),
            Owner::from_login("alice@")
        );
        assert_matches!(
            Err(Error::InvalidArgument(..)),
            Owner::from_login("@example.com")
        );
    }

    #[test]
    fn at_sign_only_in_virtual_logins() {
        assert_matches!(Err(Error::InvalidArgument(..)), Owner::user("a@b"));
        assert_matches!(
            Err(Error::InvalidArgument(..)),
            Owner::virtual_user("a", "b@c")
        );
        assert!(Owner::group("a@b").is_ok());

        let nested = Owner::from_login("a@b@example.com").unwrap();
        assert_eq!("a@b", nested.name());
        assert_eq!(Some("example.com"), nested.domain());
        assert_eq!("a@b@example.com", nested.login());

        // Such a name was never produced by resolution, so has no owner
        assert_eq!(None, compute_owner(&abs(&["#users", "a@b", "x"])));
    }

    #[test]
    fn owner_is_memoised_on_name() {
        let name = abs(&["#users", "joe", "Drafts"]);
        let first = Arc::clone(name.owner().unwrap());
        let second = Arc::clone(name.owner().unwrap());
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, name.clone().owner().unwrap()));
    }
}
