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

//! Hierarchical mailbox names.
//!
//! There are two name types. An `UnresolvedName` is a sequence of segments
//! exactly as a client typed it, before it has been anchored to any user's
//! context. A `Name` is the canonical form: a sequence of segments plus a
//! flag indicating whether it is *rooted*, i.e., self-contained and
//! independent of any user. The `namespace` module maps between the two.
//!
//! Both types are immutable and cheap to clone. All structural operations
//! which produce a contiguous sub-range of a name (`parent`, `prefix`,
//! `suffix`, hierarchy iteration) share the original segment buffer.

mod hierarchy;
mod segments;

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as MemOrdering};
use std::sync::{Arc, OnceLock};

pub use self::hierarchy::HierarchyLevels;
pub(crate) use self::segments::{check_segment, Segments};

use crate::namespace::owner::{self, Owner};
use crate::support::error::Error;

/// A name as supplied by a client, not yet bound to any user context.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnresolvedName {
    segments: Segments,
}

impl UnresolvedName {
    /// Construct an `UnresolvedName` from the given segments.
    ///
    /// Fails if any segment is empty.
    pub fn new<I, S>(segments: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Ok(UnresolvedName {
            segments: Segments::validated(segments)?,
        })
    }

    pub fn empty() -> Self {
        UnresolvedName {
            segments: Segments::empty(),
        }
    }

    pub(crate) fn from_segments(segments: Segments) -> Self {
        UnresolvedName { segments }
    }

    pub(crate) fn raw_segments(&self) -> &Segments {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment_at(&self, index: usize) -> Result<&str, Error> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().map(|s| &**s)
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(|s| &**s)
    }

    pub fn prefix(&self, len: usize) -> Result<Self, Error> {
        Ok(UnresolvedName::from_segments(self.segments.prefix(len)?))
    }

    pub fn suffix(&self, len: usize) -> Result<Self, Error> {
        Ok(UnresolvedName::from_segments(self.segments.suffix(len)?))
    }

    pub fn child(&self, segment: impl Into<Arc<str>>) -> Result<Self, Error> {
        Ok(UnresolvedName::from_segments(
            self.segments.push(checked_segment(segment)?),
        ))
    }

    pub fn append(&self, other: &UnresolvedName) -> Self {
        UnresolvedName::from_segments(self.segments.concat(&other.segments))
    }

    /// Reinterpret this name as a relative (unrooted) `Name`.
    pub fn to_relative_name(&self) -> Name {
        Name::from_segments(self.segments.clone(), false)
    }
}

impl fmt::Debug for UnresolvedName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("UnresolvedName")
            .field(&self.segments)
            .finish()
    }
}

/// A canonical name.
///
/// Equality and ordering consider the segments first and the `rooted` flag
/// second; the two memoisation cells do not participate.
pub struct Name {
    segments: Segments,
    rooted: bool,
    /// Memoised hash code. Zero means "not yet computed".
    hash: AtomicU64,
    /// Memoised owner.
    owner: OnceLock<Option<Arc<Owner>>>,
}

impl Name {
    /// Construct a `Name` from the given segments.
    ///
    /// Fails if any segment is empty.
    pub fn new<I, S>(segments: I, rooted: bool) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Ok(Name::from_segments(Segments::validated(segments)?, rooted))
    }

    /// Shorthand for `Name::new(segments, true)`.
    pub fn absolute<I, S>(segments: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Name::new(segments, true)
    }

    /// The canonical empty name.
    ///
    /// It is not rooted, so that appending it to anything is the identity.
    pub fn empty() -> Self {
        Name::from_segments(Segments::empty(), false)
    }

    pub(crate) fn from_segments(segments: Segments, rooted: bool) -> Self {
        Name {
            segments,
            rooted,
            hash: AtomicU64::new(0),
            owner: OnceLock::new(),
        }
    }

    pub(crate) fn raw_segments(&self) -> &Segments {
        &self.segments
    }

    pub fn is_rooted(&self) -> bool {
        self.rooted
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment_at(&self, index: usize) -> Result<&str, Error> {
        self.segments.get(index)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> + '_ {
        self.segments.iter().map(|s| &**s)
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(|s| &**s)
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(|s| &**s)
    }

    /// Return the parent of this name, or `None` if it has fewer than two
    /// segments.
    pub fn parent(&self) -> Option<Name> {
        if self.segment_count() < 2 {
            None
        } else {
            self.prefix(self.segment_count() - 1).ok()
        }
    }

    /// Return the first `len` segments of this name.
    ///
    /// The result keeps the rootedness of this name, unless it is an empty
    /// strict prefix.
    pub fn prefix(&self, len: usize) -> Result<Name, Error> {
        if len == self.segment_count() {
            return Ok(self.clone());
        }
        if 0 == len {
            return Ok(Name::empty());
        }

        Ok(Name::from_segments(self.segments.prefix(len)?, self.rooted))
    }

    /// Return the last `len` segments of this name.
    ///
    /// A strict suffix is never rooted, since it has lost the segments which
    /// made it independent of context.
    pub fn suffix(&self, len: usize) -> Result<Name, Error> {
        if len == self.segment_count() {
            return Ok(self.clone());
        }
        if 0 == len {
            return Ok(Name::empty());
        }

        // Strict suffix
        Ok(Name::from_segments(self.segments.suffix(len)?, false))
    }

    /// Return the name of the direct child `segment` of this name.
    pub fn child(&self, segment: impl Into<Arc<str>>) -> Result<Name, Error> {
        Ok(Name::from_segments(
            self.segments.push(checked_segment(segment)?),
            self.rooted,
        ))
    }

    /// Interpret `other` relative to this name.
    ///
    /// If `other` is rooted, it is returned unchanged. Otherwise, its segments
    /// are appended to this name's, and the result has this name's
    /// rootedness.
    pub fn append(&self, other: &Name) -> Name {
        if other.rooted {
            other.clone()
        } else {
            Name::from_segments(
                self.segments.concat(&other.segments),
                self.rooted,
            )
        }
    }

    /// Alias of `append`, reading better where `other` is a pattern.
    pub fn relative(&self, other: &Name) -> Name {
        self.append(other)
    }

    /// Whether the segments of `prefix` are a (not necessarily strict)
    /// prefix of this name's segments. Rootedness is not considered.
    pub fn starts_with(&self, prefix: &Name) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Return every ancestor of this name from the top down, ending with this
    /// name itself.
    ///
    /// Each call produces a fresh iterator.
    pub fn top_down_hierarchy_levels(&self) -> HierarchyLevels {
        HierarchyLevels::new(self.clone())
    }

    /// Strip the rooted flag, producing the name as a client would see its
    /// segments.
    pub fn to_unresolved(&self) -> UnresolvedName {
        UnresolvedName::from_segments(self.segments.clone())
    }

    /// Return the memoised owner of this name.
    ///
    /// Concurrent first calls may each compute the owner; since the
    /// computation is deterministic, whichever value is stored is correct.
    pub(crate) fn owner(&self) -> Option<&Arc<Owner>> {
        if self.owner.get().is_none() {
            let _ = self.owner.set(owner::compute_owner(self).map(Arc::new));
        }

        self.owner.get().and_then(Option::as_ref)
    }

    fn hash_code(&self) -> u64 {
        let cached = self.hash.load(MemOrdering::Relaxed);
        if 0 != cached {
            return cached;
        }

        let mut hasher = DefaultHasher::new();
        self.segments.hash(&mut hasher);
        self.rooted.hash(&mut hasher);
        // Zero is reserved for "not computed"
        let code = hasher.finish().max(1);
        self.hash.store(code, MemOrdering::Relaxed);
        code
    }
}

fn checked_segment(segment: impl Into<Arc<str>>) -> Result<Arc<str>, Error> {
    let segment = segment.into();
    check_segment(&segment)?;
    Ok(segment)
}

impl Clone for Name {
    fn clone(&self) -> Self {
        Name {
            segments: self.segments.clone(),
            rooted: self.rooted,
            hash: AtomicU64::new(self.hash.load(MemOrdering::Relaxed)),
            owner: self.owner.clone(),
        }
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Name) -> bool {
        self.rooted == other.rooted && self.segments == other.segments
    }
}

impl Eq for Name {}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Name) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Name) -> Ordering {
        self.segments
            .cmp(&other.segments)
            .then(self.rooted.cmp(&other.rooted))
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_code());
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Name")
            .field("rooted", &self.rooted)
            .field("segments", &self.segments)
            .finish()
    }
}

impl From<&Name> for UnresolvedName {
    fn from(name: &Name) -> Self {
        name.to_unresolved()
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    fn abs(s: &[&str]) -> Name {
        Name::absolute(s.iter().copied()).unwrap()
    }

    fn rel(s: &[&str]) -> Name {
        Name::new(s.iter().copied(), false).unwrap()
    }

    #[test]
    fn structural_operations() {
        let n = abs(&["#users", "joe", "Work", "2020"]);
        assert_eq!(4, n.segment_count());
        assert_eq!("Work", n.segment_at(2).unwrap());
        assert_matches!(
            Err(Error::IndexOutOfBounds { index: 4, len: 4 }),
            n.segment_at(4)
        );

        assert_eq!(abs(&["#users", "joe", "Work"]), n.parent().unwrap());
        assert_eq!(None, abs(&["#users"]).parent());
        assert_eq!(None, Name::empty().parent());

        assert_eq!(abs(&["#users", "joe"]), n.prefix(2).unwrap());
        assert_eq!(rel(&["Work", "2020"]), n.suffix(2).unwrap());
        assert_eq!(Name::empty(), n.prefix(0).unwrap());
        assert_eq!(Name::empty(), n.suffix(0).unwrap());
        assert_matches!(Err(Error::IndexOutOfBounds { .. }), n.prefix(5));
        assert_matches!(Err(Error::IndexOutOfBounds { .. }), n.suffix(5));

        assert_eq!(
            abs(&["#users", "joe", "Work", "2020", "Q1"]),
            n.child("Q1").unwrap()
        );
        assert_matches!(Err(Error::InvalidArgument(..)), n.child(""));
        assert_matches!(Err(Error::InvalidArgument(..)), n.child("a\0b"));
    }

    #[test]
    fn slices_share_storage() {
        let n = abs(&["#users", "joe", "Work", "2020"]);
        let parent = n.parent().unwrap();
        let grandparent = parent.parent().unwrap();
        assert!(n.raw_segments().shares_buffer_with(parent.raw_segments()));
        assert!(n
            .raw_segments()
            .shares_buffer_with(grandparent.raw_segments()));
        assert!(n
            .raw_segments()
            .shares_buffer_with(n.suffix(1).unwrap().raw_segments()));

        for level in n.top_down_hierarchy_levels() {
            assert!(n.raw_segments().shares_buffer_with(level.raw_segments()));
        }
    }

    #[test]
    fn append_respects_rootedness() {
        let base = abs(&["#users", "joe"]);
        assert_eq!(
            abs(&["#users", "joe", "Drafts"]),
            base.append(&rel(&["Drafts"]))
        );
        assert_eq!(
            abs(&["#shared", "x"]),
            base.append(&abs(&["#shared", "x"]))
        );
        assert_eq!(
            rel(&["a", "b"]),
            rel(&["a"]).relative(&rel(&["b"]))
        );
        assert_eq!(base, base.append(&Name::empty()));
    }

    #[test]
    fn equality_considers_rootedness() {
        assert_ne!(abs(&["a"]), rel(&["a"]));
        assert!(rel(&["a"]) < abs(&["a"]));
        assert_eq!(
            UnresolvedName::new(vec!["a", "b"]).unwrap(),
            abs(&["a", "b"]).to_unresolved()
        );
        assert_eq!(
            UnresolvedName::new(vec!["a", "b"]).unwrap(),
            rel(&["a", "b"]).to_unresolved()
        );
    }

    #[test]
    fn hash_is_memoised_and_consistent() {
        let a = abs(&["#users", "joe"]);
        let b = abs(&["#users", "joe", "x"]).parent().unwrap();
        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));
        assert!(!set.contains(&rel(&["#users", "joe"])));
        // Clone carries the memoised value
        assert_eq!(a.hash_code(), a.clone().hash_code());
    }

    #[test]
    fn hierarchy_levels() {
        let n = abs(&["#users", "joe", "Work"]);
        let levels = n.top_down_hierarchy_levels().collect::<Vec<_>>();
        assert_eq!(
            vec![
                abs(&["#users"]),
                abs(&["#users", "joe"]),
                abs(&["#users", "joe", "Work"]),
            ],
            levels
        );
        // Restartable per call
        assert_eq!(3, n.top_down_hierarchy_levels().count());
        assert_eq!(0, Name::empty().top_down_hierarchy_levels().count());
    }

    #[test]
    fn unresolved_operations() {
        let u = UnresolvedName::new(vec!["INBOX", "Drafts"]).unwrap();
        assert_eq!(Some("INBOX"), u.first());
        assert_eq!(
            UnresolvedName::new(vec!["Drafts"]).unwrap(),
            u.suffix(1).unwrap()
        );
        assert_eq!(
            UnresolvedName::new(vec!["INBOX", "Drafts", "x"]).unwrap(),
            u.child("x").unwrap()
        );
        assert_eq!(rel(&["INBOX", "Drafts"]), u.to_relative_name());
        assert_matches!(
            Err(Error::InvalidArgument(..)),
            UnresolvedName::new(vec![""])
        );
    }

    fn arb_name() -> impl Strategy<Value = Name> {
        (prop::collection::vec("[a-zA-Z0-9#%*]{1,4}", 0..6), any::<bool>())
            .prop_map(|(s, rooted)| Name::new(s, rooted).unwrap())
    }

    proptest! {
        #[test]
        fn full_prefix_and_suffix_are_identity(name in arb_name()) {
            let len = name.segment_count();
            prop_assert_eq!(&name, &name.prefix(len).unwrap());
            prop_assert_eq!(&name, &name.suffix(len).unwrap());
        }

        #[test]
        fn ordering_agrees_with_segment_lists(a in arb_name(), b in arb_name()) {
            let sa = a.segments().collect::<Vec<_>>();
            let sb = b.segments().collect::<Vec<_>>();
            if sa != sb {
                prop_assert_eq!(sa.cmp(&sb), a.cmp(&b));
            }
        }
    }
}
