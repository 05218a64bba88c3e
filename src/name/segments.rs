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

//! The shared, immutable segment buffer underlying all name values.
//!
//! A `Segments` value is a `(start, end)` view into a reference-counted array
//! of reference-counted segment strings. Slicing never copies anything but
//! the `Arc` pointer to the buffer, so a whole chain of ancestors can be built
//! in linear time and space. Extending a name allocates a new array, but the
//! segment text itself is still shared.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use lazy_static::lazy_static;

use crate::support::error::Error;

lazy_static! {
    static ref EMPTY: Arc<[Arc<str>]> = Arc::from(Vec::<Arc<str>>::new());
}

/// Check that `segment` may appear in a name.
///
/// Segments must be non-empty and must not contain NUL, which is reserved
/// for joining segments when matching whole names.
pub(crate) fn check_segment(segment: &str) -> Result<(), Error> {
    if segment.is_empty() {
        Err(Error::InvalidArgument("empty name segment"))
    } else if segment.contains('\0') {
        Err(Error::InvalidArgument("NUL in name segment"))
    } else {
        Ok(())
    }
}

#[derive(Clone)]
pub(crate) struct Segments {
    buf: Arc<[Arc<str>]>,
    start: usize,
    end: usize,
}

impl Segments {
    pub(crate) fn empty() -> Self {
        Segments {
            buf: Arc::clone(&EMPTY),
            start: 0,
            end: 0,
        }
    }

    /// Build a new buffer from the given segments, rejecting any which fail
    /// `check_segment`.
    pub(crate) fn validated<I, S>(segments: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        let buf = segments
            .into_iter()
            .map(|s| {
                let s = s.into();
                check_segment(&s).map(|()| s)
            })
            .collect::<Result<Vec<_>, Error>>()?;

        Ok(Segments::from_vec(buf))
    }

    /// Wrap an already-validated vector of segments.
    pub(crate) fn from_vec(buf: Vec<Arc<str>>) -> Self {
        if buf.is_empty() {
            return Segments::empty();
        }

        let end = buf.len();
        Segments {
            buf: Arc::from(buf),
            start: 0,
            end,
        }
    }

    pub(crate) fn get(&self, index: usize) -> Result<&str, Error> {
        self.deref()
            .get(index)
            .map(|s| &**s)
            .ok_or(Error::IndexOutOfBounds {
                index,
                len: self.len(),
            })
    }

    /// Return a view of `[start, end)` relative to this view, aliasing the
    /// same buffer.
    ///
    /// Callers are responsible for bounds.
    fn slice(&self, start: usize, end: usize) -> Self {
        debug_assert!(start <= end && end <= self.len());
        if start == end {
            return Segments::empty();
        }

        Segments {
            buf: Arc::clone(&self.buf),
            start: self.start + start,
            end: self.start + end,
        }
    }

    pub(crate) fn prefix(&self, len: usize) -> Result<Self, Error> {
        self.check_len(len)?;
        Ok(self.slice(0, len))
    }

    pub(crate) fn suffix(&self, len: usize) -> Result<Self, Error> {
        self.check_len(len)?;
        Ok(self.slice(self.len() - len, self.len()))
    }

    fn check_len(&self, len: usize) -> Result<(), Error> {
        if len > self.len() {
            Err(Error::IndexOutOfBounds {
                index: len,
                len: self.len(),
            })
        } else {
            Ok(())
        }
    }

    pub(crate) fn push(&self, segment: Arc<str>) -> Self {
        let mut buf = Vec::with_capacity(self.len() + 1);
        buf.extend(self.iter().cloned());
        buf.push(segment);
        Segments::from_vec(buf)
    }

    pub(crate) fn concat(&self, other: &Segments) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }

        let mut buf = Vec::with_capacity(self.len() + other.len());
        buf.extend(self.iter().cloned());
        buf.extend(other.iter().cloned());
        Segments::from_vec(buf)
    }

    #[cfg(test)]
    pub(crate) fn shares_buffer_with(&self, other: &Segments) -> bool {
        Arc::ptr_eq(&self.buf, &other.buf)
    }
}

impl Deref for Segments {
    type Target = [Arc<str>];

    fn deref(&self) -> &[Arc<str>] {
        &self.buf[self.start..self.end]
    }
}

impl PartialEq for Segments {
    fn eq(&self, other: &Segments) -> bool {
        **self == **other
    }
}

impl Eq for Segments {}

impl PartialOrd for Segments {
    fn partial_cmp(&self, other: &Segments) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Segments {
    fn cmp(&self, other: &Segments) -> Ordering {
        // Slice ordering is already segment-wise with the strict prefix
        // ordering first.
        (**self).cmp(&**other)
    }
}

impl Hash for Segments {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (**self).hash(state)
    }
}

impl fmt::Debug for Segments {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn segs(s: &[&str]) -> Segments {
        Segments::validated(s.iter().copied()).unwrap()
    }

    #[test]
    fn slices_alias_buffer() {
        let s = segs(&["a", "b", "c"]);
        let p = s.prefix(2).unwrap();
        let q = p.suffix(1).unwrap();
        assert_eq!(segs(&["a", "b"]), p);
        assert_eq!(segs(&["b"]), q);
        assert!(s.shares_buffer_with(&p));
        assert!(s.shares_buffer_with(&q));
        assert_eq!(Ok("b"), q.get(0).map_err(|_| ()));
    }

    #[test]
    fn zero_length_slices_are_canonical() {
        let s = segs(&["a"]);
        assert!(s.prefix(0).unwrap().shares_buffer_with(&Segments::empty()));
        assert!(s.suffix(0).unwrap().shares_buffer_with(&Segments::empty()));
    }

    #[test]
    fn bounds_checked() {
        let s = segs(&["a", "b"]);
        assert_matches!(
            Err(Error::IndexOutOfBounds { index: 3, len: 2 }),
            s.prefix(3)
        );
        assert_matches!(
            Err(Error::IndexOutOfBounds { index: 2, len: 2 }),
            s.get(2)
        );
        assert_matches!(
            Err(Error::InvalidArgument(..)),
            Segments::validated(vec!["a", ""])
        );
        assert_matches!(
            Err(Error::InvalidArgument("NUL in name segment")),
            Segments::validated(vec!["a", "b\0c"])
        );
    }

    #[test]
    fn ordering_is_segment_wise() {
        assert!(segs(&["a"]) < segs(&["a", "b"]));
        assert!(segs(&["a", "z"]) < segs(&["ab"]));
        assert!(segs(&["B"]) < segs(&["a"]));
        assert!(Segments::empty() < segs(&["a"]));
    }
}
