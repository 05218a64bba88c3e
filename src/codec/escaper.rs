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

//! The simple escaping strategies.

use super::{Escaper, Unescaper};
use crate::query::{FREE_WILDCARD, LOCAL_WILDCARD};
use crate::support::error::Error;

fn first_char_len(s: &str) -> usize {
    s.chars().next().map_or(0, char::len_utf8)
}

/// Performs no escaping at all.
///
/// Segments containing the delimiter are silently split when decoded. This is
/// only suitable for delimiters which do not occur in practise.
#[derive(Clone, Copy, Debug)]
pub struct Optimistic {
    delimiter: char,
}

impl Optimistic {
    pub const fn new(delimiter: char) -> Self {
        Optimistic { delimiter }
    }
}

impl Escaper for Optimistic {
    fn delimiter(&self) -> char {
        self.delimiter
    }

    fn needs_escape(&self, _: char) -> bool {
        false
    }

    fn escape(&self, rest: &str, dst: &mut String) -> usize {
        let len = first_char_len(rest);
        dst.push_str(&rest[..len]);
        len
    }
}

impl Unescaper for Optimistic {
    fn is_escape_sequence(&self, _: &str) -> bool {
        false
    }

    fn unescape(&self, rest: &str, dst: &mut String) -> Result<usize, Error> {
        Ok(self.escape(rest, dst))
    }
}

/// C-style escaping: the delimiter and the backslash itself are preceded by a
/// backslash.
///
/// The delimiter must not be a backslash.
#[derive(Clone, Copy, Debug)]
pub struct Backslash {
    delimiter: char,
}

impl Backslash {
    pub const fn new(delimiter: char) -> Self {
        Backslash { delimiter }
    }
}

impl Escaper for Backslash {
    fn delimiter(&self) -> char {
        self.delimiter
    }

    fn needs_escape(&self, ch: char) -> bool {
        '\\' == ch || self.delimiter == ch
    }

    fn escape(&self, rest: &str, dst: &mut String) -> usize {
        dst.push('\\');
        let len = first_char_len(rest);
        dst.push_str(&rest[..len]);
        len
    }
}

impl Unescaper for Backslash {
    fn is_escape_sequence(&self, rest: &str) -> bool {
        rest.starts_with('\\')
    }

    fn unescape(&self, rest: &str, dst: &mut String) -> Result<usize, Error> {
        match rest[1..].chars().next() {
            None => Err(Error::EscapeCorruption("dangling backslash")),
            Some(ch) if self.needs_escape(ch) => {
                dst.push(ch);
                Ok(1 + ch.len_utf8())
            }
            Some(_) => Err(Error::EscapeCorruption("unknown backslash escape")),
        }
    }
}

/// Escapes the delimiter by doubling it.
///
/// Decoding is greedy: a pair of delimiters is always a literal. Consequently
/// a segment other than the first which begins with the delimiter cannot be
/// told apart from the preceding segment ending with it.
#[derive(Clone, Copy, Debug)]
pub struct Doubling {
    delimiter: char,
}

impl Doubling {
    pub const fn new(delimiter: char) -> Self {
        Doubling { delimiter }
    }
}

impl Escaper for Doubling {
    fn delimiter(&self) -> char {
        self.delimiter
    }

    fn needs_escape(&self, ch: char) -> bool {
        self.delimiter == ch
    }

    fn escape(&self, _: &str, dst: &mut String) -> usize {
        dst.push(self.delimiter);
        dst.push(self.delimiter);
        self.delimiter.len_utf8()
    }
}

impl Unescaper for Doubling {
    fn is_escape_sequence(&self, rest: &str) -> bool {
        let mut chars = rest.chars();
        Some(self.delimiter) == chars.next()
            && Some(self.delimiter) == chars.next()
    }

    fn unescape(&self, _: &str, dst: &mut String) -> Result<usize, Error> {
        dst.push(self.delimiter);
        Ok(2 * self.delimiter.len_utf8())
    }
}

/// Translates a wildcard pattern into a regular expression.
///
/// `*` becomes "anything" and `%` becomes "anything but the delimiter"; every
/// other character is matched literally. The delimiter itself is written as a
/// regex escape so that unprintable delimiters work.
///
/// This is encode-only; there is no meaningful inverse.
#[derive(Clone, Copy, Debug)]
pub struct SearchPattern {
    delimiter: char,
}

impl SearchPattern {
    pub const fn new(delimiter: char) -> Self {
        SearchPattern { delimiter }
    }
}

impl Escaper for SearchPattern {
    fn delimiter(&self) -> char {
        self.delimiter
    }

    fn needs_escape(&self, _: char) -> bool {
        true
    }

    fn escape(&self, rest: &str, dst: &mut String) -> usize {
        let len = first_char_len(rest);
        let ch = &rest[..len];
        if ch.starts_with(FREE_WILDCARD) {
            dst.push_str(".*");
        } else if ch.starts_with(LOCAL_WILDCARD) {
            dst.push_str(&format!("[^\\x{{{:X}}}]*", self.delimiter as u32));
        } else {
            dst.push_str(&regex::escape(ch));
        }
        len
    }

    fn push_delimiter(&self, dst: &mut String) {
        dst.push_str(&format!("\\x{{{:X}}}", self.delimiter as u32));
    }
}
