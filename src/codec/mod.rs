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

//! Conversion between hierarchical names and delimited strings.
//!
//! A `Codec` pairs an escaping strategy with a policy about leading
//! delimiters. The escaping strategy determines both the delimiter and how
//! segment content which cannot appear literally is represented. There is a
//! single encode loop and a single decode loop; strategies only answer
//! questions about the text at the current position.
//!
//! The set of codecs used by the mail store is fixed:
//!
//! | Codec              | Strategy                     | Delimiter |
//! |--------------------|------------------------------|-----------|
//! | `WIRE`             | Modified UTF-7               | `.`       |
//! | `WIRE_PESSIMISTIC` | Modified UTF-7, `.` escaped  | `.`       |
//! | `STORAGE`          | None (optimistic)            | U+241F    |
//! | `PATH`             | Backslash                    | `/`       |
//! | `INDEX`            | Doubling                     | `:`       |
//!
//! plus two internal codecs used for building and evaluating search
//! patterns, which join segments with NUL.

mod escaper;
pub mod utf7;

use std::fmt;
use std::mem;
use std::str::FromStr;
use std::sync::Arc;

pub use self::escaper::{Backslash, Doubling, Optimistic, SearchPattern};
pub use self::utf7::ModifiedUtf7;

use crate::name::{check_segment, Name, Segments, UnresolvedName};
use crate::support::error::Error;

/// The encoding side of an escaping strategy.
pub trait Escaper {
    /// The character which separates segments.
    fn delimiter(&self) -> char;

    /// Whether `ch`, occurring inside a segment, must be passed through
    /// `escape` rather than copied literally.
    fn needs_escape(&self, ch: char) -> bool;

    /// Write the escaped form of the text at the start of `rest` into `dst`.
    ///
    /// The first character of `rest` is one for which `needs_escape` returned
    /// true. The strategy may consume more than one character. Returns the
    /// number of bytes consumed, which must be at least the length of the
    /// first character and must fall on a character boundary.
    fn escape(&self, rest: &str, dst: &mut String) -> usize;

    /// Write a delimiter into `dst`.
    fn push_delimiter(&self, dst: &mut String) {
        dst.push(self.delimiter());
    }
}

/// The decoding side of an escaping strategy.
pub trait Unescaper: Escaper {
    /// Whether an escape sequence begins at the start of `rest`.
    ///
    /// This is checked before `is_delimiter`.
    fn is_escape_sequence(&self, rest: &str) -> bool;

    /// Decode the escape sequence at the start of `rest` into `dst`.
    ///
    /// Returns the number of bytes consumed.
    fn unescape(&self, rest: &str, dst: &mut String) -> Result<usize, Error>;

    /// Whether a delimiter begins at the start of `rest`.
    fn is_delimiter(&self, rest: &str) -> bool {
        rest.starts_with(self.delimiter())
    }

    /// Return the number of bytes occupied by the delimiter at the start of
    /// `rest`.
    fn consume_delimiter(&self, _rest: &str) -> usize {
        self.delimiter().len_utf8()
    }
}

/// A stateless pairing of an escaping strategy with a delimiter policy.
#[derive(Clone, Copy, Debug)]
pub struct Codec<E> {
    escaper: E,
    skip_leading_delimiter: bool,
}

impl<E> Codec<E> {
    /// Create a new codec.
    ///
    /// If `skip_leading_delimiter` is true, a single delimiter at the very
    /// start of the input is ignored when decoding. Otherwise, it is treated
    /// as terminating an empty segment, which is an error.
    pub const fn new(escaper: E, skip_leading_delimiter: bool) -> Self {
        Codec {
            escaper,
            skip_leading_delimiter,
        }
    }

    pub fn escaper(&self) -> &E {
        &self.escaper
    }
}

impl<E: Escaper> Codec<E> {
    pub fn delimiter(&self) -> char {
        self.escaper.delimiter()
    }

    /// Encode the segments of `name`. Rootedness is not represented.
    pub fn encode(&self, name: &Name) -> String {
        self.encode_segments(name.segments())
    }

    pub fn encode_unresolved(&self, name: &UnresolvedName) -> String {
        self.encode_segments(name.segments())
    }

    pub fn encode_segments<'a>(
        &self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> String {
        let mut dst = String::new();
        for (ix, segment) in segments.into_iter().enumerate() {
            if ix > 0 {
                self.escaper.push_delimiter(&mut dst);
            }
            self.encode_segment(segment, &mut dst);
        }
        dst
    }

    pub(crate) fn encode_segment(&self, segment: &str, dst: &mut String) {
        let mut pos = 0;
        while let Some(ch) = segment[pos..].chars().next() {
            if self.escaper.needs_escape(ch) {
                let consumed = self.escaper.escape(&segment[pos..], dst);
                debug_assert!(consumed >= ch.len_utf8());
                pos += consumed.max(ch.len_utf8());
            } else {
                dst.push(ch);
                pos += ch.len_utf8();
            }
        }
    }
}

impl<E: Unescaper> Codec<E> {
    /// Decode `s` into the segments of a name as a client would present it.
    pub fn decode(&self, s: &str) -> Result<UnresolvedName, Error> {
        Ok(UnresolvedName::from_segments(self.decode_segments(s)?))
    }

    /// Decode `s` into a `Name` with the given rootedness.
    ///
    /// This is used for names read back from storage, which are always
    /// rooted.
    pub fn decode_name(&self, s: &str, rooted: bool) -> Result<Name, Error> {
        Ok(Name::from_segments(self.decode_segments(s)?, rooted))
    }

    fn decode_segments(&self, s: &str) -> Result<Segments, Error> {
        let mut segments = Vec::<Arc<str>>::new();
        let mut buf = String::new();
        let mut pos = 0;

        while let Some(ch) = s[pos..].chars().next() {
            let rest = &s[pos..];
            if self.escaper.is_escape_sequence(rest) {
                pos += self.escaper.unescape(rest, &mut buf)?;
            } else if self.escaper.is_delimiter(rest) {
                let at_start = 0 == pos;
                pos += self.escaper.consume_delimiter(rest);

                if !buf.is_empty() {
                    check_segment(&buf)?;
                    segments.push(Arc::from(mem::take(&mut buf)));
                } else if !(at_start && self.skip_leading_delimiter) {
                    return Err(Error::InvalidArgument("empty name segment"));
                }
            } else {
                buf.push(ch);
                pos += ch.len_utf8();
            }
        }

        // An empty buffer here means either empty input or a trailing
        // delimiter, both of which contribute nothing.
        if !buf.is_empty() {
            check_segment(&buf)?;
            segments.push(Arc::from(buf));
        }

        Ok(Segments::from_vec(segments))
    }
}

/// Joins segments with NUL, which never occurs in mailbox names.
pub(crate) const PLACEHOLDER: char = '\0';

/// Modified UTF-7 with `.` as the delimiter, as seen by IMAP clients.
pub const WIRE: Codec<ModifiedUtf7> =
    Codec::new(ModifiedUtf7::optimistic('.'), true);
/// Like `WIRE`, but also escapes the delimiter so that any name round-trips.
/// This is not RFC 3501-compliant.
pub const WIRE_PESSIMISTIC: Codec<ModifiedUtf7> =
    Codec::new(ModifiedUtf7::pessimistic('.'), true);
/// Storage row keys. The delimiter is assumed never to occur in names.
pub const STORAGE: Codec<Optimistic> =
    Codec::new(Optimistic::new('\u{241F}'), false);
/// Slash-separated paths with C-style escapes.
pub const PATH: Codec<Backslash> = Codec::new(Backslash::new('/'), true);
/// Search index keys.
pub const INDEX: Codec<Doubling> = Codec::new(Doubling::new(':'), false);
/// Builds whole-name regular expressions from wildcard patterns.
pub(crate) const SEARCH_PATTERN: Codec<SearchPattern> =
    Codec::new(SearchPattern::new(PLACEHOLDER), false);
/// Serialises candidates for matching against `SEARCH_PATTERN` output.
pub(crate) const SEARCH_SUBJECT: Codec<Optimistic> =
    Codec::new(Optimistic::new(PLACEHOLDER), false);

/// Runtime selection of one of the public named codecs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamedCodec {
    Wire,
    WirePessimistic,
    Storage,
    Path,
    Index,
}

impl NamedCodec {
    pub const ALL: [NamedCodec; 5] = [
        NamedCodec::Wire,
        NamedCodec::WirePessimistic,
        NamedCodec::Storage,
        NamedCodec::Path,
        NamedCodec::Index,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NamedCodec::Wire => "wire",
            NamedCodec::WirePessimistic => "wire-pessimistic",
            NamedCodec::Storage => "storage",
            NamedCodec::Path => "path",
            NamedCodec::Index => "index",
        }
    }

    pub fn delimiter(self) -> char {
        match self {
            NamedCodec::Wire => WIRE.delimiter(),
            NamedCodec::WirePessimistic => WIRE_PESSIMISTIC.delimiter(),
            NamedCodec::Storage => STORAGE.delimiter(),
            NamedCodec::Path => PATH.delimiter(),
            NamedCodec::Index => INDEX.delimiter(),
        }
    }

    pub fn encode_segments<'a>(
        self,
        segments: impl IntoIterator<Item = &'a str>,
    ) -> String {
        match self {
            NamedCodec::Wire => WIRE.encode_segments(segments),
            NamedCodec::WirePessimistic => {
                WIRE_PESSIMISTIC.encode_segments(segments)
            }
            NamedCodec::Storage => STORAGE.encode_segments(segments),
            NamedCodec::Path => PATH.encode_segments(segments),
            NamedCodec::Index => INDEX.encode_segments(segments),
        }
    }

    pub fn encode(self, name: &Name) -> String {
        self.encode_segments(name.segments())
    }

    pub fn decode(self, s: &str) -> Result<UnresolvedName, Error> {
        match self {
            NamedCodec::Wire => WIRE.decode(s),
            NamedCodec::WirePessimistic => WIRE_PESSIMISTIC.decode(s),
            NamedCodec::Storage => STORAGE.decode(s),
            NamedCodec::Path => PATH.decode(s),
            NamedCodec::Index => INDEX.decode(s),
        }
    }

    pub fn decode_name(self, s: &str, rooted: bool) -> Result<Name, Error> {
        match self {
            NamedCodec::Wire => WIRE.decode_name(s, rooted),
            NamedCodec::WirePessimistic => {
                WIRE_PESSIMISTIC.decode_name(s, rooted)
            }
            NamedCodec::Storage => STORAGE.decode_name(s, rooted),
            NamedCodec::Path => PATH.decode_name(s, rooted),
            NamedCodec::Index => INDEX.decode_name(s, rooted),
        }
    }
}

impl fmt::Display for NamedCodec {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NamedCodec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        NamedCodec::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or(Error::InvalidArgument("unknown codec"))
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn segs(n: &UnresolvedName) -> Vec<&str> {
        n.segments().collect()
    }

    #[test]
    fn storage_scenario() {
        let decoded = STORAGE.decode("#users\u{241F}joe\u{241F}Work").unwrap();
        assert_eq!(vec!["#users", "joe", "Work"], segs(&decoded));
        assert_eq!(
            "#users\u{241F}joe\u{241F}Work",
            STORAGE.encode_unresolved(&decoded)
        );
    }

    #[test]
    fn decode_delimiter_policy() {
        assert_eq!(vec!["a", "b"], segs(&PATH.decode("/a/b").unwrap()));
        assert_eq!(vec!["a", "b"], segs(&PATH.decode("a/b/").unwrap()));
        assert!(PATH.decode("").unwrap().is_empty());
        assert!(PATH.decode("/").unwrap().is_empty());
        assert_matches!(
            Err(Error::InvalidArgument(..)),
            PATH.decode("//a")
        );
        assert_matches!(
            Err(Error::InvalidArgument(..)),
            PATH.decode("a//b")
        );
        assert_matches!(
            Err(Error::InvalidArgument(..)),
            INDEX.decode(":a")
        );
        assert_eq!(vec!["a"], segs(&INDEX.decode("a:").unwrap()));
    }

    #[test]
    fn decode_rejects_nul_segments() {
        assert_matches!(
            Err(Error::InvalidArgument("NUL in name segment")),
            WIRE.decode("x&AAA-y")
        );
        assert_matches!(
            Err(Error::InvalidArgument("NUL in name segment")),
            WIRE.decode("a.x&AAA-y.b")
        );
        assert_matches!(
            Err(Error::InvalidArgument("NUL in name segment")),
            STORAGE.decode_name("#users\u{241F}j\0e", true)
        );
    }

    #[test]
    fn decode_name_sets_rootedness() {
        let name = STORAGE.decode_name("#users\u{241F}joe", true).unwrap();
        assert!(name.is_rooted());
        assert_eq!(Name::absolute(vec!["#users", "joe"]).unwrap(), name);
        assert_eq!("#users\u{241F}joe", STORAGE.encode(&name));
    }

    #[test]
    fn named_codec_lookup() {
        for &codec in &NamedCodec::ALL {
            assert_eq!(codec, codec.name().parse().unwrap());
        }
        assert_eq!(NamedCodec::Path, "PATH".parse().unwrap());
        assert_matches!(Err(Error::InvalidArgument(..)), "nx".parse::<NamedCodec>());
        assert_eq!('.', NamedCodec::Wire.delimiter());
        assert_eq!(
            "a\\/b/c",
            NamedCodec::Path.encode_segments(vec!["a/b", "c"])
        );
    }

    fn arb_segments() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[^\\x00\\n]{1,6}", 0..5)
    }

    proptest! {
        #[test]
        fn escaping_codecs_round_trip(segments in arb_segments()) {
            let refs = segments.iter().map(|s| &**s);
            for codec in &[NamedCodec::WirePessimistic, NamedCodec::Path] {
                let encoded = codec.encode_segments(refs.clone());
                let decoded = codec.decode(&encoded).unwrap();
                prop_assert_eq!(&segments, &decoded.segments()
                                .map(str::to_owned).collect::<Vec<_>>());
            }
        }

        #[test]
        fn doubling_round_trips_unless_segment_leads_with_delimiter(
            segments in arb_segments()
        ) {
            prop_assume!(segments.iter().skip(1).all(|s| !s.starts_with(':')));
            let encoded = INDEX.encode_segments(segments.iter().map(|s| &**s));
            let decoded = INDEX.decode(&encoded).unwrap();
            prop_assert_eq!(&segments, &decoded.segments()
                            .map(str::to_owned).collect::<Vec<_>>());
        }

        #[test]
        fn optimistic_codecs_round_trip_without_delimiter(
            segments in arb_segments()
        ) {
            for codec in &[NamedCodec::Wire, NamedCodec::Storage] {
                let delim = codec.delimiter();
                if segments.iter().any(|s| s.contains(delim)) {
                    continue;
                }
                let encoded = codec.encode_segments(segments.iter().map(|s| &**s));
                let decoded = codec.decode(&encoded).unwrap();
                prop_assert_eq!(&segments, &decoded.segments()
                                .map(str::to_owned).collect::<Vec<_>>());
            }
        }
    }
}
