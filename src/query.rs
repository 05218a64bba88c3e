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

//! Compilation of `LIST`-style wildcard patterns.
//!
//! A pattern may contain two wildcards. `*` matches any run of characters,
//! including the hierarchy delimiter, and so can span several segments. `%`
//! matches any run of characters within a single segment.
//!
//! A `Query` is compiled once and then tested against every candidate name
//! storage returns. The matching strategy is chosen at compile time from a
//! single scan of the pattern:
//!
//! - Without wildcards, a candidate must equal the pattern.
//!
//! - With only `%`, a candidate must have exactly as many segments as the
//!   pattern; wildcard-free segments must be equal, while the others are
//!   matched by a per-segment regex.
//!
//! - With any `*`, segment boundaries are meaningless, so the pattern is
//!   translated into one regex over the whole name, with segments joined by
//!   a placeholder that never occurs in real names. `%` becomes "anything but
//!   the placeholder".

use std::sync::Arc;

use log::trace;
use regex::Regex;

use crate::codec::{SEARCH_PATTERN, SEARCH_SUBJECT};
use crate::name::Name;
use crate::support::error::Error;

/// Wildcard matching any run of characters, including delimiters.
pub const FREE_WILDCARD: char = '*';
/// Wildcard matching any run of characters within one segment.
pub const LOCAL_WILDCARD: char = '%';

/// Whether `s` contains either wildcard.
pub fn contains_wildcard(s: &str) -> bool {
    s.contains(|c| FREE_WILDCARD == c || LOCAL_WILDCARD == c)
}

/// The strategy a `Query` uses to test candidates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    Domestic,
    Wild,
}

/// A compiled wildcard pattern, anchored to an absolute base.
#[derive(Clone, Debug)]
pub struct Query {
    base: Name,
    expression: Name,
    resolved_expression: Name,
    matcher: Matcher,
}

impl Query {
    /// Compile `expression` relative to `base`.
    ///
    /// The combined pattern must either be rooted or begin with a wildcard;
    /// otherwise there is nothing to anchor it to and `UnrootedQuery` is
    /// returned.
    pub fn new(base: &Name, expression: &Name) -> Result<Self, Error> {
        let resolved_expression = base.relative(expression);

        let leading_wildcard = resolved_expression
            .first()
            .map_or(false, |s| {
                s.starts_with(|c| FREE_WILDCARD == c || LOCAL_WILDCARD == c)
            });
        if !resolved_expression.is_rooted() && !leading_wildcard {
            return Err(Error::UnrootedQuery);
        }

        let matcher = Matcher::compile(&resolved_expression)?;
        trace!(
            "Compiled query {:?} with {:?} strategy",
            resolved_expression,
            matcher.strategy()
        );

        Ok(Query {
            base: base.clone(),
            expression: expression.clone(),
            resolved_expression,
            matcher,
        })
    }

    pub fn base(&self) -> &Name {
        &self.base
    }

    pub fn expression(&self) -> &Name {
        &self.expression
    }

    /// The absolute pattern, i.e., `expression` interpreted relative to
    /// `base`.
    pub fn resolved_expression(&self) -> &Name {
        &self.resolved_expression
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.matcher.strategy()
    }

    /// Whether the pattern contains any wildcard.
    pub fn is_wild(&self) -> bool {
        MatchStrategy::Exact != self.strategy()
    }

    /// Test whether `name` matches the pattern.
    pub fn is_expression_match(&self, name: &Name) -> bool {
        self.matcher.matches(&self.resolved_expression, name)
    }
}

#[derive(Clone, Debug)]
enum Matcher {
    Exact,
    Domestic(Vec<SegmentMatcher>),
    Wild(Regex),
}

#[derive(Clone, Debug)]
enum SegmentMatcher {
    Literal(Arc<str>),
    Pattern(Regex),
}

impl Matcher {
    fn compile(pattern: &Name) -> Result<Self, Error> {
        let mut has_free = false;
        let mut has_local = false;
        for segment in pattern.segments() {
            has_free |= segment.contains(FREE_WILDCARD);
            has_local |= segment.contains(LOCAL_WILDCARD);
        }

        if has_free {
            Matcher::wild(pattern)
        } else if has_local {
            Matcher::domestic(pattern)
        } else {
            Ok(Matcher::Exact)
        }
    }

    fn wild(pattern: &Name) -> Result<Self, Error> {
        Ok(Matcher::Wild(compile_regex(
            &SEARCH_PATTERN.encode(pattern),
        )?))
    }

    fn domestic(pattern: &Name) -> Result<Self, Error> {
        pattern
            .raw_segments()
            .iter()
            .map(|segment| {
                if segment.contains(LOCAL_WILDCARD) {
                    let mut rx = String::new();
                    SEARCH_PATTERN.encode_segment(segment, &mut rx);
                    Ok(SegmentMatcher::Pattern(compile_regex(&rx)?))
                } else {
                    Ok(SegmentMatcher::Literal(Arc::clone(segment)))
                }
            })
            .collect::<Result<Vec<_>, Error>>()
            .map(Matcher::Domestic)
    }

    fn strategy(&self) -> MatchStrategy {
        match *self {
            Matcher::Exact => MatchStrategy::Exact,
            Matcher::Domestic(..) => MatchStrategy::Domestic,
            Matcher::Wild(..) => MatchStrategy::Wild,
        }
    }

    fn matches(&self, pattern: &Name, name: &Name) -> bool {
        match *self {
            Matcher::Exact => pattern.raw_segments() == name.raw_segments(),
            Matcher::Domestic(ref segments) => {
                segments.len() == name.segment_count()
                    && segments.iter().zip(name.segments()).all(
                        |(matcher, segment)| match *matcher {
                            SegmentMatcher::Literal(ref lit) => {
                                **lit == *segment
                            }
                            SegmentMatcher::Pattern(ref rx) => {
                                rx.is_match(segment)
                            }
                        },
                    )
            }
            Matcher::Wild(ref rx) => rx.is_match(&SEARCH_SUBJECT.encode(name)),
        }
    }
}

fn compile_regex(body: &str) -> Result<Regex, Error> {
    Regex::new(&format!("(?s)^(?:{})$", body))
        .map_err(|_| Error::InvalidArgument("pattern too complex"))
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn abs(s: &[&str]) -> Name {
        Name::absolute(s.iter().copied()).unwrap()
    }

    fn rel(s: &[&str]) -> Name {
        Name::new(s.iter().copied(), false).unwrap()
    }

    fn matches(pattern: &[&str], name: &[&str]) -> bool {
        Query::new(&Name::empty(), &abs(pattern))
            .unwrap()
            .is_expression_match(&abs(name))
    }

    #[test]
    fn strategy_selection() {
        crate::init_test_log();
        let base = abs(&["#users", "joe"]);
        let q = |e: &[&str]| Query::new(&base, &rel(e)).unwrap().strategy();
        assert_eq!(MatchStrategy::Exact, q(&["Drafts"]));
        assert_eq!(MatchStrategy::Domestic, q(&["Dr%", "x"]));
        assert_eq!(MatchStrategy::Wild, q(&["Dr%", "*"]));
        assert!(!Query::new(&base, &rel(&["x"])).unwrap().is_wild());
    }

    #[test]
    fn free_crosses_delimiters_local_does_not() {
        crate::init_test_log();
        assert!(matches(&["INBOX", "*"], &["INBOX", "sub", "subsub"]));
        assert!(!matches(&["INBOX", "%"], &["INBOX", "sub", "subsub"]));
        assert!(matches(&["INBOX", "%"], &["INBOX", "sub"]));
        assert!(!matches(&["INBOX", "*"], &["INBOX"]));

        assert!(matches(&["INB*X"], &["INBOX"]));
        assert!(matches(&["INB*X"], &["INB", "BOX"]));
        assert!(!matches(&["INB*X"], &["INBOX", "plugh"]));
        assert!(matches(&["INB%X"], &["INBOX"]));
        assert!(!matches(&["INB%X"], &["INB", "BOX"]));
        assert!(matches(&["INB%", "*"], &["INBOX", "a", "b"]));
        assert!(!matches(&["INB%", "*"], &["IN", "BOX", "a"]));
        assert!(matches(&["%X"], &["INBOX"]));
        assert!(!matches(&["%X"], &["foo", "boX"]));
        assert!(matches(&["*X"], &["foo", "boX"]));
    }

    #[test]
    fn literals_are_not_metacharacters() {
        crate::init_test_log();
        assert!(matches(&["a.b", "%"], &["a.b", "c"]));
        assert!(!matches(&["a.b", "%"], &["axb", "c"]));
        assert!(!matches(&["a.b", "*"], &["axb", "c"]));
        assert!(matches(&["(x)", "*"], &["(x)", "y"]));
        assert!(matches(&["[a]%"], &["[a]b"]));
        assert!(!matches(&["[a]%"], &["ab"]));
        assert!(matches(&["a\nb%"], &["a\nbc"]));
        assert!(matches(&["*"], &["line\nbreak"]));
    }

    #[test]
    fn placeholder_cannot_appear_in_candidates() {
        crate::init_test_log();
        // The whole-name matcher joins segments with NUL, so no name may
        // carry one, however it was produced.
        assert_matches!(
            Err(Error::InvalidArgument(..)),
            Name::absolute(vec!["x\0y"])
        );
        assert_matches!(
            Err(Error::InvalidArgument(..)),
            abs(&["x"]).child("\0")
        );
        assert_matches!(
            Err(Error::InvalidArgument(..)),
            crate::codec::WIRE.decode("x&AAA-y")
        );

        // Without such names, `*` only crosses real segment boundaries
        assert!(matches(&["x", "*"], &["x", "y"]));
        assert!(!matches(&["x", "*"], &["xy"]));
        assert!(matches(&["x%"], &["x.y"]));
    }

    #[test]
    fn local_matcher_scenario() {
        crate::init_test_log();
        let base = abs(&["#users", "joe"]);
        let query = Query::new(&base, &rel(&["%"])).unwrap();
        assert_eq!(
            &abs(&["#users", "joe", "%"]),
            query.resolved_expression()
        );
        assert!(query.is_expression_match(&abs(&["#users", "joe", "Drafts"])));
        assert!(!query
            .is_expression_match(&abs(&["#users", "joe", "Drafts", "Sub"])));
        assert!(
            !query.is_expression_match(&abs(&["#users", "jane", "Drafts"]))
        );
    }

    #[test]
    fn free_matcher_scenario() {
        crate::init_test_log();
        let query =
            Query::new(&Name::empty(), &abs(&["#users", "*"])).unwrap();
        assert!(query
            .is_expression_match(&abs(&["#users", "joe", "Drafts", "Sub"])));
        assert!(!query.is_expression_match(&abs(&["#shared", "x"])));
    }

    #[test]
    fn rooted_expression_replaces_base() {
        crate::init_test_log();
        let query =
            Query::new(&abs(&["#users", "joe"]), &abs(&["#shared", "%"]))
                .unwrap();
        assert_eq!(&abs(&["#shared", "%"]), query.resolved_expression());
        assert_eq!(&abs(&["#users", "joe"]), query.base());
        assert_eq!(&abs(&["#shared", "%"]), query.expression());
    }

    #[test]
    fn unrooted_queries() {
        crate::init_test_log();
        assert_matches!(
            Err(Error::UnrootedQuery),
            Query::new(&Name::empty(), &rel(&["Drafts"]))
        );
        assert_matches!(
            Err(Error::UnrootedQuery),
            Query::new(&rel(&["a"]), &rel(&["%"]))
        );
        assert_matches!(
            Err(Error::UnrootedQuery),
            Query::new(&Name::empty(), &Name::empty())
        );

        let bare = Query::new(&Name::empty(), &rel(&["*"])).unwrap();
        assert!(bare.is_expression_match(&abs(&["#users", "joe"])));
        let bare = Query::new(&Name::empty(), &rel(&["%"])).unwrap();
        assert!(bare.is_expression_match(&abs(&["#users"])));
        assert!(!bare.is_expression_match(&abs(&["#users", "joe"])));
    }

    fn arb_literal_name() -> impl Strategy<Value = Name> {
        prop::collection::vec("[a-c.()]{1,3}", 1..4)
            .prop_map(|s| Name::absolute(s).unwrap())
    }

    proptest! {
        #[test]
        fn wild_and_exact_strategies_agree(
            pattern in arb_literal_name(),
            candidate in arb_literal_name(),
        ) {
            let wild = Matcher::wild(&pattern).unwrap();
            let exact = Matcher::compile(&pattern).unwrap();
            prop_assert_eq!(MatchStrategy::Exact, exact.strategy());
            prop_assert_eq!(
                exact.matches(&pattern, &candidate),
                wild.matches(&pattern, &candidate)
            );
            prop_assert!(wild.matches(&pattern, &pattern));
        }

        #[test]
        fn wild_and_domestic_strategies_agree(
            pattern in prop::collection::vec("[ab%]{1,3}", 1..4),
            candidate in arb_literal_name(),
        ) {
            let pattern = Name::absolute(pattern).unwrap();
            let wild = Matcher::wild(&pattern).unwrap();
            let domestic = Matcher::domestic(&pattern).unwrap();
            prop_assert_eq!(
                domestic.matches(&pattern, &candidate),
                wild.matches(&pattern, &candidate)
            );
        }
    }
}
