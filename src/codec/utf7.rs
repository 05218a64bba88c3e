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

//! Modified UTF-7 as set by RFC 3501, section 5.1.3.
//!
//! Printable ASCII other than `&` is represented as itself. `&` is
//! represented as `&-`. Any run of other characters is converted to UTF-16,
//! encoded with a variant of base64 which uses `,` instead of `/` and no
//! padding, and enclosed between `&` and `-`.
//!
//! Unlike a general-purpose UTF-7 decoder, decoding here is strict: an
//! unterminated shift sequence, a character outside the base64 alphabet, or
//! a sextet stream which does not describe whole valid UTF-16 units is
//! rejected rather than passed through.

use super::{Escaper, Unescaper};
use crate::support::error::Error;

const SHIFT_IN: char = '&';
const SHIFT_OUT: char = '-';

/// The Modified UTF-7 escaping strategy.
#[derive(Clone, Copy, Debug)]
pub struct ModifiedUtf7 {
    delimiter: char,
    escape_delimiter: bool,
}

impl ModifiedUtf7 {
    /// The RFC 3501-compliant strategy.
    ///
    /// The delimiter is printable ASCII and so is never escaped; a segment
    /// containing it cannot be represented.
    pub const fn optimistic(delimiter: char) -> Self {
        ModifiedUtf7 {
            delimiter,
            escape_delimiter: false,
        }
    }

    /// A non-compliant strategy which additionally forces the delimiter into
    /// shift sequences, so that any segment can be represented.
    pub const fn pessimistic(delimiter: char) -> Self {
        ModifiedUtf7 {
            delimiter,
            escape_delimiter: true,
        }
    }

    fn is_direct(&self, ch: char) -> bool {
        ch >= ' '
            && ch <= '~'
            && SHIFT_IN != ch
            && !(self.escape_delimiter && self.delimiter == ch)
    }
}

impl Escaper for ModifiedUtf7 {
    fn delimiter(&self) -> char {
        self.delimiter
    }

    fn needs_escape(&self, ch: char) -> bool {
        !self.is_direct(ch)
    }

    fn escape(&self, rest: &str, dst: &mut String) -> usize {
        if rest.starts_with(SHIFT_IN) {
            dst.push(SHIFT_IN);
            dst.push(SHIFT_OUT);
            return SHIFT_IN.len_utf8();
        }

        // Pack every consecutive indirect character into one run
        let run_len = rest
            .char_indices()
            .find(|&(_, ch)| self.is_direct(ch) || SHIFT_IN == ch)
            .map_or(rest.len(), |(ix, _)| ix);

        let mut buf = Vec::<u8>::with_capacity(run_len * 2);
        for unit in rest[..run_len].encode_utf16() {
            buf.extend_from_slice(&unit.to_be_bytes());
        }

        dst.push(SHIFT_IN);
        dst.push_str(&base64::encode_config(&buf, base64::IMAP_MUTF7));
        dst.push(SHIFT_OUT);
        run_len
    }
}

impl Unescaper for ModifiedUtf7 {
    fn is_escape_sequence(&self, rest: &str) -> bool {
        rest.starts_with(SHIFT_IN)
    }

    fn unescape(&self, rest: &str, dst: &mut String) -> Result<usize, Error> {
        let body = &rest[SHIFT_IN.len_utf8()..];
        let end = body
            .find(SHIFT_OUT)
            .ok_or(Error::EscapeCorruption("unterminated shift sequence"))?;
        let encoded = &body[..end];
        let consumed = SHIFT_IN.len_utf8() + end + SHIFT_OUT.len_utf8();

        if encoded.is_empty() {
            dst.push(SHIFT_IN);
            return Ok(consumed);
        }

        if !encoded.bytes().all(is_base64_char) {
            return Err(Error::EscapeCorruption("invalid sextet"));
        }

        let bytes = base64::decode_config(encoded, base64::IMAP_MUTF7)
            .map_err(|_| Error::EscapeCorruption("invalid sextet"))?;
        if 0 != bytes.len() % 2 {
            return Err(Error::EscapeCorruption(
                "shift sequence ends mid code unit",
            ));
        }

        let units = bytes
            .chunks(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect::<Vec<_>>();
        let decoded = String::from_utf16(&units)
            .map_err(|_| Error::EscapeCorruption("unpaired surrogate"))?;
        dst.push_str(&decoded);
        Ok(consumed)
    }
}

fn is_base64_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || b'+' == ch || b',' == ch
}
