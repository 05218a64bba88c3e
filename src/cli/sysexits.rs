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

//! Constants from `sysexits.h`
//!
//! The subset relevant to the naming tool, plus the mapping from library
//! errors onto them.

use mailspace::Error;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub struct Sysexit(pub i32);

pub const EX_USAGE: Sysexit = Sysexit(64);
pub const EX_DATAERR: Sysexit = Sysexit(65);
pub const EX_SOFTWARE: Sysexit = Sysexit(70);
pub const EX_IOERR: Sysexit = Sysexit(74);
pub const EX_CONFIG: Sysexit = Sysexit(78);

impl Sysexit {
    pub fn exit(self) -> ! {
        std::process::exit(self.0)
    }

    /// The exit code to use when an operation fails with `err`.
    pub fn for_error(err: &Error) -> Self {
        match *err {
            Error::InvalidArgument(..)
            | Error::IndexOutOfBounds { .. }
            | Error::UnknownNamespace(..)
            | Error::UnrootedQuery
            | Error::EscapeCorruption(..) => EX_DATAERR,
            Error::Io(..) => EX_IOERR,
            Error::Config(..) => EX_CONFIG,
        }
    }
}
