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

//! The naming and addressing layer of a multi-user mail store.
//!
//! Every operation on the store needs to agree on three things: the canonical
//! identity of a mailbox name independent of who is asking (`namespace`),
//! whether a name matches a `LIST`-style wildcard pattern (`query`), and how
//! names are written to and read from the wire, storage keys, and search
//! indices (`codec`). All of these operate on the immutable name types in
//! `name`.
//!
//! Nothing here performs I/O, other than loading configuration.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod codec;
pub mod name;
pub mod namespace;
pub mod query;
pub mod support;

pub use crate::codec::{Codec, NamedCodec};
pub use crate::name::{Name, UnresolvedName};
pub use crate::namespace::{Owner, Resolver};
pub use crate::query::Query;
pub use crate::support::config::NamespaceConfig;
pub use crate::support::error::Error;

#[cfg(test)]
static INIT_TEST_LOG: std::sync::Once = std::sync::Once::new();

#[cfg(test)]
fn init_test_log() {
    INIT_TEST_LOG.call_once(|| {
        fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} [{}][{}] {}",
                    chrono::Local::now().format("%H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message,
                ))
            })
            .level(log::LevelFilter::Trace)
            .chain(std::io::stderr())
            .apply()
            .unwrap();
    })
}
