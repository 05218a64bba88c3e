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

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::support::error::Error;

/// The configuration of the naming layer.
///
/// This is normally stored in a TOML file alongside the rest of the mail
/// store configuration. Every section is optional.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct NamespaceConfig {
    /// The client-visible namespace prefixes.
    #[serde(default)]
    pub namespaces: NamespaceTokens,
}

/// The tokens clients use as the first segment of a name to select a
/// namespace.
///
/// An empty token disables the corresponding namespace entirely. Non-empty
/// tokens must begin with `#`, since a first segment without that marker is
/// always taken to be a relative name.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct NamespaceTokens {
    /// Explicit prefix for the current user's own mailboxes.
    ///
    /// `INBOX` always selects the personal namespace regardless of this
    /// setting.
    pub personal: String,
    /// Prefix under which other users' mailboxes are visible, addressed as
    /// `<prefix>/<user>/...`.
    pub other_users: String,
    /// Prefix under which shared (group-owned) mailboxes are visible.
    pub shared: String,
}

impl Default for NamespaceTokens {
    fn default() -> Self {
        NamespaceTokens {
            personal: "#personal".to_owned(),
            other_users: "#users".to_owned(),
            shared: "#shared".to_owned(),
        }
    }
}

impl NamespaceConfig {
    /// Parse a configuration from TOML text.
    pub fn parse(text: &str) -> Result<Self, Error> {
        let config: NamespaceConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let mut text = String::new();
        fs::File::open(path.as_ref())?.read_to_string(&mut text)?;
        NamespaceConfig::parse(&text)
    }

    fn validate(&self) -> Result<(), Error> {
        let tokens = [
            &self.namespaces.personal,
            &self.namespaces.other_users,
            &self.namespaces.shared,
        ];

        for (ix, token) in tokens.iter().enumerate() {
            if token.is_empty() {
                continue;
            }

            if !token.starts_with('#') {
                return Err(Error::InvalidArgument(
                    "namespace tokens must begin with '#'",
                ));
            }

            if tokens[..ix].contains(token) {
                return Err(Error::InvalidArgument(
                    "namespace tokens must be distinct",
                ));
            }
        }

        Ok(())
    }
}
