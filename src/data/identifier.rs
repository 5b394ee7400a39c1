//! Heading identifiers.
//!
//! An identifier is the canonical 36-character UUID text form
//! (`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`). Hex digits are accepted in
//! either case but never normalized: the index key is the text as written.

use serde::Serialize;
use std::{borrow::Borrow, fmt, str::FromStr};
use thiserror::Error;

/// Total length of the canonical form.
const IDENTIFIER_LEN: usize = 36;

/// Byte offsets that must hold a literal `-`.
const HYPHEN_OFFSETS: [usize; 4] = [8, 13, 18, 23];

/// Check whether `s` is a canonical identifier.
pub fn is_valid_identifier(s: &str) -> bool {
    s.len() == IDENTIFIER_LEN
        && s.bytes().enumerate().all(|(i, b)| {
            if HYPHEN_OFFSETS.contains(&i) {
                b == b'-'
            } else {
                b.is_ascii_hexdigit()
            }
        })
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("`{0}` is not a valid identifier (expected xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx)")]
pub struct InvalidIdentifier(pub String);

/// A validated identifier.
///
/// `Hash`/`Eq` match those of the inner `str`, so maps keyed by
/// `Identifier` can be queried with a plain `&str`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Validate and wrap, returning `None` for anything non-canonical.
    pub fn parse(s: &str) -> Option<Self> {
        is_valid_identifier(s).then(|| Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identifier {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidIdentifier(s.to_owned()))
    }
}

impl Borrow<str> for Identifier {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
