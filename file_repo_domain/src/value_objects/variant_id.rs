// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # VariantId value object
//!
//! Identifies one named variant of a file (a thumbnail, a transcoded copy,
//! ...). Spec.md §3 requires variant identifiers to be stable, filesystem-
//! safe strings, normalized to lowercase so two callers spelling the same
//! variant differently (`"Thumb"` vs `"thumb"`) address the same on-disk
//! entry; normalization here is what keeps the on-disk marker naming scheme
//! (`"<file-id> <variant>.del"`, SPEC_FULL.md §E.2) collision-free and
//! rejects anything that would escape its shard directory.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::RepoError;

const MAX_LEN: usize = 128;

/// A normalized variant name: non-empty, at most 128 bytes, ASCII
/// alphanumeric plus `-`, `_`, lowercased, and never containing a `.`,
/// space, path separator, or the NUL byte (which would break either the
/// marker-file naming scheme or the filesystem path layout).
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VariantId(String);

impl VariantId {
    pub fn parse(s: &str) -> Result<Self, RepoError> {
        if s.is_empty() {
            return Err(RepoError::InvalidVariantId("variant id must not be empty".into()));
        }
        if s.len() > MAX_LEN {
            return Err(RepoError::InvalidVariantId(format!("variant id exceeds {MAX_LEN} bytes")));
        }
        if !s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_')) {
            return Err(RepoError::InvalidVariantId(format!(
                "{s:?} contains characters other than ascii alphanumerics, '-', '_'"
            )));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VariantId {
    type Error = RepoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VariantId> for String {
    fn from(value: VariantId) -> Self {
        value.0
    }
}

impl Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_names() {
        assert!(VariantId::parse("thumbnail").is_ok());
        assert!(VariantId::parse("thumb-256x256-v2").is_ok());
        assert!(VariantId::parse("a_b_c").is_ok());
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert!(VariantId::parse("").is_err());
        assert!(VariantId::parse(&"a".repeat(MAX_LEN + 1)).is_err());
    }

    #[test]
    fn rejects_spaces_separators_and_dots() {
        assert!(VariantId::parse("has space").is_err());
        assert!(VariantId::parse("has/slash").is_err());
        assert!(VariantId::parse("has\\backslash").is_err());
        assert!(VariantId::parse(".").is_err());
        assert!(VariantId::parse("..").is_err());
        assert!(VariantId::parse("thumb.v2").is_err());
    }

    #[test]
    fn normalizes_to_lowercase() {
        let v = VariantId::parse("Thumb-256X256").unwrap();
        assert_eq!(v.as_str(), "thumb-256x256");
        assert_eq!(v, VariantId::parse("thumb-256x256").unwrap());
    }

    #[test]
    fn idempotent_round_trip() {
        let v = VariantId::parse("thumb-256").unwrap();
        let again = VariantId::parse(v.as_str()).unwrap();
        assert_eq!(v, again);
    }
}
