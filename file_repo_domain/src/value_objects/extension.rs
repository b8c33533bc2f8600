// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Extension value object
//!
//! The suffix a stored file or variant is given on disk (spec.md §3, §6).
//! Normalized to lowercase without a leading dot so that `"JPG"`, `"jpg"`
//! and `".jpg"` all address the same stored artifact, and validated against
//! a repository's configured allow-list at the point of use rather than
//! here — this type only guarantees the extension is *well-formed*.
//!
//! An extension may also be empty: a source file with no suffix at all is a
//! valid add, and its main file is named `$main$` with no trailing dot
//! (spec.md §3's "either empty or begins with `.`").

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::RepoError;

#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Extension(String);

impl Extension {
    pub fn parse(s: &str) -> Result<Self, RepoError> {
        let trimmed = s.strip_prefix('.').unwrap_or(s);
        if trimmed.is_empty() {
            return Ok(Self(String::new()));
        }
        if trimmed.len() > 32 {
            return Err(RepoError::InvalidExtension("extension exceeds 32 bytes".into()));
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RepoError::InvalidExtension(format!(
                "{s:?} contains characters other than ascii alphanumerics"
            )));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for a main file whose source had no extension at all; its data
    /// file is named `$main$` with no trailing dot (spec.md §3).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks membership against a configured allow-list, lowercasing each
    /// entry before comparing so operators can write the list either way in
    /// config files.
    pub fn is_allowed(&self, allow_list: &[String]) -> bool {
        allow_list.iter().any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&self.0))
    }
}

impl TryFrom<String> for Extension {
    type Error = RepoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Extension> for String {
    fn from(value: Extension) -> Self {
        value.0
    }
}

impl Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
