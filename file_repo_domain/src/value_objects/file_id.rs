// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # FileId value object
//!
//! A time-ordered, sortable 128-bit identifier with a canonical lowercase
//! hex text form (spec.md §3, §4.1). Internally this wraps a ULID, whose
//! 48-bit millisecond timestamp occupies the high bits and whose 80 bits of
//! randomness occupy the low bits — exactly the layout the spec calls for.
//!
//! Generation goes through a process-local [`FileIdGenerator`] rather than
//! `Ulid::new()` directly: the ULID crate's own monotonic generator is what
//! gives us "strictly increasing per process, clamped to `last + 1ms` if the
//! clock hasn't advanced" (spec.md §4.1, §8) instead of merely "usually
//! increasing".

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use ulid::{Generator, Ulid};

use crate::error::RepoError;

/// Value stamped into the top nibble of the first random byte (byte index 6,
/// right after the 48-bit/6-byte timestamp) of every id this crate issues.
/// Lets `FileId::parse` reject ids that merely happen to be shaped like a
/// ULID but were never generated by [`FileIdGenerator`] (spec.md §4.1).
const FILE_ID_VERSION: u8 = 0x1;

fn version_nibble(bytes: &[u8; 16]) -> u8 {
    bytes[6] >> 4
}

fn stamp_version(mut bytes: [u8; 16]) -> [u8; 16] {
    bytes[6] = (FILE_ID_VERSION << 4) | (bytes[6] & 0x0F);
    bytes
}

/// 128-bit, time-ordered file identifier.
///
/// Canonical text form is the ULID's 26-character Crockford base32
/// representation, lowercased. `FileId::parse` accepts only that exact
/// shape; anything else (wrong length, invalid characters, a different
/// version's framing) is `RepoError::InvalidFileId`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FileId(Ulid);

impl FileId {
    /// Wraps an already-validated ULID. Prefer [`FileIdGenerator::next`] or
    /// [`FileId::parse`] outside of tests.
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn parse(s: &str) -> Result<Self, RepoError> {
        let ulid = Ulid::from_str(s).map_err(|e| RepoError::InvalidFileId(format!("{s:?}: {e}")))?;
        // Canonical form is lowercase; reject any other casing so that two
        // textually distinct strings never decode to the same "canonical"
        // representation a caller might have cached.
        if s != ulid.to_string().to_lowercase() {
            return Err(RepoError::InvalidFileId(format!("{s:?} is not in canonical lowercase form")));
        }
        if version_nibble(&ulid.to_bytes()) != FILE_ID_VERSION {
            return Err(RepoError::InvalidFileId(format!("{s:?} does not carry a recognized file id version")));
        }
        Ok(Self(ulid))
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.0.timestamp_ms()
    }

    /// Two bytes of sharding key derived from the canonical string, used by
    /// the path layout to bound directory fan-out (spec.md §3).
    pub fn shard(&self) -> (String, String) {
        let s = self.to_string();
        (s[9..11].to_string(), s[11..13].to_string())
    }
}

impl Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_string().to_lowercase())
    }
}

impl FromStr for FileId {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FileId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FileId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Process-local monotonic generator for [`FileId`]s.
///
/// Wraps `ulid::Generator`, which tracks the last-issued timestamp and
/// random tail and bumps the tail (carrying into the timestamp on overflow)
/// when two calls land in the same millisecond, satisfying the "never equal,
/// never backward" invariant in spec.md §4.1 and §8 even under a stalled
/// clock. A single `Mutex` gives every thread in the process the same
/// ordering guarantee; cloning a `FileIdGenerator` shares that state.
#[derive(Clone)]
pub struct FileIdGenerator {
    inner: std::sync::Arc<Mutex<Generator>>,
}

impl FileIdGenerator {
    pub fn new() -> Self {
        Self {
            inner: std::sync::Arc::new(Mutex::new(Generator::new())),
        }
    }

    /// Produces the next id. Always succeeds; `ulid::Generator` only errors
    /// once the random tail has exhausted 80 bits of the *same*
    /// millisecond, which cannot happen in practice before the clock ticks
    /// forward, so exhaustion is treated as "wait one tick and retry".
    pub fn next(&self) -> FileId {
        let mut gen = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Ok(ulid) = gen.generate() {
                let stamped = Ulid::from_bytes(stamp_version(ulid.to_bytes()));
                return FileId(stamped);
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }
}

impl Default for FileIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trip() {
        let gen = FileIdGenerator::new();
        let id = gen.next();
        let s = id.to_string();
        let parsed = FileId::parse(&s).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn canonical_form_is_lowercase() {
        let gen = FileIdGenerator::new();
        let id = gen.next();
        assert_eq!(id.to_string(), id.to_string().to_lowercase());
    }

    #[test]
    fn rejects_non_canonical_casing() {
        let gen = FileIdGenerator::new();
        let id = gen.next();
        let upper = id.to_string().to_uppercase();
        assert!(FileId::parse(&upper).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(FileId::parse("not-a-ulid").is_err());
        assert!(FileId::parse("").is_err());
    }

    #[test]
    fn rejects_a_well_formed_ulid_with_the_wrong_version_nibble() {
        let gen = FileIdGenerator::new();
        let id = gen.next();
        let mut bytes = id.as_ulid().to_bytes();
        bytes[6] = ((FILE_ID_VERSION + 1) << 4) | (bytes[6] & 0x0F);
        let wrong_version = Ulid::from_bytes(bytes).to_string().to_lowercase();
        assert!(FileId::parse(&wrong_version).is_err());
    }

    #[test]
    fn generator_stamps_the_recognized_version_nibble() {
        let gen = FileIdGenerator::new();
        let id = gen.next();
        assert_eq!(version_nibble(&id.as_ulid().to_bytes()), FILE_ID_VERSION);
    }

    #[test]
    fn generator_is_strictly_monotonic_single_threaded() {
        let gen = FileIdGenerator::new();
        let mut prev = gen.next();
        for _ in 0..1000 {
            let next = gen.next();
            assert!(next > prev, "ids must be strictly increasing");
            prev = next;
        }
    }

    #[test]
    fn generator_is_collision_free_across_threads() {
        let gen = FileIdGenerator::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let gen = gen.clone();
            handles.push(std::thread::spawn(move || {
                (0..200).map(|_| gen.next()).collect::<Vec<_>>()
            }));
        }
        let mut all = Vec::new();
        for h in handles {
            all.extend(h.join().unwrap());
        }
        let unique: std::collections::HashSet<_> = all.iter().cloned().collect();
        assert_eq!(unique.len(), all.len(), "no id may repeat even under thread contention");
    }

    #[test]
    fn two_distinct_ids_compare_unequal() {
        let gen = FileIdGenerator::new();
        let a = gen.next();
        let b = gen.next();
        assert_ne!(a, b);
    }

    #[test]
    fn serde_round_trip() {
        let gen = FileIdGenerator::new();
        let id = gen.next();
        let json = serde_json::to_string(&id).unwrap();
        let back: FileId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
