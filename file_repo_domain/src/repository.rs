// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Repository contract
//!
//! `FileRepository` is the domain-level port every storage backend must
//! satisfy: two-phase add/delete with crash-safe recovery, variant
//! management, and a resolver-driven cleanup sweep (spec.md §3, §4, §7).
//! The only implementation in this codebase is a plain-filesystem one, but
//! nothing here assumes that — a caller programs against this trait, never
//! against a concrete repository type.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::cancellation::CancellationToken;
use crate::error::RepoError;
use crate::value_objects::{Extension, FileId, VariantId};

/// Outcome the cleanup sweep's resolver callback returns for each
/// indeterminate entry it finds (spec.md §7): `Keep` finishes the commit
/// that was interrupted, `Delete` rolls it back, both idempotently.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Resolution {
    Keep,
    Delete,
}

/// Immediate or delayed delete, matching the two delete semantics spec.md
/// §4.5 distinguishes: an immediate delete removes the marker and the
/// stored file in one step, a delayed delete only marks intent and leaves
/// removal to the next cleanup sweep.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DeleteMode {
    Immediate,
    Delayed,
}

/// Result of a variant add that may race an identical one already on disk
/// (spec.md §6): a caller must be able to tell "I just wrote this" from "it
/// was already there", since only the former needs e.g. a thumbnail
/// regenerated downstream.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum VariantOutcome {
    Added(PathBuf),
    AlreadyExists(PathBuf),
}

impl VariantOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Added(p) | Self::AlreadyExists(p) => p,
        }
    }

    pub fn was_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// A resolver invoked once per indeterminate marker found during a cleanup
/// sweep. Implementations typically ask an external source of truth
/// ("did the caller that started this add ever receive a success
/// response?") whether the interrupted operation should be finished or
/// undone.
#[async_trait]
pub trait CleanupResolver: Send + Sync {
    async fn resolve(&self, file_id: FileId, variant: Option<&VariantId>) -> Resolution;
}

/// The storage contract a file repository backend implements.
///
/// All operations are keyed by `(FileId, Option<VariantId>)`; `None`
/// addresses the file's primary content, `Some(variant)` one of its named
/// variants. Every mutating operation is expected to serialize against
/// concurrent calls for the same key (spec.md §4.3) and to be safe to
/// retry after a crash (spec.md §4, §7).
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Prepares the repository root for use: creates the directory layout
    /// if missing, acquires the process-wide advisory lock, and performs an
    /// I/O health probe (spec.md §4.2).
    async fn init(&self) -> Result<(), RepoError>;

    /// True if the most recent health probe succeeded. Does not perform I/O
    /// itself; `init` and the periodic probe are what update this.
    fn is_healthy(&self) -> bool;

    /// Stages `source`, runs `processors` over it, and writes it into place
    /// as the primary content for `file_id` (allocating a fresh one if
    /// `file_id` is `None`), leaving behind the `.ind` marker that records
    /// the add as still in progress (spec.md §4.4 step 6, §4.7).
    ///
    /// This is the low-level primitive [`crate::transaction::Transaction`]
    /// drives directly: a standalone call, with nothing ever calling
    /// [`FileRepository::finalize_add`] for this id, leaves the file
    /// genuinely indeterminate — invisible to `get` — exactly as if the
    /// process had crashed right after the rename (spec.md §8 S3). Callers
    /// that want a one-shot committed add should go through a `Transaction`
    /// instead of calling this directly.
    async fn add(
        &self,
        file_id: Option<FileId>,
        source: &Path,
        extension: &Extension,
        processors: &[&'static str],
        cancel: &CancellationToken,
    ) -> Result<(FileId, PathBuf), RepoError>;

    /// Removes the `.ind` marker left by [`FileRepository::add`], making the
    /// file visible to `get`. The commit point for a transactional add
    /// (spec.md §4.7). Idempotent: a missing marker is not an error.
    async fn finalize_add(&self, file_id: FileId) -> Result<(), RepoError>;

    /// Undoes an uncommitted add: physically removes the file and its
    /// `.ind` marker. The rollback point for a transactional add, and also
    /// what a transaction uses when a caller deletes an id it added earlier
    /// in the same transaction (spec.md §4.7). Idempotent.
    async fn abort_add(&self, file_id: FileId) -> Result<(), RepoError>;

    /// Marks `file_id` as pending delete by writing its `.ind` marker,
    /// without removing anything yet (spec.md §4.7's transactional delete,
    /// distinct from the immediate/delayed convenience delete below).
    /// Fails with `RepoError::InProgress` if an add or another pending
    /// delete already holds the marker (spec.md §8 S5).
    async fn begin_delete(&self, file_id: FileId) -> Result<(), RepoError>;

    /// Commits a transactional delete: writes the `.del` marker and drops
    /// the `.ind` marker written by `begin_delete`, leaving the actual
    /// removal to the next cleanup sweep.
    async fn finalize_delete(&self, file_id: FileId) -> Result<(), RepoError>;

    /// Rolls back a transactional delete by removing the `.ind` marker
    /// `begin_delete` wrote, restoring the file's visibility.
    async fn cancel_delete(&self, file_id: FileId) -> Result<(), RepoError>;

    /// Returns the on-disk path of the committed primary content or named
    /// variant for `file_id`. `RepoError::NotFound` if nothing is
    /// committed under that key.
    async fn get(&self, file_id: FileId, variant: Option<&VariantId>) -> Result<PathBuf, RepoError>;

    /// Returns the path of `variant`, adding it from `source` first if it
    /// doesn't already exist (spec.md §6). Blocks on the per-variant lock
    /// like a normal add.
    async fn get_or_add_variant(
        &self,
        file_id: FileId,
        variant: &VariantId,
        source: &Path,
        extension: &Extension,
        processors: &[&'static str],
        cancel: &CancellationToken,
    ) -> Result<PathBuf, RepoError>;

    /// Adds `variant` if it doesn't already exist, distinguishing the two
    /// outcomes for the caller (spec.md §6). Blocks on the per-variant lock.
    async fn add_variant(
        &self,
        file_id: FileId,
        variant: &VariantId,
        source: &Path,
        extension: &Extension,
        processors: &[&'static str],
        cancel: &CancellationToken,
    ) -> Result<VariantOutcome, RepoError>;

    /// Same as `add_variant`, but never blocks longer than a single
    /// zero-timeout lock attempt: on contention it returns
    /// `RepoError::InProgress` instead of waiting (spec.md §8).
    async fn try_add_variant(
        &self,
        file_id: FileId,
        variant: &VariantId,
        source: &Path,
        extension: &Extension,
        processors: &[&'static str],
        cancel: &CancellationToken,
    ) -> Result<VariantOutcome, RepoError>;

    /// Deletes the primary content or named variant for `file_id`,
    /// immediately or by marking it for the next cleanup sweep, per `mode`
    /// (spec.md §4.5). Deleting a file with no remaining variants removes
    /// the file's shard entry entirely once the sweep runs.
    async fn delete(&self, file_id: FileId, variant: Option<&VariantId>, mode: DeleteMode) -> Result<(), RepoError>;

    /// Lists the variant ids currently committed for `file_id`.
    async fn list_variants(&self, file_id: FileId) -> Result<Vec<VariantId>, RepoError>;

    /// Sweeps indeterminate (`.ind`) and delayed-delete (`.del`) markers,
    /// asking `resolver` how to settle each indeterminate one, and
    /// returns the number of markers it resolved (spec.md §7). Errors
    /// encountered for individual entries are aggregated rather than
    /// aborting the sweep; see `RepoError` category `internal` for what a
    /// multi-error sweep collapses to.
    async fn cleanup(&self, resolver: &dyn CleanupResolver, cancel: &CancellationToken) -> Result<usize, RepoError>;

    /// Extension allow-list this repository was configured with, `None` if
    /// unrestricted.
    fn allowed_extensions(&self) -> Option<&[String]>;
}

/// Looks up a named processor so infrastructure can assemble a
/// [`crate::pipeline::ProcessorChain`] from the `&[&'static str]` names an
/// `add` call is given, without the domain layer knowing how processors are
/// registered.
pub trait ProcessorRegistry: Send + Sync {
    fn lookup(&self, name: &str) -> Option<std::sync::Arc<dyn crate::pipeline::Processor>>;
}
