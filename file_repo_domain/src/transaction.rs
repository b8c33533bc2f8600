// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transaction coordinator
//!
//! A `Transaction` does not buffer work in memory and replay it later: per
//! spec.md §4.7, `add` and `delete` call straight through to the repository
//! the moment they're invoked, so a crash between either of those calls and
//! `commit` leaves real, recoverable debris on disk for `clean` to find —
//! the same `.ind` marker an untransacted `add` would leave (spec.md §8 S3).
//! `commit` and `rollback` only settle markers that are already there:
//! dropping `.ind` for adds, writing `.del` and dropping `.ind` for deletes,
//! or physically undoing an add, in that order, adds before deletes, so a
//! delete racing a rename within the same transaction never observes a
//! half-finished add.
//!
//! Per spec.md §9, a transaction never throws out of `commit`/`rollback`.
//! Failures are aggregated and handed to whichever `on_commit_failed` /
//! `on_rollback_failed` closure the caller installed; with none installed
//! they are silently dropped, since this crate carries no logging facility
//! of its own (that's `file_repo`'s concern, not the domain's).

use crate::cancellation::CancellationToken;
use crate::error::ErrorAggregate;
use crate::repository::FileRepository;
use crate::value_objects::{Extension, FileId};
use std::path::{Path, PathBuf};

type FailureHandler = Box<dyn FnMut(crate::error::RepoError) + Send>;

/// Batches a set of adds and deletes, issuing each against the repository
/// immediately, so the transaction can commit or roll them back as a unit
/// (spec.md §4.7, §6).
pub struct Transaction<'a> {
    repo: &'a dyn FileRepository,
    added: Vec<FileId>,
    deleted: Vec<FileId>,
    commit_failed: Option<FailureHandler>,
    rollback_failed: Option<FailureHandler>,
}

impl<'a> Transaction<'a> {
    pub fn new(repo: &'a dyn FileRepository) -> Self {
        Self {
            repo,
            added: Vec::new(),
            deleted: Vec::new(),
            commit_failed: None,
            rollback_failed: None,
        }
    }

    /// Installs the handler `commit` delivers aggregated failures to,
    /// instead of throwing them (spec.md §9).
    pub fn on_commit_failed(mut self, handler: impl FnMut(crate::error::RepoError) + Send + 'static) -> Self {
        self.commit_failed = Some(Box::new(handler));
        self
    }

    /// Installs the handler `rollback` delivers aggregated failures to.
    pub fn on_rollback_failed(mut self, handler: impl FnMut(crate::error::RepoError) + Send + 'static) -> Self {
        self.rollback_failed = Some(Box::new(handler));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }

    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.len()
    }

    /// Adds `source` as a new file's primary content, or attaches it to
    /// `file_id` if given. Calls straight through to the repository: the
    /// file lands on disk and its `.ind` marker is written before this
    /// returns, matching `Transaction::add(stream, extension, leave_open,
    /// pipeline) -> (FileId, Path)` in spec.md §6 (`leave_open`/`pipeline`
    /// correspond to the processor chain named by `processors` here).
    pub async fn add(
        &mut self,
        file_id: Option<FileId>,
        source: &Path,
        extension: &Extension,
        processors: &[&'static str],
        cancel: &CancellationToken,
    ) -> Result<(FileId, PathBuf), crate::error::RepoError> {
        let (id, path) = self.repo.add(file_id, source, extension, processors, cancel).await?;
        self.added.push(id);
        Ok((id, path))
    }

    /// Deletes `file_id`. If this same transaction added `file_id` earlier,
    /// the add is rolled back immediately (the file never becomes visible
    /// at all); otherwise the repository's `.ind` "pending delete" marker
    /// is written right away, and the physical removal is settled at
    /// `commit`/`rollback` time (spec.md §4.7).
    pub async fn delete(&mut self, file_id: FileId) -> Result<(), crate::error::RepoError> {
        if let Some(pos) = self.added.iter().position(|&id| id == file_id) {
            self.repo.abort_add(file_id).await?;
            self.added.remove(pos);
            return Ok(());
        }
        self.repo.begin_delete(file_id).await?;
        self.deleted.push(file_id);
        Ok(())
    }

    /// Finalizes every staged add (dropping its `.ind` marker) then every
    /// staged delete (writing `.del`, dropping its `.ind` marker), in that
    /// order. Never returns an error: failures are aggregated and delivered
    /// to the installed `commit_failed` handler, or dropped if none was
    /// installed.
    pub async fn commit(mut self) {
        let mut errors = ErrorAggregate::new();
        for id in self.added.drain(..) {
            if let Err(e) = self.repo.finalize_add(id).await {
                errors.push(e);
            }
        }
        for id in self.deleted.drain(..) {
            if let Err(e) = self.repo.finalize_delete(id).await {
                errors.push(e);
            }
        }
        self.deliver(errors, Handler::Commit);
    }

    /// Undoes every staged add (physically removing the file and its `.ind`
    /// marker) then restores visibility for every staged delete (removing
    /// its `.ind` marker), in that order. Never returns an error; see
    /// `commit`.
    pub async fn rollback(mut self) {
        let mut errors = ErrorAggregate::new();
        for id in self.added.drain(..) {
            if let Err(e) = self.repo.abort_add(id).await {
                errors.push(e);
            }
        }
        for id in self.deleted.drain(..) {
            if let Err(e) = self.repo.cancel_delete(id).await {
                errors.push(e);
            }
        }
        self.deliver(errors, Handler::Rollback);
    }

    /// Idempotent rollback that swallows every error: the last-resort
    /// cleanup a caller runs from a `Drop` guard or a panic handler, where
    /// there is nothing more useful to do with a failure than ignore it.
    pub async fn dispose(mut self) {
        for id in self.added.drain(..) {
            let _ = self.repo.abort_add(id).await;
        }
        for id in self.deleted.drain(..) {
            let _ = self.repo.cancel_delete(id).await;
        }
    }

    fn deliver(&mut self, errors: ErrorAggregate, which: Handler) {
        let Some(err) = errors.into_single() else { return };
        let handler = match which {
            Handler::Commit => self.commit_failed.as_mut(),
            Handler::Rollback => self.rollback_failed.as_mut(),
        };
        if let Some(handler) = handler {
            handler(err);
        }
    }
}

enum Handler {
    Commit,
    Rollback,
}
