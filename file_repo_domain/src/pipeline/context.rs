// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processing context
//!
//! Carries state through an ordered chain of [`Processor`](crate::pipeline::Processor)s
//! as they transform a source file on its way into the repository
//! (spec.md §5). Unlike a typical pipeline context that only reports
//! progress, this one also owns the buffering decision: most processors
//! can rewrite a temp copy in place, but a processor that can only stream
//! forward needs a fresh work file, and the context is where that policy
//! and the resulting file handle live so processors don't have to agree
//! on it themselves.

use std::path::{Path, PathBuf};

use crate::cancellation::CancellationToken;
use crate::value_objects::{FileId, VariantId};

/// Governs whether the pipeline runner may skip making a private temp copy
/// of the source before running processors over it (spec.md §5.2).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum BufferingPolicy {
    /// Copy to a work file only if some processor in the chain reports it
    /// will modify the data (`Processor::modifies_data`).
    Auto,
    /// Always copy to a work file before running any processor.
    ForceTempCopy,
    /// Never copy; processors run directly against the original path and
    /// must not mutate it. Only valid when every processor in the chain is
    /// read-only.
    Disabled,
}

impl Default for BufferingPolicy {
    fn default() -> Self {
        Self::Auto
    }
}

/// State threaded through a processor chain for a single add operation.
///
/// Starts pointing at the caller's source path. If buffering kicks in,
/// [`ProcessingContext::allocate_work_file`] swaps in a private temp path
/// that processors read from and write to; the original source is never
/// touched. `has_changes` records whether any processor actually altered
/// the bytes, and `mark_source_unchanged` lets a processor short-circuit
/// the rest of the chain when it determines no processing is needed at all
/// (spec.md §5.3's `SourceUnchanged` signal).
#[derive(Debug)]
pub struct ProcessingContext {
    file_id: FileId,
    variant_id: Option<VariantId>,
    source_path: PathBuf,
    work_path: Option<PathBuf>,
    policy: BufferingPolicy,
    cancellation: CancellationToken,
    is_last_step: bool,
    has_changes: bool,
    source_unchanged: bool,
    stage_notes: Vec<String>,
}

impl ProcessingContext {
    pub fn new(
        file_id: FileId,
        variant_id: Option<VariantId>,
        source_path: impl Into<PathBuf>,
        policy: BufferingPolicy,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            file_id,
            variant_id,
            source_path: source_path.into(),
            work_path: None,
            policy,
            cancellation,
            is_last_step: false,
            has_changes: false,
            source_unchanged: false,
            stage_notes: Vec::new(),
        }
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn variant_id(&self) -> Option<&VariantId> {
        self.variant_id.as_ref()
    }

    pub fn policy(&self) -> BufferingPolicy {
        self.policy
    }

    /// True while the processor currently running is the last one in the
    /// chain, letting a processor skip work it only needs for an
    /// intermediate stage (spec.md §4.2). Set by the chain runner, never by
    /// a processor itself.
    pub fn is_last_step(&self) -> bool {
        self.is_last_step
    }

    pub(crate) fn set_is_last_step(&mut self, is_last: bool) {
        self.is_last_step = is_last;
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// The path processors should currently read from: the work file if one
    /// has been allocated, otherwise the original source.
    pub fn current_path(&self) -> &Path {
        self.work_path.as_deref().unwrap_or(&self.source_path)
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Installs `work_path` as the path subsequent processors read/write.
    /// Called by the pipeline runner once it has materialized a temp copy;
    /// the context itself does no I/O.
    pub fn allocate_work_file(&mut self, work_path: PathBuf) {
        self.work_path = Some(work_path);
    }

    pub fn work_path(&self) -> Option<&Path> {
        self.work_path.as_deref()
    }

    pub fn mark_changed(&mut self) {
        self.has_changes = true;
    }

    pub fn has_changes(&self) -> bool {
        self.has_changes
    }

    /// A processor calls this to signal the rest of the chain (and the
    /// repository) that the source should be stored exactly as-is (spec.md
    /// §5.3). The pipeline runner stops invoking further processors once
    /// this is set.
    pub fn mark_source_unchanged(&mut self) {
        self.source_unchanged = true;
    }

    pub fn is_source_unchanged(&self) -> bool {
        self.source_unchanged
    }

    pub fn add_note(&mut self, stage: impl Into<String>, note: impl Into<String>) {
        self.stage_notes.push(format!("{}: {}", stage.into(), note.into()));
    }

    pub fn notes(&self) -> &[String] {
        &self.stage_notes
    }
}
