// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processor contract
//!
//! An ordered `Processor` chain is how the repository lets callers
//! transform a file on its way in (spec.md §5): a virus scan, a checksum
//! stamp, an image thumbnail, whatever the caller configured. Each
//! processor only needs to know how to act on a path described by a
//! [`ProcessingContext`]; it does not need to know about buffering, work
//! files, or the repository's transaction machinery, which is the whole
//! point of keeping this trait in the domain layer and the actual file
//! copying in infrastructure.

use crate::error::RepoError;
use crate::pipeline::context::ProcessingContext;
use crate::value_objects::Extension;

/// A single step in a processing chain.
///
/// Implementations run synchronously over the path exposed by the
/// context — they are expected to be CPU-bound or to perform bounded,
/// local I/O. Processors that need async I/O should do that work in the
/// infrastructure layer and expose a synchronous adapter here, the same
/// separation the repository's own `FileRepository` trait draws between
/// domain contracts and infrastructure execution.
pub trait Processor: Send + Sync {
    /// Runs this step. Implementations read/write `ctx.current_path()` and
    /// call `ctx.mark_changed()` if they altered the bytes.
    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), RepoError>;

    fn name(&self) -> &str;

    /// Whether this processor can alter the bytes it sees. Used by
    /// `BufferingPolicy::Auto` to decide whether a temp copy is needed at
    /// all (spec.md §5.2): a chain of only read-only processors never
    /// needs one.
    fn modifies_data(&self) -> bool {
        true
    }

    /// Extensions this processor accepts, lowercase and without the leading
    /// dot. Empty (the default) means any extension (spec.md §4.2): the
    /// chain rejects the whole add with `ExtensionNotAllowed` before
    /// invoking a processor whose set doesn't include the file's current
    /// extension.
    fn allowed_extensions(&self) -> &[&str] {
        &[]
    }
}

/// Runs a list of [`Processor`]s in order, short-circuiting on the first
/// error or on a processor marking the source unchanged.
///
/// Mirrors the chaining pattern used for multi-stage chunk processing
/// elsewhere in this codebase: a `Vec<Box<dyn Processor>>` run in sequence
/// against shared mutable context rather than each processor owning its
/// own copy of the data.
pub struct ProcessorChain {
    processors: Vec<Box<dyn Processor>>,
}

impl ProcessorChain {
    pub fn new(processors: Vec<Box<dyn Processor>>) -> Self {
        Self { processors }
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// True if every processor in the chain declares itself read-only,
    /// which lets `BufferingPolicy::Auto` skip the temp copy entirely.
    pub fn any_modifies_data(&self) -> bool {
        self.processors.iter().any(|p| p.modifies_data())
    }

    /// Runs the chain against `extension` — the file's extension as it
    /// enters the pipeline, unaffected by any later processor — rejecting
    /// with `ExtensionNotAllowed` if a step's own allow-list excludes it.
    /// This is a per-step contract, distinct from (and checked in addition
    /// to) the repository-wide extension allow-list `FileRepository::add`
    /// enforces before the pipeline ever runs (spec.md §4.2).
    pub fn run(&self, ctx: &mut ProcessingContext, extension: &Extension) -> Result<(), RepoError> {
        let last_index = self.processors.len().checked_sub(1);
        for (index, processor) in self.processors.iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(RepoError::Cancelled(format!(
                    "cancelled before running processor {}",
                    processor.name()
                )));
            }
            let allowed = processor.allowed_extensions();
            if !allowed.is_empty() && !allowed.contains(&extension.as_str()) {
                return Err(RepoError::ExtensionNotAllowed(format!(
                    "{} does not accept extension {extension}",
                    processor.name()
                )));
            }
            ctx.set_is_last_step(last_index == Some(index));
            processor.process(ctx)?;
            if ctx.is_source_unchanged() {
                break;
            }
        }
        Ok(())
    }
}
