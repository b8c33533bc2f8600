// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error Module
//!
//! The repository's two-phase commit protocol fails in a small, closed set
//! of ways. This module gives each of them a distinct variant so callers can
//! branch on `match` instead of string-sniffing, and so the propagation
//! policy in the specification (parsing/validation errors surface
//! immediately, recovery-path I/O errors are captured and logged rather than
//! thrown) has somewhere to live.

use thiserror::Error;

/// Domain-specific errors for the file repository.
///
/// Every operation that can fail does so with one of these variants. See
/// `category()` for the grouping used by logging and metrics.
#[derive(Error, Debug, Clone)]
pub enum RepoError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("operation in progress: {0}")]
    InProgress(String),

    #[error("invalid file id: {0}")]
    InvalidFileId(String),

    #[error("invalid variant id: {0}")]
    InvalidVariantId(String),

    #[error("invalid extension: {0}")]
    InvalidExtension(String),

    #[error("extension not allowed: {0}")]
    ExtensionNotAllowed(String),

    #[error("source unchanged")]
    SourceUnchanged,

    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("repository storage unavailable: {0}")]
    IoUnavailable(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("disposed: {0}")]
    Disposed(String),

    #[error("io error: {0}")]
    IoError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl RepoError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    pub fn io_unavailable(msg: impl Into<String>) -> Self {
        Self::IoUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// True for errors a caller might reasonably retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::IoUnavailable(_) | Self::InProgress(_))
    }

    /// Whether this is a programmer/contract error that the cleanup sweep's
    /// aggregate should filter out rather than report as a sweep failure
    /// (spec.md §4.8).
    pub fn is_programmer_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidFileId(_) | Self::InvalidVariantId(_) | Self::InvalidExtension(_) | Self::Disposed(_) | Self::Timeout(_)
        )
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::InProgress(_) => "in_progress",
            Self::InvalidFileId(_) => "invalid_file_id",
            Self::InvalidVariantId(_) => "invalid_variant_id",
            Self::InvalidExtension(_) => "invalid_extension",
            Self::ExtensionNotAllowed(_) => "extension_not_allowed",
            Self::SourceUnchanged => "source_unchanged",
            Self::ProcessingFailed(_) => "processing",
            Self::IoUnavailable(_) => "io_unavailable",
            Self::Timeout(_) => "timeout",
            Self::Cancelled(_) => "cancelled",
            Self::Disposed(_) => "disposed",
            Self::IoError(_) => "io",
            Self::SerializationError(_) => "serialization",
            Self::InvalidConfiguration(_) => "configuration",
            Self::InternalError(_) => "internal",
        }
    }
}

impl From<std::io::Error> for RepoError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => RepoError::NotFound(err.to_string()),
            std::io::ErrorKind::TimedOut => RepoError::Timeout(err.to_string()),
            _ => RepoError::IoError(err.to_string()),
        }
    }
}

/// Accumulates failures from a multi-entry operation (commit, rollback, the
/// cleanup sweep) and collapses them to a single error at the end, per the
/// "error aggregation" design note in spec.md §9: one element passes through
/// unchanged, many are wrapped in an aggregate.
#[derive(Debug, Clone, Default)]
pub struct ErrorAggregate {
    errors: Vec<RepoError>,
}

impl ErrorAggregate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, err: RepoError) {
        self.errors.push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[RepoError] {
        &self.errors
    }

    /// Collapses the collected errors into a single `RepoError`, or `None`
    /// if nothing was recorded.
    pub fn into_single(mut self) -> Option<RepoError> {
        match self.errors.len() {
            0 => None,
            1 => self.errors.pop(),
            _ => {
                let joined = self
                    .errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                Some(RepoError::InternalError(format!("{} errors: {joined}", self.errors.len())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_passes_single_error_through_unchanged() {
        let mut agg = ErrorAggregate::new();
        agg.push(RepoError::not_found("f1"));
        let err = agg.into_single().unwrap();
        assert!(matches!(err, RepoError::NotFound(_)));
    }

    #[test]
    fn aggregate_wraps_many_errors() {
        let mut agg = ErrorAggregate::new();
        agg.push(RepoError::not_found("f1"));
        agg.push(RepoError::io_unavailable("f2"));
        let err = agg.into_single().unwrap();
        assert!(matches!(err, RepoError::InternalError(_)));
    }

    #[test]
    fn empty_aggregate_collapses_to_none() {
        assert!(ErrorAggregate::new().into_single().is_none());
    }
}
