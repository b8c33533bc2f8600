// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Marker logging
//!
//! Marker files double as append-only diagnostic logs (spec.md §4.9). This
//! is deliberately best-effort and separate from the `tracing` channel
//! used for ambient operational logs: a marker that cannot be written to
//! must never mask the error that triggered the write.

use std::path::Path;

use chrono::Utc;
use file_repo_domain::RepoError;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::infrastructure::config::MarkerLogging;

/// Appends a human-readable block to `marker` and ensures it exists when
/// `marker_required`, per the contract in spec.md §4.9. I/O failures are
/// swallowed unless the marker is required and does not already exist —
/// the caller's own error is always what gets reported, this is purely
/// diagnostic.
pub async fn log_to_marker(marker: &Path, header: &str, body: &str, marker_required: bool, mode: MarkerLogging) -> Result<(), RepoError> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);

    let mut file = match options.open(marker).await {
        Ok(f) => f,
        Err(e) => {
            if marker_required && !marker.exists() {
                return Err(e.into());
            }
            return Ok(());
        }
    };

    if mode == MarkerLogging::None {
        return Ok(());
    }

    let block = format!("==== {header} ====\n\nTimestamp: {}\n\n{body}\n\n", Utc::now().to_rfc3339());
    if let Err(e) = file.write_all(block.as_bytes()).await {
        if marker_required {
            return Err(e.into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_human_readable_block() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("f.ind");
        log_to_marker(&marker, "ADD STARTED", "file_id=abc", true, MarkerLogging::HumanReadable).await.unwrap();
        let contents = tokio::fs::read_to_string(&marker).await.unwrap();
        assert!(contents.contains("ADD STARTED"));
        assert!(contents.contains("file_id=abc"));
    }

    #[tokio::test]
    async fn none_mode_still_creates_marker_when_required() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("f.ind");
        log_to_marker(&marker, "ADD STARTED", "body", true, MarkerLogging::None).await.unwrap();
        assert!(marker.exists());
        let contents = tokio::fs::read_to_string(&marker).await.unwrap();
        assert!(contents.is_empty());
    }

    #[tokio::test]
    async fn appends_across_multiple_calls() {
        let dir = tempdir().unwrap();
        let marker = dir.path().join("f.ind");
        log_to_marker(&marker, "ADD STARTED", "1", true, MarkerLogging::HumanReadable).await.unwrap();
        log_to_marker(&marker, "ADD RETRIED", "2", true, MarkerLogging::HumanReadable).await.unwrap();
        let contents = tokio::fs::read_to_string(&marker).await.unwrap();
        assert!(contents.contains("ADD STARTED"));
        assert!(contents.contains("ADD RETRIED"));
    }

    #[tokio::test]
    async fn fails_silently_when_not_required_and_directory_missing() {
        let marker = Path::new("/nonexistent-dir-xyz/f.ind");
        let result = log_to_marker(marker, "H", "B", false, MarkerLogging::HumanReadable).await;
        assert!(result.is_ok());
    }
}
