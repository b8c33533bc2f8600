// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cleanup sweep
//!
//! The recovery protocol (spec.md §4.8): scan `.cleanup/` once, classify
//! each marker, and reconcile it with what's actually on disk. Failures on
//! individual entries are aggregated rather than aborting the whole sweep
//! — one bad id must never stop the others from being resolved.

use std::time::SystemTime;

use file_repo_domain::{CancellationToken, CleanupResolver, ErrorAggregate, FileId, RepoError, Resolution, VariantId};
use tokio::fs;
use tracing::{info, warn};

use crate::infrastructure::fs_repository::FilesystemRepository;

enum Marker {
    Indeterminate(FileId),
    Delete(FileId),
    VariantDelete(FileId, VariantId),
}

fn classify(file_name: &str) -> Option<Marker> {
    if let Some(stem) = file_name.strip_suffix(".ind") {
        return FileId::parse(stem).ok().map(Marker::Indeterminate);
    }
    if let Some(stem) = file_name.strip_suffix(".del") {
        if let Some((id_part, variant_part)) = stem.split_once(' ') {
            let id = FileId::parse(id_part).ok()?;
            let variant = VariantId::parse(variant_part).ok()?;
            return Some(Marker::VariantDelete(id, variant));
        }
        return FileId::parse(stem).ok().map(Marker::Delete);
    }
    None
}

async fn marker_age(path: &std::path::Path) -> Option<std::time::Duration> {
    let meta = fs::metadata(path).await.ok()?;
    let modified = meta.modified().ok()?;
    SystemTime::now().duration_since(modified).ok()
}

pub async fn run_sweep(repo: &FilesystemRepository, resolver: &dyn CleanupResolver, cancel: &CancellationToken) -> Result<usize, RepoError> {
    let cleanup_dir = repo.layout().cleanup_dir();
    let mut entries = match fs::read_dir(&cleanup_dir).await {
        Ok(e) => e,
        Err(_) => return Err(RepoError::io_unavailable("cleanup directory missing")),
    };

    let mut markers = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(RepoError::from)? {
        if let Some(name) = entry.file_name().to_str() {
            if let Some(marker) = classify(name) {
                markers.push((entry.path(), marker));
            }
        }
    }

    let mut resolved = 0usize;
    let mut errors = ErrorAggregate::new();
    let delete_delay = repo.config().delete_delay;
    let indeterminate_delay = repo.config().indeterminate_delay;

    for (path, marker) in markers {
        if cancel.is_cancelled() {
            info!(resolved, "cleanup sweep cancelled");
            return Err(RepoError::Cancelled("cleanup sweep cancelled".into()));
        }
        let outcome = match marker {
            Marker::Delete(id) => resolve_delete(repo, &path, id, delete_delay).await,
            Marker::VariantDelete(id, variant) => resolve_variant_delete(repo, &path, id, &variant, delete_delay).await,
            Marker::Indeterminate(id) => resolve_indeterminate(repo, &path, id, indeterminate_delay, resolver).await,
        };
        match outcome {
            Ok(true) => resolved += 1,
            Ok(false) => {}
            Err(e) if e.is_programmer_error() => {
                warn!(error = %e, "skipping cleanup entry with programmer error");
            }
            Err(e) => errors.push(e),
        }
    }

    info!(resolved, "cleanup sweep finished");
    match errors.into_single() {
        None => Ok(resolved),
        Some(e) => Err(e),
    }
}

async fn resolve_delete(repo: &FilesystemRepository, marker_path: &std::path::Path, id: FileId, delete_delay: std::time::Duration) -> Result<bool, RepoError> {
    let age = marker_age(marker_path).await.unwrap_or_default();
    if age < delete_delay {
        return Ok(false);
    }
    let dir = repo.layout().file_dir(id);
    if dir.exists() {
        fs::remove_dir_all(&dir).await.map_err(RepoError::from)?;
    }
    let ind = repo.layout().indeterminate_marker(id);
    let _ = fs::remove_file(&ind).await;
    fs::remove_file(marker_path).await.map_err(RepoError::from)?;
    Ok(true)
}

async fn resolve_variant_delete(
    repo: &FilesystemRepository,
    marker_path: &std::path::Path,
    id: FileId,
    variant: &VariantId,
    delete_delay: std::time::Duration,
) -> Result<bool, RepoError> {
    let age = marker_age(marker_path).await.unwrap_or_default();
    if age < delete_delay {
        return Ok(false);
    }
    let dir = repo.layout().file_dir(id);
    if let Ok(mut entries) = fs::read_dir(&dir).await {
        while let Some(entry) = entries.next_entry().await.map_err(RepoError::from)? {
            if let Some(name) = entry.file_name().to_str() {
                if let Some((v, _ext)) = crate::infrastructure::layout::variant_file_parts(name) {
                    if v == variant.as_str() {
                        fs::remove_file(entry.path()).await.map_err(RepoError::from)?;
                        break;
                    }
                }
            }
        }
    }
    fs::remove_file(marker_path).await.map_err(RepoError::from)?;
    Ok(true)
}

async fn resolve_indeterminate(
    repo: &FilesystemRepository,
    marker_path: &std::path::Path,
    id: FileId,
    indeterminate_delay: std::time::Duration,
    resolver: &dyn CleanupResolver,
) -> Result<bool, RepoError> {
    if repo.is_in_flight(id) {
        return Ok(false);
    }
    let dir = repo.layout().file_dir(id);
    if !dir.exists() {
        fs::remove_file(marker_path).await.map_err(RepoError::from)?;
        return Ok(true);
    }
    let age = marker_age(marker_path).await.unwrap_or_default();
    if age < indeterminate_delay {
        return Ok(false);
    }

    match resolver.resolve(id, None).await {
        Resolution::Keep => {
            fs::remove_file(marker_path).await.map_err(RepoError::from)?;
            Ok(true)
        }
        Resolution::Delete => {
            fs::remove_dir_all(&dir).await.map_err(RepoError::from)?;
            let _ = fs::remove_file(marker_path).await;
            let del_marker = repo.layout().delete_marker(id);
            let _ = fs::remove_file(&del_marker).await;
            Ok(true)
        }
    }
}
