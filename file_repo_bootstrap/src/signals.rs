// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shutdown signals
//!
//! `frepo add` and `frepo clean` can run long enough for an operator to want
//! to interrupt them mid-flight; this is the other half of that path, waiting
//! for SIGTERM/SIGINT/SIGHUP so the caller can flip a
//! `file_repo_domain::CancellationToken` rather than leaving the process to
//! die mid-rename. `file-repo-bootstrap` only targets Unix (see
//! `platform::is_elevated`), so this only wraps `tokio::signal::unix`.

use tokio::signal::unix::{signal, SignalKind};

/// Waits for SIGTERM, SIGINT, or SIGHUP, whichever comes first.
///
/// Intended to be raced against the long-running operation in its own task:
///
/// ```rust,no_run
/// # use file_repo_domain::CancellationToken;
/// # async fn example(cancel: CancellationToken) {
/// tokio::spawn(async move {
///     file_repo_bootstrap::signals::wait_for_shutdown_signal().await;
///     cancel.cancel();
/// });
/// # }
/// ```
pub async fn wait_for_shutdown_signal() {
    let registered = (|| {
        Ok::<_, std::io::Error>((signal(SignalKind::terminate())?, signal(SignalKind::interrupt())?, signal(SignalKind::hangup())?))
    })();

    let (mut sigterm, mut sigint, mut sighup) = match registered {
        Ok(signals) => signals,
        Err(error) => {
            tracing::error!(%error, "failed to register a shutdown signal handler; frepo will not respond to SIGTERM/SIGINT/SIGHUP");
            return std::future::pending().await;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM, cancelling"),
        _ = sigint.recv() => tracing::info!("received SIGINT, cancelling"),
        _ = sighup.recv() => tracing::info!("received SIGHUP, cancelling"),
    }
}
