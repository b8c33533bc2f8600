// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cancellation token
//!
//! A single token threaded into the processing pipeline and the cleanup
//! sweep so a caller can abandon a long-running add or sweep at a
//! suspension point rather than waiting it out (spec.md §5, §9). Grounded
//! on the teacher's `CancellationToken` (`adaptive_pipeline_bootstrap::shutdown`),
//! minus its `tokio::sync::Notify` wake-up path: the domain layer carries
//! no async runtime dependency, so cancellation here is polled at
//! suspension points (between pipeline steps, between cleanup entries)
//! rather than awaited. The bootstrap layer's signal handler is what
//! decides *when* to call `cancel()`; this type only carries the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cheaply-cloneable, shareable cancellation flag.
#[derive(Clone, Default, Debug)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation. Idempotent; visible to every clone.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uncancelled() {
        assert!(!CancellationToken::new().is_cancelled());
    }

    #[test]
    fn cancel_is_visible_on_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let token = CancellationToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
