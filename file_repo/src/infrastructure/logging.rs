// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Ambient logging
//!
//! Structured `tracing` output for operators, independent of the marker
//! logging described in spec.md §4.9 (which is about crash forensics
//! written into the repository itself, not operational telemetry). Reads
//! `RUST_LOG` via `EnvFilter`, defaulting to `info`.

use tracing_subscriber::{fmt, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(true).init();
}
