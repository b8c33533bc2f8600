// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! # Bootstrap
//!
//! Everything `frepo` needs before it touches the repository: platform
//! info, signal handling for graceful shutdown during a cleanup sweep,
//! secure argument validation, and Unix exit codes. Sits outside the
//! domain/infrastructure layers in `file-repo-domain` and `file-repo`;
//! neither of those crates depends back on this one.

pub mod cli;
pub mod exit_code;
pub mod platform;
pub mod signals;

pub use exit_code::ExitCode;
pub use platform::is_elevated;
pub use signals::wait_for_shutdown_signal;
