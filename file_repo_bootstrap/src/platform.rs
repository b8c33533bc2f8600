// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform checks
//!
//! What the bootstrap layer needs from the OS before the repository itself
//! opens a single file: the privilege check used to warn operators running
//! `frepo` as root against a repository root they don't own. `file-repo-
//! bootstrap` only supports Unix.

/// True if the current process is running with root privileges.
pub fn is_elevated() -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }
    #[cfg(not(unix))]
    {
        compile_error!("file-repo-bootstrap only supports Unix platforms")
    }
}
