// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # file-repo
//!
//! The filesystem-backed implementation of the [`file_repo_domain`] ports,
//! plus the `frepo` command-line surface. See `file_repo_domain` for the
//! transactional, crash-safe storage contract this crate fulfils.

pub mod infrastructure;
pub mod presentation;

pub use infrastructure::{FilesystemRepository, Layout, RepositoryConfig};
