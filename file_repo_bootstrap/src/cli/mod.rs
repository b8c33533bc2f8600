// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secure argument validation
//!
//! `frepo`'s clap parsing (in the `file-repo` crate) produces raw paths and
//! strings; this module is the security gate those values pass through
//! before they reach [`file_repo_domain`] value-object parsing.

pub mod validator;

pub use validator::{ParseError, SecureArgParser};
