// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Value Objects
//!
//! Immutable, self-validating data with no identity of its own beyond its
//! contents: [`FileId`], [`VariantId`], and [`Extension`].

pub mod extension;
pub mod file_id;
pub mod variant_id;

pub use extension::Extension;
pub use file_id::{FileId, FileIdGenerator};
pub use variant_id::VariantId;
