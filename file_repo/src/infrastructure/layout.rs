// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # On-disk layout
//!
//! Pure path arithmetic for the repository root (spec.md §3). Nothing here
//! touches the filesystem; `FilesystemRepository` is the only thing that
//! creates or removes what these functions name.

use std::path::PathBuf;

use file_repo_domain::{FileId, VariantId};

pub const MAIN_STEM: &str = "$main$";

#[derive(Debug, Clone)]
pub struct Layout {
    base: PathBuf,
}

impl Layout {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &std::path::Path {
        &self.base
    }

    pub fn lock_file(&self) -> PathBuf {
        self.base.join(".lock")
    }

    pub fn files_dir(&self) -> PathBuf {
        self.base.join("files")
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.base.join(".temp")
    }

    pub fn cleanup_dir(&self) -> PathBuf {
        self.base.join(".cleanup")
    }

    /// `files/<h1>/<h2>/<fileid>/`, sharded by two bytes of the canonical id
    /// string (spec.md §3, §4.1).
    pub fn file_dir(&self, file_id: FileId) -> PathBuf {
        let (h1, h2) = file_id.shard();
        self.files_dir().join(h1).join(h2).join(file_id.to_string())
    }

    pub fn main_file_path(&self, file_id: FileId, extension: &str) -> PathBuf {
        self.file_dir(file_id).join(stem_with_extension(MAIN_STEM, extension))
    }

    pub fn variant_file_path(&self, file_id: FileId, variant: &VariantId, extension: &str) -> PathBuf {
        self.file_dir(file_id).join(stem_with_extension(&variant.to_string(), extension))
    }

    /// A fresh working directory under `.temp/` for one add operation,
    /// named after the file (and variant, if any) being produced.
    pub fn temp_work_dir(&self, file_id: FileId, variant: Option<&VariantId>) -> PathBuf {
        let name = match variant {
            Some(v) => format!("{file_id} {v}"),
            None => file_id.to_string(),
        };
        self.temp_dir().join(name)
    }

    pub fn indeterminate_marker(&self, file_id: FileId) -> PathBuf {
        self.cleanup_dir().join(format!("{file_id}.ind"))
    }

    pub fn delete_marker(&self, file_id: FileId) -> PathBuf {
        self.cleanup_dir().join(format!("{file_id}.del"))
    }

    pub fn variant_delete_marker(&self, file_id: FileId, variant: &VariantId) -> PathBuf {
        self.cleanup_dir().join(format!("{file_id} {variant}.del"))
    }
}

/// Joins a stem and extension as `$main$.<ext>`, or bare `$main$` when the
/// extension is empty (spec.md §3: a main file with no suffix has no dot).
fn stem_with_extension(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{extension}")
    }
}

/// Recognizes a `$main$.<ext>` or bare `$main$` filename and extracts the
/// extension (empty for the latter).
pub fn main_file_extension(file_name: &str) -> Option<&str> {
    let rest = file_name.strip_prefix(MAIN_STEM)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('.')
    }
}

/// Recognizes `<variant>.<ext>` or bare `<variant>` (anything that is not the
/// main stem) and splits it into the variant name and extension (empty for
/// a variant with no suffix).
pub fn variant_file_parts(file_name: &str) -> Option<(&str, &str)> {
    if file_name.starts_with(MAIN_STEM) {
        return None;
    }
    match file_name.find('.') {
        Some(dot) => Some((&file_name[..dot], &file_name[dot + 1..])),
        None => Some((file_name, "")),
    }
}
