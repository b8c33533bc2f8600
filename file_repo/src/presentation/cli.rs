// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-line interface
//!
//! `frepo` exposes the repository's public operations surface (spec.md
//! §6) as subcommands: `add`, `get`, `delete`, `list-variants`, `clean`.
//! This module only parses arguments and maps them onto
//! `file_repo_domain::FileRepository` calls; the bootstrap crate owns
//! process-level concerns (exit codes, signals).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use file_repo_bootstrap::cli::SecureArgParser;
use file_repo_domain::{DeleteMode, Extension, FileId, VariantId};

#[derive(Parser, Debug)]
#[command(name = "frepo", about = "Transactional, crash-safe file repository", version)]
pub struct Cli {
    /// Path to a TOML config file. Falls back to `FREPO_*` environment
    /// variables and built-in defaults when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Repository root, overriding config's `base_directory`.
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a file (or a variant of an existing file) to the repository.
    Add {
        /// Path to the source file to ingest.
        source: PathBuf,
        /// Extension to store the file under, e.g. "jpg".
        #[arg(long)]
        extension: String,
        /// Existing file id to attach this add to, for a variant add.
        #[arg(long)]
        file_id: Option<String>,
        /// Variant name; requires --file-id.
        #[arg(long)]
        variant: Option<String>,
    },
    /// Print the on-disk path for a file or one of its variants.
    Get {
        file_id: String,
        #[arg(long)]
        variant: Option<String>,
    },
    /// Delete a file or one of its variants.
    Delete {
        file_id: String,
        #[arg(long)]
        variant: Option<String>,
        /// Remove immediately instead of marking for the next cleanup sweep.
        #[arg(long)]
        immediate: bool,
    },
    /// List the variant ids committed for a file.
    ListVariants { file_id: String },
    /// Run the cleanup/recovery sweep, resolving indeterminate entries per `--default-resolution`.
    Clean {
        #[arg(long, value_enum, default_value = "delete")]
        default_resolution: ResolutionArg,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ResolutionArg {
    Keep,
    Delete,
}

pub fn parse_file_id(s: &str) -> Result<FileId, String> {
    SecureArgParser::validate_argument(s).map_err(|e| e.to_string())?;
    FileId::parse(s).map_err(|e| e.to_string())
}

pub fn parse_variant(s: &str) -> Result<VariantId, String> {
    SecureArgParser::validate_argument(s).map_err(|e| e.to_string())?;
    VariantId::parse(s).map_err(|e| e.to_string())
}

pub fn parse_extension(s: &str) -> Result<Extension, String> {
    SecureArgParser::validate_argument(s).map_err(|e| e.to_string())?;
    Extension::parse(s).map_err(|e| e.to_string())
}

/// Validates the `add` command's source path: it's the one CLI argument
/// that must already exist on disk, so canonicalization is the right check
/// (unlike `--base-dir`, which the repository creates lazily).
pub fn validate_source_path(source: &PathBuf) -> Result<PathBuf, String> {
    SecureArgParser::validate_path(&source.to_string_lossy()).map_err(|e| e.to_string())
}

pub fn delete_mode(immediate: bool) -> DeleteMode {
    if immediate {
        DeleteMode::Immediate
    } else {
        DeleteMode::Delayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_add_subcommand() {
        let cli = Cli::parse_from(["frepo", "add", "/tmp/in.jpg", "--extension", "jpg"]);
        match cli.command {
            Command::Add { extension, .. } => assert_eq!(extension, "jpg"),
            _ => panic!("expected Add"),
        }
    }

    #[test]
    fn parses_get_subcommand_with_variant() {
        let cli = Cli::parse_from(["frepo", "get", "01ARZ3NDEKTSV4RRFFQ69G5FAV", "--variant", "thumb"]);
        match cli.command {
            Command::Get { file_id, variant } => {
                assert_eq!(file_id, "01ARZ3NDEKTSV4RRFFQ69G5FAV");
                assert_eq!(variant.as_deref(), Some("thumb"));
            }
            _ => panic!("expected Get"),
        }
    }

    #[test]
    fn delete_mode_defaults_to_delayed() {
        assert!(matches!(delete_mode(false), DeleteMode::Delayed));
        assert!(matches!(delete_mode(true), DeleteMode::Immediate));
    }

    #[test]
    fn parse_file_id_rejects_dangerous_patterns_before_domain_parsing() {
        assert!(parse_file_id("../../etc/passwd").is_err());
        assert!(parse_file_id("01ARZ3NDEKTSV4RRFFQ69G5FAV").is_ok());
    }

    #[test]
    fn parse_variant_rejects_shell_metacharacters() {
        assert!(parse_variant("thumb;rm -rf /").is_err());
        assert!(parse_variant("thumb").is_ok());
    }

    #[test]
    fn validate_source_path_requires_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.bin");
        assert!(validate_source_path(&missing).is_err());

        let present = dir.path().join("present.bin");
        std::fs::write(&present, b"data").unwrap();
        assert!(validate_source_path(&present).is_ok());
    }
}
