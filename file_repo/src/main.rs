// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # `frepo` — the file repository command-line interface
//!
//! Wires the filesystem-backed [`FilesystemRepository`] to the `frepo`
//! subcommands and maps every outcome onto a Unix exit code via
//! `file_repo_bootstrap::ExitCode`.

use std::path::PathBuf;

use clap::Parser;
use file_repo::infrastructure::config::RepositoryConfig;
use file_repo::infrastructure::FilesystemRepository;
use file_repo::presentation::cli::{self, Cli, Command};
use file_repo_bootstrap::ExitCode;
use file_repo_domain::{CancellationToken, CleanupResolver, FileId, FileRepository, Resolution, Transaction};

/// Spawns the platform signal handler and returns a token that flips to
/// cancelled the moment SIGTERM/SIGINT/SIGHUP arrives, so a long-running add
/// or cleanup sweep can bail out at its next suspension point instead of
/// running to completion after the user has already asked to stop.
fn spawn_cancel_on_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let for_signal = token.clone();
    tokio::spawn(async move {
        file_repo_bootstrap::wait_for_shutdown_signal().await;
        for_signal.cancel();
    });
    token
}

struct AlwaysResolve(Resolution);

#[async_trait::async_trait]
impl CleanupResolver for AlwaysResolve {
    async fn resolve(&self, _file_id: FileId, _variant: Option<&file_repo_domain::VariantId>) -> Resolution {
        self.0
    }
}

#[tokio::main]
async fn main() {
    file_repo::infrastructure::logging::init();
    let raw_args: Vec<String> = std::env::args().collect();
    if let Err(e) = file_repo_bootstrap::cli::SecureArgParser::validate_argument_count(&raw_args) {
        eprintln!("frepo: {e}");
        std::process::exit(ExitCode::UsageError.as_i32());
    }
    let cli = Cli::parse();

    let exit = match run(cli).await {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            tracing::error!(error = %e, "frepo command failed");
            eprintln!("frepo: {e}");
            ExitCode::from_error(e.as_ref())
        }
    };
    std::process::exit(exit.as_i32());
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => RepositoryConfig::from_file(path)?,
        None => RepositoryConfig::default(),
    };
    if let Some(base_dir) = cli.base_dir {
        config.base_directory = base_dir;
    }
    let config = config.apply_env_overrides();
    config.validate()?;

    if file_repo_bootstrap::is_elevated() {
        tracing::warn!("frepo is running with elevated privileges; the repository root will be owned by this user");
    }

    let repo = FilesystemRepository::new(config);
    repo.init().await?;

    match cli.command {
        Command::Add { source, extension, file_id, variant } => {
            let source = cli::validate_source_path(&source)?;
            let ext = cli::parse_extension(&extension)?;
            let variant = variant.as_deref().map(cli::parse_variant).transpose()?;
            let parsed_id = file_id.as_deref().map(cli::parse_file_id).transpose()?;
            let cancel = spawn_cancel_on_signal();
            match variant {
                Some(variant) => {
                    let id = parsed_id.ok_or("variant add requires --file-id")?;
                    let outcome = repo.add_variant(id, &variant, &source, &ext, &[], &cancel).await?;
                    println!("{}", outcome.path().display());
                }
                None => {
                    let commit_error: std::sync::Arc<std::sync::Mutex<Option<file_repo_domain::RepoError>>> =
                        std::sync::Arc::new(std::sync::Mutex::new(None));
                    let handler_error = commit_error.clone();
                    let mut txn = Transaction::new(&repo).on_commit_failed(move |e| {
                        *handler_error.lock().unwrap() = Some(e);
                    });
                    let (id, _path) = txn.add(parsed_id, &source, &ext, &[], &cancel).await?;
                    txn.commit().await;
                    if let Some(e) = commit_error.lock().unwrap().take() {
                        return Err(e.into());
                    }
                    println!("{id}");
                }
            }
        }
        Command::Get { file_id, variant } => {
            let id = cli::parse_file_id(&file_id)?;
            let variant = variant.as_deref().map(cli::parse_variant).transpose()?;
            let path: PathBuf = repo.get(id, variant.as_ref()).await?;
            println!("{}", path.display());
        }
        Command::Delete { file_id, variant, immediate } => {
            let id = cli::parse_file_id(&file_id)?;
            let variant = variant.as_deref().map(cli::parse_variant).transpose()?;
            repo.delete(id, variant.as_ref(), cli::delete_mode(immediate)).await?;
        }
        Command::ListVariants { file_id } => {
            let id = cli::parse_file_id(&file_id)?;
            for variant in repo.list_variants(id).await? {
                println!("{variant}");
            }
        }
        Command::Clean { default_resolution } => {
            let resolution = match default_resolution {
                cli::ResolutionArg::Keep => Resolution::Keep,
                cli::ResolutionArg::Delete => Resolution::Delete,
            };
            let cancel = spawn_cancel_on_signal();
            let resolved = repo.cleanup(&AlwaysResolve(resolution), &cancel).await?;
            println!("resolved {resolved} entries");
        }
    }
    Ok(())
}
