// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Filesystem repository
//!
//! The concrete `FileRepository` implementation: everything in spec.md §4
//! that actually touches a directory tree. Two-phase commit lives here —
//! `.ind` markers record an add or delete in progress, atomic rename is
//! the commit point for file data, and the marker itself is only dropped
//! when a [`file_repo_domain::Transaction`] (or the untransacted
//! convenience `delete`) settles it. A crash at any point leaves exactly
//! the debris [`cleanup`] is built to reconcile.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use file_repo_domain::{
    BufferingPolicy, CancellationToken, CleanupResolver, DeleteMode, Extension, FileId, FileIdGenerator, FileRepository,
    ProcessingContext, ProcessorChain, ProcessorRegistry, RepoError, VariantId, VariantOutcome,
};
use parking_lot::Mutex as SyncMutex;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::infrastructure::config::{MarkerLogging, RepositoryConfig};
use crate::infrastructure::layout::{main_file_extension, variant_file_parts, Layout};
use crate::infrastructure::lock_table::LockTable;
use crate::infrastructure::marker_log::log_to_marker;

struct ArcProcessor(Arc<dyn file_repo_domain::Processor>);
impl file_repo_domain::Processor for ArcProcessor {
    fn process(&self, ctx: &mut ProcessingContext) -> Result<(), RepoError> {
        self.0.process(ctx)
    }
    fn name(&self) -> &str {
        self.0.name()
    }
    fn modifies_data(&self) -> bool {
        self.0.modifies_data()
    }
    fn allowed_extensions(&self) -> &[&str] {
        self.0.allowed_extensions()
    }
}

pub struct FilesystemRepository {
    layout: Layout,
    config: RepositoryConfig,
    locks: LockTable,
    id_gen: FileIdGenerator,
    init_lock: tokio::sync::Mutex<()>,
    cleanup_lock: tokio::sync::Mutex<()>,
    lock_handle: SyncMutex<Option<std::fs::File>>,
    healthy: AtomicBool,
    last_health_check: SyncMutex<Option<Instant>>,
    in_flight_adds: SyncMutex<HashSet<FileId>>,
    processors: Arc<dyn ProcessorRegistry>,
}

struct EmptyProcessorRegistry;
impl ProcessorRegistry for EmptyProcessorRegistry {
    fn lookup(&self, _name: &str) -> Option<Arc<dyn file_repo_domain::Processor>> {
        None
    }
}

impl FilesystemRepository {
    pub fn new(config: RepositoryConfig) -> Self {
        Self::with_processors(config, Arc::new(EmptyProcessorRegistry))
    }

    pub fn with_processors(config: RepositoryConfig, processors: Arc<dyn ProcessorRegistry>) -> Self {
        let layout = Layout::new(config.base_directory.clone());
        Self {
            layout,
            config,
            locks: LockTable::new(),
            id_gen: FileIdGenerator::new(),
            init_lock: tokio::sync::Mutex::new(()),
            cleanup_lock: tokio::sync::Mutex::new(()),
            lock_handle: SyncMutex::new(None),
            healthy: AtomicBool::new(false),
            last_health_check: SyncMutex::new(None),
            in_flight_adds: SyncMutex::new(HashSet::new()),
            processors,
        }
    }

    /// Resolves processor names into an executable chain, silently skipping
    /// names the registry doesn't recognize (an unknown processor name is a
    /// caller configuration error surfaced earlier, at registry-build time,
    /// not here).
    fn build_chain(&self, names: &[&'static str]) -> ProcessorChain {
        let resolved = names.iter().filter_map(|n| self.processors.lookup(n)).collect::<Vec<_>>();
        ProcessorChain::new(resolved.into_iter().map(ArcProcessor).map(|p| Box::new(p) as Box<dyn file_repo_domain::Processor>).collect())
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    fn needs_health_check(&self) -> bool {
        match *self.last_health_check.lock() {
            None => true,
            Some(last) => last.elapsed() >= self.config.health_check_interval,
        }
    }

    /// Re-enters full initialization if the periodic probe is due and
    /// either we've never initialized or the probe fails (spec.md §4.6).
    async fn ensure_ready(&self) -> Result<(), RepoError> {
        if self.healthy.load(Ordering::Acquire) && !self.needs_health_check() {
            return Ok(());
        }
        let _guard = self.init_lock.lock().await;
        // Re-check: another task may have already fixed this up while we waited.
        if self.healthy.load(Ordering::Acquire) && !self.needs_health_check() {
            return Ok(());
        }
        if self.healthy.load(Ordering::Acquire) {
            if self.probe_lock_file().is_ok() {
                *self.last_health_check.lock() = Some(Instant::now());
                return Ok(());
            }
            warn!("health check failed, reinitializing repository");
            self.healthy.store(false, Ordering::Release);
            *self.lock_handle.lock() = None;
        }
        self.initialize_locked().await
    }

    async fn initialize_locked(&self) -> Result<(), RepoError> {
        let deadline = Instant::now() + self.config.max_access_wait_or_retry;
        fs::create_dir_all(&self.layout.base()).await.map_err(RepoError::from)?;

        let lock_path = self.layout.lock_file();
        loop {
            match std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&lock_path) {
                Ok(file) => {
                    *self.lock_handle.lock() = Some(file);
                    break;
                }
                Err(e) if Instant::now() < deadline => {
                    debug!(error = %e, "waiting to acquire process lock file");
                    tokio::time::sleep(Duration::from_millis(200)).await;
                }
                Err(_) => return Err(RepoError::Timeout("could not acquire repository lock file".into())),
            }
        }

        let temp_dir = self.layout.temp_dir();
        if temp_dir.exists() {
            fs::remove_dir_all(&temp_dir).await.map_err(RepoError::from)?;
        }
        fs::create_dir_all(&temp_dir).await.map_err(RepoError::from)?;
        fs::create_dir_all(self.layout.cleanup_dir()).await.map_err(RepoError::from)?;
        fs::create_dir_all(self.layout.files_dir()).await.map_err(RepoError::from)?;

        self.probe_lock_file()?;
        self.healthy.store(true, Ordering::Release);
        *self.last_health_check.lock() = Some(Instant::now());
        info!(base = %self.layout.base().display(), "repository initialized");
        Ok(())
    }

    /// The cheap periodic I/O probe: toggle the lock file's length within a
    /// bounded range to force a real syscall (spec.md §4.6).
    fn probe_lock_file(&self) -> Result<(), RepoError> {
        use std::io::{Seek, SeekFrom, Write};
        let mut guard = self.lock_handle.lock();
        let file = guard.as_mut().ok_or_else(|| RepoError::io_unavailable("lock file not held"))?;
        let toggled = if file.metadata().map(|m| m.len()).unwrap_or(0) == 0 { 1 } else { 0 };
        file.set_len(toggled).map_err(RepoError::from)?;
        file.seek(SeekFrom::Start(0)).map_err(RepoError::from)?;
        file.write_all(&[0u8; 1][..toggled as usize]).map_err(RepoError::from)?;
        file.sync_data().map_err(RepoError::from)?;
        Ok(())
    }

    fn assert_extension_allowed(&self, extension: &Extension) -> Result<(), RepoError> {
        match &self.config.allowed_extensions {
            Some(allow) if !extension.is_allowed(allow) => {
                Err(RepoError::ExtensionNotAllowed(extension.to_string()))
            }
            _ => Ok(()),
        }
    }

    async fn resolve_existing_file<P: AsRef<Path>>(dir: P, predicate: impl Fn(&str) -> bool) -> Result<PathBuf, RepoError> {
        let dir = dir.as_ref();
        let mut entries = fs::read_dir(dir).await.map_err(|_| RepoError::not_found(dir.display().to_string()))?;
        while let Some(entry) = entries.next_entry().await.map_err(RepoError::from)? {
            if let Some(name) = entry.file_name().to_str() {
                if predicate(name) {
                    return Ok(entry.path());
                }
            }
        }
        Err(RepoError::not_found(dir.display().to_string()))
    }

    async fn run_pipeline(
        &self,
        file_id: FileId,
        variant_id: Option<&VariantId>,
        source: &Path,
        extension: &Extension,
        processors: &ProcessorChain,
        work_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<(PathBuf, Extension), RepoError> {
        if cancel.is_cancelled() {
            return Err(RepoError::Cancelled(file_id.to_string()));
        }
        fs::create_dir_all(work_dir).await.map_err(RepoError::from)?;
        let policy = if processors.is_empty() {
            BufferingPolicy::Disabled
        } else if processors.any_modifies_data() {
            BufferingPolicy::ForceTempCopy
        } else {
            BufferingPolicy::Auto
        };

        let mut ctx = ProcessingContext::new(file_id, variant_id.cloned(), source, policy, cancel.clone());
        if matches!(policy, BufferingPolicy::ForceTempCopy) {
            let work_file = work_dir.join(format!("0.{extension}"));
            fs::copy(source, &work_file).await.map_err(RepoError::from)?;
            ctx.allocate_work_file(work_file);
        }

        processors.run(&mut ctx, extension)?;

        let result_path = ctx.current_path().to_path_buf();
        if ctx.is_source_unchanged() {
            return Ok((source.to_path_buf(), extension.clone()));
        }
        Ok((result_path, extension.clone()))
    }
}

#[async_trait]
impl FileRepository for FilesystemRepository {
    #[instrument(skip(self))]
    async fn init(&self) -> Result<(), RepoError> {
        self.ensure_ready().await
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    #[instrument(skip(self, source))]
    async fn add(
        &self,
        file_id: Option<FileId>,
        source: &Path,
        extension: &Extension,
        processors: &[&'static str],
        cancel: &CancellationToken,
    ) -> Result<(FileId, PathBuf), RepoError> {
        self.ensure_ready().await?;
        self.assert_extension_allowed(extension)?;
        let chain = self.build_chain(processors);
        self.add_main(file_id, source, extension, &chain, cancel).await
    }

    #[instrument(skip(self))]
    async fn finalize_add(&self, file_id: FileId) -> Result<(), RepoError> {
        self.ensure_ready().await?;
        let _guard = self.locks.lock((file_id, None)).await;
        remove_marker(&self.layout.indeterminate_marker(file_id)).await
    }

    #[instrument(skip(self))]
    async fn abort_add(&self, file_id: FileId) -> Result<(), RepoError> {
        self.ensure_ready().await?;
        let _guard = self.locks.lock((file_id, None)).await;
        let dir = self.layout.file_dir(file_id);
        if dir.exists() {
            fs::remove_dir_all(&dir).await.map_err(RepoError::from)?;
        }
        remove_marker(&self.layout.indeterminate_marker(file_id)).await
    }

    #[instrument(skip(self))]
    async fn begin_delete(&self, file_id: FileId) -> Result<(), RepoError> {
        self.ensure_ready().await?;
        let _guard = self.locks.lock((file_id, None)).await;
        if self.is_in_flight(file_id) {
            return Err(RepoError::InProgress(file_id.to_string()));
        }
        let ind = self.layout.indeterminate_marker(file_id);
        if ind.exists() {
            return Err(RepoError::InProgress(file_id.to_string()));
        }
        let dir = self.layout.file_dir(file_id);
        let del_marker = self.layout.delete_marker(file_id);
        if !dir.exists() || del_marker.exists() {
            return Err(RepoError::not_found(file_id.to_string()));
        }
        log_to_marker(&ind, "DELETE PENDING", &format!("file_id={file_id}"), true, self.config.marker_file_logging).await
    }

    #[instrument(skip(self))]
    async fn finalize_delete(&self, file_id: FileId) -> Result<(), RepoError> {
        self.ensure_ready().await?;
        let _guard = self.locks.lock((file_id, None)).await;
        let del_marker = self.layout.delete_marker(file_id);
        log_to_marker(&del_marker, "DELETE COMMITTED", &format!("file_id={file_id}"), true, self.config.marker_file_logging).await?;
        remove_marker(&self.layout.indeterminate_marker(file_id)).await
    }

    #[instrument(skip(self))]
    async fn cancel_delete(&self, file_id: FileId) -> Result<(), RepoError> {
        self.ensure_ready().await?;
        let _guard = self.locks.lock((file_id, None)).await;
        remove_marker(&self.layout.indeterminate_marker(file_id)).await
    }

    #[instrument(skip(self))]
    async fn get(&self, file_id: FileId, variant: Option<&VariantId>) -> Result<PathBuf, RepoError> {
        self.ensure_ready().await?;
        let dir = self.layout.file_dir(file_id);
        let ind = self.layout.indeterminate_marker(file_id);
        if ind.exists() {
            return Err(RepoError::not_found(file_id.to_string()));
        }
        match variant {
            None => Self::resolve_existing_file(&dir, |n| main_file_extension(n).is_some()).await,
            Some(v) => {
                // A `.del` marker here only records a committed delayed delete;
                // like the main file, the variant stays readable until the
                // cleanup sweep physically removes its data file.
                let prefix = v.to_string();
                Self::resolve_existing_file(&dir, move |n| {
                    variant_file_parts(n).map(|(name, _)| name == prefix).unwrap_or(false)
                })
                .await
            }
        }
    }

    #[instrument(skip(self, source))]
    async fn get_or_add_variant(
        &self,
        file_id: FileId,
        variant: &VariantId,
        source: &Path,
        extension: &Extension,
        processors: &[&'static str],
        cancel: &CancellationToken,
    ) -> Result<PathBuf, RepoError> {
        let chain = self.build_chain(processors);
        let outcome = self.add_variant_locked(file_id, variant, source, extension, &chain, None, cancel).await?;
        Ok(outcome.path().to_path_buf())
    }

    #[instrument(skip(self, source))]
    async fn add_variant(
        &self,
        file_id: FileId,
        variant: &VariantId,
        source: &Path,
        extension: &Extension,
        processors: &[&'static str],
        cancel: &CancellationToken,
    ) -> Result<VariantOutcome, RepoError> {
        let chain = self.build_chain(processors);
        self.add_variant_locked(file_id, variant, source, extension, &chain, None, cancel).await
    }

    #[instrument(skip(self, source))]
    async fn try_add_variant(
        &self,
        file_id: FileId,
        variant: &VariantId,
        source: &Path,
        extension: &Extension,
        processors: &[&'static str],
        cancel: &CancellationToken,
    ) -> Result<VariantOutcome, RepoError> {
        let chain = self.build_chain(processors);
        self.add_variant_locked(file_id, variant, source, extension, &chain, Some(Duration::ZERO), cancel).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, file_id: FileId, variant: Option<&VariantId>, mode: DeleteMode) -> Result<(), RepoError> {
        self.ensure_ready().await?;
        match variant {
            None => self.delete_main(file_id, mode).await,
            Some(v) => self.delete_variant(file_id, v, mode).await,
        }
    }

    #[instrument(skip(self))]
    async fn list_variants(&self, file_id: FileId) -> Result<Vec<VariantId>, RepoError> {
        self.ensure_ready().await?;
        let dir = self.layout.file_dir(file_id);
        let mut out = Vec::new();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(_) => return Ok(out),
        };
        while let Some(entry) = entries.next_entry().await.map_err(RepoError::from)? {
            if let Some(name) = entry.file_name().to_str() {
                if let Some((variant, _ext)) = variant_file_parts(name) {
                    // Present until the sweep removes it, same grace period as
                    // `get`: a `.del` marker alone doesn't hide a variant.
                    if let Ok(v) = VariantId::parse(variant) {
                        out.push(v);
                    }
                }
            }
        }
        Ok(out)
    }

    #[instrument(skip(self, resolver))]
    async fn cleanup(&self, resolver: &dyn CleanupResolver, cancel: &CancellationToken) -> Result<usize, RepoError> {
        self.ensure_ready().await?;
        let _guard = self
            .cleanup_lock
            .try_lock()
            .map_err(|_| RepoError::InProgress("a cleanup sweep is already running".into()))?;
        crate::infrastructure::cleanup::run_sweep(self, resolver, cancel).await
    }

    fn allowed_extensions(&self) -> Option<&[String]> {
        self.config.allowed_extensions.as_deref()
    }
}

/// Removes a marker file, treating "already gone" as success — every marker
/// removal in the two-phase protocol must be idempotent since a crash can
/// leave `Transaction::commit`/`rollback` retried against a marker that a
/// previous attempt already cleared.
async fn remove_marker(path: &Path) -> Result<(), RepoError> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl FilesystemRepository {
    pub(crate) fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub(crate) fn is_in_flight(&self, id: FileId) -> bool {
        self.in_flight_adds.lock().contains(&id)
    }

    /// Stages, writes the `.ind` marker, and renames the main file into
    /// place, leaving the marker behind so the add stays indeterminate
    /// until a caller finalizes or aborts it (spec.md §4.4 step 6, §4.7).
    async fn add_main(
        &self,
        file_id: Option<FileId>,
        source: &Path,
        extension: &Extension,
        chain: &ProcessorChain,
        cancel: &CancellationToken,
    ) -> Result<(FileId, PathBuf), RepoError> {
        loop {
            let id = file_id.unwrap_or_else(|| self.id_gen.next());
            let _guard = self.locks.lock((id, None)).await;

            let dir = self.layout.file_dir(id);
            let del_marker = self.layout.delete_marker(id);
            let ind_marker = self.layout.indeterminate_marker(id);
            if ind_marker.exists() {
                if file_id.is_some() {
                    return Err(RepoError::InProgress(id.to_string()));
                }
                continue; // collision on a generated id: retry with a fresh one
            }
            if dir.exists() || del_marker.exists() {
                if file_id.is_some() {
                    return Err(RepoError::AlreadyExists(id.to_string()));
                }
                continue;
            }
            self.in_flight_adds.lock().insert(id);

            let result = self.add_main_locked(id, source, extension, chain, cancel).await;
            self.in_flight_adds.lock().remove(&id);
            return result.map(|path| (id, path));
        }
    }

    async fn add_main_locked(
        &self,
        id: FileId,
        source: &Path,
        extension: &Extension,
        chain: &ProcessorChain,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, RepoError> {
        let work_dir = self.layout.temp_work_dir(id, None);
        let cleanup_temp = async {
            let _ = fs::remove_dir_all(&work_dir).await;
        };

        let (staged_path, final_ext) = match self.run_pipeline(id, None, source, extension, chain, &work_dir, cancel).await {
            Ok(r) => r,
            Err(e) => {
                cleanup_temp.await;
                return Err(e);
            }
        };

        let ind = self.layout.indeterminate_marker(id);
        if let Err(e) = log_to_marker(&ind, "ADD IN PROGRESS", &format!("file_id={id}"), true, self.config.marker_file_logging).await {
            cleanup_temp.await;
            return Err(e);
        }

        let dir = self.layout.file_dir(id);
        if let Err(e) = fs::create_dir_all(&dir).await {
            let _ = fs::remove_file(&ind).await;
            cleanup_temp.await;
            return Err(e.into());
        }

        let final_path = self.layout.main_file_path(id, final_ext.as_str());
        if let Err(e) = rename_into_place(&staged_path, &final_path).await {
            let _ = fs::remove_dir_all(&dir).await;
            if let Err(cleanup_err) = fs::remove_file(&ind).await {
                let _ = log_to_marker(
                    &ind,
                    "ADD CLEANUP FAILED",
                    &format!("rename failed: {e}; marker cleanup failed: {cleanup_err}"),
                    false,
                    self.config.marker_file_logging,
                )
                .await;
            }
            cleanup_temp.await;
            return Err(e);
        }

        // The rename is the commit point for the file's *data*; the `.ind`
        // marker itself stays until a `Transaction` finalizes or aborts
        // this add (spec.md §4.7, §8 S3) — an untransacted caller leaves it
        // indeterminate until it calls `finalize_add`/`abort_add` directly.
        cleanup_temp.await;
        Ok(final_path)
    }

    /// Shared body for `get_or_add_variant`/`add_variant`/`try_add_variant`:
    /// serializes on the per-variant lock (blocking, or a single zero-
    /// timeout attempt when `lock_timeout` is `Some`), and distinguishes a
    /// variant that already existed from one this call just wrote.
    async fn add_variant_locked(
        &self,
        id: FileId,
        variant: &VariantId,
        source: &Path,
        extension: &Extension,
        chain: &ProcessorChain,
        lock_timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<VariantOutcome, RepoError> {
        self.ensure_ready().await?;
        self.assert_extension_allowed(extension)?;

        let dir = self.layout.file_dir(id);
        {
            let _parent_guard = self.locks.lock((id, None)).await;
            if !dir.exists() {
                return Err(RepoError::not_found(id.to_string()));
            }
        }

        let _guard = match lock_timeout {
            Some(timeout) => self
                .locks
                .try_lock((id, Some(variant.clone())), timeout)
                .await
                .map_err(|e| match e {
                    RepoError::Timeout(_) => RepoError::InProgress(format!("{id} {variant}")),
                    other => other,
                })?,
            None => self.locks.lock((id, Some(variant.clone()))).await,
        };

        let existing = Self::resolve_existing_file(&dir, {
            let prefix = variant.to_string();
            move |n| variant_file_parts(n).map(|(name, _)| name == prefix).unwrap_or(false)
        })
        .await;
        if let Ok(path) = existing {
            return Ok(VariantOutcome::AlreadyExists(path));
        }

        let work_dir = self.layout.temp_work_dir(id, Some(variant));
        let (staged_path, final_ext) =
            self.run_pipeline(id, Some(variant), source, extension, chain, &work_dir, cancel).await?;
        let final_path = self.layout.variant_file_path(id, variant, final_ext.as_str());

        match rename_into_place(&staged_path, &final_path).await {
            Ok(()) => {}
            Err(RepoError::NotFound(_)) if !dir.exists() => {
                // The parent file directory vanished under us: a concurrent delete
                // raced this add. Spec.md §4.4 treats this as the delete having
                // happened after a successful add, so we report success.
                let _ = fs::remove_dir_all(&work_dir).await;
                return Ok(VariantOutcome::Added(final_path));
            }
            Err(e) => {
                let _ = fs::remove_dir_all(&work_dir).await;
                return Err(e);
            }
        }
        let _ = fs::remove_dir_all(&work_dir).await;
        Ok(VariantOutcome::Added(final_path))
    }

    async fn delete_main(&self, id: FileId, mode: DeleteMode) -> Result<(), RepoError> {
        let _guard = self.locks.lock((id, None)).await;
        if self.is_in_flight(id) {
            return Err(RepoError::InProgress(id.to_string()));
        }
        let ind = self.layout.indeterminate_marker(id);
        if ind.exists() {
            return Err(RepoError::InProgress(id.to_string()));
        }

        let dir = self.layout.file_dir(id);
        let del_marker = self.layout.delete_marker(id);
        if !dir.exists() || del_marker.exists() {
            return Err(RepoError::not_found(id.to_string()));
        }
        if !self.layout.files_dir().exists() {
            return Err(RepoError::io_unavailable("files directory missing"));
        }

        match mode {
            DeleteMode::Immediate => {
                if let Err(e) = fs::remove_dir_all(&dir).await {
                    let _ = log_to_marker(&del_marker, "DELETE FAILED", &e.to_string(), false, self.config.marker_file_logging).await;
                    return Err(e.into());
                }
                let _ = fs::remove_file(&del_marker).await;
                Ok(())
            }
            DeleteMode::Delayed => {
                log_to_marker(&del_marker, "DELETE COMMITTED", &format!("file_id={id}"), true, self.config.marker_file_logging).await
            }
        }
    }

    async fn delete_variant(&self, id: FileId, variant: &VariantId, mode: DeleteMode) -> Result<(), RepoError> {
        let _guard = self.locks.lock((id, Some(variant.clone()))).await;
        let dir = self.layout.file_dir(id);
        let marker = self.layout.variant_delete_marker(id, variant);
        let existing = Self::resolve_existing_file(&dir, {
            let prefix = variant.to_string();
            move |n| variant_file_parts(n).map(|(name, _)| name == prefix).unwrap_or(false)
        })
        .await;
        let path = match existing {
            Ok(p) => p,
            Err(_) => return Err(RepoError::not_found(format!("{id} {variant}"))),
        };
        if marker.exists() {
            return Err(RepoError::not_found(format!("{id} {variant}")));
        }

        match mode {
            DeleteMode::Immediate => fs::remove_file(&path).await.map_err(RepoError::from),
            DeleteMode::Delayed => {
                log_to_marker(&marker, "VARIANT DELETE COMMITTED", &format!("{id} {variant}"), true, self.config.marker_file_logging).await
            }
        }
    }
}

/// Emulates `rename-no-replace` by requiring the destination be absent,
/// then renaming within the same directory tree (spec.md §6's atomicity
/// assumptions; §9's open question on rename-collision semantics).
async fn rename_into_place(from: &Path, to: &Path) -> Result<(), RepoError> {
    if fs::metadata(to).await.is_ok() {
        return Err(RepoError::AlreadyExists(to.display().to_string()));
    }
    fs::rename(from, to).await.map_err(RepoError::from)
}
