// /////////////////////////////////////////////////////////////////////////////
// File Repo
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end scenarios against a real temp-directory repository: the
//! add/get/delete/variant/cleanup lifecycle and its crash-recovery and
//! concurrency edge cases.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use file_repo::infrastructure::config::{MarkerLogging, RepositoryConfig};
use file_repo::infrastructure::FilesystemRepository;
use file_repo_domain::{
    CancellationToken, CleanupResolver, DeleteMode, Extension, FileId, FileRepository, Resolution, Transaction, VariantId,
};
use tempfile::tempdir;

struct FixedResolution(Resolution);

#[async_trait::async_trait]
impl CleanupResolver for FixedResolution {
    async fn resolve(&self, _file_id: FileId, _variant: Option<&VariantId>) -> Resolution {
        self.0
    }
}

fn config_at(base: PathBuf) -> RepositoryConfig {
    RepositoryConfig {
        base_directory: base,
        delete_delay: Duration::from_millis(0),
        indeterminate_delay: Duration::from_millis(0),
        health_check_interval: Duration::from_secs(15),
        max_access_wait_or_retry: Duration::from_secs(5),
        marker_file_logging: MarkerLogging::HumanReadable,
        allowed_extensions: None,
    }
}

fn write_source(dir: &std::path::Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn s1_basic_lifecycle_leaves_no_markers() {
    let root = tempdir().unwrap();
    let repo = FilesystemRepository::new(config_at(root.path().to_path_buf()));
    repo.init().await.unwrap();

    let source = write_source(root.path(), "in.jpg", b"hello");
    let ext = Extension::parse("jpg").unwrap();

    let mut txn = Transaction::new(&repo);
    let (id, _path) = txn.add(None, &source, &ext, &[], &CancellationToken::new()).await.unwrap();
    txn.commit().await;

    let path = repo.get(id, None).await.unwrap();
    assert!(path.ends_with("$main$.jpg"));
    assert_eq!(std::fs::read(&path).unwrap(), b"hello");

    let layout = repo.layout();
    assert!(!layout.indeterminate_marker(id).exists());
    assert!(!layout.delete_marker(id).exists());
}

#[tokio::test]
async fn s2_rollback_discards_staged_add_by_physically_removing_it() {
    let root = tempdir().unwrap();
    let repo = FilesystemRepository::new(config_at(root.path().to_path_buf()));
    repo.init().await.unwrap();

    let source = write_source(root.path(), "in.jpg", b"hello");
    let ext = Extension::parse("jpg").unwrap();

    let mut txn = Transaction::new(&repo);
    let (id, _path) = txn.add(None, &source, &ext, &[], &CancellationToken::new()).await.unwrap();

    // The add already landed on disk: this is real, recoverable debris, not
    // merely an in-memory staged operation. The file is indeterminate —
    // invisible to `get` — until the transaction settles it.
    assert!(repo.layout().file_dir(id).exists());
    assert!(repo.layout().indeterminate_marker(id).exists());
    assert!(matches!(repo.get(id, None).await, Err(file_repo_domain::RepoError::NotFound(_))));

    txn.rollback().await;

    // Rollback physically undoes what the add wrote to disk.
    assert!(!repo.layout().file_dir(id).exists());
    assert!(!repo.layout().indeterminate_marker(id).exists());
    assert!(matches!(repo.get(id, None).await, Err(file_repo_domain::RepoError::NotFound(_))));
}

#[tokio::test]
async fn s3_crash_leaves_indeterminate_marker_until_cleanup_resolves_it() {
    let root = tempdir().unwrap();
    let config = config_at(root.path().to_path_buf());
    let repo = FilesystemRepository::new(config.clone());
    repo.init().await.unwrap();

    let source = write_source(root.path(), "in.jpg", b"hello");
    let ext = Extension::parse("jpg").unwrap();
    let (id, _path) = repo.add(None, &source, &ext, &[], &CancellationToken::new()).await.unwrap();

    // Nobody ever calls `finalize_add` for this id: the `.ind` marker the
    // add left behind is exactly the debris a crash right after the rename
    // would leave (spec.md §8 S3).
    let ind = repo.layout().indeterminate_marker(id);
    assert!(ind.exists());
    assert!(matches!(repo.get(id, None).await, Err(file_repo_domain::RepoError::NotFound(_))));

    let resolved = repo.cleanup(&FixedResolution(Resolution::Keep), &CancellationToken::new()).await.unwrap();
    assert_eq!(resolved, 1);
    assert!(!ind.exists());
    assert!(repo.get(id, None).await.is_ok());
}

#[tokio::test]
async fn s3_crash_with_delete_resolution_removes_the_file() {
    let root = tempdir().unwrap();
    let repo = FilesystemRepository::new(config_at(root.path().to_path_buf()));
    repo.init().await.unwrap();

    let source = write_source(root.path(), "in.jpg", b"hello");
    let ext = Extension::parse("jpg").unwrap();
    let (id, _path) = repo.add(None, &source, &ext, &[], &CancellationToken::new()).await.unwrap();

    repo.cleanup(&FixedResolution(Resolution::Delete), &CancellationToken::new()).await.unwrap();
    assert!(matches!(repo.get(id, None).await, Err(file_repo_domain::RepoError::NotFound(_))));
    assert!(!repo.layout().file_dir(id).exists());
}

#[tokio::test]
async fn s4_variant_and_delayed_delete() {
    let root = tempdir().unwrap();
    let repo = FilesystemRepository::new(config_at(root.path().to_path_buf()));
    repo.init().await.unwrap();

    let main_source = write_source(root.path(), "main.jpg", b"main-bytes");
    let ext = Extension::parse("jpg").unwrap();
    let mut txn = Transaction::new(&repo);
    let (id, _path) = txn.add(None, &main_source, &ext, &[], &CancellationToken::new()).await.unwrap();
    txn.commit().await;

    let thumb_source = write_source(root.path(), "thumb.jpg", b"thumb-bytes");
    let variant = VariantId::parse("thumb").unwrap();
    let outcome = repo.add_variant(id, &variant, &thumb_source, &ext, &[], &CancellationToken::new()).await.unwrap();
    assert!(outcome.was_added());

    assert!(repo.get(id, None).await.is_ok());
    assert!(repo.get(id, Some(&variant)).await.is_ok());

    repo.delete(id, None, DeleteMode::Delayed).await.unwrap();

    // Still readable until the sweep runs.
    assert!(repo.get(id, None).await.is_ok());
    assert!(repo.get(id, Some(&variant)).await.is_ok());

    let resolved = repo.cleanup(&FixedResolution(Resolution::Keep), &CancellationToken::new()).await.unwrap();
    assert_eq!(resolved, 1);
    assert!(matches!(repo.get(id, None).await, Err(file_repo_domain::RepoError::NotFound(_))));
    assert!(!repo.layout().file_dir(id).exists());
}

#[tokio::test]
async fn add_variant_distinguishes_already_existing_from_just_added() {
    let root = tempdir().unwrap();
    let repo = FilesystemRepository::new(config_at(root.path().to_path_buf()));
    repo.init().await.unwrap();

    let main_source = write_source(root.path(), "main.jpg", b"main-bytes");
    let ext = Extension::parse("jpg").unwrap();
    let mut txn = Transaction::new(&repo);
    let (id, _path) = txn.add(None, &main_source, &ext, &[], &CancellationToken::new()).await.unwrap();
    txn.commit().await;

    let thumb_source = write_source(root.path(), "thumb.jpg", b"thumb-bytes");
    let variant = VariantId::parse("thumb").unwrap();

    let first = repo.add_variant(id, &variant, &thumb_source, &ext, &[], &CancellationToken::new()).await.unwrap();
    assert!(first.was_added());

    let second = repo.add_variant(id, &variant, &thumb_source, &ext, &[], &CancellationToken::new()).await.unwrap();
    assert!(!second.was_added());
    assert_eq!(first.path(), second.path());
}

struct SlowProcessor(Duration);
impl file_repo_domain::Processor for SlowProcessor {
    fn process(&self, _ctx: &mut file_repo_domain::ProcessingContext) -> Result<(), file_repo_domain::RepoError> {
        std::thread::sleep(self.0);
        Ok(())
    }
    fn name(&self) -> &str {
        "slow"
    }
}

struct SlowRegistry;
impl file_repo_domain::ProcessorRegistry for SlowRegistry {
    fn lookup(&self, name: &str) -> Option<Arc<dyn file_repo_domain::Processor>> {
        if name == "slow" {
            Some(Arc::new(SlowProcessor(Duration::from_millis(200))))
        } else {
            None
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn try_add_variant_reports_in_progress_instead_of_blocking() {
    let root = tempdir().unwrap();
    let repo = Arc::new(FilesystemRepository::with_processors(
        config_at(root.path().to_path_buf()),
        Arc::new(SlowRegistry),
    ));
    repo.init().await.unwrap();

    let main_source = write_source(root.path(), "main.jpg", b"main-bytes");
    let ext = Extension::parse("jpg").unwrap();
    let mut txn = Transaction::new(&*repo);
    let (id, _path) = txn.add(None, &main_source, &ext, &[], &CancellationToken::new()).await.unwrap();
    txn.commit().await;

    let variant = VariantId::parse("thumb").unwrap();
    let thumb_source = write_source(root.path(), "thumb.jpg", b"thumb-bytes");

    let repo2 = repo.clone();
    let thumb_source2 = thumb_source.clone();
    let variant2 = variant.clone();
    let ext2 = ext.clone();
    let holder = tokio::spawn(async move { repo2.add_variant(id, &variant2, &thumb_source2, &ext2, &["slow"], &CancellationToken::new()).await });

    // Give the holder time to acquire the per-variant lock and enter the
    // slow processor before contending for the same key.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let result = repo.try_add_variant(id, &variant, &thumb_source, &ext, &[], &CancellationToken::new()).await;
    assert!(matches!(result, Err(file_repo_domain::RepoError::InProgress(_))));

    let outcome = holder.await.unwrap().unwrap();
    assert!(outcome.was_added());
}

#[tokio::test]
async fn s5_concurrent_delete_is_rejected_while_an_uncommitted_add_holds_the_marker() {
    let root = tempdir().unwrap();
    let repo = FilesystemRepository::new(config_at(root.path().to_path_buf()));
    repo.init().await.unwrap();

    let source = write_source(root.path(), "in.jpg", b"hello");
    let ext = Extension::parse("jpg").unwrap();

    let mut txn_a = Transaction::new(&repo);
    let (id, _path) = txn_a.add(None, &source, &ext, &[], &CancellationToken::new()).await.unwrap();

    // `txn_a`'s add already wrote its `.ind` marker and has not committed.
    // A second, independent transaction racing a delete against the same
    // id must see that marker and back off rather than proceeding as if
    // the file were settled.
    assert!(repo.layout().indeterminate_marker(id).exists());
    let mut txn_b = Transaction::new(&repo);
    assert!(matches!(txn_b.delete(id).await, Err(file_repo_domain::RepoError::InProgress(_))));

    txn_a.commit().await;
    assert!(!repo.layout().indeterminate_marker(id).exists());

    // Now that `txn_a`'s add is committed, the same delete succeeds and
    // leaves the delayed-delete marker in its place.
    txn_b.delete(id).await.unwrap();
    txn_b.commit().await;
    assert!(repo.layout().delete_marker(id).exists());
    // Delayed delete: still visible until the cleanup sweep runs.
    assert!(repo.get(id, None).await.is_ok());
}

#[tokio::test]
async fn s6_concurrent_adds_produce_distinct_ids() {
    let root = tempdir().unwrap();
    let repo = Arc::new(FilesystemRepository::new(config_at(root.path().to_path_buf())));
    repo.init().await.unwrap();

    const COUNT: usize = 500;
    let mut handles = Vec::with_capacity(COUNT);
    for i in 0..COUNT {
        let repo = repo.clone();
        let dir = root.path().to_path_buf();
        handles.push(tokio::spawn(async move {
            let source = write_source(&dir, &format!("in-{i}.bin"), format!("payload-{i}").as_bytes());
            let ext = Extension::parse("bin").unwrap();
            repo.add(None, &source, &ext, &[], &CancellationToken::new()).await.unwrap().0
        }));
    }

    let mut ids = std::collections::HashSet::with_capacity(COUNT);
    for handle in handles {
        let id = handle.await.unwrap();
        assert!(ids.insert(id), "duplicate id generated under concurrency");
    }
    assert_eq!(ids.len(), COUNT);
}
