//! Watching real directories end to end

use batchwatch_core::{routine, Batch, BoxError};
use batchwatch_watcher::{watch, watch_with_setup, FileStat, WatchError, WatchOptions};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(10);

fn options(ignore_initial: bool) -> WatchOptions {
    WatchOptions {
        throttle_ms: 20,
        ignore_initial,
        ..WatchOptions::default()
    }
}

fn channel_consumer() -> (
    impl batchwatch_core::Routine<Batch<FileStat>>,
    mpsc::UnboundedReceiver<Batch<FileStat>>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let consumer = routine::from_fn(move |batch: Batch<FileStat>| {
        let tx = tx.clone();
        async move {
            let _ = tx.send(batch);
            Ok::<(), BoxError>(())
        }
    });
    (consumer, rx)
}

/// Receive batches until `path` shows up in the added or changed list
async fn wait_for(rx: &mut mpsc::UnboundedReceiver<Batch<FileStat>>, path: &Path) -> Batch<FileStat> {
    loop {
        let batch = timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for batch")
            .expect("consumer dropped");
        if batch.added.iter().chain(&batch.changed).any(|e| e.path == path) {
            return batch;
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_initial_scan_reports_existing_files() {
    let temp_dir = TempDir::new().unwrap();
    let root = fs::canonicalize(temp_dir.path()).unwrap();
    fs::write(root.join("existing.txt"), b"hello").unwrap();
    fs::create_dir_all(root.join(".git")).unwrap();
    fs::write(root.join(".git/HEAD"), b"ref").unwrap();

    let (consumer, mut rx) = channel_consumer();
    let _watcher = watch(&[root.clone()], &options(false), consumer).unwrap();

    let batch = wait_for(&mut rx, &root.join("existing.txt")).await;
    let entry = batch
        .added
        .iter()
        .find(|e| e.path == root.join("existing.txt"))
        .unwrap();
    assert_eq!(entry.payload.as_ref().map(|s| s.len), Some(5));
    assert!(batch.added.iter().all(|e| !e.path.starts_with(root.join(".git"))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_new_file_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let root = fs::canonicalize(temp_dir.path()).unwrap();

    let (consumer, mut rx) = channel_consumer();
    let watcher = watch(&[root.clone()], &options(true), consumer).unwrap();
    assert_eq!(watcher.roots(), &[root.clone()]);

    let file = root.join("new.txt");
    fs::write(&file, b"data").unwrap();

    wait_for(&mut rx, &file).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_setup_runs_before_first_batch() {
    let temp_dir = TempDir::new().unwrap();
    let root = fs::canonicalize(temp_dir.path()).unwrap();
    fs::write(root.join("a.txt"), b"a").unwrap();

    let (consumer, mut rx) = channel_consumer();
    let (setup_tx, mut setup_rx) = mpsc::unbounded_channel::<()>();
    let setup = routine::setup_fn(move || {
        let setup_tx = setup_tx.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = setup_tx.send(());
            Ok::<(), BoxError>(())
        }
    });

    let _watcher = watch_with_setup(&[root.clone()], &options(false), consumer, setup).unwrap();

    let batch = wait_for(&mut rx, &root.join("a.txt")).await;
    // Setup signalled before the batch arrived
    assert!(setup_rx.try_recv().is_ok());
    assert!(!batch.is_empty());
}

#[tokio::test]
async fn test_missing_root_is_rejected() {
    let (consumer, _rx) = channel_consumer();
    let missing = PathBuf::from("/definitely/not/here/batchwatch");

    let result = watch(&[missing], &options(true), consumer);
    assert!(matches!(result, Err(WatchError::Root { .. })));
}

#[tokio::test]
async fn test_no_roots_is_rejected() {
    let (consumer, _rx) = channel_consumer();
    let result = watch(&[], &options(true), consumer);
    assert!(matches!(result, Err(WatchError::NoRoots)));
}
