//! End-to-end watch loop: real filesystem events through to a fake viewer.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use deckwatch::config::Settings;
use deckwatch::events::{CoordinatorEvent, EventBroadcaster};
use deckwatch::relaunch::{RelaunchCoordinator, RelaunchError, ViewerControl};
use deckwatch::state::StateKeeper;
use deckwatch::watcher::{FolderWatcher, WatchError};

struct RecordingViewer {
    spawned: Mutex<Vec<PathBuf>>,
}

impl RecordingViewer {
    fn new() -> Self {
        Self {
            spawned: Mutex::new(Vec::new()),
        }
    }
}

impl ViewerControl for RecordingViewer {
    fn terminate_matching(&self) -> Result<usize, RelaunchError> {
        Ok(0)
    }

    fn spawn_viewer(&self, file: &Path) -> io::Result<()> {
        self.spawned.lock().unwrap().push(file.to_path_buf());
        Ok(())
    }
}

fn coordinator_for(
    temp: &TempDir,
    broadcaster: &EventBroadcaster,
) -> (Arc<RelaunchCoordinator>, tokio::task::JoinHandle<()>) {
    let (state_handle, keeper) =
        StateKeeper::new(Settings::default(), temp.path().join("settings.toml"));
    let keeper_task = tokio::spawn(keeper.run());

    let viewer = Arc::new(RecordingViewer::new());
    let coordinator = Arc::new(RelaunchCoordinator::new(
        viewer,
        state_handle,
        broadcaster.clone(),
    ));
    (coordinator, keeper_task)
}

async fn next_event(
    rx: &mut tokio::sync::broadcast::Receiver<CoordinatorEvent>,
) -> CoordinatorEvent {
    timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("broadcast channel closed")
}

#[tokio::test]
async fn test_created_deck_triggers_relaunch() {
    let temp = TempDir::new().unwrap();
    let broadcaster = EventBroadcaster::new(32);
    let mut rx = broadcaster.subscribe();
    let (coordinator, _keeper) = coordinator_for(&temp, &broadcaster);

    let watcher = FolderWatcher::builder()
        .directory(temp.path().to_path_buf())
        .poll_interval_ms(50)
        .coordinator(coordinator)
        .broadcaster(broadcaster.clone())
        .build()
        .unwrap();

    let shutdown = CancellationToken::new();
    let watch_task = tokio::spawn(watcher.watch(shutdown.clone()));

    match next_event(&mut rx).await {
        CoordinatorEvent::WatchStateChanged { watching } => assert!(watching),
        other => panic!("expected WatchStateChanged, got {other:?}"),
    }

    // Give the watcher a moment, then drop a deck into the folder
    tokio::time::sleep(Duration::from_millis(100)).await;
    let deck = temp.path().join("town-hall.pptx");
    std::fs::write(&deck, b"deck").unwrap();

    match next_event(&mut rx).await {
        CoordinatorEvent::RelaunchSucceeded { file, .. } => assert_eq!(file, deck),
        other => panic!("unexpected event: {other:?}"),
    }

    shutdown.cancel();
    watch_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_non_matching_files_are_ignored() {
    let temp = TempDir::new().unwrap();
    let broadcaster = EventBroadcaster::new(32);
    let mut rx = broadcaster.subscribe();
    let (coordinator, _keeper) = coordinator_for(&temp, &broadcaster);

    let watcher = FolderWatcher::builder()
        .directory(temp.path().to_path_buf())
        .poll_interval_ms(50)
        .coordinator(coordinator)
        .broadcaster(broadcaster.clone())
        .build()
        .unwrap();

    let shutdown = CancellationToken::new();
    let watch_task = tokio::spawn(watcher.watch(shutdown.clone()));

    // Skip the WatchStateChanged(true) event
    next_event(&mut rx).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    // Office lock file and unrelated extension, both filtered out
    std::fs::write(temp.path().join("~$town-hall.pptx"), b"lock").unwrap();
    std::fs::write(temp.path().join("notes.txt"), b"notes").unwrap();

    // A few poll intervals pass with no relaunch
    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.cancel();

    match next_event(&mut rx).await {
        CoordinatorEvent::WatchStateChanged { watching } => assert!(!watching),
        other => panic!("expected quiet stop, got {other:?}"),
    }

    watch_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_watch_without_directory_is_rejected() {
    let temp = TempDir::new().unwrap();
    let broadcaster = EventBroadcaster::new(32);
    let mut rx = broadcaster.subscribe();
    let (coordinator, _keeper) = coordinator_for(&temp, &broadcaster);

    let result = FolderWatcher::builder()
        .coordinator(coordinator)
        .broadcaster(broadcaster.clone())
        .build();

    assert!(matches!(
        result.err(),
        Some(WatchError::NoDirectorySelected { .. })
    ));

    // The rejection is reported and no watch state transition happened
    match rx.try_recv().unwrap() {
        CoordinatorEvent::NoDirectorySelected => {}
        other => panic!("expected NoDirectorySelected, got {other:?}"),
    }
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_watch_with_empty_directory_is_rejected() {
    let temp = TempDir::new().unwrap();
    let broadcaster = EventBroadcaster::new(32);
    let (coordinator, _keeper) = coordinator_for(&temp, &broadcaster);

    let result = FolderWatcher::builder()
        .directory(PathBuf::new())
        .coordinator(coordinator)
        .broadcaster(broadcaster.clone())
        .build();

    assert!(matches!(
        result.err(),
        Some(WatchError::NoDirectorySelected { .. })
    ));
}

#[tokio::test]
async fn test_watch_with_missing_directory_is_rejected() {
    let temp = TempDir::new().unwrap();
    let broadcaster = EventBroadcaster::new(32);
    let (coordinator, _keeper) = coordinator_for(&temp, &broadcaster);

    let result = FolderWatcher::builder()
        .directory(temp.path().join("gone"))
        .coordinator(coordinator)
        .broadcaster(broadcaster.clone())
        .build();

    assert!(matches!(
        result.err(),
        Some(WatchError::NoDirectorySelected { .. })
    ));
}
