//! Recording sessions end to end, with `sh` standing in for the recorder
//! and the concat step.

#![cfg(unix)]

mod common;

use areacast_lib::artifact::ArtifactKind;
use areacast_lib::capture::{CaptureError, ProcessOptions, Toolchain};
use areacast_lib::event::AppEvent;
use areacast_lib::geometry::Rect;
use areacast_lib::session::{
    EndOutcome, FinalizeError, SessionController, SessionError, SessionPaths, SessionState,
};
use common::{scratch_dirs, segment_files, wait_for_content, wait_for_file, ManualClock, Recorder, ScriptToolchain};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

struct Harness {
    session: SessionController,
    clock: Arc<ManualClock>,
    events: UnboundedReceiver<AppEvent>,
    _dir: tempfile::TempDir,
    work: std::path::PathBuf,
    videos: std::path::PathBuf,
}

fn harness(toolchain: ScriptToolchain) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let (work, out) = scratch_dirs(dir.path());
    let videos = out.join("videos");
    let clock = Arc::new(ManualClock::new());
    let (tx, rx) = mpsc::unbounded_channel();
    let options = ProcessOptions {
        stop_grace: Duration::from_secs(2),
        ..ProcessOptions::default()
    };
    let toolchain: Arc<dyn Toolchain> = Arc::new(toolchain);
    let session = SessionController::new(
        Rect::new(0, 0, 640, 480),
        toolchain,
        options,
        SessionPaths::new(&work, &videos),
        tx,
    )
    .with_clock(clock.clone());
    Harness {
        session,
        clock,
        events: rx,
        _dir: dir,
        work,
        videos,
    }
}

async fn wait_for_last_segment(session: &SessionController) -> Vec<u8> {
    let path = session.segments().last().expect("a segment").path.clone();
    wait_for_content(&path).await;
    std::fs::read(&path).unwrap()
}

fn read(path: &Path) -> Vec<u8> {
    std::fs::read(path).unwrap()
}

#[tokio::test]
async fn two_plus_one_seconds_become_one_recording() {
    let mut h = harness(ScriptToolchain::default());

    h.session.start().await.unwrap();
    let first = wait_for_last_segment(&h.session).await;
    h.clock.advance(Duration::from_secs(2));
    h.session.pause().await.unwrap();
    assert_eq!(h.session.state(), SessionState::Paused);
    assert_eq!(h.session.elapsed_display(), "00:02");

    // Paused time does not count.
    h.clock.advance(Duration::from_secs(5));
    h.session.resume().await.unwrap();
    let second = wait_for_last_segment(&h.session).await;
    assert_ne!(first, second);
    h.clock.advance(Duration::from_secs(1));

    let artifact = match h.session.end().await {
        EndOutcome::Finalized(artifact) => artifact,
        other => panic!("expected a recording, got {:?}", other),
    };
    assert_eq!(h.session.state(), SessionState::Finalized);
    assert_eq!(h.session.elapsed(), Duration::from_secs(3));
    assert_eq!(artifact.kind, ArtifactKind::Video);
    assert!(artifact.path.starts_with(&h.videos));

    // Concatenated in recording order.
    let expected: Vec<u8> = first.iter().chain(second.iter()).copied().collect();
    assert_eq!(read(&artifact.path), expected);
    assert!(segment_files(&h.work).is_empty(), "{:?}", segment_files(&h.work));
}

#[tokio::test]
async fn single_segment_is_moved_byte_for_byte() {
    let mut h = harness(ScriptToolchain::default());

    h.session.start().await.unwrap();
    let bytes = wait_for_last_segment(&h.session).await;

    let artifact = match h.session.end().await {
        EndOutcome::Finalized(artifact) => artifact,
        other => panic!("expected a recording, got {:?}", other),
    };
    assert_eq!(read(&artifact.path), bytes);
    assert_eq!(artifact.size_bytes, bytes.len() as u64);
    assert!(segment_files(&h.work).is_empty());
}

#[tokio::test]
async fn each_resume_adds_a_segment() {
    let mut h = harness(ScriptToolchain::default());

    h.session.start().await.unwrap();
    wait_for_last_segment(&h.session).await;
    for _ in 0..2 {
        h.session.toggle_pause().await.unwrap();
        assert_eq!(h.session.state(), SessionState::Paused);
        h.session.toggle_pause().await.unwrap();
        assert_eq!(h.session.state(), SessionState::Recording);
        wait_for_last_segment(&h.session).await;
    }
    assert_eq!(h.session.segments().len(), 3);

    let names: Vec<_> = h.session.segments().iter().map(|s| s.path.clone()).collect();
    assert!(names.windows(2).all(|w| w[0] != w[1]));

    assert!(matches!(h.session.end().await, EndOutcome::Finalized(_)));
}

#[tokio::test]
async fn start_over_discards_everything_recorded() {
    let mut h = harness(ScriptToolchain::default());

    h.session.start().await.unwrap();
    wait_for_last_segment(&h.session).await;
    h.clock.advance(Duration::from_secs(4));
    h.session.pause().await.unwrap();
    h.session.resume().await.unwrap();
    wait_for_last_segment(&h.session).await;
    let discarded: Vec<_> = h.session.segments().iter().map(|s| s.path.clone()).collect();

    h.session.start_over().await.unwrap();
    assert_eq!(h.session.state(), SessionState::Recording);
    assert_eq!(h.session.segments().len(), 1);
    assert_eq!(h.session.elapsed(), Duration::ZERO);
    assert!(discarded.iter().all(|p| !p.exists()));

    let fresh = wait_for_last_segment(&h.session).await;
    let artifact = match h.session.end().await {
        EndOutcome::Finalized(artifact) => artifact,
        other => panic!("expected a recording, got {:?}", other),
    };
    assert_eq!(read(&artifact.path), fresh);
}

#[tokio::test]
async fn empty_recording_is_an_error_and_leaves_nothing_behind() {
    let mut h = harness(ScriptToolchain {
        recorder: Recorder::Empty,
        ..ScriptToolchain::default()
    });

    h.session.start().await.unwrap();
    let path = h.session.segments()[0].path.clone();
    wait_for_file(&path).await;

    match h.session.end().await {
        EndOutcome::Failed(FinalizeError::EmptyOutput(_)) => {}
        other => panic!("expected EmptyOutput, got {:?}", other),
    }
    assert_eq!(h.session.state(), SessionState::Failed);
    assert!(segment_files(&h.work).is_empty());
    assert!(common::file_names(&h.videos).is_empty());
}

#[tokio::test]
async fn failed_merge_still_cleans_up() {
    let mut h = harness(ScriptToolchain {
        concat_fails: true,
        ..ScriptToolchain::default()
    });

    h.session.start().await.unwrap();
    wait_for_last_segment(&h.session).await;
    h.session.pause().await.unwrap();
    h.session.resume().await.unwrap();
    wait_for_last_segment(&h.session).await;

    match h.session.end().await {
        EndOutcome::Failed(FinalizeError::Merge { status, diagnostics }) => {
            assert_eq!(status, Some(1));
            assert!(diagnostics.contains("Invalid data"));
        }
        other => panic!("expected a merge failure, got {:?}", other),
    }
    assert!(segment_files(&h.work).is_empty());
}

#[tokio::test]
async fn end_runs_only_once() {
    let mut h = harness(ScriptToolchain::default());

    h.session.start().await.unwrap();
    wait_for_last_segment(&h.session).await;
    assert!(matches!(h.session.end().await, EndOutcome::Finalized(_)));
    assert!(matches!(h.session.end().await, EndOutcome::AlreadyFinished));
    assert!(h.session.pause().await.is_err());
}

#[tokio::test]
async fn missing_recorder_fails_the_session() {
    let mut h = harness(ScriptToolchain {
        recorder: Recorder::Missing,
        ..ScriptToolchain::default()
    });

    let err = h.session.start().await.unwrap_err();
    assert!(matches!(err, SessionError::Capture(CaptureError::Spawn { .. })));
    assert_eq!(h.session.state(), SessionState::Failed);
    assert!(h.session.segments().is_empty());
}

#[tokio::test]
async fn recorder_error_is_posted_with_the_segment_epoch() {
    let mut h = harness(ScriptToolchain {
        recorder: Recorder::Failing,
        ..ScriptToolchain::default()
    });

    h.session.start().await.unwrap();
    let epoch = h.session.epoch();

    let event = tokio::time::timeout(Duration::from_secs(5), h.events.recv())
        .await
        .expect("failure reported")
        .expect("channel open");
    match event {
        AppEvent::CaptureFailed {
            epoch: reported,
            message,
        } => {
            assert_eq!(reported, epoch);
            assert!(message.contains("Error opening input device"));
            h.session.fail(&message).await;
        }
        other => panic!("unexpected event {:?}", other),
    }

    assert_eq!(h.session.state(), SessionState::Failed);
    assert!(h.session.segments().is_empty());
    assert!(segment_files(&h.work).is_empty());
    assert!(matches!(h.session.end().await, EndOutcome::AlreadyFinished));
}

#[tokio::test]
async fn abandon_discards_without_finalizing() {
    let mut h = harness(ScriptToolchain::default());

    h.session.start().await.unwrap();
    wait_for_last_segment(&h.session).await;
    h.session.abandon().await;

    assert_eq!(h.session.state(), SessionState::Failed);
    assert!(segment_files(&h.work).is_empty());
    assert!(common::file_names(&h.videos).is_empty());
}
