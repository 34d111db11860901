//! Integration tests for the capture session lifecycle
//!
//! Drives a capture session with a scripted recorder backend against both
//! sink strategies and checks the ordering, cancellation, and teardown
//! guarantees.

use async_trait::async_trait;
use std::path::PathBuf;
use streamside_core::StreamsideError;
use streamside_media::*;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}-{}", uuid::Uuid::new_v4(), name))
}

fn session() -> CaptureSession {
    CaptureSession::new(CaptureConfig::new(std::env::temp_dir()))
}

/// Picker that always reports a dismissed dialog
struct CancellingPicker;

#[async_trait]
impl SaveTargetPicker for CancellingPicker {
    async fn pick_save_target(&self, _suggested_name: &str) -> SaveTargetChoice {
        SaveTargetChoice::Cancelled
    }
}

// ============================================================================
// PROGRESSIVE SINK LIFECYCLE
// ============================================================================

#[tokio::test]
async fn progressive_recording_writes_segments_in_emission_order() {
    let path = temp_path("ordered.webm");
    let recorder = ScriptedRecorder::new(vec![b"seg-1|", b"seg-2|"]);
    let handle = recorder.handle();

    let mut session = session();
    let picker = FixedTargetPicker { path: path.clone() };
    let outcome = session.start(Box::new(recorder), &picker).await.unwrap();
    assert_eq!(outcome, StartOutcome::Started);
    assert_eq!(session.state(), CaptureState::Recording);

    // A segment flushed by the recorder when it is asked to stop must still
    // land in the file, after the earlier ones.
    handle.push_segment(b"seg-3");
    let artifact = session.stop().await.unwrap();

    assert_eq!(session.state(), CaptureState::Idle);
    assert_eq!(artifact.sink.segments_written, 3);
    assert!(handle.tracks_released());

    // Concatenated file bytes equal the emitted segments in order: no
    // reordering, no drops, no duplication.
    let contents = tokio::fs::read(&path).await.unwrap();
    assert_eq!(contents, b"seg-1|seg-2|seg-3");
    tokio::fs::remove_file(&path).await.unwrap();
}

#[tokio::test]
async fn instant_stop_produces_zero_byte_artifact() {
    let path = temp_path("instant.webm");
    let recorder = ScriptedRecorder::new(Vec::new());

    let mut session = session();
    let picker = FixedTargetPicker { path: path.clone() };
    session.start(Box::new(recorder), &picker).await.unwrap();
    let artifact = session.stop().await.unwrap();

    assert_eq!(artifact.sink.segments_written, 0);
    assert_eq!(artifact.sink.bytes_written, 0);
    assert_eq!(tokio::fs::read(&path).await.unwrap().len(), 0);
    tokio::fs::remove_file(&path).await.unwrap();
}

// ============================================================================
// BUFFERING FALLBACK
// ============================================================================

#[tokio::test]
async fn unsupported_picker_falls_back_to_buffered_download() {
    let recorder = ScriptedRecorder::new(vec![b"aa", b"bb", b"cc"]);

    let mut session = session();
    session
        .start(Box::new(recorder), &UnsupportedPicker)
        .await
        .unwrap();
    let artifact = session.stop().await.unwrap();

    assert_eq!(artifact.sink.segments_written, 3);
    assert_eq!(artifact.sink.bytes_written, 6);
    let contents = tokio::fs::read(&artifact.sink.artifact_path).await.unwrap();
    assert_eq!(contents, b"aabbcc");
    tokio::fs::remove_file(&artifact.sink.artifact_path)
        .await
        .unwrap();
}

// ============================================================================
// STATE MACHINE EDGES
// ============================================================================

#[tokio::test]
async fn cancelled_picker_returns_to_idle_without_error() {
    let recorder = ScriptedRecorder::new(vec![b"never"]);

    let mut session = session();
    let outcome = session
        .start(Box::new(recorder), &CancellingPicker)
        .await
        .unwrap();

    assert_eq!(outcome, StartOutcome::Cancelled);
    assert_eq!(session.state(), CaptureState::Idle);
    // A cancelled start never reached the recorder, so stop has nothing to do.
    assert!(matches!(
        session.stop().await,
        Err(StreamsideError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn second_start_while_recording_is_rejected() {
    let first = ScriptedRecorder::new(vec![b"x"]);
    let second = ScriptedRecorder::new(vec![b"y"]);

    let mut session = session();
    session
        .start(Box::new(first), &UnsupportedPicker)
        .await
        .unwrap();

    let err = session
        .start(Box::new(second), &UnsupportedPicker)
        .await
        .unwrap_err();
    match err {
        StreamsideError::InvalidTransition { expected, actual } => {
            assert_eq!(expected, "idle");
            assert_eq!(actual, "recording");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // The original recording is unaffected.
    let artifact = session.stop().await.unwrap();
    assert_eq!(artifact.sink.segments_written, 1);
    tokio::fs::remove_file(&artifact.sink.artifact_path)
        .await
        .unwrap();
}

#[tokio::test]
async fn failed_stream_acquisition_aborts_to_idle() {
    let mut session = session();
    let err = session
        .start(Box::new(ScriptedRecorder::failing_open()), &UnsupportedPicker)
        .await
        .unwrap_err();

    assert!(matches!(err, StreamsideError::MediaUnavailable { .. }));
    assert_eq!(session.state(), CaptureState::Idle);

    // The session is reusable after the failure.
    let recorder = ScriptedRecorder::new(vec![b"ok"]);
    session
        .start(Box::new(recorder), &UnsupportedPicker)
        .await
        .unwrap();
    let artifact = session.stop().await.unwrap();
    assert_eq!(artifact.sink.segments_written, 1);
    tokio::fs::remove_file(&artifact.sink.artifact_path)
        .await
        .unwrap();
}

#[tokio::test]
async fn machine_without_microphones_records_video_only() {
    use std::sync::Arc;

    // The device layer on a mic-less machine: the audio probe is denied and
    // enumeration yields no microphones.
    let platform = Arc::new(MockDevicePlatform::new(vec![MediaDeviceInfo {
        id: "cam-1".to_string(),
        label: "Integrated Camera".to_string(),
        kind: MediaDeviceKind::Camera,
    }]));
    platform.deny(MediaKind::Audio);
    let manager = DeviceManager::new(platform);
    manager.refresh().await.unwrap();
    assert!(manager.inventory().microphones.is_empty());

    // The default constraints demand audio, so a recorder on this machine
    // fails stream acquisition and the session falls back to idle.
    let mut session = session();
    let err = session
        .start(
            Box::new(ScriptedRecorder::new(vec![b"x"]).without_audio_device()),
            &UnsupportedPicker,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StreamsideError::MediaUnavailable { .. }));
    assert_eq!(session.state(), CaptureState::Idle);

    // Dropping the audio half lets the same machine record video-only.
    let mut config = CaptureConfig::new(std::env::temp_dir());
    config.constraints = MediaConstraints::video_only();
    let mut session = CaptureSession::new(config);
    let outcome = session
        .start(
            Box::new(ScriptedRecorder::new(vec![b"video-only"]).without_audio_device()),
            &UnsupportedPicker,
        )
        .await
        .unwrap();
    assert_eq!(outcome, StartOutcome::Started);

    let artifact = session.stop().await.unwrap();
    assert_eq!(artifact.sink.segments_written, 1);
    let contents = tokio::fs::read(&artifact.sink.artifact_path).await.unwrap();
    assert_eq!(contents, b"video-only");
    tokio::fs::remove_file(&artifact.sink.artifact_path)
        .await
        .unwrap();
}

#[tokio::test]
async fn drop_mid_recording_releases_tracks_and_closes_the_target() {
    let path = temp_path("teardown.webm");
    let recorder = ScriptedRecorder::new(vec![b"early"]);
    let handle = recorder.handle();

    let mut session = session();
    let picker = FixedTargetPicker { path: path.clone() };
    session.start(Box::new(recorder), &picker).await.unwrap();
    drop(session);

    // The detached pump and writer finish up after the drop.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(handle.is_stopped());
    assert!(handle.tracks_released());
    assert_eq!(tokio::fs::read(&path).await.unwrap(), b"early");
    tokio::fs::remove_file(&path).await.unwrap();
}

#[tokio::test]
async fn duration_counter_runs_only_while_recording() {
    tokio::time::pause();

    let recorder = ScriptedRecorder::new(vec![b"x"]);
    let mut session = session();
    session
        .start(Box::new(recorder), &UnsupportedPicker)
        .await
        .unwrap();

    // Let the ticker task register its interval against the paused clock.
    tokio::task::yield_now().await;
    tokio::time::advance(std::time::Duration::from_secs(3)).await;
    // Let the ticker task observe the advanced clock.
    tokio::task::yield_now().await;
    assert!(session.duration_secs() >= 2);

    let artifact = session.stop().await.unwrap();
    assert!(artifact.duration_secs >= 2);
    // Counter cleared on stop.
    assert_eq!(session.duration_secs(), 0);
    tokio::fs::remove_file(&artifact.sink.artifact_path)
        .await
        .unwrap();
}
