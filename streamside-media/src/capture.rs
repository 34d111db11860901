//! Capture session
//!
//! Wraps a recorder backend around a live media stream and forwards its
//! fixed-interval segments into a recording sink. The session is a small
//! state machine (`Idle -> Choosing -> Recording -> Saving -> Idle`) and
//! delivery is explicitly sequential: every segment passes through a
//! single-consumer queue into one writer task that owns the sink, so write
//! order always equals emission order.

use crate::sink::{BufferingSink, CaptureSegment, ProgressiveSink, RecordingSink, SinkReport};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use streamside_core::StreamsideError;
use tokio::sync::{mpsc, watch, Notify};
use tracing::{debug, info, warn};

/// Fixed segment-emission interval
pub const SEGMENT_INTERVAL: Duration = Duration::from_millis(1000);

/// Target video constraints for local recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoConstraints {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Target framerate
    pub framerate: u32,
}

/// Target audio constraints for local recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioConstraints {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u8,
}

/// Combined stream constraints requested from the recorder backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    /// Video constraints
    pub video: VideoConstraints,
    /// Audio constraints; `None` requests a video-only stream
    pub audio: Option<AudioConstraints>,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: VideoConstraints {
                width: 1280,
                height: 720,
                framerate: 24,
            },
            audio: Some(AudioConstraints {
                sample_rate: 44_100,
                channels: 1,
            }),
        }
    }
}

impl MediaConstraints {
    /// The recording profile without the audio half
    ///
    /// Used on machines with no audio inputs, where demanding audio would
    /// fail stream acquisition outright.
    pub fn video_only() -> Self {
        Self {
            audio: None,
            ..Self::default()
        }
    }
}

/// Recording primitive seam
///
/// Models the platform recorder: `open` acquires a stream under the given
/// constraints (video-only when `constraints.audio` is `None`) and arms
/// segment emission at the given interval; `next_segment` yields segments strictly in emission order and
/// returns `None` once the recorder has stopped and drained; `stop` requests
/// finalization (flushing any pending partial segment into the drain);
/// `release_tracks` releases the underlying stream.
#[async_trait]
pub trait RecorderBackend: Send {
    /// Acquire the media stream and arm segment emission
    async fn open(
        &mut self,
        constraints: &MediaConstraints,
        segment_interval: Duration,
    ) -> Result<(), StreamsideError>;

    /// Await the next segment in emission order
    async fn next_segment(&mut self) -> Option<CaptureSegment>;

    /// Request finalization of the recorder
    async fn stop(&mut self);

    /// Release all acquired media tracks
    fn release_tracks(&mut self);
}

/// Outcome of the save-target prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTargetChoice {
    /// The user chose a save location; record progressively into it
    Target(PathBuf),
    /// The platform has no save-file picker; fall back to buffering
    Unsupported,
    /// The user dismissed the picker
    Cancelled,
}

/// Save-file dialog seam
#[async_trait]
pub trait SaveTargetPicker: Send + Sync {
    /// Prompt for a save target, suggesting `suggested_name`
    async fn pick_save_target(&self, suggested_name: &str) -> SaveTargetChoice;
}

/// Picker that always yields a fixed target path
#[derive(Debug, Clone)]
pub struct FixedTargetPicker {
    /// Path handed out for every prompt
    pub path: PathBuf,
}

#[async_trait]
impl SaveTargetPicker for FixedTargetPicker {
    async fn pick_save_target(&self, _suggested_name: &str) -> SaveTargetChoice {
        SaveTargetChoice::Target(self.path.clone())
    }
}

/// Picker for platforms without a save-file dialog
#[derive(Debug, Clone, Default)]
pub struct UnsupportedPicker;

#[async_trait]
impl SaveTargetPicker for UnsupportedPicker {
    async fn pick_save_target(&self, _suggested_name: &str) -> SaveTargetChoice {
        SaveTargetChoice::Unsupported
    }
}

/// Capture session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// No recording in progress
    Idle,
    /// Save-target prompt is up; no media acquired yet
    Choosing,
    /// Recorder running, segments flowing to the sink
    Recording,
    /// Recorder stopped, sink finalizing
    Saving,
}

impl CaptureState {
    /// State name for errors and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Choosing => "choosing",
            CaptureState::Recording => "recording",
            CaptureState::Saving => "saving",
        }
    }
}

/// Result of a `start` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Recording is running
    Started,
    /// The user dismissed the save-target prompt; back to idle, not an error
    Cancelled,
}

/// The finished recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingArtifact {
    /// What the sink wrote
    pub sink: SinkReport,
    /// Recorded duration from the 1-second tick counter
    pub duration_secs: u64,
}

/// Capture session configuration
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Stream constraints requested at start
    pub constraints: MediaConstraints,
    /// Segment emission interval
    pub segment_interval: Duration,
    /// Directory the buffering sink emits downloads into
    pub download_dir: PathBuf,
}

impl CaptureConfig {
    /// Default configuration emitting downloads into `download_dir`
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            constraints: MediaConstraints::default(),
            segment_interval: SEGMENT_INTERVAL,
            download_dir: download_dir.into(),
        }
    }
}

/// Generate the artifact filename for a recording started at `now`
pub fn artifact_filename(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("recording-{}.webm", now.format("%Y%m%dT%H%M%S"))
}

/// A local recording session
///
/// At most one recording is active per session; `start` on a session that is
/// not idle is rejected rather than spawning a second recorder, and a new
/// `start` cannot begin before the prior finalization completed.
pub struct CaptureSession {
    config: CaptureConfig,
    state: Arc<RwLock<CaptureState>>,
    duration_secs: Arc<AtomicU64>,
    stop_tx: Option<watch::Sender<bool>>,
    pump: Option<tokio::task::JoinHandle<()>>,
    writer: Option<tokio::task::JoinHandle<Result<SinkReport, StreamsideError>>>,
    ticker: Option<tokio::task::JoinHandle<()>>,
}

impl CaptureSession {
    /// Create an idle session
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            state: Arc::new(RwLock::new(CaptureState::Idle)),
            duration_secs: Arc::new(AtomicU64::new(0)),
            stop_tx: None,
            pump: None,
            writer: None,
            ticker: None,
        }
    }

    /// Current state
    pub fn state(&self) -> CaptureState {
        *self.state.read()
    }

    /// Whether the session is currently recording
    pub fn is_recording(&self) -> bool {
        self.state() == CaptureState::Recording
    }

    /// Seconds recorded so far
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs.load(Ordering::Relaxed)
    }

    fn set_state(&self, state: CaptureState) {
        *self.state.write() = state;
    }

    /// Start recording
    ///
    /// The save target is prompted for BEFORE the media stream is acquired,
    /// so the user is not holding an open camera during the file dialog. A
    /// dismissed picker returns [`StartOutcome::Cancelled`] and the session
    /// goes straight back to idle. Stream acquisition failure aborts to idle
    /// with the backend's error; it is not retried.
    pub async fn start(
        &mut self,
        mut backend: Box<dyn RecorderBackend>,
        picker: &dyn SaveTargetPicker,
    ) -> Result<StartOutcome, StreamsideError> {
        {
            let mut state = self.state.write();
            if *state != CaptureState::Idle {
                return Err(StreamsideError::InvalidTransition {
                    expected: "idle".to_string(),
                    actual: state.as_str().to_string(),
                });
            }
            *state = CaptureState::Choosing;
        }

        let filename = artifact_filename(chrono::Utc::now());
        let sink: Box<dyn RecordingSink> = match picker.pick_save_target(&filename).await {
            SaveTargetChoice::Target(path) => match ProgressiveSink::create(&path).await {
                Ok(sink) => Box::new(sink),
                Err(e) => {
                    self.set_state(CaptureState::Idle);
                    return Err(e);
                }
            },
            SaveTargetChoice::Unsupported => {
                Box::new(BufferingSink::new(&self.config.download_dir, &filename))
            }
            SaveTargetChoice::Cancelled => {
                debug!("Save-target prompt dismissed, staying idle");
                self.set_state(CaptureState::Idle);
                return Ok(StartOutcome::Cancelled);
            }
        };

        if let Err(e) = backend
            .open(&self.config.constraints, self.config.segment_interval)
            .await
        {
            self.set_state(CaptureState::Idle);
            return Err(e);
        }

        // Capacity 1: in progressive mode nothing is buffered beyond the
        // segment currently in flight.
        let (seg_tx, mut seg_rx) = mpsc::channel::<CaptureSegment>(1);
        let mut sink = sink;
        self.writer = Some(tokio::spawn(async move {
            while let Some(segment) = seg_rx.recv().await {
                sink.write(segment).await?;
            }
            sink.finalize().await
        }));

        let (stop_tx, mut stop_rx) = watch::channel(false);
        self.stop_tx = Some(stop_tx);
        self.pump = Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    segment = backend.next_segment() => match segment {
                        Some(segment) => {
                            if seg_tx.send(segment).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            backend.stop().await;
                            // Drain whatever the recorder flushed on stop.
                            while let Some(segment) = backend.next_segment().await {
                                if seg_tx.send(segment).await.is_err() {
                                    break;
                                }
                            }
                            break;
                        }
                    }
                }
            }
            backend.release_tracks();
        }));

        self.duration_secs.store(0, Ordering::Relaxed);
        let duration = self.duration_secs.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(1));
            tick.tick().await;
            loop {
                tick.tick().await;
                duration.fetch_add(1, Ordering::Relaxed);
            }
        }));

        self.set_state(CaptureState::Recording);
        info!(filename, "Recording started");
        Ok(StartOutcome::Started)
    }

    /// Stop recording and finalize the sink
    ///
    /// Transitions `Recording -> Saving`, drains the recorder, waits for the
    /// writer to finalize, and returns to idle. Stopping a session that never
    /// received a segment yields a zero-byte artifact.
    pub async fn stop(&mut self) -> Result<RecordingArtifact, StreamsideError> {
        {
            let mut state = self.state.write();
            if *state != CaptureState::Recording {
                return Err(StreamsideError::InvalidTransition {
                    expected: "recording".to_string(),
                    actual: state.as_str().to_string(),
                });
            }
            *state = CaptureState::Saving;
        }

        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(pump) = self.pump.take() {
            if let Err(e) = pump.await {
                warn!("Recorder pump task ended abnormally: {}", e);
            }
        }

        let result = match self.writer.take() {
            Some(writer) => match writer.await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Sink writer task ended abnormally: {}", e);
                    Err(StreamsideError::SinkClosed)
                }
            },
            None => Err(StreamsideError::SinkClosed),
        };

        let duration_secs = self.duration_secs.swap(0, Ordering::Relaxed);
        self.set_state(CaptureState::Idle);
        let report = result?;
        info!(
            bytes = report.bytes_written,
            segments = report.segments_written,
            duration_secs,
            "Recording stopped"
        );
        Ok(RecordingArtifact {
            sink: report,
            duration_secs,
        })
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        // Best-effort teardown: signal the recorder to stop and let the
        // detached pump and writer close any open progressive target and
        // release the tracks. A final partial segment is not guaranteed.
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
    }
}

/// Deterministic recorder backend for tests
///
/// Emits pre-scripted segments in order and flushes segments pushed after
/// `stop` into the drain, mimicking the platform recorder's final flush.
pub struct ScriptedRecorder {
    shared: Arc<ScriptedRecorderState>,
    opened: bool,
    fail_open: bool,
    has_audio_device: bool,
}

/// Shared handle for inspecting and feeding a [`ScriptedRecorder`]
pub struct ScriptedRecorderState {
    queue: Mutex<VecDeque<CaptureSegment>>,
    stopped: AtomicBool,
    tracks_released: AtomicBool,
    notify: Notify,
}

impl ScriptedRecorderState {
    /// Queue another segment for emission
    pub fn push_segment(&self, data: &[u8]) {
        self.queue
            .lock()
            .push_back(CaptureSegment::new(data.to_vec()));
        self.notify.notify_one();
    }

    /// Whether the recorder's tracks were released
    pub fn tracks_released(&self) -> bool {
        self.tracks_released.load(Ordering::SeqCst)
    }

    /// Whether the recorder was asked to stop
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

impl ScriptedRecorder {
    /// Create a recorder pre-loaded with `segments`
    pub fn new(segments: Vec<&[u8]>) -> Self {
        let state = ScriptedRecorderState {
            queue: Mutex::new(
                segments
                    .into_iter()
                    .map(|s| CaptureSegment::new(s.to_vec()))
                    .collect(),
            ),
            stopped: AtomicBool::new(false),
            tracks_released: AtomicBool::new(false),
            notify: Notify::new(),
        };
        Self {
            shared: Arc::new(state),
            opened: false,
            fail_open: false,
            has_audio_device: true,
        }
    }

    /// Create a recorder whose `open` fails (camera unavailable)
    pub fn failing_open() -> Self {
        let mut recorder = Self::new(Vec::new());
        recorder.fail_open = true;
        recorder
    }

    /// Simulate a machine with no audio inputs
    ///
    /// `open` then fails for any constraints that demand audio, like a real
    /// recorder asked for a microphone that does not exist.
    pub fn without_audio_device(mut self) -> Self {
        self.has_audio_device = false;
        self
    }

    /// Shared handle for feeding segments and inspecting state
    pub fn handle(&self) -> Arc<ScriptedRecorderState> {
        self.shared.clone()
    }
}

#[async_trait]
impl RecorderBackend for ScriptedRecorder {
    async fn open(
        &mut self,
        constraints: &MediaConstraints,
        _segment_interval: Duration,
    ) -> Result<(), StreamsideError> {
        if self.fail_open {
            return Err(StreamsideError::MediaUnavailable {
                reason: "no capture device".to_string(),
            });
        }
        if constraints.audio.is_some() && !self.has_audio_device {
            return Err(StreamsideError::MediaUnavailable {
                reason: "no audio input device".to_string(),
            });
        }
        self.opened = true;
        Ok(())
    }

    async fn next_segment(&mut self) -> Option<CaptureSegment> {
        loop {
            if let Some(segment) = self.shared.queue.lock().pop_front() {
                return Some(segment);
            }
            if self.shared.stopped.load(Ordering::SeqCst) {
                return None;
            }
            self.shared.notify.notified().await;
        }
    }

    async fn stop(&mut self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        self.shared.notify.notify_one();
    }

    fn release_tracks(&mut self) {
        self.shared.tracks_released.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_constraints_match_the_recording_profile() {
        let constraints = MediaConstraints::default();
        assert_eq!(constraints.video.width, 1280);
        assert_eq!(constraints.video.height, 720);
        assert_eq!(constraints.video.framerate, 24);
        let audio = constraints.audio.unwrap();
        assert_eq!(audio.sample_rate, 44_100);
        assert_eq!(audio.channels, 1);
    }

    #[test]
    fn video_only_constraints_drop_the_audio_half() {
        let constraints = MediaConstraints::video_only();
        assert!(constraints.audio.is_none());
        assert_eq!(constraints.video, MediaConstraints::default().video);
    }

    #[test]
    fn artifact_filename_embeds_a_compact_timestamp() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-08-27T10:15:30Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert_eq!(artifact_filename(now), "recording-20260827T101530.webm");
    }

    #[test]
    fn state_names_for_transition_errors() {
        assert_eq!(CaptureState::Idle.as_str(), "idle");
        assert_eq!(CaptureState::Recording.as_str(), "recording");
    }
}
