//! # Streamside Media
//!
//! Client-side media plumbing for Streamside: device negotiation with
//! independent permission probes, the local capture session, and the
//! progressive/buffering recording sinks.

#![warn(clippy::all)]

pub mod capture;
pub mod devices;
pub mod sink;

// Re-export main types
pub use capture::{
    artifact_filename, AudioConstraints, CaptureConfig, CaptureSession, CaptureState,
    FixedTargetPicker, MediaConstraints, RecorderBackend, RecordingArtifact, SaveTargetChoice,
    SaveTargetPicker, ScriptedRecorder, ScriptedRecorderState, StartOutcome, UnsupportedPicker,
    VideoConstraints, SEGMENT_INTERVAL,
};
pub use devices::{
    DeviceChange, DeviceInventory, DeviceManager, DevicePlatform, DeviceSelection, MediaDeviceInfo,
    MediaDeviceKind, MediaKind, MockDevicePlatform, ProbeStream,
};
pub use sink::{BufferingSink, CaptureSegment, ProgressiveSink, RecordingSink, SinkReport};
