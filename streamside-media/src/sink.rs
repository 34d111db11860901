//! Recording sinks
//!
//! Two interchangeable write strategies behind one contract: a progressive
//! sink appending each segment to a user-chosen file as it arrives, and a
//! buffering sink accumulating segments in memory and emitting one artifact
//! at the end. A capture session picks its sink once at start and never
//! switches mid-flight.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use streamside_core::StreamsideError;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// One opaque binary chunk emitted by the recorder
///
/// Segments carry no sequence number; ordering is the delivery order, which
/// the capture session keeps strictly sequential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSegment {
    /// Encoded segment bytes
    pub data: Bytes,
}

impl CaptureSegment {
    /// Wrap raw segment bytes
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Segment size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the segment is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Summary of what a sink wrote before it was finalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    /// Total payload bytes written
    pub bytes_written: u64,
    /// Number of segments written
    pub segments_written: u64,
    /// Path of the finished artifact
    pub artifact_path: PathBuf,
}

/// Write strategy for recorder segments
///
/// `write` appends one segment; `finalize` closes the strategy's backing
/// store and is the only destructor path. Finalizing with zero segments
/// written produces a zero-byte artifact rather than an error.
#[async_trait]
pub trait RecordingSink: Send {
    /// Append one segment in delivery order
    async fn write(&mut self, segment: CaptureSegment) -> Result<(), StreamsideError>;

    /// Close the sink and report the finished artifact
    async fn finalize(&mut self) -> Result<SinkReport, StreamsideError>;
}

fn io_error(operation: &str, source: std::io::Error) -> StreamsideError {
    StreamsideError::Io {
        operation: operation.to_string(),
        source,
    }
}

/// Progressive sink backed by an open writable file handle
///
/// Each segment is appended immediately; nothing is retained in memory
/// beyond the segment currently being written.
pub struct ProgressiveSink {
    path: PathBuf,
    file: Option<File>,
    bytes_written: u64,
    segments_written: u64,
}

impl ProgressiveSink {
    /// Open a writable handle at the chosen save target
    pub async fn create(path: impl AsRef<Path>) -> Result<Self, StreamsideError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .await
            .map_err(|e| io_error("open save target", e))?;
        debug!(path = %path.display(), "Progressive sink opened");
        Ok(Self {
            path,
            file: Some(file),
            bytes_written: 0,
            segments_written: 0,
        })
    }
}

#[async_trait]
impl RecordingSink for ProgressiveSink {
    async fn write(&mut self, segment: CaptureSegment) -> Result<(), StreamsideError> {
        let file = self.file.as_mut().ok_or(StreamsideError::SinkClosed)?;
        file.write_all(&segment.data)
            .await
            .map_err(|e| io_error("segment write", e))?;
        self.bytes_written += segment.len() as u64;
        self.segments_written += 1;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<SinkReport, StreamsideError> {
        let mut file = self.file.take().ok_or(StreamsideError::SinkClosed)?;
        file.flush().await.map_err(|e| io_error("flush", e))?;
        file.sync_all()
            .await
            .map_err(|e| io_error("close save target", e))?;
        info!(
            path = %self.path.display(),
            bytes = self.bytes_written,
            segments = self.segments_written,
            "Recording saved"
        );
        Ok(SinkReport {
            bytes_written: self.bytes_written,
            segments_written: self.segments_written,
            artifact_path: self.path.clone(),
        })
    }
}

/// Buffering sink holding segments in memory until finalization
///
/// Fallback for platforms without a save-file picker: `finalize` assembles
/// every buffered segment into a single artifact, writes it into the
/// download directory under the generated filename, and clears the buffer.
pub struct BufferingSink {
    download_dir: PathBuf,
    filename: String,
    segments: Vec<Bytes>,
    finalized: bool,
}

impl BufferingSink {
    /// Create a buffering sink emitting into `download_dir`
    pub fn new(download_dir: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            download_dir: download_dir.into(),
            filename: filename.into(),
            segments: Vec::new(),
            finalized: false,
        }
    }

    /// Number of segments currently buffered
    pub fn buffered_segments(&self) -> usize {
        self.segments.len()
    }
}

#[async_trait]
impl RecordingSink for BufferingSink {
    async fn write(&mut self, segment: CaptureSegment) -> Result<(), StreamsideError> {
        if self.finalized {
            return Err(StreamsideError::SinkClosed);
        }
        self.segments.push(segment.data);
        Ok(())
    }

    async fn finalize(&mut self) -> Result<SinkReport, StreamsideError> {
        if self.finalized {
            return Err(StreamsideError::SinkClosed);
        }
        self.finalized = true;

        let segments_written = self.segments.len() as u64;
        let mut assembled = Vec::with_capacity(self.segments.iter().map(|s| s.len()).sum());
        for segment in self.segments.drain(..) {
            assembled.extend_from_slice(&segment);
        }

        let path = self.download_dir.join(&self.filename);
        tokio::fs::write(&path, &assembled)
            .await
            .map_err(|e| io_error("download write", e))?;
        info!(
            path = %path.display(),
            bytes = assembled.len(),
            segments = segments_written,
            "Recording download emitted"
        );
        Ok(SinkReport {
            bytes_written: assembled.len() as u64,
            segments_written,
            artifact_path: path,
        })
    }
}
