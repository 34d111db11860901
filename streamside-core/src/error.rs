//! Error types for Streamside

use thiserror::Error;

/// Main error type for Streamside operations
#[derive(Error, Debug)]
pub enum StreamsideError {
    /// Initialization error
    #[error("Initialization failed: {reason}")]
    Initialization {
        /// Reason for initialization failure
        reason: String,
    },

    /// Missing configuration error
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },

    /// No studio matches the invite code or id
    #[error("Studio not found: {reference}")]
    StudioNotFound {
        /// Invite code or studio id that did not match
        reference: String,
    },

    /// Studio exists but has been deactivated
    #[error("Studio {reference} is no longer active")]
    StudioInactive {
        /// Deactivated studio reference
        reference: String,
    },

    /// Permission for a media kind was denied
    #[error("Permission denied for {kind}: {reason}")]
    PermissionDenied {
        /// Media kind the permission was requested for
        kind: String,
        /// Reason reported by the platform
        reason: String,
    },

    /// The user dismissed a prompt
    ///
    /// A distinguished outcome rather than a failure: callers return to
    /// idle silently instead of surfacing an error.
    #[error("User cancelled {operation}")]
    Cancelled {
        /// Operation that was cancelled
        operation: String,
    },

    /// No usable media stream could be acquired
    #[error("Media unavailable: {reason}")]
    MediaUnavailable {
        /// Reason the stream could not be acquired
        reason: String,
    },

    /// Invalid state transition
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidTransition {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },

    /// The recording sink was already finalized
    #[error("Recording sink is closed")]
    SinkClosed,

    /// I/O failure while writing or finalizing an artifact
    #[error("I/O error during {operation}: {source}")]
    Io {
        /// Operation that failed
        operation: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Durable or session storage failure
    #[error("Storage error: {reason}")]
    Storage {
        /// Reason for the storage failure
        reason: String,
    },

    /// Transient network failure, retry-capable
    #[error("Network error: {reason}")]
    Network {
        /// Reason for the network failure
        reason: String,
    },

    /// Identity is not allowed to perform the operation
    #[error("Unauthorized")]
    Unauthorized,

    /// Server start failed
    #[error("Failed to start server on {address}: {source}")]
    ServerStartFailed {
        /// Address that failed to bind
        address: std::net::SocketAddr,
        /// Underlying error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Invalid message format
    #[error("Invalid message format: {message}, error: {source}")]
    InvalidMessage {
        /// Invalid message content
        message: String,
        /// Parsing error
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StreamsideError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            StreamsideError::Initialization { .. } => "INITIALIZATION_FAILED".to_string(),
            StreamsideError::MissingConfiguration { .. } => "MISSING_CONFIGURATION".to_string(),
            StreamsideError::StudioNotFound { .. } => "STUDIO_NOT_FOUND".to_string(),
            StreamsideError::StudioInactive { .. } => "STUDIO_INACTIVE".to_string(),
            StreamsideError::PermissionDenied { .. } => "PERMISSION_DENIED".to_string(),
            StreamsideError::Cancelled { .. } => "USER_CANCELLED".to_string(),
            StreamsideError::MediaUnavailable { .. } => "MEDIA_UNAVAILABLE".to_string(),
            StreamsideError::InvalidTransition { .. } => "INVALID_TRANSITION".to_string(),
            StreamsideError::SinkClosed => "SINK_CLOSED".to_string(),
            StreamsideError::Io { .. } => "IO_ERROR".to_string(),
            StreamsideError::Storage { .. } => "STORAGE_ERROR".to_string(),
            StreamsideError::Network { .. } => "NETWORK_ERROR".to_string(),
            StreamsideError::Unauthorized => "UNAUTHORIZED".to_string(),
            StreamsideError::ServerStartFailed { .. } => "SERVER_START_FAILED".to_string(),
            StreamsideError::InvalidMessage { .. } => "INVALID_MESSAGE".to_string(),
        }
    }

    /// Whether a manual retry can reasonably resolve this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, StreamsideError::Network { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        let err = StreamsideError::StudioNotFound {
            reference: "ABCD2345".to_string(),
        };
        assert_eq!(err.error_code(), "STUDIO_NOT_FOUND");

        let err = StreamsideError::StudioInactive {
            reference: "s1".to_string(),
        };
        assert_eq!(err.error_code(), "STUDIO_INACTIVE");
    }

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(StreamsideError::Network {
            reason: "connection refused".to_string()
        }
        .is_retryable());
        assert!(!StreamsideError::Unauthorized.is_retryable());
    }

    #[test]
    fn not_found_message_names_the_reference() {
        let err = StreamsideError::StudioNotFound {
            reference: "XYZ".to_string(),
        };
        assert!(err.to_string().contains("XYZ"));
    }
}
