//! Event system for session, device and recording notifications

use crate::ParticipantIdentity;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Events that can occur during a studio session
#[derive(Debug, Clone)]
pub enum Event {
    /// The local participant joined a studio
    StudioJoined {
        /// Studio that was joined
        studio_id: String,
        /// Identity the participant joined as
        identity: ParticipantIdentity,
    },
    /// The local participant left the studio
    StudioLeft {
        /// Studio that was left
        studio_id: String,
    },
    /// The set of attached capture devices changed
    DevicesChanged {
        /// Number of cameras now visible
        cameras: usize,
        /// Number of microphones now visible
        microphones: usize,
    },
    /// A local recording started
    RecordingStarted,
    /// A local recording was finalized
    RecordingStopped {
        /// Seconds recorded
        duration_secs: u64,
        /// Where the artifact landed
        artifact_path: PathBuf,
    },
    /// An error occurred in the session
    SessionError {
        /// Error description
        error: String,
        /// Whether a manual retry can reasonably resolve it
        recoverable: bool,
    },
}

impl Event {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::StudioJoined { .. } => "studio_joined",
            Event::StudioLeft { .. } => "studio_left",
            Event::DevicesChanged { .. } => "devices_changed",
            Event::RecordingStarted => "recording_started",
            Event::RecordingStopped { .. } => "recording_stopped",
            Event::SessionError { .. } => "session_error",
        }
    }

    /// Check if this is a recording-related event
    pub fn is_recording_event(&self) -> bool {
        matches!(
            self,
            Event::RecordingStarted | Event::RecordingStopped { .. }
        )
    }

    /// Check if this is an error event
    pub fn is_error_event(&self) -> bool {
        matches!(self, Event::SessionError { .. })
    }
}

/// Stream of session events for async iteration
#[derive(Debug)]
pub struct EventStream {
    receiver: mpsc::UnboundedReceiver<Event>,
}

impl EventStream {
    /// Create a new event stream with a receiver
    pub fn new(receiver: mpsc::UnboundedReceiver<Event>) -> Self {
        Self { receiver }
    }

    /// Get the next event from the stream
    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Try to get the next event without blocking
    pub fn try_next(&mut self) -> Result<Option<Event>, mpsc::error::TryRecvError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => {
                Err(mpsc::error::TryRecvError::Disconnected)
            }
        }
    }

    /// Close the event stream
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_are_stable() {
        assert_eq!(Event::RecordingStarted.event_type(), "recording_started");
        assert_eq!(
            Event::StudioLeft {
                studio_id: "s1".to_string()
            }
            .event_type(),
            "studio_left"
        );
    }

    #[test]
    fn recording_events_classify() {
        assert!(Event::RecordingStopped {
            duration_secs: 3,
            artifact_path: PathBuf::from("/tmp/recording.webm")
        }
        .is_recording_event());
        assert!(!Event::StudioLeft {
            studio_id: "s1".to_string()
        }
        .is_recording_event());
        assert!(Event::SessionError {
            error: "x".to_string(),
            recoverable: false
        }
        .is_error_event());
    }

    #[tokio::test]
    async fn stream_delivers_in_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut stream = EventStream::new(rx);

        tx.send(Event::RecordingStarted).unwrap();
        tx.send(Event::RecordingStopped {
            duration_secs: 1,
            artifact_path: PathBuf::from("/tmp/recording.webm"),
        })
        .unwrap();

        assert_eq!(
            stream.next().await.unwrap().event_type(),
            "recording_started"
        );
        assert_eq!(
            stream.next().await.unwrap().event_type(),
            "recording_stopped"
        );
        assert!(stream.try_next().unwrap().is_none());
    }
}
