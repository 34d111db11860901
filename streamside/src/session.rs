//! Studio session management and API

use crate::{Event, EventStream, GlobalConfig, ParticipantIdentity, Streamside};
use std::sync::Arc;
use streamside_core::StreamsideError;
use streamside_media::{
    CaptureSession, DeviceManager, RecorderBackend, RecordingArtifact, SaveTargetPicker,
    StartOutcome,
};
use streamside_signaling::{AccessToken, DirectoryClient, ResolvedStudio, ROOM_NAME_PREFIX};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::SharedGuestStore;

/// Fluent builder for joining a studio through an invite code
pub struct SessionBuilder {
    config: GlobalConfig,
    guest_store: SharedGuestStore,
    invite_code: String,
    display_name: Option<String>,
    host: Option<(String, String)>,
    video_enabled: bool,
    audio_enabled: bool,
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("invite_code", &self.invite_code)
            .field("display_name", &self.display_name)
            .field("video_enabled", &self.video_enabled)
            .field("audio_enabled", &self.audio_enabled)
            .finish_non_exhaustive()
    }
}

impl SessionBuilder {
    pub(crate) fn new(streamside: &Streamside, invite_code: &str) -> Self {
        Self {
            config: streamside.config().clone(),
            guest_store: streamside.guest_store().clone(),
            invite_code: invite_code.to_string(),
            display_name: None,
            host: None,
            video_enabled: false,
            audio_enabled: false,
        }
    }

    /// Set the display name used when a new guest identity is created
    pub fn display_name(mut self, name: &str) -> Self {
        self.display_name = Some(name.to_string());
        self
    }

    /// Join as an authenticated host instead of a guest
    pub fn as_host(mut self, user_id: &str, name: &str) -> Self {
        self.host = Some((user_id.to_string(), name.to_string()));
        self
    }

    /// Use a specific guest store instead of the shared one
    pub fn guest_store(mut self, store: SharedGuestStore) -> Self {
        self.guest_store = store;
        self
    }

    /// Enable video for this session
    pub fn enable_video(mut self) -> Self {
        self.video_enabled = true;
        self
    }

    /// Enable audio for this session
    pub fn enable_audio(mut self) -> Self {
        self.audio_enabled = true;
        self
    }

    /// Resolve the invite and connect
    ///
    /// Guest flow: a stored guest session for the resolved studio is reused
    /// as-is, so a returning guest rejoins under the same identity without
    /// re-entering a name. Otherwise a fresh identity is created from the
    /// display name and persisted. The access token is requested last, once
    /// the identity is settled.
    pub async fn connect(self) -> Result<StudioSession, StreamsideError> {
        let directory_url =
            self.config
                .directory_url
                .as_deref()
                .ok_or_else(|| StreamsideError::MissingConfiguration {
                    field: "directory_url".to_string(),
                })?;

        let mut client = DirectoryClient::connect(directory_url).await?;
        let studio = client.resolve_invite(&self.invite_code).await?;

        let identity = match &self.host {
            Some((user_id, name)) => ParticipantIdentity::Host {
                user_id: user_id.clone(),
                name: name.clone(),
            },
            None => self.guest_identity(&studio)?,
        };

        let room_name = format!("{}{}", ROOM_NAME_PREFIX, studio.studio_id);
        let token = client
            .request_token(&room_name, identity.id(), identity.name())
            .await?;

        info!(
            studio_id = %studio.studio_id,
            identity = %identity.id(),
            "Joined studio"
        );

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let _ = events_tx.send(Event::StudioJoined {
            studio_id: studio.studio_id.clone(),
            identity: identity.clone(),
        });

        Ok(StudioSession {
            studio,
            identity,
            token,
            video_enabled: self.video_enabled,
            audio_enabled: self.audio_enabled,
            client: Some(client),
            guest_store: self.guest_store,
            events_tx,
            events_rx: Some(events_rx),
            device_watch: None,
        })
    }

    fn guest_identity(
        &self,
        studio: &ResolvedStudio,
    ) -> Result<ParticipantIdentity, StreamsideError> {
        if let Some(stored) = self.guest_store.read() {
            if stored.studio_id == studio.studio_id {
                debug!(guest_id = %stored.guest_id, "Reusing stored guest session");
                return Ok(ParticipantIdentity::Guest {
                    guest_id: stored.guest_id,
                    name: stored.guest_name,
                });
            }
        }

        let name =
            self.display_name
                .as_deref()
                .ok_or_else(|| StreamsideError::MissingConfiguration {
                    field: "display_name".to_string(),
                })?;
        let session = self.guest_store.store(name, &studio.studio_id)?;
        Ok(ParticipantIdentity::Guest {
            guest_id: session.guest_id,
            name: session.guest_name,
        })
    }
}

/// A connected studio session
pub struct StudioSession {
    studio: ResolvedStudio,
    identity: ParticipantIdentity,
    token: AccessToken,
    video_enabled: bool,
    audio_enabled: bool,
    client: Option<DirectoryClient>,
    guest_store: SharedGuestStore,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: Option<mpsc::UnboundedReceiver<Event>>,
    device_watch: Option<tokio::task::JoinHandle<()>>,
}

impl StudioSession {
    /// The resolved studio this session is connected to
    pub fn studio(&self) -> &ResolvedStudio {
        &self.studio
    }

    /// The identity the local participant joined as
    pub fn identity(&self) -> &ParticipantIdentity {
        &self.identity
    }

    /// The media access token issued for this session
    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    /// Whether video was requested for this session
    pub fn video_enabled(&self) -> bool {
        self.video_enabled
    }

    /// Whether audio was requested for this session
    pub fn audio_enabled(&self) -> bool {
        self.audio_enabled
    }

    /// Take the event stream for this session
    ///
    /// The stream can be taken once; subsequent calls yield a stream that is
    /// already closed.
    pub fn events(&mut self) -> EventStream {
        match self.events_rx.take() {
            Some(rx) => EventStream::new(rx),
            None => {
                let (_tx, rx) = mpsc::unbounded_channel();
                EventStream::new(rx)
            }
        }
    }

    /// A sender for publishing events into this session's stream
    ///
    /// Lets embedders forward their own notifications alongside the ones
    /// this session emits.
    pub fn event_sender(&self) -> mpsc::UnboundedSender<Event> {
        self.events_tx.clone()
    }

    /// Announce device inventory changes on the event stream
    ///
    /// On every hot-plug notification the manager re-enumerates and an
    /// [`Event::DevicesChanged`] with the fresh camera and microphone counts
    /// is emitted. The watch ends when the session is dropped.
    pub fn watch_devices(&mut self, manager: Arc<DeviceManager>) {
        if self.device_watch.is_some() {
            return;
        }

        let events = self.events_tx.clone();
        let mut changes = manager.subscribe_changes();
        self.device_watch = Some(tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(_) => {
                        if let Err(e) = manager.reenumerate().await {
                            warn!("Re-enumeration after device change failed: {}", e);
                            continue;
                        }
                        let inventory = manager.inventory();
                        let _ = events.send(Event::DevicesChanged {
                            cameras: inventory.cameras.len(),
                            microphones: inventory.microphones.len(),
                        });
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Start a local recording and announce it on the event stream
    ///
    /// A dismissed save-target prompt stays silent (the session simply
    /// remains idle); a failed start is surfaced as both the returned error
    /// and an [`Event::SessionError`].
    pub async fn start_recording(
        &self,
        capture: &mut CaptureSession,
        backend: Box<dyn RecorderBackend>,
        picker: &dyn SaveTargetPicker,
    ) -> Result<StartOutcome, StreamsideError> {
        match capture.start(backend, picker).await {
            Ok(StartOutcome::Started) => {
                let _ = self.events_tx.send(Event::RecordingStarted);
                Ok(StartOutcome::Started)
            }
            Ok(StartOutcome::Cancelled) => Ok(StartOutcome::Cancelled),
            Err(e) => {
                let _ = self.events_tx.send(Event::SessionError {
                    error: e.to_string(),
                    recoverable: e.is_retryable(),
                });
                Err(e)
            }
        }
    }

    /// Stop a local recording and announce the finished artifact
    pub async fn stop_recording(
        &self,
        capture: &mut CaptureSession,
    ) -> Result<RecordingArtifact, StreamsideError> {
        match capture.stop().await {
            Ok(artifact) => {
                let _ = self.events_tx.send(Event::RecordingStopped {
                    duration_secs: artifact.duration_secs,
                    artifact_path: artifact.sink.artifact_path.clone(),
                });
                Ok(artifact)
            }
            Err(e) => {
                let _ = self.events_tx.send(Event::SessionError {
                    error: e.to_string(),
                    recoverable: e.is_retryable(),
                });
                Err(e)
            }
        }
    }

    /// Leave the studio
    ///
    /// Clears the persisted guest identity (a deliberate leave forgets the
    /// guest, unlike a reload) and closes the directory connection.
    pub async fn leave(mut self) {
        let _ = self.events_tx.send(Event::StudioLeft {
            studio_id: self.studio.studio_id.clone(),
        });
        if self.identity.is_guest() {
            self.guest_store.clear();
        }
        if let Some(client) = self.client.take() {
            client.close().await;
        }
        info!(studio_id = %self.studio.studio_id, "Left studio");
    }
}

impl Drop for StudioSession {
    fn drop(&mut self) {
        if let Some(watch) = self.device_watch.take() {
            watch.abort();
        }
    }
}

impl std::fmt::Debug for StudioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudioSession")
            .field("studio", &self.studio)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
