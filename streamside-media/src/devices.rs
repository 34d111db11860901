//! Device negotiation
//!
//! Enumerates cameras, microphones, and speakers behind a platform seam.
//! Permissions for video and audio are requested as two independent probes
//! so a missing device class never blocks the other, and enumeration always
//! runs regardless of probe outcomes.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use streamside_core::StreamsideError;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Media kind a permission probe targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Camera permission
    Video,
    /// Microphone permission
    Audio,
}

impl MediaKind {
    /// Human-readable name for logs and errors
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
        }
    }
}

/// Kind of an enumerated device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaDeviceKind {
    /// Video input
    Camera,
    /// Audio input
    Microphone,
    /// Audio output
    Speaker,
}

/// An enumerated media device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDeviceInfo {
    /// Platform device identifier; empty in permission-less environments
    pub id: String,
    /// Display label
    pub label: String,
    /// Device class
    pub kind: MediaDeviceKind,
}

/// Probe stream returned by a successful permission request
///
/// Holds the tracks the platform opened to prime the permission. Callers
/// stop them immediately instead of keeping the stream open.
#[derive(Debug)]
pub struct ProbeStream {
    track_count: usize,
    stopped: bool,
}

impl ProbeStream {
    /// Create a probe over `track_count` open tracks
    pub fn new(track_count: usize) -> Self {
        Self {
            track_count,
            stopped: false,
        }
    }

    /// Stop every track held by the probe
    pub fn stop_tracks(&mut self) {
        if !self.stopped {
            debug!(tracks = self.track_count, "Stopping permission probe tracks");
            self.stopped = true;
        }
    }

    /// Whether the probe tracks have been stopped
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// Hot-plug notification from the platform
#[derive(Debug, Clone)]
pub enum DeviceChange {
    /// A device was attached
    Connected {
        /// Platform device identifier
        device_id: String,
    },
    /// A device was detached
    Disconnected {
        /// Platform device identifier
        device_id: String,
    },
}

/// Platform seam for permissions, enumeration, and hot-plug notifications
#[async_trait]
pub trait DevicePlatform: Send + Sync {
    /// Request a permission grant for one media kind
    ///
    /// Each kind is requested independently; failure for one kind must not
    /// affect the other.
    async fn request_permission(&self, kind: MediaKind) -> Result<ProbeStream, StreamsideError>;

    /// Enumerate all devices currently visible to the platform
    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, StreamsideError>;

    /// Subscribe to device attach/detach notifications
    fn subscribe_changes(&self) -> broadcast::Receiver<DeviceChange>;
}

/// Devices grouped by class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInventory {
    /// Video inputs
    pub cameras: Vec<MediaDeviceInfo>,
    /// Audio inputs
    pub microphones: Vec<MediaDeviceInfo>,
    /// Audio outputs
    pub speakers: Vec<MediaDeviceInfo>,
}

/// Currently selected device per class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceSelection {
    /// Selected camera id
    pub camera: Option<String>,
    /// Selected microphone id
    pub microphone: Option<String>,
    /// Selected speaker id
    pub speaker: Option<String>,
}

#[derive(Debug, Default)]
struct DeviceState {
    inventory: DeviceInventory,
    selection: DeviceSelection,
}

/// Device manager over a [`DevicePlatform`]
pub struct DeviceManager {
    platform: Arc<dyn DevicePlatform>,
    state: Arc<RwLock<DeviceState>>,
    hotplug_task: Option<tokio::task::JoinHandle<()>>,
}

impl DeviceManager {
    /// Create a manager over the given platform
    pub fn new(platform: Arc<dyn DevicePlatform>) -> Self {
        Self {
            platform,
            state: Arc::new(RwLock::new(DeviceState::default())),
            hotplug_task: None,
        }
    }

    /// Run the permission probes and refresh the device inventory
    ///
    /// Video and audio permissions are requested separately; each probe's
    /// tracks are stopped as soon as the grant succeeds, and a failed probe
    /// is logged and swallowed. Enumeration follows both attempts either way.
    pub async fn refresh(&self) -> Result<(), StreamsideError> {
        for kind in [MediaKind::Video, MediaKind::Audio] {
            match self.platform.request_permission(kind).await {
                Ok(mut probe) => probe.stop_tracks(),
                Err(e) => {
                    warn!(kind = kind.as_str(), "Permission probe failed: {}", e);
                }
            }
        }

        Self::enumerate_and_select(&self.platform, &self.state).await
    }

    /// Re-enumerate devices without re-running the permission probes
    pub async fn reenumerate(&self) -> Result<(), StreamsideError> {
        Self::enumerate_and_select(&self.platform, &self.state).await
    }

    async fn enumerate_and_select(
        platform: &Arc<dyn DevicePlatform>,
        state: &Arc<RwLock<DeviceState>>,
    ) -> Result<(), StreamsideError> {
        let devices = platform.enumerate_devices().await?;

        let mut inventory = DeviceInventory::default();
        for device in devices {
            // Placeholder entries from a permission-less environment carry
            // an empty id and are unusable for selection.
            if device.id.is_empty() {
                continue;
            }
            match device.kind {
                MediaDeviceKind::Camera => inventory.cameras.push(device),
                MediaDeviceKind::Microphone => inventory.microphones.push(device),
                MediaDeviceKind::Speaker => inventory.speakers.push(device),
            }
        }

        let mut guard = state.write();
        let selection = &mut guard.selection;
        // Auto-select fills empty slots only; a user choice is never overridden.
        if selection.camera.is_none() {
            selection.camera = inventory.cameras.first().map(|d| d.id.clone());
        }
        if selection.microphone.is_none() {
            selection.microphone = inventory.microphones.first().map(|d| d.id.clone());
        }
        if selection.speaker.is_none() {
            selection.speaker = inventory.speakers.first().map(|d| d.id.clone());
        }
        debug!(
            cameras = inventory.cameras.len(),
            microphones = inventory.microphones.len(),
            speakers = inventory.speakers.len(),
            "Device inventory refreshed"
        );
        guard.inventory = inventory;
        Ok(())
    }

    /// Subscribe to the platform's attach/detach notifications
    ///
    /// Lets callers layer their own reaction on top of the manager's
    /// re-enumeration, such as surfacing inventory changes to a UI.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<DeviceChange> {
        self.platform.subscribe_changes()
    }

    /// Start re-enumerating on every hot-plug notification
    ///
    /// Only enumeration is repeated; the permission probes run once in
    /// [`DeviceManager::refresh`].
    pub fn watch_hotplug(&mut self) {
        if self.hotplug_task.is_some() {
            return;
        }

        let platform = self.platform.clone();
        let state = self.state.clone();
        let mut changes = self.platform.subscribe_changes();
        self.hotplug_task = Some(tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => {
                        debug!(?change, "Device change, re-enumerating");
                        if let Err(e) = Self::enumerate_and_select(&platform, &state).await {
                            warn!("Re-enumeration after device change failed: {}", e);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "Device change notifications lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Current device inventory
    pub fn inventory(&self) -> DeviceInventory {
        self.state.read().inventory.clone()
    }

    /// Current per-class selection
    pub fn selection(&self) -> DeviceSelection {
        self.state.read().selection.clone()
    }

    /// Select a camera by id
    pub fn select_camera(&self, device_id: &str) {
        self.state.write().selection.camera = Some(device_id.to_string());
    }

    /// Select a microphone by id
    pub fn select_microphone(&self, device_id: &str) {
        self.state.write().selection.microphone = Some(device_id.to_string());
    }

    /// Select a speaker by id
    pub fn select_speaker(&self, device_id: &str) {
        self.state.write().selection.speaker = Some(device_id.to_string());
    }
}

impl Drop for DeviceManager {
    fn drop(&mut self) {
        if let Some(task) = self.hotplug_task.take() {
            task.abort();
        }
    }
}

/// Scripted device platform for tests and unsupported targets
pub struct MockDevicePlatform {
    devices: RwLock<Vec<MediaDeviceInfo>>,
    denied: RwLock<Vec<MediaKind>>,
    dismissed: RwLock<Vec<MediaKind>>,
    change_tx: broadcast::Sender<DeviceChange>,
}

impl MockDevicePlatform {
    /// Create a platform exposing the given devices
    pub fn new(devices: Vec<MediaDeviceInfo>) -> Self {
        let (change_tx, _) = broadcast::channel(16);
        Self {
            devices: RwLock::new(devices),
            denied: RwLock::new(Vec::new()),
            dismissed: RwLock::new(Vec::new()),
            change_tx,
        }
    }

    /// Make permission requests for `kind` fail as denied
    pub fn deny(&self, kind: MediaKind) {
        self.denied.write().push(kind);
    }

    /// Make the permission prompt for `kind` report a user dismissal
    pub fn dismiss(&self, kind: MediaKind) {
        self.dismissed.write().push(kind);
    }

    /// Replace the visible device list and emit a hot-plug notification
    pub fn attach(&self, device: MediaDeviceInfo) {
        let device_id = device.id.clone();
        self.devices.write().push(device);
        let _ = self.change_tx.send(DeviceChange::Connected { device_id });
    }
}

#[async_trait]
impl DevicePlatform for MockDevicePlatform {
    async fn request_permission(&self, kind: MediaKind) -> Result<ProbeStream, StreamsideError> {
        if self.denied.read().contains(&kind) {
            return Err(StreamsideError::PermissionDenied {
                kind: kind.as_str().to_string(),
                reason: "permission request denied".to_string(),
            });
        }
        if self.dismissed.read().contains(&kind) {
            return Err(StreamsideError::Cancelled {
                operation: format!("{} permission prompt", kind.as_str()),
            });
        }
        Ok(ProbeStream::new(1))
    }

    async fn enumerate_devices(&self) -> Result<Vec<MediaDeviceInfo>, StreamsideError> {
        Ok(self.devices.read().clone())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<DeviceChange> {
        self.change_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera(id: &str) -> MediaDeviceInfo {
        MediaDeviceInfo {
            id: id.to_string(),
            label: format!("Camera {}", id),
            kind: MediaDeviceKind::Camera,
        }
    }

    fn microphone(id: &str) -> MediaDeviceInfo {
        MediaDeviceInfo {
            id: id.to_string(),
            label: format!("Microphone {}", id),
            kind: MediaDeviceKind::Microphone,
        }
    }

    #[tokio::test]
    async fn refresh_partitions_and_auto_selects() {
        let platform = Arc::new(MockDevicePlatform::new(vec![
            camera("cam-1"),
            camera("cam-2"),
            microphone("mic-1"),
        ]));
        let manager = DeviceManager::new(platform);
        manager.refresh().await.unwrap();

        let inventory = manager.inventory();
        assert_eq!(inventory.cameras.len(), 2);
        assert_eq!(inventory.microphones.len(), 1);
        assert!(inventory.speakers.is_empty());

        let selection = manager.selection();
        assert_eq!(selection.camera.as_deref(), Some("cam-1"));
        assert_eq!(selection.microphone.as_deref(), Some("mic-1"));
        assert!(selection.speaker.is_none());
    }

    #[tokio::test]
    async fn empty_ids_are_filtered_out() {
        let platform = Arc::new(MockDevicePlatform::new(vec![
            MediaDeviceInfo {
                id: String::new(),
                label: "Placeholder".to_string(),
                kind: MediaDeviceKind::Camera,
            },
            camera("cam-1"),
        ]));
        let manager = DeviceManager::new(platform);
        manager.refresh().await.unwrap();

        assert_eq!(manager.inventory().cameras.len(), 1);
        assert_eq!(manager.selection().camera.as_deref(), Some("cam-1"));
    }

    #[tokio::test]
    async fn denied_audio_probe_still_yields_cameras() {
        let platform = MockDevicePlatform::new(vec![camera("cam-1")]);
        platform.deny(MediaKind::Audio);
        let manager = DeviceManager::new(Arc::new(platform));
        manager.refresh().await.unwrap();

        assert_eq!(manager.inventory().cameras.len(), 1);
        assert!(manager.inventory().microphones.is_empty());
        assert_eq!(manager.selection().camera.as_deref(), Some("cam-1"));
    }

    #[tokio::test]
    async fn dismissed_audio_prompt_is_swallowed_like_a_denial() {
        let platform = MockDevicePlatform::new(vec![camera("cam-1")]);
        platform.dismiss(MediaKind::Audio);
        let err = platform
            .request_permission(MediaKind::Audio)
            .await
            .unwrap_err();
        assert!(matches!(err, StreamsideError::Cancelled { .. }));

        // The probe failure never blocks the video side or enumeration.
        let manager = DeviceManager::new(Arc::new(platform));
        manager.refresh().await.unwrap();
        assert_eq!(manager.inventory().cameras.len(), 1);
    }

    #[tokio::test]
    async fn existing_selection_survives_reenumeration() {
        let platform = Arc::new(MockDevicePlatform::new(vec![
            camera("cam-1"),
            camera("cam-2"),
        ]));
        let manager = DeviceManager::new(platform.clone());
        manager.refresh().await.unwrap();

        manager.select_camera("cam-2");
        manager.reenumerate().await.unwrap();
        assert_eq!(manager.selection().camera.as_deref(), Some("cam-2"));
    }

    #[tokio::test]
    async fn hotplug_reenumerates_without_losing_selection() {
        let platform = Arc::new(MockDevicePlatform::new(vec![camera("cam-1")]));
        let mut manager = DeviceManager::new(platform.clone());
        manager.refresh().await.unwrap();
        manager.watch_hotplug();

        platform.attach(microphone("mic-usb"));
        // Give the hot-plug task a moment to observe the change.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert_eq!(manager.inventory().microphones.len(), 1);
        assert_eq!(manager.selection().camera.as_deref(), Some("cam-1"));
        assert_eq!(manager.selection().microphone.as_deref(), Some("mic-usb"));
    }
}
