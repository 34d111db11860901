//! # Streamside
//!
//! Streamside is a browser-style studio client: hosts open studios with
//! short invite codes, guests join them under a locally persisted identity
//! that survives reloads, and every participant can capture a local
//! recording that streams to disk segment by segment.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use streamside::{GlobalConfig, Streamside};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let streamside = Streamside::init_with(
//!         GlobalConfig::default().with_directory_url("ws://localhost:9000"),
//!     )?;
//!
//!     // Join through an invite code; a returning guest keeps their identity
//!     let mut session = streamside
//!         .join("ABCD2345")
//!         .display_name("Alex")
//!         .enable_video()
//!         .enable_audio()
//!         .connect()
//!         .await?;
//!
//!     let mut events = session.events();
//!     while let Some(event) = events.next().await {
//!         println!("Session event: {:?}", event);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use streamside_core::{
    GuestIdentity, GuestSession, GuestStore, KeyValueStore, MemoryStore, StreamsideError,
    GUEST_SESSION_TTL_MS,
};

pub use streamside_media::{
    BufferingSink, CaptureConfig, CaptureSession, CaptureState, DeviceManager, DevicePlatform,
    FixedTargetPicker, MediaConstraints, MediaDeviceInfo, MediaDeviceKind, MediaKind,
    MockDevicePlatform, ProgressiveSink, RecorderBackend, RecordingArtifact, RecordingSink,
    SaveTargetChoice, SaveTargetPicker, ScriptedRecorder, StartOutcome, UnsupportedPicker,
};

pub use streamside_signaling::{
    AccessToken, DirectoryClient, DirectoryServer, ResolvedStudio, StudioDirectory, StudioRecord,
};

// Public API modules
pub mod config;
pub mod event;
pub mod identity;
pub mod session;

// Re-export main API types
pub use config::GlobalConfig;
pub use event::{Event, EventStream};
pub use identity::ParticipantIdentity;
pub use session::{SessionBuilder, StudioSession};

use std::sync::Arc;

/// Guest store over shared trait-object storage
///
/// The durable half stands in for browser local storage and the session
/// half for per-tab storage; both are injected rather than ambient.
pub type SharedGuestStore = GuestStore<Arc<dyn KeyValueStore>, Arc<dyn KeyValueStore>>;

/// Main entry point for Streamside
#[derive(Clone)]
pub struct Streamside {
    inner: Arc<StreamsideInner>,
}

struct StreamsideInner {
    config: GlobalConfig,
    guest_store: SharedGuestStore,
}

impl Streamside {
    /// Initialize Streamside from the environment
    ///
    /// # Example
    /// ```rust,no_run
    /// use streamside::Streamside;
    ///
    /// let streamside = Streamside::init()?;
    /// # Ok::<(), streamside::StreamsideError>(())
    /// ```
    pub fn init() -> Result<Self, StreamsideError> {
        Self::init_with(GlobalConfig::from_env())
    }

    /// Initialize with custom global configuration
    pub fn init_with(config: GlobalConfig) -> Result<Self, StreamsideError> {
        Self::init_with_stores(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        )
    }

    /// Initialize with an explicit durable/session storage pair
    ///
    /// The pair backs the guest identity store; tests and embedders pass
    /// their own implementations here.
    pub fn init_with_stores(
        config: GlobalConfig,
        durable: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
    ) -> Result<Self, StreamsideError> {
        if config.debug_logging {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
                )
                .try_init();
        }

        Ok(Self {
            inner: Arc::new(StreamsideInner {
                config,
                guest_store: GuestStore::new(durable, session),
            }),
        })
    }

    /// Create a session builder for the given invite code
    ///
    /// # Example
    /// ```rust,no_run
    /// use streamside::Streamside;
    ///
    /// # async fn example() -> Result<(), streamside::StreamsideError> {
    /// let streamside = Streamside::init()?;
    /// let session = streamside
    ///     .join("ABCD2345")
    ///     .display_name("Alex")
    ///     .connect().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn join(&self, invite_code: &str) -> SessionBuilder {
        SessionBuilder::new(self, invite_code)
    }

    /// Create a capture session using this configuration's download directory
    pub fn capture(&self) -> CaptureSession {
        CaptureSession::new(CaptureConfig::new(self.inner.config.download_dir.clone()))
    }

    /// The stored guest identity, if a valid one exists
    pub fn guest_identity(&self) -> Option<GuestIdentity> {
        self.inner.guest_store.session_identity()
    }

    /// The global configuration
    pub fn config(&self) -> &GlobalConfig {
        &self.inner.config
    }

    pub(crate) fn guest_store(&self) -> &SharedGuestStore {
        &self.inner.guest_store
    }
}

impl std::fmt::Debug for Streamside {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Streamside")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
