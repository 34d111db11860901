//! Guest identity store
//!
//! Persists a guest's display name and generated identifier across reloads
//! and tab switches with a 24 hour validity window. The durable and
//! session-scoped stores are injected so nothing here touches ambient state.

use crate::invite::generate_guest_id;
use crate::storage::KeyValueStore;
use crate::StreamsideError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Durable storage key holding the serialized [`GuestSession`]
pub const GUEST_STORAGE_KEY: &str = "streamside_guest";

/// Session-scoped key mirroring the guest display name
pub const SESSION_NAME_KEY: &str = "guestName";

/// Session-scoped key mirroring the guest id
pub const SESSION_ID_KEY: &str = "guestId";

/// Validity window for a stored guest session
pub const GUEST_SESSION_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// A guest's locally persisted identity for one studio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestSession {
    /// Display name the guest entered on the invite page
    #[serde(rename = "guestName")]
    pub guest_name: String,
    /// Generated identifier of the form `guest-<random>`
    #[serde(rename = "guestId")]
    pub guest_id: String,
    /// Studio the session was created for
    #[serde(rename = "studioId")]
    pub studio_id: String,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
}

impl GuestSession {
    /// Whether this session has outlived its validity window at `now_ms`
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms - self.timestamp > GUEST_SESSION_TTL_MS
    }
}

/// Guest identity mirrored into the session-scoped store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestIdentity {
    /// Display name
    pub guest_name: String,
    /// Generated guest id
    pub guest_id: String,
}

/// Store for guest sessions over an injected durable/session store pair
#[derive(Clone)]
pub struct GuestStore<D, S> {
    durable: D,
    session: S,
}

impl<D: KeyValueStore, S: KeyValueStore> GuestStore<D, S> {
    /// Create a guest store over the given storage pair
    pub fn new(durable: D, session: S) -> Self {
        Self { durable, session }
    }

    /// Create and persist a new guest session for `studio_id`
    ///
    /// A fresh guest id is generated on every call; a previous session is
    /// overwritten wholesale, never partially updated. The name and id are
    /// additionally mirrored into the session store for same-tab access.
    pub fn store(&self, name: &str, studio_id: &str) -> Result<GuestSession, StreamsideError> {
        let session = GuestSession {
            guest_name: name.to_string(),
            guest_id: generate_guest_id(),
            studio_id: studio_id.to_string(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };

        let json = serde_json::to_string(&session).map_err(|e| StreamsideError::Storage {
            reason: format!("Failed to serialize guest session: {}", e),
        })?;
        self.durable.set(GUEST_STORAGE_KEY, &json);
        self.mirror(&session);

        debug!(guest_id = %session.guest_id, studio_id, "Stored guest session");
        Ok(session)
    }

    /// Load the persisted guest session, applying lazy expiry
    ///
    /// An expired record is deleted and reported as absent. A valid record
    /// is returned unchanged (the timestamp is not refreshed) and mirrored
    /// into the session store if that store is currently empty, which
    /// recovers the identity after a session-store clear such as a new tab.
    /// Malformed stored JSON is treated identically to absent.
    pub fn read(&self) -> Option<GuestSession> {
        self.read_at(chrono::Utc::now().timestamp_millis())
    }

    fn read_at(&self, now_ms: i64) -> Option<GuestSession> {
        let stored = self.durable.get(GUEST_STORAGE_KEY)?;
        let session: GuestSession = match serde_json::from_str(&stored) {
            Ok(session) => session,
            Err(e) => {
                debug!("Ignoring malformed guest session: {}", e);
                return None;
            }
        };

        if session.is_expired_at(now_ms) {
            self.durable.remove(GUEST_STORAGE_KEY);
            debug!(guest_id = %session.guest_id, "Expired guest session removed");
            return None;
        }

        if self.session.get(SESSION_NAME_KEY).is_none()
            || self.session.get(SESSION_ID_KEY).is_none()
        {
            self.mirror(&session);
        }
        Some(session)
    }

    /// Fast-path identity lookup
    ///
    /// Reads the session-scoped mirror first and falls back to the durable
    /// record (re-mirroring it) when the mirror is missing.
    pub fn session_identity(&self) -> Option<GuestIdentity> {
        if let (Some(guest_name), Some(guest_id)) = (
            self.session.get(SESSION_NAME_KEY),
            self.session.get(SESSION_ID_KEY),
        ) {
            return Some(GuestIdentity {
                guest_name,
                guest_id,
            });
        }

        self.read().map(|session| GuestIdentity {
            guest_name: session.guest_name,
            guest_id: session.guest_id,
        })
    }

    /// Remove the guest session from both stores (leave-studio path)
    pub fn clear(&self) {
        self.durable.remove(GUEST_STORAGE_KEY);
        self.session.remove(SESSION_NAME_KEY);
        self.session.remove(SESSION_ID_KEY);
    }

    fn mirror(&self, session: &GuestSession) {
        self.session.set(SESSION_NAME_KEY, &session.guest_name);
        self.session.set(SESSION_ID_KEY, &session.guest_id);
    }
}
