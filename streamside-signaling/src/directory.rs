//! Studio directory
//!
//! In-memory studio registry behind the wire protocol: invite resolution,
//! studio creation (including virtual guest studios), and media access
//! token issuance. Durable persistence belongs to an external collaborator;
//! this directory models only the boundary contract the client flow needs.

use crate::protocol::{AccessToken, ResolvedStudio, StudioRecord};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use streamside_core::{generate_invite_code, is_guest_identity, StreamsideError};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

/// Room-name prefix for studio rooms on the media service
pub const ROOM_NAME_PREFIX: &str = "studio-";

/// Token validity window
const TOKEN_TTL_HOURS: i64 = 6;

/// Studio registry and token issuer
#[derive(Debug, Clone)]
pub struct StudioDirectory {
    studios: Arc<RwLock<HashMap<String, StudioRecord>>>,
    media_ws_url: String,
}

impl StudioDirectory {
    /// Create an empty directory issuing tokens for `media_ws_url`
    pub fn new(media_ws_url: impl Into<String>) -> Self {
        Self {
            studios: Arc::new(RwLock::new(HashMap::new())),
            media_ws_url: media_ws_url.into(),
        }
    }

    /// Create a studio for `requester_id`
    ///
    /// A guest requester (id prefix `guest-`) gets a studio-shaped record
    /// with a fresh id and invite code that is NOT persisted: downstream
    /// consumers cannot tell it apart from a stored studio, but it cannot
    /// be looked up later by id. Returns the record and whether it is
    /// virtual.
    pub async fn create_studio(
        &self,
        name: &str,
        description: Option<String>,
        requester_id: &str,
        requester_name: &str,
    ) -> Result<(StudioRecord, bool), StreamsideError> {
        if name.trim().is_empty() {
            return Err(StreamsideError::MissingConfiguration {
                field: "name".to_string(),
            });
        }

        let studio = StudioRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            description,
            invite_code: generate_invite_code(),
            host_id: requester_id.to_string(),
            host_name: requester_name.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        if is_guest_identity(requester_id) {
            info!(studio_id = %studio.id, "Virtual guest studio synthesized");
            return Ok((studio, true));
        }

        self.studios
            .write()
            .await
            .insert(studio.id.clone(), studio.clone());
        info!(studio_id = %studio.id, invite_code = %studio.invite_code, "Studio created");
        Ok((studio, false))
    }

    /// Look up a studio by invite code
    ///
    /// Comparison is exact match; codes are generated from a single-case
    /// alphabet so no normalization is applied. A deactivated studio is
    /// reported distinctly from an unknown code. Pure read.
    pub async fn resolve_invite(
        &self,
        invite_code: &str,
    ) -> Result<ResolvedStudio, StreamsideError> {
        let studios = self.studios.read().await;
        let studio = studios
            .values()
            .find(|s| s.invite_code == invite_code)
            .ok_or_else(|| StreamsideError::StudioNotFound {
                reference: invite_code.to_string(),
            })?;

        if !studio.is_active {
            return Err(StreamsideError::StudioInactive {
                reference: studio.id.clone(),
            });
        }

        debug!(invite_code, studio_id = %studio.id, "Invite resolved");
        Ok(ResolvedStudio {
            studio_id: studio.id.clone(),
            studio_name: studio.name.clone(),
            host_name: studio.host_name.clone(),
        })
    }

    /// Fetch a studio by id
    pub async fn get_studio(&self, studio_id: &str) -> Result<StudioRecord, StreamsideError> {
        self.studios
            .read()
            .await
            .get(studio_id)
            .cloned()
            .ok_or_else(|| StreamsideError::StudioNotFound {
                reference: studio_id.to_string(),
            })
    }

    /// List the studios hosted by `host_id`, newest first
    pub async fn list_studios(&self, host_id: &str) -> Vec<StudioRecord> {
        let mut studios: Vec<StudioRecord> = self
            .studios
            .read()
            .await
            .values()
            .filter(|s| s.host_id == host_id)
            .cloned()
            .collect();
        studios.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        studios
    }

    /// Activate or deactivate a studio
    pub async fn set_active(&self, studio_id: &str, active: bool) -> Result<(), StreamsideError> {
        let mut studios = self.studios.write().await;
        let studio = studios
            .get_mut(studio_id)
            .ok_or_else(|| StreamsideError::StudioNotFound {
                reference: studio_id.to_string(),
            })?;
        studio.is_active = active;
        Ok(())
    }

    /// Issue a media access token for a studio room
    ///
    /// Guests (identity prefix `guest-`) need no further authorization;
    /// any other identity must be the studio's host. The studio must exist
    /// and be active.
    pub async fn issue_token(
        &self,
        room_name: &str,
        participant_identity: &str,
        participant_name: &str,
    ) -> Result<AccessToken, StreamsideError> {
        let studio_id = room_name.strip_prefix(ROOM_NAME_PREFIX).unwrap_or(room_name);

        let studios = self.studios.read().await;
        let studio =
            studios
                .get(studio_id)
                .ok_or_else(|| StreamsideError::StudioNotFound {
                    reference: studio_id.to_string(),
                })?;
        if !studio.is_active {
            return Err(StreamsideError::StudioInactive {
                reference: studio.id.clone(),
            });
        }
        if !is_guest_identity(participant_identity) && participant_identity != studio.host_id {
            return Err(StreamsideError::Unauthorized);
        }

        debug!(
            room_name,
            participant_identity, participant_name, "Access token issued"
        );
        Ok(AccessToken {
            token: Uuid::new_v4().simple().to_string(),
            ws_url: self.media_ws_url.clone(),
            expires_at: Utc::now() + Duration::hours(TOKEN_TTL_HOURS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> StudioDirectory {
        StudioDirectory::new("ws://localhost:7880")
    }

    #[tokio::test]
    async fn host_studio_is_persisted_and_resolvable() {
        let directory = directory();
        let (studio, virtual_studio) = directory
            .create_studio("Standup", None, "user-1", "Dana")
            .await
            .unwrap();
        assert!(!virtual_studio);

        let resolved = directory.resolve_invite(&studio.invite_code).await.unwrap();
        assert_eq!(resolved.studio_id, studio.id);
        assert_eq!(resolved.studio_name, "Standup");
        assert_eq!(resolved.host_name, "Dana");
    }

    #[tokio::test]
    async fn guest_studio_is_virtual() {
        let directory = directory();
        let (studio, virtual_studio) = directory
            .create_studio("Ad-hoc", None, "guest-a1b2c3d4e", "Alex")
            .await
            .unwrap();
        assert!(virtual_studio);
        assert!(studio.is_active);
        assert_eq!(studio.invite_code.len(), 8);

        // The virtual studio exists only in the response payload.
        assert!(matches!(
            directory.get_studio(&studio.id).await,
            Err(StreamsideError::StudioNotFound { .. })
        ));
        assert!(matches!(
            directory.resolve_invite(&studio.invite_code).await,
            Err(StreamsideError::StudioNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_code_is_not_found_and_inactive_is_gone() {
        let directory = directory();
        let (studio, _) = directory
            .create_studio("Standup", None, "user-1", "Dana")
            .await
            .unwrap();

        assert!(matches!(
            directory.resolve_invite("NOSUCHCD").await,
            Err(StreamsideError::StudioNotFound { .. })
        ));

        directory.set_active(&studio.id, false).await.unwrap();
        match directory.resolve_invite(&studio.invite_code).await {
            Err(StreamsideError::StudioInactive { reference }) => {
                assert_eq!(reference, studio.id);
            }
            other => panic!("expected StudioInactive, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn invite_lookup_is_exact_match() {
        let directory = directory();
        let (studio, _) = directory
            .create_studio("Standup", None, "user-1", "Dana")
            .await
            .unwrap();

        let lowered = studio.invite_code.to_lowercase();
        assert_ne!(lowered, studio.invite_code);
        assert!(matches!(
            directory.resolve_invite(&lowered).await,
            Err(StreamsideError::StudioNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn empty_name_is_rejected() {
        let directory = directory();
        assert!(matches!(
            directory.create_studio("  ", None, "user-1", "Dana").await,
            Err(StreamsideError::MissingConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn list_studios_returns_newest_first() {
        let directory = directory();
        let (older, _) = directory
            .create_studio("First", None, "user-1", "Dana")
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let (newer, _) = directory
            .create_studio("Second", None, "user-1", "Dana")
            .await
            .unwrap();

        let listed = directory.list_studios("user-1").await;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);
        assert!(directory.list_studios("user-2").await.is_empty());
    }

    #[tokio::test]
    async fn token_requires_existing_active_studio() {
        let directory = directory();
        let (studio, _) = directory
            .create_studio("Standup", None, "user-1", "Dana")
            .await
            .unwrap();

        let room = format!("{}{}", ROOM_NAME_PREFIX, studio.id);
        let token = directory
            .issue_token(&room, "guest-a1b2c3d4e", "Alex")
            .await
            .unwrap();
        assert_eq!(token.ws_url, "ws://localhost:7880");
        assert!(token.expires_at > Utc::now());

        // Bare studio id works too; the prefix is optional.
        directory
            .issue_token(&studio.id, "user-1", "Dana")
            .await
            .unwrap();

        assert!(matches!(
            directory.issue_token("studio-missing", "guest-x", "X").await,
            Err(StreamsideError::StudioNotFound { .. })
        ));

        directory.set_active(&studio.id, false).await.unwrap();
        assert!(matches!(
            directory.issue_token(&room, "guest-x", "X").await,
            Err(StreamsideError::StudioInactive { .. })
        ));
    }

    #[tokio::test]
    async fn non_host_authenticated_identity_is_unauthorized() {
        let directory = directory();
        let (studio, _) = directory
            .create_studio("Standup", None, "user-1", "Dana")
            .await
            .unwrap();

        let room = format!("{}{}", ROOM_NAME_PREFIX, studio.id);
        assert!(matches!(
            directory.issue_token(&room, "user-2", "Eve").await,
            Err(StreamsideError::Unauthorized)
        ));
    }
}
