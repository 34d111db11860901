//! Directory protocol messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A studio as the directory exposes it
///
/// Virtual guest studios share this exact shape; the only difference is
/// that they are never persisted and cannot be looked up again by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioRecord {
    /// Unique studio id
    pub id: String,
    /// Display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Short opaque join code
    pub invite_code: String,
    /// Identity of the hosting participant
    pub host_id: String,
    /// Display name of the host
    pub host_name: String,
    /// Whether the studio can still be joined
    pub is_active: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Result of an invite-code lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStudio {
    /// Studio id the code resolved to
    pub studio_id: String,
    /// Studio display name
    pub studio_name: String,
    /// Host display name shown on the invite page
    pub host_name: String,
}

/// Short-lived media access credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Opaque token value
    pub token: String,
    /// Media service websocket URL the token is valid for
    pub ws_url: String,
    /// Expiry timestamp
    pub expires_at: DateTime<Utc>,
}

/// Requests accepted by the studio directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DirectoryRequest {
    /// Look up a studio by its invite code
    ResolveInvite {
        /// Invite code, compared by exact match
        invite_code: String,
    },
    /// Create a studio
    ///
    /// A requester whose id carries the `guest-` prefix receives a virtual
    /// studio that is never persisted.
    CreateStudio {
        /// Studio display name
        name: String,
        /// Optional description
        description: Option<String>,
        /// Identity of the requester
        requester_id: String,
        /// Display name of the requester
        requester_name: String,
    },
    /// Fetch a studio by id
    GetStudio {
        /// Studio id
        studio_id: String,
    },
    /// List studios hosted by an identity, newest first
    ListStudios {
        /// Host identity
        host_id: String,
    },
    /// Request a media access token for a room
    RequestToken {
        /// Room name, formatted `studio-<studioId>`
        room_name: String,
        /// Participant identity (user id or guest id)
        participant_identity: String,
        /// Participant display name
        participant_name: String,
    },
}

/// Responses sent by the studio directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DirectoryResponse {
    /// Invite code resolved successfully
    StudioResolved {
        /// Resolved studio summary
        studio: ResolvedStudio,
    },
    /// Studio created
    StudioCreated {
        /// The created studio
        studio: StudioRecord,
        /// Whether the studio is virtual (guest-created, not persisted)
        virtual_studio: bool,
    },
    /// Studio details
    StudioInfo {
        /// The studio
        studio: StudioRecord,
    },
    /// Studios hosted by the requested identity
    StudioList {
        /// Studios, newest first
        studios: Vec<StudioRecord>,
    },
    /// Media access token issued
    Token {
        /// The issued token
        token: AccessToken,
    },
    /// Error response
    Error {
        /// User-facing error message
        error: String,
        /// Error code for programmatic handling
        error_code: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_round_trip_through_json() {
        let request = DirectoryRequest::ResolveInvite {
            invite_code: "ABCD2345".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        let parsed: DirectoryRequest = serde_json::from_str(&json).unwrap();
        match parsed {
            DirectoryRequest::ResolveInvite { invite_code } => {
                assert_eq!(invite_code, "ABCD2345");
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn responses_round_trip_through_json() {
        let response = DirectoryResponse::StudioResolved {
            studio: ResolvedStudio {
                studio_id: "s1".to_string(),
                studio_name: "Standup".to_string(),
                host_name: "Dana".to_string(),
            },
        };
        let json = serde_json::to_string(&response).unwrap();
        let parsed: DirectoryResponse = serde_json::from_str(&json).unwrap();
        match parsed {
            DirectoryResponse::StudioResolved { studio } => {
                assert_eq!(studio.studio_id, "s1");
                assert_eq!(studio.host_name, "Dana");
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn error_responses_carry_a_code() {
        let response = DirectoryResponse::Error {
            error: "Studio not found. Please check your invite code.".to_string(),
            error_code: "STUDIO_NOT_FOUND".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("STUDIO_NOT_FOUND"));
    }
}
