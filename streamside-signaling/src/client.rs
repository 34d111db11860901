//! Directory client

use crate::protocol::{AccessToken, DirectoryRequest, DirectoryResponse, ResolvedStudio, StudioRecord};
use futures::{SinkExt, StreamExt};
use streamside_core::StreamsideError;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

/// WebSocket client for the studio directory
///
/// One request in flight at a time: every request sends a single text frame
/// and waits for the single response frame the server answers with. Error
/// responses are decoded back into typed [`StreamsideError`] values by their
/// error code.
#[derive(Debug)]
pub struct DirectoryClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl DirectoryClient {
    /// Connect to a directory server
    pub async fn connect(url: &str) -> Result<Self, StreamsideError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| StreamsideError::Network {
                reason: format!("failed to connect to {url}: {e}"),
            })?;
        tracing::debug!("Connected to directory at {}", url);
        Ok(Self { stream })
    }

    /// Look up a studio by invite code
    pub async fn resolve_invite(
        &mut self,
        invite_code: &str,
    ) -> Result<ResolvedStudio, StreamsideError> {
        let response = self
            .request(
                DirectoryRequest::ResolveInvite {
                    invite_code: invite_code.to_string(),
                },
                invite_code,
            )
            .await?;
        match response {
            DirectoryResponse::StudioResolved { studio } => Ok(studio),
            other => Err(unexpected_response(other)),
        }
    }

    /// Create a studio
    ///
    /// Returns the created studio and whether it is virtual (requested by a
    /// guest identity and not persisted server-side).
    pub async fn create_studio(
        &mut self,
        name: &str,
        description: Option<String>,
        requester_id: &str,
        requester_name: &str,
    ) -> Result<(StudioRecord, bool), StreamsideError> {
        let response = self
            .request(
                DirectoryRequest::CreateStudio {
                    name: name.to_string(),
                    description,
                    requester_id: requester_id.to_string(),
                    requester_name: requester_name.to_string(),
                },
                name,
            )
            .await?;
        match response {
            DirectoryResponse::StudioCreated {
                studio,
                virtual_studio,
            } => Ok((studio, virtual_studio)),
            other => Err(unexpected_response(other)),
        }
    }

    /// Fetch a studio by id
    pub async fn get_studio(&mut self, studio_id: &str) -> Result<StudioRecord, StreamsideError> {
        let response = self
            .request(
                DirectoryRequest::GetStudio {
                    studio_id: studio_id.to_string(),
                },
                studio_id,
            )
            .await?;
        match response {
            DirectoryResponse::StudioInfo { studio } => Ok(studio),
            other => Err(unexpected_response(other)),
        }
    }

    /// List the studios hosted by an identity, newest first
    pub async fn list_studios(
        &mut self,
        host_id: &str,
    ) -> Result<Vec<StudioRecord>, StreamsideError> {
        let response = self
            .request(
                DirectoryRequest::ListStudios {
                    host_id: host_id.to_string(),
                },
                host_id,
            )
            .await?;
        match response {
            DirectoryResponse::StudioList { studios } => Ok(studios),
            other => Err(unexpected_response(other)),
        }
    }

    /// Request a media access token for a studio room
    pub async fn request_token(
        &mut self,
        room_name: &str,
        participant_identity: &str,
        participant_name: &str,
    ) -> Result<AccessToken, StreamsideError> {
        let response = self
            .request(
                DirectoryRequest::RequestToken {
                    room_name: room_name.to_string(),
                    participant_identity: participant_identity.to_string(),
                    participant_name: participant_name.to_string(),
                },
                room_name,
            )
            .await?;
        match response {
            DirectoryResponse::Token { token } => Ok(token),
            other => Err(unexpected_response(other)),
        }
    }

    /// Send one request and wait for its response
    ///
    /// `reference` is the caller-side identifier the request was about; it is
    /// folded back into lookup errors since the wire form carries only a
    /// user-facing message.
    async fn request(
        &mut self,
        request: DirectoryRequest,
        reference: &str,
    ) -> Result<DirectoryResponse, StreamsideError> {
        let json = serde_json::to_string(&request).map_err(|e| StreamsideError::InvalidMessage {
            message: format!("{request:?}"),
            source: e.into(),
        })?;
        self.stream
            .send(Message::Text(json))
            .await
            .map_err(|e| StreamsideError::Network {
                reason: format!("failed to send request: {e}"),
            })?;

        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    let response: DirectoryResponse = serde_json::from_str(&text).map_err(|e| {
                        StreamsideError::InvalidMessage {
                            message: text.clone(),
                            source: e.into(),
                        }
                    })?;
                    if let DirectoryResponse::Error { error, error_code } = response {
                        return Err(decode_error(&error_code, error, reference));
                    }
                    return Ok(response);
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(StreamsideError::Network {
                        reason: "directory connection closed".to_string(),
                    });
                }
                Some(Err(e)) => {
                    return Err(StreamsideError::Network {
                        reason: format!("directory connection failed: {e}"),
                    });
                }
                Some(Ok(_)) => {
                    // Ignore other message types (Binary, Ping, Pong)
                }
            }
        }
    }

    /// Close the connection
    pub async fn close(mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("Directory connection close failed: {}", e);
        }
    }
}

/// Decode a wire error back into its typed form
fn decode_error(error_code: &str, message: String, reference: &str) -> StreamsideError {
    match error_code {
        "STUDIO_NOT_FOUND" => StreamsideError::StudioNotFound {
            reference: reference.to_string(),
        },
        "STUDIO_INACTIVE" => StreamsideError::StudioInactive {
            reference: reference.to_string(),
        },
        "UNAUTHORIZED" => StreamsideError::Unauthorized,
        "MISSING_CONFIGURATION" => StreamsideError::MissingConfiguration {
            field: message,
        },
        _ => StreamsideError::Network { reason: message },
    }
}

fn unexpected_response(response: DirectoryResponse) -> StreamsideError {
    StreamsideError::Network {
        reason: format!("unexpected directory response: {response:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_decode_to_typed_errors() {
        let err = decode_error(
            "STUDIO_NOT_FOUND",
            "Studio not found. Please check your invite code.".to_string(),
            "ABCD2345",
        );
        match err {
            StreamsideError::StudioNotFound { reference } => assert_eq!(reference, "ABCD2345"),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(
            decode_error("UNAUTHORIZED", "Unauthorized".to_string(), "room"),
            StreamsideError::Unauthorized
        ));
    }

    #[test]
    fn unknown_codes_fall_back_to_network_errors() {
        let err = decode_error("SOMETHING_NEW", "boom".to_string(), "x");
        match err {
            StreamsideError::Network { reason } => assert_eq!(reason, "boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
