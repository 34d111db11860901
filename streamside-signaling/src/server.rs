//! Directory server implementation

use crate::directory::StudioDirectory;
use crate::protocol::{DirectoryRequest, DirectoryResponse};
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde_json;
use std::net::SocketAddr;
use std::sync::Arc;
use streamside_core::StreamsideError;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message, WebSocketStream};
use uuid::Uuid;

/// Peer addresses of active connections mapped by connection ID
///
/// The socket itself stays owned by its connection task; only bookkeeping
/// lives in the map, so one silent connection can never stall another.
type Connections = Arc<DashMap<String, SocketAddr>>;

/// WebSocket front end for the studio directory
///
/// Each text frame carries one [`DirectoryRequest`] and receives exactly one
/// [`DirectoryResponse`] on the same connection. Directory failures are
/// reported as [`DirectoryResponse::Error`] frames, never as closed
/// connections.
#[derive(Debug, Clone)]
pub struct DirectoryServer {
    /// Address the server binds to
    pub bind_addr: SocketAddr,
    directory: StudioDirectory,
    connections: Connections,
}

impl DirectoryServer {
    /// Create a new directory server
    pub fn new(bind_addr: SocketAddr, directory: StudioDirectory) -> Self {
        Self {
            bind_addr,
            directory,
            connections: Arc::new(DashMap::new()),
        }
    }

    /// The directory this server fronts
    pub fn directory(&self) -> &StudioDirectory {
        &self.directory
    }

    /// Number of currently connected clients
    pub fn active_connections(&self) -> usize {
        self.connections.len()
    }

    /// Bind and serve until the task is cancelled
    pub async fn start(&self) -> Result<(), StreamsideError> {
        let listener = TcpListener::bind(self.bind_addr).await.map_err(|e| {
            StreamsideError::ServerStartFailed {
                address: self.bind_addr,
                source: e.into(),
            }
        })?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener
    ///
    /// Used by tests that bind port 0 and read the actual address back.
    pub async fn serve_on(&self, listener: TcpListener) -> Result<(), StreamsideError> {
        tracing::info!("Directory server listening on {}", self.bind_addr);

        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    tracing::debug!("New connection from {}", addr);
                    let server = self.clone();
                    tokio::spawn(async move {
                        server.handle_connection(stream, addr).await;
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    /// Handle incoming WebSocket connection
    async fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::error!("WebSocket handshake failed: {}", e);
                return;
            }
        };

        let connection_id = Uuid::new_v4().to_string();
        tracing::debug!("WebSocket connection established: {}", connection_id);

        self.connections.insert(connection_id.clone(), addr);
        self.handle_messages(&connection_id, ws_stream).await;
        self.connections.remove(&connection_id);
    }

    /// Handle messages from a WebSocket connection
    ///
    /// The task owns the socket for the connection's lifetime; no shared
    /// lock is held while awaiting the next frame.
    async fn handle_messages(
        &self,
        connection_id: &str,
        mut connection: WebSocketStream<TcpStream>,
    ) {
        while let Some(message) = connection.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let response = match serde_json::from_str::<DirectoryRequest>(&text) {
                        Ok(request) => self.handle_request(request).await,
                        Err(e) => {
                            tracing::warn!("Invalid message format: {}", e);
                            error_response(&StreamsideError::InvalidMessage {
                                message: text,
                                source: e.into(),
                            })
                        }
                    };
                    if !self.send_response(connection_id, &mut connection, response).await {
                        break;
                    }
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!("Connection {} closed", connection_id);
                    break;
                }
                Err(e) => {
                    tracing::error!("WebSocket error on connection {}: {}", connection_id, e);
                    break;
                }
                _ => {
                    // Ignore other message types (Binary, Ping, Pong)
                }
            }
        }
        tracing::debug!("Connection {} stream ended", connection_id);
    }

    /// Dispatch a directory request
    async fn handle_request(&self, request: DirectoryRequest) -> DirectoryResponse {
        let result = match request {
            DirectoryRequest::ResolveInvite { invite_code } => self
                .directory
                .resolve_invite(&invite_code)
                .await
                .map(|studio| DirectoryResponse::StudioResolved { studio }),
            DirectoryRequest::CreateStudio {
                name,
                description,
                requester_id,
                requester_name,
            } => self
                .directory
                .create_studio(&name, description, &requester_id, &requester_name)
                .await
                .map(|(studio, virtual_studio)| DirectoryResponse::StudioCreated {
                    studio,
                    virtual_studio,
                }),
            DirectoryRequest::GetStudio { studio_id } => self
                .directory
                .get_studio(&studio_id)
                .await
                .map(|studio| DirectoryResponse::StudioInfo { studio }),
            DirectoryRequest::ListStudios { host_id } => Ok(DirectoryResponse::StudioList {
                studios: self.directory.list_studios(&host_id).await,
            }),
            DirectoryRequest::RequestToken {
                room_name,
                participant_identity,
                participant_name,
            } => self
                .directory
                .issue_token(&room_name, &participant_identity, &participant_name)
                .await
                .map(|token| DirectoryResponse::Token { token }),
        };

        match result {
            Ok(response) => response,
            Err(e) => error_response(&e),
        }
    }

    /// Send a response on the connection; returns false once it is unusable
    async fn send_response(
        &self,
        connection_id: &str,
        connection: &mut WebSocketStream<TcpStream>,
        response: DirectoryResponse,
    ) -> bool {
        let message = match serde_json::to_string(&response) {
            Ok(json) => Message::Text(json),
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                return true;
            }
        };

        if let Err(e) = connection.send(message).await {
            tracing::error!("Failed to send message to {}: {}", connection_id, e);
            return false;
        }
        true
    }

    /// Stop the server and forget all connection bookkeeping
    pub async fn stop(&self) -> Result<(), StreamsideError> {
        self.connections.clear();
        tracing::info!("Directory server stopped");
        Ok(())
    }
}

/// Map a directory error to its wire form
///
/// Lookup failures get the invite-page wording; everything else keeps the
/// error's own message. The machine-readable code always rides along.
fn error_response(error: &StreamsideError) -> DirectoryResponse {
    let message = match error {
        StreamsideError::StudioNotFound { .. } => {
            "Studio not found. Please check your invite code.".to_string()
        }
        StreamsideError::StudioInactive { .. } => "This studio is no longer active.".to_string(),
        other => other.to_string(),
    };
    DirectoryResponse::Error {
        error: message,
        error_code: error.error_code(),
    }
}
