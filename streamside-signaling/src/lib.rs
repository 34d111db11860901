//! # Streamside Signaling
//!
//! Studio directory service and client for Streamside. Handles invite-code
//! resolution, studio creation, and media access token issuance over a
//! JSON-over-WebSocket protocol.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod directory;
pub mod protocol;
pub mod server;

// Re-export main types
pub use client::DirectoryClient;
pub use directory::{StudioDirectory, ROOM_NAME_PREFIX};
pub use protocol::{
    AccessToken, DirectoryRequest, DirectoryResponse, ResolvedStudio, StudioRecord,
};
pub use server::DirectoryServer;
