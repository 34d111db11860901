//! # Streamside Core
//!
//! Shared building blocks for Streamside: the workspace error type, the
//! guest identity store with its injectable storage seam, and invite-code
//! generation.

#![warn(clippy::all)]

pub mod error;
pub mod guest;
pub mod invite;
pub mod storage;

pub use error::StreamsideError;
pub use guest::{
    GuestIdentity, GuestSession, GuestStore, GUEST_SESSION_TTL_MS, GUEST_STORAGE_KEY,
    SESSION_ID_KEY, SESSION_NAME_KEY,
};
pub use invite::{generate_guest_id, generate_invite_code, is_guest_identity, GUEST_ID_PREFIX};
pub use storage::{KeyValueStore, MemoryStore};
