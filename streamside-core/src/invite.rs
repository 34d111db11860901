//! Invite-code and guest-id generation

use rand::Rng;

/// Alphabet for invite codes
///
/// Single-case and with the ambiguous glyphs 0/O/1/I removed, so the
/// exact-match lookup on the directory side is safe by construction and no
/// case normalization is needed.
const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of generated invite codes
pub const INVITE_CODE_LEN: usize = 8;

/// Alphabet for the random portion of guest ids (base-36, lowercase)
const GUEST_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random portion of guest ids
pub const GUEST_ID_SUFFIX_LEN: usize = 9;

/// Prefix distinguishing guest identities from authenticated user ids
pub const GUEST_ID_PREFIX: &str = "guest-";

/// Generate a short opaque invite code
pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_ALPHABET[rng.gen_range(0..INVITE_ALPHABET.len())] as char)
        .collect()
}

/// Generate a guest identity of the form `guest-<9 lowercase alphanumerics>`
///
/// No uniqueness check is performed against other guests; the 36^9 space
/// makes collisions negligible.
pub fn generate_guest_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..GUEST_ID_SUFFIX_LEN)
        .map(|_| GUEST_ALPHABET[rng.gen_range(0..GUEST_ALPHABET.len())] as char)
        .collect();
    format!("{}{}", GUEST_ID_PREFIX, suffix)
}

/// Whether an identity string names a guest participant
pub fn is_guest_identity(identity: &str) -> bool {
    identity.starts_with(GUEST_ID_PREFIX)
}
