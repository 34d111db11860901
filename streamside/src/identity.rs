//! Participant identity

use streamside_core::{is_guest_identity, GuestIdentity};

/// Who a participant is inside a studio
///
/// The `guest-` prefix convention is decoded exactly once, when an identity
/// enters through [`ParticipantIdentity::from_raw`] or the session builder;
/// everything downstream matches on the variant instead of re-parsing the
/// string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantIdentity {
    /// An authenticated studio host
    Host {
        /// Stable account id
        user_id: String,
        /// Display name
        name: String,
    },
    /// A guest joining through an invite code
    Guest {
        /// Generated identifier of the form `guest-<random>`
        guest_id: String,
        /// Display name the guest entered
        name: String,
    },
}

impl ParticipantIdentity {
    /// Classify a raw identity string by its prefix
    pub fn from_raw(id: &str, name: &str) -> Self {
        if is_guest_identity(id) {
            Self::Guest {
                guest_id: id.to_string(),
                name: name.to_string(),
            }
        } else {
            Self::Host {
                user_id: id.to_string(),
                name: name.to_string(),
            }
        }
    }

    /// The identity string sent to the directory
    pub fn id(&self) -> &str {
        match self {
            Self::Host { user_id, .. } => user_id,
            Self::Guest { guest_id, .. } => guest_id,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        match self {
            Self::Host { name, .. } | Self::Guest { name, .. } => name,
        }
    }

    /// Whether this is a guest identity
    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest { .. })
    }
}

impl From<GuestIdentity> for ParticipantIdentity {
    fn from(identity: GuestIdentity) -> Self {
        Self::Guest {
            guest_id: identity.guest_id,
            name: identity.guest_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_decides_the_variant() {
        let guest = ParticipantIdentity::from_raw("guest-a1b2c3d4e", "Alex");
        assert!(guest.is_guest());
        assert_eq!(guest.id(), "guest-a1b2c3d4e");
        assert_eq!(guest.name(), "Alex");

        let host = ParticipantIdentity::from_raw("user-1", "Dana");
        assert!(!host.is_guest());
        assert_eq!(host.id(), "user-1");
    }

    #[test]
    fn guest_identity_converts() {
        let identity: ParticipantIdentity = GuestIdentity {
            guest_name: "Alex".to_string(),
            guest_id: "guest-a1b2c3d4e".to_string(),
        }
        .into();
        assert!(identity.is_guest());
    }
}
