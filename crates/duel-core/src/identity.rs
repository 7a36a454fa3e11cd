//! Participant roles and identity resolution.

use std::fmt;

use rand::Rng;

use crate::tally::PlayerKey;

/// Fixed identity for the player in the first slot.
pub const PLAYER1_IDENTITY: &str = "player1";
/// Fixed identity for the player in the second slot.
pub const PLAYER2_IDENTITY: &str = "player2";

/// Upper bound (exclusive) of the random viewer id space.
pub const VIEWER_ID_SPACE: u32 = 100_000;

/// Role selected for a session. Fixed until the session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player1,
    Player2,
    Viewer,
}

impl Role {
    pub fn is_player(self) -> bool {
        matches!(self, Role::Player1 | Role::Player2)
    }

    /// The tally slot this role competes under, if any.
    pub fn player_key(self) -> Option<PlayerKey> {
        match self {
            Role::Player1 => Some(PlayerKey::Player1),
            Role::Player2 => Some(PlayerKey::Player2),
            Role::Viewer => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Player1 => "player1",
            Role::Player2 => "player2",
            Role::Viewer => "viewer",
        };
        f.write_str(name)
    }
}

/// Stable identifier for a participant, shared by both transports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParticipantIdentity(String);

impl ParticipantIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the participant identity for a chosen role.
///
/// Player identities are fixed constants; role exclusivity keeps them
/// unique. Viewer identities are drawn fresh from a bounded random space on
/// every call and are only probabilistically unique.
pub fn resolve_identity(role: Role) -> ParticipantIdentity {
    match role {
        Role::Player1 => ParticipantIdentity::new(PLAYER1_IDENTITY),
        Role::Player2 => ParticipantIdentity::new(PLAYER2_IDENTITY),
        Role::Viewer => {
            let n = rand::thread_rng().gen_range(0..VIEWER_ID_SPACE);
            ParticipantIdentity::new(format!("viewer_{n}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn players_resolve_to_fixed_identities() {
        assert_eq!(resolve_identity(Role::Player1).as_str(), "player1");
        assert_eq!(resolve_identity(Role::Player2).as_str(), "player2");
    }

    #[test]
    fn viewers_resolve_to_bounded_random_identities() {
        for _ in 0..100 {
            let id = resolve_identity(Role::Viewer);
            let suffix = id.as_str().strip_prefix("viewer_").unwrap();
            let n: u32 = suffix.parse().unwrap();
            assert!(n < VIEWER_ID_SPACE);
        }
    }

    #[test]
    fn role_to_player_key() {
        assert_eq!(Role::Player1.player_key(), Some(PlayerKey::Player1));
        assert_eq!(Role::Player2.player_key(), Some(PlayerKey::Player2));
        assert_eq!(Role::Viewer.player_key(), None);
        assert!(!Role::Viewer.is_player());
    }
}
