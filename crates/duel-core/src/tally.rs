use std::fmt;

use serde::{Deserialize, Serialize};

/// A player slot in the duel, as named on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerKey {
    Player1,
    Player2,
}

impl PlayerKey {
    /// Wire name of this slot (`"player1"` / `"player2"`).
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerKey::Player1 => "player1",
            PlayerKey::Player2 => "player2",
        }
    }

    /// Parse a wire name. Anything but the two player keys is rejected.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "player1" => Some(PlayerKey::Player1),
            "player2" => Some(PlayerKey::Player2),
            _ => None,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            PlayerKey::Player1 => PlayerKey::Player2,
            PlayerKey::Player2 => PlayerKey::Player1,
        }
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-player reaction counts.
///
/// Both keys are always present and never negative. The JSON form of this
/// struct is the `sync:` wire body, `{"player1":N,"player2":N}`; a body
/// with missing, negative, non-integer, or unknown fields does not decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactionTally {
    pub player1: u32,
    pub player2: u32,
}

impl ReactionTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(self, key: PlayerKey) -> u32 {
        match key {
            PlayerKey::Player1 => self.player1,
            PlayerKey::Player2 => self.player2,
        }
    }

    /// Count one reaction for `key`. Saturates instead of wrapping.
    pub fn record(&mut self, key: PlayerKey) {
        let slot = match key {
            PlayerKey::Player1 => &mut self.player1,
            PlayerKey::Player2 => &mut self.player2,
        };
        *slot = slot.saturating_add(1);
    }

    pub fn is_zero(self) -> bool {
        self.player1 == 0 && self.player2 == 0
    }
}
