//! The delimited-string wire codec for signal-channel payloads.
//!
//! Wire contract (bit-exact for interop):
//! - `react:<playerKey>` — one reaction for a player slot
//! - `sync:<JSON tally>` — full snapshot of the sender's tally
//!
//! Any other prefix is rejected. The remainder after the first `:` is
//! parsed in full; `sync:` bodies are JSON objects with exactly the two
//! integer player fields.

use crate::tally::{PlayerKey, ReactionTally};

pub const REACT_PREFIX: &str = "react:";
pub const SYNC_PREFIX: &str = "sync:";

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("unknown payload prefix: {0:?}")]
    UnknownPrefix(String),
    #[error("unknown player key: {0:?}")]
    UnknownTarget(String),
    #[error("invalid sync body: {0}")]
    InvalidSync(#[from] serde_json::Error),
}

/// A parsed signal-channel payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalPayload {
    /// A single reaction for `target`.
    React { target: PlayerKey },
    /// A full tally snapshot, used for late-joiner convergence.
    Sync { tally: ReactionTally },
}

impl SignalPayload {
    pub fn encode(&self) -> String {
        match self {
            SignalPayload::React { target } => format!("{REACT_PREFIX}{target}"),
            SignalPayload::Sync { tally } => {
                let body =
                    serde_json::to_string(tally).expect("tally is a flat integer struct");
                format!("{SYNC_PREFIX}{body}")
            }
        }
    }

    pub fn decode(text: &str) -> Result<Self, PayloadError> {
        if let Some(target) = text.strip_prefix(REACT_PREFIX) {
            match PlayerKey::parse(target) {
                Some(target) => Ok(SignalPayload::React { target }),
                None => Err(PayloadError::UnknownTarget(target.to_string())),
            }
        } else if let Some(body) = text.strip_prefix(SYNC_PREFIX) {
            let tally = serde_json::from_str(body)?;
            Ok(SignalPayload::Sync { tally })
        } else {
            let prefix = text.split(':').next().unwrap_or("");
            Err(PayloadError::UnknownPrefix(prefix.to_string()))
        }
    }
}
