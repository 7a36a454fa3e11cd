//! The reaction synchronizer: the authoritative local tally and the rules
//! that mutate it.

use tracing::debug;

use duel_core::{PlayerKey, ReactionTally, SignalPayload};

/// Owns the local reaction tally and interprets inbound signal payloads.
///
/// The tally moves as a broadcast event log with opportunistic snapshotting:
/// `react:` payloads increment one slot, `sync:` snapshots replace the whole
/// tally (last writer wins, no field-level merge). Emitting a reaction does
/// not touch the tally — the channel delivers the broadcast back to the
/// sender, so every client applies the increment through the same path.
#[derive(Debug, Default)]
pub struct ReactionSynchronizer {
    tally: ReactionTally,
}

impl ReactionSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tally(&self) -> ReactionTally {
        self.tally
    }

    /// Interpret one inbound text payload.
    ///
    /// Returns the updated tally, or `None` when the payload was malformed
    /// and dropped. Malformed input never fails the session.
    pub fn handle_inbound(&mut self, text: &str) -> Option<ReactionTally> {
        match SignalPayload::decode(text) {
            Ok(SignalPayload::React { target }) => {
                self.tally.record(target);
                Some(self.tally)
            }
            Ok(SignalPayload::Sync { tally }) => {
                self.tally = tally;
                Some(self.tally)
            }
            Err(err) => {
                debug!(%err, "dropping malformed signal payload");
                None
            }
        }
    }

    /// Build a reaction payload for `target`. The local tally is updated
    /// only once the broadcast round-trips back through the channel.
    pub fn emit_reaction(target: PlayerKey) -> SignalPayload {
        SignalPayload::React { target }
    }

    /// Wrap the current tally as a snapshot payload.
    pub fn snapshot(&self) -> SignalPayload {
        SignalPayload::Sync { tally: self.tally }
    }

    /// Back to the zero tally (session teardown).
    pub fn reset(&mut self) {
        self.tally = ReactionTally::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn react_events_count_per_target() {
        let mut sync = ReactionSynchronizer::new();
        for _ in 0..3 {
            sync.handle_inbound("react:player1");
        }
        sync.handle_inbound("react:player2");
        assert_eq!(
            sync.tally(),
            ReactionTally {
                player1: 3,
                player2: 1,
            }
        );
    }

    #[test]
    fn sync_replaces_the_whole_tally() {
        let mut sync = ReactionSynchronizer::new();
        sync.handle_inbound("react:player1");
        sync.handle_inbound("react:player1");

        let updated = sync.handle_inbound(r#"sync:{"player1":0,"player2":9}"#);
        assert_eq!(
            updated,
            Some(ReactionTally {
                player1: 0,
                player2: 9,
            })
        );
        assert_eq!(sync.tally().player1, 0);
    }

    #[test]
    fn applying_own_snapshot_is_idempotent() {
        let mut sync = ReactionSynchronizer::new();
        sync.handle_inbound("react:player2");
        let before = sync.tally();

        let snapshot = sync.snapshot().encode();
        sync.handle_inbound(&snapshot);
        assert_eq!(sync.tally(), before);
    }

    #[test]
    fn malformed_payloads_are_dropped_without_effect() {
        let mut sync = ReactionSynchronizer::new();
        sync.handle_inbound("react:player1");
        let before = sync.tally();

        for text in ["foo:bar", "sync:{not json", "react:player9", "", "sync:"] {
            assert_eq!(sync.handle_inbound(text), None);
            assert_eq!(sync.tally(), before);
        }
    }

    #[test]
    fn emit_reaction_does_not_mutate_local_state() {
        let sync = ReactionSynchronizer::new();
        let payload = ReactionSynchronizer::emit_reaction(PlayerKey::Player1);
        assert_eq!(payload.encode(), "react:player1");
        assert!(sync.tally().is_zero());
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut sync = ReactionSynchronizer::new();
        sync.handle_inbound("react:player1");
        sync.reset();
        assert!(sync.tally().is_zero());
    }
}
