//! Static match configuration.

use std::time::Duration;

/// Default delay before a joining player broadcasts its tally snapshot.
///
/// Gives the signal channel time to propagate channel membership. This is a
/// best-effort heuristic, not a delivery barrier.
pub const DEFAULT_SYNC_DELAY: Duration = Duration::from_secs(1);

/// Fixed application and channel configuration for a duel.
///
/// There is exactly one match channel per deployment; neither value is
/// negotiated at runtime.
#[derive(Debug, Clone)]
pub struct MatchConfig {
    /// Application identifier handed to the media transport.
    pub app_id: String,
    /// Channel name shared by the media and signal transports.
    pub channel: String,
    /// Snapshot broadcast delay for joining players.
    pub sync_delay: Duration,
}

impl MatchConfig {
    pub fn new(app_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            channel: channel.into(),
            sync_delay: DEFAULT_SYNC_DELAY,
        }
    }

    pub fn with_sync_delay(mut self, delay: Duration) -> Self {
        self.sync_delay = delay;
        self
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self::new("duelcast-demo", "playerkill")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_the_fixed_match_channel() {
        let config = MatchConfig::default();
        assert_eq!(config.channel, "playerkill");
        assert_eq!(config.sync_delay, DEFAULT_SYNC_DELAY);
    }
}
