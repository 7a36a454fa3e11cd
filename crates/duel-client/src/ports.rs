//! Port traits (interfaces) for the external real-time transports.
//!
//! Adapters implement these traits; the session controller never references
//! a concrete vendor SDK. Event callbacks are invoked synchronously, in the
//! order the underlying transport delivers them — the core performs no
//! queuing or reordering of its own.

use std::sync::Arc;

use async_trait::async_trait;

use duel_common::Result;
use duel_core::ParticipantIdentity;

// ---------------------------------------------------------------------------
// Media channel (audio/video transport abstraction)
// ---------------------------------------------------------------------------

/// Kind of a media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Audio,
    Video,
}

/// Handle to a local capture (camera + microphone), opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTrack {
    pub id: u64,
}

/// A remote participant's track as surfaced by the media channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub owner: ParticipantIdentity,
    pub kind: TrackKind,
}

/// Remote-track lifecycle events from the media channel.
pub trait MediaEvents: Send + Sync {
    fn on_remote_published(&self, track: RemoteTrack);
    fn on_remote_unpublished(&self, identity: &ParticipantIdentity);
}

/// Abstracts one media-channel connection.
#[async_trait]
pub trait MediaSession: Send + Sync {
    /// Join the named channel under `identity`. `token` is forwarded to the
    /// transport when credentials are enabled on the deployment.
    async fn join(
        &self,
        app_id: &str,
        channel: &str,
        token: Option<&str>,
        identity: &ParticipantIdentity,
    ) -> Result<()>;

    /// Leave the channel and release transport resources.
    async fn leave(&self) -> Result<()>;

    /// Create a local audio/video capture ready for publishing.
    async fn create_local_capture(&self) -> Result<LocalTrack>;

    /// Publish a local capture to all other channel members.
    async fn publish(&self, track: &LocalTrack) -> Result<()>;

    /// Register a remote-track event handler.
    fn subscribe_events(&self, events: Arc<dyn MediaEvents>) -> EventSubscription;
}

// ---------------------------------------------------------------------------
// Signal channel (text messaging transport abstraction)
// ---------------------------------------------------------------------------

/// Inbound text payloads from the signal channel.
pub trait SignalEvents: Send + Sync {
    /// A payload delivered to every channel member, the sender included.
    fn on_message(&self, text: &str, sender: &ParticipantIdentity);
}

/// Abstracts one signal-channel login.
#[async_trait]
pub trait SignalSession: Send + Sync {
    async fn login(&self, identity: &ParticipantIdentity) -> Result<()>;

    async fn logout(&self) -> Result<()>;

    /// Join a named channel; membership lasts until `SignalChannel::leave`.
    async fn join_channel(&self, channel: &str) -> Result<Arc<dyn SignalChannel>>;
}

/// A joined signal channel.
#[async_trait]
pub trait SignalChannel: Send + Sync {
    async fn leave(&self) -> Result<()>;

    /// Broadcast a text payload to all channel members, sender included.
    async fn send(&self, text: &str) -> Result<()>;

    /// Register an inbound-payload handler.
    fn subscribe(&self, events: Arc<dyn SignalEvents>) -> EventSubscription;
}

// ---------------------------------------------------------------------------
// Event subscriptions
// ---------------------------------------------------------------------------

/// Cancellation handle for a registered event handler.
///
/// The registration stays active until `cancel` is called or the handle is
/// dropped.
pub struct EventSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl EventSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Cancel the registration now instead of at drop time.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
