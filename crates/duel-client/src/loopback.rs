//! In-memory transports for tests and demos.
//!
//! [`LoopbackHub`] stands in for both external channels: signal sends are
//! delivered synchronously, in order, to every channel member including the
//! sender; media publishes fan remote-track events out to every other
//! member, and a fresh subscriber is replayed the tracks already published.
//! Failure injection covers each join and teardown step so error paths can
//! be exercised without a real transport.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use duel_common::{Error, Result};
use duel_core::ParticipantIdentity;

use crate::ports::{
    EventSubscription, LocalTrack, MediaEvents, MediaSession, RemoteTrack, SignalChannel,
    SignalEvents, SignalSession, TrackKind,
};

/// Which loopback operations should fail, for error-path tests.
#[derive(Debug, Default, Clone)]
pub struct FailureInjection {
    pub media_join: bool,
    pub media_capture: bool,
    pub media_leave: bool,
    pub signal_login: bool,
    pub channel_join: bool,
    pub channel_leave: bool,
    pub signal_logout: bool,
}

struct MediaSubscriber {
    id: u64,
    owner: ParticipantIdentity,
    events: Arc<dyn MediaEvents>,
}

struct SignalSubscriber {
    id: u64,
    events: Arc<dyn SignalEvents>,
}

struct PublishedTrack {
    owner: ParticipantIdentity,
}

#[derive(Default)]
struct HubState {
    failures: FailureInjection,
    calls: u64,
    next_track_id: u64,
    next_sub_id: u64,
    media_members: Vec<ParticipantIdentity>,
    published: Vec<PublishedTrack>,
    media_subs: Vec<MediaSubscriber>,
    logins: HashSet<ParticipantIdentity>,
    channel_members: Vec<ParticipantIdentity>,
    signal_subs: Vec<SignalSubscriber>,
}

impl HubState {
    fn count_call(&mut self) {
        self.calls += 1;
    }
}

/// One in-memory match channel serving any number of loopback endpoints.
pub struct LoopbackHub {
    state: Arc<Mutex<HubState>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HubState::default())),
        }
    }

    /// A fresh media endpoint for one participant.
    pub fn media_session(&self) -> Arc<dyn MediaSession> {
        Arc::new(LoopbackMediaSession {
            state: self.state.clone(),
            identity: Mutex::new(None),
        })
    }

    /// A fresh signal endpoint for one participant.
    pub fn signal_session(&self) -> Arc<dyn SignalSession> {
        Arc::new(LoopbackSignalSession {
            state: self.state.clone(),
            identity: Mutex::new(None),
        })
    }

    pub fn set_failures(&self, failures: FailureInjection) {
        self.lock().failures = failures;
    }

    /// Total port-trait calls observed, across every endpoint.
    pub fn call_count(&self) -> u64 {
        self.lock().calls
    }

    pub fn media_member_count(&self) -> usize {
        self.lock().media_members.len()
    }

    pub fn channel_member_count(&self) -> usize {
        self.lock().channel_members.len()
    }

    pub fn login_count(&self) -> usize {
        self.lock().logins.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HubState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for LoopbackHub {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_hub(state: &Arc<Mutex<HubState>>) -> std::sync::MutexGuard<'_, HubState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Media endpoint
// ---------------------------------------------------------------------------

pub struct LoopbackMediaSession {
    state: Arc<Mutex<HubState>>,
    identity: Mutex<Option<ParticipantIdentity>>,
}

impl LoopbackMediaSession {
    fn local_identity(&self) -> Option<ParticipantIdentity> {
        self.identity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl MediaSession for LoopbackMediaSession {
    async fn join(
        &self,
        _app_id: &str,
        _channel: &str,
        _token: Option<&str>,
        identity: &ParticipantIdentity,
    ) -> Result<()> {
        {
            let mut state = lock_hub(&self.state);
            state.count_call();
            if state.failures.media_join {
                return Err(Error::media("injected media join failure"));
            }
            state.media_members.push(identity.clone());
        }
        *self
            .identity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(identity.clone());
        Ok(())
    }

    async fn leave(&self) -> Result<()> {
        let identity = self.local_identity();
        let subscribers = {
            let mut state = lock_hub(&self.state);
            state.count_call();
            if state.failures.media_leave {
                return Err(Error::media("injected media leave failure"));
            }
            let Some(identity) = identity.as_ref() else {
                return Ok(());
            };
            state.media_members.retain(|member| member != identity);
            let had_published = state.published.iter().any(|t| t.owner == *identity);
            state.published.retain(|t| t.owner != *identity);
            if had_published {
                state
                    .media_subs
                    .iter()
                    .filter(|sub| sub.owner != *identity)
                    .map(|sub| sub.events.clone())
                    .collect()
            } else {
                Vec::new()
            }
        };
        if let Some(identity) = identity {
            for events in subscribers {
                events.on_remote_unpublished(&identity);
            }
        }
        Ok(())
    }

    async fn create_local_capture(&self) -> Result<LocalTrack> {
        let mut state = lock_hub(&self.state);
        state.count_call();
        if state.failures.media_capture {
            return Err(Error::media("injected capture failure"));
        }
        state.next_track_id += 1;
        Ok(LocalTrack {
            id: state.next_track_id,
        })
    }

    async fn publish(&self, _track: &LocalTrack) -> Result<()> {
        let Some(identity) = self.local_identity() else {
            return Err(Error::media("publish before join"));
        };
        let subscribers: Vec<Arc<dyn MediaEvents>> = {
            let mut state = lock_hub(&self.state);
            state.count_call();
            state.published.push(PublishedTrack {
                owner: identity.clone(),
            });
            state
                .media_subs
                .iter()
                .filter(|sub| sub.owner != identity)
                .map(|sub| sub.events.clone())
                .collect()
        };
        for events in subscribers {
            deliver_published(events.as_ref(), &identity);
        }
        Ok(())
    }

    fn subscribe_events(&self, events: Arc<dyn MediaEvents>) -> EventSubscription {
        let Some(identity) = self.local_identity() else {
            return EventSubscription::noop();
        };
        let (id, existing) = {
            let mut state = lock_hub(&self.state);
            state.count_call();
            state.next_sub_id += 1;
            let id = state.next_sub_id;
            state.media_subs.push(MediaSubscriber {
                id,
                owner: identity.clone(),
                events: events.clone(),
            });
            let existing: Vec<ParticipantIdentity> = state
                .published
                .iter()
                .filter(|t| t.owner != identity)
                .map(|t| t.owner.clone())
                .collect();
            (id, existing)
        };
        // Replay tracks that were already live when this subscriber arrived,
        // matching transports that emit publish events to late joiners.
        for owner in existing {
            deliver_published(events.as_ref(), &owner);
        }

        let state = self.state.clone();
        EventSubscription::new(move || {
            lock_hub(&state).media_subs.retain(|sub| sub.id != id);
        })
    }
}

fn deliver_published(events: &dyn MediaEvents, owner: &ParticipantIdentity) {
    for kind in [TrackKind::Audio, TrackKind::Video] {
        events.on_remote_published(RemoteTrack {
            owner: owner.clone(),
            kind,
        });
    }
}

// ---------------------------------------------------------------------------
// Signal endpoint
// ---------------------------------------------------------------------------

pub struct LoopbackSignalSession {
    state: Arc<Mutex<HubState>>,
    identity: Mutex<Option<ParticipantIdentity>>,
}

impl LoopbackSignalSession {
    fn local_identity(&self) -> Option<ParticipantIdentity> {
        self.identity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl SignalSession for LoopbackSignalSession {
    async fn login(&self, identity: &ParticipantIdentity) -> Result<()> {
        {
            let mut state = lock_hub(&self.state);
            state.count_call();
            if state.failures.signal_login {
                return Err(Error::signal("injected login failure"));
            }
            state.logins.insert(identity.clone());
        }
        *self
            .identity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(identity.clone());
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let identity = self.local_identity();
        let mut state = lock_hub(&self.state);
        state.count_call();
        if state.failures.signal_logout {
            return Err(Error::signal("injected logout failure"));
        }
        if let Some(identity) = identity {
            state.logins.remove(&identity);
            // Logging out also ends any channel membership, like a real
            // messaging transport.
            state.channel_members.retain(|member| member != &identity);
        }
        Ok(())
    }

    async fn join_channel(&self, _channel: &str) -> Result<Arc<dyn SignalChannel>> {
        let Some(identity) = self.local_identity() else {
            return Err(Error::signal("channel join before login"));
        };
        let mut state = lock_hub(&self.state);
        state.count_call();
        if state.failures.channel_join {
            return Err(Error::signal("injected channel join failure"));
        }
        state.channel_members.push(identity.clone());
        Ok(Arc::new(LoopbackSignalChannel {
            state: self.state.clone(),
            identity,
        }))
    }
}

pub struct LoopbackSignalChannel {
    state: Arc<Mutex<HubState>>,
    identity: ParticipantIdentity,
}

#[async_trait]
impl SignalChannel for LoopbackSignalChannel {
    async fn leave(&self) -> Result<()> {
        let mut state = lock_hub(&self.state);
        state.count_call();
        if state.failures.channel_leave {
            return Err(Error::signal("injected channel leave failure"));
        }
        if let Some(pos) = state
            .channel_members
            .iter()
            .position(|member| member == &self.identity)
        {
            state.channel_members.remove(pos);
        }
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<()> {
        let subscribers: Vec<Arc<dyn SignalEvents>> = {
            let mut state = lock_hub(&self.state);
            state.count_call();
            if !state.channel_members.contains(&self.identity) {
                return Err(Error::signal("send on a left channel"));
            }
            state.signal_subs.iter().map(|sub| sub.events.clone()).collect()
        };
        // Broadcast to every member in subscription order, sender included.
        for events in subscribers {
            events.on_message(text, &self.identity);
        }
        Ok(())
    }

    fn subscribe(&self, events: Arc<dyn SignalEvents>) -> EventSubscription {
        let id = {
            let mut state = lock_hub(&self.state);
            state.count_call();
            state.next_sub_id += 1;
            let id = state.next_sub_id;
            state.signal_subs.push(SignalSubscriber { id, events });
            id
        };
        let state = self.state.clone();
        EventSubscription::new(move || {
            lock_hub(&state).signal_subs.retain(|sub| sub.id != id);
        })
    }
}
