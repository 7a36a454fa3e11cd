//! Session lifecycle: role selection, join/leave orchestration, and the
//! state machine that keeps both transports and the reaction tally
//! consistent.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{info, warn};

use duel_common::{Error, MatchConfig, Result};
use duel_core::{resolve_identity, ParticipantIdentity, PlayerKey, ReactionTally, Role};

use crate::ports::{
    EventSubscription, LocalTrack, MediaEvents, MediaSession, RemoteTrack, SignalChannel,
    SignalEvents, SignalSession, TrackKind,
};
use crate::reactions::ReactionSynchronizer;

/// Session state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No role, no adapters active. Initial and terminal phase.
    Unselected,
    /// Role set; adapters not yet created.
    RoleChosen,
    /// Transient: adapters being created and joined.
    Joining,
    /// Adapters active; tally updates flow in.
    Joined,
    /// Transient: adapters being released.
    Leaving,
}

/// Read-only snapshot of session state for the UI layer.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub phase: SessionPhase,
    pub role: Option<Role>,
    pub joined: bool,
    pub tally: ReactionTally,
    pub local_track: Option<LocalTrack>,
    pub remote_track: Option<RemoteTrack>,
}

/// Notifications pushed to the UI layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The reaction tally changed.
    Tally(ReactionTally),
    /// The opposing player's video track arrived or went away.
    RemoteTrack(Option<RemoteTrack>),
}

/// State shared between the controller and transport callbacks.
struct SharedState {
    reactions: ReactionSynchronizer,
    remote_track: Option<RemoteTrack>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl SharedState {
    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn reset(&mut self) {
        self.reactions.reset();
        self.remote_track = None;
    }
}

/// Feeds remote-track lifecycle events into the shared session state.
struct MediaEventsBridge {
    shared: Arc<Mutex<SharedState>>,
}

impl MediaEvents for MediaEventsBridge {
    fn on_remote_published(&self, track: RemoteTrack) {
        // Only the video track occupies the opposing slot; audio plays out
        // through the transport directly.
        if track.kind != TrackKind::Video {
            return;
        }
        if let Ok(mut shared) = self.shared.lock() {
            shared.remote_track = Some(track.clone());
            shared.emit(SessionEvent::RemoteTrack(Some(track)));
        }
    }

    fn on_remote_unpublished(&self, identity: &ParticipantIdentity) {
        if let Ok(mut shared) = self.shared.lock() {
            let owned_by_peer = shared
                .remote_track
                .as_ref()
                .is_some_and(|track| track.owner == *identity);
            if owned_by_peer {
                shared.remote_track = None;
                shared.emit(SessionEvent::RemoteTrack(None));
            }
        }
    }
}

/// Feeds inbound signal payloads into the reaction synchronizer.
struct SignalEventsBridge {
    shared: Arc<Mutex<SharedState>>,
}

impl SignalEvents for SignalEventsBridge {
    fn on_message(&self, text: &str, _sender: &ParticipantIdentity) {
        if let Ok(mut shared) = self.shared.lock() {
            if let Some(tally) = shared.reactions.handle_inbound(text) {
                shared.emit(SessionEvent::Tally(tally));
            }
        }
    }
}

/// Orchestrates the media and signal adapters for one participant.
///
/// Owns the session state machine; the UI reads snapshots via [`view`] and
/// receives push updates on the event channel returned by [`new`].
///
/// [`new`]: SessionController::new
/// [`view`]: SessionController::view
pub struct SessionController {
    media: Arc<dyn MediaSession>,
    signal: Arc<dyn SignalSession>,
    config: MatchConfig,

    phase: SessionPhase,
    role: Option<Role>,
    identity: Option<ParticipantIdentity>,
    local_track: Option<LocalTrack>,
    channel: Option<Arc<dyn SignalChannel>>,
    subscriptions: Vec<EventSubscription>,
    media_active: bool,
    signal_active: bool,

    shared: Arc<Mutex<SharedState>>,
}

impl SessionController {
    /// Create a controller over the given transports.
    ///
    /// Returns the controller and the UI event stream.
    pub fn new(
        media: Arc<dyn MediaSession>,
        signal: Arc<dyn SignalSession>,
        config: MatchConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Mutex::new(SharedState {
            reactions: ReactionSynchronizer::new(),
            remote_track: None,
            events: events_tx,
        }));
        let controller = Self {
            media,
            signal,
            config,
            phase: SessionPhase::Unselected,
            role: None,
            identity: None,
            local_track: None,
            channel: None,
            subscriptions: Vec::new(),
            media_active: false,
            signal_active: false,
            shared,
        };
        (controller, events_rx)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn identity(&self) -> Option<&ParticipantIdentity> {
        self.identity.as_ref()
    }

    /// Read-only snapshot for the UI layer.
    pub fn view(&self) -> SessionView {
        let (tally, remote_track) = match self.shared.lock() {
            Ok(shared) => (shared.reactions.tally(), shared.remote_track.clone()),
            Err(_) => (ReactionTally::new(), None),
        };
        SessionView {
            phase: self.phase,
            role: self.role,
            joined: self.phase == SessionPhase::Joined,
            tally,
            local_track: self.local_track.clone(),
            remote_track,
        }
    }

    /// Choose (or replace) the role for the next join.
    pub fn select_role(&mut self, role: Role) -> Result<()> {
        match self.phase {
            SessionPhase::Unselected | SessionPhase::RoleChosen => {
                self.role = Some(role);
                self.phase = SessionPhase::RoleChosen;
                Ok(())
            }
            _ => Err(Error::session("role is fixed while a session is active")),
        }
    }

    /// "Back": drop the chosen role without having joined.
    pub fn clear_role(&mut self) -> Result<()> {
        match self.phase {
            SessionPhase::Unselected => Ok(()),
            SessionPhase::RoleChosen => {
                self.role = None;
                self.phase = SessionPhase::Unselected;
                Ok(())
            }
            _ => Err(Error::session("cannot clear role while a session is active")),
        }
    }

    /// Join the match: media first, then signal, in a fixed order.
    ///
    /// On any step's failure every adapter acquired during the attempt is
    /// released (best-effort) and the controller returns to `RoleChosen`
    /// with the error surfaced.
    pub async fn join(&mut self) -> Result<()> {
        if self.phase != SessionPhase::RoleChosen {
            return Err(Error::session(format!(
                "join is only valid after role selection (phase {:?})",
                self.phase
            )));
        }
        let Some(role) = self.role else {
            return Err(Error::session("no role selected"));
        };

        self.phase = SessionPhase::Joining;
        match self.try_join(role).await {
            Ok(()) => {
                self.phase = SessionPhase::Joined;
                info!(%role, "session joined");
                Ok(())
            }
            Err(err) => {
                warn!(%err, "join failed, releasing partially acquired adapters");
                self.release_adapters().await;
                if let Ok(mut shared) = self.shared.lock() {
                    shared.reset();
                }
                self.identity = None;
                self.local_track = None;
                self.phase = SessionPhase::RoleChosen;
                Err(err)
            }
        }
    }

    async fn try_join(&mut self, role: Role) -> Result<()> {
        let identity = resolve_identity(role);
        info!(%identity, %role, channel = %self.config.channel, "joining match channel");

        self.media
            .join(&self.config.app_id, &self.config.channel, None, &identity)
            .await?;
        self.media_active = true;

        if role.is_player() {
            let track = self.media.create_local_capture().await?;
            self.media.publish(&track).await?;
            self.local_track = Some(track);
        }

        let media_sub = self.media.subscribe_events(Arc::new(MediaEventsBridge {
            shared: self.shared.clone(),
        }));
        self.subscriptions.push(media_sub);

        self.signal.login(&identity).await?;
        self.signal_active = true;

        let channel = self.signal.join_channel(&self.config.channel).await?;
        let channel_sub = channel.subscribe(Arc::new(SignalEventsBridge {
            shared: self.shared.clone(),
        }));
        self.subscriptions.push(channel_sub);
        self.channel = Some(channel.clone());

        if role.is_player() {
            self.schedule_snapshot(channel);
        }

        self.identity = Some(identity);
        Ok(())
    }

    /// After a short delay, broadcast the current tally so late joiners
    /// converge. Best-effort: a lost snapshot is repaired by the next one,
    /// or by the next reaction event.
    fn schedule_snapshot(&self, channel: Arc<dyn SignalChannel>) {
        let shared = self.shared.clone();
        let delay = self.config.sync_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let payload = match shared.lock() {
                Ok(shared) => shared.reactions.snapshot(),
                Err(_) => return,
            };
            if let Err(err) = channel.send(&payload.encode()).await {
                warn!(%err, "tally snapshot broadcast failed");
            }
        });
    }

    /// Broadcast a reaction for `target`.
    ///
    /// The local tally is not touched here; it updates when the channel
    /// delivers the broadcast back, through the same path as every other
    /// member.
    pub async fn send_reaction(&self, target: PlayerKey) -> Result<()> {
        if self.phase != SessionPhase::Joined {
            return Err(Error::session("reactions require a joined session"));
        }
        let Some(channel) = self.channel.as_ref() else {
            return Err(Error::internal("joined session without a signal channel"));
        };
        let payload = ReactionSynchronizer::emit_reaction(target);
        channel.send(&payload.encode()).await
    }

    /// Leave the match and release both adapters.
    ///
    /// A no-op from `Unselected`; from `RoleChosen` it only clears the
    /// role. Teardown is best-effort: every step runs even if an earlier
    /// one fails, and the controller always ends in `Unselected`.
    pub async fn leave(&mut self) -> Result<()> {
        match self.phase {
            SessionPhase::Unselected => return Ok(()),
            SessionPhase::RoleChosen => {
                self.role = None;
                self.phase = SessionPhase::Unselected;
                return Ok(());
            }
            SessionPhase::Joining | SessionPhase::Leaving => {
                return Err(Error::session("session transition already in flight"));
            }
            SessionPhase::Joined => {}
        }

        self.phase = SessionPhase::Leaving;
        info!("leaving match channel");
        self.release_adapters().await;

        self.role = None;
        self.identity = None;
        self.local_track = None;
        if let Ok(mut shared) = self.shared.lock() {
            shared.reset();
        }
        self.phase = SessionPhase::Unselected;
        Ok(())
    }

    /// Release adapters in reverse acquisition order: signal channel,
    /// signal login, media. Failures are logged and swallowed so a failing
    /// step never leaks the resources behind it.
    async fn release_adapters(&mut self) {
        self.subscriptions.clear();

        if let Some(channel) = self.channel.take() {
            if let Err(err) = channel.leave().await {
                warn!(%err, "signal channel leave failed");
            }
        }
        if self.signal_active {
            self.signal_active = false;
            if let Err(err) = self.signal.logout().await {
                warn!(%err, "signal logout failed");
            }
        }
        if self.media_active {
            self.media_active = false;
            if let Err(err) = self.media.leave().await {
                warn!(%err, "media leave failed");
            }
        }
    }
}

impl Drop for SessionController {
    /// Scoped release: a controller dropped with a live session spawns a
    /// detached best-effort teardown so no channel membership dangles when
    /// the host context goes away.
    fn drop(&mut self) {
        if !matches!(self.phase, SessionPhase::Joining | SessionPhase::Joined) {
            return;
        }
        self.subscriptions.clear();

        let channel = self.channel.take();
        let signal = self.signal.clone();
        let media = self.media.clone();
        let signal_active = self.signal_active;
        let media_active = self.media_active;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Some(channel) = channel {
                        if let Err(err) = channel.leave().await {
                            warn!(%err, "signal channel leave failed");
                        }
                    }
                    if signal_active {
                        if let Err(err) = signal.logout().await {
                            warn!(%err, "signal logout failed");
                        }
                    }
                    if media_active {
                        if let Err(err) = media.leave().await {
                            warn!(%err, "media leave failed");
                        }
                    }
                });
            }
            Err(_) => {
                warn!("session dropped outside a runtime; channel membership may leak");
            }
        }
    }
}
