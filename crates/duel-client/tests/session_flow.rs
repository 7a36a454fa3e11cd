use std::time::Duration;

use tokio::time::sleep;

use duel_client::{
    FailureInjection, LoopbackHub, SessionController, SessionEvent, SessionPhase, TrackKind,
};
use duel_common::MatchConfig;
use duel_core::{PlayerKey, ReactionTally, Role};

fn test_config() -> MatchConfig {
    MatchConfig::default().with_sync_delay(Duration::from_millis(25))
}

fn controller(
    hub: &LoopbackHub,
    role: Role,
) -> (
    SessionController,
    tokio::sync::mpsc::UnboundedReceiver<SessionEvent>,
) {
    let (mut controller, events) =
        SessionController::new(hub.media_session(), hub.signal_session(), test_config());
    controller.select_role(role).unwrap();
    (controller, events)
}

#[tokio::test]
async fn late_viewer_converges_and_reactions_flow_everywhere() {
    let hub = LoopbackHub::new();

    let (mut p1, _p1_events) = controller(&hub, Role::Player1);
    let (mut p2, _p2_events) = controller(&hub, Role::Player2);
    p1.join().await.unwrap();
    p2.join().await.unwrap();

    // The viewer arrives inside the players' snapshot window.
    let (mut viewer, mut viewer_events) = controller(&hub, Role::Viewer);
    viewer.join().await.unwrap();

    sleep(Duration::from_millis(150)).await;

    // Both players broadcast a zero snapshot after their delay.
    let mut sync_events = 0;
    while let Ok(event) = viewer_events.try_recv() {
        if let SessionEvent::Tally(tally) = event {
            assert!(tally.is_zero());
            sync_events += 1;
        }
    }
    assert_eq!(sync_events, 2);
    assert!(viewer.view().tally.is_zero());

    // One reaction round-trips to every member, the sender included.
    viewer.send_reaction(PlayerKey::Player1).await.unwrap();
    let after_first = ReactionTally {
        player1: 1,
        player2: 0,
    };
    assert_eq!(p1.view().tally, after_first);
    assert_eq!(p2.view().tally, after_first);
    assert_eq!(viewer.view().tally, after_first);

    // A second viewer joins after the snapshot window closed: it starts
    // from zero and only converges through events it actually receives
    // (the known snapshot race).
    let (mut viewer2, _viewer2_events) = controller(&hub, Role::Viewer);
    viewer2.join().await.unwrap();
    sleep(Duration::from_millis(50)).await;
    assert!(viewer2.view().tally.is_zero());

    viewer2.send_reaction(PlayerKey::Player2).await.unwrap();
    let converged = ReactionTally {
        player1: 1,
        player2: 1,
    };
    assert_eq!(p1.view().tally, converged);
    assert_eq!(p2.view().tally, converged);
    assert_eq!(viewer.view().tally, converged);
    assert_eq!(
        viewer2.view().tally,
        ReactionTally {
            player1: 0,
            player2: 1,
        }
    );

    p1.leave().await.unwrap();
    p2.leave().await.unwrap();
    viewer.leave().await.unwrap();
    viewer2.leave().await.unwrap();
    assert_eq!(hub.media_member_count(), 0);
    assert_eq!(hub.channel_member_count(), 0);
    assert_eq!(hub.login_count(), 0);
}

#[tokio::test]
async fn leave_from_unselected_is_a_noop() {
    let hub = LoopbackHub::new();
    let (mut controller, _events) =
        SessionController::new(hub.media_session(), hub.signal_session(), test_config());

    controller.leave().await.unwrap();

    assert_eq!(controller.phase(), SessionPhase::Unselected);
    assert_eq!(hub.call_count(), 0);
}

#[tokio::test]
async fn clear_role_backs_out_without_adapter_calls() {
    let hub = LoopbackHub::new();
    let (mut controller, _events) = controller(&hub, Role::Viewer);

    assert_eq!(controller.phase(), SessionPhase::RoleChosen);
    controller.clear_role().unwrap();
    assert_eq!(controller.phase(), SessionPhase::Unselected);
    assert_eq!(controller.role(), None);
    assert_eq!(hub.call_count(), 0);
}

#[tokio::test]
async fn join_requires_a_selected_role() {
    let hub = LoopbackHub::new();
    let (mut controller, _events) =
        SessionController::new(hub.media_session(), hub.signal_session(), test_config());

    assert!(controller.join().await.is_err());
    assert_eq!(controller.phase(), SessionPhase::Unselected);
}

#[tokio::test]
async fn reentrant_join_is_rejected() {
    let hub = LoopbackHub::new();
    let (mut controller, _events) = controller(&hub, Role::Player1);

    controller.join().await.unwrap();
    assert!(controller.join().await.is_err());
    assert_eq!(controller.phase(), SessionPhase::Joined);

    controller.leave().await.unwrap();
}

#[tokio::test]
async fn reactions_require_a_joined_session() {
    let hub = LoopbackHub::new();
    let (controller, _events) = controller(&hub, Role::Viewer);

    assert!(controller.send_reaction(PlayerKey::Player1).await.is_err());
}

#[tokio::test]
async fn failed_join_releases_acquired_adapters_and_reverts() {
    let hub = LoopbackHub::new();
    hub.set_failures(FailureInjection {
        signal_login: true,
        ..Default::default()
    });

    let (mut player, _events) = controller(&hub, Role::Player1);
    assert!(player.join().await.is_err());

    assert_eq!(player.phase(), SessionPhase::RoleChosen);
    assert_eq!(player.role(), Some(Role::Player1));
    assert_eq!(hub.media_member_count(), 0);
    assert_eq!(hub.login_count(), 0);

    // The same controller can retry once the transport recovers.
    hub.set_failures(FailureInjection::default());
    player.join().await.unwrap();
    assert_eq!(player.phase(), SessionPhase::Joined);
    assert_eq!(hub.media_member_count(), 1);

    player.leave().await.unwrap();
}

#[tokio::test]
async fn teardown_failure_still_reaches_unselected() {
    let hub = LoopbackHub::new();
    let (mut player, _events) = controller(&hub, Role::Player1);
    player.join().await.unwrap();

    hub.set_failures(FailureInjection {
        channel_leave: true,
        ..Default::default()
    });
    player.leave().await.unwrap();

    assert_eq!(player.phase(), SessionPhase::Unselected);
    assert_eq!(player.role(), None);
    assert!(player.view().tally.is_zero());
    // The remaining teardown steps still ran.
    assert_eq!(hub.login_count(), 0);
    assert_eq!(hub.media_member_count(), 0);
    assert_eq!(hub.channel_member_count(), 0);
}

#[tokio::test]
async fn remote_track_follows_the_publish_lifecycle() {
    let hub = LoopbackHub::new();
    let (mut p1, _p1_events) = controller(&hub, Role::Player1);
    let (mut p2, _p2_events) = controller(&hub, Role::Player2);

    p1.join().await.unwrap();
    assert!(p1.view().remote_track.is_none());
    assert!(p1.view().local_track.is_some());

    p2.join().await.unwrap();
    let p1_remote = p1.view().remote_track.expect("opposing track");
    assert_eq!(p1_remote.owner.as_str(), "player2");
    assert_eq!(p1_remote.kind, TrackKind::Video);
    let p2_remote = p2.view().remote_track.expect("opposing track");
    assert_eq!(p2_remote.owner.as_str(), "player1");

    let (mut viewer, _viewer_events) = controller(&hub, Role::Viewer);
    viewer.join().await.unwrap();
    assert!(viewer.view().local_track.is_none());
    assert!(viewer.view().remote_track.is_some());

    p2.leave().await.unwrap();
    assert!(p1.view().remote_track.is_none());

    p1.leave().await.unwrap();
    viewer.leave().await.unwrap();
}

#[tokio::test]
async fn dropping_a_live_controller_releases_memberships() {
    let hub = LoopbackHub::new();
    let (mut player, _events) = controller(&hub, Role::Player1);
    player.join().await.unwrap();
    assert_eq!(hub.media_member_count(), 1);

    drop(player);
    sleep(Duration::from_millis(20)).await;

    assert_eq!(hub.media_member_count(), 0);
    assert_eq!(hub.channel_member_count(), 0);
    assert_eq!(hub.login_count(), 0);
}
