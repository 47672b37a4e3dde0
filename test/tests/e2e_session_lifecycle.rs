use accord_client::ClientEvent;
use accord_server::AccordServerError;
use accord_session::{SessionError, SessionState};
use accord_shared::{
    ConnectionError, FieldId, FieldValue, LocalNetwork, SceneId, SessionFilter, ValidationError,
};
use accord_test::{
    assert_event, assert_no_event, assert_single_authority, init_logging, pump, pump_until, TestPlayer,
};

async fn hosted_pair(network: &LocalNetwork) -> (TestPlayer, TestPlayer) {
    let mut host = TestPlayer::new(network, "hana");
    let result = host.manager.create_session("Friday", 4).await;
    assert!(result.ok, "{:?}", result.reason);

    let mut guest = TestPlayer::new(network, "gil");
    let sessions = guest.manager.list_sessions(&SessionFilter::any()).await;
    assert_eq!(sessions.len(), 1);
    let result = guest.manager.join_session(&sessions[0]).await;
    assert!(result.ok, "{:?}", result.reason);

    pump(&mut [&mut host, &mut guest], 4).await;
    (host, guest)
}

#[tokio::test(start_paused = true)]
async fn create_join_ready_start_and_spawn_after_scene_load() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, mut guest) = hosted_pair(&network).await;

    assert_eq!(host.manager.state(), SessionState::Hosting);
    assert_eq!(guest.manager.state(), SessionState::Connected);
    assert_eq!(host.client().registry().player_count(), 2);
    assert_eq!(guest.client().registry().player_count(), 2);

    // nobody is ready yet
    assert!(!host.manager.start_match());

    guest.scenes.hold(true);
    assert!(host.manager.toggle_ready().unwrap());
    assert!(guest.manager.toggle_ready().unwrap());
    pump(&mut [&mut host, &mut guest], 4).await;
    assert!(guest.client().registry().all_ready());
    assert!(host.with_server(|server| server.registry().all_ready()));

    assert!(host.manager.start_match());
    pump(&mut [&mut host, &mut guest], 4).await;
    let arena = SceneId::new("match");
    assert_eq!(guest.scenes.requested(), vec![arena.clone()]);
    assert_eq!(guest.scenes.pending(), 1);

    // the guest is still loading, so the world stays closed
    let refused = host.with_server(|server| server.spawn("lever", None, Vec::new()));
    assert!(matches!(
        refused,
        Err(AccordServerError::Validation(ValidationError::SceneNotReady { .. }))
    ));
    let lever = host
        .with_server(|server| {
            server.queue_spawn("lever", None, vec![(FieldId(0), FieldValue::Angle(0.0))])
        })
        .unwrap();
    pump(&mut [&mut host, &mut guest], 2).await;
    assert!(guest.client().world().get(&lever).is_none());

    assert_eq!(guest.scenes.finish_all(), 1);
    let arrived = pump_until(&mut [&mut host, &mut guest], 20, |players| {
        players[1].client().world().get(&lever).is_some()
    })
    .await;
    assert!(arrived);
    assert_eq!(guest.client().current_scene(), Some(&arena));
    assert_eq!(host.client().current_scene(), Some(&arena));

    let events = guest.take_events();
    let ready_at = events
        .iter()
        .position(|event| matches!(event, ClientEvent::SceneReady(_)))
        .expect("scene ready");
    let spawned_at = events
        .iter()
        .position(|event| matches!(event, ClientEvent::EntitySpawned { entity, .. } if *entity == lever))
        .expect("lever spawned");
    assert!(ready_at < spawned_at);
}

#[tokio::test(start_paused = true)]
async fn exactly_one_participant_is_the_authority() {
    init_logging();
    let network = LocalNetwork::new();
    let (host, guest) = hosted_pair(&network).await;

    assert!(host.manager.is_host());
    assert!(!guest.manager.is_host());
    assert!(host.client().is_host());
    assert!(!guest.client().is_host());
    assert!(guest.manager.server().is_none());
    assert_single_authority!(host, guest);
}

#[tokio::test(start_paused = true)]
async fn invalid_transitions_are_rejected_with_a_reason() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, mut guest) = hosted_pair(&network).await;

    let result = host.manager.create_session("again", 4).await;
    assert!(!result.ok);
    assert!(result.reason.unwrap().contains("hosting"));

    let descriptor = guest.manager.list_sessions(&SessionFilter::any()).await[0].clone();
    let result = guest.manager.join_session(&descriptor).await;
    assert!(!result.ok);

    assert!(!guest.manager.start_match());
    assert!(matches!(
        guest.manager.try_start_match(),
        Err(SessionError::NotHost { .. })
    ));

    let mut lonely = TestPlayer::new(&network, "lou");
    assert!(!lonely.manager.leave_session().ok);
    assert!(matches!(
        lonely.manager.toggle_ready(),
        Err(SessionError::NotConnected)
    ));
}

#[tokio::test(start_paused = true)]
async fn host_leaving_closes_the_session_for_everyone() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, mut guest) = hosted_pair(&network).await;

    assert!(host.manager.leave_session().ok);
    assert_eq!(host.manager.state(), SessionState::Disconnected);
    assert!(network.directory().is_empty());

    pump(&mut [&mut guest], 2).await;
    assert_eq!(guest.manager.state(), SessionState::Disconnected);
    assert!(guest.manager.client().is_none());
    assert_event!(
        guest.events,
        ClientEvent::Disconnected(ConnectionError::Closed { .. })
    );
}

#[tokio::test(start_paused = true)]
async fn guest_leaving_unregisters_only_the_guest() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, mut guest) = hosted_pair(&network).await;

    assert!(guest.manager.leave_session().ok);
    pump(&mut [&mut host], 4).await;
    assert_eq!(host.manager.state(), SessionState::Hosting);
    assert_no_event!(host.events, ClientEvent::Disconnected(_));
    assert_eq!(host.client().registry().player_count(), 1);
    assert_eq!(network.directory().len(), 1);

    // and the guest may join again
    let sessions = guest.manager.list_sessions(&SessionFilter::any()).await;
    assert!(guest.manager.join_session(&sessions[0]).await.ok);
    pump(&mut [&mut host, &mut guest], 4).await;
    assert_eq!(host.client().registry().player_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_create_releases_everything() {
    init_logging();
    let network = LocalNetwork::new();
    let mut host = TestPlayer::new(&network, "hana");

    tokio::select! {
        biased;
        _ = host.manager.create_session("Friday", 4) => panic!("create finished without the loop running"),
        _ = std::future::ready(()) => {}
    }

    assert_eq!(host.manager.state(), SessionState::Disconnected);
    assert!(host.manager.server().is_none());
    assert!(network.directory().is_empty());

    // nothing is left behind that would stop a second attempt
    assert!(host.manager.create_session("Friday", 4).await.ok);
    assert_eq!(network.directory().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn joining_an_unknown_session_fails_with_a_reason() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, _guest) = hosted_pair(&network).await;
    let descriptor = host.with_server(|server| server.descriptor());
    assert!(host.manager.leave_session().ok);

    let mut late = TestPlayer::new(&network, "lee");
    let result = late.manager.join_session(&descriptor).await;
    assert!(!result.ok);
    assert_eq!(late.manager.state(), SessionState::Disconnected);
}
