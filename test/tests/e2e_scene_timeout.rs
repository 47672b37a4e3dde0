use std::time::Duration;

use accord_client::ClientEvent;
use accord_session::AppContext;
use accord_shared::{LocalNetwork, SceneId, SessionFilter};
use accord_test::{assert_event, init_logging, pump, TestPlayer};

#[tokio::test(start_paused = true)]
async fn slow_loaders_are_reported_as_stragglers() {
    init_logging();
    let network = LocalNetwork::new();
    let mut context = AppContext::new(network.clone(), "hana");
    context.server.scene_load_timeout = Duration::from_secs(1);
    let mut host = TestPlayer::with_context(context);
    assert!(host.manager.create_session("Friday", 4).await.ok);

    let mut guest = TestPlayer::new(&network, "gil");
    let sessions = guest.manager.list_sessions(&SessionFilter::any()).await;
    assert!(guest.manager.join_session(&sessions[0]).await.ok);
    pump(&mut [&mut host, &mut guest], 4).await;
    let guest_id = guest.id();

    // the guest stops answering, so it never reports its load
    let cellar = SceneId::new("cellar");
    let outcome = host
        .manager
        .request_scene_transition(cellar.clone())
        .await
        .unwrap();
    assert_eq!(outcome.scene, cellar);
    assert_eq!(outcome.stragglers, vec![guest_id]);
    assert!(outcome.has_stragglers());

    assert!(host.with_server(|server| server.gate().is_open()));
    let spawned = host.with_server(|server| server.spawn("crate", None, Vec::new()));
    assert!(spawned.is_ok());

    pump(&mut [&mut host], 2).await;
    assert_eq!(host.client().current_scene(), Some(&cellar));
    assert_event!(
        host.events,
        ClientEvent::SceneReady(outcome) if outcome.stragglers == vec![guest_id]
    );
}

#[tokio::test(start_paused = true)]
async fn transitions_complete_early_when_everyone_loads() {
    init_logging();
    let network = LocalNetwork::new();
    let mut host = TestPlayer::new(&network, "hana");
    assert!(host.manager.create_session("Friday", 4).await.ok);

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        host.manager.request_scene_transition(SceneId::new("hall")),
    )
    .await
    .expect("resolved before the load timeout")
    .unwrap();
    assert!(outcome.stragglers.is_empty());
    assert_eq!(host.scenes.requested(), vec![SceneId::new("hall")]);
}

#[tokio::test(start_paused = true)]
async fn each_transition_waits_for_its_own_scene() {
    init_logging();
    let network = LocalNetwork::new();
    let mut host = TestPlayer::new(&network, "hana");
    assert!(host.manager.create_session("Friday", 4).await.ok);
    let mut guest = TestPlayer::new(&network, "gil");
    let sessions = guest.manager.list_sessions(&SessionFilter::any()).await;
    assert!(guest.manager.join_session(&sessions[0]).await.ok);
    pump(&mut [&mut host, &mut guest], 4).await;

    let forest = SceneId::new("forest");
    let (outcome, _) = tokio::join!(
        host.manager.request_scene_transition(forest.clone()),
        async {
            pump(&mut [&mut guest], 10).await;
        }
    );
    let outcome = outcome.unwrap();
    assert_eq!(outcome.scene, forest);
    assert!(outcome.stragglers.is_empty());

    // the second transition must not resolve with the first one's outcome
    guest.scenes.hold(true);
    let cave = SceneId::new("cave");
    {
        let transition = host.manager.request_scene_transition(cave.clone());
        tokio::pin!(transition);
        tokio::select! {
            outcome = &mut transition => panic!("resolved while the guest was loading: {:?}", outcome),
            _ = async {
                pump(&mut [&mut guest], 20).await;
            } => {}
        }
        assert_eq!(guest.scenes.pending(), 1);
        assert_eq!(guest.client().current_scene(), Some(&forest));
        assert_eq!(guest.client().loading_scene(), Some(&cave));

        assert_eq!(guest.scenes.finish_all(), 1);
        let (outcome, _) = tokio::join!(&mut transition, async {
            pump(&mut [&mut guest], 10).await;
        });
        let outcome = outcome.unwrap();
        assert_eq!(outcome.scene, cave);
        assert!(outcome.stragglers.is_empty());
    }
    assert!(host.with_server(|server| server.gate().is_open()));
    assert_eq!(host.with_server(|server| server.gate().scene().cloned()), Some(cave));
}
