use accord_session::AppContext;
use accord_shared::{LocalNetwork, SessionFilter};
use accord_test::{init_logging, pump, TestPlayer};

async fn host(network: &LocalNetwork, player: &str, session: &str, region: &str, max: usize) -> TestPlayer {
    let context = AppContext::new(network.clone(), player).with_region(region);
    let mut host = TestPlayer::with_context(context);
    assert!(host.manager.create_session(session, max).await.ok);
    host
}

#[tokio::test(start_paused = true)]
async fn filters_narrow_the_listing() {
    init_logging();
    let network = LocalNetwork::new();
    let _friday = host(&network, "hana", "Friday night", "eu", 4).await;
    let _duel = host(&network, "dax", "Duel", "eu", 1).await;
    let _tokyo = host(&network, "tomo", "Tokyo friday", "ap", 4).await;

    let seeker = TestPlayer::new(&network, "sam");
    let names = |sessions: Vec<accord_shared::SessionDescriptor>| {
        sessions
            .into_iter()
            .map(|session| session.name)
            .collect::<Vec<_>>()
    };

    let all = seeker.manager.list_sessions(&SessionFilter::any()).await;
    assert_eq!(names(all), vec!["Duel", "Friday night", "Tokyo friday"]);

    let friday = SessionFilter {
        name_contains: Some("FRIDAY".to_string()),
        ..SessionFilter::any()
    };
    assert_eq!(
        names(seeker.manager.list_sessions(&friday).await),
        vec!["Friday night", "Tokyo friday"]
    );

    let europe = SessionFilter {
        region: Some("eu".to_string()),
        ..SessionFilter::any()
    };
    assert_eq!(
        names(seeker.manager.list_sessions(&europe).await),
        vec!["Duel", "Friday night"]
    );

    // the duel's host fills its only seat
    let open = SessionFilter {
        only_with_space: true,
        ..SessionFilter::any()
    };
    assert_eq!(
        names(seeker.manager.list_sessions(&open).await),
        vec!["Friday night", "Tokyo friday"]
    );
}

#[tokio::test(start_paused = true)]
async fn closed_sessions_disappear_from_the_listing() {
    init_logging();
    let network = LocalNetwork::new();
    let mut friday = host(&network, "hana", "Friday night", "eu", 4).await;
    let seeker = TestPlayer::new(&network, "sam");
    assert_eq!(seeker.manager.list_sessions(&SessionFilter::any()).await.len(), 1);

    assert!(friday.manager.leave_session().ok);
    pump(&mut [&mut friday], 1).await;
    assert!(seeker.manager.list_sessions(&SessionFilter::any()).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn listed_player_counts_follow_joins() {
    init_logging();
    let network = LocalNetwork::new();
    let mut friday = host(&network, "hana", "Friday night", "eu", 4).await;
    let mut guest = TestPlayer::new(&network, "gil");
    let sessions = guest.manager.list_sessions(&SessionFilter::any()).await;
    assert_eq!(sessions[0].current_players, 1);
    assert_eq!(sessions[0].region, "eu");

    assert!(guest.manager.join_session(&sessions[0]).await.ok);
    pump(&mut [&mut friday, &mut guest], 2).await;
    let sessions = guest.manager.list_sessions(&SessionFilter::any()).await;
    assert_eq!(sessions[0].current_players, 2);
}
