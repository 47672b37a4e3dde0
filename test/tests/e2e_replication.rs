use accord_client::ClientEvent;
use accord_shared::{
    puzzle::{
        elements_from_str, ElementId, PuzzleEvent, PuzzlePhase, SequencePuzzle,
        SequencePuzzleConfig,
    },
    Epoch, FieldId, FieldValue, LinkConditionerConfig, LocalNetwork, SessionFilter,
    ValidationError, WorldError,
};
use accord_test::{assert_event, init_logging, pump, pump_until, TestPlayer};

async fn session(network: &LocalNetwork, guests: &[&str]) -> (TestPlayer, Vec<TestPlayer>) {
    let mut host = TestPlayer::new(network, "hana");
    assert!(host.manager.create_session("Friday", 8).await.ok);
    let mut joined = Vec::new();
    for name in guests {
        let mut guest = TestPlayer::new(network, name);
        let sessions = guest.manager.list_sessions(&SessionFilter::any()).await;
        assert!(guest.manager.join_session(&sessions[0]).await.ok);
        joined.push(guest);
    }
    (host, joined)
}

fn spawned(events: &[ClientEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ClientEvent::EntitySpawned { kind, .. } => Some(kind.clone()),
            ClientEvent::PuzzleSynced { .. } => Some("puzzle".to_string()),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn notifies_from_one_tick_arrive_in_the_same_order_everywhere() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, mut guests) = session(&network, &["gil", "ivy"]).await;
    let (mut gil, mut ivy) = (guests.remove(0), guests.remove(0));
    pump(&mut [&mut host, &mut gil, &mut ivy], 4).await;
    for player in [&mut host, &mut gil, &mut ivy] {
        player.take_events();
    }

    host.with_server(|server| {
        for kind in ["door", "lever", "key"] {
            server.spawn(kind, None, Vec::new()).unwrap();
        }
        server.host_puzzle(Box::new(SequencePuzzle::new(
            SequencePuzzleConfig::fixed(elements_from_str("DATOS"), 40),
            0,
        )));
        server.spawn("bell", None, Vec::new()).unwrap();
    });
    pump(&mut [&mut host, &mut gil, &mut ivy], 4).await;

    let expected = vec!["door", "lever", "key", "puzzle", "bell"];
    assert_eq!(spawned(&host.take_events()), expected);
    assert_eq!(spawned(&gil.take_events()), expected);
    assert_eq!(spawned(&ivy.take_events()), expected);
}

#[tokio::test(start_paused = true)]
async fn duplicated_packets_apply_requests_once() {
    init_logging();
    let network = LocalNetwork::with_conditioner(LinkConditionerConfig::always_duplicate());
    let (mut host, mut guests) = session(&network, &["gil"]).await;
    let mut gil = guests.remove(0);
    let puzzle = host.with_server(|server| {
        server.host_puzzle(Box::new(SequencePuzzle::new(
            SequencePuzzleConfig::fixed(elements_from_str("DATOS"), 40),
            0,
        )))
    });
    pump(&mut [&mut host, &mut gil], 4).await;
    gil.take_events();

    let gil_id = gil.id();
    assert!(gil.manager.toggle_ready().unwrap());
    gil.client_mut().activate(puzzle, 'D'.into()).unwrap();
    gil.client_mut().activate(puzzle, 'A'.into()).unwrap();
    pump(&mut [&mut host, &mut gil], 4).await;

    let events = gil.take_events();
    let ready_changes = events
        .iter()
        .filter(|event| matches!(event, ClientEvent::ReadyChanged { participant, .. } if *participant == gil_id))
        .count();
    assert_eq!(ready_changes, 1);
    let activations = events
        .iter()
        .filter(|event| matches!(event, ClientEvent::Puzzle { .. }))
        .count();
    assert_eq!(activations, 2);

    let mirror = gil.client().puzzle(&puzzle).unwrap();
    assert_eq!(mirror.partial, elements_from_str("DA"));
    assert_eq!(mirror.correct_count, 2);
    assert_eq!(mirror.phase, PuzzlePhase::Collecting);
    assert!(host.with_server(|server| server.duplicate_requests()) > 0);
    assert!(gil.client().duplicate_notifies() > 0);
}

#[tokio::test(start_paused = true)]
async fn reordered_packets_still_apply_in_send_order() {
    init_logging();
    let network = LocalNetwork::with_conditioner(
        LinkConditionerConfig::new(0.5).with_delay(3).with_seed(11),
    );
    let (mut host, mut guests) = session(&network, &["gil", "ivy"]).await;
    let (mut gil, mut ivy) = (guests.remove(0), guests.remove(0));
    let melody = elements_from_str("CCGGAAG");
    let puzzle = host.with_server(|server| {
        server.host_puzzle(Box::new(SequencePuzzle::new(
            SequencePuzzleConfig::keys(melody.clone(), 40),
            0,
        )))
    });
    pump(&mut [&mut host, &mut gil, &mut ivy], 8).await;
    gil.take_events();
    ivy.take_events();

    // pressed within one frame, so the Requests race each other
    for note in &melody {
        gil.client_mut().activate(puzzle, *note).unwrap();
    }
    let solved = pump_until(&mut [&mut host, &mut gil, &mut ivy], 60, |players| {
        players.iter().all(|player| {
            player.client().puzzle(&puzzle).map(|mirror| mirror.phase) == Some(PuzzlePhase::Solved)
        })
    })
    .await;
    assert!(solved);

    for player in [&mut gil, &mut ivy] {
        let mirror = player.client().puzzle(&puzzle).unwrap();
        assert_eq!(mirror.partial, melody);
        assert_eq!(mirror.correct_count, melody.len());
        let pressed: Vec<ElementId> = player
            .take_events()
            .into_iter()
            .filter_map(|event| match event {
                ClientEvent::Puzzle {
                    event: PuzzleEvent::Activated { element, .. },
                    ..
                } => Some(element),
                _ => None,
            })
            .collect();
        assert_eq!(pressed, melody);
    }
}

#[tokio::test(start_paused = true)]
async fn ownership_moves_between_participants_one_holder_at_a_time() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, mut guests) = session(&network, &["gil", "ivy"]).await;
    let (mut gil, mut ivy) = (guests.remove(0), guests.remove(0));
    let lever = host
        .with_server(|server| {
            server.spawn("lever", None, vec![(FieldId(0), FieldValue::Angle(0.0))])
        })
        .unwrap();
    pump(&mut [&mut host, &mut gil, &mut ivy], 4).await;

    gil.client_mut().claim(lever).unwrap();
    pump(&mut [&mut host, &mut gil, &mut ivy], 2).await;
    let ivy_claim = ivy.client_mut().claim(lever).unwrap();
    pump(&mut [&mut host, &mut gil, &mut ivy], 2).await;

    let gil_id = gil.id();
    assert!(gil.client().world().owns(&lever));
    assert_eq!(ivy.client().world().get(&lever).unwrap().owner(), gil_id);
    assert_eq!(ivy.client().world().get(&lever).unwrap().epoch(), Epoch(1));
    assert_event!(
        ivy.events,
        ClientEvent::RequestRejected {
            sequence,
            reason: WorldError::Validation(ValidationError::EntityHeld { .. }),
        } if *sequence == ivy_claim
    );

    gil.manager
        .client_mut()
        .unwrap()
        .simulate(accord_test::FRAME, |tick, world| {
            world
                .write(tick, &lever, FieldId(0), FieldValue::Angle(1.0))
                .unwrap();
        });
    pump(&mut [&mut host, &mut gil, &mut ivy], 2).await;
    assert_eq!(
        ivy.client().world().get(&lever).unwrap().authoritative(&FieldId(0)),
        Some(&FieldValue::Angle(1.0))
    );

    gil.client_mut().release(lever).unwrap();
    pump(&mut [&mut host, &mut gil, &mut ivy], 2).await;
    ivy.client_mut().claim(lever).unwrap();
    pump(&mut [&mut host, &mut gil, &mut ivy], 2).await;

    let ivy_id = ivy.id();
    for player in [&host, &gil, &ivy] {
        let record = player.client().world().get(&lever).unwrap();
        assert_eq!(record.owner(), ivy_id);
        assert_eq!(record.epoch(), Epoch(3));
    }
    assert!(!gil.client().world().owns(&lever));
    assert!(ivy.client().world().owns(&lever));
}

#[tokio::test(start_paused = true)]
async fn departing_owner_hands_entities_back_to_the_authority() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, mut guests) = session(&network, &["gil"]).await;
    let mut gil = guests.remove(0);
    let lever = host
        .with_server(|server| server.spawn("lever", None, Vec::new()))
        .unwrap();
    pump(&mut [&mut host, &mut gil], 4).await;
    gil.client_mut().claim(lever).unwrap();
    pump(&mut [&mut host, &mut gil], 2).await;
    assert!(gil.client().world().owns(&lever));

    assert!(gil.manager.leave_session().ok);
    pump(&mut [&mut host], 4).await;
    let authority = host.with_server(|server| server.authority_id());
    assert_eq!(host.client().world().get(&lever).unwrap().owner(), authority);
    assert_eq!(host.client().registry().player_count(), 1);
}
