use accord_client::{ClientEvent, SLOT_CLIP, SOLVED_CLIP};
use accord_server::{PoseSource, POSE_FIELD};
use accord_shared::{
    puzzle::{
        elements_from_str, ComposedPuzzle, ComposedPuzzleConfig, ElementId, LeverConfig,
        LeverSignal, PuzzlePhase, SequencePuzzle, SequencePuzzleConfig, LEVER_ANGLE,
    },
    EntityId, FieldId, FieldValue, LocalNetwork, PoseSnapshot, PuzzleId, ReplicaWorld,
    SessionFilter, SimulationTick, Tick, ValidationError, WorldError,
};
use accord_test::{assert_event, init_logging, pump, pump_until, TestPlayer};

async fn trio(network: &LocalNetwork) -> (TestPlayer, TestPlayer, TestPlayer) {
    let mut host = TestPlayer::new(network, "hana");
    assert!(host.manager.create_session("Workshop", 4).await.ok);
    let mut players = Vec::new();
    for name in ["gil", "ivy"] {
        let mut guest = TestPlayer::new(network, name);
        let sessions = guest.manager.list_sessions(&SessionFilter::any()).await;
        assert!(guest.manager.join_session(&sessions[0]).await.ok);
        players.push(guest);
    }
    let ivy = players.remove(1);
    let gil = players.remove(0);
    (host, gil, ivy)
}

struct Walker;

impl PoseSource for Walker {
    fn sample(&mut self, tick: Tick) -> Option<PoseSnapshot> {
        Some(PoseSnapshot::at_rest(tick, [f32::from(tick) * 0.1, 0.0, 0.0]))
    }
}

#[tokio::test(start_paused = true)]
async fn composed_puzzle_collects_notes_and_plays_them_back() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, mut gil, mut ivy) = trio(&network).await;
    let puzzle = host.with_server(|server| {
        server.host_puzzle(Box::new(ComposedPuzzle::new(
            ComposedPuzzleConfig {
                pool: elements_from_str("CDEFGAB"),
                length: 3,
                display_ticks: 10,
                playback_step_ticks: 2,
                reset_ticks: 40,
            },
            server.current_tick(),
        )))
    });
    pump(&mut [&mut host, &mut gil, &mut ivy], 4).await;

    gil.client_mut().start_puzzle(puzzle).unwrap();
    let collecting = pump_until(&mut [&mut host, &mut gil, &mut ivy], 40, |players| {
        players[1].client().puzzle(&puzzle).map(|mirror| mirror.phase)
            == Some(PuzzlePhase::Collecting)
    })
    .await;
    assert!(collecting);
    let target = gil
        .client()
        .puzzle(&puzzle)
        .and_then(|mirror| mirror.shown_target.clone())
        .expect("pattern was shown");
    assert_eq!(target.len(), 3);

    // a second note for an occupied slot is refused
    gil.client_mut().place_note(puzzle, 0, target[0]).unwrap();
    pump(&mut [&mut host, &mut gil, &mut ivy], 2).await;
    let other = elements_from_str("CDEFGAB")
        .into_iter()
        .find(|note| *note != target[0])
        .unwrap();
    let refused = ivy.client_mut().place_note(puzzle, 0, other).unwrap();
    pump(&mut [&mut host, &mut gil, &mut ivy], 2).await;
    assert_event!(
        ivy.events,
        ClientEvent::RequestRejected {
            sequence,
            reason: WorldError::Validation(ValidationError::SlotOccupied { slot: 0, .. }),
        } if *sequence == refused
    );
    assert_eq!(ivy.client().puzzle(&puzzle).unwrap().slots[0], Some(target[0]));

    // clearing frees the slot again
    ivy.client_mut().clear_slot(puzzle, 0).unwrap();
    pump(&mut [&mut host, &mut gil, &mut ivy], 2).await;
    assert_eq!(gil.client().puzzle(&puzzle).unwrap().slots[0], None);

    for (slot, note) in target.iter().enumerate() {
        ivy.client_mut().place_note(puzzle, slot, *note).unwrap();
    }
    let solved = pump_until(&mut [&mut host, &mut gil, &mut ivy], 40, |players| {
        players
            .iter()
            .all(|player| player.client().puzzle(&puzzle).unwrap().phase == PuzzlePhase::Solved)
    })
    .await;
    assert!(solved);
    assert_eq!(gil.client().puzzle(&puzzle).unwrap().last_played, Some(target[2]));
    assert_eq!(gil.audio.played(SOLVED_CLIP), 1);
    assert!(ivy.audio.played(SLOT_CLIP) >= 3);
}

/// Hosts a lever entity and a sequence puzzle over `target`
fn lever_and_puzzle(host: &TestPlayer, target: Vec<ElementId>) -> (EntityId, PuzzleId) {
    host.with_server(|server| {
        let puzzle = server.host_puzzle(Box::new(SequencePuzzle::new(
            SequencePuzzleConfig::fixed(target, 10),
            0,
        )));
        let lever = server
            .spawn("lever", None, vec![(LEVER_ANGLE, FieldValue::Angle(0.0))])
            .unwrap();
        (lever, puzzle)
    })
}

#[tokio::test(start_paused = true)]
async fn pulled_levers_count_once_the_authority_agrees() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, mut gil, mut ivy) = trio(&network).await;
    let bolt = ElementId(1);
    let (lever, puzzle) = lever_and_puzzle(&host, vec![bolt]);
    pump(&mut [&mut host, &mut gil, &mut ivy], 4).await;

    gil.client_mut()
        .grab_lever(lever, LeverConfig::default(), puzzle, bolt)
        .unwrap();
    pump(&mut [&mut host, &mut gil, &mut ivy], 2).await;
    assert!(gil.client().world().owns(&lever));

    let signal = gil.client_mut().pull_lever(lever, 0.2).unwrap();
    assert_eq!(signal, None);
    // far past the end stop, clamped locally
    let signal = gil.client_mut().pull_lever(lever, 9.0).unwrap();
    assert_eq!(signal, Some(LeverSignal::Activated));
    let max = LeverConfig::default().max_angle;
    assert_eq!(gil.client().lever(&lever).unwrap().angle(), max);
    assert_eq!(gil.client().puzzle(&puzzle).unwrap().phase, PuzzlePhase::Idle);

    // ivy's display copy eases toward the angle gil wrote
    let mut shown = Vec::new();
    let settled = pump_until(&mut [&mut host, &mut gil, &mut ivy], 40, |players| {
        let record = players[2].client().world().get(&lever).unwrap();
        let display = record.display(&LEVER_ANGLE).cloned();
        shown.extend(display.as_ref().and_then(FieldValue::as_scalar));
        display == Some(FieldValue::Angle(max))
    })
    .await;
    assert!(settled);
    assert!(shown.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(shown.iter().any(|angle| *angle > 0.0 && *angle < max));

    assert_eq!(
        ivy.client().world().get(&lever).unwrap().authoritative(&LEVER_ANGLE),
        Some(&FieldValue::Angle(max))
    );
    assert_eq!(ivy.client().puzzle(&puzzle).unwrap().phase, PuzzlePhase::Solved);
    assert_eq!(
        host.with_server(|server| server.puzzle(&puzzle).map(|machine| machine.phase())),
        Some(PuzzlePhase::Solved)
    );
}

#[tokio::test(start_paused = true)]
async fn a_puzzle_reset_lets_go_of_lever_activations() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, mut gil, mut ivy) = trio(&network).await;
    let (latch, bolt) = (ElementId(1), ElementId(2));
    let (lever, puzzle) = lever_and_puzzle(&host, vec![latch, bolt]);
    pump(&mut [&mut host, &mut gil, &mut ivy], 4).await;
    gil.client_mut()
        .grab_lever(lever, LeverConfig::default(), puzzle, bolt)
        .unwrap();
    pump(&mut [&mut host, &mut gil, &mut ivy], 2).await;

    // out of order
    let signal = gil.client_mut().pull_lever(lever, 9.0).unwrap();
    assert_eq!(signal, Some(LeverSignal::Activated));
    let failed = pump_until(&mut [&mut host, &mut gil, &mut ivy], 10, |players| {
        players[1].client().puzzle(&puzzle).map(|mirror| mirror.phase) == Some(PuzzlePhase::Failed)
    })
    .await;
    assert!(failed);
    assert!(gil.client().lever(&lever).unwrap().is_active());

    let reset = pump_until(&mut [&mut host, &mut gil, &mut ivy], 30, |players| {
        players[1].client().puzzle(&puzzle).map(|mirror| mirror.phase) == Some(PuzzlePhase::Idle)
    })
    .await;
    assert!(reset);
    assert!(!gil.client().lever(&lever).unwrap().is_active());

    // still held high, so the next pull counts again
    let signal = gil.client_mut().pull_lever(lever, 9.0).unwrap();
    assert_eq!(signal, Some(LeverSignal::Activated));
}

#[tokio::test(start_paused = true)]
async fn avatar_poses_stream_at_a_low_rate() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, mut gil, mut ivy) = trio(&network).await;
    let gil_id = gil.id();
    let avatar = host
        .with_server(|server| server.attach_pose_source(gil_id, Walker))
        .unwrap();

    pump(&mut [&mut host, &mut gil, &mut ivy], 60).await;
    let record = ivy.client().world().get(&avatar).expect("avatar mirrored");
    assert_eq!(record.kind(), "avatar");
    let latest = record
        .authoritative(&POSE_FIELD)
        .and_then(FieldValue::as_pose)
        .expect("pose field")
        .tick;
    let shown = ivy.client().pose(&avatar).expect("playing back").tick;
    assert!(shown <= latest);
    assert!(ivy.client().buffered_poses(&avatar) <= 6);

    // the avatar goes away with its participant
    assert!(gil.manager.leave_session().ok);
    pump(&mut [&mut host, &mut ivy], 4).await;
    assert!(ivy.client().world().get(&avatar).is_none());
    assert!(ivy.client().pose(&avatar).is_none());
}

#[tokio::test(start_paused = true)]
async fn authority_simulation_writes_its_own_entities() {
    init_logging();
    let network = LocalNetwork::new();
    let (mut host, mut gil, mut ivy) = trio(&network).await;
    let counter = FieldId(0);
    let clock = host
        .with_server(|server| server.spawn("clock", None, vec![(counter, FieldValue::Int(0))]))
        .unwrap();
    host.with_server(|server| {
        server.set_simulation(move |tick: &SimulationTick, world: &mut ReplicaWorld| {
            let _ = world.write(tick, &clock, counter, FieldValue::Int(i64::from(tick.tick())));
        })
    });

    pump(&mut [&mut host, &mut gil, &mut ivy], 6).await;
    let server_value = host.with_server(|server| {
        server.world().get(&clock).and_then(|entity| entity.get(&counter)).cloned()
    });
    let Some(FieldValue::Int(written)) = server_value else {
        panic!("clock was never written");
    };
    assert!(written > 0);

    let seen = ivy.client().world().get(&clock).unwrap().authoritative(&counter).cloned();
    assert!(matches!(seen, Some(FieldValue::Int(value)) if value > 0 && value <= written));
    assert!(!ivy.client().world().owns(&clock));
}
