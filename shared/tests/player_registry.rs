use accord_shared::{
    Key, Participant, ParticipantId, PlayerOrdering, PlayerRegistry, RegistryError,
};
use proptest::prelude::*;

fn id(value: u64) -> ParticipantId {
    ParticipantId::from_u64(value)
}

#[test]
fn new_unready_participant_flips_all_ready() {
    let mut registry = PlayerRegistry::new();
    assert!(!registry.all_ready());

    registry
        .register(Participant::new(id(1), "host").host().ready(true))
        .unwrap();
    assert!(registry.all_ready());

    registry.register(Participant::new(id(2), "guest")).unwrap();
    assert!(!registry.all_ready());

    assert_eq!(registry.set_ready(&id(2), true), Ok(true));
    assert!(registry.all_ready());
    assert_eq!(registry.set_ready(&id(2), true), Ok(false));
}

#[test]
fn only_one_host_and_one_local() {
    let mut registry = PlayerRegistry::new();
    registry
        .register(Participant::new(id(1), "a").host().local())
        .unwrap();
    assert_eq!(
        registry.register(Participant::new(id(2), "b").host()),
        Err(RegistryError::HostAlreadyPresent {
            participant: id(2),
            existing: id(1),
        })
    );
    assert_eq!(
        registry.register(Participant::new(id(3), "c").local()),
        Err(RegistryError::LocalAlreadyPresent {
            participant: id(3),
            existing: id(1),
        })
    );
    assert_eq!(registry.player_count(), 1);
}

#[test]
fn players_list_orders_host_then_local_then_name() {
    let mut registry = PlayerRegistry::new();
    registry.register(Participant::new(id(1), "zed")).unwrap();
    registry.register(Participant::new(id(2), "amy")).unwrap();
    registry.register(Participant::new(id(3), "mia").local()).unwrap();
    registry.register(Participant::new(id(4), "bob").host()).unwrap();
    registry.register(Participant::new(id(5), "amy")).unwrap();

    let ordered: Vec<ParticipantId> = registry
        .players_list(PlayerOrdering::HostLocalAlphabetical)
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(ordered, vec![id(4), id(3), id(2), id(5), id(1)]);

    let joined: Vec<ParticipantId> = registry
        .players_list(PlayerOrdering::JoinOrder)
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(joined, vec![id(1), id(2), id(3), id(4), id(5)]);
}

#[test]
fn unregistering_unknown_participant_is_none() {
    let mut registry = PlayerRegistry::new();
    assert!(registry.unregister(&id(9)).is_none());
    assert_eq!(
        registry.set_ready(&id(9), true),
        Err(RegistryError::NotRegistered { participant: id(9) })
    );
}

proptest! {
    #[test]
    fn all_ready_iff_nonempty_and_everyone_ready(flags in proptest::collection::vec(any::<bool>(), 0..12)) {
        let mut registry = PlayerRegistry::new();
        for (index, ready) in flags.iter().enumerate() {
            registry
                .register(Participant::new(id(index as u64 + 1), format!("p{}", index)).ready(*ready))
                .unwrap();
        }
        let expected = !flags.is_empty() && flags.iter().all(|ready| *ready);
        prop_assert_eq!(registry.all_ready(), expected);
        prop_assert_eq!(registry.player_count(), flags.len());
    }
}
