/// Assert that some event in `$events` matches `$pattern`
#[macro_export]
macro_rules! assert_event {
    ($events:expr, $pattern:pat $(if $guard:expr)? $(,)?) => {
        assert!(
            $events.iter().any(|event| matches!(event, $pattern $(if $guard)?)),
            "no event matching {} in {:?}",
            stringify!($pattern),
            $events
        );
    };
}

/// Assert that no event in `$events` matches `$pattern`
#[macro_export]
macro_rules! assert_no_event {
    ($events:expr, $pattern:pat $(if $guard:expr)? $(,)?) => {
        assert!(
            !$events.iter().any(|event| matches!(event, $pattern $(if $guard)?)),
            "unexpected event matching {} in {:?}",
            stringify!($pattern),
            $events
        );
    };
}

/// Assert that every player's roster mirror names exactly one host, and
/// that it is the same participant everywhere
#[macro_export]
macro_rules! assert_single_authority {
    ($($player:expr),+ $(,)?) => {
        let hosts: Vec<Vec<accord_shared::ParticipantId>> = vec![$(
            $player
                .client()
                .registry()
                .players_list(accord_shared::PlayerOrdering::JoinOrder)
                .into_iter()
                .filter(|participant| participant.is_host)
                .map(|participant| participant.id)
                .collect()
        ),+];
        for host in &hosts {
            assert_eq!(host.len(), 1, "expected exactly one host, found {:?}", host);
            assert_eq!(host, &hosts[0], "players disagree on the host");
        }
    };
}
