use std::time::Duration;

use tokio::time;

use crate::TestPlayer;

/// One presentation frame
pub const FRAME: Duration = Duration::from_millis(50);

/// Lets `frames` frames pass, updating every player once per frame. Each
/// player's events are appended to its `events`
pub async fn pump(players: &mut [&mut TestPlayer], frames: usize) {
    for _ in 0..frames {
        time::sleep(FRAME).await;
        for player in players.iter_mut() {
            let events = player.manager.update(FRAME);
            player.events.extend(events);
        }
    }
}

/// Pumps until `done` holds, for at most `max_frames`. Returns whether it
/// did
pub async fn pump_until<F>(players: &mut [&mut TestPlayer], max_frames: usize, mut done: F) -> bool
where
    F: FnMut(&[&mut TestPlayer]) -> bool,
{
    for _ in 0..max_frames {
        if done(players) {
            return true;
        }
        pump(players, 1).await;
    }
    done(players)
}
