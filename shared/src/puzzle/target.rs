use crate::{puzzle::ElementId, Tick};

const TARGET_SEED_SALT: u64 = 0x5EED_AC0D;

/// Picks `length` distinct elements from `pool` in a random order. The
/// result depends only on the inputs, so an authority rebuilt at the same
/// tick derives the same arrangement
pub fn derive_target(pool: &[ElementId], length: usize, seed: Tick) -> Vec<ElementId> {
    let rng = fastrand::Rng::with_seed(u64::from(seed) ^ TARGET_SEED_SALT);
    let mut shuffled = pool.to_vec();
    rng.shuffle(&mut shuffled);
    shuffled.truncate(length);
    shuffled
}
