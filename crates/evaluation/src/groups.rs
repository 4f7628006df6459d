//! Splitting held-out users into evaluation groups.

use data_loader::UserId;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::HashSet;

/// Shuffle `user_ids` with a seeded RNG and cut them into groups of
/// `group_size`.
///
/// Duplicates are dropped (first occurrence wins) before shuffling, and the
/// trailing users that cannot fill a whole group are discarded. A
/// `group_size` of 0 yields no groups.
pub fn split_into_groups(
    user_ids: impl IntoIterator<Item = UserId>,
    group_size: usize,
    seed: u64,
) -> Vec<Vec<UserId>> {
    if group_size == 0 {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut unique: Vec<UserId> = user_ids
        .into_iter()
        .filter(|id| seen.insert(*id))
        .collect();

    let mut rng = StdRng::seed_from_u64(seed);
    unique.shuffle(&mut rng);

    unique
        .chunks_exact(group_size)
        .map(<[UserId]>::to_vec)
        .collect()
}
