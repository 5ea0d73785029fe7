/// Pair selection for voting.
///
/// Selection is uniform and memoryless: every unordered pair of distinct
/// candidates is equally likely on every call, and nothing is remembered
/// between calls, so the same pair can come up twice in a row.
use rand::seq::index;
use rand::Rng;

use crate::constants::PAIR_SIZE;
use crate::types::{Candidate, CandidatePair};

/// Draw up to `count` distinct members of `pool` uniformly at random, in random order.
///
/// This is the in-process equivalent of `ORDER BY RANDOM() LIMIT count`.
/// Drawing `PAIR_SIZE` and passing the result to `into_pair` picks a voting pair.
pub fn sample<T: Clone>(pool: &[T], count: usize, rng: &mut impl Rng) -> Vec<T> {
    let amount = count.min(pool.len());
    index::sample(rng, pool.len(), amount)
        .into_iter()
        .map(|i| pool[i].clone())
        .collect()
}

/// Accept a random draw from a store as a voting pair.
///
/// The draw must be exactly two distinct candidates of one leaderboard;
/// anything else (short leaderboard, duplicated rows) yields `None`.
pub fn into_pair(drawn: Vec<Candidate>) -> Option<CandidatePair> {
    if drawn.len() != PAIR_SIZE {
        return None;
    }
    let mut it = drawn.into_iter();
    let (first, second) = (it.next()?, it.next()?);
    if first.id == second.id || first.leaderboard != second.leaderboard {
        return None;
    }
    Some((first, second))
}
