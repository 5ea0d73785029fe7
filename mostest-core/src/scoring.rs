/// Win-rate scoring and ranking.
///
/// Pure functions over already-aggregated outcomes. Nothing here is
/// incremental: a ranking is recomputed from the tallies every time.
use std::collections::HashMap;

use crate::constants::{UNDEFEATED_SCORE, UNVOTED_SCORE};
use crate::types::{Candidate, CandidateId, IdMap, RankedCandidate, Tally, Vote};

/// Win rate of a candidate as a percentage.
///
/// No votes at all scores 0. Wins with no losses scores 100.
pub fn win_rate(wins: u64, losses: u64) -> f64 {
    match (wins, losses) {
        (0, 0) => UNVOTED_SCORE,
        (_, 0) => UNDEFEATED_SCORE,
        _ => wins as f64 / (wins + losses) as f64 * 100.0,
    }
}

/// Count wins and losses per candidate from raw votes.
///
/// The result has one entry per id in `candidates`, in the same order.
/// Votes that mention a candidate outside `candidates` don't count for it.
///
/// # Panics
///
/// Panics if `candidates` lists the same id twice. Ids from a store's
/// candidate table are unique, so callers pass those straight through.
pub fn tally_votes(candidates: &[CandidateId], votes: &[Vote]) -> Vec<Tally> {
    let id_map = IdMap::from_ids(candidates);
    let mut wins = vec![0u64; id_map.len()];
    let mut losses = vec![0u64; id_map.len()];

    for vote in votes {
        if let Some(idx) = id_map.to_idx(&vote.winner) {
            wins[idx] += 1;
        }
        if let Some(idx) = id_map.to_idx(&vote.loser) {
            losses[idx] += 1;
        }
    }

    (0..id_map.len())
        .map(|idx| Tally {
            candidate: id_map.to_id(idx).clone(),
            wins: wins[idx],
            losses: losses[idx],
        })
        .collect()
}

/// Rank `candidates` by win rate.
///
/// Sorted by score descending, ties broken by candidate id ascending, so the
/// same inputs always give the same order regardless of how the store
/// returned them. A candidate without a tally counts as never voted on.
pub fn rank_candidates(candidates: Vec<Candidate>, tallies: &[Tally]) -> Vec<RankedCandidate> {
    let by_id: HashMap<&CandidateId, &Tally> =
        tallies.iter().map(|t| (&t.candidate, t)).collect();

    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let (wins, losses) = by_id
                .get(&candidate.id)
                .map(|t| (t.wins, t.losses))
                .unwrap_or((0, 0));
            RankedCandidate {
                position: 0,
                score: win_rate(wins, losses),
                candidate,
                wins,
                losses,
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.candidate.id.cmp(&b.candidate.id))
    });

    for (i, r) in ranked.iter_mut().enumerate() {
        r.position = i + 1;
    }

    ranked
}
