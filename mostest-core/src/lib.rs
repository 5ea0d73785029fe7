/// mostest-core: Pure-computation side of a pairwise leaderboard.
///
/// Random pair → vote → win-rate ranking. No IO, no database, no clock
/// beyond stamping new votes; the store crate brings the persistence.
///
/// Candidates are identified by opaque string IDs. Rankings are recomputed
/// from raw win/loss counts every time and are fully deterministic.
///
/// # Quick start
///
/// ```rust
/// use mostest_core::constants::PAIR_SIZE;
/// use mostest_core::pairing::sample;
/// use mostest_core::{into_pair, rank_candidates, tally_votes, validate_vote, CandidateDraft, LeaderboardId, Vote};
///
/// let leaderboard: LeaderboardId = "roundest".into();
/// let candidates: Vec<_> = ["Ball", "Cube", "Egg"]
///     .into_iter()
///     .map(|name| CandidateDraft::new(name, None).into_candidate(&leaderboard))
///     .collect();
///
/// let mut rng = rand::rng();
/// let (a, b) = into_pair(sample(&candidates, PAIR_SIZE, &mut rng)).unwrap();
///
/// let (winner, loser) = validate_vote(&a.id, &b.id, Some(&a), Some(&b)).unwrap();
/// let votes = vec![Vote::record(winner, loser)];
///
/// let ids: Vec<_> = candidates.iter().map(|c| c.id.clone()).collect();
/// let ranking = rank_candidates(candidates, &tally_votes(&ids, &votes));
///
/// for r in &ranking {
///     println!("#{} {}: {:.1}% ({}-{})", r.position, r.candidate.name, r.score, r.wins, r.losses);
/// }
/// assert_eq!(ranking[0].candidate.id, a.id);
/// ```

pub mod constants;
pub mod csv_format;
pub mod pairing;
pub mod scoring;
pub mod types;
pub mod validation;
pub mod voting;

// Re-export primary public API at crate root.
pub use csv_format::{parse_candidates, write_candidates, CsvError};
pub use pairing::into_pair;
pub use scoring::{rank_candidates, tally_votes, win_rate};
pub use types::{
    Candidate, CandidateDraft, CandidateEdit, CandidateId, CandidatePair, Leaderboard,
    LeaderboardId, NewLeaderboard, RankedCandidate, Tally, Vote, VoteId,
};
pub use validation::{slugify, validate_new_leaderboard, ValidationError};
pub use voting::{check_distinct, validate_vote, VoteError};
