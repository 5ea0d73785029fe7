/// Vote validation and construction.
///
/// The store owns the lookups; this module only decides whether two resolved
/// candidates form a legal vote.
use chrono::Utc;
use thiserror::Error;

use crate::types::{Candidate, CandidateId, Vote, VoteId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoteError {
    #[error("winner and loser must be two different candidates")]
    InvalidPair,
    #[error("candidate {0} not found")]
    NotFound(CandidateId),
    #[error("winner and loser belong to different leaderboards")]
    CrossLeaderboard,
}

/// Reject a vote for a candidate against itself. Needs no lookup.
pub fn check_distinct(winner: &CandidateId, loser: &CandidateId) -> Result<(), VoteError> {
    if winner == loser {
        return Err(VoteError::InvalidPair);
    }
    Ok(())
}

/// Check that the looked-up candidates form a legal vote.
///
/// `winner`/`loser` are the results of resolving `winner_id`/`loser_id`;
/// `None` means the id didn't resolve. The winner is reported first when
/// both are missing.
pub fn validate_vote<'a>(
    winner_id: &CandidateId,
    loser_id: &CandidateId,
    winner: Option<&'a Candidate>,
    loser: Option<&'a Candidate>,
) -> Result<(&'a Candidate, &'a Candidate), VoteError> {
    check_distinct(winner_id, loser_id)?;
    let winner = winner.ok_or_else(|| VoteError::NotFound(winner_id.clone()))?;
    let loser = loser.ok_or_else(|| VoteError::NotFound(loser_id.clone()))?;
    if winner.leaderboard != loser.leaderboard {
        return Err(VoteError::CrossLeaderboard);
    }
    Ok((winner, loser))
}

impl Vote {
    /// A new vote stamped now. Callers should have run `validate_vote` first.
    pub fn record(winner: &Candidate, loser: &Candidate) -> Self {
        Vote {
            id: VoteId::generate(),
            leaderboard: winner.leaderboard.clone(),
            winner: winner.id.clone(),
            loser: loser.id.clone(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, leaderboard: &str) -> Candidate {
        Candidate {
            id: id.into(),
            leaderboard: leaderboard.into(),
            name: id.to_string(),
            image: None,
        }
    }

    #[test]
    fn test_same_candidate_is_invalid_pair() {
        let a = candidate("a", "lb");
        let id = a.id.clone();
        assert_eq!(
            validate_vote(&id, &id, Some(&a), Some(&a)),
            Err(VoteError::InvalidPair),
        );
        // Checked even when nothing resolved.
        assert_eq!(validate_vote(&id, &id, None, None), Err(VoteError::InvalidPair));
    }

    #[test]
    fn test_missing_candidates() {
        let a = candidate("a", "lb");
        let ghost: CandidateId = "ghost".into();
        assert_eq!(
            validate_vote(&a.id, &ghost, Some(&a), None),
            Err(VoteError::NotFound(ghost.clone())),
        );
        assert_eq!(
            validate_vote(&ghost, &a.id, None, Some(&a)),
            Err(VoteError::NotFound(ghost.clone())),
        );
    }

    #[test]
    fn test_cross_leaderboard() {
        let a = candidate("a", "one");
        let b = candidate("b", "two");
        assert_eq!(
            validate_vote(&a.id, &b.id, Some(&a), Some(&b)),
            Err(VoteError::CrossLeaderboard),
        );
    }

    #[test]
    fn test_valid_vote_records_outcome() {
        let a = candidate("a", "lb");
        let b = candidate("b", "lb");
        let (winner, loser) = validate_vote(&a.id, &b.id, Some(&a), Some(&b)).unwrap();

        let vote = Vote::record(winner, loser);
        assert_eq!(vote.winner.as_str(), "a");
        assert_eq!(vote.loser.as_str(), "b");
        assert_eq!(vote.leaderboard.as_str(), "lb");
    }
}
