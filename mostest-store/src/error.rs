use std::time::Duration;

use mostest_core::{CandidateId, CsvError, ValidationError, VoteError};
use thiserror::Error;

/// Failures from a `Store` implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("slug {0:?} is already taken")]
    SlugTaken(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Constraint violations fail the same way on every attempt. Any other
    /// database error may clear up on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::SlugTaken(_) => false,
            StoreError::Database(sqlx::Error::Database(db)) => {
                !(db.is_check_violation() || db.is_foreign_key_violation() || db.is_unique_violation())
            }
            StoreError::Database(_) => true,
        }
    }
}

/// Everything a `LeaderboardService` operation can fail with.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Vote(#[from] VoteError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Csv(#[from] CsvError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("leaderboard {0:?} not found")]
    LeaderboardNotFound(String),
    #[error("candidate {0} not found")]
    CandidateNotFound(CandidateId),
    #[error("only the owner can change this leaderboard")]
    NotOwner,
    #[error("not enough candidates yet (at least two are needed to vote)")]
    InsufficientCandidates,
    #[error("store did not answer within {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Whether trying the same call again might succeed.
    ///
    /// Only transient conditions qualify. Rule violations and missing rows
    /// fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout(_) => true,
            Error::Store(e) => e.is_transient(),
            _ => false,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(Error::Timeout(Duration::from_millis(5)).is_retryable());
        assert!(Error::Store(StoreError::Database(sqlx::Error::PoolTimedOut)).is_retryable());

        assert!(!Error::Vote(VoteError::InvalidPair).is_retryable());
        assert!(!Error::InsufficientCandidates.is_retryable());
        assert!(!Error::NotOwner.is_retryable());
        assert!(!Error::Store(StoreError::SlugTaken("x".into())).is_retryable());
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::from(VoteError::CrossLeaderboard).to_string(),
            "winner and loser belong to different leaderboards",
        );
        assert_eq!(
            Error::from(StoreError::SlugTaken("pizza".into())).to_string(),
            "slug \"pizza\" is already taken",
        );
        assert_eq!(
            Error::InsufficientCandidates.to_string(),
            "not enough candidates yet (at least two are needed to vote)",
        );
    }
}
