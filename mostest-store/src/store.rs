/// The persistence seam.
///
/// Implementations answer plain reads and writes. Rules (who may edit, what
/// makes a legal vote) live in `LeaderboardService` and `mostest_core`.
use async_trait::async_trait;
use mostest_core::{Candidate, CandidateId, Leaderboard, LeaderboardId, Tally, Vote};

use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a leaderboard and its first candidates in one atomic step.
    /// Fails with `SlugTaken` if the slug is in use.
    async fn insert_leaderboard(&self, leaderboard: &Leaderboard, candidates: &[Candidate]) -> StoreResult<()>;
    async fn leaderboard(&self, id: &LeaderboardId) -> StoreResult<Option<Leaderboard>>;
    async fn leaderboard_by_slug(&self, slug: &str) -> StoreResult<Option<Leaderboard>>;
    /// Leaderboards of `owner`, ordered by slug.
    async fn leaderboards_by_owner(&self, owner: &str) -> StoreResult<Vec<Leaderboard>>;
    /// Up to `limit` leaderboards with their vote counts, most votes first, ties by slug.
    async fn most_voted_leaderboards(&self, limit: usize) -> StoreResult<Vec<(Leaderboard, u64)>>;

    async fn candidate(&self, id: &CandidateId) -> StoreResult<Option<Candidate>>;
    /// All candidates of a leaderboard in insertion order.
    async fn candidates(&self, leaderboard: &LeaderboardId) -> StoreResult<Vec<Candidate>>;
    /// Up to `count` distinct candidates drawn uniformly at random.
    async fn random_candidates(&self, leaderboard: &LeaderboardId, count: usize) -> StoreResult<Vec<Candidate>>;
    /// Up to `limit` candidates that have an image, in insertion order.
    async fn preview_candidates(&self, leaderboard: &LeaderboardId, limit: usize) -> StoreResult<Vec<Candidate>>;
    async fn insert_candidates(&self, candidates: &[Candidate]) -> StoreResult<()>;
    /// Overwrite name and image. Returns false if the candidate doesn't exist.
    async fn update_candidate(&self, candidate: &Candidate) -> StoreResult<bool>;
    /// Delete a candidate and every vote that mentions it. Returns false if it didn't exist.
    async fn delete_candidate(&self, id: &CandidateId) -> StoreResult<bool>;

    async fn insert_vote(&self, vote: &Vote) -> StoreResult<()>;
    /// Win/loss counts for every candidate of the leaderboard, zero for the unvoted.
    async fn tallies(&self, leaderboard: &LeaderboardId) -> StoreResult<Vec<Tally>>;
}
