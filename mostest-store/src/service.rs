/// Leaderboard operations: store calls composed with the core rules.
///
/// The service holds no state of its own beyond a handle to the store and the
/// per-call timeout, so clones can serve requests in parallel.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mostest_core::constants::{PAIR_SIZE, PREVIEW_CANDIDATES};
use mostest_core::validation::{normalize_image, normalize_name, validate_candidate, validate_edit};
use mostest_core::{
    check_distinct, into_pair, parse_candidates, rank_candidates, validate_new_leaderboard,
    validate_vote, write_candidates, Candidate, CandidateDraft, CandidateEdit, CandidateId,
    CandidatePair, Leaderboard, LeaderboardId, NewLeaderboard, RankedCandidate, Vote,
};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::store::{Store, StoreResult};

/// A leaderboard with what listings show next to it.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardSummary {
    pub leaderboard: Leaderboard,
    pub vote_count: u64,
    /// A few candidates that have images, in stored order.
    pub preview: Vec<Candidate>,
}

pub struct LeaderboardService<S> {
    store: Arc<S>,
    timeout: Duration,
}

impl<S> Clone for LeaderboardService<S> {
    fn clone(&self) -> Self {
        LeaderboardService {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
        }
    }
}

impl<S: Store> LeaderboardService<S> {
    /// `timeout` bounds every individual store round trip.
    pub fn new(store: S, timeout: Duration) -> Self {
        Self::with_shared(Arc::new(store), timeout)
    }

    pub fn with_shared(store: Arc<S>, timeout: Duration) -> Self {
        LeaderboardService { store, timeout }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn call<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                warn!(op, timeout_ms = self.timeout.as_millis() as u64, "store call timed out");
                Err(Error::Timeout(self.timeout))
            }
        }
    }

    // --- Leaderboards ---

    /// Validate and store a new leaderboard with its first candidates.
    pub async fn create_leaderboard(&self, new: NewLeaderboard) -> Result<(Leaderboard, Vec<Candidate>)> {
        let new = NewLeaderboard {
            candidates: new.candidates.into_iter().map(normalize_draft).collect(),
            ..new
        };
        validate_new_leaderboard(&new)?;

        let leaderboard = Leaderboard {
            id: LeaderboardId::generate(),
            slug: new.slug,
            name: new.name,
            question: new.question,
            owner: new.owner,
        };
        let candidates: Vec<Candidate> = new
            .candidates
            .into_iter()
            .map(|d| d.into_candidate(&leaderboard.id))
            .collect();

        self.call("insert_leaderboard", self.store.insert_leaderboard(&leaderboard, &candidates))
            .await?;
        info!(
            slug = %leaderboard.slug,
            owner = leaderboard.owner.as_deref().unwrap_or("-"),
            candidates = candidates.len(),
            "created leaderboard"
        );
        Ok((leaderboard, candidates))
    }

    pub async fn leaderboard(&self, slug: &str) -> Result<Leaderboard> {
        debug!(slug, "loading leaderboard");
        self.call("leaderboard_by_slug", self.store.leaderboard_by_slug(slug))
            .await?
            .ok_or_else(|| Error::LeaderboardNotFound(slug.to_string()))
    }

    async fn leaderboard_by_id(&self, id: &LeaderboardId) -> Result<Leaderboard> {
        self.call("leaderboard", self.store.leaderboard(id))
            .await?
            .ok_or_else(|| Error::LeaderboardNotFound(id.to_string()))
    }

    async fn owned_leaderboard(&self, id: &LeaderboardId, user: Option<&str>) -> Result<Leaderboard> {
        let leaderboard = self.leaderboard_by_id(id).await?;
        match user {
            Some(user) if leaderboard.is_owned_by(user) => Ok(leaderboard),
            _ => {
                warn!(slug = %leaderboard.slug, user = user.unwrap_or("-"), "edit by non-owner rejected");
                Err(Error::NotOwner)
            }
        }
    }

    // --- Pairing, voting, ranking ---

    /// Two distinct candidates drawn uniformly at random, or `None` when the
    /// leaderboard has fewer than two.
    pub async fn pick_pair(&self, leaderboard: &LeaderboardId) -> Result<Option<CandidatePair>> {
        let drawn = self
            .call("random_candidates", self.store.random_candidates(leaderboard, PAIR_SIZE))
            .await?;
        let pair = into_pair(drawn);
        debug!(leaderboard = %leaderboard, found = pair.is_some(), "picked pair");
        Ok(pair)
    }

    /// Like `pick_pair`, but a leaderboard without a pair is an error.
    pub async fn require_pair(&self, leaderboard: &LeaderboardId) -> Result<CandidatePair> {
        self.pick_pair(leaderboard)
            .await?
            .ok_or(Error::InsufficientCandidates)
    }

    /// Record that `winner` beat `loser`. Appends one vote; nothing else changes.
    pub async fn record_vote(&self, winner: &CandidateId, loser: &CandidateId) -> Result<Vote> {
        if let Err(e) = check_distinct(winner, loser) {
            warn!(candidate = %winner, "vote rejected: {e}");
            return Err(e.into());
        }

        let (winner_row, loser_row) = tokio::try_join!(
            self.call("candidate", self.store.candidate(winner)),
            self.call("candidate", self.store.candidate(loser)),
        )?;
        let (w, l) = validate_vote(winner, loser, winner_row.as_ref(), loser_row.as_ref())
            .inspect_err(|e| warn!(winner = %winner, loser = %loser, "vote rejected: {e}"))?;

        let vote = Vote::record(w, l);
        self.call("insert_vote", self.store.insert_vote(&vote)).await?;
        info!(
            leaderboard = %vote.leaderboard,
            winner = %vote.winner,
            loser = %vote.loser,
            "recorded vote"
        );
        Ok(vote)
    }

    /// Current ranking of a leaderboard, best first. Read-only.
    pub async fn rank(&self, leaderboard: &LeaderboardId) -> Result<Vec<RankedCandidate>> {
        let (candidates, tallies) = tokio::try_join!(
            self.call("candidates", self.store.candidates(leaderboard)),
            self.call("tallies", self.store.tallies(leaderboard)),
        )?;
        debug!(leaderboard = %leaderboard, candidates = candidates.len(), "ranking");
        Ok(rank_candidates(candidates, &tallies))
    }

    // --- Candidates ---

    pub async fn candidates(&self, leaderboard: &LeaderboardId) -> Result<Vec<Candidate>> {
        self.call("candidates", self.store.candidates(leaderboard)).await
    }

    pub async fn add_candidate(
        &self,
        user: Option<&str>,
        leaderboard: &LeaderboardId,
        draft: CandidateDraft,
    ) -> Result<Candidate> {
        let draft = normalize_draft(draft);
        validate_candidate(&draft)?;
        let leaderboard = self.owned_leaderboard(leaderboard, user).await?;

        let candidate = draft.into_candidate(&leaderboard.id);
        self.call("insert_candidates", self.store.insert_candidates(std::slice::from_ref(&candidate)))
            .await?;
        info!(slug = %leaderboard.slug, candidate = %candidate.id, "added candidate");
        Ok(candidate)
    }

    /// Change a candidate's name and/or image. An empty image keeps the current one.
    /// Names are trimmed; a blank name is rejected.
    pub async fn edit_candidate(
        &self,
        user: Option<&str>,
        id: &CandidateId,
        edit: CandidateEdit,
    ) -> Result<Candidate> {
        let edit = CandidateEdit {
            name: edit.name.as_deref().map(normalize_name),
            image: normalize_image(edit.image),
        };
        validate_edit(&edit)?;

        let current = self.existing_candidate(id).await?;
        self.owned_leaderboard(&current.leaderboard, user).await?;

        let updated = Candidate {
            name: edit.name.unwrap_or_else(|| current.name.clone()),
            image: edit.image.or_else(|| current.image.clone()),
            ..current.clone()
        };
        if updated == current {
            return Ok(current);
        }

        if !self.call("update_candidate", self.store.update_candidate(&updated)).await? {
            return Err(Error::CandidateNotFound(id.clone()));
        }
        info!(candidate = %id, "edited candidate");
        Ok(updated)
    }

    /// Delete a candidate together with the votes that mention it.
    pub async fn remove_candidate(&self, user: Option<&str>, id: &CandidateId) -> Result<Candidate> {
        let current = self.existing_candidate(id).await?;
        self.owned_leaderboard(&current.leaderboard, user).await?;

        if !self.call("delete_candidate", self.store.delete_candidate(id)).await? {
            return Err(Error::CandidateNotFound(id.clone()));
        }
        info!(candidate = %id, "removed candidate");
        Ok(current)
    }

    async fn existing_candidate(&self, id: &CandidateId) -> Result<Candidate> {
        self.call("candidate", self.store.candidate(id))
            .await?
            .ok_or_else(|| Error::CandidateNotFound(id.clone()))
    }

    /// Append every `name,image` row of `csv` to the leaderboard. All or nothing.
    pub async fn import_candidates(
        &self,
        user: Option<&str>,
        leaderboard: &LeaderboardId,
        csv: &str,
    ) -> Result<Vec<Candidate>> {
        let drafts = parse_candidates(csv)?;
        let leaderboard = self.owned_leaderboard(leaderboard, user).await?;

        let candidates: Vec<Candidate> = drafts
            .into_iter()
            .map(|d| d.into_candidate(&leaderboard.id))
            .collect();
        self.call("insert_candidates", self.store.insert_candidates(&candidates))
            .await?;
        info!(slug = %leaderboard.slug, count = candidates.len(), "imported candidates");
        Ok(candidates)
    }

    pub async fn export_candidates(&self, leaderboard: &LeaderboardId) -> Result<String> {
        let candidates = self.candidates(leaderboard).await?;
        Ok(write_candidates(&candidates)?)
    }

    // --- Discovery ---

    /// The `limit` most-voted leaderboards, ties by slug.
    pub async fn featured(&self, limit: usize) -> Result<Vec<LeaderboardSummary>> {
        let top = self
            .call("most_voted_leaderboards", self.store.most_voted_leaderboards(limit))
            .await?;

        let mut summaries = Vec::with_capacity(top.len());
        for (leaderboard, vote_count) in top {
            let preview = self.preview(&leaderboard.id).await?;
            summaries.push(LeaderboardSummary { leaderboard, vote_count, preview });
        }
        Ok(summaries)
    }

    /// Every leaderboard `user` owns, ordered by slug.
    pub async fn owned_by(&self, user: &str) -> Result<Vec<LeaderboardSummary>> {
        let owned = self
            .call("leaderboards_by_owner", self.store.leaderboards_by_owner(user))
            .await?;

        let mut summaries = Vec::with_capacity(owned.len());
        for leaderboard in owned {
            let (preview, tallies) = tokio::try_join!(
                self.preview(&leaderboard.id),
                self.call("tallies", self.store.tallies(&leaderboard.id)),
            )?;
            // Every vote has exactly one winner inside its leaderboard.
            let vote_count = tallies.iter().map(|t| t.wins).sum();
            summaries.push(LeaderboardSummary { leaderboard, vote_count, preview });
        }
        Ok(summaries)
    }

    async fn preview(&self, leaderboard: &LeaderboardId) -> Result<Vec<Candidate>> {
        self.call(
            "preview_candidates",
            self.store.preview_candidates(leaderboard, PREVIEW_CANDIDATES),
        )
        .await
    }
}

fn normalize_draft(draft: CandidateDraft) -> CandidateDraft {
    CandidateDraft {
        name: normalize_name(&draft.name),
        image: normalize_image(draft.image),
    }
}
