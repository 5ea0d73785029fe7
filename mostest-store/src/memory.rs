/// In-process store, for tests and for embedding without a database file.
use async_trait::async_trait;
use mostest_core::pairing::sample;
use mostest_core::{tally_votes, Candidate, CandidateId, Leaderboard, LeaderboardId, Tally, Vote};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::store::{Store, StoreResult};

#[derive(Default)]
struct Tables {
    leaderboards: Vec<Leaderboard>,
    candidates: Vec<Candidate>,
    votes: Vec<Vote>,
}

impl Tables {
    fn candidates_of<'a>(&'a self, leaderboard: &'a LeaderboardId) -> impl Iterator<Item = &'a Candidate> + 'a {
        self.candidates.iter().filter(move |c| &c.leaderboard == leaderboard)
    }

    fn vote_count(&self, leaderboard: &LeaderboardId) -> u64 {
        self.votes.iter().filter(|v| &v.leaderboard == leaderboard).count() as u64
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn draw(pool: &[Candidate], count: usize) -> Vec<Candidate> {
    // ThreadRng is !Send, so it must not live across an await.
    sample(pool, count, &mut rand::rng())
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_leaderboard(&self, leaderboard: &Leaderboard, candidates: &[Candidate]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        if tables.leaderboards.iter().any(|l| l.slug == leaderboard.slug) {
            return Err(StoreError::SlugTaken(leaderboard.slug.clone()));
        }
        tables.leaderboards.push(leaderboard.clone());
        tables.candidates.extend_from_slice(candidates);
        Ok(())
    }

    async fn leaderboard(&self, id: &LeaderboardId) -> StoreResult<Option<Leaderboard>> {
        let tables = self.tables.read().await;
        Ok(tables.leaderboards.iter().find(|l| &l.id == id).cloned())
    }

    async fn leaderboard_by_slug(&self, slug: &str) -> StoreResult<Option<Leaderboard>> {
        let tables = self.tables.read().await;
        Ok(tables.leaderboards.iter().find(|l| l.slug == slug).cloned())
    }

    async fn leaderboards_by_owner(&self, owner: &str) -> StoreResult<Vec<Leaderboard>> {
        let tables = self.tables.read().await;
        let mut owned: Vec<Leaderboard> = tables
            .leaderboards
            .iter()
            .filter(|l| l.is_owned_by(owner))
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(owned)
    }

    async fn most_voted_leaderboards(&self, limit: usize) -> StoreResult<Vec<(Leaderboard, u64)>> {
        let tables = self.tables.read().await;
        let mut counted: Vec<(Leaderboard, u64)> = tables
            .leaderboards
            .iter()
            .map(|l| (l.clone(), tables.vote_count(&l.id)))
            .collect();
        counted.sort_by(|(a, a_votes), (b, b_votes)| b_votes.cmp(a_votes).then_with(|| a.slug.cmp(&b.slug)));
        counted.truncate(limit);
        Ok(counted)
    }

    async fn candidate(&self, id: &CandidateId) -> StoreResult<Option<Candidate>> {
        let tables = self.tables.read().await;
        Ok(tables.candidates.iter().find(|c| &c.id == id).cloned())
    }

    async fn candidates(&self, leaderboard: &LeaderboardId) -> StoreResult<Vec<Candidate>> {
        let tables = self.tables.read().await;
        Ok(tables.candidates_of(leaderboard).cloned().collect())
    }

    async fn random_candidates(&self, leaderboard: &LeaderboardId, count: usize) -> StoreResult<Vec<Candidate>> {
        let pool: Vec<Candidate> = {
            let tables = self.tables.read().await;
            tables.candidates_of(leaderboard).cloned().collect()
        };
        Ok(draw(&pool, count))
    }

    async fn preview_candidates(&self, leaderboard: &LeaderboardId, limit: usize) -> StoreResult<Vec<Candidate>> {
        let tables = self.tables.read().await;
        Ok(tables
            .candidates_of(leaderboard)
            .filter(|c| c.image.is_some())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert_candidates(&self, candidates: &[Candidate]) -> StoreResult<()> {
        self.tables.write().await.candidates.extend_from_slice(candidates);
        Ok(())
    }

    async fn update_candidate(&self, candidate: &Candidate) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.candidates.iter_mut().find(|c| c.id == candidate.id) {
            Some(stored) => {
                stored.name = candidate.name.clone();
                stored.image = candidate.image.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_candidate(&self, id: &CandidateId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.candidates.len();
        tables.candidates.retain(|c| &c.id != id);
        if tables.candidates.len() == before {
            return Ok(false);
        }
        tables.votes.retain(|v| &v.winner != id && &v.loser != id);
        Ok(true)
    }

    async fn insert_vote(&self, vote: &Vote) -> StoreResult<()> {
        self.tables.write().await.votes.push(vote.clone());
        Ok(())
    }

    async fn tallies(&self, leaderboard: &LeaderboardId) -> StoreResult<Vec<Tally>> {
        let tables = self.tables.read().await;
        let ids: Vec<CandidateId> = tables.candidates_of(leaderboard).map(|c| c.id.clone()).collect();
        let votes: Vec<Vote> = tables
            .votes
            .iter()
            .filter(|v| &v.leaderboard == leaderboard)
            .cloned()
            .collect();
        Ok(tally_votes(&ids, &votes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mostest_core::CandidateDraft;

    fn leaderboard(slug: &str, owner: Option<&str>) -> Leaderboard {
        Leaderboard {
            id: LeaderboardId::generate(),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            question: "Which one?".to_string(),
            owner: owner.map(str::to_string),
        }
    }

    fn candidates(lb: &Leaderboard, names: &[&str]) -> Vec<Candidate> {
        names
            .iter()
            .map(|&n| CandidateDraft::new(n, None).into_candidate(&lb.id))
            .collect()
    }

    #[tokio::test]
    async fn test_slug_must_be_unique() {
        let store = MemoryStore::new();
        store.insert_leaderboard(&leaderboard("pizza", None), &[]).await.unwrap();
        let err = store
            .insert_leaderboard(&leaderboard("pizza", None), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SlugTaken(slug) if slug == "pizza"));
    }

    #[tokio::test]
    async fn test_random_candidates_stay_in_leaderboard() {
        let store = MemoryStore::new();
        let one = leaderboard("one", None);
        let two = leaderboard("two", None);
        store.insert_leaderboard(&one, &candidates(&one, &["a", "b", "c"])).await.unwrap();
        store.insert_leaderboard(&two, &candidates(&two, &["x", "y"])).await.unwrap();

        for _ in 0..50 {
            let drawn = store.random_candidates(&one.id, 2).await.unwrap();
            assert_eq!(drawn.len(), 2);
            assert_ne!(drawn[0].id, drawn[1].id);
            assert!(drawn.iter().all(|c| c.leaderboard == one.id));
        }
        assert_eq!(store.random_candidates(&two.id, 5).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_votes() {
        let store = MemoryStore::new();
        let lb = leaderboard("cascade", None);
        let cs = candidates(&lb, &["a", "b", "c"]);
        store.insert_leaderboard(&lb, &cs).await.unwrap();
        store.insert_vote(&Vote::record(&cs[0], &cs[1])).await.unwrap();
        store.insert_vote(&Vote::record(&cs[2], &cs[0])).await.unwrap();
        store.insert_vote(&Vote::record(&cs[1], &cs[2])).await.unwrap();

        assert!(store.delete_candidate(&cs[0].id).await.unwrap());
        assert!(!store.delete_candidate(&cs[0].id).await.unwrap());

        let tallies = store.tallies(&lb.id).await.unwrap();
        assert_eq!(
            tallies,
            vec![
                Tally { candidate: cs[1].id.clone(), wins: 1, losses: 0 },
                Tally { candidate: cs[2].id.clone(), wins: 0, losses: 1 },
            ],
        );
    }

    #[tokio::test]
    async fn test_most_voted_orders_by_votes_then_slug() {
        let store = MemoryStore::new();
        let mut boards = Vec::new();
        for slug in ["cc", "aa", "bb"] {
            let lb = leaderboard(slug, None);
            let cs = candidates(&lb, &["p", "q"]);
            store.insert_leaderboard(&lb, &cs).await.unwrap();
            boards.push((lb, cs));
        }
        // cc gets two votes, aa and bb none.
        let (_, cc) = &boards[0];
        store.insert_vote(&Vote::record(&cc[0], &cc[1])).await.unwrap();
        store.insert_vote(&Vote::record(&cc[1], &cc[0])).await.unwrap();

        let top = store.most_voted_leaderboards(2).await.unwrap();
        let summary: Vec<(&str, u64)> = top.iter().map(|(l, n)| (l.slug.as_str(), *n)).collect();
        assert_eq!(summary, vec![("cc", 2), ("aa", 0)]);
    }

    #[tokio::test]
    async fn test_preview_only_with_images() {
        let store = MemoryStore::new();
        let lb = leaderboard("pics", Some("ash"));
        let mut cs = candidates(&lb, &["a", "b", "c"]);
        cs[1].image = Some("https://img.example/b.png".to_string());
        store.insert_leaderboard(&lb, &cs).await.unwrap();

        let preview = store.preview_candidates(&lb.id, 4).await.unwrap();
        assert_eq!(preview.len(), 1);
        assert_eq!(preview[0].name, "b");

        assert_eq!(store.leaderboards_by_owner("ash").await.unwrap().len(), 1);
        assert!(store.leaderboards_by_owner("gary").await.unwrap().is_empty());
    }
}
