/// SQLite-backed store.
///
/// Tables are created on connect if missing. Votes reference candidates with
/// `ON DELETE CASCADE`, so removing a candidate removes its votes too.
use std::str::FromStr;

use async_trait::async_trait;
use mostest_core::{Candidate, CandidateId, Leaderboard, LeaderboardId, Tally, Vote};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::store::{Store, StoreResult};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS leaderboards (
    id         TEXT PRIMARY KEY,
    slug       TEXT NOT NULL UNIQUE,
    name       TEXT NOT NULL,
    question   TEXT NOT NULL,
    owner      TEXT
);

CREATE TABLE IF NOT EXISTS candidates (
    id             TEXT PRIMARY KEY,
    leaderboard_id TEXT NOT NULL REFERENCES leaderboards(id) ON DELETE CASCADE,
    name           TEXT NOT NULL,
    image          TEXT
);

CREATE TABLE IF NOT EXISTS votes (
    id             TEXT PRIMARY KEY,
    leaderboard_id TEXT NOT NULL REFERENCES leaderboards(id) ON DELETE CASCADE,
    winner_id      TEXT NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
    loser_id       TEXT NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
    created_at     TEXT NOT NULL,
    CHECK (winner_id <> loser_id)
);

CREATE INDEX IF NOT EXISTS candidates_leaderboard_idx ON candidates(leaderboard_id);
CREATE INDEX IF NOT EXISTS votes_leaderboard_idx ON votes(leaderboard_id);
CREATE INDEX IF NOT EXISTS votes_winner_idx ON votes(winner_id);
CREATE INDEX IF NOT EXISTS votes_loser_idx ON votes(loser_id);
"#;

const CANDIDATE_COLUMNS: &str = "id, leaderboard_id, name, image";
const LEADERBOARD_COLUMNS: &str = "id, slug, name, question, owner";

#[derive(FromRow)]
struct LeaderboardRow {
    id: String,
    slug: String,
    name: String,
    question: String,
    owner: Option<String>,
}

impl From<LeaderboardRow> for Leaderboard {
    fn from(row: LeaderboardRow) -> Self {
        Leaderboard {
            id: row.id.into(),
            slug: row.slug,
            name: row.name,
            question: row.question,
            owner: row.owner,
        }
    }
}

#[derive(FromRow)]
struct CountedLeaderboardRow {
    #[sqlx(flatten)]
    leaderboard: LeaderboardRow,
    vote_count: i64,
}

#[derive(FromRow)]
struct CandidateRow {
    id: String,
    leaderboard_id: String,
    name: String,
    image: Option<String>,
}

impl From<CandidateRow> for Candidate {
    fn from(row: CandidateRow) -> Self {
        Candidate {
            id: row.id.into(),
            leaderboard: row.leaderboard_id.into(),
            name: row.name,
            image: row.image,
        }
    }
}

#[derive(FromRow)]
struct TallyRow {
    id: String,
    wins: i64,
    losses: i64,
}

impl From<TallyRow> for Tally {
    fn from(row: TallyRow) -> Self {
        Tally {
            candidate: row.id.into(),
            wins: row.wins.max(0) as u64,
            losses: row.losses.max(0) as u64,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and make sure the tables exist.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;
        info!(url, "connected to sqlite");
        Self::with_pool(pool).await
    }

    /// A private, empty in-memory database.
    ///
    /// Every `:memory:` connection is its own database, so the pool is pinned
    /// to one connection that is never recycled.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    pub async fn with_pool(pool: SqlitePool) -> StoreResult<Self> {
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        Ok(SqliteStore { pool })
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_leaderboard(&self, leaderboard: &Leaderboard, candidates: &[Candidate]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO leaderboards (id, slug, name, question, owner) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(leaderboard.id.as_str())
        .bind(&leaderboard.slug)
        .bind(&leaderboard.name)
        .bind(&leaderboard.question)
        .bind(leaderboard.owner.as_deref())
        .execute(&mut *tx)
        .await;
        match inserted {
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::SlugTaken(leaderboard.slug.clone()));
            }
            other => other?,
        };

        for c in candidates {
            insert_candidate(&mut tx, c).await?;
        }
        tx.commit().await?;

        debug!(slug = %leaderboard.slug, candidates = candidates.len(), "inserted leaderboard");
        Ok(())
    }

    async fn leaderboard(&self, id: &LeaderboardId) -> StoreResult<Option<Leaderboard>> {
        let row = sqlx::query_as::<_, LeaderboardRow>(&format!(
            "SELECT {LEADERBOARD_COLUMNS} FROM leaderboards WHERE id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Leaderboard::from))
    }

    async fn leaderboard_by_slug(&self, slug: &str) -> StoreResult<Option<Leaderboard>> {
        let row = sqlx::query_as::<_, LeaderboardRow>(&format!(
            "SELECT {LEADERBOARD_COLUMNS} FROM leaderboards WHERE slug = ?"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Leaderboard::from))
    }

    async fn leaderboards_by_owner(&self, owner: &str) -> StoreResult<Vec<Leaderboard>> {
        let rows = sqlx::query_as::<_, LeaderboardRow>(&format!(
            "SELECT {LEADERBOARD_COLUMNS} FROM leaderboards WHERE owner = ? ORDER BY slug"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Leaderboard::from).collect())
    }

    async fn most_voted_leaderboards(&self, limit: usize) -> StoreResult<Vec<(Leaderboard, u64)>> {
        let rows = sqlx::query_as::<_, CountedLeaderboardRow>(
            r#"
            SELECT l.id, l.slug, l.name, l.question, l.owner,
                   (SELECT COUNT(*) FROM votes v WHERE v.leaderboard_id = l.id) AS vote_count
            FROM leaderboards l
            ORDER BY vote_count DESC, l.slug ASC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| (Leaderboard::from(row.leaderboard), row.vote_count.max(0) as u64))
            .collect())
    }

    async fn candidate(&self, id: &CandidateId) -> StoreResult<Option<Candidate>> {
        let row = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Candidate::from))
    }

    async fn candidates(&self, leaderboard: &LeaderboardId) -> StoreResult<Vec<Candidate>> {
        let rows = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE leaderboard_id = ? ORDER BY rowid"
        ))
        .bind(leaderboard.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Candidate::from).collect())
    }

    async fn random_candidates(&self, leaderboard: &LeaderboardId, count: usize) -> StoreResult<Vec<Candidate>> {
        let rows = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates WHERE leaderboard_id = ? ORDER BY RANDOM() LIMIT ?"
        ))
        .bind(leaderboard.as_str())
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Candidate::from).collect())
    }

    async fn preview_candidates(&self, leaderboard: &LeaderboardId, limit: usize) -> StoreResult<Vec<Candidate>> {
        let rows = sqlx::query_as::<_, CandidateRow>(&format!(
            "SELECT {CANDIDATE_COLUMNS} FROM candidates \
             WHERE leaderboard_id = ? AND image IS NOT NULL ORDER BY rowid LIMIT ?"
        ))
        .bind(leaderboard.as_str())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Candidate::from).collect())
    }

    async fn insert_candidates(&self, candidates: &[Candidate]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        for c in candidates {
            insert_candidate(&mut tx, c).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn update_candidate(&self, candidate: &Candidate) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE candidates SET name = ?, image = ? WHERE id = ?")
            .bind(&candidate.name)
            .bind(candidate.image.as_deref())
            .bind(candidate.id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_candidate(&self, id: &CandidateId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM candidates WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_vote(&self, vote: &Vote) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO votes (id, leaderboard_id, winner_id, loser_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(vote.id.as_str())
        .bind(vote.leaderboard.as_str())
        .bind(vote.winner.as_str())
        .bind(vote.loser.as_str())
        .bind(vote.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn tallies(&self, leaderboard: &LeaderboardId) -> StoreResult<Vec<Tally>> {
        let rows = sqlx::query_as::<_, TallyRow>(
            r#"
            SELECT c.id,
                   (SELECT COUNT(*) FROM votes v WHERE v.winner_id = c.id) AS wins,
                   (SELECT COUNT(*) FROM votes v WHERE v.loser_id = c.id) AS losses
            FROM candidates c
            WHERE c.leaderboard_id = ?
            ORDER BY c.rowid
            "#,
        )
        .bind(leaderboard.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Tally::from).collect())
    }
}

async fn insert_candidate(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    candidate: &Candidate,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO candidates (id, leaderboard_id, name, image) VALUES (?, ?, ?, ?)")
        .bind(candidate.id.as_str())
        .bind(candidate.leaderboard.as_str())
        .bind(&candidate.name)
        .bind(candidate.image.as_deref())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mostest_core::CandidateDraft;

    fn leaderboard(slug: &str) -> Leaderboard {
        Leaderboard {
            id: LeaderboardId::generate(),
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            question: "Which one?".to_string(),
            owner: Some("ash".to_string()),
        }
    }

    fn candidates(lb: &Leaderboard, names: &[&str]) -> Vec<Candidate> {
        names
            .iter()
            .map(|&n| CandidateDraft::new(n, None).into_candidate(&lb.id))
            .collect()
    }

    #[tokio::test]
    async fn test_roundtrip_leaderboard() {
        let store = SqliteStore::in_memory().await.unwrap();
        let lb = leaderboard("roundest");
        let mut cs = candidates(&lb, &["ball", "egg", "cube"]);
        cs[0].image = Some("https://img.example/ball.png".to_string());
        store.insert_leaderboard(&lb, &cs).await.unwrap();

        assert_eq!(store.leaderboard(&lb.id).await.unwrap(), Some(lb.clone()));
        assert_eq!(store.leaderboard_by_slug("roundest").await.unwrap(), Some(lb.clone()));
        assert_eq!(store.leaderboard_by_slug("nope").await.unwrap(), None);
        assert_eq!(store.candidates(&lb.id).await.unwrap(), cs);
        assert_eq!(store.candidate(&cs[2].id).await.unwrap(), Some(cs[2].clone()));
        assert_eq!(store.preview_candidates(&lb.id, 4).await.unwrap(), vec![cs[0].clone()]);
        assert_eq!(store.leaderboards_by_owner("ash").await.unwrap(), vec![lb]);
    }

    #[tokio::test]
    async fn test_duplicate_slug_rolls_back() {
        let store = SqliteStore::in_memory().await.unwrap();
        let first = leaderboard("pizza");
        store.insert_leaderboard(&first, &[]).await.unwrap();

        let second = leaderboard("pizza");
        let err = store
            .insert_leaderboard(&second, &candidates(&second, &["a", "b"]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::SlugTaken(_)));
        assert!(store.candidates(&second.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_random_candidates() {
        let store = SqliteStore::in_memory().await.unwrap();
        let lb = leaderboard("random");
        store.insert_leaderboard(&lb, &candidates(&lb, &["a", "b", "c", "d"])).await.unwrap();

        for _ in 0..20 {
            let drawn = store.random_candidates(&lb.id, 2).await.unwrap();
            assert_eq!(drawn.len(), 2);
            assert_ne!(drawn[0].id, drawn[1].id);
        }
    }

    #[tokio::test]
    async fn test_tallies_and_cascade() {
        let store = SqliteStore::in_memory().await.unwrap();
        let lb = leaderboard("tally");
        let cs = candidates(&lb, &["a", "b", "c"]);
        store.insert_leaderboard(&lb, &cs).await.unwrap();
        store.insert_vote(&Vote::record(&cs[0], &cs[1])).await.unwrap();
        store.insert_vote(&Vote::record(&cs[0], &cs[2])).await.unwrap();
        store.insert_vote(&Vote::record(&cs[1], &cs[2])).await.unwrap();

        let tallies = store.tallies(&lb.id).await.unwrap();
        let counts: Vec<(u64, u64)> = tallies.iter().map(|t| (t.wins, t.losses)).collect();
        assert_eq!(counts, vec![(2, 0), (1, 1), (0, 2)]);

        let top = store.most_voted_leaderboards(3).await.unwrap();
        assert_eq!(top[0].1, 3);

        assert!(store.delete_candidate(&cs[0].id).await.unwrap());
        let counts: Vec<(u64, u64)> = store
            .tallies(&lb.id)
            .await
            .unwrap()
            .iter()
            .map(|t| (t.wins, t.losses))
            .collect();
        assert_eq!(counts, vec![(1, 0), (0, 1)]);
    }

    #[tokio::test]
    async fn test_update_candidate() {
        let store = SqliteStore::in_memory().await.unwrap();
        let lb = leaderboard("edit");
        let mut cs = candidates(&lb, &["a", "b"]);
        store.insert_leaderboard(&lb, &cs).await.unwrap();

        cs[0].name = "renamed".to_string();
        cs[0].image = Some("https://img.example/a.png".to_string());
        assert!(store.update_candidate(&cs[0]).await.unwrap());
        assert_eq!(store.candidate(&cs[0].id).await.unwrap(), Some(cs[0].clone()));

        let ghost = CandidateDraft::new("ghost", None).into_candidate(&lb.id);
        assert!(!store.update_candidate(&ghost).await.unwrap());
    }

    #[tokio::test]
    async fn test_self_vote_rejected_by_schema() {
        let store = SqliteStore::in_memory().await.unwrap();
        let lb = leaderboard("check");
        let cs = candidates(&lb, &["a", "b"]);
        store.insert_leaderboard(&lb, &cs).await.unwrap();

        let mut vote = Vote::record(&cs[0], &cs[1]);
        vote.loser = vote.winner.clone();
        let err = store.insert_vote(&vote).await.unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
        assert!(!err.is_transient());
        assert!(!crate::Error::Store(err).is_retryable());
    }

    #[tokio::test]
    async fn test_vote_for_unknown_candidate_rejected_for_good() {
        let store = SqliteStore::in_memory().await.unwrap();
        let lb = leaderboard("fk");
        let cs = candidates(&lb, &["a", "b"]);
        store.insert_leaderboard(&lb, &cs).await.unwrap();

        let ghost = CandidateDraft::new("ghost", None).into_candidate(&lb.id);
        let err = store.insert_vote(&Vote::record(&cs[0], &ghost)).await.unwrap_err();
        assert!(matches!(&err, StoreError::Database(sqlx::Error::Database(db)) if db.is_foreign_key_violation()));
        assert!(!crate::Error::Store(err).is_retryable());
    }
}
