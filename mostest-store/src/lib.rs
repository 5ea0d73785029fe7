/// mostest-store: Persistence and the request-level operations on top of it.
///
/// `Store` is the async seam over leaderboards, candidates and votes, with an
/// in-memory and a SQLite implementation. `LeaderboardService` composes store
/// calls with the rules from `mostest_core` and bounds each call by a timeout.
///
/// # Quick start
///
/// ```rust
/// use std::time::Duration;
/// use mostest_core::{CandidateDraft, NewLeaderboard};
/// use mostest_store::{LeaderboardService, MemoryStore};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let service = LeaderboardService::new(MemoryStore::new(), Duration::from_secs(5));
/// let (leaderboard, _) = service
///     .create_leaderboard(NewLeaderboard {
///         slug: "roundest".into(),
///         name: "Roundest".into(),
///         question: "Which is rounder?".into(),
///         owner: None,
///         candidates: vec![CandidateDraft::new("Ball", None), CandidateDraft::new("Egg", None)],
///     })
///     .await?;
///
/// if let Some((a, b)) = service.pick_pair(&leaderboard.id).await? {
///     service.record_vote(&a.id, &b.id).await?;
/// }
/// for r in service.rank(&leaderboard.id).await? {
///     println!("#{} {} {:.0}%", r.position, r.candidate.name, r.score);
/// }
/// # Ok::<(), mostest_store::Error>(())
/// # }).unwrap();
/// ```

pub mod error;
pub mod memory;
pub mod service;
pub mod sqlite;
pub mod store;

pub use error::{Error, Result, StoreError};
pub use memory::MemoryStore;
pub use service::{LeaderboardService, LeaderboardSummary};
pub use sqlite::SqliteStore;
pub use store::{Store, StoreResult};
