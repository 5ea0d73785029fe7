use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[cfg_attr(feature = "serde", serde(transparent))]
        pub struct $name(String);

        impl $name {
            /// A fresh random (UUID v4) identifier.
            pub fn generate() -> Self {
                $name(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Leaderboard identifier. Opaque; compares lexically.
    LeaderboardId
);
opaque_id!(
    /// Candidate identifier. Opaque; compares lexically, which the ranking tie-break relies on.
    CandidateId
);
opaque_id!(VoteId);

/// A named collection of candidates plus the question voters answer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Leaderboard {
    pub id: LeaderboardId,
    /// Unique, URL-safe handle.
    pub slug: String,
    pub name: String,
    pub question: String,
    /// `None` for anonymous leaderboards, which nobody can edit afterwards.
    pub owner: Option<String>,
}

impl Leaderboard {
    pub fn is_owned_by(&self, user: &str) -> bool {
        self.owner.as_deref() == Some(user)
    }
}

/// One ranked item within a leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Candidate {
    pub id: CandidateId,
    pub leaderboard: LeaderboardId,
    pub name: String,
    pub image: Option<String>,
}

/// A candidate that doesn't exist yet: creation forms and CSV rows.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidateDraft {
    pub name: String,
    pub image: Option<String>,
}

impl CandidateDraft {
    pub fn new(name: impl Into<String>, image: Option<String>) -> Self {
        CandidateDraft { name: name.into(), image }
    }

    /// Materialize into a candidate of `leaderboard` with a fresh id.
    pub fn into_candidate(self, leaderboard: &LeaderboardId) -> Candidate {
        Candidate {
            id: CandidateId::generate(),
            leaderboard: leaderboard.clone(),
            name: self.name,
            image: self.image,
        }
    }
}

/// Requested change to an existing candidate. `image: None` keeps the current image.
#[derive(Debug, Clone, Default)]
pub struct CandidateEdit {
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Input for creating a leaderboard together with its first candidates.
#[derive(Debug, Clone)]
pub struct NewLeaderboard {
    pub slug: String,
    pub name: String,
    pub question: String,
    pub owner: Option<String>,
    pub candidates: Vec<CandidateDraft>,
}

/// Immutable record of one pairwise outcome: `winner` beat `loser`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vote {
    pub id: VoteId,
    pub leaderboard: LeaderboardId,
    pub winner: CandidateId,
    pub loser: CandidateId,
    pub created_at: DateTime<Utc>,
}

/// Accumulated outcomes for one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tally {
    pub candidate: CandidateId,
    pub wins: u64,
    pub losses: u64,
}

/// A candidate with its score and 1-based position in the ranking.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedCandidate {
    pub position: usize,
    pub candidate: Candidate,
    pub wins: u64,
    pub losses: u64,
    /// Win rate as a percentage, 0.0 to 100.0.
    pub score: f64,
}

/// Two distinct candidates of the same leaderboard, in no particular order.
pub type CandidatePair = (Candidate, Candidate);

/// Maps candidate IDs to internal 0..N indices for array-based counting.
pub(crate) struct IdMap {
    ids: Vec<CandidateId>,
    id_to_idx: HashMap<CandidateId, usize>,
}

impl IdMap {
    /// Panics if the same id appears twice.
    pub fn from_ids<'a>(ids: impl IntoIterator<Item = &'a CandidateId>) -> Self {
        let ids: Vec<CandidateId> = ids.into_iter().cloned().collect();
        let mut id_to_idx = HashMap::with_capacity(ids.len());
        for (idx, id) in ids.iter().enumerate() {
            let prev = id_to_idx.insert(id.clone(), idx);
            assert!(prev.is_none(), "Duplicate candidate ID: {}", id);
        }
        IdMap { ids, id_to_idx }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Index of `id`, or `None` if it isn't one of the mapped candidates.
    pub fn to_idx(&self, id: &CandidateId) -> Option<usize> {
        self.id_to_idx.get(id).copied()
    }

    pub fn to_id(&self, idx: usize) -> &CandidateId {
        &self.ids[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = CandidateId::generate();
        let b = CandidateId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_ids_order_lexically() {
        let mut ids: Vec<CandidateId> = vec!["b".into(), "a10".into(), "a9".into()];
        ids.sort();
        let as_str: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(as_str, vec!["a10", "a9", "b"]);
    }

    #[test]
    fn test_ownership() {
        let mut leaderboard = Leaderboard {
            id: "lb".into(),
            slug: "roundest".to_string(),
            name: "Roundest".to_string(),
            question: "Which is rounder?".to_string(),
            owner: Some("ash".to_string()),
        };
        assert!(leaderboard.is_owned_by("ash"));
        assert!(!leaderboard.is_owned_by("gary"));

        leaderboard.owner = None;
        assert!(!leaderboard.is_owned_by("ash"));
    }

    #[test]
    fn test_id_map_lookup() {
        let ids: Vec<CandidateId> = vec!["x".into(), "y".into()];
        let map = IdMap::from_ids(&ids);
        assert_eq!(map.len(), 2);
        assert_eq!(map.to_idx(&"y".into()), Some(1));
        assert_eq!(map.to_idx(&"z".into()), None);
        assert_eq!(map.to_id(0).as_str(), "x");
    }

    #[test]
    #[should_panic(expected = "Duplicate candidate ID")]
    fn test_id_map_rejects_duplicates() {
        let ids: Vec<CandidateId> = vec!["x".into(), "x".into()];
        let _ = IdMap::from_ids(&ids);
    }
}
