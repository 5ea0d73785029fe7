/// Number of candidates shown to a voter at once.
pub const PAIR_SIZE: usize = 2;

/// Score given to a candidate that has won at least once and never lost.
/// The ratio would be undefined on the loss side, so it is pinned to the ceiling.
pub const UNDEFEATED_SCORE: f64 = 100.0;

/// Score given to a candidate nobody has voted on yet.
pub const UNVOTED_SCORE: f64 = 0.0;

pub const SLUG_MIN_LEN: usize = 2;
pub const SLUG_MAX_LEN: usize = 24;

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 24;

pub const QUESTION_MIN_LEN: usize = 4;
pub const QUESTION_MAX_LEN: usize = 64;

pub const CANDIDATE_NAME_MIN_LEN: usize = 1;
pub const CANDIDATE_NAME_MAX_LEN: usize = 64;

/// Image URLs longer than this are rejected rather than truncated.
pub const IMAGE_URL_MAX_LEN: usize = 256;

/// How many leaderboards the featured listing shows when the caller doesn't say.
pub const DEFAULT_FEATURED_LIMIT: usize = 3;

/// Candidates (with images) shown next to a leaderboard in listings.
pub const PREVIEW_CANDIDATES: usize = 4;
