/// Field rules for leaderboards and candidates.
///
/// Lengths are counted in chars, not bytes. Every check returns the first
/// problem it finds. Validators never trim or truncate; the `normalize_*`
/// helpers are applied before them on write paths.
use thiserror::Error;

use crate::constants::*;
use crate::types::{CandidateDraft, CandidateEdit, NewLeaderboard};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("slug may only contain lowercase letters, digits and dashes")]
    InvalidSlug,
    #[error("image must be an http(s) URL, got {0:?}")]
    InvalidImageUrl(String),
}

fn check_len(field: &'static str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min {
        return Err(ValidationError::TooShort { field, min });
    }
    if len > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    check_len("slug", slug, SLUG_MIN_LEN, SLUG_MAX_LEN)?;
    if !slug.chars().all(is_slug_char) {
        return Err(ValidationError::InvalidSlug);
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    check_len("name", name, NAME_MIN_LEN, NAME_MAX_LEN)
}

pub fn validate_question(question: &str) -> Result<(), ValidationError> {
    check_len("question", question, QUESTION_MIN_LEN, QUESTION_MAX_LEN)
}

pub fn validate_candidate_name(name: &str) -> Result<(), ValidationError> {
    check_len("candidate name", name, CANDIDATE_NAME_MIN_LEN, CANDIDATE_NAME_MAX_LEN)
}

/// An image reference must be an absolute http(s) URL within the length limit.
pub fn validate_image(url: &str) -> Result<(), ValidationError> {
    check_len("image", url, 1, IMAGE_URL_MAX_LEN)?;
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| ValidationError::InvalidImageUrl(url.to_string()))?;
    if rest.is_empty() || rest.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidImageUrl(url.to_string()));
    }
    Ok(())
}

pub fn validate_candidate(draft: &CandidateDraft) -> Result<(), ValidationError> {
    validate_candidate_name(&draft.name)?;
    if let Some(image) = &draft.image {
        validate_image(image)?;
    }
    Ok(())
}

pub fn validate_edit(edit: &CandidateEdit) -> Result<(), ValidationError> {
    if let Some(name) = &edit.name {
        validate_candidate_name(name)?;
    }
    if let Some(image) = &edit.image {
        validate_image(image)?;
    }
    Ok(())
}

pub fn validate_new_leaderboard(new: &NewLeaderboard) -> Result<(), ValidationError> {
    validate_slug(&new.slug)?;
    validate_name(&new.name)?;
    validate_question(&new.question)?;
    new.candidates.iter().try_for_each(validate_candidate)
}

fn is_slug_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

/// Derive a slug from free text: lowercase it and drop every char outside `[a-z0-9-]`.
///
/// Spaces are dropped, not turned into dashes. The result may still be too
/// short or long for `validate_slug`.
pub fn slugify(text: &str) -> String {
    text.to_lowercase().chars().filter(|&c| is_slug_char(c)).collect()
}

/// Strip surrounding whitespace from a candidate name.
///
/// CSV import trims every field, so names stored any other way must be trimmed
/// too or an export would not read back the same. A blank name becomes empty
/// and then fails `validate_candidate_name`.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_string()
}

/// Treat an empty or blank image field as "no image".
pub fn normalize_image(image: Option<String>) -> Option<String> {
    image
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
