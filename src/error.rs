use thiserror::Error;

use crate::services::StoreError;

/// Errors surfaced by the matching engine to the request layer
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("A user cannot swipe on themselves")]
    InvalidTarget,

    #[error("Profile {0} has no location; radius search needs an origin")]
    LocationRequired(String),

    #[error("Preferences missing for profile {0}")]
    PreferencesMissing(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Data integrity violation: {0}")]
    Integrity(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MatchError {
    /// Stable, machine-readable kind for API clients
    pub fn kind(&self) -> &'static str {
        match self {
            MatchError::InvalidTarget => "invalid_target",
            MatchError::LocationRequired(_) => "location_required",
            MatchError::PreferencesMissing(_) => "preferences_missing",
            MatchError::ProfileNotFound(_) => "profile_not_found",
            MatchError::InvalidCursor(_) => "invalid_cursor",
            MatchError::Validation(_) => "invalid_input",
            MatchError::Integrity(_) => "internal_error",
            MatchError::Store(e) if e.is_transient() => "store_unavailable",
            MatchError::Store(_) => "store_error",
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            MatchError::InvalidTarget
            | MatchError::InvalidCursor(_)
            | MatchError::Validation(_) => 400,
            MatchError::ProfileNotFound(_) => 404,
            MatchError::LocationRequired(_) | MatchError::PreferencesMissing(_) => 422,
            MatchError::Store(e) if e.is_transient() => 503,
            MatchError::Integrity(_) | MatchError::Store(_) => 500,
        }
    }

    /// Caller mistakes or missing prerequisite data; never worth retrying
    pub fn is_input_error(&self) -> bool {
        self.status_code() < 500
    }
}
