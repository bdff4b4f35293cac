use serde::{Deserialize, Serialize};

use crate::models::{ActivityLevel, NearbyProfile, Preferences};

/// How a candidate's activity level must relate to the requester's
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityFilter {
    /// No activity filtering
    #[default]
    Any,
    /// Levels must be equal
    Exact,
    /// Levels may differ by at most one step
    Adjacent,
}

/// Check the target's age against the requester's preferred range (inclusive)
#[inline]
pub fn matches_age_range(candidate: &NearbyProfile, preferences: &Preferences) -> bool {
    preferences.accepts_age(candidate.age)
}

/// Check the target's activity level against the requester's
///
/// A candidate without preferences is compared as `fallback`.
#[inline]
pub fn matches_activity(
    candidate: &NearbyProfile,
    preferences: &Preferences,
    filter: ActivityFilter,
    fallback: ActivityLevel,
) -> bool {
    let theirs = candidate.activity_level.unwrap_or(fallback);
    let ours = preferences.activity_level;

    match filter {
        ActivityFilter::Any => true,
        ActivityFilter::Exact => theirs == ours,
        ActivityFilter::Adjacent => theirs.rank().abs_diff(ours.rank()) <= 1,
    }
}

/// All requester-side filters a radius hit must pass to become a candidate
#[inline]
pub fn matches_preferences(
    candidate: &NearbyProfile,
    preferences: &Preferences,
    filter: ActivityFilter,
    fallback: ActivityLevel,
) -> bool {
    matches_age_range(candidate, preferences)
        && matches_activity(candidate, preferences, filter, fallback)
}
